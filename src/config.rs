// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Configuration is loaded from the environment once at startup.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `DATA_DIR` | Directory holding the ledger database | `./data` |
//! | `SOLANA_RPC_URL` | Chain JSON-RPC endpoint | `https://api.devnet.solana.com` |
//! | `PROGRAM_ID` | Program a payment must involve | Required for on-chain payments |
//! | `RPC_TIMEOUT_SECS` | Bound on each chain RPC | `10` |
//! | `PROVIDER_TIMEOUT_SECS` | Bound on each capability call | `60` |
//! | `LLM_API_URL` | OpenAI-compatible API base URL | `https://api.openai.com` |
//! | `LLM_API_KEY` | API key for the language model | Required for capability calls |
//! | `LLM_MODEL` | Chat model name | `gpt-3.5-turbo` |
//! | `PRICE_TRANSLATOR` | Translator price (lamports) | `1500` |
//! | `PRICE_SUMMARIZER` | Summarizer price (lamports) | `1000` |
//! | `PRICE_STORY` | Story price (lamports) | `2000` |
//! | `SESSION_TTL_SECS` | Session lifetime | `86400` |
//! | `SESSION_SWEEP_SECS` | Expired-entry sweep period | `300` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::providers::llm::{DEFAULT_LLM_API_URL, DEFAULT_LLM_MODEL};
use crate::providers::story::DEFAULT_STORY_PRICE;
use crate::providers::summarizer::DEFAULT_SUMMARIZER_PRICE;
use crate::providers::translator::DEFAULT_TRANSLATOR_PRICE;

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";

/// Environment variable name for the data directory path.
pub const DATA_DIR_ENV: &str = "DATA_DIR";

pub const SOLANA_RPC_URL_ENV: &str = "SOLANA_RPC_URL";
pub const PROGRAM_ID_ENV: &str = "PROGRAM_ID";
pub const RPC_TIMEOUT_ENV: &str = "RPC_TIMEOUT_SECS";
pub const PROVIDER_TIMEOUT_ENV: &str = "PROVIDER_TIMEOUT_SECS";
pub const LLM_API_URL_ENV: &str = "LLM_API_URL";
pub const LLM_API_KEY_ENV: &str = "LLM_API_KEY";
pub const LLM_MODEL_ENV: &str = "LLM_MODEL";
pub const PRICE_TRANSLATOR_ENV: &str = "PRICE_TRANSLATOR";
pub const PRICE_SUMMARIZER_ENV: &str = "PRICE_SUMMARIZER";
pub const PRICE_STORY_ENV: &str = "PRICE_STORY";
pub const SESSION_TTL_ENV: &str = "SESSION_TTL_SECS";
pub const SESSION_SWEEP_ENV: &str = "SESSION_SWEEP_SECS";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_DATA_DIR: &str = "./data";
pub const DEFAULT_SOLANA_RPC_URL: &str = "https://api.devnet.solana.com";
pub const DEFAULT_RPC_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_PROVIDER_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_SESSION_TTL_SECS: u64 = 24 * 60 * 60;
pub const DEFAULT_SESSION_SWEEP_SECS: u64 = 300;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} has invalid value '{value}': {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
}

/// Capability prices in lamports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prices {
    pub translator: u64,
    pub summarizer: u64,
    pub story: u64,
}

impl Default for Prices {
    fn default() -> Self {
        Self {
            translator: DEFAULT_TRANSLATOR_PRICE,
            summarizer: DEFAULT_SUMMARIZER_PRICE,
            story: DEFAULT_STORY_PRICE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub host: String,
    pub port: u16,
    pub data_dir: PathBuf,
    pub solana_rpc_url: String,
    pub program_id: Option<String>,
    pub rpc_timeout: Duration,
    pub provider_timeout: Duration,
    pub llm_api_url: String,
    pub llm_api_key: Option<String>,
    pub llm_model: String,
    pub prices: Prices,
    pub session_ttl: Duration,
    pub session_sweep_interval: Duration,
    pub log_format: LogFormat,
}

impl GatewayConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable source. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let string_or = |name: &str, default: &str| get(name).unwrap_or_else(|| default.to_string());

        let log_format = match get(LOG_FORMAT_ENV).as_deref() {
            Some("json") => LogFormat::Json,
            Some("pretty") | None => LogFormat::Pretty,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    name: LOG_FORMAT_ENV,
                    value: other.to_string(),
                    reason: "expected 'json' or 'pretty'".to_string(),
                })
            }
        };

        let program_id = get(PROGRAM_ID_ENV);
        if let Some(id) = &program_id {
            if !crate::blockchain::is_valid_address(id) {
                return Err(ConfigError::Invalid {
                    name: PROGRAM_ID_ENV,
                    value: id.clone(),
                    reason: "not a valid base58 public key".to_string(),
                });
            }
        }

        Ok(Self {
            host: string_or(HOST_ENV, DEFAULT_HOST),
            port: parse_or(&get, PORT_ENV, DEFAULT_PORT)?,
            data_dir: PathBuf::from(string_or(DATA_DIR_ENV, DEFAULT_DATA_DIR)),
            solana_rpc_url: string_or(SOLANA_RPC_URL_ENV, DEFAULT_SOLANA_RPC_URL),
            program_id,
            rpc_timeout: secs_or(&get, RPC_TIMEOUT_ENV, DEFAULT_RPC_TIMEOUT_SECS)?,
            provider_timeout: secs_or(&get, PROVIDER_TIMEOUT_ENV, DEFAULT_PROVIDER_TIMEOUT_SECS)?,
            llm_api_url: string_or(LLM_API_URL_ENV, DEFAULT_LLM_API_URL),
            llm_api_key: get(LLM_API_KEY_ENV),
            llm_model: string_or(LLM_MODEL_ENV, DEFAULT_LLM_MODEL),
            prices: Prices {
                translator: parse_or(&get, PRICE_TRANSLATOR_ENV, DEFAULT_TRANSLATOR_PRICE)?,
                summarizer: parse_or(&get, PRICE_SUMMARIZER_ENV, DEFAULT_SUMMARIZER_PRICE)?,
                story: parse_or(&get, PRICE_STORY_ENV, DEFAULT_STORY_PRICE)?,
            },
            session_ttl: secs_or(&get, SESSION_TTL_ENV, DEFAULT_SESSION_TTL_SECS)?,
            session_sweep_interval: secs_or(&get, SESSION_SWEEP_ENV, DEFAULT_SESSION_SWEEP_SECS)?,
            log_format,
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_or<T, G>(get: &G, name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(name) {
        Some(raw) => raw.parse().map_err(|e: T::Err| ConfigError::Invalid {
            name,
            value: raw.clone(),
            reason: e.to_string(),
        }),
        None => Ok(default),
    }
}

/// Positive number of seconds.
fn secs_or<G>(get: &G, name: &'static str, default: u64) -> Result<Duration, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    let secs: u64 = parse_or(get, name, default)?;
    if secs == 0 {
        return Err(ConfigError::Invalid {
            name,
            value: "0".to_string(),
            reason: "must be greater than zero".to_string(),
        });
    }
    Ok(Duration::from_secs(secs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Result<GatewayConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        GatewayConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.bind_addr(), "0.0.0.0:8080");
        assert_eq!(config.data_dir, PathBuf::from("./data"));
        assert_eq!(config.program_id, None);
        assert_eq!(config.rpc_timeout, Duration::from_secs(10));
        assert_eq!(config.provider_timeout, Duration::from_secs(60));
        assert_eq!(config.session_ttl, Duration::from_secs(86_400));
        assert_eq!(config.prices, Prices::default());
        assert_eq!(config.log_format, LogFormat::Pretty);
        assert_eq!(config.llm_model, "gpt-3.5-turbo");
    }

    #[test]
    fn overrides() {
        let config = config_from(&[
            ("PORT", "9000"),
            ("PROGRAM_ID", "TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA"),
            ("PRICE_STORY", "2500"),
            ("LOG_FORMAT", "json"),
            ("LLM_API_KEY", "sk-test"),
            ("SESSION_TTL_SECS", "60"),
        ])
        .unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.program_id.as_deref(), Some("TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA"));
        assert_eq!(config.prices.story, 2500);
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.llm_api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.session_ttl, Duration::from_secs(60));
    }

    #[test]
    fn invalid_values_are_errors() {
        assert!(matches!(
            config_from(&[("PORT", "eighty")]),
            Err(ConfigError::Invalid { name: "PORT", .. })
        ));
        assert!(matches!(
            config_from(&[("PRICE_TRANSLATOR", "-5")]),
            Err(ConfigError::Invalid { name: "PRICE_TRANSLATOR", .. })
        ));
        assert!(matches!(
            config_from(&[("RPC_TIMEOUT_SECS", "0")]),
            Err(ConfigError::Invalid { name: "RPC_TIMEOUT_SECS", .. })
        ));
        assert!(matches!(
            config_from(&[("LOG_FORMAT", "xml")]),
            Err(ConfigError::Invalid { name: "LOG_FORMAT", .. })
        ));
        assert!(matches!(
            config_from(&[("PROGRAM_ID", "0xdeadbeef")]),
            Err(ConfigError::Invalid { name: "PROGRAM_ID", .. })
        ));
    }

    #[test]
    fn blank_values_fall_back_to_defaults() {
        let config = config_from(&[("HOST", "  "), ("LLM_API_KEY", "")]).unwrap();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.llm_api_key, None);
    }
}
