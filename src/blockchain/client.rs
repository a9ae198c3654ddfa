// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Solana JSON-RPC client for payment lookups.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use super::types::{ChainTransaction, RpcResponse, RpcTransaction};

/// Read access to confirmed chain transactions.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Fetch a transaction by signature. `Ok(None)` if the chain does not
    /// know it (yet).
    async fn get_transaction(
        &self,
        signature: &str,
    ) -> Result<Option<ChainTransaction>, ChainClientError>;
}

/// `getTransaction` over HTTP JSON-RPC.
pub struct SolanaRpcClient {
    http: reqwest::Client,
    rpc_url: url::Url,
}

impl SolanaRpcClient {
    /// Create a client; every request is bounded by `timeout`.
    pub fn new(rpc_url: &str, timeout: Duration) -> Result<Self, ChainClientError> {
        let rpc_url: url::Url = rpc_url
            .parse()
            .map_err(|e: url::ParseError| ChainClientError::InvalidRpcUrl(e.to_string()))?;
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ChainClientError::Http(e.to_string()))?;
        Ok(Self { http, rpc_url })
    }
}

#[async_trait]
impl ChainClient for SolanaRpcClient {
    async fn get_transaction(
        &self,
        signature: &str,
    ) -> Result<Option<ChainTransaction>, ChainClientError> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "getTransaction",
            "params": [
                signature,
                {
                    "encoding": "jsonParsed",
                    "commitment": "confirmed",
                    "maxSupportedTransactionVersion": 0
                }
            ]
        });

        let response = self
            .http
            .post(self.rpc_url.clone())
            .json(&body)
            .send()
            .await
            .map_err(ChainClientError::from_reqwest)?;

        let status = response.status();
        if !status.is_success() {
            return Err(ChainClientError::Http(format!("RPC returned HTTP {status}")));
        }

        let parsed: RpcResponse<RpcTransaction> = response
            .json()
            .await
            .map_err(|e| ChainClientError::Decode(e.to_string()))?;

        if let Some(error) = parsed.error {
            return Err(ChainClientError::Rpc {
                code: error.code,
                message: error.message,
            });
        }
        Ok(parsed.result.map(ChainTransaction::from))
    }
}

/// Errors that can occur while talking to the chain.
#[derive(Debug, thiserror::Error)]
pub enum ChainClientError {
    #[error("Invalid RPC URL: {0}")]
    InvalidRpcUrl(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("RPC request timed out")]
    Timeout,

    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("Malformed RPC response: {0}")]
    Decode(String),
}

impl ChainClientError {
    fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ChainClientError::Timeout
        } else {
            ChainClientError::Http(err.to_string())
        }
    }
}
