// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Session Manager
//!
//! Short-lived bearer tokens bound to a wallet. One active session per
//! wallet: creating a new session supersedes the previous token.
//!
//! ## Storage
//!
//! Sessions live in the injected [`KvStore`] so every gateway instance sharing
//! the store sees the same sessions:
//!
//! - `session:wallet:<wallet>` → token
//! - `session:token:<token>` → wallet
//!
//! Both entries carry the session TTL. A token resolves only while the wallet
//! entry still points back at it.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::blockchain::is_valid_address;
use crate::error::GatewayError;
use crate::storage::{KvStore, StoreResult};

/// Default session lifetime (24 hours).
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(24 * 60 * 60);

const WALLET_KEY_PREFIX: &str = "session:wallet:";
const TOKEN_KEY_PREFIX: &str = "session:token:";

fn wallet_key(wallet: &str) -> String {
    format!("{WALLET_KEY_PREFIX}{wallet}")
}

fn token_key(token: &str) -> String {
    format!("{TOKEN_KEY_PREFIX}{token}")
}

/// A freshly issued session.
#[derive(Debug, Clone)]
pub struct Session {
    pub wallet_address: String,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

pub struct SessionManager {
    kv: Arc<dyn KvStore>,
    ttl: Duration,
}

impl SessionManager {
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self {
            kv,
            ttl: DEFAULT_SESSION_TTL,
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Issue a new token for `wallet`, superseding any existing session.
    pub fn create_session(&self, wallet: &str) -> Result<Session, GatewayError> {
        if !is_valid_address(wallet) {
            return Err(GatewayError::InvalidRequest(format!(
                "Invalid wallet address: {wallet}"
            )));
        }

        let token = Uuid::new_v4().to_string();
        let wallet_key = wallet_key(wallet);

        if let Some(previous) = self.kv.get(&wallet_key)? {
            self.kv.remove(&token_key(&previous))?;
            debug!(wallet = %wallet, "Superseding previous session");
        }
        self.kv.put(&wallet_key, &token, Some(self.ttl))?;
        self.kv.put(&token_key(&token), wallet, Some(self.ttl))?;

        let expires_at = chrono::Duration::from_std(self.ttl)
            .ok()
            .and_then(|ttl| Utc::now().checked_add_signed(ttl))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        info!(wallet = %wallet, "Session created");

        Ok(Session {
            wallet_address: wallet.to_string(),
            token,
            expires_at,
        })
    }

    /// Wallet bound to `token`, or `None` if unknown, expired or superseded.
    pub fn wallet_for_token(&self, token: &str) -> StoreResult<Option<String>> {
        let Some(wallet) = self.kv.get(&token_key(token))? else {
            return Ok(None);
        };
        let current = self.kv.get(&wallet_key(&wallet))?;
        if current.as_deref() == Some(token) {
            Ok(Some(wallet))
        } else {
            Ok(None)
        }
    }

    /// Whether `token` is the live session of `wallet`.
    pub fn is_valid(&self, wallet: &str, token: &str) -> StoreResult<bool> {
        Ok(self.kv.get(&wallet_key(wallet))?.as_deref() == Some(token))
    }

    /// Drop the wallet's session. Returns `false` if it had none.
    pub fn invalidate(&self, wallet: &str) -> StoreResult<bool> {
        let wallet_key = wallet_key(wallet);
        match self.kv.get(&wallet_key)? {
            Some(token) => {
                self.kv.remove(&token_key(&token))?;
                self.kv.remove(&wallet_key)?;
                info!(wallet = %wallet, "Session invalidated");
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

// =============================================================================
// Sweeper
// =============================================================================

/// Background task that purges expired key-value entries.
pub struct SessionSweeper {
    kv: Arc<dyn KvStore>,
    interval: Duration,
}

impl SessionSweeper {
    pub fn new(kv: Arc<dyn KvStore>, interval: Duration) -> Self {
        Self { kv, interval }
    }

    /// Run until the cancellation token is triggered.
    ///
    /// ```rust,ignore
    /// tokio::spawn(sweeper.run(shutdown.clone()));
    /// ```
    pub async fn run(self, shutdown: CancellationToken) {
        info!(interval_secs = self.interval.as_secs(), "Session sweeper starting");

        loop {
            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {},
                _ = shutdown.cancelled() => {
                    info!("Session sweeper shutting down");
                    return;
                }
            }
            self.sweep_step().await;
        }
    }

    async fn sweep_step(&self) {
        let kv = self.kv.clone();
        match tokio::task::spawn_blocking(move || kv.purge_expired()).await {
            Ok(Ok(0)) => {}
            Ok(Ok(purged)) => info!(purged, "Session sweeper: purged expired entries"),
            Ok(Err(e)) => warn!(error = %e, "Session sweeper: purge failed"),
            Err(e) => warn!(error = %e, "Session sweeper: task panicked"),
        }
    }
}
