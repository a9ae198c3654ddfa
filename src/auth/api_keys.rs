// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! API key registry: named long-lived credentials bound to a wallet.

use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use crate::error::GatewayError;
use crate::storage::{ApiKeyRecord, LedgerStore, StoreError, StoreResult};

/// Maximum length of a key name.
pub const MAX_KEY_NAME_LEN: usize = 64;

/// Attempts before giving up on generating an unused key value.
const MAX_KEYGEN_ATTEMPTS: usize = 5;

/// 64 hex characters (two random UUIDs).
fn generate_key() -> String {
    format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
}

#[derive(Clone)]
pub struct ApiKeyRegistry {
    store: Arc<LedgerStore>,
}

impl ApiKeyRegistry {
    pub fn new(store: Arc<LedgerStore>) -> Self {
        Self { store }
    }

    /// Issue a new key named `name` for `wallet`.
    ///
    /// Fails with `Conflict` if the wallet already has a key with that name.
    pub fn issue(&self, wallet: &str, name: &str) -> Result<ApiKeyRecord, GatewayError> {
        let name = name.trim();
        if name.is_empty() || name.chars().count() > MAX_KEY_NAME_LEN {
            return Err(GatewayError::InvalidRequest(format!(
                "API key name must be 1-{MAX_KEY_NAME_LEN} characters"
            )));
        }

        for _ in 0..MAX_KEYGEN_ATTEMPTS {
            let record = ApiKeyRecord::new(wallet, name, generate_key());
            match self.store.insert_api_key(&record) {
                Ok(()) => {
                    info!(wallet = %wallet, name = %name, "API key issued");
                    return Ok(record);
                }
                Err(StoreError::DuplicateKey) => {
                    warn!(wallet = %wallet, "Generated API key collided, retrying");
                }
                Err(StoreError::Conflict(_)) => {
                    return Err(GatewayError::Conflict(format!(
                        "API key '{name}' already exists"
                    )));
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(GatewayError::Storage(
            "Could not generate a unique API key".into(),
        ))
    }

    /// Keys of `wallet`, newest first.
    pub fn list(&self, wallet: &str) -> StoreResult<Vec<ApiKeyRecord>> {
        self.store.api_keys_for_wallet(wallet)
    }

    /// Revoke the key named `name`. Returns `false` if it does not exist.
    pub fn revoke(&self, wallet: &str, name: &str) -> StoreResult<bool> {
        let revoked = self.store.delete_api_key(wallet, name)?;
        if revoked {
            info!(wallet = %wallet, name = %name, "API key revoked");
        }
        Ok(revoked)
    }

    /// Count one use of `key` and return its updated record.
    pub fn record_usage(&self, key: &str) -> StoreResult<Option<ApiKeyRecord>> {
        self.store.record_api_key_usage(key)
    }

    /// Wallet owning an active `key`, if any.
    pub fn wallet_for_key(&self, key: &str) -> StoreResult<Option<String>> {
        Ok(self
            .store
            .get_api_key(key)?
            .filter(|record| record.active)
            .map(|record| record.wallet_address))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{W1, W2};
    use std::sync::Barrier;

    fn registry() -> (ApiKeyRegistry, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = LedgerStore::open(&dir.path().join("keys.redb")).unwrap();
        (ApiKeyRegistry::new(Arc::new(store)), dir)
    }

    #[test]
    fn generated_keys_are_64_hex_chars() {
        let key = generate_key();
        assert_eq!(key.len(), 64);
        assert!(key.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(generate_key(), key);
    }

    #[test]
    fn issue_list_and_resolve() {
        let (keys, _dir) = registry();
        let record = keys.issue(W1, "ci").unwrap();
        assert_eq!(record.usage_count, 0);
        assert!(record.active);

        let listed = keys.list(W1).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].name, "ci");
        assert_eq!(keys.wallet_for_key(&record.key).unwrap().as_deref(), Some(W1));
        assert!(keys.list(W2).unwrap().is_empty());
    }

    #[test]
    fn duplicate_name_conflicts() {
        let (keys, _dir) = registry();
        keys.issue(W1, "ci").unwrap();

        assert!(matches!(keys.issue(W1, "ci"), Err(GatewayError::Conflict(_))));
        // Same name under another wallet is fine
        keys.issue(W2, "ci").unwrap();
        keys.issue(W1, "prod").unwrap();
        assert_eq!(keys.list(W1).unwrap().len(), 2);
    }

    #[test]
    fn name_length_is_bounded() {
        let (keys, _dir) = registry();
        assert!(matches!(keys.issue(W1, "  "), Err(GatewayError::InvalidRequest(_))));
        assert!(matches!(
            keys.issue(W1, &"x".repeat(MAX_KEY_NAME_LEN + 1)),
            Err(GatewayError::InvalidRequest(_))
        ));
        keys.issue(W1, &"x".repeat(MAX_KEY_NAME_LEN)).unwrap();
    }

    #[test]
    fn revoke_removes_key() {
        let (keys, _dir) = registry();
        let record = keys.issue(W1, "ci").unwrap();

        assert!(keys.revoke(W1, "ci").unwrap());
        assert!(!keys.revoke(W1, "ci").unwrap());
        assert_eq!(keys.wallet_for_key(&record.key).unwrap(), None);
    }

    #[test]
    fn concurrent_usage_has_no_lost_updates() {
        let (keys, _dir) = registry();
        let record = keys.issue(W1, "ci").unwrap();

        let threads = 8;
        let barrier = Arc::new(Barrier::new(threads));
        let handles: Vec<_> = (0..threads)
            .map(|_| {
                let keys = keys.clone();
                let barrier = barrier.clone();
                let key = record.key.clone();
                std::thread::spawn(move || {
                    barrier.wait();
                    for _ in 0..5 {
                        keys.record_usage(&key).unwrap();
                        keys.list(W1).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let listed = keys.list(W1).unwrap();
        assert_eq!(listed[0].usage_count, 40);
        assert!(listed[0].last_used.is_some());
    }
}
