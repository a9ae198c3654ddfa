// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Key-value store with per-entry expiry.
//!
//! Session tokens and used payment signatures live behind this interface so
//! they can be centralized in the ledger database instead of a process-local
//! map. [`MemoryKv`] is the single-process implementation; the redb
//! [`LedgerStore`](super::LedgerStore) is the durable one.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::{StoreError, StoreResult};

/// Stored value plus optional absolute expiry (unix millis).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct KvEntry {
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,
}

impl KvEntry {
    pub fn new(value: &str, ttl: Option<Duration>) -> Self {
        Self {
            value: value.to_string(),
            expires_at: ttl.map(|ttl| {
                let ttl_ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
                now_millis().saturating_add(ttl_ms)
            }),
        }
    }

    pub fn is_expired_at(&self, now_ms: i64) -> bool {
        matches!(self.expires_at, Some(at) if at <= now_ms)
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(now_millis())
    }
}

pub(crate) fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Key-value storage with TTL semantics.
///
/// Expired entries are never returned by `get` and do not block
/// `insert_if_absent`.
pub trait KvStore: Send + Sync {
    /// Current value of `key`, or `None` if missing or expired.
    fn get(&self, key: &str) -> StoreResult<Option<String>>;

    /// Insert or overwrite `key`.
    fn put(&self, key: &str, value: &str, ttl: Option<Duration>) -> StoreResult<()>;

    /// Atomically insert `key` unless a live entry exists.
    ///
    /// Returns `true` if this call inserted the entry.
    fn insert_if_absent(&self, key: &str, value: &str, ttl: Option<Duration>) -> StoreResult<bool>;

    /// Remove `key`. Returns `true` if a live entry was removed.
    fn remove(&self, key: &str) -> StoreResult<bool>;

    /// Drop every expired entry, returning how many were removed.
    fn purge_expired(&self) -> StoreResult<usize>;
}

/// In-process [`KvStore`] guarded by a single mutex.
#[derive(Default)]
pub struct MemoryKv {
    entries: Mutex<HashMap<String, KvEntry>>,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> StoreResult<std::sync::MutexGuard<'_, HashMap<String, KvEntry>>> {
        self.entries.lock().map_err(|_| StoreError::Poisoned)
    }
}

impl KvStore for MemoryKv {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let mut entries = self.lock()?;
        match entries.get(key) {
            Some(entry) if entry.is_expired() => {
                entries.remove(key);
                Ok(None)
            }
            Some(entry) => Ok(Some(entry.value.clone())),
            None => Ok(None),
        }
    }

    fn put(&self, key: &str, value: &str, ttl: Option<Duration>) -> StoreResult<()> {
        self.lock()?.insert(key.to_string(), KvEntry::new(value, ttl));
        Ok(())
    }

    fn insert_if_absent(&self, key: &str, value: &str, ttl: Option<Duration>) -> StoreResult<bool> {
        let mut entries = self.lock()?;
        if entries.get(key).is_some_and(|entry| !entry.is_expired()) {
            return Ok(false);
        }
        entries.insert(key.to_string(), KvEntry::new(value, ttl));
        Ok(true)
    }

    fn remove(&self, key: &str) -> StoreResult<bool> {
        Ok(self
            .lock()?
            .remove(key)
            .is_some_and(|entry| !entry.is_expired()))
    }

    fn purge_expired(&self) -> StoreResult<usize> {
        let mut entries = self.lock()?;
        let now = now_millis();
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired_at(now));
        Ok(before - entries.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_get_remove() {
        let kv = MemoryKv::new();
        assert_eq!(kv.get("a").unwrap(), None);

        kv.put("a", "1", None).unwrap();
        assert_eq!(kv.get("a").unwrap().as_deref(), Some("1"));

        assert!(kv.remove("a").unwrap());
        assert!(!kv.remove("a").unwrap());
        assert_eq!(kv.get("a").unwrap(), None);
    }

    #[test]
    fn insert_if_absent_only_once() {
        let kv = MemoryKv::new();
        assert!(kv.insert_if_absent("sig", "used", None).unwrap());
        assert!(!kv.insert_if_absent("sig", "used", None).unwrap());
    }

    #[test]
    fn expired_entries_are_invisible_and_replaceable() {
        let kv = MemoryKv::new();
        kv.put("a", "1", Some(Duration::from_millis(1))).unwrap();
        std::thread::sleep(Duration::from_millis(5));

        assert_eq!(kv.get("a").unwrap(), None);
        assert!(kv.insert_if_absent("a", "2", None).unwrap());
        assert_eq!(kv.get("a").unwrap().as_deref(), Some("2"));
    }

    #[test]
    fn huge_ttl_saturates_instead_of_wrapping() {
        let entry = KvEntry::new("x", Some(Duration::from_secs(u64::MAX)));
        assert_eq!(entry.expires_at, Some(i64::MAX));
        assert!(!entry.is_expired());

        let kv = MemoryKv::new();
        kv.put("a", "1", Some(Duration::MAX)).unwrap();
        assert_eq!(kv.get("a").unwrap().as_deref(), Some("1"));
        assert!(!kv.insert_if_absent("a", "2", None).unwrap());
    }

    #[test]
    fn purge_expired_counts_removed() {
        let kv = MemoryKv::new();
        kv.put("short", "1", Some(Duration::from_millis(1))).unwrap();
        kv.put("long", "2", Some(Duration::from_secs(3600))).unwrap();
        kv.put("forever", "3", None).unwrap();
        std::thread::sleep(Duration::from_millis(5));

        assert_eq!(kv.purge_expired().unwrap(), 1);
        assert_eq!(kv.get("long").unwrap().as_deref(), Some("2"));
        assert_eq!(kv.get("forever").unwrap().as_deref(), Some("3"));
    }

    #[test]
    fn concurrent_claims_have_a_single_winner() {
        use std::sync::{Arc, Barrier};

        let kv = Arc::new(MemoryKv::new());
        let barrier = Arc::new(Barrier::new(8));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let kv = kv.clone();
                let barrier = barrier.clone();
                std::thread::spawn(move || {
                    barrier.wait();
                    kv.insert_if_absent("claim", "x", None).unwrap()
                })
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();
        assert_eq!(winners, 1);
    }
}
