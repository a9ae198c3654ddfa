// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Embedded ledger database backed by redb (pure Rust, ACID).
//!
//! redb runs one write transaction at a time, so every method that mutates
//! state does its read-compare-write inside a single write transaction. That
//! makes balance spends, transaction insertion and signature claims
//! linearizable without extra locking.
//!
//! ## Table Layout
//!
//! - `accounts`: wallet → balance (u64)
//! - `escrow_log`: composite key (wallet|!millis|entry_id) → EscrowEntry
//! - `transactions`: transaction id → StoredTransaction
//! - `wallet_tx_index`: composite key (wallet|!millis|tx_id) → tx_id
//! - `usage_logs`: auto-increment id → UsageRecord
//! - `tx_usage`: tx_id → usage id
//! - `api_keys`: key → ApiKeyRecord
//! - `api_key_names`: `wallet|name` → key
//! - `kv`: key → KvEntry

use std::path::Path;
use std::time::Duration;

use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use serde::{de::DeserializeOwned, Serialize};

use super::kv::{now_millis, KvEntry, KvStore};
use super::records::{
    ApiKeyRecord, EscrowEntry, EscrowEntryKind, StoredTransaction, TxStatus, UsageRecord,
};

// =============================================================================
// Table Definitions
// =============================================================================

const ACCOUNTS: TableDefinition<&str, u64> = TableDefinition::new("accounts");

const ESCROW_LOG: TableDefinition<&[u8], &[u8]> = TableDefinition::new("escrow_log");

const TRANSACTIONS: TableDefinition<&str, &[u8]> = TableDefinition::new("transactions");

/// Key format: `wallet|!millis_be|tx_id` for newest-first range scans.
const WALLET_TX_INDEX: TableDefinition<&[u8], &str> = TableDefinition::new("wallet_tx_index");

const USAGE_LOGS: TableDefinition<u64, &[u8]> = TableDefinition::new("usage_logs");

const TX_USAGE: TableDefinition<&str, u64> = TableDefinition::new("tx_usage");

const API_KEYS: TableDefinition<&str, &[u8]> = TableDefinition::new("api_keys");

/// Key format: `wallet|name`.
const API_KEY_NAMES: TableDefinition<&str, &str> = TableDefinition::new("api_key_names");

const KV: TableDefinition<&str, &[u8]> = TableDefinition::new("kv");

// =============================================================================
// Error Type
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("redb error: {0}")]
    Redb(#[from] redb::Error),

    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    Conflict(String),

    /// Generated API key value collided with an existing key.
    #[error("duplicate API key value")]
    DuplicateKey,

    #[error("insufficient funds: balance {available}, required {required}")]
    InsufficientFunds { available: u64, required: u64 },

    #[error("balance overflow for {0}")]
    Overflow(String),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("store lock poisoned")]
    Poisoned,
}

pub type StoreResult<T> = Result<T, StoreError>;

// =============================================================================
// Index Key Helpers
// =============================================================================

/// Build a composite key `wallet | inverted_millis_be | id`.
///
/// The inverted timestamp makes a forward scan return newest entries first.
fn make_index_key(wallet: &str, timestamp_ms: i64, id: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(wallet.len() + 1 + 8 + 1 + id.len());
    key.extend_from_slice(wallet.as_bytes());
    key.push(b'|');
    key.extend_from_slice(&(u64::MAX - timestamp_ms.max(0) as u64).to_be_bytes());
    key.push(b'|');
    key.extend_from_slice(id.as_bytes());
    key
}

/// `[wallet|, wallet})` covers every composite key of one wallet.
fn wallet_range(wallet: &str) -> (Vec<u8>, Vec<u8>) {
    let mut start = wallet.as_bytes().to_vec();
    start.push(b'|');
    let mut end = wallet.as_bytes().to_vec();
    end.push(b'}');
    (start, end)
}

fn api_key_name_key(wallet: &str, name: &str) -> String {
    format!("{wallet}|{name}")
}

fn load_json<T, Tbl>(table: &Tbl, key: &str) -> StoreResult<Option<T>>
where
    T: DeserializeOwned,
    Tbl: ReadableTable<&'static str, &'static [u8]>,
{
    let bytes = table.get(key)?.map(|v| v.value().to_vec());
    match bytes {
        Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        None => Ok(None),
    }
}

fn to_json<T: Serialize>(value: &T) -> StoreResult<Vec<u8>> {
    Ok(serde_json::to_vec(value)?)
}

// =============================================================================
// LedgerStore
// =============================================================================

/// Durable store for accounts, transactions, usage, API keys and TTL entries.
pub struct LedgerStore {
    db: Database,
}

impl LedgerStore {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = Database::create(path)?;

        // Pre-create all tables so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(ACCOUNTS)?;
            let _ = write_txn.open_table(ESCROW_LOG)?;
            let _ = write_txn.open_table(TRANSACTIONS)?;
            let _ = write_txn.open_table(WALLET_TX_INDEX)?;
            let _ = write_txn.open_table(USAGE_LOGS)?;
            let _ = write_txn.open_table(TX_USAGE)?;
            let _ = write_txn.open_table(API_KEYS)?;
            let _ = write_txn.open_table(API_KEY_NAMES)?;
            let _ = write_txn.open_table(KV)?;
        }
        write_txn.commit()?;

        Ok(Self { db })
    }

    /// Cheap read to confirm the database is usable.
    pub fn health_check(&self) -> StoreResult<()> {
        let read_txn = self.db.begin_read()?;
        let _ = read_txn.open_table(ACCOUNTS)?;
        Ok(())
    }

    // =========================================================================
    // Accounts / Escrow
    // =========================================================================

    /// Current balance, 0 for unknown accounts.
    pub fn balance(&self, wallet: &str) -> StoreResult<u64> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ACCOUNTS)?;
        Ok(table.get(wallet)?.map(|v| v.value()).unwrap_or(0))
    }

    /// Credit `amount` and log the deposit.
    pub fn deposit(&self, wallet: &str, amount: u64) -> StoreResult<EscrowEntry> {
        let write_txn = self.db.begin_write()?;
        let entry = {
            let mut accounts = write_txn.open_table(ACCOUNTS)?;
            let current = accounts.get(wallet)?.map(|v| v.value()).unwrap_or(0);
            let new_balance = current
                .checked_add(amount)
                .ok_or_else(|| StoreError::Overflow(wallet.to_string()))?;
            accounts.insert(wallet, new_balance)?;

            let entry = EscrowEntry::new(wallet, EscrowEntryKind::Deposit, amount, new_balance);
            let mut log = write_txn.open_table(ESCROW_LOG)?;
            let key = make_index_key(wallet, entry.created_at.timestamp_millis(), &entry.id);
            log.insert(key.as_slice(), to_json(&entry)?.as_slice())?;
            entry
        };
        write_txn.commit()?;
        Ok(entry)
    }

    /// Debit `amount` and log the spend. Fails without side effects when the
    /// balance is too low.
    pub fn spend(&self, wallet: &str, amount: u64) -> StoreResult<EscrowEntry> {
        let write_txn = self.db.begin_write()?;
        let entry = {
            let mut accounts = write_txn.open_table(ACCOUNTS)?;
            let new_balance = debit(&mut accounts, wallet, amount)?;

            let entry = EscrowEntry::new(wallet, EscrowEntryKind::Spend, amount, new_balance);
            let mut log = write_txn.open_table(ESCROW_LOG)?;
            let key = make_index_key(wallet, entry.created_at.timestamp_millis(), &entry.id);
            log.insert(key.as_slice(), to_json(&entry)?.as_slice())?;
            entry
        };
        write_txn.commit()?;
        Ok(entry)
    }

    /// Debit the escrow for a capability call and insert its pending
    /// transaction, all in one write transaction.
    ///
    /// Returns the balance after the debit.
    pub fn charge_escrow(&self, tx: &StoredTransaction) -> StoreResult<u64> {
        let write_txn = self.db.begin_write()?;
        let new_balance = {
            let mut accounts = write_txn.open_table(ACCOUNTS)?;
            let new_balance = debit(&mut accounts, &tx.wallet_address, tx.amount)?;

            let mut transactions = write_txn.open_table(TRANSACTIONS)?;
            if transactions.get(tx.id.as_str())?.is_some() {
                return Err(StoreError::Conflict(format!("Transaction {}", tx.id)));
            }
            transactions.insert(tx.id.as_str(), to_json(tx)?.as_slice())?;

            let mut index = write_txn.open_table(WALLET_TX_INDEX)?;
            let key = make_index_key(&tx.wallet_address, tx.created_at.timestamp_millis(), &tx.id);
            index.insert(key.as_slice(), tx.id.as_str())?;

            let mut entry =
                EscrowEntry::new(&tx.wallet_address, EscrowEntryKind::Charge, tx.amount, new_balance);
            entry.transaction_id = Some(tx.id.clone());
            let mut log = write_txn.open_table(ESCROW_LOG)?;
            let key = make_index_key(&tx.wallet_address, entry.created_at.timestamp_millis(), &entry.id);
            log.insert(key.as_slice(), to_json(&entry)?.as_slice())?;
            new_balance
        };
        write_txn.commit()?;
        Ok(new_balance)
    }

    /// Escrow log for a wallet, newest first.
    pub fn escrow_log(&self, wallet: &str) -> StoreResult<Vec<EscrowEntry>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ESCROW_LOG)?;
        let (start, end) = wallet_range(wallet);

        let mut entries = Vec::new();
        for item in table.range(start.as_slice()..end.as_slice())? {
            let (_, value) = item?;
            entries.push(serde_json::from_slice(value.value())?);
        }
        Ok(entries)
    }

    // =========================================================================
    // Transactions & Usage
    // =========================================================================

    /// Insert a new transaction. A second insert with the same id is a
    /// conflict, which is what makes a signature redeemable only once.
    pub fn insert_transaction(&self, tx: &StoredTransaction) -> StoreResult<()> {
        let write_txn = self.db.begin_write()?;
        {
            let mut transactions = write_txn.open_table(TRANSACTIONS)?;
            if transactions.get(tx.id.as_str())?.is_some() {
                return Err(StoreError::Conflict(format!("Transaction {}", tx.id)));
            }
            transactions.insert(tx.id.as_str(), to_json(tx)?.as_slice())?;

            let mut index = write_txn.open_table(WALLET_TX_INDEX)?;
            let key = make_index_key(&tx.wallet_address, tx.created_at.timestamp_millis(), &tx.id);
            index.insert(key.as_slice(), tx.id.as_str())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Look up a single transaction.
    pub fn get_transaction(&self, id: &str) -> StoreResult<Option<StoredTransaction>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(TRANSACTIONS)?;
        load_json(&table, id)
    }

    /// Move a pending transaction to `completed` and append its usage record.
    pub fn complete_with_usage(
        &self,
        tx_id: &str,
        input_ref: String,
        output_ref: String,
    ) -> StoreResult<(StoredTransaction, UsageRecord)> {
        let write_txn = self.db.begin_write()?;
        let result = {
            let mut transactions = write_txn.open_table(TRANSACTIONS)?;
            let mut tx: StoredTransaction = load_json(&transactions, tx_id)?
                .ok_or_else(|| StoreError::NotFound(format!("Transaction {tx_id}")))?;
            if tx.status != TxStatus::Pending {
                return Err(StoreError::InvalidState(format!(
                    "Transaction {tx_id} is {:?}, expected Pending",
                    tx.status
                )));
            }

            let mut tx_usage = write_txn.open_table(TX_USAGE)?;
            if tx_usage.get(tx_id)?.is_some() {
                return Err(StoreError::Conflict(format!("Usage for transaction {tx_id}")));
            }

            tx.mark_completed();
            transactions.insert(tx_id, to_json(&tx)?.as_slice())?;

            let mut usage_logs = write_txn.open_table(USAGE_LOGS)?;
            let next_id = usage_logs.last()?.map(|(k, _)| k.value() + 1).unwrap_or(1);
            let usage = UsageRecord {
                id: next_id,
                transaction_id: tx_id.to_string(),
                capability: tx.capability.clone(),
                input_ref,
                output_ref,
                created_at: chrono::Utc::now(),
            };
            usage_logs.insert(next_id, to_json(&usage)?.as_slice())?;
            tx_usage.insert(tx_id, next_id)?;

            (tx, usage)
        };
        write_txn.commit()?;
        Ok(result)
    }

    /// Move a pending transaction to `failed`.
    pub fn mark_failed(&self, tx_id: &str) -> StoreResult<StoredTransaction> {
        let write_txn = self.db.begin_write()?;
        let tx = {
            let mut transactions = write_txn.open_table(TRANSACTIONS)?;
            let mut tx: StoredTransaction = load_json(&transactions, tx_id)?
                .ok_or_else(|| StoreError::NotFound(format!("Transaction {tx_id}")))?;
            if tx.status != TxStatus::Pending {
                return Err(StoreError::InvalidState(format!(
                    "Transaction {tx_id} is {:?}, expected Pending",
                    tx.status
                )));
            }
            tx.mark_failed();
            transactions.insert(tx_id, to_json(&tx)?.as_slice())?;
            tx
        };
        write_txn.commit()?;
        Ok(tx)
    }

    /// Mark every transaction still `pending` as `failed`.
    ///
    /// Run once at startup: a pending row left behind by a previous process
    /// can never complete. Returns the ids that were moved.
    pub fn fail_stale_pending(&self) -> StoreResult<Vec<String>> {
        let write_txn = self.db.begin_write()?;
        let failed = {
            let mut transactions = write_txn.open_table(TRANSACTIONS)?;
            let mut stale = Vec::new();
            for item in transactions.iter()? {
                let (_, value) = item?;
                let tx: StoredTransaction = serde_json::from_slice(value.value())?;
                if tx.status == TxStatus::Pending {
                    stale.push(tx);
                }
            }
            let mut ids = Vec::with_capacity(stale.len());
            for mut tx in stale {
                tx.mark_failed();
                transactions.insert(tx.id.as_str(), to_json(&tx)?.as_slice())?;
                ids.push(tx.id);
            }
            ids
        };
        write_txn.commit()?;
        Ok(failed)
    }

    /// All transactions of a wallet, newest first.
    pub fn transactions_for_wallet(&self, wallet: &str) -> StoreResult<Vec<StoredTransaction>> {
        let read_txn = self.db.begin_read()?;
        let index = read_txn.open_table(WALLET_TX_INDEX)?;
        let transactions = read_txn.open_table(TRANSACTIONS)?;
        let (start, end) = wallet_range(wallet);

        let mut results = Vec::new();
        for item in index.range(start.as_slice()..end.as_slice())? {
            let (_, tx_id) = item?;
            if let Some(tx) = load_json(&transactions, tx_id.value())? {
                results.push(tx);
            }
        }
        Ok(results)
    }

    /// Usage record attached to a transaction, if it was completed.
    pub fn usage_for_transaction(&self, tx_id: &str) -> StoreResult<Option<UsageRecord>> {
        let read_txn = self.db.begin_read()?;
        let tx_usage = read_txn.open_table(TX_USAGE)?;
        let Some(usage_id) = tx_usage.get(tx_id)?.map(|v| v.value()) else {
            return Ok(None);
        };
        let usage_logs = read_txn.open_table(USAGE_LOGS)?;
        let bytes = usage_logs.get(usage_id)?.map(|v| v.value().to_vec());
        match bytes {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    // =========================================================================
    // API Keys
    // =========================================================================

    /// Insert a new API key.
    ///
    /// Fails with `Conflict` if the wallet already has a key with this name
    /// and with `DuplicateKey` if the key value is taken.
    pub fn insert_api_key(&self, record: &ApiKeyRecord) -> StoreResult<()> {
        let name_key = api_key_name_key(&record.wallet_address, &record.name);
        let write_txn = self.db.begin_write()?;
        {
            let mut names = write_txn.open_table(API_KEY_NAMES)?;
            if names.get(name_key.as_str())?.is_some() {
                return Err(StoreError::Conflict(format!("API key name '{}'", record.name)));
            }
            let mut keys = write_txn.open_table(API_KEYS)?;
            if keys.get(record.key.as_str())?.is_some() {
                return Err(StoreError::DuplicateKey);
            }
            keys.insert(record.key.as_str(), to_json(record)?.as_slice())?;
            names.insert(name_key.as_str(), record.key.as_str())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Look up an API key by value.
    pub fn get_api_key(&self, key: &str) -> StoreResult<Option<ApiKeyRecord>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(API_KEYS)?;
        load_json(&table, key)
    }

    /// All API keys of a wallet, newest first.
    pub fn api_keys_for_wallet(&self, wallet: &str) -> StoreResult<Vec<ApiKeyRecord>> {
        let read_txn = self.db.begin_read()?;
        let names = read_txn.open_table(API_KEY_NAMES)?;
        let keys = read_txn.open_table(API_KEYS)?;
        let start = format!("{wallet}|");
        let end = format!("{wallet}}}");

        let mut records: Vec<ApiKeyRecord> = Vec::new();
        for item in names.range(start.as_str()..end.as_str())? {
            let (_, key) = item?;
            if let Some(record) = load_json(&keys, key.value())? {
                records.push(record);
            }
        }
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(records)
    }

    /// Delete the wallet's key named `name`. Returns `false` if absent.
    pub fn delete_api_key(&self, wallet: &str, name: &str) -> StoreResult<bool> {
        let name_key = api_key_name_key(wallet, name);
        let write_txn = self.db.begin_write()?;
        let deleted = {
            let mut names = write_txn.open_table(API_KEY_NAMES)?;
            let key = names.remove(name_key.as_str())?.map(|v| v.value().to_string());
            match key {
                Some(key) => {
                    let mut keys = write_txn.open_table(API_KEYS)?;
                    keys.remove(key.as_str())?;
                    true
                }
                None => false,
            }
        };
        write_txn.commit()?;
        Ok(deleted)
    }

    /// Bump `usage_count` and `last_used` for a key.
    ///
    /// Returns the updated record, or `None` if the key does not exist.
    pub fn record_api_key_usage(&self, key: &str) -> StoreResult<Option<ApiKeyRecord>> {
        let write_txn = self.db.begin_write()?;
        let updated = {
            let mut keys = write_txn.open_table(API_KEYS)?;
            match load_json::<ApiKeyRecord, _>(&keys, key)? {
                Some(mut record) => {
                    record.usage_count += 1;
                    record.last_used = Some(chrono::Utc::now());
                    keys.insert(key, to_json(&record)?.as_slice())?;
                    Some(record)
                }
                None => None,
            }
        };
        write_txn.commit()?;
        Ok(updated)
    }
}

/// Subtract `amount` from the wallet balance inside an open write transaction.
fn debit(
    accounts: &mut redb::Table<'_, &'static str, u64>,
    wallet: &str,
    amount: u64,
) -> StoreResult<u64> {
    let current = accounts.get(wallet)?.map(|v| v.value()).unwrap_or(0);
    if current < amount {
        return Err(StoreError::InsufficientFunds {
            available: current,
            required: amount,
        });
    }
    let new_balance = current - amount;
    accounts.insert(wallet, new_balance)?;
    Ok(new_balance)
}

// =============================================================================
// KvStore
// =============================================================================

impl KvStore for LedgerStore {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let entry: Option<KvEntry> = {
            let read_txn = self.db.begin_read()?;
            let table = read_txn.open_table(KV)?;
            load_json(&table, key)?
        };
        match entry {
            Some(entry) if entry.is_expired() => {
                // Lazy purge; the sweeper catches anything this misses.
                let write_txn = self.db.begin_write()?;
                {
                    let mut table = write_txn.open_table(KV)?;
                    if load_json::<KvEntry, _>(&table, key)?.is_some_and(|e| e.is_expired()) {
                        table.remove(key)?;
                    }
                }
                write_txn.commit()?;
                Ok(None)
            }
            Some(entry) => Ok(Some(entry.value)),
            None => Ok(None),
        }
    }

    fn put(&self, key: &str, value: &str, ttl: Option<Duration>) -> StoreResult<()> {
        let entry = KvEntry::new(value, ttl);
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(KV)?;
            table.insert(key, to_json(&entry)?.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    fn insert_if_absent(&self, key: &str, value: &str, ttl: Option<Duration>) -> StoreResult<bool> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(KV)?;
            if load_json::<KvEntry, _>(&table, key)?.is_some_and(|e| !e.is_expired()) {
                return Ok(false);
            }
            let entry = KvEntry::new(value, ttl);
            table.insert(key, to_json(&entry)?.as_slice())?;
        }
        write_txn.commit()?;
        Ok(true)
    }

    fn remove(&self, key: &str) -> StoreResult<bool> {
        let write_txn = self.db.begin_write()?;
        let removed = {
            let mut table = write_txn.open_table(KV)?;
            let bytes = table.remove(key)?.map(|v| v.value().to_vec());
            match bytes {
                Some(bytes) => !serde_json::from_slice::<KvEntry>(&bytes)?.is_expired(),
                None => false,
            }
        };
        write_txn.commit()?;
        Ok(removed)
    }

    fn purge_expired(&self) -> StoreResult<usize> {
        let now = now_millis();
        let write_txn = self.db.begin_write()?;
        let purged = {
            let mut table = write_txn.open_table(KV)?;
            let mut expired = Vec::new();
            for item in table.iter()? {
                let (key, value) = item?;
                let entry: KvEntry = serde_json::from_slice(value.value())?;
                if entry.is_expired_at(now) {
                    expired.push(key.value().to_string());
                }
            }
            for key in &expired {
                table.remove(key.as_str())?;
            }
            expired.len()
        };
        write_txn.commit()?;
        Ok(purged)
    }
}

// =============================================================================
// Tests
// =============================================================================
