// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Ledger Storage
//!
//! The ledger store is the single owner of persisted state: account balances,
//! capability transactions, usage records, API keys and TTL'd key-value
//! entries (sessions, used payment signatures).
//!
//! ## Storage Layout
//!
//! ```text
//! $DATA_DIR/
//!   gateway.redb      # redb database, see ledger_db for the table list
//! ```
//!
//! ## Important Notes
//!
//! - Every mutation of more than one row is a single redb write transaction
//! - Components never mutate balances or transaction rows directly; they go
//!   through `LedgerStore` methods
//! - Wallet addresses are case-sensitive base58 and are stored as given

pub mod kv;
pub mod ledger_db;
pub mod records;

pub use kv::{KvEntry, KvStore, MemoryKv};
pub use ledger_db::{LedgerStore, StoreError, StoreResult};
pub use records::{
    ApiKeyRecord, EscrowEntry, EscrowEntryKind, PaymentMethod, StoredTransaction, TxStatus,
    UsageRecord,
};

/// File name of the ledger database inside the data directory.
pub const LEDGER_DB_FILE: &str = "gateway.redb";
