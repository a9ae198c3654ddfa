// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Persisted record types for the ledger store.
//!
//! All records are serialized as JSON inside redb tables. Amounts are in the
//! smallest currency unit (lamports).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Transaction status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TxStatus {
    /// Funds authorized, capability not yet delivered
    Pending,
    /// Capability delivered and usage recorded
    Completed,
    /// Capability call failed after funds were authorized
    Failed,
}

impl Default for TxStatus {
    fn default() -> Self {
        Self::Pending
    }
}

/// How a capability call was paid for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Debited from the caller's escrow balance
    Escrow,
    /// Pre-paid with a verified on-chain transaction
    OnChain,
}

/// A priced capability call.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct StoredTransaction {
    /// Unique id. Equal to `signature` for on-chain payments.
    pub id: String,
    /// On-chain payment signature (absent for escrow-paid calls)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
    /// Paying wallet
    pub wallet_address: String,
    /// Capability that was invoked
    pub capability: String,
    /// Price charged
    pub amount: u64,
    /// Payment method
    pub payment: PaymentMethod,
    /// Current status
    pub status: TxStatus,
    /// When the funds were authorized
    pub created_at: DateTime<Utc>,
    /// When the transaction reached a terminal status
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processed_at: Option<DateTime<Utc>>,
}

impl StoredTransaction {
    /// Pending transaction paid from escrow, with a fresh internal id.
    pub fn new_escrow(wallet_address: &str, capability: &str, amount: u64) -> Self {
        Self::new_pending(
            format!("escrow-{}", Uuid::new_v4()),
            None,
            wallet_address,
            capability,
            amount,
            PaymentMethod::Escrow,
        )
    }

    /// Pending transaction pre-paid by the on-chain transaction `signature`.
    pub fn new_on_chain(signature: &str, wallet_address: &str, capability: &str, amount: u64) -> Self {
        Self::new_pending(
            signature.to_string(),
            Some(signature.to_string()),
            wallet_address,
            capability,
            amount,
            PaymentMethod::OnChain,
        )
    }

    fn new_pending(
        id: String,
        signature: Option<String>,
        wallet_address: &str,
        capability: &str,
        amount: u64,
        payment: PaymentMethod,
    ) -> Self {
        Self {
            id,
            signature,
            wallet_address: wallet_address.to_string(),
            capability: capability.to_string(),
            amount,
            payment,
            status: TxStatus::Pending,
            created_at: Utc::now(),
            processed_at: None,
        }
    }

    /// Mark the transaction as completed.
    pub fn mark_completed(&mut self) {
        self.status = TxStatus::Completed;
        self.processed_at = Some(Utc::now());
    }

    /// Mark the transaction as failed.
    pub fn mark_failed(&mut self) {
        self.status = TxStatus::Failed;
        self.processed_at = Some(Utc::now());
    }
}

/// Append-only audit record of a delivered capability call.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct UsageRecord {
    /// Auto-increment id
    pub id: u64,
    /// Transaction this usage was paid by
    pub transaction_id: String,
    /// Capability that was invoked
    pub capability: String,
    /// Serialized call parameters
    pub input_ref: String,
    /// Serialized call result
    pub output_ref: String,
    pub created_at: DateTime<Utc>,
}

/// Kind of escrow balance mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum EscrowEntryKind {
    Deposit,
    Spend,
    /// Debit for a routed capability call
    Charge,
}

/// One balance mutation in the escrow log.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct EscrowEntry {
    pub id: String,
    pub wallet_address: String,
    pub kind: EscrowEntryKind,
    pub amount: u64,
    /// Balance right after this mutation
    pub balance_after: u64,
    /// Capability transaction id for charges
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl EscrowEntry {
    pub fn new(wallet_address: &str, kind: EscrowEntryKind, amount: u64, balance_after: u64) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            wallet_address: wallet_address.to_string(),
            kind,
            amount,
            balance_after,
            transaction_id: None,
            created_at: Utc::now(),
        }
    }
}

/// A named long-lived credential bound to a wallet.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct ApiKeyRecord {
    pub wallet_address: String,
    /// Human-readable name, unique per wallet
    pub name: String,
    /// Opaque key value, globally unique
    pub key: String,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_used: Option<DateTime<Utc>>,
    pub usage_count: u64,
    pub active: bool,
}

impl ApiKeyRecord {
    pub fn new(wallet_address: &str, name: &str, key: String) -> Self {
        Self {
            wallet_address: wallet_address.to_string(),
            name: name.to_string(),
            key,
            created_at: Utc::now(),
            last_used: None,
            usage_count: 0,
            active: true,
        }
    }
}
