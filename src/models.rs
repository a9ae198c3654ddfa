// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # API Data Models
//!
//! Request and response bodies of the HTTP binding. All types derive
//! `ToSchema` for the OpenAPI document.
//!
//! ## Model Categories
//!
//! - **Sessions**: Wallet login and token validity
//! - **API Keys**: Named long-lived credentials
//! - **Gateway**: Capability listing, prices and routed calls
//! - **Escrow**: Deposits, spends and balance history

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::auth::Session;
use crate::gateway::{CapabilityInfo, Params};
use crate::storage::{ApiKeyRecord, EscrowEntry, StoredTransaction};

// =============================================================================
// Session Models
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateSessionRequest {
    /// Base58 wallet address.
    pub wallet_address: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SessionResponse {
    pub wallet_address: String,
    /// Bearer token for the `Authorization` header.
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl From<Session> for SessionResponse {
    fn from(session: Session) -> Self {
        Self {
            wallet_address: session.wallet_address,
            token: session.token,
            expires_at: session.expires_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize, IntoParams)]
pub struct SessionQuery {
    /// Session token to check.
    pub token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SessionValidity {
    pub valid: bool,
    pub wallet_address: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct InvalidateSessionResponse {
    /// Whether a live session was removed.
    pub invalidated: bool,
}

// =============================================================================
// API Key Models
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateApiKeyRequest {
    /// Name, unique per wallet.
    pub name: String,
}

/// API key metadata. The key value is only returned when it is issued.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiKeyResponse {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    pub wallet_address: String,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_used: Option<DateTime<Utc>>,
    pub usage_count: u64,
    pub active: bool,
}

impl ApiKeyResponse {
    pub fn issued(record: ApiKeyRecord) -> Self {
        let key = Some(record.key.clone());
        Self {
            key,
            ..Self::from(record)
        }
    }
}

impl From<ApiKeyRecord> for ApiKeyResponse {
    fn from(record: ApiKeyRecord) -> Self {
        Self {
            name: record.name,
            key: None,
            wallet_address: record.wallet_address,
            created_at: record.created_at,
            last_used: record.last_used,
            usage_count: record.usage_count,
            active: record.active,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiKeyListResponse {
    pub api_keys: Vec<ApiKeyResponse>,
    pub total: usize,
}

// =============================================================================
// Gateway Models
// =============================================================================

/// Capability parameters plus an optional on-chain payment proof.
///
/// Without `tx_signature` the call is paid from the caller's escrow balance.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RouteRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tx_signature: Option<String>,
    #[serde(flatten)]
    #[schema(value_type = Object)]
    pub params: Params,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PriceResponse {
    pub capability: String,
    /// Price per call in lamports.
    pub price: u64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CapabilitiesResponse {
    pub capabilities: Vec<CapabilityInfo>,
}

#[derive(Debug, Clone, Serialize, ToSchema, PartialEq, Eq)]
pub struct LanguageInfo {
    /// ISO 639-1 code accepted as `target_language`
    pub code: String,
    pub name: String,
}

/// Target languages the translator accepts.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LanguagesResponse {
    pub languages: Vec<LanguageInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TransactionHistoryResponse {
    pub wallet_address: String,
    /// Newest first.
    pub transactions: Vec<StoredTransaction>,
}

// =============================================================================
// Escrow Models
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EscrowAmountRequest {
    /// Amount in lamports.
    pub amount: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EscrowBalanceResponse {
    pub wallet_address: String,
    pub balance: u64,
    /// Log entry written by this mutation.
    pub entry: EscrowEntry,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EscrowDetailsResponse {
    pub wallet_address: String,
    pub balance: u64,
    /// Newest first.
    pub entries: Vec<EscrowEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn route_request_splits_signature_from_params() {
        let request: RouteRequest = serde_json::from_value(json!({
            "text": "hello",
            "target_language": "es",
            "tx_signature": "sig-1"
        }))
        .unwrap();
        assert_eq!(request.tx_signature.as_deref(), Some("sig-1"));
        assert_eq!(request.params.len(), 2);
        assert!(!request.params.contains_key("tx_signature"));

        let request: RouteRequest = serde_json::from_value(json!({"prompt": "a fox"})).unwrap();
        assert_eq!(request.tx_signature, None);
        assert_eq!(request.params["prompt"], "a fox");
    }

    #[test]
    fn listed_keys_hide_the_secret() {
        let record = ApiKeyRecord::new("wallet", "ci", "k".repeat(64));
        let listed = serde_json::to_value(ApiKeyResponse::from(record.clone())).unwrap();
        assert!(listed.get("key").is_none());

        let issued = serde_json::to_value(ApiKeyResponse::issued(record)).unwrap();
        assert_eq!(issued["key"], "k".repeat(64));
    }
}
