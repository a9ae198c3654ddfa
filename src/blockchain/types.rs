// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Chain transaction types and the JSON-RPC shapes they are parsed from.

use serde::Deserialize;

/// The fields of a confirmed transaction the payment verifier looks at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainTransaction {
    /// Account keys in message order; index 0 is the fee payer.
    pub account_keys: Vec<String>,
    /// Lamport balances before execution, parallel to `account_keys`
    pub pre_balances: Vec<u64>,
    /// Lamport balances after execution, parallel to `account_keys`
    pub post_balances: Vec<u64>,
    /// `meta.err` was null
    pub succeeded: bool,
}

impl ChainTransaction {
    /// Fee payer / signer of the transaction.
    pub fn payer(&self) -> Option<&str> {
        self.account_keys.first().map(String::as_str)
    }

    /// Whether `account` appears among the account keys.
    pub fn touches(&self, account: &str) -> bool {
        self.account_keys.iter().any(|key| key == account)
    }

    /// Lamports that left the payer account (0 if the payer gained funds).
    pub fn payer_debit(&self) -> u64 {
        match (self.pre_balances.first(), self.post_balances.first()) {
            (Some(pre), Some(post)) => pre.saturating_sub(*post),
            _ => 0,
        }
    }
}

// =============================================================================
// JSON-RPC wire types
// =============================================================================

#[derive(Debug, Deserialize)]
pub(crate) struct RpcResponse<T> {
    pub result: Option<T>,
    pub error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RpcErrorObject {
    pub code: i64,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RpcTransaction {
    pub meta: Option<RpcTransactionMeta>,
    pub transaction: RpcTransactionBody,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RpcTransactionMeta {
    #[serde(default)]
    pub err: Option<serde_json::Value>,
    #[serde(default)]
    pub pre_balances: Vec<u64>,
    #[serde(default)]
    pub post_balances: Vec<u64>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RpcTransactionBody {
    pub message: RpcMessage,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RpcMessage {
    pub account_keys: Vec<AccountKey>,
}

/// `json` encoding returns bare strings, `jsonParsed` returns objects.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum AccountKey {
    Plain(String),
    Parsed { pubkey: String },
}

impl AccountKey {
    fn into_pubkey(self) -> String {
        match self {
            AccountKey::Plain(key) | AccountKey::Parsed { pubkey: key } => key,
        }
    }
}

impl From<RpcTransaction> for ChainTransaction {
    fn from(tx: RpcTransaction) -> Self {
        let account_keys = tx
            .transaction
            .message
            .account_keys
            .into_iter()
            .map(AccountKey::into_pubkey)
            .collect();
        match tx.meta {
            Some(meta) => Self {
                account_keys,
                pre_balances: meta.pre_balances,
                post_balances: meta.post_balances,
                succeeded: meta.err.is_none(),
            },
            // No status metadata means we cannot prove success.
            None => Self {
                account_keys,
                pre_balances: Vec::new(),
                post_balances: Vec::new(),
                succeeded: false,
            },
        }
    }
}
