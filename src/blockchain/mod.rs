// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Solana integration.
//!
//! This module provides:
//! - Address validation (base58, 32-byte public keys)
//! - A JSON-RPC client for confirmed transactions
//! - The one-shot payment verifier

pub mod address;
pub mod client;
pub mod types;
pub mod verifier;

pub use address::is_valid_address;
pub use client::{ChainClient, ChainClientError, SolanaRpcClient};
pub use types::ChainTransaction;
pub use verifier::{PaymentRejection, PaymentVerifier, USED_SIGNATURE_PREFIX};
