// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Capability Gateway - Payment-Gated Access to Priced Capabilities
//!
//! Callers authenticate with a wallet session or an API key and pay for each
//! capability call either from an escrow balance or with a one-shot on-chain
//! payment proof.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `auth` - Sessions, API keys and the credential extractor
//! - `blockchain` - Address validation, chain RPC and payment verification
//! - `escrow` - Escrow balance ledger
//! - `gateway` - Capability registry and router
//! - `providers` - Language-model backed capabilities
//! - `storage` - Ledger store (redb)

pub mod api;
pub mod auth;
pub mod blockchain;
pub mod config;
pub mod error;
pub mod escrow;
pub mod gateway;
pub mod models;
pub mod providers;
pub mod state;
pub mod storage;

#[cfg(test)]
pub(crate) mod testing;
