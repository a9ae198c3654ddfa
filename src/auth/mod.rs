// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Wallet-bound credentials for the gateway API.
//!
//! ## Auth Flow
//!
//! 1. Client posts its wallet address to `POST /v1/session`
//! 2. Gateway returns a session token (24h TTL by default)
//! 3. Client sends `Authorization: Bearer <token>` on later calls, or
//!    creates a named API key and sends `X-API-Key: <key>` instead
//!
//! ## Storage
//!
//! - Sessions live in the ledger's TTL key-value table, shared by every
//!   instance on the same database
//! - API keys live in the ledger's `api_keys` table

pub mod api_keys;
pub mod error;
pub mod extractor;
pub mod session;

pub use api_keys::ApiKeyRegistry;
pub use error::AuthError;
pub use extractor::{Auth, Caller, Credential, DeferredAuth, API_KEY_HEADER};
pub use session::{Session, SessionManager, SessionSweeper, DEFAULT_SESSION_TTL};
