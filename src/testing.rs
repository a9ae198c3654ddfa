// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Shared fixtures for unit and handler tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tempfile::TempDir;

use crate::blockchain::{ChainClient, ChainClientError, ChainTransaction, PaymentVerifier};
use crate::gateway::{Capability, CapabilityError, CapabilityRegistry, CapabilityRouter, Params};
use crate::providers::{CompletionRequest, LanguageModel, LlmError};
use crate::state::AppState;
use crate::storage::{KvStore, LedgerStore, LEDGER_DB_FILE};

/// Program every test payment goes to.
pub const PROGRAM_ID: &str = "TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA";
pub const W1: &str = "So11111111111111111111111111111111111111112";
pub const W2: &str = "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v";

/// A successful transfer of `lamports` from `payer` that touches `program`.
pub fn payment_tx(payer: &str, program: &str, lamports: u64) -> ChainTransaction {
    ChainTransaction {
        account_keys: vec![payer.to_string(), program.to_string()],
        pre_balances: vec![lamports + 10_000, 0],
        post_balances: vec![10_000, lamports],
        succeeded: true,
    }
}

// =============================================================================
// Chain
// =============================================================================

/// In-memory chain keyed by signature.
#[derive(Default)]
pub struct MockChain {
    transactions: HashMap<String, ChainTransaction>,
    unreachable: bool,
    delay: Option<Duration>,
}

impl MockChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every lookup fails with a transport error.
    pub fn unreachable() -> Self {
        Self {
            unreachable: true,
            ..Self::default()
        }
    }

    pub fn with_payment(self, signature: &str, payer: &str, lamports: u64) -> Self {
        self.with_transaction(signature, payment_tx(payer, PROGRAM_ID, lamports))
    }

    pub fn with_transaction(mut self, signature: &str, tx: ChainTransaction) -> Self {
        self.transactions.insert(signature.to_string(), tx);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[async_trait]
impl ChainClient for MockChain {
    async fn get_transaction(&self, signature: &str) -> Result<Option<ChainTransaction>, ChainClientError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.unreachable {
            return Err(ChainClientError::Http("connection refused".to_string()));
        }
        Ok(self.transactions.get(signature).cloned())
    }
}

// =============================================================================
// Capabilities
// =============================================================================

/// Echoes its parameters. Rejects any parameter set containing `invalid`.
pub struct StubCapability {
    name: String,
    price: u64,
    failing: bool,
    delay: Option<Duration>,
}

impl StubCapability {
    pub fn new(name: &str, price: u64) -> Self {
        Self {
            name: name.to_string(),
            price,
            failing: false,
            delay: None,
        }
    }

    pub fn failing(mut self) -> Self {
        self.failing = true;
        self
    }

    pub fn slow(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[async_trait]
impl Capability for StubCapability {
    fn name(&self) -> &str {
        &self.name
    }

    fn price(&self) -> u64 {
        self.price
    }

    fn validate(&self, params: &Params) -> Result<(), CapabilityError> {
        if params.contains_key("invalid") {
            return Err(CapabilityError::InvalidParams("invalid parameter".to_string()));
        }
        Ok(())
    }

    async fn call(&self, params: &Params) -> Result<Params, CapabilityError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing {
            return Err(CapabilityError::Provider("upstream exploded".to_string()));
        }
        let mut result = Params::new();
        result.insert("echo".into(), Value::Object(params.clone()));
        Ok(result)
    }
}

/// Language model returning a fixed answer and remembering the last request.
pub struct ScriptedModel {
    answer: Option<String>,
    last: Mutex<Option<CompletionRequest>>,
}

impl ScriptedModel {
    pub fn new(answer: &str) -> Self {
        Self {
            answer: Some(answer.to_string()),
            last: Mutex::new(None),
        }
    }

    pub fn failing() -> Self {
        Self {
            answer: None,
            last: Mutex::new(None),
        }
    }

    pub fn last_request(&self) -> Option<CompletionRequest> {
        self.last.lock().unwrap().clone()
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn complete(&self, request: CompletionRequest) -> Result<String, LlmError> {
        *self.last.lock().unwrap() = Some(request);
        self.answer
            .clone()
            .ok_or_else(|| LlmError::Request("model offline".to_string()))
    }
}

// =============================================================================
// Wiring
// =============================================================================

/// Ledger on a throwaway file. Keep the `TempDir` alive for the test.
pub fn test_ledger() -> (Arc<LedgerStore>, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let store = LedgerStore::open(&dir.path().join(LEDGER_DB_FILE)).unwrap();
    (Arc::new(store), dir)
}

/// Router with `translator` (1000), `story` (2000), `flaky` (10, always
/// fails) and `slow` (10, exceeds the provider timeout).
pub fn test_router(ledger: Arc<LedgerStore>, chain: MockChain) -> CapabilityRouter {
    let registry = CapabilityRegistry::new()
        .register(Arc::new(StubCapability::new("translator", 1000)))
        .register(Arc::new(StubCapability::new("story", 2000)))
        .register(Arc::new(StubCapability::new("flaky", 10).failing()))
        .register(Arc::new(StubCapability::new("slow", 10).slow(Duration::from_secs(5))));

    let kv: Arc<dyn KvStore> = ledger.clone();
    let verifier = PaymentVerifier::new(
        Arc::new(chain),
        kv,
        Some(PROGRAM_ID.to_string()),
        Duration::from_millis(200),
    );

    CapabilityRouter::new(registry, ledger, Arc::new(verifier))
        .with_provider_timeout(Duration::from_millis(200))
}

/// Fully wired state. The chain knows `sig-123`, a 2000 lamport payment by `W2`.
pub fn test_state() -> (AppState, TempDir) {
    let (ledger, dir) = test_ledger();
    let router = test_router(ledger.clone(), MockChain::new().with_payment("sig-123", W2, 2000));
    (AppState::new(ledger, Arc::new(router)), dir)
}
