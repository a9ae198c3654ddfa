// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;
use std::time::Duration;

use crate::auth::{ApiKeyRegistry, SessionManager};
use crate::escrow::EscrowLedger;
use crate::gateway::CapabilityRouter;
use crate::storage::{KvStore, LedgerStore};

/// Shared handler state. Every component is backed by the same ledger file.
#[derive(Clone)]
pub struct AppState {
    pub ledger: Arc<LedgerStore>,
    pub escrow: EscrowLedger,
    pub sessions: Arc<SessionManager>,
    pub api_keys: ApiKeyRegistry,
    pub router: Arc<CapabilityRouter>,
}

impl AppState {
    pub fn new(ledger: Arc<LedgerStore>, router: Arc<CapabilityRouter>) -> Self {
        let kv: Arc<dyn KvStore> = ledger.clone();
        Self {
            escrow: EscrowLedger::new(ledger.clone()),
            sessions: Arc::new(SessionManager::new(kv)),
            api_keys: ApiKeyRegistry::new(ledger.clone()),
            ledger,
            router,
        }
    }

    pub fn with_session_ttl(mut self, ttl: Duration) -> Self {
        let kv: Arc<dyn KvStore> = self.ledger.clone();
        self.sessions = Arc::new(SessionManager::new(kv).with_ttl(ttl));
        self
    }
}
