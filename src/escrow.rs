// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Escrow ledger: per-wallet custodial balance.
//!
//! Balances are never negative. Every mutation writes one escrow log entry in
//! the same store transaction as the balance update.

use std::sync::Arc;

use tracing::{info, warn};

use crate::error::GatewayError;
use crate::storage::{EscrowEntry, LedgerStore, StoreError};

#[derive(Clone)]
pub struct EscrowLedger {
    store: Arc<LedgerStore>,
}

impl EscrowLedger {
    pub fn new(store: Arc<LedgerStore>) -> Self {
        Self { store }
    }

    /// Current balance; 0 for unknown wallets.
    pub fn balance(&self, wallet: &str) -> Result<u64, GatewayError> {
        Ok(self.store.balance(wallet)?)
    }

    /// Credit the wallet and return the logged entry (with the new balance).
    pub fn deposit(&self, wallet: &str, amount: u64) -> Result<EscrowEntry, GatewayError> {
        if amount == 0 {
            return Err(GatewayError::InvalidRequest(
                "Deposit amount must be greater than zero".into(),
            ));
        }
        let entry = self.store.deposit(wallet, amount)?;
        info!(wallet = %wallet, amount, balance = entry.balance_after, "Escrow deposit");
        Ok(entry)
    }

    /// Debit the wallet. Fails with `InsufficientFunds` and no side effects
    /// if the balance is below `amount`.
    pub fn spend(&self, wallet: &str, amount: u64) -> Result<EscrowEntry, GatewayError> {
        if amount == 0 {
            return Err(GatewayError::InvalidRequest(
                "Spend amount must be greater than zero".into(),
            ));
        }
        match self.store.spend(wallet, amount) {
            Ok(entry) => {
                info!(wallet = %wallet, amount, balance = entry.balance_after, "Escrow spend");
                Ok(entry)
            }
            Err(err @ StoreError::InsufficientFunds { .. }) => {
                warn!(wallet = %wallet, amount, error = %err, "Escrow spend rejected");
                Err(err.into())
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Escrow log, newest first.
    pub fn history(&self, wallet: &str) -> Result<Vec<EscrowEntry>, GatewayError> {
        Ok(self.store.escrow_log(wallet)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::EscrowEntryKind;

    const W1: &str = "So11111111111111111111111111111111111111112";

    fn ledger() -> (EscrowLedger, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = LedgerStore::open(&dir.path().join("escrow.redb")).unwrap();
        (EscrowLedger::new(Arc::new(store)), dir)
    }

    #[test]
    fn balance_of_unknown_wallet_is_zero() {
        let (ledger, _dir) = ledger();
        assert_eq!(ledger.balance(W1).unwrap(), 0);
    }

    #[test]
    fn deposit_then_spend() {
        let (ledger, _dir) = ledger();
        assert_eq!(ledger.deposit(W1, 1000).unwrap().balance_after, 1000);
        assert_eq!(ledger.balance(W1).unwrap(), 1000);
        assert_eq!(ledger.spend(W1, 1000).unwrap().balance_after, 0);
        assert_eq!(ledger.balance(W1).unwrap(), 0);

        let kinds: Vec<_> = ledger.history(W1).unwrap().iter().map(|e| e.kind).collect();
        assert_eq!(kinds.len(), 2);
        assert!(kinds.contains(&EscrowEntryKind::Deposit));
        assert!(kinds.contains(&EscrowEntryKind::Spend));
    }

    #[test]
    fn overspend_is_insufficient_funds() {
        let (ledger, _dir) = ledger();
        ledger.deposit(W1, 50).unwrap();
        let err = ledger.spend(W1, 51).unwrap_err();
        assert!(matches!(
            err,
            GatewayError::InsufficientFunds { required: 51, available: 50 }
        ));
        assert_eq!(ledger.balance(W1).unwrap(), 50);
    }

    #[test]
    fn zero_amounts_are_rejected() {
        let (ledger, _dir) = ledger();
        assert!(matches!(ledger.deposit(W1, 0), Err(GatewayError::InvalidRequest(_))));
        assert!(matches!(ledger.spend(W1, 0), Err(GatewayError::InvalidRequest(_))));
    }

    #[test]
    fn balance_never_negative_across_sequence() {
        let (ledger, _dir) = ledger();
        let ops: [(bool, u64); 6] = [(true, 30), (false, 20), (false, 20), (true, 5), (false, 15), (false, 1)];
        let mut expected: u64 = 0;
        for (is_deposit, amount) in ops {
            if is_deposit {
                ledger.deposit(W1, amount).unwrap();
                expected += amount;
            } else if expected >= amount {
                ledger.spend(W1, amount).unwrap();
                expected -= amount;
            } else {
                assert!(ledger.spend(W1, amount).is_err());
            }
            assert_eq!(ledger.balance(W1).unwrap(), expected);
        }
    }
}
