// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Capability Router
//!
//! Composition root for a paid call:
//!
//! 1. Resolve the capability by name (`NotFound` if unregistered)
//! 2. Validate parameters (`InvalidRequest`, nothing charged)
//! 3. Authorize funds: verify a one-shot on-chain payment when the caller
//!    supplies `tx_signature`, otherwise debit the escrow balance
//! 4. Call the provider under a timeout
//! 5. Complete the transaction and append its usage record
//!
//! A provider failure after step 3 marks the transaction `failed` and keeps
//! the payment. Nothing is refunded. Steps 3 to 5 run detached from the
//! caller; a row still `pending` after a restart is failed by
//! [`LedgerStore::fail_stale_pending`].

pub mod capability;

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::{error, info, warn};

pub use capability::{
    optional_str, required_str, Capability, CapabilityError, CapabilityInfo, CapabilityRegistry,
    Params,
};

use crate::blockchain::{PaymentRejection, PaymentVerifier};
use crate::error::GatewayError;
use crate::storage::{LedgerStore, PaymentMethod, StoreError, StoredTransaction};

/// Default bound on a single provider call.
pub const DEFAULT_PROVIDER_TIMEOUT: Duration = Duration::from_secs(60);

pub struct CapabilityRouter {
    registry: CapabilityRegistry,
    ledger: Arc<LedgerStore>,
    verifier: Arc<PaymentVerifier>,
    provider_timeout: Duration,
}

impl CapabilityRouter {
    pub fn new(
        registry: CapabilityRegistry,
        ledger: Arc<LedgerStore>,
        verifier: Arc<PaymentVerifier>,
    ) -> Self {
        Self {
            registry,
            ledger,
            verifier,
            provider_timeout: DEFAULT_PROVIDER_TIMEOUT,
        }
    }

    pub fn with_provider_timeout(mut self, timeout: Duration) -> Self {
        self.provider_timeout = timeout;
        self
    }

    pub fn capabilities(&self) -> Vec<CapabilityInfo> {
        self.registry.list()
    }

    pub fn has(&self, name: &str) -> bool {
        self.registry.contains(name)
    }

    pub fn price_of(&self, name: &str) -> Option<u64> {
        self.registry.get(name).map(|c| c.price())
    }

    /// Capability transactions of `wallet`, newest first.
    pub fn transaction_history(&self, wallet: &str) -> Result<Vec<StoredTransaction>, GatewayError> {
        Ok(self.ledger.transactions_for_wallet(wallet)?)
    }

    /// Run one paid capability call for `wallet`.
    ///
    /// Returns the provider result extended with `status`, `price`,
    /// `transaction_id` and `tx_verified`. Everything from payment
    /// authorization on runs in its own task, so a dropped caller cannot
    /// leave a charge or a consumed signature without a terminal
    /// transaction status.
    pub async fn route(
        &self,
        wallet: &str,
        capability_name: &str,
        params: Params,
        tx_signature: Option<&str>,
    ) -> Result<Params, GatewayError> {
        let capability = self
            .registry
            .get(capability_name)
            .cloned()
            .ok_or_else(|| {
                GatewayError::NotFound(format!("Capability '{capability_name}' not found"))
            })?;

        capability
            .validate(&params)
            .map_err(|e| GatewayError::InvalidRequest(e.to_string()))?;

        let call = PaidCall {
            capability,
            ledger: self.ledger.clone(),
            verifier: self.verifier.clone(),
            provider_timeout: self.provider_timeout,
            wallet: wallet.to_string(),
            params,
            tx_signature: tx_signature.map(str::to_string),
        };
        tokio::spawn(call.run()).await.map_err(|e| {
            error!(
                wallet = %wallet,
                capability = %capability_name,
                error = %e,
                "Capability task aborted"
            );
            GatewayError::UpstreamFailure(format!("{capability_name}: task aborted"))
        })?
    }
}

/// One authorized call, owned so it can outlive the request that started it.
struct PaidCall {
    capability: Arc<dyn Capability>,
    ledger: Arc<LedgerStore>,
    verifier: Arc<PaymentVerifier>,
    provider_timeout: Duration,
    wallet: String,
    params: Params,
    tx_signature: Option<String>,
}

impl PaidCall {
    async fn run(self) -> Result<Params, GatewayError> {
        let price = self.capability.price();
        let tx = self.authorize(price).await?;

        let outcome =
            tokio::time::timeout(self.provider_timeout, self.capability.call(&self.params)).await;
        let result = match outcome {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => return Err(self.fail(&tx, e.to_string())),
            Err(_) => {
                return Err(self.fail(
                    &tx,
                    format!("timed out after {}s", self.provider_timeout.as_secs_f32()),
                ))
            }
        };

        let input_ref = serde_json::to_string(&self.params)
            .map_err(|e| GatewayError::Storage(e.to_string()))?;
        let output_ref = serde_json::to_string(&result)
            .map_err(|e| GatewayError::Storage(e.to_string()))?;
        let (completed, usage) = self.ledger.complete_with_usage(&tx.id, input_ref, output_ref)?;

        info!(
            wallet = %self.wallet,
            capability = %tx.capability,
            transaction_id = %completed.id,
            usage_id = usage.id,
            amount = price,
            "Capability call completed"
        );

        let mut response = result;
        response.insert("status".into(), Value::from("success"));
        response.insert("price".into(), Value::from(price));
        response.insert("transaction_id".into(), Value::from(completed.id));
        response.insert(
            "tx_verified".into(),
            Value::from(completed.payment == PaymentMethod::OnChain),
        );
        Ok(response)
    }

    /// Authorize `price` and record the pending transaction.
    async fn authorize(&self, price: u64) -> Result<StoredTransaction, GatewayError> {
        let wallet = self.wallet.as_str();
        let capability = self.capability.name();
        match self.tx_signature.as_deref() {
            Some(signature) => {
                self.verifier
                    .check(signature, capability, price, wallet)
                    .await
                    .map_err(rejection_to_error)?;
                let tx = StoredTransaction::new_on_chain(signature, wallet, capability, price);
                match self.ledger.insert_transaction(&tx) {
                    Ok(()) => Ok(tx),
                    // An existing row already accounts for this signature
                    Err(e @ StoreError::Conflict(_)) => Err(e.into()),
                    Err(e) => {
                        error!(
                            signature = %signature,
                            wallet = %wallet,
                            error = %e,
                            "Failed to record verified payment"
                        );
                        self.verifier.release(signature);
                        Err(e.into())
                    }
                }
            }
            None => {
                let tx = StoredTransaction::new_escrow(wallet, capability, price);
                match self.ledger.charge_escrow(&tx) {
                    Ok(balance) => {
                        info!(
                            wallet = %wallet,
                            capability = %capability,
                            amount = price,
                            balance,
                            "Escrow charged"
                        );
                        Ok(tx)
                    }
                    Err(e) => {
                        let err = GatewayError::from(e);
                        warn!(
                            wallet = %wallet,
                            capability = %capability,
                            amount = price,
                            error = %err,
                            "Escrow charge rejected"
                        );
                        Err(err)
                    }
                }
            }
        }
    }

    /// Mark the transaction failed and build the upstream error.
    fn fail(&self, tx: &StoredTransaction, reason: String) -> GatewayError {
        warn!(
            wallet = %tx.wallet_address,
            capability = %tx.capability,
            transaction_id = %tx.id,
            signature = ?tx.signature,
            amount = tx.amount,
            error = %reason,
            "Capability call failed after payment; payment kept"
        );
        if let Err(e) = self.ledger.mark_failed(&tx.id) {
            error!(transaction_id = %tx.id, error = %e, "Failed to mark transaction failed");
        }
        GatewayError::UpstreamFailure(format!("{}: {reason}", tx.capability))
    }
}

fn rejection_to_error(rejection: PaymentRejection) -> GatewayError {
    match rejection {
        PaymentRejection::Rpc(msg) => GatewayError::UpstreamFailure(msg),
        PaymentRejection::Store(msg) => GatewayError::Storage(msg),
        other => GatewayError::PaymentRejected(other.to_string()),
    }
}
