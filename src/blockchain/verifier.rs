// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! One-shot on-chain payment verification.
//!
//! A payment proof is a transaction signature. It is redeemable at most once:
//! the verifier claims `used-signature:<sig>` in the shared key-value store
//! before touching the chain, and only a fully verified payment keeps the
//! claim. Verification fails closed: RPC errors, timeouts and store failures
//! are rejections, never acceptances.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use super::address::is_valid_address;
use super::client::ChainClient;
use crate::storage::KvStore;

/// Key prefix of redeemed payment signatures in the key-value store.
pub const USED_SIGNATURE_PREFIX: &str = "used-signature:";

/// Why a payment proof was not accepted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PaymentRejection {
    #[error("no program id configured for on-chain payments")]
    NotConfigured,

    #[error("empty transaction signature")]
    EmptySignature,

    #[error("invalid payer address: {0}")]
    InvalidPayer(String),

    #[error("signature already redeemed")]
    AlreadyRedeemed,

    #[error("transaction not found on chain")]
    TransactionNotFound,

    #[error("transaction failed on chain")]
    FailedOnChain,

    #[error("transaction does not involve program {0}")]
    WrongProgram(String),

    #[error("payer mismatch: expected {expected}, found {found}")]
    PayerMismatch { expected: String, found: String },

    #[error("insufficient payment: paid {paid}, required {required}")]
    Underpaid { paid: u64, required: u64 },

    /// Chain RPC failed or timed out
    #[error("chain RPC failure: {0}")]
    Rpc(String),

    #[error("replay store failure: {0}")]
    Store(String),
}

pub struct PaymentVerifier {
    chain: Arc<dyn ChainClient>,
    kv: Arc<dyn KvStore>,
    program_id: Option<String>,
    rpc_timeout: Duration,
}

impl PaymentVerifier {
    pub fn new(
        chain: Arc<dyn ChainClient>,
        kv: Arc<dyn KvStore>,
        program_id: Option<String>,
        rpc_timeout: Duration,
    ) -> Self {
        Self {
            chain,
            kv,
            program_id,
            rpc_timeout,
        }
    }

    /// Fail-closed boolean wrapper around [`check`](Self::check).
    pub async fn verify(
        &self,
        signature: &str,
        capability: &str,
        price: u64,
        payer: &str,
    ) -> bool {
        self.check(signature, capability, price, payer).await.is_ok()
    }

    /// Verify a payment proof and consume it.
    ///
    /// Checks, in order: payer format, replay claim, transaction exists and
    /// succeeded, program involvement, payer identity, amount. The replay
    /// claim is released again if any later check fails.
    pub async fn check(
        &self,
        signature: &str,
        capability: &str,
        price: u64,
        payer: &str,
    ) -> Result<(), PaymentRejection> {
        let result = self.check_inner(signature, price, payer).await;
        match &result {
            Ok(()) => info!(
                signature = %signature,
                capability = %capability,
                payer = %payer,
                price,
                "Payment verified"
            ),
            Err(reason) => warn!(
                signature = %signature,
                capability = %capability,
                payer = %payer,
                price,
                reason = %reason,
                "Payment rejected"
            ),
        }
        result
    }

    async fn check_inner(
        &self,
        signature: &str,
        price: u64,
        payer: &str,
    ) -> Result<(), PaymentRejection> {
        let program_id = self
            .program_id
            .as_deref()
            .ok_or(PaymentRejection::NotConfigured)?;
        if signature.trim().is_empty() {
            return Err(PaymentRejection::EmptySignature);
        }
        if !is_valid_address(payer) {
            return Err(PaymentRejection::InvalidPayer(payer.to_string()));
        }

        let claim_key = format!("{USED_SIGNATURE_PREFIX}{signature}");
        let claimed = self
            .kv
            .insert_if_absent(&claim_key, payer, None)
            .map_err(|e| PaymentRejection::Store(e.to_string()))?;
        if !claimed {
            return Err(PaymentRejection::AlreadyRedeemed);
        }

        let result = self.check_on_chain(signature, program_id, price, payer).await;
        if result.is_err() {
            self.release(signature);
        }
        result
    }

    /// Drop the replay claim on `signature` so it can be redeemed again.
    pub fn release(&self, signature: &str) {
        let claim_key = format!("{USED_SIGNATURE_PREFIX}{signature}");
        match self.kv.remove(&claim_key) {
            Ok(_) => debug!(signature = %signature, "Released payment claim"),
            Err(e) => warn!(
                signature = %signature,
                error = %e,
                "Failed to release payment claim"
            ),
        }
    }

    async fn check_on_chain(
        &self,
        signature: &str,
        program_id: &str,
        price: u64,
        payer: &str,
    ) -> Result<(), PaymentRejection> {
        let tx = tokio::time::timeout(self.rpc_timeout, self.chain.get_transaction(signature))
            .await
            .map_err(|_| {
                PaymentRejection::Rpc(format!("timed out after {:?}", self.rpc_timeout))
            })?
            .map_err(|e| PaymentRejection::Rpc(e.to_string()))?
            .ok_or(PaymentRejection::TransactionNotFound)?;

        if !tx.succeeded {
            return Err(PaymentRejection::FailedOnChain);
        }
        if !tx.touches(program_id) {
            return Err(PaymentRejection::WrongProgram(program_id.to_string()));
        }
        let found = tx.payer().unwrap_or_default();
        if found != payer {
            return Err(PaymentRejection::PayerMismatch {
                expected: payer.to_string(),
                found: found.to_string(),
            });
        }
        let paid = tx.payer_debit();
        if paid < price {
            return Err(PaymentRejection::Underpaid {
                paid,
                required: price,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryKv;
    use crate::testing::{payment_tx, MockChain, PROGRAM_ID, W1, W2};

    fn make_verifier(chain: MockChain) -> (PaymentVerifier, Arc<MemoryKv>) {
        let kv = Arc::new(MemoryKv::new());
        let verifier = PaymentVerifier::new(
            Arc::new(chain),
            kv.clone(),
            Some(PROGRAM_ID.to_string()),
            Duration::from_millis(200),
        );
        (verifier, kv)
    }

    #[tokio::test]
    async fn signature_redeemable_once() {
        let (verifier, _kv) = make_verifier(MockChain::new().with_payment("sig-123", W2, 2000));

        assert!(verifier.verify("sig-123", "story", 2000, W2).await);
        assert!(!verifier.verify("sig-123", "story", 2000, W2).await);
        assert_eq!(
            verifier.check("sig-123", "story", 2000, W2).await,
            Err(PaymentRejection::AlreadyRedeemed)
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_redemption_has_one_winner() {
        let (verifier, _kv) = make_verifier(MockChain::new().with_payment("sig-123", W2, 2000));
        let verifier = Arc::new(verifier);

        let barrier = Arc::new(tokio::sync::Barrier::new(8));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let verifier = verifier.clone();
                let barrier = barrier.clone();
                tokio::spawn(async move {
                    barrier.wait().await;
                    verifier.verify("sig-123", "story", 2000, W2).await
                })
            })
            .collect();

        let mut accepted = 0;
        for handle in handles {
            if handle.await.unwrap() {
                accepted += 1;
            }
        }
        assert_eq!(accepted, 1);
    }

    #[tokio::test]
    async fn rejects_each_failed_check() {
        let mut failed = payment_tx(W2, PROGRAM_ID, 5000);
        failed.succeeded = false;
        let chain = MockChain::new()
            .with_payment("cheap", W2, 100)
            .with_payment("other-payer", W1, 5000)
            .with_transaction("failed", failed)
            .with_transaction("elsewhere", payment_tx(W2, W1, 5000));
        let (verifier, _kv) = make_verifier(chain);

        assert_eq!(
            verifier.check("missing", "story", 2000, W2).await,
            Err(PaymentRejection::TransactionNotFound)
        );
        assert_eq!(
            verifier.check("failed", "story", 2000, W2).await,
            Err(PaymentRejection::FailedOnChain)
        );
        assert!(matches!(
            verifier.check("elsewhere", "story", 2000, W2).await,
            Err(PaymentRejection::WrongProgram(_))
        ));
        assert!(matches!(
            verifier.check("other-payer", "story", 2000, W2).await,
            Err(PaymentRejection::PayerMismatch { .. })
        ));
        assert_eq!(
            verifier.check("cheap", "story", 2000, W2).await,
            Err(PaymentRejection::Underpaid { paid: 100, required: 2000 })
        );
    }

    #[tokio::test]
    async fn failed_check_releases_claim() {
        let (verifier, kv) = make_verifier(MockChain::new().with_payment("sig-1", W2, 2000));

        // Wrong payer: rejected, but the signature is not burned
        assert!(!verifier.verify("sig-1", "story", 2000, W1).await);
        assert_eq!(kv.get("used-signature:sig-1").unwrap(), None);

        assert!(verifier.verify("sig-1", "story", 2000, W2).await);
        assert_eq!(kv.get("used-signature:sig-1").unwrap().as_deref(), Some(W2));
    }

    #[tokio::test]
    async fn released_claim_can_be_redeemed_again() {
        let (verifier, kv) = make_verifier(MockChain::new().with_payment("sig-1", W2, 2000));
        assert!(verifier.verify("sig-1", "story", 2000, W2).await);

        verifier.release("sig-1");
        assert_eq!(kv.get("used-signature:sig-1").unwrap(), None);
        assert!(verifier.verify("sig-1", "story", 2000, W2).await);
    }

    #[tokio::test]
    async fn invalid_payer_never_reaches_chain() {
        let (verifier, kv) = make_verifier(MockChain::new().with_payment("sig-1", W2, 2000));
        assert!(matches!(
            verifier.check("sig-1", "story", 2000, "not-a-wallet").await,
            Err(PaymentRejection::InvalidPayer(_))
        ));
        assert_eq!(kv.get("used-signature:sig-1").unwrap(), None);
    }

    #[tokio::test]
    async fn rpc_failure_and_timeout_fail_closed() {
        let (verifier, _kv) = make_verifier(MockChain::unreachable());
        assert!(matches!(
            verifier.check("sig-1", "story", 2000, W2).await,
            Err(PaymentRejection::Rpc(_))
        ));

        let slow = MockChain::new()
            .with_payment("sig-2", W2, 2000)
            .with_delay(Duration::from_secs(5));
        let (verifier, kv) = make_verifier(slow);
        assert!(matches!(
            verifier.check("sig-2", "story", 2000, W2).await,
            Err(PaymentRejection::Rpc(_))
        ));
        assert_eq!(kv.get("used-signature:sig-2").unwrap(), None);
    }

    #[tokio::test]
    async fn unconfigured_program_rejects_everything() {
        let verifier = PaymentVerifier::new(
            Arc::new(MockChain::new().with_payment("sig-1", W2, 2000)),
            Arc::new(MemoryKv::new()),
            None,
            Duration::from_secs(1),
        );
        assert_eq!(
            verifier.check("sig-1", "story", 2000, W2).await,
            Err(PaymentRejection::NotConfigured)
        );
    }
}
