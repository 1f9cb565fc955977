//! Execution Submitter
//!
//! Drives the best candidate of a cycle through
//! calldata -> signed legacy tx -> private relay (if configured) or public
//! broadcast -> execution row. Every attempt that gets past the
//! configuration check ends in exactly one store row and one risk outcome.
//!
//! A relay failure never surfaces as an error: the transaction goes out
//! publicly and the row carries `fallback_reason`.
//!
//! Created: 2026-02-05
//! Modified: 2026-02-06 - fallback_reason and gas price on execution rows

use super::calldata::{build_calldata, deadline, min_return, CalldataError};
use super::relay::RelayClient;
use crate::chain::ChainClient;
use crate::config::StrategyConfig;
use crate::risk::RiskManager;
use crate::routing::Candidate;
use crate::store::ArbStore;
use crate::types::{ExecutionRecord, ExecutionStatus};
use alloy::consensus::{SignableTransaction, TxEnvelope, TxLegacy};
use alloy::eips::eip2718::Encodable2718;
use alloy::network::TxSignerSync;
use alloy::primitives::{Address, Bytes, TxKind, B256, U256};
use alloy::signers::local::PrivateKeySigner;
use chrono::Utc;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("calldata: {0}")]
    Calldata(#[from] CalldataError),
    #[error("chain query failed: {0}")]
    Chain(String),
    #[error("signing failed: {0}")]
    Sign(String),
    #[error("broadcast failed: {0}")]
    Broadcast(String),
}

/// Why execution did not happen at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    MissingSigningKey,
    MissingExecutor,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    Skipped(SkipReason),
    Submitted {
        tx_hash: B256,
        private_sent: bool,
        fallback_reason: Option<String>,
    },
    Failed {
        reason: String,
    },
}

impl SubmitOutcome {
    /// Label used for metrics.
    pub fn status(&self) -> &'static str {
        match self {
            SubmitOutcome::Skipped(_) => "skipped",
            SubmitOutcome::Submitted { .. } => "pending",
            SubmitOutcome::Failed { .. } => "failed",
        }
    }
}

/// Where the raw transaction ended up.
struct Broadcast {
    tx_hash: B256,
    private_sent: bool,
    fallback_reason: Option<String>,
}

pub struct ExecutionSubmitter {
    signer: Option<PrivateKeySigner>,
    executor: Option<Address>,
    relay: Arc<dyn RelayClient>,
    slippage_bps: u32,
    deadline_secs: u64,
    gas_limit: u64,
    flashloan: bool,
}

impl ExecutionSubmitter {
    /// An unparseable key is treated like a missing one.
    pub fn new(
        strategy: &StrategyConfig,
        signing_key: Option<&str>,
        executor: Option<Address>,
        relay: Arc<dyn RelayClient>,
    ) -> Self {
        let signer = signing_key.and_then(|k| match k.trim().parse::<PrivateKeySigner>() {
            Ok(s) => Some(s),
            Err(e) => {
                warn!("Signing key is not a valid private key ({}); execution disabled", e);
                None
            }
        });

        Self {
            signer,
            executor,
            relay,
            slippage_bps: strategy.slippage_bps,
            deadline_secs: strategy.deadline_secs,
            gas_limit: strategy.gas_limit,
            flashloan: strategy.flashloan.enabled,
        }
    }

    pub fn searcher_address(&self) -> Option<Address> {
        self.signer.as_ref().map(|s| s.address())
    }

    pub fn is_armed(&self) -> bool {
        self.signer.is_some() && self.executor.is_some()
    }

    pub async fn submit(
        &self,
        chain: &str,
        client: &dyn ChainClient,
        private_relay_url: Option<&str>,
        candidate: &Candidate,
        risk: &mut RiskManager,
        store: &dyn ArbStore,
    ) -> SubmitOutcome {
        let (signer, executor) = match (&self.signer, self.executor) {
            (None, _) => {
                warn!("[{}] No signing key configured, skipping execution", chain);
                return SubmitOutcome::Skipped(SkipReason::MissingSigningKey);
            }
            (_, None) => {
                warn!("[{}] No executor contract configured, skipping execution", chain);
                return SubmitOutcome::Skipped(SkipReason::MissingExecutor);
            }
            (Some(s), Some(e)) => (s, e),
        };

        let gas_price = risk.optimal_gas_price(client).await;
        let gas_price_gwei = gas_price as f64 / 1e9;
        let profit_usd = candidate.score.profit_usd;

        let attempt = self
            .send(signer, executor, client, private_relay_url, candidate, gas_price)
            .await;

        let (record, outcome) = match attempt {
            Ok(b) => {
                info!(
                    "[{}] Submitted {:?} (private={}, gas {:.3} gwei, est. profit ${:.4})",
                    chain, b.tx_hash, b.private_sent, gas_price_gwei, profit_usd
                );
                risk.record_outcome(true);
                (
                    ExecutionRecord {
                        ts: Utc::now(),
                        chain: chain.to_string(),
                        tx_hash: Some(b.tx_hash),
                        private_sent: b.private_sent,
                        status: ExecutionStatus::Pending,
                        gas_used: None,
                        gas_price_gwei: Some(gas_price_gwei),
                        profit_usd: Some(profit_usd),
                        reason: None,
                        fallback_reason: b.fallback_reason.clone(),
                    },
                    SubmitOutcome::Submitted {
                        tx_hash: b.tx_hash,
                        private_sent: b.private_sent,
                        fallback_reason: b.fallback_reason,
                    },
                )
            }
            Err(e) => {
                let reason = e.to_string();
                warn!("[{}] Execution failed: {}", chain, reason);
                risk.record_outcome(false);
                (
                    ExecutionRecord {
                        ts: Utc::now(),
                        chain: chain.to_string(),
                        tx_hash: None,
                        private_sent: false,
                        status: ExecutionStatus::Failed,
                        gas_used: None,
                        gas_price_gwei: Some(gas_price_gwei),
                        profit_usd: Some(profit_usd),
                        reason: Some(reason.clone()),
                        fallback_reason: None,
                    },
                    SubmitOutcome::Failed { reason },
                )
            }
        };

        if let Err(e) = store.insert_execution(&record).await {
            warn!("[{}] Failed to record execution: {:#}", chain, e);
        }
        outcome
    }

    async fn send(
        &self,
        signer: &PrivateKeySigner,
        executor: Address,
        client: &dyn ChainClient,
        private_relay_url: Option<&str>,
        candidate: &Candidate,
        gas_price: u128,
    ) -> Result<Broadcast, SubmitError> {
        let now = Utc::now().timestamp().max(0) as u64;
        let calldata = build_calldata(
            &candidate.route,
            candidate.amount_in,
            min_return(candidate.amount_out, self.slippage_bps)?,
            deadline(now, self.deadline_secs),
            self.flashloan,
        )?;

        let chain_id = client
            .chain_id()
            .await
            .map_err(|e| SubmitError::Chain(format!("{:#}", e)))?;
        let nonce = client
            .nonce(signer.address())
            .await
            .map_err(|e| SubmitError::Chain(format!("{:#}", e)))?;

        let raw = sign_legacy(signer, chain_id, nonce, gas_price, self.gas_limit, executor, calldata)?;

        let mut fallback_reason = None;
        if let Some(url) = private_relay_url {
            match self.relay.send_private(url, &raw).await {
                Ok(Some(tx_hash)) => {
                    return Ok(Broadcast {
                        tx_hash,
                        private_sent: true,
                        fallback_reason: None,
                    })
                }
                Ok(None) => fallback_reason = Some("private relay returned no result".to_string()),
                Err(e) => fallback_reason = Some(format!("private relay failed: {:#}", e)),
            }
        }

        let tx_hash = client
            .send_raw_transaction(raw)
            .await
            .map_err(|e| SubmitError::Broadcast(format!("{:#}", e)))?;

        Ok(Broadcast {
            tx_hash,
            private_sent: false,
            fallback_reason,
        })
    }
}

/// EIP-155 legacy transaction to the executor, EIP-2718 encoded.
pub fn sign_legacy(
    signer: &PrivateKeySigner,
    chain_id: u64,
    nonce: u64,
    gas_price: u128,
    gas_limit: u64,
    to: Address,
    input: Bytes,
) -> Result<Bytes, SubmitError> {
    let mut tx = TxLegacy {
        chain_id: Some(chain_id),
        nonce,
        gas_price,
        gas_limit,
        to: TxKind::Call(to),
        value: U256::ZERO,
        input,
    };
    let sig = TxSignerSync::sign_transaction_sync(signer, &mut tx)
        .map_err(|e| SubmitError::Sign(e.to_string()))?;
    let signed: TxEnvelope = tx.into_signed(sig).into();
    Ok(Bytes::from(signed.encoded_2718()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{RiskConfig, StrategyConfig};
    use crate::quotes::testing::MockChain;
    use crate::routing::legs::encode_path;
    use crate::store::JsonlStore;
    use crate::types::{DexKind, Leg, Route, RoutePolicy, RouteScore};
    use alloy::consensus::TxEnvelope;
    use alloy::eips::eip2718::Decodable2718;
    use anyhow::{anyhow, Result};
    use async_trait::async_trait;
    use std::env;
    use std::fs;
    use std::sync::Mutex;

    const TEST_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    enum RelayBehaviour {
        NoResult,
        Accept(B256),
        Error,
    }

    struct FakeRelay {
        behaviour: RelayBehaviour,
        sent: Mutex<Vec<String>>,
    }

    impl FakeRelay {
        fn new(behaviour: RelayBehaviour) -> Arc<Self> {
            Arc::new(Self {
                behaviour,
                sent: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl RelayClient for FakeRelay {
        async fn send_private(&self, url: &str, _raw: &Bytes) -> Result<Option<B256>> {
            self.sent.lock().unwrap().push(url.to_string());
            match self.behaviour {
                RelayBehaviour::NoResult => Ok(None),
                RelayBehaviour::Accept(h) => Ok(Some(h)),
                RelayBehaviour::Error => Err(anyhow!("connection refused")),
            }
        }
    }

    fn addr(b: u8) -> Address {
        Address::repeat_byte(b)
    }

    fn candidate() -> Candidate {
        let leg = |a: u8, b: u8, pool: u8| {
            Leg::new(
                DexKind::ConcentratedLiquidity,
                addr(0xEE),
                encode_path(&[addr(a), addr(b)], &[500]).unwrap(),
                addr(a),
                addr(b),
                addr(pool),
                2e5,
            )
            .unwrap()
        };
        let route = Route::new(vec![leg(1, 2, 10), leg(2, 3, 11), leg(3, 1, 12)], RoutePolicy::default()).unwrap();
        Candidate {
            route,
            amount_in: U256::from(1_000_000u64),
            amount_out: U256::from(1_005_000u64),
            amount_in_usd: 1.0,
            amount_out_usd: 1.005,
            score: RouteScore {
                profit_usd: 0.004,
                gas_usd: 0.001,
                flash_fee_usd: 0.0,
                tvl_usd: 2e5,
                allowed: true,
            },
        }
    }

    fn submitter(relay: Arc<dyn RelayClient>, key: Option<&str>, executor: Option<Address>) -> ExecutionSubmitter {
        ExecutionSubmitter::new(&StrategyConfig::default(), key, executor, relay)
    }

    fn chain() -> MockChain {
        MockChain {
            chain_id: 8453,
            ..Default::default()
        }
    }

    fn fresh_store(name: &str) -> (JsonlStore, std::path::PathBuf) {
        let dir = env::temp_dir().join(name);
        let _ = fs::remove_dir_all(&dir);
        (JsonlStore::open(&dir).unwrap(), dir)
    }

    #[tokio::test]
    async fn test_relay_without_result_falls_back_to_public() {
        let relay = FakeRelay::new(RelayBehaviour::NoResult);
        let sub = submitter(relay.clone(), Some(TEST_KEY), Some(addr(0xCC)));
        let client = chain();
        let mut risk = RiskManager::new(RiskConfig::default());
        let (store, dir) = fresh_store("cyclearb_submit_fallback");

        let outcome = sub
            .submit("base", &client, Some("https://relay.example"), &candidate(), &mut risk, &store)
            .await;

        let broadcasts = client.broadcasts.lock().unwrap().clone();
        assert_eq!(broadcasts.len(), 1);
        match &outcome {
            SubmitOutcome::Submitted { tx_hash, private_sent, fallback_reason } => {
                assert_eq!(*tx_hash, alloy::primitives::keccak256(&broadcasts[0]));
                assert!(!private_sent);
                assert!(fallback_reason.is_some());
            }
            other => panic!("unexpected outcome {:?}", other),
        }
        assert_eq!(relay.sent.lock().unwrap().len(), 1);

        let rows = store.get_recent_executions("base", 10).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].status, ExecutionStatus::Pending);
        assert!(!rows[0].private_sent);
        assert!(rows[0].fallback_reason.is_some());
        // fee history unavailable -> configured cap of 50 gwei
        assert_eq!(rows[0].gas_price_gwei, Some(50.0));
        assert_eq!(risk.outcome_samples(), 1);

        let _ = fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_relay_error_falls_back_to_public() {
        let relay = FakeRelay::new(RelayBehaviour::Error);
        let sub = submitter(relay, Some(TEST_KEY), Some(addr(0xCC)));
        let client = chain();
        let mut risk = RiskManager::new(RiskConfig::default());
        let outcome = sub
            .submit("base", &client, Some("https://relay.example"), &candidate(), &mut risk, &crate::store::NullStore)
            .await;
        match outcome {
            SubmitOutcome::Submitted { private_sent, fallback_reason, .. } => {
                assert!(!private_sent);
                assert!(fallback_reason.unwrap().contains("connection refused"));
            }
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_private_accept_skips_public() {
        let hash = B256::repeat_byte(0x77);
        let relay = FakeRelay::new(RelayBehaviour::Accept(hash));
        let sub = submitter(relay, Some(TEST_KEY), Some(addr(0xCC)));
        let client = chain();
        let mut risk = RiskManager::new(RiskConfig::default());
        let outcome = sub
            .submit("base", &client, Some("https://relay.example"), &candidate(), &mut risk, &crate::store::NullStore)
            .await;
        assert_eq!(
            outcome,
            SubmitOutcome::Submitted {
                tx_hash: hash,
                private_sent: true,
                fallback_reason: None
            }
        );
        assert!(client.broadcasts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_no_relay_goes_public_without_reason() {
        let relay = FakeRelay::new(RelayBehaviour::Accept(B256::ZERO));
        let sub = submitter(relay.clone(), Some(TEST_KEY), Some(addr(0xCC)));
        let client = chain();
        let mut risk = RiskManager::new(RiskConfig::default());
        let outcome = sub
            .submit("base", &client, None, &candidate(), &mut risk, &crate::store::NullStore)
            .await;
        match outcome {
            SubmitOutcome::Submitted { private_sent, fallback_reason, .. } => {
                assert!(!private_sent);
                assert!(fallback_reason.is_none());
            }
            other => panic!("unexpected outcome {:?}", other),
        }
        assert!(relay.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_broadcast_failure_records_failed_row() {
        let relay = FakeRelay::new(RelayBehaviour::NoResult);
        let sub = submitter(relay, Some(TEST_KEY), Some(addr(0xCC)));
        let client = MockChain {
            chain_id: 8453,
            fail_broadcast: true,
            ..Default::default()
        };
        let mut risk = RiskManager::new(RiskConfig::default());
        let (store, dir) = fresh_store("cyclearb_submit_failed");

        let outcome = sub.submit("base", &client, None, &candidate(), &mut risk, &store).await;
        match outcome {
            SubmitOutcome::Failed { reason } => assert!(reason.contains("nonce too low")),
            other => panic!("unexpected outcome {:?}", other),
        }
        let rows = store.get_recent_executions("base", 10).await.unwrap();
        assert_eq!(rows[0].status, ExecutionStatus::Failed);
        assert!(rows[0].tx_hash.is_none());
        assert!(rows[0].reason.as_deref().unwrap_or("").contains("nonce too low"));
        assert_eq!(risk.outcome_samples(), 1);

        let _ = fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_missing_key_or_executor_is_noop() {
        let client = chain();
        let mut risk = RiskManager::new(RiskConfig::default());

        let no_key = submitter(FakeRelay::new(RelayBehaviour::NoResult), None, Some(addr(0xCC)));
        let out = no_key
            .submit("base", &client, None, &candidate(), &mut risk, &crate::store::NullStore)
            .await;
        assert_eq!(out, SubmitOutcome::Skipped(SkipReason::MissingSigningKey));

        let no_exec = submitter(FakeRelay::new(RelayBehaviour::NoResult), Some(TEST_KEY), None);
        let out = no_exec
            .submit("base", &client, None, &candidate(), &mut risk, &crate::store::NullStore)
            .await;
        assert_eq!(out, SubmitOutcome::Skipped(SkipReason::MissingExecutor));

        let bad_key = submitter(FakeRelay::new(RelayBehaviour::NoResult), Some("not-a-key"), Some(addr(0xCC)));
        assert!(!bad_key.is_armed());

        assert_eq!(risk.outcome_samples(), 0);
        assert!(client.broadcasts.lock().unwrap().is_empty());
    }

    #[test]
    fn test_signed_tx_targets_executor() {
        let signer: PrivateKeySigner = TEST_KEY.parse().unwrap();
        let raw = sign_legacy(&signer, 8453, 7, 1_000_000_000, 500_000, addr(0xCC), Bytes::from(vec![1, 2, 3])).unwrap();
        let env = TxEnvelope::decode_2718(&mut raw.as_ref()).unwrap();
        match env {
            TxEnvelope::Legacy(signed) => {
                let tx = signed.tx();
                assert_eq!(tx.chain_id, Some(8453));
                assert_eq!(tx.nonce, 7);
                assert_eq!(tx.gas_limit, 500_000);
                assert_eq!(tx.to, TxKind::Call(addr(0xCC)));
                assert_eq!(tx.input, Bytes::from(vec![1, 2, 3]));
            }
            other => panic!("expected legacy tx, got {:?}", other.tx_type()),
        }
    }
}
