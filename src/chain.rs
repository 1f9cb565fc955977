//! Chain client
//!
//! Every on-chain interaction the pipeline needs, behind one trait so the
//! quote, risk and execution stages can run against in-memory fakes in tests.
//! `RpcChainClient` implements it over an alloy HTTP provider.
//!
//! Created: 2026-02-03

use crate::contracts::{ICurvePool, IQuoterV2};
use alloy::eips::BlockNumberOrTag;
use alloy::primitives::{Address, Bytes, B256, U256};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use anyhow::{Context, Result};
use async_trait::async_trait;

/// Reward percentiles requested with fee history (p50, p90)
pub const FEE_REWARD_PERCENTILES: [f64; 2] = [50.0, 90.0];

/// One fee-history observation, all values in wei.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FeeSample {
    pub base_fee: u128,
    pub priority_fee_p50: u128,
    pub priority_fee_p90: u128,
}

impl FeeSample {
    pub fn base_fee_gwei(&self) -> f64 {
        self.base_fee as f64 / 1e9
    }
}

#[async_trait]
pub trait ChainClient: Send + Sync {
    /// QuoterV2 `quoteExactInput(path, amountIn)`, returns `amountOut`.
    async fn quote_exact_input(&self, quoter: Address, path: Bytes, amount_in: U256) -> Result<U256>;

    /// Stable-swap `get_dy(i, j, dx)`.
    async fn quote_stable(&self, pool: Address, i: i128, j: i128, dx: U256) -> Result<U256>;

    /// Latest block fee history with p50/p90 priority rewards.
    async fn fee_sample(&self) -> Result<FeeSample>;

    async fn has_code(&self, address: Address) -> Result<bool>;

    async fn chain_id(&self) -> Result<u64>;

    async fn nonce(&self, address: Address) -> Result<u64>;

    async fn send_raw_transaction(&self, raw: Bytes) -> Result<B256>;
}

/// `ChainClient` over an alloy HTTP provider.
#[derive(Clone)]
pub struct RpcChainClient {
    provider: DynProvider,
}

impl RpcChainClient {
    pub fn connect_http(rpc_url: &str) -> Result<Self> {
        let provider = ProviderBuilder::new()
            .connect_http(rpc_url.parse().context("Invalid RPC URL")?)
            .erased();
        Ok(Self { provider })
    }

    pub fn provider(&self) -> &DynProvider {
        &self.provider
    }
}

#[async_trait]
impl ChainClient for RpcChainClient {
    async fn quote_exact_input(&self, quoter: Address, path: Bytes, amount_in: U256) -> Result<U256> {
        let quoter = IQuoterV2::new(quoter, &self.provider);
        let ret = quoter
            .quoteExactInput(path, amount_in)
            .call()
            .await
            .context("quoteExactInput failed")?;
        Ok(ret.amountOut)
    }

    async fn quote_stable(&self, pool: Address, i: i128, j: i128, dx: U256) -> Result<U256> {
        let pool = ICurvePool::new(pool, &self.provider);
        let dy = pool
            .get_dy(i, j, dx)
            .call()
            .await
            .context("get_dy failed")?;
        Ok(dy)
    }

    async fn fee_sample(&self) -> Result<FeeSample> {
        let history = self
            .provider
            .get_fee_history(1, BlockNumberOrTag::Latest, &FEE_REWARD_PERCENTILES)
            .await
            .context("eth_feeHistory failed")?;

        let base_fee = history
            .base_fee_per_gas
            .first()
            .copied()
            .context("fee history has no base fee")?;
        let rewards = history
            .reward
            .as_ref()
            .and_then(|r| r.first())
            .cloned()
            .unwrap_or_default();

        Ok(FeeSample {
            base_fee,
            priority_fee_p50: rewards.first().copied().unwrap_or(0),
            priority_fee_p90: rewards.get(1).copied().unwrap_or(0),
        })
    }

    async fn has_code(&self, address: Address) -> Result<bool> {
        let code = self
            .provider
            .get_code_at(address)
            .await
            .with_context(|| format!("eth_getCode failed for {}", address))?;
        Ok(!code.is_empty())
    }

    async fn chain_id(&self) -> Result<u64> {
        self.provider.get_chain_id().await.context("eth_chainId failed")
    }

    async fn nonce(&self, address: Address) -> Result<u64> {
        self.provider
            .get_transaction_count(address)
            .await
            .context("eth_getTransactionCount failed")
    }

    async fn send_raw_transaction(&self, raw: Bytes) -> Result<B256> {
        let pending = self
            .provider
            .send_raw_transaction(&raw)
            .await
            .context("eth_sendRawTransaction failed")?;
        Ok(*pending.tx_hash())
    }
}
