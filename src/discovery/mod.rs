//! Pool discovery
//!
//! Collaborator that lists pools above a liquidity threshold. Implementations
//! never fail: misconfiguration and transport errors yield an empty list.
//!
//! Created: 2026-02-04

pub mod subgraph;

use crate::types::{DexKind, PoolRecord};
use async_trait::async_trait;

pub use subgraph::SubgraphClient;

#[async_trait]
pub trait PoolSource: Send + Sync {
    /// Pools of one DEX family from `index_url` with TVL >= `min_tvl_usd`.
    async fn fetch_pools(&self, chain: &str, dex: DexKind, index_url: &str, min_tvl_usd: f64) -> Vec<PoolRecord>;
}
