//! Audit persistence
//!
//! Pools, accepted quotes and execution attempts are recorded for audit and
//! backtesting. Nothing read from the store feeds a decision in the same
//! cycle, and the pipeline treats every write as best-effort.
//!
//! Created: 2026-02-04

pub mod jsonl;

use crate::types::{ExecutionRecord, PoolRecord, QuoteRecord};
use anyhow::Result;
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

pub use jsonl::JsonlStore;

#[async_trait]
pub trait ArbStore: Send + Sync {
    /// Upsert keyed by (chain, dex, address, routing).
    async fn insert_pool(&self, pool: &PoolRecord) -> Result<()>;

    async fn insert_pools(&self, pools: &[PoolRecord]) -> Result<()> {
        for pool in pools {
            self.insert_pool(pool).await?;
        }
        Ok(())
    }

    async fn insert_quote(&self, quote: &QuoteRecord) -> Result<()>;

    async fn insert_execution(&self, execution: &ExecutionRecord) -> Result<()>;

    /// Newest first.
    async fn get_recent_quotes(&self, chain: &str, limit: usize) -> Result<Vec<QuoteRecord>>;

    /// Newest first.
    async fn get_recent_executions(&self, chain: &str, limit: usize) -> Result<Vec<ExecutionRecord>>;
}

/// Store used when no store location is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullStore;

#[async_trait]
impl ArbStore for NullStore {
    async fn insert_pool(&self, _pool: &PoolRecord) -> Result<()> {
        Ok(())
    }

    async fn insert_quote(&self, _quote: &QuoteRecord) -> Result<()> {
        Ok(())
    }

    async fn insert_execution(&self, _execution: &ExecutionRecord) -> Result<()> {
        Ok(())
    }

    async fn get_recent_quotes(&self, _chain: &str, _limit: usize) -> Result<Vec<QuoteRecord>> {
        Ok(Vec::new())
    }

    async fn get_recent_executions(&self, _chain: &str, _limit: usize) -> Result<Vec<ExecutionRecord>> {
        Ok(Vec::new())
    }
}

/// JSONL store at `dir`, or `NullStore` when unset or unusable.
pub fn open_store(dir: Option<&Path>) -> Arc<dyn ArbStore> {
    let Some(dir) = dir else {
        info!("No store directory configured, records are discarded");
        return Arc::new(NullStore);
    };
    match JsonlStore::open(dir) {
        Ok(store) => {
            info!("Recording to JSONL store ({} known pools)", store.pool_count());
            Arc::new(store)
        }
        Err(e) => {
            warn!("Store unavailable, records are discarded: {:#}", e);
            Arc::new(NullStore)
        }
    }
}
