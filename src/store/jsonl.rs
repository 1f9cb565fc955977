//! JSONL audit store
//!
//! Layout under the store directory:
//! - `quotes.jsonl`      one QuoteRecord per line, append-only
//! - `executions.jsonl`  one ExecutionRecord per line, append-only
//! - `pools.json`        latest snapshot of discovered pools (upserted)
//!
//! Created: 2026-02-04

use super::ArbStore;
use crate::types::{DexKind, ExecutionRecord, PoolRecord, PoolRouting, QuoteRecord};
use alloy::primitives::Address;
use anyhow::{Context, Result};
use async_trait::async_trait;
use dashmap::DashMap;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

type PoolKey = (String, DexKind, Address, Option<PoolRouting>);

pub struct JsonlStore {
    base_dir: PathBuf,
    pools: DashMap<PoolKey, PoolRecord>,
}

impl JsonlStore {
    /// Open (creating if needed) a store directory and load the pool snapshot.
    pub fn open<P: AsRef<Path>>(base_dir: P) -> Result<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        fs::create_dir_all(&base_dir)
            .with_context(|| format!("Failed to create store directory: {:?}", base_dir))?;

        let pools = DashMap::new();
        let snapshot = base_dir.join("pools.json");
        if snapshot.exists() {
            let content = fs::read_to_string(&snapshot)
                .with_context(|| format!("Failed to read pool snapshot: {:?}", snapshot))?;
            let records: Vec<PoolRecord> = serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse pool snapshot: {:?}", snapshot))?;
            for r in records {
                pools.insert(pool_key(&r), r);
            }
        }
        debug!("Store opened at {:?} ({} pools)", base_dir, pools.len());

        Ok(Self { base_dir, pools })
    }

    pub fn quotes_path(&self) -> PathBuf {
        self.base_dir.join("quotes.jsonl")
    }

    pub fn executions_path(&self) -> PathBuf {
        self.base_dir.join("executions.jsonl")
    }

    pub fn pools_path(&self) -> PathBuf {
        self.base_dir.join("pools.json")
    }

    pub fn pool_count(&self) -> usize {
        self.pools.len()
    }

    /// Pools in a stable order (chain, then address).
    pub fn pools(&self) -> Vec<PoolRecord> {
        let mut out: Vec<PoolRecord> = self.pools.iter().map(|e| e.value().clone()).collect();
        out.sort_by(|a, b| (&a.chain, a.address).cmp(&(&b.chain, b.address)));
        out
    }

    fn write_pool_snapshot(&self) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.pools())
            .context("Failed to serialize pool snapshot")?;
        let tmp = self.base_dir.join("pools.json.tmp");
        fs::write(&tmp, json).with_context(|| format!("Failed to write {:?}", tmp))?;
        fs::rename(&tmp, self.pools_path()).context("Failed to replace pool snapshot")?;
        Ok(())
    }
}

fn pool_key(p: &PoolRecord) -> PoolKey {
    (p.chain.clone(), p.dex, p.address, p.routing)
}

fn append_line<T: Serialize>(path: &Path, record: &T) -> Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open {:?}", path))?;
    let json = serde_json::to_string(record).context("Failed to serialize record")?;
    writeln!(file, "{}", json)?;
    Ok(())
}

/// Every parseable line, oldest first. Corrupt lines are skipped.
fn read_lines<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let reader = BufReader::new(File::open(path)?);
    let mut out = Vec::new();
    for (n, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str(&line) {
            Ok(record) => out.push(record),
            Err(e) => warn!("Skipping corrupt line {} in {:?}: {}", n + 1, path, e),
        }
    }
    Ok(out)
}

fn newest_for_chain<T>(records: Vec<T>, chain: &str, limit: usize, chain_of: impl Fn(&T) -> &str) -> Vec<T> {
    records
        .into_iter()
        .rev()
        .filter(|r| chain_of(r) == chain)
        .take(limit)
        .collect()
}

#[async_trait]
impl ArbStore for JsonlStore {
    async fn insert_pool(&self, pool: &PoolRecord) -> Result<()> {
        self.pools.insert(pool_key(pool), pool.clone());
        self.write_pool_snapshot()
    }

    /// One snapshot rewrite for the whole batch.
    async fn insert_pools(&self, pools: &[PoolRecord]) -> Result<()> {
        for pool in pools {
            self.pools.insert(pool_key(pool), pool.clone());
        }
        self.write_pool_snapshot()
    }

    async fn insert_quote(&self, quote: &QuoteRecord) -> Result<()> {
        append_line(&self.quotes_path(), quote)
    }

    async fn insert_execution(&self, execution: &ExecutionRecord) -> Result<()> {
        append_line(&self.executions_path(), execution)
    }

    async fn get_recent_quotes(&self, chain: &str, limit: usize) -> Result<Vec<QuoteRecord>> {
        let all: Vec<QuoteRecord> = read_lines(&self.quotes_path())?;
        Ok(newest_for_chain(all, chain, limit, |q| q.chain.as_str()))
    }

    async fn get_recent_executions(&self, chain: &str, limit: usize) -> Result<Vec<ExecutionRecord>> {
        let all: Vec<ExecutionRecord> = read_lines(&self.executions_path())?;
        Ok(newest_for_chain(all, chain, limit, |e| e.chain.as_str()))
    }
}
