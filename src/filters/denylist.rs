//! Token / pool denylist
//!
//! Routes touching a denied token or pool are scored with `denied = true`,
//! which fails the admission gate regardless of profit.
//!
//! Sources, merged: the inline `[denylist]` lists in the TOML config and an
//! optional JSON file:
//!
//! ```json
//! { "tokens": [{ "address": "0x...", "reason": "fee-on-transfer" }],
//!   "pools":  [{ "address": "0x...", "reason": "phantom liquidity" }] }
//! ```
//!
//! Created: 2026-02-04

use crate::config::DenylistConfig;
use crate::types::Route;
use alloy::primitives::Address;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, info};

// ---------------------------------------------------------------------------
// JSON structures
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct DenylistFile {
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub tokens: Vec<DenyEntry>,
    #[serde(default)]
    pub pools: Vec<DenyEntry>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DenyEntry {
    pub address: String,
    #[serde(default)]
    pub reason: Option<String>,
}

// ---------------------------------------------------------------------------
// Lookup sets
// ---------------------------------------------------------------------------

/// All address comparisons are lowercase hex with 0x prefix.
#[derive(Debug, Clone, Default)]
pub struct DenylistFilter {
    tokens: HashSet<String>,
    pools: HashSet<String>,
}

impl DenylistFilter {
    /// Load from a JSON file path. Missing or unparseable files are errors;
    /// the caller decides whether to run without a denylist.
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read denylist file: {}", path))?;

        let raw: DenylistFile = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse denylist JSON: {}", path))?;

        Ok(Self::from_file(&raw))
    }

    pub fn from_file(raw: &DenylistFile) -> Self {
        let mut filter = Self::default();
        filter.extend(
            raw.tokens.iter().map(|e| e.address.as_str()),
            raw.pools.iter().map(|e| e.address.as_str()),
        );
        filter
    }

    /// Inline lists plus the referenced file, if any.
    pub fn from_config(config: &DenylistConfig) -> Result<Self> {
        let mut filter = match config.file.as_deref().map(str::trim).filter(|f| !f.is_empty()) {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        filter.extend(
            config.tokens.iter().map(String::as_str),
            config.pools.iter().map(String::as_str),
        );
        info!(
            "Denylist loaded: {} tokens, {} pools",
            filter.tokens.len(),
            filter.pools.len()
        );
        Ok(filter)
    }

    fn extend<'a>(
        &mut self,
        tokens: impl Iterator<Item = &'a str>,
        pools: impl Iterator<Item = &'a str>,
    ) {
        self.tokens.extend(tokens.filter(|s| !s.trim().is_empty()).map(normalize_addr));
        self.pools.extend(pools.filter(|s| !s.trim().is_empty()).map(normalize_addr));
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty() && self.pools.is_empty()
    }

    pub fn is_token_denied(&self, token: &Address) -> bool {
        self.tokens.contains(&addr_key(token))
    }

    pub fn is_pool_denied(&self, pool: &Address) -> bool {
        self.pools.contains(&addr_key(pool))
    }

    /// Any leg touching a denied token, pool, or call target.
    pub fn is_route_denied(&self, route: &Route) -> bool {
        if self.is_empty() {
            return false;
        }
        let denied = route.legs().iter().any(|leg| {
            self.is_token_denied(&leg.token_in)
                || self.is_token_denied(&leg.token_out)
                || self.is_pool_denied(&leg.source_pool)
                || self.is_pool_denied(&leg.pool_or_router_address)
        });
        if denied {
            debug!("Route denied: {}", route);
        }
        denied
    }
}

fn addr_key(address: &Address) -> String {
    format!("{:#x}", address)
}

fn normalize_addr(s: &str) -> String {
    let s = s.trim().to_lowercase();
    if s.starts_with("0x") {
        s
    } else {
        format!("0x{}", s)
    }
}
