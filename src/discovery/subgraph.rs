//! Subgraph pool discovery
//!
//! Queries the top 200 pools by TVL from a GraphQL indexing service and
//! normalizes them into `PoolRecord`s. Every failure mode (blank URL, HTTP
//! error, non-JSON body, GraphQL errors, transport errors) degrades to an
//! empty list with a log line.
//!
//! Auth: GRAPH_API_KEY is sent as `Authorization: Bearer <key>`, or as an
//! `apikey` header when GRAPH_AUTH_MODE=apikey.
//!
//! Created: 2026-02-04

use super::PoolSource;
use crate::config::{parse_address, GraphAuthMode};
use crate::types::{DexKind, PoolRecord, PoolRouting};
use alloy::primitives::Address;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::{error, info, warn};

const UNIV3_POOLS_QUERY: &str = r#"{
  pools(first: 200, orderBy: totalValueLockedUSD, orderDirection: desc) {
    id
    feeTier
    liquidity
    token0 { id symbol decimals }
    token1 { id symbol decimals }
    totalValueLockedUSD
  }
}"#;

const CURVE_POOLS_QUERY: &str = r#"{
  pools(first: 200, orderBy: totalValueLockedUSD, orderDirection: desc) {
    id
    coins { id address symbol decimals index }
    totalValueLockedUSD
  }
}"#;

const HTTP_TIMEOUT: Duration = Duration::from_secs(15);

// ---------------------------------------------------------------------------
// GraphQL response shapes
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct GraphResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Option<Vec<GraphError>>,
}

#[derive(Debug, Deserialize)]
struct GraphError {
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct PoolsData<P> {
    #[serde(default = "Vec::new")]
    pools: Vec<P>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubgraphToken {
    pub id: String,
    #[serde(default)]
    pub symbol: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UniV3Pool {
    pub id: String,
    #[serde(rename = "feeTier")]
    pub fee_tier: Option<String>,
    pub token0: SubgraphToken,
    pub token1: SubgraphToken,
    #[serde(rename = "totalValueLockedUSD")]
    pub tvl_usd: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CurveCoin {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub index: Option<u8>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CurvePool {
    pub id: String,
    #[serde(default)]
    pub coins: Vec<CurveCoin>,
    #[serde(rename = "totalValueLockedUSD")]
    pub tvl_usd: Option<String>,
}

// ---------------------------------------------------------------------------
// Normalization
// ---------------------------------------------------------------------------

fn parse_tvl(raw: Option<&str>) -> f64 {
    raw.and_then(|s| s.trim().parse::<f64>().ok()).unwrap_or(0.0)
}

/// V3 pools above `min_tvl_usd`. A missing or bad fee tier leaves routing
/// unresolved; a bad address drops the pool.
pub fn univ3_records(chain: &str, pools: &[UniV3Pool], min_tvl_usd: f64) -> Vec<PoolRecord> {
    pools
        .iter()
        .filter_map(|p| {
            let tvl_usd = parse_tvl(p.tvl_usd.as_deref());
            if tvl_usd < min_tvl_usd {
                return None;
            }
            Some(PoolRecord {
                chain: chain.to_string(),
                dex: DexKind::ConcentratedLiquidity,
                address: parse_address(&p.id)?,
                token0: parse_address(&p.token0.id)?,
                token1: parse_address(&p.token1.id)?,
                routing: p
                    .fee_tier
                    .as_deref()
                    .and_then(|f| f.trim().parse::<u32>().ok())
                    .map(PoolRouting::FeeTier),
                tvl_usd,
            })
        })
        .collect()
}

/// Curve pools above `min_tvl_usd`, one record per coin pair (i < j).
pub fn curve_records(chain: &str, pools: &[CurvePool], min_tvl_usd: f64) -> Vec<PoolRecord> {
    let mut out = Vec::new();
    for p in pools {
        let tvl_usd = parse_tvl(p.tvl_usd.as_deref());
        if tvl_usd < min_tvl_usd {
            continue;
        }
        let Some(address) = parse_address(&p.id) else {
            continue;
        };
        let coins: Vec<(u8, Address)> = p
            .coins
            .iter()
            .filter_map(|c| {
                let raw = c.address.as_deref().or(c.id.as_deref())?;
                Some((c.index?, parse_address(raw)?))
            })
            .collect();

        for (n, (i, token0)) in coins.iter().enumerate() {
            for (j, token1) in &coins[n + 1..] {
                out.push(PoolRecord {
                    chain: chain.to_string(),
                    dex: DexKind::StableSwap,
                    address,
                    token0: *token0,
                    token1: *token1,
                    routing: Some(PoolRouting::CoinPair { i: *i, j: *j }),
                    tvl_usd,
                });
            }
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

pub struct SubgraphClient {
    http: reqwest::Client,
    api_key: Option<String>,
    auth_mode: GraphAuthMode,
}

impl SubgraphClient {
    pub fn new(api_key: Option<String>, auth_mode: GraphAuthMode) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            http,
            api_key,
            auth_mode,
        })
    }

    fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(key) = self.api_key.as_deref() {
            let (name, value) = match self.auth_mode {
                GraphAuthMode::Bearer => (AUTHORIZATION, format!("Bearer {}", key)),
                GraphAuthMode::ApiKey => (HeaderName::from_static("apikey"), key.to_string()),
            };
            match HeaderValue::from_str(&value) {
                Ok(v) => {
                    headers.insert(name, v);
                }
                Err(_) => warn!("GRAPH_API_KEY contains invalid header characters, sending unauthenticated"),
            }
        }
        headers
    }

    /// POST a query; Ok(None) for every "tolerated" failure already logged.
    async fn query<T: DeserializeOwned>(&self, label: &str, url: &str, query: &str) -> Result<Option<T>> {
        let resp = self
            .http
            .post(url)
            .headers(self.headers())
            .json(&json!({ "query": query }))
            .send()
            .await
            .with_context(|| format!("{} subgraph request failed", label))?;

        if !resp.status().is_success() {
            error!("{} subgraph HTTP {} at {}", label, resp.status(), url);
            return Ok(None);
        }
        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();
        if !content_type.contains("application/json") {
            error!("{} subgraph returned non-JSON content-type: {}", label, content_type);
            return Ok(None);
        }

        let body: GraphResponse<T> = resp
            .json()
            .await
            .with_context(|| format!("{} subgraph returned malformed JSON", label))?;
        if let Some(errors) = body.errors.filter(|e| !e.is_empty()) {
            let messages: Vec<&str> = errors.iter().map(|e| e.message.as_str()).collect();
            if messages.iter().any(|m| m.to_lowercase().contains("auth")) {
                error!(
                    "GraphQL auth error for {} subgraph. Set GRAPH_API_KEY or fix GRAPH_AUTH_MODE. messages={:?}",
                    label, messages
                );
            } else {
                error!("{} subgraph GraphQL errors: {:?}", label, messages);
            }
            return Ok(None);
        }
        Ok(body.data)
    }

    pub async fn fetch_univ3_pools(&self, chain: &str, url: &str, min_tvl_usd: f64) -> Vec<PoolRecord> {
        if url.trim().is_empty() {
            return Vec::new();
        }
        match self.query::<PoolsData<UniV3Pool>>("UniV3", url, UNIV3_POOLS_QUERY).await {
            Ok(Some(data)) => {
                let records = univ3_records(chain, &data.pools, min_tvl_usd);
                info!("[{}] UniV3 discovery: {} of {} pools above ${:.0} TVL", chain, records.len(), data.pools.len(), min_tvl_usd);
                records
            }
            Ok(None) => Vec::new(),
            Err(e) => {
                error!("[{}] Error fetching UniV3 pools: {:#}", chain, e);
                Vec::new()
            }
        }
    }

    pub async fn fetch_curve_pools(&self, chain: &str, url: &str, min_tvl_usd: f64) -> Vec<PoolRecord> {
        if url.trim().is_empty() {
            return Vec::new();
        }
        match self.query::<PoolsData<CurvePool>>("Curve", url, CURVE_POOLS_QUERY).await {
            Ok(Some(data)) => {
                let records = curve_records(chain, &data.pools, min_tvl_usd);
                info!("[{}] Curve discovery: {} coin pairs from {} pools", chain, records.len(), data.pools.len());
                records
            }
            Ok(None) => Vec::new(),
            Err(e) => {
                error!("[{}] Error fetching Curve pools: {:#}", chain, e);
                Vec::new()
            }
        }
    }
}

#[async_trait]
impl PoolSource for SubgraphClient {
    async fn fetch_pools(&self, chain: &str, dex: DexKind, url: &str, min_tvl_usd: f64) -> Vec<PoolRecord> {
        match dex {
            DexKind::ConcentratedLiquidity => self.fetch_univ3_pools(chain, url, min_tvl_usd).await,
            DexKind::StableSwap => self.fetch_curve_pools(chain, url, min_tvl_usd).await,
        }
    }
}
