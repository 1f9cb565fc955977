//! Configuration management
//!
//! Settings come from a TOML file (default `config/cyclearb.toml`) after `.env`
//! has been loaded. Any string value written as `${VAR}` is replaced with the
//! environment value (empty when unset), so RPC URLs and addresses can live
//! in `.env` while the file stays in version control.
//!
//! Secrets are read from the environment only and never logged:
//! SEARCHER_PK, EXECUTOR_CONTRACT, STORE_DIR, GRAPH_API_KEY, GRAPH_AUTH_MODE.
//!
//! Created: 2026-02-03
//! Modified: 2026-02-06 - ${VAR} interpolation, quote_mode, two-hop cycle flag

use alloy::primitives::Address;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_CONFIG_PATH: &str = "config/cyclearb.toml";

/// Top-level configuration
#[derive(Debug, Clone, Deserialize)]
pub struct BotConfig {
    #[serde(default)]
    pub strategy: StrategyConfig,
    #[serde(default)]
    pub risk: RiskConfig,
    #[serde(default)]
    pub chains: BTreeMap<String, ChainConfig>,
    /// Token book per chain key
    #[serde(default)]
    pub tokens: BTreeMap<String, Vec<TokenConfig>>,
    #[serde(default)]
    pub denylist: DenylistConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(skip)]
    pub secrets: Secrets,
}

// ---------------------------------------------------------------------------
// Strategy
// ---------------------------------------------------------------------------

/// How a route's legs are quoted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuoteMode {
    /// Every leg quoted with the same reference amount; last leg's output kept
    #[default]
    Independent,
    /// Each leg quoted with the previous leg's output
    Chained,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StrategyConfig {
    #[serde(default = "default_min_tvl")]
    pub min_tvl_usd: f64,
    /// Minimum net profit (exclusive) for a route to become a candidate
    #[serde(default)]
    pub profit_floor_usd: f64,
    #[serde(default = "default_max_routes")]
    pub max_routes_per_cycle: usize,
    /// Top-N legs by liquidity kept in the leg index
    #[serde(default = "default_max_legs")]
    pub max_legs: usize,
    /// Reference input amount in the input token's smallest unit
    #[serde(default = "default_quote_amount_in")]
    pub quote_amount_in: u64,
    /// USD value assumed for `quote_amount_in` when the token book has no price
    #[serde(default = "default_reference_amount_usd")]
    pub reference_amount_usd: f64,
    #[serde(default = "default_gas_usd")]
    pub gas_usd_estimate: f64,
    #[serde(default = "default_slippage_bps")]
    pub slippage_bps: u32,
    #[serde(default = "default_deadline_secs")]
    pub deadline_secs: u64,
    #[serde(default = "default_gas_limit")]
    pub gas_limit: u64,
    #[serde(default)]
    pub quote_mode: QuoteMode,
    /// Admit USDC -> X -> USDC style two-hop round trips through distinct pools
    #[serde(default)]
    pub allow_two_hop_cycles: bool,
    #[serde(default = "default_cycle_delay_ms")]
    pub cycle_delay_ms: u64,
    #[serde(default = "default_error_backoff_ms")]
    pub error_backoff_ms: u64,
    /// Log the metrics snapshot every N cycles (0 = never)
    #[serde(default = "default_metrics_every")]
    pub metrics_log_every_cycles: u64,
    #[serde(default)]
    pub flashloan: FlashloanConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FlashloanConfig {
    #[serde(default)]
    pub enabled: bool,
    /// Fraction of the borrowed amount, e.g. 0.0005 for 5 bps
    #[serde(default = "default_flash_fee_pct")]
    pub fee_pct: f64,
}

fn default_min_tvl() -> f64 { 100_000.0 }
fn default_max_routes() -> usize { 100 }
fn default_max_legs() -> usize { 20 }
fn default_quote_amount_in() -> u64 { 1_000_000 }
fn default_reference_amount_usd() -> f64 { 1.0 }
fn default_gas_usd() -> f64 { 0.01 }
fn default_slippage_bps() -> u32 { 500 }
fn default_deadline_secs() -> u64 { 300 }
fn default_gas_limit() -> u64 { 500_000 }
fn default_cycle_delay_ms() -> u64 { 1_000 }
fn default_error_backoff_ms() -> u64 { 5_000 }
fn default_metrics_every() -> u64 { 60 }
fn default_flash_fee_pct() -> f64 { 0.0005 }

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            min_tvl_usd: default_min_tvl(),
            profit_floor_usd: 0.0,
            max_routes_per_cycle: default_max_routes(),
            max_legs: default_max_legs(),
            quote_amount_in: default_quote_amount_in(),
            reference_amount_usd: default_reference_amount_usd(),
            gas_usd_estimate: default_gas_usd(),
            slippage_bps: default_slippage_bps(),
            deadline_secs: default_deadline_secs(),
            gas_limit: default_gas_limit(),
            quote_mode: QuoteMode::default(),
            allow_two_hop_cycles: false,
            cycle_delay_ms: default_cycle_delay_ms(),
            error_backoff_ms: default_error_backoff_ms(),
            metrics_log_every_cycles: default_metrics_every(),
            flashloan: FlashloanConfig::default(),
        }
    }
}

impl Default for FlashloanConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            fee_pct: default_flash_fee_pct(),
        }
    }
}

impl StrategyConfig {
    pub fn cycle_delay(&self) -> Duration {
        Duration::from_millis(self.cycle_delay_ms)
    }

    pub fn error_backoff(&self) -> Duration {
        Duration::from_millis(self.error_backoff_ms)
    }

    /// Flash fee applied by the scorer: zero unless flash loans are enabled.
    pub fn effective_flash_fee_pct(&self) -> f64 {
        if self.flashloan.enabled {
            self.flashloan.fee_pct
        } else {
            0.0
        }
    }
}

// ---------------------------------------------------------------------------
// Risk
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct RiskConfig {
    /// Pause when the latest base fee is above this percentile of the window
    #[serde(default = "default_fee_pctl")]
    pub pause_above_base_fee_pctl: f64,
    /// Pause when the recent failure rate exceeds this percentage
    #[serde(default = "default_fail_rate_pct")]
    pub pause_fail_rate_pct: f64,
    #[serde(default = "default_max_gas_gwei")]
    pub max_gas_price_gwei: u64,
}

fn default_fee_pctl() -> f64 { 0.9 }
fn default_fail_rate_pct() -> f64 { 20.0 }
fn default_max_gas_gwei() -> u64 { 50 }

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            pause_above_base_fee_pctl: default_fee_pctl(),
            pause_fail_rate_pct: default_fail_rate_pct(),
            max_gas_price_gwei: default_max_gas_gwei(),
        }
    }
}

// ---------------------------------------------------------------------------
// Chains, tokens, denylist, store
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChainConfig {
    #[serde(default)]
    pub rpc: String,
    #[serde(default)]
    pub private_tx_rpc: String,
    #[serde(default)]
    pub aave_pool: String,
    #[serde(default)]
    pub univ3: Option<UniV3Config>,
    #[serde(default)]
    pub curve: Option<CurveConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UniV3Config {
    #[serde(default)]
    pub router: String,
    #[serde(default)]
    pub quoter_v2: String,
    #[serde(default)]
    pub subgraph: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CurveConfig {
    #[serde(default)]
    pub subgraph: String,
}

impl ChainConfig {
    pub fn rpc_url(&self) -> Option<&str> {
        non_empty(&self.rpc)
    }

    pub fn private_relay_url(&self) -> Option<&str> {
        non_empty(&self.private_tx_rpc)
    }

    /// Flash-loan pool used by `executeWithFlashloan`.
    pub fn flashloan_pool_address(&self) -> Option<Address> {
        parse_address(&self.aave_pool)
    }

    pub fn router_address(&self) -> Option<Address> {
        self.univ3.as_ref().and_then(|u| parse_address(&u.router))
    }

    pub fn quoter_address(&self) -> Option<Address> {
        self.univ3.as_ref().and_then(|u| parse_address(&u.quoter_v2))
    }

    pub fn univ3_subgraph(&self) -> &str {
        self.univ3.as_ref().map(|u| u.subgraph.as_str()).unwrap_or("")
    }

    pub fn curve_subgraph(&self) -> &str {
        self.curve.as_ref().map(|c| c.subgraph.as_str()).unwrap_or("")
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TokenConfig {
    pub symbol: String,
    pub address: String,
    pub decimals: u8,
    #[serde(default)]
    pub price_usd: Option<f64>,
    /// Quote-side stable used to synthesize fallback legs against WETH
    #[serde(default)]
    pub stable: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DenylistConfig {
    #[serde(default)]
    pub tokens: Vec<String>,
    #[serde(default)]
    pub pools: Vec<String>,
    /// Optional JSON file with the same shape, merged with the inline lists
    #[serde(default)]
    pub file: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub dir: Option<String>,
}

// ---------------------------------------------------------------------------
// Secrets (environment only)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GraphAuthMode {
    #[default]
    Bearer,
    ApiKey,
}

impl FromStr for GraphAuthMode {
    type Err = std::convert::Infallible;

    /// Unknown modes fall back to bearer.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(match s.trim().to_lowercase().as_str() {
            "apikey" => GraphAuthMode::ApiKey,
            _ => GraphAuthMode::Bearer,
        })
    }
}

#[derive(Clone, Default)]
pub struct Secrets {
    pub signing_key: Option<String>,
    pub executor_contract: Option<Address>,
    pub store_dir: Option<PathBuf>,
    pub graph_api_key: Option<String>,
    pub graph_auth_mode: GraphAuthMode,
}

impl Secrets {
    pub fn from_env() -> Self {
        let var = |name: &str| {
            std::env::var(name)
                .ok()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        Self {
            signing_key: var("SEARCHER_PK"),
            executor_contract: var("EXECUTOR_CONTRACT").and_then(|v| parse_address(&v)),
            store_dir: var("STORE_DIR").map(PathBuf::from),
            graph_api_key: var("GRAPH_API_KEY"),
            graph_auth_mode: var("GRAPH_AUTH_MODE")
                .map(|m| m.parse().unwrap_or_default())
                .unwrap_or_default(),
        }
    }
}

impl fmt::Debug for Secrets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |present: bool| if present { "<set>" } else { "<unset>" };
        f.debug_struct("Secrets")
            .field("signing_key", &redact(self.signing_key.is_some()))
            .field("executor_contract", &self.executor_contract)
            .field("store_dir", &redact(self.store_dir.is_some()))
            .field("graph_api_key", &redact(self.graph_api_key.is_some()))
            .field("graph_auth_mode", &self.graph_auth_mode)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

impl BotConfig {
    /// Load `.env`, then the TOML file, then secrets from the environment.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        dotenv::dotenv().ok();

        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let mut config = Self::from_toml_str(&content, |name| std::env::var(name).ok())?;
        config.secrets = Secrets::from_env();
        Ok(config)
    }

    /// Parse a TOML document, resolving `${VAR}` through `lookup`.
    pub fn from_toml_str<F>(content: &str, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let table: toml::Table =
            toml::from_str(content).context("Failed to parse TOML configuration")?;
        let mut value = toml::Value::Table(table);
        interpolate_value(&mut value, &lookup);

        let config: Self = value
            .try_into()
            .context("Invalid configuration structure")?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        let r = &self.risk;
        if !(0.0..=1.0).contains(&r.pause_above_base_fee_pctl) {
            anyhow::bail!(
                "risk.pause_above_base_fee_pctl must be within [0, 1], got {}",
                r.pause_above_base_fee_pctl
            );
        }
        if self.strategy.slippage_bps > 10_000 {
            anyhow::bail!("strategy.slippage_bps must be <= 10000, got {}", self.strategy.slippage_bps);
        }
        if self.strategy.quote_amount_in == 0 {
            anyhow::bail!("strategy.quote_amount_in must be positive");
        }
        Ok(())
    }

    /// Store directory: STORE_DIR wins over `[store].dir`.
    pub fn store_dir(&self) -> Option<PathBuf> {
        self.secrets
            .store_dir
            .clone()
            .or_else(|| self.store.dir.as_deref().and_then(non_empty).map(PathBuf::from))
    }

    pub fn tokens_for(&self, chain: &str) -> &[TokenConfig] {
        self.tokens.get(chain).map(|v| v.as_slice()).unwrap_or(&[])
    }
}

fn interpolate_value<F>(value: &mut toml::Value, lookup: &F)
where
    F: Fn(&str) -> Option<String>,
{
    match value {
        toml::Value::String(s) => {
            if s.contains("${") {
                *s = interpolate(s, lookup);
            }
        }
        toml::Value::Array(items) => items.iter_mut().for_each(|v| interpolate_value(v, lookup)),
        toml::Value::Table(table) => table.iter_mut().for_each(|(_, v)| interpolate_value(v, lookup)),
        _ => {}
    }
}

/// Replace every `${NAME}` with `lookup(NAME)`, unset names become "".
/// An unterminated `${` is left as-is.
pub fn interpolate<F>(input: &str, lookup: &F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find('}') {
            Some(end) => {
                let name = after[..end].trim();
                out.push_str(&lookup(name).unwrap_or_default());
                rest = &after[end + 1..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

pub fn parse_address(s: &str) -> Option<Address> {
    non_empty(s).and_then(|v| Address::from_str(v).ok())
}

fn non_empty(s: &str) -> Option<&str> {
    let t = s.trim();
    (!t.is_empty()).then_some(t)
}
