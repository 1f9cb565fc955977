//! Pool Discovery Snapshot
//!
//! Fetches the top concentrated-liquidity and stable-swap pools for each
//! configured chain from its subgraphs and upserts them into the store's
//! pool snapshot.
//!
//! Usage:
//!   discover --config config/cyclearb.toml [--chain base]
//!
//! Created: 2026-02-07

use anyhow::{Context, Result};
use clap::Parser;
use cyclearb_bot::config::DEFAULT_CONFIG_PATH;
use cyclearb_bot::discovery::{PoolSource, SubgraphClient};
use cyclearb_bot::store::{open_store, ArbStore};
use cyclearb_bot::{BotConfig, DexKind};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "discover")]
struct Args {
    #[arg(short, long, env = "CYCLEARB_CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Only discover on this chain key
    #[arg(long, env = "CHAIN")]
    chain: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let config = BotConfig::load(&args.config)
        .with_context(|| format!("Failed to load configuration from {}", args.config.display()))?;

    let store_dir = config.store_dir();
    if store_dir.is_none() {
        warn!("No store configured (STORE_DIR or [store].dir); pools will only be counted");
    }
    let store = open_store(store_dir.as_deref());
    let client = SubgraphClient::new(config.secrets.graph_api_key.clone(), config.secrets.graph_auth_mode)?;
    let min_tvl = config.strategy.min_tvl_usd;

    let mut total = 0usize;
    for (key, chain) in &config.chains {
        if args.chain.as_deref().is_some_and(|c| !c.eq_ignore_ascii_case(key)) {
            continue;
        }

        let uni = client
            .fetch_pools(key, DexKind::ConcentratedLiquidity, chain.univ3_subgraph(), min_tvl)
            .await;
        let curve = client
            .fetch_pools(key, DexKind::StableSwap, chain.curve_subgraph(), min_tvl)
            .await;
        info!("[{}] UniV3 pools: {}, Curve pool pairs: {}", key, uni.len(), curve.len());

        let mut pools = uni;
        pools.extend(curve);
        if let Err(e) = store.insert_pools(&pools).await {
            warn!("[{}] Failed to store pools: {:#}", key, e);
            continue;
        }
        total += pools.len();
    }

    info!("Discovery complete: {} pool records", total);
    Ok(())
}
