//! DEX Cyclic Arbitrage Bot (Base, Arbitrum)
//!
//! Main entry point. Loads the TOML config (after `.env`), wires the
//! subgraph discovery client, the audit store and the execution submitter
//! into the cycle driver, and runs cycles until SIGINT/SIGTERM.
//!
//! Usage:
//!   cyclearb-bot --config config/cyclearb.toml
//!   cyclearb-bot --chain base --once
//!
//! Environment: SEARCHER_PK, EXECUTOR_CONTRACT, STORE_DIR, GRAPH_API_KEY,
//! GRAPH_AUTH_MODE, RUST_LOG, LOG_FORMAT=json
//!
//! Created: 2026-02-06

use anyhow::{Context, Result};
use clap::Parser;
use cyclearb_bot::config::DEFAULT_CONFIG_PATH;
use cyclearb_bot::discovery::SubgraphClient;
use cyclearb_bot::execution::{ExecutionSubmitter, HttpRelay};
use cyclearb_bot::filters::DenylistFilter;
use cyclearb_bot::store::open_store;
use cyclearb_bot::bot::truncate_url;
use cyclearb_bot::{ArbBot, BotConfig, CycleReport};
use futures::StreamExt;
use signal_hook::consts::{SIGINT, SIGTERM};
use signal_hook_tokio::Signals;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// DEX Cyclic Arbitrage Bot
#[derive(Parser)]
#[command(name = "cyclearb-bot")]
struct Args {
    /// TOML configuration file
    #[arg(short, long, env = "CYCLEARB_CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Only process this chain key (e.g. base, arbitrum)
    #[arg(long, env = "CHAIN")]
    chain: Option<String>,

    /// Run a single cycle and exit
    #[arg(long)]
    once: bool,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if std::env::var("LOG_FORMAT").map(|v| v == "json").unwrap_or(false) {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    init_tracing();
    let args = Args::parse();

    let config = BotConfig::load(&args.config)
        .with_context(|| format!("Failed to load configuration from {}", args.config.display()))?;
    info!("Configuration loaded from {}", args.config.display());

    let s = &config.strategy;
    for (key, chain) in &config.chains {
        match chain.rpc_url() {
            Some(url) => info!("  {}: RPC {}", key, truncate_url(url)),
            None => warn!("  {}: no RPC URL, chain will be skipped", key),
        }
        match chain.flashloan_pool_address() {
            Some(pool) => info!("  {}: flash-loan pool {:?}", key, pool),
            None if s.flashloan.enabled => {
                warn!("  {}: flash loans enabled but no flash-loan pool configured", key)
            }
            None => {}
        }
    }
    info!(
        "Strategy: floor ${:.4}, gas ${:.4}, cap {} routes, slippage {} bps, flashloan {}, quote mode {:?}",
        s.profit_floor_usd, s.gas_usd_estimate, s.max_routes_per_cycle, s.slippage_bps, s.flashloan.enabled, s.quote_mode
    );

    let denylist = DenylistFilter::from_config(&config.denylist)?;
    let pools = Arc::new(SubgraphClient::new(
        config.secrets.graph_api_key.clone(),
        config.secrets.graph_auth_mode,
    )?);
    let store = open_store(config.store_dir().as_deref());
    let submitter = ExecutionSubmitter::new(
        &config.strategy,
        config.secrets.signing_key.as_deref(),
        config.secrets.executor_contract,
        Arc::new(HttpRelay::new()?),
    );
    match submitter.searcher_address() {
        Some(addr) if submitter.is_armed() => info!("Execution armed, searcher {:?}", addr),
        _ => warn!("Execution disabled (SEARCHER_PK and EXECUTOR_CONTRACT required), quoting only"),
    }

    let mut bot = ArbBot::new(config, pools, store, submitter, denylist).with_chain_filter(args.chain);

    if args.once {
        match bot.run_cycle().await? {
            CycleReport::Paused(reason) => info!("Cycle paused: {}", reason),
            CycleReport::Completed(reports) => {
                for r in reports {
                    info!(
                        "{}: skipped={:?} pools={} legs={} routes={} accepted={} best={:?}",
                        r.chain, r.skipped, r.pools, r.legs, r.routes, r.accepted, r.best_profit_usd
                    );
                }
            }
        }
        return Ok(());
    }

    let shutdown = Arc::new(AtomicBool::new(false));
    let mut signals = Signals::new([SIGINT, SIGTERM])?;
    let flag = Arc::clone(&shutdown);
    tokio::spawn(async move {
        if let Some(sig) = signals.next().await {
            info!("Received signal {}, stopping after the current cycle", sig);
            flag.store(true, Ordering::SeqCst);
        }
    });

    bot.run(shutdown).await;
    info!("Final metrics:\n{}", bot.metrics().render());
    Ok(())
}
