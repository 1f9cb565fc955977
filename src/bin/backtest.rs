//! Quote Backtest
//!
//! Replays the most recent recorded quotes for one chain under the strategy
//! settings of the current config and prints a summary.
//!
//! Usage:
//!   backtest --chain base [--limit 1000] [--config config/cyclearb.toml]
//!
//! Created: 2026-02-07

use anyhow::{bail, Context, Result};
use clap::Parser;
use cyclearb_bot::backtest::replay_quotes;
use cyclearb_bot::config::DEFAULT_CONFIG_PATH;
use cyclearb_bot::filters::DenylistFilter;
use cyclearb_bot::store::{ArbStore, JsonlStore};
use cyclearb_bot::BotConfig;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "backtest")]
struct Args {
    #[arg(short, long, env = "CYCLEARB_CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Chain key whose quotes are replayed
    #[arg(long, env = "CHAIN")]
    chain: String,

    /// Number of most recent quotes
    #[arg(long, default_value_t = 1000)]
    limit: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let config = BotConfig::load(&args.config)
        .with_context(|| format!("Failed to load configuration from {}", args.config.display()))?;

    let Some(dir) = config.store_dir() else {
        bail!("No store configured (STORE_DIR or [store].dir), nothing to replay");
    };
    let store = JsonlStore::open(&dir)?;
    let denylist = DenylistFilter::from_config(&config.denylist)?;

    let quotes = store.get_recent_quotes(&args.chain, args.limit).await?;
    info!("Replaying {} quotes for {}", quotes.len(), args.chain);

    let summary = replay_quotes(&quotes, &config.strategy, &denylist);
    info!("=== Backtest Summary ({}) ===\n{}", args.chain, summary);
    Ok(())
}
