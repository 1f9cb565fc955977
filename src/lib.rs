//! DEX Cyclic Arbitrage Bot Library
//!
//! Discovers concentrated-liquidity and stable-swap pools, enumerates 2-hop
//! and closed 3-hop routes, quotes them on-chain, scores them against gas,
//! flash-loan fee and liquidity limits, and submits the best candidate to an
//! atomic executor contract behind a circuit breaker.
//!
//! Created: 2026-02-03

pub mod backtest;
pub mod bot;
pub mod chain;
pub mod config;
pub mod contracts;
pub mod discovery;
pub mod execution;
pub mod filters;
pub mod metrics;
pub mod pricing;
pub mod quotes;
pub mod risk;
pub mod routing;
pub mod store;
pub mod types;

// Re-export commonly used types
pub use bot::{ArbBot, ChainReport, CycleReport};
pub use chain::{ChainClient, RpcChainClient};
pub use config::BotConfig;
pub use risk::RiskManager;
pub use store::{ArbStore, JsonlStore, NullStore};
pub use types::{DexKind, Leg, Route, RouteScore};
