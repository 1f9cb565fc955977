//! Cycle driver
//!
//! One cycle: risk gate, then each configured chain in turn (discover pools,
//! build legs, enumerate routes, quote, score, execute the best candidate).
//! Chains, routes and legs are processed strictly one after another; the
//! risk windows are owned here and only touched from this loop.
//!
//! `run` repeats cycles with a fixed delay until shutdown is requested. A
//! cycle that returns an error is logged and followed by the longer error
//! backoff; nothing short of shutdown ends the loop. A failure confined to
//! one chain (e.g. an unparsable RPC URL) only skips that chain.
//!
//! Created: 2026-02-06
//! Modified: 2026-02-10 - Per-chain error isolation, char-safe URL truncation

use crate::chain::{ChainClient, RpcChainClient};
use crate::config::{BotConfig, ChainConfig};
use crate::discovery::PoolSource;
use crate::execution::{ExecutionSubmitter, SubmitOutcome};
use crate::filters::DenylistFilter;
use crate::metrics::Metrics;
use crate::pricing::TokenBook;
use crate::quotes::quote_route;
use crate::risk::{PauseReason, RiskManager};
use crate::routing::{
    build_index, fallback_legs, generate_routes, is_accepted, rank_candidates, score_route, Candidate,
    LegIndex, RouterAddresses, MIN_TVL_USD,
};
use crate::store::ArbStore;
use crate::types::{DexKind, RoutePolicy};
use alloy::primitives::U256;
use anyhow::Result;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Candidates logged per chain per cycle
const TOP_CANDIDATES_LOGGED: usize = 3;

/// RPC URLs are logged truncated; the tail usually carries an API key.
const RPC_LOG_CHARS: usize = 40;

/// First `RPC_LOG_CHARS` characters of `url`.
pub fn truncate_url(url: &str) -> String {
    url.chars().take(RPC_LOG_CHARS).collect()
}

/// What happened on one chain during a cycle.
#[derive(Debug, Clone, Default)]
pub struct ChainReport {
    pub chain: String,
    /// Set when the chain was not processed
    pub skipped: Option<&'static str>,
    pub pools: usize,
    pub legs: usize,
    pub routes: usize,
    pub accepted: usize,
    pub best_profit_usd: Option<f64>,
    pub execution: Option<SubmitOutcome>,
}

impl ChainReport {
    fn skipped(chain: &str, why: &'static str) -> Self {
        Self {
            chain: chain.to_string(),
            skipped: Some(why),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone)]
pub enum CycleReport {
    Paused(PauseReason),
    Completed(Vec<ChainReport>),
}

pub struct ArbBot {
    config: BotConfig,
    chain_filter: Option<String>,
    risk: RiskManager,
    pool_source: Arc<dyn PoolSource>,
    store: Arc<dyn ArbStore>,
    submitter: ExecutionSubmitter,
    denylist: DenylistFilter,
    metrics: Arc<Metrics>,
    clients: HashMap<String, Arc<dyn ChainClient>>,
    cycles: u64,
}

impl ArbBot {
    pub fn new(
        config: BotConfig,
        pool_source: Arc<dyn PoolSource>,
        store: Arc<dyn ArbStore>,
        submitter: ExecutionSubmitter,
        denylist: DenylistFilter,
    ) -> Self {
        let risk = RiskManager::new(config.risk.clone());
        Self {
            config,
            chain_filter: None,
            risk,
            pool_source,
            store,
            submitter,
            denylist,
            metrics: Arc::new(Metrics::new()),
            clients: HashMap::new(),
            cycles: 0,
        }
    }

    /// Only process this chain key.
    pub fn with_chain_filter(mut self, chain: Option<String>) -> Self {
        self.chain_filter = chain.map(|c| c.to_lowercase());
        self
    }

    /// Use `client` for `chain` instead of connecting to its RPC URL.
    pub fn with_client(mut self, chain: &str, client: Arc<dyn ChainClient>) -> Self {
        self.clients.insert(chain.to_string(), client);
        self
    }

    pub fn metrics(&self) -> Arc<Metrics> {
        Arc::clone(&self.metrics)
    }

    pub fn risk(&self) -> &RiskManager {
        &self.risk
    }

    pub fn risk_mut(&mut self) -> &mut RiskManager {
        &mut self.risk
    }

    pub fn chain_keys(&self) -> Vec<String> {
        self.config
            .chains
            .keys()
            .filter(|k| self.chain_filter.as_deref().map_or(true, |f| f == k.as_str()))
            .cloned()
            .collect()
    }

    /// Cycle loop. Returns once `shutdown` is set, checked between cycles.
    pub async fn run(&mut self, shutdown: Arc<AtomicBool>) {
        let delay = self.config.strategy.cycle_delay();
        let backoff = self.config.strategy.error_backoff();
        info!(
            "Cycle loop started: {} chain(s), delay {:?}, error backoff {:?}",
            self.chain_keys().len(),
            delay,
            backoff
        );

        while !shutdown.load(Ordering::SeqCst) {
            let pause = match self.run_cycle().await {
                Ok(_) => delay,
                Err(e) => {
                    error!("Cycle failed: {:#}", e);
                    backoff
                }
            };

            let every = self.config.strategy.metrics_log_every_cycles;
            if every > 0 && self.cycles % every == 0 {
                info!("Metrics after {} cycles:\n{}", self.cycles, self.metrics.render());
            }

            if shutdown.load(Ordering::SeqCst) {
                break;
            }
            tokio::time::sleep(pause).await;
        }
        info!("Cycle loop stopped after {} cycles", self.cycles);
    }

    /// One pass over every chain, unless the risk gate is closed.
    pub async fn run_cycle(&mut self) -> Result<CycleReport> {
        self.cycles += 1;

        if let Some(reason) = self.risk.pause_reason() {
            warn!("Trading paused: {}", reason);
            let label = match reason {
                PauseReason::BaseFeeSpike { .. } => "base_fee",
                PauseReason::FailureRate { .. } => "failure_rate",
            };
            self.metrics.record_pause(label);
            return Ok(CycleReport::Paused(reason));
        }

        let mut reports = Vec::new();
        for chain in self.chain_keys() {
            let report = match self.process_chain(&chain).await {
                Ok(r) => r,
                Err(e) => {
                    warn!("[{}] Chain failed this cycle: {:#}", chain, e);
                    ChainReport::skipped(&chain, "chain error")
                }
            };
            reports.push(report);
        }
        Ok(CycleReport::Completed(reports))
    }

    fn client_for(&mut self, chain: &str, rpc_url: &str) -> Result<Arc<dyn ChainClient>> {
        if let Some(client) = self.clients.get(chain) {
            return Ok(Arc::clone(client));
        }
        info!("[{}] Connecting to RPC {}", chain, truncate_url(rpc_url));
        let client: Arc<dyn ChainClient> = Arc::new(RpcChainClient::connect_http(rpc_url)?);
        self.clients.insert(chain.to_string(), Arc::clone(&client));
        Ok(client)
    }

    async fn process_chain(&mut self, chain: &str) -> Result<ChainReport> {
        let Some(chain_cfg) = self.config.chains.get(chain).cloned() else {
            return Ok(ChainReport::skipped(chain, "unknown chain"));
        };
        let Some(rpc_url) = chain_cfg.rpc_url() else {
            warn!("[{}] No RPC URL configured, skipping", chain);
            return Ok(ChainReport::skipped(chain, "no rpc"));
        };
        let client = match self.client_for(chain, rpc_url) {
            Ok(c) => c,
            Err(e) => {
                warn!("[{}] Cannot connect to RPC, skipping: {:#}", chain, e);
                return Ok(ChainReport::skipped(chain, "rpc connect failed"));
            }
        };

        match client.fee_sample().await {
            Ok(sample) => self.risk.record_base_fee(sample.base_fee_gwei()),
            Err(e) => debug!("[{}] No fee sample this cycle: {:#}", chain, e),
        }

        let quoter = chain_cfg.quoter_address();
        if let Some(q) = quoter {
            match client.has_code(q).await {
                Ok(true) => {}
                Ok(false) => {
                    warn!("[{}] QuoterV2 not deployed at {:?}, skipping chain", chain, q);
                    return Ok(ChainReport::skipped(chain, "quoter missing"));
                }
                Err(e) => warn!("[{}] Could not fetch quoter bytecode: {:#}", chain, e),
            }
        }

        let mut report = ChainReport {
            chain: chain.to_string(),
            ..Default::default()
        };

        let book = TokenBook::from_config(self.config.tokens_for(chain));
        let index = self.leg_index(chain, &chain_cfg, &book, &mut report).await;
        report.legs = index.len();

        let strategy = &self.config.strategy;
        let policy = RoutePolicy {
            allow_closed_two_hop: strategy.allow_two_hop_cycles,
        };
        let routes = generate_routes(&index, policy, strategy.max_routes_per_cycle);
        report.routes = routes.len();
        info!("[{}] Legs: {}, routes: {}", chain, index.len(), routes.len());
        if routes.is_empty() {
            self.metrics.record_routes(chain, 0, 0);
            return Ok(report);
        }

        let amount_in = U256::from(strategy.quote_amount_in);
        let flash_fee_pct = strategy.effective_flash_fee_pct();
        let mut candidates = Vec::new();
        for route in routes {
            let amount_out = quote_route(&route, client.as_ref(), quoter, amount_in, strategy.quote_mode).await;
            let (in_usd, out_usd) = book.value_quote(
                &route.input(),
                &route.output(),
                amount_in,
                amount_out,
                strategy.reference_amount_usd,
            );
            let denied = self.denylist.is_route_denied(&route);
            let score = score_route(
                in_usd,
                out_usd,
                strategy.gas_usd_estimate,
                flash_fee_pct,
                route.tvl_usd(),
                route.hop_count(),
                denied,
            );
            debug!("[{}] {} -> out {} profit ${:.6}", chain, route, amount_out, score.profit_usd);

            if !is_accepted(&score, strategy.profit_floor_usd) {
                continue;
            }
            let candidate = Candidate {
                route,
                amount_in,
                amount_out,
                amount_in_usd: in_usd,
                amount_out_usd: out_usd,
                score,
            };
            if let Err(e) = self.store.insert_quote(&candidate.to_quote_record(chain, Utc::now())).await {
                warn!("[{}] Failed to record quote: {:#}", chain, e);
            }
            candidates.push(candidate);
        }

        let ranked = rank_candidates(candidates);
        report.accepted = ranked.len();
        self.metrics.record_routes(chain, report.routes, report.accepted);
        info!("[{}] Profitable routes: {}", chain, ranked.len());

        for (i, c) in ranked.iter().take(TOP_CANDIDATES_LOGGED).enumerate() {
            info!(
                "[{}] Top #{}: profit=${:.4} hops={} input={} output={}",
                chain,
                i + 1,
                c.score.profit_usd,
                c.route.hop_count(),
                book.symbol_of(&c.route.input()),
                book.symbol_of(&c.route.output())
            );
        }

        let Some(best) = ranked.first() else {
            return Ok(report);
        };
        report.best_profit_usd = Some(best.score.profit_usd);

        let outcome = self
            .submitter
            .submit(
                chain,
                client.as_ref(),
                chain_cfg.private_relay_url(),
                best,
                &mut self.risk,
                self.store.as_ref(),
            )
            .await;
        let profit = matches!(outcome, SubmitOutcome::Submitted { .. }).then_some(best.score.profit_usd);
        self.metrics.record_execution(chain, outcome.status(), profit);
        report.execution = Some(outcome);

        Ok(report)
    }

    /// Discovered pools as legs, or fallback legs when discovery found no
    /// concentrated-liquidity pool.
    async fn leg_index(
        &self,
        chain: &str,
        chain_cfg: &ChainConfig,
        book: &TokenBook,
        report: &mut ChainReport,
    ) -> LegIndex {
        let min_tvl = self.config.strategy.min_tvl_usd;
        let uni = self
            .pool_source
            .fetch_pools(chain, DexKind::ConcentratedLiquidity, chain_cfg.univ3_subgraph(), min_tvl)
            .await;
        let curve = self
            .pool_source
            .fetch_pools(chain, DexKind::StableSwap, chain_cfg.curve_subgraph(), min_tvl)
            .await;
        info!("[{}] Pools => UniV3: {}, Curve: {}", chain, uni.len(), curve.len());
        report.pools = uni.len() + curve.len();

        let router = chain_cfg.router_address();
        let routers = RouterAddresses { univ3_router: router };
        let no_uni = uni.is_empty();
        let mut pools = uni;
        pools.extend(curve);
        let index = build_index(&pools, &routers, self.config.strategy.max_legs);

        let (true, Some(router)) = (no_uni, router) else {
            return index;
        };
        let Some(weth) = book.by_symbol("WETH") else {
            warn!("[{}] No WETH in token book, cannot synthesize fallback legs", chain);
            return index;
        };
        let extra = fallback_legs(&book.stables(), weth, router, MIN_TVL_USD);
        info!("[{}] Using fallback UniV3 legs from token book: {}", chain, extra.len());

        let mut legs = index.legs().to_vec();
        legs.extend(extra);
        LegIndex::from_legs(legs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::FeeSample;
    use crate::config::{QuoteMode, TokenConfig, UniV3Config};
    use crate::execution::RelayClient;
    use crate::quotes::testing::MockChain;
    use crate::routing::encode_path;
    use crate::store::{JsonlStore, NullStore};
    use crate::types::{ExecutionRecord, ExecutionStatus, PoolRecord, PoolRouting, QuoteRecord};
    use alloy::primitives::{Address, Bytes, B256};
    use async_trait::async_trait;
    use std::env;
    use std::fs;

    const TEST_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    fn addr(b: u8) -> Address {
        Address::repeat_byte(b)
    }

    const USDC: u8 = 0x01;
    const WETH: u8 = 0x02;
    const ROUTER: u8 = 0xE0;
    const QUOTER: u8 = 0xE1;

    struct FixedPools(Vec<PoolRecord>);

    #[async_trait]
    impl PoolSource for FixedPools {
        async fn fetch_pools(&self, _chain: &str, dex: DexKind, _url: &str, min_tvl_usd: f64) -> Vec<PoolRecord> {
            self.0
                .iter()
                .filter(|p| p.dex == dex && p.tvl_usd >= min_tvl_usd)
                .cloned()
                .collect()
        }
    }

    /// Every write fails.
    struct FailingStore;

    #[async_trait]
    impl ArbStore for FailingStore {
        async fn insert_pool(&self, _pool: &PoolRecord) -> anyhow::Result<()> {
            anyhow::bail!("disk full")
        }

        async fn insert_quote(&self, _quote: &QuoteRecord) -> anyhow::Result<()> {
            anyhow::bail!("disk full")
        }

        async fn insert_execution(&self, _execution: &ExecutionRecord) -> anyhow::Result<()> {
            anyhow::bail!("disk full")
        }

        async fn get_recent_quotes(&self, _chain: &str, _limit: usize) -> anyhow::Result<Vec<QuoteRecord>> {
            Ok(Vec::new())
        }

        async fn get_recent_executions(&self, _chain: &str, _limit: usize) -> anyhow::Result<Vec<ExecutionRecord>> {
            Ok(Vec::new())
        }
    }

    struct SilentRelay;

    #[async_trait]
    impl RelayClient for SilentRelay {
        async fn send_private(&self, _url: &str, _raw: &Bytes) -> anyhow::Result<Option<B256>> {
            Ok(None)
        }
    }

    fn v3_pool(pool: u8, t0: u8, t1: u8, fee: u32) -> PoolRecord {
        PoolRecord {
            chain: "base".into(),
            dex: DexKind::ConcentratedLiquidity,
            address: addr(pool),
            token0: addr(t0),
            token1: addr(t1),
            routing: Some(PoolRouting::FeeTier(fee)),
            tvl_usd: 500_000.0,
        }
    }

    fn config(gas_usd: f64) -> BotConfig {
        let mut cfg = BotConfig::from_toml_str("", |_| None).unwrap();
        cfg.strategy.gas_usd_estimate = gas_usd;
        cfg.strategy.profit_floor_usd = 0.001;
        cfg.strategy.allow_two_hop_cycles = true;
        cfg.strategy.flashloan.enabled = true;
        cfg.strategy.flashloan.fee_pct = 0.0007;
        cfg.strategy.quote_mode = QuoteMode::Independent;
        cfg.chains.insert(
            "base".into(),
            ChainConfig {
                rpc: "http://localhost:8545".into(),
                univ3: Some(UniV3Config {
                    router: format!("{:?}", addr(ROUTER)),
                    quoter_v2: format!("{:?}", addr(QUOTER)),
                    subgraph: "https://index.example/univ3".into(),
                }),
                ..Default::default()
            },
        );
        cfg.tokens.insert(
            "base".into(),
            vec![
                TokenConfig {
                    symbol: "USDC".into(),
                    address: format!("{:?}", addr(USDC)),
                    decimals: 6,
                    price_usd: Some(1.0),
                    stable: true,
                },
                TokenConfig {
                    symbol: "WETH".into(),
                    address: format!("{:?}", addr(WETH)),
                    decimals: 18,
                    price_usd: None,
                    stable: false,
                },
            ],
        );
        cfg
    }

    /// USDC->WETH at 500 through P1, WETH->USDC at 3000 through P2; the
    /// second leg quotes 1_005_000 for 1_000_000 in.
    fn round_trip_chain() -> MockChain {
        let mut chain = MockChain {
            chain_id: 8453,
            fee: Some(FeeSample {
                base_fee: 1_000_000_000,
                priority_fee_p50: 100_000_000,
                priority_fee_p90: 200_000_000,
            }),
            ..Default::default()
        };
        chain.code.insert(addr(QUOTER), true);
        let a = encode_path(&[addr(USDC), addr(WETH)], &[500]).unwrap();
        let b = encode_path(&[addr(WETH), addr(USDC)], &[3000]).unwrap();
        chain.path_rates.insert(a.to_vec(), 400);
        chain.path_rates.insert(b.to_vec(), 1_005_000);
        chain
    }

    fn round_trip_pools() -> Arc<FixedPools> {
        Arc::new(FixedPools(vec![v3_pool(0x10, USDC, WETH, 500), v3_pool(0x11, WETH, USDC, 3000)]))
    }

    fn bot(cfg: BotConfig, chain: Arc<MockChain>, store: Arc<dyn ArbStore>) -> ArbBot {
        let submitter = ExecutionSubmitter::new(&cfg.strategy, Some(TEST_KEY), Some(addr(0xCC)), Arc::new(SilentRelay));
        ArbBot::new(cfg, round_trip_pools(), store, submitter, DenylistFilter::default()).with_client("base", chain)
    }

    fn completed(report: CycleReport) -> Vec<ChainReport> {
        match report {
            CycleReport::Completed(r) => r,
            CycleReport::Paused(p) => panic!("unexpected pause: {}", p),
        }
    }

    #[tokio::test]
    async fn test_round_trip_is_selected_and_executed() {
        let dir = env::temp_dir().join("cyclearb_bot_e2e");
        let _ = fs::remove_dir_all(&dir);
        let store = Arc::new(JsonlStore::open(&dir).unwrap());
        let chain = Arc::new(round_trip_chain());
        let mut bot = bot(config(0.001), Arc::clone(&chain), store.clone());

        let reports = completed(bot.run_cycle().await.unwrap());
        let r = &reports[0];
        assert_eq!(r.skipped, None);
        // the reverse rotation through the same two pools is quoted too but reverts
        assert_eq!(r.routes, 2);
        assert_eq!(r.accepted, 1);
        // 1.005 - 1.0 - 0.001 gas - 0.0007 flash fee
        let profit = r.best_profit_usd.unwrap();
        assert!((profit - 0.0033).abs() < 1e-9, "profit {}", profit);
        assert!(matches!(r.execution, Some(SubmitOutcome::Submitted { private_sent: false, .. })));
        assert_eq!(chain.broadcasts.lock().unwrap().len(), 1);

        let quotes = store.get_recent_quotes("base", 10).await.unwrap();
        assert_eq!(quotes.len(), 1);
        assert_eq!(quotes[0].amount_out, U256::from(1_005_000u64));
        assert_eq!(quotes[0].legs[0].token_in, addr(USDC));
        let execs = store.get_recent_executions("base", 10).await.unwrap();
        assert_eq!(execs[0].status, ExecutionStatus::Pending);
        assert_eq!(bot.risk().fee_samples(), 1);
        assert_eq!(bot.risk().outcome_samples(), 1);

        let _ = fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_round_trip_rejected_with_higher_gas() {
        let chain = Arc::new(round_trip_chain());
        let mut bot = bot(config(0.01), Arc::clone(&chain), Arc::new(NullStore));

        let reports = completed(bot.run_cycle().await.unwrap());
        assert_eq!(reports[0].routes, 2);
        assert_eq!(reports[0].accepted, 0);
        assert!(reports[0].execution.is_none());
        assert!(chain.broadcasts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_strict_policy_drops_two_hop_round_trip() {
        let mut cfg = config(0.001);
        cfg.strategy.allow_two_hop_cycles = false;
        let mut bot = bot(cfg, Arc::new(round_trip_chain()), Arc::new(NullStore));
        let reports = completed(bot.run_cycle().await.unwrap());
        assert_eq!(reports[0].routes, 0);
    }

    #[tokio::test]
    async fn test_missing_quoter_code_skips_chain() {
        let mut chain = round_trip_chain();
        chain.code.clear();
        let chain = Arc::new(chain);
        let mut bot = bot(config(0.001), Arc::clone(&chain), Arc::new(NullStore));
        let reports = completed(bot.run_cycle().await.unwrap());
        assert_eq!(reports[0].skipped, Some("quoter missing"));
        assert!(chain.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_chain_without_rpc_is_skipped() {
        let mut cfg = config(0.001);
        cfg.chains.insert("arbitrum".into(), ChainConfig::default());
        let mut bot = bot(cfg, Arc::new(round_trip_chain()), Arc::new(NullStore)).with_chain_filter(Some("arbitrum".into()));
        let reports = completed(bot.run_cycle().await.unwrap());
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].skipped, Some("no rpc"));
    }

    #[tokio::test]
    async fn test_paused_cycle_touches_no_chain() {
        let chain = Arc::new(round_trip_chain());
        let mut bot = bot(config(0.001), Arc::clone(&chain), Arc::new(NullStore));
        for i in 0..20 {
            bot.risk_mut().record_outcome(i % 4 != 0);
        }
        let report = bot.run_cycle().await.unwrap();
        assert!(matches!(report, CycleReport::Paused(PauseReason::FailureRate { .. })));
        assert!(chain.calls.lock().unwrap().is_empty());
        assert_eq!(bot.metrics().counter(crate::metrics::CYCLES_PAUSED, &[("reason", "failure_rate")]), 1);
    }

    #[tokio::test]
    async fn test_fallback_legs_when_no_uni_pools() {
        let cfg = config(0.001);
        let submitter = ExecutionSubmitter::new(&cfg.strategy, None, None, Arc::new(SilentRelay));
        let mut bot = ArbBot::new(
            cfg,
            Arc::new(FixedPools(Vec::new())),
            Arc::new(NullStore),
            submitter,
            DenylistFilter::default(),
        )
        .with_client("base", Arc::new(round_trip_chain()));

        let reports = completed(bot.run_cycle().await.unwrap());
        let r = &reports[0];
        assert_eq!(r.pools, 0);
        // one stable x two fee tiers x two directions
        assert_eq!(r.legs, 4);
        // USDC->WETH@500->USDC@3000 and WETH->USDC@500->WETH@3000
        assert_eq!(r.routes, 2);
        assert_eq!(r.accepted, 1);
        assert_eq!(
            r.execution,
            Some(SubmitOutcome::Skipped(crate::execution::SkipReason::MissingSigningKey))
        );
    }

    #[tokio::test]
    async fn test_store_failures_do_not_abort_cycle() {
        let chain = Arc::new(round_trip_chain());
        let mut bot = bot(config(0.001), Arc::clone(&chain), Arc::new(FailingStore));

        let reports = completed(bot.run_cycle().await.unwrap());
        assert_eq!(reports[0].accepted, 1);
        assert!(matches!(reports[0].execution, Some(SubmitOutcome::Submitted { .. })));
        assert_eq!(chain.broadcasts.lock().unwrap().len(), 1);
        assert_eq!(bot.risk().outcome_samples(), 1);
    }

    #[tokio::test]
    async fn test_bad_rpc_url_only_skips_its_chain() {
        let mut cfg = config(0.001);
        cfg.chains.insert(
            "arbitrum".into(),
            ChainConfig {
                rpc: "not a url".into(),
                ..Default::default()
            },
        );
        let chain = Arc::new(round_trip_chain());
        let mut bot = bot(cfg, Arc::clone(&chain), Arc::new(NullStore));

        let reports = completed(bot.run_cycle().await.unwrap());
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].chain, "arbitrum");
        assert_eq!(reports[0].skipped, Some("rpc connect failed"));
        assert_eq!(reports[1].chain, "base");
        assert_eq!(reports[1].skipped, None);
        assert_eq!(reports[1].accepted, 1);
        assert!(!chain.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_truncate_url_respects_char_boundaries() {
        let url = format!("http://{}\u{e9}.example", "a".repeat(32));
        // byte 40 falls inside the two-byte char
        assert!(!url.is_char_boundary(40));
        let t = truncate_url(&url);
        assert_eq!(t.chars().count(), 40);
        assert!(t.ends_with('\u{e9}'));
        assert_eq!(truncate_url("http://short"), "http://short");
    }

    #[test]
    fn test_truncated_url_logs_under_subscriber() {
        let subscriber = tracing_subscriber::fmt().with_writer(std::io::sink).finish();
        tracing::subscriber::with_default(subscriber, || {
            let url = format!("http://{}\u{e9}.example", "a".repeat(32));
            info!("Connecting to RPC {}", truncate_url(&url));
        });
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown_flag() {
        let mut cfg = config(0.01);
        cfg.strategy.cycle_delay_ms = 1;
        let mut bot = bot(cfg, Arc::new(round_trip_chain()), Arc::new(NullStore));
        let shutdown = Arc::new(AtomicBool::new(true));
        bot.run(shutdown).await;
        assert_eq!(bot.cycles, 0);
    }
}
