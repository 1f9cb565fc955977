//! Route scoring and candidate ranking
//!
//! Net profit = (out - in) - gas - flash fee, all in USD. A route becomes a
//! candidate only when the admission gate passes (TVL, hop count, denylist)
//! and net profit is strictly above the configured floor.

use crate::types::{QuoteRecord, Route, RouteScore};
use alloy::primitives::U256;
use chrono::{DateTime, Utc};

/// Minimum route liquidity for admission
pub const MIN_TVL_USD: f64 = 100_000.0;

/// Longest route admitted
pub const MAX_HOPS: usize = 3;

pub fn route_allowed(tvl_usd: f64, hop_count: usize, denied: bool) -> bool {
    tvl_usd >= MIN_TVL_USD && hop_count <= MAX_HOPS && !denied
}

/// Pure profitability verdict for one quoted route.
pub fn score_route(
    amount_in_usd: f64,
    amount_out_usd: f64,
    gas_usd: f64,
    flash_fee_pct: f64,
    tvl_usd: f64,
    hop_count: usize,
    denied: bool,
) -> RouteScore {
    let flash_fee_usd = amount_in_usd * flash_fee_pct;
    let profit_usd = (amount_out_usd - amount_in_usd) - gas_usd - flash_fee_usd;
    RouteScore {
        profit_usd,
        gas_usd,
        flash_fee_usd,
        tvl_usd,
        allowed: route_allowed(tvl_usd, hop_count, denied),
    }
}

/// Candidate admission: allowed and strictly above the profit floor.
pub fn is_accepted(score: &RouteScore, profit_floor_usd: f64) -> bool {
    score.allowed && score.profit_usd > profit_floor_usd
}

/// A quoted, scored route.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub route: Route,
    pub amount_in: U256,
    pub amount_out: U256,
    pub amount_in_usd: f64,
    pub amount_out_usd: f64,
    pub score: RouteScore,
}

impl Candidate {
    pub fn to_quote_record(&self, chain: &str, ts: DateTime<Utc>) -> QuoteRecord {
        QuoteRecord {
            ts,
            chain: chain.to_string(),
            route_hash: self.route.route_hash(),
            amount_in: self.amount_in,
            amount_out: self.amount_out,
            amount_in_usd: self.amount_in_usd,
            amount_out_usd: self.amount_out_usd,
            gas_usd: self.score.gas_usd,
            tvl_usd: self.score.tvl_usd,
            profit_usd: self.score.profit_usd,
            legs: self.route.summary(),
        }
    }
}

/// Sort best first. Stable, so equal profits keep enumeration order.
pub fn rank_candidates(mut candidates: Vec<Candidate>) -> Vec<Candidate> {
    candidates.sort_by(|a, b| b.score.profit_usd.total_cmp(&a.score.profit_usd));
    candidates
}
