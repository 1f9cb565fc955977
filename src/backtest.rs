//! Quote replay
//!
//! Re-scores recorded quotes under the current strategy settings (gas
//! estimate, flash-loan fee, profit floor, denylist) to show how many past
//! candidates would still be accepted.
//!
//! Created: 2026-02-07
//! Modified: 2026-02-10 - Denylist checks the traded pool, not only the call target

use crate::config::StrategyConfig;
use crate::filters::DenylistFilter;
use crate::routing::{is_accepted, score_route};
use crate::types::QuoteRecord;
use alloy::primitives::B256;
use std::fmt;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReplaySummary {
    pub quotes: usize,
    pub accepted: usize,
    pub denied: usize,
    pub recorded_profit_usd: f64,
    pub replayed_profit_usd: f64,
    pub best: Option<(B256, f64)>,
}

impl ReplaySummary {
    pub fn avg_replayed_profit_usd(&self) -> f64 {
        if self.accepted == 0 {
            0.0
        } else {
            self.replayed_profit_usd / self.accepted as f64
        }
    }
}

impl fmt::Display for ReplaySummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Quotes replayed:      {}", self.quotes)?;
        writeln!(f, "Still accepted:       {}", self.accepted)?;
        writeln!(f, "Denied now:           {}", self.denied)?;
        writeln!(f, "Recorded profit:      ${:.4}", self.recorded_profit_usd)?;
        writeln!(f, "Replayed profit:      ${:.4}", self.replayed_profit_usd)?;
        writeln!(f, "Avg accepted profit:  ${:.4}", self.avg_replayed_profit_usd())?;
        match self.best {
            Some((hash, p)) => write!(f, "Best route:           {:?} (${:.4})", hash, p),
            None => write!(f, "Best route:           none"),
        }
    }
}

fn quote_denied(q: &QuoteRecord, denylist: &DenylistFilter) -> bool {
    q.legs.iter().any(|l| {
        denylist.is_token_denied(&l.token_in)
            || denylist.is_token_denied(&l.token_out)
            || denylist.is_pool_denied(&l.source_pool)
            || denylist.is_pool_denied(&l.target)
    })
}

pub fn replay_quotes(quotes: &[QuoteRecord], strategy: &StrategyConfig, denylist: &DenylistFilter) -> ReplaySummary {
    let mut summary = ReplaySummary {
        quotes: quotes.len(),
        ..Default::default()
    };
    let flash_fee_pct = strategy.effective_flash_fee_pct();

    for q in quotes {
        summary.recorded_profit_usd += q.profit_usd;
        let denied = quote_denied(q, denylist);
        if denied {
            summary.denied += 1;
        }
        let score = score_route(
            q.amount_in_usd,
            q.amount_out_usd,
            strategy.gas_usd_estimate,
            flash_fee_pct,
            q.tvl_usd,
            q.legs.len(),
            denied,
        );
        if !is_accepted(&score, strategy.profit_floor_usd) {
            continue;
        }
        summary.accepted += 1;
        summary.replayed_profit_usd += score.profit_usd;
        if summary.best.map_or(true, |(_, p)| score.profit_usd > p) {
            summary.best = Some((q.route_hash, score.profit_usd));
        }
    }
    summary
}
