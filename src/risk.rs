//! Risk Manager: circuit breaker over recent gas and submission outcomes
//!
//! Purpose:
//!     Stops trading when gas is spiking relative to recent history or when
//!     too many recent submissions failed. Also picks the gas price for
//!     execution.
//!
//! Created: 2026-02-04
//!
//! Design:
//!     - Two bounded FIFO windows (100 entries): base fees in gwei, outcomes
//!     - Fee gate: active once the window holds more than 10 samples. Sort the
//!       window, threshold = sorted[floor(len * pctl)]; pause when the latest
//!       observation is strictly above it. An index past the end never trips.
//!     - Failure gate: active once 20 outcomes exist, evaluated over the last
//!       20; pause when the failure percentage exceeds the configured limit
//!     - Owned by the cycle driver; never reset except by restart
//!     - Gas price: base + p50 priority + base/10, capped; the cap is also
//!       the fallback when fee history cannot be fetched

use crate::chain::{ChainClient, FeeSample};
use crate::config::RiskConfig;
use std::collections::VecDeque;
use std::fmt;
use tracing::{debug, warn};

/// Max entries per rolling window
pub const WINDOW_SIZE: usize = 100;

/// Fee gate needs strictly more samples than this
pub const MIN_FEE_SAMPLES: usize = 10;

/// Failure gate lookback (and minimum sample count)
pub const FAILURE_LOOKBACK: usize = 20;

const WEI_PER_GWEI: u128 = 1_000_000_000;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PauseReason {
    BaseFeeSpike { latest_gwei: f64, threshold_gwei: f64 },
    FailureRate { rate_pct: f64, limit_pct: f64 },
}

impl fmt::Display for PauseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PauseReason::BaseFeeSpike { latest_gwei, threshold_gwei } => write!(
                f,
                "base fee {:.3} gwei above window percentile {:.3} gwei",
                latest_gwei, threshold_gwei
            ),
            PauseReason::FailureRate { rate_pct, limit_pct } => write!(
                f,
                "failure rate {:.1}% over last {} submissions exceeds {:.1}%",
                rate_pct, FAILURE_LOOKBACK, limit_pct
            ),
        }
    }
}

/// Rolling risk state plus the gas price policy.
pub struct RiskManager {
    config: RiskConfig,
    base_fees_gwei: VecDeque<f64>,
    /// true = failure
    failures: VecDeque<bool>,
}

impl RiskManager {
    pub fn new(config: RiskConfig) -> Self {
        Self {
            config,
            base_fees_gwei: VecDeque::with_capacity(WINDOW_SIZE),
            failures: VecDeque::with_capacity(WINDOW_SIZE),
        }
    }

    pub fn record_base_fee(&mut self, base_fee_gwei: f64) {
        push_bounded(&mut self.base_fees_gwei, base_fee_gwei);
    }

    pub fn record_outcome(&mut self, success: bool) {
        push_bounded(&mut self.failures, !success);
    }

    pub fn fee_samples(&self) -> usize {
        self.base_fees_gwei.len()
    }

    pub fn outcome_samples(&self) -> usize {
        self.failures.len()
    }

    pub fn should_pause(&self) -> bool {
        self.pause_reason().is_some()
    }

    /// First tripped gate, fee gate checked first.
    pub fn pause_reason(&self) -> Option<PauseReason> {
        self.fee_gate().or_else(|| self.failure_gate())
    }

    fn fee_gate(&self) -> Option<PauseReason> {
        let len = self.base_fees_gwei.len();
        if len <= MIN_FEE_SAMPLES {
            return None;
        }
        let mut sorted: Vec<f64> = self.base_fees_gwei.iter().copied().collect();
        sorted.sort_by(|a, b| a.total_cmp(b));

        let idx = (len as f64 * self.config.pause_above_base_fee_pctl).floor() as usize;
        let threshold = *sorted.get(idx)?;
        let latest = *self.base_fees_gwei.back()?;
        (latest > threshold).then_some(PauseReason::BaseFeeSpike {
            latest_gwei: latest,
            threshold_gwei: threshold,
        })
    }

    fn failure_gate(&self) -> Option<PauseReason> {
        if self.failures.len() < FAILURE_LOOKBACK {
            return None;
        }
        let failed = self
            .failures
            .iter()
            .rev()
            .take(FAILURE_LOOKBACK)
            .filter(|f| **f)
            .count();
        let rate_pct = failed as f64 * 100.0 / FAILURE_LOOKBACK as f64;
        (rate_pct > self.config.pause_fail_rate_pct).then_some(PauseReason::FailureRate {
            rate_pct,
            limit_pct: self.config.pause_fail_rate_pct,
        })
    }

    pub fn max_gas_price_wei(&self) -> u128 {
        (self.config.max_gas_price_gwei as u128).saturating_mul(WEI_PER_GWEI)
    }

    /// base + p50 priority + 10% of base, capped at the configured maximum.
    pub fn gas_price_from_sample(&self, sample: &FeeSample) -> u128 {
        let price = sample
            .base_fee
            .saturating_add(sample.priority_fee_p50)
            .saturating_add(sample.base_fee / 10);
        price.min(self.max_gas_price_wei())
    }

    /// Gas price for a submission. Never fails: a fee history error yields
    /// the configured maximum.
    pub async fn optimal_gas_price(&self, client: &dyn ChainClient) -> u128 {
        match client.fee_sample().await {
            Ok(sample) => {
                let price = self.gas_price_from_sample(&sample);
                debug!(
                    "Gas price {} wei (base {}, p50 tip {}, p90 tip {})",
                    price, sample.base_fee, sample.priority_fee_p50, sample.priority_fee_p90
                );
                price
            }
            Err(e) => {
                warn!("Fee history unavailable, using max gas price: {:#}", e);
                self.max_gas_price_wei()
            }
        }
    }
}

fn push_bounded<T>(window: &mut VecDeque<T>, value: T) {
    if window.len() == WINDOW_SIZE {
        window.pop_front();
    }
    window.push_back(value);
}
