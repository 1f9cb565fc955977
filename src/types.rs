//! Core types for the cyclic arbitrage pipeline
//!
//! Legs, routes, scores and the audit rows written after scoring and
//! execution. Routes validate their own shape on construction so every
//! downstream stage (quoting, scoring, calldata) can rely on it.
//!
//! Created: 2026-02-03
//! Modified: 2026-02-05 - Two-hop cycle policy, per-leg TVL
//! Modified: 2026-02-09 - fallback_reason on execution rows

use alloy::primitives::{keccak256, Address, Bytes, B256, U256};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// DEX family of a leg. Selects the quote call shape and the executor hop kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DexKind {
    /// Uniswap V3 style pools, quoted by path through QuoterV2
    ConcentratedLiquidity,
    /// Curve style pools, quoted by coin index pair through `get_dy`
    StableSwap,
}

impl DexKind {
    /// Hop discriminant understood by the executor contract.
    pub fn executor_code(&self) -> u8 {
        match self {
            DexKind::ConcentratedLiquidity => 1,
            DexKind::StableSwap => 2,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DexKind::ConcentratedLiquidity => "univ3",
            DexKind::StableSwap => "curve",
        }
    }
}

impl fmt::Display for DexKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Errors raised when a leg or route would violate its shape invariants.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    #[error("leg swaps a token for itself ({0})")]
    IdentityLeg(Address),
    #[error("route must have 2 or 3 legs, got {0}")]
    BadLength(usize),
    #[error("leg {0} output does not chain into the next leg")]
    Unchained(usize),
    #[error("two-hop route returns to its input token")]
    IdentityLoop,
    #[error("two-hop cycle goes back through the same pool")]
    SamePoolRoundTrip,
    #[error("three-hop route does not close on its input token")]
    OpenCycle,
}

/// One directed swap hop through one pool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Leg {
    pub dex_kind: DexKind,
    /// Router for concentrated-liquidity legs, the pool itself for stable-swap legs
    pub pool_or_router_address: Address,
    /// Pre-encoded hop data: packed V3 path, or abi-encoded `(int128 i, int128 j)`
    pub call_payload: Bytes,
    pub token_in: Address,
    pub token_out: Address,
    /// Pool the leg trades through (equals the target for stable-swap legs)
    pub source_pool: Address,
    pub tvl_usd: f64,
}

impl Leg {
    pub fn new(
        dex_kind: DexKind,
        pool_or_router_address: Address,
        call_payload: Bytes,
        token_in: Address,
        token_out: Address,
        source_pool: Address,
        tvl_usd: f64,
    ) -> Result<Self, RouteError> {
        if token_in == token_out {
            return Err(RouteError::IdentityLeg(token_in));
        }
        Ok(Self {
            dex_kind,
            pool_or_router_address,
            call_payload,
            token_in,
            token_out,
            source_pool,
            tvl_usd,
        })
    }
}

/// How two-hop routes are admitted.
///
/// The strict policy rejects any two-hop route whose output equals its input.
/// `allow_closed_two_hop` admits such round trips as long as the two legs
/// trade through different pools; a round trip through the same pool is
/// always rejected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RoutePolicy {
    pub allow_closed_two_hop: bool,
}

/// An ordered sequence of 2 or 3 chained legs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Route {
    legs: Vec<Leg>,
}

impl Route {
    /// Validate and build a route.
    pub fn new(legs: Vec<Leg>, policy: RoutePolicy) -> Result<Self, RouteError> {
        match legs.len() {
            2 | 3 => {}
            n => return Err(RouteError::BadLength(n)),
        }
        if let Some(i) = legs.windows(2).position(|w| w[0].token_out != w[1].token_in) {
            return Err(RouteError::Unchained(i));
        }

        let first = &legs[0];
        let last = &legs[legs.len() - 1];
        if legs.len() == 2 {
            if first.token_in == last.token_out {
                if !policy.allow_closed_two_hop {
                    return Err(RouteError::IdentityLoop);
                }
                if first.source_pool == last.source_pool {
                    return Err(RouteError::SamePoolRoundTrip);
                }
            }
        } else if last.token_out != first.token_in {
            return Err(RouteError::OpenCycle);
        }

        Ok(Self { legs })
    }

    pub fn legs(&self) -> &[Leg] {
        &self.legs
    }

    pub fn hop_count(&self) -> usize {
        self.legs.len()
    }

    pub fn input(&self) -> Address {
        self.legs[0].token_in
    }

    pub fn output(&self) -> Address {
        self.legs[self.legs.len() - 1].token_out
    }

    pub fn is_closed(&self) -> bool {
        self.input() == self.output()
    }

    /// Liquidity of the route is that of its shallowest leg.
    pub fn tvl_usd(&self) -> f64 {
        self.legs
            .iter()
            .map(|l| l.tvl_usd)
            .fold(f64::INFINITY, f64::min)
    }

    /// keccak256 over the route's canonical JSON. Stable across runs for
    /// identical legs, used as the audit key for quotes.
    pub fn route_hash(&self) -> B256 {
        let json = serde_json::to_vec(self).unwrap_or_default();
        keccak256(json)
    }

    pub fn summary(&self) -> Vec<LegSummary> {
        self.legs.iter().map(LegSummary::from).collect()
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.input())?;
        for leg in &self.legs {
            write!(f, " -[{}]-> {:?}", leg.dex_kind, leg.token_out)?;
        }
        Ok(())
    }
}

/// Profitability verdict for one quoted route.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RouteScore {
    /// Net of gas and flash-loan fee, may be negative
    pub profit_usd: f64,
    pub gas_usd: f64,
    pub flash_fee_usd: f64,
    pub tvl_usd: f64,
    pub allowed: bool,
}

/// Pool routing data as reported by discovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PoolRouting {
    /// V3 fee in hundredths of a bip (500 = 0.05%)
    FeeTier(u32),
    /// Curve coin indices of token0 and token1
    CoinPair { i: u8, j: u8 },
}

/// A discovered pool, normalized across DEX families.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolRecord {
    pub chain: String,
    pub dex: DexKind,
    pub address: Address,
    pub token0: Address,
    pub token1: Address,
    /// None when discovery could not resolve a fee tier or coin indices
    pub routing: Option<PoolRouting>,
    pub tvl_usd: f64,
}

/// Hop summary persisted with quote and execution rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegSummary {
    pub dex_kind: DexKind,
    pub target: Address,
    /// Pool traded through; zero on rows written before it was recorded
    #[serde(default)]
    pub source_pool: Address,
    pub token_in: Address,
    pub token_out: Address,
}

impl From<&Leg> for LegSummary {
    fn from(leg: &Leg) -> Self {
        Self {
            dex_kind: leg.dex_kind,
            target: leg.pool_or_router_address,
            source_pool: leg.source_pool,
            token_in: leg.token_in,
            token_out: leg.token_out,
        }
    }
}

/// Audit row for an accepted candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteRecord {
    pub ts: DateTime<Utc>,
    pub chain: String,
    pub route_hash: B256,
    pub amount_in: U256,
    pub amount_out: U256,
    pub amount_in_usd: f64,
    pub amount_out_usd: f64,
    pub gas_usd: f64,
    pub tvl_usd: f64,
    pub profit_usd: f64,
    pub legs: Vec<LegSummary>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    /// Broadcast accepted, inclusion not tracked
    Pending,
    Failed,
}

/// Audit row for one execution attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionRecord {
    pub ts: DateTime<Utc>,
    pub chain: String,
    pub tx_hash: Option<B256>,
    pub private_sent: bool,
    pub status: ExecutionStatus,
    pub gas_used: Option<u64>,
    pub gas_price_gwei: Option<f64>,
    pub profit_usd: Option<f64>,
    pub reason: Option<String>,
    /// Set when a private relay was tried and the public path was used instead
    #[serde(default)]
    pub fallback_reason: Option<String>,
}
