//! Quote Simulator
//!
//! One read-only call per leg, dispatched on the leg's DEX kind:
//! concentrated-liquidity legs go through QuoterV2 `quoteExactInput` with the
//! leg's packed path, stable-swap legs call `get_dy` on the pool with the
//! leg's coin indices. A failed leg quote is logged and counts as zero; it
//! never aborts the batch.
//!
//! In `Independent` mode every leg is quoted with the same reference amount
//! and the last leg's output is the route's output. This ignores the
//! amounts actually flowing between legs; `Chained` mode feeds each leg the
//! previous leg's output instead.
//!
//! Created: 2026-02-04
//! Modified: 2026-02-06 - Chained quote mode

use crate::chain::ChainClient;
use crate::config::QuoteMode;
use crate::routing::legs::decode_stable_indices;
use crate::types::{DexKind, Leg, Route};
use alloy::primitives::{Address, U256};
use anyhow::{anyhow, Result};
use tracing::warn;

/// Quote a single leg.
pub async fn quote_leg(
    client: &dyn ChainClient,
    quoter: Option<Address>,
    leg: &Leg,
    amount_in: U256,
) -> Result<U256> {
    match leg.dex_kind {
        DexKind::ConcentratedLiquidity => {
            let quoter = quoter.ok_or_else(|| anyhow!("no QuoterV2 configured"))?;
            client
                .quote_exact_input(quoter, leg.call_payload.clone(), amount_in)
                .await
        }
        DexKind::StableSwap => {
            let (i, j) = decode_stable_indices(&leg.call_payload)
                .ok_or_else(|| anyhow!("malformed stable-swap payload"))?;
            client
                .quote_stable(leg.pool_or_router_address, i, j, amount_in)
                .await
        }
    }
}

/// Quote a leg, turning any failure into zero.
async fn quote_leg_or_zero(
    client: &dyn ChainClient,
    quoter: Option<Address>,
    leg: &Leg,
    amount_in: U256,
) -> U256 {
    match quote_leg(client, quoter, leg, amount_in).await {
        Ok(out) => out,
        Err(e) => {
            warn!(
                "{} quote failed for {:?} -> {:?} via {:?}: {:#}",
                leg.dex_kind, leg.token_in, leg.token_out, leg.pool_or_router_address, e
            );
            U256::ZERO
        }
    }
}

/// Estimated route output in the output token's smallest unit.
pub async fn quote_route(
    route: &Route,
    client: &dyn ChainClient,
    quoter: Option<Address>,
    amount_in: U256,
    mode: QuoteMode,
) -> U256 {
    let mut amount_out = U256::ZERO;
    let mut next_in = amount_in;
    for leg in route.legs() {
        amount_out = quote_leg_or_zero(client, quoter, leg, next_in).await;
        if mode == QuoteMode::Chained {
            if amount_out.is_zero() {
                return U256::ZERO;
            }
            next_in = amount_out;
        }
    }
    amount_out
}


#[cfg(test)]
mod tests {
    use super::testing::MockChain;
    use super::*;
    use crate::routing::legs::{encode_path, encode_stable_indices};
    use crate::types::RoutePolicy;
    use alloy::primitives::Bytes;

    fn addr(b: u8) -> Address {
        Address::repeat_byte(b)
    }

    fn v3_leg(a: u8, b: u8, pool: u8) -> Leg {
        let path = encode_path(&[addr(a), addr(b)], &[500]).unwrap();
        Leg::new(DexKind::ConcentratedLiquidity, addr(0xEE), path, addr(a), addr(b), addr(pool), 1e6).unwrap()
    }

    fn curve_leg(a: u8, b: u8, pool: u8) -> Leg {
        Leg::new(DexKind::StableSwap, addr(pool), encode_stable_indices(0, 1), addr(a), addr(b), addr(pool), 1e6)
            .unwrap()
    }

    fn rate_for(leg: &Leg) -> Vec<u8> {
        leg.call_payload.to_vec()
    }

    #[tokio::test]
    async fn test_independent_mode_keeps_last_leg_output() {
        let a = v3_leg(1, 2, 10);
        let b = v3_leg(2, 3, 11);
        let mut chain = MockChain::default();
        chain.path_rates.insert(rate_for(&a), 2_000_000);
        chain.path_rates.insert(rate_for(&b), 1_005_000);
        let route = Route::new(vec![a, b], RoutePolicy::default()).unwrap();

        let out = quote_route(&route, &chain, Some(addr(0xAA)), U256::from(1_000_000u64), QuoteMode::Independent).await;
        assert_eq!(out, U256::from(1_005_000u64));
        // both legs quoted with the same reference amount
        let calls = chain.calls.lock().unwrap();
        assert!(calls.iter().all(|(_, amt)| *amt == U256::from(1_000_000u64)));
    }

    #[tokio::test]
    async fn test_chained_mode_feeds_previous_output() {
        let a = v3_leg(1, 2, 10);
        let b = v3_leg(2, 3, 11);
        let mut chain = MockChain::default();
        chain.path_rates.insert(rate_for(&a), 2_000_000);
        chain.path_rates.insert(rate_for(&b), 500_000);
        let route = Route::new(vec![a, b], RoutePolicy::default()).unwrap();

        let out = quote_route(&route, &chain, Some(addr(0xAA)), U256::from(1_000_000u64), QuoteMode::Chained).await;
        assert_eq!(out, U256::from(1_000_000u64));
        assert_eq!(chain.calls.lock().unwrap()[1].1, U256::from(2_000_000u64));
    }

    #[tokio::test]
    async fn test_failed_leg_counts_as_zero() {
        let a = v3_leg(1, 2, 10);
        let b = v3_leg(2, 3, 11);
        let mut chain = MockChain::default();
        chain.path_rates.insert(rate_for(&a), 1_000_000);
        let route = Route::new(vec![a.clone(), b.clone()], RoutePolicy::default()).unwrap();
        let out = quote_route(&route, &chain, Some(addr(0xAA)), U256::from(1_000u64), QuoteMode::Independent).await;
        assert_eq!(out, U256::ZERO);

        // an early failure does not poison the last leg in independent mode
        let mut chain = MockChain::default();
        chain.path_rates.insert(rate_for(&b), 1_000_000);
        let route = Route::new(vec![a, b], RoutePolicy::default()).unwrap();
        let out = quote_route(&route, &chain, Some(addr(0xAA)), U256::from(1_000u64), QuoteMode::Independent).await;
        assert_eq!(out, U256::from(1_000u64));
    }

    #[tokio::test]
    async fn test_stable_leg_dispatches_to_get_dy() {
        let a = curve_leg(1, 2, 0x30);
        let b = v3_leg(2, 3, 11);
        let mut chain = MockChain::default();
        chain.stable_rates.insert((addr(0x30), 0, 1), 999_000);
        chain.path_rates.insert(rate_for(&b), 1_000_000);
        let route = Route::new(vec![a, b], RoutePolicy::default()).unwrap();

        let out = quote_route(&route, &chain, Some(addr(0xAA)), U256::from(1_000_000u64), QuoteMode::Chained).await;
        assert_eq!(out, U256::from(999_000u64));
        assert_eq!(chain.calls.lock().unwrap()[0].0, "curve");
    }

    #[tokio::test]
    async fn test_missing_quoter_or_bad_payload_is_an_error() {
        let chain = MockChain::default();
        let leg = v3_leg(1, 2, 10);
        assert!(quote_leg(&chain, None, &leg, U256::from(1u64)).await.is_err());

        let mut bad = curve_leg(1, 2, 0x30);
        bad.call_payload = Bytes::from(vec![1, 2, 3]);
        assert!(quote_leg(&chain, None, &bad, U256::from(1u64)).await.is_err());
    }
}
