//! Leg Index
//!
//! Turns discovered pools into directed swap legs and indexes them by input
//! token so route generation only walks token adjacency.
//!
//! - Concentrated-liquidity pools need a fee tier and a configured router;
//!   the leg payload is the packed V3 path `tokenIn | fee(3 bytes) | tokenOut`.
//! - Stable-swap pools need a coin index pair; the payload is
//!   `abi.encode(int128 i, int128 j)` and the leg targets the pool itself.
//! - Pools that cannot be resolved are skipped, never an error.
//! - Only the `max_legs` legs from the deepest pools are kept.
//!
//! Created: 2026-02-03
//! Modified: 2026-02-05 - Fallback legs from the token book when discovery is empty

use crate::types::{DexKind, Leg, PoolRecord, PoolRouting};
use alloy::primitives::{keccak256, Address, Bytes};
use alloy::sol_types::SolValue;
use std::collections::HashMap;
use thiserror::Error;
use tracing::debug;

/// Largest value a uint24 fee can hold
const MAX_FEE_TIER: u32 = (1 << 24) - 1;

/// Fee tiers used when legs are synthesized from the token book
pub const FALLBACK_FEE_TIERS: [u32; 2] = [500, 3000];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    #[error("path needs tokens.len() == fees.len() + 1 (tokens={tokens}, fees={fees})")]
    Shape { tokens: usize, fees: usize },
    #[error("fee {0} does not fit in uint24")]
    FeeOverflow(u32),
}

/// Router addresses legs are executed through.
#[derive(Debug, Clone, Copy, Default)]
pub struct RouterAddresses {
    pub univ3_router: Option<Address>,
}

/// Packed V3 path: token (20) | fee (3, big-endian) | token (20) | ...
pub fn encode_path(tokens: &[Address], fees: &[u32]) -> Result<Bytes, PathError> {
    if tokens.len() != fees.len() + 1 || fees.is_empty() {
        return Err(PathError::Shape {
            tokens: tokens.len(),
            fees: fees.len(),
        });
    }
    let mut out = Vec::with_capacity(20 + fees.len() * 23);
    out.extend_from_slice(tokens[0].as_slice());
    for (fee, token) in fees.iter().zip(&tokens[1..]) {
        if *fee > MAX_FEE_TIER {
            return Err(PathError::FeeOverflow(*fee));
        }
        out.extend_from_slice(&fee.to_be_bytes()[1..]);
        out.extend_from_slice(token.as_slice());
    }
    Ok(Bytes::from(out))
}

/// Stable-swap hop data: `abi.encode(int128 i, int128 j)`.
pub fn encode_stable_indices(i: u8, j: u8) -> Bytes {
    Bytes::from((i as i128, j as i128).abi_encode_params())
}

/// Inverse of [`encode_stable_indices`]; None on malformed data.
pub fn decode_stable_indices(payload: &[u8]) -> Option<(i128, i128)> {
    <(i128, i128)>::abi_decode_params(payload).ok()
}

/// Directed legs indexed by `token_in`, in insertion order.
#[derive(Debug, Clone, Default)]
pub struct LegIndex {
    legs: Vec<Leg>,
    by_token_in: HashMap<Address, Vec<usize>>,
}

impl LegIndex {
    pub fn from_legs(legs: Vec<Leg>) -> Self {
        let mut by_token_in: HashMap<Address, Vec<usize>> = HashMap::new();
        for (i, leg) in legs.iter().enumerate() {
            by_token_in.entry(leg.token_in).or_default().push(i);
        }
        Self { legs, by_token_in }
    }

    pub fn legs(&self) -> &[Leg] {
        &self.legs
    }

    pub fn len(&self) -> usize {
        self.legs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.legs.is_empty()
    }

    /// Legs starting at `token`, in insertion order.
    pub fn outgoing(&self, token: Address) -> impl Iterator<Item = &Leg> + '_ {
        self.outgoing_indexed(token).map(|(_, leg)| leg)
    }

    /// Same as [`LegIndex::outgoing`], with each leg's insertion position.
    pub fn outgoing_indexed(&self, token: Address) -> impl Iterator<Item = (usize, &Leg)> + '_ {
        self.by_token_in
            .get(&token)
            .into_iter()
            .flatten()
            .map(move |&i| (i, &self.legs[i]))
    }
}

/// Build the leg index from discovered pools.
///
/// Pools are visited deepest first (stable sort on TVL, so discovery order
/// breaks ties) and each resolvable pool contributes its forward then reverse
/// leg until `max_legs` is reached.
pub fn build_index(pools: &[PoolRecord], routers: &RouterAddresses, max_legs: usize) -> LegIndex {
    let mut ordered: Vec<&PoolRecord> = pools.iter().collect();
    ordered.sort_by(|a, b| b.tvl_usd.total_cmp(&a.tvl_usd));

    let mut legs = Vec::new();
    for pool in ordered {
        if legs.len() >= max_legs {
            break;
        }
        match pool_legs(pool, routers) {
            Some(pair) => {
                for leg in pair {
                    if legs.len() < max_legs {
                        legs.push(leg);
                    }
                }
            }
            None => debug!("Skipping unresolvable {} pool {:?}", pool.dex, pool.address),
        }
    }
    LegIndex::from_legs(legs)
}

/// Forward and reverse legs for one pool, or None if routing is unresolvable.
fn pool_legs(pool: &PoolRecord, routers: &RouterAddresses) -> Option<[Leg; 2]> {
    if pool.token0.is_zero() || pool.token1.is_zero() || pool.token0 == pool.token1 {
        return None;
    }

    match (pool.dex, pool.routing?) {
        (DexKind::ConcentratedLiquidity, PoolRouting::FeeTier(fee)) => {
            if fee == 0 {
                return None;
            }
            let router = routers.univ3_router?;
            let forward = encode_path(&[pool.token0, pool.token1], &[fee]).ok()?;
            let reverse = encode_path(&[pool.token1, pool.token0], &[fee]).ok()?;
            Some([
                Leg::new(pool.dex, router, forward, pool.token0, pool.token1, pool.address, pool.tvl_usd).ok()?,
                Leg::new(pool.dex, router, reverse, pool.token1, pool.token0, pool.address, pool.tvl_usd).ok()?,
            ])
        }
        (DexKind::StableSwap, PoolRouting::CoinPair { i, j }) => {
            if i == j || pool.address.is_zero() {
                return None;
            }
            Some([
                Leg::new(
                    pool.dex,
                    pool.address,
                    encode_stable_indices(i, j),
                    pool.token0,
                    pool.token1,
                    pool.address,
                    pool.tvl_usd,
                )
                .ok()?,
                Leg::new(
                    pool.dex,
                    pool.address,
                    encode_stable_indices(j, i),
                    pool.token1,
                    pool.token0,
                    pool.address,
                    pool.tvl_usd,
                )
                .ok()?,
            ])
        }
        _ => None,
    }
}

/// Legs between each stable and the wrapped native token at the fallback fee
/// tiers, both directions. Used when discovery returned no V3 pools.
pub fn fallback_legs(stables: &[Address], weth: Address, router: Address, tvl_usd: f64) -> Vec<Leg> {
    let mut legs = Vec::new();
    for &stable in stables {
        for fee in FALLBACK_FEE_TIERS {
            let pool = synthetic_pool_id(stable, weth, fee);
            for (a, b) in [(stable, weth), (weth, stable)] {
                let Ok(path) = encode_path(&[a, b], &[fee]) else { continue };
                if let Ok(leg) = Leg::new(DexKind::ConcentratedLiquidity, router, path, a, b, pool, tvl_usd) {
                    legs.push(leg);
                }
            }
        }
    }
    legs
}

/// Deterministic stand-in pool key for a (pair, fee) we never discovered.
fn synthetic_pool_id(a: Address, b: Address, fee: u32) -> Address {
    let (lo, hi) = if a < b { (a, b) } else { (b, a) };
    let hash = keccak256((lo, hi, fee).abi_encode_params());
    Address::from_slice(&hash[12..])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(b: u8) -> Address {
        Address::repeat_byte(b)
    }

    fn v3_pool(pool: u8, t0: u8, t1: u8, fee: u32, tvl: f64) -> PoolRecord {
        PoolRecord {
            chain: "base".into(),
            dex: DexKind::ConcentratedLiquidity,
            address: addr(pool),
            token0: addr(t0),
            token1: addr(t1),
            routing: Some(PoolRouting::FeeTier(fee)),
            tvl_usd: tvl,
        }
    }

    fn routers() -> RouterAddresses {
        RouterAddresses {
            univ3_router: Some(addr(0xEE)),
        }
    }

    #[test]
    fn test_encode_path_single_hop_layout() {
        let path = encode_path(&[addr(1), addr(2)], &[3000]).unwrap();
        assert_eq!(path.len(), 43);
        assert_eq!(&path[..20], addr(1).as_slice());
        assert_eq!(&path[20..23], &[0x00, 0x0b, 0xb8]);
        assert_eq!(&path[23..], addr(2).as_slice());
    }

    #[test]
    fn test_encode_path_rejects_bad_shape_and_fee() {
        assert_eq!(
            encode_path(&[addr(1)], &[500]).unwrap_err(),
            PathError::Shape { tokens: 1, fees: 1 }
        );
        assert_eq!(
            encode_path(&[addr(1), addr(2)], &[1 << 24]).unwrap_err(),
            PathError::FeeOverflow(1 << 24)
        );
    }

    #[test]
    fn test_stable_indices_encode_decode() {
        let payload = encode_stable_indices(0, 2);
        assert_eq!(payload.len(), 64);
        assert_eq!(decode_stable_indices(&payload), Some((0, 2)));
        assert_eq!(decode_stable_indices(&[1, 2, 3]), None);
    }

    #[test]
    fn test_pool_yields_forward_and_reverse_legs() {
        let index = build_index(&[v3_pool(10, 1, 2, 500, 1e6)], &routers(), 20);
        assert_eq!(index.len(), 2);
        let l = index.legs();
        assert_eq!((l[0].token_in, l[0].token_out), (addr(1), addr(2)));
        assert_eq!((l[1].token_in, l[1].token_out), (addr(2), addr(1)));
        assert_eq!(l[0].pool_or_router_address, addr(0xEE));
        assert_eq!(l[0].source_pool, addr(10));
    }

    #[test]
    fn test_unresolvable_pools_skipped() {
        let mut no_fee = v3_pool(10, 1, 2, 500, 1e6);
        no_fee.routing = None;
        let zero_fee = v3_pool(11, 1, 2, 0, 1e6);
        let same_token = v3_pool(12, 3, 3, 500, 1e6);
        let mut wrong_kind = v3_pool(13, 1, 2, 500, 1e6);
        wrong_kind.routing = Some(PoolRouting::CoinPair { i: 0, j: 1 });
        let good = v3_pool(14, 4, 5, 3000, 1e6);

        let index = build_index(&[no_fee, zero_fee, same_token, wrong_kind, good], &routers(), 20);
        assert_eq!(index.len(), 2);
        assert!(index.legs().iter().all(|l| l.source_pool == addr(14)));
    }

    #[test]
    fn test_v3_pools_need_router() {
        let index = build_index(&[v3_pool(10, 1, 2, 500, 1e6)], &RouterAddresses::default(), 20);
        assert!(index.is_empty());
    }

    #[test]
    fn test_stable_pool_targets_pool_itself() {
        let pool = PoolRecord {
            chain: "base".into(),
            dex: DexKind::StableSwap,
            address: addr(0x30),
            token0: addr(1),
            token1: addr(2),
            routing: Some(PoolRouting::CoinPair { i: 0, j: 1 }),
            tvl_usd: 5e5,
        };
        let index = build_index(&[pool], &RouterAddresses::default(), 20);
        assert_eq!(index.len(), 2);
        assert_eq!(index.legs()[0].pool_or_router_address, addr(0x30));
        assert_eq!(decode_stable_indices(&index.legs()[1].call_payload), Some((1, 0)));
    }

    #[test]
    fn test_cap_keeps_deepest_pools() {
        let pools = vec![
            v3_pool(10, 1, 2, 500, 200_000.0),
            v3_pool(11, 3, 4, 500, 900_000.0),
            v3_pool(12, 5, 6, 500, 500_000.0),
        ];
        let index = build_index(&pools, &routers(), 3);
        assert_eq!(index.len(), 3);
        assert_eq!(index.legs()[0].source_pool, addr(11));
        assert_eq!(index.legs()[1].source_pool, addr(11));
        assert_eq!(index.legs()[2].source_pool, addr(12));
    }

    #[test]
    fn test_outgoing_lookup_in_insertion_order() {
        let pools = vec![v3_pool(10, 1, 2, 500, 1e6), v3_pool(11, 1, 3, 500, 1e6)];
        let index = build_index(&pools, &routers(), 20);
        let outs: Vec<Address> = index.outgoing(addr(1)).map(|l| l.token_out).collect();
        assert_eq!(outs, vec![addr(2), addr(3)]);
        assert_eq!(index.outgoing(addr(9)).count(), 0);
    }

    #[test]
    fn test_fallback_legs_cover_tiers_and_directions() {
        let legs = fallback_legs(&[addr(1), addr(2)], addr(9), addr(0xEE), 100_000.0);
        // 2 stables x 2 tiers x 2 directions
        assert_eq!(legs.len(), 8);
        assert_eq!(legs[0].source_pool, legs[1].source_pool);
        assert_ne!(legs[0].source_pool, legs[2].source_pool);
        assert!(legs.iter().all(|l| l.dex_kind == DexKind::ConcentratedLiquidity));
    }
}
