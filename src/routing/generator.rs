//! Route Generator
//!
//! Enumerates 2-hop routes, then closed 3-hop cycles, from a leg index.
//! Enumeration is a lazy iterator over the index (first leg, then second,
//! then third in insertion order), so a cap stops the walk early and the
//! same index always yields the same sequence. No I/O.
//!
//! A closed two-hop cycle (only admitted under the cycle policy) is emitted
//! once, starting from whichever of its legs was inserted first; its
//! rotation is the same trade.

use super::legs::LegIndex;
use crate::types::{Leg, Route, RoutePolicy};

/// Lazy route sequence: every 2-hop route first, then every 3-hop cycle.
/// Calling it again restarts the enumeration.
pub fn routes<'a>(index: &'a LegIndex, policy: RoutePolicy) -> impl Iterator<Item = Route> + 'a {
    two_hop(index, policy).chain(three_hop(index, policy))
}

/// At most `cap` routes, in enumeration order.
pub fn generate_routes(index: &LegIndex, policy: RoutePolicy, cap: usize) -> Vec<Route> {
    routes(index, policy).take(cap).collect()
}

fn two_hop<'a>(index: &'a LegIndex, policy: RoutePolicy) -> impl Iterator<Item = Route> + 'a {
    index.legs().iter().enumerate().flat_map(move |(ia, a)| {
        index
            .outgoing_indexed(a.token_out)
            .filter(move |(ib, b)| b.token_out != a.token_in || ia < *ib)
            .filter_map(move |(_, b)| build(&[a, b], policy))
    })
}

fn three_hop<'a>(index: &'a LegIndex, policy: RoutePolicy) -> impl Iterator<Item = Route> + 'a {
    index.legs().iter().flat_map(move |a| {
        index.outgoing(a.token_out).flat_map(move |b| {
            index
                .outgoing(b.token_out)
                .filter(move |c| c.token_out == a.token_in)
                .filter_map(move |c| build(&[a, b, c], policy))
        })
    })
}

/// Route::new enforces the shape rules (identity loops, closure).
fn build(legs: &[&Leg], policy: RoutePolicy) -> Option<Route> {
    Route::new(legs.iter().map(|l| (*l).clone()).collect(), policy).ok()
}
