//! Route discovery: leg index, cycle enumeration, scoring
//!
//! Created: 2026-02-03

pub mod generator;
pub mod legs;
pub mod scorer;

pub use generator::{generate_routes, routes};
pub use legs::{build_index, encode_path, fallback_legs, LegIndex, RouterAddresses};
pub use scorer::{is_accepted, rank_candidates, score_route, Candidate, MIN_TVL_USD};
