//! Route filtering
//!
//! Denylist of tokens and pools consumed by the scorer's admission gate.
//!
//! Created: 2026-02-04

pub mod denylist;

pub use denylist::{DenylistFile, DenylistFilter};
