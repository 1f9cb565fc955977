//! Execution path
//!
//! Calldata encoding, private relay client and the submitter state machine.
//!
//! Created: 2026-02-05

pub mod calldata;
pub mod relay;
pub mod submitter;

pub use calldata::{build_calldata, min_return, CalldataError};
pub use relay::{HttpRelay, RelayClient};
pub use submitter::{ExecutionSubmitter, SkipReason, SubmitError, SubmitOutcome};
