//! Executor calldata
//!
//! Encodes a route as `IArbExecutor.execute` / `executeWithFlashloan`.
//!
//! Created: 2026-02-05

use crate::contracts::IArbExecutor;
use crate::types::Route;
use alloy::primitives::{Bytes, U256};
use alloy::sol_types::SolCall;
use thiserror::Error;

pub const BPS_DENOMINATOR: u32 = 10_000;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CalldataError {
    #[error("slippage of {0} bps exceeds 100%")]
    SlippageOutOfRange(u32),
    #[error("hop {0} has an empty payload")]
    EmptyPayload(usize),
}

/// Minimum acceptable output: `amount_out * (1 - bps / 10_000)`, rounded down.
pub fn min_return(amount_out: U256, slippage_bps: u32) -> Result<U256, CalldataError> {
    if slippage_bps > BPS_DENOMINATOR {
        return Err(CalldataError::SlippageOutOfRange(slippage_bps));
    }
    Ok(amount_out * U256::from(BPS_DENOMINATOR - slippage_bps) / U256::from(BPS_DENOMINATOR))
}

/// Absolute unix deadline.
pub fn deadline(now_unix: u64, window_secs: u64) -> U256 {
    U256::from(now_unix.saturating_add(window_secs))
}

pub fn executor_route(route: &Route) -> Result<IArbExecutor::Route, CalldataError> {
    let hops = route
        .legs()
        .iter()
        .enumerate()
        .map(|(i, leg)| {
            if leg.call_payload.is_empty() {
                return Err(CalldataError::EmptyPayload(i));
            }
            Ok(IArbExecutor::Hop {
                dex: leg.dex_kind.executor_code(),
                routerOrPool: leg.pool_or_router_address,
                data: leg.call_payload.clone(),
                tokenIn: leg.token_in,
                tokenOut: leg.token_out,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(IArbExecutor::Route {
        hops,
        inputToken: route.input(),
        outputToken: route.output(),
    })
}

pub fn build_calldata(
    route: &Route,
    amount_in: U256,
    min_return: U256,
    deadline: U256,
    flashloan: bool,
) -> Result<Bytes, CalldataError> {
    let route = executor_route(route)?;
    let data = if flashloan {
        IArbExecutor::executeWithFlashloanCall {
            route,
            amountIn: amount_in,
            minReturn: min_return,
            deadline,
        }
        .abi_encode()
    } else {
        IArbExecutor::executeCall {
            route,
            amountIn: amount_in,
            minReturn: min_return,
            deadline,
        }
        .abi_encode()
    };
    Ok(Bytes::from(data))
}
