//! Centralized Contract Definitions
//!
//! Solidity interfaces used by the pipeline, defined with alloy's `sol!` macro.
//! Quote interfaces carry `#[sol(rpc)]` so they can be called through any
//! alloy Provider; the executor interface is only ever abi-encoded.
//!
//! Created: 2026-02-03

use alloy::sol;

// ── Uniswap V3 ───────────────────────────────────────────────────────

sol! {
    /// QuoterV2: non-view on paper, always called via eth_call.
    #[sol(rpc)]
    interface IQuoterV2 {
        function quoteExactInput(bytes memory path, uint256 amountIn)
            external
            returns (
                uint256 amountOut,
                uint160[] memory sqrtPriceX96AfterList,
                uint32[] memory initializedTicksCrossedList,
                uint256 gasEstimate
            );
    }
}

// ── Curve ────────────────────────────────────────────────────────────

sol! {
    #[sol(rpc)]
    interface ICurvePool {
        function get_dy(int128 i, int128 j, uint256 dx) external view returns (uint256);
        function coins(uint256 i) external view returns (address);
    }
}

// ── Arb executor ─────────────────────────────────────────────────────

sol! {
    /// Atomic multi-hop executor. `dex` is 1 for V3 path swaps, 2 for Curve exchanges.
    interface IArbExecutor {
        struct Hop {
            uint8 dex;
            address routerOrPool;
            bytes data;
            address tokenIn;
            address tokenOut;
        }

        struct Route {
            Hop[] hops;
            address inputToken;
            address outputToken;
        }

        function execute(Route calldata route, uint256 amountIn, uint256 minReturn, uint256 deadline)
            external
            returns (uint256 amountOut);

        function executeWithFlashloan(Route calldata route, uint256 amountIn, uint256 minReturn, uint256 deadline)
            external;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::{keccak256, Address, Bytes, U256};
    use alloy::sol_types::SolCall;

    fn selector(sig: &str) -> [u8; 4] {
        let h = keccak256(sig.as_bytes());
        [h[0], h[1], h[2], h[3]]
    }

    #[test]
    fn test_quoter_selector() {
        assert_eq!(
            IQuoterV2::quoteExactInputCall::SELECTOR,
            selector("quoteExactInput(bytes,uint256)")
        );
    }

    #[test]
    fn test_curve_selector() {
        assert_eq!(
            ICurvePool::get_dyCall::SELECTOR,
            selector("get_dy(int128,int128,uint256)")
        );
    }

    #[test]
    fn test_executor_selectors_match_tuple_signature() {
        let route = "((uint8,address,bytes,address,address)[],address,address)";
        assert_eq!(
            IArbExecutor::executeCall::SELECTOR,
            selector(&format!("execute({},uint256,uint256,uint256)", route))
        );
        assert_eq!(
            IArbExecutor::executeWithFlashloanCall::SELECTOR,
            selector(&format!("executeWithFlashloan({},uint256,uint256,uint256)", route))
        );
    }

    #[test]
    fn test_execute_call_decodes_back() {
        let call = IArbExecutor::executeCall {
            route: IArbExecutor::Route {
                hops: vec![IArbExecutor::Hop {
                    dex: 2,
                    routerOrPool: Address::repeat_byte(0x11),
                    data: Bytes::from(vec![0u8; 64]),
                    tokenIn: Address::repeat_byte(0x01),
                    tokenOut: Address::repeat_byte(0x02),
                }],
                inputToken: Address::repeat_byte(0x01),
                outputToken: Address::repeat_byte(0x02),
            },
            amountIn: U256::from(1_000_000u64),
            minReturn: U256::from(950_000u64),
            deadline: U256::from(1_700_000_000u64),
        };
        let encoded = call.abi_encode();
        let decoded = IArbExecutor::executeCall::abi_decode(&encoded).unwrap();
        assert_eq!(decoded.route.hops.len(), 1);
        assert_eq!(decoded.route.hops[0].dex, 2);
        assert_eq!(decoded.minReturn, U256::from(950_000u64));
    }
}
