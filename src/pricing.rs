//! Token book and USD valuation
//!
//! Quoted amounts are smallest-unit integers. A token with known decimals and
//! price is valued as `amount / 10^decimals * price` in `Decimal`. An
//! unpriced input is worth the reference notional. An unpriced output is
//! only valued through the out/in ratio when both amounts are in the same
//! unit (closed route, or equal known decimals); otherwise it is worth zero.
//!
//! Created: 2026-02-04
//! Modified: 2026-02-10 - No cross-decimal ratio fallback for unpriced outputs

use crate::config::{parse_address, TokenConfig};
use alloy::primitives::{Address, U256};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use std::collections::HashMap;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct TokenInfo {
    pub symbol: String,
    pub decimals: u8,
    pub price_usd: Option<Decimal>,
    pub stable: bool,
}

/// Configured tokens for one chain, in config order.
#[derive(Debug, Clone, Default)]
pub struct TokenBook {
    order: Vec<Address>,
    tokens: HashMap<Address, TokenInfo>,
}

impl TokenBook {
    pub fn from_config(tokens: &[TokenConfig]) -> Self {
        let mut book = Self::default();
        for t in tokens {
            let Some(address) = parse_address(&t.address) else {
                warn!("Token {} has invalid address '{}', ignored", t.symbol, t.address);
                continue;
            };
            book.insert(
                address,
                TokenInfo {
                    symbol: t.symbol.clone(),
                    decimals: t.decimals,
                    price_usd: t.price_usd.and_then(Decimal::from_f64),
                    stable: t.stable,
                },
            );
        }
        book
    }

    pub fn insert(&mut self, address: Address, info: TokenInfo) {
        if self.tokens.insert(address, info).is_none() {
            self.order.push(address);
        }
    }

    pub fn get(&self, address: &Address) -> Option<&TokenInfo> {
        self.tokens.get(address)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn by_symbol(&self, symbol: &str) -> Option<Address> {
        self.order
            .iter()
            .copied()
            .find(|a| self.tokens[a].symbol.eq_ignore_ascii_case(symbol))
    }

    /// Stable tokens in config order.
    pub fn stables(&self) -> Vec<Address> {
        self.order
            .iter()
            .copied()
            .filter(|a| self.tokens[a].stable)
            .collect()
    }

    pub fn symbol_of(&self, address: &Address) -> String {
        self.tokens
            .get(address)
            .map(|t| t.symbol.clone())
            .unwrap_or_else(|| format!("{:?}", address))
    }

    /// USD value of `amount` (smallest unit), None when the token is unknown,
    /// unpriced, or the amount does not fit a Decimal.
    pub fn usd_value(&self, token: &Address, amount: U256) -> Option<f64> {
        let info = self.tokens.get(token)?;
        let price = info.price_usd?;
        let raw = i128::try_from(u128::try_from(amount).ok()?).ok()?;
        let units = Decimal::try_from_i128_with_scale(raw, info.decimals as u32).ok()?;
        units.checked_mul(price)?.to_f64()
    }

    /// Amounts of `a` and `b` share a smallest unit.
    fn same_unit(&self, a: &Address, b: &Address) -> bool {
        if a == b {
            return true;
        }
        match (self.tokens.get(a), self.tokens.get(b)) {
            (Some(x), Some(y)) => x.decimals == y.decimals,
            _ => false,
        }
    }

    /// USD value of a quote's input and output.
    pub fn value_quote(
        &self,
        input: &Address,
        output: &Address,
        amount_in: U256,
        amount_out: U256,
        reference_amount_usd: f64,
    ) -> (f64, f64) {
        let in_usd = self
            .usd_value(input, amount_in)
            .unwrap_or(reference_amount_usd);
        let out_usd = match self.usd_value(output, amount_out) {
            Some(v) => v,
            None if self.same_unit(input, output) => ratio(amount_out, amount_in) * in_usd,
            None => {
                debug!(
                    "No USD price for output {}, valued at zero",
                    self.symbol_of(output)
                );
                0.0
            }
        };
        (in_usd, out_usd)
    }
}

/// `num / den` as f64; zero when the denominator is zero or out of range.
fn ratio(num: U256, den: U256) -> f64 {
    let (Ok(n), Ok(d)) = (u128::try_from(num), u128::try_from(den)) else {
        return 0.0;
    };
    if d == 0 {
        return 0.0;
    }
    n as f64 / d as f64
}
