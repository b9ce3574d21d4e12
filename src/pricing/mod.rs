//! Constant-product pricing
//!
//! All amount math is unsigned integer arithmetic with floor division, so any
//! rounding favours the pool. Floating point appears only in
//! [`SwapQuote::price_impact_pct`], which is a display ratio.

mod index_api;
mod reserves;

pub use index_api::{IndexApiClient, IndexPrice, PriceKey};
pub use reserves::{fetch_pool_reserves, PoolReserves};

#[cfg(test)]
pub(crate) use reserves::tests as pool_fixtures;

use crate::{Error, Result};
use alloy::primitives::{Uint, U256};
use serde::Serialize;

const BPS_DENOMINATOR: u64 = 10_000;

/// Price impact is computed in parts per billion before conversion to percent
const IMPACT_SCALE: u64 = 1_000_000_000;

/// Slippage tolerance in basis points
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct Slippage(u32);

impl Slippage {
    /// Build from a percentage in `[0, 100]`, rounded to the nearest basis point
    pub fn from_percent(percent: f64) -> Result<Self> {
        if !percent.is_finite() || !(0.0..=100.0).contains(&percent) {
            return Err(Error::Validation(format!(
                "Slippage must be between 0 and 100 percent, got {}",
                percent
            )));
        }
        Ok(Self((percent * 100.0).round() as u32))
    }

    pub fn from_bps(bps: u32) -> Self {
        Self(bps.min(BPS_DENOMINATOR as u32))
    }

    pub fn bps(&self) -> u32 {
        self.0
    }

    pub fn percent(&self) -> f64 {
        self.0 as f64 / 100.0
    }
}

/// Intermediate width for products of two 256-bit amounts and a bps factor
type Wide = Uint<576, 9>;

/// Output of a constant-product swap: `dy = y * dx' / (x + dx')` with
/// `dx' = dx * (1 - fee)`.
///
/// Zero when either reserve or the input is zero. Products are taken at 576
/// bits, and the result never exceeds `reserve_out`.
pub fn swap_output(amount_in: U256, reserve_in: U256, reserve_out: U256, fee_bps: u32) -> U256 {
    if amount_in.is_zero() || reserve_in.is_zero() || reserve_out.is_zero() {
        return U256::ZERO;
    }
    let denom = Wide::from(BPS_DENOMINATOR);
    let fee_factor = denom - Wide::from(fee_bps.min(BPS_DENOMINATOR as u32));

    let in_with_fee = Wide::from(amount_in) * fee_factor;
    let numerator = in_with_fee * Wide::from(reserve_out);
    let denominator = Wide::from(reserve_in) * denom + in_with_fee;
    (numerator / denominator).saturating_to::<U256>()
}

/// Percentage by which the realised average price falls short of the
/// pre-trade marginal price. Never negative.
pub fn price_impact_pct(amount_in: U256, reserve_in: U256, reserve_out: U256, fee_bps: u32) -> f64 {
    if amount_in.is_zero() || reserve_in.is_zero() || reserve_out.is_zero() {
        return 0.0;
    }
    let amount_out = swap_output(amount_in, reserve_in, reserve_out, fee_bps);
    let scale = Wide::from(IMPACT_SCALE);

    // (out / in) / (y / x) scaled, i.e. out * x * scale / (in * y)
    let ratio = Wide::from(amount_out) * Wide::from(reserve_in) * scale
        / (Wide::from(amount_in) * Wide::from(reserve_out));

    if ratio >= scale {
        return 0.0;
    }
    let shortfall: u64 = (scale - ratio).saturating_to();
    shortfall as f64 * 100.0 / IMPACT_SCALE as f64
}

/// `floor(amount * (100 - tolerance) / 100)`
pub fn min_output_with_slippage(amount: U256, slippage: Slippage) -> U256 {
    let denom = U256::from(BPS_DENOMINATOR);
    let keep = denom - U256::from(slippage.bps());
    match amount.checked_mul(keep) {
        Some(scaled) => scaled / denom,
        None => amount / denom * keep,
    }
}

/// Amount of one reserve redeemed by burning `liquidity` of `total_supply` LP tokens
pub fn share_of_reserve(liquidity: U256, reserve: U256, total_supply: U256) -> U256 {
    if total_supply.is_zero() {
        return U256::ZERO;
    }
    match liquidity.checked_mul(reserve) {
        Some(scaled) => scaled / total_supply,
        None => reserve / total_supply * liquidity,
    }
}

/// A constant-product quote against known reserves
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SwapQuote {
    #[serde(with = "crate::tokens::decimal")]
    pub input_amount: U256,
    #[serde(with = "crate::tokens::decimal")]
    pub input_reserve: U256,
    #[serde(with = "crate::tokens::decimal")]
    pub output_reserve: U256,
    #[serde(with = "crate::tokens::decimal")]
    pub output_amount: U256,
    pub price_impact_pct: f64,
    pub fee_bps: u32,
}

impl SwapQuote {
    pub fn min_output(&self, slippage: Slippage) -> U256 {
        min_output_with_slippage(self.output_amount, slippage)
    }
}

pub fn quote(amount_in: U256, reserve_in: U256, reserve_out: U256, fee_bps: u32) -> SwapQuote {
    SwapQuote {
        input_amount: amount_in,
        input_reserve: reserve_in,
        output_reserve: reserve_out,
        output_amount: swap_output(amount_in, reserve_in, reserve_out, fee_bps),
        price_impact_pct: price_impact_pct(amount_in, reserve_in, reserve_out, fee_bps),
        fee_bps,
    }
}
