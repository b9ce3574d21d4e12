//! Pre-trade liquidity and spread guard
//!
//! Runs before any chain write. Rules, in order:
//! 1. requested slippage within the configured cap
//! 2. a pair exists for the tokens
//! 3. the pool is not empty
//! 4. the input is at most `max_spread_bps` of available liquidity

use crate::chains::Chain;
use crate::error::LiquidityError;
use crate::pricing::Slippage;
use crate::tokens::TokenRef;
use crate::{Error, Result};
use alloy::primitives::U256;
use serde::Serialize;

const BPS_DENOMINATOR: u64 = 10_000;

/// A trade as requested, before any write is planned
#[derive(Debug, Clone, Serialize)]
pub struct TradeIntent {
    pub chain: Chain,
    pub input_token: TokenRef,
    pub output_token: TokenRef,
    #[serde(with = "crate::tokens::decimal")]
    pub input_amount: U256,
    pub slippage: Slippage,
}

#[derive(Debug, Clone)]
pub struct TradeValidator {
    max_spread_bps: u32,
    max_slippage: Slippage,
}

impl TradeValidator {
    pub fn new(max_spread_bps: u32, max_slippage: Slippage) -> Self {
        Self {
            max_spread_bps: max_spread_bps.min(BPS_DENOMINATOR as u32),
            max_slippage,
        }
    }

    pub fn from_config(risk: &crate::config::RiskConfig) -> Result<Self> {
        Ok(Self::new(
            risk.max_spread_bps,
            Slippage::from_percent(risk.max_slippage_percent)?,
        ))
    }

    /// Largest input accepted against `liquidity` (floor)
    pub fn max_allowed_input(&self, liquidity: U256) -> U256 {
        let bps = U256::from(self.max_spread_bps);
        let denom = U256::from(BPS_DENOMINATOR);
        match liquidity.checked_mul(bps) {
            Some(scaled) => scaled / denom,
            None => liquidity / denom * bps,
        }
    }

    /// Reject a tolerance above the configured cap
    pub fn check_slippage(&self, slippage: Slippage) -> Result<()> {
        if slippage > self.max_slippage {
            return Err(Error::Validation(format!(
                "Requested slippage {:.2}% exceeds maximum allowed {:.2}%",
                slippage.percent(),
                self.max_slippage.percent()
            )));
        }
        Ok(())
    }

    /// Check `intent` against the input-side liquidity of its pair.
    ///
    /// `available_liquidity` is `None` when no pair exists.
    pub fn validate(&self, intent: &TradeIntent, available_liquidity: Option<U256>) -> Result<()> {
        self.check_slippage(intent.slippage)?;

        let liquidity = available_liquidity.ok_or_else(|| LiquidityError::PairNotFound {
            input: intent.input_token.symbol.clone(),
            output: intent.output_token.symbol.clone(),
        })?;

        if liquidity.is_zero() {
            return Err(LiquidityError::NoLiquidity.into());
        }

        let max_allowed = self.max_allowed_input(liquidity);
        if intent.input_amount > max_allowed {
            tracing::info!(
                chain = %intent.chain,
                input = %intent.input_amount,
                max_allowed = %max_allowed,
                "Trade rejected by spread guard"
            );
            return Err(LiquidityError::SpreadExceeded { max_allowed }.into());
        }

        tracing::debug!(
            chain = %intent.chain,
            input = %intent.input_amount,
            liquidity = %liquidity,
            "Trade passed liquidity checks"
        );
        Ok(())
    }
}

impl Default for TradeValidator {
    fn default() -> Self {
        Self::new(4_000, Slippage::from_bps(500))
    }
}
