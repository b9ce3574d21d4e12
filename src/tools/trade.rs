//! Write tools
//!
//! Each one builds a transaction plan through [`TradeService`]. In simulate
//! mode nothing is signed; the plan is returned for review. A plan that fails
//! part way is still returned, with its `error` set, so submitted hashes are
//! never lost.

use super::{ChainRequest, PadexTool};
use crate::context::AppContext;
use crate::trading::{
    AddLiquidityRequest, BuyRequest, RemoveLiquidityRequest, SellRequest, SwapRequest, TradeReport, TradeService,
};
use crate::Result;
use async_trait::async_trait;

macro_rules! trade_tool {
    ($tool:ident, $name:literal, $request:ty, $method:ident, $description:literal) => {
        pub struct $tool;

        #[async_trait]
        impl PadexTool for $tool {
            const NAME: &'static str = $name;
            type Input = ChainRequest<$request>;
            type Output = TradeReport;

            fn description(&self) -> &'static str {
                $description
            }

            async fn execute(&self, ctx: &AppContext, args: ChainRequest<$request>) -> Result<TradeReport> {
                let descriptor = ctx.chain(&args.chain_id)?;
                ctx.require_wallet()?;
                TradeService::new(ctx, descriptor)?.$method(args.request).await
            }
        }
    };
}

trade_tool!(
    BuyTokenTool,
    "buy_token",
    BuyRequest,
    buy,
    "Buy an ETF token (or mint PUSD) through the Paloma connectors, paying with PUSD, another token or the native asset"
);

trade_tool!(
    SellTokenTool,
    "sell_token",
    SellRequest,
    sell,
    "Sell an ETF token for PUSD, or redeem PUSD, through the Paloma connectors"
);

trade_tool!(
    SwapTokensTool,
    "swap_tokens",
    SwapRequest,
    swap,
    "Single-hop swap through the configured router; either side may be the native asset"
);

trade_tool!(
    AddLiquidityTool,
    "add_liquidity",
    AddLiquidityRequest,
    add_liquidity,
    "Deposit two tokens into their pool; minimum amounts are the deposits less slippage"
);

trade_tool!(
    RemoveLiquidityTool,
    "remove_liquidity",
    RemoveLiquidityRequest,
    remove_liquidity,
    "Burn LP tokens for a pro-rata share of both pool reserves"
);
