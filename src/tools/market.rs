//! Index prices, listed ETF tokens and swap quotes

use super::{AnyJson, ChainInput, ChainRequest, PadexTool};
use crate::context::AppContext;
use crate::pricing::{IndexPrice, PriceKey};
use crate::tokens;
use crate::trading::{QuoteReport, QuoteRequest, TradeService};
use crate::{Error, Result};
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::json;

pub struct GetEtfTokensTool;

#[async_trait]
impl PadexTool for GetEtfTokensTool {
    const NAME: &'static str = "get_etf_tokens";
    type Input = ChainInput;
    type Output = AnyJson;

    fn description(&self) -> &'static str {
        "ETF tokens listed by the Paloma DEX index service on one chain"
    }

    async fn execute(&self, ctx: &AppContext, args: ChainInput) -> Result<AnyJson> {
        let descriptor = ctx.chain(&args.chain_id)?;
        let tokens = ctx.pricing.etf_tokens(descriptor.chain).await?;
        Ok(json!({
            "chain_id": descriptor.chain_id,
            "chain": descriptor.name,
            "tokens": tokens,
        })
        .into())
    }
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct EtfPriceInput {
    #[serde(flatten)]
    pub chain: ChainInput,
    /// ETF token contract address
    pub token_address: String,
}

pub struct GetEtfPriceTool;

#[async_trait]
impl PadexTool for GetEtfPriceTool {
    const NAME: &'static str = "get_etf_price";
    type Input = EtfPriceInput;
    type Output = IndexPrice;

    fn description(&self) -> &'static str {
        "Buy and sell price of an ETF token from the index service"
    }

    async fn execute(&self, ctx: &AppContext, args: EtfPriceInput) -> Result<IndexPrice> {
        let descriptor = ctx.chain(&args.chain.chain_id)?;
        let address = tokens::parse_address(&args.token_address)?;
        ctx.pricing
            .price(&PriceKey::Address {
                chain: descriptor.chain,
                address,
            })
            .await
    }
}

#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct PriceInput {
    /// Token symbol; on its own it looks the price up by symbol
    #[serde(default)]
    pub symbol: Option<String>,
    /// Chain of the token; required together with `token_address`
    #[serde(default)]
    pub chain_id: Option<String>,
    #[serde(default)]
    pub token_address: Option<String>,
}

impl PriceInput {
    /// Chain and address together select an address lookup, or a composite
    /// denomination when a symbol is given as well.
    fn key(&self, ctx: &AppContext) -> Result<PriceKey> {
        match (&self.chain_id, &self.token_address, &self.symbol) {
            (Some(chain_id), Some(address), symbol) => {
                let chain = ctx.chain(chain_id)?.chain;
                let address = tokens::parse_address(address)?;
                Ok(match symbol {
                    Some(symbol) => PriceKey::Denom {
                        chain,
                        address,
                        symbol: symbol.clone(),
                    },
                    None => PriceKey::Address { chain, address },
                })
            }
            (None, None, Some(symbol)) => Ok(PriceKey::Symbol(symbol.clone())),
            _ => Err(Error::Validation(
                "Provide either a symbol, or a chain_id together with a token_address".to_string(),
            )),
        }
    }
}

pub struct GetPriceTool;

#[async_trait]
impl PadexTool for GetPriceTool {
    const NAME: &'static str = "get_price";
    type Input = PriceInput;
    type Output = IndexPrice;

    fn description(&self) -> &'static str {
        "Index price by symbol, by chain and token address, or by both"
    }

    async fn execute(&self, ctx: &AppContext, args: PriceInput) -> Result<IndexPrice> {
        let key = args.key(ctx)?;
        ctx.pricing.price(&key).await
    }
}

pub struct QuoteSwapTool;

#[async_trait]
impl PadexTool for QuoteSwapTool {
    const NAME: &'static str = "quote_swap";
    type Input = ChainRequest<QuoteRequest>;
    type Output = QuoteReport;

    fn description(&self) -> &'static str {
        "Quote a single-hop trade against live pool reserves, including the spread check. Read-only."
    }

    async fn execute(&self, ctx: &AppContext, args: ChainRequest<QuoteRequest>) -> Result<QuoteReport> {
        let descriptor = ctx.chain(&args.chain_id)?;
        TradeService::new(ctx, descriptor)?.quote(args.request).await
    }
}
