//! Trade requests
//!
//! Turns a request into a [`TradeIntent`], resolves its tokens, reads live
//! reserves, quotes and validates it, then hands the resulting order to the
//! [`TransactionOrchestrator`]. Nothing is written on-chain before the
//! validator accepts the trade. Every finished plan is audited.

use crate::chains::{ChainDescriptor, ContractRole};
use crate::config::{wrapped_native, ExecutionMode};
use crate::context::AppContext;
use crate::error::{ErrorInfo, LiquidityError};
use crate::orchestrator::{
    encode_connector_path, AllowanceRequirement, OrchestratorSettings, SwapKind, TradeCall, TradeOrder,
    TransactionOrchestrator, TransactionPlan,
};
use crate::pricing::{self, fetch_pool_reserves, PoolReserves, Slippage, SwapQuote};
use crate::rpc::ChainClient;
use crate::tokens::{self, format_units, parse_units, TokenAddress, TokenRef, TokenResolver};
use crate::validator::TradeIntent;
use crate::wallet::SecureWallet;
use crate::{Error, Result};
use alloy::primitives::{Address, Bytes, U256};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Buy a basket token, or the stable token itself
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct BuyRequest {
    /// Token to buy (basket token or the PUSD token address)
    pub output_token: String,
    /// Token to spend; `native` for the chain's native asset
    pub input_token: String,
    /// Amount of the input token, in token units (e.g. "1.5")
    pub amount: String,
    /// Slippage tolerance in percent (default from config)
    #[serde(default)]
    pub slippage_percent: Option<f64>,
    /// `simulate` or `execute` (default from config)
    #[serde(default)]
    pub mode: Option<ExecutionMode>,
}

/// Sell a basket token, or redeem the stable token
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct SellRequest {
    /// Token to sell
    pub token: String,
    /// Amount to sell, in token units
    pub amount: String,
    #[serde(default)]
    pub slippage_percent: Option<f64>,
    #[serde(default)]
    pub mode: Option<ExecutionMode>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct SwapRequest {
    /// Token to spend; `native` for the chain's native asset
    pub input_token: String,
    /// Token to receive; `native` for the chain's native asset
    pub output_token: String,
    /// Amount of the input token, in token units
    pub amount: String,
    #[serde(default)]
    pub slippage_percent: Option<f64>,
    #[serde(default)]
    pub mode: Option<ExecutionMode>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct AddLiquidityRequest {
    pub token_a: String,
    pub token_b: String,
    /// Amount of token A to deposit, in token units
    pub amount_a: String,
    /// Amount of token B to deposit, in token units
    pub amount_b: String,
    #[serde(default)]
    pub slippage_percent: Option<f64>,
    #[serde(default)]
    pub mode: Option<ExecutionMode>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct RemoveLiquidityRequest {
    pub token_a: String,
    pub token_b: String,
    /// LP tokens to burn, in token units
    pub liquidity: String,
    #[serde(default)]
    pub slippage_percent: Option<f64>,
    #[serde(default)]
    pub mode: Option<ExecutionMode>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct QuoteRequest {
    pub input_token: String,
    pub output_token: String,
    /// Amount of the input token, in token units
    pub amount: String,
    #[serde(default)]
    pub slippage_percent: Option<f64>,
}

/// A raw amount with its token and display form
#[derive(Debug, Clone, Serialize)]
pub struct TokenAmount {
    pub token: TokenRef,
    #[serde(with = "tokens::decimal")]
    pub raw: U256,
    pub display: String,
}

impl TokenAmount {
    pub fn new(token: &TokenRef, raw: U256) -> Self {
        Self {
            display: format_units(raw, token.decimals),
            token: token.clone(),
            raw,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TradeReport {
    pub operation: &'static str,
    pub chain: &'static str,
    pub chain_id: u64,
    pub inputs: Vec<TokenAmount>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub expected_outputs: Vec<TokenAmount>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub min_outputs: Vec<TokenAmount>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quote: Option<SwapQuote>,
    /// Per-pool quotes when the trade crosses more than one pool
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub route: Vec<SwapQuote>,
    pub slippage_percent: f64,
    pub plan: TransactionPlan,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorInfo>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SpreadCheck {
    pub accepted: bool,
    pub max_allowed_input: TokenAmount,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct QuoteReport {
    pub chain: &'static str,
    pub chain_id: u64,
    pub pool: PoolReserves,
    pub input: TokenAmount,
    pub expected_output: TokenAmount,
    pub min_output: TokenAmount,
    pub quote: SwapQuote,
    pub slippage_percent: f64,
    pub spread_check: SpreadCheck,
}

/// Parts of a report known before the plan runs
struct Draft {
    inputs: Vec<TokenAmount>,
    expected_outputs: Vec<TokenAmount>,
    min_outputs: Vec<TokenAmount>,
    quote: Option<SwapQuote>,
    route: Vec<SwapQuote>,
    slippage: Slippage,
}

pub struct TradeService<'a> {
    ctx: &'a AppContext,
    descriptor: &'a ChainDescriptor,
    client: Arc<dyn ChainClient>,
    resolver: TokenResolver,
}

impl<'a> TradeService<'a> {
    pub fn new(ctx: &'a AppContext, descriptor: &'a ChainDescriptor) -> Result<Self> {
        Ok(Self {
            ctx,
            descriptor,
            client: ctx.client(descriptor)?,
            resolver: TokenResolver::new(),
        })
    }

    /// Buying the stable token mints it through the stable connector; anything
    /// else is bought through the basket connector.
    pub async fn buy(&self, req: BuyRequest) -> Result<TradeReport> {
        let wallet = self.ctx.require_wallet()?;
        let output_addr = tokens::parse_address(&req.output_token)?;
        let input_addr = TokenAddress::parse(&req.input_token)?;
        let slippage = self.ctx.slippage(req.slippage_percent)?;
        let stable = self.descriptor.require(ContractRole::StableToken)?;
        let buying_stable = output_addr == stable;
        let connector = if buying_stable {
            self.descriptor.require(ContractRole::StableConnector)?
        } else {
            self.descriptor.require(ContractRole::BasketConnector)?
        };

        let input = self.resolve(input_addr).await?;
        let output = self.resolve(TokenAddress::Erc20(output_addr)).await?;
        let amount = parse_units(&req.amount, input.decimals)?;

        let pay_from = self.pool_address(input.address);
        let native_in = if input.address.is_native() { amount } else { U256::ZERO };
        let fee_tier = self.ctx.config.trading.path_fee_tier;
        let (call, quote, route) = if buying_stable {
            let (_, quote) = self.priced(&input, &output, amount, slippage).await?;
            let call = TradeCall::PurchaseStable {
                connector,
                path: encode_connector_path(pay_from, fee_tier, stable),
                amount,
                min_amount: quote.min_output(slippage),
                native_in,
            };
            (call, quote, Vec::new())
        } else if pay_from == stable {
            let (_, quote) = self.priced(&input, &output, amount, slippage).await?;
            let call = TradeCall::BuyBasket {
                connector,
                etf_token: output_addr,
                etf_amount: quote.min_output(slippage),
                usd_amount: amount,
                recipient: wallet.address(),
                path: Bytes::new(),
                deadline: self.deadline(),
                native_in,
            };
            (call, quote, Vec::new())
        } else {
            // The connector converts the input to the stable token first, so
            // both legs are quoted and guarded on their own pools.
            let stable_ref = self.resolve(TokenAddress::Erc20(stable)).await?;
            let (_, to_stable) = self.priced(&input, &stable_ref, amount, slippage).await?;
            let usd_amount = to_stable.min_output(slippage);
            let (_, to_basket) = self
                .priced(&stable_ref, &output, to_stable.output_amount, slippage)
                .await?;
            let call = TradeCall::BuyBasket {
                connector,
                etf_token: output_addr,
                etf_amount: to_basket.min_output(slippage),
                usd_amount,
                recipient: wallet.address(),
                path: encode_connector_path(pay_from, fee_tier, stable),
                deadline: self.deadline(),
                native_in,
            };
            (call, to_basket.clone(), vec![to_stable, to_basket])
        };
        let min_out = quote.min_output(slippage);

        let mut order = TradeOrder::new(call);
        if let Some(token) = input.address.erc20() {
            order = order.requiring(AllowanceRequirement {
                token,
                spender: connector,
                amount,
            });
        }

        let draft = Draft {
            inputs: vec![TokenAmount::new(&input, amount)],
            expected_outputs: vec![TokenAmount::new(&output, quote.output_amount)],
            min_outputs: vec![TokenAmount::new(&output, min_out)],
            quote: Some(quote),
            route,
            slippage,
        };
        Ok(self.finish(wallet, order, req.mode, draft).await)
    }

    /// Selling the stable token withdraws it through the stable connector;
    /// anything else is sold through the basket connector for the stable token.
    pub async fn sell(&self, req: SellRequest) -> Result<TradeReport> {
        let wallet = self.ctx.require_wallet()?;
        let token_addr = tokens::parse_address(&req.token)?;
        let slippage = self.ctx.slippage(req.slippage_percent)?;
        let stable = self.descriptor.require(ContractRole::StableToken)?;
        let selling_stable = token_addr == stable;
        let connector = if selling_stable {
            self.descriptor.require(ContractRole::StableConnector)?
        } else {
            self.descriptor.require(ContractRole::BasketConnector)?
        };

        let input = self.resolve(TokenAddress::Erc20(token_addr)).await?;
        let amount = parse_units(&req.amount, input.decimals)?;
        self.check_balance(wallet, &input, token_addr, amount, "sell").await?;

        let output = if selling_stable {
            TokenRef::native(self.descriptor.chain)
        } else {
            self.resolve(TokenAddress::Erc20(stable)).await?
        };
        let (_, quote) = self.priced(&input, &output, amount, slippage).await?;
        let min_out = quote.min_output(slippage);

        let call = if selling_stable {
            TradeCall::WithdrawStable { connector, amount }
        } else {
            TradeCall::SellBasket {
                connector,
                etf_token: token_addr,
                etf_amount: amount,
                deadline: self.deadline(),
                recipient: wallet.address(),
            }
        };
        let order = TradeOrder::new(call).requiring(AllowanceRequirement {
            token: token_addr,
            spender: connector,
            amount,
        });

        let draft = Draft {
            inputs: vec![TokenAmount::new(&input, amount)],
            expected_outputs: vec![TokenAmount::new(&output, quote.output_amount)],
            min_outputs: vec![TokenAmount::new(&output, min_out)],
            quote: Some(quote),
            route: Vec::new(),
            slippage,
        };
        Ok(self.finish(wallet, order, req.mode, draft).await)
    }

    /// Single-hop swap through the configured router
    pub async fn swap(&self, req: SwapRequest) -> Result<TradeReport> {
        let wallet = self.ctx.require_wallet()?;
        let input_addr = TokenAddress::parse(&req.input_token)?;
        let output_addr = TokenAddress::parse(&req.output_token)?;
        let slippage = self.ctx.slippage(req.slippage_percent)?;
        let router = self.descriptor.require(ContractRole::SwapRouter)?;

        let (path_in, path_out) = (self.pool_address(input_addr), self.pool_address(output_addr));
        if path_in == path_out {
            return Err(Error::Validation(
                "Input and output tokens must differ".to_string(),
            ));
        }
        let input = self.resolve(input_addr).await?;
        let output = self.resolve(output_addr).await?;
        let kind = match (input_addr, output_addr) {
            (TokenAddress::Native, _) => SwapKind::NativeForTokens,
            (_, TokenAddress::Native) => SwapKind::TokensForNative,
            _ => SwapKind::TokensForTokens,
        };

        let amount = parse_units(&req.amount, input.decimals)?;
        if kind != SwapKind::NativeForTokens {
            self.check_balance(wallet, &input, path_in, amount, "swap").await?;
        }
        let (_, quote) = self.priced(&input, &output, amount, slippage).await?;
        let min_out = quote.min_output(slippage);

        let mut order = TradeOrder::new(TradeCall::Swap {
            router,
            kind,
            amount_in: amount,
            amount_out_min: min_out,
            path: vec![path_in, path_out],
            recipient: wallet.address(),
            deadline: self.deadline(),
        });
        if let Some(token) = input.address.erc20() {
            order = order.requiring(AllowanceRequirement {
                token,
                spender: router,
                amount,
            });
        }

        let draft = Draft {
            inputs: vec![TokenAmount::new(&input, amount)],
            expected_outputs: vec![TokenAmount::new(&output, quote.output_amount)],
            min_outputs: vec![TokenAmount::new(&output, min_out)],
            quote: Some(quote),
            route: Vec::new(),
            slippage,
        };
        Ok(self.finish(wallet, order, req.mode, draft).await)
    }

    /// Deposit both tokens of a pair. Minimums are the deposits less slippage.
    pub async fn add_liquidity(&self, req: AddLiquidityRequest) -> Result<TradeReport> {
        let wallet = self.ctx.require_wallet()?;
        let (addr_a, addr_b) = distinct_pair(&req.token_a, &req.token_b)?;
        let slippage = self.ctx.slippage(req.slippage_percent)?;
        self.ctx.validator.check_slippage(slippage)?;
        let router = self.descriptor.require(ContractRole::SwapRouter)?;

        let token_a = self.resolve(TokenAddress::Erc20(addr_a)).await?;
        let token_b = self.resolve(TokenAddress::Erc20(addr_b)).await?;
        let amount_a = parse_units(&req.amount_a, token_a.decimals)?;
        let amount_b = parse_units(&req.amount_b, token_b.decimals)?;
        self.check_balance(wallet, &token_a, addr_a, amount_a, "deposit").await?;
        self.check_balance(wallet, &token_b, addr_b, amount_b, "deposit").await?;

        let min_a = pricing::min_output_with_slippage(amount_a, slippage);
        let min_b = pricing::min_output_with_slippage(amount_b, slippage);
        let order = TradeOrder::new(TradeCall::AddLiquidity {
            router,
            token_a: addr_a,
            token_b: addr_b,
            amount_a,
            amount_b,
            min_a,
            min_b,
            recipient: wallet.address(),
            deadline: self.deadline(),
        })
        .requiring(AllowanceRequirement {
            token: addr_a,
            spender: router,
            amount: amount_a,
        })
        .requiring(AllowanceRequirement {
            token: addr_b,
            spender: router,
            amount: amount_b,
        });

        let draft = Draft {
            inputs: vec![TokenAmount::new(&token_a, amount_a), TokenAmount::new(&token_b, amount_b)],
            expected_outputs: Vec::new(),
            min_outputs: vec![TokenAmount::new(&token_a, min_a), TokenAmount::new(&token_b, min_b)],
            quote: None,
            route: Vec::new(),
            slippage,
        };
        Ok(self.finish(wallet, order, req.mode, draft).await)
    }

    /// Burn LP tokens for a pro-rata share of both reserves
    pub async fn remove_liquidity(&self, req: RemoveLiquidityRequest) -> Result<TradeReport> {
        let wallet = self.ctx.require_wallet()?;
        let (addr_a, addr_b) = distinct_pair(&req.token_a, &req.token_b)?;
        let slippage = self.ctx.slippage(req.slippage_percent)?;
        self.ctx.validator.check_slippage(slippage)?;
        let router = self.descriptor.require(ContractRole::SwapRouter)?;

        let token_a = self.resolve(TokenAddress::Erc20(addr_a)).await?;
        let token_b = self.resolve(TokenAddress::Erc20(addr_b)).await?;
        let pool = self
            .reserves(addr_a, addr_b)
            .await?
            .ok_or_else(|| LiquidityError::PairNotFound {
                input: token_a.symbol.clone(),
                output: token_b.symbol.clone(),
            })?;

        let lp = self.resolve(TokenAddress::Erc20(pool.pair)).await?;
        let liquidity = parse_units(&req.liquidity, lp.decimals)?;
        self.check_balance(wallet, &lp, pool.pair, liquidity, "burn").await?;

        let total_supply = self.client.total_supply(pool.pair).await?;
        if total_supply.is_zero() {
            return Err(LiquidityError::NoLiquidity.into());
        }
        let expected_a = pricing::share_of_reserve(liquidity, pool.reserve_in, total_supply);
        let expected_b = pricing::share_of_reserve(liquidity, pool.reserve_out, total_supply);
        let min_a = pricing::min_output_with_slippage(expected_a, slippage);
        let min_b = pricing::min_output_with_slippage(expected_b, slippage);

        let order = TradeOrder::new(TradeCall::RemoveLiquidity {
            router,
            token_a: addr_a,
            token_b: addr_b,
            liquidity,
            min_a,
            min_b,
            recipient: wallet.address(),
            deadline: self.deadline(),
        })
        .requiring(AllowanceRequirement {
            token: pool.pair,
            spender: router,
            amount: liquidity,
        });

        let draft = Draft {
            inputs: vec![TokenAmount::new(&lp, liquidity)],
            expected_outputs: vec![
                TokenAmount::new(&token_a, expected_a),
                TokenAmount::new(&token_b, expected_b),
            ],
            min_outputs: vec![TokenAmount::new(&token_a, min_a), TokenAmount::new(&token_b, min_b)],
            quote: None,
            route: Vec::new(),
            slippage,
        };
        Ok(self.finish(wallet, order, req.mode, draft).await)
    }

    /// Read-only quote against live reserves. Needs no wallet; a trade the
    /// spread guard would refuse is reported rather than raised.
    pub async fn quote(&self, req: QuoteRequest) -> Result<QuoteReport> {
        let input_addr = TokenAddress::parse(&req.input_token)?;
        let output_addr = TokenAddress::parse(&req.output_token)?;
        let slippage = self.ctx.slippage(req.slippage_percent)?;
        self.ctx.validator.check_slippage(slippage)?;

        let input = self.resolve(input_addr).await?;
        let output = self.resolve(output_addr).await?;
        let amount = parse_units(&req.amount, input.decimals)?;

        let reserves = self
            .reserves(self.pool_address(input.address), self.pool_address(output.address))
            .await?;
        let intent = self.intent(&input, &output, amount, slippage);
        let pool = reserves.ok_or_else(|| LiquidityError::PairNotFound {
            input: input.symbol.clone(),
            output: output.symbol.clone(),
        })?;

        let (accepted, reason) = match self.ctx.validator.validate(&intent, Some(pool.reserve_in)) {
            Ok(()) => (true, None),
            Err(Error::Liquidity(e)) => (false, Some(e.to_string())),
            Err(e) => return Err(e),
        };
        let quote = pricing::quote(amount, pool.reserve_in, pool.reserve_out, self.ctx.config.trading.swap_fee_bps);
        let min_out = quote.min_output(slippage);

        Ok(QuoteReport {
            chain: self.descriptor.name,
            chain_id: self.descriptor.chain_id,
            input: TokenAmount::new(&input, amount),
            expected_output: TokenAmount::new(&output, quote.output_amount),
            min_output: TokenAmount::new(&output, min_out),
            spread_check: SpreadCheck {
                accepted,
                max_allowed_input: TokenAmount::new(&input, self.ctx.validator.max_allowed_input(pool.reserve_in)),
                reason,
            },
            pool,
            quote,
            slippage_percent: slippage.percent(),
        })
    }

    async fn resolve(&self, token: TokenAddress) -> Result<TokenRef> {
        self.resolver.resolve(self.client.as_ref(), token).await
    }

    /// Address used for pool lookups and router paths
    fn pool_address(&self, token: TokenAddress) -> Address {
        token.erc20().unwrap_or_else(|| {
            self.descriptor
                .contract(ContractRole::WrappedNative)
                .unwrap_or_else(|| wrapped_native(self.descriptor.chain))
        })
    }

    fn deadline(&self) -> U256 {
        let now = chrono::Utc::now().timestamp().max(0) as u64;
        U256::from(now.saturating_add(self.ctx.config.trading.deadline_secs))
    }

    fn intent(&self, input: &TokenRef, output: &TokenRef, amount: U256, slippage: Slippage) -> TradeIntent {
        TradeIntent {
            chain: self.descriptor.chain,
            input_token: input.clone(),
            output_token: output.clone(),
            input_amount: amount,
            slippage,
        }
    }

    async fn reserves(&self, token_in: Address, token_out: Address) -> Result<Option<PoolReserves>> {
        let factory = self.descriptor.require(ContractRole::PoolFactory)?;
        fetch_pool_reserves(self.client.as_ref(), factory, token_in, token_out).await
    }

    /// Read the pair, run the spread guard and quote the trade
    async fn priced(
        &self,
        input: &TokenRef,
        output: &TokenRef,
        amount: U256,
        slippage: Slippage,
    ) -> Result<(PoolReserves, SwapQuote)> {
        let reserves = self
            .reserves(self.pool_address(input.address), self.pool_address(output.address))
            .await?;
        let intent = self.intent(input, output, amount, slippage);
        self.ctx
            .validator
            .validate(&intent, reserves.map(|r| r.reserve_in))?;

        let pool = reserves.ok_or_else(|| LiquidityError::PairNotFound {
            input: input.symbol.clone(),
            output: output.symbol.clone(),
        })?;
        let quote = pricing::quote(amount, pool.reserve_in, pool.reserve_out, self.ctx.config.trading.swap_fee_bps);
        tracing::debug!(
            chain = %self.descriptor.chain,
            input = %input.symbol,
            output = %output.symbol,
            output_amount = %quote.output_amount,
            price_impact_pct = quote.price_impact_pct,
            "Quoted trade"
        );
        Ok((pool, quote))
    }

    /// `verb` names what the caller is about to do with `amount`
    async fn check_balance(
        &self,
        wallet: &SecureWallet,
        token: &TokenRef,
        address: Address,
        amount: U256,
        verb: &str,
    ) -> Result<()> {
        let balance = self.client.token_balance(address, wallet.address()).await?;
        if balance < amount {
            return Err(Error::Validation(format!(
                "Insufficient balance. You have {} {}, trying to {} {}",
                format_units(balance, token.decimals),
                token.symbol,
                verb,
                format_units(amount, token.decimals)
            )));
        }
        Ok(())
    }

    async fn finish(
        &self,
        wallet: &SecureWallet,
        order: TradeOrder,
        mode: Option<ExecutionMode>,
        draft: Draft,
    ) -> TradeReport {
        let mode = mode.unwrap_or(self.ctx.config.trading.default_mode);
        let settings = OrchestratorSettings {
            approval: self.ctx.config.trading.approval,
            receipt_timeout: self.ctx.config.timeouts.receipt_timeout(),
        };
        let orchestrator = TransactionOrchestrator::new(self.client.as_ref(), self.descriptor, wallet, settings);

        let mut plan = orchestrator.run(order, mode).await;
        let mut warnings = self.resolver.warnings();
        warnings.append(&mut plan.warnings);
        plan.warnings = warnings;

        if let Some(audit) = &self.ctx.audit {
            audit.record_plan(&plan).await;
        }

        let error = plan.failure.as_ref().map(|f| {
            ErrorInfo::from(&Error::Transaction {
                step: f.step.clone(),
                reason: f.reason.clone(),
            })
        });
        TradeReport {
            operation: plan.operation,
            chain: self.descriptor.name,
            chain_id: self.descriptor.chain_id,
            inputs: draft.inputs,
            expected_outputs: draft.expected_outputs,
            min_outputs: draft.min_outputs,
            quote: draft.quote,
            route: draft.route,
            slippage_percent: draft.slippage.percent(),
            plan,
            error,
        }
    }
}

fn distinct_pair(token_a: &str, token_b: &str) -> Result<(Address, Address)> {
    let a = tokens::parse_address(token_a)?;
    let b = tokens::parse_address(token_b)?;
    if a == b {
        return Err(Error::Validation("Pair tokens must differ".to_string()));
    }
    Ok((a, b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::AuditLog;
    use crate::chains::Chain;
    use crate::context::tests::{descriptor, test_context};
    use crate::orchestrator::{PlanStatus, StepKind};
    use crate::pricing::pool_fixtures::{with_pair, with_pool, FACTORY, PAIR};
    use crate::rpc::abi::{IEtfConnector, IPoolRouter, IPusdConnector};
    use crate::rpc::mock::MockChainClient;
    use crate::wallet::TEST_KEY;
    use alloy::primitives::address;
    use alloy::sol_types::{SolCall, SolValue};

    const OWNER: Address = address!("f39fd6e51aad88f6f4ce6ab8827279cfffb92266");
    const PUSD: Address = address!("1111111111111111111111111111111111111111");
    const ETF: Address = address!("2222222222222222222222222222222222222222");
    const ETF_CONNECTOR: Address = address!("3333333333333333333333333333333333333333");
    const PUSD_CONNECTOR: Address = address!("4444444444444444444444444444444444444444");
    const ROUTER: Address = address!("5555555555555555555555555555555555555555");
    const WETH: Address = address!("4200000000000000000000000000000000000006");
    const USDC: Address = address!("6666666666666666666666666666666666666666");
    const FUNDING_PAIR: Address = address!("ba1e000000000000000000000000000000000009");

    fn units(n: u64, decimals: u8) -> U256 {
        U256::from(n) * U256::from(10u64).pow(U256::from(decimals))
    }

    fn base() -> ChainDescriptor {
        descriptor(
            Chain::Base,
            &[
                (ContractRole::StableToken, PUSD),
                (ContractRole::StableConnector, PUSD_CONNECTOR),
                (ContractRole::BasketConnector, ETF_CONNECTOR),
                (ContractRole::SwapRouter, ROUTER),
                (ContractRole::PoolFactory, FACTORY),
                (ContractRole::WrappedNative, WETH),
            ],
        )
    }

    fn tokens() -> MockChainClient {
        MockChainClient::new(Chain::Base)
            .with_token(PUSD, "PUSD", 6)
            .with_token(ETF, "pETF", 18)
            .with_token(PAIR, "PDEX-LP", 18)
            .with_response(
                ETF_CONNECTOR,
                IEtfConnector::gas_feeCall::SELECTOR,
                (U256::from(500u64),).abi_encode_params(),
            )
            .with_response(
                PUSD_CONNECTOR,
                IPusdConnector::gas_feeCall::SELECTOR,
                (U256::from(700u64),).abi_encode_params(),
            )
    }

    /// PUSD/pETF pool holding 1,000,000 PUSD and 1,000 pETF
    fn etf_pool(client: MockChainClient) -> MockChainClient {
        with_pool(client, FACTORY, PAIR, PUSD, units(1_000_000, 6), units(1_000, 18))
    }

    fn wallet() -> Option<SecureWallet> {
        Some(SecureWallet::from_hex(TEST_KEY).unwrap())
    }

    #[tokio::test]
    async fn test_buy_basket_with_stable_simulates_plan() {
        let client = Arc::new(etf_pool(tokens()));
        let ctx = test_context(vec![base()], vec![client.clone()], wallet());
        let descriptor = ctx.chain("8453").unwrap();

        let report = TradeService::new(&ctx, descriptor)
            .unwrap()
            .buy(BuyRequest {
                output_token: ETF.to_string(),
                input_token: PUSD.to_string(),
                amount: "100".into(),
                slippage_percent: Some(1.0),
                mode: None,
            })
            .await
            .unwrap();

        assert_eq!(report.operation, "buy_basket");
        assert_eq!(report.plan.status, PlanStatus::Simulated);
        let kinds: Vec<StepKind> = report.plan.steps.iter().map(|s| s.kind).collect();
        assert_eq!(kinds, vec![StepKind::SetAllowance, StepKind::Execute]);
        assert!(client.sent_transactions().is_empty());

        let quote = report.quote.as_ref().unwrap();
        let execute = report.plan.execute_step().unwrap();
        let buy = IEtfConnector::buyCall::abi_decode(&execute.call.data).unwrap();
        assert_eq!(buy.etf_token, ETF);
        assert_eq!(buy.usd_amount, units(100, 6));
        assert_eq!(buy.etf_amount, quote.min_output(Slippage::from_bps(100)));
        assert_eq!(buy.recipient, OWNER);
        assert!(buy.path.is_empty());
        assert_eq!(execute.call.value, U256::from(500u64));
        assert_eq!(report.min_outputs[0].raw, buy.etf_amount);
        assert!(report.error.is_none());
    }

    #[tokio::test]
    async fn test_buy_over_spread_writes_nothing() {
        let client = Arc::new(with_pool(tokens(), FACTORY, PAIR, PUSD, units(100, 6), units(1, 18)));
        let ctx = test_context(vec![base()], vec![client.clone()], wallet());
        let descriptor = ctx.chain("base").unwrap();

        let err = TradeService::new(&ctx, descriptor)
            .unwrap()
            .buy(BuyRequest {
                output_token: ETF.to_string(),
                input_token: PUSD.to_string(),
                amount: "41".into(),
                slippage_percent: None,
                mode: Some(ExecutionMode::Execute),
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            Error::Liquidity(LiquidityError::SpreadExceeded { max_allowed }) if max_allowed == units(40, 6)
        ));
        assert!(client.sent_transactions().is_empty());
    }

    #[tokio::test]
    async fn test_buy_stable_with_native_routes_to_purchase() {
        let client = Arc::new(with_pool(tokens(), FACTORY, PAIR, WETH, units(500, 18), units(1_000_000, 6)));
        let ctx = test_context(vec![base()], vec![client], wallet());
        let descriptor = ctx.chain("8453").unwrap();

        let report = TradeService::new(&ctx, descriptor)
            .unwrap()
            .buy(BuyRequest {
                output_token: PUSD.to_string(),
                input_token: "native".into(),
                amount: "0.5".into(),
                slippage_percent: None,
                mode: Some(ExecutionMode::Simulate),
            })
            .await
            .unwrap();

        assert_eq!(report.operation, "purchase_stable");
        // native input needs no approval
        assert_eq!(report.plan.steps.len(), 1);
        let execute = report.plan.execute_step().unwrap();
        let purchase = IPusdConnector::purchaseCall::abi_decode(&execute.call.data).unwrap();
        assert_eq!(purchase.amount, units(5, 17));
        assert_eq!(purchase.path, encode_connector_path(WETH, 3000, PUSD));
        assert_eq!(execute.call.value, units(5, 17) + U256::from(700u64));
    }

    /// PUSD/pETF pool plus a `funding`/PUSD pool the connector converts through
    fn routed_pools(funding: Address, funding_reserve: U256, stable_reserve: U256) -> MockChainClient {
        let client = with_pair(
            tokens(),
            FACTORY,
            PAIR,
            (PUSD, units(1_000_000, 6)),
            (ETF, units(1_000, 18)),
        );
        with_pair(
            client,
            FACTORY,
            FUNDING_PAIR,
            (funding, funding_reserve),
            (PUSD, stable_reserve),
        )
    }

    #[tokio::test]
    async fn test_buy_basket_with_native_quotes_both_legs() {
        let client = Arc::new(routed_pools(WETH, units(500, 18), units(1_000_000, 6)));
        let ctx = test_context(vec![base()], vec![client.clone()], wallet());
        let descriptor = ctx.chain("8453").unwrap();

        let report = TradeService::new(&ctx, descriptor)
            .unwrap()
            .buy(BuyRequest {
                output_token: ETF.to_string(),
                input_token: "native".into(),
                amount: "1".into(),
                slippage_percent: Some(1.0),
                mode: None,
            })
            .await
            .unwrap();

        let slippage = Slippage::from_bps(100);
        let to_stable = pricing::swap_output(units(1, 18), units(500, 18), units(1_000_000, 6), 30);
        let to_basket = pricing::swap_output(to_stable, units(1_000_000, 6), units(1_000, 18), 30);

        assert_eq!(report.operation, "buy_basket");
        assert_eq!(report.route.len(), 2);
        assert_eq!(report.route[0].output_amount, to_stable);
        assert_eq!(report.route[1].input_amount, to_stable);
        assert_eq!(report.expected_outputs[0].raw, to_basket);

        // native input needs no approval
        assert_eq!(report.plan.steps.len(), 1);
        let execute = report.plan.execute_step().unwrap();
        let buy = IEtfConnector::buyCall::abi_decode(&execute.call.data).unwrap();
        assert_eq!(buy.usd_amount, pricing::min_output_with_slippage(to_stable, slippage));
        assert_eq!(buy.etf_amount, pricing::min_output_with_slippage(to_basket, slippage));
        assert_eq!(buy.etf_amount, report.min_outputs[0].raw);
        assert_eq!(buy.path, encode_connector_path(WETH, 3000, PUSD));
        assert_eq!(execute.call.value, units(1, 18) + U256::from(500u64));
        assert!(client.sent_transactions().is_empty());
    }

    #[tokio::test]
    async fn test_buy_basket_with_other_token_converts_first() {
        let client = Arc::new(
            routed_pools(USDC, units(2_000_000, 6), units(2_000_000, 6)).with_token(USDC, "USDC", 6),
        );
        let ctx = test_context(vec![base()], vec![client], wallet());
        let descriptor = ctx.chain("8453").unwrap();

        let report = TradeService::new(&ctx, descriptor)
            .unwrap()
            .buy(BuyRequest {
                output_token: ETF.to_string(),
                input_token: USDC.to_string(),
                amount: "250".into(),
                slippage_percent: Some(2.0),
                mode: None,
            })
            .await
            .unwrap();

        let slippage = Slippage::from_bps(200);
        let to_stable = pricing::swap_output(units(250, 6), units(2_000_000, 6), units(2_000_000, 6), 30);
        let to_basket = pricing::swap_output(to_stable, units(1_000_000, 6), units(1_000, 18), 30);

        let kinds: Vec<StepKind> = report.plan.steps.iter().map(|s| s.kind).collect();
        assert_eq!(kinds, vec![StepKind::SetAllowance, StepKind::Execute]);
        let approve = &report.plan.steps[0];
        assert_eq!(approve.call.to, USDC);

        let execute = report.plan.execute_step().unwrap();
        let buy = IEtfConnector::buyCall::abi_decode(&execute.call.data).unwrap();
        assert_eq!(buy.usd_amount, pricing::min_output_with_slippage(to_stable, slippage));
        assert!(buy.usd_amount < units(250, 6));
        assert_eq!(buy.etf_amount, pricing::min_output_with_slippage(to_basket, slippage));
        assert_eq!(buy.path, encode_connector_path(USDC, 3000, PUSD));
        assert_eq!(execute.call.value, U256::from(500u64));
    }

    #[tokio::test]
    async fn test_buy_basket_guards_conversion_leg() {
        let client = Arc::new(routed_pools(WETH, units(2, 18), units(4_000, 6)));
        let ctx = test_context(vec![base()], vec![client.clone()], wallet());
        let descriptor = ctx.chain("8453").unwrap();

        let err = TradeService::new(&ctx, descriptor)
            .unwrap()
            .buy(BuyRequest {
                output_token: ETF.to_string(),
                input_token: "native".into(),
                amount: "1".into(),
                slippage_percent: None,
                mode: Some(ExecutionMode::Execute),
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            Error::Liquidity(LiquidityError::SpreadExceeded { max_allowed }) if max_allowed == units(8, 17)
        ));
        assert!(client.sent_transactions().is_empty());
    }

    #[tokio::test]
    async fn test_sell_checks_balance_first() {
        let client = Arc::new(etf_pool(tokens()).with_token_balance(ETF, OWNER, units(2, 18)));
        let ctx = test_context(vec![base()], vec![client.clone()], wallet());
        let descriptor = ctx.chain("8453").unwrap();

        let err = TradeService::new(&ctx, descriptor)
            .unwrap()
            .sell(SellRequest {
                token: ETF.to_string(),
                amount: "2.5".into(),
                slippage_percent: None,
                mode: None,
            })
            .await
            .unwrap_err();

        assert_eq!(err.kind(), "validation_error");
        assert_eq!(
            err.to_string(),
            "Validation error: Insufficient balance. You have 2 pETF, trying to sell 2.5"
        );
    }

    #[tokio::test]
    async fn test_sell_stable_executes_withdraw() {
        let client = Arc::new(
            with_pool(tokens(), FACTORY, PAIR, PUSD, units(1_000_000, 6), units(400, 18))
                .with_token_balance(PUSD, OWNER, units(50, 6)),
        );
        let ctx = test_context(vec![base()], vec![client.clone()], wallet());
        let descriptor = ctx.chain("8453").unwrap();

        let report = TradeService::new(&ctx, descriptor)
            .unwrap()
            .sell(SellRequest {
                token: PUSD.to_string(),
                amount: "25".into(),
                slippage_percent: None,
                mode: Some(ExecutionMode::Execute),
            })
            .await
            .unwrap();

        assert_eq!(report.operation, "withdraw_stable");
        assert_eq!(report.plan.status, PlanStatus::Confirmed);
        assert_eq!(client.sent_transactions().len(), 2);
        let execute = report.plan.execute_step().unwrap();
        let withdraw = IPusdConnector::withdrawCall::abi_decode(&execute.call.data).unwrap();
        assert_eq!(withdraw.amount, units(25, 6));
        assert_eq!(report.expected_outputs[0].token.symbol, "ETH");
    }

    #[tokio::test]
    async fn test_failed_plan_is_reported_and_audited() {
        let client = Arc::new(
            etf_pool(tokens())
                .with_token_balance(ETF, OWNER, units(5, 18))
                .with_allowance(ETF, OWNER, ETF_CONNECTOR, U256::MAX)
                .with_failed_receipt(0),
        );
        let mut ctx = test_context(vec![base()], vec![client], wallet());
        let audit_file = tempfile::NamedTempFile::new().unwrap();
        ctx.audit = Some(AuditLog::new(audit_file.path()));
        let descriptor = ctx.chain("8453").unwrap();

        let report = TradeService::new(&ctx, descriptor)
            .unwrap()
            .sell(SellRequest {
                token: ETF.to_string(),
                amount: "1".into(),
                slippage_percent: None,
                mode: Some(ExecutionMode::Execute),
            })
            .await
            .unwrap();

        assert_eq!(report.operation, "sell_basket");
        assert!(report.plan.is_failed());
        let error = report.error.unwrap();
        assert_eq!(error.kind, "transaction_error");
        assert!(error.message.contains("execute"));

        let logged = std::fs::read_to_string(audit_file.path()).unwrap();
        assert!(logged.contains("\"sell_basket\""));
        assert!(logged.contains("\"failed\""));
    }

    #[tokio::test]
    async fn test_native_swap_needs_no_approval() {
        let client = Arc::new(with_pool(tokens(), FACTORY, PAIR, WETH, units(100, 18), units(300_000, 6)));
        let ctx = test_context(vec![base()], vec![client], wallet());
        let descriptor = ctx.chain("8453").unwrap();

        let report = TradeService::new(&ctx, descriptor)
            .unwrap()
            .swap(SwapRequest {
                input_token: "native".into(),
                output_token: PUSD.to_string(),
                amount: "1".into(),
                slippage_percent: Some(0.5),
                mode: None,
            })
            .await
            .unwrap();

        assert_eq!(report.plan.steps.len(), 1);
        let execute = report.plan.execute_step().unwrap();
        assert_eq!(execute.call.to, ROUTER);
        assert_eq!(execute.call.value, units(1, 18));
        let swap = IPoolRouter::swapExactETHForTokensCall::abi_decode(&execute.call.data).unwrap();
        assert_eq!(swap.path, vec![WETH, PUSD]);
        assert_eq!(swap.amountOutMin, report.min_outputs[0].raw);
    }

    #[tokio::test]
    async fn test_swap_same_token_rejected() {
        let ctx = test_context(vec![base()], vec![Arc::new(tokens())], wallet());
        let descriptor = ctx.chain("8453").unwrap();

        let err = TradeService::new(&ctx, descriptor)
            .unwrap()
            .swap(SwapRequest {
                input_token: "native".into(),
                output_token: WETH.to_string(),
                amount: "1".into(),
                slippage_percent: None,
                mode: None,
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "validation_error");
    }

    #[tokio::test]
    async fn test_remove_liquidity_minimums() {
        let client = Arc::new(
            with_pool(tokens(), FACTORY, PAIR, PUSD, units(100, 6), units(50, 18))
                .with_total_supply(PAIR, units(10, 18))
                .with_token_balance(PAIR, OWNER, units(3, 18)),
        );
        let ctx = test_context(vec![base()], vec![client], wallet());
        let descriptor = ctx.chain("8453").unwrap();

        let report = TradeService::new(&ctx, descriptor)
            .unwrap()
            .remove_liquidity(RemoveLiquidityRequest {
                token_a: PUSD.to_string(),
                token_b: ETF.to_string(),
                liquidity: "1".into(),
                slippage_percent: Some(2.0),
                mode: None,
            })
            .await
            .unwrap();

        assert_eq!(report.expected_outputs[0].raw, units(10, 6));
        assert_eq!(report.expected_outputs[1].raw, units(5, 18));
        let execute = report.plan.execute_step().unwrap();
        let remove = IPoolRouter::removeLiquidityCall::abi_decode(&execute.call.data).unwrap();
        assert_eq!(remove.liquidity, units(1, 18));
        assert_eq!(remove.amountAMin, U256::from(9_800_000u64));
        assert_eq!(remove.amountBMin, units(49, 17));

        let approve = &report.plan.steps[0];
        assert_eq!(approve.kind, StepKind::SetAllowance);
        assert_eq!(approve.call.to, PAIR);
    }

    #[tokio::test]
    async fn test_add_liquidity_approves_both_tokens() {
        let client = Arc::new(
            tokens()
                .with_token_balance(PUSD, OWNER, units(1_000, 6))
                .with_token_balance(ETF, OWNER, units(1, 18))
                .with_allowance(ETF, OWNER, ROUTER, U256::from(1u64)),
        );
        let ctx = test_context(vec![base()], vec![client], wallet());
        let descriptor = ctx.chain("8453").unwrap();

        let report = TradeService::new(&ctx, descriptor)
            .unwrap()
            .add_liquidity(AddLiquidityRequest {
                token_a: PUSD.to_string(),
                token_b: ETF.to_string(),
                amount_a: "1000".into(),
                amount_b: "1".into(),
                slippage_percent: None,
                mode: None,
            })
            .await
            .unwrap();

        let kinds: Vec<StepKind> = report.plan.steps.iter().map(|s| s.kind).collect();
        assert_eq!(
            kinds,
            vec![
                StepKind::SetAllowance,
                StepKind::ResetAllowance,
                StepKind::SetAllowance,
                StepKind::Execute
            ]
        );
        assert_eq!(report.min_outputs[0].raw, units(980, 6));
    }

    #[tokio::test]
    async fn test_add_liquidity_balance_message_names_deposit() {
        let client = Arc::new(
            tokens()
                .with_token_balance(PUSD, OWNER, units(1_000, 6))
                .with_token_balance(ETF, OWNER, units(1, 18)),
        );
        let ctx = test_context(vec![base()], vec![client], wallet());
        let descriptor = ctx.chain("8453").unwrap();

        let err = TradeService::new(&ctx, descriptor)
            .unwrap()
            .add_liquidity(AddLiquidityRequest {
                token_a: PUSD.to_string(),
                token_b: ETF.to_string(),
                amount_a: "1000".into(),
                amount_b: "3".into(),
                slippage_percent: None,
                mode: None,
            })
            .await
            .unwrap_err();

        assert_eq!(
            err.to_string(),
            "Validation error: Insufficient balance. You have 1 pETF, trying to deposit 3"
        );
    }

    #[tokio::test]
    async fn test_quote_reports_spread_without_wallet() {
        let client = Arc::new(with_pool(tokens(), FACTORY, PAIR, PUSD, units(100, 6), units(10, 18)));
        let ctx = test_context(vec![base()], vec![client.clone()], None);
        let descriptor = ctx.chain("8453").unwrap();

        let report = TradeService::new(&ctx, descriptor)
            .unwrap()
            .quote(QuoteRequest {
                input_token: PUSD.to_string(),
                output_token: ETF.to_string(),
                amount: "50".into(),
                slippage_percent: None,
            })
            .await
            .unwrap();

        assert!(!report.spread_check.accepted);
        assert_eq!(report.spread_check.max_allowed_input.raw, units(40, 6));
        assert!(report.spread_check.reason.unwrap().contains("maximum spread"));
        assert!(report.expected_output.raw > U256::ZERO);
        assert!(client.sent_transactions().is_empty());
    }

    #[tokio::test]
    async fn test_write_without_wallet_issues_no_calls() {
        let client = Arc::new(etf_pool(tokens()));
        let ctx = test_context(vec![base()], vec![client.clone()], None);
        let descriptor = ctx.chain("8453").unwrap();

        let err = TradeService::new(&ctx, descriptor)
            .unwrap()
            .buy(BuyRequest {
                output_token: ETF.to_string(),
                input_token: PUSD.to_string(),
                amount: "1".into(),
                slippage_percent: None,
                mode: None,
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "configuration_error");
        assert_eq!(client.calls(), 0);
    }
}
