//! Wallet and balance tools
//!
//! All read-only. An explicit `wallet_address` is queried as given; without
//! one the configured wallet is used.

use super::{ChainInput, NoInput, PadexTool};
use crate::balances::{AggregateBalances, BalanceAggregator};
use crate::chains::{ChainDescriptor, ContractRole};
use crate::context::AppContext;
use crate::tokens::{self, TokenAddress, TokenResolver};
use crate::trading::TokenAmount;
use crate::Result;
use alloy::primitives::Address;
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct AddressInput {
    /// EVM address to query
    pub address: String,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct PusdBalanceInput {
    #[serde(flatten)]
    pub chain: ChainInput,
    /// Address to query; defaults to the configured wallet
    #[serde(default)]
    pub wallet_address: Option<String>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct EtfBalanceInput {
    #[serde(flatten)]
    pub chain: ChainInput,
    /// ETF token contract address
    pub token_address: String,
    /// Address to query; defaults to the configured wallet
    #[serde(default)]
    pub wallet_address: Option<String>,
}

/// One token balance of one holder
#[derive(Debug, Clone, Serialize)]
pub struct HolderBalance {
    pub chain: &'static str,
    pub chain_id: u64,
    pub owner: Address,
    #[serde(flatten)]
    pub balance: TokenAmount,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

fn owner(ctx: &AppContext, wallet_address: Option<&str>) -> Result<Address> {
    match wallet_address {
        Some(address) => tokens::parse_address(address),
        None => Ok(ctx.require_wallet()?.address()),
    }
}

async fn token_balance(
    ctx: &AppContext,
    descriptor: &ChainDescriptor,
    token: Address,
    owner: Address,
) -> Result<HolderBalance> {
    let client = ctx.client(descriptor)?;
    let resolver = TokenResolver::new();
    let token_ref = resolver.resolve(client.as_ref(), TokenAddress::Erc20(token)).await?;
    let raw = client.token_balance(token, owner).await?;
    Ok(HolderBalance {
        chain: descriptor.name,
        chain_id: descriptor.chain_id,
        owner,
        balance: TokenAmount::new(&token_ref, raw),
        warnings: resolver.warnings(),
    })
}

pub struct GetAccountInfoTool;

#[async_trait]
impl PadexTool for GetAccountInfoTool {
    const NAME: &'static str = "get_account_info";
    type Input = NoInput;
    type Output = AggregateBalances;

    fn description(&self) -> &'static str {
        "Address of the configured wallet with its native and PUSD balances on every supported chain"
    }

    async fn execute(&self, ctx: &AppContext, _args: NoInput) -> Result<AggregateBalances> {
        let address = ctx.require_wallet()?.address().to_string();
        BalanceAggregator::new(&ctx.clients)
            .aggregate(&address, ctx.registry.all(), ctx.config.timeouts.per_chain_query())
            .await
    }
}

pub struct GetAddressBalancesTool;

#[async_trait]
impl PadexTool for GetAddressBalancesTool {
    const NAME: &'static str = "get_address_balances";
    type Input = AddressInput;
    type Output = AggregateBalances;

    fn description(&self) -> &'static str {
        "Native and PUSD balances of any address across all supported chains, queried concurrently"
    }

    async fn execute(&self, ctx: &AppContext, args: AddressInput) -> Result<AggregateBalances> {
        BalanceAggregator::new(&ctx.clients)
            .aggregate(&args.address, ctx.registry.all(), ctx.config.timeouts.per_chain_query())
            .await
    }
}

pub struct GetPusdBalanceTool;

#[async_trait]
impl PadexTool for GetPusdBalanceTool {
    const NAME: &'static str = "get_pusd_balance";
    type Input = PusdBalanceInput;
    type Output = HolderBalance;

    fn description(&self) -> &'static str {
        "PUSD balance of an address (default: the configured wallet) on one chain"
    }

    async fn execute(&self, ctx: &AppContext, args: PusdBalanceInput) -> Result<HolderBalance> {
        let descriptor = ctx.chain(&args.chain.chain_id)?;
        let pusd = descriptor.require(ContractRole::StableToken)?;
        let owner = owner(ctx, args.wallet_address.as_deref())?;
        token_balance(ctx, descriptor, pusd, owner).await
    }
}

pub struct GetEtfBalanceTool;

#[async_trait]
impl PadexTool for GetEtfBalanceTool {
    const NAME: &'static str = "get_etf_balance";
    type Input = EtfBalanceInput;
    type Output = HolderBalance;

    fn description(&self) -> &'static str {
        "Balance of an ETF token for an address (default: the configured wallet) on one chain"
    }

    async fn execute(&self, ctx: &AppContext, args: EtfBalanceInput) -> Result<HolderBalance> {
        let descriptor = ctx.chain(&args.chain.chain_id)?;
        let token = tokens::parse_address(&args.token_address)?;
        let owner = owner(ctx, args.wallet_address.as_deref())?;
        token_balance(ctx, descriptor, token, owner).await
    }
}
