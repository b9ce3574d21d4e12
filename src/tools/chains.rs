//! Chain metadata tools

use super::{ChainInput, NoInput, PadexTool};
use crate::chains::ContractRole;
use crate::context::AppContext;
use crate::Result;
use alloy::primitives::Address;
use async_trait::async_trait;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    Connected,
    NotConnected,
    ConnectionError,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChainInfo {
    pub chain_id: u64,
    pub name: &'static str,
    pub native_symbol: &'static str,
    pub explorer_url: &'static str,
    pub contracts: BTreeMap<ContractRole, Address>,
    pub status: ConnectionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latest_block: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub struct GetChainInfoTool;

#[async_trait]
impl PadexTool for GetChainInfoTool {
    const NAME: &'static str = "get_chain_info";
    type Input = ChainInput;
    type Output = ChainInfo;

    fn description(&self) -> &'static str {
        "Configured contracts, connection status and latest block for one chain"
    }

    async fn execute(&self, ctx: &AppContext, args: ChainInput) -> Result<ChainInfo> {
        let descriptor = ctx.chain(&args.chain_id)?;
        let (status, latest_block, error) = match ctx.clients.get(descriptor.chain) {
            None => (ConnectionStatus::NotConnected, None, None),
            Some(client) => {
                match tokio::time::timeout(ctx.config.timeouts.per_chain_query(), client.block_number()).await {
                    Ok(Ok(block)) => (ConnectionStatus::Connected, Some(block), None),
                    Ok(Err(e)) => {
                        tracing::warn!(chain = %descriptor.chain, error = %e, "Block number query failed");
                        (ConnectionStatus::ConnectionError, None, Some(e.to_string()))
                    }
                    Err(_) => {
                        tracing::warn!(chain = %descriptor.chain, "Block number query timed out");
                        (ConnectionStatus::ConnectionError, None, Some("timeout".to_string()))
                    }
                }
            }
        };

        Ok(ChainInfo {
            chain_id: descriptor.chain_id,
            name: descriptor.name,
            native_symbol: descriptor.native_symbol,
            explorer_url: descriptor.explorer_url,
            contracts: descriptor.contracts.clone(),
            status,
            latest_block,
            error,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ChainSummary {
    pub chain_id: u64,
    pub name: &'static str,
    pub api_name: &'static str,
    pub native_symbol: &'static str,
    pub connected: bool,
    pub has_pusd: bool,
    pub has_pusd_connector: bool,
    pub has_etf_connector: bool,
    pub has_swap_router: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SupportedChains {
    pub chains: Vec<ChainSummary>,
}

pub struct ListSupportedChainsTool;

#[async_trait]
impl PadexTool for ListSupportedChainsTool {
    const NAME: &'static str = "list_supported_chains";
    type Input = NoInput;
    type Output = SupportedChains;

    fn description(&self) -> &'static str {
        "Every supported chain with the contracts configured for it"
    }

    async fn execute(&self, ctx: &AppContext, _args: NoInput) -> Result<SupportedChains> {
        let chains = ctx
            .registry
            .all()
            .iter()
            .map(|d| ChainSummary {
                chain_id: d.chain_id,
                name: d.name,
                api_name: d.chain.api_name(),
                native_symbol: d.native_symbol,
                connected: ctx.clients.contains(d.chain),
                has_pusd: d.contract(ContractRole::StableToken).is_some(),
                has_pusd_connector: d.contract(ContractRole::StableConnector).is_some(),
                has_etf_connector: d.contract(ContractRole::BasketConnector).is_some(),
                has_swap_router: d.contract(ContractRole::SwapRouter).is_some(),
            })
            .collect();
        Ok(SupportedChains { chains })
    }
}
