//! Chain registry
//!
//! The set of supported networks is closed: every chain the agent can talk to
//! is a variant of [`Chain`], so matches over chains stay exhaustive. Runtime
//! data (endpoints, contract deployments) lives in [`ChainDescriptor`], built
//! once at startup and never mutated.

use crate::config::{ContractsConfig, RpcConfig};
use crate::{Error, Result};
use alloy::primitives::Address;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Supported EVM networks
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Chain {
    Ethereum,
    Optimism,
    BnbSmartChain,
    Gnosis,
    Polygon,
    Base,
    Arbitrum,
}

impl Chain {
    /// All chains in registry order
    pub const ALL: [Chain; 7] = [
        Chain::Ethereum,
        Chain::Arbitrum,
        Chain::Optimism,
        Chain::Base,
        Chain::BnbSmartChain,
        Chain::Polygon,
        Chain::Gnosis,
    ];

    pub fn chain_id(&self) -> u64 {
        match self {
            Chain::Ethereum => 1,
            Chain::Optimism => 10,
            Chain::BnbSmartChain => 56,
            Chain::Gnosis => 100,
            Chain::Polygon => 137,
            Chain::Base => 8453,
            Chain::Arbitrum => 42161,
        }
    }

    pub fn from_id(chain_id: u64) -> Option<Chain> {
        Chain::ALL.into_iter().find(|c| c.chain_id() == chain_id)
    }

    /// Human-readable network name
    pub fn display_name(&self) -> &'static str {
        match self {
            Chain::Ethereum => "Ethereum",
            Chain::Optimism => "Optimism",
            Chain::BnbSmartChain => "BNB Smart Chain",
            Chain::Gnosis => "Gnosis Chain",
            Chain::Polygon => "Polygon",
            Chain::Base => "Base",
            Chain::Arbitrum => "Arbitrum One",
        }
    }

    /// Name used by the Paloma DEX index API
    pub fn api_name(&self) -> &'static str {
        match self {
            Chain::Ethereum => "ethereum",
            Chain::Optimism => "optimism",
            Chain::BnbSmartChain => "bsc",
            Chain::Gnosis => "gnosis",
            Chain::Polygon => "polygon",
            Chain::Base => "base",
            Chain::Arbitrum => "arbitrum",
        }
    }

    pub fn native_symbol(&self) -> &'static str {
        match self {
            Chain::Ethereum | Chain::Optimism | Chain::Base | Chain::Arbitrum => "ETH",
            Chain::BnbSmartChain => "BNB",
            Chain::Gnosis => "xDAI",
            Chain::Polygon => "POL",
        }
    }

    pub fn explorer_url(&self) -> &'static str {
        match self {
            Chain::Ethereum => "https://etherscan.io",
            Chain::Optimism => "https://optimistic.etherscan.io",
            Chain::BnbSmartChain => "https://bscscan.com",
            Chain::Gnosis => "https://gnosisscan.io",
            Chain::Polygon => "https://polygonscan.com",
            Chain::Base => "https://basescan.org",
            Chain::Arbitrum => "https://arbiscan.io",
        }
    }

    pub fn gas_price_hint_gwei(&self) -> u64 {
        match self {
            Chain::Ethereum | Chain::Polygon => 30,
            Chain::BnbSmartChain => 5,
            Chain::Gnosis => 2,
            Chain::Optimism | Chain::Base | Chain::Arbitrum => 1,
        }
    }

    /// Parse a chain identifier as sent by the agent.
    ///
    /// Accepts decimal chain ids ("8453") and index API names ("base").
    pub fn parse(input: &str) -> Result<Chain> {
        let trimmed = input.trim();
        let by_id = trimmed.parse::<u64>().ok().and_then(Chain::from_id);
        by_id
            .or_else(|| {
                let lower = trimmed.to_lowercase();
                Chain::ALL.into_iter().find(|c| c.api_name() == lower)
            })
            .ok_or_else(|| Error::UnsupportedChain(trimmed.to_string()))
    }
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Role a deployed contract plays on a chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContractRole {
    /// PUSD stable token
    StableToken,
    /// Connector that mints/burns PUSD
    StableConnector,
    /// Connector that buys/sells ETF basket tokens
    BasketConnector,
    TraderContract,
    WrappedNative,
    /// Constant-product router used for swaps and liquidity
    SwapRouter,
    /// Constant-product factory used to locate pairs
    PoolFactory,
}

impl ContractRole {
    pub fn label(&self) -> &'static str {
        match self {
            ContractRole::StableToken => "PUSD token",
            ContractRole::StableConnector => "PUSD connector",
            ContractRole::BasketConnector => "ETF connector",
            ContractRole::TraderContract => "trader contract",
            ContractRole::WrappedNative => "wrapped native token",
            ContractRole::SwapRouter => "swap router",
            ContractRole::PoolFactory => "pool factory",
        }
    }
}

/// Immutable per-chain metadata
#[derive(Debug, Clone, Serialize)]
pub struct ChainDescriptor {
    pub chain: Chain,
    pub chain_id: u64,
    pub name: &'static str,
    pub native_symbol: &'static str,
    pub endpoint_url: Option<String>,
    pub explorer_url: &'static str,
    pub gas_price_hint_gwei: u64,
    pub contracts: BTreeMap<ContractRole, Address>,
}

impl ChainDescriptor {
    pub fn new(
        chain: Chain,
        endpoint_url: Option<String>,
        contracts: BTreeMap<ContractRole, Address>,
    ) -> Self {
        Self {
            chain,
            chain_id: chain.chain_id(),
            name: chain.display_name(),
            native_symbol: chain.native_symbol(),
            endpoint_url,
            explorer_url: chain.explorer_url(),
            gas_price_hint_gwei: chain.gas_price_hint_gwei(),
            contracts,
        }
    }

    pub fn contract(&self, role: ContractRole) -> Option<Address> {
        self.contracts.get(&role).copied()
    }

    /// Like [`contract`](Self::contract) but a missing role is a configuration error
    pub fn require(&self, role: ContractRole) -> Result<Address> {
        self.contract(role)
            .ok_or_else(|| Error::not_configured(self.name, role.label()))
    }

    pub fn explorer_tx_url(&self, tx_hash: &str) -> String {
        format!("{}/tx/{}", self.explorer_url, tx_hash)
    }
}

/// Lookup table of every supported chain, in stable insertion order
#[derive(Debug, Clone)]
pub struct ChainRegistry {
    chains: Vec<ChainDescriptor>,
}

impl ChainRegistry {
    /// Build a registry from explicit descriptors.
    ///
    /// Later duplicates of a chain are ignored so lookups stay unambiguous.
    pub fn new(descriptors: impl IntoIterator<Item = ChainDescriptor>) -> Self {
        let mut chains: Vec<ChainDescriptor> = Vec::new();
        for descriptor in descriptors {
            if chains.iter().any(|c| c.chain == descriptor.chain) {
                tracing::warn!(chain = %descriptor.chain, "Duplicate chain descriptor ignored");
                continue;
            }
            chains.push(descriptor);
        }
        Self { chains }
    }

    /// Build the registry for all supported chains from loaded configuration
    pub fn from_config(rpc: &RpcConfig, contracts: &ContractsConfig) -> Self {
        Self::new(Chain::ALL.into_iter().map(|chain| {
            ChainDescriptor::new(
                chain,
                rpc.get(chain).map(str::to_string),
                contracts.for_chain(chain),
            )
        }))
    }

    pub fn get(&self, chain: Chain) -> Result<&ChainDescriptor> {
        self.chains
            .iter()
            .find(|c| c.chain == chain)
            .ok_or_else(|| Error::UnsupportedChain(chain.chain_id().to_string()))
    }

    /// Look up a chain by numeric id
    pub fn lookup(&self, chain_id: u64) -> Result<&ChainDescriptor> {
        Chain::from_id(chain_id)
            .ok_or_else(|| Error::UnsupportedChain(chain_id.to_string()))
            .and_then(|chain| self.get(chain))
    }

    /// Resolve a string identifier sent over the tool surface
    pub fn resolve(&self, input: &str) -> Result<&ChainDescriptor> {
        self.get(Chain::parse(input)?)
    }

    pub fn all(&self) -> &[ChainDescriptor] {
        &self.chains
    }
}
