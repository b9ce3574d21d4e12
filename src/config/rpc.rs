//! RPC endpoint and contract address configuration
//!
//! Endpoints follow Ethereum ecosystem conventions:
//! 1. Per-chain env vars (ETH_RPC_URL, ARBITRUM_RPC_URL, etc.) - highest priority
//! 2. ALCHEMY_API_KEY - builds URLs for the chains Alchemy serves
//! 3. Public RPC fallbacks - for testing only
//!
//! Contract deployments are read from `<ROLE>_<SUFFIX>` variables, e.g.
//! `PUSD_TOKEN_ETH`, `ETF_CONNECTOR_ARB`, `POOL_FACTORY_MATIC`.
//!
//! ```bash
//! export ETH_RPC_URL="https://eth-mainnet.g.alchemy.com/v2/YOUR_KEY"
//! export PUSD_TOKEN_ETH="0x..."
//! export PUSD_CONNECTOR_ETH="0x..."
//! ```

use crate::chains::{Chain, ContractRole};
use alloy::primitives::{address, Address};
use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;

/// Environment variable names
mod env_vars {
    pub const ALCHEMY_API_KEY: &str = "ALCHEMY_API_KEY";
}

/// Public RPC endpoints (rate limited, for testing only)
mod public_rpcs {
    pub const ETHEREUM: &str = "https://eth.llamarpc.com";
    pub const ARBITRUM: &str = "https://arb1.arbitrum.io/rpc";
    pub const OPTIMISM: &str = "https://mainnet.optimism.io";
    pub const BASE: &str = "https://mainnet.base.org";
    pub const BSC: &str = "https://bsc-dataseed1.binance.org";
    pub const POLYGON: &str = "https://polygon-rpc.com";
    pub const GNOSIS: &str = "https://rpc.gnosischain.com";
}

fn rpc_env_var(chain: Chain) -> &'static str {
    match chain {
        Chain::Ethereum => "ETH_RPC_URL",
        Chain::Arbitrum => "ARBITRUM_RPC_URL",
        Chain::Optimism => "OPTIMISM_RPC_URL",
        Chain::Base => "BASE_RPC_URL",
        Chain::BnbSmartChain => "BSC_RPC_URL",
        Chain::Polygon => "POLYGON_RPC_URL",
        Chain::Gnosis => "GNOSIS_RPC_URL",
    }
}

fn public_rpc(chain: Chain) -> &'static str {
    match chain {
        Chain::Ethereum => public_rpcs::ETHEREUM,
        Chain::Arbitrum => public_rpcs::ARBITRUM,
        Chain::Optimism => public_rpcs::OPTIMISM,
        Chain::Base => public_rpcs::BASE,
        Chain::BnbSmartChain => public_rpcs::BSC,
        Chain::Polygon => public_rpcs::POLYGON,
        Chain::Gnosis => public_rpcs::GNOSIS,
    }
}

fn alchemy_url(chain: Chain, key: &str) -> String {
    let network = match chain {
        Chain::Ethereum => "eth-mainnet",
        Chain::Arbitrum => "arb-mainnet",
        Chain::Optimism => "opt-mainnet",
        Chain::Base => "base-mainnet",
        Chain::Polygon => "polygon-mainnet",
        Chain::BnbSmartChain => "bnb-mainnet",
        Chain::Gnosis => "gnosis-mainnet",
    };
    format!("https://{}.g.alchemy.com/v2/{}", network, key)
}

/// RPC configuration for all supported chains
#[derive(Debug, Clone)]
pub struct RpcConfig {
    urls: HashMap<Chain, String>,
}

impl RpcConfig {
    /// Create RPC config from environment variables
    pub fn from_env() -> Self {
        let mut urls = HashMap::new();

        for chain in Chain::ALL {
            if let Ok(url) = std::env::var(rpc_env_var(chain)) {
                if !url.trim().is_empty() {
                    tracing::debug!(chain = %chain, var = rpc_env_var(chain), "Using per-chain RPC URL");
                    urls.insert(chain, url.trim().to_string());
                }
            }
        }

        if let Ok(key) = std::env::var(env_vars::ALCHEMY_API_KEY) {
            tracing::info!("Building missing RPC URLs from ALCHEMY_API_KEY");
            for chain in Chain::ALL {
                urls.entry(chain).or_insert_with(|| alchemy_url(chain, &key));
            }
        }

        for chain in Chain::ALL {
            urls.entry(chain).or_insert_with(|| {
                tracing::warn!(chain = %chain, "No RPC configured, using public RPC (rate limited)");
                public_rpc(chain).to_string()
            });
        }

        Self { urls }
    }

    /// Create with explicit RPC URLs; chains without an entry have no endpoint
    pub fn with_urls(urls: HashMap<Chain, String>) -> Self {
        Self { urls }
    }

    pub fn get(&self, chain: Chain) -> Option<&str> {
        self.urls.get(&chain).map(|s| s.as_str())
    }

    pub fn has_chain(&self, chain: Chain) -> bool {
        self.urls.contains_key(&chain)
    }
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

/// Env var suffix used for contract addresses on each chain
fn contract_env_suffix(chain: Chain) -> &'static str {
    match chain {
        Chain::Ethereum => "ETH",
        Chain::Arbitrum => "ARB",
        Chain::Optimism => "OP",
        Chain::Base => "BASE",
        Chain::BnbSmartChain => "BSC",
        Chain::Polygon => "MATIC",
        Chain::Gnosis => "GNOSIS",
    }
}

fn contract_env_prefix(role: ContractRole) -> Option<&'static str> {
    match role {
        ContractRole::StableToken => Some("PUSD_TOKEN"),
        ContractRole::StableConnector => Some("PUSD_CONNECTOR"),
        ContractRole::BasketConnector => Some("ETF_CONNECTOR"),
        ContractRole::TraderContract => Some("TRADER_CONTRACT"),
        ContractRole::SwapRouter => Some("SWAP_ROUTER"),
        ContractRole::PoolFactory => Some("POOL_FACTORY"),
        ContractRole::WrappedNative => None,
    }
}

const ENV_ROLES: [ContractRole; 6] = [
    ContractRole::StableToken,
    ContractRole::StableConnector,
    ContractRole::BasketConnector,
    ContractRole::TraderContract,
    ContractRole::SwapRouter,
    ContractRole::PoolFactory,
];

/// Canonical wrapped native token per chain
pub fn wrapped_native(chain: Chain) -> Address {
    match chain {
        Chain::Ethereum => address!("c02aaa39b223fe8d0a0e5c4f27ead9083c756cc2"),
        Chain::Arbitrum => address!("82af49447d8a07e3bd95bd0d56f35241523fbab1"),
        Chain::Optimism | Chain::Base => address!("4200000000000000000000000000000000000006"),
        Chain::BnbSmartChain => address!("bb4cdb9cbd36b01bd1cbaebf2de08d9173bc095c"),
        Chain::Polygon => address!("0d500b1d8e8ef31e21c99d1db9a6444d3adf1270"),
        Chain::Gnosis => address!("e91d153e0b41518a2ce8dd3d7944fa863463a97d"),
    }
}

/// Contract deployments per chain
#[derive(Debug, Clone, Default)]
pub struct ContractsConfig {
    contracts: HashMap<Chain, BTreeMap<ContractRole, Address>>,
}

impl ContractsConfig {
    /// Read role addresses from the environment; wrapped native is built in
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read role addresses through an arbitrary key lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut contracts = HashMap::new();

        for chain in Chain::ALL {
            let mut roles = BTreeMap::new();
            roles.insert(ContractRole::WrappedNative, wrapped_native(chain));

            for role in ENV_ROLES {
                let Some(prefix) = contract_env_prefix(role) else {
                    continue;
                };
                let key = format!("{}_{}", prefix, contract_env_suffix(chain));
                let Some(raw) = lookup(&key) else {
                    continue;
                };
                let raw = raw.trim();
                if raw.is_empty() {
                    continue;
                }
                match Address::from_str(raw) {
                    Ok(addr) => {
                        roles.insert(role, addr);
                    }
                    Err(e) => {
                        tracing::warn!(var = %key, error = %e, "Ignoring malformed contract address");
                    }
                }
            }

            contracts.insert(chain, roles);
        }

        Self { contracts }
    }

    pub fn with_contracts(contracts: HashMap<Chain, BTreeMap<ContractRole, Address>>) -> Self {
        Self { contracts }
    }

    pub fn for_chain(&self, chain: Chain) -> BTreeMap<ContractRole, Address> {
        self.contracts.get(&chain).cloned().unwrap_or_default()
    }
}
