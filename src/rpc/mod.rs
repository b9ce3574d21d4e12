//! Chain RPC collaborator
//!
//! Everything the agent needs from a chain goes through [`ChainClient`]. The
//! production implementation wraps an alloy HTTP provider; tests use an
//! in-memory client. ERC-20 reads are provided on top of [`ChainClient::call`]
//! so implementations only have to speak raw `eth_call`.

pub mod abi;
mod alloy_client;
#[cfg(test)]
pub(crate) mod mock;
mod revert;

use crate::chains::{Chain, ChainRegistry};
use alloy::primitives::{Address, Bytes, B256, U256};
use alloy::rpc::types::TransactionRequest;
use alloy::sol_types::SolCall;
use async_trait::async_trait;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

pub use alloy_client::AlloyChainClient;
pub use revert::parse_revert_reason;

use abi::IERC20;

/// Failure talking to a chain endpoint
#[derive(Debug, Clone, thiserror::Error)]
pub enum RpcError {
    #[error("request timed out")]
    Timeout,

    #[error("transport error: {0}")]
    Transport(String),

    #[error("failed to decode response: {0}")]
    Decode(String),

    #[error("execution reverted: {0}")]
    Reverted(String),
}

pub type RpcResult<T> = std::result::Result<T, RpcError>;

/// Mined transaction outcome
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Receipt {
    pub tx_hash: B256,
    pub success: bool,
    pub gas_used: u64,
    pub block_number: Option<u64>,
}

#[async_trait]
pub trait ChainClient: Send + Sync {
    fn chain(&self) -> Chain;

    async fn native_balance(&self, owner: Address) -> RpcResult<U256>;

    /// Read-only contract call (`eth_call` against latest)
    async fn call(&self, to: Address, data: Bytes) -> RpcResult<Bytes>;

    async fn estimate_gas(&self, tx: &TransactionRequest) -> RpcResult<u64>;

    async fn gas_price(&self) -> RpcResult<u128>;

    /// Pending transaction count, used as the next nonce
    async fn transaction_count(&self, owner: Address) -> RpcResult<u64>;

    async fn send_raw_transaction(&self, raw: Bytes) -> RpcResult<B256>;

    /// Poll until the transaction is mined or `timeout` elapses
    async fn wait_for_receipt(&self, tx_hash: B256, timeout: Duration) -> RpcResult<Receipt>;

    async fn block_number(&self) -> RpcResult<u64>;

    async fn token_balance(&self, token: Address, owner: Address) -> RpcResult<U256> {
        let data = IERC20::balanceOfCall { owner }.abi_encode();
        let out = self.call(token, data.into()).await?;
        decode::<IERC20::balanceOfCall>(&out)
    }

    async fn token_decimals(&self, token: Address) -> RpcResult<u8> {
        let out = self.call(token, IERC20::decimalsCall {}.abi_encode().into()).await?;
        decode::<IERC20::decimalsCall>(&out)
    }

    async fn token_symbol(&self, token: Address) -> RpcResult<String> {
        let out = self.call(token, IERC20::symbolCall {}.abi_encode().into()).await?;
        decode::<IERC20::symbolCall>(&out)
    }

    async fn total_supply(&self, token: Address) -> RpcResult<U256> {
        let out = self.call(token, IERC20::totalSupplyCall {}.abi_encode().into()).await?;
        decode::<IERC20::totalSupplyCall>(&out)
    }

    async fn allowance(&self, token: Address, owner: Address, spender: Address) -> RpcResult<U256> {
        let data = IERC20::allowanceCall { owner, spender }.abi_encode();
        let out = self.call(token, data.into()).await?;
        decode::<IERC20::allowanceCall>(&out)
    }
}

/// Decode the return data of a typed call
pub fn decode<C: SolCall>(data: &[u8]) -> RpcResult<C::Return> {
    C::abi_decode_returns(data).map_err(|e| RpcError::Decode(format!("{}: {}", C::SIGNATURE, e)))
}

/// Live clients keyed by chain.
///
/// A chain with no entry has no usable endpoint; callers report it rather than
/// skipping it.
#[derive(Clone, Default)]
pub struct ChainClients {
    clients: HashMap<Chain, Arc<dyn ChainClient>>,
}

impl ChainClients {
    pub fn new() -> Self {
        Self::default()
    }

    /// Connect an alloy client for every chain with a valid endpoint URL
    pub fn connect(registry: &ChainRegistry) -> Self {
        let mut clients = Self::new();
        for descriptor in registry.all() {
            let Some(endpoint) = descriptor.endpoint_url.as_deref() else {
                continue;
            };
            match AlloyChainClient::connect(descriptor.chain, endpoint) {
                Ok(client) => clients.insert(Arc::new(client)),
                Err(e) => {
                    tracing::warn!(chain = %descriptor.chain, error = %e, "Skipping chain with unusable endpoint");
                }
            }
        }
        clients
    }

    pub fn insert(&mut self, client: Arc<dyn ChainClient>) {
        self.clients.insert(client.chain(), client);
    }

    pub fn get(&self, chain: Chain) -> Option<Arc<dyn ChainClient>> {
        self.clients.get(&chain).cloned()
    }

    pub fn contains(&self, chain: Chain) -> bool {
        self.clients.contains_key(&chain)
    }
}

impl std::fmt::Debug for ChainClients {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut chains: Vec<Chain> = self.clients.keys().copied().collect();
        chains.sort();
        f.debug_struct("ChainClients").field("chains", &chains).finish()
    }
}
