//! [`ChainClient`] backed by an alloy HTTP provider

use super::{parse_revert_reason, ChainClient, Receipt, RpcError, RpcResult};
use crate::chains::Chain;
use alloy::network::{ReceiptResponse, TransactionBuilder};
use alloy::primitives::{Address, Bytes, B256, U256};
use alloy::providers::{
    DynProvider, PendingTransactionConfig, PendingTransactionError, Provider, ProviderBuilder, WatchTxError,
};
use alloy::rpc::types::TransactionRequest;
use alloy::transports::TransportError;
use async_trait::async_trait;
use std::time::Duration;

pub struct AlloyChainClient {
    chain: Chain,
    provider: DynProvider,
}

impl AlloyChainClient {
    /// Build a client for `endpoint`; no request is made until first use
    pub fn connect(chain: Chain, endpoint: &str) -> RpcResult<Self> {
        let url: url::Url = endpoint
            .parse()
            .map_err(|e| RpcError::Transport(format!("invalid RPC URL: {}", e)))?;

        // Nonce, gas and chain id are filled by the orchestrator, not the provider.
        let provider = ProviderBuilder::new()
            .disable_recommended_fillers()
            .connect_http(url)
            .erased();

        Ok(Self { chain, provider })
    }
}

fn transport(err: TransportError) -> RpcError {
    let message = err.to_string();
    if message.contains("execution reverted") {
        RpcError::Reverted(parse_revert_reason(&message))
    } else {
        RpcError::Transport(message)
    }
}

fn watch(err: PendingTransactionError) -> RpcError {
    match err {
        PendingTransactionError::TxWatcher(WatchTxError::Timeout) => RpcError::Timeout,
        PendingTransactionError::TransportError(e) => transport(e),
        other => RpcError::Transport(format!("transaction watch failed: {}", other)),
    }
}

#[async_trait]
impl ChainClient for AlloyChainClient {
    fn chain(&self) -> Chain {
        self.chain
    }

    async fn native_balance(&self, owner: Address) -> RpcResult<U256> {
        self.provider.get_balance(owner).await.map_err(transport)
    }

    async fn call(&self, to: Address, data: Bytes) -> RpcResult<Bytes> {
        let tx = TransactionRequest::default().with_to(to).with_input(data);
        self.provider.call(tx).await.map_err(transport)
    }

    async fn estimate_gas(&self, tx: &TransactionRequest) -> RpcResult<u64> {
        self.provider
            .estimate_gas(tx.clone())
            .await
            .map_err(transport)
    }

    async fn gas_price(&self) -> RpcResult<u128> {
        self.provider.get_gas_price().await.map_err(transport)
    }

    async fn transaction_count(&self, owner: Address) -> RpcResult<u64> {
        self.provider
            .get_transaction_count(owner)
            .pending()
            .await
            .map_err(transport)
    }

    async fn send_raw_transaction(&self, raw: Bytes) -> RpcResult<B256> {
        let pending = self
            .provider
            .send_raw_transaction(&raw)
            .await
            .map_err(transport)?;
        Ok(*pending.tx_hash())
    }

    async fn wait_for_receipt(&self, tx_hash: B256, timeout: Duration) -> RpcResult<Receipt> {
        let config = PendingTransactionConfig::new(tx_hash).with_timeout(Some(timeout));
        let confirmed = self
            .provider
            .watch_pending_transaction(config)
            .await
            .map_err(watch)?
            .await
            .map_err(watch)?;

        let receipt = self
            .provider
            .get_transaction_receipt(confirmed)
            .await
            .map_err(transport)?
            .ok_or_else(|| RpcError::Transport(format!("receipt for {} not available", confirmed)))?;
        Ok(Receipt {
            tx_hash,
            success: receipt.status(),
            gas_used: receipt.gas_used,
            block_number: receipt.block_number,
        })
    }

    async fn block_number(&self) -> RpcResult<u64> {
        self.provider.get_block_number().await.map_err(transport)
    }
}
