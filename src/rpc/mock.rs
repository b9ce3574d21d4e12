//! In-memory [`ChainClient`] for tests

use super::abi::IERC20;
use super::{ChainClient, Receipt, RpcError, RpcResult};
use crate::chains::Chain;
use alloy::primitives::{keccak256, Address, Bytes, B256, U256};
use alloy::rpc::types::TransactionRequest;
use alloy::sol_types::{SolCall, SolValue};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

pub(crate) struct MockChainClient {
    chain: Chain,
    native: HashMap<Address, U256>,
    tokens: HashMap<Address, (String, u8)>,
    balances: HashMap<(Address, Address), U256>,
    allowances: HashMap<(Address, Address, Address), U256>,
    supplies: HashMap<Address, U256>,
    responses: HashMap<(Address, [u8; 4]), Bytes>,
    exact_responses: HashMap<(Address, Bytes), Bytes>,
    delay: Option<Duration>,
    failure: Option<RpcError>,
    native_failure: Option<RpcError>,
    gas_estimate: Option<u64>,
    gas_price: u128,
    failed_receipts: HashSet<usize>,
    nonce: AtomicU64,
    calls: AtomicUsize,
    sent: Mutex<Vec<Bytes>>,
}

impl MockChainClient {
    pub(crate) fn new(chain: Chain) -> Self {
        Self {
            chain,
            native: HashMap::new(),
            tokens: HashMap::new(),
            balances: HashMap::new(),
            allowances: HashMap::new(),
            supplies: HashMap::new(),
            responses: HashMap::new(),
            exact_responses: HashMap::new(),
            delay: None,
            failure: None,
            native_failure: None,
            gas_estimate: Some(90_000),
            gas_price: 1_000_000_000,
            failed_receipts: HashSet::new(),
            nonce: AtomicU64::new(0),
            calls: AtomicUsize::new(0),
            sent: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn with_native_balance(mut self, owner: Address, amount: U256) -> Self {
        self.native.insert(owner, amount);
        self
    }

    pub(crate) fn with_token(mut self, token: Address, symbol: &str, decimals: u8) -> Self {
        self.tokens.insert(token, (symbol.to_string(), decimals));
        self
    }

    pub(crate) fn with_token_balance(mut self, token: Address, owner: Address, amount: U256) -> Self {
        self.balances.insert((token, owner), amount);
        self
    }

    pub(crate) fn with_allowance(
        mut self,
        token: Address,
        owner: Address,
        spender: Address,
        amount: U256,
    ) -> Self {
        self.allowances.insert((token, owner, spender), amount);
        self
    }

    pub(crate) fn with_total_supply(mut self, token: Address, amount: U256) -> Self {
        self.supplies.insert(token, amount);
        self
    }

    /// Canned return data for any call to `to` with the given selector
    pub(crate) fn with_response(mut self, to: Address, selector: [u8; 4], data: impl Into<Bytes>) -> Self {
        self.responses.insert((to, selector), data.into());
        self
    }

    /// Every read sleeps this long before answering
    /// Answer a call with exactly this calldata; wins over selector responses
    pub(crate) fn with_call_response(mut self, to: Address, data: impl Into<Bytes>, response: impl Into<Bytes>) -> Self {
        self.exact_responses.insert((to, data.into()), response.into());
        self
    }

    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Every read fails with `err`
    pub(crate) fn failing(mut self, err: RpcError) -> Self {
        self.failure = Some(err);
        self
    }

    /// Only native balance reads fail with `err`
    pub(crate) fn failing_native(mut self, err: RpcError) -> Self {
        self.native_failure = Some(err);
        self
    }

    /// `None` makes gas estimation fail
    pub(crate) fn with_gas_estimate(mut self, gas: Option<u64>) -> Self {
        self.gas_estimate = gas;
        self
    }

    /// The n-th submitted transaction (0-based) gets a failed receipt
    pub(crate) fn with_failed_receipt(mut self, index: usize) -> Self {
        self.failed_receipts.insert(index);
        self
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn sent_transactions(&self) -> Vec<Bytes> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }

    async fn read(&self) -> RpcResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match &self.failure {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    fn erc20_response(&self, to: Address, data: &[u8]) -> Option<Vec<u8>> {
        let selector: [u8; 4] = data.get(..4)?.try_into().ok()?;
        if selector == IERC20::decimalsCall::SELECTOR {
            self.tokens.get(&to).map(|(_, d)| IERC20::decimalsCall::abi_encode_returns(d))
        } else if selector == IERC20::symbolCall::SELECTOR {
            self.tokens
                .get(&to)
                .map(|(s, _)| (s.clone(),).abi_encode_params())
        } else if selector == IERC20::balanceOfCall::SELECTOR {
            let call = IERC20::balanceOfCall::abi_decode(data).ok()?;
            let amount = self
                .balances
                .get(&(to, call.owner))
                .copied()
                .unwrap_or_default();
            Some((amount,).abi_encode_params())
        } else if selector == IERC20::allowanceCall::SELECTOR {
            let call = IERC20::allowanceCall::abi_decode(data).ok()?;
            let amount = self
                .allowances
                .get(&(to, call.owner, call.spender))
                .copied()
                .unwrap_or_default();
            Some((amount,).abi_encode_params())
        } else if selector == IERC20::totalSupplyCall::SELECTOR {
            self.supplies.get(&to).map(|s| (*s,).abi_encode_params())
        } else {
            None
        }
    }
}

#[async_trait]
impl ChainClient for MockChainClient {
    fn chain(&self) -> Chain {
        self.chain
    }

    async fn native_balance(&self, owner: Address) -> RpcResult<U256> {
        self.read().await?;
        if let Some(err) = &self.native_failure {
            return Err(err.clone());
        }
        Ok(self.native.get(&owner).copied().unwrap_or_default())
    }

    async fn call(&self, to: Address, data: Bytes) -> RpcResult<Bytes> {
        self.read().await?;
        if let Some(canned) = self.exact_responses.get(&(to, data.clone())) {
            return Ok(canned.clone());
        }
        if let Some(selector) = data.get(..4).and_then(|s| <[u8; 4]>::try_from(s).ok()) {
            if let Some(canned) = self.responses.get(&(to, selector)) {
                return Ok(canned.clone());
            }
        }
        Ok(self.erc20_response(to, &data).map(Bytes::from).unwrap_or_default())
    }

    async fn estimate_gas(&self, _tx: &TransactionRequest) -> RpcResult<u64> {
        self.read().await?;
        self.gas_estimate
            .ok_or_else(|| RpcError::Reverted("execution reverted".to_string()))
    }

    async fn gas_price(&self) -> RpcResult<u128> {
        self.read().await?;
        Ok(self.gas_price)
    }

    async fn transaction_count(&self, _owner: Address) -> RpcResult<u64> {
        self.read().await?;
        Ok(self.nonce.load(Ordering::SeqCst))
    }

    async fn send_raw_transaction(&self, raw: Bytes) -> RpcResult<B256> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let hash = keccak256(&raw);
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(raw);
        }
        self.nonce.fetch_add(1, Ordering::SeqCst);
        Ok(hash)
    }

    async fn wait_for_receipt(&self, tx_hash: B256, _timeout: Duration) -> RpcResult<Receipt> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let sent = self.sent_transactions();
        let index = sent
            .iter()
            .position(|raw| keccak256(raw) == tx_hash)
            .ok_or(RpcError::Timeout)?;
        Ok(Receipt {
            tx_hash,
            success: !self.failed_receipts.contains(&index),
            gas_used: 60_000,
            block_number: Some(100 + index as u64),
        })
    }

    async fn block_number(&self) -> RpcResult<u64> {
        self.read().await?;
        Ok(19_000_000)
    }
}
