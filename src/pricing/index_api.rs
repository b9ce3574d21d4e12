//! Paloma DEX index/pricing REST client

use crate::chains::Chain;
use crate::{Error, Result};
use alloy::primitives::Address;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

/// How a price is looked up
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PriceKey {
    Address { chain: Chain, address: Address },
    Symbol(String),
    /// Composite `<chain>/<address>/<symbol>` denomination
    Denom {
        chain: Chain,
        address: Address,
        symbol: String,
    },
}

impl PriceKey {
    fn query(&self) -> Vec<(&'static str, String)> {
        match self {
            PriceKey::Address { chain, address } => vec![
                ("chain_id", chain.api_name().to_string()),
                ("token_evm_address", address.to_string()),
            ],
            PriceKey::Symbol(symbol) => vec![("symbol", symbol.clone())],
            PriceKey::Denom { .. } => vec![("denom", self.to_string())],
        }
    }
}

impl std::fmt::Display for PriceKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PriceKey::Address { chain, address } => write!(f, "{}:{}", chain.api_name(), address),
            PriceKey::Symbol(symbol) => f.write_str(symbol),
            PriceKey::Denom {
                chain,
                address,
                symbol,
            } => write!(f, "{}/{}/{}", chain.api_name(), address, symbol),
        }
    }
}

/// Buy/sell quote from the index service
#[derive(Debug, Clone, Serialize)]
pub struct IndexPrice {
    pub buy_price: Option<Value>,
    pub sell_price: Option<Value>,
    /// Full response body
    pub raw: Value,
}

impl IndexPrice {
    fn from_body(raw: Value) -> Self {
        Self {
            buy_price: raw.get("buy_price").cloned(),
            sell_price: raw.get("sell_price").cloned(),
            raw,
        }
    }
}

#[derive(Debug, Clone)]
pub struct IndexApiClient {
    client: Client,
    base_url: String,
}

impl IndexApiClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// ETF tokens listed on a chain
    pub async fn etf_tokens(&self, chain: Chain) -> Result<Value> {
        self.get("ETF tokens", "etf", &[("chain_id", chain.api_name().to_string())])
            .await
    }

    pub async fn price(&self, key: &PriceKey) -> Result<IndexPrice> {
        let body = self.get("ETF price", "customindexprice", &key.query()).await?;
        Ok(IndexPrice::from_body(body))
    }

    async fn get(&self, what: &str, path: &str, query: &[(&str, String)]) -> Result<Value> {
        let url = self.endpoint(path);
        tracing::debug!(url = %url, ?query, "Index API request");

        let response = self.client.get(&url).query(query).send().await?;
        let status = response.status();
        if !status.is_success() {
            tracing::warn!(url = %url, status = status.as_u16(), "Index API request failed");
            return Err(Error::Api {
                what: what.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response.json().await?)
    }
}
