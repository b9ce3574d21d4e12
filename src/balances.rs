//! Concurrent multi-chain balance queries
//!
//! One task per chain, each bounded by its own timeout. A slow or failing
//! chain only affects its own slot; results are keyed by chain name so the
//! output does not depend on completion order.

use crate::chains::{Chain, ChainDescriptor, ContractRole};
use crate::rpc::{ChainClient, ChainClients};
use crate::tokens::{self, format_units, TokenAddress, TokenRef};
use crate::Result;
use alloy::primitives::{Address, U256};
use futures::future::join_all;
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Duration;

pub const STABLE_SYMBOL: &str = "PUSD";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "message", rename_all = "snake_case")]
pub enum QueryOutcome {
    Ok,
    Timeout,
    Error(String),
}

/// Balance of one token on one chain.
///
/// Only constructible through [`BalanceResult::ok`] and
/// [`BalanceResult::failed`], so an `Ok` outcome always carries an amount.
#[derive(Debug, Clone, Serialize)]
pub struct BalanceResult {
    chain: Chain,
    token: TokenRef,
    #[serde(with = "tokens::decimal_opt")]
    raw_amount: Option<U256>,
    display_amount: Option<String>,
    outcome: QueryOutcome,
}

impl BalanceResult {
    pub fn ok(chain: Chain, token: TokenRef, raw: U256) -> Self {
        Self {
            chain,
            display_amount: Some(format_units(raw, token.decimals)),
            token,
            raw_amount: Some(raw),
            outcome: QueryOutcome::Ok,
        }
    }

    pub fn failed(chain: Chain, token: TokenRef, outcome: QueryOutcome) -> Self {
        let outcome = match outcome {
            QueryOutcome::Ok => QueryOutcome::Error("no amount".to_string()),
            other => other,
        };
        Self {
            chain,
            token,
            raw_amount: None,
            display_amount: None,
            outcome,
        }
    }

    pub fn chain(&self) -> Chain {
        self.chain
    }

    pub fn token(&self) -> &TokenRef {
        &self.token
    }

    pub fn raw_amount(&self) -> Option<U256> {
        self.raw_amount
    }

    pub fn display_amount(&self) -> Option<&str> {
        self.display_amount.as_deref()
    }

    pub fn outcome(&self) -> &QueryOutcome {
        &self.outcome
    }
}

/// Everything read for one chain
#[derive(Debug, Clone, Serialize)]
pub struct ChainBalances {
    pub chain_id: u64,
    pub outcome: QueryOutcome,
    pub balances: Vec<BalanceResult>,
}

impl ChainBalances {
    fn failed(chain: Chain, outcome: QueryOutcome) -> Self {
        Self {
            chain_id: chain.chain_id(),
            outcome,
            balances: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AggregateBalances {
    pub address: Address,
    /// Keyed by chain display name
    pub chains: BTreeMap<String, ChainBalances>,
}

pub struct BalanceAggregator<'a> {
    clients: &'a ChainClients,
}

impl<'a> BalanceAggregator<'a> {
    pub fn new(clients: &'a ChainClients) -> Self {
        Self { clients }
    }

    /// Query native and stable-token balances of `address` on every chain.
    ///
    /// A malformed address is rejected before any network call.
    pub async fn aggregate(
        &self,
        address: &str,
        chains: &[ChainDescriptor],
        per_chain_timeout: Duration,
    ) -> Result<AggregateBalances> {
        let owner = tokens::parse_address(address)?;

        let tasks = chains.iter().map(|descriptor| async move {
            let report = match self.clients.get(descriptor.chain) {
                None => ChainBalances::failed(
                    descriptor.chain,
                    QueryOutcome::Error("client not available".to_string()),
                ),
                Some(client) => {
                    match tokio::time::timeout(
                        per_chain_timeout,
                        query_chain(client.as_ref(), descriptor, owner),
                    )
                    .await
                    {
                        Ok(report) => report,
                        Err(_) => {
                            tracing::warn!(chain = %descriptor.chain, timeout_ms = per_chain_timeout.as_millis() as u64, "Balance query timed out");
                            ChainBalances::failed(descriptor.chain, QueryOutcome::Timeout)
                        }
                    }
                }
            };
            (descriptor.name.to_string(), report)
        });

        let chains = join_all(tasks).await.into_iter().collect();
        Ok(AggregateBalances {
            address: owner,
            chains,
        })
    }
}

async fn query_chain(client: &dyn ChainClient, descriptor: &ChainDescriptor, owner: Address) -> ChainBalances {
    let chain = descriptor.chain;
    let native = async {
        match client.native_balance(owner).await {
            Ok(raw) => BalanceResult::ok(chain, TokenRef::native(chain), raw),
            Err(e) => {
                tracing::warn!(chain = %chain, error = %e, "Native balance query failed");
                BalanceResult::failed(chain, TokenRef::native(chain), QueryOutcome::Error(e.to_string()))
            }
        }
    };
    let stable = async {
        match descriptor.contract(ContractRole::StableToken) {
            Some(stable) => Some(query_stable(client, chain, stable, owner).await),
            None => None,
        }
    };
    let (native, stable) = tokio::join!(native, stable);

    let balances: Vec<BalanceResult> = std::iter::once(native).chain(stable).collect();
    // The chain only counts as failed when no token could be read
    let outcome = if balances.iter().any(|b| b.outcome == QueryOutcome::Ok) {
        QueryOutcome::Ok
    } else {
        balances[0].outcome.clone()
    };

    ChainBalances {
        chain_id: chain.chain_id(),
        outcome,
        balances,
    }
}

async fn query_stable(client: &dyn ChainClient, chain: Chain, token: Address, owner: Address) -> BalanceResult {
    let read = async {
        let raw = client.token_balance(token, owner).await?;
        let decimals = client.token_decimals(token).await?;
        Ok::<_, crate::rpc::RpcError>((raw, decimals))
    };
    match read.await {
        Ok((raw, decimals)) => BalanceResult::ok(
            chain,
            TokenRef {
                address: TokenAddress::Erc20(token),
                symbol: STABLE_SYMBOL.to_string(),
                decimals,
            },
            raw,
        ),
        Err(e) => {
            tracing::warn!(chain = %chain, token = %token, error = %e, "Stable token balance query failed");
            BalanceResult::failed(
                chain,
                TokenRef {
                    address: TokenAddress::Erc20(token),
                    symbol: STABLE_SYMBOL.to_string(),
                    decimals: 0,
                },
                QueryOutcome::Error(e.to_string()),
            )
        }
    }
}
