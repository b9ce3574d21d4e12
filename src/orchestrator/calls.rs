//! On-chain calls a plan can contain

use crate::rpc::abi::{IERC20, IEtfConnector, IPoolRouter, IPusdConnector};
use alloy::primitives::{Address, Bytes, U256};
use alloy::sol_types::{SolCall, SolValue};

/// Encode a single-hop connector path: `abi.encode(from, fee_tier, to)`
pub fn encode_connector_path(from: Address, fee_tier: u32, to: Address) -> Bytes {
    (from, U256::from(fee_tier), to).abi_encode_params().into()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwapKind {
    TokensForTokens,
    NativeForTokens,
    TokensForNative,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TradeCall {
    Approve {
        token: Address,
        spender: Address,
        amount: U256,
    },
    PurchaseStable {
        connector: Address,
        path: Bytes,
        amount: U256,
        min_amount: U256,
        /// Input amount forwarded as value when paying with the native asset
        native_in: U256,
    },
    WithdrawStable {
        connector: Address,
        amount: U256,
    },
    BuyBasket {
        connector: Address,
        etf_token: Address,
        etf_amount: U256,
        usd_amount: U256,
        recipient: Address,
        path: Bytes,
        deadline: U256,
        native_in: U256,
    },
    SellBasket {
        connector: Address,
        etf_token: Address,
        etf_amount: U256,
        deadline: U256,
        recipient: Address,
    },
    Swap {
        router: Address,
        kind: SwapKind,
        amount_in: U256,
        amount_out_min: U256,
        path: Vec<Address>,
        recipient: Address,
        deadline: U256,
    },
    AddLiquidity {
        router: Address,
        token_a: Address,
        token_b: Address,
        amount_a: U256,
        amount_b: U256,
        min_a: U256,
        min_b: U256,
        recipient: Address,
        deadline: U256,
    },
    RemoveLiquidity {
        router: Address,
        token_a: Address,
        token_b: Address,
        liquidity: U256,
        min_a: U256,
        min_b: U256,
        recipient: Address,
        deadline: U256,
    },
}

impl TradeCall {
    pub fn operation(&self) -> &'static str {
        match self {
            TradeCall::Approve { .. } => "approve",
            TradeCall::PurchaseStable { .. } => "purchase_stable",
            TradeCall::WithdrawStable { .. } => "withdraw_stable",
            TradeCall::BuyBasket { .. } => "buy_basket",
            TradeCall::SellBasket { .. } => "sell_basket",
            TradeCall::Swap { .. } => "swap",
            TradeCall::AddLiquidity { .. } => "add_liquidity",
            TradeCall::RemoveLiquidity { .. } => "remove_liquidity",
        }
    }

    /// Contract the transaction is sent to
    pub fn target(&self) -> Address {
        match self {
            TradeCall::Approve { token, .. } => *token,
            TradeCall::PurchaseStable { connector, .. }
            | TradeCall::WithdrawStable { connector, .. }
            | TradeCall::BuyBasket { connector, .. }
            | TradeCall::SellBasket { connector, .. } => *connector,
            TradeCall::Swap { router, .. }
            | TradeCall::AddLiquidity { router, .. }
            | TradeCall::RemoveLiquidity { router, .. } => *router,
        }
    }

    /// Native value carried by the call itself, excluding connector fees
    pub fn value(&self) -> U256 {
        match self {
            TradeCall::PurchaseStable { native_in, .. } | TradeCall::BuyBasket { native_in, .. } => {
                *native_in
            }
            TradeCall::Swap {
                kind: SwapKind::NativeForTokens,
                amount_in,
                ..
            } => *amount_in,
            _ => U256::ZERO,
        }
    }

    /// Gas limit used when estimation fails
    pub fn fallback_gas(&self) -> u64 {
        match self {
            TradeCall::Approve { .. } => 100_000,
            TradeCall::PurchaseStable { .. } => 500_000,
            TradeCall::WithdrawStable { .. } => 300_000,
            TradeCall::BuyBasket { .. } => 600_000,
            TradeCall::SellBasket { .. } => 400_000,
            TradeCall::Swap { .. } => 300_000,
            TradeCall::AddLiquidity { .. } => 400_000,
            TradeCall::RemoveLiquidity { .. } => 350_000,
        }
    }

    /// Calldata reading the connector's native gas fee, for connector calls
    pub fn gas_fee_query(&self) -> Option<(Address, Bytes)> {
        match self {
            TradeCall::PurchaseStable { connector, .. } | TradeCall::WithdrawStable { connector, .. } => {
                Some((*connector, IPusdConnector::gas_feeCall {}.abi_encode().into()))
            }
            TradeCall::BuyBasket { connector, .. } | TradeCall::SellBasket { connector, .. } => {
                Some((*connector, IEtfConnector::gas_feeCall {}.abi_encode().into()))
            }
            _ => None,
        }
    }

    pub fn calldata(&self) -> Bytes {
        let data = match self.clone() {
            TradeCall::Approve { spender, amount, .. } => IERC20::approveCall { spender, amount }.abi_encode(),
            TradeCall::PurchaseStable {
                path,
                amount,
                min_amount,
                ..
            } => IPusdConnector::purchaseCall {
                path,
                amount,
                min_amount,
            }
            .abi_encode(),
            TradeCall::WithdrawStable { amount, .. } => IPusdConnector::withdrawCall { amount }.abi_encode(),
            TradeCall::BuyBasket {
                etf_token,
                etf_amount,
                usd_amount,
                recipient,
                path,
                deadline,
                ..
            } => IEtfConnector::buyCall {
                etf_token,
                etf_amount,
                usd_amount,
                recipient,
                path,
                deadline,
            }
            .abi_encode(),
            TradeCall::SellBasket {
                etf_token,
                etf_amount,
                deadline,
                recipient,
                ..
            } => IEtfConnector::sellCall {
                etf_token,
                etf_amount,
                deadline,
                recipient,
            }
            .abi_encode(),
            TradeCall::Swap {
                kind,
                amount_in,
                amount_out_min,
                path,
                recipient,
                deadline,
                ..
            } => match kind {
                SwapKind::TokensForTokens => IPoolRouter::swapExactTokensForTokensCall {
                    amountIn: amount_in,
                    amountOutMin: amount_out_min,
                    path,
                    to: recipient,
                    deadline,
                }
                .abi_encode(),
                SwapKind::NativeForTokens => IPoolRouter::swapExactETHForTokensCall {
                    amountOutMin: amount_out_min,
                    path,
                    to: recipient,
                    deadline,
                }
                .abi_encode(),
                SwapKind::TokensForNative => IPoolRouter::swapExactTokensForETHCall {
                    amountIn: amount_in,
                    amountOutMin: amount_out_min,
                    path,
                    to: recipient,
                    deadline,
                }
                .abi_encode(),
            },
            TradeCall::AddLiquidity {
                token_a,
                token_b,
                amount_a,
                amount_b,
                min_a,
                min_b,
                recipient,
                deadline,
                ..
            } => IPoolRouter::addLiquidityCall {
                tokenA: token_a,
                tokenB: token_b,
                amountADesired: amount_a,
                amountBDesired: amount_b,
                amountAMin: min_a,
                amountBMin: min_b,
                to: recipient,
                deadline,
            }
            .abi_encode(),
            TradeCall::RemoveLiquidity {
                token_a,
                token_b,
                liquidity,
                min_a,
                min_b,
                recipient,
                deadline,
                ..
            } => IPoolRouter::removeLiquidityCall {
                tokenA: token_a,
                tokenB: token_b,
                liquidity,
                amountAMin: min_a,
                amountBMin: min_b,
                to: recipient,
                deadline,
            }
            .abi_encode(),
        };
        data.into()
    }
}
