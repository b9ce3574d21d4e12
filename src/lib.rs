//! Paloma DEX agent
//!
//! A tool server that lets an AI agent read balances and prices and trade on
//! the Paloma DEX across seven EVM chains:
//! - Multi-chain balance queries with per-chain timeouts
//! - Constant-product quotes against live pool reserves
//! - Buy/sell of ETF basket tokens and PUSD through the Paloma connectors
//! - Router swaps and liquidity provision
//!
//! # Safety Model
//!
//! - Every trade passes the spread guard before anything is written on-chain
//! - Trades run as explicit plans (approvals first, then the operation) and
//!   default to simulation
//! - The private key never leaves the wallet module
//! - Every plan and tool call is appended to an audit log

pub mod audit;
pub mod balances;
pub mod chains;
pub mod config;
pub mod context;
pub mod orchestrator;
pub mod pricing;
pub mod rpc;
pub mod server;
pub mod tokens;
pub mod tools;
pub mod trading;
pub mod validator;
pub mod wallet;

mod error;

// Re-export commonly used types
pub use chains::{Chain, ChainDescriptor, ChainRegistry, ContractRole};
pub use config::{Config, ContractsConfig, ExecutionMode, RpcConfig, PRIVATE_KEY_ENV};
pub use context::AppContext;
pub use error::{Error, ErrorInfo, LiquidityError, Result};
pub use server::ToolServer;
pub use tools::ToolRegistry;
