//! Configuration for the Paloma DEX agent

pub mod rpc;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub use rpc::{wrapped_native, ContractsConfig, RpcConfig};

/// Environment variable holding the hex-encoded signing key
pub const PRIVATE_KEY_ENV: &str = "PRIVATE_KEY";

/// Whether a trade plan is submitted on-chain or only prepared
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// Build, estimate and check every step; stop before signing
    #[default]
    Simulate,
    /// Sign, submit and wait for every step
    Execute,
}

/// Amount granted when an allowance has to be (re)set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalPolicy {
    /// Approve exactly the amount the trade needs
    #[default]
    Exact,
    /// Approve `uint256::MAX`
    Unlimited,
}

/// Risk management configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskConfig {
    /// Largest share of pool liquidity one trade may consume, in basis points
    pub max_spread_bps: u32,
    /// Maximum slippage tolerance a request may ask for (e.g., 5.0 for 5%)
    pub max_slippage_percent: f64,
    /// Slippage used when a request does not specify one
    pub default_slippage_percent: f64,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            max_spread_bps: 4_000,
            max_slippage_percent: 5.0,
            default_slippage_percent: 2.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeoutConfig {
    /// Budget for one chain's balance queries
    pub per_chain_query_ms: u64,
    /// How long to wait for a transaction receipt
    pub receipt_timeout_secs: u64,
    /// Timeout for index API requests
    pub http_timeout_secs: u64,
}

impl TimeoutConfig {
    pub fn per_chain_query(&self) -> Duration {
        Duration::from_millis(self.per_chain_query_ms)
    }

    pub fn receipt_timeout(&self) -> Duration {
        Duration::from_secs(self.receipt_timeout_secs)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            per_chain_query_ms: 5_000,
            receipt_timeout_secs: 300,
            http_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradingConfig {
    /// Mode used when a request does not choose one
    #[serde(default)]
    pub default_mode: ExecutionMode,
    #[serde(default)]
    pub approval: ApprovalPolicy,
    /// Seconds from now until connector/router deadlines expire
    pub deadline_secs: u64,
    /// Pool fee used for constant-product quotes, in basis points
    pub swap_fee_bps: u32,
    /// Fee tier encoded into connector swap paths
    pub path_fee_tier: u32,
}

impl Default for TradingConfig {
    fn default() -> Self {
        Self {
            default_mode: ExecutionMode::Simulate,
            approval: ApprovalPolicy::Exact,
            deadline_secs: 1_200,
            swap_fee_bps: 30,
            path_fee_tier: 3_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingApiConfig {
    pub base_url: String,
}

impl Default for PricingApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.palomadex.com/etfapi/v1".to_string(),
        }
    }
}

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub risk: RiskConfig,
    #[serde(default)]
    pub timeouts: TimeoutConfig,
    #[serde(default)]
    pub trading: TradingConfig,
    #[serde(default)]
    pub pricing_api: PricingApiConfig,
    /// Path to the trade audit log (JSONL); `null` disables it
    pub audit_log_path: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            risk: RiskConfig::default(),
            timeouts: TimeoutConfig::default(),
            trading: TradingConfig::default(),
            pricing_api: PricingApiConfig::default(),
            audit_log_path: Some("audit.jsonl".to_string()),
        }
    }
}

impl Config {
    /// Load configuration from a JSON file
    pub fn from_file(path: &std::path::Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            crate::Error::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        serde_json::from_str(&content)
            .map_err(|e| crate::Error::Config(format!("failed to parse {}: {}", path.display(), e)))
    }
}
