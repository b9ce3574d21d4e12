//! Error types for the Paloma DEX agent

use serde::Serialize;
use thiserror::Error;

/// Reasons a trade is refused by the liquidity guard.
///
/// None of these are retryable for the same amount; a smaller trade may pass.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LiquidityError {
    #[error("trading pair not found for {input} -> {output}")]
    PairNotFound { input: String, output: String },

    #[error("pool has no liquidity")]
    NoLiquidity,

    #[error("trade amount exceeds maximum spread; max allowed input is {max_allowed}")]
    SpreadExceeded { max_allowed: alloy::primitives::U256 },
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: Unsupported chain ID '{0}'")]
    UnsupportedChain(String),

    #[error("Configuration error: {what} not configured for {chain}")]
    NotConfigured { chain: String, what: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Liquidity error: {0}")]
    Liquidity(#[from] LiquidityError),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Transaction error in step {step}: {reason}")]
    Transaction { step: String, reason: String },

    #[error("Wallet error: {0}")]
    Wallet(String),

    #[error("Failed to fetch {what}. Status: {status}")]
    Api { what: String, status: u16 },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Stable label exposed on the tool surface.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::UnsupportedChain(_)
            | Error::NotConfigured { .. }
            | Error::Config(_)
            | Error::Wallet(_) => "configuration_error",
            Error::Validation(_) | Error::Json(_) => "validation_error",
            Error::Liquidity(_) => "liquidity_error",
            Error::Network(_) | Error::Api { .. } | Error::Http(_) | Error::Io(_) => "network_error",
            Error::Transaction { .. } => "transaction_error",
        }
    }

    /// Whether the same request may succeed if issued again unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Network(_) | Error::Http(_))
            || matches!(self, Error::Api { status, .. } if *status >= 500)
    }

    pub(crate) fn not_configured(chain: impl Into<String>, what: impl Into<String>) -> Self {
        Error::NotConfigured {
            chain: chain.into(),
            what: what.into(),
        }
    }
}

impl From<crate::rpc::RpcError> for Error {
    fn from(err: crate::rpc::RpcError) -> Self {
        Error::Network(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Serializable form of an [`Error`] for tool responses
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorInfo {
    pub kind: &'static str,
    pub message: String,
    pub retryable: bool,
}

impl From<&Error> for ErrorInfo {
    fn from(err: &Error) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
            retryable: err.is_retryable(),
        }
    }
}
