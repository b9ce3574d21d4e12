//! Token references and amount conversion
//!
//! Amounts cross the tool surface as decimal strings and are converted to raw
//! integer units here, without going through floating point.

use crate::chains::Chain;
use crate::rpc::ChainClient;
use crate::{Error, Result};
use alloy::primitives::{Address, U256};
use serde::{Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Mutex;

/// Sentinel accepted in place of an address for the chain's native asset
pub const NATIVE_SENTINEL: &str = "native";

const NATIVE_DECIMALS: u8 = 18;

/// Parse a hex address, rejecting anything malformed as a validation error
pub fn parse_address(input: &str) -> Result<Address> {
    Address::from_str(input.trim())
        .map_err(|_| Error::Validation(format!("Invalid address format: {}", input.trim())))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenAddress {
    Native,
    Erc20(Address),
}

impl TokenAddress {
    pub fn parse(input: &str) -> Result<Self> {
        if input.trim().eq_ignore_ascii_case(NATIVE_SENTINEL) {
            Ok(TokenAddress::Native)
        } else {
            parse_address(input).map(TokenAddress::Erc20)
        }
    }

    pub fn is_native(&self) -> bool {
        matches!(self, TokenAddress::Native)
    }

    pub fn erc20(&self) -> Option<Address> {
        match self {
            TokenAddress::Native => None,
            TokenAddress::Erc20(addr) => Some(*addr),
        }
    }
}

impl fmt::Display for TokenAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenAddress::Native => f.write_str(NATIVE_SENTINEL),
            TokenAddress::Erc20(addr) => write!(f, "{}", addr),
        }
    }
}

impl Serialize for TokenAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Resolved token metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenRef {
    pub address: TokenAddress,
    pub symbol: String,
    pub decimals: u8,
}

impl TokenRef {
    pub fn native(chain: Chain) -> Self {
        Self {
            address: TokenAddress::Native,
            symbol: chain.native_symbol().to_string(),
            decimals: NATIVE_DECIMALS,
        }
    }
}

/// Per-request token metadata cache.
///
/// Decimals are required (every amount depends on them) so a failed read is an
/// error. The symbol is cosmetic and degrades to `UNKNOWN`.
#[derive(Debug, Default)]
pub struct TokenResolver {
    cache: Mutex<HashMap<(Chain, Address), TokenRef>>,
    warnings: Mutex<Vec<String>>,
}

impl TokenResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn resolve(&self, client: &dyn ChainClient, token: TokenAddress) -> Result<TokenRef> {
        let chain = client.chain();
        let address = match token {
            TokenAddress::Native => return Ok(TokenRef::native(chain)),
            TokenAddress::Erc20(addr) => addr,
        };

        if let Some(hit) = self.cached(chain, address) {
            return Ok(hit);
        }

        let decimals = client.token_decimals(address).await.map_err(|e| {
            Error::Network(format!("failed to read decimals of {} on {}: {}", address, chain, e))
        })?;

        let symbol = match client.token_symbol(address).await {
            Ok(symbol) => symbol,
            Err(e) => {
                tracing::warn!(chain = %chain, token = %address, error = %e, "Symbol read failed, using UNKNOWN");
                self.warn(format!("symbol of {} unreadable: {}", address, e));
                "UNKNOWN".to_string()
            }
        };

        let resolved = TokenRef {
            address: token,
            symbol,
            decimals,
        };
        if let Ok(mut cache) = self.cache.lock() {
            cache.insert((chain, address), resolved.clone());
        }
        Ok(resolved)
    }

    /// Degradations recorded while resolving
    pub fn warnings(&self) -> Vec<String> {
        self.warnings.lock().map(|w| w.clone()).unwrap_or_default()
    }

    fn cached(&self, chain: Chain, address: Address) -> Option<TokenRef> {
        self.cache.lock().ok()?.get(&(chain, address)).cloned()
    }

    fn warn(&self, message: String) {
        if let Ok(mut warnings) = self.warnings.lock() {
            warnings.push(message);
        }
    }
}

/// Convert a positive decimal string into raw units
pub fn parse_units(amount: &str, decimals: u8) -> Result<U256> {
    let amount = amount.trim();
    let invalid = || Error::Validation(format!("Invalid amount: '{}'", amount));

    let (whole, frac) = match amount.split_once('.') {
        Some((w, f)) => (w, f),
        None => (amount, ""),
    };
    if whole.is_empty() && frac.is_empty() {
        return Err(invalid());
    }
    if !whole.chars().all(|c| c.is_ascii_digit()) || !frac.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid());
    }
    if frac.len() > decimals as usize {
        return Err(Error::Validation(format!(
            "Amount '{}' has more than {} decimal places",
            amount, decimals
        )));
    }

    let scale = U256::from(10u64).pow(U256::from(decimals));
    let whole = if whole.is_empty() {
        U256::ZERO
    } else {
        U256::from_str_radix(whole, 10).map_err(|_| invalid())?
    };
    let frac = if frac.is_empty() {
        U256::ZERO
    } else {
        let padded = format!("{:0<width$}", frac, width = decimals as usize);
        U256::from_str_radix(&padded, 10).map_err(|_| invalid())?
    };

    let raw = whole
        .checked_mul(scale)
        .and_then(|w| w.checked_add(frac))
        .ok_or_else(invalid)?;
    if raw.is_zero() {
        return Err(Error::Validation("Amount must be greater than zero".to_string()));
    }
    Ok(raw)
}

/// Serialize raw amounts as base-10 strings rather than hex quantities
pub mod decimal {
    use alloy::primitives::U256;
    use serde::Serializer;

    pub fn serialize<S: Serializer>(value: &U256, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(value)
    }
}

pub mod decimal_opt {
    use alloy::primitives::U256;
    use serde::Serializer;

    pub fn serialize<S: Serializer>(value: &Option<U256>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(v) => serializer.collect_str(v),
            None => serializer.serialize_none(),
        }
    }
}

/// Format raw units as a decimal string, trimming trailing zeros
pub fn format_units(value: U256, decimals: u8) -> String {
    if value.is_zero() {
        return "0".to_string();
    }

    let divisor = U256::from(10u64).pow(U256::from(decimals));
    let whole = value / divisor;
    let remainder = value % divisor;

    if remainder.is_zero() {
        return whole.to_string();
    }

    let remainder_str = format!("{:0>width$}", remainder.to_string(), width = decimals as usize);
    let trimmed = remainder_str.trim_end_matches('0');
    format!("{}.{}", whole, trimmed)
}
