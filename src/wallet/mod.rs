//! Secure wallet management
//!
//! This module handles private key storage and transaction signing.
//! The private key never leaves this module.

mod signer;

pub use signer::SecureWallet;

#[cfg(test)]
pub(crate) use signer::tests::TEST_KEY;
