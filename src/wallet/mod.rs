//! Wallet management
//!
//! Private key loading and the alloy wallet used to sign writes.
//! The private key never leaves this module.

mod signer;

pub use signer::SecureWallet;
