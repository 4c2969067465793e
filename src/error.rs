//! Error types for the lending agent

use alloy::primitives::{Address, B256, U256};
use thiserror::Error;

use crate::chain::ChainError;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Wallet error: {0}")]
    Wallet(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("{address} is not a market contract: {reason}")]
    NotAMarket { address: Address, reason: String },

    #[error("Unknown market: {0}")]
    UnknownMarket(String),

    #[error("Insufficient funds for {market}: requested {requested}, available {available}")]
    InsufficientFunds {
        market: String,
        requested: U256,
        available: U256,
    },

    #[error("No {market} balance to redeem")]
    NoBalance { market: String },

    #[error("No outstanding {market} debt to repay")]
    NoDebt { market: String },

    #[error("Account is still not a member of {market} after entering it")]
    MarketNotEntered { market: String },

    #[error("Market {market} is not listed in the comptroller")]
    MarketNotListed { market: String },

    #[error("Account snapshot for {market} returned error code {code}")]
    SnapshotFailed { market: String, code: U256 },

    #[error("Arithmetic overflow: {0}")]
    ArithmeticOverflow(String),

    #[error(transparent)]
    Chain(#[from] ChainError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether a transaction may have reached the chain before this error.
    ///
    /// Only chain errors raised after submission return true; every
    /// pre-check error is raised before any write is attempted.
    pub fn write_submitted(&self) -> bool {
        match self {
            Error::Chain(e) => e.submitted(),
            _ => false,
        }
    }

    /// Hash of a transaction that was submitted before this error
    pub fn pending_tx_hash(&self) -> Option<B256> {
        match self {
            Error::Chain(e) => e.tx_hash(),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
