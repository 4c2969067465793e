//! Chain client abstraction
//!
//! Every component talks to the chain through [`ChainClient`]. The real
//! implementation is [`RpcChainClient`]; tests substitute an in-memory chain.
//!
//! A single client is built at startup and shared as `Arc<dyn ChainClient>`.
//! Reads may run concurrently. Writes from the same account must be ordered,
//! so callers issue them one at a time.

mod revert;
mod rpc;

#[cfg(test)]
pub(crate) mod mock;

use alloy::primitives::{Address, Bytes, B256, U256};
use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

pub use revert::parse_revert_reason;
pub use rpc::RpcChainClient;

/// A write that was included on chain and did not revert
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Confirmation {
    pub tx_hash: B256,
    pub block_number: Option<u64>,
}

/// Failure of a single chain interaction
///
/// The variants distinguish failures before submission from failures after
/// it: a submitted but unconfirmed transaction may still land later.
#[derive(Debug, Error)]
pub enum ChainError {
    #[error("call to {to} failed: {reason}")]
    Call { to: Address, reason: String },

    #[error("call to {to} reverted: {reason}")]
    CallReverted { to: Address, reason: String },

    #[error("could not decode {method} response from {to}: {reason}")]
    Decode {
        to: Address,
        method: &'static str,
        reason: String,
    },

    /// Dry run of a write returned a non-zero error code
    #[error("{method} on {to} would fail with error code {code}")]
    Rejected {
        to: Address,
        method: &'static str,
        code: U256,
    },

    #[error("transaction to {to} was not submitted: {reason}")]
    NotSubmitted { to: Address, reason: String },

    #[error("transaction {tx_hash} was submitted but not confirmed: {reason}")]
    Unconfirmed { tx_hash: B256, reason: String },

    #[error("transaction {tx_hash} reverted")]
    Reverted { tx_hash: B256 },
}

impl ChainError {
    /// True when the transaction reached the mempool before the failure.
    pub fn submitted(&self) -> bool {
        matches!(
            self,
            ChainError::Unconfirmed { .. } | ChainError::Reverted { .. }
        )
    }

    /// Hash of the submitted transaction, if there was one
    pub fn tx_hash(&self) -> Option<B256> {
        match self {
            ChainError::Unconfirmed { tx_hash, .. } | ChainError::Reverted { tx_hash } => {
                Some(*tx_hash)
            }
            _ => None,
        }
    }
}

/// Read and write access to an EVM chain on behalf of one signing account
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// The account that signs every write
    fn account(&self) -> Address;

    /// Native currency balance of `account`
    async fn native_balance(&self, account: Address) -> Result<U256, ChainError>;

    /// Execute a call against the latest block without signing it
    ///
    /// `value` is attached as native currency, so a payable write can be
    /// dry-run with the same arguments it will be sent with.
    async fn call(&self, to: Address, input: Bytes, value: U256) -> Result<Bytes, ChainError>;

    /// Submit a transaction and wait until it is confirmed
    ///
    /// `value` is attached as native currency. No timeout is applied here;
    /// wrap the future in `tokio::time::timeout` when one is needed. Dropping
    /// the future after submission does not cancel the transaction.
    async fn write(&self, to: Address, input: Bytes, value: U256)
        -> Result<Confirmation, ChainError>;
}
