//! JSON-RPC chain client backed by an alloy provider

use alloy::network::TransactionBuilder;
use alloy::primitives::{Address, Bytes, U256};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::rpc::types::TransactionRequest;
use alloy::sol_types::decode_revert_reason;
use alloy::transports::{RpcError, TransportErrorKind};
use async_trait::async_trait;
use url::Url;

use super::{parse_revert_reason, ChainClient, ChainError, Confirmation};
use crate::wallet::SecureWallet;

/// Chain client that signs with a local key and talks HTTP JSON-RPC
pub struct RpcChainClient {
    provider: DynProvider,
    account: Address,
    confirmations: u64,
}

impl RpcChainClient {
    /// Connect to `rpc_url`, signing writes with `wallet`
    ///
    /// Writes wait for `confirmations` blocks before they are reported.
    pub fn connect(rpc_url: Url, wallet: &SecureWallet, confirmations: u64) -> Self {
        let provider = ProviderBuilder::new()
            .wallet(wallet.wallet().clone())
            .connect_http(rpc_url)
            .erased();

        Self {
            provider,
            account: wallet.address(),
            confirmations,
        }
    }
}

/// Separate contract reverts from transport and node failures
///
/// Only a JSON-RPC error response can be a revert. The reason is decoded
/// from the revert data when the node returns it; some nodes omit the data
/// and only say so in the message.
fn classify_call_error(to: Address, error: RpcError<TransportErrorKind>) -> ChainError {
    let Some(payload) = error.as_error_resp() else {
        return ChainError::Call {
            to,
            reason: error.to_string(),
        };
    };

    if let Some(data) = payload.as_revert_data() {
        let reason =
            decode_revert_reason(&data).unwrap_or_else(|| parse_revert_reason(&payload.message));
        return ChainError::CallReverted { to, reason };
    }

    if payload.message.contains("execution reverted") {
        return ChainError::CallReverted {
            to,
            reason: parse_revert_reason(&payload.message),
        };
    }

    ChainError::Call {
        to,
        reason: error.to_string(),
    }
}

#[async_trait]
impl ChainClient for RpcChainClient {
    fn account(&self) -> Address {
        self.account
    }

    async fn native_balance(&self, account: Address) -> Result<U256, ChainError> {
        self.provider
            .get_balance(account)
            .await
            .map_err(|e| ChainError::Call {
                to: account,
                reason: e.to_string(),
            })
    }

    async fn call(&self, to: Address, input: Bytes, value: U256) -> Result<Bytes, ChainError> {
        let tx = TransactionRequest::default()
            .with_from(self.account)
            .with_to(to)
            .with_input(input)
            .with_value(value);

        self.provider
            .call(tx)
            .await
            .map_err(|e| classify_call_error(to, e))
    }

    async fn write(
        &self,
        to: Address,
        input: Bytes,
        value: U256,
    ) -> Result<Confirmation, ChainError> {
        let tx = TransactionRequest::default()
            .with_from(self.account)
            .with_to(to)
            .with_input(input)
            .with_value(value);

        let pending = self
            .provider
            .send_transaction(tx)
            .await
            .map_err(|e| ChainError::NotSubmitted {
                to,
                reason: parse_revert_reason(&e.to_string()),
            })?;

        let tx_hash = *pending.tx_hash();
        tracing::debug!(%tx_hash, %to, "Transaction submitted, awaiting confirmation");

        let receipt = pending
            .with_required_confirmations(self.confirmations)
            .get_receipt()
            .await
            .map_err(|e| ChainError::Unconfirmed {
                tx_hash,
                reason: e.to_string(),
            })?;

        if !receipt.status() {
            return Err(ChainError::Reverted { tx_hash });
        }

        Ok(Confirmation {
            tx_hash,
            block_number: receipt.block_number,
        })
    }
}
