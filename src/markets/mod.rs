//! Market registry
//!
//! Turns configured market descriptors into verified [`MarketRecord`]s. A
//! descriptor only becomes a record after the contract at its address has
//! answered the vToken probe and reported the symbol the descriptor expects.

pub mod known;

use alloy::primitives::Address;
use futures::future::OptionFuture;
use serde::{Deserialize, Serialize};

use crate::chain::{ChainClient, ChainError};
use crate::contracts::{self, IVToken};
use crate::{Error, Result};

/// A market as listed in the configuration file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketDescriptor {
    pub address: Address,
    /// Symbol the contract is expected to report, e.g. "vBNB"
    pub symbol: String,
}

/// What a market accepts as deposits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MarketKind {
    /// Wraps the chain's native currency; value is attached to calls
    Native,
    /// Wraps an ERC-20 asset that must be approved before use
    Asset { underlying: Address },
}

/// A verified market
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MarketRecord {
    pub address: Address,
    pub symbol: String,
    pub name: String,
    pub decimals: u8,
    pub kind: MarketKind,
}

impl MarketRecord {
    pub fn is_native(&self) -> bool {
        matches!(self.kind, MarketKind::Native)
    }

    /// Underlying ERC-20, `None` for the native market
    pub fn underlying(&self) -> Option<Address> {
        match self.kind {
            MarketKind::Native => None,
            MarketKind::Asset { underlying } => Some(underlying),
        }
    }
}

/// Outcome of resolving a batch of descriptors
#[derive(Debug, Default)]
pub struct ResolvedMarkets {
    pub records: Vec<MarketRecord>,
    pub rejected: Vec<(MarketDescriptor, Error)>,
}

impl ResolvedMarkets {
    /// Look up a verified record by symbol
    pub fn find(&self, symbol: &str) -> Option<&MarketRecord> {
        self.records.iter().find(|r| r.symbol == symbol)
    }

    /// All records, or the first rejection if any descriptor failed
    pub fn into_records(self) -> Result<Vec<MarketRecord>> {
        match self.rejected.into_iter().next() {
            Some((_, err)) => Err(err),
            None => Ok(self.records),
        }
    }
}

/// Resolves descriptors against the chain
pub struct MarketRegistry {
    /// Symbol that marks the native-currency market
    native_symbol: String,
}

impl MarketRegistry {
    pub fn new(native_symbol: impl Into<String>) -> Self {
        Self {
            native_symbol: native_symbol.into(),
        }
    }

    /// Resolve every descriptor, collecting failures instead of stopping
    pub async fn resolve(
        &self,
        client: &dyn ChainClient,
        descriptors: &[MarketDescriptor],
    ) -> ResolvedMarkets {
        let mut resolved = ResolvedMarkets::default();

        for descriptor in descriptors {
            match self.resolve_one(client, descriptor).await {
                Ok(record) => {
                    tracing::info!(
                        market = %record.symbol,
                        address = %record.address,
                        decimals = record.decimals,
                        native = record.is_native(),
                        "Resolved market"
                    );
                    resolved.records.push(record);
                }
                Err(e) => {
                    tracing::warn!(
                        market = %descriptor.symbol,
                        address = %descriptor.address,
                        error = %e,
                        "Rejected market"
                    );
                    resolved.rejected.push((descriptor.clone(), e));
                }
            }
        }

        resolved
    }

    /// Resolve a single descriptor into a verified record
    pub async fn resolve_one(
        &self,
        client: &dyn ChainClient,
        descriptor: &MarketDescriptor,
    ) -> Result<MarketRecord> {
        let address = descriptor.address;
        let not_a_market = |reason: String| Error::NotAMarket { address, reason };

        match contracts::read(client, address, IVToken::isVTokenCall {}).await {
            Ok(true) => {}
            Ok(false) => return Err(not_a_market("isVToken() returned false".to_string())),
            Err(e @ (ChainError::CallReverted { .. } | ChainError::Decode { .. })) => {
                return Err(not_a_market(e.to_string()))
            }
            Err(e) => return Err(e.into()),
        }

        let native = descriptor.symbol == self.native_symbol;
        let underlying: OptionFuture<_> = (!native)
            .then(|| contracts::read(client, address, IVToken::underlyingCall {}))
            .into();

        let (decimals, symbol, name, underlying) = futures::try_join!(
            contracts::read(client, address, IVToken::decimalsCall {}),
            contracts::read(client, address, IVToken::symbolCall {}),
            contracts::read(client, address, IVToken::nameCall {}),
            async { underlying.await.transpose() },
        )?;

        if symbol != descriptor.symbol {
            return Err(not_a_market(format!(
                "expected symbol {}, contract reports {}",
                descriptor.symbol, symbol
            )));
        }

        let kind = match underlying {
            None => MarketKind::Native,
            Some(underlying) => MarketKind::Asset { underlying },
        };

        Ok(MarketRecord {
            address,
            symbol,
            name,
            decimals,
            kind,
        })
    }
}
