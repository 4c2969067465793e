//! Configuration for the lending agent
//!
//! Loaded once at startup from a JSON file. Every problem found here is
//! fatal: the agent never starts with a partially valid configuration.

pub mod rpc;

use std::collections::HashSet;
use std::path::Path;

use alloy::primitives::Address;
use secrecy::SecretString;
use serde::Deserialize;
use serde_json::json;

use crate::markets::{known, MarketDescriptor};
use crate::{Error, Result};

// Re-export RPC config
pub use rpc::RpcConfig;

fn default_native_symbol() -> String {
    known::NATIVE_SYMBOL.to_string()
}

fn default_confirmations() -> u64 {
    1
}

/// Main configuration
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// JSON-RPC endpoint (overridden by `LENDING_RPC_URL`)
    #[serde(default)]
    pub rpc_endpoint: Option<String>,
    /// Hex private key (overridden by `PRIVATE_KEY`)
    #[serde(default)]
    signing_key: Option<SecretString>,
    /// Account that owns the positions; must match the signing key
    pub account_address: Address,
    /// Comptroller (unitroller) address
    pub comptroller: Address,
    /// Symbol of the market that wraps the native currency
    #[serde(default = "default_native_symbol")]
    pub native_symbol: String,
    /// Blocks to wait before a write counts as confirmed
    #[serde(default = "default_confirmations")]
    pub confirmations: u64,
    pub markets: Vec<MarketDescriptor>,
}

impl Config {
    /// Read, parse and validate a config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {}", path.display(), e)))?;
        Self::from_json(&content)
    }

    /// Parse and validate a config document
    pub fn from_json(content: &str) -> Result<Self> {
        let config: Config =
            serde_json::from_str(content).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.markets.is_empty() {
            return Err(Error::Config("no markets configured".to_string()));
        }

        let mut seen = HashSet::new();
        for market in &self.markets {
            if market.symbol.trim().is_empty() {
                return Err(Error::Config(format!(
                    "market {} has an empty symbol",
                    market.address
                )));
            }
            if !seen.insert(market.address) {
                return Err(Error::Config(format!(
                    "market {} is listed more than once",
                    market.address
                )));
            }
        }

        if self.native_symbol.trim().is_empty() {
            return Err(Error::Config("native_symbol must not be empty".to_string()));
        }
        if self.confirmations == 0 {
            return Err(Error::Config(
                "confirmations must be at least 1".to_string(),
            ));
        }
        if let Some(endpoint) = &self.rpc_endpoint {
            rpc::parse_url(endpoint)?;
        }

        Ok(())
    }

    /// Resolved RPC endpoint, environment first
    pub fn rpc(&self) -> Result<RpcConfig> {
        RpcConfig::from_env(self.rpc_endpoint.as_deref())
    }

    /// Resolved signing key, environment first
    pub fn signing_key(&self) -> Result<SecretString> {
        rpc::signing_key(self.signing_key.as_ref())
    }

    /// Configuration as JSON with the signing key redacted
    pub fn redacted(&self) -> serde_json::Value {
        json!({
            "rpc_endpoint": self.rpc_endpoint,
            "signing_key": self.signing_key.as_ref().map(|_| "[REDACTED]"),
            "account_address": self.account_address,
            "comptroller": self.comptroller,
            "native_symbol": self.native_symbol,
            "confirmations": self.confirmations,
            "markets": self.markets,
        })
    }

    /// Starter configuration for Venus on BNB Smart Chain mainnet
    pub fn example() -> serde_json::Value {
        json!({
            "rpc_endpoint": "https://bsc-dataseed.binance.org",
            "account_address": Address::ZERO,
            "comptroller": known::UNITROLLER,
            "native_symbol": known::NATIVE_SYMBOL,
            "confirmations": default_confirmations(),
            "markets": known::mainnet_markets(),
        })
    }
}
