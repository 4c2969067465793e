//! RPC endpoint and signing key resolution
//!
//! Environment variables take precedence over the config file:
//! 1. `LENDING_RPC_URL` overrides `rpc_endpoint`
//! 2. `PRIVATE_KEY` overrides `signing_key`
//!
//! A `.env` file is loaded by the CLI before either is read.
//!
//! # Examples
//!
//! ```bash
//! export LENDING_RPC_URL="https://bsc-dataseed.binance.org"
//! export PRIVATE_KEY="0x..."
//! ```

use secrecy::{ExposeSecret, SecretString};
use url::Url;

use crate::{Error, Result};

/// Environment variable names
pub mod env_vars {
    pub const RPC_URL: &str = "LENDING_RPC_URL";
    pub const PRIVATE_KEY: &str = "PRIVATE_KEY";
}

/// Where a setting was taken from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Env,
    File,
}

/// Resolved RPC endpoint
#[derive(Debug, Clone)]
pub struct RpcConfig {
    url: Url,
    source: Source,
}

impl RpcConfig {
    /// Resolve the endpoint from `LENDING_RPC_URL`, then the config file
    pub fn from_env(configured: Option<&str>) -> Result<Self> {
        Self::resolve(std::env::var(env_vars::RPC_URL).ok(), configured)
    }

    fn resolve(env_value: Option<String>, configured: Option<&str>) -> Result<Self> {
        let (raw, source) = match (env_value, configured) {
            (Some(url), _) if !url.trim().is_empty() => {
                tracing::debug!("Using {} for the RPC endpoint", env_vars::RPC_URL);
                (url, Source::Env)
            }
            (_, Some(url)) => (url.to_string(), Source::File),
            _ => {
                return Err(Error::Config(format!(
                    "no RPC endpoint: set rpc_endpoint or {}",
                    env_vars::RPC_URL
                )))
            }
        };

        let url = parse_url(raw.trim())?;
        Ok(Self { url, source })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn source(&self) -> Source {
        self.source
    }
}

/// Parse an RPC URL, accepting only HTTP(S)
pub(crate) fn parse_url(raw: &str) -> Result<Url> {
    let url: Url = raw
        .parse()
        .map_err(|e| Error::Config(format!("invalid RPC endpoint {:?}: {}", raw, e)))?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        scheme => Err(Error::Config(format!(
            "unsupported RPC scheme {:?}, expected http or https",
            scheme
        ))),
    }
}

/// Resolve the signing key from `PRIVATE_KEY`, then the config file
pub fn signing_key(configured: Option<&SecretString>) -> Result<SecretString> {
    resolve_signing_key(std::env::var(env_vars::PRIVATE_KEY).ok(), configured)
}

fn resolve_signing_key(
    env_value: Option<String>,
    configured: Option<&SecretString>,
) -> Result<SecretString> {
    match (env_value, configured) {
        (Some(key), _) if !key.trim().is_empty() => {
            tracing::debug!("Using {} for the signing key", env_vars::PRIVATE_KEY);
            Ok(SecretString::from(key.trim().to_string()))
        }
        (_, Some(key)) => Ok(SecretString::from(key.expose_secret().to_string())),
        _ => Err(Error::Config(format!(
            "no signing key: set signing_key or {}",
            env_vars::PRIVATE_KEY
        ))),
    }
}
