//! Agent runner
//!
//! Owns the chain client and configuration, resolves the configured markets,
//! bootstraps them, and dispatches position commands.

use std::sync::Arc;

use alloy::primitives::{Address, U256};
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::bootstrap::{self, ReadyReport};
use crate::chain::ChainClient;
use crate::config::Config;
use crate::markets::{MarketDescriptor, MarketRecord, MarketRegistry, ResolvedMarkets};
use crate::math::format_units;
use crate::positions::{BorrowOutcome, Positions};
use crate::{Error, Result};

/// A single request against the configured markets
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Resolve and print the verified markets
    Markets,
    /// Enter every market and approve every underlying
    Bootstrap,
    /// Show the account's position in one market
    Status { market: String },
    Deposit { market: String, amount: U256 },
    Withdraw { market: String },
    BorrowSafe { market: String },
    Repay { market: String },
    /// Deposit, borrow safely, repay and withdraw in sequence
    Cycle { market: String, amount: U256 },
}

/// Runner that manages the market lifecycle
pub struct LendingRunner {
    client: Arc<dyn ChainClient>,
    comptroller: Address,
    registry: MarketRegistry,
    descriptors: Vec<MarketDescriptor>,
}

impl LendingRunner {
    /// Create a runner from the loaded configuration
    pub fn new(config: &Config, client: Arc<dyn ChainClient>) -> Self {
        Self {
            client,
            comptroller: config.comptroller,
            registry: MarketRegistry::new(config.native_symbol.clone()),
            descriptors: config.markets.clone(),
        }
    }

    fn positions(&self) -> Positions<'_> {
        Positions::new(self.client.as_ref(), self.comptroller)
    }

    /// Resolve every configured market
    pub async fn resolve(&self) -> Result<ResolvedMarkets> {
        let resolved = self
            .registry
            .resolve(self.client.as_ref(), &self.descriptors)
            .await;

        if resolved.records.is_empty() {
            resolved.into_records()?;
            return Err(Error::Config("no markets configured".to_string()));
        }
        if !resolved.rejected.is_empty() {
            warn!(
                resolved = resolved.records.len(),
                rejected = resolved.rejected.len(),
                "Some markets were rejected"
            );
        }
        Ok(resolved)
    }

    /// Bootstrap every resolved market, one at a time
    pub async fn bootstrap(&self, records: &[MarketRecord]) -> Result<Vec<ReadyReport>> {
        let mut reports = Vec::with_capacity(records.len());
        for record in records {
            let report =
                bootstrap::ensure_ready(self.client.as_ref(), self.comptroller, record).await?;
            reports.push(report);
        }
        info!(
            markets = reports.len(),
            writes = reports.iter().map(ReadyReport::writes).sum::<usize>(),
            "Markets ready"
        );
        Ok(reports)
    }

    /// Execute a command and return its result as JSON
    pub async fn run(&self, command: Command) -> Result<Value> {
        info!(?command, account = %self.client.account(), "Running command");

        let resolved = self.resolve().await?;
        let positions = self.positions();

        match command {
            Command::Markets => Ok(json!({
                "records": resolved.records,
                "rejected": resolved
                    .rejected
                    .iter()
                    .map(|(descriptor, e)| json!({
                        "descriptor": descriptor,
                        "error": e.to_string(),
                    }))
                    .collect::<Vec<_>>(),
            })),
            Command::Bootstrap => {
                let reports = self.bootstrap(&resolved.records).await?;
                Ok(json!(reports))
            }
            Command::Status { market } => {
                let record = lookup(&resolved, &market)?;
                self.status(&positions, record).await
            }
            Command::Deposit { market, amount } => {
                let record = self.ready(&resolved, &market).await?;
                Ok(json!(positions.deposit(record, amount).await?))
            }
            Command::Withdraw { market } => {
                let record = self.ready(&resolved, &market).await?;
                Ok(json!(positions.withdraw(record).await?))
            }
            Command::BorrowSafe { market } => {
                let record = self.ready(&resolved, &market).await?;
                Ok(json!(positions.borrow_safe(record).await?))
            }
            Command::Repay { market } => {
                let record = self.ready(&resolved, &market).await?;
                Ok(json!(positions.repay(record).await?))
            }
            Command::Cycle { market, amount } => {
                let record = self.ready(&resolved, &market).await?;
                self.cycle(&positions, record, amount).await
            }
        }
    }

    /// Bootstrap every market, then pick the one a command targets
    async fn ready<'r>(
        &self,
        resolved: &'r ResolvedMarkets,
        symbol: &str,
    ) -> Result<&'r MarketRecord> {
        let record = lookup(resolved, symbol)?;
        self.bootstrap(&resolved.records).await?;
        Ok(record)
    }

    async fn status(&self, positions: &Positions<'_>, record: &MarketRecord) -> Result<Value> {
        let snapshot = positions.snapshot(record).await?;
        let risk = positions.risk_params(record).await?;

        Ok(json!({
            "market": record,
            "snapshot": snapshot,
            "risk": risk,
            "token_balance_formatted": format_units(snapshot.token_balance, record.decimals),
        }))
    }

    /// Deposit, borrow up to the safe cap, repay, then withdraw everything
    async fn cycle(
        &self,
        positions: &Positions<'_>,
        record: &MarketRecord,
        amount: U256,
    ) -> Result<Value> {
        let deposit = positions.deposit(record, amount).await?;
        let borrow = positions.borrow_safe(record).await?;

        let repay = match positions.repay(record).await {
            Ok(confirmation) => Some(confirmation),
            // Nothing was borrowed and there was no earlier debt
            Err(Error::NoDebt { .. }) if matches!(borrow, BorrowOutcome::NotNeeded { .. }) => None,
            Err(e) => return Err(e),
        };

        let withdraw = positions.withdraw(record).await?;

        Ok(json!({
            "deposit": deposit,
            "borrow": borrow,
            "repay": repay,
            "withdraw": withdraw,
        }))
    }
}

/// Find a verified record, explaining why a configured market is missing
fn lookup<'r>(resolved: &'r ResolvedMarkets, symbol: &str) -> Result<&'r MarketRecord> {
    if let Some(record) = resolved.find(symbol) {
        return Ok(record);
    }

    match resolved.rejected.iter().find(|(d, _)| d.symbol == symbol) {
        Some((_, e)) => Err(Error::UnknownMarket(format!("{} was rejected: {}", symbol, e))),
        None => Err(Error::UnknownMarket(symbol.to_string())),
    }
}
