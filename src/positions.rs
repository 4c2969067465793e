//! Position operations
//!
//! Deposit, withdraw, borrow and repay against one market. Each operation
//! reads what it needs, issues exactly one write and returns its
//! confirmation. Nothing is retried, and every pre-check fails before a
//! transaction is built. Calls that report failure as an error code are
//! dry-run first (see [`contracts::submit`]).
//!
//! Operations on the same account are not safe to run concurrently: each one
//! decides from a snapshot that another writer can invalidate before the
//! transaction lands. Serialize calls per account.

use alloy::primitives::{Address, U256};
use serde::Serialize;

use crate::chain::{ChainClient, Confirmation};
use crate::contracts::{self, IComptroller, IVBnb, IVToken, IERC20};
use crate::markets::{MarketKind, MarketRecord};
use crate::math::{self, format_units};
use crate::{Error, Result};

/// One account's position in one market, as of the latest block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AccountSnapshot {
    pub error: U256,
    /// Market token balance
    pub token_balance: U256,
    /// Outstanding debt in underlying units, interest included
    pub borrow_balance: U256,
    pub exchange_rate_mantissa: U256,
}

/// Comptroller risk parameters for one market
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MarketRiskParams {
    pub is_listed: bool,
    pub collateral_factor_mantissa: U256,
}

/// Result of [`Positions::borrow_safe`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum BorrowOutcome {
    Borrowed {
        amount: U256,
        confirmation: Confirmation,
    },
    /// Existing debt already meets or exceeds the safe cap; nothing was sent
    NotNeeded { cap: U256, debt: U256 },
}

/// Position operations for the client's account
pub struct Positions<'a> {
    client: &'a dyn ChainClient,
    comptroller: Address,
}

impl<'a> Positions<'a> {
    pub fn new(client: &'a dyn ChainClient, comptroller: Address) -> Self {
        Self {
            client,
            comptroller,
        }
    }

    fn account(&self) -> Address {
        self.client.account()
    }

    /// Fresh account snapshot for `record`
    pub async fn snapshot(&self, record: &MarketRecord) -> Result<AccountSnapshot> {
        let snapshot = contracts::read(
            self.client,
            record.address,
            IVToken::getAccountSnapshotCall {
                account: self.account(),
            },
        )
        .await?;

        if !snapshot.errorCode.is_zero() {
            return Err(Error::SnapshotFailed {
                market: record.symbol.clone(),
                code: snapshot.errorCode,
            });
        }

        Ok(AccountSnapshot {
            error: snapshot.errorCode,
            token_balance: snapshot.tokenBalance,
            borrow_balance: snapshot.borrowBalance,
            exchange_rate_mantissa: snapshot.exchangeRateMantissa,
        })
    }

    /// Comptroller listing and collateral factor for `record`
    pub async fn risk_params(&self, record: &MarketRecord) -> Result<MarketRiskParams> {
        let market = contracts::read(
            self.client,
            self.comptroller,
            IComptroller::marketsCall {
                vToken: record.address,
            },
        )
        .await?;

        Ok(MarketRiskParams {
            is_listed: market.isListed,
            collateral_factor_mantissa: market.collateralFactorMantissa,
        })
    }

    /// Balance the account can deposit into `record`
    async fn spendable(&self, record: &MarketRecord) -> Result<U256> {
        let account = self.account();
        let balance = match record.kind {
            MarketKind::Native => self.client.native_balance(account).await?,
            MarketKind::Asset { underlying } => {
                contracts::read(
                    self.client,
                    underlying,
                    IERC20::balanceOfCall { owner: account },
                )
                .await?
            }
        };
        Ok(balance)
    }

    /// Supply `amount` of the underlying to `record`
    ///
    /// Asset markets must already be approved (see [`crate::bootstrap`]).
    pub async fn deposit(&self, record: &MarketRecord, amount: U256) -> Result<Confirmation> {
        if amount.is_zero() {
            return Err(Error::InvalidArgument(
                "deposit amount must be positive".to_string(),
            ));
        }

        let available = self.spendable(record).await?;
        if amount > available {
            return Err(Error::InsufficientFunds {
                market: record.symbol.clone(),
                requested: amount,
                available,
            });
        }

        let confirmation = match record.kind {
            MarketKind::Native => {
                contracts::write(self.client, record.address, IVBnb::mintCall {}, amount).await?
            }
            MarketKind::Asset { .. } => {
                contracts::submit(
                    self.client,
                    record.address,
                    IVToken::mintCall { mintAmount: amount },
                    U256::ZERO,
                )
                .await?
            }
        };

        tracing::info!(
            market = %record.symbol,
            amount = %amount,
            tx_hash = %confirmation.tx_hash,
            "mint confirmed"
        );
        Ok(confirmation)
    }

    /// Redeem the account's entire market token balance
    pub async fn withdraw(&self, record: &MarketRecord) -> Result<Confirmation> {
        let balance = contracts::read(
            self.client,
            record.address,
            IVToken::balanceOfCall {
                owner: self.account(),
            },
        )
        .await?;

        if balance.is_zero() {
            return Err(Error::NoBalance {
                market: record.symbol.clone(),
            });
        }

        let confirmation = contracts::submit(
            self.client,
            record.address,
            IVToken::redeemCall {
                redeemTokens: balance,
            },
            U256::ZERO,
        )
        .await?;

        tracing::info!(
            market = %record.symbol,
            tokens = %format_units(balance, record.decimals),
            tx_hash = %confirmation.tx_hash,
            "redeem confirmed"
        );
        Ok(confirmation)
    }

    /// Borrow up to half of what the risk engine would allow
    ///
    /// The cap is `deposit * collateralFactor / 1e18 / 2` in exact integer
    /// arithmetic. Only the gap between the cap and the current debt is
    /// borrowed; no transaction is sent when there is no gap.
    pub async fn borrow_safe(&self, record: &MarketRecord) -> Result<BorrowOutcome> {
        let risk = self.risk_params(record).await?;
        if !risk.is_listed {
            return Err(Error::MarketNotListed {
                market: record.symbol.clone(),
            });
        }

        let snapshot = self.snapshot(record).await?;
        let deposit = snapshot.token_balance;
        let debt = snapshot.borrow_balance;

        let cap = math::safe_borrow_cap(deposit, risk.collateral_factor_mantissa).ok_or_else(
            || {
                Error::ArithmeticOverflow(format!(
                    "safe borrow cap for {} (deposit {}, collateral factor {})",
                    record.symbol, deposit, risk.collateral_factor_mantissa
                ))
            },
        )?;

        tracing::debug!(
            market = %record.symbol,
            deposit = %deposit,
            debt = %debt,
            cap = %cap,
            "Computed safe borrow cap"
        );

        if cap <= debt {
            tracing::info!(market = %record.symbol, cap = %cap, debt = %debt, "Borrow not needed");
            return Ok(BorrowOutcome::NotNeeded { cap, debt });
        }

        let amount = cap - debt;
        let confirmation = self.borrow(record, amount).await?;
        Ok(BorrowOutcome::Borrowed {
            amount,
            confirmation,
        })
    }

    /// Borrow exactly `amount` with no validation at all
    ///
    /// This bypasses the safe cap. A caller using it directly can push the
    /// account to the edge of liquidation; prefer [`Positions::borrow_safe`].
    pub async fn borrow(&self, record: &MarketRecord, amount: U256) -> Result<Confirmation> {
        let confirmation = contracts::submit(
            self.client,
            record.address,
            IVToken::borrowCall {
                borrowAmount: amount,
            },
            U256::ZERO,
        )
        .await?;

        tracing::info!(
            market = %record.symbol,
            amount = %amount,
            tx_hash = %confirmation.tx_hash,
            "borrow confirmed"
        );
        Ok(confirmation)
    }

    /// Repay the account's entire outstanding debt
    ///
    /// Asset markets must already be approved (see [`crate::bootstrap`]).
    pub async fn repay(&self, record: &MarketRecord) -> Result<Confirmation> {
        let debt = self.snapshot(record).await?.borrow_balance;
        if debt.is_zero() {
            return Err(Error::NoDebt {
                market: record.symbol.clone(),
            });
        }

        let confirmation = match record.kind {
            MarketKind::Native => {
                contracts::write(self.client, record.address, IVBnb::repayBorrowCall {}, debt)
                    .await?
            }
            MarketKind::Asset { .. } => {
                contracts::submit(
                    self.client,
                    record.address,
                    IVToken::repayBorrowCall { repayAmount: debt },
                    U256::ZERO,
                )
                .await?
            }
        };

        tracing::info!(
            market = %record.symbol,
            amount = %debt,
            tx_hash = %confirmation.tx_hash,
            "repayBorrow confirmed"
        );
        Ok(confirmation)
    }
}
