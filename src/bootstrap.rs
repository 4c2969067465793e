//! Market bootstrap
//!
//! Before an account can borrow against or withdraw from a market it has to
//! be a member of that market, and before it can deposit an ERC-20 the market
//! needs an allowance on the underlying. Both preconditions are read first
//! and written only when missing, so running the bootstrap again on a ready
//! market costs no transactions. Membership is read again after entering,
//! since the comptroller reports a refused entry as an error code.

use alloy::primitives::{Address, U256};
use serde::Serialize;

use crate::chain::{ChainClient, Confirmation};
use crate::contracts::{self, IComptroller, IERC20};
use crate::markets::MarketRecord;
use crate::{Error, Result};

/// Writes issued by [`ensure_ready`]; `None` means the precondition held
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReadyReport {
    pub market: String,
    pub entered_market: Option<Confirmation>,
    pub approved: Option<Confirmation>,
}

impl ReadyReport {
    pub fn writes(&self) -> usize {
        self.entered_market.is_some() as usize + self.approved.is_some() as usize
    }
}

/// Make sure the client's account can use `record`
pub async fn ensure_ready(
    client: &dyn ChainClient,
    comptroller: Address,
    record: &MarketRecord,
) -> Result<ReadyReport> {
    let account = client.account();
    let mut report = ReadyReport {
        market: record.symbol.clone(),
        ..Default::default()
    };

    let member = contracts::read(
        client,
        comptroller,
        IComptroller::checkMembershipCall {
            account,
            vToken: record.address,
        },
    )
    .await?;

    if !member {
        let confirmation = contracts::submit(
            client,
            comptroller,
            IComptroller::enterMarketsCall {
                vTokens: vec![record.address],
            },
            U256::ZERO,
        )
        .await?;

        let entered = contracts::read(
            client,
            comptroller,
            IComptroller::checkMembershipCall {
                account,
                vToken: record.address,
            },
        )
        .await?;
        if !entered {
            tracing::error!(
                market = %record.symbol,
                tx_hash = %confirmation.tx_hash,
                "enterMarkets confirmed but membership is missing"
            );
            return Err(Error::MarketNotEntered {
                market: record.symbol.clone(),
            });
        }

        tracing::info!(
            market = %record.symbol,
            tx_hash = %confirmation.tx_hash,
            "Entered market"
        );
        report.entered_market = Some(confirmation);
    }

    if let Some(underlying) = record.underlying() {
        let allowance = contracts::read(
            client,
            underlying,
            IERC20::allowanceCall {
                owner: account,
                spender: record.address,
            },
        )
        .await?;

        if allowance.is_zero() {
            let confirmation = contracts::write(
                client,
                underlying,
                IERC20::approveCall {
                    spender: record.address,
                    amount: U256::MAX,
                },
                U256::ZERO,
            )
            .await?;
            tracing::info!(
                market = %record.symbol,
                underlying = %underlying,
                tx_hash = %confirmation.tx_hash,
                "Approved market to spend underlying"
            );
            report.approved = Some(confirmation);
        }
    }

    tracing::debug!(market = %record.symbol, writes = report.writes(), "Market ready");
    Ok(report)
}
