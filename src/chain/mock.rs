//! In-memory chain for tests
//!
//! Decodes calldata with the same `sol!` bindings the crate uses, answers
//! reads from a small model of the comptroller, markets and ERC-20s, applies
//! the effect of each write and records it. A call to a write function runs
//! it against a copy of the state, like `eth_call` does.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use alloy::primitives::{address, Address, Bytes, B256, U256};
use alloy::sol_types::{SolCall, SolInterface, SolValue};
use async_trait::async_trait;

use super::{ChainClient, ChainError, Confirmation};
use crate::contracts::{IComptroller, IVBnb, IVToken, IERC20};

pub(crate) const ACCOUNT: Address = address!("f39fd6e51aad88f6f4ce6ab8827279cfffb92266");
pub(crate) const COMPTROLLER: Address = address!("fd36e2c2a6789db23113685031d7f16329158384");

#[derive(Debug, Clone)]
pub(crate) struct MockMarket {
    pub is_vtoken: bool,
    pub symbol: String,
    pub name: String,
    pub decimals: u8,
    pub underlying: Option<Address>,
    pub token_balance: U256,
    pub borrow_balance: U256,
    pub exchange_rate: U256,
    pub snapshot_error: U256,
}

impl MockMarket {
    pub fn native(symbol: &str) -> Self {
        Self {
            is_vtoken: true,
            symbol: symbol.to_string(),
            name: format!("Venus {}", symbol.trim_start_matches('v')),
            decimals: 8,
            underlying: None,
            token_balance: U256::ZERO,
            borrow_balance: U256::ZERO,
            exchange_rate: U256::from(200_000_000_000_000_000_000_000_000u128),
            snapshot_error: U256::ZERO,
        }
    }

    pub fn asset(symbol: &str, underlying: Address) -> Self {
        Self {
            underlying: Some(underlying),
            ..Self::native(symbol)
        }
    }
}

#[derive(Debug, Clone, Default)]
pub(crate) struct MockToken {
    pub balance: U256,
    pub allowances: HashMap<Address, U256>,
}

/// A write the mock accepted
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RecordedWrite {
    pub to: Address,
    pub signature: &'static str,
    /// Amount argument of the call, if it has one
    pub amount: Option<U256>,
    pub value: U256,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct MockState {
    pub native_balance: U256,
    pub markets: HashMap<Address, MockMarket>,
    pub tokens: HashMap<Address, MockToken>,
    pub members: HashSet<Address>,
    /// Listed markets and their collateral factor mantissa
    pub listed: HashMap<Address, U256>,
    pub writes: Vec<RecordedWrite>,
    /// Target and selector of every call, in order
    pub calls: Vec<(Address, [u8; 4])>,
    /// Every write is mined but reverts
    pub revert_writes: bool,
    /// Code-returning writes return this error code and change nothing
    pub reject_code: Option<U256>,
    /// `enterMarkets` returns success but membership does not change
    pub ignore_enter: bool,
}

pub(crate) struct MockChain {
    state: Mutex<MockState>,
}

impl MockChain {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockState::default()),
        }
    }

    pub fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().expect("mock state poisoned")
    }

    pub fn writes(&self) -> Vec<RecordedWrite> {
        self.state().writes.clone()
    }

    pub fn calls(&self) -> Vec<(Address, [u8; 4])> {
        self.state().calls.clone()
    }

    pub fn add_market(&self, address: Address, market: MockMarket) {
        let mut state = self.state();
        if let Some(underlying) = market.underlying {
            state.tokens.entry(underlying).or_default();
        }
        state.markets.insert(address, market);
    }

    pub fn list(&self, market: Address, collateral_factor: U256) {
        self.state().listed.insert(market, collateral_factor);
    }
}

fn reverted(to: Address, reason: &str) -> ChainError {
    ChainError::CallReverted {
        to,
        reason: reason.to_string(),
    }
}

/// Return data of a view call; `None` when `input` is not a view function
type ViewOutput = Result<Option<Vec<u8>>, ChainError>;

impl MockState {
    fn comptroller_call(&self, input: &[u8]) -> ViewOutput {
        let call = IComptroller::IComptrollerCalls::abi_decode(input)
            .map_err(|e| reverted(COMPTROLLER, &e.to_string()))?;

        let output = match call {
            IComptroller::IComptrollerCalls::markets(c) => {
                let factor = self.listed.get(&c.vToken).copied();
                (factor.is_some(), factor.unwrap_or_default(), false).abi_encode_params()
            }
            IComptroller::IComptrollerCalls::checkMembership(c) => {
                self.members.contains(&c.vToken).abi_encode()
            }
            IComptroller::IComptrollerCalls::enterMarkets(_) => return Ok(None),
        };
        Ok(Some(output))
    }

    fn market_call(&self, to: Address, market: &MockMarket, input: &[u8]) -> ViewOutput {
        if IVBnb::IVBnbCalls::abi_decode(input).is_ok() {
            return Ok(None);
        }
        let call =
            IVToken::IVTokenCalls::abi_decode(input).map_err(|e| reverted(to, &e.to_string()))?;

        let output = match call {
            IVToken::IVTokenCalls::isVToken(_) => market.is_vtoken.abi_encode(),
            IVToken::IVTokenCalls::decimals(_) => U256::from(market.decimals).abi_encode(),
            IVToken::IVTokenCalls::symbol(_) => market.symbol.abi_encode(),
            IVToken::IVTokenCalls::name(_) => market.name.abi_encode(),
            IVToken::IVTokenCalls::underlying(_) => match market.underlying {
                Some(underlying) => underlying.abi_encode(),
                None => return Err(reverted(to, "no underlying")),
            },
            IVToken::IVTokenCalls::balanceOf(_) => market.token_balance.abi_encode(),
            IVToken::IVTokenCalls::getAccountSnapshot(_) => (
                market.snapshot_error,
                market.token_balance,
                market.borrow_balance,
                market.exchange_rate,
            )
                .abi_encode_params(),
            IVToken::IVTokenCalls::mint(_)
            | IVToken::IVTokenCalls::redeem(_)
            | IVToken::IVTokenCalls::borrow(_)
            | IVToken::IVTokenCalls::repayBorrow(_) => return Ok(None),
        };
        Ok(Some(output))
    }

    fn token_call(&self, to: Address, token: &MockToken, input: &[u8]) -> ViewOutput {
        let call = IERC20::IERC20Calls::abi_decode(input).map_err(|e| reverted(to, &e.to_string()))?;

        let output = match call {
            IERC20::IERC20Calls::balanceOf(_) => token.balance.abi_encode(),
            IERC20::IERC20Calls::allowance(c) => token
                .allowances
                .get(&c.spender)
                .copied()
                .unwrap_or_default()
                .abi_encode(),
            IERC20::IERC20Calls::approve(_) => return Ok(None),
        };
        Ok(Some(output))
    }

    /// Apply a write and return what the function returned
    ///
    /// `Err` carries a revert message. With `reject_code` set, code-returning
    /// functions return that code and change nothing, like a comptroller
    /// rejection.
    fn apply(
        &mut self,
        to: Address,
        input: &[u8],
        value: U256,
    ) -> Result<(RecordedWrite, Vec<u8>), String> {
        let record = |signature, amount| RecordedWrite {
            to,
            signature,
            amount,
            value,
        };

        if to == COMPTROLLER {
            return match IComptroller::IComptrollerCalls::abi_decode(input) {
                Ok(IComptroller::IComptrollerCalls::enterMarkets(c)) => {
                    let code = self.reject_code.unwrap_or_default();
                    let codes = vec![code; c.vTokens.len()];
                    if code.is_zero() && !self.ignore_enter {
                        self.members.extend(c.vTokens);
                    }
                    Ok((
                        record(IComptroller::enterMarketsCall::SIGNATURE, None),
                        codes.abi_encode(),
                    ))
                }
                _ => Err("unsupported comptroller write".to_string()),
            };
        }

        if let Some(token) = self.tokens.get_mut(&to) {
            return match IERC20::IERC20Calls::abi_decode(input) {
                Ok(IERC20::IERC20Calls::approve(c)) => {
                    token.allowances.insert(c.spender, c.amount);
                    Ok((
                        record(IERC20::approveCall::SIGNATURE, Some(c.amount)),
                        true.abi_encode(),
                    ))
                }
                _ => Err("unsupported token write".to_string()),
            };
        }

        let Some(market) = self.markets.get(&to).cloned() else {
            return Err("no contract at address".to_string());
        };

        if let Ok(call) = IVBnb::IVBnbCalls::abi_decode(input) {
            if market.underlying.is_some() {
                return Err("market does not accept native value".to_string());
            }
            if value > self.native_balance {
                return Err("insufficient native balance".to_string());
            }
            self.native_balance -= value;
            let entry = self.markets.get_mut(&to).expect("market exists");
            let written = match call {
                IVBnb::IVBnbCalls::mint(_) => {
                    entry.token_balance += value;
                    record(IVBnb::mintCall::SIGNATURE, None)
                }
                IVBnb::IVBnbCalls::repayBorrow(_) => {
                    entry.borrow_balance = entry.borrow_balance.saturating_sub(value);
                    record(IVBnb::repayBorrowCall::SIGNATURE, None)
                }
            };
            return Ok((written, Vec::new()));
        }

        let call = IVToken::IVTokenCalls::abi_decode(input).map_err(|e| e.to_string())?;
        if !value.is_zero() {
            return Err("non-payable function".to_string());
        }

        let (signature, amount) = match &call {
            IVToken::IVTokenCalls::mint(c) => (IVToken::mintCall::SIGNATURE, c.mintAmount),
            IVToken::IVTokenCalls::redeem(c) => (IVToken::redeemCall::SIGNATURE, c.redeemTokens),
            IVToken::IVTokenCalls::borrow(c) => (IVToken::borrowCall::SIGNATURE, c.borrowAmount),
            IVToken::IVTokenCalls::repayBorrow(c) => {
                (IVToken::repayBorrowCall::SIGNATURE, c.repayAmount)
            }
            _ => return Err("not a write function".to_string()),
        };

        if let Some(code) = self.reject_code {
            return Ok((record(signature, Some(amount)), code.abi_encode()));
        }

        match call {
            IVToken::IVTokenCalls::mint(_) => {
                let underlying = market.underlying.ok_or("native market needs value")?;
                let token = self.tokens.entry(underlying).or_default();
                let allowance = token.allowances.get(&to).copied().unwrap_or_default();
                if allowance < amount {
                    return Err("insufficient allowance".to_string());
                }
                if token.balance < amount {
                    return Err("insufficient balance".to_string());
                }
                token.balance -= amount;
                self.markets.get_mut(&to).expect("market exists").token_balance += amount;
            }
            IVToken::IVTokenCalls::redeem(_) => {
                let entry = self.markets.get_mut(&to).expect("market exists");
                if entry.token_balance < amount {
                    return Err("redeem exceeds balance".to_string());
                }
                entry.token_balance -= amount;
            }
            IVToken::IVTokenCalls::borrow(_) => {
                self.markets.get_mut(&to).expect("market exists").borrow_balance += amount;
            }
            _ => {
                let entry = self.markets.get_mut(&to).expect("market exists");
                entry.borrow_balance = entry.borrow_balance.saturating_sub(amount);
            }
        }
        Ok((record(signature, Some(amount)), U256::ZERO.abi_encode()))
    }
}

#[async_trait]
impl ChainClient for MockChain {
    fn account(&self) -> Address {
        ACCOUNT
    }

    async fn native_balance(&self, _account: Address) -> Result<U256, ChainError> {
        Ok(self.state().native_balance)
    }

    async fn call(&self, to: Address, input: Bytes, value: U256) -> Result<Bytes, ChainError> {
        let mut state = self.state();
        if let Some(selector) = input.get(..4).and_then(|s| <[u8; 4]>::try_from(s).ok()) {
            state.calls.push((to, selector));
        }

        let view = if to == COMPTROLLER {
            state.comptroller_call(&input)?
        } else if let Some(market) = state.markets.get(&to) {
            state.market_call(to, market, &input)?
        } else if let Some(token) = state.tokens.get(&to) {
            state.token_call(to, token, &input)?
        } else {
            // Calls to an address without code succeed with empty return data
            return Ok(Bytes::new());
        };

        if let Some(output) = view {
            return Ok(output.into());
        }

        // A write function: run it against a copy of the state
        let mut scratch = state.clone();
        scratch
            .apply(to, &input, value)
            .map(|(_, output)| output.into())
            .map_err(|reason| reverted(to, &reason))
    }

    async fn write(
        &self,
        to: Address,
        input: Bytes,
        value: U256,
    ) -> Result<Confirmation, ChainError> {
        let mut state = self.state();
        let nonce = state.writes.len() as u64 + 1;
        let tx_hash = B256::left_padding_from(&nonce.to_be_bytes());

        if state.revert_writes {
            return Err(ChainError::Reverted { tx_hash });
        }

        let (written, _) = state
            .apply(to, &input, value)
            .map_err(|reason| ChainError::NotSubmitted { to, reason })?;
        state.writes.push(written);

        Ok(Confirmation {
            tx_hash,
            block_number: Some(nonce),
        })
    }
}
