//! Contract ABIs and typed call helpers
//!
//! Bindings are generated with `sol!`. The helpers ABI-encode a call,
//! dispatch it through a [`ChainClient`] and decode the result, so the chain
//! client itself only ever sees raw calldata.
//!
//! Markets and the comptroller report most failures as a returned error code
//! rather than a revert, and such a transaction still mines with a success
//! status. [`submit`] dry-runs those calls first and refuses to sign when
//! the dry run returns a non-zero code.

use alloy::primitives::{Address, Bytes, U256};
use alloy::sol;
use alloy::sol_types::SolCall;

use crate::chain::{ChainClient, ChainError, Confirmation};

sol! {
    /// Market token whose underlying is an ERC-20 asset
    interface IVToken {
        function isVToken() external view returns (bool);
        function decimals() external view returns (uint8);
        function symbol() external view returns (string memory);
        function name() external view returns (string memory);
        function underlying() external view returns (address);
        function balanceOf(address owner) external view returns (uint256);
        function getAccountSnapshot(address account)
            external
            view
            returns (uint256 errorCode, uint256 tokenBalance, uint256 borrowBalance, uint256 exchangeRateMantissa);

        function mint(uint256 mintAmount) external returns (uint256);
        function redeem(uint256 redeemTokens) external returns (uint256);
        function borrow(uint256 borrowAmount) external returns (uint256);
        function repayBorrow(uint256 repayAmount) external returns (uint256);
    }

    /// Payable entry points of the market that wraps the native currency
    interface IVBnb {
        function mint() external payable;
        function repayBorrow() external payable;
    }

    /// Comptroller (unitroller proxy) risk engine
    interface IComptroller {
        function markets(address vToken)
            external
            view
            returns (bool isListed, uint256 collateralFactorMantissa, bool isVenus);
        function checkMembership(address account, address vToken) external view returns (bool);
        function enterMarkets(address[] calldata vTokens) external returns (uint256[] memory);
    }

    interface IERC20 {
        function balanceOf(address owner) external view returns (uint256);
        function allowance(address owner, address spender) external view returns (uint256);
        function approve(address spender, uint256 amount) external returns (bool);
    }
}

/// Execute a read-only call against `to` and decode its return value
pub async fn read<C: SolCall>(
    client: &dyn ChainClient,
    to: Address,
    call: C,
) -> Result<C::Return, ChainError> {
    let input = Bytes::from(call.abi_encode());
    let output = client.call(to, input, U256::ZERO).await?;
    decode::<C>(to, &output)
}

fn decode<C: SolCall>(to: Address, output: &[u8]) -> Result<C::Return, ChainError> {
    C::abi_decode_returns(output).map_err(|e| ChainError::Decode {
        to,
        method: C::SIGNATURE,
        reason: e.to_string(),
    })
}

/// Return values that carry a Compound-style error code (0 = success)
pub trait ErrorCode {
    /// The first non-zero code, if any
    fn error_code(&self) -> Option<U256>;
}

impl ErrorCode for U256 {
    fn error_code(&self) -> Option<U256> {
        (!self.is_zero()).then_some(*self)
    }
}

impl ErrorCode for Vec<U256> {
    fn error_code(&self) -> Option<U256> {
        self.iter().find(|code| !code.is_zero()).copied()
    }
}

/// Dry-run a code-returning call with `eth_call`, then submit it
///
/// A non-zero code from the dry run fails with [`ChainError::Rejected`]
/// and nothing is signed.
pub async fn submit<C>(
    client: &dyn ChainClient,
    to: Address,
    call: C,
    value: U256,
) -> Result<Confirmation, ChainError>
where
    C: SolCall,
    C::Return: ErrorCode,
{
    let input = Bytes::from(call.abi_encode());

    let output = client.call(to, input.clone(), value).await?;
    if let Some(code) = decode::<C>(to, &output)?.error_code() {
        tracing::warn!(%to, method = C::SIGNATURE, %code, "Dry run returned an error code");
        return Err(ChainError::Rejected {
            to,
            method: C::SIGNATURE,
            code,
        });
    }

    client.write(to, input, value).await
}

/// Submit a state-changing call against `to`, attaching `value` as native
/// currency, and wait for confirmation
pub async fn write<C: SolCall>(
    client: &dyn ChainClient,
    to: Address,
    call: C,
    value: U256,
) -> Result<Confirmation, ChainError> {
    let input = Bytes::from(call.abi_encode());
    client.write(to, input, value).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_native_and_asset_mint_differ() {
        assert_ne!(IVBnb::mintCall::SELECTOR, IVToken::mintCall::SELECTOR);
        assert_eq!(IVBnb::mintCall::SIGNATURE, "mint()");
        assert_eq!(IVToken::mintCall::SIGNATURE, "mint(uint256)");
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(U256::ZERO.error_code(), None);
        assert_eq!(U256::from(3).error_code(), Some(U256::from(3)));

        assert_eq!(vec![U256::ZERO, U256::ZERO].error_code(), None);
        assert_eq!(
            vec![U256::ZERO, U256::from(9)].error_code(),
            Some(U256::from(9))
        );
        assert_eq!(Vec::<U256>::new().error_code(), None);
    }

    #[test]
    fn test_well_known_selectors() {
        assert_eq!(IERC20::approveCall::SELECTOR, [0x09, 0x5e, 0xa7, 0xb3]);
        assert_eq!(IERC20::balanceOfCall::SELECTOR, [0x70, 0xa0, 0x82, 0x31]);
        assert_eq!(
            IComptroller::enterMarketsCall::SIGNATURE,
            "enterMarkets(address[])"
        );
    }
}
