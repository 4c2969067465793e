//! Fixed-point helpers for mantissa values scaled by 1e18

use alloy::primitives::{U256, U512};

/// Scale of on-chain mantissa values (1e18)
pub const MANTISSA_SCALE: U256 = U256::from_limbs([1_000_000_000_000_000_000, 0, 0, 0]);

const MANTISSA_SCALE_WIDE: U512 =
    U512::from_limbs([1_000_000_000_000_000_000, 0, 0, 0, 0, 0, 0, 0]);

/// `floor(value * mantissa / 1e18)` in exact integer arithmetic
///
/// The product is taken in 512 bits, so it never overflows. Returns `None`
/// only if the result itself does not fit in 256 bits.
pub fn mul_mantissa(value: U256, mantissa: U256) -> Option<U256> {
    let product: U512 = value.widening_mul(mantissa);
    U256::checked_from_uint(product / MANTISSA_SCALE_WIDE)
}

/// Half of the borrow limit the risk engine allows against `deposit`
///
/// `floor(deposit * collateral_factor / 1e18 / 2)`
pub fn safe_borrow_cap(deposit: U256, collateral_factor_mantissa: U256) -> Option<U256> {
    mul_mantissa(deposit, collateral_factor_mantissa).map(|limit| limit / U256::from(2))
}

/// Format a raw integer amount with `decimals` decimal places
pub fn format_units(value: U256, decimals: u8) -> String {
    if value.is_zero() {
        return "0".to_string();
    }

    let divisor = U256::from(10).pow(U256::from(decimals));
    let whole = value / divisor;
    let remainder = value % divisor;

    if remainder.is_zero() {
        return whole.to_string();
    }

    let remainder_str = format!("{:0>width$}", remainder, width = decimals as usize);
    let trimmed = remainder_str.trim_end_matches('0');
    format!("{}.{}", whole, trimmed)
}
