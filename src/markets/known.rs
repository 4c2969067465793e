//! Well-known Venus deployments on BNB Smart Chain mainnet

use alloy::primitives::{address, Address};

use super::MarketDescriptor;

/// Symbol of the market wrapping BNB
pub const NATIVE_SYMBOL: &str = "vBNB";

/// Unitroller proxy in front of the comptroller
pub const UNITROLLER: Address = address!("fd36e2c2a6789db23113685031d7f16329158384");

pub const VBNB: Address = address!("a07c5b74c9b40447a954e1466938b865b6bbea36");
pub const VUSDT: Address = address!("fd5840cd36d94d7229439859c0112a4185bc0255");
pub const VUSDC: Address = address!("eca88125a5adbe82614ffc12d0db554e2e2867c8");
pub const VBUSD: Address = address!("95c78222b3d6e262426483d42cfa53685a67ab9d");

/// Descriptors for the core mainnet markets
pub fn mainnet_markets() -> Vec<MarketDescriptor> {
    [
        (VBNB, NATIVE_SYMBOL),
        (VUSDT, "vUSDT"),
        (VUSDC, "vUSDC"),
        (VBUSD, "vBUSD"),
    ]
    .into_iter()
    .map(|(address, symbol)| MarketDescriptor {
        address,
        symbol: symbol.to_string(),
    })
    .collect()
}
