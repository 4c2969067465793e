//! Lending Agent
//!
//! Automates an account's positions in a Compound-style money market
//! (Venus on BNB Smart Chain):
//! - Resolve configured market contracts into verified market records
//! - Enter markets and approve underlying assets, only when needed
//! - Deposit, withdraw, repay, and borrow up to half the collateral limit
//!
//! # Flow
//!
//! [`markets::MarketRegistry`] runs once, [`bootstrap::ensure_ready`] runs
//! once per market, then [`positions::Positions`] operations run on demand.
//! Every chain interaction goes through one [`chain::ChainClient`].

pub mod bootstrap;
pub mod chain;
pub mod config;
pub mod contracts;
pub mod markets;
pub mod math;
pub mod positions;
pub mod runner;
pub mod wallet;

mod error;

// Re-export commonly used types
pub use chain::{ChainClient, ChainError, Confirmation, RpcChainClient};
pub use config::{Config, RpcConfig};
pub use error::{Error, Result};
pub use markets::{MarketDescriptor, MarketKind, MarketRecord, MarketRegistry};
pub use positions::{BorrowOutcome, Positions};
pub use runner::{Command, LendingRunner};
