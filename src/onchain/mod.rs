//! On-chain reads against the staking vault.
//!
//! The explorer tells us *who* touched the vault; the chain tells us *how
//! much* they hold now. Every address seen in a deposit or withdrawal is
//! re-resolved through the vault's `getUserInfo` view, so the stored amount
//! is always the latest observed balance rather than a running total.
//!
//! Architecture:
//! - `abi`: `sol!` bindings for the vault and the deposit/withdrawal selectors
//! - `resolver`: the `ChainReader` seam, its alloy-backed implementation,
//!   and `BalanceResolver` which scales raw `uint256` amounts into decimals
//! - `types`: `BalanceObservation`, the resolver's output

pub mod abi;
pub mod resolver;
pub mod types;

pub use resolver::{BalanceResolver, ChainReader, ResolveError, VaultReader};
pub use types::BalanceObservation;
