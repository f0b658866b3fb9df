//! vaultwatch: keeps a ledger of XVS vault stakers in sync with the chain
//! and announces notable stake movements.
//!
//! The binary in `main.rs` wires these modules together; they are exposed
//! as a library so the reconciliation core can be driven from tests.

pub mod alerts;
pub mod config;
pub mod explorer;
pub mod ledger;
pub mod notify;
pub mod onchain;
pub mod reconcile;
pub mod report;
pub mod retry;
pub mod scheduler;
pub mod store;
pub mod watcher;
