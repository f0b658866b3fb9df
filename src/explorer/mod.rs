//! Block-explorer access: listing the vault's transactions by block range.
//!
//! - `client`: the `ExplorerApi` seam and its reqwest implementation
//! - `fetcher`: `BlockRangeFetcher`, which splits ranges the explorer
//!   rejects as too large and filters by method selector
//! - `types`: response envelope validation and the typed `FetchError`

pub mod client;
pub mod fetcher;
pub mod types;

pub use client::{ExplorerApi, ExplorerClient};
pub use fetcher::{BlockRangeFetcher, RangeFetch};
pub use types::{FetchError, RawTransaction, TxListPage};
