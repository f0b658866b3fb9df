//! Adaptive block-range fetcher.
//!
//! The explorer caps a single `txlist` response at its result window. When a
//! range is rejected as too large it is halved into `[start, mid]` and
//! `[mid + 1, end]` and both halves are listed, left first, so results come
//! back in ascending block order. A single block that is still too large
//! cannot be split and fails the fetch.

use crate::explorer::client::ExplorerApi;
use crate::explorer::types::{FetchError, RawTransaction, TxListPage};
use crate::retry::RetryPolicy;

use tracing::{debug, error};

/// Transactions collected for one range, plus the sub-ranges that had to be skipped.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RangeFetch {
    pub transactions: Vec<RawTransaction>,
    /// Inclusive ranges dropped because the explorer returned rows we could not decode.
    pub skipped: Vec<(u64, u64)>,
    /// Number of `txlist` calls that produced a usable answer.
    pub requests: u32,
}

pub struct BlockRangeFetcher<X> {
    api: X,
    retry: RetryPolicy,
}

impl<X: ExplorerApi> BlockRangeFetcher<X> {
    pub fn new(api: X, retry: RetryPolicy) -> Self {
        Self { api, retry }
    }

    pub fn api(&self) -> &X {
        &self.api
    }

    /// All transactions in `[start_block, end_block]` whose input starts with `selector`.
    pub async fn fetch(
        &self,
        start_block: u64,
        end_block: u64,
        selector: &str,
    ) -> Result<RangeFetch, FetchError> {
        let mut out = RangeFetch::default();
        if start_block > end_block {
            return Ok(out);
        }

        // Stack of pending ranges; the left half is pushed last so it is listed first.
        let mut pending = vec![(start_block, end_block)];
        while let Some((lo, hi)) = pending.pop() {
            let page = self.retry.run("txlist", || self.api.txlist(lo, hi)).await;
            match page {
                Ok(TxListPage::TooLarge) => {
                    out.requests += 1;
                    if lo == hi {
                        return Err(FetchError::WindowUnsplittable { block: lo });
                    }
                    let mid = lo + (hi - lo) / 2;
                    debug!(start = lo, mid = mid, end = hi, "result window too large, splitting");
                    pending.push((mid + 1, hi));
                    pending.push((lo, mid));
                }
                Ok(TxListPage::Transactions(txs)) => {
                    out.requests += 1;
                    let before = out.transactions.len();
                    out.transactions
                        .extend(txs.into_iter().filter(|tx| tx.calls(selector)));
                    debug!(
                        start = lo,
                        end = hi,
                        matched = out.transactions.len() - before,
                        selector = selector,
                        "range listed"
                    );
                }
                Err(FetchError::Schema(reason)) => {
                    error!(
                        start = lo,
                        end = hi,
                        reason = %reason,
                        "unexpected transaction data, skipping range"
                    );
                    out.skipped.push((lo, hi));
                }
                Err(e) => return Err(e),
            }
        }

        Ok(out)
    }
}
