//! One reconciliation pass over the ledger.
//!
//! The head block is captured once before anything is fetched; the pass
//! covers `(checkpoint, head]` and the checkpoint advances to `head`, so a
//! transaction landing while the pass runs is picked up next time. Each
//! address that touched the vault is re-resolved against the contract and
//! its latest balance replaces whatever the ledger held:
//!
//!   absent,  amount > 0  → insert          (NewStaker)
//!   absent,  amount == 0 → nothing
//!   present, amount == 0 → remove          (Exited)
//!   present, amount > 0  → overwrite       (BalanceChanged)

use crate::alerts::Alert;
use crate::explorer::{BlockRangeFetcher, ExplorerApi, FetchError};
use crate::ledger::Ledger;
use crate::onchain::{BalanceObservation, BalanceResolver, ChainReader, ResolveError};
use crate::retry::Transient;

use rust_decimal::Decimal;
use std::collections::HashSet;
use thiserror::Error;
use tracing::{debug, error, info};

#[derive(Error, Debug)]
pub enum ReconcileError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Resolve(#[from] ResolveError),
}

/// What a pass did to one address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerChange {
    NewStaker {
        address: String,
        amount: Decimal,
    },
    BalanceChanged {
        address: String,
        previous: Decimal,
        amount: Decimal,
        difference: Decimal,
    },
    Exited {
        address: String,
        previous: Decimal,
        difference: Decimal,
    },
}

impl LedgerChange {
    pub fn address(&self) -> &str {
        match self {
            LedgerChange::NewStaker { address, .. }
            | LedgerChange::BalanceChanged { address, .. }
            | LedgerChange::Exited { address, .. } => address,
        }
    }

    /// Alert for this change, if it crosses a threshold.
    pub fn alert(&self) -> Option<Alert> {
        match self {
            LedgerChange::NewStaker { address, amount } => Alert::evaluate(address, None, *amount),
            LedgerChange::BalanceChanged {
                address,
                previous,
                amount,
                ..
            } => Alert::evaluate(address, Some(*previous), *amount),
            LedgerChange::Exited {
                address, previous, ..
            } => Alert::evaluate(address, Some(*previous), Decimal::ZERO),
        }
    }
}

/// Merge fresh balance observations into the ledger and close out the pass.
///
/// Metadata is recomputed and the checkpoint advanced even when nothing changed.
pub fn apply_observations(
    ledger: &mut Ledger,
    observations: &[BalanceObservation],
    checkpoint: u64,
) -> Vec<LedgerChange> {
    let mut changes = Vec::new();

    for obs in observations {
        let address = obs.address.as_str();
        match ledger.amount_of(address) {
            None if obs.amount > Decimal::ZERO => {
                ledger.upsert(address, obs.amount);
                info!(user = %address, amount = %obs.amount, "staker added");
                changes.push(LedgerChange::NewStaker {
                    address: address.to_string(),
                    amount: obs.amount,
                });
            }
            None => {
                debug!(user = %address, "touched vault but holds no stake");
            }
            Some(previous) if obs.amount.is_zero() => {
                ledger.remove(address);
                info!(user = %address, previous = %previous, "staker exited");
                changes.push(LedgerChange::Exited {
                    address: address.to_string(),
                    previous,
                    difference: -previous,
                });
            }
            Some(previous) => {
                ledger.upsert(address, obs.amount);
                let difference = obs.amount - previous;
                info!(
                    user = %address,
                    difference = %difference,
                    amount = %obs.amount,
                    "staker updated"
                );
                changes.push(LedgerChange::BalanceChanged {
                    address: address.to_string(),
                    previous,
                    amount: obs.amount,
                    difference,
                });
            }
        }
    }

    ledger.finalize(checkpoint);
    changes
}

/// Summary of a completed pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassOutcome {
    /// First block scanned; `from_block > to_block` means nothing was scanned.
    pub from_block: u64,
    pub to_block: u64,
    pub transactions: usize,
    pub addresses: usize,
    pub changes: Vec<LedgerChange>,
    /// Ranges dropped because of undecodable explorer data.
    pub skipped_ranges: Vec<(u64, u64)>,
    /// Addresses whose balance could not be turned into a ledger amount.
    pub skipped_addresses: Vec<String>,
}

pub struct ReconciliationEngine<X, C> {
    fetcher: BlockRangeFetcher<X>,
    resolver: BalanceResolver<C>,
    deposit_selector: String,
    withdrawal_selector: String,
}

impl<X: ExplorerApi, C: ChainReader> ReconciliationEngine<X, C> {
    pub fn new(
        fetcher: BlockRangeFetcher<X>,
        resolver: BalanceResolver<C>,
        deposit_selector: impl Into<String>,
        withdrawal_selector: impl Into<String>,
    ) -> Self {
        Self {
            fetcher,
            resolver,
            deposit_selector: deposit_selector.into(),
            withdrawal_selector: withdrawal_selector.into(),
        }
    }

    /// Run one pass against `ledger`. On error the ledger is left untouched.
    pub async fn run(&self, ledger: &mut Ledger) -> Result<PassOutcome, ReconcileError> {
        let head = self.resolver.current_block().await?;
        let from_block = ledger.checkpoint() + 1;
        info!(block = head, from = from_block, "current block");

        let mut outcome = PassOutcome {
            from_block,
            to_block: head,
            ..PassOutcome::default()
        };

        let mut observations = Vec::new();
        if from_block <= head {
            let deposits = self
                .fetcher
                .fetch(from_block, head, &self.deposit_selector)
                .await?;
            let withdrawals = self
                .fetcher
                .fetch(from_block, head, &self.withdrawal_selector)
                .await?;

            outcome.transactions = deposits.transactions.len() + withdrawals.transactions.len();
            outcome.skipped_ranges = deposits.skipped;
            outcome.skipped_ranges.extend(withdrawals.skipped);

            let mut seen = HashSet::new();
            let addresses: Vec<&str> = deposits
                .transactions
                .iter()
                .chain(withdrawals.transactions.iter())
                .map(|tx| tx.from.as_str())
                .filter(|from| seen.insert(*from))
                .collect();
            outcome.addresses = addresses.len();

            for address in addresses {
                match self.resolver.resolve(address).await {
                    Ok(amount) => observations.push(BalanceObservation::new(address, amount)),
                    // Retrying cannot fix these; skip the address so the pass still advances.
                    Err(e) if !e.is_transient() => {
                        error!(user = %address, error = %e, "balance lookup failed, skipping address");
                        outcome.skipped_addresses.push(address.to_string());
                    }
                    Err(e) => return Err(e.into()),
                }
            }
        }

        outcome.changes = apply_observations(ledger, &observations, head);
        if !outcome.changes.is_empty() {
            info!(
                changes = outcome.changes.len(),
                stakers = ledger.metadata.active_user_count,
                total_staked = %ledger.metadata.total_staked,
                "ledger updated"
            );
        }
        Ok(outcome)
    }
}
