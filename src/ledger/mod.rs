//! The staking ledger: one entry per staker plus derived summary metadata.
//!
//! JSON layout (shared with the bootstrap snapshot):
//!   transactions  → [{"user": address, "amount": number}], sorted by amount desc
//!   metadata      → {active_unique_deposit_users, last_block_evaluated, total_staked}
//!
//! Amounts are written as arbitrary-precision JSON numbers so a save/load
//! cycle reproduces every `Decimal` exactly.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    #[serde(rename = "user")]
    pub address: String,
    #[serde(with = "rust_decimal::serde::arbitrary_precision")]
    pub amount: Decimal,
}

/// Summary values derived from the entries. Recomputed every pass, never edited directly.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerMetadata {
    #[serde(rename = "active_unique_deposit_users", default)]
    pub active_user_count: u64,
    #[serde(default)]
    pub last_block_evaluated: u64,
    #[serde(with = "rust_decimal::serde::arbitrary_precision", default)]
    pub total_staked: Decimal,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ledger {
    #[serde(rename = "transactions", default)]
    pub entries: Vec<LedgerEntry>,
    #[serde(default)]
    pub metadata: LedgerMetadata,
}

impl Ledger {
    pub fn checkpoint(&self) -> u64 {
        self.metadata.last_block_evaluated
    }

    fn position(&self, address: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|e| e.address.eq_ignore_ascii_case(address))
    }

    pub fn amount_of(&self, address: &str) -> Option<Decimal> {
        self.position(address).map(|i| self.entries[i].amount)
    }

    /// Insert or overwrite the amount held by `address`. Returns the previous amount.
    pub fn upsert(&mut self, address: &str, amount: Decimal) -> Option<Decimal> {
        match self.position(address) {
            Some(i) => Some(std::mem::replace(&mut self.entries[i].amount, amount)),
            None => {
                self.entries.push(LedgerEntry {
                    address: address.to_string(),
                    amount,
                });
                None
            }
        }
    }

    /// Remove `address`. Returns its amount if it was present.
    pub fn remove(&mut self, address: &str) -> Option<Decimal> {
        self.position(address).map(|i| self.entries.remove(i).amount)
    }

    /// Close out a pass: drop empty entries, sort by amount descending,
    /// recompute metadata and advance the checkpoint (never backwards).
    pub fn finalize(&mut self, checkpoint: u64) {
        self.entries.retain(|e| e.amount > Decimal::ZERO);
        self.entries.sort_by(|a, b| b.amount.cmp(&a.amount));
        self.metadata = LedgerMetadata {
            active_user_count: self.entries.len() as u64,
            last_block_evaluated: self.metadata.last_block_evaluated.max(checkpoint),
            total_staked: self
                .entries
                .iter()
                .map(|e| e.amount)
                .sum::<Decimal>()
                .normalize(),
        };
    }

    /// Number of stakers holding at least `threshold`.
    pub fn holders_at_least(&self, threshold: Decimal) -> usize {
        self.entries.iter().filter(|e| e.amount >= threshold).count()
    }

    /// Entries strictly above `threshold`, in ledger order.
    pub fn above(&self, threshold: Decimal) -> impl Iterator<Item = &LedgerEntry> {
        self.entries.iter().filter(move |e| e.amount > threshold)
    }
}
