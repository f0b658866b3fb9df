//! Balance observations produced by the vault resolver.

use rust_decimal::Decimal;

/// The contract's current staked amount for an address, scaled to token units.
/// Always supersedes whatever the ledger held for that address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalanceObservation {
    pub address: String,
    pub amount: Decimal,
}

impl BalanceObservation {
    pub fn new(address: impl Into<String>, amount: Decimal) -> Self {
        Self {
            address: address.into(),
            amount,
        }
    }
}

impl std::fmt::Display for BalanceObservation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}={}", self.address, self.amount)
    }
}
