//! Daily report text: stake summary by tier and the whale list.

use crate::alerts::{address_link, format_units, WHALE_THRESHOLD};
use crate::config::AlertConfig;
use crate::ledger::Ledger;
use rust_decimal::Decimal;

/// Breakdown buckets, largest first. Each counts holders with `amount >= t`.
pub const SUMMARY_THRESHOLDS: [u64; 6] = [300_000, 100_000, 50_000, 10_000, 5_000, 1_000];

pub fn stake_summary(ledger: &Ledger, style: &AlertConfig) -> String {
    let mut lines = vec![
        format!(
            "🔒 *{symbol} Staked:* _{}_ {symbol}",
            format_units(ledger.metadata.total_staked),
            symbol = style.token_symbol
        ),
        format!(
            "👥 *Vault Users:* _{}_",
            format_units(Decimal::from(ledger.metadata.active_user_count))
        ),
        "\n💰 *Staking Breakdown:*".to_string(),
    ];
    for threshold in SUMMARY_THRESHOLDS {
        let count = ledger.holders_at_least(Decimal::from(threshold));
        lines.push(format!("💎 *{}k+:* _{} users_", threshold / 1000, count));
    }
    lines.join("\n")
}

pub fn whale_list(ledger: &Ledger, style: &AlertConfig) -> String {
    let mut lines = vec![
        format!(
            "🐳 *Vault Whales ({}k+):*",
            format_units(WHALE_THRESHOLD / Decimal::from(1000))
        ),
        "\n🔗 *Address*            🏦 *Staked*".to_string(),
    ];
    for entry in ledger.above(WHALE_THRESHOLD) {
        lines.push(format!(
            "{}   -   _{} {}_",
            address_link(&entry.address, style),
            format_units(entry.amount),
            style.token_symbol
        ));
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ledger() -> Ledger {
        let mut ledger = Ledger::default();
        let amounts = [350_000, 120_000, 30_000, 30_001, 7_500, 1_000, 999];
        for (i, amount) in amounts.iter().enumerate() {
            ledger.upsert(&format!("0x{:040x}", i + 1), Decimal::from(*amount));
        }
        ledger.finalize(1);
        ledger
    }

    #[test]
    fn test_stake_summary() {
        let text = stake_summary(&ledger(), &AlertConfig::default());
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines[0], "🔒 *XVS Staked:* _539,500_ XVS");
        assert_eq!(lines[1], "👥 *Vault Users:* _7_");
        assert!(text.contains("💎 *300k+:* _1 users_"));
        assert!(text.contains("💎 *100k+:* _2 users_"));
        assert!(text.contains("💎 *50k+:* _2 users_"));
        assert!(text.contains("💎 *10k+:* _4 users_"));
        assert!(text.contains("💎 *5k+:* _5 users_"));
        assert!(text.contains("💎 *1k+:* _6 users_"));
    }

    #[test]
    fn test_whale_list_strictly_above_threshold() {
        let text = whale_list(&ledger(), &AlertConfig::default());
        assert!(text.starts_with("🐳 *Vault Whales (30k+):*"));
        let rows: Vec<_> = text.lines().filter(|l| l.contains("   -   ")).collect();
        assert_eq!(rows.len(), 3);
        assert!(rows[0].ends_with("_350,000 XVS_"));
        assert!(rows[2].ends_with("_30,001 XVS_"));
        assert!(!text.contains("_30,000 XVS_"));
    }
}
