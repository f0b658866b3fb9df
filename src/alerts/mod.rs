//! Alert classification and Telegram-flavoured Markdown rendering.
//!
//! Two paths share the same tier boundaries:
//! - **New staker**: sized by the new amount (`> 30k` whale, `> 1k` dolphin).
//! - **Balance change**: gated by `|difference| >= 1k`, bucketed by the
//!   *previous* amount (`< 30k` dolphin, otherwise whale). A small holder who
//!   makes one very large deposit is still reported as a dolphin until their
//!   next change.

use crate::config::AlertConfig;
use rust_decimal::Decimal;

/// Lower alert boundary, in token units.
pub const NOTABLE_THRESHOLD: Decimal = Decimal::from_parts(1_000, 0, 0, false, 0);
/// Whale boundary, in token units.
pub const WHALE_THRESHOLD: Decimal = Decimal::from_parts(30_000, 0, 0, false, 0);

/// Size class used in alert badges. `Dolphin` is the lower notable band
/// (new stakers above 1k, or changes by holders below 30k).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    Dolphin,
    Whale,
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Tier::Dolphin => write!(f, "dolphin"),
            Tier::Whale => write!(f, "whale"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Deposit,
    Withdrawal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertKind {
    NewStaker { tier: Tier },
    BalanceChange { tier: Tier, direction: Direction },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    pub address: String,
    pub kind: AlertKind,
    /// Staked amount after the change.
    pub amount: Decimal,
    /// `amount - previous`; zero for new stakers.
    pub difference: Decimal,
}

/// Decide whether a balance transition is worth an alert.
pub fn classify(previous: Option<Decimal>, amount: Decimal) -> Option<AlertKind> {
    match previous {
        None => {
            if amount > WHALE_THRESHOLD {
                Some(AlertKind::NewStaker { tier: Tier::Whale })
            } else if amount > NOTABLE_THRESHOLD {
                Some(AlertKind::NewStaker { tier: Tier::Dolphin })
            } else {
                None
            }
        }
        Some(previous) => {
            let difference = amount - previous;
            if difference.abs() < NOTABLE_THRESHOLD {
                return None;
            }
            let tier = if previous < WHALE_THRESHOLD {
                Tier::Dolphin
            } else {
                Tier::Whale
            };
            let direction = if difference > Decimal::ZERO {
                Direction::Deposit
            } else {
                Direction::Withdrawal
            };
            Some(AlertKind::BalanceChange { tier, direction })
        }
    }
}

impl Alert {
    pub fn evaluate(address: &str, previous: Option<Decimal>, amount: Decimal) -> Option<Self> {
        classify(previous, amount).map(|kind| Alert {
            address: address.to_string(),
            kind,
            amount,
            difference: previous.map_or(Decimal::ZERO, |p| amount - p),
        })
    }

    pub fn render(&self, style: &AlertConfig) -> String {
        let link = address_link(&self.address, style);
        let symbol = &style.token_symbol;
        let staking = format!("🔒 Staking: _{} {}_", format_units(self.amount), symbol);
        match self.kind {
            AlertKind::NewStaker { tier } => {
                let badge = match tier {
                    Tier::Whale => "❇️🐳❗❗",
                    Tier::Dolphin => "❇️🐬❕",
                };
                format!("{badge} {link} New Vault User!\n{staking}")
            }
            AlertKind::BalanceChange { tier, direction } => {
                let (badge, verb) = match (tier, direction) {
                    (Tier::Dolphin, Direction::Deposit) => ("✴️🐬", "Added"),
                    (Tier::Dolphin, Direction::Withdrawal) => ("🚨🐬❕❕", "Withdraw"),
                    (Tier::Whale, Direction::Deposit) => ("✴️🐳❗", "Added"),
                    (Tier::Whale, Direction::Withdrawal) => ("🚨🐳❗❗", "Withdraw"),
                };
                format!(
                    "{badge} {link} {verb} _{} {symbol}_\n{staking}",
                    format_units(self.difference.abs())
                )
            }
        }
    }
}

/// `0x1234...abcd`
pub fn short_address(address: &str) -> String {
    if address.len() <= 10 || !address.is_ascii() {
        return address.to_string();
    }
    format!("{}...{}", &address[..6], &address[address.len() - 4..])
}

/// Markdown link from the short address to the configured profile page.
pub fn address_link(address: &str, style: &AlertConfig) -> String {
    format!("[{}]({}{})", short_address(address), style.profile_url, address)
}

/// Whole token units with thousands separators; the fraction is truncated.
pub fn format_units(amount: Decimal) -> String {
    let whole = amount.trunc().abs().to_string();
    let mut out = String::with_capacity(whole.len() + whole.len() / 3 + 1);
    for (i, c) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    if amount.is_sign_negative() && amount.trunc() != Decimal::ZERO {
        out.insert(0, '-');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(v: i64) -> Decimal {
        Decimal::from(v)
    }

    const ADDR: &str = "0x1234567890abcdef1234567890abcdef12345678";

    #[test]
    fn test_small_holder_big_deposit_is_dolphin() {
        assert_eq!(
            classify(Some(d(500)), d(2000)),
            Some(AlertKind::BalanceChange {
                tier: Tier::Dolphin,
                direction: Direction::Deposit
            })
        );
        // Bucketed by the previous amount even when the new one is whale-sized.
        assert_eq!(
            classify(Some(d(500)), d(90_000)),
            Some(AlertKind::BalanceChange {
                tier: Tier::Dolphin,
                direction: Direction::Deposit
            })
        );
    }

    #[test]
    fn test_whale_withdrawal() {
        assert_eq!(
            classify(Some(d(40_000)), d(38_000)),
            Some(AlertKind::BalanceChange {
                tier: Tier::Whale,
                direction: Direction::Withdrawal
            })
        );
        assert_eq!(
            classify(Some(d(30_000)), d(0)),
            Some(AlertKind::BalanceChange {
                tier: Tier::Whale,
                direction: Direction::Withdrawal
            })
        );
    }

    #[test]
    fn test_below_gate_never_alerts() {
        assert_eq!(classify(Some(d(500)), d(800)), None);
        assert_eq!(classify(Some(d(100_000)), d(100_999)), None);
        assert_eq!(classify(Some(d(100_000)), d(100_000)), None);
        // Gate is inclusive.
        assert!(classify(Some(d(100_000)), d(101_000)).is_some());
    }

    #[test]
    fn test_new_staker_tiers() {
        assert_eq!(
            classify(None, d(35_000)),
            Some(AlertKind::NewStaker { tier: Tier::Whale })
        );
        assert_eq!(
            classify(None, d(30_000)),
            Some(AlertKind::NewStaker { tier: Tier::Dolphin })
        );
        assert_eq!(classify(None, d(1_000)), None);
        assert_eq!(classify(None, d(200)), None);
    }

    #[test]
    fn test_format_units() {
        assert_eq!(format_units(d(0)), "0");
        assert_eq!(format_units(d(999)), "999");
        assert_eq!(format_units(d(1000)), "1,000");
        assert_eq!(format_units(d(1_234_567)), "1,234,567");
        assert_eq!(format_units(Decimal::new(3_500_099, 2)), "35,000");
        assert_eq!(format_units(d(-2000)), "-2,000");
    }

    #[test]
    fn test_short_address() {
        assert_eq!(short_address(ADDR), "0x1234...5678");
        assert_eq!(short_address("0xabc"), "0xabc");
    }

    #[test]
    fn test_render_messages() {
        let style = AlertConfig::default();

        let alert = Alert::evaluate(ADDR, None, d(35_000)).unwrap();
        assert_eq!(
            alert.render(&style),
            format!(
                "❇️🐳❗❗ [0x1234...5678](https://debank.com/profile/{ADDR}) New Vault User!\n🔒 Staking: _35,000 XVS_"
            )
        );

        let alert = Alert::evaluate(ADDR, Some(d(40_000)), d(38_000)).unwrap();
        assert_eq!(alert.difference, d(-2000));
        assert_eq!(
            alert.render(&style),
            format!(
                "🚨🐳❗❗ [0x1234...5678](https://debank.com/profile/{ADDR}) Withdraw _2,000 XVS_\n🔒 Staking: _38,000 XVS_"
            )
        );

        let alert = Alert::evaluate(ADDR, Some(d(500)), d(2000)).unwrap();
        assert!(alert.render(&style).starts_with("✴️🐬 [0x1234...5678]"));
        assert!(alert.render(&style).contains("Added _1,500 XVS_"));

        assert!(Alert::evaluate(ADDR, None, d(200)).is_none());
    }
}
