use serde::{Deserialize, Serialize};

use crate::models::{PriceField, ProductSnapshot};
use crate::utils::error::SkipReason;

/// A rise bigger than this, since the last check, is worth an alert.
pub const INCREASE_ALERT_THRESHOLD: i64 = 500;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AlertKind {
    Drop,
    Increase,
    None,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Normal,
    High,
}

impl Severity {
    /// Notification priority on the 0..=2 scale the platform uses.
    pub fn priority(self) -> u8 {
        match self {
            Severity::Low => 0,
            Severity::Normal => 1,
            Severity::High => 2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Verdict {
    pub notify: bool,
    pub kind: AlertKind,
    pub title: String,
    pub message: String,
    pub severity: Severity,
}

impl Verdict {
    fn silent() -> Self {
        Self {
            notify: false,
            kind: AlertKind::None,
            title: String::new(),
            message: String::new(),
            severity: Severity::Low,
        }
    }
}

/// Decides whether the current observation deserves a notification.
#[derive(Debug, Clone)]
pub struct DecisionEngine {
    currency: String,
    increase_threshold: i64,
}

impl Default for DecisionEngine {
    fn default() -> Self {
        Self::new("KSh", INCREASE_ALERT_THRESHOLD)
    }
}

impl DecisionEngine {
    pub fn new(currency: &str, increase_threshold: i64) -> Self {
        Self {
            currency: currency.to_string(),
            increase_threshold,
        }
    }

    /// Drop (`current <= target`) wins over increase
    /// (`current - last > threshold`); anything else is silent.
    ///
    /// A non-numeric current or target price is a skip, not a verdict.
    /// A non-numeric last price only disables the increase rule.
    pub fn decide(
        &self,
        current: &ProductSnapshot,
        target: &str,
        last_price: Option<&str>,
    ) -> Result<Verdict, SkipReason> {
        let current_price = current.price.parse().ok_or(SkipReason::InvalidPrice)?;
        let target_price = parse_price(target).ok_or(SkipReason::InvalidPrice)?;

        if current_price <= target_price {
            let mut message = format!(
                "The price of \"{}\" has dropped to {} {}, which is at or below your target price of {} {}.",
                current.title, self.currency, current_price, self.currency, target_price
            );
            if let Some((savings, original)) = savings(&current.original_price, current_price) {
                message.push_str(&format!(
                    " You save {} {} (was {} {}).",
                    self.currency, savings, self.currency, original
                ));
            }

            return Ok(Verdict {
                notify: true,
                kind: AlertKind::Drop,
                title: "Price Drop Alert!".to_string(),
                message,
                severity: Severity::High,
            });
        }

        if let Some(last) = last_price.and_then(parse_price) {
            let increase = current_price - last;
            if increase > self.increase_threshold {
                return Ok(Verdict {
                    notify: true,
                    kind: AlertKind::Increase,
                    title: "Price Increase Alert!".to_string(),
                    message: format!(
                        "The price of \"{}\" went up by {} {}, from {} {} to {} {}.",
                        current.title,
                        self.currency,
                        increase,
                        self.currency,
                        last,
                        self.currency,
                        current_price
                    ),
                    severity: Severity::Normal,
                });
            }
        }

        Ok(Verdict::silent())
    }
}

/// Reads the leading run of digits, so "5000.00" and "5000 KSh" are 5000.
/// Input without a leading digit is not a price.
fn parse_price(raw: &str) -> Option<i64> {
    let raw = raw.trim_start();
    let end = raw
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(raw.len());
    raw[..end].parse().ok()
}

/// `(original - current, original)` when the page shows a higher list price.
fn savings(original: &PriceField, current: i64) -> Option<(i64, i64)> {
    let original = original.parse()?;
    let savings = original - current;
    (savings > 0).then_some((savings, original))
}
