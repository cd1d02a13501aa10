use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use super::history::{PriceHistory, PriceHistoryEntry};
use super::snapshot::ProductSnapshot;
use crate::scheduler::{DEFAULT_CHECK_INTERVAL_MINUTES, MAX_CHECK_INTERVAL_MINUTES};

/// Storage keys, named as the extension stored them.
pub mod keys {
    pub const TARGET_PRICE: &str = "targetPrice";
    pub const LAST_TITLE: &str = "lastTitle";
    pub const LAST_PRICE: &str = "lastPrice";
    pub const LAST_IMAGE_URL: &str = "lastImageUrl";
    pub const LAST_PRODUCT_URL: &str = "lastProductUrl";
    pub const PRICE_HISTORY: &str = "priceHistory";
    pub const CHECK_INTERVAL_MINUTES: &str = "checkIntervalMinutes";

    pub const ALL: [&str; 7] = [
        TARGET_PRICE,
        LAST_TITLE,
        LAST_PRICE,
        LAST_IMAGE_URL,
        LAST_PRODUCT_URL,
        PRICE_HISTORY,
        CHECK_INTERVAL_MINUTES,
    ];
}

pub type StoredValues = HashMap<String, Value>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedState {
    pub target_price: Option<String>,
    pub last_title: Option<String>,
    pub last_price: Option<String>,
    pub last_image_url: Option<String>,
    pub last_product_url: Option<String>,
    pub price_history: PriceHistory,
    pub check_interval_minutes: u64,
}

impl Default for PersistedState {
    fn default() -> Self {
        Self {
            target_price: None,
            last_title: None,
            last_price: None,
            last_image_url: None,
            last_product_url: None,
            price_history: PriceHistory::new(),
            check_interval_minutes: DEFAULT_CHECK_INTERVAL_MINUTES,
        }
    }
}

impl PersistedState {
    /// Builds state from a batch read. Missing or mistyped keys fall back
    /// to their empty value rather than failing the read.
    pub fn from_values(values: &StoredValues) -> Self {
        let price_history = match values.get(keys::PRICE_HISTORY) {
            Some(raw) => match serde_json::from_value::<Vec<PriceHistoryEntry>>(raw.clone()) {
                Ok(entries) => PriceHistory::from(entries),
                Err(e) => {
                    tracing::warn!("Ignoring unreadable price history: {}", e);
                    PriceHistory::new()
                }
            },
            None => PriceHistory::new(),
        };

        let check_interval_minutes = values
            .get(keys::CHECK_INTERVAL_MINUTES)
            .and_then(|v| v.as_u64().or_else(|| v.as_str().and_then(|s| s.trim().parse().ok())))
            .filter(|minutes| (1..=MAX_CHECK_INTERVAL_MINUTES).contains(minutes))
            .unwrap_or(DEFAULT_CHECK_INTERVAL_MINUTES);

        Self {
            target_price: string_value(values, keys::TARGET_PRICE),
            last_title: string_value(values, keys::LAST_TITLE),
            last_price: string_value(values, keys::LAST_PRICE),
            last_image_url: string_value(values, keys::LAST_IMAGE_URL),
            last_product_url: string_value(values, keys::LAST_PRODUCT_URL),
            price_history,
            check_interval_minutes,
        }
    }

    /// Both a target and a remembered product are needed before checking.
    pub fn is_configured(&self) -> bool {
        self.target_price.as_deref().is_some_and(|t| !t.is_empty())
            && self.last_title.as_deref().is_some_and(|t| !t.is_empty())
    }

    /// Values written after a successful check.
    pub fn observation_values(snapshot: &ProductSnapshot, history: &PriceHistory) -> StoredValues {
        let mut values = Self::snapshot_values(snapshot);
        values.insert(
            keys::PRICE_HISTORY.to_string(),
            serde_json::to_value(history).unwrap_or_else(|_| Value::Array(Vec::new())),
        );
        values
    }

    /// The last-seen product fields, without touching history.
    pub fn snapshot_values(snapshot: &ProductSnapshot) -> StoredValues {
        HashMap::from([
            (keys::LAST_TITLE.to_string(), Value::from(snapshot.title.clone())),
            (keys::LAST_PRICE.to_string(), Value::from(snapshot.price.as_str())),
            (keys::LAST_IMAGE_URL.to_string(), Value::from(snapshot.image_url.clone())),
            (keys::LAST_PRODUCT_URL.to_string(), Value::from(snapshot.product_url.clone())),
        ])
    }

    pub fn target_values(target: &str) -> StoredValues {
        HashMap::from([(keys::TARGET_PRICE.to_string(), Value::from(target))])
    }

    pub fn interval_values(minutes: u64) -> StoredValues {
        HashMap::from([(keys::CHECK_INTERVAL_MINUTES.to_string(), Value::from(minutes))])
    }
}

fn string_value(values: &StoredValues, key: &str) -> Option<String> {
    match values.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
