use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Most recent observations kept in storage.
pub const HISTORY_CAPACITY: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceHistoryEntry {
    pub price: i64,
    /// ISO-8601, as written to storage.
    pub timestamp: String,
    pub title: String,
}

/// Bounded log of observed prices, oldest first.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PriceHistory {
    entries: VecDeque<PriceHistoryEntry>,
}

impl PriceHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, price: i64, title: &str, at: DateTime<Utc>) {
        self.entries.push_back(PriceHistoryEntry {
            price,
            timestamp: at.to_rfc3339_opts(SecondsFormat::Millis, true),
            title: title.to_string(),
        });
        self.enforce_capacity();
    }

    /// Stored histories are not trusted to respect the cap.
    pub fn enforce_capacity(&mut self) {
        while self.entries.len() > HISTORY_CAPACITY {
            self.entries.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn latest(&self) -> Option<&PriceHistoryEntry> {
        self.entries.back()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PriceHistoryEntry> {
        self.entries.iter()
    }
}

impl From<Vec<PriceHistoryEntry>> for PriceHistory {
    fn from(entries: Vec<PriceHistoryEntry>) -> Self {
        let mut history = Self {
            entries: entries.into(),
        };
        history.enforce_capacity();
        history
    }
}
