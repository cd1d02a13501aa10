use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Sentinel stored wherever a price could not be read.
pub const NOT_AVAILABLE: &str = "N/A";

/// Sentinel title used when the page has no product heading.
pub const NO_PRODUCT_TITLE: &str = "No product detected";

/// A price as scraped: a string of digits, or "N/A".
///
/// Kept as text so a stored value reads back exactly as it was written.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PriceField {
    Digits(String),
    #[default]
    NotAvailable,
}

impl PriceField {
    /// Keeps only ASCII digits; nothing left means "N/A".
    pub fn normalize(text: &str) -> Self {
        let digits: String = text.chars().filter(|c| c.is_ascii_digit()).collect();
        if digits.is_empty() {
            PriceField::NotAvailable
        } else {
            PriceField::Digits(digits)
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            PriceField::Digits(digits) => digits,
            PriceField::NotAvailable => NOT_AVAILABLE,
        }
    }

    /// `None` for "N/A" and for digit strings too long for an i64.
    pub fn parse(&self) -> Option<i64> {
        match self {
            PriceField::Digits(digits) => digits.parse().ok(),
            PriceField::NotAvailable => None,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, PriceField::Digits(_))
    }
}

impl fmt::Display for PriceField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for PriceField {
    fn from(raw: &str) -> Self {
        if !raw.is_empty() && raw.chars().all(|c| c.is_ascii_digit()) {
            PriceField::Digits(raw.to_string())
        } else {
            PriceField::NotAvailable
        }
    }
}

impl Serialize for PriceField {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for PriceField {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(PriceField::from(raw.as_str()))
    }
}

/// Fields read off one product page at one point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSnapshot {
    pub title: String,
    pub price: PriceField,
    pub image_url: String,
    pub product_url: String,
    pub original_price: PriceField,
}

impl ProductSnapshot {
    /// Title and price both present, the minimum a price check needs.
    pub fn is_complete(&self) -> bool {
        let title = self.title.trim();
        !title.is_empty() && title != NO_PRODUCT_TITLE && self.price.is_available()
    }
}
