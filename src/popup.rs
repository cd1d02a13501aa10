use serde::Serialize;
use std::sync::Arc;

use crate::messaging::{MessageBus, Request, Response};
use crate::models::{NO_PRODUCT_TITLE, PersistedState, PriceField, ProductSnapshot, keys};
use crate::storage::{KeyValueStore, load_state};
use crate::utils::error::Result;

pub const NOT_AVAILABLE_TEXT: &str = "Not available";

pub mod status {
    pub const FETCH_FAILED: &str = "Failed to fetch product data.";
    pub const NOT_A_PRODUCT_PAGE: &str = "Please navigate to a Jumia product page.";
    pub const NO_PRODUCT_DATA: &str = "No product data available.";
    pub const CHECK_FAILED: &str = "Failed to trigger price check.";
    pub const CHECK_TRIGGERED: &str = "Price check triggered.";
}

/// What the popup shows. Prices are already formatted for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PopupView {
    pub title: String,
    pub price: String,
    pub last_price: String,
    pub target_price: Option<String>,
    pub status: String,
}

impl PopupView {
    fn placeholder(status: &str) -> Self {
        Self {
            title: NO_PRODUCT_TITLE.to_string(),
            price: NOT_AVAILABLE_TEXT.to_string(),
            last_price: crate::models::NOT_AVAILABLE.to_string(),
            target_price: None,
            status: status.to_string(),
        }
    }
}

/// The on-demand display path: reads the current page through the watcher
/// service and keeps the stored product fields up to date.
pub struct Popup {
    bus: MessageBus,
    store: Arc<dyn KeyValueStore>,
    currency: String,
}

impl Popup {
    pub fn new(bus: MessageBus, store: Arc<dyn KeyValueStore>, currency: &str) -> Self {
        Self {
            bus,
            store,
            currency: currency.to_string(),
        }
    }

    fn format_price(&self, price: &PriceField) -> String {
        if price.is_available() {
            format!("{} {}", self.currency, price)
        } else {
            crate::models::NOT_AVAILABLE.to_string()
        }
    }

    async fn stored_target(&self) -> Option<String> {
        match load_state(self.store.as_ref()).await {
            Ok(state) => state
                .target_price
                .filter(|t| !t.is_empty())
                .map(|t| format!("{} {}", self.currency, t)),
            Err(e) => {
                tracing::warn!("Could not read target price: {}", e);
                None
            }
        }
    }

    /// Fetches the product on the active page. Successful reads are saved
    /// as the last-seen product.
    pub async fn refresh(&self) -> Result<PopupView> {
        let snapshot = match self.bus.send(Request::GetProductData).await {
            Ok(Response::ProductData(snapshot)) => snapshot,
            Ok(Response::NoProductData) => {
                tracing::warn!("No response from page");
                return Ok(self.with_target(PopupView::placeholder(status::NO_PRODUCT_DATA)).await);
            }
            Ok(Response::Error(e)) => {
                tracing::error!("Error getting product data: {}", e);
                return Ok(self.with_target(PopupView::placeholder(status::NOT_A_PRODUCT_PAGE)).await);
            }
            Ok(other) => {
                tracing::error!("Unexpected response to product request: {:?}", other);
                return Ok(self.with_target(PopupView::placeholder(status::FETCH_FAILED)).await);
            }
            Err(e) => {
                tracing::error!("Error sending product request: {}", e);
                return Ok(self.with_target(PopupView::placeholder(status::FETCH_FAILED)).await);
            }
        };

        tracing::debug!("Received product data: {:?}", snapshot);
        self.store.set(PersistedState::snapshot_values(&snapshot)).await?;

        Ok(self.with_target(self.render(&snapshot)).await)
    }

    fn render(&self, snapshot: &ProductSnapshot) -> PopupView {
        let price = self.format_price(&snapshot.price);
        let title = if snapshot.title.is_empty() {
            NO_PRODUCT_TITLE.to_string()
        } else {
            snapshot.title.clone()
        };

        PopupView {
            title,
            last_price: price.clone(),
            price,
            target_price: None,
            status: String::new(),
        }
    }

    async fn with_target(&self, mut view: PopupView) -> PopupView {
        view.target_price = self.stored_target().await;
        view
    }

    /// Stores a new target. Blank input is ignored and returns `None`.
    pub async fn save_target(&self, input: &str) -> Result<Option<String>> {
        let target = input.trim();
        if target.is_empty() {
            return Ok(None);
        }

        self.store.set(PersistedState::target_values(target)).await?;
        tracing::info!("Target price saved: {}", target);

        Ok(Some(format!("Target price saved: {} {}", self.currency, target)))
    }

    /// Asks the service for a cycle now and returns the status to show.
    pub async fn check_now(&self) -> String {
        match self.bus.send(Request::ManualPriceCheck).await {
            Ok(Response::Status(status)) if !status.is_empty() => status,
            Ok(Response::Error(e)) => {
                tracing::error!("Manual price check failed: {}", e);
                status::CHECK_FAILED.to_string()
            }
            Ok(_) => status::CHECK_TRIGGERED.to_string(),
            Err(e) => {
                tracing::error!("Error sending manualPriceCheck message: {}", e);
                status::CHECK_FAILED.to_string()
            }
        }
    }

    /// The view as last saved, without touching any page.
    pub async fn load_saved(&self) -> Result<PopupView> {
        let values = self
            .store
            .get(&[keys::TARGET_PRICE, keys::LAST_TITLE, keys::LAST_PRICE])
            .await?;
        let state = PersistedState::from_values(&values);

        let last_price = state
            .last_price
            .filter(|p| !p.is_empty())
            .map(|p| self.format_price(&PriceField::from(p.as_str())))
            .unwrap_or_else(|| crate::models::NOT_AVAILABLE.to_string());

        Ok(PopupView {
            title: state
                .last_title
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| NO_PRODUCT_TITLE.to_string()),
            price: NOT_AVAILABLE_TEXT.to_string(),
            last_price,
            target_price: state
                .target_price
                .filter(|t| !t.is_empty())
                .map(|t| format!("{} {}", self.currency, t)),
            status: String::new(),
        })
    }
}
