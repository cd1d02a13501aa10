// Integration tests for Price Watcher
// These tests drive the orchestrator, the service and the HTTP API together

pub mod api_tests;
pub mod price_check_tests;
pub mod service_tests;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Method, Request},
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

use price_watcher::{
    AppConfig, DecisionEngine, Orchestrator,
    config::SelectorConfig,
    extraction::ProductExtractor,
    models::{PersistedState, StoredValues, keys},
    notifier::{Notification, Notifier},
    orchestrator::CycleSettings,
    page::{PageHandle, PageSource, StaticPageSource, UrlPattern},
    storage::MemoryStore,
};

pub const PRODUCT_URL: &str = "https://www.jumia.co.ke/samsung-galaxy-a15-123.html";

/// A product page carrying the selectors the extractor looks for.
pub fn product_page(title: &str, price: &str, original_price: Option<&str>) -> String {
    let original = original_price
        .map(|p| format!(r#"<span class="-tal -gy5 -lthr -fs16">KSh {}</span>"#, p))
        .unwrap_or_default();

    format!(
        r#"<html><body>
            <img class="-fw -fh" data-src="/images/a15.jpg">
            <h1 class="-fs20 -pts -pbxs">{}</h1>
            <span class="-b -ubpt -tal -fs24 -prxs">KSh {}</span>
            {}
        </body></html>"#,
        title, price, original
    )
}

/// Stored values for a configured watcher.
pub fn configured_values(target: &str, last_price: Option<&str>) -> StoredValues {
    let mut values = PersistedState::target_values(target);
    values.insert(keys::LAST_TITLE.to_string(), serde_json::json!("Samsung Galaxy A15"));
    if let Some(last) = last_price {
        values.insert(keys::LAST_PRICE.to_string(), serde_json::json!(last));
    }
    values
}

/// Keeps every notification it is given.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    fn name(&self) -> &str {
        "recording"
    }

    async fn notify(&self, notification: &Notification) -> price_watcher::Result<()> {
        self.sent.lock().unwrap().push(notification.clone());
        Ok(())
    }
}

/// Static pages that count how often extraction ran.
pub struct CountingPages {
    inner: StaticPageSource,
    extractions: AtomicUsize,
}

impl CountingPages {
    pub fn new() -> Self {
        let extractor = Arc::new(ProductExtractor::new(&SelectorConfig::default()).unwrap());
        Self {
            inner: StaticPageSource::new(extractor),
            extractions: AtomicUsize::new(0),
        }
    }

    pub fn add_page(&self, url: &str, html: Option<&str>) -> PageHandle {
        self.inner.add_page(url, html)
    }

    pub fn extractions(&self) -> usize {
        self.extractions.load(Ordering::SeqCst)
    }

    pub fn opened_pages(&self) -> Vec<String> {
        self.inner.opened_pages()
    }
}

#[async_trait]
impl PageSource for CountingPages {
    async fn find_page(&self, pattern: &UrlPattern) -> price_watcher::Result<Option<PageHandle>> {
        self.inner.find_page(pattern).await
    }

    async fn active_page(&self) -> price_watcher::Result<Option<PageHandle>> {
        self.inner.active_page().await
    }

    async fn extract(&self, page: &PageHandle) -> price_watcher::Result<Option<price_watcher::ProductSnapshot>> {
        self.extractions.fetch_add(1, Ordering::SeqCst);
        self.inner.extract(page).await
    }

    async fn open_page(&self, url: &str) -> price_watcher::Result<()> {
        self.inner.open_page(url).await
    }
}

/// Orchestrator over in-memory fakes.
pub struct TestHarness {
    pub store: MemoryStore,
    pub pages: Arc<CountingPages>,
    pub notifier: Arc<RecordingNotifier>,
    pub orchestrator: Arc<Orchestrator>,
}

impl TestHarness {
    pub fn new(values: StoredValues) -> Self {
        let config = AppConfig::default();
        let store = MemoryStore::with_values(values);
        let pages = Arc::new(CountingPages::new());
        let notifier = Arc::new(RecordingNotifier::default());

        let orchestrator = Orchestrator::new(
            Arc::new(store.clone()),
            pages.clone(),
            notifier.clone(),
            DecisionEngine::new(&config.alerts.currency, config.alerts.increase_threshold),
            CycleSettings {
                url_pattern: UrlPattern::parse(&config.scraper.url_pattern).unwrap(),
                icon_url: config.alerts.icon_url.clone(),
            },
        );

        Self {
            store,
            pages,
            notifier,
            orchestrator: Arc::new(orchestrator),
        }
    }

    pub async fn stored(&self) -> PersistedState {
        PersistedState::from_values(&self.store.snapshot().await)
    }

    pub async fn raw_values(&self) -> HashMap<String, serde_json::Value> {
        self.store.snapshot().await
    }
}

/// Helper to make HTTP requests to the test app
pub async fn make_request(
    app: axum::Router,
    method: Method,
    uri: &str,
    body: Option<serde_json::Value>,
) -> anyhow::Result<(axum::http::StatusCode, serde_json::Value)> {
    let mut request = Request::builder().method(method).uri(uri);

    if body.is_some() {
        request = request.header("content-type", "application/json");
    }

    let request = request.body(match body {
        Some(json) => Body::from(json.to_string()),
        None => Body::empty(),
    })?;

    let response = app.oneshot(request).await?;
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
    let json = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes)?
    };

    Ok((status, json))
}

/// Helper to wait for async operations
pub async fn wait_for_condition<F, Fut>(mut condition: F, timeout_seconds: u64) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let start = std::time::Instant::now();
    let timeout = std::time::Duration::from_secs(timeout_seconds);

    while start.elapsed() < timeout {
        if condition().await {
            return true;
        }
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    }

    false
}
