use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::engine::{DecisionEngine, Verdict};
use crate::models::{PersistedState, ProductSnapshot};
use crate::notifier::{Notification, NotificationEvent, Notifier};
use crate::page::{PageSource, UrlPattern};
use crate::storage::{KeyValueStore, load_state};
use crate::utils::error::{Result, SkipReason};

/// What started a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Trigger {
    Alarm,
    Manual,
}

#[derive(Debug, Clone, Serialize)]
pub struct CycleOutcome {
    pub snapshot: ProductSnapshot,
    pub verdict: Verdict,
    pub notification_id: Option<Uuid>,
    /// Set when the verdict asked for a notification that could not be sent.
    pub notify_error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CycleSettings {
    pub url_pattern: UrlPattern,
    pub icon_url: String,
}

/// Runs price-check cycles: load state, find the product page, extract,
/// decide, persist, notify.
pub struct Orchestrator {
    store: Arc<dyn KeyValueStore>,
    pages: Arc<dyn PageSource>,
    notifier: Arc<dyn Notifier>,
    engine: DecisionEngine,
    settings: CycleSettings,
}

impl Orchestrator {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        pages: Arc<dyn PageSource>,
        notifier: Arc<dyn Notifier>,
        engine: DecisionEngine,
        settings: CycleSettings,
    ) -> Self {
        Self {
            store,
            pages,
            notifier,
            engine,
            settings,
        }
    }

    pub fn store(&self) -> &Arc<dyn KeyValueStore> {
        &self.store
    }

    pub fn pages(&self) -> &Arc<dyn PageSource> {
        &self.pages
    }

    /// One full cycle. Every early exit is a [`SkipReason`]; nothing is
    /// written to storage unless a complete, numeric observation was made.
    #[tracing::instrument(name = "price_check", skip(self))]
    pub async fn run_cycle(&self, trigger: Trigger) -> std::result::Result<CycleOutcome, SkipReason> {
        let state = load_state(self.store.as_ref()).await?;
        if !state.is_configured() {
            return Err(SkipReason::NotConfigured);
        }
        let target = state.target_price.as_deref().unwrap_or_default();

        let page = self
            .pages
            .find_page(&self.settings.url_pattern)
            .await?
            .ok_or_else(|| SkipReason::NoMatchingPage {
                pattern: self.settings.url_pattern.as_str().to_string(),
            })?;

        let snapshot = self
            .pages
            .extract(&page)
            .await?
            .ok_or(SkipReason::ExtractionFailed)?;
        tracing::debug!("Current product data: {:?}", snapshot);

        if !snapshot.is_complete() {
            return Err(SkipReason::IncompleteData);
        }

        let verdict = self
            .engine
            .decide(&snapshot, target, state.last_price.as_deref())?;
        let current_price = snapshot.price.parse().ok_or(SkipReason::InvalidPrice)?;

        let mut history = state.price_history;
        history.record(current_price, &snapshot.title, Utc::now());
        self.store
            .set(PersistedState::observation_values(&snapshot, &history))
            .await?;

        let mut outcome = CycleOutcome {
            snapshot,
            verdict,
            notification_id: None,
            notify_error: None,
        };

        if outcome.verdict.notify {
            let notification = Notification::from_verdict(
                &outcome.verdict,
                &self.settings.icon_url,
                Some(outcome.snapshot.image_url.as_str()),
                Some(outcome.snapshot.product_url.as_str()),
            );

            match self.notifier.notify(&notification).await {
                Ok(()) => outcome.notification_id = Some(notification.id),
                Err(e) => {
                    tracing::warn!("Failed to deliver notification: {}", e);
                    outcome.notify_error = Some(e.to_string());
                }
            }
        }

        tracing::info!(
            price = current_price,
            alert = ?outcome.verdict.kind,
            "Price check completed and storage updated"
        );
        Ok(outcome)
    }

    /// The cycle as the alarm and the manual trigger run it: skips are
    /// logged here and go no further.
    pub async fn run_cycle_logged(&self, trigger: Trigger) -> Option<CycleOutcome> {
        match self.run_cycle(trigger).await {
            Ok(outcome) => Some(outcome),
            Err(reason) if reason.is_platform() => {
                tracing::warn!(?trigger, "Error during price check: {}", reason);
                None
            }
            Err(reason) => {
                tracing::info!(?trigger, "Skipping price check: {}", reason);
                None
            }
        }
    }

    /// Clicks on the notification and on its button both open the last
    /// known product page.
    pub async fn handle_notification_event(&self, event: NotificationEvent) -> Result<()> {
        let state = load_state(self.store.as_ref()).await?;

        match state.last_product_url.filter(|url| !url.is_empty()) {
            Some(url) => {
                tracing::info!(?event, "Opening product page {}", url);
                self.pages.open_page(&url).await
            }
            None => {
                tracing::info!(?event, "No product URL stored, ignoring notification click");
                Ok(())
            }
        }
    }
}
