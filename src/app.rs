//! Builds the watcher from configuration and runs it.

use std::future::Future;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

use crate::config::AppConfig;
use crate::engine::DecisionEngine;
use crate::extraction::ProductExtractor;
use crate::messaging::MessageBus;
use crate::notifier::{DiscordNotifier, LogNotifier, NotificationEvent, NotifierSet};
use crate::orchestrator::{CycleSettings, Orchestrator};
use crate::page::{BrowserPageSource, HttpPageSource, PageSource, StaticPageSource, UrlPattern};
use crate::popup::Popup;
use crate::scheduler::CronAlarms;
use crate::service::{ServiceChannels, WatcherService};
use crate::storage::{KeyValueStore, SqliteStore};
use crate::utils::error::{AppError, Result};
use crate::web::{self, AppState};

const CHANNEL_CAPACITY: usize = 32;

pub async fn build_store(config: &AppConfig) -> Result<Arc<SqliteStore>> {
    let store = SqliteStore::connect(&config.storage.database_url).await?;
    tracing::info!("Storage ready at {}", config.storage.database_url);
    Ok(Arc::new(store))
}

pub async fn build_page_source(config: &AppConfig) -> Result<Arc<dyn PageSource>> {
    let extractor = Arc::new(ProductExtractor::new(&config.scraper.selectors)?);

    if config.scraper.use_browser {
        let scraper = config.scraper.clone();
        let source = tokio::task::spawn_blocking(move || BrowserPageSource::launch(&scraper, extractor))
            .await
            .map_err(|e| AppError::Browser(format!("Browser launch task failed: {}", e)))??;
        tracing::info!("Using headless browser page source");
        Ok(Arc::new(source))
    } else {
        tracing::info!("Using HTTP page source");
        Ok(Arc::new(HttpPageSource::new(&config.scraper, extractor)?))
    }
}

pub fn build_notifier(config: &AppConfig) -> NotifierSet {
    let mut notifier = NotifierSet::new().with(Box::new(LogNotifier::new()));

    if let Some(webhook_url) = &config.notifications.discord.webhook_url {
        notifier = notifier.with(Box::new(DiscordNotifier::new(
            webhook_url,
            &config.notifications.discord.username,
        )));
    }

    tracing::info!("Notification channels: {:?}", notifier.names());
    notifier
}

pub fn build_orchestrator(
    config: &AppConfig,
    store: Arc<dyn KeyValueStore>,
    pages: Arc<dyn PageSource>,
) -> Result<Orchestrator> {
    let settings = CycleSettings {
        url_pattern: UrlPattern::parse(&config.scraper.url_pattern)?,
        icon_url: config.alerts.icon_url.clone(),
    };

    Ok(Orchestrator::new(
        store,
        pages,
        Arc::new(build_notifier(config)),
        DecisionEngine::new(&config.alerts.currency, config.alerts.increase_threshold),
        settings,
    ))
}

/// Every component wired together, with the service not yet running.
pub struct App {
    config: AppConfig,
    store: Arc<dyn KeyValueStore>,
    orchestrator: Arc<Orchestrator>,
    service: Arc<WatcherService>,
    alarms: Arc<CronAlarms>,
    bus: MessageBus,
    events: mpsc::Sender<NotificationEvent>,
    channels: ServiceChannels,
}

impl App {
    pub async fn build(config: AppConfig) -> Result<Self> {
        let store: Arc<dyn KeyValueStore> = build_store(&config).await?;
        let pages = build_page_source(&config).await?;
        Self::with_parts(config, store, pages).await
    }

    /// Storage only, with no pages open. For commands that never look at a
    /// page.
    pub async fn build_offline(config: AppConfig) -> Result<Self> {
        let store: Arc<dyn KeyValueStore> = build_store(&config).await?;
        let extractor = Arc::new(ProductExtractor::new(&config.scraper.selectors)?);
        let pages = Arc::new(StaticPageSource::new(extractor));
        Self::with_parts(config, store, pages).await
    }

    /// Wires the app around an existing store and page source.
    pub async fn with_parts(
        config: AppConfig,
        store: Arc<dyn KeyValueStore>,
        pages: Arc<dyn PageSource>,
    ) -> Result<Self> {
        let orchestrator = Arc::new(build_orchestrator(&config, store.clone(), pages)?);

        let (alarm_tx, alarm_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let alarms = Arc::new(CronAlarms::new(alarm_tx).await?);

        let (bus, requests) = MessageBus::channel(CHANNEL_CAPACITY);
        let (events, events_rx) = mpsc::channel(CHANNEL_CAPACITY);

        let service = Arc::new(WatcherService::new(
            orchestrator.clone(),
            alarms.clone(),
            &config.scheduler.alarm_name,
            config.scheduler.check_interval_minutes,
        ));

        Ok(Self {
            config,
            store,
            orchestrator,
            service,
            alarms,
            bus,
            events,
            channels: ServiceChannels {
                alarms: alarm_rx,
                requests,
                notification_events: events_rx,
            },
        })
    }

    pub fn orchestrator(&self) -> &Arc<Orchestrator> {
        &self.orchestrator
    }

    pub fn service(&self) -> &Arc<WatcherService> {
        &self.service
    }

    pub fn store(&self) -> &Arc<dyn KeyValueStore> {
        &self.store
    }

    pub fn bus(&self) -> MessageBus {
        self.bus.clone()
    }

    pub fn popup(&self) -> Popup {
        Popup::new(self.bus.clone(), self.store.clone(), &self.config.alerts.currency)
    }

    pub fn web_state(&self) -> AppState {
        AppState {
            popup: Arc::new(self.popup()),
            bus: self.bus.clone(),
            store: self.store.clone(),
            events: self.events.clone(),
        }
    }

    /// Answers bus requests until `shutdown`, without registering the alarm.
    pub async fn run_service_until<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let alarms = self.alarms.clone();
        let result = self.service.clone().run(self.channels, shutdown).await;
        alarms.shutdown().await?;
        result
    }

    /// The daemon: alarm, service loop, and the HTTP API when enabled.
    pub async fn run_until<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        self.service.start().await?;

        let (server_stop, server_stopped) = oneshot::channel::<()>();
        let server = if self.config.server.enabled {
            let server_config = self.config.server.clone();
            let state = self.web_state();
            Some(tokio::spawn(async move {
                let stopped = async move {
                    let _ = server_stopped.await;
                };
                if let Err(e) = web::serve(&server_config, state, stopped).await {
                    tracing::error!("HTTP API stopped: {}", e);
                }
            }))
        } else {
            None
        };

        let result = self.run_service_until(shutdown).await;

        if let Some(server) = server {
            let _ = server_stop.send(());
            if let Err(e) = server.await {
                tracing::warn!("HTTP API task failed: {}", e);
            }
        }

        result
    }
}
