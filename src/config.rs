use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::env;
use url::Url;

use crate::page::UrlPattern;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub storage: StorageConfig,
    pub scraper: ScraperConfig,
    pub scheduler: SchedulerConfig,
    pub alerts: AlertsConfig,
    pub notifications: NotificationsConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub database_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScraperConfig {
    /// Glob over page URLs, `*://www.jumia.co.ke/*` style.
    pub url_pattern: String,
    /// Page fetched directly when no browser is used.
    pub product_url: Option<String>,
    pub user_agent: String,
    pub request_timeout: u64,
    pub chrome_path: Option<String>,
    pub use_browser: bool,
    pub selectors: SelectorConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SelectorConfig {
    pub title: String,
    pub price: String,
    pub image: String,
    pub original_price: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    pub alarm_name: String,
    pub check_interval_minutes: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertsConfig {
    pub currency: String,
    pub increase_threshold: i64,
    pub icon_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationsConfig {
    pub discord: DiscordConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscordConfig {
    pub webhook_url: Option<String>,
    pub username: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub enabled: bool,
    pub host: String,
    pub port: u16,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            title: "h1.-fs20.-pts.-pbxs".to_string(),
            price: "span.-b.-ubpt.-tal.-fs24.-prxs".to_string(),
            image: "img.-fw.-fh".to_string(),
            original_price: "span.-tal.-gy5.-lthr.-fs16".to_string(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            storage: StorageConfig {
                database_url: "sqlite://data/price-watcher.db?mode=rwc".to_string(),
            },
            scraper: ScraperConfig {
                url_pattern: "*://www.jumia.co.ke/*".to_string(),
                product_url: None,
                user_agent: "PriceWatcher/0.1".to_string(),
                request_timeout: 30,
                chrome_path: None,
                use_browser: true,
                selectors: SelectorConfig::default(),
            },
            scheduler: SchedulerConfig {
                alarm_name: crate::scheduler::PRICE_CHECK_ALARM.to_string(),
                check_interval_minutes: crate::scheduler::DEFAULT_CHECK_INTERVAL_MINUTES,
            },
            alerts: AlertsConfig {
                currency: "KSh".to_string(),
                increase_threshold: crate::engine::INCREASE_ALERT_THRESHOLD,
                icon_url: "icons/icon128.png".to_string(),
            },
            notifications: NotificationsConfig {
                discord: DiscordConfig {
                    webhook_url: None,
                    username: "Price Watcher".to_string(),
                },
            },
            server: ServerConfig {
                enabled: false,
                host: "127.0.0.1".to_string(),
                port: 3000,
            },
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = Config::builder()
            // Built-in defaults, so no config file is required
            .add_source(Config::try_from(&AppConfig::default())?)
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // Local overrides (ignored by git)
            .add_source(File::with_name("config/local").required(false))
            // PRICE_WATCHER_SCHEDULER__CHECK_INTERVAL_MINUTES=5 and friends
            .add_source(
                Environment::with_prefix("PRICE_WATCHER")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let mut config: AppConfig = s.try_deserialize()?;

        if config.scraper.chrome_path.is_none() {
            config.scraper.chrome_path = env::var("CHROME_PATH").ok();
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.storage.database_url.trim().is_empty() {
            return Err(ConfigError::Message("Storage database_url must not be empty".into()));
        }

        if UrlPattern::parse(&self.scraper.url_pattern).is_err() {
            return Err(ConfigError::Message(format!(
                "Invalid scraper url_pattern: {}",
                self.scraper.url_pattern
            )));
        }

        if let Some(product_url) = &self.scraper.product_url {
            match Url::parse(product_url) {
                Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {}
                _ => return Err(ConfigError::Message("Invalid scraper product_url".into())),
            }
        }

        if !self.scraper.use_browser && self.scraper.product_url.is_none() {
            return Err(ConfigError::Message(
                "Scraper product_url is required when use_browser is false".into(),
            ));
        }

        if self.scheduler.check_interval_minutes == 0 {
            return Err(ConfigError::Message(
                "Scheduler check_interval_minutes must be greater than 0".into(),
            ));
        }

        if self.scheduler.check_interval_minutes > crate::scheduler::MAX_CHECK_INTERVAL_MINUTES {
            return Err(ConfigError::Message(format!(
                "Scheduler check_interval_minutes must be at most {}",
                crate::scheduler::MAX_CHECK_INTERVAL_MINUTES
            )));
        }

        if self.scheduler.alarm_name.trim().is_empty() {
            return Err(ConfigError::Message("Scheduler alarm_name must not be empty".into()));
        }

        if self.alerts.increase_threshold < 0 {
            return Err(ConfigError::Message("Alerts increase_threshold must not be negative".into()));
        }

        if let Some(webhook_url) = &self.notifications.discord.webhook_url {
            if !webhook_url.starts_with("https://discord.com/api/webhooks/") {
                return Err(ConfigError::Message("Invalid Discord webhook URL format".into()));
            }
        }

        if self.server.enabled && self.server.port == 0 {
            return Err(ConfigError::Message("Server port must be greater than 0".into()));
        }

        Ok(())
    }
}
