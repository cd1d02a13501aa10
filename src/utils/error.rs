use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Scheduler error: {0}")]
    Scheduler(#[from] tokio_cron_scheduler::JobSchedulerError),

    #[error("Browser error: {0}")]
    Browser(String),

    #[error("Invalid selector: {selector}")]
    Selector { selector: String },

    #[error("Notification error: {0}")]
    Notification(String),

    #[error("Channel closed: {0}")]
    Channel(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

// Result type alias for convenience
pub type Result<T> = std::result::Result<T, AppError>;

/// Why a price-check cycle stopped early.
///
/// None of these are failures from the caller's point of view: the cycle is
/// idempotent and the next alarm tick retries it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    #[error("no target price or product title stored")]
    NotConfigured,

    #[error("no page matching {pattern} is open")]
    NoMatchingPage { pattern: String },

    #[error("failed to retrieve product data from page")]
    ExtractionFailed,

    #[error("incomplete product data")]
    IncompleteData,

    #[error("invalid price values")]
    InvalidPrice,

    #[error("platform call failed: {0}")]
    Platform(String),
}

impl SkipReason {
    /// Platform failures are the only skips worth a warning.
    pub fn is_platform(&self) -> bool {
        matches!(self, SkipReason::Platform(_))
    }
}

impl From<AppError> for SkipReason {
    fn from(err: AppError) -> Self {
        SkipReason::Platform(err.to_string())
    }
}
