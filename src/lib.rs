pub mod app;
pub mod config;
pub mod engine;
pub mod extraction;
pub mod messaging;
pub mod models;
pub mod notifier;
pub mod orchestrator;
pub mod page;
pub mod popup;
pub mod scheduler;
pub mod service;
pub mod storage;
pub mod utils;
pub mod web;

// Re-export commonly used types
pub use config::AppConfig;
pub use engine::{AlertKind, DecisionEngine, Verdict};
pub use messaging::{MessageBus, Request, Response};
pub use models::{PersistedState, PriceField, PriceHistory, ProductSnapshot};
pub use orchestrator::{CycleOutcome, Orchestrator, Trigger};
pub use utils::error::{AppError, Result, SkipReason};
