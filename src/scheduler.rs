use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::{RwLock, mpsc};
use tokio_cron_scheduler::{Job, JobScheduler};
use uuid::Uuid;

use crate::utils::error::{AppError, Result};

pub const PRICE_CHECK_ALARM: &str = "priceCheckAlarm";
pub const DEFAULT_CHECK_INTERVAL_MINUTES: u64 = 15;
/// One week.
pub const MAX_CHECK_INTERVAL_MINUTES: u64 = 7 * 24 * 60;

/// Accepts an interval in `1..=MAX_CHECK_INTERVAL_MINUTES`.
pub fn validate_interval(minutes: u64) -> Result<u64> {
    if !(1..=MAX_CHECK_INTERVAL_MINUTES).contains(&minutes) {
        return Err(AppError::Validation(format!(
            "Check interval must be between 1 and {} minutes, got {}",
            MAX_CHECK_INTERVAL_MINUTES, minutes
        )));
    }
    Ok(minutes)
}

/// One firing of a named alarm.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlarmEvent {
    pub name: String,
}

/// Named recurring timers. Creating an alarm under an existing name
/// replaces it.
#[async_trait]
pub trait Alarms: Send + Sync {
    async fn create(&self, name: &str, period_minutes: u64) -> Result<()>;

    /// Returns whether an alarm by that name existed.
    async fn clear(&self, name: &str) -> Result<bool>;
}

/// Alarms on top of tokio-cron-scheduler repeated jobs. Firings are
/// delivered as [`AlarmEvent`]s on the channel given at construction.
pub struct CronAlarms {
    scheduler: JobScheduler,
    jobs: RwLock<HashMap<String, Uuid>>,
    events: mpsc::Sender<AlarmEvent>,
}

impl CronAlarms {
    pub async fn new(events: mpsc::Sender<AlarmEvent>) -> Result<Self> {
        let scheduler = JobScheduler::new().await?;
        scheduler.start().await?;
        tracing::info!("Alarm scheduler started");

        Ok(Self {
            scheduler,
            jobs: RwLock::new(HashMap::new()),
            events,
        })
    }

    pub async fn create_with_period(&self, name: &str, period: Duration) -> Result<()> {
        if period.is_zero() {
            return Err(AppError::Validation("Alarm period must be greater than 0".to_string()));
        }

        self.clear(name).await?;

        let events = self.events.clone();
        let alarm_name = name.to_string();
        let job = Job::new_repeated_async(period, move |_uuid, _l| {
            let events = events.clone();
            let event = AlarmEvent {
                name: alarm_name.clone(),
            };
            Box::pin(async move {
                if events.send(event).await.is_err() {
                    tracing::debug!("Alarm fired with no listener");
                }
            })
        })?;

        let job_id = self.scheduler.add(job).await?;
        self.jobs.write().await.insert(name.to_string(), job_id);

        tracing::info!("Scheduled alarm {} every {:?}", name, period);
        Ok(())
    }

    pub async fn shutdown(&self) -> Result<()> {
        let mut scheduler = self.scheduler.clone();
        scheduler.shutdown().await?;
        tracing::info!("Alarm scheduler shutdown");
        Ok(())
    }
}

#[async_trait]
impl Alarms for CronAlarms {
    async fn create(&self, name: &str, period_minutes: u64) -> Result<()> {
        let seconds = validate_interval(period_minutes)?
            .checked_mul(60)
            .ok_or_else(|| AppError::Validation("Check interval is too large".to_string()))?;
        self.create_with_period(name, Duration::from_secs(seconds))
            .await
    }

    async fn clear(&self, name: &str) -> Result<bool> {
        let removed = self.jobs.write().await.remove(name);
        match removed {
            Some(job_id) => {
                self.scheduler.remove(&job_id).await?;
                tracing::debug!("Cleared alarm {} (job: {})", name, job_id);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
