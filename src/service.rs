use std::future::Future;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::messaging::{Envelope, PRICE_CHECK_COMPLETED, Request, Response};
use crate::models::{PersistedState, keys};
use crate::notifier::NotificationEvent;
use crate::orchestrator::{Orchestrator, Trigger};
use crate::scheduler::{AlarmEvent, Alarms, validate_interval};
use crate::utils::error::Result;

/// Receiving ends of everything the service reacts to.
pub struct ServiceChannels {
    pub alarms: mpsc::Receiver<AlarmEvent>,
    pub requests: mpsc::Receiver<Envelope>,
    pub notification_events: mpsc::Receiver<NotificationEvent>,
}

/// The long-running watcher: owns the alarm and answers bus requests.
pub struct WatcherService {
    orchestrator: Arc<Orchestrator>,
    alarms: Arc<dyn Alarms>,
    alarm_name: String,
    default_interval: u64,
}

impl WatcherService {
    pub fn new(
        orchestrator: Arc<Orchestrator>,
        alarms: Arc<dyn Alarms>,
        alarm_name: &str,
        default_interval: u64,
    ) -> Self {
        Self {
            orchestrator,
            alarms,
            alarm_name: alarm_name.to_string(),
            default_interval,
        }
    }

    pub fn orchestrator(&self) -> &Arc<Orchestrator> {
        &self.orchestrator
    }

    /// Registers the alarm. A stored interval wins over the configured one.
    /// Returns the period in minutes.
    pub async fn start(&self) -> Result<u64> {
        let values = self
            .orchestrator
            .store()
            .get(&[keys::CHECK_INTERVAL_MINUTES])
            .await?;

        let minutes = if values.contains_key(keys::CHECK_INTERVAL_MINUTES) {
            PersistedState::from_values(&values).check_interval_minutes
        } else {
            self.default_interval
        };

        self.alarms.create(&self.alarm_name, minutes).await?;
        tracing::info!("Price check alarm {} set to every {} minutes", self.alarm_name, minutes);
        Ok(minutes)
    }

    pub async fn set_check_interval(&self, minutes: u64) -> Result<()> {
        let minutes = validate_interval(minutes)?;

        self.alarms.create(&self.alarm_name, minutes).await?;
        self.orchestrator
            .store()
            .set(PersistedState::interval_values(minutes))
            .await?;

        tracing::info!("Check interval changed to {} minutes", minutes);
        Ok(())
    }

    /// Runs until `shutdown` resolves or every channel is closed.
    pub async fn run<F>(self: Arc<Self>, mut channels: ServiceChannels, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!("Watcher service shutting down");
                    break;
                }
                Some(event) = channels.alarms.recv() => self.handle_alarm(event),
                Some(envelope) = channels.requests.recv() => self.handle_request(envelope).await,
                Some(event) = channels.notification_events.recv() => {
                    if let Err(e) = self.orchestrator.handle_notification_event(event).await {
                        tracing::error!("Failed to handle notification event: {}", e);
                    }
                }
                else => {
                    tracing::info!("All watcher channels closed");
                    break;
                }
            }
        }

        if let Err(e) = self.alarms.clear(&self.alarm_name).await {
            tracing::warn!("Failed to clear alarm {}: {}", self.alarm_name, e);
        }
        Ok(())
    }

    fn handle_alarm(&self, event: AlarmEvent) {
        if event.name != self.alarm_name {
            tracing::debug!("Ignoring alarm {}", event.name);
            return;
        }

        tracing::info!("Price check alarm triggered");
        let orchestrator = Arc::clone(&self.orchestrator);
        tokio::spawn(async move {
            orchestrator.run_cycle_logged(Trigger::Alarm).await;
        });
    }

    async fn handle_request(&self, envelope: Envelope) {
        tracing::debug!("Service received message: {:?}", envelope.request);

        match &envelope.request {
            Request::ManualPriceCheck => {
                let orchestrator = Arc::clone(&self.orchestrator);
                tokio::spawn(async move {
                    orchestrator.run_cycle_logged(Trigger::Manual).await;
                    envelope.respond(Response::Status(PRICE_CHECK_COMPLETED.to_string()));
                });
            }
            Request::GetProductData => {
                let orchestrator = Arc::clone(&self.orchestrator);
                tokio::spawn(async move {
                    let response = product_data(&orchestrator).await;
                    envelope.respond(response);
                });
            }
            Request::SetCheckInterval { minutes } => {
                let minutes = *minutes;
                let response = match self.set_check_interval(minutes).await {
                    Ok(()) => Response::Status(format!("Check interval set to {} minutes", minutes)),
                    Err(e) => Response::Error(e.to_string()),
                };
                envelope.respond(response);
            }
        }
    }
}

/// Extraction on the active page, for display only.
async fn product_data(orchestrator: &Orchestrator) -> Response {
    let pages = orchestrator.pages();

    let page = match pages.active_page().await {
        Ok(Some(page)) => page,
        Ok(None) => return Response::Error("No active page".to_string()),
        Err(e) => return Response::Error(e.to_string()),
    };

    match pages.extract(&page).await {
        Ok(Some(snapshot)) => Response::ProductData(snapshot),
        Ok(None) => Response::NoProductData,
        Err(e) => Response::Error(e.to_string()),
    }
}
