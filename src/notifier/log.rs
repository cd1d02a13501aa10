use async_trait::async_trait;

use super::{Notification, Notifier};
use crate::engine::AlertKind;
use crate::utils::error::Result;

/// Writes notifications to the log. Always registered, so an alert is
/// never lost even with no other channel configured.
#[derive(Debug, Default)]
pub struct LogNotifier;

impl LogNotifier {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Notifier for LogNotifier {
    fn name(&self) -> &str {
        "log"
    }

    async fn notify(&self, notification: &Notification) -> Result<()> {
        match notification.alert {
            AlertKind::Increase => tracing::warn!(
                id = %notification.id,
                priority = notification.priority,
                "{}: {}",
                notification.title,
                notification.message
            ),
            _ => tracing::info!(
                id = %notification.id,
                priority = notification.priority,
                "{}: {}",
                notification.title,
                notification.message
            ),
        }
        Ok(())
    }
}
