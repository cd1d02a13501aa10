use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::engine::{AlertKind, Verdict};
use crate::utils::error::Result;

pub mod discord;
pub mod log;

pub use discord::DiscordNotifier;
pub use log::LogNotifier;

pub const VIEW_PRODUCT_BUTTON: &str = "View Product";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NotificationTemplate {
    Basic,
    Image,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NotificationButton {
    pub title: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Notification {
    pub id: Uuid,
    pub template: NotificationTemplate,
    pub alert: AlertKind,
    pub icon_url: String,
    pub title: String,
    pub message: String,
    /// 0 (low) to 2 (high).
    pub priority: u8,
    pub image_url: Option<String>,
    pub buttons: Vec<NotificationButton>,
    /// Where a click on the notification leads.
    pub product_url: Option<String>,
}

impl Notification {
    /// The product image, when known, switches to the image template; the
    /// "View Product" button is only offered when there is somewhere to go.
    pub fn from_verdict(
        verdict: &Verdict,
        icon_url: &str,
        image_url: Option<&str>,
        product_url: Option<&str>,
    ) -> Self {
        let image_url = image_url.filter(|u| !u.is_empty()).map(str::to_string);
        let product_url = product_url.filter(|u| !u.is_empty()).map(str::to_string);

        let buttons = if product_url.is_some() {
            vec![NotificationButton {
                title: VIEW_PRODUCT_BUTTON.to_string(),
            }]
        } else {
            Vec::new()
        };

        Self {
            id: Uuid::new_v4(),
            template: if image_url.is_some() {
                NotificationTemplate::Image
            } else {
                NotificationTemplate::Basic
            },
            alert: verdict.kind,
            icon_url: icon_url.to_string(),
            title: verdict.title.clone(),
            message: verdict.message.clone(),
            priority: verdict.severity.priority(),
            image_url,
            buttons,
            product_url,
        }
    }
}

/// User interaction with a delivered notification.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NotificationEvent {
    Clicked { id: Uuid },
    ButtonClicked { id: Uuid, button_index: usize },
}

/// A channel notifications are delivered on.
#[async_trait]
pub trait Notifier: Send + Sync {
    fn name(&self) -> &str;
    async fn notify(&self, notification: &Notification) -> Result<()>;
}

/// Delivers to every registered notifier; one failing does not stop the
/// others.
#[derive(Default)]
pub struct NotifierSet {
    notifiers: Vec<Box<dyn Notifier>>,
}

impl NotifierSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, notifier: Box<dyn Notifier>) -> Self {
        self.notifiers.push(notifier);
        self
    }

    pub fn names(&self) -> Vec<&str> {
        self.notifiers.iter().map(|n| n.name()).collect()
    }
}

#[async_trait]
impl Notifier for NotifierSet {
    fn name(&self) -> &str {
        "set"
    }

    /// Succeeds if at least one notifier delivered (or none are registered).
    async fn notify(&self, notification: &Notification) -> Result<()> {
        let mut last_error = None;
        let mut delivered = 0;

        for notifier in &self.notifiers {
            match notifier.notify(notification).await {
                Ok(()) => delivered += 1,
                Err(e) => {
                    tracing::warn!("Notifier {} failed: {}", notifier.name(), e);
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(e) if delivered == 0 => Err(e),
            _ => Ok(()),
        }
    }
}
