use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;

use super::{Notification, Notifier};
use crate::engine::AlertKind;
use crate::utils::error::{AppError, Result};

/// Posts alerts to a Discord webhook as a single embed.
pub struct DiscordNotifier {
    client: Client,
    webhook_url: String,
    username: String,
}

impl DiscordNotifier {
    pub fn new(webhook_url: &str, username: &str) -> Self {
        Self {
            client: Client::new(),
            webhook_url: webhook_url.to_string(),
            username: username.to_string(),
        }
    }

    fn embed_color(alert: AlertKind) -> u32 {
        match alert {
            AlertKind::Drop => 0x00ff00,     // Green for price drops
            AlertKind::Increase => 0xff9900, // Orange for price increases
            AlertKind::None => 0x0099ff,
        }
    }

    fn emoji(alert: AlertKind) -> &'static str {
        match alert {
            AlertKind::Drop => "📉",
            AlertKind::Increase => "📈",
            AlertKind::None => "📊",
        }
    }

    fn create_payload(&self, notification: &Notification) -> serde_json::Value {
        let mut embed = json!({
            "title": format!("{} {}", Self::emoji(notification.alert), notification.title),
            "description": notification.message,
            "color": Self::embed_color(notification.alert),
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "footer": { "text": "Price Watcher" },
        });

        // The embed title is the click-through to the product.
        if let Some(url) = &notification.product_url {
            embed["url"] = json!(url);
        }
        if let Some(image_url) = &notification.image_url {
            embed["thumbnail"] = json!({ "url": image_url });
        }

        json!({
            "username": self.username,
            "embeds": [embed],
        })
    }
}

#[async_trait]
impl Notifier for DiscordNotifier {
    fn name(&self) -> &str {
        "discord"
    }

    async fn notify(&self, notification: &Notification) -> Result<()> {
        let payload = self.create_payload(notification);

        let response = self
            .client
            .post(&self.webhook_url)
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AppError::Notification(format!(
                "Discord webhook returned {}",
                response.status()
            )));
        }

        tracing::debug!("Discord notification {} delivered", notification.id);
        Ok(())
    }
}
