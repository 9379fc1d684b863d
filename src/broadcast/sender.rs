//! Telegram delivery

use crate::error::{BotError, Result};
use serde_json::json;

const DEFAULT_BASE_URL: &str = "https://api.telegram.org";

/// Message delivery surface. Photo and text delivery are separate so
/// the handler can fall back from one to the other.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait AlertSender: Send + Sync {
    async fn send_text(&self, channel_id: &str, html: &str) -> Result<()>;
    async fn send_photo(&self, channel_id: &str, photo_url: &str, caption: &str) -> Result<()>;
}

/// Telegram Bot API sender.
#[derive(Clone)]
pub struct TelegramSender {
    client: reqwest::Client,
    base_url: String,
    bot_token: String,
    enabled: bool,
}

impl TelegramSender {
    pub fn new(bot_token: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            bot_token,
            enabled: true,
        }
    }

    /// A sender that logs instead of sending. Used when no bot token is
    /// configured.
    pub fn disabled() -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            bot_token: String::new(),
            enabled: false,
        }
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    async fn call(&self, method: &str, payload: serde_json::Value) -> Result<()> {
        let url = format!("{}/bot{}/{}", self.base_url, self.bot_token, method);
        let response = self.client.post(&url).json(&payload).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(BotError::Telegram(format!(
                "{} returned {}: {}",
                method, status, body
            )));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl AlertSender for TelegramSender {
    async fn send_text(&self, channel_id: &str, html: &str) -> Result<()> {
        if !self.enabled {
            tracing::info!(channel_id, "telegram disabled, skipping text message");
            return Ok(());
        }
        self.call(
            "sendMessage",
            json!({
                "chat_id": channel_id,
                "text": html,
                "parse_mode": "HTML",
                "disable_web_page_preview": true,
            }),
        )
        .await
    }

    async fn send_photo(&self, channel_id: &str, photo_url: &str, caption: &str) -> Result<()> {
        if !self.enabled {
            tracing::info!(channel_id, "telegram disabled, skipping photo message");
            return Ok(());
        }
        self.call(
            "sendPhoto",
            json!({
                "chat_id": channel_id,
                "photo": photo_url,
                "caption": caption,
                "parse_mode": "HTML",
            }),
        )
        .await
    }
}
