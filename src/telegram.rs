//! Telegram Bot API gateway
//!
//! Sends ad posts and payout notices through `sendMessage`. When no bot token
//! is configured the server falls back to [`LogGateway`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info, warn};

use crate::models::{ChannelId, UserId};
use crate::notify::{NotificationGateway, NotifyError};

pub const DEFAULT_API_BASE: &str = "https://api.telegram.org";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: i64,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_markup: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    error_code: Option<i64>,
    #[serde(default)]
    description: Option<String>,
}

pub fn ad_post_text(ad_text: &str) -> String {
    format!("📢 {}\n\n🔗 Learn more via the link below.", ad_text)
}

fn http_error(e: reqwest::Error) -> NotifyError {
    NotifyError::Http(e.without_url())
}

pub struct TelegramGateway {
    client: Client,
    api_base: String,
    token: String,
}

impl TelegramGateway {
    pub fn new(token: impl Into<String>, api_base: &str) -> Self {
        let client = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .unwrap_or_else(|_| Client::new());

        info!("Telegram gateway initialized");
        Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_base, self.token, method)
    }

    async fn send_message(&self, message: &SendMessage<'_>) -> Result<(), NotifyError> {
        let resp = self
            .client
            .post(self.method_url("sendMessage"))
            .json(message)
            .send()
            .await
            .map_err(http_error)?;

        let status = resp.status();
        let body: ApiResponse = resp.json().await.map_err(http_error)?;
        if body.ok {
            debug!("sendMessage to {} succeeded", message.chat_id);
            Ok(())
        } else {
            Err(NotifyError::Api {
                code: body.error_code.unwrap_or(status.as_u16() as i64),
                description: body
                    .description
                    .unwrap_or_else(|| "Unknown error".to_string()),
            })
        }
    }
}

#[async_trait]
impl NotificationGateway for TelegramGateway {
    async fn post_ad(
        &self,
        channel_id: ChannelId,
        ad_text: &str,
        ad_link: &str,
    ) -> Result<(), NotifyError> {
        let text = ad_post_text(ad_text);
        let message = SendMessage {
            chat_id: channel_id,
            text: &text,
            reply_markup: Some(json!({
                "inline_keyboard": [[{ "text": "🔗 Visit", "url": ad_link }]]
            })),
        };
        self.send_message(&message).await?;
        info!("Ad posted to channel {}", channel_id);
        Ok(())
    }

    async fn notify_user(&self, user_id: UserId, text: &str) -> Result<(), NotifyError> {
        let message = SendMessage {
            chat_id: user_id,
            text,
            reply_markup: None,
        };
        self.send_message(&message).await?;
        info!("Notification sent to user {}", user_id);
        Ok(())
    }
}

/// Gateway used when no bot token is configured
pub struct LogGateway;

#[async_trait]
impl NotificationGateway for LogGateway {
    async fn post_ad(
        &self,
        channel_id: ChannelId,
        ad_text: &str,
        ad_link: &str,
    ) -> Result<(), NotifyError> {
        warn!(
            "No bot token configured; would post ad to {}: {} ({})",
            channel_id, ad_text, ad_link
        );
        Ok(())
    }

    async fn notify_user(&self, user_id: UserId, text: &str) -> Result<(), NotifyError> {
        warn!(
            "No bot token configured; would notify user {}: {}",
            user_id,
            text.lines().find(|l| !l.is_empty()).unwrap_or_default()
        );
        Ok(())
    }
}
