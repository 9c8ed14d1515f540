//! Telegram Bot API dispatcher.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{multipart, Client};
use serde::Deserialize;
use tracing::debug;

use crate::config::TelegramConfig;

use super::types::read_attachment;
use super::{DeliveryError, Dispatcher, Notification};

/// Sends chat messages through a Telegram bot.
///
/// Text-only notifications go out as `sendMessage`; notifications with an
/// attachment go out as `sendDocument` with the text as caption.
pub struct TelegramDispatcher {
    client: Client,
    config: TelegramConfig,
}

/// Envelope returned by every Bot API method.
#[derive(Debug, Deserialize)]
struct BotApiResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

impl TelegramDispatcher {
    pub fn new(config: TelegramConfig) -> Result<Self, DeliveryError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs as u64))
            .build()?;

        Ok(Self { client, config })
    }

    fn method_url(&self, method: &str) -> String {
        format!(
            "{}/bot{}/{}",
            self.config.api_base.trim_end_matches('/'),
            self.config.bot_token,
            method
        )
    }

    async fn check_response(response: reqwest::Response) -> Result<(), DeliveryError> {
        let status = response.status();
        let body = response.text().await?;
        parse_reply(status.as_u16(), &body)
    }
}

/// Interpret a Bot API reply body.
fn parse_reply(status: u16, body: &str) -> Result<(), DeliveryError> {
    match serde_json::from_str::<BotApiResponse>(body) {
        Ok(reply) if reply.ok => Ok(()),
        Ok(reply) => Err(DeliveryError::Rejected {
            channel: "telegram".to_string(),
            reason: reply
                .description
                .unwrap_or_else(|| format!("HTTP {}", status)),
        }),
        Err(_) => Err(DeliveryError::Rejected {
            channel: "telegram".to_string(),
            reason: format!(
                "HTTP {}: {}",
                status,
                body.chars().take(100).collect::<String>()
            ),
        }),
    }
}

#[async_trait]
impl Dispatcher for TelegramDispatcher {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn send(&self, notification: &Notification) -> Result<(), DeliveryError> {
        let response = match &notification.attachment {
            None => {
                let payload = serde_json::json!({
                    "chat_id": self.config.chat_id,
                    "text": notification.text,
                });
                self.client
                    .post(self.method_url("sendMessage"))
                    .json(&payload)
                    .send()
                    .await?
            }
            Some(attachment) => {
                let data = read_attachment(attachment).await?;
                let part = multipart::Part::bytes(data)
                    .file_name(attachment.file_name.clone())
                    .mime_str(&attachment.content_type)
                    .map_err(|e| DeliveryError::Message(e.to_string()))?;
                let form = multipart::Form::new()
                    .text("chat_id", self.config.chat_id.clone())
                    .text("caption", notification.text.clone())
                    .part("document", part);

                self.client
                    .post(self.method_url("sendDocument"))
                    .multipart(form)
                    .send()
                    .await?
            }
        };

        Self::check_response(response).await?;
        debug!(chat_id = %self.config.chat_id, "Telegram message sent");
        Ok(())
    }
}
