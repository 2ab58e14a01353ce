//! Telegram messaging sink.

use crate::config::MessagingConfig;
use crate::domain::errors::UpstreamError;
use crate::domain::ports::MessagingSink;
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

const TELEGRAM_API: &str = "https://api.telegram.org";

/// Telegram bot sink. Message sends are fire-and-log: the session never
/// fails because a broadcast did.
pub struct TelegramSink {
    client: Client,
    bot_token: String,
}

impl TelegramSink {
    pub fn new(config: &MessagingConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.send_timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            bot_token: config.bot_token.clone(),
        }
    }

    fn endpoint(&self, method: &str) -> String {
        format!("{}/bot{}/{}", TELEGRAM_API, self.bot_token, method)
    }
}

#[derive(Serialize)]
struct SendMessageBody<'a> {
    chat_id: &'a str,
    text: &'a str,
}

fn classify(e: reqwest::Error) -> UpstreamError {
    if e.is_timeout() || e.is_connect() {
        UpstreamError::Transient(e.to_string())
    } else {
        UpstreamError::Permanent(e.to_string())
    }
}

fn check_status(status: reqwest::StatusCode) -> Result<(), UpstreamError> {
    if status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
        return Err(UpstreamError::Transient(format!("HTTP {}", status)));
    }
    if status.is_client_error() {
        return Err(UpstreamError::Permanent(format!("HTTP {}", status)));
    }
    Ok(())
}

#[async_trait]
impl MessagingSink for TelegramSink {
    async fn send_text(&self, channel: &str, message: &str) -> Result<(), UpstreamError> {
        let response = self
            .client
            .post(self.endpoint("sendMessage"))
            .json(&SendMessageBody {
                chat_id: channel,
                text: message,
            })
            .send()
            .await
            .map_err(classify)?;

        check_status(response.status())?;
        debug!("Sent {} chars to {}", message.chars().count(), channel);
        Ok(())
    }

    async fn send_document(&self, channel: &str, path: &Path) -> Result<(), UpstreamError> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| UpstreamError::Permanent(format!("read {}: {}", path.display(), e)))?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document".to_string());

        let form = reqwest::multipart::Form::new()
            .text("chat_id", channel.to_string())
            .part(
                "document",
                reqwest::multipart::Part::bytes(bytes).file_name(file_name),
            );

        let response = self
            .client
            .post(self.endpoint("sendDocument"))
            .multipart(form)
            .send()
            .await
            .map_err(classify)?;

        check_status(response.status())?;
        debug!("Sent document {} to {}", path.display(), channel);
        Ok(())
    }
}
