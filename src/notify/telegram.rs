//! Telegram Bot API notifier

use super::report::{format_report, split_message, TELEGRAM_MESSAGE_LIMIT};
use super::Notifier;
use crate::error::{Error, Result};
use crate::http::HttpClient;
use crate::types::MatchedRecord;
use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

/// Subset of the Bot API response envelope
#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

/// Sends reports to a Telegram chat
pub struct TelegramNotifier {
    client: HttpClient,
    api_base: String,
    token: String,
    chat_id: String,
}

impl TelegramNotifier {
    /// Create a new Telegram notifier
    pub fn new(
        client: HttpClient,
        api_base: impl Into<String>,
        token: impl Into<String>,
        chat_id: impl Into<String>,
    ) -> Self {
        Self {
            client,
            api_base: api_base.into(),
            token: token.into(),
            chat_id: chat_id.into(),
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/bot{}/sendMessage",
            self.api_base.trim_end_matches('/'),
            self.token
        )
    }

    /// Send one Markdown message
    pub async fn send_message(&self, text: &str) -> Result<()> {
        let body = json!({
            "chat_id": self.chat_id,
            "text": text,
            "parse_mode": "Markdown",
            "disable_web_page_preview": true,
        });

        let api: ApiResponse = self
            .client
            .post_json(&self.endpoint(), &body)
            .await
            .map_err(|e| Error::notify(format!("sendMessage failed: {}", self.redact(&e.to_string()))))?;

        if !api.ok {
            return Err(Error::notify(format!(
                "Telegram rejected message: {}",
                api.description.unwrap_or_else(|| "no description".to_string())
            )));
        }

        debug!("Sent Telegram message ({} chars)", text.chars().count());
        Ok(())
    }

    fn redact(&self, text: &str) -> String {
        text.replace(&self.token, "<token>")
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn notify(&self, records: &[MatchedRecord]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }

        let report = format_report(records, Utc::now());
        let messages = split_message(&report, TELEGRAM_MESSAGE_LIMIT);
        for message in &messages {
            self.send_message(message).await?;
        }

        info!(
            "Notified Telegram about {} records in {} messages",
            records.len(),
            messages.len()
        );
        Ok(())
    }

    async fn send_text(&self, text: &str) -> Result<()> {
        self.send_message(text).await
    }
}

impl std::fmt::Debug for TelegramNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramNotifier")
            .field("api_base", &self.api_base)
            .field("chat_id", &self.chat_id)
            .finish_non_exhaustive()
    }
}
