//! Notification module
//!
//! # Overview
//!
//! The notify module provides:
//! - `Notifier` - Trait for delivering a report of new records
//! - `TelegramNotifier` - Telegram Bot API sender
//! - `NoopNotifier` - Stand-in when credentials are absent
//! - `CiOutput` - `GITHUB_OUTPUT` writer for CI workflows

mod ci;
mod report;
mod telegram;

pub use ci::CiOutput;
pub use report::{escape_markdown, format_report, split_message, test_message, TELEGRAM_MESSAGE_LIMIT};
pub use telegram::TelegramNotifier;

use crate::config::TelegramConfig;
use crate::error::Result;
use crate::http::{HttpClient, HttpClientConfig};
use crate::types::MatchedRecord;
use async_trait::async_trait;
use std::time::Duration;
use tracing::info;

/// Delivers reports about newly found records
#[async_trait]
pub trait Notifier: Send + Sync + std::fmt::Debug {
    /// Report newly found records
    async fn notify(&self, records: &[MatchedRecord]) -> Result<()>;

    /// Send a free-form message
    async fn send_text(&self, text: &str) -> Result<()>;
}

/// Notifier that only logs
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    async fn notify(&self, records: &[MatchedRecord]) -> Result<()> {
        info!(
            "Telegram not configured, skipping notification for {} records",
            records.len()
        );
        Ok(())
    }

    async fn send_text(&self, _text: &str) -> Result<()> {
        info!("Telegram not configured, message not sent");
        Ok(())
    }
}

/// Telegram notifier when token and chat id are set, otherwise a no-op
pub fn notifier_from_config(config: &TelegramConfig) -> Result<Box<dyn Notifier>> {
    let Some((token, chat_id)) = config.credentials() else {
        return Ok(Box::new(NoopNotifier));
    };

    let client = HttpClient::with_config(
        HttpClientConfig::builder()
            .timeout(Duration::from_secs(20))
            .max_retries(2)
            .no_rate_limit()
            .build(),
    )?;

    Ok(Box::new(TelegramNotifier::new(
        client,
        config.api_base.clone(),
        token,
        chat_id,
    )))
}

#[cfg(test)]
mod tests;
