//! Telegram Bot API `sendMessage` notifier.

use crate::config::TelegramConfig;
use crate::notify::{Notifier, NotifyError};
use crate::retry::RetryPolicy;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Deserialize)]
struct ApiReply {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

pub struct TelegramNotifier {
    http: Client,
    endpoint: String,
    chat_id: String,
    retry: RetryPolicy,
}

impl TelegramNotifier {
    pub fn new(config: &TelegramConfig, retry: RetryPolicy) -> Result<Self, reqwest::Error> {
        let http = Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Self {
            http,
            endpoint: format!(
                "{}/bot{}/sendMessage",
                config.api_url.trim_end_matches('/'),
                config.bot_token
            ),
            chat_id: config.chat_id.clone(),
            retry,
        })
    }

    async fn send_once(&self, text: &str) -> Result<(), NotifyError> {
        let resp = self
            .http
            .get(&self.endpoint)
            .query(&[
                ("chat_id", self.chat_id.as_str()),
                ("text", text),
                ("parse_mode", "Markdown"),
                ("disable_web_page_preview", "true"),
            ])
            .send()
            .await
            // The URL carries the bot token.
            .map_err(|e| NotifyError::Transport(e.without_url().to_string()))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| NotifyError::Transport(e.without_url().to_string()))?;
        check_reply(status, &body)
    }
}

/// Map a `sendMessage` reply to success or a typed failure.
///
/// Server errors and rate limiting are transient; any other non-2xx or an
/// `ok: false` body means Telegram refused the message.
fn check_reply(status: StatusCode, body: &str) -> Result<(), NotifyError> {
    if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
        return Err(NotifyError::Http(status.as_u16()));
    }
    let reply: Option<ApiReply> = serde_json::from_str(body).ok();
    match reply {
        Some(ApiReply { ok: true, .. }) if status.is_success() => Ok(()),
        Some(ApiReply { description, .. }) => Err(NotifyError::Rejected(
            description.unwrap_or_else(|| format!("HTTP {}", status.as_u16())),
        )),
        None if status.is_success() => {
            Err(NotifyError::Rejected("unreadable reply".to_string()))
        }
        None => Err(NotifyError::Rejected(format!("HTTP {}", status.as_u16()))),
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, text: &str) -> Result<(), NotifyError> {
        self.retry
            .run("telegram sendMessage", || self.send_once(text))
            .await?;
        debug!(chars = text.len(), "telegram message sent");
        Ok(())
    }
}
