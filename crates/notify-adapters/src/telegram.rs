use std::time::Duration;

use async_trait::async_trait;
use domains::{DomainError, DomainResult, Notifier};
use serde::Serialize;
use tracing::{debug, instrument};

const API_BASE: &str = "https://api.telegram.org";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'static str,
}

/// Posts each message to a single chat through the Telegram Bot API.
pub struct TelegramNotifier {
    client: reqwest::Client,
    endpoint: String,
    chat_id: String,
}

impl TelegramNotifier {
    pub fn new(token: &str, chat_id: impl Into<String>) -> DomainResult<Self> {
        Self::with_base(API_BASE, token, chat_id)
    }

    /// Same as [`TelegramNotifier::new`] against a custom API host.
    pub fn with_base(base: &str, token: &str, chat_id: impl Into<String>) -> DomainResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| DomainError::Internal(format!("http client: {e}")))?;
        Ok(Self {
            client,
            endpoint: format!("{}/bot{token}/sendMessage", base.trim_end_matches('/')),
            chat_id: chat_id.into(),
        })
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    #[instrument(skip_all)]
    async fn send(&self, text: &str) -> DomainResult<()> {
        let body = SendMessage {
            chat_id: &self.chat_id,
            text,
            parse_mode: "Markdown",
        };
        let response = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| DomainError::Internal(format!("telegram request failed: {}", e.without_url())))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DomainError::Internal(format!("telegram responded {status}")));
        }
        debug!("telegram message delivered");
        Ok(())
    }
}
