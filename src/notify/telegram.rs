use super::{AlertMessage, Notifier};
use anyhow::{anyhow, Result};
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

const API_BASE: &str = "https://api.telegram.org";

#[derive(Clone)]
pub struct TelegramNotifier {
    endpoint: String,
    chat_id: String,
    client: Client,
    timeout: Duration,
    max_retries: u8,
}

impl TelegramNotifier {
    pub fn new(bot_token: &str, chat_id: impl Into<String>) -> Self {
        Self::with_base_url(API_BASE, bot_token, chat_id)
    }

    /// Point at a different Bot API host (self-hosted server, tests).
    pub fn with_base_url(base: &str, bot_token: &str, chat_id: impl Into<String>) -> Self {
        Self {
            endpoint: format!("{}/bot{}/sendMessage", base.trim_end_matches('/'), bot_token),
            chat_id: chat_id.into(),
            client: Client::new(),
            timeout: Duration::from_secs(10),
            max_retries: 3,
        }
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout = Duration::from_secs(secs);
        self
    }

    pub fn with_retries(mut self, retries: u8) -> Self {
        self.max_retries = retries.max(1);
        self
    }

    async fn post_with_retry(&self, payload: &SendMessage<'_>) -> Result<()> {
        let mut attempt: u8 = 0;
        loop {
            attempt += 1;
            let res = self
                .client
                .post(&self.endpoint)
                .timeout(self.timeout)
                .json(payload)
                .send()
                .await;

            let err = match res {
                Ok(rsp) => match rsp.error_for_status_ref() {
                    Ok(_) => return Ok(()),
                    Err(e) => anyhow!("telegram HTTP error: {e}"),
                },
                Err(e) => anyhow!("telegram request failed: {e}"),
            };

            if attempt >= self.max_retries {
                return Err(err);
            }
            tracing::debug!(target: "notify", attempt, error = %err, "telegram send retry");
            tokio::time::sleep(Duration::from_millis(500u64 << (attempt - 1))).await;
        }
    }
}

#[async_trait::async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, msg: &AlertMessage) -> Result<()> {
        let payload = SendMessage {
            chat_id: &self.chat_id,
            text: &msg.text,
            parse_mode: "Markdown",
            disable_web_page_preview: true,
        };
        self.post_with_retry(&payload).await
    }
}

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'static str,
    disable_web_page_preview: bool,
}
