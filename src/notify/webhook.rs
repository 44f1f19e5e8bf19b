use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use super::{BatchSummary, DeliveryStatus, Notifier};

pub const ENV_WEBHOOK_URL: &str = "DIGEST_WEBHOOK_URL";

/// JSON POST of the batch summary to a single URL.
#[derive(Clone)]
pub struct WebhookNotifier {
    url: Option<String>,
    client: Client,
    timeout: Duration,
    max_retries: u8,
}

impl WebhookNotifier {
    pub fn from_env() -> Self {
        Self::new(
            std::env::var(ENV_WEBHOOK_URL)
                .ok()
                .filter(|u| !u.trim().is_empty()),
        )
    }

    pub fn new(url: Option<String>) -> Self {
        Self {
            url,
            client: Client::new(),
            timeout: Duration::from_secs(5),
            max_retries: 2,
        }
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout = Duration::from_secs(secs);
        self
    }

    pub fn with_retries(mut self, retries: u8) -> Self {
        self.max_retries = retries;
        self
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    fn name(&self) -> &'static str {
        "webhook"
    }

    async fn deliver(&self, summary: &BatchSummary) -> DeliveryStatus {
        let Some(url) = &self.url else {
            return DeliveryStatus::Skipped;
        };

        let mut attempt: u8 = 0;
        loop {
            attempt += 1;
            let res = self
                .client
                .post(url)
                .timeout(self.timeout)
                .json(summary)
                .send()
                .await;

            let err = match res {
                Ok(rsp) => match rsp.error_for_status() {
                    Ok(_) => return DeliveryStatus::Delivered,
                    Err(e) => format!("webhook HTTP error: {e}"),
                },
                Err(e) => format!("webhook request failed: {e}"),
            };
            if attempt > self.max_retries {
                return DeliveryStatus::Failed(err);
            }
            tokio::time::sleep(Duration::from_millis(500u64 << (attempt - 1))).await;
        }
    }
}
