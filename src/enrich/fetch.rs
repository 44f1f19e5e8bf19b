//! Page access seam. `HttpFetcher` is the production implementation; tests plug
//! in instrumented fakes through the same trait.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};

use super::error::FetchFailure;

/// Single network call: fetch the raw page behind `url` within `timeout`.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str, timeout: Duration) -> Result<String, FetchFailure>;

    fn name(&self) -> &'static str {
        "page-fetcher"
    }
}

pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(user_agent: &str) -> anyhow::Result<Self> {
        let client = Client::builder()
            .user_agent(user_agent.to_string())
            .connect_timeout(Duration::from_secs(5))
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str, timeout: Duration) -> Result<String, FetchFailure> {
        let call = async {
            let resp = self
                .client
                .get(url)
                .send()
                .await
                .map_err(|e| classify_reqwest(e, timeout))?;

            let status = resp.status();
            if let Some(f) = classify_status(status) {
                return Err(f);
            }
            resp.text().await.map_err(|e| classify_reqwest(e, timeout))
        };

        match tokio::time::timeout(timeout, call).await {
            Ok(res) => res,
            Err(_) => Err(FetchFailure::Timeout(timeout)),
        }
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

/// Map a non-success status onto the taxonomy; `None` for 2xx.
pub fn classify_status(status: StatusCode) -> Option<FetchFailure> {
    if status.is_success() {
        return None;
    }
    match status.as_u16() {
        401 | 403 | 429 | 451 => Some(FetchFailure::Blocked(status.to_string())),
        code => Some(FetchFailure::Status(code)),
    }
}

fn classify_reqwest(e: reqwest::Error, timeout: Duration) -> FetchFailure {
    if e.is_timeout() {
        FetchFailure::Timeout(timeout)
    } else if let Some(status) = e.status() {
        classify_status(status).unwrap_or(FetchFailure::Status(status.as_u16()))
    } else {
        FetchFailure::Connection(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_classification() {
        assert_eq!(classify_status(StatusCode::OK), None);
        assert_eq!(
            classify_status(StatusCode::FORBIDDEN),
            Some(FetchFailure::Blocked("403 Forbidden".into()))
        );
        assert!(matches!(
            classify_status(StatusCode::TOO_MANY_REQUESTS),
            Some(FetchFailure::Blocked(_))
        ));
        assert_eq!(
            classify_status(StatusCode::NOT_FOUND),
            Some(FetchFailure::Status(404))
        );
        assert_eq!(
            classify_status(StatusCode::BAD_GATEWAY),
            Some(FetchFailure::Status(502))
        );
    }
}
