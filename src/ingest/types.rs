// src/ingest/types.rs
use anyhow::Result;
use chrono::{DateTime, Utc};

/// A single candidate article flowing through the pipeline.
///
/// `body` is only ever replaced by enrichment with strictly longer text.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct Item {
    pub id: String,
    pub source: String, // e.g., "Hacker News", "Lobsters"
    pub title: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default = "default_language")]
    pub language: String,
}

fn default_language() -> String {
    "en".to_string()
}

impl Item {
    pub fn new(id: impl Into<String>, source: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            title: title.into(),
            url: None,
            body: String::new(),
            published_at: None,
            language: default_language(),
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    pub fn body_chars(&self) -> usize {
        self.body.chars().count()
    }
}

/// A statically registered producer of items (RSS poller, API client, fixture...).
#[async_trait::async_trait]
pub trait ItemSource: Send + Sync {
    async fn fetch_latest(&self) -> Result<Vec<Item>>;
    fn name(&self) -> &'static str;
}
