// src/ingest/mod.rs
//! Boundary to the ingestion collaborator: statically registered item sources
//! and the text normalization shared with the extraction strategies.

pub mod types;

use crate::ingest::types::{Item, ItemSource};
use metrics::{counter, describe_counter};
use once_cell::sync::OnceCell;

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("ingest_items_total", "Items received from sources.");
        describe_counter!("ingest_source_errors_total", "Source fetch/parse errors.");
    });
}

/// Normalize text: decode entities, strip tags, unify quotes, collapse whitespace.
pub fn normalize_text(s: &str) -> String {
    // 1) HTML entity decode
    let mut out = html_escape::decode_html_entities(s).to_string();

    // 2) Strip HTML tags
    static RE_TAGS: OnceCell<regex::Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[^>]+>").unwrap());
    out = re_tags.replace_all(&out, " ").to_string();

    // 3) Normalize “ ” ‘ ’ « » to ASCII quotes
    out = out
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    collapse_whitespace(&out)
}

/// Collapse any whitespace run (incl. non-breaking spaces) into one space and trim.
pub fn collapse_whitespace(s: &str) -> String {
    static RE_WS: OnceCell<regex::Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"[\s\u{00A0}]+").unwrap());
    re_ws.replace_all(s, " ").trim().to_string()
}

/// Pull the latest items from every registered source, in registration order.
/// A failing source is logged and skipped; it never aborts the collection.
pub async fn collect_items(sources: &[Box<dyn ItemSource>]) -> Vec<Item> {
    ensure_metrics_described();

    let mut out = Vec::new();
    for s in sources {
        match s.fetch_latest().await {
            Ok(mut v) => {
                counter!("ingest_items_total").increment(v.len() as u64);
                out.append(&mut v);
            }
            Err(e) => {
                tracing::warn!(target: "ingest", error = ?e, source = s.name(), "source error");
                counter!("ingest_source_errors_total").increment(1);
            }
        }
    }
    out
}

/// Source backed by an in-memory list (fixtures, replay files, tests).
pub struct StaticSource {
    name: &'static str,
    items: Vec<Item>,
}

impl StaticSource {
    pub fn new(name: &'static str, items: Vec<Item>) -> Self {
        Self { name, items }
    }
}

#[async_trait::async_trait]
impl ItemSource for StaticSource {
    async fn fetch_latest(&self) -> anyhow::Result<Vec<Item>> {
        Ok(self.items.clone())
    }

    fn name(&self) -> &'static str {
        self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_text_strips_tags_and_collapses_ws() {
        let s = "  <p>Hello,&nbsp;&nbsp; <b>world</b></p>\n\n &ldquo;ok&rdquo; ";
        let out = normalize_text(s);
        assert_eq!(out, "Hello, world \"ok\"");
    }

    #[test]
    fn collapse_whitespace_handles_nbsp() {
        assert_eq!(collapse_whitespace("a\u{00A0}\u{00A0}b\t\nc "), "a b c");
    }

    struct Broken;

    #[async_trait::async_trait]
    impl ItemSource for Broken {
        async fn fetch_latest(&self) -> anyhow::Result<Vec<Item>> {
            anyhow::bail!("feed unreachable")
        }
        fn name(&self) -> &'static str {
            "broken"
        }
    }

    #[tokio::test]
    async fn failing_source_does_not_abort_collection() {
        let sources: Vec<Box<dyn ItemSource>> = vec![
            Box::new(StaticSource::new("a", vec![Item::new("1", "a", "first")])),
            Box::new(Broken),
            Box::new(StaticSource::new("b", vec![Item::new("2", "b", "second")])),
        ];
        let items = collect_items(&sources).await;
        let ids: Vec<_> = items.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2"]);
    }
}
