//! HTML → article text.
//!
//! - Primary strategy: paragraph-level main-content extraction (DOM walk via `scraper`),
//!   scoped to `<article>`, then `<main>`/`[role=main]`, then the whole document.
//! - Secondary strategy: strip non-content blocks (script/style/nav/header/footer/...)
//!   with regexes, drop the remaining tags, decode entities, normalize whitespace.
//!
//! The secondary runs only when the primary result is below `min_chars`; the longer
//! of the two results then goes through the quality gate:
//! - empty                          → `extract_empty`
//! - bot wall markers on short page → `blocked`
//! - below `min_chars`              → `extract_low_quality`
//! - junk ratio > `max_junk_ratio`  → `extract_low_quality`
//!
//! Junk ratio = junk tokens / all whitespace-delimited tokens, where a token is junk
//! when it looks like a URL or contains one of the configured junk markers.

use once_cell::sync::OnceCell;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use super::error::ErrorKind;
use crate::config::EnrichConfig;
use crate::ingest::{collapse_whitespace, normalize_text};

const BOT_WALL_MARKERS: &[&str] = &[
    "captcha",
    "access denied",
    "are you a robot",
    "verify you are human",
    "checking your browser",
    "enable javascript and cookies",
];

/// Acceptance test for extracted text.
#[derive(Debug, Clone)]
pub struct QualityGate {
    pub min_chars: usize,
    pub max_junk_ratio: f64,
    pub junk_markers: Vec<String>,
}

impl QualityGate {
    pub fn from_config(cfg: &EnrichConfig) -> Self {
        Self {
            min_chars: cfg.min_chars,
            max_junk_ratio: cfg.max_junk_ratio,
            junk_markers: cfg
                .junk_markers
                .iter()
                .map(|m| m.to_lowercase())
                .filter(|m| !m.is_empty())
                .collect(),
        }
    }

    /// Run both strategies as needed and gate the result.
    pub fn extract(&self, html: &str) -> Result<String, ErrorKind> {
        let mut text = primary_extract(html);
        if text.chars().count() < self.min_chars {
            let fallback = secondary_extract(html);
            if fallback.chars().count() > text.chars().count() {
                text = fallback;
            }
        }
        self.check(html, text)
    }

    fn check(&self, html: &str, text: String) -> Result<String, ErrorKind> {
        if text.is_empty() {
            return Err(ErrorKind::ExtractEmpty);
        }
        let len = text.chars().count();
        if len < self.min_chars {
            if looks_like_bot_wall(html) {
                return Err(ErrorKind::Blocked);
            }
            return Err(ErrorKind::ExtractLowQuality);
        }
        if junk_ratio(&text, &self.junk_markers) > self.max_junk_ratio {
            return Err(ErrorKind::ExtractLowQuality);
        }
        Ok(text)
    }
}

fn selectors() -> &'static [Selector] {
    static SELS: OnceCell<Vec<Selector>> = OnceCell::new();
    SELS.get_or_init(|| {
        [
            "article p, article li, article blockquote, article pre",
            "main p, main li, main blockquote, [role=main] p",
            "p, li, blockquote, pre",
        ]
        .iter()
        .filter_map(|s| Selector::parse(s).ok())
        .collect()
    })
}

/// Paragraph-level main-content extraction.
pub fn primary_extract(html: &str) -> String {
    let doc = Html::parse_document(html);
    for sel in selectors() {
        let blocks: Vec<String> = doc
            .select(sel)
            // a block nested in another matched block is already part of its text
            .filter(|el| {
                !el.ancestors()
                    .filter_map(ElementRef::wrap)
                    .any(|a| sel.matches(&a))
            })
            .map(|el| collapse_whitespace(&el.text().collect::<Vec<_>>().join(" ")))
            .filter(|t| t.chars().count() >= 2)
            .collect();
        if !blocks.is_empty() {
            return blocks.join("\n\n");
        }
    }
    String::new()
}

fn block_strippers() -> &'static [Regex] {
    static RES: OnceCell<Vec<Regex>> = OnceCell::new();
    RES.get_or_init(|| {
        let mut v: Vec<Regex> = [
            "script", "style", "nav", "header", "footer", "aside", "noscript", "form", "svg",
            "iframe",
        ]
        .iter()
        .filter_map(|tag| Regex::new(&format!(r"(?is)<{tag}\b[^>]*>.*?</{tag}\s*>")).ok())
        .collect();
        if let Ok(comments) = Regex::new(r"(?s)<!--.*?-->") {
            v.push(comments);
        }
        v
    })
}

/// Permissive fallback: DOM stripping + whitespace normalization.
pub fn secondary_extract(html: &str) -> String {
    let mut out = html.to_string();
    for re in block_strippers() {
        out = re.replace_all(&out, " ").to_string();
    }
    normalize_text(&out)
}

/// Share of tokens that are URLs or contain a junk marker (markers must be lowercase).
pub fn junk_ratio(text: &str, markers: &[String]) -> f64 {
    let mut total = 0usize;
    let mut junk = 0usize;
    for tok in text.split_whitespace() {
        total += 1;
        let t = tok.to_lowercase();
        let url_like =
            t.starts_with("http://") || t.starts_with("https://") || t.starts_with("www.");
        if url_like || markers.iter().any(|m| t.contains(m.as_str())) {
            junk += 1;
        }
    }
    if total == 0 {
        return 0.0;
    }
    junk as f64 / total as f64
}

fn looks_like_bot_wall(html: &str) -> bool {
    let lower = html.to_lowercase();
    BOT_WALL_MARKERS.iter().any(|m| lower.contains(m))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gate(min_chars: usize) -> QualityGate {
        let mut cfg = EnrichConfig::default();
        cfg.min_chars = min_chars;
        QualityGate::from_config(&cfg)
    }

    fn sentence(n: usize) -> String {
        (0..n)
            .map(|i| format!("The scheduler rebalanced shard {i} after the storage tier grew."))
            .collect::<Vec<_>>()
            .join(" ")
    }

    #[test]
    fn nested_blocks_are_emitted_once() {
        let html = "<html><body><article>\
                    <ul><li><p>Compaction moved to a background scheduler.</p></li></ul>\
                    <blockquote><p>Latency stayed flat under load.</p></blockquote>\
                    </article></body></html>";
        let text = primary_extract(html);
        assert_eq!(text.matches("Compaction moved").count(), 1);
        assert_eq!(text.matches("Latency stayed flat").count(), 1);
        assert_eq!(
            text,
            "Compaction moved to a background scheduler.\n\nLatency stayed flat under load."
        );
    }

    #[test]
    fn primary_prefers_article_paragraphs() {
        let html = format!(
            "<html><body><nav><p>Home</p></nav><article><p>{}</p><p>Second paragraph here.</p></article>\
             <footer><p>Footer text</p></footer></body></html>",
            sentence(2)
        );
        let text = primary_extract(&html);
        assert!(text.starts_with("The scheduler rebalanced shard 0"));
        assert!(text.contains("Second paragraph here."));
        assert!(!text.contains("Footer text"));
        assert!(!text.contains("Home"));
    }

    #[test]
    fn secondary_strips_chrome_blocks() {
        let html = "<html><head><style>p{color:red}</style><script>var x=1;</script></head>\
                    <body><nav>Menu links</nav><div>Body&nbsp;text <span>kept</span></div>\
                    <footer>© 2024</footer></body></html>";
        let text = secondary_extract(html);
        assert_eq!(text, "Body text kept");
    }

    #[test]
    fn secondary_rescues_div_only_pages() {
        let html = format!("<html><body><div class=\"content\">{}</div></body></html>", sentence(10));
        let text = gate(400).extract(&html).unwrap();
        assert!(text.chars().count() >= 400);
    }

    #[test]
    fn empty_page_is_extract_empty() {
        assert_eq!(
            gate(400).extract("<html><body><script>x()</script></body></html>"),
            Err(ErrorKind::ExtractEmpty)
        );
    }

    #[test]
    fn short_page_is_low_quality() {
        let html = "<html><body><article><p>Just a teaser.</p></article></body></html>";
        assert_eq!(gate(400).extract(html), Err(ErrorKind::ExtractLowQuality));
    }

    #[test]
    fn bot_wall_is_blocked() {
        let html = "<html><body><p>Checking your browser before accessing the site.</p></body></html>";
        assert_eq!(gate(400).extract(html), Err(ErrorKind::Blocked));
    }

    #[test]
    fn junk_heavy_page_is_low_quality() {
        let junk = "Subscribe to our newsletter! Accept cookies. Login Signup https://x.test/a ".repeat(20);
        let html = format!("<html><body><article><p>{junk}</p></article></body></html>");
        assert_eq!(gate(100).extract(&html), Err(ErrorKind::ExtractLowQuality));
    }

    #[test]
    fn junk_ratio_counts_urls_and_markers() {
        let markers = vec!["cookie".to_string()];
        let r = junk_ratio("read https://a.test cookies policy", &markers);
        assert!((r - 0.5).abs() < 1e-9);
        assert_eq!(junk_ratio("", &markers), 0.0);
    }
}
