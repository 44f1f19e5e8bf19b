// src/enrich/mod.rs
//! Bounded-concurrency enrichment: replaces metadata-only item bodies with full
//! article text fetched from the item URL.
//!
//! Per item needing text:
//! 1) policy check (URL present, http(s), host not on the skip list)
//! 2) per attempt: acquire a global permit → wait the host's pacing slot → fetch,
//!    bounded by the per-request timeout
//! 3) transient failures retry with backoff (permit released while sleeping)
//! 4) primary/secondary extraction + quality gate
//! 5) substitute only when the accepted text is strictly longer than the current body
//!
//! The whole stage runs under a batch deadline; items still unresolved when it
//! expires get a terminal `timeout` outcome. No single item can abort the batch.

pub mod error;
pub mod extract;
pub mod fetch;
pub mod pacing;
pub mod retry;

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{debug, info, warn};

pub use error::{ErrorKind, FetchFailure};
pub use extract::QualityGate;
pub use fetch::{HttpFetcher, PageFetcher};
pub use pacing::{domain_of, DomainPacer};
pub use retry::RetryPolicy;

use crate::config::EnrichConfig;
use crate::ingest::types::Item;
use crate::metrics::MetricsCollector;

/// Result of one item's fetch attempt sequence. Built once, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichmentOutcome {
    pub item_id: String,
    /// Accepted article text; empty on failure.
    pub text: String,
    pub error: Option<ErrorKind>,
    pub latency: Duration,
    /// Network calls made (0 for policy skips).
    pub attempts: u32,
    /// Delays slept between attempts, in order.
    pub backoff: Vec<Duration>,
    /// Whether the item body was substituted with `text`.
    pub replaced: bool,
}

impl EnrichmentOutcome {
    fn failed(item_id: String, kind: ErrorKind, latency: Duration, attempts: u32) -> Self {
        Self {
            item_id,
            text: String::new(),
            error: Some(kind),
            latency,
            attempts,
            backoff: Vec::new(),
            replaced: false,
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Items in input order (bodies possibly replaced) + one outcome per attempted item.
#[derive(Debug, Clone)]
pub struct EnrichReport {
    pub items: Vec<Item>,
    pub outcomes: Vec<EnrichmentOutcome>,
}

impl EnrichReport {
    pub fn outcome_for(&self, item_id: &str) -> Option<&EnrichmentOutcome> {
        self.outcomes.iter().find(|o| o.item_id == item_id)
    }
}

/// Decide whether an item's body is a stub worth replacing.
///
/// Substantial bodies (>= `min_chars`) are never fetched. Otherwise fetch when the
/// body is empty, contains a metadata marker, repeats the title, or is short and
/// comes from a known low-content source.
pub fn needs_enrichment(item: &Item, cfg: &EnrichConfig) -> bool {
    let body = item.body.trim();
    if body.is_empty() {
        return true;
    }
    let len = body.chars().count();
    if len >= cfg.min_chars {
        return false;
    }
    let lower = body.to_lowercase();
    if cfg
        .boilerplate_markers
        .iter()
        .any(|m| !m.is_empty() && lower.contains(&m.to_lowercase()))
    {
        return true;
    }
    if lower == item.title.trim().to_lowercase() {
        return true;
    }
    let low_content = cfg
        .low_content_sources
        .iter()
        .any(|s| s.trim().eq_ignore_ascii_case(item.source.trim()));
    low_content && len < cfg.short_body_chars
}

/// Policy gate: returns `(url, domain)` or `None` when the item must not be fetched.
fn admit(item: &Item, cfg: &EnrichConfig) -> Option<(String, String)> {
    let url = item.url.as_deref()?.trim();
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return None;
    }
    let domain = domain_of(url)?;
    let denied = cfg.skip_domains.iter().any(|d| {
        let d = d.trim().to_ascii_lowercase();
        domain == d || domain.ends_with(&format!(".{d}"))
    });
    if denied {
        return None;
    }
    Some((url.to_string(), domain))
}

struct FetchJob {
    item_id: String,
    url: String,
    domain: String,
    current_len: usize,
    attempts: Arc<AtomicU32>,
}

/// Everything a spawned worker needs; cheap to clone.
#[derive(Clone)]
struct Worker {
    fetcher: Arc<dyn PageFetcher>,
    permits: Arc<Semaphore>,
    pacer: Arc<DomainPacer>,
    gate: Arc<QualityGate>,
    retry: RetryPolicy,
    timeout: Duration,
}

impl Worker {
    async fn run(self, job: FetchJob) -> EnrichmentOutcome {
        let started = Instant::now();
        let mut backoff = Vec::new();
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;
            job.attempts.store(attempt, Ordering::SeqCst);

            let result = {
                let _permit = match self.permits.acquire().await {
                    Ok(p) => p,
                    Err(_) => {
                        return EnrichmentOutcome::failed(
                            job.item_id,
                            ErrorKind::ConnectionError,
                            started.elapsed(),
                            attempt - 1,
                        )
                    }
                };
                self.pacer.wait_turn(&job.domain).await;
                // Bounded here even when the fetcher ignores `timeout`.
                tokio::time::timeout(self.timeout, self.fetcher.fetch(&job.url, self.timeout))
                    .await
                    .unwrap_or(Err(FetchFailure::Timeout(self.timeout)))
            };

            match result {
                Ok(html) => {
                    return match self.gate.extract(&html) {
                        Ok(text) => {
                            let replaced = text.chars().count() > job.current_len;
                            EnrichmentOutcome {
                                item_id: job.item_id,
                                text,
                                error: None,
                                latency: started.elapsed(),
                                attempts: attempt,
                                backoff,
                                replaced,
                            }
                        }
                        Err(kind) => {
                            debug!(target: "enrich", url = %job.url, %kind, "extraction rejected");
                            let mut o = EnrichmentOutcome::failed(
                                job.item_id,
                                kind,
                                started.elapsed(),
                                attempt,
                            );
                            o.backoff = backoff;
                            o
                        }
                    };
                }
                Err(failure) => {
                    let kind = failure.kind();
                    if kind.retryable() && attempt <= self.retry.max_retries {
                        let delay = self.retry.delay_for(attempt);
                        debug!(
                            target: "enrich",
                            url = %job.url,
                            attempt,
                            delay_ms = delay.as_millis() as u64,
                            error = %failure,
                            "transient fetch failure, retrying"
                        );
                        backoff.push(delay);
                        tokio::time::sleep(delay).await;
                        continue;
                    }
                    debug!(target: "enrich", url = %job.url, attempt, error = %failure, "fetch failed");
                    let mut o =
                        EnrichmentOutcome::failed(job.item_id, kind, started.elapsed(), attempt);
                    o.backoff = backoff;
                    return o;
                }
            }
        }
    }
}

/// Orchestrates enrichment for a batch. One instance can serve many batches;
/// the pacing map persists across them.
pub struct Enricher {
    cfg: EnrichConfig,
    worker: Worker,
}

impl Enricher {
    pub fn new(cfg: EnrichConfig, fetcher: Arc<dyn PageFetcher>) -> Self {
        let worker = Worker {
            fetcher,
            permits: Arc::new(Semaphore::new(cfg.concurrency.max(1))),
            pacer: Arc::new(DomainPacer::new(cfg.politeness_delay())),
            gate: Arc::new(QualityGate::from_config(&cfg)),
            retry: RetryPolicy::from_config(&cfg),
            timeout: cfg.fetch_timeout(),
        };
        Self { cfg, worker }
    }

    pub fn config(&self) -> &EnrichConfig {
        &self.cfg
    }

    /// Enrich `items` and record every outcome into `metrics`.
    pub async fn enrich_batch(&self, items: Vec<Item>, metrics: &MetricsCollector) -> EnrichReport {
        let batch_started = Instant::now();
        let deadline = batch_started + self.cfg.batch_deadline();

        let mut outcomes: Vec<EnrichmentOutcome> = Vec::new();
        let mut pending: HashMap<String, Arc<AtomicU32>> = HashMap::new();
        let mut set: JoinSet<EnrichmentOutcome> = JoinSet::new();
        let mut skipped_fresh = 0usize;

        for item in &items {
            if !needs_enrichment(item, &self.cfg) {
                skipped_fresh += 1;
                continue;
            }
            if pending.contains_key(&item.id) {
                warn!(target: "enrich", item_id = %item.id, "duplicate item id, fetched once");
                continue;
            }
            let Some((url, domain)) = admit(item, &self.cfg) else {
                debug!(target: "enrich", item_id = %item.id, "skipped by policy");
                outcomes.push(EnrichmentOutcome::failed(
                    item.id.clone(),
                    ErrorKind::SkippedPolicy,
                    Duration::ZERO,
                    0,
                ));
                continue;
            };
            let attempts = Arc::new(AtomicU32::new(0));
            pending.insert(item.id.clone(), attempts.clone());
            let job = FetchJob {
                item_id: item.id.clone(),
                url,
                domain,
                current_len: item.body_chars(),
                attempts,
            };
            set.spawn(self.worker.clone().run(job));
        }

        let collect = async {
            while let Some(res) = set.join_next().await {
                match res {
                    Ok(o) => {
                        pending.remove(&o.item_id);
                        outcomes.push(o);
                    }
                    Err(e) => warn!(target: "enrich", error = %e, "enrichment task failed"),
                }
            }
        };
        let timed_out = tokio::time::timeout_at(deadline, collect).await.is_err();
        if timed_out {
            set.abort_all();
            warn!(
                target: "enrich",
                unresolved = pending.len(),
                deadline_secs = self.cfg.batch_deadline_secs,
                "batch deadline expired, abandoning in-flight fetches"
            );
        }

        // Anything still pending (deadline or a crashed task) ends as a timeout.
        for item in &items {
            if let Some(attempts) = pending.remove(&item.id) {
                outcomes.push(EnrichmentOutcome::failed(
                    item.id.clone(),
                    ErrorKind::Timeout,
                    batch_started.elapsed(),
                    attempts.load(Ordering::SeqCst),
                ));
            }
        }

        let items = apply_outcomes(items, &outcomes);
        for o in &outcomes {
            metrics.record_fetch(o);
        }

        let success = outcomes.iter().filter(|o| o.is_success()).count();
        info!(
            target: "enrich",
            fetcher = self.worker.fetcher.name(),
            attempted = outcomes.len(),
            success,
            fail = outcomes.len() - success,
            skipped_fresh,
            elapsed_ms = batch_started.elapsed().as_millis() as u64,
            "enrichment batch done"
        );

        EnrichReport { items, outcomes }
    }
}

/// Re-associate outcomes with their items by id; bodies only ever grow.
fn apply_outcomes(mut items: Vec<Item>, outcomes: &[EnrichmentOutcome]) -> Vec<Item> {
    let by_id: HashMap<&str, &EnrichmentOutcome> = outcomes
        .iter()
        .filter(|o| o.replaced)
        .map(|o| (o.item_id.as_str(), o))
        .collect();
    for item in items.iter_mut() {
        if let Some(o) = by_id.get(item.id.as_str()) {
            if o.text.chars().count() > item.body_chars() {
                item.body = o.text.clone();
            }
        }
    }
    items
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> EnrichConfig {
        EnrichConfig::default()
    }

    #[test]
    fn hn_stub_needs_enrichment() {
        let item = Item::new("1", "Hacker News", "Show HN: X")
            .with_url("https://x.test/post")
            .with_body("Comments URL: https://news.ycombinator.com/item?id=1 Points: 150");
        assert!(needs_enrichment(&item, &cfg()));
    }

    #[test]
    fn title_echo_and_empty_need_enrichment() {
        let echo = Item::new("1", "Blog", "A new allocator").with_body("a new allocator ");
        assert!(needs_enrichment(&echo, &cfg()));
        let empty = Item::new("2", "Blog", "Anything");
        assert!(needs_enrichment(&empty, &cfg()));
    }

    #[test]
    fn short_body_only_matters_for_low_content_sources() {
        let body = "A short but genuine summary of the release.";
        let hn = Item::new("1", "lobsters", "Release").with_body(body);
        let blog = Item::new("2", "Company Blog", "Release").with_body(body);
        assert!(needs_enrichment(&hn, &cfg()));
        assert!(!needs_enrichment(&blog, &cfg()));
    }

    #[test]
    fn substantial_body_is_never_fetched() {
        let long = format!("Read more. {}", "Original reporting sentence. ".repeat(30));
        let item = Item::new("1", "Hacker News", "T").with_body(long);
        assert!(!needs_enrichment(&item, &cfg()));
    }

    #[test]
    fn policy_rejects_missing_bad_and_denied_urls() {
        let c = cfg();
        assert!(admit(&Item::new("1", "s", "t"), &c).is_none());
        assert!(admit(&Item::new("1", "s", "t").with_url("ftp://a.test/x"), &c).is_none());
        assert!(admit(&Item::new("1", "s", "t").with_url("https://mobile.twitter.com/x"), &c).is_none());
        assert_eq!(
            admit(&Item::new("1", "s", "t").with_url("https://www.blog.test/x"), &c),
            Some(("https://www.blog.test/x".to_string(), "blog.test".to_string()))
        );
    }

    #[test]
    fn apply_never_shortens() {
        let items = vec![Item::new("1", "s", "t").with_body("0123456789")];
        let o = EnrichmentOutcome {
            item_id: "1".into(),
            text: "short".into(),
            error: None,
            latency: Duration::ZERO,
            attempts: 1,
            backoff: vec![],
            replaced: true,
        };
        let out = apply_outcomes(items, &[o]);
        assert_eq!(out[0].body, "0123456789");
    }
}
