//! Run-scoped metrics.
//!
//! `MetricsCollector` is created once per pipeline run and injected wherever
//! statistics are produced. Updates are append-only behind a single lock, and
//! `finish()` consumes the collector so the resulting `BatchMetrics` is written
//! exactly once. Every update is mirrored to the `metrics` facade so a process-wide
//! Prometheus recorder (if installed) sees the same series.

use std::collections::BTreeMap;
use std::sync::Mutex;
use std::time::Instant;

use chrono::{DateTime, Utc};
use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;
use serde::Serialize;

use crate::analyze::narrative::DeepDiveReport;
use crate::enrich::{EnrichmentOutcome, ErrorKind};

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("enrich_attempted_total", "Items sent to the enrichment stage.");
        describe_counter!("enrich_success_total", "Items with accepted extracted text.");
        describe_counter!("enrich_fail_total", "Failed enrichment outcomes, by reason.");
        describe_histogram!("enrich_latency_ms", "Per-item fetch+extract latency in ms.");
        describe_counter!("pipeline_items_total", "Items received by a pipeline run.");
        describe_counter!("analysis_items_total", "Items offered to the analysis gate.");
        describe_counter!("analysis_gate_passed_total", "Items admitted to deep analysis.");
        describe_counter!(
            "analysis_insufficient_evidence_total",
            "Reports produced without any verbatim excerpt."
        );
    });
}

/// Install a process-wide Prometheus recorder and return its render handle.
pub fn install_prometheus() -> anyhow::Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    ensure_metrics_described();
    Ok(handle)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichmentMetrics {
    pub attempted: u64,
    pub success: u64,
    pub fail: u64,
    pub success_rate: f64,
    pub latency_p50_ms: f64,
    pub latency_p95_ms: f64,
    pub fail_reasons: BTreeMap<ErrorKind, u64>,
}

/// Batch-level report, one per pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchMetrics {
    pub run_id: String,
    pub timestamp: DateTime<Utc>,
    pub runtime_secs: f64,
    /// Every item the run received.
    pub total_items: u64,
    /// Items with an annotation, i.e. offered to the analysis gate.
    pub scored_items: u64,
    pub passed_gate: u64,
    pub analyzed: u64,
    pub insufficient_evidence: u64,
    pub enrichment: EnrichmentMetrics,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_cleaning: Option<BTreeMap<String, u64>>,
}

#[derive(Debug, Default)]
struct Inner {
    attempted: u64,
    success: u64,
    fail: u64,
    latencies_ms: Vec<f64>,
    fail_reasons: BTreeMap<ErrorKind, u64>,
    total_items: u64,
    scored_items: u64,
    passed_gate: u64,
    analyzed: u64,
    insufficient_evidence: u64,
    entity_cleaning: Option<BTreeMap<String, u64>>,
}

#[derive(Debug)]
pub struct MetricsCollector {
    run_id: String,
    started: Instant,
    started_at: DateTime<Utc>,
    inner: Mutex<Inner>,
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsCollector {
    pub fn new() -> Self {
        let started_at = Utc::now();
        let run_id = format!(
            "run-{}-{}",
            started_at.format("%Y%m%dT%H%M%SZ"),
            short_hash(&started_at.timestamp_nanos_opt().unwrap_or_default().to_string())
        );
        Self::with_run_id(run_id)
    }

    pub fn with_run_id(run_id: impl Into<String>) -> Self {
        ensure_metrics_described();
        Self {
            run_id: run_id.into(),
            started: Instant::now(),
            started_at: Utc::now(),
            inner: Mutex::new(Inner::default()),
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    fn with_inner<R>(&self, f: impl FnOnce(&mut Inner) -> R) -> R {
        let mut guard = self
            .inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut guard)
    }

    pub fn record_fetch(&self, o: &EnrichmentOutcome) {
        counter!("enrich_attempted_total").increment(1);
        match o.error {
            None => counter!("enrich_success_total").increment(1),
            Some(kind) => counter!("enrich_fail_total", "reason" => kind.as_str()).increment(1),
        }
        let latency_ms = o.latency.as_secs_f64() * 1_000.0;
        if o.attempts > 0 {
            histogram!("enrich_latency_ms").record(latency_ms);
        }

        self.with_inner(|s| {
            s.attempted += 1;
            match o.error {
                None => s.success += 1,
                Some(kind) => {
                    s.fail += 1;
                    *s.fail_reasons.entry(kind).or_insert(0) += 1;
                }
            }
            if o.attempts > 0 {
                s.latencies_ms.push(latency_ms);
            }
        });
    }

    pub fn record_items(&self, total: usize) {
        counter!("pipeline_items_total").increment(total as u64);
        self.with_inner(|s| s.total_items += total as u64);
    }

    /// Items offered to the analysis gate and how many passed.
    pub fn record_gate(&self, offered: usize, passed: usize) {
        counter!("analysis_items_total").increment(offered as u64);
        counter!("analysis_gate_passed_total").increment(passed as u64);
        self.with_inner(|s| {
            s.scored_items += offered as u64;
            s.passed_gate += passed as u64;
        });
    }

    pub fn record_report(&self, report: &DeepDiveReport) {
        if report.insufficient_evidence {
            counter!("analysis_insufficient_evidence_total").increment(1);
        }
        self.with_inner(|s| {
            s.analyzed += 1;
            if report.insufficient_evidence {
                s.insufficient_evidence += 1;
            }
        });
    }

    /// Stats handed over by the entity-cleaning collaborator, when present.
    pub fn record_entity_cleaning(&self, stats: BTreeMap<String, u64>) {
        self.with_inner(|s| {
            let slot = s.entity_cleaning.get_or_insert_with(BTreeMap::new);
            for (k, v) in stats {
                *slot.entry(k).or_insert(0) += v;
            }
        });
    }

    /// Freeze the run into its single `BatchMetrics`.
    pub fn finish(self) -> BatchMetrics {
        let runtime_secs = round_to(self.started.elapsed().as_secs_f64(), 3);
        let mut s = self
            .inner
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        s.latencies_ms.sort_by(|a, b| a.total_cmp(b));

        let success_rate = if s.attempted == 0 {
            0.0
        } else {
            round_to(s.success as f64 / s.attempted as f64, 4)
        };

        BatchMetrics {
            run_id: self.run_id,
            timestamp: self.started_at,
            runtime_secs,
            total_items: s.total_items,
            scored_items: s.scored_items,
            passed_gate: s.passed_gate,
            analyzed: s.analyzed,
            insufficient_evidence: s.insufficient_evidence,
            enrichment: EnrichmentMetrics {
                attempted: s.attempted,
                success: s.success,
                fail: s.fail,
                success_rate,
                latency_p50_ms: round_to(percentile(&s.latencies_ms, 50.0), 1),
                latency_p95_ms: round_to(percentile(&s.latencies_ms, 95.0), 1),
                fail_reasons: s.fail_reasons,
            },
            entity_cleaning: s.entity_cleaning,
        }
    }
}

/// Nearest-rank percentile over an ascending slice; 0 for empty input.
pub fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let rank = ((p / 100.0) * sorted.len() as f64).ceil() as usize;
    let idx = rank.clamp(1, sorted.len()) - 1;
    sorted[idx]
}

fn round_to(x: f64, decimals: i32) -> f64 {
    let f = 10f64.powi(decimals);
    (x * f).round() / f
}

fn short_hash(text: &str) -> String {
    use sha2::{Digest, Sha256};
    let digest = Sha256::digest(text.as_bytes());
    let mut out = String::with_capacity(12);
    for b in digest.iter().take(6) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}
