// src/notify/mod.rs
//! Side channels for the batch summary. Every channel reports one of three
//! states; a failing channel never affects the run or the other channels.

pub mod webhook;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{info, warn};

pub use webhook::WebhookNotifier;

use crate::analyze::DeepDiveReport;
use crate::metrics::BatchMetrics;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum DeliveryStatus {
    Delivered,
    /// Channel not configured; nothing was attempted.
    Skipped,
    Failed(String),
}

/// What gets pushed to side channels after a run.
#[derive(Debug, Clone, Serialize)]
pub struct BatchSummary {
    pub run_id: String,
    pub total_items: u64,
    pub analyzed: u64,
    pub enrich_success_rate: f64,
    pub top_reports: Vec<ReportHeadline>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportHeadline {
    pub item_id: String,
    pub category: String,
    pub mechanism: String,
    pub signal_strength: f64,
}

impl BatchSummary {
    /// Up to `top` reports, strongest signal first.
    pub fn new(metrics: &BatchMetrics, reports: &[DeepDiveReport], top: usize) -> Self {
        let mut heads: Vec<ReportHeadline> = reports
            .iter()
            .map(|r| ReportHeadline {
                item_id: r.item_id.clone(),
                category: r.category.label().to_string(),
                mechanism: r.mechanism.label().to_string(),
                signal_strength: r.signal_strength,
            })
            .collect();
        heads.sort_by(|a, b| b.signal_strength.total_cmp(&a.signal_strength));
        heads.truncate(top);
        Self {
            run_id: metrics.run_id.clone(),
            total_items: metrics.total_items,
            analyzed: metrics.analyzed,
            enrich_success_rate: metrics.enrichment.success_rate,
            top_reports: heads,
        }
    }
}

#[async_trait]
pub trait Notifier: Send + Sync {
    fn name(&self) -> &'static str;
    async fn deliver(&self, summary: &BatchSummary) -> DeliveryStatus;
}

/// Push `summary` to every channel; returns `(channel, status)` in channel order.
pub async fn dispatch(
    channels: &[Box<dyn Notifier>],
    summary: &BatchSummary,
) -> Vec<(&'static str, DeliveryStatus)> {
    let mut out = Vec::with_capacity(channels.len());
    for ch in channels {
        let status = ch.deliver(summary).await;
        match &status {
            DeliveryStatus::Delivered => info!(target: "notify", channel = ch.name(), "delivered"),
            DeliveryStatus::Skipped => info!(target: "notify", channel = ch.name(), "skipped (not configured)"),
            DeliveryStatus::Failed(reason) => {
                warn!(target: "notify", channel = ch.name(), %reason, "delivery failed")
            }
        }
        out.push((ch.name(), status));
    }
    out
}
