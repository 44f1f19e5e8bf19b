// src/pipeline.rs
//! End-to-end run: enrich → annotate → analyze → metrics.
//!
//! Configuration problems surface from `Pipeline::new`, before any item is
//! touched. `run` itself never fails; per-item problems end up in outcomes.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};

use crate::analyze::category::validate_table;
use crate::analyze::{
    analyze_batch, AnalysisInput, Annotation, DeepDiveReport, DiversityReport, NarrativeAssembler,
};
use crate::config::{ConfigError, PipelineConfig};
use crate::enrich::{EnrichmentOutcome, Enricher, PageFetcher};
use crate::ingest::types::Item;
use crate::metrics::{BatchMetrics, MetricsCollector};

/// Scoring/classification collaborator. `None` means the item was not scored
/// and is not offered to the analysis gate.
pub trait Scorer: Send + Sync {
    fn annotate(&self, item: &Item) -> Option<Annotation>;
}

impl<F> Scorer for F
where
    F: Fn(&Item) -> Option<Annotation> + Send + Sync,
{
    fn annotate(&self, item: &Item) -> Option<Annotation> {
        self(item)
    }
}

/// Precomputed annotations keyed by item id.
#[derive(Debug, Clone, Default)]
pub struct AnnotationTable(pub HashMap<String, Annotation>);

impl AnnotationTable {
    pub fn insert(&mut self, item_id: impl Into<String>, annotation: Annotation) {
        self.0.insert(item_id.into(), annotation);
    }
}

impl Scorer for AnnotationTable {
    fn annotate(&self, item: &Item) -> Option<Annotation> {
        self.0.get(&item.id).cloned()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PipelineOutput {
    pub items: Vec<Item>,
    pub outcomes: Vec<EnrichmentOutcome>,
    pub reports: Vec<DeepDiveReport>,
    pub diversity: DiversityReport,
    pub metrics: BatchMetrics,
}

pub struct Pipeline {
    enricher: Enricher,
    assembler: NarrativeAssembler,
}

impl Pipeline {
    pub fn new(cfg: PipelineConfig, fetcher: Arc<dyn PageFetcher>) -> Result<Self, ConfigError> {
        cfg.validate()?;
        validate_table()?;
        Ok(Self {
            enricher: Enricher::new(cfg.enrich, fetcher),
            assembler: NarrativeAssembler::new(cfg.analysis),
        })
    }

    pub async fn run(&self, items: Vec<Item>, scorer: &dyn Scorer) -> PipelineOutput {
        self.run_with_metrics(items, scorer, MetricsCollector::new())
            .await
    }

    /// Same as `run` with a caller-supplied collector (fixed run id, pre-recorded stats).
    pub async fn run_with_metrics(
        &self,
        items: Vec<Item>,
        scorer: &dyn Scorer,
        metrics: MetricsCollector,
    ) -> PipelineOutput {
        let total = items.len();
        info!(target: "pipeline", run_id = %metrics.run_id(), items = total, "run started");
        metrics.record_items(total);

        let report = self.enricher.enrich_batch(items, &metrics).await;

        let inputs: Vec<AnalysisInput> = report
            .items
            .iter()
            .filter_map(|item| match scorer.annotate(item) {
                Some(a) => Some(AnalysisInput::new(item.clone(), a)),
                None => {
                    debug!(target: "pipeline", item_id = %item.id, "no annotation, not analyzed");
                    None
                }
            })
            .collect();

        let analysis = analyze_batch(&inputs, &self.assembler, &metrics);
        let batch = metrics.finish();

        info!(
            target: "pipeline",
            run_id = %batch.run_id,
            items = total,
            scored = inputs.len(),
            reports = analysis.reports.len(),
            enrich_success_rate = batch.enrichment.success_rate,
            runtime_secs = batch.runtime_secs,
            "run finished"
        );

        PipelineOutput {
            items: report.items,
            outcomes: report.outcomes,
            reports: analysis.reports,
            diversity: analysis.diversity,
            metrics: batch,
        }
    }
}
