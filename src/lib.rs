// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod analyze;
pub mod config;
pub mod enrich;
pub mod ingest;
pub mod metrics;
pub mod notify;
pub mod pipeline;
pub mod telemetry;

// ---- Re-exports for stable public API ----
pub use crate::analyze::{
    select_mechanism, AnalysisInput, Annotation, Category, DeepDiveReport, Mechanism, Scores,
};
pub use crate::config::{ConfigError, PipelineConfig};
pub use crate::enrich::{EnrichmentOutcome, Enricher, ErrorKind, HttpFetcher, PageFetcher};
pub use crate::ingest::types::{Item, ItemSource};
pub use crate::metrics::{BatchMetrics, MetricsCollector};
pub use crate::pipeline::{Pipeline, PipelineOutput, Scorer};
