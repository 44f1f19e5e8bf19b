// src/config/mod.rs
//! Run configuration: TOML file + environment overrides, validated up front.
//! A `ConfigError` is the only kind of failure allowed to abort a run, and it
//! always happens before any item is touched.

pub mod pipeline;

pub use pipeline::{AnalysisConfig, EnrichConfig, MechanismSettings, PipelineConfig};

use thiserror::Error;

/// Structural/config errors (fatal, raised before item processing).
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("invalid value for {key}: {reason}")]
    InvalidValue { key: &'static str, reason: String },

    #[error("mechanism priority must list all {expected} mechanisms exactly once (got {got:?})")]
    MechanismPriority { expected: usize, got: Vec<String> },

    #[error("unknown category label: {0}")]
    UnknownCategory(String),

    #[error("unknown mechanism label: {0}")]
    UnknownMechanism(String),
}
