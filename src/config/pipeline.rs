// src/config/pipeline.rs
//! Pipeline settings.
//!
//! Resolution order (later wins):
//! 1) built-in defaults
//! 2) TOML file: `$PIPELINE_CONFIG_PATH`, else `config/pipeline.toml` when present
//! 3) environment overrides (`ENRICH_CONCURRENCY`, `ANALYSIS_MIN_SCORE`, ...)
//!
//! Durations are expressed in (fractional) seconds, like the env variables.

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use super::ConfigError;
use crate::analyze::mechanism::Mechanism;

pub const ENV_CONFIG_PATH: &str = "PIPELINE_CONFIG_PATH";
pub const DEFAULT_CONFIG_PATH: &str = "config/pipeline.toml";

/// Upper bound for every seconds-valued setting (one week).
pub const MAX_DURATION_SECS: f64 = 7.0 * 24.0 * 3600.0;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub enrich: EnrichConfig,
    pub analysis: AnalysisConfig,
}

/// Fetcher knobs: concurrency, politeness, retry and the extraction quality gate.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EnrichConfig {
    /// Global cap on simultaneous in-flight page requests.
    pub concurrency: usize,
    /// Minimum spacing between two request starts to the same host.
    pub politeness_delay_secs: f64,
    pub fetch_timeout_secs: f64,
    /// Extra attempts after the first one, for transient failures only.
    pub max_retries: u32,
    pub backoff_base_secs: f64,
    pub backoff_jitter_secs: f64,
    /// Overall budget for the whole fetch stage.
    pub batch_deadline_secs: f64,
    /// Quality gate: minimum extracted length (chars).
    pub min_chars: usize,
    /// Quality gate: maximum share of junk tokens.
    pub max_junk_ratio: f64,
    /// Bodies shorter than this from a low-content source get fetched.
    pub short_body_chars: usize,
    pub low_content_sources: Vec<String>,
    /// Substrings that identify a metadata-only stub body.
    pub boilerplate_markers: Vec<String>,
    /// Substrings that mark a token as navigation/legal/ad junk.
    pub junk_markers: Vec<String>,
    /// Hosts never fetched (policy skip).
    pub skip_domains: Vec<String>,
    pub user_agent: String,
}

impl Default for EnrichConfig {
    fn default() -> Self {
        Self {
            concurrency: 3,
            politeness_delay_secs: 0.5,
            fetch_timeout_secs: 15.0,
            max_retries: 2,
            backoff_base_secs: 0.5,
            backoff_jitter_secs: 0.25,
            batch_deadline_secs: 120.0,
            min_chars: 400,
            max_junk_ratio: 0.30,
            short_body_chars: 200,
            low_content_sources: strings(&[
                "hacker news",
                "hn",
                "lobsters",
                "reddit",
                "product hunt",
                "v2ex",
            ]),
            boilerplate_markers: strings(&[
                "comments url:",
                "article url:",
                "points:",
                "# comments:",
                "continue reading",
                "read more",
                "[link]",
                "[comments]",
            ]),
            junk_markers: strings(&[
                "cookie",
                "subscribe",
                "newsletter",
                "login",
                "signup",
                "advertisement",
                "sponsored",
                "copyright",
                "©",
                "javascript",
                "menu",
            ]),
            skip_domains: strings(&[
                "twitter.com",
                "x.com",
                "youtube.com",
                "youtu.be",
                "instagram.com",
                "facebook.com",
                "tiktok.com",
            ]),
            user_agent: "digest-analyzer/0.1 (+article enrichment)".to_string(),
        }
    }
}

impl EnrichConfig {
    pub fn politeness_delay(&self) -> Duration {
        secs(self.politeness_delay_secs)
    }

    pub fn fetch_timeout(&self) -> Duration {
        secs(self.fetch_timeout_secs)
    }

    pub fn backoff_base(&self) -> Duration {
        secs(self.backoff_base_secs)
    }

    pub fn backoff_jitter(&self) -> Duration {
        secs(self.backoff_jitter_secs)
    }

    pub fn batch_deadline(&self) -> Duration {
        secs(self.batch_deadline_secs)
    }
}

/// Analysis gate and narrative assembly knobs.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub min_score: f64,
    pub max_dup_risk: f64,
    pub max_core_facts: usize,
    /// Display cap for a verbatim excerpt (chars).
    pub excerpt_chars: usize,
    /// Pairwise 3-gram Jaccard ceiling for `first_principles_text`.
    pub similarity_threshold: f64,
    /// Minimum share of item pairs that must select differing mechanisms.
    pub min_distinct_pair_ratio: f64,
    pub mechanisms: MechanismSettings,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            min_score: 7.0,
            max_dup_risk: 0.25,
            max_core_facts: 8,
            excerpt_chars: 160,
            similarity_threshold: 0.7,
            min_distinct_pair_ratio: 0.7,
            mechanisms: MechanismSettings::default(),
        }
    }
}

/// Tie-break order and fallback for mechanism selection.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct MechanismSettings {
    /// Earlier entries win ties.
    pub priority: Vec<Mechanism>,
    /// Returned when no keyword matches at all.
    pub default: Mechanism,
}

impl Default for MechanismSettings {
    fn default() -> Self {
        Self {
            priority: vec![
                Mechanism::SecurityBoundary,
                Mechanism::RegulatoryLeverage,
                Mechanism::Privacy,
                Mechanism::SupplyChain,
                Mechanism::Interoperability,
                Mechanism::Scalability,
                Mechanism::LatencyPerformance,
                Mechanism::IncentiveDesign,
                Mechanism::AdoptionCurve,
            ],
            default: Mechanism::AdoptionCurve,
        }
    }
}

impl PipelineConfig {
    /// Load from an explicit TOML path, then apply env overrides and validate.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading pipeline config from {}", path.display()))?;
        let mut cfg: PipelineConfig = toml::from_str(&content)
            .with_context(|| format!("parsing pipeline config {}", path.display()))?;
        cfg.apply_env_overrides()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load using env var + fallbacks:
    /// 1) $PIPELINE_CONFIG_PATH (must exist when set)
    /// 2) config/pipeline.toml
    /// 3) built-in defaults
    pub fn load_default() -> Result<Self> {
        if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
            }
            return Self::load_from(&pb);
        }
        let default_p = PathBuf::from(DEFAULT_CONFIG_PATH);
        if default_p.exists() {
            return Self::load_from(&default_p);
        }
        let mut cfg = Self::default();
        cfg.apply_env_overrides()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Apply the documented environment variables on top of the current values.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        let e = &mut self.enrich;
        if let Some(v) = env_parse("ENRICH_CONCURRENCY")? {
            e.concurrency = v;
        }
        if let Some(v) = env_parse("ENRICH_POLITENESS_DELAY")? {
            e.politeness_delay_secs = v;
        }
        if let Some(v) = env_parse("ENRICH_FETCH_TIMEOUT")? {
            e.fetch_timeout_secs = v;
        }
        if let Some(v) = env_parse("ENRICH_MAX_RETRIES")? {
            e.max_retries = v;
        }
        if let Some(v) = env_parse("ENRICH_BACKOFF_BASE")? {
            e.backoff_base_secs = v;
        }
        if let Some(v) = env_parse("ENRICH_BATCH_DEADLINE")? {
            e.batch_deadline_secs = v;
        }
        if let Some(v) = env_parse("ENRICH_MIN_CHARS")? {
            e.min_chars = v;
        }
        if let Some(v) = env_parse("ENRICH_MAX_JUNK_RATIO")? {
            e.max_junk_ratio = v;
        }

        let a = &mut self.analysis;
        if let Some(v) = env_parse("ANALYSIS_MIN_SCORE")? {
            a.min_score = v;
        }
        if let Some(v) = env_parse("ANALYSIS_MAX_DUP_RISK")? {
            a.max_dup_risk = v;
        }
        Ok(())
    }

    /// Reject settings the pipeline cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let e = &self.enrich;
        if e.concurrency == 0 {
            return Err(invalid("enrich.concurrency", "must be at least 1"));
        }
        non_negative("enrich.politeness_delay_secs", e.politeness_delay_secs)?;
        non_negative("enrich.backoff_base_secs", e.backoff_base_secs)?;
        non_negative("enrich.backoff_jitter_secs", e.backoff_jitter_secs)?;
        positive("enrich.fetch_timeout_secs", e.fetch_timeout_secs)?;
        positive("enrich.batch_deadline_secs", e.batch_deadline_secs)?;
        unit_interval("enrich.max_junk_ratio", e.max_junk_ratio)?;

        let a = &self.analysis;
        if !(0.0..=10.0).contains(&a.min_score) {
            return Err(invalid("analysis.min_score", "must be within [0, 10]"));
        }
        unit_interval("analysis.max_dup_risk", a.max_dup_risk)?;
        unit_interval("analysis.similarity_threshold", a.similarity_threshold)?;
        unit_interval("analysis.min_distinct_pair_ratio", a.min_distinct_pair_ratio)?;
        if a.max_core_facts == 0 {
            return Err(invalid("analysis.max_core_facts", "must be at least 1"));
        }
        if a.excerpt_chars < 16 {
            return Err(invalid("analysis.excerpt_chars", "must be at least 16"));
        }

        let prio = &a.mechanisms.priority;
        let uniq: HashSet<_> = prio.iter().collect();
        if prio.len() != Mechanism::ALL.len() || uniq.len() != prio.len() {
            return Err(ConfigError::MechanismPriority {
                expected: Mechanism::ALL.len(),
                got: prio.iter().map(|m| m.label().to_string()).collect(),
            });
        }
        Ok(())
    }
}

// --- internals ---

/// Out-of-range values (never present after `validate`) saturate instead of panicking.
fn secs(v: f64) -> Duration {
    if v.is_nan() {
        return Duration::ZERO;
    }
    Duration::from_secs_f64(v.clamp(0.0, MAX_DURATION_SECS))
}

fn strings(v: &[&str]) -> Vec<String> {
    v.iter().map(|s| s.to_string()).collect()
}

fn invalid(key: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        key,
        reason: reason.into(),
    }
}

fn env_parse<T: FromStr>(key: &'static str) -> Result<Option<T>, ConfigError> {
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| invalid(key, format!("cannot parse {raw:?}"))),
        Err(_) => Ok(None),
    }
}

fn non_negative(key: &'static str, v: f64) -> Result<(), ConfigError> {
    if (0.0..=MAX_DURATION_SECS).contains(&v) {
        Ok(())
    } else {
        Err(invalid(
            key,
            format!("must be between 0 and {MAX_DURATION_SECS} seconds"),
        ))
    }
}

fn positive(key: &'static str, v: f64) -> Result<(), ConfigError> {
    if v > 0.0 && v <= MAX_DURATION_SECS {
        Ok(())
    } else {
        Err(invalid(
            key,
            format!("must be above 0 and at most {MAX_DURATION_SECS} seconds"),
        ))
    }
}

fn unit_interval(key: &'static str, v: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&v) {
        Ok(())
    } else {
        Err(invalid(key, "must be within [0, 1]"))
    }
}
