//! Batch diversity check, run after every report of a batch exists.
//!
//! Pairwise similarity is Jaccard over word 3-grams of each report's
//! `first_principles_text`. Two reports that share a mechanism and open on a
//! near-identical fact are the same story and do not count against the batch.

use serde::Serialize;
use std::collections::{BTreeSet, HashSet};
use strsim::normalized_levenshtein;

use super::narrative::DeepDiveReport;
use crate::config::AnalysisConfig;

/// First facts at or above this similarity are treated as the same underlying story.
const SAME_STORY_THRESHOLD: f64 = 0.9;
/// Mechanism spread is only meaningful from this batch size on.
const MIN_BATCH_FOR_SPREAD: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiversityReport {
    pub reports: usize,
    pub pairs: usize,
    pub exempt_pairs: usize,
    pub similar_pairs: Vec<(String, String, f64)>,
    /// Share of non-exempt pairs below the similarity threshold.
    pub below_threshold_ratio: f64,
    pub distinct_mechanisms: usize,
    /// Share of all pairs whose mechanisms differ.
    pub differing_mechanism_ratio: f64,
    pub max_similarity: f64,
    pub passed: bool,
}

fn words(s: &str) -> Vec<String> {
    s.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(|w| w.to_lowercase())
        .collect()
}

fn trigrams(s: &str) -> HashSet<String> {
    let w = words(s);
    if w.len() < 3 {
        // Short texts: fall back to whole words so they still compare.
        return w.into_iter().collect();
    }
    w.windows(3).map(|t| t.join(" ")).collect()
}

/// Jaccard similarity of word 3-gram sets; two empty texts count as identical.
pub fn trigram_jaccard(a: &str, b: &str) -> f64 {
    let (ta, tb) = (trigrams(a), trigrams(b));
    if ta.is_empty() && tb.is_empty() {
        return 1.0;
    }
    let inter = ta.intersection(&tb).count() as f64;
    let union = ta.union(&tb).count() as f64;
    inter / union
}

fn same_story(a: &DeepDiveReport, b: &DeepDiveReport) -> bool {
    if a.mechanism != b.mechanism {
        return false;
    }
    match (a.core_facts.first(), b.core_facts.first()) {
        (Some(fa), Some(fb)) => {
            normalized_levenshtein(&fa.to_lowercase(), &fb.to_lowercase()) >= SAME_STORY_THRESHOLD
        }
        _ => false,
    }
}

pub fn check_diversity(reports: &[DeepDiveReport], cfg: &AnalysisConfig) -> DiversityReport {
    let texts: Vec<&str> = reports
        .iter()
        .map(|r| r.first_principles_text.as_str())
        .collect();
    let distinct_mechanisms = reports
        .iter()
        .map(|r| r.mechanism)
        .collect::<BTreeSet<_>>()
        .len();

    let mut pairs = 0usize;
    let mut exempt = 0usize;
    let mut below = 0usize;
    let mut differing = 0usize;
    let mut max_similarity = 0.0f64;
    let mut similar_pairs = Vec::new();

    for i in 0..reports.len() {
        for j in (i + 1)..reports.len() {
            pairs += 1;
            let (a, b) = (&reports[i], &reports[j]);
            if a.mechanism != b.mechanism {
                differing += 1;
            }
            if same_story(a, b) {
                exempt += 1;
                continue;
            }
            let sim = trigram_jaccard(texts[i], texts[j]);
            max_similarity = max_similarity.max(sim);
            if sim < cfg.similarity_threshold {
                below += 1;
            } else {
                similar_pairs.push((a.item_id.clone(), b.item_id.clone(), round3(sim)));
            }
        }
    }

    let scored = pairs - exempt;
    let below_threshold_ratio = if scored == 0 {
        1.0
    } else {
        below as f64 / scored as f64
    };
    let differing_mechanism_ratio = if pairs == 0 {
        1.0
    } else {
        differing as f64 / pairs as f64
    };

    let spread_ok = reports.len() < MIN_BATCH_FOR_SPREAD
        || differing_mechanism_ratio >= cfg.min_distinct_pair_ratio;
    let passed = below_threshold_ratio >= cfg.min_distinct_pair_ratio && spread_ok;

    DiversityReport {
        reports: reports.len(),
        pairs,
        exempt_pairs: exempt,
        similar_pairs,
        below_threshold_ratio,
        distinct_mechanisms,
        differing_mechanism_ratio,
        max_similarity: round3(max_similarity),
        passed,
    }
}

fn round3(x: f64) -> f64 {
    (x * 1000.0).round() / 1000.0
}
