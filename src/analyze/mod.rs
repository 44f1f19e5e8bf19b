// src/analyze/mod.rs
//! Deep analysis entry: gate → assemble one report per admitted item → batch
//! diversity check. Synchronous and infallible per item.

pub mod category;
pub mod diversity;
pub mod evidence;
pub mod mechanism;
pub mod narrative;

use serde::Serialize;
use tracing::{debug, info, warn};

pub use category::Category;
pub use diversity::{check_diversity, DiversityReport};
pub use mechanism::{select_mechanism, Mechanism, MechanismSelector};
pub use narrative::{
    passes_gate, AnalysisInput, Annotation, DeepDiveReport, NarrativeAssembler, Scores,
};

use crate::metrics::MetricsCollector;

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisOutput {
    pub reports: Vec<DeepDiveReport>,
    pub diversity: DiversityReport,
}

/// Gate and assemble `inputs` in order, then validate the batch as a whole.
pub fn analyze_batch(
    inputs: &[AnalysisInput],
    assembler: &NarrativeAssembler,
    metrics: &MetricsCollector,
) -> AnalysisOutput {
    let cfg = assembler.config();
    let admitted: Vec<&AnalysisInput> = inputs
        .iter()
        .filter(|i| {
            let ok = passes_gate(i, cfg);
            if !ok {
                debug!(
                    target: "analyze",
                    item_id = %i.item.id,
                    final_score = i.scores.final_score,
                    dup_risk = i.dup_risk,
                    "below analysis gate"
                );
            }
            ok
        })
        .collect();
    metrics.record_gate(inputs.len(), admitted.len());

    let reports: Vec<DeepDiveReport> = admitted
        .into_iter()
        .map(|i| {
            let r = assembler.assemble(i);
            metrics.record_report(&r);
            r
        })
        .collect();

    // Barrier: only meaningful once the whole batch exists.
    let diversity = check_diversity(&reports, cfg);
    if diversity.passed {
        info!(
            target: "analyze",
            reports = reports.len(),
            distinct_mechanisms = diversity.distinct_mechanisms,
            max_similarity = diversity.max_similarity,
            "analysis batch done"
        );
    } else {
        warn!(
            target: "analyze",
            reports = reports.len(),
            distinct_mechanisms = diversity.distinct_mechanisms,
            below_threshold_ratio = diversity.below_threshold_ratio,
            differing_mechanism_ratio = diversity.differing_mechanism_ratio,
            similar_pairs = diversity.similar_pairs.len(),
            "narratives too similar across batch"
        );
    }

    AnalysisOutput { reports, diversity }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AnalysisConfig;
    use crate::ingest::types::Item;

    fn input(id: &str, final_score: f64, dup_risk: f64) -> AnalysisInput {
        AnalysisInput::new(
            Item::new(id, "Blog", "Title").with_body("A sentence long enough to count as a fact."),
            Annotation {
                scores: Scores::new(7.0, 7.0, 7.0, 7.0, final_score),
                dup_risk,
                category: Category::OpenSource,
                key_points: vec![],
            },
        )
    }

    #[test]
    fn only_gated_items_get_reports_in_order() {
        let assembler = NarrativeAssembler::new(AnalysisConfig::default());
        let metrics = MetricsCollector::with_run_id("t");
        let out = analyze_batch(
            &[input("a", 9.0, 0.0), input("b", 5.0, 0.0), input("c", 8.0, 0.9), input("d", 7.0, 0.25)],
            &assembler,
            &metrics,
        );
        let ids: Vec<_> = out.reports.iter().map(|r| r.item_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "d"]);
        let m = metrics.finish();
        assert_eq!(m.scored_items, 4);
        assert_eq!(m.passed_gate, 2);
        assert_eq!(m.analyzed, 2);
    }
}
