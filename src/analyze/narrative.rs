//! Narrative assembler: one `DeepDiveReport` per gated item, built only from the
//! item's own text, the mechanism profile and the category context.
//!
//! Never fails: missing key points or an empty body degrade to explicit
//! "Insufficient evidence" / "Insufficient data" markers.

use serde::{Deserialize, Serialize};

use super::category::Category;
use super::evidence::{core_facts, evidence_excerpts, truncate_chars, EvidenceExcerpt, MAX_FACT_CHARS};
use super::mechanism::{Mechanism, MechanismSelector};
use crate::config::AnalysisConfig;
use crate::ingest::types::Item;

pub const INSUFFICIENT_EVIDENCE: &str = "Insufficient evidence";
pub const INSUFFICIENT_DATA: &str = "Insufficient data";
pub const HYPOTHESIS_MARKER: &str = "[hypothesis]";

/// Upper bound on key points carried into analysis.
const MAX_KEY_POINTS: usize = 16;
/// Display cap for the fact quoted inside `first_principles_text`.
const PRINCIPLE_FACT_CHARS: usize = 160;

/// Upstream quality scores, each in [0, 10].
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Scores {
    pub novelty: f64,
    pub utility: f64,
    pub heat: f64,
    pub feasibility: f64,
    pub final_score: f64,
}

impl Scores {
    /// Safe constructor with clamping.
    pub fn new(novelty: f64, utility: f64, heat: f64, feasibility: f64, final_score: f64) -> Self {
        Self {
            novelty,
            utility,
            heat,
            feasibility,
            final_score,
        }
        .clamped()
    }

    pub fn clamped(self) -> Self {
        fn c(x: f64) -> f64 {
            if x.is_finite() {
                x.clamp(0.0, 10.0)
            } else {
                0.0
            }
        }
        Self {
            novelty: c(self.novelty),
            utility: c(self.utility),
            heat: c(self.heat),
            feasibility: c(self.feasibility),
            final_score: c(self.final_score),
        }
    }
}

/// What the scoring/classification collaborator attaches to an item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub scores: Scores,
    pub dup_risk: f64,
    pub category: Category,
    #[serde(default)]
    pub key_points: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisInput {
    pub item: Item,
    pub scores: Scores,
    /// Duplicate risk in [0, 1].
    pub dup_risk: f64,
    pub category: Category,
    pub key_points: Vec<String>,
}

impl AnalysisInput {
    pub fn new(item: Item, annotation: Annotation) -> Self {
        let dup_risk = if annotation.dup_risk.is_finite() {
            annotation.dup_risk.clamp(0.0, 1.0)
        } else {
            1.0
        };
        let key_points = annotation
            .key_points
            .iter()
            .take(MAX_KEY_POINTS)
            .map(|k| truncate_chars(k.trim(), MAX_FACT_CHARS))
            .collect();
        Self {
            item,
            scores: annotation.scores.clamped(),
            dup_risk,
            category: annotation.category,
            key_points,
        }
    }
}

/// Analysis gate: high enough composite score, low enough duplicate risk.
pub fn passes_gate(input: &AnalysisInput, cfg: &AnalysisConfig) -> bool {
    input.scores.final_score >= cfg.min_score && input.dup_risk <= cfg.max_dup_risk
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeepDiveReport {
    pub item_id: String,
    pub category: Category,
    pub core_facts: Vec<String>,
    pub evidence_excerpts: Vec<EvidenceExcerpt>,
    /// Set when no excerpt could be derived.
    pub insufficient_evidence: bool,
    pub mechanism: Mechanism,
    pub first_principles_text: String,
    pub direct_effects: Vec<String>,
    /// Every entry starts with `HYPOTHESIS_MARKER`.
    pub speculative_effects: Vec<String>,
    pub opportunities: Vec<String>,
    pub counter_risks: Vec<String>,
    pub strategic_outlook: String,
    pub observation_metrics: Vec<String>,
    pub evidence_density: f64,
    pub signal_strength: f64,
}

impl DeepDiveReport {
    /// Every prose field, for whole-report checks.
    pub fn text_fields(&self) -> Vec<&str> {
        let mut v = vec![self.first_principles_text.as_str(), self.strategic_outlook.as_str()];
        for list in [
            &self.core_facts,
            &self.direct_effects,
            &self.speculative_effects,
            &self.opportunities,
            &self.counter_risks,
            &self.observation_metrics,
        ] {
            v.extend(list.iter().map(String::as_str));
        }
        v.extend(self.evidence_excerpts.iter().map(|e| e.text.as_str()));
        v
    }
}

/// `min(10, 0.20 n + 0.15 u + 0.15 h + 0.15 f + 0.15 s + 0.20 d*10)`, 2 decimals.
pub fn signal_strength(scores: &Scores, evidence_density: f64) -> f64 {
    let s = scores.clamped();
    let raw = 0.20 * s.novelty
        + 0.15 * s.utility
        + 0.15 * s.heat
        + 0.15 * s.feasibility
        + 0.15 * s.final_score
        + 0.20 * evidence_density * 10.0;
    let v = raw.min(10.0).max(0.0);
    (v * 100.0).round() / 100.0
}

#[derive(Debug, Clone)]
pub struct NarrativeAssembler {
    cfg: AnalysisConfig,
    selector: MechanismSelector,
}

impl NarrativeAssembler {
    pub fn new(cfg: AnalysisConfig) -> Self {
        let selector = MechanismSelector::new(cfg.mechanisms.clone());
        Self { cfg, selector }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.cfg
    }

    pub fn assemble(&self, input: &AnalysisInput) -> DeepDiveReport {
        let body = input.item.body.as_str();
        let facts = core_facts(&input.key_points, body, self.cfg.max_core_facts);
        let excerpts = evidence_excerpts(&facts, body, self.cfg.excerpt_chars);
        let insufficient = excerpts.is_empty();

        let mechanism = self.selector.select(&input.item.title, body);
        let profile = mechanism.profile();
        let context = input.category.context();

        let first_principles_text = match facts.first() {
            None => format!(
                "{INSUFFICIENT_EVIDENCE}: the item carries no source text to ground a {} analysis.",
                mechanism.label()
            ),
            Some(first) => {
                let mut t = profile
                    .principle
                    .replace("{fact}", &truncate_chars(first, PRINCIPLE_FACT_CHARS));
                if let Some(second) = facts.get(1) {
                    t.push_str(&format!(
                        " Alongside it, \"{}\".",
                        truncate_chars(second, PRINCIPLE_FACT_CHARS)
                    ));
                }
                if insufficient {
                    t.push_str(&format!(" ({INSUFFICIENT_EVIDENCE}: unquoted in source.)"));
                }
                t
            }
        };

        let mut direct_effects: Vec<String> = facts
            .iter()
            .skip(1)
            .take(2)
            .map(|f| format!("{}: {f}", profile.direct_lens))
            .collect();
        if direct_effects.is_empty() {
            direct_effects.push(format!(
                "{INSUFFICIENT_DATA}: no further source facts to derive direct effects."
            ));
        }

        let mut speculative_effects: Vec<String> = facts
            .iter()
            .skip(3)
            .take(2)
            .map(|f| format!("{HYPOTHESIS_MARKER} If \"{f}\" holds, {}.", profile.speculative_lens))
            .collect();
        if speculative_effects.is_empty() {
            speculative_effects.push(format!(
                "{HYPOTHESIS_MARKER} {INSUFFICIENT_DATA}: too few source facts; the general expectation is that {}.",
                profile.speculative_lens
            ));
        }

        let area = input.category.display_name();
        let mut opportunities = vec![
            format!("{} ({area}).", profile.opportunity_lens),
            format!(
                "A first sign of traction in {area} would show in {}.",
                context.metrics[1]
            ),
        ];
        opportunities.extend(
            facts
                .iter()
                .skip(5)
                .map(|f| format!("Grounded in the source: {f}")),
        );

        let mut counter_risks = vec![
            format!("{}.", profile.risk_lens),
            format!(
                "If {} stays flat, this reading overstates the shift in {area}.",
                context.metrics[0]
            ),
        ];
        if let [_, .., last] = facts.as_slice() {
            counter_risks.push(format!(
                "The reading leans on \"{last}\"; a correction there would weaken it."
            ));
        }
        if insufficient {
            counter_risks.push(format!(
                "{INSUFFICIENT_EVIDENCE}: none of the core facts could be quoted verbatim from the source body; treat this analysis as unverified."
            ));
        }

        let strategic_outlook = format!("{} {}", context.dynamics, profile.outlook_lens);

        let evidence_density = excerpts.len() as f64 / facts.len().max(1) as f64;
        let signal = signal_strength(&input.scores, evidence_density);

        DeepDiveReport {
            item_id: input.item.id.clone(),
            category: input.category,
            core_facts: facts,
            evidence_excerpts: excerpts,
            insufficient_evidence: insufficient,
            mechanism,
            first_principles_text,
            direct_effects,
            speculative_effects,
            opportunities,
            counter_risks,
            strategic_outlook,
            observation_metrics: input.category.observation_metrics(),
            evidence_density,
            signal_strength: signal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(body: &str, key_points: Vec<&str>, category: Category) -> AnalysisInput {
        AnalysisInput::new(
            Item::new("id-1", "Blog", "Weekly update").with_body(body),
            Annotation {
                scores: Scores::new(8.0, 7.0, 6.0, 7.5, 8.0),
                dup_risk: 0.1,
                category,
                key_points: key_points.into_iter().map(String::from).collect(),
            },
        )
    }

    #[test]
    fn signal_strength_uses_exact_weights() {
        let s = Scores::new(8.0, 7.0, 6.0, 7.5, 8.0);
        // 1.6 + 1.05 + 0.9 + 1.125 + 1.2 + 0.2*0.5*10 = 6.875 → 6.88
        assert_eq!(signal_strength(&s, 0.5), 6.88);
        assert_eq!(signal_strength(&Scores::new(10.0, 10.0, 10.0, 10.0, 10.0), 1.0), 10.0);
        assert_eq!(signal_strength(&Scores::default(), 0.0), 0.0);
    }

    #[test]
    fn empty_input_degrades_gracefully() {
        let r = NarrativeAssembler::new(AnalysisConfig::default())
            .assemble(&input("", vec![], Category::AiMl));
        assert!(r.core_facts.is_empty());
        assert!(r.evidence_excerpts.is_empty());
        assert!(r.insufficient_evidence);
        assert_eq!(r.evidence_density, 0.0);
        assert!(r.first_principles_text.contains("Insufficient evidence"));
        assert_eq!(r.observation_metrics.len(), 5);
        assert!(r.speculative_effects.iter().all(|s| s.starts_with(HYPOTHESIS_MARKER)));
        assert!((0.0..=10.0).contains(&r.signal_strength));
    }

    #[test]
    fn facts_from_key_points_get_verbatim_evidence() {
        let body = "The scheduler now preempts long jobs. Queue wait dropped from 9 to 2 minutes. \
                    Operators can pin jobs to racks. A new quota API ships next month. \
                    Billing is per second now.";
        let r = NarrativeAssembler::new(AnalysisConfig::default()).assemble(&input(
            body,
            vec![
                "The scheduler now preempts long jobs",
                "Queue wait dropped from 9 to 2 minutes",
                "An invented paraphrase absent from the body",
            ],
            Category::CloudInfra,
        ));
        assert_eq!(r.core_facts.len(), 3);
        assert_eq!(r.evidence_excerpts.len(), 2);
        assert!(!r.insufficient_evidence);
        assert!((r.evidence_density - 2.0 / 3.0).abs() < 1e-9);
        assert!(r
            .first_principles_text
            .contains("The scheduler now preempts long jobs"));
        for ex in &r.evidence_excerpts {
            assert!(body.contains(ex.text.trim_end_matches('…')));
            assert!(ex.fact_index < r.core_facts.len());
        }
        assert_eq!(
            r.observation_metrics,
            Category::CloudInfra.observation_metrics()
        );
    }

    #[test]
    fn paraphrased_facts_mark_insufficient_evidence() {
        let r = NarrativeAssembler::new(AnalysisConfig::default()).assemble(&input(
            "",
            vec!["Vendor claims a large speedup in tests"],
            Category::Hardware,
        ));
        assert_eq!(r.core_facts.len(), 1);
        assert!(r.insufficient_evidence);
        assert!(r.first_principles_text.contains(INSUFFICIENT_EVIDENCE));
        assert!(r.counter_risks.iter().any(|c| c.starts_with(INSUFFICIENT_EVIDENCE)));
    }

    #[test]
    fn gate_uses_score_and_dup_risk() {
        let cfg = AnalysisConfig::default();
        let mut i = input("x", vec![], Category::Fintech);
        assert!(passes_gate(&i, &cfg));
        i.scores.final_score = 6.99;
        assert!(!passes_gate(&i, &cfg));
        i.scores.final_score = 7.0;
        i.dup_risk = 0.26;
        assert!(!passes_gate(&i, &cfg));
    }

    #[test]
    fn annotation_values_are_clamped() {
        let i = AnalysisInput::new(
            Item::new("x", "s", "t"),
            Annotation {
                scores: Scores {
                    novelty: 14.0,
                    utility: -2.0,
                    heat: f64::NAN,
                    feasibility: 5.0,
                    final_score: 9.0,
                },
                dup_risk: 3.0,
                category: Category::Security,
                key_points: vec![],
            },
        );
        assert_eq!(i.scores.novelty, 10.0);
        assert_eq!(i.scores.utility, 0.0);
        assert_eq!(i.scores.heat, 0.0);
        assert_eq!(i.dup_risk, 1.0);
    }
}
