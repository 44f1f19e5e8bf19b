// tests/analysis_properties.rs
use once_cell::sync::Lazy;
use regex::Regex;

use digest_analyzer::analyze::narrative::{NarrativeAssembler, HYPOTHESIS_MARKER};
use digest_analyzer::analyze::{analyze_batch, check_diversity, MechanismSelector};
use digest_analyzer::config::AnalysisConfig;
use digest_analyzer::{
    select_mechanism, AnalysisInput, Annotation, Category, Item, Mechanism, MetricsCollector,
    Scores,
};

fn input(id: &str, title: &str, body: &str, category: Category) -> AnalysisInput {
    AnalysisInput::new(
        Item::new(id, "Feed", title).with_body(body),
        Annotation {
            scores: Scores::new(8.0, 7.5, 6.0, 7.0, 8.2),
            dup_risk: 0.1,
            category,
            key_points: vec![],
        },
    )
}

fn heterogeneous_batch() -> Vec<AnalysisInput> {
    vec![
        input(
            "sec",
            "Critical vulnerability in popular VPN appliance",
            "Researchers disclosed a breach path in the appliance firmware. The flaw is tracked as \
             CVE-2025-0101 and allows an authentication bypass. Attackers exploited it before a \
             patch shipped. Vendors urged customers to rotate credentials immediately.",
            Category::Security,
        ),
        input(
            "reg",
            "EU regulators act on office suite bundling",
            "The EU Commission concluded its antitrust review of the bundled office suite. \
             Regulators said the bundling harmed rival vendors for years. The company was fined \
             and must offer an unbundled edition. A court appeal is expected within weeks.",
            Category::PolicyRegulation,
        ),
        input(
            "hw",
            "Foundry shortage delays next-gen accelerators",
            "A wafer shortage at the leading foundry pushed accelerator deliveries into next \
             year. Export control rules also restrict which customers can receive the parts. \
             Board makers are drawing down inventory to keep shipping. Analysts expect chip \
             prices to stay elevated.",
            Category::Hardware,
        ),
        input(
            "dev",
            "New runtime cuts cold start latency",
            "The new runtime reduces cold start time from 900 to 120 milliseconds. Tail latency \
             under load dropped by half in the published benchmark. The team credits an optimized \
             snapshot loader for the speedup. Existing functions run unchanged after a redeploy.",
            Category::DeveloperTools,
        ),
        input(
            "priv",
            "Messaging app drops third-party tracking library",
            "The messaging app removed a third-party tracking library after a privacy audit. \
             Telemetry is now opt-in and requires explicit consent. End-to-end encryption is \
             enabled by default for all chats. Personal data exports are available from the \
             settings page.",
            Category::ConsumerTech,
        ),
    ]
}

#[test]
fn breach_vulnerability_cve_selects_security_boundary() {
    let m = select_mechanism(
        "Breach at hosting firm",
        "A vulnerability tracked as CVE-2024-1234 was used in the breach.",
    );
    assert_eq!(m, Mechanism::SecurityBoundary);
}

#[test]
fn mechanism_selection_is_pure() {
    let selector = MechanismSelector::default();
    for i in heterogeneous_batch() {
        let a = selector.select(&i.item.title, &i.item.body);
        let b = select_mechanism(&i.item.title, &i.item.body);
        let c = selector.select(&i.item.title, &i.item.body);
        assert_eq!(a, b);
        assert_eq!(b, c);
    }
}

#[test]
fn heterogeneous_batch_produces_diverse_narratives() {
    let cfg = AnalysisConfig::default();
    let assembler = NarrativeAssembler::new(cfg.clone());
    let out = analyze_batch(
        &heterogeneous_batch(),
        &assembler,
        &MetricsCollector::with_run_id("t"),
    );
    assert_eq!(out.reports.len(), 5);

    let mechanisms: Vec<Mechanism> = out.reports.iter().map(|r| r.mechanism).collect();
    assert_eq!(
        mechanisms,
        vec![
            Mechanism::SecurityBoundary,
            Mechanism::RegulatoryLeverage,
            Mechanism::SupplyChain,
            Mechanism::LatencyPerformance,
            Mechanism::Privacy,
        ]
    );

    let d = check_diversity(&out.reports, &cfg);
    assert!(d.distinct_mechanisms >= 3);
    assert!(d.below_threshold_ratio >= 0.7);
    assert!(d.passed);
    assert_eq!(d, out.diversity);
}

#[test]
fn same_mechanism_short_facts_stay_below_similarity_threshold() {
    let cfg = AnalysisConfig::default();
    let assembler = NarrativeAssembler::new(cfg.clone());
    let batch = vec![
        input("bank", "Quarterly note", "Bank profits doubled.", Category::Fintech),
        input("branch", "Branch note", "Branch offices closed.", Category::Fintech),
        input("fab", "Plant note", "Two plants went idle.", Category::Hardware),
    ];
    let out = analyze_batch(&batch, &assembler, &MetricsCollector::with_run_id("t"));
    assert_eq!(out.reports.len(), 3);
    assert!(out
        .reports
        .iter()
        .all(|r| r.mechanism == Mechanism::AdoptionCurve));

    let d = check_diversity(&out.reports, &cfg);
    assert_eq!(d.exempt_pairs, 0);
    assert!(d.max_similarity < 0.7, "max similarity {}", d.max_similarity);
    assert!(d.passed);
}

#[test]
fn risks_and_opportunities_follow_the_category() {
    let assembler = NarrativeAssembler::new(AnalysisConfig::default());
    let body = "Bank profits doubled. Branch offices closed across the region.";
    let fin = assembler.assemble(&input("a", "Note", body, Category::Fintech));
    let hw = assembler.assemble(&input("b", "Note", body, Category::Hardware));
    assert_eq!(fin.mechanism, hw.mechanism);
    assert_ne!(fin.counter_risks, hw.counter_risks);
    assert_ne!(fin.opportunities, hw.opportunities);

    let fin_metric = Category::Fintech.context().metrics[0];
    assert!(fin.counter_risks.iter().any(|r| r.contains(fin_metric)));
    // the last core fact is carried into the risks
    assert!(fin
        .counter_risks
        .iter()
        .any(|r| r.contains("Branch offices closed across the region")));
}

#[test]
fn scores_stay_in_range_and_hypotheses_are_marked() {
    let assembler = NarrativeAssembler::new(AnalysisConfig::default());
    let mut batch = heterogeneous_batch();
    batch.push(input("empty", "", "", Category::ScienceResearch));
    for i in &batch {
        let r = assembler.assemble(i);
        assert!(r.evidence_density >= 0.0 && r.evidence_density <= 1.0);
        assert!((0.0..=10.0).contains(&r.signal_strength));
        assert!(!r.speculative_effects.is_empty());
        assert!(r
            .speculative_effects
            .iter()
            .all(|s| s.starts_with(HYPOTHESIS_MARKER)));
        assert_eq!(r.observation_metrics.len(), 5);
        for ex in &r.evidence_excerpts {
            assert!(ex.text.chars().count() <= 160);
        }
    }
}

static ROLE_HOLDER: Lazy<Regex> = Lazy::new(|| {
    let roles = "regulator|incumbent|challenger|supplier|buyer|customer|attacker|defender|maintainer|sponsor|platform|vendor|competitor";
    Regex::new(&format!(
        r"(?i)(acme corp|jane doe)\s*(\(|:|,)?\s*(as|is|acts as)?\s*(the|a|an)?\s*({roles})\b|({roles})\s*[:=(]\s*(acme corp|jane doe)"
    ))
    .unwrap()
});

#[test]
fn entities_never_appear_as_role_holders() {
    let body = "Acme Corp shipped a new build system on Monday. Jane Doe said the rollout \
                covers every team. Builds finish in half the time on the same hardware. \
                The project remains free for open source repositories.";
    let assembler = NarrativeAssembler::new(AnalysisConfig::default());
    for category in Category::ALL {
        let mut i = input("e", "Acme Corp ships faster builds", body, category);
        i.key_points = vec![
            "Acme Corp shipped a new build system on Monday".into(),
            "Builds finish in half the time on the same hardware".into(),
        ];
        let r = assembler.assemble(&i);
        for field in r.text_fields() {
            assert!(
                !ROLE_HOLDER.is_match(field),
                "{category}: role assignment in {field:?}"
            );
        }
        // context prose never mentions the entity at all
        assert!(!r.strategic_outlook.contains("Acme"));
        assert!(r.observation_metrics.iter().all(|m| !m.contains("Acme")));
        assert!(r.counter_risks.iter().all(|c| !c.contains("Jane")));
    }
}

#[test]
fn empty_input_still_yields_a_report() {
    let assembler = NarrativeAssembler::new(AnalysisConfig::default());
    let r = assembler.assemble(&input("e", "", "", Category::AiMl));
    assert_eq!(r.evidence_density, 0.0);
    assert!(r.insufficient_evidence);
    assert!(r
        .first_principles_text
        .to_lowercase()
        .contains("insufficient evidence"));
    assert!(r.core_facts.is_empty());
}
