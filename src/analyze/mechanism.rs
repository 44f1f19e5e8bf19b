//! Mechanism selector: keyword scoring over 9 causal lenses.
//!
//! Score = total case-insensitive occurrences of a mechanism's keywords in
//! `title + " " + body`. ASCII keywords are prefixes that must start a word
//! ("fined" does not hit "defined"); CJK keywords match anywhere. Highest score wins; ties follow the
//! configured priority order; all-zero falls back to the configured default.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::config::{ConfigError, MechanismSettings};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mechanism {
    Scalability,
    LatencyPerformance,
    Privacy,
    Interoperability,
    RegulatoryLeverage,
    IncentiveDesign,
    SupplyChain,
    SecurityBoundary,
    AdoptionCurve,
}

/// Fixed prose attached to a mechanism. `principle` carries one `{fact}` slot,
/// filled with a verbatim core fact; nothing else is ever interpolated.
#[derive(Debug)]
pub struct MechanismProfile {
    pub principle: &'static str,
    pub direct_lens: &'static str,
    pub speculative_lens: &'static str,
    pub opportunity_lens: &'static str,
    pub risk_lens: &'static str,
    pub outlook_lens: &'static str,
}

impl Mechanism {
    pub const ALL: [Mechanism; 9] = [
        Mechanism::Scalability,
        Mechanism::LatencyPerformance,
        Mechanism::Privacy,
        Mechanism::Interoperability,
        Mechanism::RegulatoryLeverage,
        Mechanism::IncentiveDesign,
        Mechanism::SupplyChain,
        Mechanism::SecurityBoundary,
        Mechanism::AdoptionCurve,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Mechanism::Scalability => "scalability",
            Mechanism::LatencyPerformance => "latency_performance",
            Mechanism::Privacy => "privacy",
            Mechanism::Interoperability => "interoperability",
            Mechanism::RegulatoryLeverage => "regulatory_leverage",
            Mechanism::IncentiveDesign => "incentive_design",
            Mechanism::SupplyChain => "supply_chain",
            Mechanism::SecurityBoundary => "security_boundary",
            Mechanism::AdoptionCurve => "adoption_curve",
        }
    }

    /// Bilingual (English + Chinese) keyword set, lowercase.
    pub fn keywords(self) -> &'static [&'static str] {
        match self {
            Mechanism::Scalability => &[
                "scalab", "scaling", "throughput", "distributed", "cluster", "horizontal",
                "sharding", "capacity", "million users", "billion requests", "load balanc",
                "elastic", "扩展", "规模化", "分布式", "集群", "吞吐",
            ],
            Mechanism::LatencyPerformance => &[
                "latency", "performance", "faster", "speedup", "benchmark", "millisecond",
                "optimiz", "real-time", "fps", "tail latency", "cold start", "延迟", "性能",
                "加速", "优化", "实时",
            ],
            Mechanism::Privacy => &[
                "privacy", "personal data", "gdpr", "tracking", "surveillance", "end-to-end",
                "anonymi", "consent", "data protection", "telemetry", "fingerprint", "隐私",
                "个人信息", "数据保护", "追踪", "匿名",
            ],
            Mechanism::Interoperability => &[
                "interoperab", "open standard", "protocol", "compatib", "open format",
                "integration", "plugin", "cross-platform", "migrat", "file format", "webhook",
                "sdk", "互操作", "兼容", "标准", "协议", "接口",
            ],
            Mechanism::RegulatoryLeverage => &[
                "regulat", "antitrust", "compliance", "legislat", "lawmaker", "lawsuit",
                "judge", "ruling", "fined", "sanction", "ftc", "eu commission", "监管", "法规",
                "立法", "罚款", "合规",
            ],
            Mechanism::IncentiveDesign => &[
                "incentive", "pricing", "subscription", "revenue", "monetiz", "business model",
                "reward", "bounty", "free tier", "marketplace", "royalt", "paywall", "激励",
                "定价", "收费", "商业模式", "补贴",
            ],
            Mechanism::SupplyChain => &[
                "supply chain", "chip", "semiconductor", "tsmc", "export control", "shortage",
                "manufactur", "foundry", "wafer", "lithography", "inventory", "供应链",
                "芯片", "半导体", "制造", "出口管制",
            ],
            Mechanism::SecurityBoundary => &[
                "breach", "vulnerab", "cve", "exploit", "zero-day", "sandbox",
                "privilege escalation", "authentication bypass", "malware", "ransomware",
                "attack surface", "supply-chain attack", "漏洞", "攻击", "入侵", "安全边界",
                "零日",
            ],
            Mechanism::AdoptionCurve => &[
                "adoption", "users", "growth", "launch", "early adopter", "mainstream",
                "community", "downloads", "market share", "onboarding", "ecosystem", "popular",
                "用户", "增长", "普及", "生态",
            ],
        }
    }

    pub fn profile(self) -> &'static MechanismProfile {
        match self {
            Mechanism::Scalability => &SCALABILITY,
            Mechanism::LatencyPerformance => &LATENCY,
            Mechanism::Privacy => &PRIVACY,
            Mechanism::Interoperability => &INTEROP,
            Mechanism::RegulatoryLeverage => &REGULATORY,
            Mechanism::IncentiveDesign => &INCENTIVE,
            Mechanism::SupplyChain => &SUPPLY_CHAIN,
            Mechanism::SecurityBoundary => &SECURITY,
            Mechanism::AdoptionCurve => &ADOPTION,
        }
    }
}

impl fmt::Display for Mechanism {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Mechanism {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Mechanism::ALL
            .iter()
            .copied()
            .find(|m| m.label() == wanted)
            .ok_or_else(|| ConfigError::UnknownMechanism(s.to_string()))
    }
}

static SCALABILITY: MechanismProfile = MechanismProfile {
    principle: "At scale, \"{fact}\" matters if cost grows slower than usage; cheaper marginal units widen every gap.",
    direct_lens: "Capacity and load profile change",
    speculative_lens: "operators that already run at volume absorb the next demand step more cheaply than newcomers",
    opportunity_lens: "Headroom for teams able to serve demand spikes without linear cost growth",
    risk_lens: "Coordination bottlenecks that stay invisible at small scale can surface abruptly under load",
    outlook_lens: "Watch whether the unit cost curve keeps bending as volume rises.",
};

static LATENCY: MechanismProfile = MechanismProfile {
    principle: "Measured in time, \"{fact}\" moves which interactions feel instant; crossing a perceptual threshold reorganizes usage.",
    direct_lens: "Response-time budget moves",
    speculative_lens: "workloads previously batched or cached could move to interactive paths",
    opportunity_lens: "New interactive use cases that were impractical at the previous speed",
    risk_lens: "Benchmark gains may not survive real traffic, tail latency or cold starts",
    outlook_lens: "Track whether speedups hold on production workloads, not just synthetic benchmarks.",
};

static PRIVACY: MechanismProfile = MechanismProfile {
    principle: "By data custody, \"{fact}\" redraws what is collected; trust follows whoever proves the narrower flow.",
    direct_lens: "Data collection and retention footprint changes",
    speculative_lens: "products relying on broad data capture may need consent or architecture changes",
    opportunity_lens: "Differentiation for offerings that minimize or locally process personal data",
    risk_lens: "Privacy claims can outrun verifiable guarantees and invite enforcement",
    outlook_lens: "Follow independent audits and default settings rather than announcements.",
};

static INTEROP: MechanismProfile = MechanismProfile {
    principle: "As a boundary change, \"{fact}\" alters what can talk to what; shared formats cut switching costs.",
    direct_lens: "Integration surface changes",
    speculative_lens: "switching costs between competing stacks could fall as shared formats spread",
    opportunity_lens: "Tooling and services that bridge newly compatible systems",
    risk_lens: "Partial compatibility can fragment the ecosystem into subtly incompatible dialects",
    outlook_lens: "Count independent implementations; one vendor's support is not yet a standard.",
};

static REGULATORY: MechanismProfile = MechanismProfile {
    principle: "As a rule change, \"{fact}\" moves compliance cost; rules sized for giants weigh most on small budgets.",
    direct_lens: "Compliance obligations shift",
    speculative_lens: "enforcement practice, not statute text, would decide who carries the cost",
    opportunity_lens: "Compliance tooling and advisory work for affected firms",
    risk_lens: "Rules can be narrowed, delayed or struck down before taking effect",
    outlook_lens: "Watch enforcement dates and first cases rather than headline scope.",
};

static INCENTIVE: MechanismProfile = MechanismProfile {
    principle: "Following the money, \"{fact}\" changes who is paid for what; behavior drifts to the cheapest path.",
    direct_lens: "Pricing and reward structure changes",
    speculative_lens: "participants would adjust behavior toward the newly rewarded actions",
    opportunity_lens: "Arbitrage for participants whose costs sit below the new price points",
    risk_lens: "Misaligned rewards can invite gaming or erode trust with existing customers",
    outlook_lens: "Check whether revenue follows usage or usage follows subsidies.",
};

static SUPPLY_CHAIN: MechanismProfile = MechanismProfile {
    principle: "Traced upstream, \"{fact}\" rests on capacity booked years ahead; the scarce step holds the leverage.",
    direct_lens: "Upstream capacity and sourcing shift",
    speculative_lens: "lead times and allocation priorities for downstream builders could change",
    opportunity_lens: "Alternative suppliers and second-source strategies gain leverage",
    risk_lens: "Concentration in a single region or supplier leaves little slack for disruption",
    outlook_lens: "Monitor lead times and capacity announcements at the constrained step.",
};

static SECURITY: MechanismProfile = MechanismProfile {
    principle: "As a trust boundary, \"{fact}\" shows an assumption failing or holding; attackers need one gap, defenders every path.",
    direct_lens: "Exposure and remediation work change",
    speculative_lens: "similar flaws could surface in components sharing the same design assumption",
    opportunity_lens: "Detection, patch management and hardening services for exposed systems",
    risk_lens: "Unpatched long-tail deployments keep the exposure alive after disclosure",
    outlook_lens: "Watch exploitation reports and patch uptake over the following weeks.",
};

static ADOPTION: MechanismProfile = MechanismProfile {
    principle: "On the adoption curve, \"{fact}\" signals who moves next; it compounds only if pragmatists follow.",
    direct_lens: "User and developer uptake shifts",
    speculative_lens: "pragmatic adopters could follow once early users demonstrate repeatable value",
    opportunity_lens: "Onboarding, migration help and complementary products for new adopters",
    risk_lens: "Early interest can stall before reaching mainstream users",
    outlook_lens: "Look for retention and repeat usage, not launch-week spikes.",
};

/// Configured selector (priority + default come from `MechanismSettings`).
#[derive(Debug, Clone)]
pub struct MechanismSelector {
    settings: MechanismSettings,
}

impl Default for MechanismSelector {
    fn default() -> Self {
        Self::new(MechanismSettings::default())
    }
}

impl MechanismSelector {
    pub fn new(settings: MechanismSettings) -> Self {
        Self { settings }
    }

    /// Per-mechanism keyword hit counts, in `Mechanism::ALL` order.
    pub fn scores(&self, title: &str, body: &str) -> Vec<(Mechanism, usize)> {
        let text = format!("{title} {body}").to_lowercase();
        Mechanism::ALL
            .iter()
            .map(|m| {
                let hits = m
                    .keywords()
                    .iter()
                    .map(|k| keyword_hits(&text, k))
                    .sum();
                (*m, hits)
            })
            .collect()
    }

    pub fn select(&self, title: &str, body: &str) -> Mechanism {
        let scores = self.scores(title, body);
        let best = scores.iter().map(|(_, s)| *s).max().unwrap_or(0);
        if best == 0 {
            return self.settings.default;
        }
        // Earlier in the priority list wins ties; anything missing from the list ranks last.
        let rank = |m: &Mechanism| {
            self.settings
                .priority
                .iter()
                .position(|p| p == m)
                .unwrap_or(usize::MAX)
        };
        scores
            .iter()
            .filter(|(_, s)| *s == best)
            .map(|(m, _)| *m)
            .min_by_key(rank)
            .unwrap_or(self.settings.default)
    }
}

/// Occurrences of `keyword` in `text`, both lowercase.
fn keyword_hits(text: &str, keyword: &str) -> usize {
    let needs_word_start = keyword
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphanumeric());
    if !needs_word_start {
        return text.matches(keyword).count();
    }
    text.match_indices(keyword)
        .filter(|(at, _)| {
            text[..*at]
                .chars()
                .next_back()
                .map_or(true, |c| !c.is_alphanumeric())
        })
        .count()
}

/// Pure selection with the default priority order and fallback.
pub fn select_mechanism(title: &str, body: &str) -> Mechanism {
    MechanismSelector::default().select(title, body)
}
