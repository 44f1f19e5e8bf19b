//! Category context table: 11 topical categories, each with one fixed
//! stakeholder-dynamics sentence and exactly 5 observation metrics.
//!
//! Entries are `&'static str` and no function here accepts extracted text, so
//! role descriptions can never carry an entity name.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use crate::config::ConfigError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    AiMl,
    DeveloperTools,
    CloudInfra,
    Security,
    Hardware,
    ConsumerTech,
    EnterpriseSoftware,
    Fintech,
    PolicyRegulation,
    OpenSource,
    ScienceResearch,
}

#[derive(Debug)]
pub struct CategoryContext {
    pub dynamics: &'static str,
    pub metrics: [&'static str; 5],
}

impl Category {
    pub const ALL: [Category; 11] = [
        Category::AiMl,
        Category::DeveloperTools,
        Category::CloudInfra,
        Category::Security,
        Category::Hardware,
        Category::ConsumerTech,
        Category::EnterpriseSoftware,
        Category::Fintech,
        Category::PolicyRegulation,
        Category::OpenSource,
        Category::ScienceResearch,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Category::AiMl => "ai_ml",
            Category::DeveloperTools => "developer_tools",
            Category::CloudInfra => "cloud_infra",
            Category::Security => "security",
            Category::Hardware => "hardware",
            Category::ConsumerTech => "consumer_tech",
            Category::EnterpriseSoftware => "enterprise_software",
            Category::Fintech => "fintech",
            Category::PolicyRegulation => "policy_regulation",
            Category::OpenSource => "open_source",
            Category::ScienceResearch => "science_research",
        }
    }

    /// Human-readable name used inside report prose.
    pub fn display_name(self) -> &'static str {
        match self {
            Category::AiMl => "AI and machine learning",
            Category::DeveloperTools => "developer tools",
            Category::CloudInfra => "cloud infrastructure",
            Category::Security => "security",
            Category::Hardware => "hardware",
            Category::ConsumerTech => "consumer tech",
            Category::EnterpriseSoftware => "enterprise software",
            Category::Fintech => "fintech",
            Category::PolicyRegulation => "policy and regulation",
            Category::OpenSource => "open source",
            Category::ScienceResearch => "science and research",
        }
    }

    pub fn context(self) -> &'static CategoryContext {
        match self {
            Category::AiMl => &AI_ML,
            Category::DeveloperTools => &DEVELOPER_TOOLS,
            Category::CloudInfra => &CLOUD_INFRA,
            Category::Security => &SECURITY,
            Category::Hardware => &HARDWARE,
            Category::ConsumerTech => &CONSUMER_TECH,
            Category::EnterpriseSoftware => &ENTERPRISE_SOFTWARE,
            Category::Fintech => &FINTECH,
            Category::PolicyRegulation => &POLICY_REGULATION,
            Category::OpenSource => &OPEN_SOURCE,
            Category::ScienceResearch => &SCIENCE_RESEARCH,
        }
    }

    pub fn observation_metrics(self) -> Vec<String> {
        self.context().metrics.iter().map(|m| m.to_string()).collect()
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Category {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Category::ALL
            .iter()
            .copied()
            .find(|c| c.label() == wanted)
            .ok_or_else(|| ConfigError::UnknownCategory(s.to_string()))
    }
}

/// Structural check run before any item is processed.
pub fn validate_table() -> Result<(), ConfigError> {
    for c in Category::ALL {
        let ctx = c.context();
        let broken = |reason: &str| ConfigError::InvalidValue {
            key: "category_table",
            reason: format!("{}: {reason}", c.label()),
        };
        if ctx.dynamics.trim().is_empty() {
            return Err(broken("empty dynamics sentence"));
        }
        if ctx.dynamics.contains('{') || ctx.metrics.iter().any(|m| m.contains('{')) {
            return Err(broken("placeholder found"));
        }
        let uniq: HashSet<_> = ctx.metrics.iter().collect();
        if uniq.len() != 5 || ctx.metrics.iter().any(|m| m.trim().is_empty()) {
            return Err(broken("metrics must be 5 distinct non-empty names"));
        }
    }
    Ok(())
}

static AI_ML: CategoryContext = CategoryContext {
    dynamics: "Model developers, compute providers and application builders compete for the same margin: whoever controls training data, compute access or distribution captures most of the value, while downstream users weigh lock-in against capability.",
    metrics: [
        "benchmark delta vs. prior state of the art",
        "inference cost per million tokens",
        "open-weight release cadence",
        "production deployment announcements",
        "accelerator availability and lead time",
    ],
};

static DEVELOPER_TOOLS: CategoryContext = CategoryContext {
    dynamics: "Tool vendors win by becoming the default in a developer's daily loop; switching costs are low per seat but high per team, so vendors subsidize individual use to capture organizational budgets.",
    metrics: [
        "weekly active developers",
        "repository stars and forks trend",
        "package download growth",
        "editor and CI integrations",
        "paid seat conversion rate",
    ],
};

static CLOUD_INFRA: CategoryContext = CategoryContext {
    dynamics: "Large cloud providers, independent infrastructure vendors and internal platform teams bargain over who absorbs operational risk; customers pay premiums to offload it but resist pricing power once workloads are entrenched.",
    metrics: [
        "price per vCPU-hour and GB-month",
        "regional availability",
        "egress fee changes",
        "reported outage minutes",
        "managed-service migrations",
    ],
};

static SECURITY: CategoryContext = CategoryContext {
    dynamics: "Attackers, defenders and security vendors operate under asymmetric costs: one exploitable gap is enough for the attacker while defenders must close every path, which pushes buyers toward consolidated platforms and disclosure norms.",
    metrics: [
        "CVE count and severity score",
        "time to patch",
        "in-the-wild exploitation reports",
        "affected install base",
        "incident disclosure lag",
    ],
};

static HARDWARE: CategoryContext = CategoryContext {
    dynamics: "Chip designers, foundries and device makers depend on each other's roadmaps; capacity is committed years ahead, so bargaining power shifts to whoever holds scarce process nodes or packaging capacity.",
    metrics: [
        "performance per watt",
        "foundry capacity utilization",
        "shipment volumes",
        "bill-of-materials cost",
        "delivery lead time",
    ],
};

static CONSUMER_TECH: CategoryContext = CategoryContext {
    dynamics: "Platforms trade user attention against monetization; users churn quickly when trust or convenience drops, and app makers pass platform fees through to prices.",
    metrics: [
        "daily active users",
        "day-30 retention",
        "app store ranking",
        "average revenue per user",
        "review sentiment trend",
    ],
};

static ENTERPRISE_SOFTWARE: CategoryContext = CategoryContext {
    dynamics: "Enterprise buyers optimize for risk and integration cost rather than features, so incumbents defend through bundling while challengers win departmental footholds before facing procurement.",
    metrics: [
        "net revenue retention",
        "seat expansion rate",
        "sales cycle length",
        "integration marketplace size",
        "mid-market churn",
    ],
};

static FINTECH: CategoryContext = CategoryContext {
    dynamics: "Payment networks, banks and new entrants share regulated rails; the party carrying compliance and fraud liability sets the terms, and margin moves toward whoever owns the customer relationship.",
    metrics: [
        "transaction volume",
        "take rate",
        "fraud loss rate",
        "licensing approvals",
        "customer acquisition cost",
    ],
};

static POLICY_REGULATION: CategoryContext = CategoryContext {
    dynamics: "Legislators, regulators and regulated firms negotiate through rule-making and enforcement; compliance costs fall hardest on smaller players, which can entrench incumbents that helped shape the rules.",
    metrics: [
        "enforcement actions",
        "compliance deadlines",
        "fines issued",
        "public comment volume",
        "jurisdictions adopting similar rules",
    ],
};

static OPEN_SOURCE: CategoryContext = CategoryContext {
    dynamics: "Maintainers, corporate sponsors and downstream users split the cost of shared code unevenly; licensing and governance choices decide whether value flows back to the project or to hosted offerings built on it.",
    metrics: [
        "active maintainers",
        "contributor growth",
        "release frequency",
        "license change events",
        "downstream dependents",
    ],
};

static SCIENCE_RESEARCH: CategoryContext = CategoryContext {
    dynamics: "Research groups, funders and industry labs compete for attention and reproducibility credit; results matter commercially only once replicated and turned into tools others can use.",
    metrics: [
        "independent replications",
        "citation velocity",
        "dataset and code availability",
        "follow-up funding",
        "time to first commercial application",
    ],
};
