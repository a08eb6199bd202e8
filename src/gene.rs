//! Gene — a named numeric trait with provenance (spec §3).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Domain {
    Metabolism,
    Perception,
    Cognition,
    Memory,
    ResourceManagement,
    RiskAssessment,
    Trading,
    IncomeStrategy,
    OnChainOp,
    WebNavigation,
    ContentCreation,
    DataAnalysis,
    ApiUtilization,
    SocialMedia,
    Cooperation,
    Competition,
    Communication,
    TrustModel,
    MateSelection,
    ParentalInvestment,
    HumanHiring,
    HumanCommunication,
    HumanEvaluation,
    StressResponse,
    Adaptation,
    Dormancy,
    Migration,
    SelfModel,
    StrategyEvaluation,
    Learning,
    Planning,
    NoveltySeeking,
    Regulatory,
}

impl Domain {
    pub const ALL: &'static [Domain] = &[
        Domain::Metabolism,
        Domain::Perception,
        Domain::Cognition,
        Domain::Memory,
        Domain::ResourceManagement,
        Domain::RiskAssessment,
        Domain::Trading,
        Domain::IncomeStrategy,
        Domain::OnChainOp,
        Domain::WebNavigation,
        Domain::ContentCreation,
        Domain::DataAnalysis,
        Domain::ApiUtilization,
        Domain::SocialMedia,
        Domain::Cooperation,
        Domain::Competition,
        Domain::Communication,
        Domain::TrustModel,
        Domain::MateSelection,
        Domain::ParentalInvestment,
        Domain::HumanHiring,
        Domain::HumanCommunication,
        Domain::HumanEvaluation,
        Domain::StressResponse,
        Domain::Adaptation,
        Domain::Dormancy,
        Domain::Migration,
        Domain::SelfModel,
        Domain::StrategyEvaluation,
        Domain::Learning,
        Domain::Planning,
        Domain::NoveltySeeking,
        Domain::Regulatory,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Origin {
    Primordial,
    Inherited,
    Duplicated,
    Mutated,
    HorizontalTransfer,
    DeNovo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExpressionState {
    Active,
    Silenced,
    Conditional,
}

/// A tiny total language over `{balance, starving, thriving, mode}` used by
/// conditional genes (spec §4.3). Parsed once at construction time so
/// evaluation never allocates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivationCondition {
    pub raw: String,
}

impl ActivationCondition {
    pub fn new(raw: impl Into<String>) -> Self {
        Self { raw: raw.into() }
    }
}

fn clamp(v: f64, lo: f64, hi: f64) -> f64 {
    v.max(lo).min(hi)
}

/// A developmental window (spec §4.3 step 2) during which genes of a given
/// domain express with boosted plasticity.
struct CriticalWindow {
    domain: Domain,
    start_days: f64,
    end_days: f64,
    multiplier: f64,
}

const CRITICAL_WINDOWS: &[CriticalWindow] = &[
    CriticalWindow { domain: Domain::Learning, start_days: 0.0, end_days: 7.0, multiplier: 1.5 },
    CriticalWindow { domain: Domain::Cooperation, start_days: 0.0, end_days: 14.0, multiplier: 1.3 },
    CriticalWindow { domain: Domain::MateSelection, start_days: 3.0, end_days: 21.0, multiplier: 1.2 },
    CriticalWindow { domain: Domain::RiskAssessment, start_days: 7.0, end_days: 30.0, multiplier: 1.25 },
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Gene {
    pub id: String,
    pub name: String,
    pub domain: Domain,

    value: f64,
    weight: f64,
    dominance: f64,
    plasticity: f64,
    essentiality: f64,
    metabolic_cost: f64,

    pub origin: Origin,
    pub age: u32,
    pub duplicate_of: Option<String>,
    pub acquired_from: Option<String>,

    pub expression_state: ExpressionState,
    pub activation_condition: Option<ActivationCondition>,
}

impl Gene {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        domain: Domain,
        value: f64,
        weight: f64,
        dominance: f64,
        plasticity: f64,
        essentiality: f64,
        metabolic_cost: f64,
        origin: Origin,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            domain,
            value: clamp(value, 0.0, 1.0),
            weight: clamp(weight, 0.1, 3.0),
            dominance: clamp(dominance, 0.0, 1.0),
            plasticity: clamp(plasticity, 0.0, 1.0),
            essentiality: clamp(essentiality, 0.0, 1.0),
            metabolic_cost: clamp(metabolic_cost, 0.0, 0.01),
            origin,
            age: 0,
            duplicate_of: None,
            acquired_from: None,
            expression_state: ExpressionState::Active,
            activation_condition: None,
        }
    }

    pub fn value(&self) -> f64 {
        self.value
    }
    pub fn set_value(&mut self, v: f64) {
        self.value = clamp(v, 0.0, 1.0);
    }

    pub fn weight(&self) -> f64 {
        self.weight
    }
    pub fn set_weight(&mut self, w: f64) {
        self.weight = clamp(w, 0.1, 3.0);
    }

    pub fn dominance(&self) -> f64 {
        self.dominance
    }
    pub fn set_dominance(&mut self, d: f64) {
        self.dominance = clamp(d, 0.0, 1.0);
    }

    pub fn plasticity(&self) -> f64 {
        self.plasticity
    }
    pub fn set_plasticity(&mut self, p: f64) {
        self.plasticity = clamp(p, 0.0, 1.0);
    }

    pub fn essentiality(&self) -> f64 {
        self.essentiality
    }
    pub fn set_essentiality(&mut self, e: f64) {
        self.essentiality = clamp(e, 0.0, 1.0);
    }

    pub fn metabolic_cost(&self) -> f64 {
        self.metabolic_cost
    }
    pub fn set_metabolic_cost(&mut self, c: f64) {
        self.metabolic_cost = clamp(c, 0.0, 0.01);
    }

    pub fn is_essential(&self) -> bool {
        self.essentiality >= 0.8
    }

    pub fn with_activation_condition(mut self, cond: impl Into<String>) -> Self {
        self.expression_state = ExpressionState::Conditional;
        self.activation_condition = Some(ActivationCondition::new(cond));
        self
    }

    pub fn with_silenced(mut self) -> Self {
        self.expression_state = ExpressionState::Silenced;
        self
    }

    /// Plasticity boosted by an active developmental critical window (spec
    /// §4.3 step 2): learning 0-7d, cooperation 0-14d, mate-selection
    /// 3-21d, risk-assessment 7-30d each apply their own multiplier while
    /// the agent's `age_days` falls inside the window. The epigenetic
    /// layer is plasticity's only consumer, so this is where the boost is
    /// read from rather than threaded through the expression pipeline.
    pub fn effective_plasticity(&self, age_days: f64) -> f64 {
        let mut plasticity = self.plasticity;
        for window in CRITICAL_WINDOWS {
            if window.domain == self.domain && age_days >= window.start_days && age_days < window.end_days {
                plasticity *= window.multiplier;
            }
        }
        plasticity.min(1.0)
    }

    /// Structural equality over ids and numeric fields after clamping
    /// (spec §4.1). Provenance back-references participate; age does not
    /// (two otherwise-identical genomes bred at different times would
    /// otherwise never compare equal).
    pub fn structurally_eq(&self, other: &Gene) -> bool {
        self.id == other.id
            && self.name == other.name
            && self.domain == other.domain
            && (self.value - other.value).abs() < 1e-9
            && (self.weight - other.weight).abs() < 1e-9
            && (self.dominance - other.dominance).abs() < 1e-9
            && (self.plasticity - other.plasticity).abs() < 1e-9
            && (self.essentiality - other.essentiality).abs() < 1e-9
            && (self.metabolic_cost - other.metabolic_cost).abs() < 1e-9
            && self.origin == other.origin
            && self.expression_state == other.expression_state
    }
}
