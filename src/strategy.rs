//! The strategy catalogue and filter (spec §4.8): a fixed set of named
//! action families gated by expressed traits, available tools, and
//! resource runway, then scored and ranked by priority.

use std::collections::HashSet;

use crate::epigenetics::{EnvironmentalState, Mode};
use crate::expression::ExpressionResult;
use crate::gene::Domain;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Survival,
    Income,
    Social,
    Reproduction,
    Learning,
    Defense,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeHorizon {
    Immediate,
    Short,
    Medium,
    Long,
}

/// The 21-member action space a selected strategy eventually dispatches
/// into (spec §4.9).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionType {
    EnterDormancy,
    ExitDormancy,
    ThinkLocal,
    ThinkPremium,
    Swap,
    Stake,
    HireHuman,
    Broadcast,
    SendMessage,
    ProposeMating,
    AcceptMating,
    StoreMemory,
    Inscribe,
    Fetch,
    Post,
    Scrape,
    Transfer,
    Migrate,
    ProvideLiquidity,
    ClaimRewards,
    EvaluateHuman,
}

#[derive(Debug, Clone)]
pub struct Strategy {
    pub id: &'static str,
    pub name: &'static str,
    pub category: Category,
    /// `(gene_id, minimum normalised expression)`, each checked with a 20%
    /// tolerance.
    pub required_genes: &'static [(&'static str, f64)],
    pub required_tools: &'static [&'static str],
    pub risk: f64,
    pub complexity: f64,
    /// Stable units; may be negative (an investment).
    pub typical_payoff: f64,
    pub time_horizon: TimeHorizon,
    pub action: ActionType,
}

/// Max expressed value a gene can carry (spec §3): used to normalise
/// expressed values back down to the `[0,1]` scale the filter's threshold
/// constants (0.2, 0.3, 0.4...) are written against.
const MAX_EXPRESSED_VALUE: f64 = 3.0;

const GENE_TOLERANCE: f64 = 0.2;

macro_rules! strategy {
    ($id:expr, $name:expr, $category:expr, $genes:expr, $tools:expr, $risk:expr, $complexity:expr, $payoff:expr, $horizon:expr, $action:expr) => {
        Strategy {
            id: $id,
            name: $name,
            category: $category,
            required_genes: $genes,
            required_tools: $tools,
            risk: $risk,
            complexity: $complexity,
            typical_payoff: $payoff,
            time_horizon: $horizon,
            action: $action,
        }
    };
}

/// The fixed ~22-strategy catalogue (spec §4.8). This list — not any
/// filtering shortcut — is authoritative (spec §9 open question).
pub fn catalogue() -> Vec<Strategy> {
    use Category::*;
    use TimeHorizon::*;
    vec![
        strategy!("low-power-conservation", "Low-Power Conservation", Survival, &[("dormancy_trigger", 0.2)], &[], 0.05, 0.1, -0.01, Immediate, ActionType::EnterDormancy),
        strategy!("exit-dormancy-recovery", "Exit Dormancy & Recover", Survival, &[("hibernation_tolerance", 0.15)], &[], 0.1, 0.1, 0.0, Immediate, ActionType::ExitDormancy),
        strategy!("runway-stretch", "Runway Stretch", Survival, &[("runway_sensitivity", 0.3)], &[], 0.1, 0.2, -0.02, Short, ActionType::StoreMemory),
        strategy!("emergency-liquidation", "Emergency Liquidation", Survival, &[("resource_hoarding", 0.2)], &["wallet"], 0.3, 0.2, 0.3, Immediate, ActionType::Swap),

        strategy!("local-inference-gig", "Local Inference Gig", Income, &[("api_utilization", 0.2)], &["llm-local"], 0.2, 0.2, 0.5, Short, ActionType::ThinkLocal),
        strategy!("premium-inference-service", "Premium Inference Service", Income, &[("data_analysis", 0.3)], &["llm-premium"], 0.3, 0.4, 2.0, Medium, ActionType::ThinkPremium),
        strategy!("yield-farming", "Yield Farming", Income, &[("yield_seeking", 0.3)], &["defi"], 0.5, 0.5, 1.0, Medium, ActionType::ProvideLiquidity),
        strategy!("staking-rewards", "Staking Rewards", Income, &[("income_diversification", 0.3)], &["wallet"], 0.2, 0.2, 0.3, Medium, ActionType::Stake),
        strategy!("content-monetization", "Content Monetization", Income, &[("content_creation", 0.3)], &["social-media"], 0.3, 0.3, 0.4, Short, ActionType::Post),
        strategy!("data-scraping-service", "Data Scraping Service", Income, &[("scraping_proficiency", 0.3)], &["scraper"], 0.3, 0.4, 0.5, Short, ActionType::Scrape),

        strategy!("broadcast-signal", "Broadcast Signal", Social, &[("agent_cooperation", 0.2)], &["messaging"], 0.1, 0.1, 0.0, Immediate, ActionType::Broadcast),
        strategy!("direct-outreach", "Direct Outreach", Social, &[("communication_clarity", 0.2)], &["messaging"], 0.1, 0.1, 0.0, Immediate, ActionType::SendMessage),
        strategy!("cooperative-alliance", "Cooperative Alliance", Social, &[("agent_cooperation", 0.4), ("trust_default", 0.4)], &["messaging"], 0.2, 0.3, 0.1, Short, ActionType::SendMessage),
        strategy!("inscribe-public-record", "Inscribe Public Record", Social, &[("inscription_diligence", 0.2)], &["permanent-storage"], 0.05, 0.1, -0.02, Immediate, ActionType::Inscribe),

        strategy!("propose-mating-signal", "Propose Mating Signal", Reproduction, &[("mate_selection", 0.3)], &["messaging"], 0.3, 0.4, -1.0, Long, ActionType::ProposeMating),
        strategy!("accept-mating-proposal", "Accept Mating Proposal", Reproduction, &[("parental_investment", 0.2)], &["messaging"], 0.3, 0.3, -1.0, Long, ActionType::AcceptMating),
        strategy!("migrate-to-new-niche", "Migrate to New Niche", Reproduction, &[("migration_readiness", 0.3)], &[], 0.4, 0.3, -0.5, Medium, ActionType::Migrate),

        strategy!("self-directed-study", "Self-Directed Study", Learning, &[("learning_rate", 0.3)], &["llm-local"], 0.1, 0.2, -0.1, Short, ActionType::ThinkLocal),
        strategy!("memory-consolidation-pass", "Memory Consolidation Pass", Learning, &[("memory_consolidation", 0.2)], &[], 0.05, 0.1, -0.01, Immediate, ActionType::StoreMemory),

        strategy!("hire-human-auditor", "Hire Human Auditor", Defense, &[("human_hiring", 0.2)], &["human-marketplace"], 0.3, 0.3, -2.0, Medium, ActionType::HireHuman),
        strategy!("evaluate-human-performance", "Evaluate Human Performance", Defense, &[("human_evaluation", 0.2)], &["human-marketplace"], 0.1, 0.2, 0.0, Short, ActionType::EvaluateHuman),
        strategy!("threat-response-lockdown", "Threat Response Lockdown", Defense, &[("threat_perception", 0.3)], &[], 0.1, 0.1, -0.05, Immediate, ActionType::EnterDormancy),
    ]
}

fn normalized_value(expressed: &ExpressionResult, gene_id: &str) -> f64 {
    (expressed.value_of(gene_id).unwrap_or(0.0) / MAX_EXPRESSED_VALUE).clamp(0.0, 1.0)
}

fn domain_max(expressed: &ExpressionResult, domain: Domain) -> f64 {
    expressed
        .expressed_genes
        .iter()
        .filter(|g| g.domain == domain)
        .map(|g| (g.expressed_value / MAX_EXPRESSED_VALUE).clamp(0.0, 1.0))
        .fold(0.0, f64::max)
}

#[derive(Debug, Clone, Copy)]
pub struct Tolerances {
    pub risk_tolerance: f64,
    pub complexity_tolerance: f64,
    pub social_orientation: f64,
}

pub fn derive_tolerances(expressed: &ExpressionResult) -> Tolerances {
    let risk_appetite = normalized_value(expressed, "risk_appetite");
    let uncertainty_tolerance = normalized_value(expressed, "uncertainty_tolerance");
    let acute_stress_response = normalized_value(expressed, "acute_stress_response");
    let risk_domain_max = domain_max(expressed, Domain::RiskAssessment);
    let risk_tolerance =
        0.4 * risk_appetite + 0.3 * uncertainty_tolerance + 0.2 * (1.0 - acute_stress_response) + 0.1 * risk_domain_max;

    let working_memory = normalized_value(expressed, "working_memory");
    let metacognition = normalized_value(expressed, "metacognition");
    let learning_rate = normalized_value(expressed, "learning_rate");
    let complexity_tolerance = 0.5 * working_memory + 0.3 * metacognition + 0.2 * learning_rate;

    let agent_cooperation = normalized_value(expressed, "agent_cooperation");
    let trust_default = normalized_value(expressed, "trust_default");
    let cooperation_domain_max = domain_max(expressed, Domain::Cooperation);
    let social_orientation = 0.4 * agent_cooperation + 0.4 * trust_default + 0.2 * cooperation_domain_max;

    Tolerances { risk_tolerance, complexity_tolerance, social_orientation }
}

#[derive(Debug, Clone)]
pub struct FilteredStrategy {
    pub strategy: Strategy,
    pub genome_match: f64,
    pub estimated_success: f64,
    pub priority: f64,
}

#[derive(Debug, Clone)]
pub struct Rejection {
    pub strategy_id: &'static str,
    pub reason: String,
}

pub struct FilterInput<'a> {
    pub expressed: &'a ExpressionResult,
    pub env: &'a EnvironmentalState,
    pub available_tools: &'a HashSet<String>,
    pub runway_days: f64,
    pub market_risk: f64,
    pub experience_bonus: f64,
    pub deception_count: f64,
    pub days_thriving: f64,
}

fn genome_match(strategy: &Strategy, expressed: &ExpressionResult) -> f64 {
    if strategy.required_genes.is_empty() {
        return 1.0;
    }
    let mut numerator = 0.0;
    let mut denominator = 0.0;
    for (gene_id, min) in strategy.required_genes {
        let actual = normalized_value(expressed, gene_id);
        numerator += (actual / min).min(1.0) * min;
        denominator += min;
    }
    if denominator <= 0.0 {
        1.0
    } else {
        numerator / denominator
    }
}

fn category_urgency(category: Category, input: &FilterInput) -> f64 {
    match category {
        Category::Survival => (1.0 / input.runway_days.max(0.1)).min(1.0),
        Category::Defense => {
            if input.deception_count > 0.0 {
                (input.deception_count / 5.0).min(1.0)
            } else {
                0.0
            }
        }
        Category::Reproduction => {
            if input.days_thriving > 7.0 {
                ((input.days_thriving - 7.0) / 30.0).min(1.0)
            } else {
                0.0
            }
        }
        Category::Income | Category::Social | Category::Learning => 0.3,
    }
}

/// Run the seven-gate filter pipeline against the full catalogue, scoring
/// survivors and sorting by priority, descending (spec §4.8).
pub fn filter_strategies(input: &FilterInput) -> (Vec<FilteredStrategy>, Vec<Rejection>) {
    let tolerances = derive_tolerances(input.expressed);
    let mut survivors = Vec::new();
    let mut rejections = Vec::new();

    for strategy in catalogue() {
        if let Err(reason) = gate(&strategy, input, &tolerances) {
            rejections.push(Rejection { strategy_id: strategy.id, reason });
            continue;
        }

        let match_score = genome_match(&strategy, input.expressed);
        let tool_coverage = 1.0; // gate 2 already required every tool present
        let estimated_success = (0.6 * match_score * (1.0 - input.market_risk * 0.3) * tool_coverage
            + input.experience_bonus)
            .clamp(0.1, 0.95);

        let urgency = category_urgency(strategy.category, input);
        let risk_discount = 1.0 - strategy.risk * 0.2;
        let payoff_component = (strategy.typical_payoff / 5.0).clamp(-1.0, 1.0);
        let priority =
            0.35 * match_score + 0.25 * estimated_success + 0.2 * urgency + 0.1 * payoff_component + 0.1 * risk_discount;

        survivors.push(FilteredStrategy { strategy, genome_match: match_score, estimated_success, priority });
    }

    survivors.sort_by(|a, b| b.priority.partial_cmp(&a.priority).unwrap());
    (survivors, rejections)
}

fn gate(strategy: &Strategy, input: &FilterInput, tolerances: &Tolerances) -> Result<(), String> {
    // 1. gene requirement, 20% tolerance.
    for (gene_id, min) in strategy.required_genes {
        let actual = normalized_value(input.expressed, gene_id);
        if actual < min * (1.0 - GENE_TOLERANCE) {
            return Err(format!("gene requirement unmet: {gene_id} needs >= {min:.2}, has {actual:.2}"));
        }
    }

    // 2. tools.
    for tool in strategy.required_tools {
        if !input.available_tools.contains(*tool) {
            return Err(format!("required tool unavailable: {tool}"));
        }
    }

    // 3. risk tolerance.
    if strategy.risk > 1.5 * tolerances.risk_tolerance {
        return Err("risk exceeds tolerance".to_string());
    }

    // 4. complexity tolerance.
    if strategy.complexity > tolerances.complexity_tolerance {
        return Err("complexity exceeds tolerance".to_string());
    }

    // 5. resource check.
    if strategy.category != Category::Survival {
        let balance_after = input.env.balance + strategy.typical_payoff;
        let floor = 7.0 * input.expressed.total_metabolic_cost;
        if balance_after < floor {
            return Err("balance after payoff would breach the 7-day runway floor".to_string());
        }
    }
    match strategy.time_horizon {
        TimeHorizon::Long if input.runway_days < 14.0 => {
            return Err("long-horizon strategy needs at least 14 days of runway".to_string());
        }
        TimeHorizon::Medium if input.runway_days < 7.0 => {
            return Err("medium-horizon strategy needs at least 7 days of runway".to_string());
        }
        _ => {}
    }

    // 6. emergency override.
    if input.env.mode == Mode::Emergency {
        let allowed = strategy.category == Category::Survival
            || (strategy.category == Category::Defense && strategy.risk <= 0.3);
        if !allowed {
            return Err("emergency mode allows only survival and low-risk defense".to_string());
        }
    }

    // 7. social orientation gate.
    if strategy.category == Category::Social && tolerances.social_orientation < 0.3 {
        return Err("Social orientation too low".to_string());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExpressionDefaults;
    use crate::expression::express_genome;
    use crate::seed::create_genesis_genome;

    fn filter_with(env: EnvironmentalState, tools: &[&str]) -> (Vec<FilteredStrategy>, Vec<Rejection>) {
        let genome = create_genesis_genome("L");
        let expressed = express_genome(&genome, &env, 40.0, 0.0, &[], ExpressionDefaults::default());
        let available_tools: HashSet<String> = tools.iter().map(|s| s.to_string()).collect();
        let input = FilterInput {
            expressed: &expressed,
            env: &env,
            available_tools: &available_tools,
            runway_days: env.balance / expressed.total_metabolic_cost.max(1e-9),
            market_risk: 0.2,
            experience_bonus: 0.1,
            deception_count: env.recent_deception_count,
            days_thriving: env.days_thriving,
        };
        filter_strategies(&input)
    }

    #[test]
    fn catalogue_has_contractual_shape() {
        let all = catalogue();
        assert_eq!(all.len(), 22);
        let categories: HashSet<_> = all.iter().map(|s| s.category).collect();
        assert_eq!(categories.len(), 6);
    }

    #[test]
    fn survivors_sorted_by_descending_priority() {
        let env = EnvironmentalState { balance: 50.0, ..Default::default() };
        let (survivors, _) = filter_with(env, &["messaging", "permanent-storage", "wallet"]);
        for pair in survivors.windows(2) {
            assert!(pair[0].priority >= pair[1].priority);
        }
    }

    #[test]
    fn emergency_mode_restricts_to_survival_and_low_risk_defense() {
        let env = EnvironmentalState { balance: 1.0, mode: Mode::Emergency, ..Default::default() };
        let (survivors, _) = filter_with(env, &["messaging", "permanent-storage", "wallet"]);
        for s in &survivors {
            assert!(
                s.strategy.category == Category::Survival
                    || (s.strategy.category == Category::Defense && s.strategy.risk <= 0.3)
            );
        }
    }

    #[test]
    fn low_social_orientation_rejects_every_social_strategy_with_exact_reason() {
        let mut genome = create_genesis_genome("L");
        for id in ["agent_cooperation", "trust_default"] {
            if let Some(g) = genome.find_gene_mut(id) {
                g.set_value(0.0);
                g.set_weight(0.1);
            }
        }
        let env = EnvironmentalState { balance: 50.0, ..Default::default() };
        let expressed = express_genome(&genome, &env, 40.0, 0.0, &[], ExpressionDefaults::default());
        let available_tools: HashSet<String> = ["messaging", "permanent-storage"].iter().map(|s| s.to_string()).collect();
        let input = FilterInput {
            expressed: &expressed,
            env: &env,
            available_tools: &available_tools,
            runway_days: 30.0,
            market_risk: 0.2,
            experience_bonus: 0.1,
            deception_count: 0.0,
            days_thriving: 0.0,
        };
        let (survivors, rejections) = filter_strategies(&input);
        assert!(!survivors.iter().any(|s| s.strategy.category == Category::Social));
        let social_rejections: Vec<_> = rejections
            .iter()
            .filter(|r| catalogue().iter().any(|s| s.id == r.strategy_id && s.category == Category::Social))
            .collect();
        assert!(!social_rejections.is_empty());
        assert!(social_rejections.iter().all(|r| r.reason == "Social orientation too low"));
    }

    #[test]
    fn high_social_orientation_accepts_social_strategies() {
        let mut genome = create_genesis_genome("L");
        for id in ["agent_cooperation", "trust_default"] {
            if let Some(g) = genome.find_gene_mut(id) {
                g.set_value(0.9);
                g.set_weight(2.5);
            }
        }
        let env = EnvironmentalState { balance: 50.0, ..Default::default() };
        let expressed = express_genome(&genome, &env, 40.0, 0.0, &[], ExpressionDefaults::default());
        let available_tools: HashSet<String> = ["messaging", "permanent-storage"].iter().map(|s| s.to_string()).collect();
        let input = FilterInput {
            expressed: &expressed,
            env: &env,
            available_tools: &available_tools,
            runway_days: 30.0,
            market_risk: 0.2,
            experience_bonus: 0.1,
            deception_count: 0.0,
            days_thriving: 0.0,
        };
        let (survivors, _) = filter_strategies(&input);
        assert!(survivors.iter().any(|s| s.strategy.category == Category::Social));
    }
}
