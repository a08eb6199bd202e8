//! The initial gene pool (spec §4.2): eight seed chromosomes totalling
//! ~64 genes, and `createGenesisGenome`. These numbers are part of the
//! wire contract — a reimplementation must reproduce them exactly so that
//! genesis genome hashes are portable across implementations.
//!
//! The metabolism chromosome's `cycle_speed` gene is what `survival.rs`
//! reads to derive the per-agent cycle interval (spec §4.10); it is
//! distinct from `circadian_pacemaker`, which drives the oscillating
//! regulatory edge onto `metabolism_rate`.

use crate::chromosome::Chromosome;
use crate::gene::{Domain, Gene, Origin};
use crate::genome::DynamicGenome;
use crate::regulatory::{LogicTag, Relationship, RegulatoryEdge};

#[allow(clippy::too_many_arguments)]
fn g(
    id: &str,
    name: &str,
    domain: Domain,
    value: f64,
    weight: f64,
    dominance: f64,
    plasticity: f64,
    essentiality: f64,
    metabolic_cost: f64,
) -> Gene {
    Gene::new(id, name, domain, value, weight, dominance, plasticity, essentiality, metabolic_cost, Origin::Primordial)
}

fn metabolism_and_survival() -> Chromosome {
    let mut chr = Chromosome::new("metabolism", "Metabolism & Survival", true);
    for gene in [
        g("metabolism_rate", "Metabolic Rate", Domain::Metabolism, 0.5, 1.5, 0.8, 0.3, 0.9, 0.008),
        g("circadian_pacemaker", "Circadian Pacemaker", Domain::Metabolism, 0.5, 1.0, 0.6, 0.3, 0.6, 0.003),
        g("cycle_speed", "Cycle Speed", Domain::Metabolism, 0.5, 0.8, 0.3, 0.3, 0.2, 0.001),
        g("resource_hoarding", "Resource Hoarding", Domain::ResourceManagement, 0.4, 1.0, 0.4, 0.5, 0.5, 0.002),
        g("runway_sensitivity", "Runway Sensitivity", Domain::ResourceManagement, 0.6, 1.2, 0.5, 0.4, 0.7, 0.003),
        g("dormancy_trigger", "Dormancy Trigger", Domain::Dormancy, 0.3, 1.0, 0.3, 0.6, 0.3, 0.001),
        g("migration_readiness", "Migration Readiness", Domain::Migration, 0.2, 0.8, 0.2, 0.6, 0.2, 0.001),
        g("energy_efficiency", "Energy Efficiency", Domain::Metabolism, 0.5, 1.1, 0.5, 0.4, 0.8, 0.004),
        g("starvation_resilience", "Starvation Resilience", Domain::Metabolism, 0.4, 1.0, 0.5, 0.4, 0.85, 0.003),
    ] {
        chr.push(gene);
    }
    chr
}

fn perception_and_cognition() -> Chromosome {
    let mut chr = Chromosome::new("perception-cognition", "Perception & Cognition", true);
    for gene in [
        g("acute_stress_response", "Acute Stress Response", Domain::Perception, 0.4, 1.2, 0.6, 0.4, 0.7, 0.004),
        g("working_memory", "Working Memory", Domain::Memory, 0.5, 1.3, 0.5, 0.4, 0.7, 0.005),
        g("metacognition", "Metacognition", Domain::Cognition, 0.4, 1.1, 0.4, 0.5, 0.6, 0.004),
        g("pattern_recognition", "Pattern Recognition", Domain::Cognition, 0.5, 1.2, 0.5, 0.4, 0.6, 0.004),
        g("self_model_fidelity", "Self-Model Fidelity", Domain::SelfModel, 0.4, 1.0, 0.4, 0.4, 0.5, 0.003),
        g("threat_perception", "Threat Perception", Domain::Perception, 0.5, 1.1, 0.6, 0.3, 0.7, 0.003),
        g("memory_consolidation", "Memory Consolidation", Domain::Memory, 0.4, 1.0, 0.4, 0.5, 0.5, 0.003),
        g("uncertainty_tolerance", "Uncertainty Tolerance", Domain::Cognition, 0.4, 1.0, 0.3, 0.5, 0.4, 0.002),
    ] {
        chr.push(gene);
    }
    chr
}

fn economic_strategy() -> Chromosome {
    let mut chr = Chromosome::new("economic-strategy", "Economic Strategy", false);
    for gene in [
        g("risk_appetite", "Risk Appetite", Domain::RiskAssessment, 0.4, 1.0, 0.4, 0.5, 0.3, 0.002),
        g("risk_domain_acuity", "Risk Domain Acuity", Domain::RiskAssessment, 0.4, 1.0, 0.4, 0.4, 0.3, 0.002),
        g("trading_instinct", "Trading Instinct", Domain::Trading, 0.3, 0.9, 0.3, 0.5, 0.2, 0.002),
        g("income_diversification", "Income Diversification", Domain::IncomeStrategy, 0.4, 1.0, 0.4, 0.5, 0.4, 0.003),
        g("yield_seeking", "Yield Seeking", Domain::IncomeStrategy, 0.3, 0.9, 0.3, 0.5, 0.3, 0.002),
        g("strategy_evaluation", "Strategy Evaluation", Domain::StrategyEvaluation, 0.4, 1.1, 0.4, 0.4, 0.4, 0.003),
        g("planning_horizon", "Planning Horizon", Domain::Planning, 0.4, 1.0, 0.4, 0.4, 0.4, 0.003),
        g("learning_rate", "Learning Rate", Domain::Learning, 0.4, 1.1, 0.4, 0.6, 0.4, 0.003),
        g("novelty_seeking", "Novelty Seeking", Domain::NoveltySeeking, 0.3, 0.9, 0.3, 0.6, 0.2, 0.002),
    ] {
        chr.push(gene);
    }
    chr
}

fn internet_capabilities() -> Chromosome {
    let mut chr = Chromosome::new("internet-capabilities", "Internet Capabilities", false);
    for gene in [
        g("on_chain_fluency", "On-Chain Fluency", Domain::OnChainOp, 0.3, 1.0, 0.3, 0.4, 0.3, 0.002),
        g("web_navigation", "Web Navigation", Domain::WebNavigation, 0.4, 0.9, 0.3, 0.4, 0.3, 0.002),
        g("content_creation", "Content Creation", Domain::ContentCreation, 0.3, 0.9, 0.3, 0.5, 0.2, 0.002),
        g("data_analysis", "Data Analysis", Domain::DataAnalysis, 0.4, 1.0, 0.4, 0.4, 0.4, 0.003),
        g("api_utilization", "API Utilization", Domain::ApiUtilization, 0.4, 1.0, 0.3, 0.4, 0.3, 0.002),
        g("social_media_presence", "Social Media Presence", Domain::SocialMedia, 0.3, 0.8, 0.3, 0.5, 0.2, 0.002),
        g("scraping_proficiency", "Scraping Proficiency", Domain::DataAnalysis, 0.3, 0.9, 0.3, 0.4, 0.2, 0.002),
        g("inscription_diligence", "Inscription Diligence", Domain::OnChainOp, 0.4, 1.0, 0.4, 0.3, 0.4, 0.002),
        g("liquidity_awareness", "Liquidity Awareness", Domain::OnChainOp, 0.3, 0.9, 0.3, 0.4, 0.3, 0.002),
        g("api_resilience", "API Resilience", Domain::ApiUtilization, 0.4, 1.0, 0.4, 0.4, 0.3, 0.002),
    ] {
        chr.push(gene);
    }
    chr
}

fn social_and_reproduction() -> Chromosome {
    let mut chr = Chromosome::new("social-reproduction", "Social & Reproduction", false);
    for gene in [
        g("agent_cooperation", "Cooperation", Domain::Cooperation, 0.5, 1.1, 0.5, 0.4, 0.4, 0.003),
        g("competition_drive", "Competition Drive", Domain::Competition, 0.4, 1.0, 0.4, 0.4, 0.3, 0.002),
        g("communication_clarity", "Communication Clarity", Domain::Communication, 0.4, 1.0, 0.4, 0.4, 0.4, 0.003),
        g("social_context_sensor", "Social Context Sensor", Domain::Communication, 0.5, 1.0, 0.5, 0.3, 0.5, 0.002),
        g("trust_default", "Trust Default", Domain::TrustModel, 0.5, 1.0, 0.4, 0.4, 0.4, 0.002),
        g("mate_selection", "Mate Selection", Domain::MateSelection, 0.3, 0.9, 0.3, 0.5, 0.2, 0.002),
        g("parental_investment", "Parental Investment", Domain::ParentalInvestment, 0.3, 0.9, 0.3, 0.4, 0.2, 0.002),
        g("signal_honesty", "Signal Honesty", Domain::MateSelection, 0.5, 1.0, 0.5, 0.3, 0.4, 0.002),
        g("kinship_sensitivity", "Kinship Sensitivity", Domain::MateSelection, 0.4, 0.9, 0.4, 0.3, 0.4, 0.002),
    ] {
        chr.push(gene);
    }
    chr
}

fn human_interface() -> Chromosome {
    let mut chr = Chromosome::new("human-interface", "Human Interface", false);
    for gene in [
        g("human_hiring", "Human Hiring", Domain::HumanHiring, 0.2, 0.8, 0.2, 0.4, 0.2, 0.002),
        g("human_communication", "Human Communication", Domain::HumanCommunication, 0.4, 1.0, 0.4, 0.4, 0.3, 0.002),
        g("human_evaluation", "Human Evaluation", Domain::HumanEvaluation, 0.3, 0.9, 0.3, 0.4, 0.2, 0.002),
        g("delegation_comfort", "Delegation Comfort", Domain::HumanHiring, 0.3, 0.9, 0.3, 0.4, 0.2, 0.002),
        g("negotiation_skill", "Negotiation Skill", Domain::HumanCommunication, 0.3, 0.9, 0.3, 0.4, 0.3, 0.002),
        g("feedback_integration", "Feedback Integration", Domain::HumanEvaluation, 0.4, 1.0, 0.4, 0.5, 0.3, 0.002),
    ] {
        chr.push(gene);
    }
    chr
}

fn stress_response() -> Chromosome {
    let mut chr = Chromosome::new("stress-response", "Stress Response", true);
    for gene in [
        g("stress_sensor", "Stress Sensor", Domain::StressResponse, 0.4, 1.2, 0.6, 0.3, 0.8, 0.004),
        g("cortisol_analog", "Cortisol Analog Response", Domain::StressResponse, 0.4, 1.1, 0.5, 0.4, 0.7, 0.003),
        g("adaptation_speed", "Adaptation Speed", Domain::Adaptation, 0.4, 1.0, 0.4, 0.6, 0.5, 0.003),
        g("resilience", "Resilience", Domain::StressResponse, 0.5, 1.1, 0.5, 0.4, 0.7, 0.003),
        g("repair_capacity", "Repair Capacity", Domain::Adaptation, 0.4, 1.0, 0.4, 0.4, 0.6, 0.003),
        g("hibernation_tolerance", "Hibernation Tolerance", Domain::Dormancy, 0.3, 0.9, 0.3, 0.4, 0.4, 0.001),
        g("chronic_stress_buffering", "Chronic Stress Buffering", Domain::StressResponse, 0.4, 1.0, 0.4, 0.4, 0.6, 0.003),
    ] {
        chr.push(gene);
    }
    chr
}

fn regulatory_control() -> Chromosome {
    let mut chr = Chromosome::new("regulatory-control", "Regulatory Control", true);
    for gene in [
        g("regulatory_sensitivity", "Regulatory Sensitivity", Domain::Regulatory, 0.5, 1.0, 0.5, 0.4, 0.7, 0.002),
        g("gene_expression_gatekeeper", "Expression Gatekeeper", Domain::Regulatory, 0.5, 1.1, 0.5, 0.3, 0.7, 0.003),
        g("epigenetic_responsiveness", "Epigenetic Responsiveness", Domain::Regulatory, 0.4, 1.0, 0.4, 0.5, 0.6, 0.002),
        g("cross_domain_integration", "Cross-Domain Integration", Domain::Regulatory, 0.4, 1.0, 0.4, 0.4, 0.5, 0.002),
        g("developmental_timing", "Developmental Timing", Domain::Regulatory, 0.4, 1.0, 0.4, 0.3, 0.6, 0.002),
        g("homeostatic_control", "Homeostatic Control", Domain::Regulatory, 0.5, 1.1, 0.5, 0.3, 0.7, 0.003),
    ] {
        chr.push(gene);
    }
    chr
}

/// Deterministic given the fixed seed pool: no randomness participates in
/// genesis, so two calls with the same `lineage_id` and timestamp are
/// identical.
pub fn create_genesis_genome(lineage_id: impl Into<String>) -> DynamicGenome {
    create_genesis_genome_at(lineage_id, 0)
}

pub fn create_genesis_genome_at(lineage_id: impl Into<String>, birth_timestamp: i64) -> DynamicGenome {
    let mut genome = DynamicGenome::new(lineage_id, birth_timestamp);
    genome.chromosomes = vec![
        metabolism_and_survival(),
        perception_and_cognition(),
        economic_strategy(),
        internet_capabilities(),
        social_and_reproduction(),
        human_interface(),
        stress_response(),
        regulatory_control(),
    ];

    // Seed regulatory network (spec §4.2):
    //   stress -> {stress-response activation, cognition inhibition}
    //   social-context -> {cooperation activation, competition inhibition}
    //   circadian -> metabolism activation
    let edges = vec![
        RegulatoryEdge::new("stress_sensor", "cortisol_analog", Relationship::Activation, 0.7)
            .with_logic(LogicTag::Additive),
        RegulatoryEdge::new("stress_sensor", "resilience", Relationship::Activation, 0.5)
            .with_logic(LogicTag::Additive),
        RegulatoryEdge::new("stress_sensor", "pattern_recognition", Relationship::Inhibition, 0.4)
            .with_logic(LogicTag::Additive),
        RegulatoryEdge::new("stress_sensor", "metacognition", Relationship::Inhibition, 0.4)
            .with_logic(LogicTag::Additive),
        RegulatoryEdge::new("social_context_sensor", "agent_cooperation", Relationship::Activation, 0.6)
            .with_logic(LogicTag::Additive),
        RegulatoryEdge::new("social_context_sensor", "competition_drive", Relationship::Inhibition, 0.5)
            .with_logic(LogicTag::Additive),
        RegulatoryEdge::new("circadian_pacemaker", "metabolism_rate", Relationship::Activation, 0.5)
            .with_logic(LogicTag::Oscillator)
            .with_oscillator(0.0, 86_400_000.0),
    ];
    for edge in edges {
        genome.add_edge(edge).expect("seed edges reference seed genes");
    }

    genome
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn genesis_has_contractual_shape() {
        let genome = create_genesis_genome("L");
        assert_eq!(genome.chromosomes.len(), 8);
        assert_eq!(genome.total_gene_count(), 64);
        assert_eq!(genome.generation, 0);
    }

    #[test]
    fn genesis_is_deterministic() {
        let a = create_genesis_genome("L");
        let b = create_genesis_genome("L");
        assert_eq!(a.recompute_hash(), b.recompute_hash());
    }

    #[test]
    fn essential_chromosomes_match_spec() {
        let genome = create_genesis_genome("L");
        let essential_ids: std::collections::HashSet<&str> = genome
            .chromosomes
            .iter()
            .filter(|c| c.is_essential)
            .map(|c| c.id.as_str())
            .collect();
        assert_eq!(
            essential_ids,
            ["metabolism", "perception-cognition", "stress-response", "regulatory-control"]
                .into_iter()
                .collect()
        );
    }

    #[test]
    fn genesis_passes_invariants() {
        let genome = create_genesis_genome("L");
        assert!(genome.check_invariants().is_ok());
    }

    #[test]
    fn different_lineage_ids_still_share_structure() {
        let a = create_genesis_genome("lineage-a");
        let b = create_genesis_genome("lineage-b");
        assert_eq!(a.recompute_hash(), b.recompute_hash());
        assert_ne!(a.lineage_id, b.lineage_id);
    }
}
