//! The evolution coordinator (spec §4.11): tracks inter-agent cooperation,
//! brokers mating signals (honestly or not, depending on the sender's
//! `signal_honesty` gene), and scores fitness once a generation completes.

use std::collections::HashMap;

use crate::decision::RiskLevel;
use crate::error::EgdeResult;
use crate::expression::ExpressionResult;
use crate::genome::DynamicGenome;
use crate::operators::{breed, check_inbreeding, jaccard_similarity, BreedingContext, BreedingResult};
use crate::rng::EgdeRng;

/// Symmetric per-pair cooperation record: running score in `[-1,1]` and an
/// interaction count, keyed by the two agents' ids in sorted order.
#[derive(Debug, Clone, Copy, Default)]
pub struct CooperationRecord {
    pub score: f64,
    pub interactions: u32,
}

#[derive(Default)]
pub struct CooperationLedger {
    records: HashMap<(String, String), CooperationRecord>,
}

fn pair_key(a: &str, b: &str) -> (String, String) {
    if a <= b { (a.to_string(), b.to_string()) } else { (b.to_string(), a.to_string()) }
}

impl CooperationLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold `outcome` (`[-1,1]`, positive is cooperative) into the running
    /// average for this pair.
    pub fn record(&mut self, a: &str, b: &str, outcome: f64) {
        let entry = self.records.entry(pair_key(a, b)).or_default();
        let n = entry.interactions as f64;
        entry.score = (entry.score * n + outcome) / (n + 1.0);
        entry.interactions += 1;
    }

    pub fn get(&self, a: &str, b: &str) -> CooperationRecord {
        self.records.get(&pair_key(a, b)).copied().unwrap_or_default()
    }
}

/// A mating signal as broadcast. When the sender's `signal_honesty` is
/// below 1.0, `advertised_fitness` is inflated away from `true_fitness` by
/// up to 50% so receivers must discount it (spec §4.11 "signal
/// distortion").
#[derive(Debug, Clone)]
pub struct MatingSignal {
    pub sender_id: String,
    pub advertised_fitness: f64,
    pub true_fitness: f64,
}

/// Build a mating signal for `genome`, distorting `true_fitness` upward in
/// proportion to `1 - signal_honesty`.
pub fn generate_mating_signal(sender_id: &str, genome: &DynamicGenome, true_fitness: f64) -> MatingSignal {
    let honesty = genome.find_gene("signal_honesty").map(|g| g.value()).unwrap_or(1.0).clamp(0.0, 1.0);
    let distortion = (1.0 - honesty) * 0.5;
    let advertised = (true_fitness * (1.0 + distortion)).min(1.0);
    MatingSignal { sender_id: sender_id.to_string(), advertised_fitness: advertised, true_fitness }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatingDecision {
    Accept,
    Reject,
    Negotiate,
}

/// A receiver's appraisal of a proposing partner (spec §4.11 `Evaluation`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Evaluation {
    pub attractiveness: f64,
    pub genetic_compatibility: f64,
    pub estimated_fitness: f64,
    pub kinship: f64,
    pub risk_assessment: RiskLevel,
    pub decision: MatingDecision,
}

/// Appraise a proposing partner: discount their advertised fitness by the
/// receiver's `trust_default` and prior cooperation history, measure
/// genetic kinship via Jaccard similarity, and land on accept/reject/
/// negotiate. A near-miss on `min_acceptable_fitness` negotiates rather
/// than outright rejecting, driven by the receiver's `parental_investment`
/// gene (a more invested receiver holds out for counter-offers instead of
/// walking away).
pub fn evaluate_partner(
    receiver: &DynamicGenome,
    proposer: &DynamicGenome,
    signal: &MatingSignal,
    cooperation: CooperationRecord,
    min_acceptable_fitness: f64,
) -> Evaluation {
    let trust_default = receiver.find_gene("trust_default").map(|g| g.value()).unwrap_or(0.5).clamp(0.0, 1.0);
    let parental_investment = receiver.find_gene("parental_investment").map(|g| g.value()).unwrap_or(0.5).clamp(0.0, 1.0);
    let history_trust = ((cooperation.score + 1.0) / 2.0).clamp(0.0, 1.0);
    let weight = if cooperation.interactions > 0 {
        0.4 * trust_default + 0.6 * history_trust
    } else {
        trust_default
    };

    let kinship = jaccard_similarity(receiver, proposer);
    let genetic_compatibility = (1.0 - kinship).clamp(0.0, 1.0);
    let estimated_fitness = weight * signal.advertised_fitness + (1.0 - weight) * 0.5;
    let attractiveness = signal.advertised_fitness * genetic_compatibility;

    let risk_score = kinship * 0.6 + (1.0 - trust_default) * 0.4;
    let risk_assessment = RiskLevel::from_score(risk_score);

    let negotiation_band = 0.05 + 0.1 * parental_investment;
    let decision = if kinship > 0.8 {
        MatingDecision::Reject
    } else if estimated_fitness >= min_acceptable_fitness {
        MatingDecision::Accept
    } else if estimated_fitness >= min_acceptable_fitness - negotiation_band {
        MatingDecision::Negotiate
    } else {
        MatingDecision::Reject
    };

    Evaluation { attractiveness, genetic_compatibility, estimated_fitness, kinship, risk_assessment, decision }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProposalDecision {
    Accept,
    Negotiate,
    Reject { reason: String },
}

/// Accept, reject, or counter-offer on a mating proposal (spec §4.11
/// `respondToProposal`): the inbreeding guard runs first, then the
/// evaluation's own accept/reject/negotiate call is adopted directly.
pub fn respond_to_proposal(
    receiver: &DynamicGenome,
    proposer: &DynamicGenome,
    signal: &MatingSignal,
    cooperation: CooperationRecord,
    min_acceptable_fitness: f64,
) -> ProposalDecision {
    if check_inbreeding(receiver, proposer).is_err() {
        return ProposalDecision::Reject { reason: "candidates are too genetically similar".to_string() };
    }
    let evaluation = evaluate_partner(receiver, proposer, signal, cooperation, min_acceptable_fitness);
    match evaluation.decision {
        MatingDecision::Accept => ProposalDecision::Accept,
        MatingDecision::Negotiate => ProposalDecision::Negotiate,
        MatingDecision::Reject => ProposalDecision::Reject {
            reason: format!(
                "evaluated fitness {:.2} below threshold {min_acceptable_fitness:.2}",
                evaluation.estimated_fitness
            ),
        },
    }
}

/// Run the inbreeding guard then the full breeding pipeline, producing a
/// child genome plus the event report (spec §4.5, §4.6, §4.11).
pub fn execute_breeding(
    parent_a: &DynamicGenome,
    parent_b: &DynamicGenome,
    ctx: &BreedingContext,
    config: &crate::config::EgdeConfig,
    rng: &mut dyn EgdeRng,
) -> EgdeResult<BreedingResult> {
    check_inbreeding(parent_a, parent_b)?;
    Ok(breed(parent_a, parent_b, ctx, config, rng))
}

/// Shannon entropy of a discrete distribution built from `values` (each
/// non-negative, not required to already sum to 1), normalised to `[0,1]`
/// by dividing by `log2(n)`.
fn normalized_shannon_entropy(values: &[f64]) -> f64 {
    let total: f64 = values.iter().sum();
    if total <= 0.0 || values.len() < 2 {
        return 0.0;
    }
    let entropy: f64 = values
        .iter()
        .filter(|&&v| v > 0.0)
        .map(|&v| {
            let p = v / total;
            -p * p.log2()
        })
        .sum();
    let max_entropy = (values.len() as f64).log2();
    if max_entropy <= 0.0 {
        0.0
    } else {
        (entropy / max_entropy).clamp(0.0, 1.0)
    }
}

/// Fitness formula (spec §4.11, weights are an open design decision — see
/// `DESIGN.md`): metabolic efficiency, expression diversity (via entropy),
/// and how well essential genes are expressed, weighted 0.4/0.3/0.3.
pub fn calculate_fitness(expressed: &ExpressionResult, genome: &DynamicGenome) -> f64 {
    let metabolic_efficiency = (1.0 / (1.0 + expressed.total_metabolic_cost)).clamp(0.0, 1.0);

    let expression_values: Vec<f64> = expressed.expressed_genes.iter().map(|g| g.expressed_value.max(0.0)).collect();
    let diversity = normalized_shannon_entropy(&expression_values);

    let essential_ids: std::collections::HashSet<String> = genome
        .chromosomes
        .iter()
        .filter(|c| c.is_essential)
        .flat_map(|c| c.gene_ids())
        .collect();
    let essential_values: Vec<f64> =
        expressed.expressed_genes.iter().filter(|g| essential_ids.contains(&g.id)).map(|g| g.expressed_value).collect();
    let essential_mean = if essential_values.is_empty() {
        0.0
    } else {
        essential_values.iter().sum::<f64>() / essential_values.len() as f64 / 3.0
    };

    (0.4 * metabolic_efficiency + 0.3 * diversity + 0.3 * essential_mean.clamp(0.0, 1.0)).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExpressionDefaults;
    use crate::epigenetics::EnvironmentalState;
    use crate::expression::express_genome;
    use crate::seed::create_genesis_genome;

    #[test]
    fn cooperation_ledger_is_symmetric_and_averages() {
        let mut ledger = CooperationLedger::new();
        ledger.record("a", "b", 1.0);
        ledger.record("b", "a", -1.0);
        let record = ledger.get("a", "b");
        assert_eq!(record.interactions, 2);
        assert!(record.score.abs() < 1e-9);
    }

    #[test]
    fn dishonest_signaller_inflates_advertised_fitness() {
        let mut genome = create_genesis_genome("liar");
        genome.find_gene_mut("signal_honesty").unwrap().set_value(0.0);
        let signal = generate_mating_signal("liar", &genome, 0.4);
        assert!(signal.advertised_fitness > signal.true_fitness);
    }

    #[test]
    fn honest_signaller_reports_true_fitness() {
        let mut genome = create_genesis_genome("honest");
        genome.find_gene_mut("signal_honesty").unwrap().set_value(1.0);
        let signal = generate_mating_signal("honest", &genome, 0.4);
        assert!((signal.advertised_fitness - signal.true_fitness).abs() < 1e-9);
    }

    #[test]
    fn low_trust_receiver_discounts_partner_evaluation() {
        let mut trusting = create_genesis_genome("trusting");
        trusting.find_gene_mut("trust_default").unwrap().set_value(1.0);
        let mut wary = create_genesis_genome("wary");
        wary.find_gene_mut("trust_default").unwrap().set_value(0.0);

        let proposer = create_genesis_genome("proposer");
        let signal = MatingSignal { sender_id: "x".to_string(), advertised_fitness: 0.9, true_fitness: 0.9 };
        let cooperation = CooperationRecord::default();
        let trusting_eval = evaluate_partner(&trusting, &proposer, &signal, cooperation, 0.5);
        let wary_eval = evaluate_partner(&wary, &proposer, &signal, cooperation, 0.5);
        assert!(trusting_eval.estimated_fitness > wary_eval.estimated_fitness);
    }

    #[test]
    fn proposal_rejected_for_inbred_pair() {
        let genome = create_genesis_genome("twin");
        let signal = generate_mating_signal("twin", &genome, 0.5);
        let decision = respond_to_proposal(&genome, &genome, &signal, CooperationRecord::default(), 0.0);
        assert!(matches!(decision, ProposalDecision::Reject { .. }));
    }

    #[test]
    fn fitness_is_bounded_to_unit_interval() {
        let genome = create_genesis_genome("f");
        let env = EnvironmentalState::default();
        let expressed = express_genome(&genome, &env, 40.0, 0.0, &[], ExpressionDefaults::default());
        let fitness = calculate_fitness(&expressed, &genome);
        assert!((0.0..=1.0).contains(&fitness));
    }

    #[test]
    fn uniform_distribution_is_near_maximal_entropy_concentrated_is_zero() {
        assert!(normalized_shannon_entropy(&[1.0, 1.0, 1.0, 1.0]) > 0.99);
        assert_eq!(normalized_shannon_entropy(&[1.0, 0.0, 0.0, 0.0]), 0.0);
    }

    #[test]
    fn identical_gene_sets_are_rejected_on_kinship_alone() {
        let receiver = create_genesis_genome("r");
        let proposer = create_genesis_genome("p");
        let signal = MatingSignal { sender_id: "p".to_string(), advertised_fitness: 0.95, true_fitness: 0.95 };
        let evaluation = evaluate_partner(&receiver, &proposer, &signal, CooperationRecord::default(), 0.1);
        assert!((evaluation.kinship - 1.0).abs() < 1e-9);
        assert_eq!(evaluation.decision, MatingDecision::Reject);
    }

    fn low_kinship_genome(lineage: &str, shared: &[&str], unique: &[&str]) -> DynamicGenome {
        use crate::chromosome::Chromosome;
        use crate::gene::{Domain, Gene, Origin};
        let mut chr = Chromosome::new("c1", "Test", false);
        for id in shared.iter().chain(unique.iter()) {
            chr.push(Gene::new(*id, *id, Domain::DataAnalysis, 0.5, 1.0, 0.5, 0.5, 0.3, 0.002, Origin::Primordial));
        }
        let mut genome = DynamicGenome::new(lineage, 0);
        genome.chromosomes.push(chr);
        genome
    }

    #[test]
    fn near_miss_fitness_negotiates_rather_than_rejects() {
        let shared = ["g1", "g2"];
        let receiver = low_kinship_genome("r2", &shared, &["r-only-1", "r-only-2", "r-only-3"]);
        let proposer = low_kinship_genome("p2", &shared, &["p-only-1", "p-only-2", "p-only-3"]);

        let signal = MatingSignal { sender_id: "p2".to_string(), advertised_fitness: 0.5, true_fitness: 0.5 };
        let evaluation = evaluate_partner(&receiver, &proposer, &signal, CooperationRecord::default(), 0.55);
        assert!(evaluation.kinship < 0.8);
        assert_eq!(evaluation.decision, MatingDecision::Negotiate);
    }
}
