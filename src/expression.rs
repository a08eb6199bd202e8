//! The expression engine: turns a genome plus an environmental snapshot
//! into numeric trait values and a metabolic cost (spec §4.3).
//!
//! `express_genome` is a pure function of `(genome, env, age_days,
//! wall_clock_ms, epistasis)` — calling it twice with the same inputs
//! yields bit-identical results, and the regulatory fixed-point iterates
//! over genes in ascending id order so the result doesn't depend on an
//! implementation-defined summation order (spec §9).

use std::collections::HashMap;

use crate::config::ExpressionDefaults;
use crate::epigenetics::{EnvironmentalState, Mode, Modification};
use crate::error::Warning;
use crate::gene::{Domain, ExpressionState, Gene};
use crate::genome::DynamicGenome;
use crate::regulatory::{LogicTag, Relationship, RegulatoryEdge};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DevelopmentalStage {
    Neonate,
    Juvenile,
    Adult,
    Senescent,
}

pub fn developmental_stage(age_days: f64) -> DevelopmentalStage {
    if age_days < 7.0 {
        DevelopmentalStage::Neonate
    } else if age_days < 30.0 {
        DevelopmentalStage::Juvenile
    } else if age_days < 90.0 {
        DevelopmentalStage::Adult
    } else {
        DevelopmentalStage::Senescent
    }
}

fn developmental_modifier(stage: DevelopmentalStage, domain: Domain) -> f64 {
    use Domain::*;
    match (stage, domain) {
        (DevelopmentalStage::Neonate, Learning | Cooperation) => 1.3,
        (DevelopmentalStage::Neonate, Metabolism) => 0.7,
        (DevelopmentalStage::Juvenile, Adaptation | NoveltySeeking) => 1.25,
        (DevelopmentalStage::Juvenile, Planning) => 0.75,
        (DevelopmentalStage::Adult, MateSelection | ParentalInvestment) => 1.2,
        (DevelopmentalStage::Senescent, StressResponse | Adaptation | Metabolism | Memory) => 0.7,
        _ => 1.0,
    }
}

/// The tiny total condition language from spec §4.3: identifiers
/// `{balance, starving, thriving, mode}`, operators `{>,<,>=,<=,=}`, a
/// literal number or a mode word on the right-hand side. Unknown
/// identifiers evaluate to `true` (conservative); a string that doesn't
/// parse at all also evaluates to `true`, with an `InvalidCondition`
/// warning attached by the caller.
pub fn evaluate_condition(condition: &str, env: &EnvironmentalState) -> Option<bool> {
    let trimmed = condition.trim();
    let ops = ["<=", ">=", "=", "<", ">"];
    let op = *ops.iter().find(|op| trimmed.contains(**op))?;
    let mut parts = trimmed.splitn(2, op);
    let lhs = parts.next()?.trim();
    let rhs = parts.next()?.trim();

    let lhs_value = match lhs {
        "balance" => env.balance,
        "starving" => env.days_starving,
        "thriving" => env.days_thriving,
        "mode" => mode_to_f64(env.mode),
        _ => return Some(true),
    };

    let rhs_value: f64 = if let Ok(n) = rhs.parse::<f64>() {
        n
    } else {
        match rhs {
            "normal" => 0.0,
            "low-power" => 1.0,
            "emergency" => 2.0,
            "hibernation" => 3.0,
            _ => return None,
        }
    };

    Some(match op {
        "<=" => lhs_value <= rhs_value,
        ">=" => lhs_value >= rhs_value,
        "=" => (lhs_value - rhs_value).abs() < 1e-9,
        "<" => lhs_value < rhs_value,
        ">" => lhs_value > rhs_value,
        _ => true,
    })
}

#[derive(Debug, Clone)]
pub struct ExpressedGene {
    pub id: String,
    pub domain: Domain,
    pub expressed_value: f64,
    pub regulatory_effect: f64,
    pub epigenetic_effect: f64,
    pub silenced_for_call: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ExpressionStats {
    pub total_genes: usize,
    pub active_genes: usize,
    pub silenced_genes: usize,
    pub per_domain_counts: HashMap<String, usize>,
    pub average_plasticity: f64,
    pub average_essentiality: f64,
    pub average_age: f64,
    pub regulatory_edge_count: usize,
    pub mark_count: usize,
}

pub struct ExpressionResult {
    pub expressed_genes: Vec<ExpressedGene>,
    pub stats: ExpressionStats,
    pub total_metabolic_cost: f64,
    pub warnings: Vec<Warning>,
}

impl ExpressionResult {
    pub fn value_of(&self, gene_id: &str) -> Option<f64> {
        self.expressed_genes.iter().find(|g| g.id == gene_id).map(|g| g.expressed_value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EpistaticRelationship {
    Dominant,
    Recessive,
    Suppressive,
    Synergistic,
    Antagonistic,
}

#[derive(Debug, Clone)]
pub struct EpistaticInteraction {
    pub epistatic_gene: String,
    pub hypostatic_gene: String,
    pub relationship: EpistaticRelationship,
    pub penetrance: f64,
}

fn hill(x: f64, theta: f64, n: f64) -> f64 {
    if x <= 0.0 {
        return 0.0;
    }
    let xn = x.powf(n);
    let thetan = theta.powf(n);
    xn / (thetan + xn)
}

fn mode_to_f64(mode: Mode) -> f64 {
    match mode {
        Mode::Normal => 0.0,
        Mode::LowPower => 1.0,
        Mode::Emergency => 2.0,
        Mode::Hibernation => 3.0,
    }
}

/// Resolve a gene's effective expression state for this call only (the
/// stored state is never mutated). Returns `(is_silenced, warning)`.
fn resolve_conditional(gene: &Gene, env: &EnvironmentalState) -> (bool, Option<Warning>) {
    match gene.expression_state {
        ExpressionState::Active => (false, None),
        ExpressionState::Silenced => (true, None),
        ExpressionState::Conditional => {
            let condition = gene
                .activation_condition
                .as_ref()
                .map(|c| c.raw.as_str())
                .unwrap_or("");
            match evaluate_condition(condition, env) {
                Some(true) => (false, None),
                Some(false) => (true, None),
                None => (
                    false,
                    Some(Warning::InvalidCondition { gene_id: gene.id.clone(), condition: condition.to_string() }),
                ),
            }
        }
    }
}

fn base_expression(gene: &Gene, stage: DevelopmentalStage) -> f64 {
    gene.value() * gene.weight() * developmental_modifier(stage, gene.domain)
}

/// One round of the regulatory fixed-point for a single target gene: fold
/// its incoming edges (grouped by logic tag) against the current base
/// values of their sources.
fn regulatory_multiplier_for(
    target_id: &str,
    edges: &[&RegulatoryEdge],
    current_values: &HashMap<String, f64>,
    silenced: &HashMap<String, bool>,
    wall_clock_ms: f64,
) -> f64 {
    let incoming: Vec<&RegulatoryEdge> =
        edges.iter().copied().filter(|e| e.target_gene_id == target_id).collect();
    if incoming.is_empty() {
        return 1.0;
    }

    let source_value = |edge: &RegulatoryEdge| -> f64 {
        if *silenced.get(&edge.source_gene_id).unwrap_or(&false) {
            0.0
        } else {
            *current_values.get(&edge.source_gene_id).unwrap_or(&0.0)
        }
    };

    let mut by_logic: HashMap<LogicTag, Vec<&RegulatoryEdge>> = HashMap::new();
    for e in incoming.iter().copied() {
        by_logic.entry(e.logic).or_default().push(e);
    }

    let mut multiplier = 1.0f64;
    for (logic, group) in &by_logic {
        let members: Vec<&RegulatoryEdge> = group.iter().copied().collect();
        match logic {
            LogicTag::Additive | LogicTag::Multiplicative => {
                for e in &members {
                    let sv = source_value(e);
                    let factor = match e.relationship {
                        Relationship::Activation => 1.0 + e.strength * sv * 0.3,
                        Relationship::Inhibition => (1.0 - e.strength * sv).max(0.1),
                    };
                    multiplier *= factor;
                }
            }
            LogicTag::Threshold => {
                for e in &members {
                    let sv = source_value(e);
                    let theta = e.threshold.unwrap_or(0.5);
                    let n = e.cooperativity_or_default();
                    let h = hill(sv, theta, n);
                    let factor = match e.relationship {
                        Relationship::Activation => 1.0 + e.strength * h,
                        Relationship::Inhibition => (1.0 - e.strength * h).max(0.1),
                    };
                    multiplier *= factor;
                }
            }
            LogicTag::Oscillator => {
                for e in &members {
                    let period = e.period.unwrap_or(86_400_000.0);
                    let phase = e.phase.unwrap_or(0.0);
                    let osc = ((std::f64::consts::TAU * wall_clock_ms / period + phase).sin() + 1.0) / 2.0;
                    multiplier *= 1.0 + e.strength * osc * 0.5;
                }
            }
            LogicTag::And => {
                let all_active = members.iter().all(|e| source_value(e) > 0.3);
                if all_active {
                    let strength: f64 = members.iter().map(|e| e.strength).fold(0.0, f64::max);
                    multiplier *= 1.0 + strength * 0.3;
                }
            }
            LogicTag::Or => {
                let max_v = members.iter().map(|e| source_value(e)).fold(0.0f64, f64::max);
                if let Some(best) =
                    members.iter().max_by(|a, b| source_value(a).partial_cmp(&source_value(b)).unwrap())
                {
                    multiplier *= 1.0 + best.strength * max_v * 0.3;
                }
            }
            LogicTag::Nand => {
                let all_active = members.iter().all(|e| source_value(e) > 0.3);
                if all_active {
                    multiplier *= 0.0;
                } else {
                    let max_v = members.iter().map(|e| source_value(e)).fold(0.0, f64::max);
                    let strength = members.iter().map(|e| e.strength).fold(0.0, f64::max);
                    multiplier *= (1.0 + strength * max_v * 0.3) * 0.5;
                }
            }
        }
    }

    multiplier.max(0.05).min(3.0)
}

fn epigenetic_multiplier(gene_id: &str, genome: &DynamicGenome) -> f64 {
    let mark = match genome.epigenome.iter().find(|m| m.target_gene_id == gene_id) {
        Some(m) => m,
        None => return 1.0,
    };
    let s = mark.decayed_strength(genome.generation);
    let m = match mark.modification {
        Modification::Upregulate => 1.0 + 0.5 * s,
        Modification::Downregulate => 1.0 - 0.5 * s,
        Modification::Silence => 1.0 - s,
        Modification::Activate => 1.0 + s,
    };
    m.max(0.0)
}

/// Run the full expression pipeline (spec §4.3 steps 1-8).
pub fn express_genome(
    genome: &DynamicGenome,
    env: &EnvironmentalState,
    age_days: f64,
    wall_clock_ms: f64,
    epistasis: &[EpistaticInteraction],
    defaults: ExpressionDefaults,
) -> ExpressionResult {
    let stage = developmental_stage(age_days);

    let mut warnings = Vec::new();
    let mut silenced: HashMap<String, bool> = HashMap::new();
    let mut gene_ids_sorted: Vec<String> = genome.all_gene_ids().into_iter().collect();
    gene_ids_sorted.sort();

    // Step 1: conditional resolution.
    for id in &gene_ids_sorted {
        let gene = genome.find_gene(id).expect("id came from genome");
        let (is_silenced, warning) = resolve_conditional(gene, env);
        silenced.insert(id.clone(), is_silenced);
        if let Some(w) = warning {
            warnings.push(w);
        }
    }

    // Steps 2-3: developmental modulation + base expression.
    let mut current_values: HashMap<String, f64> = HashMap::new();
    for id in &gene_ids_sorted {
        let gene = genome.find_gene(id).expect("id came from genome");
        let base = if silenced[id] { 0.0 } else { base_expression(gene, stage) };
        current_values.insert(id.clone(), base);
    }

    // Step 4: regulatory fixed-point, iterating in ascending gene-id order.
    let edge_refs: Vec<&RegulatoryEdge> = genome.regulatory_edges.iter().collect();
    let mut regulatory_multipliers: HashMap<String, f64> =
        gene_ids_sorted.iter().map(|id| (id.clone(), 1.0)).collect();

    for round in 0..defaults.max_rounds {
        let mut max_delta = 0.0f64;
        for id in &gene_ids_sorted {
            if silenced[id] {
                continue;
            }
            let new_mult = regulatory_multiplier_for(id, &edge_refs, &current_values, &silenced, wall_clock_ms);
            let old_mult = regulatory_multipliers[id];
            max_delta = max_delta.max((new_mult - old_mult).abs());
            regulatory_multipliers.insert(id.clone(), new_mult);

            let gene = genome.find_gene(id).expect("id came from genome");
            let base = base_expression(gene, stage);
            current_values.insert(id.clone(), base * new_mult);
        }
        if max_delta < defaults.convergence_threshold {
            break;
        }
        if round + 1 == defaults.max_rounds && max_delta >= defaults.convergence_threshold {
            for id in &gene_ids_sorted {
                warnings.push(Warning::ConvergenceWarning { gene_id: id.clone(), rounds: defaults.max_rounds });
            }
        }
    }

    // Steps 5-6: epigenetic multiplier + composition.
    let mut expressed: HashMap<String, (f64, f64, f64)> = HashMap::new(); // value, reg_effect, epi_effect
    for id in &gene_ids_sorted {
        let gene = genome.find_gene(id).expect("id came from genome");
        if silenced[id] {
            expressed.insert(id.clone(), (0.0, regulatory_multipliers[id], 1.0));
            continue;
        }
        let base = base_expression(gene, stage);
        let reg_mult = regulatory_multipliers[id];
        let epi_mult = epigenetic_multiplier(id, genome);
        let value = (base * reg_mult * epi_mult).max(0.0).min(3.0);
        expressed.insert(id.clone(), (value, reg_mult, epi_mult));
    }

    // Step 7: epistasis, applied in the order given.
    for interaction in epistasis {
        let epi_val = expressed.get(&interaction.epistatic_gene).map(|v| v.0).unwrap_or(0.0);
        if let Some(entry) = expressed.get_mut(&interaction.hypostatic_gene) {
            match interaction.relationship {
                EpistaticRelationship::Suppressive if epi_val > 0.5 => {
                    entry.0 = 0.0;
                    silenced.insert(interaction.hypostatic_gene.clone(), true);
                }
                EpistaticRelationship::Dominant => {
                    entry.0 = (entry.0 + epi_val * interaction.penetrance).min(3.0);
                }
                EpistaticRelationship::Recessive => {
                    entry.0 = (entry.0 * (1.0 - interaction.penetrance * 0.5)).max(0.0);
                }
                EpistaticRelationship::Synergistic => {
                    let boost = 1.0 + interaction.penetrance * (epi_val / 3.0).min(1.0) * 0.5;
                    entry.0 = (entry.0 * boost).min(3.0);
                }
                EpistaticRelationship::Antagonistic => {
                    let reduction = 1.0 - interaction.penetrance * (epi_val / 3.0).min(1.0) * 0.5;
                    entry.0 = (entry.0 * reduction).max(0.0);
                }
                _ => {}
            }
        }
    }

    let mut expressed_genes = Vec::with_capacity(gene_ids_sorted.len());
    let mut total_metabolic_cost = defaults.base_rate + genome.total_gene_count() as f64 * defaults.per_gene_overhead;
    let mut active = 0usize;
    let mut silenced_count = 0usize;
    let mut per_domain: HashMap<String, usize> = HashMap::new();
    let mut plasticity_sum = 0.0;
    let mut essentiality_sum = 0.0;
    let mut age_sum = 0.0;

    for id in &gene_ids_sorted {
        let gene = genome.find_gene(id).expect("id came from genome");
        let (value, reg, epi) = expressed[id];
        if silenced[id] {
            silenced_count += 1;
        } else {
            active += 1;
        }
        *per_domain.entry(format!("{:?}", gene.domain)).or_insert(0) += 1;
        plasticity_sum += gene.plasticity();
        essentiality_sum += gene.essentiality();
        age_sum += gene.age as f64;
        total_metabolic_cost += gene.metabolic_cost() * value;

        expressed_genes.push(ExpressedGene {
            id: id.clone(),
            domain: gene.domain,
            expressed_value: value,
            regulatory_effect: reg,
            epigenetic_effect: epi,
            silenced_for_call: silenced[id],
        });
    }

    let total = gene_ids_sorted.len().max(1) as f64;
    let stats = ExpressionStats {
        total_genes: gene_ids_sorted.len(),
        active_genes: active,
        silenced_genes: silenced_count,
        per_domain_counts: per_domain,
        average_plasticity: plasticity_sum / total,
        average_essentiality: essentiality_sum / total,
        average_age: age_sum / total,
        regulatory_edge_count: genome.regulatory_edges.len(),
        mark_count: genome.epigenome.len(),
    };

    ExpressionResult { expressed_genes, stats, total_metabolic_cost, warnings }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExpressionDefaults;
    use crate::genome::DynamicGenome;
    use crate::regulatory::{Relationship, RegulatoryEdge};
    use crate::gene::Origin;

    fn env() -> EnvironmentalState {
        EnvironmentalState::default()
    }

    #[test]
    fn silenced_gene_always_expresses_zero_regardless_of_activator() {
        let mut genome = DynamicGenome::new("L", 0);
        let mut chr = crate::chromosome::Chromosome::new("c", "c", false);
        let mut a = Gene::new("a", "a", Domain::Regulatory, 1.0, 1.0, 0.5, 0.5, 0.5, 0.001, Origin::Primordial);
        a.expression_state = ExpressionState::Active;
        let mut b = Gene::new("b", "b", Domain::Regulatory, 1.0, 1.0, 0.5, 0.5, 0.5, 0.001, Origin::Primordial);
        b.expression_state = ExpressionState::Silenced;
        chr.push(a);
        chr.push(b);
        genome.chromosomes.push(chr);
        genome
            .add_edge(RegulatoryEdge::new("a", "b", Relationship::Activation, 1.0))
            .unwrap();

        let result = express_genome(&genome, &env(), 40.0, 0.0, &[], ExpressionDefaults::default());
        assert_eq!(result.value_of("b"), Some(0.0));
    }

    #[test]
    fn oscillator_differs_by_half_period() {
        let mut genome = DynamicGenome::new("L", 0);
        let mut chr = crate::chromosome::Chromosome::new("c", "c", false);
        let g = Gene::new("g", "g", Domain::Metabolism, 1.0, 1.0, 0.5, 0.5, 0.5, 0.001, Origin::Primordial);
        chr.push(g);
        genome.chromosomes.push(chr);
        let period = 24.0 * 3_600_000.0;
        genome
            .add_edge(
                RegulatoryEdge::new("g", "g", Relationship::Activation, 1.0)
                    .with_logic(LogicTag::Oscillator)
                    .with_oscillator(0.0, period),
            )
            .unwrap();

        let at_zero = express_genome(&genome, &env(), 40.0, 0.0, &[], ExpressionDefaults::default());
        let at_half = express_genome(&genome, &env(), 40.0, period / 2.0, &[], ExpressionDefaults::default());
        let diff = (at_zero.value_of("g").unwrap() - at_half.value_of("g").unwrap()).abs();
        assert!(diff >= 0.3, "expected oscillator swing >= 0.3, got {diff}");
    }

    #[test]
    fn expression_is_pure() {
        let genome = crate::seed::create_genesis_genome("L");
        let r1 = express_genome(&genome, &env(), 40.0, 1000.0, &[], ExpressionDefaults::default());
        let r2 = express_genome(&genome, &env(), 40.0, 1000.0, &[], ExpressionDefaults::default());
        for (a, b) in r1.expressed_genes.iter().zip(r2.expressed_genes.iter()) {
            assert_eq!(a.id, b.id);
            assert!((a.expressed_value - b.expressed_value).abs() < 1e-12);
        }
        assert!((r1.total_metabolic_cost - r2.total_metabolic_cost).abs() < 1e-12);
    }

    #[test]
    fn metabolic_cost_has_a_floor() {
        let genome = crate::seed::create_genesis_genome("L");
        let result = express_genome(&genome, &env(), 40.0, 0.0, &[], ExpressionDefaults::default());
        let defaults = ExpressionDefaults::default();
        let floor = defaults.base_rate + genome.total_gene_count() as f64 * defaults.per_gene_overhead;
        assert!(result.total_metabolic_cost >= floor);
    }

    #[test]
    fn expressed_values_stay_in_bounds() {
        let genome = crate::seed::create_genesis_genome("L");
        let result = express_genome(&genome, &env(), 10.0, 500.0, &[], ExpressionDefaults::default());
        for gene in &result.expressed_genes {
            assert!(gene.expressed_value >= 0.0 && gene.expressed_value <= 3.0);
            if gene.silenced_for_call {
                assert_eq!(gene.expressed_value, 0.0);
            }
        }
    }

    #[test]
    fn condition_language_handles_operators() {
        let e = EnvironmentalState { balance: 3.0, ..Default::default() };
        assert_eq!(evaluate_condition("balance > 2", &e), Some(true));
        assert_eq!(evaluate_condition("balance < 2", &e), Some(false));
        assert_eq!(evaluate_condition("balance >= 3", &e), Some(true));
        assert_eq!(evaluate_condition("balance = 3", &e), Some(true));
        assert_eq!(evaluate_condition("unknown_ident > 1", &e), Some(true));
    }

    #[test]
    fn unparseable_condition_returns_none() {
        let e = env();
        assert_eq!(evaluate_condition("gibberish", &e), None);
    }

    #[test]
    fn condition_language_compares_mode_numerically() {
        let e = EnvironmentalState { mode: Mode::Emergency, ..Default::default() };
        assert_eq!(evaluate_condition("mode >= emergency", &e), Some(true));
        assert_eq!(evaluate_condition("mode = normal", &e), Some(false));
        assert_eq!(evaluate_condition("mode < hibernation", &e), Some(true));
    }

    #[test]
    fn developmental_stage_boundaries() {
        assert_eq!(developmental_stage(0.0), DevelopmentalStage::Neonate);
        assert_eq!(developmental_stage(6.9), DevelopmentalStage::Neonate);
        assert_eq!(developmental_stage(7.0), DevelopmentalStage::Juvenile);
        assert_eq!(developmental_stage(29.9), DevelopmentalStage::Juvenile);
        assert_eq!(developmental_stage(30.0), DevelopmentalStage::Adult);
        assert_eq!(developmental_stage(89.9), DevelopmentalStage::Adult);
        assert_eq!(developmental_stage(90.0), DevelopmentalStage::Senescent);
    }
}
