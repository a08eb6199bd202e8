//! Genetic operators: the breeding pipeline (spec §4.5), horizontal gene
//! transfer, and the inbreeding guard. This is the largest subsystem in
//! the spec — crossover, point/large/weight mutation, duplication,
//! deletion, de-novo birth, regulatory recombination, structural variation
//! (inversion/translocation), and gene conversion, run in that fixed
//! order against two parent genomes to produce one child.

use std::collections::HashSet;

use crate::chromosome::Chromosome;
use crate::config::{EgdeConfig, MutationRates};
use crate::epigenetics::{inherit_marks, merge_inherited_marks};
use crate::error::{EgdeError, EgdeResult};
use crate::gene::{Domain, Gene, Origin};
use crate::genome::DynamicGenome;
use crate::regulatory::{LogicTag, Relationship, RegulatoryEdge};
use crate::rng::EgdeRng;

#[derive(Debug, Clone)]
pub struct BreedingContext {
    pub parent_a_id: String,
    pub parent_b_id: String,
    pub environmental_stress: f64,
    pub starvation_mode: bool,
}

#[derive(Debug, Clone)]
pub struct MutationEvent {
    pub gene_id: String,
    pub kind: &'static str,
    pub detail: String,
}

#[derive(Debug, Clone)]
pub struct CrossoverEvent {
    pub chromosome_id: String,
    pub source: &'static str,
}

#[derive(Debug, Clone)]
pub struct StructuralVariation {
    pub kind: &'static str,
    pub detail: String,
}

#[derive(Debug, Clone)]
pub struct GeneConversionEvent {
    pub donor_gene_id: String,
    pub recipient_gene_id: String,
}

pub struct BreedingResult {
    pub child_genome: DynamicGenome,
    pub mutations: Vec<MutationEvent>,
    pub crossover_events: Vec<CrossoverEvent>,
    pub structural_variations: Vec<StructuralVariation>,
    pub gene_conversions: Vec<GeneConversionEvent>,
}

/// Jaccard similarity over gene-id sets: `|A∩B| / |A∪B|`.
pub fn jaccard_similarity(a: &DynamicGenome, b: &DynamicGenome) -> f64 {
    let ids_a = a.all_gene_ids();
    let ids_b = b.all_gene_ids();
    let intersection = ids_a.intersection(&ids_b).count();
    let union = ids_a.union(&ids_b).count();
    if union == 0 {
        0.0
    } else {
        intersection as f64 / union as f64
    }
}

/// Refuse breeding if the parents' gene-id sets are too similar (spec
/// §4.5 invariant: Jaccard similarity over 0.8 is rejected as inbreeding).
/// The caller is responsible for the additional three-generation lineage
/// check, which needs a pedigree cache this pure function doesn't have.
pub fn check_inbreeding(parent_a: &DynamicGenome, parent_b: &DynamicGenome) -> EgdeResult<()> {
    let similarity = jaccard_similarity(parent_a, parent_b);
    if similarity > 0.8 {
        return Err(EgdeError::Inbreeding { similarity });
    }
    Ok(())
}

/// Stage 1: crossover. Chromosome-level: for each chromosome id present in
/// either parent, flip a coin weighted by `chromosomeLevelCrossover` to
/// pick which parent's whole chromosome is inherited outright; otherwise
/// merge gene-by-gene (uniform crossover), with genes unique to one
/// parent inherited at `extraGeneInheritanceRate`.
fn crossover(
    parent_a: &DynamicGenome,
    parent_b: &DynamicGenome,
    rates: &MutationRates,
    rng: &mut dyn EgdeRng,
    events: &mut Vec<CrossoverEvent>,
) -> Vec<Chromosome> {
    let mut chromosome_ids: Vec<String> =
        parent_a.chromosomes.iter().map(|c| c.id.clone()).collect();
    for c in &parent_b.chromosomes {
        if !chromosome_ids.contains(&c.id) {
            chromosome_ids.push(c.id.clone());
        }
    }

    let mut children = Vec::with_capacity(chromosome_ids.len());
    for chr_id in chromosome_ids {
        let from_a = parent_a.chromosome(&chr_id);
        let from_b = parent_b.chromosome(&chr_id);

        let mut merged = match (from_a, from_b) {
            (Some(a), None) => {
                if !rng.chance(0.5) {
                    continue;
                }
                events.push(CrossoverEvent { chromosome_id: chr_id.clone(), source: "parentA-only" });
                a.clone()
            }
            (None, Some(b)) => {
                if !rng.chance(0.5) {
                    continue;
                }
                events.push(CrossoverEvent { chromosome_id: chr_id.clone(), source: "parentB-only" });
                b.clone()
            }
            (Some(a), Some(b)) => {
                if rng.chance(rates.chromosome_level_crossover) {
                    let whole_from_a = rng.chance(0.5);
                    events.push(CrossoverEvent {
                        chromosome_id: chr_id.clone(),
                        source: if whole_from_a { "parentA-whole" } else { "parentB-whole" },
                    });
                    if whole_from_a { a.clone() } else { b.clone() }
                } else {
                    events.push(CrossoverEvent { chromosome_id: chr_id.clone(), source: "gene-uniform" });
                    gene_level_merge(a, b, rates, rng)
                }
            }
            (None, None) => unreachable!("chromosome id came from a or b"),
        };
        // Ages of inherited genes are incremented (spec §4.5).
        for gene in merged.genes_mut() {
            gene.age += 1;
        }
        children.push(merged);
    }
    children
}

fn gene_level_merge(
    a: &Chromosome,
    b: &Chromosome,
    rates: &MutationRates,
    rng: &mut dyn EgdeRng,
) -> Chromosome {
    let mut merged = Chromosome::new(a.id.clone(), a.name.clone(), a.is_essential || b.is_essential);
    let ids_a: HashSet<String> = a.genes().iter().map(|g| g.id.clone()).collect();
    let ids_b: HashSet<String> = b.genes().iter().map(|g| g.id.clone()).collect();

    for gene_id in ids_a.union(&ids_b) {
        let gene_a = a.gene(gene_id);
        let gene_b = b.gene(gene_id);
        let chosen = match (gene_a, gene_b) {
            (Some(g), Some(_)) if rng.chance(0.5) => Some(g.clone()),
            (Some(_), Some(g)) => Some(g.clone()),
            (Some(g), None) | (None, Some(g)) => {
                if rng.chance(rates.extra_gene_inheritance) {
                    Some(g.clone())
                } else {
                    None
                }
            }
            (None, None) => None,
        };
        if let Some(mut gene) = chosen {
            gene.origin = Origin::Inherited;
            merged.push(gene);
        }
    }
    merged
}

/// Stage 2: point mutation. Each gene independently: `point` chance of a
/// Gaussian nudge to `value` (σ = `pointSigma`), `large` chance of a
/// uniform replace, `weight` chance of a Gaussian nudge to `weight`.
fn point_mutate(
    chromosomes: &mut [Chromosome],
    rates: &MutationRates,
    rng: &mut dyn EgdeRng,
    events: &mut Vec<MutationEvent>,
) {
    for chr in chromosomes.iter_mut() {
        for gene in chr.genes_mut() {
            let mut mutated = false;
            if rng.chance(rates.point) {
                let delta = rng.next_gaussian(0.0, rates.point_sigma);
                gene.set_value(gene.value() + delta);
                mutated = true;
                events.push(MutationEvent {
                    gene_id: gene.id.clone(),
                    kind: "point",
                    detail: format!("value delta {delta:.4}"),
                });
            }
            if rng.chance(rates.large) {
                let replacement = rng.next_range(0.0, 1.0);
                gene.set_value(replacement);
                mutated = true;
                events.push(MutationEvent {
                    gene_id: gene.id.clone(),
                    kind: "large",
                    detail: format!("value replaced with {replacement:.4}"),
                });
            }
            if rng.chance(rates.weight) {
                let delta = rng.next_gaussian(0.0, 0.1);
                gene.set_weight(gene.weight() + delta);
                mutated = true;
                events.push(MutationEvent {
                    gene_id: gene.id.clone(),
                    kind: "weight",
                    detail: format!("weight delta {delta:.4}"),
                });
            }
            if mutated {
                gene.origin = Origin::Mutated;
                gene.age = 0;
            }
        }
    }
}

/// Stage 3: duplication. Each gene independently has `duplication` chance
/// of producing a copy with halved weight, a small value bump, and
/// `duplicateOf` set to the source id.
fn duplicate_genes(
    chromosomes: &mut [Chromosome],
    rates: &MutationRates,
    rng: &mut dyn EgdeRng,
    events: &mut Vec<MutationEvent>,
) {
    for chr in chromosomes.iter_mut() {
        let mut new_genes = Vec::new();
        for gene in chr.genes() {
            if rng.chance(rates.duplication) {
                let mut copy = gene.clone();
                copy.id = format!("{}-dup-{:x}", gene.id, rng.next_bytes(4).iter().fold(0u32, |a, b| (a << 8) | *b as u32));
                copy.set_weight(gene.weight() * 0.5);
                copy.set_value(gene.value() + rng.next_gaussian(0.0, 0.05));
                copy.origin = Origin::Duplicated;
                copy.duplicate_of = Some(gene.id.clone());
                copy.age = 0;
                events.push(MutationEvent {
                    gene_id: copy.id.clone(),
                    kind: "duplication",
                    detail: format!("duplicate of {}", gene.id),
                });
                new_genes.push(copy);
            }
        }
        for gene in new_genes {
            chr.push(gene);
        }
    }
}

/// Stage 4: deletion. Essential genes (`essentiality >= 0.8`) never
/// deleted. `p = base · (1 − essentiality)` (spec §4.5), with `base`
/// elevated from `deletion`/`starvationDeletion` to `0.08` for silenced
/// genes or `0.05` for low-weight genes, and a further ×1.5 under
/// starvation whenever `metabolicCost > 0.005`.
fn delete_genes(
    chromosomes: &mut [Chromosome],
    rates: &MutationRates,
    starvation_mode: bool,
    rng: &mut dyn EgdeRng,
    events: &mut Vec<MutationEvent>,
) {
    for chr in chromosomes.iter_mut() {
        let candidate_ids: Vec<String> = chr
            .genes()
            .iter()
            .filter(|g| !g.is_essential())
            .map(|g| g.id.clone())
            .collect();

        for gene_id in candidate_ids {
            let gene = match chr.gene(&gene_id) {
                Some(g) => g,
                None => continue,
            };
            let base = if matches!(gene.expression_state, crate::gene::ExpressionState::Silenced) {
                0.08
            } else if gene.weight() < 0.3 {
                0.05
            } else if starvation_mode {
                rates.starvation_deletion
            } else {
                rates.deletion
            };
            let mut p = base * (1.0 - gene.essentiality());
            if starvation_mode && gene.metabolic_cost() > 0.005 {
                p *= 1.5;
            }
            if rng.chance(p) {
                chr.remove_gene(&gene_id);
                events.push(MutationEvent { gene_id, kind: "deletion", detail: "removed".to_string() });
            }
        }
    }
}

/// Stage 5: de-novo birth. One `deNovo` chance per breeding of spawning a
/// brand-new gene in a random domain with conditional expression gated on
/// an as-yet-unseen environment trigger, placed in a random non-essential
/// chromosome (an "Accessory" chromosome is created if none exists).
fn de_novo_birth(
    chromosomes: &mut Vec<Chromosome>,
    rates: &MutationRates,
    rng: &mut dyn EgdeRng,
    events: &mut Vec<MutationEvent>,
) {
    if !rng.chance(rates.de_novo) {
        return;
    }
    let non_essential: Vec<usize> =
        chromosomes.iter().enumerate().filter(|(_, c)| !c.is_essential).map(|(i, _)| i).collect();
    let target_idx = if non_essential.is_empty() {
        chromosomes.push(Chromosome::new("accessory", "Accessory", false));
        chromosomes.len() - 1
    } else {
        non_essential[rng.next_index(non_essential.len())]
    };

    let suffix = rng.next_bytes(4).iter().fold(0u32, |a, b| (a << 8) | *b as u32);
    let id = format!("de-novo-{suffix:x}");
    let domain = Domain::ALL[rng.next_index(Domain::ALL.len())];
    let mut gene = Gene::new(
        id.clone(),
        "De Novo Gene",
        domain,
        rng.next_range(0.0, 1.0),
        rng.next_range(0.1, 0.3),
        rng.next_range(0.2, 0.6),
        rng.next_range(0.5, 1.0),
        0.1,
        rng.next_range(0.001, 0.004),
        Origin::DeNovo,
    );
    gene = gene.with_activation_condition("environment_trigger_unknown > 0");
    let target_name = chromosomes[target_idx].name.clone();
    chromosomes[target_idx].push(gene);
    events.push(MutationEvent { gene_id: id, kind: "de-novo", detail: format!("born into {target_name}") });
}

/// Stage 6: regulatory recombination. Union both parents' edges; where
/// both have an edge for the same `(source,target)` pair, coin-flip which
/// strength survives. Then roll `add`/`delete`/`modify` against the
/// merged set.
fn recombine_regulatory(
    parent_a_edges: &[RegulatoryEdge],
    parent_b_edges: &[RegulatoryEdge],
    gene_ids: &HashSet<String>,
    rates: &MutationRates,
    rng: &mut dyn EgdeRng,
) -> Vec<RegulatoryEdge> {
    let mut by_pair: std::collections::HashMap<(String, String), RegulatoryEdge> =
        std::collections::HashMap::new();
    for edge in parent_a_edges.iter().chain(parent_b_edges.iter()) {
        let key = (edge.source_gene_id.clone(), edge.target_gene_id.clone());
        match by_pair.get(&key) {
            Some(_) if rng.chance(0.5) => {
                by_pair.insert(key, edge.clone());
            }
            None => {
                by_pair.insert(key, edge.clone());
            }
            _ => {}
        }
    }
    let mut edges: Vec<RegulatoryEdge> = by_pair.into_values().collect();

    edges.retain(|_| !rng.chance(rates.regulatory_delete));

    for edge in edges.iter_mut() {
        if rng.chance(rates.regulatory_modify) {
            edge.strength = (edge.strength + rng.next_gaussian(0.0, 0.1)).max(0.0).min(1.0);
        }
    }

    if rng.chance(rates.regulatory_add) && gene_ids.len() >= 2 {
        let ids: Vec<&String> = gene_ids.iter().collect();
        let source = ids[rng.next_index(ids.len())].clone();
        let target = ids[rng.next_index(ids.len())].clone();
        if source != target {
            let relationship = if rng.chance(0.5) { Relationship::Activation } else { Relationship::Inhibition };
            edges.push(RegulatoryEdge::new(source, target, relationship, rng.next_range(0.2, 0.8)));
        }
    }

    edges
}

/// Stage 7: structural variation, feature-gated by `EgdeConfig`.
/// Inversion reverses the gene order of one non-essential chromosome.
/// Translocation swaps a random gene between two non-essential
/// chromosomes.
fn structural_variation(
    chromosomes: &mut [Chromosome],
    rates: &MutationRates,
    config: &EgdeConfig,
    rng: &mut dyn EgdeRng,
    events: &mut Vec<StructuralVariation>,
) {
    if !config.enable_structural_variation {
        return;
    }

    for chr in chromosomes.iter_mut() {
        if !chr.is_essential && rng.chance(rates.inversion) {
            chr.genes_mut().reverse();
            events.push(StructuralVariation {
                kind: "inversion",
                detail: format!("chromosome {} gene order reversed", chr.id),
            });
        }
    }

    let eligible: Vec<usize> = chromosomes
        .iter()
        .enumerate()
        .filter(|(_, c)| !c.is_essential && c.len() >= 2)
        .map(|(i, _)| i)
        .collect();
    if eligible.len() >= 2 && rng.chance(rates.translocation) {
        let a = eligible[rng.next_index(eligible.len())];
        let mut b = eligible[rng.next_index(eligible.len())];
        if b == a {
            b = eligible[(eligible.iter().position(|&x| x == a).unwrap() + 1) % eligible.len()];
        }
        if a != b {
            let (lo, hi) = if a < b { (a, b) } else { (b, a) };
            let break_lo = 1 + rng.next_index(chromosomes[lo].len() - 1);
            let break_hi = 1 + rng.next_index(chromosomes[hi].len() - 1);
            let (left, right) = chromosomes.split_at_mut(hi);
            let lo_chr = &mut left[lo];
            let hi_chr = &mut right[0];
            let lo_suffix = lo_chr.genes_mut().split_off(break_lo);
            let hi_suffix = hi_chr.genes_mut().split_off(break_hi);
            lo_chr.genes_mut().extend(hi_suffix);
            hi_chr.genes_mut().extend(lo_suffix);
            events.push(StructuralVariation {
                kind: "translocation",
                detail: format!(
                    "chromosomes {} and {} swapped suffixes at breakpoints {}/{}",
                    chromosomes[lo].id, chromosomes[hi].id, break_lo, break_hi
                ),
            });
        }
    }
}

/// Stage 8: gene conversion, feature-gated. For pairs of genes in the
/// same domain with a shared name prefix, blend 70% toward the
/// higher-weight gene's value.
fn gene_conversion(
    chromosomes: &mut [Chromosome],
    rates: &MutationRates,
    config: &EgdeConfig,
    rng: &mut dyn EgdeRng,
    events: &mut Vec<GeneConversionEvent>,
) {
    if !config.enable_gene_conversion {
        return;
    }
    let flat: Vec<(String, String)> = chromosomes
        .iter()
        .flat_map(|c| c.genes().iter().map(|g| (g.id.clone(), c.id.clone())))
        .collect();

    for i in 0..flat.len() {
        for j in (i + 1)..flat.len() {
            let (id_a, chr_a) = &flat[i];
            let (id_b, chr_b) = &flat[j];
            let domain_matches = {
                let ga = chromosomes.iter().find(|c| &c.id == chr_a).and_then(|c| c.gene(id_a));
                let gb = chromosomes.iter().find(|c| &c.id == chr_b).and_then(|c| c.gene(id_b));
                match (ga, gb) {
                    (Some(a), Some(b)) => a.domain == b.domain && shares_name_prefix(&a.name, &b.name),
                    _ => false,
                }
            };
            if !domain_matches || !rng.chance(rates.conversion) {
                continue;
            }

            let (value_a, weight_a) = chromosomes
                .iter()
                .find(|c| &c.id == chr_a)
                .and_then(|c| c.gene(id_a))
                .map(|g| (g.value(), g.weight()))
                .unwrap();
            let (value_b, weight_b) = chromosomes
                .iter()
                .find(|c| &c.id == chr_b)
                .and_then(|c| c.gene(id_b))
                .map(|g| (g.value(), g.weight()))
                .unwrap();

            let (donor_id, donor_chr, recipient_id, recipient_chr, donor_value) = if weight_a >= weight_b {
                (id_a.clone(), chr_a.clone(), id_b.clone(), chr_b.clone(), value_a)
            } else {
                (id_b.clone(), chr_b.clone(), id_a.clone(), chr_a.clone(), value_b)
            };

            if let Some(chr) = chromosomes.iter_mut().find(|c| c.id == recipient_chr) {
                if let Some(recipient) = chr.gene_mut(&recipient_id) {
                    let blended = recipient.value() * 0.3 + donor_value * 0.7;
                    recipient.set_value(blended);
                    events.push(GeneConversionEvent {
                        donor_gene_id: donor_id.clone(),
                        recipient_gene_id: recipient_id.clone(),
                    });
                }
            }
            let _ = donor_chr;
        }
    }
}

fn shares_name_prefix(a: &str, b: &str) -> bool {
    let prefix_len = a.split_whitespace().next().map(str::len).unwrap_or(0).min(b.len());
    prefix_len > 0 && a[..prefix_len.min(a.len())] == b[..prefix_len.min(b.len())]
}

/// Run the full eight-stage pipeline against two parents, returning the
/// child genome and a report of everything that happened. Callers should
/// run [`check_inbreeding`] first.
pub fn breed(
    parent_a: &DynamicGenome,
    parent_b: &DynamicGenome,
    ctx: &BreedingContext,
    config: &EgdeConfig,
    rng: &mut dyn EgdeRng,
) -> BreedingResult {
    let rates = &config.mutation;
    let mut mutations = Vec::new();
    let mut crossover_events = Vec::new();
    let mut structural_variations = Vec::new();
    let mut gene_conversions = Vec::new();

    let mut chromosomes = crossover(parent_a, parent_b, rates, rng, &mut crossover_events);
    point_mutate(&mut chromosomes, rates, rng, &mut mutations);
    duplicate_genes(&mut chromosomes, rates, rng, &mut mutations);
    delete_genes(&mut chromosomes, rates, ctx.starvation_mode, rng, &mut mutations);
    de_novo_birth(&mut chromosomes, rates, rng, &mut mutations);

    let gene_ids: HashSet<String> = chromosomes.iter().flat_map(|c| c.gene_ids()).collect();
    let edges = recombine_regulatory(&parent_a.regulatory_edges, &parent_b.regulatory_edges, &gene_ids, rates, rng);

    structural_variation(&mut chromosomes, rates, config, rng, &mut structural_variations);
    gene_conversion(&mut chromosomes, rates, config, rng, &mut gene_conversions);

    let generation = parent_a.generation.max(parent_b.generation) + 1;
    let lineage_id = format!("{}+{}", ctx.parent_a_id, ctx.parent_b_id);
    let mut child = DynamicGenome::new(lineage_id, parent_a.birth_timestamp.max(parent_b.birth_timestamp));
    child.generation = generation;
    child.chromosomes = chromosomes;
    child.regulatory_edges = edges;
    child.prune_dangling_edges();

    let from_a = inherit_marks(&parent_a.epigenome, rng);
    let from_b = inherit_marks(&parent_b.epigenome, rng);
    child.epigenome = merge_inherited_marks(from_a, from_b, rng);
    child.push_event(format!("bred from {} and {}", ctx.parent_a_id, ctx.parent_b_id));

    BreedingResult {
        child_genome: child,
        mutations,
        crossover_events,
        structural_variations,
        gene_conversions,
    }
}

/// Horizontal gene transfer between two unrelated agents (spec §4.5):
/// gated on sustained cooperation (`cooperation_hours >= 72` and
/// `interactions >= 20`), and on the donor gene's weight exceeding 1.0.
/// The transferred copy's weight is scaled by 0.3 and `acquiredFrom` is
/// set to the donor's lineage id.
pub fn horizontal_gene_transfer(
    recipient: &mut DynamicGenome,
    donor: &DynamicGenome,
    cooperation_hours: f64,
    interactions: u32,
    rates: &MutationRates,
    rng: &mut dyn EgdeRng,
) -> Option<MutationEvent> {
    if cooperation_hours < 72.0 || interactions < 20 {
        return None;
    }
    if !rng.chance(rates.hgt) {
        return None;
    }

    let candidates: Vec<&Gene> = donor
        .chromosomes
        .iter()
        .flat_map(|c| c.genes())
        .filter(|g| g.weight() > 1.0 && g.expression_state == crate::gene::ExpressionState::Active)
        .collect();
    if candidates.is_empty() {
        return None;
    }
    let donor_gene = candidates[rng.next_index(candidates.len())];

    let mut transferred = donor_gene.clone();
    transferred.id = format!("{}-hgt-{}", donor_gene.id, &donor.lineage_id);
    transferred.set_weight(donor_gene.weight() * 0.3);
    transferred.origin = Origin::HorizontalTransfer;
    transferred.acquired_from = Some(donor.lineage_id.clone());
    transferred.age = 0;

    let accessory_idx = recipient.chromosomes.iter().position(|c| c.id == "accessory").unwrap_or_else(|| {
        recipient.chromosomes.push(Chromosome::new("accessory", "Accessory", false));
        recipient.chromosomes.len() - 1
    });
    let event =
        MutationEvent { gene_id: transferred.id.clone(), kind: "horizontal-transfer", detail: format!("from {}", donor.lineage_id) };
    recipient.chromosomes[accessory_idx].push(transferred);
    recipient.prune_dangling_edges();
    Some(event)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::ChaChaRng;
    use crate::seed::create_genesis_genome;

    fn ctx() -> BreedingContext {
        BreedingContext {
            parent_a_id: "a".into(),
            parent_b_id: "b".into(),
            environmental_stress: 0.1,
            starvation_mode: false,
        }
    }

    #[test]
    fn breeding_two_genesis_genomes_is_rejected_as_inbreeding() {
        let a = create_genesis_genome("a");
        let b = create_genesis_genome("b");
        assert!(check_inbreeding(&a, &b).is_err());
    }

    #[test]
    fn child_generation_is_one_more_than_max_parent() {
        let mut a = create_genesis_genome("a");
        let mut b = create_genesis_genome("b");
        a.generation = 3;
        b.generation = 5;
        // Diverge b's gene set so inbreeding doesn't block the test: drop a
        // few non-essential genes.
        if let Some(chr) = b.chromosome_mut("economic-strategy") {
            let ids = chr.gene_ids();
            for id in ids.iter().take(4) {
                chr.remove_gene(id);
            }
        }
        let config = EgdeConfig::default();
        let mut rng = ChaChaRng::from_seed_u64(1);
        let result = breed(&a, &b, &ctx(), &config, &mut rng);
        assert_eq!(result.child_genome.generation, 6);
    }

    #[test]
    fn breeding_is_deterministic_given_seed() {
        let mut a = create_genesis_genome("a");
        let b = create_genesis_genome("b");
        if let Some(chr) = a.chromosome_mut("economic-strategy") {
            let ids = chr.gene_ids();
            for id in ids.iter().take(5) {
                chr.remove_gene(id);
            }
        }
        let config = EgdeConfig::default();
        let mut rng1 = ChaChaRng::from_seed_u64(99);
        let mut rng2 = ChaChaRng::from_seed_u64(99);
        let r1 = breed(&a, &b, &ctx(), &config, &mut rng1);
        let r2 = breed(&a, &b, &ctx(), &config, &mut rng2);
        assert_eq!(r1.child_genome.recompute_hash(), r2.child_genome.recompute_hash());
    }

    #[test]
    fn essential_genes_survive_deletion_pass() {
        let mut chr = Chromosome::new("metabolism", "Metabolism", true);
        chr.push(Gene::new("g1", "g1", Domain::Metabolism, 0.5, 1.0, 0.5, 0.5, 0.9, 0.001, Origin::Primordial));
        let mut chromosomes = vec![chr];
        let rates = MutationRates { deletion: 1.0, starvation_deletion: 1.0, ..MutationRates::default() };
        let mut rng = ChaChaRng::from_seed_u64(1);
        let mut events = Vec::new();
        delete_genes(&mut chromosomes, &rates, false, &mut rng, &mut events);
        assert_eq!(chromosomes[0].len(), 1);
    }

    #[test]
    fn horizontal_transfer_respects_cooperation_gate() {
        let mut recipient = create_genesis_genome("r");
        let donor = create_genesis_genome("d");
        let rates = MutationRates { hgt: 1.0, ..MutationRates::default() };
        let mut rng = ChaChaRng::from_seed_u64(1);
        let result = horizontal_gene_transfer(&mut recipient, &donor, 10.0, 5, &rates, &mut rng);
        assert!(result.is_none());
    }

    #[test]
    fn horizontal_transfer_scales_weight_down() {
        let mut recipient = create_genesis_genome("r");
        let mut donor = create_genesis_genome("d");
        if let Some(gene) = donor.find_gene_mut("metabolism_rate") {
            gene.set_weight(2.0);
        }
        let rates = MutationRates { hgt: 1.0, ..MutationRates::default() };
        let mut rng = ChaChaRng::from_seed_u64(1);
        let event = horizontal_gene_transfer(&mut recipient, &donor, 100.0, 30, &rates, &mut rng);
        assert!(event.is_some());
        let transferred = recipient.chromosome("accessory").unwrap().genes().last().unwrap();
        assert!(transferred.weight() <= 0.91);
    }

    fn filler_gene(id: &str) -> Gene {
        Gene::new(id, id, Domain::IncomeStrategy, 0.5, 1.0, 0.5, 0.5, 0.2, 0.001, Origin::Primordial)
    }

    #[test]
    fn translocation_swaps_suffixes_between_two_chromosomes() {
        let mut chr_a = Chromosome::new("a", "A", false);
        for id in ["a1", "a2", "a3", "a4"] {
            chr_a.push(filler_gene(id));
        }
        let mut chr_b = Chromosome::new("b", "B", false);
        for id in ["b1", "b2", "b3"] {
            chr_b.push(filler_gene(id));
        }
        let mut chromosomes = vec![chr_a, chr_b];
        let rates = MutationRates { translocation: 1.0, ..MutationRates::default() };
        let config = EgdeConfig::default();
        let mut rng = ChaChaRng::from_seed_u64(3);
        let mut events = Vec::new();
        structural_variation(&mut chromosomes, &rates, &config, &mut rng, &mut events);

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, "translocation");
        let total_genes: usize = chromosomes.iter().map(|c| c.len()).sum();
        assert_eq!(total_genes, 7, "swapping suffixes must not lose or duplicate genes");
        let all_ids: std::collections::HashSet<String> =
            chromosomes.iter().flat_map(|c| c.gene_ids()).collect();
        assert_eq!(all_ids.len(), 7, "no gene id should be lost or duplicated");
    }

    #[test]
    fn single_parent_chromosome_inherits_only_about_half_the_time() {
        let mut a = create_genesis_genome("a");
        let b = create_genesis_genome("b");
        a.chromosomes.push(Chromosome::new("accessory", "Accessory", false));
        a.chromosome_mut("accessory").unwrap().push(filler_gene("extra1"));

        let rates = MutationRates::default();
        let mut inherited = 0;
        let trials = 200;
        for seed in 0..trials {
            let mut rng = ChaChaRng::from_seed_u64(seed);
            let mut events = Vec::new();
            let children = crossover(&a, &b, &rates, &mut rng, &mut events);
            if children.iter().any(|c| c.id == "accessory") {
                inherited += 1;
            }
        }
        let fraction = inherited as f64 / trials as f64;
        assert!((0.3..0.7).contains(&fraction), "expected roughly 50% inheritance, got {fraction}");
    }
}
