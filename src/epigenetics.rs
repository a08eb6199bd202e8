//! Epigenetic marks, the fixed trigger catalogue, and `updateEpigenome`
//! (spec §4.6).

use serde::{Deserialize, Serialize};

use crate::gene::Domain;
use crate::genome::DynamicGenome;
use crate::rng::EgdeRng;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Modification {
    Upregulate,
    Downregulate,
    Silence,
    Activate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpigeneticMark {
    pub target_gene_id: String,
    pub modification: Modification,
    pub strength: f64,
    pub cause: String,
    pub heritability: f64,
    pub decay: f64,
    pub generation_created: u32,
}

impl EpigeneticMark {
    /// Decayed strength at generation `current_gen`:
    /// `s' = s * (1 - decay) ^ (gen - genCreated)`.
    pub fn decayed_strength(&self, current_gen: u32) -> f64 {
        let elapsed = current_gen.saturating_sub(self.generation_created) as i32;
        self.strength * (1.0 - self.decay).powi(elapsed)
    }
}

/// Snapshot of the per-agent environment (spec §3).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Mode {
    Normal,
    LowPower,
    Emergency,
    Hibernation,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnvironmentalState {
    pub balance: f64,
    pub days_since_last_income: f64,
    pub days_starving: f64,
    pub days_thriving: f64,
    pub recent_deception_count: f64,
    pub cooperation_count: f64,
    pub stress_level: f64,
    pub mode: Mode,
}

impl Default for EnvironmentalState {
    fn default() -> Self {
        Self {
            balance: 10.0,
            days_since_last_income: 0.0,
            days_starving: 0.0,
            days_thriving: 0.0,
            recent_deception_count: 0.0,
            cooperation_count: 0.0,
            stress_level: 0.0,
            mode: Mode::Normal,
        }
    }
}

struct Trigger {
    predicate: fn(&EnvironmentalState) -> bool,
    target_domain: Domain,
    modification: Modification,
    strength: f64,
    heritability: f64,
    decay: f64,
    cause: &'static str,
}

fn trigger_catalogue() -> Vec<Trigger> {
    vec![
        Trigger {
            predicate: |e| e.days_starving >= 3.0,
            target_domain: Domain::Metabolism,
            modification: Modification::Upregulate,
            strength: 0.6,
            heritability: 0.3,
            decay: 0.2,
            cause: "days_starving>=3",
        },
        Trigger {
            predicate: |e| e.days_starving >= 7.0,
            target_domain: Domain::Cognition,
            modification: Modification::Silence,
            strength: 0.8,
            heritability: 0.1,
            decay: 0.3,
            cause: "days_starving>=7",
        },
        Trigger {
            predicate: |e| e.stress_level >= 0.7,
            target_domain: Domain::StressResponse,
            modification: Modification::Upregulate,
            strength: 0.7,
            heritability: 0.25,
            decay: 0.25,
            cause: "stress_level>=0.7",
        },
        Trigger {
            predicate: |e| e.recent_deception_count >= 2.0,
            target_domain: Domain::TrustModel,
            modification: Modification::Downregulate,
            strength: 0.5,
            heritability: 0.2,
            decay: 0.3,
            cause: "recent_deception_count>=2",
        },
        Trigger {
            predicate: |e| e.days_thriving >= 14.0,
            target_domain: Domain::NoveltySeeking,
            modification: Modification::Activate,
            strength: 0.4,
            heritability: 0.15,
            decay: 0.4,
            cause: "days_thriving>=14",
        },
        Trigger {
            predicate: |e| e.cooperation_count >= 5.0,
            target_domain: Domain::Cooperation,
            modification: Modification::Upregulate,
            strength: 0.5,
            heritability: 0.3,
            decay: 0.2,
            cause: "cooperation_count>=5",
        },
        Trigger {
            predicate: |e| matches!(e.mode, Mode::Emergency | Mode::Hibernation),
            target_domain: Domain::Dormancy,
            modification: Modification::Activate,
            strength: 0.6,
            heritability: 0.2,
            decay: 0.25,
            cause: "mode=emergency|hibernation",
        },
    ]
}

/// Result of one `updateEpigenome` call.
pub struct EpigenomeUpdate {
    pub new_marks: Vec<EpigeneticMark>,
    pub removed_mark_gene_ids: Vec<String>,
    pub trigger_causes: Vec<String>,
}

const RETENTION_THRESHOLD: f64 = 0.1;
const PLASTICITY_FLOOR: f64 = 0.2;

/// Evaluate the trigger catalogue against `env`, create/overwrite marks on
/// genes in each firing trigger's target domain with a critical-window-
/// boosted plasticity of at least 0.2, decay and prune existing marks, and
/// replace the genome's epigenome. `age_days` drives the developmental
/// critical-window boost applied to each candidate gene's plasticity.
pub fn update_epigenome(genome: &mut DynamicGenome, env: &EnvironmentalState, age_days: f64) -> EpigenomeUpdate {
    let gen = genome.generation;
    let mut removed_mark_gene_ids = Vec::new();

    // Retain existing marks whose decayed strength still exceeds the
    // threshold; drop the rest.
    let mut retained: Vec<EpigeneticMark> = Vec::new();
    for mark in genome.epigenome.drain(..) {
        if mark.decayed_strength(gen) > RETENTION_THRESHOLD {
            retained.push(mark);
        } else {
            removed_mark_gene_ids.push(mark.target_gene_id.clone());
        }
    }

    let mut trigger_causes = Vec::new();
    let mut new_marks = Vec::new();

    for trigger in trigger_catalogue() {
        if !(trigger.predicate)(env) {
            continue;
        }
        trigger_causes.push(trigger.cause.to_string());

        let gene_ids: Vec<String> = genome
            .chromosomes
            .iter()
            .flat_map(|c| c.genes())
            .filter(|g| g.domain == trigger.target_domain && g.effective_plasticity(age_days) >= PLASTICITY_FLOOR)
            .map(|g| g.id.clone())
            .collect();

        for gene_id in gene_ids {
            let plasticity = genome
                .find_gene(&gene_id)
                .map(|g| g.effective_plasticity(age_days))
                .unwrap_or(0.0);
            let mark = EpigeneticMark {
                target_gene_id: gene_id,
                modification: trigger.modification,
                strength: trigger.strength * plasticity,
                cause: trigger.cause.to_string(),
                heritability: trigger.heritability * plasticity,
                decay: trigger.decay,
                generation_created: gen,
            };
            new_marks.push(mark);
        }
    }

    // New marks overwrite retained marks on the same gene.
    let mut by_gene: std::collections::HashMap<String, EpigeneticMark> = std::collections::HashMap::new();
    for mark in retained {
        by_gene.insert(mark.target_gene_id.clone(), mark);
    }
    for mark in new_marks.clone() {
        by_gene.insert(mark.target_gene_id.clone(), mark);
    }

    let mut final_marks: Vec<EpigeneticMark> = by_gene.into_values().collect();
    final_marks.sort_by(|a, b| a.target_gene_id.cmp(&b.target_gene_id));
    genome.epigenome = final_marks;

    EpigenomeUpdate { new_marks, removed_mark_gene_ids, trigger_causes }
}

/// Inherit marks from one parent into a child's epigenome at breeding time
/// (spec §4.6): each mark is inherited with probability equal to its
/// heritability; inherited strength is reduced by 20%.
pub fn inherit_marks(
    parent_marks: &[EpigeneticMark],
    rng: &mut dyn EgdeRng,
) -> Vec<EpigeneticMark> {
    parent_marks
        .iter()
        .filter(|m| rng.chance(m.heritability))
        .map(|m| EpigeneticMark {
            target_gene_id: m.target_gene_id.clone(),
            modification: m.modification,
            strength: m.strength * 0.8,
            cause: m.cause.clone(),
            heritability: m.heritability,
            decay: m.decay,
            generation_created: m.generation_created,
        })
        .collect()
}

/// Merge marks inherited from both parents, resolving collisions on the
/// same target gene by randomly choosing a primary parent's mark.
pub fn merge_inherited_marks(
    from_a: Vec<EpigeneticMark>,
    from_b: Vec<EpigeneticMark>,
    rng: &mut dyn EgdeRng,
) -> Vec<EpigeneticMark> {
    let mut by_gene: std::collections::HashMap<String, EpigeneticMark> = std::collections::HashMap::new();
    for mark in from_a {
        by_gene.insert(mark.target_gene_id.clone(), mark);
    }
    for mark in from_b {
        match by_gene.entry(mark.target_gene_id.clone()) {
            std::collections::hash_map::Entry::Occupied(mut e) => {
                if rng.chance(0.5) {
                    e.insert(mark);
                }
            }
            std::collections::hash_map::Entry::Vacant(e) => {
                e.insert(mark);
            }
        }
    }
    let mut marks: Vec<EpigeneticMark> = by_gene.into_values().collect();
    marks.sort_by(|a, b| a.target_gene_id.cmp(&b.target_gene_id));
    marks
}
