//! The dynamic genome: metadata, chromosome list, regulatory edges,
//! epigenome, invariants, hashing, and versioned serialization (spec §3,
//! §4.1).

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::chromosome::Chromosome;
use crate::epigenetics::EpigeneticMark;
use crate::error::{EgdeError, EgdeResult};
use crate::gene::Gene;
use crate::regulatory::RegulatoryEdge;

pub const GENOME_RECORD_VERSION: u32 = 2;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DynamicGenome {
    pub generation: u32,
    pub lineage_id: String,
    pub birth_timestamp: i64,
    pub chromosomes: Vec<Chromosome>,
    pub regulatory_edges: Vec<RegulatoryEdge>,
    pub epigenome: Vec<EpigeneticMark>,
    /// Bounded log of breeding/epigenetic events, newest last, so the
    /// survival loop and breeding pipeline have somewhere to attach
    /// replayable records (SPEC_FULL §B).
    pub event_log: Vec<String>,
}

const EVENT_LOG_CAP: usize = 64;

impl DynamicGenome {
    pub fn new(lineage_id: impl Into<String>, birth_timestamp: i64) -> Self {
        Self {
            generation: 0,
            lineage_id: lineage_id.into(),
            birth_timestamp,
            chromosomes: Vec::new(),
            regulatory_edges: Vec::new(),
            epigenome: Vec::new(),
            event_log: Vec::new(),
        }
    }

    pub fn push_event(&mut self, event: impl Into<String>) {
        self.event_log.push(event.into());
        if self.event_log.len() > EVENT_LOG_CAP {
            let excess = self.event_log.len() - EVENT_LOG_CAP;
            self.event_log.drain(0..excess);
        }
    }

    pub fn total_gene_count(&self) -> usize {
        self.chromosomes.iter().map(|c| c.len()).sum()
    }

    pub fn all_gene_ids(&self) -> std::collections::HashSet<String> {
        self.chromosomes.iter().flat_map(|c| c.gene_ids()).collect()
    }

    pub fn find_gene(&self, gene_id: &str) -> Option<&Gene> {
        self.chromosomes.iter().find_map(|c| c.gene(gene_id))
    }

    pub fn find_gene_mut(&mut self, gene_id: &str) -> Option<&mut Gene> {
        self.chromosomes.iter_mut().find_map(|c| c.gene_mut(gene_id))
    }

    pub fn chromosome(&self, id: &str) -> Option<&Chromosome> {
        self.chromosomes.iter().find(|c| c.id == id)
    }

    pub fn chromosome_mut(&mut self, id: &str) -> Option<&mut Chromosome> {
        self.chromosomes.iter_mut().find(|c| c.id == id)
    }

    pub fn chromosome_of_gene(&self, gene_id: &str) -> Option<&Chromosome> {
        self.chromosomes.iter().find(|c| c.gene(gene_id).is_some())
    }

    /// Add a regulatory edge, checking invariant (i): both endpoints must
    /// resolve to genes present in the genome.
    pub fn add_edge(&mut self, edge: RegulatoryEdge) -> EgdeResult<()> {
        let ids = self.all_gene_ids();
        if !ids.contains(&edge.source_gene_id) || !ids.contains(&edge.target_gene_id) {
            return Err(EgdeError::InvariantViolated(format!(
                "edge {}->{} references a gene absent from the genome",
                edge.source_gene_id, edge.target_gene_id
            )));
        }
        self.regulatory_edges.push(edge);
        Ok(())
    }

    /// Drop every edge referencing a gene that no longer exists. Genetic
    /// operators call this after removing genes so invariant (i) is
    /// restored rather than violated.
    pub fn prune_dangling_edges(&mut self) {
        let ids = self.all_gene_ids();
        self.regulatory_edges
            .retain(|e| ids.contains(&e.source_gene_id) && ids.contains(&e.target_gene_id));
    }

    /// Validate every invariant from spec §3: unique gene ids, edges
    /// resolve, essential chromosomes non-empty.
    pub fn check_invariants(&self) -> EgdeResult<()> {
        let mut seen = std::collections::HashSet::new();
        for chr in &self.chromosomes {
            for gene in chr.genes() {
                if !seen.insert(gene.id.clone()) {
                    return Err(EgdeError::InvariantViolated(format!(
                        "duplicate gene id {}",
                        gene.id
                    )));
                }
            }
            if chr.is_essential && chr.is_empty() {
                return Err(EgdeError::InvariantViolated(format!(
                    "essential chromosome {} is empty",
                    chr.id
                )));
            }
        }
        for edge in &self.regulatory_edges {
            if !seen.contains(&edge.source_gene_id) || !seen.contains(&edge.target_gene_id) {
                return Err(EgdeError::InvariantViolated(format!(
                    "edge {}->{} references a gene absent from the genome",
                    edge.source_gene_id, edge.target_gene_id
                )));
            }
        }
        Ok(())
    }

    /// `H(concat(chromosome gene-id lists) || concat(edge sourceId->targetId
    /// strings))`. Order of chromosomes/genes within a chromosome matters;
    /// order of edges does not (they're sorted before hashing).
    pub fn recompute_hash(&self) -> [u8; 32] {
        let mut hasher = Sha256::new();
        for chr in &self.chromosomes {
            for gene_id in chr.gene_ids() {
                hasher.update(gene_id.as_bytes());
                hasher.update(b"\0");
            }
        }
        let mut edge_strings: Vec<String> = self
            .regulatory_edges
            .iter()
            .map(|e| format!("{}->{}", e.source_gene_id, e.target_gene_id))
            .collect();
        edge_strings.sort();
        for s in edge_strings {
            hasher.update(s.as_bytes());
            hasher.update(b"\0");
        }
        hasher.finalize().into()
    }

    pub fn hash_hex(&self) -> String {
        hex::encode(self.recompute_hash())
    }

    /// Canonical encoding used for cross-language byte-for-byte round-trips
    /// (spec §6): chromosomes in declaration order, genes in list order
    /// with numeric fields rounded to 6 decimals, edges sorted by
    /// `(sourceId, targetId)`, marks sorted by `targetGeneId`.
    pub fn canonical_json(&self) -> serde_json::Value {
        fn round6(v: f64) -> f64 {
            (v * 1_000_000.0).round() / 1_000_000.0
        }

        let chromosomes: Vec<serde_json::Value> = self
            .chromosomes
            .iter()
            .map(|c| {
                let genes: Vec<serde_json::Value> = c
                    .genes()
                    .iter()
                    .map(|g| {
                        serde_json::json!({
                            "id": g.id,
                            "name": g.name,
                            "domain": format!("{:?}", g.domain),
                            "value": round6(g.value()),
                            "weight": round6(g.weight()),
                            "dominance": round6(g.dominance()),
                            "plasticity": round6(g.plasticity()),
                            "essentiality": round6(g.essentiality()),
                            "metabolicCost": round6(g.metabolic_cost()),
                            "origin": format!("{:?}", g.origin),
                            "age": g.age,
                            "expressionState": format!("{:?}", g.expression_state),
                        })
                    })
                    .collect();
                serde_json::json!({
                    "id": c.id,
                    "name": c.name,
                    "isEssential": c.is_essential,
                    "genes": genes,
                })
            })
            .collect();

        let mut edges: Vec<&RegulatoryEdge> = self.regulatory_edges.iter().collect();
        edges.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
        let edges: Vec<serde_json::Value> = edges
            .iter()
            .map(|e| {
                serde_json::json!({
                    "sourceGeneId": e.source_gene_id,
                    "targetGeneId": e.target_gene_id,
                    "relationship": format!("{:?}", e.relationship),
                    "strength": round6(e.strength),
                    "logic": format!("{:?}", e.logic),
                })
            })
            .collect();

        let mut marks: Vec<&EpigeneticMark> = self.epigenome.iter().collect();
        marks.sort_by(|a, b| a.target_gene_id.cmp(&b.target_gene_id));
        let marks: Vec<serde_json::Value> = marks
            .iter()
            .map(|m| {
                serde_json::json!({
                    "targetGeneId": m.target_gene_id,
                    "modification": format!("{:?}", m.modification),
                    "strength": round6(m.strength),
                    "heritability": round6(m.heritability),
                    "decay": round6(m.decay),
                    "generationCreated": m.generation_created,
                })
            })
            .collect();

        serde_json::json!({
            "generation": self.generation,
            "lineageId": self.lineage_id,
            "chromosomes": chromosomes,
            "regulatoryEdges": edges,
            "epigenome": marks,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenomeRecord {
    pub version: u32,
    pub genome: DynamicGenome,
    /// Hex-encoded 32-byte checksum over the canonical encoding.
    pub checksum: String,
}

impl GenomeRecord {
    pub fn encode(genome: &DynamicGenome) -> Self {
        let canonical = genome.canonical_json().to_string();
        let mut hasher = Sha256::new();
        hasher.update(canonical.as_bytes());
        let checksum: [u8; 32] = hasher.finalize().into();
        Self { version: GENOME_RECORD_VERSION, genome: genome.clone(), checksum: hex::encode(checksum) }
    }

    /// Fails with `IncompatibleGenome` if `version` doesn't match the major
    /// version this implementation understands.
    pub fn decode(self) -> EgdeResult<DynamicGenome> {
        if self.version != GENOME_RECORD_VERSION {
            return Err(EgdeError::IncompatibleGenome {
                found: self.version,
                expected: GENOME_RECORD_VERSION,
            });
        }
        Ok(self.genome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seed::create_genesis_genome;

    #[test]
    fn hash_ignores_edge_order_and_numeric_perturbation() {
        let mut a = create_genesis_genome("L");
        let mut b = a.clone();
        b.regulatory_edges.reverse();
        for edge in &mut b.regulatory_edges {
            edge.strength = (edge.strength + 1e-9).min(1.0);
        }
        assert_eq!(a.recompute_hash(), b.recompute_hash());
        a.push_event("noop");
        assert_eq!(a.recompute_hash(), b.recompute_hash());
    }

    #[test]
    fn hash_changes_with_gene_order() {
        let mut a = create_genesis_genome("L");
        let mut b = a.clone();
        if let Some(chr) = b.chromosomes.first_mut() {
            chr.genes_mut().reverse();
        }
        assert_ne!(a.recompute_hash(), b.recompute_hash());
        let _ = &mut a;
    }

    #[test]
    fn serialize_round_trip_is_identity() {
        let genome = create_genesis_genome("L");
        let record = GenomeRecord::encode(&genome);
        let json = serde_json::to_string(&record).unwrap();
        let parsed: GenomeRecord = serde_json::from_str(&json).unwrap();
        let decoded = parsed.decode().unwrap();
        assert_eq!(decoded.recompute_hash(), genome.recompute_hash());
    }

    #[test]
    fn incompatible_version_rejected() {
        let genome = create_genesis_genome("L");
        let mut record = GenomeRecord::encode(&genome);
        record.version = 1;
        assert!(matches!(record.decode(), Err(EgdeError::IncompatibleGenome { .. })));
    }

    #[test]
    fn invariants_reject_duplicate_gene_ids() {
        let mut genome = create_genesis_genome("L");
        let dup = genome.chromosomes[0].genes()[0].clone();
        genome.chromosomes[1].push(dup);
        assert!(genome.check_invariants().is_err());
    }

    #[test]
    fn add_edge_rejects_unknown_gene() {
        let mut genome = create_genesis_genome("L");
        let edge = RegulatoryEdge::new("nonexistent", "also-nonexistent", crate::regulatory::Relationship::Activation, 0.5);
        assert!(genome.add_edge(edge).is_err());
    }
}
