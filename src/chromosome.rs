//! Chromosome — an ordered, named sequence of genes (spec §3).

use serde::{Deserialize, Serialize};

use crate::gene::Gene;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chromosome {
    pub id: String,
    pub name: String,
    pub is_essential: bool,
    genes: Vec<Gene>,
}

impl Chromosome {
    pub fn new(id: impl Into<String>, name: impl Into<String>, is_essential: bool) -> Self {
        Self { id: id.into(), name: name.into(), is_essential, genes: Vec::new() }
    }

    pub fn genes(&self) -> &[Gene] {
        &self.genes
    }

    pub fn genes_mut(&mut self) -> &mut Vec<Gene> {
        &mut self.genes
    }

    pub fn push(&mut self, gene: Gene) {
        self.genes.push(gene);
    }

    pub fn gene(&self, gene_id: &str) -> Option<&Gene> {
        self.genes.iter().find(|g| g.id == gene_id)
    }

    pub fn gene_mut(&mut self, gene_id: &str) -> Option<&mut Gene> {
        self.genes.iter_mut().find(|g| g.id == gene_id)
    }

    pub fn gene_ids(&self) -> Vec<String> {
        self.genes.iter().map(|g| g.id.clone()).collect()
    }

    /// Remove the gene with `gene_id`. Refuses (returns `false`) if this
    /// chromosome is essential and the gene is its last remaining one
    /// (spec §3 "essential chromosomes cannot be entirely emptied").
    pub fn remove_gene(&mut self, gene_id: &str) -> bool {
        if self.is_essential && self.genes.len() <= 1 {
            return false;
        }
        let before = self.genes.len();
        self.genes.retain(|g| g.id != gene_id);
        self.genes.len() < before
    }

    pub fn len(&self) -> usize {
        self.genes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.genes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gene::{Domain, Origin};

    fn sample_gene(id: &str) -> Gene {
        Gene::new(id, id, Domain::Metabolism, 0.5, 1.0, 0.5, 0.5, 0.9, 0.001, Origin::Primordial)
    }

    #[test]
    fn essential_chromosome_refuses_to_empty() {
        let mut chr = Chromosome::new("c1", "Metabolism", true);
        chr.push(sample_gene("g1"));
        assert!(!chr.remove_gene("g1"));
        assert_eq!(chr.len(), 1);
    }

    #[test]
    fn non_essential_chromosome_can_empty() {
        let mut chr = Chromosome::new("c1", "Accessory", false);
        chr.push(sample_gene("g1"));
        assert!(chr.remove_gene("g1"));
        assert!(chr.is_empty());
    }

    #[test]
    fn essential_chromosome_allows_removal_above_one() {
        let mut chr = Chromosome::new("c1", "Metabolism", true);
        chr.push(sample_gene("g1"));
        chr.push(sample_gene("g2"));
        assert!(chr.remove_gene("g1"));
        assert_eq!(chr.len(), 1);
    }

    #[test]
    fn order_is_preserved() {
        let mut chr = Chromosome::new("c1", "Metabolism", false);
        chr.push(sample_gene("g1"));
        chr.push(sample_gene("g2"));
        chr.push(sample_gene("g3"));
        assert_eq!(chr.gene_ids(), vec!["g1", "g2", "g3"]);
    }
}
