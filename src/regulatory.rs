//! Regulatory edge — a directed link shaping expression of a target gene
//! (spec §3). The full set over a genome's gene-id space forms a directed
//! multigraph; self-loops are permitted.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Relationship {
    Activation,
    Inhibition,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LogicTag {
    Additive,
    Multiplicative,
    Threshold,
    And,
    Or,
    Nand,
    Oscillator,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegulatoryEdge {
    pub source_gene_id: String,
    pub target_gene_id: String,
    pub relationship: Relationship,
    pub strength: f64,
    pub logic: LogicTag,
    pub threshold: Option<f64>,
    pub cooperativity: Option<f64>,
    pub phase: Option<f64>,
    pub period: Option<f64>,
}

impl RegulatoryEdge {
    pub fn new(
        source_gene_id: impl Into<String>,
        target_gene_id: impl Into<String>,
        relationship: Relationship,
        strength: f64,
    ) -> Self {
        let logic = match relationship {
            Relationship::Activation => LogicTag::Additive,
            Relationship::Inhibition => LogicTag::Additive,
        };
        Self {
            source_gene_id: source_gene_id.into(),
            target_gene_id: target_gene_id.into(),
            relationship,
            strength: strength.max(0.0).min(1.0),
            logic,
            threshold: None,
            cooperativity: None,
            phase: None,
            period: None,
        }
    }

    pub fn with_logic(mut self, logic: LogicTag) -> Self {
        self.logic = logic;
        self
    }

    pub fn with_threshold(mut self, threshold: f64, cooperativity: f64) -> Self {
        self.threshold = Some(threshold);
        self.cooperativity = Some(cooperativity);
        self
    }

    pub fn with_oscillator(mut self, phase: f64, period: f64) -> Self {
        self.phase = Some(phase);
        self.period = Some(period);
        self
    }

    pub fn cooperativity_or_default(&self) -> f64 {
        self.cooperativity.unwrap_or(2.0)
    }

    /// `(sourceId, targetId)` sort key used by the canonical encoding.
    pub fn sort_key(&self) -> (String, String) {
        (self.source_gene_id.clone(), self.target_gene_id.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strength_clamps_to_unit_interval() {
        let edge = RegulatoryEdge::new("a", "b", Relationship::Activation, 5.0);
        assert_eq!(edge.strength, 1.0);
        let edge = RegulatoryEdge::new("a", "b", Relationship::Activation, -5.0);
        assert_eq!(edge.strength, 0.0);
    }

    #[test]
    fn threshold_defaults_cooperativity_to_two() {
        let edge = RegulatoryEdge::new("a", "b", Relationship::Activation, 0.5);
        assert_eq!(edge.cooperativity_or_default(), 2.0);
    }
}
