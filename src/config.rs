//! Contractual defaults (spec §6, §7). Every number here is reproduced
//! exactly as published; applications may override via the builder methods.

#[derive(Debug, Clone, PartialEq)]
pub struct MutationRates {
    pub point: f64,
    pub large: f64,
    pub weight: f64,
    pub duplication: f64,
    pub deletion: f64,
    pub starvation_deletion: f64,
    pub de_novo: f64,
    pub hgt: f64,
    pub inversion: f64,
    pub translocation: f64,
    pub conversion: f64,
    pub regulatory_add: f64,
    pub regulatory_delete: f64,
    pub regulatory_modify: f64,
    pub point_sigma: f64,
    pub chromosome_level_crossover: f64,
    pub extra_gene_inheritance: f64,
}

impl Default for MutationRates {
    fn default() -> Self {
        Self {
            point: 0.05,
            large: 0.0025,
            weight: 0.05,
            duplication: 0.03,
            deletion: 0.02,
            starvation_deletion: 0.15,
            de_novo: 0.005,
            hgt: 0.05,
            inversion: 0.005,
            translocation: 0.002,
            conversion: 0.002,
            regulatory_add: 0.02,
            regulatory_delete: 0.02,
            regulatory_modify: 0.05,
            point_sigma: 0.08,
            chromosome_level_crossover: 0.7,
            extra_gene_inheritance: 0.5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BalanceThresholds {
    pub low: f64,
    pub emergency: f64,
    pub critical: f64,
    pub hibernation: f64,
    /// Gas-surrogate (native-token) floor: below this, mode is forced to
    /// `Emergency` independent of the stable-unit balance (spec §4.10 step 2).
    pub gas_emergency: f64,
}

impl Default for BalanceThresholds {
    fn default() -> Self {
        Self { low: 5.0, emergency: 2.0, critical: 1.0, hibernation: 0.5, gas_emergency: 0.001 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CacheConfig {
    pub max_size: usize,
    pub ttl_secs: u64,
    pub cleanup_interval_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { max_size: 1000, ttl_secs: 60, cleanup_interval_secs: 300 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExpressionDefaults {
    pub base_rate: f64,
    pub per_gene_overhead: f64,
    pub convergence_threshold: f64,
    pub max_rounds: u32,
}

impl Default for ExpressionDefaults {
    fn default() -> Self {
        Self {
            base_rate: 0.001,
            per_gene_overhead: 0.00005,
            convergence_threshold: 0.001,
            max_rounds: 10,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecisionTiming {
    pub min_decision_interval_secs: u64,
    pub max_deliberation_time_secs: u64,
}

impl Default for DecisionTiming {
    fn default() -> Self {
        Self { min_decision_interval_secs: 60, max_deliberation_time_secs: 30 }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EgdeConfig {
    pub mutation: MutationRates,
    pub balance: BalanceThresholds,
    pub cache: CacheConfig,
    pub expression: ExpressionDefaults,
    pub decision: DecisionTiming,
    pub enable_structural_variation: bool,
    pub enable_gene_conversion: bool,
}

impl Default for EgdeConfig {
    fn default() -> Self {
        Self {
            mutation: MutationRates::default(),
            balance: BalanceThresholds::default(),
            cache: CacheConfig::default(),
            expression: ExpressionDefaults::default(),
            decision: DecisionTiming::default(),
            enable_structural_variation: true,
            enable_gene_conversion: true,
        }
    }
}

impl EgdeConfig {
    pub fn with_mutation_rates(mut self, rates: MutationRates) -> Self {
        self.mutation = rates;
        self
    }

    pub fn with_cache(mut self, cache: CacheConfig) -> Self {
        self.cache = cache;
        self
    }

    pub fn without_structural_variation(mut self) -> Self {
        self.enable_structural_variation = false;
        self
    }

    pub fn without_gene_conversion(mut self) -> Self {
        self.enable_gene_conversion = false;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_contract() {
        let cfg = EgdeConfig::default();
        assert_eq!(cfg.mutation.point, 0.05);
        assert_eq!(cfg.mutation.de_novo, 0.005);
        assert_eq!(cfg.cache.max_size, 1000);
        assert_eq!(cfg.balance.hibernation, 0.5);
        assert_eq!(cfg.decision.min_decision_interval_secs, 60);
    }
}
