//! The adaptive-rate controller: turns population statistics and
//! environmental stress into per-operator mutation rates (spec §4.7).

/// Population-level inputs the controller reacts to.
#[derive(Debug, Clone)]
pub struct PopulationMetrics {
    pub average_fitness: f64,
    pub fitness_variance: f64,
    /// `[0,1]`: pairwise normalised Hamming distance over genome hashes,
    /// or expression-vector variance — see [`genetic_diversity`].
    pub genetic_diversity: f64,
    pub generation: u32,
    /// Newest last. Only the last 5 entries participate in the
    /// stagnation check.
    pub fitness_history: Vec<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdaptiveRates {
    pub base: f64,
    pub duplication: f64,
    pub structural: f64,
    pub hgt: f64,
}

const DIVERSITY_THRESHOLD: f64 = 0.5;
const STAGNATION_CV_THRESHOLD: f64 = 0.05;
const STAGNATION_SLOPE_THRESHOLD: f64 = 0.01;
const BASE_RATE_FLOOR: f64 = 0.005;
const BASE_RATE_CEILING: f64 = 0.30;

/// The un-modulated base rate the controller starts from before diversity,
/// stagnation, and stress raise it. Chosen to match the contractual
/// `pointMutationRate` default (spec §6) since the controller is explicitly
/// described as modulating "mutation strength" starting from the published
/// rate, not from zero.
const SEED_BASE_RATE: f64 = 0.05;

/// Pairwise normalised Hamming distance over a set of genome hashes: for
/// every pair, the fraction of differing bytes, averaged across all pairs.
/// `0.0` for fewer than two genomes (no pairs to compare).
pub fn genetic_diversity(hashes: &[[u8; 32]]) -> f64 {
    if hashes.len() < 2 {
        return 0.0;
    }
    let mut total = 0.0;
    let mut pairs = 0usize;
    for i in 0..hashes.len() {
        for j in (i + 1)..hashes.len() {
            let differing = hashes[i].iter().zip(hashes[j].iter()).filter(|(a, b)| a != b).count();
            total += differing as f64 / hashes[i].len() as f64;
            pairs += 1;
        }
    }
    total / pairs as f64
}

fn coefficient_of_variation(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    if mean.abs() < 1e-12 {
        return 0.0;
    }
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt() / mean.abs()
}

/// Ordinary-least-squares slope of `values` against their index.
fn ols_slope(values: &[f64]) -> f64 {
    let n = values.len() as f64;
    if n < 2.0 {
        return 0.0;
    }
    let xs: Vec<f64> = (0..values.len()).map(|i| i as f64).collect();
    let x_mean = xs.iter().sum::<f64>() / n;
    let y_mean = values.iter().sum::<f64>() / n;
    let mut numerator = 0.0;
    let mut denominator = 0.0;
    for (x, y) in xs.iter().zip(values.iter()) {
        numerator += (x - x_mean) * (y - y_mean);
        denominator += (x - x_mean).powi(2);
    }
    if denominator.abs() < 1e-12 {
        0.0
    } else {
        numerator / denominator
    }
}

/// `true` when both the coefficient of variation and the OLS slope over the
/// last 5 fitness values fall under their thresholds, plus how deep into
/// stagnation the population is (`0.0` not stagnant, `1.0` maximally flat).
fn stagnation(history: &[f64]) -> (bool, f64) {
    let window = &history[history.len().saturating_sub(5)..];
    if window.len() < 5 {
        return (false, 0.0);
    }
    let cv = coefficient_of_variation(window);
    let slope = ols_slope(window);
    let flagged = cv < STAGNATION_CV_THRESHOLD && slope.abs() < STAGNATION_SLOPE_THRESHOLD;
    if !flagged {
        return (false, 0.0);
    }
    let cv_factor = (1.0 - cv / STAGNATION_CV_THRESHOLD).clamp(0.0, 1.0);
    let slope_factor = (1.0 - slope.abs() / STAGNATION_SLOPE_THRESHOLD).clamp(0.0, 1.0);
    (true, (cv_factor + slope_factor) / 2.0)
}

/// Combine diversity, stagnation, and environmental stress into a base
/// mutation rate, then derive duplication/structural/HGT rates as fixed
/// multiples of it (spec §4.7).
pub fn calculate_adaptive_rates(metrics: &PopulationMetrics, environmental_stress: f64) -> AdaptiveRates {
    let mut rate = SEED_BASE_RATE;

    if metrics.genetic_diversity < DIVERSITY_THRESHOLD {
        rate += 4.0 * (DIVERSITY_THRESHOLD - metrics.genetic_diversity);
    }

    let (is_stagnant, stagnation_factor) = stagnation(&metrics.fitness_history);
    if is_stagnant {
        rate *= 1.0 + 2.0 * stagnation_factor;
    }

    if environmental_stress > 0.5 {
        rate *= 1.0 + (environmental_stress - 0.5) * 3.0;
    }

    let base = rate.clamp(BASE_RATE_FLOOR, BASE_RATE_CEILING);
    AdaptiveRates { base, duplication: base * 1.5, structural: base * 0.3, hgt: base * 0.5 }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat_metrics(diversity: f64, history: Vec<f64>) -> PopulationMetrics {
        PopulationMetrics {
            average_fitness: history.last().copied().unwrap_or(0.0),
            fitness_variance: 0.0,
            genetic_diversity: diversity,
            generation: 10,
            fitness_history: history,
        }
    }

    #[test]
    fn rates_clamp_to_contractual_bounds() {
        let metrics = flat_metrics(0.0, vec![0.1, 0.1, 0.1, 0.1, 0.1]);
        let rates = calculate_adaptive_rates(&metrics, 1.0);
        assert!(rates.base >= 0.005 && rates.base <= 0.30);
    }

    #[test]
    fn low_diversity_raises_base_rate() {
        let high_diversity = flat_metrics(0.9, vec![0.5, 0.4, 0.6, 0.5, 0.55]);
        let low_diversity = flat_metrics(0.1, vec![0.5, 0.4, 0.6, 0.5, 0.55]);
        let r_high = calculate_adaptive_rates(&high_diversity, 0.0);
        let r_low = calculate_adaptive_rates(&low_diversity, 0.0);
        assert!(r_low.base > r_high.base);
    }

    #[test]
    fn stagnant_history_raises_base_rate_over_volatile_one() {
        let stagnant = flat_metrics(0.9, vec![1.0, 1.0005, 0.9998, 1.0001, 1.0002]);
        let volatile = flat_metrics(0.9, vec![0.2, 0.9, 0.3, 1.1, 0.1]);
        let r_stagnant = calculate_adaptive_rates(&stagnant, 0.0);
        let r_volatile = calculate_adaptive_rates(&volatile, 0.0);
        assert!(r_stagnant.base > r_volatile.base);
    }

    #[test]
    fn high_stress_raises_base_rate() {
        let metrics = flat_metrics(0.9, vec![0.5, 0.4, 0.6, 0.5, 0.55]);
        let calm = calculate_adaptive_rates(&metrics, 0.2);
        let stressed = calculate_adaptive_rates(&metrics, 0.9);
        assert!(stressed.base > calm.base);
    }

    #[test]
    fn derived_rates_are_fixed_multiples_of_base() {
        let metrics = flat_metrics(0.9, vec![0.5, 0.4, 0.6, 0.5, 0.55]);
        let rates = calculate_adaptive_rates(&metrics, 0.0);
        assert!((rates.duplication - rates.base * 1.5).abs() < 1e-12);
        assert!((rates.structural - rates.base * 0.3).abs() < 1e-12);
        assert!((rates.hgt - rates.base * 0.5).abs() < 1e-12);
    }

    #[test]
    fn diversity_of_identical_hashes_is_zero() {
        let hashes = vec![[1u8; 32], [1u8; 32], [1u8; 32]];
        assert_eq!(genetic_diversity(&hashes), 0.0);
    }

    #[test]
    fn diversity_of_fully_distinct_hashes_is_one() {
        let hashes = vec![[0u8; 32], [0xFFu8; 32]];
        assert_eq!(genetic_diversity(&hashes), 1.0);
    }

    #[test]
    fn diversity_needs_at_least_two_genomes() {
        assert_eq!(genetic_diversity(&[[1u8; 32]]), 0.0);
        assert_eq!(genetic_diversity(&[]), 0.0);
    }
}
