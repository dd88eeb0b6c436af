//! Weighted Property Averaging
//!
//! Online weighted mean of one scalar rupture field. Averages are always taken
//! against the full ensemble weight: a rupture missing from a realization
//! contributes zero there.

use super::sum::ExactSum;

#[derive(Debug, Clone)]
pub struct PropertyAccumulator {
    sum_weight: ExactSum,
    weighted_sum: ExactSum,
    first: Option<f64>,
    all_same: bool,
}

impl Default for PropertyAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

impl PropertyAccumulator {
    pub fn new() -> Self {
        Self {
            sum_weight: ExactSum::new(),
            weighted_sum: ExactSum::new(),
            first: None,
            all_same: true,
        }
    }

    pub fn add(&mut self, value: f64, weight: f64) {
        match self.first {
            None => self.first = Some(value),
            Some(first) if first.to_bits() != value.to_bits() => self.all_same = false,
            Some(_) => {}
        }
        self.sum_weight.add(weight);
        self.weighted_sum.add(value * weight);
    }

    /// True when at least one value was added and all were bit-identical.
    pub fn is_constant(&self) -> bool {
        self.first.is_some() && self.all_same
    }

    pub fn first_value(&self) -> Option<f64> {
        self.first
    }

    pub fn sum_weight(&self) -> f64 {
        self.sum_weight.value()
    }

    /// Weighted average normalized by `total_weight`, the weight of the whole
    /// ensemble. Constant values skip the division when this rupture was seen
    /// under the full ensemble weight (within `tolerance`, relative).
    pub fn average(&self, total_weight: f64, tolerance: f64) -> f64 {
        debug_assert!(total_weight > 0.0, "ensemble weight must be positive");
        let Some(first) = self.first else {
            return 0.0;
        };
        if self.all_same {
            let sum_weight = self.sum_weight.value();
            if weights_match(sum_weight, total_weight, tolerance) {
                first
            } else {
                first * sum_weight / total_weight
            }
        } else {
            self.weighted_sum.value() / total_weight
        }
    }
}

/// Relative comparison of two weight totals.
pub fn weights_match(a: f64, b: f64, tolerance: f64) -> bool {
    (a - b).abs() <= tolerance * a.abs().max(b.abs())
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOL: f64 = f32::EPSILON as f64;

    #[test]
    fn test_constant_value_under_full_weight_is_exact() {
        let mut acc = PropertyAccumulator::new();
        for _ in 0..3 {
            acc.add(0.1, 1.0 / 3.0);
        }
        assert!(acc.is_constant());
        assert_eq!(acc.average(1.0, TOL), 0.1);
    }

    #[test]
    fn test_constant_value_partial_presence_is_scaled() {
        let mut acc = PropertyAccumulator::new();
        acc.add(0.02, 0.5);
        assert_eq!(acc.average(1.0, TOL), 0.01);
    }

    #[test]
    fn test_differing_values_weighted_mean() {
        let mut acc = PropertyAccumulator::new();
        acc.add(12.0, 0.6);
        acc.add(10.0, 0.4);
        assert!(!acc.is_constant());
        assert!((acc.average(1.0, TOL) - 11.2).abs() < 1e-12);
    }

    #[test]
    fn test_differing_values_normalized_by_ensemble_not_local_weight() {
        let mut acc = PropertyAccumulator::new();
        acc.add(1.0, 0.25);
        acc.add(3.0, 0.25);
        // seen under half the ensemble weight
        assert_eq!(acc.average(1.0, TOL), 1.0);
    }

    #[test]
    fn test_signed_zero_breaks_constancy() {
        let mut acc = PropertyAccumulator::new();
        acc.add(0.0, 1.0);
        acc.add(-0.0, 1.0);
        assert!(!acc.is_constant());
    }

    #[test]
    fn test_weights_match_is_relative() {
        assert!(weights_match(1.0, 1.0 + 1e-9, TOL));
        assert!(!weights_match(1.0, 1.0 + 1e-3, TOL));
        assert!(weights_match(1e-9, 1e-9 * (1.0 + 1e-9), TOL));
        assert!(!weights_match(0.5, 1.0, TOL));
    }
}
