//! Exactly-rounded Summation
//!
//! Keeps the running total as a list of non-overlapping partials (Shewchuk),
//! so the rounded result does not depend on the order terms were added in.

#[derive(Debug, Clone, Default)]
pub struct ExactSum {
    partials: Vec<f64>,
}

impl ExactSum {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a finite term.
    pub fn add(&mut self, mut x: f64) {
        let mut kept = 0;
        for j in 0..self.partials.len() {
            let mut y = self.partials[j];
            if x.abs() < y.abs() {
                std::mem::swap(&mut x, &mut y);
            }
            let hi = x + y;
            let lo = y - (hi - x);
            if lo != 0.0 {
                self.partials[kept] = lo;
                kept += 1;
            }
            x = hi;
        }
        self.partials.truncate(kept);
        self.partials.push(x);
    }

    /// Correctly rounded value of the sum.
    pub fn value(&self) -> f64 {
        let mut n = self.partials.len();
        if n == 0 {
            return 0.0;
        }
        n -= 1;
        let mut hi = self.partials[n];
        let mut lo = 0.0;
        while n > 0 {
            let x = hi;
            n -= 1;
            let y = self.partials[n];
            hi = x + y;
            let yr = hi - x;
            lo = y - yr;
            if lo != 0.0 {
                break;
            }
        }
        // half-way case: the remaining partials decide the rounding direction
        if n > 0 && ((lo < 0.0 && self.partials[n - 1] < 0.0) || (lo > 0.0 && self.partials[n - 1] > 0.0)) {
            let y = lo * 2.0;
            let x = hi + y;
            if y == x - hi {
                hi = x;
            }
        }
        hi
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sum_of(terms: &[f64]) -> f64 {
        let mut sum = ExactSum::new();
        for &t in terms {
            sum.add(t);
        }
        sum.value()
    }

    #[test]
    fn test_empty_sum_is_zero() {
        assert_eq!(ExactSum::new().value(), 0.0);
    }

    #[test]
    fn test_recovers_cancelled_terms() {
        assert_eq!(sum_of(&[1e100, 1.0, -1e100]), 1.0);
    }

    #[test]
    fn test_tenths_sum_exactly() {
        let terms = vec![0.1; 10];
        assert_eq!(sum_of(&terms), 1.0);
    }

    #[test]
    fn test_order_independent() {
        let terms = [0.6 * 0.01, 0.4 * 0.02, 1e-17, 3.3e-3, 0.1, 0.2, 0.3];
        let forward = sum_of(&terms);
        let mut reversed = terms;
        reversed.reverse();
        assert_eq!(forward.to_bits(), sum_of(&reversed).to_bits());

        let shuffled = [terms[3], terms[6], terms[0], terms[5], terms[2], terms[4], terms[1]];
        assert_eq!(forward.to_bits(), sum_of(&shuffled).to_bits());
    }
}
