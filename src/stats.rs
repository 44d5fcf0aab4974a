use serde::{Deserialize, Serialize};

/// Running mean and variance (Welford's algorithm).
pub struct Accumulator {
    n_vals: usize,
    mean: f64,
    diff_2_sum: f64,
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct AccumulatorReport {
    pub n_vals: usize,
    pub mean: f64,
    pub std_dev: f64,
}

impl Accumulator {
    pub fn new() -> Self {
        Self {
            n_vals: 0,
            mean: 0.0,
            diff_2_sum: 0.0,
        }
    }

    pub fn add(&mut self, val: f64) {
        self.n_vals += 1;

        let diff_a = val - self.mean;
        self.mean += diff_a / self.n_vals as f64;

        let diff_b = val - self.mean;
        self.diff_2_sum += diff_a * diff_b;
    }

    pub fn report(&self) -> AccumulatorReport {
        AccumulatorReport {
            n_vals: self.n_vals,
            mean: if self.n_vals > 0 { self.mean } else { f64::NAN },
            std_dev: if self.n_vals > 1 {
                (self.diff_2_sum / (self.n_vals as f64 - 1.0)).sqrt()
            } else {
                f64::NAN
            },
        }
    }
}

impl FromIterator<f64> for Accumulator {
    fn from_iter<I: IntoIterator<Item = f64>>(iter: I) -> Self {
        let mut acc = Accumulator::new();
        iter.into_iter().for_each(|val| acc.add(val));
        acc
    }
}

pub fn compute_mean(vals: &[f64]) -> f64 {
    if vals.is_empty() {
        return f64::NAN;
    }
    vals.iter().sum::<f64>() / vals.len() as f64
}

/// Median of already sorted values.
pub fn compute_median(sorted: &[f64]) -> f64 {
    let n_vals = sorted.len();
    if n_vals == 0 {
        return f64::NAN;
    }
    if n_vals % 2 == 1 {
        sorted[n_vals / 2]
    } else {
        (sorted[n_vals / 2 - 1] + sorted[n_vals / 2]) / 2.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accumulator_matches_direct_formulas() {
        let vals = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        let report = vals.iter().copied().collect::<Accumulator>().report();
        assert_eq!(report.n_vals, 8);
        assert!((report.mean - 5.0).abs() < 1e-12);
        assert!((report.std_dev - (32.0f64 / 7.0).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn small_samples_are_nan() {
        let empty = Accumulator::new().report();
        assert!(empty.mean.is_nan());
        assert!(empty.std_dev.is_nan());

        let single = [3.0].into_iter().collect::<Accumulator>().report();
        assert_eq!(single.mean, 3.0);
        assert!(single.std_dev.is_nan());
    }

    #[test]
    fn median_of_odd_and_even_lengths() {
        assert_eq!(compute_median(&[1.0, 2.0, 10.0]), 2.0);
        assert_eq!(compute_median(&[1.0, 2.0, 3.0, 10.0]), 2.5);
        assert!(compute_median(&[]).is_nan());
        assert!(compute_mean(&[]).is_nan());
        assert_eq!(compute_mean(&[1.0, 2.0]), 1.5);
    }
}
