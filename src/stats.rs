use serde::{Deserialize, Serialize};

/// Running mean and variance (Welford's algorithm).
#[derive(Debug, Default, Clone)]
pub struct Accumulator {
    n_vals: usize,
    mean: f64,
    diff_2_sum: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccumulatorReport {
    pub n_vals: usize,
    pub mean: f64,
    pub std_dev: f64,
}

impl Accumulator {
    pub fn new() -> Self {
        Self::default()
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

/// Timing samples of one variant, in nanoseconds.
#[derive(Debug, Default, Clone)]
pub struct Samples {
    vals: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SamplesReport {
    pub n_vals: usize,
    pub mean: f64,
    pub std_dev: f64,
    pub sem: f64,
    pub min: f64,
    pub median: f64,
}

impl Samples {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, val: f64) {
        self.vals.push(val);
    }

    pub fn len(&self) -> usize {
        self.vals.len()
    }

    pub fn report(&self) -> SamplesReport {
        SamplesReport {
            n_vals: self.vals.len(),
            mean: compute_mean(&self.vals),
            std_dev: compute_var(&self.vals).sqrt(),
            sem: compute_blocked_sem(&self.vals),
            min: self.vals.iter().copied().fold(f64::NAN, f64::min),
            median: compute_median(&self.vals),
        }
    }
}

fn compute_mean(vals: &[f64]) -> f64 {
    if vals.is_empty() {
        return f64::NAN;
    }
    vals.iter().sum::<f64>() / vals.len() as f64
}

fn compute_var(vals: &[f64]) -> f64 {
    let n_vals = vals.len();
    if n_vals < 2 {
        return f64::NAN;
    }
    let mean = compute_mean(vals);
    vals.iter().map(|&val| (val - mean).powi(2)).sum::<f64>() / (n_vals - 1) as f64
}

fn compute_median(vals: &[f64]) -> f64 {
    if vals.is_empty() {
        return f64::NAN;
    }
    let mut sorted = vals.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// Standard error of the mean, corrected for serial correlation by blocking.
///
/// Consecutive samples are averaged pairwise until fewer than
/// `MIN_BLOCKS` blocks remain; the largest estimate over all levels is
/// returned.
fn compute_blocked_sem(vals: &[f64]) -> f64 {
    const MIN_BLOCKS: usize = 4;

    let mut blocks = vals.to_vec();
    let mut sem = compute_var(&blocks).sqrt() / (blocks.len() as f64).sqrt();

    while blocks.len() / 2 >= MIN_BLOCKS {
        blocks = blocks
            .chunks_exact(2)
            .map(|pair| (pair[0] + pair[1]) / 2.0)
            .collect();
        let level_sem = compute_var(&blocks).sqrt() / (blocks.len() as f64).sqrt();
        sem = sem.max(level_sem);
    }

    sem
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-9, "{a} != {b}");
    }

    #[test]
    fn accumulator_matches_two_pass() {
        let vals = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        let mut acc = Accumulator::new();
        vals.iter().for_each(|&val| acc.add(val));
        let report = acc.report();
        assert_eq!(report.n_vals, 8);
        assert_close(report.mean, compute_mean(&vals));
        assert_close(report.std_dev, compute_var(&vals).sqrt());
    }

    #[test]
    fn empty_accumulator_is_nan() {
        let report = Accumulator::new().report();
        assert!(report.mean.is_nan());
        assert!(report.std_dev.is_nan());
    }

    #[test]
    fn samples_report() {
        let mut samples = Samples::new();
        for val in [5.0, 1.0, 3.0, 2.0, 4.0, 6.0] {
            samples.push(val);
        }
        let report = samples.report();
        assert_eq!(report.n_vals, 6);
        assert_close(report.mean, 3.5);
        assert_close(report.min, 1.0);
        assert_close(report.median, 3.5);
        assert!(report.sem > 0.0);
    }

    #[test]
    fn single_sample_has_no_spread() {
        let mut samples = Samples::new();
        samples.push(10.0);
        let report = samples.report();
        assert_close(report.mean, 10.0);
        assert_close(report.median, 10.0);
        assert!(report.std_dev.is_nan());
        assert!(report.sem.is_nan());
    }

    #[test]
    fn blocking_never_lowers_the_naive_sem() {
        let vals: Vec<f64> = (0..64).map(|i| (i / 8) as f64).collect();
        let naive = compute_var(&vals).sqrt() / (vals.len() as f64).sqrt();
        assert!(compute_blocked_sem(&vals) >= naive);
    }
}
