//! Hedging error statistics, histograms and learning curves

use crate::stats::{linspace, mean, mean_abs, std_dev};
use serde::Serialize;

/// Summary of signed hedging errors across paths
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ErrorStats {
    pub mean_abs_error: f64,
    /// Population standard deviation
    pub std_error: f64,
    pub mean_error: f64,
}

impl ErrorStats {
    pub fn from_errors(errors: &[f64]) -> Self {
        Self {
            mean_abs_error: mean_abs(errors),
            std_error: std_dev(errors),
            mean_error: mean(errors),
        }
    }
}

/// Percentage reduction of the learned policy vs the delta baseline
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Improvement {
    pub mae_reduction: f64,
    pub std_reduction: f64,
}

impl Improvement {
    pub fn between(baseline: &ErrorStats, candidate: &ErrorStats) -> Self {
        let reduction = |base: f64, new: f64| {
            if base > 0.0 {
                (base - new) / base * 100.0
            } else {
                0.0
            }
        };
        Self {
            mae_reduction: reduction(baseline.mean_abs_error, candidate.mean_abs_error),
            std_reduction: reduction(baseline.std_error, candidate.std_error),
        }
    }
}

/// Shared-bin histogram of both error sets
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorHistogram {
    /// `n_bins + 1` edges spanning the pooled min and max
    pub bins: Vec<f64>,
    pub rl_counts: Vec<usize>,
    pub bs_counts: Vec<usize>,
}

impl ErrorHistogram {
    pub const N_BINS: usize = 20;

    pub fn new(rl_errors: &[f64], bs_errors: &[f64]) -> Self {
        let pooled = rl_errors.iter().chain(bs_errors);
        let min = pooled.clone().copied().fold(f64::INFINITY, f64::min);
        let max = pooled.copied().fold(f64::NEG_INFINITY, f64::max);

        if !min.is_finite() || !max.is_finite() {
            return Self {
                bins: Vec::new(),
                rl_counts: Vec::new(),
                bs_counts: Vec::new(),
            };
        }

        let bins = linspace(min, max, Self::N_BINS + 1);
        Self {
            rl_counts: histogram(rl_errors, &bins),
            bs_counts: histogram(bs_errors, &bins),
            bins,
        }
    }
}

/// Counts per bin over sorted `edges`. Bins are half-open except the last,
/// which includes its right edge.
pub fn histogram(values: &[f64], edges: &[f64]) -> Vec<usize> {
    let n_bins = edges.len().saturating_sub(1);
    let mut counts = vec![0; n_bins];
    if n_bins == 0 {
        return counts;
    }
    let (first, last) = (edges[0], edges[n_bins]);

    for &v in values {
        if v < first || v > last {
            continue;
        }
        let bin = if v == last {
            n_bins - 1
        } else {
            // last edge strictly greater than v
            edges.partition_point(|&e| e <= v).saturating_sub(1).min(n_bins - 1)
        };
        counts[bin] += 1;
    }
    counts
}

/// Windowed mean of per-episode errors
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LearningCurve {
    /// Episode index at the start of each window
    pub episodes: Vec<usize>,
    pub errors: Vec<f64>,
}

/// Average `errors` over windows of `max(1, len / n_buckets)` episodes
pub fn learning_curve(errors: &[f64], n_buckets: usize) -> LearningCurve {
    let window = (errors.len() / n_buckets.max(1)).max(1);
    LearningCurve {
        episodes: (0..errors.len()).step_by(window).collect(),
        errors: errors.chunks(window).map(mean).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_error_stats() {
        let stats = ErrorStats::from_errors(&[1.0, -1.0, 3.0, -3.0]);
        assert_abs_diff_eq!(stats.mean_abs_error, 2.0);
        assert_abs_diff_eq!(stats.mean_error, 0.0);
        assert_abs_diff_eq!(stats.std_error, 5.0_f64.sqrt());
    }

    #[test]
    fn test_improvement() {
        let base = ErrorStats::from_errors(&[2.0, -2.0]);
        let better = ErrorStats::from_errors(&[1.0, -1.0]);
        let imp = Improvement::between(&base, &better);
        assert_abs_diff_eq!(imp.mae_reduction, 50.0);
        assert_abs_diff_eq!(imp.std_reduction, 50.0);

        let zero = ErrorStats::from_errors(&[0.0]);
        assert_eq!(Improvement::between(&zero, &better).mae_reduction, 0.0);
    }

    #[test]
    fn test_histogram_edges() {
        let edges = [0.0, 1.0, 2.0];
        assert_eq!(histogram(&[0.0, 0.5, 1.0, 2.0, 2.5, -1.0], &edges), vec![2, 2]);
    }

    #[test]
    fn test_error_histogram_counts_everything() {
        let rl = [0.1, 0.5, 0.9, 1.3];
        let bs = [0.2, 1.5];
        let hist = ErrorHistogram::new(&rl, &bs);
        assert_eq!(hist.bins.len(), 21);
        assert_eq!(hist.rl_counts.iter().sum::<usize>(), 4);
        assert_eq!(hist.bs_counts.iter().sum::<usize>(), 2);
        assert_eq!(hist.bs_counts[19], 1);
    }

    #[test]
    fn test_constant_errors_land_in_last_bin() {
        let hist = ErrorHistogram::new(&[1.0, 1.0], &[1.0]);
        assert_eq!(hist.rl_counts[19], 2);
        assert_eq!(hist.bs_counts[19], 1);
    }

    #[test]
    fn test_learning_curve() {
        let errors: Vec<f64> = (0..45).map(|i| i as f64).collect();
        let curve = learning_curve(&errors, 20);
        // window of 2 -> 23 points, last one partial
        assert_eq!(curve.errors.len(), 23);
        assert_eq!(curve.episodes[1], 2);
        assert_abs_diff_eq!(curve.errors[0], 0.5);
        assert_abs_diff_eq!(curve.errors[22], 44.0);
    }
}
