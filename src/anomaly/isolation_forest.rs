//! Isolation Forest anomaly detection
//!
//! Anomalies are easier to isolate: random axis-aligned splits separate them
//! from the rest of the data in fewer steps, so their average path length
//! over many random trees is short.

use super::AnomalyReport;
use crate::error::{Error, Result};
use crate::random::RandomSource;
use crate::stats::{percentile, validate_matrix};
use ndarray::{Array1, Array2, ArrayView1};
use serde::{Deserialize, Serialize};

/// Euler–Mascheroni constant
const EULER_GAMMA: f64 = 0.5772156649;

/// Expected path length of an unsuccessful search in a BST of `n` nodes.
///
/// Used both as the leaf correction and as the score normalizer.
pub fn average_path_length(n: usize) -> f64 {
    if n <= 1 {
        return 0.0;
    }
    let n = n as f64;
    2.0 * ((n - 1.0).ln() + EULER_GAMMA) - 2.0 * (n - 1.0) / n
}

/// Isolation Forest parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IsolationForestConfig {
    /// Number of trees in the forest
    pub n_trees: usize,
    /// Maximum subsample size per tree
    pub max_samples: usize,
    /// Expected proportion of anomalies, in `[0.01, 0.2]`
    pub contamination: f64,
    /// Random seed
    pub seed: u64,
}

impl Default for IsolationForestConfig {
    fn default() -> Self {
        Self {
            n_trees: 100,
            max_samples: 256,
            contamination: 0.05,
            seed: 42,
        }
    }
}

impl IsolationForestConfig {
    pub const CONTAMINATION_RANGE: (f64, f64) = (0.01, 0.2);

    pub fn validate(&self) -> Result<()> {
        let (lo, hi) = Self::CONTAMINATION_RANGE;
        if !(lo..=hi).contains(&self.contamination) {
            return Err(Error::config(format!(
                "contamination must be in [{lo}, {hi}], got {}",
                self.contamination
            )));
        }
        if self.n_trees == 0 {
            return Err(Error::config("n_trees must be at least 1"));
        }
        if self.max_samples < 2 {
            return Err(Error::config("max_samples must be at least 2"));
        }
        Ok(())
    }

    pub fn with_n_trees(mut self, n_trees: usize) -> Self {
        self.n_trees = n_trees;
        self
    }

    pub fn with_max_samples(mut self, max_samples: usize) -> Self {
        self.max_samples = max_samples;
        self
    }

    pub fn with_contamination(mut self, contamination: f64) -> Self {
        self.contamination = contamination;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

/// A node in an isolation tree
#[derive(Debug, Clone)]
enum IsolationNode {
    Internal {
        feature: usize,
        split: f64,
        left: Box<IsolationNode>,
        right: Box<IsolationNode>,
    },
    /// Residual sample count that was not separated further
    Leaf { size: usize },
}

/// Single isolation tree over a subsample
#[derive(Debug, Clone)]
struct IsolationTree {
    root: IsolationNode,
}

impl IsolationTree {
    fn build(data: &Array2<f64>, indices: &[usize], max_depth: usize, rng: &mut RandomSource) -> Self {
        Self {
            root: Self::build_node(data, indices, 0, max_depth, rng),
        }
    }

    fn build_node(
        data: &Array2<f64>,
        indices: &[usize],
        depth: usize,
        max_depth: usize,
        rng: &mut RandomSource,
    ) -> IsolationNode {
        let size = indices.len();
        if size <= 1 || depth >= max_depth {
            return IsolationNode::Leaf { size };
        }

        let feature = rng.index(data.ncols());
        let (min_val, max_val) = indices
            .iter()
            .map(|&i| data[[i, feature]])
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
                (lo.min(v), hi.max(v))
            });

        // Degenerate feature in this node
        if min_val == max_val {
            return IsolationNode::Leaf { size };
        }

        let split = rng.uniform_range(min_val, max_val);
        let (left, right): (Vec<usize>, Vec<usize>) =
            indices.iter().partition(|&&i| data[[i, feature]] < split);

        if left.is_empty() || right.is_empty() {
            return IsolationNode::Leaf { size };
        }

        IsolationNode::Internal {
            feature,
            split,
            left: Box::new(Self::build_node(data, &left, depth + 1, max_depth, rng)),
            right: Box::new(Self::build_node(data, &right, depth + 1, max_depth, rng)),
        }
    }

    /// Depth of the leaf reached by `sample` plus the leaf correction
    fn path_length(&self, sample: ArrayView1<f64>) -> f64 {
        let mut node = &self.root;
        let mut depth = 0usize;
        loop {
            match node {
                IsolationNode::Leaf { size } => {
                    return depth as f64 + average_path_length(*size);
                }
                IsolationNode::Internal {
                    feature,
                    split,
                    left,
                    right,
                } => {
                    node = if sample[*feature] < *split { left.as_ref() } else { right.as_ref() };
                    depth += 1;
                }
            }
        }
    }
}

/// Fitted Isolation Forest
#[derive(Debug, Clone)]
pub struct IsolationForest {
    config: IsolationForestConfig,
    trees: Vec<IsolationTree>,
    /// Effective subsample size, `min(max_samples, n_rows)`
    sample_size: usize,
    n_features: usize,
    threshold: f64,
}

impl IsolationForest {
    /// Fit a forest seeded from `config.seed`
    pub fn fit(data: &Array2<f64>, config: &IsolationForestConfig) -> Result<Self> {
        let mut rng = RandomSource::new(config.seed);
        Self::fit_with_rng(data, config, &mut rng)
    }

    /// Fit a forest drawing randomness from `rng`
    pub fn fit_with_rng(
        data: &Array2<f64>,
        config: &IsolationForestConfig,
        rng: &mut RandomSource,
    ) -> Result<Self> {
        config.validate()?;
        validate_matrix(data, "isolation forest", 2)?;

        let n_rows = data.nrows();
        let sample_size = config.max_samples.min(n_rows);
        let max_depth = (sample_size as f64).log2().ceil() as usize;

        let trees = (0..config.n_trees)
            .map(|_| {
                let indices = rng.sample_without_replacement(n_rows, sample_size);
                IsolationTree::build(data, &indices, max_depth, rng)
            })
            .collect();

        let mut forest = Self {
            config: config.clone(),
            trees,
            sample_size,
            n_features: data.ncols(),
            threshold: 0.0,
        };

        let scores = forest.score(data)?;
        forest.threshold = percentile(&scores.to_vec(), (1.0 - config.contamination) * 100.0);

        tracing::info!(
            n_trees = config.n_trees,
            sample_size,
            max_depth,
            threshold = forest.threshold,
            "isolation forest fitted"
        );

        Ok(forest)
    }

    /// Score threshold fixed at fit time
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn config(&self) -> &IsolationForestConfig {
        &self.config
    }

    /// Effective subsample size used per tree
    pub fn sample_size(&self) -> usize {
        self.sample_size
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Average path length of each row across all trees
    pub fn path_lengths(&self, data: &Array2<f64>) -> Result<Array1<f64>> {
        self.check_input(data)?;
        let n_trees = self.trees.len() as f64;
        Ok(Array1::from_iter(data.rows().into_iter().map(|row| {
            self.trees
                .iter()
                .map(|tree| tree.path_length(row))
                .sum::<f64>()
                / n_trees
        })))
    }

    /// Anomaly score `2^(-E[h(x)] / c(sample_size))` per row, in `[0, 1]`
    pub fn score(&self, data: &Array2<f64>) -> Result<Array1<f64>> {
        let c = average_path_length(self.sample_size);
        let paths = self.path_lengths(data)?;
        Ok(if c > 0.0 {
            paths.mapv(|h| 2.0_f64.powf(-h / c))
        } else {
            paths.mapv(|_| 0.5)
        })
    }

    /// `true` where the score exceeds the fitted threshold
    pub fn predict(&self, data: &Array2<f64>) -> Result<Vec<bool>> {
        Ok(self
            .score(data)?
            .iter()
            .map(|&s| s > self.threshold)
            .collect())
    }

    /// Scores, flags and summary statistics in one pass
    pub fn detect(&self, data: &Array2<f64>) -> Result<AnomalyReport> {
        let scores = self.score(data)?.to_vec();
        Ok(AnomalyReport::new(scores, self.threshold))
    }

    fn check_input(&self, data: &Array2<f64>) -> Result<()> {
        if data.ncols() != self.n_features {
            return Err(Error::DimensionMismatch {
                expected: self.n_features,
                actual: data.ncols(),
            });
        }
        validate_matrix(data, "isolation forest scoring", 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn clustered_with_outliers(seed: u64) -> Array2<f64> {
        let mut rng = RandomSource::new(seed);
        let mut data = Array2::zeros((102, 2));
        for i in 0..100 {
            data[[i, 0]] = rng.uniform_range(-1.0, 1.0);
            data[[i, 1]] = rng.uniform_range(-1.0, 1.0);
        }
        data[[100, 0]] = 10.0;
        data[[100, 1]] = 10.0;
        data[[101, 0]] = -10.0;
        data[[101, 1]] = -10.0;
        data
    }

    #[test]
    fn test_outliers_score_higher() {
        let data = clustered_with_outliers(42);
        let config = IsolationForestConfig::default().with_n_trees(50);
        let forest = IsolationForest::fit(&data, &config).unwrap();
        let scores = forest.score(&data).unwrap();

        assert!(scores[100] > scores[0]);
        assert!(scores[101] > scores[0]);
        assert!(scores.iter().all(|&s| (0.0..=1.0).contains(&s)));
    }

    #[test]
    fn test_average_path_length() {
        assert_eq!(average_path_length(0), 0.0);
        assert_eq!(average_path_length(1), 0.0);
        assert_abs_diff_eq!(average_path_length(2), 2.0 * EULER_GAMMA - 1.0, epsilon = 1e-12);
        assert!(average_path_length(256) > average_path_length(16));
    }

    #[test]
    fn test_identical_rows_degenerate() {
        let data = Array2::from_elem((50, 3), 1.5);
        let forest = IsolationForest::fit(&data, &IsolationForestConfig::default()).unwrap();
        let scores = forest.score(&data).unwrap();

        for &s in scores.iter() {
            assert_abs_diff_eq!(s, 0.5, epsilon = 1e-12);
        }
        assert!(forest.predict(&data).unwrap().iter().all(|&f| !f));
    }

    #[test]
    fn test_rejects_bad_input() {
        let single = Array2::zeros((1, 2));
        assert!(matches!(
            IsolationForest::fit(&single, &IsolationForestConfig::default()),
            Err(Error::InsufficientData { .. })
        ));

        let data = clustered_with_outliers(1);
        let bad = IsolationForestConfig::default().with_contamination(0.5);
        assert!(matches!(
            IsolationForest::fit(&data, &bad),
            Err(Error::InvalidConfig(_))
        ));

        let forest = IsolationForest::fit(&data, &IsolationForestConfig::default()).unwrap();
        assert!(matches!(
            forest.score(&Array2::zeros((3, 5))),
            Err(Error::DimensionMismatch { expected: 2, actual: 5 })
        ));
    }

    #[test]
    fn test_small_input_uses_effective_sample_size() {
        let data = clustered_with_outliers(3);
        let forest = IsolationForest::fit(&data, &IsolationForestConfig::default()).unwrap();
        assert_eq!(forest.sample_size(), 102);
        assert_eq!(forest.n_trees(), 100);
    }
}
