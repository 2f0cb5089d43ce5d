//! K-means clustering with k-means++ seeding

use crate::error::{Error, Result};
use crate::random::RandomSource;
use crate::stats::{squared_euclidean, validate_matrix};
use ndarray::{Array1, Array2, ArrayView1, Axis};
use serde::{Deserialize, Serialize};

/// K-means parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KMeansConfig {
    /// Number of clusters
    pub k: usize,
    /// Lloyd iteration cap
    pub max_iterations: usize,
    /// Stop when the summed squared centroid shift falls below this
    pub tolerance: f64,
    /// Random seed for k-means++
    pub seed: u64,
}

impl Default for KMeansConfig {
    fn default() -> Self {
        Self {
            k: 4,
            max_iterations: 100,
            tolerance: 1e-4,
            seed: 42,
        }
    }
}

impl KMeansConfig {
    pub fn with_k(mut self, k: usize) -> Self {
        self.k = k;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.k == 0 {
            return Err(Error::config("k must be at least 1"));
        }
        if self.max_iterations == 0 {
            return Err(Error::config("max_iterations must be at least 1"));
        }
        if !(self.tolerance >= 0.0) {
            return Err(Error::config("tolerance must be non-negative"));
        }
        Ok(())
    }
}

/// Result of a k-means run
#[derive(Debug, Clone, Serialize)]
pub struct KMeansFit {
    /// Cluster index per row, consistent with `centroids`
    pub labels: Vec<usize>,
    /// One centroid per row (k x d)
    pub centroids: Array2<f64>,
    /// Sum of squared distances to the assigned centroids
    pub inertia: f64,
    /// Lloyd iterations performed
    pub iterations: usize,
    pub converged: bool,
    /// Inertia after every assignment step, ending with the final one
    pub inertia_history: Vec<f64>,
}

impl KMeansFit {
    pub fn k(&self) -> usize {
        self.centroids.nrows()
    }

    /// Assign new rows to the nearest fitted centroid
    pub fn predict(&self, data: &Array2<f64>) -> Result<Vec<usize>> {
        if data.ncols() != self.centroids.ncols() {
            return Err(Error::DimensionMismatch {
                expected: self.centroids.ncols(),
                actual: data.ncols(),
            });
        }
        Ok(assign(data, &self.centroids))
    }

    /// Row count per cluster
    pub fn cluster_sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0; self.k()];
        for &label in &self.labels {
            sizes[label] += 1;
        }
        sizes
    }
}

/// K-means clustering (Lloyd's algorithm)
pub struct KMeans;

impl KMeans {
    /// Cluster rows of `data`, seeded from `config.seed`
    pub fn fit(data: &Array2<f64>, config: &KMeansConfig) -> Result<KMeansFit> {
        let mut rng = RandomSource::new(config.seed);
        Self::fit_with_rng(data, config, &mut rng)
    }

    pub fn fit_with_rng(
        data: &Array2<f64>,
        config: &KMeansConfig,
        rng: &mut RandomSource,
    ) -> Result<KMeansFit> {
        config.validate()?;
        validate_matrix(data, "k-means", config.k)?;

        let mut centroids = kmeans_plus_plus(data, config.k, rng);
        let mut inertia_history = Vec::new();
        let mut iterations = 0;
        let mut converged = false;

        for iter in 0..config.max_iterations {
            let labels = assign(data, &centroids);
            inertia_history.push(inertia(data, &labels, &centroids));

            let updated = update_centroids(data, &labels, &centroids);
            let shift: f64 = (&updated - &centroids).mapv(|d| d * d).sum();
            centroids = updated;
            iterations = iter + 1;

            tracing::debug!(iteration = iterations, shift, "lloyd step");

            if shift < config.tolerance {
                converged = true;
                break;
            }
        }

        let labels = assign(data, &centroids);
        let inertia = inertia(data, &labels, &centroids);
        inertia_history.push(inertia);

        tracing::info!(k = config.k, iterations, converged, inertia, "k-means fitted");

        Ok(KMeansFit {
            labels,
            centroids,
            inertia,
            iterations,
            converged,
            inertia_history,
        })
    }
}

/// k-means++ seeding.
///
/// The first centroid is a uniform row; each next one is drawn with
/// probability proportional to the squared distance to the nearest chosen
/// centroid. When every distance is zero the draw falls back to uniform.
pub fn kmeans_plus_plus(data: &Array2<f64>, k: usize, rng: &mut RandomSource) -> Array2<f64> {
    let n = data.nrows();
    let mut centroids = Array2::zeros((k, data.ncols()));
    centroids.row_mut(0).assign(&data.row(rng.index(n)));

    let mut nearest: Vec<f64> = data
        .rows()
        .into_iter()
        .map(|row| squared_euclidean(row, centroids.row(0)))
        .collect();

    for c in 1..k {
        let next = rng.weighted_index(&nearest).unwrap_or_else(|| rng.index(n));
        centroids.row_mut(c).assign(&data.row(next));

        for (dist, row) in nearest.iter_mut().zip(data.rows()) {
            *dist = dist.min(squared_euclidean(row, centroids.row(c)));
        }
    }

    centroids
}

/// Index of the nearest centroid for every row (first on ties)
fn assign(data: &Array2<f64>, centroids: &Array2<f64>) -> Vec<usize> {
    data.rows()
        .into_iter()
        .map(|row| nearest_centroid(row, centroids))
        .collect()
}

fn nearest_centroid(row: ArrayView1<f64>, centroids: &Array2<f64>) -> usize {
    centroids
        .rows()
        .into_iter()
        .map(|c| squared_euclidean(row, c))
        .enumerate()
        .fold((0, f64::INFINITY), |(best, best_d), (i, d)| {
            if d < best_d {
                (i, d)
            } else {
                (best, best_d)
            }
        })
        .0
}

/// Mean of the rows assigned to each cluster; empty clusters keep their
/// previous centroid.
fn update_centroids(data: &Array2<f64>, labels: &[usize], centroids: &Array2<f64>) -> Array2<f64> {
    let k = centroids.nrows();
    let mut sums = Array2::<f64>::zeros(centroids.raw_dim());
    let mut counts = vec![0usize; k];

    for (row, &label) in data.rows().into_iter().zip(labels) {
        let mut sum = sums.row_mut(label);
        sum += &row;
        counts[label] += 1;
    }

    let mut updated = centroids.clone();
    for (c, &count) in counts.iter().enumerate() {
        if count == 0 {
            tracing::warn!(cluster = c, "empty cluster keeps its centroid");
            continue;
        }
        let mean: Array1<f64> = sums.row(c).mapv(|s| s / count as f64);
        updated.row_mut(c).assign(&mean);
    }
    updated
}

/// Sum of squared distances to assigned centroids
pub fn inertia(data: &Array2<f64>, labels: &[usize], centroids: &Array2<f64>) -> f64 {
    data.axis_iter(Axis(0))
        .zip(labels)
        .map(|(row, &label)| squared_euclidean(row, centroids.row(label)))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn blobs(seed: u64) -> Array2<f64> {
        let mut rng = RandomSource::new(seed);
        let centers = [(0.0, 0.0), (8.0, 8.0), (-8.0, 8.0)];
        let mut data = Array2::zeros((60, 2));
        for i in 0..60 {
            let (cx, cy) = centers[i / 20];
            data[[i, 0]] = rng.normal_with(cx, 0.5);
            data[[i, 1]] = rng.normal_with(cy, 0.5);
        }
        data
    }

    #[test]
    fn test_recovers_blobs() {
        let data = blobs(42);
        let fit = KMeans::fit(&data, &KMeansConfig::default().with_k(3)).unwrap();

        for blob in 0..3 {
            let label = fit.labels[blob * 20];
            assert!(fit.labels[blob * 20..(blob + 1) * 20].iter().all(|&l| l == label));
        }
        let mut distinct = fit.labels.clone();
        distinct.sort_unstable();
        distinct.dedup();
        assert_eq!(distinct.len(), 3);
        assert_eq!(fit.cluster_sizes(), vec![20, 20, 20]);
    }

    #[test]
    fn test_inertia_non_increasing() {
        let data = blobs(5);
        let fit = KMeans::fit(&data, &KMeansConfig::default().with_k(4)).unwrap();
        for pair in fit.inertia_history.windows(2) {
            assert!(pair[1] <= pair[0] + 1e-9);
        }
        assert_eq!(fit.inertia, *fit.inertia_history.last().unwrap());
    }

    #[test]
    fn test_labels_match_final_centroids() {
        let data = blobs(9);
        let fit = KMeans::fit(&data, &KMeansConfig::default().with_k(3)).unwrap();
        assert_eq!(fit.predict(&data).unwrap(), fit.labels);
    }

    #[test]
    fn test_plus_plus_picks_distinct_points() {
        let data = array![[0.0, 0.0], [0.0, 0.0], [10.0, 10.0]];
        let mut rng = RandomSource::new(1);
        let centroids = kmeans_plus_plus(&data, 2, &mut rng);
        assert_ne!(centroids.row(0), centroids.row(1));
    }

    #[test]
    fn test_identical_points_fall_back_to_uniform() {
        let data = Array2::from_elem((5, 2), 3.0);
        let fit = KMeans::fit(&data, &KMeansConfig::default().with_k(2)).unwrap();
        assert_eq!(fit.inertia, 0.0);
        assert!(fit.labels.iter().all(|&l| l == 0));
    }

    #[test]
    fn test_rejects_too_few_rows() {
        let data = Array2::zeros((2, 2));
        assert!(matches!(
            KMeans::fit(&data, &KMeansConfig::default()),
            Err(Error::InsufficientData { required: 4, actual: 2, .. })
        ));
    }
}
