//! Silhouette coefficient
//!
//! Both functions compare every pair of rows, O(n²) in time. Fine for a
//! universe of a few dozen tickers, too slow beyond a few hundred points.

use crate::error::{Error, Result};
use crate::stats::euclidean;
use ndarray::Array2;
use std::collections::BTreeSet;

/// Per-row silhouette `(b - a) / max(a, b)`.
///
/// `a` is the mean distance to the other rows of the same cluster (0 for a
/// singleton), `b` the smallest mean distance to another cluster. A row
/// with `a = b = 0` scores 0.
pub fn silhouette_samples(data: &Array2<f64>, labels: &[usize]) -> Result<Vec<f64>> {
    if labels.len() != data.nrows() {
        return Err(Error::DimensionMismatch {
            expected: data.nrows(),
            actual: labels.len(),
        });
    }

    let clusters: BTreeSet<usize> = labels.iter().copied().collect();
    if clusters.len() < 2 {
        return Ok(vec![0.0; labels.len()]);
    }
    let max_label = clusters.iter().next_back().copied().unwrap_or(0);

    let n = data.nrows();
    let mut scores = Vec::with_capacity(n);
    let mut sums = vec![0.0; max_label + 1];
    let mut counts = vec![0usize; max_label + 1];

    for i in 0..n {
        sums.iter_mut().for_each(|s| *s = 0.0);
        counts.iter_mut().for_each(|c| *c = 0);

        for j in 0..n {
            if i == j {
                continue;
            }
            sums[labels[j]] += euclidean(data.row(i), data.row(j));
            counts[labels[j]] += 1;
        }

        let own = labels[i];
        let a = if counts[own] > 0 {
            sums[own] / counts[own] as f64
        } else {
            0.0
        };
        let b = clusters
            .iter()
            .filter(|&&c| c != own && counts[c] > 0)
            .map(|&c| sums[c] / counts[c] as f64)
            .fold(f64::INFINITY, f64::min);
        let b = if b.is_finite() { b } else { 0.0 };

        let denom = a.max(b);
        scores.push(if denom > 0.0 { (b - a) / denom } else { 0.0 });
    }

    Ok(scores)
}

/// Mean silhouette over all rows; 0 when fewer than two clusters are present
pub fn silhouette_score(data: &Array2<f64>, labels: &[usize]) -> Result<f64> {
    let samples = silhouette_samples(data, labels)?;
    Ok(crate::stats::mean(&samples))
}
