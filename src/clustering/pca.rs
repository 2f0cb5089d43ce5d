//! Principal component projection for presenting clusters in 2-D

use crate::error::{Error, Result};
use crate::stats::{covariance_matrix, validate_matrix, SymmetricEigen};
use ndarray::{s, Array1, Array2, Axis};
use serde::Serialize;

/// Fitted principal components
#[derive(Debug, Clone, Serialize)]
pub struct Pca {
    pub n_components: usize,
    /// Eigenvectors as columns (d x n_components)
    pub components: Array2<f64>,
    /// Eigenvalues of the retained components
    pub explained_variance: Array1<f64>,
    /// Column means removed before projection
    pub mean: Array1<f64>,
    total_variance: f64,
}

impl Pca {
    /// Center `data`, eigendecompose its sample covariance and keep the
    /// `n_components` leading eigenvectors
    pub fn fit(data: &Array2<f64>, n_components: usize) -> Result<Self> {
        validate_matrix(data, "pca", 2)?;
        let n_features = data.ncols();
        if n_components == 0 || n_components > n_features {
            return Err(Error::config(format!(
                "n_components must be in [1, {n_features}], got {n_components}"
            )));
        }

        let mean = data
            .mean_axis(Axis(0))
            .unwrap_or_else(|| Array1::zeros(n_features));
        let cov = covariance_matrix(&(data - &mean));
        let eigen = SymmetricEigen::decompose(&cov)?;

        Ok(Self {
            n_components,
            components: eigen.eigenvectors.slice(s![.., ..n_components]).to_owned(),
            explained_variance: eigen.eigenvalues.slice(s![..n_components]).to_owned(),
            mean,
            total_variance: eigen.eigenvalues.sum(),
        })
    }

    /// Project rows into component space
    pub fn transform(&self, data: &Array2<f64>) -> Result<Array2<f64>> {
        if data.ncols() != self.mean.len() {
            return Err(Error::DimensionMismatch {
                expected: self.mean.len(),
                actual: data.ncols(),
            });
        }
        Ok((data - &self.mean).dot(&self.components))
    }

    /// Share of total variance carried by each retained component
    pub fn explained_variance_ratio(&self) -> Array1<f64> {
        if self.total_variance > 0.0 {
            &self.explained_variance / self.total_variance
        } else {
            Array1::zeros(self.n_components)
        }
    }
}

/// Fit and project in one call
pub fn pca_project(data: &Array2<f64>, n_components: usize) -> Result<Array2<f64>> {
    Pca::fit(data, n_components)?.transform(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn test_line_has_one_component() {
        let data = array![[1.0, 2.0, 0.0], [2.0, 4.0, 0.0], [3.0, 6.0, 0.0], [4.0, 8.0, 0.0]];
        let pca = Pca::fit(&data, 2).unwrap();
        let ratio = pca.explained_variance_ratio();

        assert_abs_diff_eq!(ratio[0], 1.0, epsilon = 1e-9);
        assert_abs_diff_eq!(ratio[1], 0.0, epsilon = 1e-9);

        let projected = pca.transform(&data).unwrap();
        assert_eq!(projected.dim(), (4, 2));
        // centered projection sums to zero
        assert_abs_diff_eq!(projected.column(0).sum(), 0.0, epsilon = 1e-9);
        // distances along the line are preserved
        let step = (projected[[1, 0]] - projected[[0, 0]]).abs();
        assert_abs_diff_eq!(step, 5.0_f64.sqrt(), epsilon = 1e-9);
    }

    #[test]
    fn test_invalid_components() {
        let data = array![[1.0, 2.0], [3.0, 4.0]];
        assert!(matches!(Pca::fit(&data, 3), Err(Error::InvalidConfig(_))));
        assert!(pca_project(&data, 2).is_ok());
    }
}
