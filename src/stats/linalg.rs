//! Matrix helpers: validation, standardization, covariance, eigen and solve

use crate::error::{Error, Result};
use ndarray::{Array1, Array2, ArrayView1, Axis};
use serde::{Deserialize, Serialize};

/// Reject empty matrices and matrices containing NaN or infinities
pub fn validate_matrix(data: &Array2<f64>, context: &'static str, min_rows: usize) -> Result<()> {
    if data.nrows() < min_rows {
        return Err(Error::InsufficientData {
            context,
            required: min_rows,
            actual: data.nrows(),
        });
    }
    if data.ncols() == 0 {
        return Err(Error::config(format!("{context}: feature matrix has no columns")));
    }
    for ((row, column), value) in data.indexed_iter() {
        if !value.is_finite() {
            return Err(Error::NonFiniteInput { row, column });
        }
    }
    Ok(())
}

/// Reject NaN or infinities in a 1-D series
pub fn validate_series(values: &[f64]) -> Result<()> {
    match values.iter().position(|v| !v.is_finite()) {
        Some(row) => Err(Error::NonFiniteInput { row, column: 0 }),
        None => Ok(()),
    }
}

/// Squared Euclidean distance
#[inline]
pub fn squared_euclidean(a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y).powi(2)).sum()
}

/// Euclidean distance
#[inline]
pub fn euclidean(a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
    squared_euclidean(a, b).sqrt()
}

/// Z-score scaler fitted per column.
///
/// Columns with zero standard deviation are scaled by 1 instead, so a
/// constant feature becomes all zeros rather than NaN.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Standardizer {
    pub mean: Array1<f64>,
    pub std: Array1<f64>,
}

impl Standardizer {
    /// Fit column means and population standard deviations
    pub fn fit(data: &Array2<f64>) -> Result<Self> {
        validate_matrix(data, "standardization", 1)?;

        let mean = data
            .mean_axis(Axis(0))
            .unwrap_or_else(|| Array1::zeros(data.ncols()));
        let mut std = data.std_axis(Axis(0), 0.0);

        let mut constant = 0;
        std.mapv_inplace(|s| {
            if s == 0.0 {
                constant += 1;
                1.0
            } else {
                s
            }
        });
        if constant > 0 {
            tracing::warn!(columns = constant, "zero-variance columns scaled by 1");
        }

        Ok(Self { mean, std })
    }

    /// Apply the fitted scaling
    pub fn transform(&self, data: &Array2<f64>) -> Result<Array2<f64>> {
        if data.ncols() != self.mean.len() {
            return Err(Error::DimensionMismatch {
                expected: self.mean.len(),
                actual: data.ncols(),
            });
        }
        Ok((data - &self.mean) / &self.std)
    }
}

/// Fit a [`Standardizer`] and transform the same data
pub fn standardize(data: &Array2<f64>) -> Result<Array2<f64>> {
    Standardizer::fit(data)?.transform(data)
}

/// Sample covariance of the columns (denominator `n - 1`)
pub fn covariance_matrix(data: &Array2<f64>) -> Array2<f64> {
    let n = data.nrows();
    let mean = data
        .mean_axis(Axis(0))
        .unwrap_or_else(|| Array1::zeros(data.ncols()));
    let centered = data - &mean;
    let denom = n.saturating_sub(1).max(1) as f64;
    centered.t().dot(&centered) / denom
}

/// Eigendecomposition of a symmetric matrix
#[derive(Debug, Clone)]
pub struct SymmetricEigen {
    /// Eigenvalues sorted in descending order
    pub eigenvalues: Array1<f64>,
    /// Eigenvectors as columns, matching `eigenvalues`
    pub eigenvectors: Array2<f64>,
}

impl SymmetricEigen {
    const MAX_SWEEPS: usize = 100;
    const TOLERANCE: f64 = 1e-12;

    /// Cyclic Jacobi rotations until the off-diagonal mass vanishes
    pub fn decompose(matrix: &Array2<f64>) -> Result<Self> {
        let n = matrix.nrows();
        if matrix.ncols() != n {
            return Err(Error::DimensionMismatch {
                expected: n,
                actual: matrix.ncols(),
            });
        }

        let mut a = matrix.clone();
        let mut v = Array2::<f64>::eye(n);

        for _ in 0..Self::MAX_SWEEPS {
            let off_diagonal: f64 = (0..n)
                .flat_map(|i| ((i + 1)..n).map(move |j| (i, j)))
                .map(|(i, j)| a[[i, j]].powi(2))
                .sum();
            if off_diagonal < Self::TOLERANCE {
                break;
            }

            for p in 0..n {
                for q in (p + 1)..n {
                    let apq = a[[p, q]];
                    if apq.abs() < f64::MIN_POSITIVE {
                        continue;
                    }

                    let phi = (a[[q, q]] - a[[p, p]]) / (2.0 * apq);
                    let t = 1.0 / (phi + phi.signum() * (1.0 + phi * phi).sqrt());
                    let c = 1.0 / (1.0 + t * t).sqrt();
                    let s = t * c;

                    let app = a[[p, p]];
                    let aqq = a[[q, q]];
                    a[[p, p]] = c * c * app - 2.0 * s * c * apq + s * s * aqq;
                    a[[q, q]] = s * s * app + 2.0 * s * c * apq + c * c * aqq;
                    a[[p, q]] = 0.0;
                    a[[q, p]] = 0.0;

                    for i in 0..n {
                        if i != p && i != q {
                            let aip = a[[i, p]];
                            let aiq = a[[i, q]];
                            a[[i, p]] = c * aip - s * aiq;
                            a[[p, i]] = a[[i, p]];
                            a[[i, q]] = s * aip + c * aiq;
                            a[[q, i]] = a[[i, q]];
                        }
                    }

                    for i in 0..n {
                        let vip = v[[i, p]];
                        let viq = v[[i, q]];
                        v[[i, p]] = c * vip - s * viq;
                        v[[i, q]] = s * vip + c * viq;
                    }
                }
            }
        }

        let mut order: Vec<usize> = (0..n).collect();
        order.sort_by(|&i, &j| a[[j, j]].total_cmp(&a[[i, i]]));

        let eigenvalues = Array1::from_iter(order.iter().map(|&i| a[[i, i]]));
        let mut eigenvectors = Array2::zeros((n, n));
        for (new_idx, &old_idx) in order.iter().enumerate() {
            eigenvectors.column_mut(new_idx).assign(&v.column(old_idx));
        }

        Ok(Self {
            eigenvalues,
            eigenvectors,
        })
    }
}

/// Solve `A x = b` by Gauss-Jordan elimination with partial pivoting
pub fn solve(a: &Array2<f64>, b: &Array1<f64>) -> Result<Array1<f64>> {
    let n = a.nrows();
    if a.ncols() != n || b.len() != n {
        return Err(Error::DimensionMismatch {
            expected: n,
            actual: if a.ncols() != n { a.ncols() } else { b.len() },
        });
    }
    let rhs = b.clone().insert_axis(Axis(1));
    let solution = gauss_jordan(a, rhs)?;
    Ok(solution.column(0).to_owned())
}

/// Inverse of a square matrix
pub fn invert(a: &Array2<f64>) -> Result<Array2<f64>> {
    let n = a.nrows();
    if a.ncols() != n {
        return Err(Error::DimensionMismatch {
            expected: n,
            actual: a.ncols(),
        });
    }
    gauss_jordan(a, Array2::eye(n))
}

fn gauss_jordan(a: &Array2<f64>, mut rhs: Array2<f64>) -> Result<Array2<f64>> {
    const PIVOT_EPS: f64 = 1e-12;
    let n = a.nrows();
    let mut m = a.clone();

    for col in 0..n {
        let pivot_row = (col..n)
            .max_by(|&i, &j| m[[i, col]].abs().total_cmp(&m[[j, col]].abs()))
            .unwrap_or(col);

        if m[[pivot_row, col]].abs() < PIVOT_EPS {
            return Err(Error::SingularMatrix);
        }

        if pivot_row != col {
            for j in 0..n {
                m.swap([col, j], [pivot_row, j]);
            }
            for j in 0..rhs.ncols() {
                rhs.swap([col, j], [pivot_row, j]);
            }
        }

        let pivot = m[[col, col]];
        m.row_mut(col).mapv_inplace(|x| x / pivot);
        rhs.row_mut(col).mapv_inplace(|x| x / pivot);

        for row in 0..n {
            if row == col {
                continue;
            }
            let factor = m[[row, col]];
            if factor == 0.0 {
                continue;
            }
            for j in 0..n {
                m[[row, j]] -= factor * m[[col, j]];
            }
            for j in 0..rhs.ncols() {
                rhs[[row, j]] -= factor * rhs[[col, j]];
            }
        }
    }

    Ok(rhs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::{array, Array2};

    #[test]
    fn test_standardize_zero_variance_column() {
        let data = array![[1.0, 5.0], [2.0, 5.0], [3.0, 5.0]];
        let z = standardize(&data).unwrap();
        assert!(z.column(1).iter().all(|&v| v == 0.0));
        assert_abs_diff_eq!(z.column(0).sum(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_validate_rejects_nan() {
        let data = array![[1.0, f64::NAN]];
        match validate_matrix(&data, "test", 1) {
            Err(Error::NonFiniteInput { row, column }) => {
                assert_eq!((row, column), (0, 1));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_covariance_matrix() {
        let data = array![[1.0, 2.0], [3.0, 4.0], [5.0, 6.0]];
        let cov = covariance_matrix(&data);
        assert_abs_diff_eq!(cov[[0, 0]], 4.0);
        assert_abs_diff_eq!(cov[[0, 1]], cov[[1, 0]]);
    }

    #[test]
    fn test_eigen_decomposition() {
        let matrix = array![[4.0, 2.0], [2.0, 3.0]];
        let eigen = SymmetricEigen::decompose(&matrix).unwrap();

        assert!(eigen.eigenvalues[0] > eigen.eigenvalues[1]);
        assert_abs_diff_eq!(eigen.eigenvalues.sum(), 7.0, epsilon = 1e-9);

        // A v = λ v for each pair
        for k in 0..2 {
            let v = eigen.eigenvectors.column(k);
            let av = matrix.dot(&v);
            for i in 0..2 {
                assert_abs_diff_eq!(av[i], eigen.eigenvalues[k] * v[i], epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn test_solve_and_invert() {
        let a = array![[2.0, 1.0], [1.0, 3.0]];
        let b = array![3.0, 5.0];
        let x = solve(&a, &b).unwrap();
        assert_abs_diff_eq!(x[0], 0.8, epsilon = 1e-12);
        assert_abs_diff_eq!(x[1], 1.4, epsilon = 1e-12);

        let inv = invert(&a).unwrap();
        let identity = a.dot(&inv);
        let eye: Array2<f64> = Array2::eye(2);
        for (got, want) in identity.iter().zip(eye.iter()) {
            assert_abs_diff_eq!(*got, *want, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_singular_matrix() {
        let a = array![[1.0, 2.0], [2.0, 4.0]];
        assert!(matches!(invert(&a), Err(Error::SingularMatrix)));
    }
}
