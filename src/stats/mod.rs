//! Shared numeric utilities
//!
//! - Descriptive statistics over slices (mean, variance, percentile, logsumexp)
//! - Matrix helpers over `ndarray` (standardization, covariance, symmetric
//!   eigendecomposition, linear solve)

mod descriptive;
mod linalg;

pub use descriptive::*;
pub use linalg::*;
