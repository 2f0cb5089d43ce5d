//! Error types for the engines.

use thiserror::Error;

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced to callers of the engines.
///
/// Numerical edge cases that are expected steady-state conditions of the
/// algorithms (zero-variance columns, empty clusters, degenerate splits) are
/// handled internally with documented fallbacks and never show up here.
#[derive(Error, Debug)]
pub enum Error {
    /// Fewer observations than the engine needs
    #[error("insufficient data for {context}: need at least {required} observations, got {actual}")]
    InsufficientData {
        context: &'static str,
        required: usize,
        actual: usize,
    },

    /// Input shape does not match the fitted model
    #[error("dimension mismatch: expected {expected} features, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// NaN or infinite value in the input
    #[error("non-finite value at row {row}, column {column}")]
    NonFiniteInput { row: usize, column: usize },

    /// Out-of-range configuration parameter
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Model used before `fit`
    #[error("model is not fitted yet")]
    NotFitted,

    /// Linear system without a unique solution
    #[error("matrix is singular or nearly singular")]
    SingularMatrix,

    /// Ticker missing from a data provider
    #[error("no price history for ticker {0}")]
    UnknownTicker(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn config(message: impl Into<String>) -> Self {
        Error::InvalidConfig(message.into())
    }
}
