//! Error types for subpopulation comparisons.
//!
//! Every condition here is fatal: operations detect it while validating
//! their inputs and return it immediately. Empty bins are *not* errors;
//! they surface as `NaN` averages in [`BinSummary`](crate::binning::BinSummary).

use thiserror::Error;

/// Result type for subpopulation comparisons.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for subpopulation comparisons.
#[derive(Debug, Clone, PartialEq, Error)]
#[non_exhaustive]
pub enum Error {
    /// A weight is zero, negative, or not finite.
    #[error("invalid weight {value} at index {index}: weights must be positive and finite")]
    InvalidWeight { index: usize, value: f64 },

    /// A score or response is NaN or infinite.
    #[error("non-finite {field} {value} at index {index}")]
    NonFinite {
        field: &'static str,
        index: usize,
        value: f64,
    },

    /// A sequence violates the ordering an operation requires.
    #[error("sequence is not {required} at index {index}")]
    NotSorted {
        index: usize,
        required: &'static str,
    },

    /// Two subpopulations compared in disjoint mode share a score.
    #[error("subpopulations share the score {score}")]
    NotDisjoint { score: f64 },

    /// Parallel columns have different lengths.
    #[error("column {column} has length {actual}, expected {expected}")]
    LengthMismatch {
        column: &'static str,
        expected: usize,
        actual: usize,
    },

    /// An operation received no observations.
    #[error("{0} is empty")]
    EmptyInput(&'static str),

    /// A bin count of zero was requested.
    #[error("number of bins must be positive")]
    InvalidBinCount,

    /// The truncation fraction lies outside `(0, 1]`.
    #[error("fraction {0} must lie in (0, 1]")]
    InvalidFraction(f64),

    /// Too few points to form the requested statistic.
    #[error("need at least {needed} {what}, got {got}")]
    InsufficientData {
        what: &'static str,
        needed: usize,
        got: usize,
    },

    /// A subpopulation index points past the end of the population.
    #[error("index {index} out of bounds for population of size {len}")]
    IndexOutOfBounds { index: usize, len: usize },

    /// Dithering failed to make the scores distinct.
    #[error("dithered scores collide at {score}; use a different scale or seed")]
    DitherCollision { score: f64 },

    /// A parameter is outside its valid domain.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
}

impl Error {
    /// Create an invalid parameter error.
    pub fn invalid_parameter(msg: impl Into<String>) -> Self {
        Error::InvalidParameter(msg.into())
    }
}
