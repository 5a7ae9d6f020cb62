//! Error types for windfield

use thiserror::Error;

/// Main error type for windfield operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("insufficient sample points: need at least {required}, got {actual}")]
    InsufficientPoints { required: usize, actual: usize },

    #[error("matrix is singular: the system has no unique solution")]
    SingularMatrix,

    #[error("matrix row dimensions must agree: {left} vs {right}")]
    DimensionMismatch { left: usize, right: usize },

    #[error("no valid samples remain after filtering")]
    NoValidSamples,
}

/// Result type alias for windfield operations
pub type Result<T> = std::result::Result<T, Error>;
