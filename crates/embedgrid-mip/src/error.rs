//! Error types for the solver interface.

use thiserror::Error;

/// Result type alias for solver operations.
pub type MipResult<T> = Result<T, MipError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum MipError {
    #[error("duplicate variable: {0}")]
    DuplicateVariable(String),

    #[error("unknown solver backend: {0}")]
    UnknownSolver(String),

    #[error("solver returned {got} values for {expected} variables")]
    ValueCount { expected: usize, got: usize },

    #[error("solver backend failed: {0}")]
    Backend(String),
}
