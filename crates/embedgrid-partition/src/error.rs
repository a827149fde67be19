//! Error types for the partitioning engine.

use thiserror::Error;

/// Result type alias for partitioning operations.
pub type PartitionResult<T> = Result<T, PartitionError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PartitionError {
    #[error("cannot split a network into zero parts")]
    ZeroParts,

    #[error("cannot split {nodes} nodes into {k} non-empty parts")]
    TooManyParts { k: usize, nodes: usize },
}
