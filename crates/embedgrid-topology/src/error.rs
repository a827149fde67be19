//! Error types for topology construction and loading.

use thiserror::Error;

/// Result type alias for topology operations.
pub type TopologyResult<T> = Result<T, TopologyError>;

/// Errors that can occur while building or loading a topology.
#[derive(Debug, Error)]
pub enum TopologyError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("invalid json in {path}: {source}")]
    Parse {
        path: String,
        source: serde_json::Error,
    },

    #[error("duplicate node: {0}")]
    DuplicateNode(String),

    #[error("duplicate link: {0} - {1}")]
    DuplicateLink(String, String),

    #[error("unknown node: {0}")]
    UnknownNode(String),

    #[error("self loop on node {0}")]
    SelfLoop(String),

    #[error("link {0} - {1} has no interfaces")]
    NoInterfaces(String, String),

    #[error("physical network is not connected")]
    Disconnected,

    #[error("network has no nodes")]
    Empty,

    #[error("instance catalog is empty")]
    EmptyCatalog,

    #[error("invalid instance type {name}: {reason}")]
    InvalidInstance { name: String, reason: String },

    #[error("invalid generator parameters: {0}")]
    InvalidParameters(String),
}
