//! Placement error taxonomy.
//!
//! Every strategy, the solution verifier and the solver translation layer
//! report failures through [`PlacementError`]. Capacity and path errors raised
//! inside a single placement attempt are consumed by the enclosing widening
//! loop; only terminal errors reach callers.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::status::SolutionStatus;

/// Result type alias for placement operations.
pub type PlacementResult<T> = Result<T, PlacementError>;

/// A node resource that can be overrun.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resource {
    Cores,
    Memory,
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resource::Cores => f.write_str("cpu cores"),
            Resource::Memory => f.write_str("memory"),
        }
    }
}

/// Errors produced while searching for or verifying a placement.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlacementError {
    #[error("empty solution: no virtual node has been mapped")]
    EmptySolution,

    #[error("assignment error: {0}")]
    Assignment(String),

    #[error("node resource exceeded on {node}: {resource} used {used}, max {max}")]
    NodeResource {
        node: String,
        resource: Resource,
        used: u64,
        max: u64,
    },

    #[error("link capacity exceeded on {link}: used {used}, max {max}")]
    LinkCapacity { link: String, used: u64, max: u64 },

    #[error("no path found from {from} to {to}")]
    NoPathFound { from: String, to: String },

    #[error("infeasible: no feasible placement in the explored range")]
    Infeasible,

    #[error("time limit expired before a feasible solution was found")]
    TimeLimit,

    #[error("solver error: {0}")]
    Solver(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl PlacementError {
    /// The status code reported to callers for this error.
    pub fn status(&self) -> SolutionStatus {
        match self {
            PlacementError::Infeasible => SolutionStatus::Infeasible,
            _ => SolutionStatus::NotSolved,
        }
    }

    /// True for errors that only reject the current attempt of a widening
    /// loop (capacity overrun or unroutable link).
    pub fn is_attempt_local(&self) -> bool {
        matches!(
            self,
            PlacementError::NodeResource { .. }
                | PlacementError::LinkCapacity { .. }
                | PlacementError::NoPathFound { .. }
        )
    }
}
