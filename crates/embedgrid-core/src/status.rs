//! Solution status codes and timed outcomes.

use std::fmt;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::error::{PlacementError, PlacementResult};

/// Status code surfaced to callers: `NotSolved (0)`, `Solved (1)`,
/// `Infeasible (-1)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolutionStatus {
    NotSolved,
    Solved,
    Infeasible,
}

impl SolutionStatus {
    /// Numeric code of the status.
    pub fn code(self) -> i8 {
        match self {
            SolutionStatus::NotSolved => 0,
            SolutionStatus::Solved => 1,
            SolutionStatus::Infeasible => -1,
        }
    }

    /// Parse a numeric status code.
    pub fn from_code(code: i8) -> Option<Self> {
        match code {
            0 => Some(SolutionStatus::NotSolved),
            1 => Some(SolutionStatus::Solved),
            -1 => Some(SolutionStatus::Infeasible),
            _ => None,
        }
    }
}

impl fmt::Display for SolutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolutionStatus::NotSolved => f.write_str("Not Solved"),
            SolutionStatus::Solved => f.write_str("Solved"),
            SolutionStatus::Infeasible => f.write_str("Infeasible"),
        }
    }
}

/// Result of one `solve` call: status, optional solution, wall time.
#[derive(Debug, Clone)]
pub struct Outcome<S> {
    pub status: SolutionStatus,
    pub solution: Option<S>,
    /// Terminal error, if the call did not produce a solution.
    pub error: Option<PlacementError>,
    pub elapsed: Duration,
}

impl<S> Outcome<S> {
    /// Run `f`, measure it, and fold its result into an outcome.
    pub fn timed<F>(f: F) -> Self
    where
        F: FnOnce() -> PlacementResult<S>,
    {
        let start = Instant::now();
        let result = f();
        let elapsed = start.elapsed();
        match result {
            Ok(solution) => Outcome {
                status: SolutionStatus::Solved,
                solution: Some(solution),
                error: None,
                elapsed,
            },
            Err(err) => Outcome {
                status: err.status(),
                solution: None,
                error: Some(err),
                elapsed,
            },
        }
    }

    pub fn is_solved(&self) -> bool {
        self.status == SolutionStatus::Solved
    }
}
