//! The solver collaborator.

use std::time::Duration;

use crate::error::{MipError, MipResult};
use crate::problem::{LinearProblem, VarId};

/// Backend engines a [`SolveOptions::solver_name`] may select.
pub const KNOWN_SOLVERS: [&str; 5] = ["cbc", "cplex", "glpk", "gurobi", "scip"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolveOptions {
    /// Backend engine, lowercase.
    pub solver_name: String,
    /// Wall-clock budget. Expiry yields `NotSolved`, never a hang.
    pub timelimit: Duration,
}

impl SolveOptions {
    pub fn new(solver_name: &str, timelimit: Duration) -> MipResult<Self> {
        let solver_name = solver_name.to_ascii_lowercase();
        if !KNOWN_SOLVERS.contains(&solver_name.as_str()) {
            return Err(MipError::UnknownSolver(solver_name));
        }
        Ok(Self {
            solver_name,
            timelimit,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MipStatus {
    /// Proven optimal.
    Solved,
    /// Stopped early, typically on the time limit. `values` may hold an
    /// incumbent.
    NotSolved,
    Infeasible,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MipOutcome {
    pub status: MipStatus,
    pub objective: Option<f64>,
    /// One value per problem variable, empty when the engine has none.
    pub values: Vec<f64>,
}

impl MipOutcome {
    pub fn has_values(&self) -> bool {
        !self.values.is_empty()
    }

    pub fn value(&self, var: VarId) -> f64 {
        self.values.get(var.0).copied().unwrap_or(0.0)
    }

    /// Ensure `values` covers every variable of `problem` (or is empty).
    pub fn check_against(&self, problem: &LinearProblem) -> MipResult<()> {
        if self.has_values() && self.values.len() != problem.num_vars() {
            return Err(MipError::ValueCount {
                expected: problem.num_vars(),
                got: self.values.len(),
            });
        }
        Ok(())
    }
}

/// An LP/MIP engine consumed as a black box.
pub trait MipSolver {
    fn solve(&self, problem: &LinearProblem, options: &SolveOptions) -> MipResult<MipOutcome>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::problem::ObjectiveSense;

    #[test]
    fn options_validate_backend_name() {
        let opts = SolveOptions::new("GLPK", Duration::from_secs(5)).unwrap();
        assert_eq!(opts.solver_name, "glpk");
        assert_eq!(
            SolveOptions::new("excel", Duration::from_secs(5)),
            Err(MipError::UnknownSolver("excel".into()))
        );
    }

    #[test]
    fn outcome_value_count_must_match() {
        let mut p = LinearProblem::new("p", ObjectiveSense::Minimize);
        p.add_binary("a".into()).unwrap();
        let outcome = MipOutcome {
            status: MipStatus::Solved,
            objective: Some(0.0),
            values: vec![1.0, 0.0],
        };
        assert!(matches!(outcome.check_against(&p), Err(MipError::ValueCount { expected: 1, got: 2 })));
        let empty = MipOutcome {
            status: MipStatus::NotSolved,
            objective: None,
            values: vec![],
        };
        assert!(empty.check_against(&p).is_ok());
    }
}
