//! embedgrid-mip — the optimization-solver collaborator interface.
//!
//! Strategies that delegate to an external LP/MIP engine describe their
//! formulation as a [`LinearProblem`] and hand it to a [`MipSolver`]
//! together with [`SolveOptions`] (backend name and time budget). The
//! engine itself is out of process or out of crate; this crate only models
//! the problem, checks returned values against it and renders it as
//! CPLEX-LP text.
//!
//! # Components
//!
//! - **`problem`** — variables, linear constraints, objective, feasibility checks
//! - **`lp_format`** — CPLEX-LP rendering
//! - **`solver`** — `MipSolver` trait, options and outcome

pub mod error;
pub mod lp_format;
pub mod problem;
pub mod solver;

pub use error::{MipError, MipResult};
pub use problem::{Constraint, LinearProblem, ObjectiveSense, Sense, Term, VarId, VarKind, Variable};
pub use solver::{MipOutcome, MipSolver, MipStatus, SolveOptions};
