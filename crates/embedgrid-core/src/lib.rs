//! embedgrid-core — vocabulary shared by every embedgrid crate.
//!
//! # Components
//!
//! - **`error`** — the placement error taxonomy and its status mapping
//! - **`status`** — solution status codes and timed outcomes
//! - **`types`** — search policies shared by the strategy crates
//! - **`config`** — `embedgrid.toml` parsing

pub mod config;
pub mod error;
pub mod status;
pub mod types;

pub use config::{EmbedConfig, EmbedgridConfig, PackConfig, SolverConfig};
pub use error::{PlacementError, PlacementResult, Resource};
pub use status::{Outcome, SolutionStatus};
pub use types::*;
