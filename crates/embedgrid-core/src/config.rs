//! embedgrid.toml configuration parser.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::types::{
    CutterKind, EmbedAlgorithm, IlpObjective, InterfacePolicy, MachineSelection, PackAlgorithm,
};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbedgridConfig {
    pub embed: EmbedConfig,
    pub pack: PackConfig,
    pub solver: SolverConfig,
}

/// Parameters of the virtual network embedding strategies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbedConfig {
    pub algorithm: EmbedAlgorithm,
    /// Seed for every randomized step (min-cut sampling, swaps, random placement).
    pub seed: u64,
    /// Iteration budget of the swap-based local search.
    pub n_swaps: usize,
    /// Cut procedure of the greedy partition tree and the k-balanced partitioner.
    pub cutter: CutterKind,
    pub path_policy: InterfacePolicy,
    pub machine_selection: MachineSelection,
    /// Restart cap for the random strategy; unbounded when absent.
    pub max_attempts: Option<u64>,
    /// Re-verify greedy results before building the solution.
    pub check_solution: bool,
}

impl Default for EmbedConfig {
    fn default() -> Self {
        Self {
            algorithm: EmbedAlgorithm::default(),
            seed: 66,
            n_swaps: 100,
            cutter: CutterKind::default(),
            path_policy: InterfacePolicy::default(),
            machine_selection: MachineSelection::default(),
            max_attempts: None,
            check_solution: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PackConfig {
    pub algorithm: PackAlgorithm,
}

/// Parameters handed to the optimization-solver collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Backend engine name (e.g. "glpk", "cbc", "cplex", "gurobi", "scip").
    pub name: String,
    pub timelimit_secs: u64,
    pub objective: IlpObjective,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            name: "glpk".to_string(),
            timelimit_secs: 3600,
            objective: IlpObjective::default(),
        }
    }
}

impl SolverConfig {
    pub fn timelimit(&self) -> Duration {
        Duration::from_secs(self.timelimit_secs)
    }
}

impl EmbedgridConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: EmbedgridConfig = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}
