//! embedgrid-embed — virtual network embedding.
//!
//! Every strategy maps each virtual node onto a compute node of the
//! substrate and each cross-machine virtual link onto a physical path,
//! without overrunning node or interface capacity. Strategies implement
//! [`EmbedStrategy`]; [`strategy_for`] picks one from configuration.
//!
//! # Components
//!
//! - **`embedding`** — the raw node map and per-link routes
//! - **`verify`** — capacity and well-formedness checks
//! - **`solution`** — verified solution with ungrouped link fractions
//! - **`search`** — machine-count lower bound and the widening loop
//! - **`greedy`** — partition-tree placement
//! - **`partitioned`** — k-balanced and swap-partition placement
//! - **`random`** — seeded random placement with restarts
//! - **`two_phase`** — first-fit placement with migration repair
//! - **`ilp`** — exact formulation delegated to a `MipSolver`

pub mod embedding;
pub mod greedy;
pub mod ilp;
pub mod partitioned;
pub mod random;
pub mod search;
pub mod solution;
pub mod two_phase;
pub mod verify;

use tracing::info;

use embedgrid_core::{EmbedAlgorithm, EmbedgridConfig, Outcome, PlacementError, PlacementResult};
use embedgrid_mip::{MipSolver, SolveOptions};
use embedgrid_topology::{PhysicalNetwork, VirtualNetwork};

pub use embedding::Embedding;
pub use greedy::GreedyEmbedding;
pub use ilp::{EmbedFormulation, IlpEmbedding, formulate};
pub use partitioned::{PartitionedEmbedding, k_balanced, swap_partition};
pub use random::RandomEmbedding;
pub use search::{lower_bound, machine_range};
pub use solution::{DirectedLink, LinkMap, PathHop, PhysicalPath, Solution};
pub use two_phase::TwoPhaseEmbedding;
pub use verify::verify_embedding;

/// A placement strategy.
pub trait EmbedStrategy {
    fn name(&self) -> &'static str;

    /// One placement run. `Err` carries the reason no solution was produced.
    fn attempt(&mut self, virtual_net: &VirtualNetwork, physical: &PhysicalNetwork) -> PlacementResult<Solution>;

    /// [`attempt`](Self::attempt), timed and folded into an [`Outcome`].
    fn solve(&mut self, virtual_net: &VirtualNetwork, physical: &PhysicalNetwork) -> Outcome<Solution> {
        let outcome = Outcome::timed(|| self.attempt(virtual_net, physical));
        info!(
            strategy = self.name(),
            status = %outcome.status,
            elapsed_ms = outcome.elapsed.as_millis() as u64,
            "embedding finished"
        );
        outcome
    }
}

/// Build the strategy selected by `config.embed.algorithm`.
///
/// The `ilp` strategy needs a solver backend; every other strategy ignores
/// `solver`.
pub fn strategy_for(
    config: &EmbedgridConfig,
    solver: Option<Box<dyn MipSolver>>,
) -> PlacementResult<Box<dyn EmbedStrategy>> {
    let embed = &config.embed;
    Ok(match embed.algorithm {
        EmbedAlgorithm::Greedy => Box::new(GreedyEmbedding::from_config(embed)),
        EmbedAlgorithm::KBalanced => Box::new(k_balanced(embed)),
        EmbedAlgorithm::Partition => Box::new(swap_partition(embed)),
        EmbedAlgorithm::Random => Box::new(RandomEmbedding::from_config(embed)),
        EmbedAlgorithm::TwoPhase => Box::new(TwoPhaseEmbedding::new()),
        EmbedAlgorithm::Ilp => {
            let Some(solver) = solver else {
                return Err(PlacementError::Solver(
                    "no solver backend configured for the ilp strategy".to_string(),
                ));
            };
            let options = SolveOptions::new(&config.solver.name, config.solver.timelimit())
                .map_err(|err| PlacementError::Solver(err.to_string()))?;
            Box::new(IlpEmbedding::new(solver, options, config.solver.objective))
        }
    })
}
