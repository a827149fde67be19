//! embedgrid-pack — packing virtual nodes onto rented cloud instances.
//!
//! There is no network dimension here: each virtual node only needs cores
//! and memory, and every instance type of a [`CloudCatalog`] offers both at
//! an hourly cost. Strategies open instances ("bins") and fill them while
//! trying to keep the total cost low.
//!
//! # Components
//!
//! - **`bins`** — open instances and their running usage
//! - **`solution`** — verified packing, instance counts and cost
//! - **`bfdp`** — best-fit dot product
//! - **`ffdp`** — first-fit decreasing priority
//! - **`ffod`** — first-fit ordered deviation
//! - **`greedy`** — first-fit with in-place upgrades
//! - **`ilp`** — exact formulation delegated to a `MipSolver`

pub mod bfdp;
pub mod bins;
pub mod ffdp;
pub mod ffod;
pub mod greedy;
pub mod ilp;
pub mod solution;

use tracing::info;

use embedgrid_core::{EmbedgridConfig, Outcome, PackAlgorithm, PlacementError, PlacementResult};
use embedgrid_mip::{MipSolver, SolveOptions};
use embedgrid_topology::{CloudCatalog, VirtualNetwork};

pub use bfdp::BestFitDotProduct;
pub use bins::Bin;
pub use ffdp::FirstFitDecreasingPriority;
pub use ffod::FirstFitOrderedDeviation;
pub use greedy::GreedyPacking;
pub use ilp::{IlpPacking, PackFormulation, formulate};
pub use solution::{Instance, PackingSolution, verify_packing};

/// A packing strategy.
pub trait PackStrategy {
    fn name(&self) -> &'static str;

    fn attempt(&mut self, virtual_net: &VirtualNetwork, catalog: &CloudCatalog) -> PlacementResult<PackingSolution>;

    /// [`attempt`](Self::attempt), timed and folded into an [`Outcome`].
    fn solve(&mut self, virtual_net: &VirtualNetwork, catalog: &CloudCatalog) -> Outcome<PackingSolution> {
        let outcome = Outcome::timed(|| self.attempt(virtual_net, catalog));
        info!(
            strategy = self.name(),
            status = %outcome.status,
            cost = ?outcome.solution.as_ref().map(PackingSolution::cost),
            elapsed_ms = outcome.elapsed.as_millis() as u64,
            "packing finished"
        );
        outcome
    }
}

/// Build the strategy selected by `config.pack.algorithm`.
pub fn strategy_for(
    config: &EmbedgridConfig,
    solver: Option<Box<dyn MipSolver>>,
) -> PlacementResult<Box<dyn PackStrategy>> {
    Ok(match config.pack.algorithm {
        PackAlgorithm::BestFitDotProduct => Box::new(BestFitDotProduct::new()),
        PackAlgorithm::FirstFitDecreasingPriority => Box::new(FirstFitDecreasingPriority::new()),
        PackAlgorithm::FirstFitOrderedDeviation => Box::new(FirstFitOrderedDeviation::new()),
        PackAlgorithm::Greedy => Box::new(GreedyPacking::new()),
        PackAlgorithm::Ilp => {
            let Some(solver) = solver else {
                return Err(PlacementError::Solver(
                    "no solver backend configured for the ilp strategy".to_string(),
                ));
            };
            let options = SolveOptions::new(&config.solver.name, config.solver.timelimit())
                .map_err(|err| PlacementError::Solver(err.to_string()))?;
            Box::new(IlpPacking::new(solver, options))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn factory_names_match_algorithms() {
        let mut config = EmbedgridConfig::default();
        for algorithm in [
            PackAlgorithm::BestFitDotProduct,
            PackAlgorithm::FirstFitDecreasingPriority,
            PackAlgorithm::FirstFitOrderedDeviation,
            PackAlgorithm::Greedy,
        ] {
            config.pack.algorithm = algorithm;
            assert_eq!(strategy_for(&config, None).unwrap().name(), algorithm.name());
        }
    }

    #[test]
    fn ilp_requires_a_backend() {
        let mut config = EmbedgridConfig::default();
        config.pack.algorithm = PackAlgorithm::Ilp;
        assert!(matches!(strategy_for(&config, None), Err(PlacementError::Solver(_))));
    }
}
