//! Best-fit dot product.
//!
//! Items go largest first. Each one joins the open bin whose contents align
//! best with it (dot product of demands, per unit of cost); when no open bin
//! has room, the instance type best aligned with the item alone is opened.

use tracing::debug;

use embedgrid_core::{PlacementError, PlacementResult, Verification};
use embedgrid_topology::{CloudCatalog, InstanceTypeId, VirtualNetwork};

use crate::PackStrategy;
use crate::bins::{Bin, by_decreasing_size, demand};
use crate::solution::PackingSolution;

#[derive(Debug, Default)]
pub struct BestFitDotProduct;

impl BestFitDotProduct {
    pub fn new() -> Self {
        Self
    }
}

/// Weight of a core against one MiB of memory.
const CORE_WEIGHT: f64 = 1000.0;

fn bin_score(catalog: &CloudCatalog, bin: &Bin, cores: u64, memory: u64) -> f64 {
    let dot = CORE_WEIGHT * cores as f64 * bin.cores() as f64 + memory as f64 * bin.memory() as f64;
    dot / bin.kind(catalog).hourly_cost
}

fn type_score(catalog: &CloudCatalog, id: InstanceTypeId, cores: u64, memory: u64) -> f64 {
    let t = catalog.get(id);
    let dot = memory as f64 * f64::from(t.memory) + CORE_WEIGHT * cores as f64 * f64::from(t.cores);
    dot / t.hourly_cost
}

impl PackStrategy for BestFitDotProduct {
    fn name(&self) -> &'static str {
        "best_fit_dot_product"
    }

    fn attempt(&mut self, virtual_net: &VirtualNetwork, catalog: &CloudCatalog) -> PlacementResult<PackingSolution> {
        let mut bins: Vec<Bin> = Vec::new();
        for u in by_decreasing_size(virtual_net) {
            let (cores, memory) = demand(virtual_net, u);

            let mut best: Option<(usize, f64)> = None;
            for (i, bin) in bins.iter().enumerate() {
                if !bin.has_room(catalog, cores, memory) {
                    continue;
                }
                let score = bin_score(catalog, bin, cores, memory);
                if best.is_none_or(|(_, s)| score > s) {
                    best = Some((i, score));
                }
            }
            if let Some((i, _)) = best {
                bins[i].add(u, cores, memory);
                continue;
            }

            let mut opened: Option<(InstanceTypeId, f64)> = None;
            for (id, t) in catalog.types() {
                if !t.fits(cores, memory) {
                    continue;
                }
                let score = type_score(catalog, id, cores, memory);
                if opened.is_none_or(|(_, s)| score > s) {
                    opened = Some((id, score));
                }
            }
            let Some((id, _)) = opened else {
                debug!(node = virtual_net.name(u), "no instance type holds the node");
                return Err(PlacementError::Infeasible);
            };
            let mut bin = Bin::new(id);
            bin.add(u, cores, memory);
            bins.push(bin);
        }
        PackingSolution::build(virtual_net, catalog, &bins, Verification::Check)
    }
}
