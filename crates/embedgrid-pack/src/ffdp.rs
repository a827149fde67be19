//! First-fit decreasing priority.
//!
//! Cores and memory are weighted by how scarce they are overall: `alpha` is
//! total demand over total catalog capacity, per resource. Instance types are
//! ranked once by weighted capacity per unit of cost.

use tracing::debug;

use embedgrid_core::{PlacementError, PlacementResult, Verification};
use embedgrid_topology::{CloudCatalog, InstanceTypeId, VirtualNetwork};

use crate::PackStrategy;
use crate::bins::{Bin, by_decreasing_size, demand};
use crate::solution::PackingSolution;

#[derive(Debug, Default)]
pub struct FirstFitDecreasingPriority;

impl FirstFitDecreasingPriority {
    pub fn new() -> Self {
        Self
    }
}

/// Per-resource weights: total demand over total catalog capacity.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Alpha {
    cores: f64,
    memory: f64,
}

impl Alpha {
    fn of(virtual_net: &VirtualNetwork, catalog: &CloudCatalog) -> Self {
        let (cap_cores, cap_memory) = catalog
            .types()
            .fold((0.0, 0.0), |(c, m), (_, t)| (c + f64::from(t.cores), m + f64::from(t.memory)));
        Self {
            cores: virtual_net.total_cores() as f64 / cap_cores,
            memory: virtual_net.total_memory() as f64 / cap_memory,
        }
    }

    fn weigh(self, cores: f64, memory: f64) -> f64 {
        self.cores * 1000.0 * cores + self.memory * memory
    }
}

/// Instance types by decreasing weighted capacity per unit of cost; equal
/// scores keep catalog order.
fn ranked_types(catalog: &CloudCatalog, alpha: Alpha) -> Vec<InstanceTypeId> {
    let score = |id: InstanceTypeId| {
        let t = catalog.get(id);
        alpha.weigh(f64::from(t.cores), f64::from(t.memory)) / t.hourly_cost
    };
    let mut ids: Vec<InstanceTypeId> = catalog.ids().collect();
    ids.sort_by(|&a, &b| score(b).total_cmp(&score(a)));
    ids
}

impl PackStrategy for FirstFitDecreasingPriority {
    fn name(&self) -> &'static str {
        "first_fit_decreasing_priority"
    }

    fn attempt(&mut self, virtual_net: &VirtualNetwork, catalog: &CloudCatalog) -> PlacementResult<PackingSolution> {
        let alpha = Alpha::of(virtual_net, catalog);
        let ranked = ranked_types(catalog, alpha);
        debug!(alpha_cores = alpha.cores, alpha_memory = alpha.memory, "packing weights");

        let mut bins: Vec<Bin> = Vec::new();
        for u in by_decreasing_size(virtual_net) {
            let (cores, memory) = demand(virtual_net, u);

            let mut best: Option<(usize, f64)> = None;
            for (i, bin) in bins.iter().enumerate() {
                if !bin.has_room(catalog, cores, memory) {
                    continue;
                }
                let score = alpha.weigh(bin.cores() as f64, bin.memory() as f64) / bin.kind(catalog).hourly_cost;
                if best.is_none_or(|(_, s)| score > s) {
                    best = Some((i, score));
                }
            }
            if let Some((i, _)) = best {
                bins[i].add(u, cores, memory);
                continue;
            }

            let Some(&id) = ranked.iter().find(|&&id| catalog.get(id).fits(cores, memory)) else {
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
