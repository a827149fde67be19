//! First-fit ordered deviation.
//!
//! Balanced items (memory close to `1000 * cores`) are packed first. Each
//! item either opens the cheapest new instance, charged by the share of it
//! the item fills, or extends an open instance, charged by how far the
//! extension skews the instance's cores/memory balance. The cheaper option
//! wins; ties go to the open instance.

use std::cmp::Ordering;

use tracing::debug;

use embedgrid_core::{PlacementError, PlacementResult, Verification};
use embedgrid_topology::{CloudCatalog, InstanceType, InstanceTypeId, VirtId, VirtualNetwork};

use crate::PackStrategy;
use crate::bins::{Bin, demand};
use crate::solution::PackingSolution;

#[derive(Debug, Default)]
pub struct FirstFitOrderedDeviation;

impl FirstFitOrderedDeviation {
    pub fn new() -> Self {
        Self
    }
}

fn skew(cores: u64, memory: u64) -> f64 {
    let (c, m) = (1000.0 * cores as f64, memory as f64);
    (m - c).abs() / (m + c)
}

/// Virtual nodes by increasing skew, ties in id order.
fn by_increasing_skew(virtual_net: &VirtualNetwork) -> Vec<VirtId> {
    let mut items: Vec<(VirtId, f64)> = virtual_net
        .node_ids()
        .map(|v| {
            let (cores, memory) = demand(virtual_net, v);
            (v, skew(cores, memory))
        })
        .collect();
    items.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal));
    items.into_iter().map(|(v, _)| v).collect()
}

/// Cost of a fresh instance of type `t` holding only the item.
fn new_cost(t: &InstanceType, cores: u64, memory: u64) -> f64 {
    let rc = cores as f64 / f64::from(t.cores);
    let rm = memory as f64 / f64::from(t.memory);
    t.hourly_cost * rc.max(rm)
}

/// Cost of adding the item to `bin`, penalizing a worse cores/memory balance.
fn extension_cost(t: &InstanceType, bin: &Bin, cores: u64, memory: u64) -> f64 {
    let rc = cores as f64 / f64::from(t.cores);
    let rm = memory as f64 / f64::from(t.memory);
    let uc = bin.cores() as f64 / f64::from(t.cores);
    let um = bin.memory() as f64 / f64::from(t.memory);
    let share = if uc > um {
        rc.max(rm - uc + um)
    } else {
        rm.max(rc + uc - um)
    };
    t.hourly_cost * share
}

impl PackStrategy for FirstFitOrderedDeviation {
    fn name(&self) -> &'static str {
        "first_fit_ordered_deviation"
    }

    fn attempt(&mut self, virtual_net: &VirtualNetwork, catalog: &CloudCatalog) -> PlacementResult<PackingSolution> {
        let mut bins: Vec<Bin> = Vec::new();
        for u in by_increasing_skew(virtual_net) {
            let (cores, memory) = demand(virtual_net, u);

            let mut fresh: Option<(InstanceTypeId, f64)> = None;
            for (id, t) in catalog.types() {
                if !t.fits(cores, memory) {
                    continue;
                }
                let cost = new_cost(t, cores, memory);
                if fresh.is_none_or(|(_, c)| cost < c) {
                    fresh = Some((id, cost));
                }
            }
            let Some((fresh_type, fresh_cost)) = fresh else {
                debug!(node = virtual_net.name(u), "no instance type holds the node");
                return Err(PlacementError::Infeasible);
            };

            let mut open: Option<(usize, f64)> = None;
            for (i, bin) in bins.iter().enumerate() {
                if !bin.has_room(catalog, cores, memory) {
                    continue;
                }
                let cost = extension_cost(bin.kind(catalog), bin, cores, memory);
                if open.is_none_or(|(_, c)| cost < c) {
                    open = Some((i, cost));
                }
            }

            match open {
                Some((i, cost)) if cost <= fresh_cost => bins[i].add(u, cores, memory),
                _ => {
                    let mut bin = Bin::new(fresh_type);
                    bin.add(u, cores, memory);
                    bins.push(bin);
                }
            }
        }
        PackingSolution::build(virtual_net, catalog, &bins, Verification::Check)
    }
}
