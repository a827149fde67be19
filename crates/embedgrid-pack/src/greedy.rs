//! First-fit packing with in-place upgrades.
//!
//! Nodes are taken in id order and go to the first open instance with room.
//! Otherwise the most recent instances are considered for an upgrade to the
//! cheapest type holding their contents plus the node; an upgrade is taken
//! when it costs less than keeping the instance and renting a fresh one for
//! the node.

use tracing::{debug, trace};

use embedgrid_core::{PlacementError, PlacementResult, Verification};
use embedgrid_topology::{CloudCatalog, VirtualNetwork};

use crate::PackStrategy;
use crate::bins::{Bin, demand};
use crate::solution::PackingSolution;

#[derive(Debug, Default)]
pub struct GreedyPacking;

impl GreedyPacking {
    pub fn new() -> Self {
        Self
    }
}

impl PackStrategy for GreedyPacking {
    fn name(&self) -> &'static str {
        "greedy"
    }

    fn attempt(&mut self, virtual_net: &VirtualNetwork, catalog: &CloudCatalog) -> PlacementResult<PackingSolution> {
        let mut bins: Vec<Bin> = Vec::new();
        for u in virtual_net.node_ids() {
            let (cores, memory) = demand(virtual_net, u);

            if let Some(bin) = bins.iter_mut().find(|bin| bin.has_room(catalog, cores, memory)) {
                bin.add(u, cores, memory);
                continue;
            }

            let Some(alone) = catalog.cheapest_feasible(cores, memory) else {
                debug!(node = virtual_net.name(u), "no instance type holds the node");
                return Err(PlacementError::Infeasible);
            };
            let alone_cost = catalog.get(alone).hourly_cost;

            let mut upgraded = false;
            for bin in bins.iter_mut().rev() {
                let Some(upgrade) = catalog.cheapest_feasible(bin.cores() + cores, bin.memory() + memory) else {
                    continue;
                };
                if catalog.get(upgrade).hourly_cost < alone_cost + bin.kind(catalog).hourly_cost {
                    trace!(
                        from = %bin.kind(catalog).name,
                        to = %catalog.get(upgrade).name,
                        "upgrading instance"
                    );
                    bin.instance_type = upgrade;
                    bin.add(u, cores, memory);
                    upgraded = true;
                    break;
                }
            }
            if !upgraded {
                let mut bin = Bin::new(alone);
                bin.add(u, cores, memory);
                bins.push(bin);
            }
        }
        PackingSolution::build(virtual_net, catalog, &bins, Verification::Check)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedgrid_topology::InstanceType;

    fn make_catalog() -> CloudCatalog {
        CloudCatalog::new(vec![
            InstanceType {
                name: "t.small".into(),
                cores: 1,
                memory: 2048,
                hourly_cost: 0.1,
            },
            InstanceType {
                name: "t.medium".into(),
                cores: 2,
                memory: 4096,
                hourly_cost: 0.15,
            },
            InstanceType {
                name: "t.large".into(),
                cores: 4,
                memory: 8192,
                hourly_cost: 0.4,
            },
        ])
        .unwrap()
    }

    #[test]
    fn cheap_upgrade_replaces_a_second_instance() {
        let mut b = VirtualNetwork::builder();
        b.add_node("a", 1, 1024).unwrap();
        b.add_node("b", 1, 1024).unwrap();
        let v = b.build().unwrap();
        let s = GreedyPacking::new().attempt(&v, &make_catalog()).unwrap();
        assert_eq!(s.vm_used().len(), 1);
        assert_eq!(s.vm_used()["t.medium"], 1);
        assert_eq!(s.cost(), 0.15);
    }

    #[test]
    fn expensive_upgrade_opens_a_new_instance() {
        let mut b = VirtualNetwork::builder();
        b.add_node("a", 2, 2048).unwrap();
        b.add_node("b", 1, 1024).unwrap();
        let v = b.build().unwrap();
        let s = GreedyPacking::new().attempt(&v, &make_catalog()).unwrap();
        assert_eq!(s.vm_used()["t.medium"], 1);
        assert_eq!(s.vm_used()["t.small"], 1);
        assert_eq!(s.node_info("b").unwrap().index, 1);
    }

    #[test]
    fn oversized_node_is_infeasible() {
        let mut b = VirtualNetwork::builder();
        b.add_node("huge", 1, 10_000).unwrap();
        let v = b.build().unwrap();
        assert_eq!(
            GreedyPacking::new().attempt(&v, &make_catalog()).unwrap_err(),
            PlacementError::Infeasible
        );
    }
}
