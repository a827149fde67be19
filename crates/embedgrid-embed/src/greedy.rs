//! Greedy tree placement.
//!
//! The virtual network is cut recursively into a full partition tree. For
//! each machine count `n`, the tree is walked breadth-first (largest
//! partitions first, skipping partitions already placed) and each partition
//! goes to the first of the `n` largest machines that can take it: enough
//! cores and memory, enough outgoing interface rate for the links leaving
//! the machine, and a route for every link towards an already placed
//! neighbor.

use std::collections::{BTreeSet, VecDeque};

use tracing::debug;

use embedgrid_core::{EmbedConfig, InterfacePolicy, PlacementError, PlacementResult, Resource, Verification};
use embedgrid_partition::{Cutter, Partition, PartitionTree, cutter_for};
use embedgrid_topology::{
    Overlay, PathFinder, PhysId, PhysicalNetwork, RateUsage, RouteHop, VLinkId, VirtId, VirtualNetwork,
};

use crate::EmbedStrategy;
use crate::embedding::Embedding;
use crate::search::{machine_range, rank_machines, widen};
use crate::solution::Solution;

pub struct GreedyEmbedding {
    cutter: Box<dyn Cutter>,
    policy: InterfacePolicy,
    verification: Verification,
}

impl GreedyEmbedding {
    pub fn new(cutter: Box<dyn Cutter>, policy: InterfacePolicy, verification: Verification) -> Self {
        Self {
            cutter,
            policy,
            verification,
        }
    }

    pub fn from_config(config: &EmbedConfig) -> Self {
        let verification = if config.check_solution {
            Verification::Check
        } else {
            Verification::Trust
        };
        Self::new(cutter_for(config.cutter, config.seed), config.path_policy, verification)
    }
}

impl EmbedStrategy for GreedyEmbedding {
    fn name(&self) -> &'static str {
        "greedy"
    }

    fn attempt(&mut self, virtual_net: &VirtualNetwork, physical: &PhysicalNetwork) -> PlacementResult<Solution> {
        let tree = PartitionTree::build(virtual_net, &mut self.cutter, 1);
        debug!(tree_nodes = tree.len(), "partition tree built");
        let ranked = rank_machines(physical, true);
        let finder = PathFinder::new(physical, self.policy);

        widen(self.name(), machine_range(virtual_net, physical), |n| {
            let Some(embedding) = place_tree(virtual_net, &tree, &ranked[..n], &finder) else {
                return Ok(None);
            };
            Solution::build(virtual_net, physical, embedding, self.verification).map(Some)
        })
    }
}

/// Per-attempt bookkeeping.
struct Placement {
    embedding: Embedding,
    cores: Vec<u64>,
    memory: Vec<u64>,
    hosted: Vec<BTreeSet<VirtId>>,
    usage: RateUsage,
}

/// One pass over the tree with `machines` as candidates. `None` if some
/// virtual node could not be placed.
fn place_tree(
    virtual_net: &VirtualNetwork,
    tree: &PartitionTree,
    machines: &[PhysId],
    finder: &PathFinder<'_>,
) -> Option<Embedding> {
    let n_physical = finder.network().number_of_nodes();
    let mut state = Placement {
        embedding: Embedding::new(),
        cores: vec![0; n_physical],
        memory: vec![0; n_physical],
        hosted: vec![BTreeSet::new(); n_physical],
        usage: RateUsage::new(),
    };

    let mut queue = VecDeque::from([tree.root()]);
    while let Some(idx) = queue.pop_front() {
        let node = tree.node(idx);
        if node.partition.members().iter().all(|&v| state.embedding.is_assigned(v)) {
            continue;
        }
        for &machine in machines {
            match try_machine(virtual_net, finder, &state, &node.partition, node.cores, node.memory, machine) {
                Ok(routes) => {
                    commit(virtual_net, &mut state, &node.partition, node.cores, node.memory, machine, routes);
                    break;
                }
                Err(err) => debug!(machine = %finder.network().name(machine), error = %err, "partition rejected"),
            }
        }
        if let Some(children) = tree.children(idx) {
            queue.extend(children);
        }
    }

    (state.embedding.len() == virtual_net.number_of_nodes()).then_some(state.embedding)
}

/// Check whether `partition` fits on `machine` and route its links towards
/// already placed neighbors. Nothing is committed.
fn try_machine(
    virtual_net: &VirtualNetwork,
    finder: &PathFinder<'_>,
    state: &Placement,
    partition: &Partition,
    cores: u64,
    memory: u64,
    machine: PhysId,
) -> PlacementResult<Vec<(VLinkId, Vec<RouteHop>)>> {
    let physical = finder.network();
    let node = physical.node(machine);
    let m = machine.index();
    let used_cores = state.cores[m] + cores;
    if used_cores > u64::from(node.cores) {
        return Err(PlacementError::NodeResource {
            node: node.name.clone(),
            resource: Resource::Cores,
            used: used_cores,
            max: u64::from(node.cores),
        });
    }
    let used_memory = state.memory[m] + memory;
    if used_memory > u64::from(node.memory) {
        return Err(PlacementError::NodeResource {
            node: node.name.clone(),
            resource: Resource::Memory,
            used: used_memory,
            max: u64::from(node.memory),
        });
    }

    let outgoing = outgoing_rate(virtual_net, partition, &state.hosted[m]);
    if outgoing > physical.rate_out(machine) {
        return Err(PlacementError::LinkCapacity {
            link: format!("outgoing interfaces of {}", node.name),
            used: outgoing,
            max: physical.rate_out(machine),
        });
    }

    let mut tentative = RateUsage::new();
    let mut routes = Vec::new();
    for &u in partition.members() {
        for &(v, link) in virtual_net.neighbors(u) {
            if partition.contains(v) {
                continue;
            }
            let Some(other) = state.embedding.node(v) else {
                continue;
            };
            if other == machine {
                continue;
            }
            let rate = u64::from(virtual_net.req_rate(link));
            let usage = Overlay::new(&state.usage, &tentative);
            // Routes run from the host of ends[0] to the host of ends[1].
            let hops = if virtual_net.link(link).ends[0] == u {
                finder.find_path(machine, other, rate, &usage)?
            } else {
                finder.find_path(other, machine, rate, &usage)?
            };
            for hop in &hops {
                tentative.add(hop.channel, rate);
            }
            routes.push((link, hops));
        }
    }
    Ok(routes)
}

/// Total rate of the virtual links leaving `partition ∪ hosted`.
fn outgoing_rate(virtual_net: &VirtualNetwork, partition: &Partition, hosted: &BTreeSet<VirtId>) -> u64 {
    let inside = |v: VirtId| partition.contains(v) || hosted.contains(&v);
    partition
        .members()
        .iter()
        .chain(hosted.iter())
        .flat_map(|&u| virtual_net.neighbors(u).iter())
        .filter(|&&(v, _)| !inside(v))
        .map(|&(_, link)| u64::from(virtual_net.req_rate(link)))
        .sum()
}

fn commit(
    virtual_net: &VirtualNetwork,
    state: &mut Placement,
    partition: &Partition,
    cores: u64,
    memory: u64,
    machine: PhysId,
    routes: Vec<(VLinkId, Vec<RouteHop>)>,
) {
    for (link, hops) in routes {
        let rate = u64::from(virtual_net.req_rate(link));
        for hop in &hops {
            state.usage.add(hop.channel, rate);
        }
        state.embedding.set_route(link, hops);
    }
    for &v in partition.members() {
        state.embedding.assign(v, machine);
        state.hosted[machine.index()].insert(v);
    }
    state.cores[machine.index()] += cores;
    state.memory[machine.index()] += memory;
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedgrid_core::SolutionStatus;
    use embedgrid_partition::KernighanLin;
    use embedgrid_topology::generators::{fat_tree, physical_test_network, star_cluster, virtual_test_network};

    fn make_greedy(verification: Verification) -> GreedyEmbedding {
        GreedyEmbedding::new(Box::new(KernighanLin::default()), InterfacePolicy::FirstFit, verification)
    }

    #[test]
    fn outgoing_rate_counts_links_leaving_the_machine() {
        let v = virtual_test_network(1, 1, 700).unwrap();
        let a = v.lookup("Node_0").unwrap();
        let b = v.lookup("Node_1").unwrap();
        let part = Partition::new(vec![a]);
        assert_eq!(outgoing_rate(&v, &part, &BTreeSet::new()), 700);
        assert_eq!(outgoing_rate(&v, &part, &BTreeSet::from([b])), 0);
    }

    #[test]
    fn colocates_when_one_machine_suffices() {
        let v = virtual_test_network(1, 1000, 50_000).unwrap();
        let p = physical_test_network(4, 4000, 10_000, false).unwrap();
        let outcome = make_greedy(Verification::Check).solve(&v, &p);
        assert_eq!(outcome.status, SolutionStatus::Solved);
        let s = outcome.solution.unwrap();
        assert_eq!(s.n_machines_used(), 1);
        assert!(s.link_info("Node_0", "Node_1").is_empty());
    }

    #[test]
    fn rejects_links_no_single_interface_carries() {
        let v = virtual_test_network(3, 3000, 20_000).unwrap();
        let p = physical_test_network(4, 4000, 10_000, false).unwrap();
        let outcome = make_greedy(Verification::Trust).solve(&v, &p);
        assert_eq!(outcome.status, SolutionStatus::Infeasible);
    }

    #[test]
    fn trusted_fat_tree_placement_still_verifies() {
        let v = fat_tree(4, 2, 2, 8000, 200).unwrap();
        let p = star_cluster(10, 16, 64_000, 2, 10_000, false).unwrap();
        let s = make_greedy(Verification::Trust).attempt(&v, &p).unwrap();
        assert_eq!(crate::verify::verify_embedding(&v, &p, s.embedding()), Ok(()));
        assert!(s.n_machines_used() >= crate::search::lower_bound(&v, &p));
    }
}
