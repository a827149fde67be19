//! Partition-driven placement: split the request into `n` parts, put part
//! `i` on target machine `i`, then route every cross-machine link.
//!
//! The k-balanced strategy partitions with recursive cuts (balanced
//! bisection by default, cached across machine counts); the partition
//! strategy uses swap-based local search.

use rand::SeedableRng;
use rand::rngs::StdRng;

use embedgrid_core::{
    EmbedConfig, InterfacePolicy, MachineSelection, PlacementError, PlacementResult, Resource, Verification,
};
use embedgrid_partition::{Cutter, Partition, Partitioner, RecursivePartitioner, SwapPartitioner, cutter_for};
use embedgrid_topology::{PathFinder, PhysId, PhysicalNetwork, RateUsage, VirtualNetwork};

use crate::EmbedStrategy;
use crate::embedding::Embedding;
use crate::search::{machine_range, rank_machines, select_machines, widen};
use crate::solution::Solution;

pub struct PartitionedEmbedding<P> {
    name: &'static str,
    partitioner: P,
    policy: InterfacePolicy,
    selection: MachineSelection,
    rng: StdRng,
}

impl<P: Partitioner> PartitionedEmbedding<P> {
    pub fn new(
        name: &'static str,
        partitioner: P,
        policy: InterfacePolicy,
        selection: MachineSelection,
        seed: u64,
    ) -> Self {
        Self {
            name,
            partitioner,
            policy,
            selection,
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

/// Recursive-cut partitioning with the configured cutter.
pub fn k_balanced(config: &EmbedConfig) -> PartitionedEmbedding<RecursivePartitioner<Box<dyn Cutter>>> {
    PartitionedEmbedding::new(
        "k_balanced",
        RecursivePartitioner::new(cutter_for(config.cutter, config.seed)),
        config.path_policy,
        config.machine_selection,
        config.seed,
    )
}

/// Swap local-search partitioning.
pub fn swap_partition(config: &EmbedConfig) -> PartitionedEmbedding<SwapPartitioner> {
    PartitionedEmbedding::new(
        "partition",
        SwapPartitioner::new(config.n_swaps, config.seed),
        config.path_policy,
        config.machine_selection,
        config.seed,
    )
}

impl<P: Partitioner> EmbedStrategy for PartitionedEmbedding<P> {
    fn name(&self) -> &'static str {
        self.name
    }

    fn attempt(&mut self, virtual_net: &VirtualNetwork, physical: &PhysicalNetwork) -> PlacementResult<Solution> {
        let ranked = rank_machines(physical, false);
        let finder = PathFinder::new(physical, self.policy);
        let Self {
            name,
            partitioner,
            selection,
            rng,
            ..
        } = self;

        widen(name, machine_range(virtual_net, physical), |n| {
            let parts = partitioner
                .partition(virtual_net, n)
                .map_err(|err| PlacementError::InvalidInput(err.to_string()))?;
            let machines = select_machines(&ranked, n, *selection, rng);
            let embedding = place_parts(virtual_net, &finder, &machines, &parts)?;
            Solution::build(virtual_net, physical, embedding, Verification::Check).map(Some)
        })
    }
}

/// Assign `parts[i]` to `machines[i]`, checking cumulative cores and memory,
/// then route every cross-machine link in link order.
pub fn place_parts(
    virtual_net: &VirtualNetwork,
    finder: &PathFinder<'_>,
    machines: &[PhysId],
    parts: &[Partition],
) -> PlacementResult<Embedding> {
    let physical = finder.network();
    let mut embedding = Embedding::new();
    for (&machine, part) in machines.iter().zip(parts) {
        let node = physical.node(machine);
        let (mut cores, mut memory) = (0u64, 0u64);
        for &v in part.members() {
            cores += u64::from(virtual_net.req_cores(v));
            if cores > u64::from(node.cores) {
                return Err(PlacementError::NodeResource {
                    node: node.name.clone(),
                    resource: Resource::Cores,
                    used: cores,
                    max: u64::from(node.cores),
                });
            }
            memory += u64::from(virtual_net.req_memory(v));
            if memory > u64::from(node.memory) {
                return Err(PlacementError::NodeResource {
                    node: node.name.clone(),
                    resource: Resource::Memory,
                    used: memory,
                    max: u64::from(node.memory),
                });
            }
            embedding.assign(v, machine);
        }
    }
    route_links(virtual_net, finder, &mut embedding)?;
    Ok(embedding)
}

/// Route every cross-machine link of a complete assignment, accumulating
/// channel usage so later links see the capacity earlier ones consumed.
pub fn route_links(
    virtual_net: &VirtualNetwork,
    finder: &PathFinder<'_>,
    embedding: &mut Embedding,
) -> PlacementResult<()> {
    let mut usage = RateUsage::new();
    for (link, vlink) in virtual_net.links() {
        let [u, v] = vlink.ends;
        let (Some(a), Some(b)) = (embedding.node(u), embedding.node(v)) else {
            return Err(PlacementError::Assignment(format!(
                "virtual link {} has an unassigned endpoint",
                virtual_net.describe_link(link)
            )));
        };
        if a == b {
            continue;
        }
        let rate = u64::from(vlink.req_rate);
        let hops = finder.find_path(a, b, rate, &usage)?;
        for hop in &hops {
            usage.add(hop.channel, rate);
        }
        embedding.set_route(link, hops);
    }
    Ok(())
}
