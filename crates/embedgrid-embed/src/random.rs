//! Seeded random placement with whole-attempt restarts.
//!
//! Each virtual node goes to a compute node drawn uniformly at random; each
//! cross-machine link follows the capacity-free route between its hosts with
//! a random interface, among those still able to carry it, on every hop. Any
//! overrun discards the whole attempt. There is no widening schedule: the
//! strategy restarts until it succeeds or `max_attempts` is spent.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info, warn};

use embedgrid_core::{EmbedConfig, InterfacePolicy, PlacementError, PlacementResult, Resource, Verification};
use embedgrid_topology::{
    Channel, PathFinder, PhysId, PhysicalNetwork, RateUsage, RouteCache, UsageView, VirtualNetwork,
};

use crate::EmbedStrategy;
use crate::embedding::Embedding;
use crate::search::machine_range;
use crate::solution::Solution;

pub struct RandomEmbedding {
    rng: StdRng,
    max_attempts: Option<u64>,
}

impl RandomEmbedding {
    pub fn new(seed: u64, max_attempts: Option<u64>) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            max_attempts,
        }
    }

    /// `path_policy` does not apply: interfaces are drawn at random.
    pub fn from_config(config: &EmbedConfig) -> Self {
        if config.path_policy != InterfacePolicy::FirstFit {
            debug!(policy = %config.path_policy, "random strategy ignores path_policy");
        }
        Self::new(config.seed, config.max_attempts)
    }
}

impl EmbedStrategy for RandomEmbedding {
    fn name(&self) -> &'static str {
        "random"
    }

    fn attempt(&mut self, virtual_net: &VirtualNetwork, physical: &PhysicalNetwork) -> PlacementResult<Solution> {
        // Restarting cannot help when the request exceeds the whole substrate.
        if machine_range(virtual_net, physical).is_empty() {
            warn!(strategy = "random", "request does not fit the substrate");
            return Err(PlacementError::Infeasible);
        }

        let mut compute = physical.compute_nodes().to_vec();
        compute.sort_by(|&a, &b| physical.name(a).cmp(physical.name(b)));
        let finder = PathFinder::new(physical, InterfacePolicy::FirstFit);
        let mut routes = RouteCache::new();

        let mut restarts = 0u64;
        loop {
            if self.max_attempts.is_some_and(|cap| restarts >= cap) {
                warn!(strategy = "random", restarts, "restart budget spent");
                return Err(PlacementError::Infeasible);
            }
            match draw(virtual_net, &finder, &compute, &mut routes, &mut self.rng) {
                Ok(embedding) => {
                    let solution = Solution::build(virtual_net, physical, embedding, Verification::Check)?;
                    info!(strategy = "random", restarts, used = solution.n_machines_used(), "placement found");
                    return Ok(solution);
                }
                Err(err) if err.is_attempt_local() => {
                    debug!(strategy = "random", restarts, error = %err, "attempt rejected, restarting");
                    restarts += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

/// One random placement. Fails on the first capacity overrun.
fn draw<R: Rng>(
    virtual_net: &VirtualNetwork,
    finder: &PathFinder<'_>,
    compute: &[PhysId],
    routes: &mut RouteCache,
    rng: &mut R,
) -> PlacementResult<Embedding> {
    let physical = finder.network();
    let mut embedding = Embedding::new();
    let mut cores = vec![0u64; physical.number_of_nodes()];
    let mut memory = vec![0u64; physical.number_of_nodes()];

    for v in virtual_net.node_ids() {
        let p = compute[rng.random_range(0..compute.len())];
        embedding.assign(v, p);
        let node = physical.node(p);
        cores[p.index()] += u64::from(virtual_net.req_cores(v));
        if cores[p.index()] > u64::from(node.cores) {
            return Err(PlacementError::NodeResource {
                node: node.name.clone(),
                resource: Resource::Cores,
                used: cores[p.index()],
                max: u64::from(node.cores),
            });
        }
        memory[p.index()] += u64::from(virtual_net.req_memory(v));
        if memory[p.index()] > u64::from(node.memory) {
            return Err(PlacementError::NodeResource {
                node: node.name.clone(),
                resource: Resource::Memory,
                used: memory[p.index()],
                max: u64::from(node.memory),
            });
        }
    }

    let mut usage = RateUsage::new();
    for (link, vlink) in virtual_net.links() {
        let (Some(a), Some(b)) = (embedding.node(vlink.ends[0]), embedding.node(vlink.ends[1])) else {
            continue;
        };
        if a == b {
            continue;
        }
        let rate = u64::from(vlink.req_rate);
        let mut hops = Vec::new();
        for step in routes.route(finder, a, b)? {
            let feasible: Vec<_> = physical
                .interfaces(step.link)
                .iter()
                .filter(|iface| iface.rate >= usage.used(Channel::new(step.link, iface.id)) + rate)
                .map(|iface| iface.id)
                .collect();
            if feasible.is_empty() {
                let channel = Channel::new(step.link, physical.interfaces(step.link)[0].id);
                return Err(PlacementError::LinkCapacity {
                    link: physical.describe_channel(channel),
                    used: usage.used(channel) + rate,
                    max: physical.rate(channel),
                });
            }
            let chosen = feasible[rng.random_range(0..feasible.len())];
            usage.add(Channel::new(step.link, chosen), rate);
            hops.push(step.with_interface(chosen));
        }
        embedding.set_route(link, hops);
    }

    Ok(embedding)
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedgrid_core::SolutionStatus;
    use embedgrid_topology::generators::{physical_test_network, random_network, star_cluster, virtual_test_network};

    #[test]
    fn same_seed_same_mapping() {
        let v = random_network(12, 0.3, 1, 1000, 10, 7).unwrap();
        let p = star_cluster(6, 4, 8000, 2, 1000, false).unwrap();
        let a = RandomEmbedding::new(3, None).attempt(&v, &p).unwrap();
        let b = RandomEmbedding::new(3, None).attempt(&v, &p).unwrap();
        assert_eq!(a.node_mapping(), b.node_mapping());
    }

    #[test]
    fn oversized_request_fails_without_looping() {
        let v = virtual_test_network(8, 3000, 10).unwrap();
        let p = physical_test_network(4, 4000, 10_000, false).unwrap();
        let outcome = RandomEmbedding::new(1, None).solve(&v, &p);
        assert_eq!(outcome.status, SolutionStatus::Infeasible);
    }

    #[test]
    fn restart_cap_bounds_the_search() {
        let v = virtual_test_network(3, 3000, 20_000).unwrap();
        let p = physical_test_network(4, 4000, 10_000, false).unwrap();
        let outcome = RandomEmbedding::new(1, Some(25)).solve(&v, &p);
        assert_eq!(outcome.status, SolutionStatus::Infeasible);
    }

    #[test]
    fn grouped_links_are_split_after_a_random_draw() {
        let v = virtual_test_network(3, 3000, 20_000).unwrap();
        let p = physical_test_network(4, 4000, 10_000, true).unwrap();
        let s = RandomEmbedding::new(66, Some(1000)).attempt(&v, &p).unwrap();
        let maps = s.link_info("Node_0", "Node_1");
        assert_eq!(maps.len(), 2);
        assert!(maps.iter().all(|m| (m.fraction - 0.5).abs() < 1e-9));
    }
}
