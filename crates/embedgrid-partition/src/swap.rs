//! Swap-based local search.
//!
//! Nodes are dealt round-robin into `k` bins over a random order, then a
//! fixed number of random swaps between bins is tried; a swap is kept only
//! if it strictly lowers the total rate of links crossing bins. Bin sizes
//! never change, so every bin stays non-empty.

use embedgrid_topology::{VirtId, VirtualNetwork};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use tracing::debug;

use crate::error::PartitionResult;
use crate::partition::Partition;
use crate::{Partitioner, check_parts};

#[derive(Debug)]
pub struct SwapPartitioner {
    n_swaps: usize,
    rng: StdRng,
}

impl SwapPartitioner {
    pub fn new(n_swaps: usize, seed: u64) -> Self {
        Self {
            n_swaps,
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

/// Rate of the links at `node` that cross bins.
fn crossing_rate(network: &VirtualNetwork, bins: &[usize], node: VirtId) -> u64 {
    network
        .neighbors(node)
        .iter()
        .filter(|(other, _)| bins[other.index()] != bins[node.index()])
        .map(|&(_, link)| u64::from(network.req_rate(link)))
        .sum()
}

/// Total rate of links crossing bins.
pub fn cut_cost(network: &VirtualNetwork, bins: &[usize]) -> u64 {
    network
        .links()
        .filter(|(_, l)| bins[l.ends[0].index()] != bins[l.ends[1].index()])
        .map(|(_, l)| u64::from(l.req_rate))
        .sum()
}

impl Partitioner for SwapPartitioner {
    fn partition(&mut self, network: &VirtualNetwork, k: usize) -> PartitionResult<Vec<Partition>> {
        check_parts(network, k)?;
        let n = network.number_of_nodes();

        let mut order: Vec<VirtId> = network.node_ids().collect();
        order.shuffle(&mut self.rng);
        let mut bins = vec![0usize; n];
        for (i, v) in order.iter().enumerate() {
            bins[v.index()] = i % k;
        }

        let mut accepted = 0;
        if n >= 2 {
            for _ in 0..self.n_swaps {
                let u1 = VirtId(self.rng.random_range(0..n));
                let u2 = VirtId(self.rng.random_range(0..n));
                if bins[u1.index()] == bins[u2.index()] {
                    continue;
                }
                // Only links at u1 and u2 change side. A link between them
                // crosses both before and after, so counting it twice is fine.
                let before = crossing_rate(network, &bins, u1) + crossing_rate(network, &bins, u2);
                bins.swap(u1.index(), u2.index());
                let after = crossing_rate(network, &bins, u1) + crossing_rate(network, &bins, u2);
                if after < before {
                    accepted += 1;
                } else {
                    bins.swap(u1.index(), u2.index());
                }
            }
        }

        let mut parts: Vec<Vec<VirtId>> = vec![Vec::new(); k];
        for v in network.node_ids() {
            parts[bins[v.index()]].push(v);
        }
        debug!(k, accepted, cost = cut_cost(network, &bins), "swap partitioning done");
        Ok(parts.into_iter().map(Partition::new).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedgrid_topology::generators::fat_tree;

    #[test]
    fn swaps_never_increase_cut_cost() {
        let net = fat_tree(4, 2, 1, 1, 10).unwrap();
        let k = 4;
        let baseline = {
            let mut p = SwapPartitioner::new(0, 9);
            let parts = p.partition(&net, k).unwrap();
            cost_of(&net, &parts)
        };
        let mut p = SwapPartitioner::new(500, 9);
        let parts = p.partition(&net, k).unwrap();
        assert!(cost_of(&net, &parts) <= baseline);
    }

    #[test]
    fn bins_keep_round_robin_sizes() {
        let net = fat_tree(4, 2, 1, 1, 10).unwrap();
        let mut p = SwapPartitioner::new(100, 1);
        let parts = p.partition(&net, 5).unwrap();
        let mut sizes: Vec<usize> = parts.iter().map(Partition::len).collect();
        sizes.sort();
        assert_eq!(sizes, vec![7, 7, 7, 7, 8]);
    }

    #[test]
    fn same_seed_same_partition() {
        let net = fat_tree(4, 2, 1, 1, 10).unwrap();
        let a = SwapPartitioner::new(100, 42).partition(&net, 3).unwrap();
        let b = SwapPartitioner::new(100, 42).partition(&net, 3).unwrap();
        assert_eq!(a, b);
    }

    fn cost_of(net: &VirtualNetwork, parts: &[Partition]) -> u64 {
        let mut bins = vec![0; net.number_of_nodes()];
        for (i, p) in parts.iter().enumerate() {
            for v in p.members() {
                bins[v.index()] = i;
            }
        }
        cut_cost(net, &bins)
    }
}
