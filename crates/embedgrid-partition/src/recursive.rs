//! Recursive k-way partitioning with a refinement cache.
//!
//! The network is cut recursively until every part holds at most
//! `ceil(N / k)` nodes. The resulting tree is cached per partitioner,
//! keyed by the network fingerprint; a later request for a larger `k` only
//! cuts the leaves that exceed the new threshold. Overshoot is repaired by
//! merging the two smallest parts, undershoot by cutting the largest.

use embedgrid_topology::VirtualNetwork;
use tracing::debug;

use crate::cut::Cutter;
use crate::error::PartitionResult;
use crate::partition::{Partition, PartitionTree};
use crate::{Partitioner, check_parts};

#[derive(Debug)]
struct CachedTree {
    fingerprint: String,
    tree: PartitionTree,
}

pub struct RecursivePartitioner<C> {
    cutter: C,
    cache: Option<CachedTree>,
}

impl<C: Cutter> RecursivePartitioner<C> {
    pub fn new(cutter: C) -> Self {
        Self { cutter, cache: None }
    }

    /// The cached tree for `network`, refined to `threshold`.
    fn tree_for(&mut self, network: &VirtualNetwork, threshold: usize) -> &PartitionTree {
        let stale = self
            .cache
            .as_ref()
            .is_none_or(|c| c.fingerprint != network.fingerprint());
        if stale {
            debug!(fingerprint = network.fingerprint(), "partition cache miss");
            self.cache = None;
        }
        let cached = self.cache.get_or_insert_with(|| CachedTree {
            fingerprint: network.fingerprint().to_string(),
            tree: PartitionTree::root_only(network),
        });
        cached.tree.refine(network, &mut self.cutter, threshold);
        &cached.tree
    }
}

impl<C: Cutter> Partitioner for RecursivePartitioner<C> {
    fn partition(&mut self, network: &VirtualNetwork, k: usize) -> PartitionResult<Vec<Partition>> {
        check_parts(network, k)?;
        let threshold = network.number_of_nodes().div_ceil(k);
        let mut parts = self.tree_for(network, threshold).leaves();

        while parts.len() > k {
            // stable: among equal sizes the later parts merge first
            parts.sort_by(|a, b| b.len().cmp(&a.len()));
            let (Some(smallest), Some(next)) = (parts.pop(), parts.pop()) else {
                break;
            };
            parts.push(smallest.union(&next));
        }

        while parts.len() < k {
            let Some(largest) = (0..parts.len())
                .filter(|&i| parts[i].len() >= 2)
                .max_by(|&a, &b| parts[a].len().cmp(&parts[b].len()).then(b.cmp(&a)))
            else {
                break;
            };
            let part = parts.swap_remove(largest);
            let (left, right) = self.cutter.cut(network, part.members());
            parts.push(Partition::new(left));
            parts.push(Partition::new(right));
        }

        debug!(k, threshold, parts = parts.len(), "recursive partitioning done");
        Ok(parts)
    }
}
