//! embedgrid-partition — split a virtual topology into node groups.
//!
//! Every partitioner maps `(virtual network, k)` to exactly `k` non-empty,
//! pairwise-disjoint node sets covering the whole network.
//!
//! # Components
//!
//! - **`partition`** — immutable node sets and the binary partition tree
//! - **`cut`** — two-way cut procedures: Karger min-cut, Kernighan–Lin bisection
//! - **`recursive`** — recursive k-way partitioner with a refinement cache
//! - **`swap`** — round-robin assignment improved by random swaps

pub mod cut;
pub mod error;
pub mod partition;
pub mod recursive;
pub mod swap;

pub use cut::{Cutter, KargerMinCut, KernighanLin, cutter_for};
pub use error::{PartitionError, PartitionResult};
pub use partition::{Partition, PartitionTree, TreeIndex, TreeNode};
pub use recursive::RecursivePartitioner;
pub use swap::SwapPartitioner;

use embedgrid_topology::VirtualNetwork;

/// A k-way partitioning strategy.
pub trait Partitioner {
    /// Split `network` into exactly `k` parts.
    fn partition(&mut self, network: &VirtualNetwork, k: usize) -> PartitionResult<Vec<Partition>>;
}

/// Reject part counts no partition of `network` can satisfy.
pub(crate) fn check_parts(network: &VirtualNetwork, k: usize) -> PartitionResult<()> {
    if k == 0 {
        return Err(PartitionError::ZeroParts);
    }
    if k > network.number_of_nodes() {
        return Err(PartitionError::TooManyParts {
            k,
            nodes: network.number_of_nodes(),
        });
    }
    Ok(())
}
