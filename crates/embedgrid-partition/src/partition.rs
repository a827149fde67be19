//! Partitions and the partition tree.

use std::collections::VecDeque;

use embedgrid_topology::{VirtId, VirtualNetwork};

use crate::cut::Cutter;

/// An immutable set of virtual nodes, stored sorted.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Partition {
    members: Vec<VirtId>,
}

impl Partition {
    pub fn new(mut members: Vec<VirtId>) -> Self {
        members.sort_unstable();
        members.dedup();
        Self { members }
    }

    pub fn members(&self) -> &[VirtId] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn contains(&self, node: VirtId) -> bool {
        self.members.binary_search(&node).is_ok()
    }

    pub fn union(&self, other: &Partition) -> Partition {
        let mut members = self.members.clone();
        members.extend_from_slice(&other.members);
        Partition::new(members)
    }

    pub fn cores(&self, network: &VirtualNetwork) -> u64 {
        self.members.iter().map(|&v| u64::from(network.req_cores(v))).sum()
    }

    pub fn memory(&self, network: &VirtualNetwork) -> u64 {
        self.members.iter().map(|&v| u64::from(network.req_memory(v))).sum()
    }
}

impl FromIterator<VirtId> for Partition {
    fn from_iter<I: IntoIterator<Item = VirtId>>(iter: I) -> Self {
        Partition::new(iter.into_iter().collect())
    }
}

/// Position of a node in a [`PartitionTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TreeIndex(usize);

#[derive(Debug, Clone)]
pub struct TreeNode {
    pub partition: Partition,
    /// Aggregate demand of the partition.
    pub cores: u64,
    pub memory: u64,
    pub parent: Option<TreeIndex>,
    children: Option<[TreeIndex; 2]>,
}

/// Binary tree of partitions built by recursive two-way cuts. The root
/// holds every node; the two children of a node split its partition.
#[derive(Debug, Clone)]
pub struct PartitionTree {
    nodes: Vec<TreeNode>,
}

impl PartitionTree {
    /// A single-node tree holding the whole network.
    pub fn root_only(network: &VirtualNetwork) -> Self {
        let partition: Partition = network.node_ids().collect();
        let root = TreeNode {
            cores: network.total_cores(),
            memory: network.total_memory(),
            partition,
            parent: None,
            children: None,
        };
        Self { nodes: vec![root] }
    }

    /// Cut recursively until every leaf holds at most `threshold` nodes.
    pub fn build<C: Cutter + ?Sized>(network: &VirtualNetwork, cutter: &mut C, threshold: usize) -> Self {
        let mut tree = Self::root_only(network);
        tree.refine(network, cutter, threshold);
        tree
    }

    /// Cut every leaf larger than `threshold`, recursively. Existing cuts
    /// are kept, so refining with a smaller threshold only deepens the tree.
    pub fn refine<C: Cutter + ?Sized>(&mut self, network: &VirtualNetwork, cutter: &mut C, threshold: usize) {
        let threshold = threshold.max(1);
        let mut pending: Vec<TreeIndex> = self.leaf_indices();
        while let Some(idx) = pending.pop() {
            if self.nodes[idx.0].partition.len() <= threshold {
                continue;
            }
            let [left, right] = self.split(network, cutter, idx);
            pending.push(left);
            pending.push(right);
        }
    }

    /// Cut leaf `idx` in two and return the new children.
    pub fn split<C: Cutter + ?Sized>(&mut self, network: &VirtualNetwork, cutter: &mut C, idx: TreeIndex) -> [TreeIndex; 2] {
        assert!(self.nodes[idx.0].children.is_none(), "tree node already split");
        let (a, b) = cutter.cut(network, self.nodes[idx.0].partition.members());
        let mut children = [idx; 2];
        for (slot, members) in [a, b].into_iter().enumerate() {
            let partition = Partition::new(members);
            let child = TreeNode {
                cores: partition.cores(network),
                memory: partition.memory(network),
                partition,
                parent: Some(idx),
                children: None,
            };
            children[slot] = TreeIndex(self.nodes.len());
            self.nodes.push(child);
        }
        self.nodes[idx.0].children = Some(children);
        children
    }

    pub fn root(&self) -> TreeIndex {
        TreeIndex(0)
    }

    pub fn node(&self, idx: TreeIndex) -> &TreeNode {
        &self.nodes[idx.0]
    }

    pub fn children(&self, idx: TreeIndex) -> Option<[TreeIndex; 2]> {
        self.nodes[idx.0].children
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Leaves, left to right.
    pub fn leaf_indices(&self) -> Vec<TreeIndex> {
        let mut leaves = Vec::new();
        let mut stack = vec![self.root()];
        while let Some(idx) = stack.pop() {
            match self.children(idx) {
                Some([l, r]) => {
                    stack.push(r);
                    stack.push(l);
                }
                None => leaves.push(idx),
            }
        }
        leaves
    }

    pub fn leaves(&self) -> Vec<Partition> {
        self.leaf_indices()
            .into_iter()
            .map(|idx| self.nodes[idx.0].partition.clone())
            .collect()
    }

    /// Every node in breadth-first order: larger partitions before their
    /// sub-partitions.
    pub fn bfs(&self) -> Vec<TreeIndex> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut queue = VecDeque::from([self.root()]);
        while let Some(idx) = queue.pop_front() {
            order.push(idx);
            if let Some([l, r]) = self.children(idx) {
                queue.push_back(l);
                queue.push_back(r);
            }
        }
        order
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cut::KernighanLin;
    use embedgrid_topology::generators::fat_tree;

    #[test]
    fn partition_is_sorted_and_deduplicated() {
        let p = Partition::new(vec![VirtId(3), VirtId(1), VirtId(3)]);
        assert_eq!(p.members(), &[VirtId(1), VirtId(3)]);
        assert!(p.contains(VirtId(3)));
        assert!(!p.contains(VirtId(2)));
    }

    #[test]
    fn build_respects_threshold_and_aggregates() {
        let net = fat_tree(4, 2, 2, 8000, 200).unwrap();
        let tree = PartitionTree::build(&net, &mut KernighanLin::default(), 5);
        let leaves = tree.leaves();
        assert!(leaves.iter().all(|p| p.len() <= 5 && !p.is_empty()));
        assert_eq!(leaves.iter().map(Partition::len).sum::<usize>(), 36);
        let root = tree.node(tree.root());
        assert_eq!(root.cores, 72);
        assert_eq!(root.memory, 36 * 8000);
    }

    #[test]
    fn refine_only_deepens() {
        let net = fat_tree(4, 2, 1, 1, 1).unwrap();
        let mut cutter = KernighanLin::default();
        let mut tree = PartitionTree::build(&net, &mut cutter, 18);
        let before = tree.len();
        let first_leaves = tree.leaves();
        tree.refine(&net, &mut cutter, 9);
        assert!(tree.len() > before);
        // every new leaf is inside some old leaf
        for leaf in tree.leaves() {
            assert!(first_leaves.iter().any(|old| leaf.members().iter().all(|v| old.contains(*v))));
        }
    }

    #[test]
    fn bfs_visits_parents_before_children() {
        let net = fat_tree(2, 2, 1, 1, 1).unwrap();
        let tree = PartitionTree::build(&net, &mut KernighanLin::default(), 1);
        let order = tree.bfs();
        assert_eq!(order.len(), tree.len());
        assert_eq!(order[0], tree.root());
        let sizes: Vec<usize> = order.iter().map(|&i| tree.node(i).partition.len()).collect();
        assert_eq!(sizes[0], net.number_of_nodes());
    }
}
