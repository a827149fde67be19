//! Two-way cut procedures.
//!
//! A [`Cutter`] splits a set of at least two virtual nodes into two
//! non-empty halves, trying to keep heavy (high-rate) links inside a half.

use std::collections::HashMap;

use embedgrid_core::CutterKind;
use embedgrid_topology::{VirtId, VirtualNetwork};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub trait Cutter {
    /// Split `members` (at least two nodes) into two non-empty sets.
    fn cut(&mut self, network: &VirtualNetwork, members: &[VirtId]) -> (Vec<VirtId>, Vec<VirtId>);
}

impl<C: Cutter + ?Sized> Cutter for Box<C> {
    fn cut(&mut self, network: &VirtualNetwork, members: &[VirtId]) -> (Vec<VirtId>, Vec<VirtId>) {
        (**self).cut(network, members)
    }
}

/// Build the cutter selected in configuration.
pub fn cutter_for(kind: CutterKind, seed: u64) -> Box<dyn Cutter> {
    match kind {
        CutterKind::MinCut => Box::new(KargerMinCut::new(seed)),
        CutterKind::Bisection => Box::new(KernighanLin::default()),
    }
}

/// Links with both ends in `members`, as local index pairs with their rate.
fn induced_edges(network: &VirtualNetwork, members: &[VirtId]) -> (HashMap<VirtId, usize>, Vec<(usize, usize, u64)>) {
    let local: HashMap<VirtId, usize> = members.iter().enumerate().map(|(i, &v)| (v, i)).collect();
    let mut edges = Vec::new();
    for (i, &v) in members.iter().enumerate() {
        for &(w, link) in network.neighbors(v) {
            match local.get(&w) {
                Some(&j) if i < j => edges.push((i, j, u64::from(network.req_rate(link)))),
                _ => {}
            }
        }
    }
    (local, edges)
}

// ── Karger min-cut ────────────────────────────────────────────────

/// Randomized contraction: edges are contracted in an order sampled
/// without replacement with probability proportional to their rate, until
/// two super-nodes remain. Heavy links are likely contracted early and so
/// rarely end up in the cut.
#[derive(Debug)]
pub struct KargerMinCut {
    rng: StdRng,
}

impl KargerMinCut {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

struct UnionFind {
    parent: Vec<usize>,
    rank: Vec<u8>,
}

impl UnionFind {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
            rank: vec![0; n],
        }
    }

    fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    /// Merge the sets of `a` and `b`; false if they were already one set.
    fn union(&mut self, a: usize, b: usize) -> bool {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra == rb {
            return false;
        }
        match self.rank[ra].cmp(&self.rank[rb]) {
            std::cmp::Ordering::Less => self.parent[ra] = rb,
            std::cmp::Ordering::Greater => self.parent[rb] = ra,
            std::cmp::Ordering::Equal => {
                self.parent[rb] = ra;
                self.rank[ra] += 1;
            }
        }
        true
    }
}

impl Cutter for KargerMinCut {
    fn cut(&mut self, network: &VirtualNetwork, members: &[VirtId]) -> (Vec<VirtId>, Vec<VirtId>) {
        assert!(members.len() >= 2, "cannot cut fewer than two nodes");
        let (_, edges) = induced_edges(network, members);

        // Weighted sampling without replacement: sort by u^(1/w), descending.
        let mut keyed: Vec<(f64, usize)> = edges
            .iter()
            .enumerate()
            .map(|(i, &(_, _, w))| {
                let u: f64 = self.rng.random();
                let key = if w == 0 { 0.0 } else { u.powf(1.0 / w as f64) };
                (key, i)
            })
            .collect();
        keyed.sort_by(|a, b| b.0.total_cmp(&a.0));

        let mut uf = UnionFind::new(members.len());
        let mut components = members.len();
        for (_, i) in keyed {
            if components <= 2 {
                break;
            }
            let (a, b, _) = edges[i];
            if uf.union(a, b) {
                components -= 1;
            }
        }

        // Disconnected leftovers: the first member's component against the rest.
        let anchor = uf.find(0);
        let mut left = Vec::new();
        let mut right = Vec::new();
        for (i, &v) in members.iter().enumerate() {
            if uf.find(i) == anchor {
                left.push(v);
            } else {
                right.push(v);
            }
        }
        (left, right)
    }
}

// ── Kernighan–Lin bisection ───────────────────────────────────────

/// Balanced bisection by Kernighan–Lin pair swaps. The halves differ in
/// size by at most one. Deterministic: the initial split is the first half
/// of `members` against the second.
#[derive(Debug, Clone)]
pub struct KernighanLin {
    pub max_passes: usize,
}

impl Default for KernighanLin {
    fn default() -> Self {
        Self { max_passes: 10 }
    }
}

impl Cutter for KernighanLin {
    fn cut(&mut self, network: &VirtualNetwork, members: &[VirtId]) -> (Vec<VirtId>, Vec<VirtId>) {
        assert!(members.len() >= 2, "cannot cut fewer than two nodes");
        let n = members.len();
        let (_, edges) = induced_edges(network, members);

        let mut adjacency: Vec<Vec<(usize, i64)>> = vec![Vec::new(); n];
        let mut weight: HashMap<(usize, usize), i64> = HashMap::with_capacity(edges.len());
        for &(a, b, w) in &edges {
            let w = w as i64;
            adjacency[a].push((b, w));
            adjacency[b].push((a, w));
            weight.insert((a, b), w);
        }
        let w = |a: usize, b: usize| -> i64 {
            let key = if a < b { (a, b) } else { (b, a) };
            weight.get(&key).copied().unwrap_or(0)
        };

        // side[i]: false = A, true = B
        let mut side: Vec<bool> = (0..n).map(|i| i >= n / 2).collect();

        for _ in 0..self.max_passes {
            let mut d: Vec<i64> = (0..n)
                .map(|i| {
                    adjacency[i]
                        .iter()
                        .map(|&(j, c)| if side[i] != side[j] { c } else { -c })
                        .sum()
                })
                .collect();
            let mut locked = vec![false; n];
            let mut swaps: Vec<(usize, usize)> = Vec::new();
            let mut gains: Vec<i64> = Vec::new();
            let steps = side.iter().filter(|s| !**s).count().min(side.iter().filter(|s| **s).count());

            for _ in 0..steps {
                let mut best: Option<(usize, usize, i64)> = None;
                for a in (0..n).filter(|&a| !locked[a] && !side[a]) {
                    for b in (0..n).filter(|&b| !locked[b] && side[b]) {
                        let gain = d[a] + d[b] - 2 * w(a, b);
                        if best.is_none_or(|(_, _, g)| gain > g) {
                            best = Some((a, b, gain));
                        }
                    }
                }
                let Some((a, b, gain)) = best else { break };
                locked[a] = true;
                locked[b] = true;
                swaps.push((a, b));
                gains.push(gain);
                for (moved, other_side) in [(a, side[b]), (b, side[a])] {
                    for &(x, c) in &adjacency[moved] {
                        if locked[x] {
                            continue;
                        }
                        if side[x] == other_side {
                            d[x] -= 2 * c;
                        } else {
                            d[x] += 2 * c;
                        }
                    }
                }
            }

            // Best prefix of the swap sequence.
            let mut total = 0;
            let mut best_total = 0;
            let mut best_len = 0;
            for (i, g) in gains.iter().enumerate() {
                total += g;
                if total > best_total {
                    best_total = total;
                    best_len = i + 1;
                }
            }
            if best_len == 0 {
                break;
            }
            for &(a, b) in &swaps[..best_len] {
                side[a] = true;
                side[b] = false;
            }
        }

        let mut left = Vec::with_capacity(n / 2);
        let mut right = Vec::with_capacity(n - n / 2);
        for (i, &v) in members.iter().enumerate() {
            if side[i] {
                right.push(v);
            } else {
                left.push(v);
            }
        }
        (left, right)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Two triangles joined by one light link.
    fn make_barbell() -> VirtualNetwork {
        let mut b = VirtualNetwork::builder();
        for name in ["a1", "a2", "a3", "b1", "b2", "b3"] {
            b.add_node(name, 1, 1).unwrap();
        }
        for (x, y) in [("a1", "a2"), ("a2", "a3"), ("a1", "a3"), ("b1", "b2"), ("b2", "b3"), ("b1", "b3")] {
            b.add_link(x, y, 100).unwrap();
        }
        b.add_link("a3", "b1", 1).unwrap();
        b.build().unwrap()
    }

    fn names(net: &VirtualNetwork, side: &[VirtId]) -> Vec<String> {
        let mut v: Vec<String> = side.iter().map(|&id| net.name(id).to_string()).collect();
        v.sort();
        v
    }

    #[test]
    fn kernighan_lin_finds_the_light_link() {
        let net = make_barbell();
        // interleave the triangles so the initial split is bad
        let order: Vec<VirtId> = ["a1", "b1", "a2", "b2", "a3", "b3"]
            .iter()
            .map(|n| net.lookup(n).unwrap())
            .collect();
        let (l, r) = KernighanLin::default().cut(&net, &order);
        let mut sides = [names(&net, &l), names(&net, &r)];
        sides.sort();
        assert_eq!(sides[0], vec!["a1", "a2", "a3"]);
        assert_eq!(sides[1], vec!["b1", "b2", "b3"]);
    }

    #[test]
    fn kernighan_lin_is_balanced_without_links() {
        let mut b = VirtualNetwork::builder();
        for i in 0..5 {
            b.add_node(&format!("n{i}"), 1, 1).unwrap();
        }
        let net = b.build().unwrap();
        let all: Vec<VirtId> = net.node_ids().collect();
        let (l, r) = KernighanLin::default().cut(&net, &all);
        assert_eq!((l.len(), r.len()), (2, 3));
    }

    #[test]
    fn karger_returns_two_nonempty_sides() {
        let net = make_barbell();
        let all: Vec<VirtId> = net.node_ids().collect();
        let mut cutter = KargerMinCut::new(7);
        for _ in 0..20 {
            let (l, r) = cutter.cut(&net, &all);
            assert!(!l.is_empty() && !r.is_empty());
            assert_eq!(l.len() + r.len(), 6);
        }
    }

    #[test]
    fn karger_prefers_cutting_light_links() {
        let net = make_barbell();
        let all: Vec<VirtId> = net.node_ids().collect();
        let mut cutter = KargerMinCut::new(66);
        let light_cuts = (0..50)
            .filter(|_| {
                let (l, _) = cutter.cut(&net, &all);
                l.len() == 3
            })
            .count();
        assert!(light_cuts > 25, "light link cut only {light_cuts}/50 times");
    }

    #[test]
    fn karger_handles_disconnected_members() {
        let mut b = VirtualNetwork::builder();
        for name in ["x", "y", "z"] {
            b.add_node(name, 1, 1).unwrap();
        }
        let net = b.build().unwrap();
        let all: Vec<VirtId> = net.node_ids().collect();
        let (l, r) = KargerMinCut::new(1).cut(&net, &all);
        assert_eq!(l, vec![all[0]]);
        assert_eq!(r.len(), 2);
    }

    #[test]
    fn seeded_karger_is_reproducible() {
        let net = make_barbell();
        let all: Vec<VirtId> = net.node_ids().collect();
        let a = KargerMinCut::new(3).cut(&net, &all);
        let b = KargerMinCut::new(3).cut(&net, &all);
        assert_eq!(a, b);
    }
}
