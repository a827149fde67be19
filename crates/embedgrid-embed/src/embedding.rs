//! Raw embeddings — the node assignment and link routes a strategy produces
//! before the solution builder finalizes them.

use std::collections::{BTreeMap, BTreeSet};

use embedgrid_topology::{PhysId, RateUsage, RouteHop, VLinkId, VirtId, VirtualNetwork};

/// Virtual node → physical node, and cross-machine virtual link → route.
///
/// A route is stored oriented from the machine hosting `ends[0]` of the
/// virtual link to the machine hosting `ends[1]`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Embedding {
    nodes: BTreeMap<VirtId, PhysId>,
    routes: BTreeMap<VLinkId, Vec<RouteHop>>,
}

impl Embedding {
    pub fn new() -> Self {
        Self::default()
    }

    /// Place `node` on `machine`, replacing any earlier placement.
    pub fn assign(&mut self, node: VirtId, machine: PhysId) {
        self.nodes.insert(node, machine);
    }

    pub fn node(&self, node: VirtId) -> Option<PhysId> {
        self.nodes.get(&node).copied()
    }

    pub fn is_assigned(&self, node: VirtId) -> bool {
        self.nodes.contains_key(&node)
    }

    pub fn nodes(&self) -> impl Iterator<Item = (VirtId, PhysId)> + '_ {
        self.nodes.iter().map(|(&v, &p)| (v, p))
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn set_route(&mut self, link: VLinkId, hops: Vec<RouteHop>) {
        self.routes.insert(link, hops);
    }

    pub fn remove_route(&mut self, link: VLinkId) -> Option<Vec<RouteHop>> {
        self.routes.remove(&link)
    }

    pub fn route(&self, link: VLinkId) -> Option<&[RouteHop]> {
        self.routes.get(&link).map(Vec::as_slice)
    }

    pub fn routes(&self) -> impl Iterator<Item = (VLinkId, &[RouteHop])> {
        self.routes.iter().map(|(&l, r)| (l, r.as_slice()))
    }

    /// Distinct machines hosting at least one virtual node.
    pub fn machines(&self) -> BTreeSet<PhysId> {
        self.nodes.values().copied().collect()
    }

    pub fn n_machines_used(&self) -> usize {
        self.machines().len()
    }

    /// True if both ends of `link` are placed on different machines.
    pub fn is_cross_machine(&self, network: &VirtualNetwork, link: VLinkId) -> bool {
        let [u, v] = network.link(link).ends;
        match (self.node(u), self.node(v)) {
            (Some(a), Some(b)) => a != b,
            _ => false,
        }
    }

    /// Channel usage implied by the stored routes.
    pub fn rate_usage(&self, network: &VirtualNetwork) -> RateUsage {
        let mut usage = RateUsage::new();
        for (&link, hops) in &self.routes {
            let rate = u64::from(network.req_rate(link));
            for hop in hops {
                usage.add(hop.channel, rate);
            }
        }
        usage
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedgrid_topology::{Channel, InterfaceId, LinkId, UsageView};

    fn make_hop(from: usize, to: usize, link: usize) -> RouteHop {
        RouteHop {
            from: PhysId(from),
            to: PhysId(to),
            channel: Channel::new(LinkId(link), InterfaceId(0)),
        }
    }

    #[test]
    fn reassignment_replaces_machine() {
        let mut e = Embedding::new();
        e.assign(VirtId(0), PhysId(1));
        e.assign(VirtId(1), PhysId(1));
        assert_eq!(e.n_machines_used(), 1);
        e.assign(VirtId(1), PhysId(2));
        assert_eq!(e.node(VirtId(1)), Some(PhysId(2)));
        assert_eq!(e.n_machines_used(), 2);
        assert_eq!(e.len(), 2);
    }

    #[test]
    fn usage_sums_routed_rates() {
        let mut b = VirtualNetwork::builder();
        b.add_node("a", 1, 1).unwrap();
        b.add_node("b", 1, 1).unwrap();
        b.add_node("c", 1, 1).unwrap();
        b.add_link("a", "b", 30).unwrap();
        b.add_link("a", "c", 12).unwrap();
        let net = b.build().unwrap();

        let mut e = Embedding::new();
        e.set_route(VLinkId(0), vec![make_hop(0, 2, 0), make_hop(2, 1, 1)]);
        e.set_route(VLinkId(1), vec![make_hop(0, 2, 0)]);
        let usage = e.rate_usage(&net);
        assert_eq!(usage.used(Channel::new(LinkId(0), InterfaceId(0))), 42);
        assert_eq!(usage.used(Channel::new(LinkId(1), InterfaceId(0))), 30);

        assert!(e.remove_route(VLinkId(1)).is_some());
        assert!(e.route(VLinkId(1)).is_none());
    }
}
