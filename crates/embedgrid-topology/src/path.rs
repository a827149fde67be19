//! Capacity-aware path finding.
//!
//! [`PathFinder::find_path`] is a reachability search, not a shortest-path
//! search: an iterative depth-first walk over simple paths that stops the
//! moment the target is reached. On each candidate edge it picks an
//! interface according to the configured [`InterfacePolicy`]; an edge with
//! no interface able to carry the requested rate is skipped.
//!
//! [`PathFinder::find_route`] walks the same way but ignores capacity, for
//! strategies that choose interfaces themselves. [`RouteCache`] memoizes
//! those routes for the lifetime of one placement attempt.

use std::collections::HashMap;

use embedgrid_core::{InterfacePolicy, PlacementError, PlacementResult};

use crate::ids::{Channel, InterfaceId, LinkId, PhysId};
use crate::physical::PhysicalNetwork;
use crate::usage::UsageView;

/// One hop of a routed path: traverse `channel` from `from` to `to`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RouteHop {
    pub from: PhysId,
    pub to: PhysId,
    pub channel: Channel,
}

impl RouteHop {
    /// The same hop traversed the other way.
    pub fn reversed(self) -> Self {
        Self {
            from: self.to,
            to: self.from,
            channel: self.channel,
        }
    }
}

/// One hop of a capacity-free route: traverse `link` from `from` to `to`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Step {
    pub from: PhysId,
    pub to: PhysId,
    pub link: LinkId,
}

impl Step {
    pub fn reversed(self) -> Self {
        Self {
            from: self.to,
            to: self.from,
            link: self.link,
        }
    }

    pub fn with_interface(self, interface: InterfaceId) -> RouteHop {
        RouteHop {
            from: self.from,
            to: self.to,
            channel: Channel::new(self.link, interface),
        }
    }
}

/// Path finder over a frozen substrate.
#[derive(Debug, Clone, Copy)]
pub struct PathFinder<'a> {
    network: &'a PhysicalNetwork,
    policy: InterfacePolicy,
}

impl<'a> PathFinder<'a> {
    pub fn new(network: &'a PhysicalNetwork, policy: InterfacePolicy) -> Self {
        Self { network, policy }
    }

    pub fn network(&self) -> &'a PhysicalNetwork {
        self.network
    }

    pub fn policy(&self) -> InterfacePolicy {
        self.policy
    }

    /// Find a simple path from `source` to `target` whose every hop has an
    /// interface with at least `rate` residual capacity under `usage`.
    ///
    /// Returns an empty path when `source == target`.
    pub fn find_path(
        &self,
        source: PhysId,
        target: PhysId,
        rate: u64,
        usage: &impl UsageView,
    ) -> PlacementResult<Vec<RouteHop>> {
        let hops = self.search(source, target, |link| self.pick_interface(link, rate, usage))?;
        Ok(hops)
    }

    /// Find a simple path from `source` to `target` ignoring capacity.
    pub fn find_route(&self, source: PhysId, target: PhysId) -> PlacementResult<Vec<Step>> {
        let hops = self.search(source, target, |_| Some(InterfaceId::GROUPED))?;
        Ok(hops
            .into_iter()
            .map(|hop| Step {
                from: hop.from,
                to: hop.to,
                link: hop.channel.link,
            })
            .collect())
    }

    /// Interface of `link` able to carry `rate` more, chosen by policy.
    pub fn pick_interface(&self, link: LinkId, rate: u64, usage: &impl UsageView) -> Option<InterfaceId> {
        let feasible = self.network.interfaces(link).iter().filter(|iface| {
            let used = usage.used(Channel::new(link, iface.id));
            iface.rate >= used + rate
        });
        match self.policy {
            InterfacePolicy::FirstFit => feasible.map(|iface| iface.id).next(),
            InterfacePolicy::MaxResidual => {
                let mut best: Option<(InterfaceId, u64)> = None;
                for iface in feasible {
                    let residual = iface.rate - usage.used(Channel::new(link, iface.id));
                    if best.is_none_or(|(_, r)| residual > r) {
                        best = Some((iface.id, residual));
                    }
                }
                best.map(|(id, _)| id)
            }
        }
    }

    /// Interface of `link` with the largest residual, even if overrun.
    /// First in enumeration order on ties; `None` for a link without
    /// interfaces.
    pub fn max_residual_interface(&self, link: LinkId, usage: &impl UsageView) -> Option<InterfaceId> {
        let mut best: Option<(InterfaceId, i64)> = None;
        for iface in self.network.interfaces(link) {
            let residual = iface.rate as i64 - usage.used(Channel::new(link, iface.id)) as i64;
            if best.is_none_or(|(_, r)| residual > r) {
                best = Some((iface.id, residual));
            }
        }
        best.map(|(id, _)| id)
    }

    /// Depth-first search over simple paths. `choose` selects the interface
    /// for a candidate edge; `None` skips the edge.
    fn search<F>(&self, source: PhysId, target: PhysId, choose: F) -> PlacementResult<Vec<RouteHop>>
    where
        F: Fn(LinkId) -> Option<InterfaceId>,
    {
        if source == target {
            return Ok(Vec::new());
        }

        let mut on_path = vec![false; self.network.number_of_nodes()];
        on_path[source.0] = true;
        // Each frame: node, index of the next neighbor to try.
        let mut stack: Vec<(PhysId, usize)> = vec![(source, 0)];
        let mut hops: Vec<RouteHop> = Vec::new();

        while let Some(frame) = stack.last_mut() {
            let (node, cursor) = *frame;
            let neighbors = self.network.neighbors(node);
            let Some(&(next, link)) = neighbors.get(cursor) else {
                stack.pop();
                on_path[node.0] = false;
                hops.pop();
                continue;
            };
            frame.1 += 1;

            let Some(interface) = choose(link) else {
                continue;
            };
            let hop = RouteHop {
                from: node,
                to: next,
                channel: Channel::new(link, interface),
            };
            if next == target {
                hops.push(hop);
                return Ok(hops);
            }
            if !on_path[next.0] {
                on_path[next.0] = true;
                hops.push(hop);
                stack.push((next, 0));
            }
        }

        Err(PlacementError::NoPathFound {
            from: self.network.name(source).to_string(),
            to: self.network.name(target).to_string(),
        })
    }
}

/// Memo of capacity-free routes, reusable in reverse. Valid for one
/// substrate; build a fresh cache per placement attempt.
#[derive(Debug, Default)]
pub struct RouteCache {
    routes: HashMap<(PhysId, PhysId), Vec<Step>>,
}

impl RouteCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(&mut self, finder: &PathFinder<'_>, from: PhysId, to: PhysId) -> PlacementResult<Vec<Step>> {
        if let Some(route) = self.routes.get(&(from, to)) {
            return Ok(route.clone());
        }
        if let Some(route) = self.routes.get(&(to, from)) {
            return Ok(route.iter().rev().map(|s| s.reversed()).collect());
        }
        let route = finder.find_route(from, to)?;
        self.routes.insert((from, to), route.clone());
        Ok(route)
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generators::physical_test_network;
    use crate::usage::RateUsage;

    fn ids(net: &PhysicalNetwork) -> (PhysId, PhysId, PhysId) {
        (
            net.lookup("h1").unwrap(),
            net.lookup("s1").unwrap(),
            net.lookup("h2").unwrap(),
        )
    }

    #[test]
    fn first_fit_takes_first_interface() {
        let net = physical_test_network(4, 4000, 10_000, false).unwrap();
        let (h1, s1, h2) = ids(&net);
        let finder = PathFinder::new(&net, InterfacePolicy::FirstFit);
        let path = finder.find_path(h1, h2, 5_000, &RateUsage::new()).unwrap();
        assert_eq!(path.len(), 2);
        assert_eq!((path[0].from, path[0].to), (h1, s1));
        assert_eq!((path[1].from, path[1].to), (s1, h2));
        assert_eq!(path[0].channel.interface, InterfaceId(0));
    }

    #[test]
    fn first_fit_skips_saturated_interfaces() {
        let net = physical_test_network(4, 4000, 10_000, false).unwrap();
        let (h1, _, h2) = ids(&net);
        let finder = PathFinder::new(&net, InterfacePolicy::FirstFit);
        let mut usage = RateUsage::new();
        let first = finder.find_path(h1, h2, 6_000, &usage).unwrap();
        for hop in &first {
            usage.add(hop.channel, 6_000);
        }
        let second = finder.find_path(h1, h2, 6_000, &usage).unwrap();
        assert!(second.iter().all(|hop| hop.channel.interface == InterfaceId(1)));
    }

    #[test]
    fn max_residual_balances_load() {
        let net = physical_test_network(4, 4000, 10_000, false).unwrap();
        let (h1, _, h2) = ids(&net);
        let finder = PathFinder::new(&net, InterfacePolicy::MaxResidual);
        let mut usage = RateUsage::new();
        let link = net.link_between(h1, net.lookup("s1").unwrap()).unwrap();
        usage.add(Channel::new(link, InterfaceId(0)), 1_000);
        let path = finder.find_path(h1, h2, 1_000, &usage).unwrap();
        assert_eq!(path[0].channel.interface, InterfaceId(1));
    }

    #[test]
    fn max_residual_interface_tolerates_overrun() {
        let net = physical_test_network(4, 4000, 10_000, false).unwrap();
        let (h1, _, _) = ids(&net);
        let finder = PathFinder::new(&net, InterfacePolicy::MaxResidual);
        let link = net.link_between(h1, net.lookup("s1").unwrap()).unwrap();
        let mut usage = RateUsage::new();
        usage.add(Channel::new(link, InterfaceId(0)), 30_000);
        usage.add(Channel::new(link, InterfaceId(1)), 20_000);
        assert_eq!(finder.max_residual_interface(link, &usage), Some(InterfaceId(1)));
    }

    #[test]
    fn unroutable_rate_reports_endpoints() {
        let net = physical_test_network(4, 4000, 10_000, false).unwrap();
        let (h1, _, h2) = ids(&net);
        let finder = PathFinder::new(&net, InterfacePolicy::FirstFit);
        let err = finder.find_path(h1, h2, 20_000, &RateUsage::new()).unwrap_err();
        assert_eq!(
            err,
            PlacementError::NoPathFound {
                from: "h1".to_string(),
                to: "h2".to_string()
            }
        );
    }

    #[test]
    fn grouped_view_carries_the_aggregate_rate() {
        let net = physical_test_network(4, 4000, 10_000, true).unwrap();
        let (h1, _, h2) = ids(&net);
        let finder = PathFinder::new(&net, InterfacePolicy::FirstFit);
        let path = finder.find_path(h1, h2, 20_000, &RateUsage::new()).unwrap();
        assert!(path.iter().all(|hop| hop.channel.interface.is_grouped()));
    }

    #[test]
    fn same_endpoint_yields_empty_path() {
        let net = physical_test_network(4, 4000, 10_000, false).unwrap();
        let (h1, _, _) = ids(&net);
        let finder = PathFinder::new(&net, InterfacePolicy::FirstFit);
        assert!(finder.find_path(h1, h1, 1, &RateUsage::new()).unwrap().is_empty());
    }

    #[test]
    fn search_backtracks_out_of_dead_ends() {
        // a - b (dead end), a - c - d
        let mut b = PhysicalNetwork::builder();
        for name in ["a", "b", "c", "d"] {
            b.add_node(name, 1, 1).unwrap();
        }
        b.add_device("a", "b", "x", "x", 10).unwrap();
        b.add_device("a", "c", "x", "x", 10).unwrap();
        b.add_device("c", "d", "x", "x", 10).unwrap();
        let net = b.build(false).unwrap();
        let finder = PathFinder::new(&net, InterfacePolicy::FirstFit);
        let a = net.lookup("a").unwrap();
        let d = net.lookup("d").unwrap();
        let path = finder.find_path(a, d, 5, &RateUsage::new()).unwrap();
        let names: Vec<&str> = path.iter().map(|h| net.name(h.to)).collect();
        assert_eq!(names, vec!["c", "d"]);
    }

    #[test]
    fn route_cache_reuses_reverse_routes() {
        let net = physical_test_network(4, 4000, 10_000, false).unwrap();
        let (h1, s1, h2) = ids(&net);
        let finder = PathFinder::new(&net, InterfacePolicy::FirstFit);
        let mut cache = RouteCache::new();
        let forward = cache.route(&finder, h1, h2).unwrap();
        let backward = cache.route(&finder, h2, h1).unwrap();
        assert_eq!(cache.len(), 1);
        assert_eq!(backward[0].from, h2);
        assert_eq!(backward[0].to, s1);
        assert_eq!(backward[1].to, h1);
        assert_eq!(forward[0].link, backward[1].link);
    }
}
