//! Solution verification.
//!
//! Checks run in a fixed order and stop at the first failure: an empty
//! assignment, an unassigned virtual node, a cross-machine link without a
//! well-formed route, a node capacity overrun, then a channel overrun.
//! Verification never mutates its inputs, so running it twice yields the
//! same result.

use embedgrid_core::{PlacementError, PlacementResult, Resource};
use embedgrid_topology::{PhysId, PhysicalNetwork, RouteHop, VirtualNetwork};

use crate::embedding::Embedding;

pub fn verify_embedding(
    virtual_net: &VirtualNetwork,
    physical: &PhysicalNetwork,
    embedding: &Embedding,
) -> PlacementResult<()> {
    if embedding.is_empty() {
        return Err(PlacementError::EmptySolution);
    }

    for (id, node) in virtual_net.nodes() {
        if !embedding.is_assigned(id) {
            return Err(PlacementError::Assignment(format!(
                "virtual node {} is not assigned to a physical node",
                node.name
            )));
        }
    }

    for (link, vlink) in virtual_net.links() {
        if !embedding.is_cross_machine(virtual_net, link) {
            continue;
        }
        let label = virtual_net.describe_link(link);
        let Some(hops) = embedding.route(link) else {
            return Err(PlacementError::Assignment(format!(
                "virtual link {label} has no physical path"
            )));
        };
        let [u, v] = vlink.ends;
        // Both ends are assigned: checked above.
        let (Some(start), Some(end)) = (embedding.node(u), embedding.node(v)) else {
            continue;
        };
        if !is_walk_between(hops, start, end) {
            return Err(PlacementError::Assignment(format!(
                "virtual link {label} is mapped on a path that does not join {} and {}",
                physical.name(start),
                physical.name(end)
            )));
        }
    }

    let mut cores = vec![0u64; physical.number_of_nodes()];
    let mut memory = vec![0u64; physical.number_of_nodes()];
    for (v, p) in embedding.nodes() {
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

    let usage = embedding.rate_usage(virtual_net);
    for (channel, used) in usage.iter() {
        let max = physical.rate(channel);
        if used > max {
            return Err(PlacementError::LinkCapacity {
                link: physical.describe_channel(channel),
                used,
                max,
            });
        }
    }

    Ok(())
}

/// A non-empty, contiguous sequence of hops from `start` to `end`.
fn is_walk_between(hops: &[RouteHop], start: PhysId, end: PhysId) -> bool {
    let (Some(first), Some(last)) = (hops.first(), hops.last()) else {
        return false;
    };
    first.from == start && last.to == end && hops.windows(2).all(|w| w[0].to == w[1].from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedgrid_core::InterfacePolicy;
    use embedgrid_topology::generators::{physical_test_network, virtual_test_network};
    use embedgrid_topology::{PathFinder, RateUsage, VLinkId, VirtId};

    fn make_pair(cores: u32, rate: u32, grouped: bool) -> (VirtualNetwork, PhysicalNetwork) {
        (
            virtual_test_network(cores, 1000, rate).unwrap(),
            physical_test_network(4, 4000, 10_000, grouped).unwrap(),
        )
    }

    fn make_split(v: &VirtualNetwork, p: &PhysicalNetwork) -> Embedding {
        let h1 = p.lookup("h1").unwrap();
        let h2 = p.lookup("h2").unwrap();
        let mut e = Embedding::new();
        e.assign(v.lookup("Node_0").unwrap(), h1);
        e.assign(v.lookup("Node_1").unwrap(), h2);
        let finder = PathFinder::new(p, InterfacePolicy::FirstFit);
        let hops = finder.find_path(h1, h2, 0, &RateUsage::new()).unwrap();
        e.set_route(VLinkId(0), hops);
        e
    }

    #[test]
    fn empty_embedding_is_rejected() {
        let (v, p) = make_pair(1, 10, false);
        assert_eq!(
            verify_embedding(&v, &p, &Embedding::new()),
            Err(PlacementError::EmptySolution)
        );
    }

    #[test]
    fn unassigned_node_is_reported() {
        let (v, p) = make_pair(1, 10, false);
        let mut e = Embedding::new();
        e.assign(VirtId(0), PhysId(0));
        let err = verify_embedding(&v, &p, &e).unwrap_err();
        assert!(matches!(err, PlacementError::Assignment(ref m) if m.contains("Node_1")));
    }

    #[test]
    fn missing_route_is_reported() {
        let (v, p) = make_pair(1, 10, false);
        let mut e = make_split(&v, &p);
        e.remove_route(VLinkId(0));
        let err = verify_embedding(&v, &p, &e).unwrap_err();
        assert!(matches!(err, PlacementError::Assignment(ref m) if m.contains("Node_0-Node_1")));
    }

    #[test]
    fn reversed_route_is_reported() {
        let (v, p) = make_pair(1, 10, false);
        let mut e = make_split(&v, &p);
        let hops: Vec<_> = e.route(VLinkId(0)).unwrap().iter().rev().map(|h| h.reversed()).collect();
        e.set_route(VLinkId(0), hops);
        assert!(matches!(verify_embedding(&v, &p, &e), Err(PlacementError::Assignment(_))));
    }

    #[test]
    fn colocated_nodes_need_no_route() {
        let (v, p) = make_pair(2, 10, false);
        let mut e = Embedding::new();
        e.assign(VirtId(0), PhysId(0));
        e.assign(VirtId(1), PhysId(0));
        assert_eq!(verify_embedding(&v, &p, &e), Ok(()));
    }

    #[test]
    fn node_overrun_reports_cumulative_use() {
        let (v, p) = make_pair(3, 10, false);
        let mut e = Embedding::new();
        e.assign(VirtId(0), PhysId(0));
        e.assign(VirtId(1), PhysId(0));
        assert_eq!(
            verify_embedding(&v, &p, &e),
            Err(PlacementError::NodeResource {
                node: "h1".to_string(),
                resource: Resource::Cores,
                used: 6,
                max: 4,
            })
        );
    }

    #[test]
    fn channel_overrun_is_reported() {
        let (v, p) = make_pair(1, 20_000, false);
        let e = make_split(&v, &p);
        let err = verify_embedding(&v, &p, &e).unwrap_err();
        assert!(matches!(err, PlacementError::LinkCapacity { used: 20_000, max: 10_000, .. }));
    }

    #[test]
    fn grouped_view_checks_the_aggregate() {
        let (v, p) = make_pair(1, 20_000, true);
        let e = make_split(&v, &p);
        assert_eq!(verify_embedding(&v, &p, &e), Ok(()));
        // Pure function: same answer twice.
        assert_eq!(verify_embedding(&v, &p, &e), Ok(()));
    }
}
