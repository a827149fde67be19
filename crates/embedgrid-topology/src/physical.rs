//! Physical substrate — compute nodes, switches and multi-interface links.
//!
//! A [`PhysicalNetwork`] is a connected multigraph. Each [`PhysicalLink`]
//! joins two nodes and carries one or more real [`Interface`]s. When the
//! network is built with grouped interfaces, queries expose a single
//! aggregate pseudo-interface per link whose rate is the sum of the real
//! ones; the real interfaces stay available through
//! [`PhysicalNetwork::real_interfaces`] for the ungrouping step.

use std::collections::{HashMap, VecDeque};

use crate::error::{TopologyError, TopologyResult};
use crate::ids::{Channel, InterfaceId, LinkId, PhysId};

/// A physical machine or switch. Switches have zero cores and memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhysicalNode {
    pub name: String,
    pub cores: u32,
    /// Memory in MiB.
    pub memory: u32,
}

impl PhysicalNode {
    /// A node can host virtual nodes only if it has both cores and memory.
    pub fn is_compute(&self) -> bool {
        self.cores > 0 && self.memory > 0
    }
}

/// One interface of a link, with the device name at each end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interface {
    pub id: InterfaceId,
    pub rate: u64,
    /// Device names, indexed like [`PhysicalLink::ends`].
    devices: [String; 2],
}

impl Interface {
    /// Device name of this interface at link end `end` (0 or 1).
    pub fn device(&self, end: usize) -> &str {
        &self.devices[end]
    }
}

/// All parallel devices between two physical nodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhysicalLink {
    pub ends: [PhysId; 2],
    interfaces: Vec<Interface>,
    aggregate: Interface,
}

impl PhysicalLink {
    /// Index (0 or 1) of `node` among the link ends.
    ///
    /// Panics if `node` is not an end of this link.
    pub fn end_of(&self, node: PhysId) -> usize {
        if self.ends[0] == node {
            0
        } else if self.ends[1] == node {
            1
        } else {
            panic!("{node} is not an end of link {:?}", self.ends)
        }
    }

    /// The end opposite to `node`.
    pub fn other_end(&self, node: PhysId) -> PhysId {
        self.ends[1 - self.end_of(node)]
    }

    pub fn real_interfaces(&self) -> &[Interface] {
        &self.interfaces
    }

    pub fn aggregate(&self) -> &Interface {
        &self.aggregate
    }
}

/// A frozen, connected physical substrate.
#[derive(Debug, Clone)]
pub struct PhysicalNetwork {
    nodes: Vec<PhysicalNode>,
    index: HashMap<String, PhysId>,
    links: Vec<PhysicalLink>,
    link_index: HashMap<(PhysId, PhysId), LinkId>,
    adjacency: Vec<Vec<(PhysId, LinkId)>>,
    compute_nodes: Vec<PhysId>,
    rate_out: Vec<u64>,
    grouped: bool,
}

impl PhysicalNetwork {
    pub fn builder() -> PhysicalNetworkBuilder {
        PhysicalNetworkBuilder::default()
    }

    /// True if queries expose one aggregate interface per link.
    pub fn grouped_interfaces(&self) -> bool {
        self.grouped
    }

    pub fn number_of_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn number_of_links(&self) -> usize {
        self.links.len()
    }

    pub fn nodes(&self) -> impl Iterator<Item = (PhysId, &PhysicalNode)> {
        self.nodes.iter().enumerate().map(|(i, n)| (PhysId(i), n))
    }

    pub fn node(&self, id: PhysId) -> &PhysicalNode {
        self.nodes
            .get(id.0)
            .unwrap_or_else(|| panic!("unknown physical node {id}"))
    }

    pub fn name(&self, id: PhysId) -> &str {
        &self.node(id).name
    }

    pub fn lookup(&self, name: &str) -> Option<PhysId> {
        self.index.get(name).copied()
    }

    pub fn cores(&self, id: PhysId) -> u32 {
        self.node(id).cores
    }

    pub fn memory(&self, id: PhysId) -> u32 {
        self.node(id).memory
    }

    /// Nodes able to run virtual nodes, in id order.
    pub fn compute_nodes(&self) -> &[PhysId] {
        &self.compute_nodes
    }

    /// Neighbors of `id` with the link reaching each, in insertion order.
    pub fn neighbors(&self, id: PhysId) -> &[(PhysId, LinkId)] {
        self.adjacency
            .get(id.0)
            .unwrap_or_else(|| panic!("unknown physical node {id}"))
    }

    pub fn links(&self) -> impl Iterator<Item = (LinkId, &PhysicalLink)> {
        self.links.iter().enumerate().map(|(i, l)| (LinkId(i), l))
    }

    pub fn link(&self, id: LinkId) -> &PhysicalLink {
        self.links
            .get(id.0)
            .unwrap_or_else(|| panic!("unknown physical link {id}"))
    }

    pub fn link_between(&self, a: PhysId, b: PhysId) -> Option<LinkId> {
        self.link_index.get(&ordered(a, b)).copied()
    }

    /// Interfaces of a link in the network's current view: the aggregate
    /// pseudo-interface when grouped, the real interfaces otherwise.
    pub fn interfaces(&self, id: LinkId) -> &[Interface] {
        let link = self.link(id);
        if self.grouped {
            std::slice::from_ref(&link.aggregate)
        } else {
            &link.interfaces
        }
    }

    /// The real interfaces behind a link, regardless of the view.
    pub fn real_interfaces(&self, id: LinkId) -> &[Interface] {
        &self.link(id).interfaces
    }

    /// Every channel of the current view.
    pub fn channels(&self) -> impl Iterator<Item = Channel> + '_ {
        self.links()
            .flat_map(move |(id, _)| self.interfaces(id).iter().map(move |i| Channel::new(id, i.id)))
    }

    /// Interface behind a channel of the current view.
    ///
    /// Panics if the channel does not exist in this view.
    pub fn interface(&self, channel: Channel) -> &Interface {
        let link = self.link(channel.link);
        if channel.interface.is_grouped() {
            assert!(self.grouped, "grouped channel {channel:?} on an ungrouped network");
            return &link.aggregate;
        }
        assert!(!self.grouped, "real channel {channel:?} on a grouped network");
        link.interfaces
            .get(channel.interface.0 as usize)
            .unwrap_or_else(|| panic!("unknown interface {} on link {}", channel.interface, channel.link))
    }

    /// Capacity of a channel of the current view.
    pub fn rate(&self, channel: Channel) -> u64 {
        self.interface(channel).rate
    }

    /// Total rate a node can emit over all its interfaces.
    pub fn rate_out(&self, id: PhysId) -> u64 {
        self.rate_out[id.0]
    }

    /// Device name of a real interface as seen from node `at`.
    pub fn device_name(&self, link: LinkId, interface: InterfaceId, at: PhysId) -> &str {
        let l = self.link(link);
        let iface = l
            .interfaces
            .get(interface.0 as usize)
            .unwrap_or_else(|| panic!("unknown interface {interface} on link {link}"));
        iface.device(l.end_of(at))
    }

    /// Human-readable label of a channel, for error reports.
    pub fn describe_channel(&self, channel: Channel) -> String {
        let link = self.link(channel.link);
        format!(
            "({}, {}, {})",
            self.name(link.ends[0]),
            self.name(link.ends[1]),
            channel.interface
        )
    }
}

fn ordered(a: PhysId, b: PhysId) -> (PhysId, PhysId) {
    if a <= b { (a, b) } else { (b, a) }
}

// ── Builder ───────────────────────────────────────────────────────

/// Accumulates nodes and devices, then freezes them into a
/// [`PhysicalNetwork`].
#[derive(Debug, Default)]
pub struct PhysicalNetworkBuilder {
    nodes: Vec<PhysicalNode>,
    index: HashMap<String, PhysId>,
    links: Vec<([PhysId; 2], Vec<(u64, [String; 2])>)>,
    link_index: HashMap<(PhysId, PhysId), usize>,
    max_interfaces_per_link: Option<usize>,
}

impl PhysicalNetworkBuilder {
    /// Keep at most `n` devices per link; later devices are ignored.
    pub fn max_interfaces_per_link(mut self, n: usize) -> Self {
        self.max_interfaces_per_link = Some(n);
        self
    }

    /// Add a new node. Fails if the name is taken.
    pub fn add_node(&mut self, name: &str, cores: u32, memory: u32) -> TopologyResult<PhysId> {
        if self.index.contains_key(name) {
            return Err(TopologyError::DuplicateNode(name.to_string()));
        }
        Ok(self.ensure_node(name, cores, memory))
    }

    /// Add a node, or overwrite the resources of an existing one. Used when
    /// merging several topology files that share switches.
    pub fn ensure_node(&mut self, name: &str, cores: u32, memory: u32) -> PhysId {
        if let Some(&id) = self.index.get(name) {
            let node = &mut self.nodes[id.0];
            node.cores = cores;
            node.memory = memory;
            return id;
        }
        let id = PhysId(self.nodes.len());
        self.nodes.push(PhysicalNode {
            name: name.to_string(),
            cores,
            memory,
        });
        self.index.insert(name.to_string(), id);
        id
    }

    /// Add one device between `a` and `b`. Devices between the same pair
    /// of nodes are parallel interfaces of a single link.
    pub fn add_device(
        &mut self,
        a: &str,
        b: &str,
        a_device: &str,
        b_device: &str,
        rate: u64,
    ) -> TopologyResult<()> {
        let ia = self.resolve(a)?;
        let ib = self.resolve(b)?;
        if ia == ib {
            return Err(TopologyError::SelfLoop(a.to_string()));
        }
        let key = ordered(ia, ib);
        let slot = match self.link_index.get(&key) {
            Some(&slot) => slot,
            None => {
                self.links.push(([key.0, key.1], Vec::new()));
                self.link_index.insert(key, self.links.len() - 1);
                self.links.len() - 1
            }
        };
        let (ends, devices) = &mut self.links[slot];
        if self
            .max_interfaces_per_link
            .is_some_and(|cap| devices.len() >= cap)
        {
            return Ok(());
        }
        let names = if ends[0] == ia {
            [a_device.to_string(), b_device.to_string()]
        } else {
            [b_device.to_string(), a_device.to_string()]
        };
        devices.push((rate, names));
        Ok(())
    }

    fn resolve(&self, name: &str) -> TopologyResult<PhysId> {
        self.index
            .get(name)
            .copied()
            .ok_or_else(|| TopologyError::UnknownNode(name.to_string()))
    }

    /// Freeze the topology. Rejects empty and disconnected networks, and
    /// links left without interfaces (all devices capped away).
    pub fn build(self, grouped: bool) -> TopologyResult<PhysicalNetwork> {
        if self.nodes.is_empty() {
            return Err(TopologyError::Empty);
        }

        let mut adjacency = vec![Vec::new(); self.nodes.len()];
        let mut links = Vec::with_capacity(self.links.len());
        let mut link_index = HashMap::with_capacity(self.links.len());

        for (slot, (ends, devices)) in self.links.into_iter().enumerate() {
            if devices.is_empty() {
                return Err(TopologyError::NoInterfaces(
                    self.nodes[ends[0].0].name.clone(),
                    self.nodes[ends[1].0].name.clone(),
                ));
            }
            let id = LinkId(slot);
            let interfaces: Vec<Interface> = devices
                .into_iter()
                .enumerate()
                .map(|(i, (rate, devices))| Interface {
                    id: InterfaceId(i as u32),
                    rate,
                    devices,
                })
                .collect();
            let aggregate = Interface {
                id: InterfaceId::GROUPED,
                rate: interfaces.iter().map(|i| i.rate).sum(),
                devices: [String::from("grouped"), String::from("grouped")],
            };
            adjacency[ends[0].0].push((ends[1], id));
            adjacency[ends[1].0].push((ends[0], id));
            link_index.insert((ends[0], ends[1]), id);
            links.push(PhysicalLink {
                ends,
                interfaces,
                aggregate,
            });
        }

        if !is_connected(&adjacency) {
            return Err(TopologyError::Disconnected);
        }

        let compute_nodes = self
            .nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| n.is_compute())
            .map(|(i, _)| PhysId(i))
            .collect();

        let rate_out = adjacency
            .iter()
            .map(|neighbors| {
                neighbors
                    .iter()
                    .map(|&(_, link): &(PhysId, LinkId)| {
                        links[link.0].interfaces.iter().map(|i| i.rate).sum::<u64>()
                    })
                    .sum()
            })
            .collect();

        Ok(PhysicalNetwork {
            nodes: self.nodes,
            index: self.index,
            links,
            link_index,
            adjacency,
            compute_nodes,
            rate_out,
            grouped,
        })
    }
}

fn is_connected(adjacency: &[Vec<(PhysId, LinkId)>]) -> bool {
    let mut seen = vec![false; adjacency.len()];
    let mut queue = VecDeque::from([0usize]);
    seen[0] = true;
    let mut reached = 1;
    while let Some(node) = queue.pop_front() {
        for &(next, _) in &adjacency[node] {
            if !seen[next.0] {
                seen[next.0] = true;
                reached += 1;
                queue.push_back(next.0);
            }
        }
    }
    reached == adjacency.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_pair(grouped: bool) -> PhysicalNetwork {
        let mut b = PhysicalNetwork::builder();
        b.add_node("h1", 4, 4000).unwrap();
        b.add_node("s1", 0, 0).unwrap();
        b.add_device("h1", "s1", "eth0", "eth0", 10_000).unwrap();
        b.add_device("s1", "h1", "eth1", "eth1", 5_000).unwrap();
        b.build(grouped).unwrap()
    }

    #[test]
    fn compute_nodes_exclude_switches() {
        let net = make_pair(false);
        assert_eq!(net.compute_nodes(), &[PhysId(0)]);
        assert!(!net.node(PhysId(1)).is_compute());
    }

    #[test]
    fn parallel_devices_share_one_link() {
        let net = make_pair(false);
        assert_eq!(net.number_of_links(), 1);
        let link = net.link_between(PhysId(1), PhysId(0)).unwrap();
        assert_eq!(net.interfaces(link).len(), 2);
    }

    #[test]
    fn device_names_follow_the_requested_end() {
        let net = make_pair(false);
        let link = net.link_between(PhysId(0), PhysId(1)).unwrap();
        // Second device was declared from the switch side.
        assert_eq!(net.device_name(link, InterfaceId(1), PhysId(1)), "eth1");
        assert_eq!(net.device_name(link, InterfaceId(0), PhysId(0)), "eth0");
    }

    #[test]
    fn grouped_view_exposes_one_aggregate_interface() {
        let net = make_pair(true);
        let link = LinkId(0);
        let view = net.interfaces(link);
        assert_eq!(view.len(), 1);
        assert!(view[0].id.is_grouped());
        assert_eq!(net.rate(Channel::new(link, InterfaceId::GROUPED)), 15_000);
        assert_eq!(net.real_interfaces(link).len(), 2);
        assert_eq!(net.real_interfaces(link)[1].rate, 5_000);
    }

    #[test]
    fn rate_out_sums_real_interfaces() {
        let net = make_pair(false);
        assert_eq!(net.rate_out(PhysId(0)), 15_000);
        assert_eq!(net.rate_out(PhysId(1)), 15_000);
    }

    #[test]
    fn disconnected_network_is_rejected() {
        let mut b = PhysicalNetwork::builder();
        b.add_node("h1", 1, 1).unwrap();
        b.add_node("h2", 1, 1).unwrap();
        assert!(matches!(b.build(false), Err(TopologyError::Disconnected)));
    }

    #[test]
    fn duplicate_and_unknown_nodes_are_rejected() {
        let mut b = PhysicalNetwork::builder();
        b.add_node("h1", 1, 1).unwrap();
        assert!(matches!(b.add_node("h1", 2, 2), Err(TopologyError::DuplicateNode(_))));
        assert!(matches!(
            b.add_device("h1", "ghost", "a", "b", 1),
            Err(TopologyError::UnknownNode(_))
        ));
        assert!(matches!(
            b.add_device("h1", "h1", "a", "b", 1),
            Err(TopologyError::SelfLoop(_))
        ));
    }

    #[test]
    fn interface_cap_drops_extra_devices() {
        let mut b = PhysicalNetwork::builder().max_interfaces_per_link(1);
        b.add_node("a", 1, 1).unwrap();
        b.add_node("b", 1, 1).unwrap();
        b.add_device("a", "b", "e0", "e0", 10).unwrap();
        b.add_device("a", "b", "e1", "e1", 10).unwrap();
        let net = b.build(false).unwrap();
        assert_eq!(net.real_interfaces(LinkId(0)).len(), 1);
    }

    #[test]
    fn zero_interface_cap_is_rejected() {
        let mut b = PhysicalNetwork::builder().max_interfaces_per_link(0);
        b.add_node("a", 1, 1).unwrap();
        b.add_node("b", 1, 1).unwrap();
        b.add_device("a", "b", "e0", "e0", 10).unwrap();
        assert!(matches!(b.build(false), Err(TopologyError::NoInterfaces(..))));
    }

    #[test]
    #[should_panic(expected = "unknown physical node")]
    fn unknown_id_fails_fast() {
        let net = make_pair(false);
        net.cores(PhysId(9));
    }
}
