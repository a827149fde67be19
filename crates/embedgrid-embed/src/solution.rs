//! Solution builder — turns a raw [`Embedding`] into a finalized,
//! interface-exact [`Solution`].
//!
//! On a grouped substrate every route runs over aggregate channels. Building
//! the solution splits each cross-machine virtual link over real interfaces:
//! repeatedly pick, on every hop, the real interface with the largest
//! residual rate, route `min(remaining, residuals)` over that choice as one
//! fractional path, and continue until the requested rate is covered.
//! Residuals are shared by all virtual links of the solution.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::Serialize;
use tracing::debug;

use embedgrid_core::{PlacementError, PlacementResult, Verification};
use embedgrid_topology::{
    InterfaceId, LinkId, PhysId, PhysicalNetwork, RouteHop, VLinkId, VirtId, VirtualNetwork,
};

use crate::embedding::Embedding;
use crate::verify::verify_embedding;

/// Endpoint view of one fractional mapping of a virtual link: the device
/// the traffic leaves from and the device it arrives at.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LinkMap {
    pub source_node: String,
    pub source_device: String,
    pub dest_node: String,
    pub dest_device: String,
    /// Share of the requested rate carried by this mapping, in `(0, 1]`.
    pub fraction: f64,
}

/// One traversed physical link, with the device used at each end.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PathHop {
    pub source_node: String,
    pub source_device: String,
    pub dest_device: String,
    pub dest_node: String,
}

/// A device-level physical path carrying `fraction` of a virtual link.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PhysicalPath {
    pub hops: Vec<PathHop>,
    pub fraction: f64,
}

/// The mapping of one direction of a cross-machine virtual link.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DirectedLink {
    pub source: String,
    pub target: String,
    pub link_maps: Vec<LinkMap>,
    pub paths: Vec<PhysicalPath>,
}

/// A finalized embedding. Immutable once built.
#[derive(Debug, Clone, Serialize)]
pub struct Solution {
    #[serde(skip)]
    embedding: Embedding,
    /// Virtual node name → physical node name.
    node_mapping: BTreeMap<String, String>,
    /// Both directions of every cross-machine link, sorted by endpoints.
    links: Vec<DirectedLink>,
    n_machines_used: usize,
}

/// A route with a real interface chosen on every hop.
struct Split {
    hops: Vec<(RouteHop, InterfaceId)>,
    fraction: f64,
}

impl Solution {
    /// Finalize `embedding`. With [`Verification::Check`] the embedding is
    /// verified first; [`Verification::Trust`] is reserved for strategies
    /// whose construction already enforces every capacity.
    pub fn build(
        virtual_net: &VirtualNetwork,
        physical: &PhysicalNetwork,
        embedding: Embedding,
        verification: Verification,
    ) -> PlacementResult<Self> {
        match verification {
            Verification::Check => verify_embedding(virtual_net, physical, &embedding)?,
            Verification::Trust => debug!("building solution without verification"),
        }

        let node_mapping = embedding
            .nodes()
            .map(|(v, p)| (virtual_net.name(v).to_string(), physical.name(p).to_string()))
            .collect();

        let mut residuals = Residuals::default();
        let mut links = Vec::new();
        for (link, hops) in embedding.routes() {
            if hops.is_empty() || !embedding.is_cross_machine(virtual_net, link) {
                continue;
            }
            let splits = if physical.grouped_interfaces() {
                ungroup(virtual_net, physical, link, hops, &mut residuals)?
            } else {
                vec![Split {
                    hops: hops.iter().map(|h| (*h, h.channel.interface)).collect(),
                    fraction: 1.0,
                }]
            };
            let [u, v] = virtual_net.link(link).ends;
            links.push(directed(virtual_net, physical, u, v, &splits, false));
            links.push(directed(virtual_net, physical, v, u, &splits, true));
        }
        links.sort_by(|a, b| (&a.source, &a.target).cmp(&(&b.source, &b.target)));

        Ok(Self {
            n_machines_used: embedding.n_machines_used(),
            embedding,
            node_mapping,
            links,
        })
    }

    /// Physical node hosting the virtual node named `node`.
    pub fn node_info(&self, node: &str) -> Option<&str> {
        self.node_mapping.get(node).map(String::as_str)
    }

    /// Endpoint mappings of the virtual link `source → target`; empty when
    /// both ends share a machine.
    pub fn link_info(&self, source: &str, target: &str) -> &[LinkMap] {
        self.directed_link(source, target)
            .map(|l| l.link_maps.as_slice())
            .unwrap_or(&[])
    }

    /// Device-level paths of the virtual link `source → target`.
    pub fn path_info(&self, source: &str, target: &str) -> &[PhysicalPath] {
        self.directed_link(source, target)
            .map(|l| l.paths.as_slice())
            .unwrap_or(&[])
    }

    fn directed_link(&self, source: &str, target: &str) -> Option<&DirectedLink> {
        self.links
            .binary_search_by(|l| (l.source.as_str(), l.target.as_str()).cmp(&(source, target)))
            .ok()
            .map(|i| &self.links[i])
    }

    pub fn n_machines_used(&self) -> usize {
        self.n_machines_used
    }

    pub fn node_mapping(&self) -> &BTreeMap<String, String> {
        &self.node_mapping
    }

    pub fn links(&self) -> &[DirectedLink] {
        &self.links
    }

    /// The typed embedding behind this solution.
    pub fn embedding(&self) -> &Embedding {
        &self.embedding
    }

    pub fn machine_of(&self, node: VirtId) -> Option<PhysId> {
        self.embedding.node(node)
    }
}

impl fmt::Display for Solution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (virtual_node, physical_node) in &self.node_mapping {
            writeln!(f, "virtual node {virtual_node} mapped on physical node {physical_node}")?;
        }
        for link in &self.links {
            for m in &link.link_maps {
                writeln!(
                    f,
                    "virtual link ({}, {}) mapped on {}:{} -> {}:{} (fraction {:.3})",
                    link.source,
                    link.target,
                    m.source_node,
                    m.source_device,
                    m.dest_node,
                    m.dest_device,
                    m.fraction
                )?;
            }
        }
        write!(f, "machines used: {}", self.n_machines_used)
    }
}

// ── Ungrouping ────────────────────────────────────────────────────

/// Residual rate of real interfaces, lazily seeded from their capacity.
#[derive(Debug, Default)]
struct Residuals {
    left: HashMap<(LinkId, InterfaceId), u64>,
}

impl Residuals {
    fn get(&mut self, physical: &PhysicalNetwork, link: LinkId, iface: InterfaceId) -> u64 {
        *self
            .left
            .entry((link, iface))
            .or_insert_with(|| physical.real_interfaces(link)[iface.0 as usize].rate)
    }

    /// Real interface of `link` with the largest residual, first on ties.
    fn best(&mut self, physical: &PhysicalNetwork, link: LinkId) -> Option<(InterfaceId, u64)> {
        let mut best: Option<(InterfaceId, u64)> = None;
        for iface in physical.real_interfaces(link) {
            let left = self.get(physical, link, iface.id);
            if best.is_none_or(|(_, b)| left > b) {
                best = Some((iface.id, left));
            }
        }
        best
    }

    fn take(&mut self, physical: &PhysicalNetwork, link: LinkId, iface: InterfaceId, amount: u64) {
        let left = self.get(physical, link, iface);
        self.left.insert((link, iface), left.saturating_sub(amount));
    }
}

fn ungroup(
    virtual_net: &VirtualNetwork,
    physical: &PhysicalNetwork,
    link: VLinkId,
    hops: &[RouteHop],
    residuals: &mut Residuals,
) -> PlacementResult<Vec<Split>> {
    let requested = u64::from(virtual_net.req_rate(link));
    let mut remaining = requested;
    let mut splits = Vec::new();

    loop {
        let mut chosen = Vec::with_capacity(hops.len());
        let mut amount = remaining;
        for hop in hops {
            let Some((iface, left)) = residuals.best(physical, hop.channel.link) else {
                return Err(no_real_interface(physical, hop));
            };
            amount = amount.min(left);
            chosen.push((*hop, iface));
        }
        if requested == 0 {
            splits.push(Split {
                hops: chosen,
                fraction: 1.0,
            });
            return Ok(splits);
        }
        if amount == 0 {
            let hop = hops[0];
            return Err(PlacementError::LinkCapacity {
                link: physical.describe_channel(hop.channel),
                used: requested - remaining,
                max: requested,
            });
        }
        for &(hop, iface) in &chosen {
            residuals.take(physical, hop.channel.link, iface, amount);
        }
        remaining -= amount;
        splits.push(Split {
            hops: chosen,
            fraction: amount as f64 / requested as f64,
        });
        if remaining == 0 {
            return Ok(splits);
        }
    }
}

fn no_real_interface(physical: &PhysicalNetwork, hop: &RouteHop) -> PlacementError {
    PlacementError::LinkCapacity {
        link: physical.describe_channel(hop.channel),
        used: 0,
        max: 0,
    }
}

// ── Reporting ─────────────────────────────────────────────────────

fn path_hop(physical: &PhysicalNetwork, hop: RouteHop, iface: InterfaceId) -> PathHop {
    PathHop {
        source_node: physical.name(hop.from).to_string(),
        source_device: physical.device_name(hop.channel.link, iface, hop.from).to_string(),
        dest_device: physical.device_name(hop.channel.link, iface, hop.to).to_string(),
        dest_node: physical.name(hop.to).to_string(),
    }
}

fn directed(
    virtual_net: &VirtualNetwork,
    physical: &PhysicalNetwork,
    source: VirtId,
    target: VirtId,
    splits: &[Split],
    reverse: bool,
) -> DirectedLink {
    let mut link_maps = Vec::with_capacity(splits.len());
    let mut paths = Vec::with_capacity(splits.len());
    for split in splits {
        let hops: Vec<PathHop> = if reverse {
            split
                .hops
                .iter()
                .rev()
                .map(|&(h, i)| path_hop(physical, h.reversed(), i))
                .collect()
        } else {
            split.hops.iter().map(|&(h, i)| path_hop(physical, h, i)).collect()
        };
        if let (Some(first), Some(last)) = (hops.first(), hops.last()) {
            link_maps.push(LinkMap {
                source_node: first.source_node.clone(),
                source_device: first.source_device.clone(),
                dest_node: last.dest_node.clone(),
                dest_device: last.dest_device.clone(),
                fraction: split.fraction,
            });
        }
        paths.push(PhysicalPath {
            hops,
            fraction: split.fraction,
        });
    }
    DirectedLink {
        source: virtual_net.name(source).to_string(),
        target: virtual_net.name(target).to_string(),
        link_maps,
        paths,
    }
}
