//! Virtual request — the topology to embed.
//!
//! A [`VirtualNetwork`] is a simple undirected graph. Every link is stored
//! with its endpoints in canonical (lexicographic by name) order, and links
//! are numbered in that sorted order, so [`VLinkId`]s enumerate the edge set
//! the same way for every consumer.

use std::collections::HashMap;

use crate::error::{TopologyError, TopologyResult};
use crate::fingerprint::fingerprint;
use crate::ids::{VLinkId, VirtId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VirtualNode {
    pub name: String,
    pub req_cores: u32,
    /// Required memory in MiB.
    pub req_memory: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VirtualLink {
    /// Endpoints, `ends[0]` has the lexicographically smaller name.
    pub ends: [VirtId; 2],
    pub req_rate: u32,
}

impl VirtualLink {
    pub fn other_end(&self, node: VirtId) -> VirtId {
        if self.ends[0] == node {
            self.ends[1]
        } else {
            self.ends[0]
        }
    }
}

#[derive(Debug, Clone)]
pub struct VirtualNetwork {
    nodes: Vec<VirtualNode>,
    index: HashMap<String, VirtId>,
    links: Vec<VirtualLink>,
    link_index: HashMap<(VirtId, VirtId), VLinkId>,
    adjacency: Vec<Vec<(VirtId, VLinkId)>>,
    total_cores: u64,
    total_memory: u64,
    fingerprint: String,
}

impl VirtualNetwork {
    pub fn builder() -> VirtualNetworkBuilder {
        VirtualNetworkBuilder::default()
    }

    pub fn number_of_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn number_of_links(&self) -> usize {
        self.links.len()
    }

    /// Node ids in insertion order.
    pub fn node_ids(&self) -> impl Iterator<Item = VirtId> + '_ {
        (0..self.nodes.len()).map(VirtId)
    }

    pub fn nodes(&self) -> impl Iterator<Item = (VirtId, &VirtualNode)> {
        self.nodes.iter().enumerate().map(|(i, n)| (VirtId(i), n))
    }

    pub fn node(&self, id: VirtId) -> &VirtualNode {
        self.nodes
            .get(id.0)
            .unwrap_or_else(|| panic!("unknown virtual node {id}"))
    }

    pub fn name(&self, id: VirtId) -> &str {
        &self.node(id).name
    }

    pub fn lookup(&self, name: &str) -> Option<VirtId> {
        self.index.get(name).copied()
    }

    pub fn req_cores(&self, id: VirtId) -> u32 {
        self.node(id).req_cores
    }

    pub fn req_memory(&self, id: VirtId) -> u32 {
        self.node(id).req_memory
    }

    /// Links in canonical sorted order.
    pub fn links(&self) -> impl Iterator<Item = (VLinkId, &VirtualLink)> {
        self.links.iter().enumerate().map(|(i, l)| (VLinkId(i), l))
    }

    pub fn link(&self, id: VLinkId) -> &VirtualLink {
        self.links
            .get(id.0)
            .unwrap_or_else(|| panic!("unknown virtual link {id}"))
    }

    pub fn req_rate(&self, id: VLinkId) -> u32 {
        self.link(id).req_rate
    }

    pub fn link_between(&self, a: VirtId, b: VirtId) -> Option<VLinkId> {
        let key = if a <= b { (a, b) } else { (b, a) };
        self.link_index.get(&key).copied()
    }

    /// Neighbors of `id` with the link reaching each.
    pub fn neighbors(&self, id: VirtId) -> &[(VirtId, VLinkId)] {
        self.adjacency
            .get(id.0)
            .unwrap_or_else(|| panic!("unknown virtual node {id}"))
    }

    pub fn total_cores(&self) -> u64 {
        self.total_cores
    }

    pub fn total_memory(&self) -> u64 {
        self.total_memory
    }

    /// Content hash of the node and link set, stable across insertion order.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// `"u-v"` label of a link, used in error reports.
    pub fn describe_link(&self, id: VLinkId) -> String {
        let link = self.link(id);
        format!("{}-{}", self.name(link.ends[0]), self.name(link.ends[1]))
    }
}

// ── Builder ───────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct VirtualNetworkBuilder {
    nodes: Vec<VirtualNode>,
    index: HashMap<String, VirtId>,
    links: HashMap<(VirtId, VirtId), u32>,
}

impl VirtualNetworkBuilder {
    pub fn add_node(&mut self, name: &str, req_cores: u32, req_memory: u32) -> TopologyResult<VirtId> {
        if self.index.contains_key(name) {
            return Err(TopologyError::DuplicateNode(name.to_string()));
        }
        let id = VirtId(self.nodes.len());
        self.nodes.push(VirtualNode {
            name: name.to_string(),
            req_cores,
            req_memory,
        });
        self.index.insert(name.to_string(), id);
        Ok(id)
    }

    pub fn add_link(&mut self, a: &str, b: &str, req_rate: u32) -> TopologyResult<()> {
        let ia = self.resolve(a)?;
        let ib = self.resolve(b)?;
        if ia == ib {
            return Err(TopologyError::SelfLoop(a.to_string()));
        }
        let key = if ia < ib { (ia, ib) } else { (ib, ia) };
        if self.links.insert(key, req_rate).is_some() {
            return Err(TopologyError::DuplicateLink(a.to_string(), b.to_string()));
        }
        Ok(())
    }

    fn resolve(&self, name: &str) -> TopologyResult<VirtId> {
        self.index
            .get(name)
            .copied()
            .ok_or_else(|| TopologyError::UnknownNode(name.to_string()))
    }

    pub fn build(self) -> TopologyResult<VirtualNetwork> {
        if self.nodes.is_empty() {
            return Err(TopologyError::Empty);
        }
        let nodes = self.nodes;

        let mut links: Vec<VirtualLink> = self
            .links
            .into_iter()
            .map(|((a, b), req_rate)| {
                let ends = if nodes[a.0].name <= nodes[b.0].name {
                    [a, b]
                } else {
                    [b, a]
                };
                VirtualLink { ends, req_rate }
            })
            .collect();
        links.sort_by(|x, y| {
            let kx = (&nodes[x.ends[0].0].name, &nodes[x.ends[1].0].name);
            let ky = (&nodes[y.ends[0].0].name, &nodes[y.ends[1].0].name);
            kx.cmp(&ky)
        });

        let mut adjacency = vec![Vec::new(); nodes.len()];
        let mut link_index = HashMap::with_capacity(links.len());
        for (i, link) in links.iter().enumerate() {
            let [a, b] = link.ends;
            adjacency[a.0].push((b, VLinkId(i)));
            adjacency[b.0].push((a, VLinkId(i)));
            let key = if a <= b { (a, b) } else { (b, a) };
            link_index.insert(key, VLinkId(i));
        }

        let total_cores = nodes.iter().map(|n| u64::from(n.req_cores)).sum();
        let total_memory = nodes.iter().map(|n| u64::from(n.req_memory)).sum();

        // Ids are part of the content: cached partitions are sets of ids.
        let lines = nodes
            .iter()
            .enumerate()
            .map(|(i, n)| format!("node {i} {}:{} {} {}", n.name.len(), n.name, n.req_cores, n.req_memory))
            .chain(
                links
                    .iter()
                    .map(|l| format!("link {} {} {}", l.ends[0].0, l.ends[1].0, l.req_rate)),
            );
        let fingerprint = fingerprint(lines);

        Ok(VirtualNetwork {
            nodes,
            index: self.index,
            links,
            link_index,
            adjacency,
            total_cores,
            total_memory,
            fingerprint,
        })
    }
}
