//! JSON topology files.
//!
//! Physical substrate:
//!
//! ```json
//! {
//!   "nodes": [{"id": "h1", "cores": 4, "memory": 4000}, {"id": "s1"}],
//!   "links": [{"source": "h1", "target": "s1",
//!              "devices": [{"source_device": "eth0", "target_device": "eth0", "rate": 10000}]}]
//! }
//! ```
//!
//! Virtual request:
//!
//! ```json
//! {
//!   "nodes": [{"id": "vm0", "cores": 2, "memory": 2048}],
//!   "links": [{"source": "vm0", "target": "vm1", "rate": 200}]
//! }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{TopologyError, TopologyResult};
use crate::physical::PhysicalNetwork;
use crate::virtual_network::VirtualNetwork;

/// How a physical topology file is turned into a network.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadOptions {
    /// Expose one aggregate interface per link.
    pub group_interfaces: bool,
    /// Read at most this many devices per link.
    pub n_interfaces_to_consider: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhysicalTopologyFile {
    pub nodes: Vec<PhysicalNodeEntry>,
    #[serde(default)]
    pub links: Vec<PhysicalLinkEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhysicalNodeEntry {
    pub id: String,
    #[serde(default)]
    pub cores: u32,
    #[serde(default)]
    pub memory: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhysicalLinkEntry {
    pub source: String,
    pub target: String,
    pub devices: Vec<DeviceEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceEntry {
    pub source_device: String,
    pub target_device: String,
    pub rate: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VirtualTopologyFile {
    pub nodes: Vec<VirtualNodeEntry>,
    #[serde(default)]
    pub links: Vec<VirtualLinkEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VirtualNodeEntry {
    pub id: String,
    #[serde(default)]
    pub cores: u32,
    #[serde(default)]
    pub memory: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VirtualLinkEntry {
    pub source: String,
    pub target: String,
    pub rate: u32,
}

pub(crate) fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> TopologyResult<T> {
    let content = std::fs::read_to_string(path).map_err(|source| TopologyError::Read {
        path: path.display().to_string(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| TopologyError::Parse {
        path: path.display().to_string(),
        source,
    })
}

impl PhysicalNetwork {
    /// Load and merge one or more physical topology files. Nodes listed in
    /// several files are merged; devices between the same pair of nodes
    /// become parallel interfaces of one link.
    pub fn from_files<P: AsRef<Path>>(paths: &[P], options: LoadOptions) -> TopologyResult<Self> {
        let files = paths
            .iter()
            .map(|p| read_json::<PhysicalTopologyFile>(p.as_ref()))
            .collect::<TopologyResult<Vec<_>>>()?;
        Self::from_topology_files(&files, options)
    }

    pub fn from_json_str(json: &str, options: LoadOptions) -> TopologyResult<Self> {
        let file: PhysicalTopologyFile = serde_json::from_str(json).map_err(|source| TopologyError::Parse {
            path: "<inline>".to_string(),
            source,
        })?;
        Self::from_topology_files(std::slice::from_ref(&file), options)
    }

    pub fn from_topology_files(files: &[PhysicalTopologyFile], options: LoadOptions) -> TopologyResult<Self> {
        let mut builder = PhysicalNetwork::builder();
        if let Some(cap) = options.n_interfaces_to_consider {
            builder = builder.max_interfaces_per_link(cap);
        }
        for file in files {
            for node in &file.nodes {
                builder.ensure_node(&node.id, node.cores, node.memory);
            }
            for link in &file.links {
                for device in &link.devices {
                    builder.add_device(
                        &link.source,
                        &link.target,
                        &device.source_device,
                        &device.target_device,
                        device.rate,
                    )?;
                }
            }
        }
        let network = builder.build(options.group_interfaces)?;
        debug!(
            nodes = network.number_of_nodes(),
            links = network.number_of_links(),
            compute = network.compute_nodes().len(),
            grouped = options.group_interfaces,
            "loaded physical network"
        );
        Ok(network)
    }

    /// File form of this network, listing every real device.
    pub fn to_topology_file(&self) -> PhysicalTopologyFile {
        PhysicalTopologyFile {
            nodes: self
                .nodes()
                .map(|(_, n)| PhysicalNodeEntry {
                    id: n.name.clone(),
                    cores: n.cores,
                    memory: n.memory,
                })
                .collect(),
            links: self
                .links()
                .map(|(_, l)| PhysicalLinkEntry {
                    source: self.name(l.ends[0]).to_string(),
                    target: self.name(l.ends[1]).to_string(),
                    devices: l
                        .real_interfaces()
                        .iter()
                        .map(|i| DeviceEntry {
                            source_device: i.device(0).to_string(),
                            target_device: i.device(1).to_string(),
                            rate: i.rate,
                        })
                        .collect(),
                })
                .collect(),
        }
    }
}

impl VirtualNetwork {
    pub fn from_file(path: &Path) -> TopologyResult<Self> {
        let file: VirtualTopologyFile = read_json(path)?;
        Self::from_topology_file(&file)
    }

    pub fn from_json_str(json: &str) -> TopologyResult<Self> {
        let file: VirtualTopologyFile = serde_json::from_str(json).map_err(|source| TopologyError::Parse {
            path: "<inline>".to_string(),
            source,
        })?;
        Self::from_topology_file(&file)
    }

    pub fn from_topology_file(file: &VirtualTopologyFile) -> TopologyResult<Self> {
        let mut builder = VirtualNetwork::builder();
        for node in &file.nodes {
            builder.add_node(&node.id, node.cores, node.memory)?;
        }
        for link in &file.links {
            builder.add_link(&link.source, &link.target, link.rate)?;
        }
        builder.build()
    }

    pub fn to_topology_file(&self) -> VirtualTopologyFile {
        VirtualTopologyFile {
            nodes: self
                .nodes()
                .map(|(_, n)| VirtualNodeEntry {
                    id: n.name.clone(),
                    cores: n.req_cores,
                    memory: n.req_memory,
                })
                .collect(),
            links: self
                .links()
                .map(|(_, l)| VirtualLinkEntry {
                    source: self.name(l.ends[0]).to_string(),
                    target: self.name(l.ends[1]).to_string(),
                    rate: l.req_rate,
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::LinkId;

    const GRID: &str = r#"{
        "nodes": [
            {"id": "h1", "cores": 8, "memory": 16000},
            {"id": "h2", "cores": 8, "memory": 16000},
            {"id": "sw"}
        ],
        "links": [
            {"source": "h1", "target": "sw", "devices": [
                {"source_device": "eth0", "target_device": "Eth1/1", "rate": 10000},
                {"source_device": "eth1", "target_device": "Eth1/2", "rate": 10000}
            ]},
            {"source": "sw", "target": "h2", "devices": [
                {"source_device": "Eth1/3", "target_device": "eth0", "rate": 10000}
            ]}
        ]
    }"#;

    #[test]
    fn parses_physical_json() {
        let net = PhysicalNetwork::from_json_str(GRID, LoadOptions::default()).unwrap();
        assert_eq!(net.number_of_nodes(), 3);
        assert_eq!(net.compute_nodes().len(), 2);
        let sw = net.lookup("sw").unwrap();
        let h2 = net.lookup("h2").unwrap();
        let link = net.link_between(h2, sw).unwrap();
        let iface = net.real_interfaces(link)[0].id;
        assert_eq!(net.device_name(link, iface, h2), "eth0");
        assert_eq!(net.device_name(link, iface, sw), "Eth1/3");
    }

    #[test]
    fn interface_cap_and_grouping_apply() {
        let options = LoadOptions {
            group_interfaces: true,
            n_interfaces_to_consider: Some(1),
        };
        let net = PhysicalNetwork::from_json_str(GRID, options).unwrap();
        assert!(net.grouped_interfaces());
        assert_eq!(net.real_interfaces(LinkId(0)).len(), 1);
        assert_eq!(net.interfaces(LinkId(0))[0].rate, 10_000);
    }

    #[test]
    fn zero_devices_per_link_is_rejected() {
        let options = LoadOptions {
            group_interfaces: false,
            n_interfaces_to_consider: Some(0),
        };
        let err = PhysicalNetwork::from_json_str(GRID, options).unwrap_err();
        assert!(matches!(err, TopologyError::NoInterfaces(..)));
        assert!(err.to_string().contains("has no interfaces"));
    }

    #[test]
    fn disconnected_file_is_rejected() {
        let json = r#"{"nodes": [{"id": "a", "cores": 1, "memory": 1}, {"id": "b", "cores": 1, "memory": 1}]}"#;
        assert!(matches!(
            PhysicalNetwork::from_json_str(json, LoadOptions::default()),
            Err(TopologyError::Disconnected)
        ));
    }

    #[test]
    fn merges_several_files() {
        let dir = tempfile::tempdir().unwrap();
        let left = dir.path().join("left.json");
        let right = dir.path().join("right.json");
        std::fs::write(
            &left,
            r#"{"nodes": [{"id": "a", "cores": 2, "memory": 2000}, {"id": "sw"}],
                "links": [{"source": "a", "target": "sw", "devices": [{"source_device": "e0", "target_device": "p0", "rate": 100}]}]}"#,
        )
        .unwrap();
        std::fs::write(
            &right,
            r#"{"nodes": [{"id": "b", "cores": 2, "memory": 2000}, {"id": "sw"}],
                "links": [{"source": "sw", "target": "b", "devices": [{"source_device": "p1", "target_device": "e0", "rate": 100}]}]}"#,
        )
        .unwrap();
        let net = PhysicalNetwork::from_files(&[&left, &right], LoadOptions::default()).unwrap();
        assert_eq!(net.number_of_nodes(), 3);
        assert_eq!(net.number_of_links(), 2);
    }

    #[test]
    fn missing_file_reports_path() {
        let err = VirtualNetwork::from_file(Path::new("/nonexistent/virtual.json")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/virtual.json"));
    }

    #[test]
    fn virtual_file_round_trips_through_disk() {
        let json = r#"{"nodes": [{"id": "u", "cores": 1, "memory": 512}, {"id": "v", "cores": 2, "memory": 1024}],
                       "links": [{"source": "v", "target": "u", "rate": 300}]}"#;
        let net = VirtualNetwork::from_json_str(json).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("virtual.json");
        std::fs::write(&path, serde_json::to_string(&net.to_topology_file()).unwrap()).unwrap();
        let again = VirtualNetwork::from_file(&path).unwrap();
        assert_eq!(again.fingerprint(), net.fingerprint());
        let (_, link) = again.links().next().unwrap();
        assert_eq!(again.name(link.ends[0]), "u");
    }
}
