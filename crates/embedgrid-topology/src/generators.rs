//! Synthetic topologies for tests, benchmarks and the CLI.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::{TopologyError, TopologyResult};
use crate::physical::PhysicalNetwork;
use crate::virtual_network::VirtualNetwork;

/// A `k`-ary fat-tree with `density` hosts per edge switch. Every node
/// (hosts and switches alike) requests the same cores and memory, every link
/// the same rate.
///
/// `k = 4, density = 2` yields 36 nodes and 48 links.
pub fn fat_tree(
    k: usize,
    density: usize,
    req_cores: u32,
    req_memory: u32,
    req_rate: u32,
) -> TopologyResult<VirtualNetwork> {
    if k < 2 || k % 2 != 0 {
        return Err(TopologyError::InvalidParameters(format!(
            "fat-tree arity must be even and at least 2, got {k}"
        )));
    }
    let half = k / 2;
    let n_core = half * half;
    let n_aggr = k * k / 2;
    let n_edge = n_aggr;
    let n_hosts = n_edge * density;

    let hosts: Vec<String> = (1..=n_hosts).map(|i| format!("host_{i}")).collect();
    let cores: Vec<String> = (1..=n_core).map(|i| format!("core_{i}")).collect();
    let aggrs: Vec<String> = (1..=n_aggr).map(|i| format!("aggr_{i}")).collect();
    let edges: Vec<String> = (1..=n_edge).map(|i| format!("edge_{i}")).collect();

    let mut b = VirtualNetwork::builder();
    for name in hosts.iter().chain(&cores).chain(&aggrs).chain(&edges) {
        b.add_node(name, req_cores, req_memory)?;
    }

    for pod in (0..n_aggr).step_by(half) {
        for i in 0..half {
            for j in 0..half {
                b.add_link(&cores[i * half + j], &aggrs[pod + i], req_rate)?;
                b.add_link(&aggrs[pod + i], &edges[pod + j], req_rate)?;
            }
        }
    }
    for (x, edge) in edges.iter().enumerate() {
        for host in &hosts[density * x..density * (x + 1)] {
            b.add_link(edge, host, req_rate)?;
        }
    }
    b.build()
}

/// Erdős–Rényi `G(n, p)` request: each unordered pair is linked with
/// probability `p`. Nodes are named `0..n`.
pub fn random_network(
    n_nodes: usize,
    p: f64,
    req_cores: u32,
    req_memory: u32,
    req_rate: u32,
    seed: u64,
) -> TopologyResult<VirtualNetwork> {
    if !(0.0..=1.0).contains(&p) {
        return Err(TopologyError::InvalidParameters(format!(
            "edge probability must be in [0, 1], got {p}"
        )));
    }
    let mut rng = StdRng::seed_from_u64(seed);
    let mut b = VirtualNetwork::builder();
    for i in 0..n_nodes {
        b.add_node(&i.to_string(), req_cores, req_memory)?;
    }
    for i in 0..n_nodes {
        for j in (i + 1)..n_nodes {
            if rng.random::<f64>() < p {
                b.add_link(&i.to_string(), &j.to_string(), req_rate)?;
            }
        }
    }
    b.build()
}

/// Unlinked nodes with EC2-like demands: 1 to 8 cores, memory 512 MiB or a
/// multiple of 1 GiB up to 8 GiB.
pub fn random_ec2(n_nodes: usize, seed: u64) -> TopologyResult<VirtualNetwork> {
    const MEMORY: [u32; 9] = [512, 1024, 2048, 3072, 4096, 5120, 6144, 7168, 8192];
    let mut rng = StdRng::seed_from_u64(seed);
    let mut b = VirtualNetwork::builder();
    for i in 0..n_nodes {
        let cores = rng.random_range(1..=8);
        let memory = MEMORY[rng.random_range(0..MEMORY.len())];
        b.add_node(&i.to_string(), cores, memory)?;
    }
    b.build()
}

/// Two nodes, `Node_0` and `Node_1`, joined by one link.
pub fn virtual_test_network(req_cores: u32, req_memory: u32, req_rate: u32) -> TopologyResult<VirtualNetwork> {
    let mut b = VirtualNetwork::builder();
    b.add_node("Node_0", req_cores, req_memory)?;
    b.add_node("Node_1", req_cores, req_memory)?;
    b.add_link("Node_0", "Node_1", req_rate)?;
    b.build()
}

/// Hosts `h1` and `h2` behind switch `s1`, each attached by two devices of
/// `rate`.
///
/// ```text
///        s1
///       /  \
///      h1   h2
/// ```
pub fn physical_test_network(cores: u32, memory: u32, rate: u64, grouped: bool) -> TopologyResult<PhysicalNetwork> {
    let mut b = PhysicalNetwork::builder();
    b.add_node("h1", cores, memory)?;
    b.add_node("h2", cores, memory)?;
    b.add_node("s1", 0, 0)?;
    b.add_device("h1", "s1", "eth0", "eth0", rate)?;
    b.add_device("h1", "s1", "eth1", "eth1", rate)?;
    b.add_device("h2", "s1", "eth0", "eth2", rate)?;
    b.add_device("h2", "s1", "eth1", "eth3", rate)?;
    b.build(grouped)
}

/// `n_hosts` identical hosts around one switch, each attached by
/// `interfaces` devices of `rate`.
pub fn star_cluster(
    n_hosts: usize,
    cores: u32,
    memory: u32,
    interfaces: usize,
    rate: u64,
    grouped: bool,
) -> TopologyResult<PhysicalNetwork> {
    if n_hosts == 0 || interfaces == 0 {
        return Err(TopologyError::InvalidParameters(
            "a star cluster needs at least one host and one interface".to_string(),
        ));
    }
    let mut b = PhysicalNetwork::builder();
    b.add_node("switch", 0, 0)?;
    for h in 1..=n_hosts {
        let host = format!("host_{h}");
        b.add_node(&host, cores, memory)?;
        for i in 0..interfaces {
            b.add_device(&host, "switch", &format!("eth{i}"), &format!("port{h}_{i}"), rate)?;
        }
    }
    b.build(grouped)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fat_tree_sizes() {
        let net = fat_tree(4, 2, 2, 8000, 200).unwrap();
        assert_eq!(net.number_of_nodes(), 36);
        assert_eq!(net.number_of_links(), 48);
        let net = fat_tree(2, 1, 1, 1, 1).unwrap();
        // 1 core, 2 aggr, 2 edge, 2 hosts
        assert_eq!(net.number_of_nodes(), 7);
    }

    #[test]
    fn fat_tree_rejects_odd_arity() {
        assert!(matches!(fat_tree(3, 1, 1, 1, 1), Err(TopologyError::InvalidParameters(_))));
    }

    #[test]
    fn random_network_is_reproducible() {
        let a = random_network(20, 0.3, 1, 100, 10, 5).unwrap();
        let b = random_network(20, 0.3, 1, 100, 10, 5).unwrap();
        assert_eq!(a.fingerprint(), b.fingerprint());
        let full = random_network(5, 1.0, 1, 100, 10, 0).unwrap();
        assert_eq!(full.number_of_links(), 10);
    }

    #[test]
    fn ec2_demands_stay_in_range() {
        let net = random_ec2(50, 99).unwrap();
        assert_eq!(net.number_of_links(), 0);
        for (_, n) in net.nodes() {
            assert!((1..=8).contains(&n.req_cores));
            assert!(n.req_memory == 512 || n.req_memory % 1024 == 0);
        }
    }

    #[test]
    fn test_networks_match_their_pictures() {
        let v = virtual_test_network(3, 3000, 20_000).unwrap();
        assert_eq!(v.number_of_links(), 1);
        let p = physical_test_network(4, 4000, 10_000, false).unwrap();
        assert_eq!(p.compute_nodes().len(), 2);
        assert_eq!(p.channels().count(), 4);
        let g = physical_test_network(4, 4000, 10_000, true).unwrap();
        assert_eq!(g.channels().count(), 2);
    }

    #[test]
    fn star_cluster_links_every_host() {
        let net = star_cluster(4, 8, 16_000, 2, 1_000, false).unwrap();
        assert_eq!(net.number_of_nodes(), 5);
        assert_eq!(net.number_of_links(), 4);
        let host = net.lookup("host_1").unwrap();
        assert_eq!(net.rate_out(host), 2_000);
    }
}
