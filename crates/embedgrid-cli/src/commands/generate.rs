use std::path::Path;

use embedgrid_topology::VirtualNetwork;
use embedgrid_topology::generators;

fn write_network(network: &VirtualNetwork, output: Option<&Path>) -> anyhow::Result<()> {
    let mut text = serde_json::to_string_pretty(&network.to_topology_file())?;
    text.push('\n');
    super::emit(&text, output)
}

pub fn fat_tree(k: usize, density: usize, cores: u32, memory: u32, rate: u32, output: Option<&Path>) -> anyhow::Result<()> {
    let network = generators::fat_tree(k, density, cores, memory, rate)?;
    write_network(&network, output)
}

pub fn ec2(nodes: usize, seed: u64, output: Option<&Path>) -> anyhow::Result<()> {
    let network = generators::random_ec2(nodes, seed)?;
    write_network(&network, output)
}
