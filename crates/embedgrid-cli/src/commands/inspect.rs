use std::path::{Path, PathBuf};

use embedgrid_topology::{CloudCatalog, LoadOptions, PhysicalNetwork, VirtualNetwork};

pub fn inspect(
    physical: &[PathBuf],
    grouped: bool,
    virtual_path: Option<&Path>,
    catalog_path: Option<&Path>,
) -> anyhow::Result<()> {
    if physical.is_empty() && virtual_path.is_none() && catalog_path.is_none() {
        anyhow::bail!("nothing to inspect: pass --physical, --virtual or --catalog");
    }

    if !physical.is_empty() {
        let options = LoadOptions {
            group_interfaces: grouped,
            n_interfaces_to_consider: None,
        };
        let network = PhysicalNetwork::from_files(physical, options)?;
        println!("{}", describe_physical(&network));
    }
    if let Some(path) = virtual_path {
        println!("{}", describe_virtual(&VirtualNetwork::from_file(path)?));
    }
    if let Some(path) = catalog_path {
        println!("{}", describe_catalog(&CloudCatalog::from_file(path)?));
    }
    Ok(())
}

fn describe_physical(network: &PhysicalNetwork) -> String {
    let compute = network.compute_nodes();
    let cores: u64 = compute.iter().map(|&p| u64::from(network.cores(p))).sum();
    let memory: u64 = compute.iter().map(|&p| u64::from(network.memory(p))).sum();
    let interfaces: usize = network.links().map(|(id, _)| network.interfaces(id).len()).sum();
    format!(
        "physical: {} nodes ({} compute), {} links, {} interfaces{}\n  cores = {cores}, memory = {memory} MiB",
        network.number_of_nodes(),
        compute.len(),
        network.number_of_links(),
        interfaces,
        if network.grouped_interfaces() { " (grouped)" } else { "" },
    )
}

fn describe_virtual(network: &VirtualNetwork) -> String {
    let rate: u64 = network.links().map(|(id, _)| u64::from(network.req_rate(id))).sum();
    format!(
        "virtual: {} nodes, {} links\n  cores = {}, memory = {} MiB, rate = {rate} Mbps\n  fingerprint = {}",
        network.number_of_nodes(),
        network.number_of_links(),
        network.total_cores(),
        network.total_memory(),
        network.fingerprint(),
    )
}

fn describe_catalog(catalog: &CloudCatalog) -> String {
    let mut out = format!("catalog: {} instance types", catalog.len());
    for (_, t) in catalog.types() {
        out.push_str(&format!(
            "\n  {:<16} {:>3} vCPU {:>7} MiB  {:.4}/h",
            t.name, t.cores, t.memory, t.hourly_cost
        ));
    }
    out
}
