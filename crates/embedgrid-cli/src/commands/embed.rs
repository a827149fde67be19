use std::path::Path;

use anyhow::Context;
use tracing::info;

use embedgrid_core::{EmbedAlgorithm, EmbedgridConfig};
use embedgrid_topology::VirtualNetwork;

use crate::SubstrateArgs;

pub fn embed(substrate: &SubstrateArgs, virtual_path: &Path, config: &EmbedgridConfig, json: bool) -> anyhow::Result<()> {
    let physical = super::load_substrate(substrate)?;
    let virtual_net = VirtualNetwork::from_file(virtual_path)?;
    info!(
        compute_nodes = physical.compute_nodes().len(),
        virtual_nodes = virtual_net.number_of_nodes(),
        virtual_links = virtual_net.number_of_links(),
        "loaded topologies"
    );

    let mut strategy = embedgrid_embed::strategy_for(config, None).with_context(|| {
        if config.embed.algorithm == EmbedAlgorithm::Ilp {
            "embedctl has no built-in solver; use `embedctl export-lp embed` and an external engine".to_string()
        } else {
            format!("building the {} strategy", config.embed.algorithm)
        }
    })?;
    let outcome = strategy.solve(&virtual_net, &physical);

    if json {
        let report = serde_json::json!({
            "strategy": strategy.name(),
            "status": outcome.status,
            "code": outcome.status.code(),
            "elapsed_ms": outcome.elapsed.as_millis() as u64,
            "error": outcome.error.as_ref().map(ToString::to_string),
            "solution": outcome.solution,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("status = {} ({:.3}s)", outcome.status, outcome.elapsed.as_secs_f64());
    match (&outcome.solution, &outcome.error) {
        (Some(solution), _) => print!("{solution}"),
        (None, Some(err)) => println!("reason = {err}"),
        (None, None) => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const PHYSICAL: &str = r#"{
        "nodes": [
            {"id": "h1", "cores": 4, "memory": 4000},
            {"id": "h2", "cores": 4, "memory": 4000},
            {"id": "s1"}
        ],
        "links": [
            {"source": "h1", "target": "s1", "devices": [
                {"source_device": "eth0", "target_device": "eth0", "rate": 10000}
            ]},
            {"source": "h2", "target": "s1", "devices": [
                {"source_device": "eth0", "target_device": "eth1", "rate": 10000}
            ]}
        ]
    }"#;

    const VIRTUAL: &str = r#"{
        "nodes": [
            {"id": "a", "cores": 3, "memory": 1000},
            {"id": "b", "cores": 3, "memory": 1000}
        ],
        "links": [{"source": "a", "target": "b", "rate": 500}]
    }"#;

    fn make_files(dir: &Path) -> (SubstrateArgs, std::path::PathBuf) {
        let physical = dir.join("physical.json");
        let virtual_path = dir.join("virtual.json");
        std::fs::write(&physical, PHYSICAL).unwrap();
        std::fs::write(&virtual_path, VIRTUAL).unwrap();
        let substrate = SubstrateArgs {
            physical: vec![physical],
            grouped: false,
            n_interfaces: None,
        };
        (substrate, virtual_path)
    }

    #[test]
    fn embeds_files_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let (substrate, virtual_path) = make_files(dir.path());
        let config = EmbedgridConfig::default();
        embed(&substrate, &virtual_path, &config, false).unwrap();
        embed(&substrate, &virtual_path, &config, true).unwrap();
    }

    #[test]
    fn ilp_without_backend_points_to_export() {
        let dir = tempfile::tempdir().unwrap();
        let (substrate, virtual_path) = make_files(dir.path());
        let mut config = EmbedgridConfig::default();
        config.embed.algorithm = EmbedAlgorithm::Ilp;
        let err = embed(&substrate, &virtual_path, &config, false).unwrap_err();
        assert!(err.to_string().contains("export-lp"));
    }
}
