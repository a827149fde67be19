use std::path::Path;

use anyhow::Context;

use embedgrid_core::{EmbedgridConfig, PackAlgorithm};
use embedgrid_topology::{CloudCatalog, VirtualNetwork};

pub fn pack(virtual_path: &Path, catalog_path: &Path, config: &EmbedgridConfig, json: bool) -> anyhow::Result<()> {
    let virtual_net = VirtualNetwork::from_file(virtual_path)?;
    let catalog = CloudCatalog::from_file(catalog_path)?;

    let mut strategy = embedgrid_pack::strategy_for(config, None).with_context(|| {
        if config.pack.algorithm == PackAlgorithm::Ilp {
            "embedctl has no built-in solver; use `embedctl export-lp pack` and an external engine".to_string()
        } else {
            format!("building the {} strategy", config.pack.algorithm)
        }
    })?;
    let outcome = strategy.solve(&virtual_net, &catalog);

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
