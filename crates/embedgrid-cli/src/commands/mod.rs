pub mod embed;
pub mod export;
pub mod generate;
pub mod inspect;
pub mod pack;

use std::path::Path;

use anyhow::Context;

use embedgrid_core::EmbedgridConfig;
use embedgrid_topology::{LoadOptions, PhysicalNetwork};

use crate::SubstrateArgs;

pub fn load_config(path: Option<&Path>) -> anyhow::Result<EmbedgridConfig> {
    match path {
        Some(path) => EmbedgridConfig::from_file(path).with_context(|| format!("reading {}", path.display())),
        None => Ok(EmbedgridConfig::default()),
    }
}

pub fn load_substrate(args: &SubstrateArgs) -> anyhow::Result<PhysicalNetwork> {
    let options = LoadOptions {
        group_interfaces: args.grouped,
        n_interfaces_to_consider: args.n_interfaces,
    };
    Ok(PhysicalNetwork::from_files(&args.physical, options)?)
}

/// Write `text` to `output`, or to stdout when absent.
pub fn emit(text: &str, output: Option<&Path>) -> anyhow::Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, text).with_context(|| format!("writing {}", path.display()))?;
            println!("✓ Wrote {}", path.display());
        }
        None => print!("{text}"),
    }
    Ok(())
}
