use std::path::Path;

use embedgrid_core::IlpObjective;
use embedgrid_topology::{CloudCatalog, VirtualNetwork};

use crate::SubstrateArgs;

pub fn embed_model(
    substrate: &SubstrateArgs,
    virtual_path: &Path,
    objective: IlpObjective,
    output: Option<&Path>,
) -> anyhow::Result<()> {
    let physical = super::load_substrate(substrate)?;
    let virtual_net = VirtualNetwork::from_file(virtual_path)?;
    let model = embedgrid_embed::formulate(&virtual_net, &physical, objective)?;
    super::emit(&model.into_problem().to_lp_format(), output)
}

pub fn pack_model(virtual_path: &Path, catalog_path: &Path, output: Option<&Path>) -> anyhow::Result<()> {
    let virtual_net = VirtualNetwork::from_file(virtual_path)?;
    let catalog = CloudCatalog::from_file(catalog_path)?;
    let model = embedgrid_pack::formulate(&virtual_net, &catalog)?;
    super::emit(&model.into_problem().to_lp_format(), output)
}
