use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use embedgrid_core::{EmbedAlgorithm, IlpObjective, InterfacePolicy, PackAlgorithm};

mod commands;

#[derive(Parser)]
#[command(
    name = "embedctl",
    about = "embedgrid — virtual network embedding and cloud packing",
    version,
    propagate_version = true,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Where the physical substrate comes from.
#[derive(Args, Clone)]
pub struct SubstrateArgs {
    /// Physical topology file; repeat to merge several files
    #[arg(short, long = "physical", required = true)]
    pub physical: Vec<PathBuf>,
    /// Expose one aggregate interface per link
    #[arg(long)]
    pub grouped: bool,
    /// Read at most this many devices per link
    #[arg(long)]
    pub n_interfaces: Option<usize>,
}

#[derive(Subcommand)]
enum Commands {
    /// Embed a virtual network on a physical substrate
    Embed {
        #[command(flatten)]
        substrate: SubstrateArgs,
        /// Virtual topology file
        #[arg(short = 'r', long = "virtual")]
        virtual_net: PathBuf,
        /// embedgrid.toml with strategy parameters
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Override [embed].algorithm
        #[arg(short, long)]
        algorithm: Option<EmbedAlgorithm>,
        /// Override [embed].seed
        #[arg(long)]
        seed: Option<u64>,
        /// Override [embed].path_policy
        #[arg(long)]
        path_policy: Option<InterfacePolicy>,
        /// Print the solution as JSON
        #[arg(long)]
        json: bool,
    },
    /// Pack virtual nodes onto cloud instances
    Pack {
        /// Virtual topology file (links are ignored)
        #[arg(short = 'r', long = "virtual")]
        virtual_net: PathBuf,
        /// Instance catalog file
        #[arg(long)]
        catalog: PathBuf,
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Override [pack].algorithm
        #[arg(short, long)]
        algorithm: Option<PackAlgorithm>,
        #[arg(long)]
        json: bool,
    },
    /// Summarize topology and catalog files
    Inspect {
        #[arg(short, long = "physical")]
        physical: Vec<PathBuf>,
        #[arg(long)]
        grouped: bool,
        #[arg(short = 'r', long = "virtual")]
        virtual_net: Option<PathBuf>,
        #[arg(long)]
        catalog: Option<PathBuf>,
    },
    /// Write a generated virtual topology
    Generate {
        #[command(subcommand)]
        kind: GenerateKind,
    },
    /// Render an exact model as CPLEX-LP text for an external solver
    ExportLp {
        #[command(subcommand)]
        model: LpModel,
    },
}

#[derive(Subcommand)]
enum GenerateKind {
    /// k-ary fat-tree with uniform demands
    FatTree {
        #[arg(short, default_value_t = 4)]
        k: usize,
        /// Hosts per edge switch
        #[arg(long, default_value_t = 2)]
        density: usize,
        #[arg(long, default_value_t = 1)]
        cores: u32,
        /// Memory per node in MiB
        #[arg(long, default_value_t = 1024)]
        memory: u32,
        /// Rate per link in Mbps
        #[arg(long, default_value_t = 100)]
        rate: u32,
        /// Output file (stdout when absent)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Unlinked nodes with EC2-like demands
    Ec2 {
        #[arg(short, long)]
        nodes: usize,
        #[arg(long, default_value_t = 66)]
        seed: u64,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum LpModel {
    /// The embedding model
    Embed {
        #[command(flatten)]
        substrate: SubstrateArgs,
        #[arg(short = 'r', long = "virtual")]
        virtual_net: PathBuf,
        #[arg(long, default_value = "min_machines")]
        objective: IlpObjective,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// The packing model
    Pack {
        #[arg(short = 'r', long = "virtual")]
        virtual_net: PathBuf,
        #[arg(long)]
        catalog: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("embedgrid=info".parse()?)
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Embed {
            substrate,
            virtual_net,
            config,
            algorithm,
            seed,
            path_policy,
            json,
        } => {
            let mut config = commands::load_config(config.as_deref())?;
            if let Some(algorithm) = algorithm {
                config.embed.algorithm = algorithm;
            }
            if let Some(seed) = seed {
                config.embed.seed = seed;
            }
            if let Some(policy) = path_policy {
                config.embed.path_policy = policy;
            }
            commands::embed::embed(&substrate, &virtual_net, &config, json)
        }
        Commands::Pack {
            virtual_net,
            catalog,
            config,
            algorithm,
            json,
        } => {
            let mut config = commands::load_config(config.as_deref())?;
            if let Some(algorithm) = algorithm {
                config.pack.algorithm = algorithm;
            }
            commands::pack::pack(&virtual_net, &catalog, &config, json)
        }
        Commands::Inspect {
            physical,
            grouped,
            virtual_net,
            catalog,
        } => commands::inspect::inspect(&physical, grouped, virtual_net.as_deref(), catalog.as_deref()),
        Commands::Generate { kind } => match kind {
            GenerateKind::FatTree {
                k,
                density,
                cores,
                memory,
                rate,
                output,
            } => commands::generate::fat_tree(k, density, cores, memory, rate, output.as_deref()),
            GenerateKind::Ec2 { nodes, seed, output } => commands::generate::ec2(nodes, seed, output.as_deref()),
        },
        Commands::ExportLp { model } => match model {
            LpModel::Embed {
                substrate,
                virtual_net,
                objective,
                output,
            } => commands::export::embed_model(&substrate, &virtual_net, objective, output.as_deref()),
            LpModel::Pack {
                virtual_net,
                catalog,
                output,
            } => commands::export::pack_model(&virtual_net, &catalog, output.as_deref()),
        },
    }
}
