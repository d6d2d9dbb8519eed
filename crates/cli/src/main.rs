use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use strata_cli::commands::{diff, inspect, snapshots, timeline, verify};
use strata_cli::store::Store;
use strata_node::config::NodeConfig;

#[derive(Parser)]
#[command(name = "strata")]
#[command(about = "Strata operator CLI - inspect ledgers, snapshots and pending changes", long_about = None)]
struct Cli {
    /// Data directory (overrides STRATA_DATA_DIR; file storage under <dir>/chain)
    #[arg(long, short, global = true)]
    dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Backend, ledger, pending and snapshot status
    Inspect,
    /// Recompute every block hash and print the chain proof
    Verify,
    /// List blocks, newest first
    Timeline {
        #[arg(long, short, default_value_t = 20)]
        limit: usize,

        /// Only blocks holding a record of this type
        #[arg(long = "type", short = 't')]
        record_type: Option<String>,
    },
    /// List snapshots, newest first
    Snapshots {
        #[arg(long, short, default_value_t = 20)]
        limit: usize,
    },
    /// Compare two snapshots by hash or unique prefix
    Diff { from: String, to: String },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match cli.dir {
        Some(dir) => NodeConfig::with_data_dir(dir),
        None => NodeConfig::from_env().context("Invalid STRATA_* configuration")?,
    };
    let store = Store::open(config)?;

    match cli.command {
        Commands::Inspect => inspect::run(&store),
        Commands::Verify => verify::run(&store),
        Commands::Timeline { limit, record_type } => {
            timeline::run(&store, limit, record_type.as_deref())
        }
        Commands::Snapshots { limit } => snapshots::run(&store, limit),
        Commands::Diff { from, to } => diff::run(&store, &from, &to),
    }
}
