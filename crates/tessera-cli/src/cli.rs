use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "tessera",
    about = "Tessera content-addressed chunk store",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Repository directory
    #[arg(short = 'C', long, global = true, default_value = ".")]
    pub repo: PathBuf,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create a repository
    Init(InitArgs),
    /// Store a JSON document as a value
    Put(PutArgs),
    /// Print a stored value as JSON
    Show(ShowArgs),
    /// Walk the items of a stored collection
    Walk(WalkArgs),
    /// Show the chunk tree of a stored collection
    Stats(StatsArgs),
    /// Show replica dial settings from a cluster config
    Cluster(ClusterArgs),
}

#[derive(Args)]
pub struct InitArgs {
    /// Binary format: "ld-1" or "7.18"
    #[arg(long)]
    pub format: Option<String>,
    /// Items per chunk
    #[arg(long)]
    pub chunk_size: Option<usize>,
}

#[derive(Args)]
pub struct PutArgs {
    /// JSON text; arrays become lists, objects become maps
    pub json: String,
    /// Store top-level arrays as sets
    #[arg(long)]
    pub set: bool,
}

#[derive(Args)]
pub struct ShowArgs {
    pub hash: String,
}

#[derive(Args)]
pub struct WalkArgs {
    pub hash: String,
    /// Walk from the end toward the start
    #[arg(long)]
    pub reverse: bool,
    /// Leaf index to start at
    #[arg(long)]
    pub from: Option<u64>,
    /// Maximum number of items to print
    #[arg(short = 'n', long)]
    pub limit: Option<usize>,
}

#[derive(Args)]
pub struct StatsArgs {
    pub hash: String,
}

#[derive(Args)]
pub struct ClusterArgs {
    /// Path to the cluster TOML file
    pub config: PathBuf,
    /// Database name substituted into remote URL templates
    #[arg(long, default_value = "main")]
    pub database: String,
}
