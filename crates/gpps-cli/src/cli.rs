use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use gpps_sdk::DEFAULT_CHUNK_SIZE;
use gpps_types::{Namespace, NodeId};

#[derive(Parser)]
#[command(
    name = "gpps",
    about = "GPPS: General Purpose Permanent Storage node tables",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Directory holding the node journal (overrides the config file)
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// TOML configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Write a node, creating or replacing it
    Set(SetArgs),
    /// Read a node
    Get(GetArgs),
    /// Delete a node
    Del(DelArgs),
    /// Mark a scope immutable (node 0 = DEAD)
    Lock(LockArgs),
    /// Show node count, size and lock state of a scope
    Status(StatusArgs),
    /// List scopes, or the nodes of one scope
    Ls(LsArgs),
    /// Store a file as chunks at contiguous node ids
    Put(PutArgs),
    /// Reassemble a chunked file
    Fetch(FetchArgs),
    /// Rewrite the journal with one entry per live node
    Compact,
    /// Print the effective configuration
    Config,
}

#[derive(Args)]
pub struct SetArgs {
    /// Scope owner; the acting account
    #[arg(long)]
    pub owner: Namespace,
    #[arg(long)]
    pub id: NodeId,
    /// Payload as hex (e.g. DEAD)
    #[arg(long, conflicts_with = "file", required_unless_present = "file")]
    pub hex: Option<String>,
    /// Read the payload from a file
    #[arg(long)]
    pub file: Option<PathBuf>,
}

#[derive(Args)]
pub struct GetArgs {
    #[arg(long)]
    pub scope: Namespace,
    #[arg(long)]
    pub id: NodeId,
    /// Write the raw payload here instead of printing hex
    #[arg(short, long)]
    pub out: Option<PathBuf>,
}

#[derive(Args)]
pub struct DelArgs {
    #[arg(long)]
    pub owner: Namespace,
    #[arg(long)]
    pub id: NodeId,
}

#[derive(Args)]
pub struct LockArgs {
    #[arg(long)]
    pub owner: Namespace,
}

#[derive(Args)]
pub struct StatusArgs {
    #[arg(long)]
    pub scope: Namespace,
}

#[derive(Args)]
pub struct LsArgs {
    #[arg(long)]
    pub scope: Option<Namespace>,
    /// Lowest node id (inclusive)
    #[arg(short = 'L', long, default_value_t = 0)]
    pub lower: NodeId,
    /// Highest node id (inclusive)
    #[arg(short = 'U', long, default_value_t = NodeId::MAX)]
    pub upper: NodeId,
    #[arg(short = 'n', long)]
    pub limit: Option<usize>,
}

#[derive(Args)]
pub struct PutArgs {
    #[arg(long)]
    pub owner: Namespace,
    #[arg(long)]
    pub file: PathBuf,
    /// Id of the first chunk
    #[arg(long, default_value_t = 1)]
    pub start: NodeId,
    #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE)]
    pub chunk_size: usize,
}

#[derive(Args)]
pub struct FetchArgs {
    #[arg(long)]
    pub scope: Namespace,
    #[arg(long, default_value_t = 1)]
    pub start: NodeId,
    #[arg(short, long)]
    pub out: PathBuf,
}
