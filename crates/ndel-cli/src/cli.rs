use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "ndel",
    about = "ndel: content-addressed object server",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the object server
    Serve(ServeArgs),
    /// Print the object id a file would be stored under
    Hash(HashArgs),
    /// Check blob store and metadata index consistency
    Fsck(FsckArgs),
    /// Print the effective configuration
    Config(ConfigArgs),
}

/// Where configuration comes from, shared by commands that open the stores.
#[derive(Args, Debug, Default)]
pub struct ConfigSource {
    /// TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// Override the data directory
    #[arg(long)]
    pub data_path: Option<PathBuf>,
}

#[derive(Args)]
pub struct ServeArgs {
    #[command(flatten)]
    pub source: ConfigSource,
    /// Override the listen address (`tcp://host:port`, `host:port` or `:port`)
    #[arg(long)]
    pub listen: Option<String>,
}

#[derive(Args)]
pub struct HashArgs {
    #[arg(required = true)]
    pub files: Vec<PathBuf>,
}

#[derive(Args)]
pub struct FsckArgs {
    #[command(flatten)]
    pub source: ConfigSource,
    /// Skip re-hashing blob contents
    #[arg(long)]
    pub quick: bool,
}

#[derive(Args)]
pub struct ConfigArgs {
    #[command(flatten)]
    pub source: ConfigSource,
}
