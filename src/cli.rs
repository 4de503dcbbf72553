use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "opswatch")]
#[command(about = "Live ops state monitor", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Follow a server's operational state and log transitions
    Watch(WatchArgs),
}

#[derive(clap::Args, Debug)]
pub struct WatchArgs {
    /// Base URL of the ops server (overrides the configured value)
    #[arg(long)]
    pub base_url: Option<String>,

    /// Reporting range: 24h, 7d or 30d (overrides the configured value)
    #[arg(long)]
    pub range: Option<String>,

    /// Path to a configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,
}
