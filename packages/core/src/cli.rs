use std::path::PathBuf;

use clap::Parser;

/// Multi-chain Fee Tracker CLI arguments
#[derive(Debug, Parser)]
#[command(
    name = "multichain-fee-tracker",
    version,
    about = "Validated transaction fee snapshots across many blockchains"
)]
pub struct Cli {
    /// Build one snapshot, print it as JSON and exit
    #[arg(long)]
    pub once: bool,

    /// HTTP API port
    #[arg(long)]
    pub port: Option<u16>,

    /// Snapshot polling interval in seconds
    #[arg(long)]
    pub poll_interval: Option<u64>,

    /// JSON file describing the chains to track
    #[arg(long)]
    pub chains_file: Option<PathBuf>,
}
