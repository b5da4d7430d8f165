use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use fundme_deploy::Tag;
use tracing::level_filters::LevelFilter;

#[derive(Parser)]
#[command(name = "fundme")]
#[command(
    author,
    version,
    about = "Deploy the FundMe contract to local and public networks"
)]
pub struct Cli {
    /// The verbosity level.
    #[arg(short, long, global = true, env = "FUNDME_VERBOSITY", default_value_t = LevelFilter::INFO)]
    pub verbosity: LevelFilter,

    /// Path to the configuration file.
    ///
    /// Defaults to ./fundme.toml. A missing file falls back to the built-in networks.
    #[arg(short, long, global = true, env = "FUNDME_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the deploy scripts against a network.
    Deploy(DeployArgs),
    /// List the configured networks.
    Networks,
}

#[derive(Args)]
pub struct DeployArgs {
    /// The network to deploy to. Defaults to the configured default network.
    #[arg(short, long, env = "FUNDME_NETWORK")]
    pub network: Option<String>,

    /// Only run the scripts carrying one of these tags (all, mocks, fundme).
    ///
    /// If not provided, every script runs.
    #[arg(short, long, value_delimiter = ',')]
    pub tags: Vec<Tag>,
}
