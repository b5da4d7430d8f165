//! fundme is a CLI tool to deploy the FundMe contract to local and public networks.

mod cli;

use anyhow::Result;
use clap::Parser;
use comfy_table::{Table, presets::UTF8_FULL};

use cli::{Cli, Command, DeployArgs};
use fundme_deploy::{
    DeploymentConfig, NetworkRegistry,
    runner::{self, RunSummary},
    scripts::ScriptOutput,
};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize the logger.
    tracing_subscriber::fmt()
        .with_max_level(cli.verbosity)
        .init();

    let config = DeploymentConfig::load(cli.config.as_deref())?;

    match cli.command {
        Command::Deploy(args) => deploy(&config, args).await,
        Command::Networks => networks(&config),
    }
}

async fn deploy(config: &DeploymentConfig, args: DeployArgs) -> Result<()> {
    let network = args
        .network
        .unwrap_or_else(|| config.default_network.clone());

    let summary = runner::deploy(config, &network, &args.tags).await?;
    print_summary(&summary);

    Ok(())
}

fn print_summary(summary: &RunSummary) {
    for (script, output) in &summary.outputs {
        match output {
            ScriptOutput::Skipped => {
                tracing::debug!(script, "Nothing to deploy");
            }
            ScriptOutput::Mock(address) => {
                tracing::info!(script, address = %address, "Price feed mock ready");
            }
            ScriptOutput::Deployment(report) => {
                tracing::info!(
                    script,
                    network = %summary.session.network_name,
                    address = %report.result.contract_address,
                    confirmations = report.result.confirmations_waited,
                    newly_deployed = report.deployment.newly_deployed,
                    verification = %report.verification,
                    "FundMe ready"
                );
            }
        }
    }
}

fn networks(config: &DeploymentConfig) -> Result<()> {
    let registry = NetworkRegistry::from_config(config)?;

    let mut names: Vec<&str> = config.networks.keys().map(String::as_str).collect();
    for chain in &config.development_chains {
        if !names.contains(&chain.as_str()) {
            names.push(chain);
        }
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(vec![
        "Network",
        "Chain id",
        "Development",
        "Confirmations",
        "Price feed",
        "RPC URL",
    ]);

    for name in names {
        let Some(network) = config.network(name) else {
            continue;
        };
        let is_development = registry.is_development(name);
        let price_feed = if is_development {
            "mock".to_string()
        } else {
            network
                .eth_usd_price_feed
                .map_or_else(|| "-".to_string(), |feed| feed.to_string())
        };

        table.add_row(vec![
            name.to_string(),
            network.chain_id.to_string(),
            is_development.to_string(),
            registry
                .required_confirmations(network.chain_id)
                .to_string(),
            price_feed,
            network.url,
        ]);
    }

    println!("{table}");
    Ok(())
}
