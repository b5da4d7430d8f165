//! Staging test against a live FundMe deployment.
//!
//! Deploy first (`fundme deploy --network sepolia`), then run with:
//! FUNDME_NETWORK=sepolia cargo test --test staging_test
//!
//! The target network is resolved before any test runs. On development networks the test is
//! reported as ignored.

use alloy_core::primitives::U256;
use anyhow::{Context, Result};
use fundme_deploy::{
    DeployerIdentity, DeploymentConfig, FundMeClient, NetworkRegistry, records::DeploymentRecords,
    runner,
};
use libtest_mimic::{Arguments, Failed, Trial};

/// 0.1 ether.
const SEND_VALUE: u128 = 100_000_000_000_000_000;

const TEST_NAME: &str = "test_fund_and_withdraw";

/// The loaded configuration and the network the test targets.
fn target() -> Result<(DeploymentConfig, String)> {
    let config = DeploymentConfig::load(None)?;
    let network =
        std::env::var("FUNDME_NETWORK").unwrap_or_else(|_| config.default_network.clone());
    Ok((config, network))
}

async fn fund_and_withdraw(config: DeploymentConfig, network: String) -> Result<()> {
    let registry = NetworkRegistry::from_config(&config)?;
    let (client, session) = runner::connect(&config, &network).await?;
    let deployer = DeployerIdentity::for_network(&config, &network)?;

    let fund_me = FundMeClient::from_records(
        runner::transaction_sender(&config, client),
        &DeploymentRecords::new(&config.deployments_dir, &network),
        registry.required_confirmations(session.chain_id),
    )
    .context("FundMe must be deployed before running the staging test")?;

    fund_me.fund(&deployer, U256::from(SEND_VALUE)).await?;
    fund_me.withdraw(&deployer).await?;

    let ending_balance = fund_me.balance().await?;
    anyhow::ensure!(
        ending_balance == U256::ZERO,
        "contract still holds {ending_balance} wei after withdraw"
    );

    Ok(())
}

fn run(config: DeploymentConfig, network: String) -> Result<(), Failed> {
    if config.is_development(&network) {
        return Err(format!("{network} is a development network, nothing to stage against")
            .into());
    }

    let runtime = tokio::runtime::Runtime::new()?;
    runtime
        .block_on(fund_and_withdraw(config, network))
        .map_err(|e| format!("{e:#}").into())
}

fn main() {
    let args = Arguments::from_args();
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();

    let trial = match target() {
        Ok((config, network)) => {
            let development = config.is_development(&network);
            Trial::test(TEST_NAME, move || run(config, network)).with_ignored_flag(development)
        }
        Err(e) => {
            let message = format!("{e:#}");
            Trial::test(TEST_NAME, move || Err(message.into()))
        }
    };

    libtest_mimic::run(&args, vec![trial]).exit();
}
