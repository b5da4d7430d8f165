//! Wires every component together for one deploy invocation.

use std::sync::Arc;

use alloy_core::primitives::Address;

use crate::{
    ChainSession, DeployError, DeployerIdentity, DeploymentConfig, DeploymentResolver,
    MockProvisioner, NetworkRegistry, VerificationGate,
    artifacts::ArtifactStore,
    chain_deployer::RpcContractDeployer,
    gas_report,
    orchestrator::DeploymentOrchestrator,
    records::DeploymentRecords,
    rpc::{ChainClient, wait_until_ready},
    scripts::{ScriptContext, ScriptOutput, Tag, default_scripts, run_scripts},
    tx::TransactionSender,
    verify::EtherscanVerifier,
};

/// How long to wait for a local node to answer.
const LOCAL_NODE_READY_TIMEOUT_SECS: u64 = 30;

/// Outcome of a deploy invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub session: ChainSession,
    pub deployer: Address,
    pub outputs: Vec<(&'static str, ScriptOutput)>,
}

/// Connect to `network_name`'s node and check it serves the configured chain.
pub async fn connect(
    config: &DeploymentConfig,
    network_name: &str,
) -> Result<(ChainClient, ChainSession), DeployError> {
    let network = config
        .network(network_name)
        .ok_or_else(|| DeployError::Config(format!("network {network_name} is not configured")))?;

    let chain_error = |source: anyhow::Error| DeployError::Chain {
        network: network_name.to_string(),
        source,
    };

    let client = ChainClient::new(&network.url).map_err(chain_error)?;

    if config.is_development(network_name) {
        let client = &client;
        wait_until_ready("local node", LOCAL_NODE_READY_TIMEOUT_SECS, move || async move {
            client.chain_id().await.map(|_| ())
        })
        .await
        .map_err(chain_error)?;
    }

    let session = client.session(network_name).await.map_err(chain_error)?;
    if session.chain_id != network.chain_id {
        return Err(DeployError::Config(format!(
            "network {network_name} is configured with chain id {} but its node reports {}",
            network.chain_id, session.chain_id
        )));
    }

    tracing::info!(
        network = %network_name,
        chain_id = session.chain_id,
        genesis_hash = %session.genesis_hash,
        url = %client.url(),
        "Connected"
    );

    Ok((client, session))
}

/// A sender over `client` honouring the configured polling and timeout.
pub fn transaction_sender(config: &DeploymentConfig, client: ChainClient) -> TransactionSender {
    TransactionSender::new(client, config.poll_interval(), config.confirmation_timeout())
}

/// Run the deploy scripts selected by `tags` against `network_name`.
pub async fn deploy(
    config: &DeploymentConfig,
    network_name: &str,
    tags: &[Tag],
) -> Result<RunSummary, DeployError> {
    let registry = Arc::new(NetworkRegistry::from_config(config)?);
    let (client, session) = connect(config, network_name).await?;
    let identity = DeployerIdentity::for_network(config, network_name)?;

    tracing::info!(
        network = %network_name,
        deployer = %identity.address(),
        tags = ?tags,
        "Starting deployment"
    );

    let deployer = Arc::new(RpcContractDeployer::new(
        transaction_sender(config, client),
        ArtifactStore::new(&config.artifacts_dir),
        DeploymentRecords::new(&config.deployments_dir, network_name),
        session.clone(),
    ));

    let credential_present = config.has_verification_credential();
    let verifier = EtherscanVerifier::new(
        &config.etherscan,
        config.etherscan_api_key().unwrap_or_default(),
        session.chain_id,
        &config.artifacts_dir,
    )
    .map_err(|e| DeployError::Config(format!("{e:#}")))?;

    let provisioner = Arc::new(MockProvisioner::new(
        deployer.clone(),
        identity.clone(),
        config.mock,
    ));
    let orchestrator = DeploymentOrchestrator::new(
        registry.clone(),
        DeploymentResolver::new(registry.clone(), provisioner.clone()),
        deployer.clone(),
        VerificationGate::new(registry.clone(), Arc::new(verifier)),
    );

    let ctx = ScriptContext {
        session: &session,
        identity: &identity,
        registry: &registry,
        provisioner: &provisioner,
        orchestrator: &orchestrator,
        credential_present,
    };
    let outputs = run_scripts(&default_scripts(), &ctx, tags).await?;

    gas_report::report(
        &config.gas_reporter,
        config.coinmarketcap_api_key(),
        &deployer.history().await,
    )
    .await;

    Ok(RunSummary {
        session,
        deployer: identity.address(),
        outputs,
    })
}
