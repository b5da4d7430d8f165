//! Deploys the target contract and hands the result to verification.

use std::sync::Arc;

use alloy_core::primitives::Address;

use crate::{
    ChainSession, ConstructorArgs, ContractDeployer, DeployError, DeployOptions, DeployedContract,
    DeployerIdentity, DeploymentResolver, NetworkRegistry, VerificationGate, VerificationOutcome,
};

/// Artifact name of the contract this harness deploys.
pub const TARGET_CONTRACT: &str = "FundMe";

/// Line logged after each deployment.
pub const SESSION_SEPARATOR: &str = "-----------------------";

/// Stages a deployment goes through. Verification never moves a deployment back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "kebab-case")]
pub enum DeploymentStage {
    Start,
    Resolving,
    Deploying,
    Confirmed,
    Verifying,
    Done,
}

/// The target contract as deployed.
#[derive(Debug, Clone, PartialEq)]
pub struct DeploymentResult {
    pub contract_address: Address,
    pub constructor_args: ConstructorArgs,
    pub confirmations_waited: u64,
}

/// A deployment together with what happened to its verification.
#[derive(Debug, Clone, PartialEq)]
pub struct DeploymentReport {
    pub result: DeploymentResult,
    pub deployment: DeployedContract,
    pub verification: VerificationOutcome,
}

/// Resolves, deploys, waits for confirmations and triggers verification.
pub struct DeploymentOrchestrator {
    registry: Arc<NetworkRegistry>,
    resolver: DeploymentResolver,
    deployer: Arc<dyn ContractDeployer>,
    gate: VerificationGate,
}

impl DeploymentOrchestrator {
    pub fn new(
        registry: Arc<NetworkRegistry>,
        resolver: DeploymentResolver,
        deployer: Arc<dyn ContractDeployer>,
        gate: VerificationGate,
    ) -> Self {
        Self {
            registry,
            resolver,
            deployer,
            gate,
        }
    }

    /// Deploy the target contract on the session's network as `identity`.
    ///
    /// Returns once the network's confirmation count has been observed.
    pub async fn deploy(
        &self,
        session: &ChainSession,
        identity: &DeployerIdentity,
    ) -> Result<DeploymentResult, DeployError> {
        let (result, _) = self.deploy_contract(session, identity).await?;

        tracing::info!(
            network = %session.network_name,
            address = %result.contract_address,
            "Deployment finished"
        );
        tracing::info!("{}", SESSION_SEPARATOR);

        Ok(result)
    }

    /// [`DeploymentOrchestrator::deploy`] followed by verification when the gate allows it.
    ///
    /// Verification failures are reported in the outcome and never fail the call.
    pub async fn deploy_and_verify(
        &self,
        session: &ChainSession,
        identity: &DeployerIdentity,
        credential_present: bool,
    ) -> Result<DeploymentReport, DeployError> {
        let (result, deployment) = self.deploy_contract(session, identity).await?;

        if self
            .gate
            .should_verify(&session.network_name, credential_present)
        {
            log_stage(session, DeploymentStage::Verifying);
        }
        let verification = self
            .gate
            .maybe_verify(&result, &session.network_name, credential_present)
            .await;

        log_stage(session, DeploymentStage::Done);
        tracing::info!(
            network = %session.network_name,
            address = %result.contract_address,
            verification = %verification,
            "Deployment finished"
        );
        tracing::info!("{}", SESSION_SEPARATOR);

        Ok(DeploymentReport {
            result,
            deployment,
            verification,
        })
    }

    async fn deploy_contract(
        &self,
        session: &ChainSession,
        identity: &DeployerIdentity,
    ) -> Result<(DeploymentResult, DeployedContract), DeployError> {
        log_stage(session, DeploymentStage::Start);

        log_stage(session, DeploymentStage::Resolving);
        let args = self.resolver.resolve(session).await?;
        let wait_confirmations = self.registry.required_confirmations(session.chain_id);

        log_stage(session, DeploymentStage::Deploying);
        tracing::info!(
            network = %session.network_name,
            contract = TARGET_CONTRACT,
            deployer = %identity.address(),
            wait_confirmations,
            "Deploying contract..."
        );

        let deployment = self
            .deployer
            .deploy(
                TARGET_CONTRACT,
                DeployOptions {
                    from: identity.clone(),
                    args: args.clone(),
                    wait_confirmations,
                },
            )
            .await
            .map_err(|source| DeployError::DeploymentFailed {
                contract: TARGET_CONTRACT.to_string(),
                network: session.network_name.clone(),
                source,
            })?;

        log_stage(session, DeploymentStage::Confirmed);
        tracing::info!(
            network = %session.network_name,
            address = %deployment.address,
            transaction_hash = %deployment.transaction_hash,
            newly_deployed = deployment.newly_deployed,
            "{} deployed at {}",
            TARGET_CONTRACT,
            deployment.address
        );

        let result = DeploymentResult {
            contract_address: deployment.address,
            constructor_args: args,
            confirmations_waited: wait_confirmations,
        };

        Ok((result, deployment))
    }
}

fn log_stage(session: &ChainSession, stage: DeploymentStage) {
    tracing::debug!(network = %session.network_name, stage = %stage, "Deployment stage");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        MockContractDeployer, MockContractVerifier, MockProvisioner, NetworkProfile,
        config::MockConfig, test_utils::CapturedLogs,
    };
    use alloy_core::{
        dyn_abi::DynSolValue,
        primitives::{B256, address},
    };

    const CONTRACT: Address = address!("0x9fE46736679d2D9a65F0992F2272dE9f3c7fa6e0");
    const FEED: Address = address!("0x000000000000000000000000000000000000FEED");

    fn registry() -> Arc<NetworkRegistry> {
        Arc::new(
            NetworkRegistry::new(["hardhat", "localhost"])
                .with_profile(NetworkProfile {
                    id: 11155111,
                    name: "sepolia".to_string(),
                    is_development: false,
                    required_confirmations: 6,
                    external_dependency_address: Some(FEED),
                })
                .unwrap(),
        )
    }

    fn orchestrator(
        target_deployer: MockContractDeployer,
        verifier: MockContractVerifier,
    ) -> DeploymentOrchestrator {
        let registry = registry();
        let mut mock_deployer = MockContractDeployer::new();
        mock_deployer.expect_deploy().never();

        let provisioner = MockProvisioner::new(
            Arc::new(mock_deployer),
            DeployerIdentity::from_dev_mnemonic(0).unwrap(),
            MockConfig::default(),
        );
        let resolver = DeploymentResolver::new(registry.clone(), Arc::new(provisioner));
        let gate = VerificationGate::new(registry.clone(), Arc::new(verifier));

        DeploymentOrchestrator::new(registry, resolver, Arc::new(target_deployer), gate)
    }

    fn deployed() -> DeployedContract {
        DeployedContract {
            address: CONTRACT,
            transaction_hash: B256::repeat_byte(0x11),
            gas_used: 800_000,
            effective_gas_price: 2_000_000_000,
            newly_deployed: true,
        }
    }

    #[tokio::test]
    async fn test_deploy_waits_for_registered_confirmations() {
        let mut deployer = MockContractDeployer::new();
        deployer
            .expect_deploy()
            .withf(|contract, options| {
                contract == TARGET_CONTRACT
                    && options.wait_confirmations == 6
                    && options.args.as_slice() == [DynSolValue::Address(FEED)]
            })
            .times(1)
            .returning(|_, _| Ok(deployed()));

        let orchestrator = orchestrator(deployer, MockContractVerifier::new());
        let identity = DeployerIdentity::from_dev_mnemonic(0).unwrap();
        let session = ChainSession::new("sepolia", 11155111, B256::ZERO);

        let result = orchestrator.deploy(&session, &identity).await.unwrap();
        assert_eq!(result.contract_address, CONTRACT);
        assert_eq!(result.confirmations_waited, 6);
    }

    #[tokio::test]
    async fn test_deploy_logs_address_and_separator() {
        let (logs, _guard) = CapturedLogs::install();

        let mut deployer = MockContractDeployer::new();
        deployer
            .expect_deploy()
            .times(1)
            .returning(|_, _| Ok(deployed()));

        let orchestrator = orchestrator(deployer, MockContractVerifier::new());
        let identity = DeployerIdentity::from_dev_mnemonic(0).unwrap();
        let session = ChainSession::new("sepolia", 11155111, B256::ZERO);
        orchestrator.deploy(&session, &identity).await.unwrap();

        let logs = logs.contents();
        assert!(logs.contains(&CONTRACT.to_string()), "{logs}");
        assert!(logs.contains(SESSION_SEPARATOR), "{logs}");
    }

    #[tokio::test]
    async fn test_deploy_failure() {
        let mut deployer = MockContractDeployer::new();
        deployer
            .expect_deploy()
            .times(1)
            .returning(|_, _| Err(anyhow::anyhow!("transaction reverted")));

        let mut verifier = MockContractVerifier::new();
        verifier.expect_verify().never();

        let orchestrator = orchestrator(deployer, verifier);
        let identity = DeployerIdentity::from_dev_mnemonic(0).unwrap();
        let session = ChainSession::new("sepolia", 11155111, B256::ZERO);

        let result = orchestrator.deploy_and_verify(&session, &identity, true).await;
        assert!(matches!(result, Err(DeployError::DeploymentFailed { .. })));
    }

    #[tokio::test]
    async fn test_unresolved_network_never_deploys() {
        let mut deployer = MockContractDeployer::new();
        deployer.expect_deploy().never();

        let orchestrator = orchestrator(deployer, MockContractVerifier::new());
        let identity = DeployerIdentity::from_dev_mnemonic(0).unwrap();
        let session = ChainSession::new("mystery", 999999, B256::ZERO);

        let result = orchestrator.deploy(&session, &identity).await;
        assert!(matches!(
            result,
            Err(DeployError::UnresolvedDependency { chain_id: 999999, .. })
        ));
    }

    #[test]
    fn test_stage_display() {
        assert_eq!(DeploymentStage::Resolving.to_string(), "resolving");
        assert_eq!(DeploymentStage::Done.to_string(), "done");
    }
}
