//! Local stand-ins for external on-chain dependencies.

use std::{collections::HashMap, sync::Arc};

use alloy_core::{
    dyn_abi::DynSolValue,
    primitives::{Address, I256, U256},
};
use tokio::sync::Mutex;

use crate::{
    ChainSession, ConstructorArgs, ContractDeployer, DeployError, DeployOptions, DeployerIdentity,
    config::MockConfig, network::DEFAULT_CONFIRMATIONS,
};

/// Artifact name of the price feed stand-in.
pub const MOCK_PRICE_FEED_CONTRACT: &str = "MockV3Aggregator";

/// A deployed price feed stand-in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockDependency {
    pub address: Address,
    pub deployed_on_network: u64,
}

/// Deploys the price feed stand-in at most once per [`ChainSession`].
pub struct MockProvisioner {
    deployer: Arc<dyn ContractDeployer>,
    identity: DeployerIdentity,
    config: MockConfig,
    mocks: Mutex<HashMap<ChainSession, MockDependency>>,
}

impl MockProvisioner {
    pub fn new(
        deployer: Arc<dyn ContractDeployer>,
        identity: DeployerIdentity,
        config: MockConfig,
    ) -> Self {
        Self {
            deployer,
            identity,
            config,
            mocks: Mutex::new(HashMap::new()),
        }
    }

    /// Constructor arguments of the stand-in: `(uint8 decimals, int256 initialAnswer)`.
    pub fn constructor_args(&self) -> ConstructorArgs {
        ConstructorArgs::new(vec![
            DynSolValue::Uint(U256::from(self.config.decimals), 8),
            DynSolValue::Int(I256::unchecked_from(self.config.initial_answer), 256),
        ])
    }

    /// Address of the session's stand-in, deploying it on first use.
    ///
    /// The session lock is held across the deployment, so concurrent callers in one session
    /// share a single deployment transaction.
    pub async fn get_or_create_mock_dependency_address(
        &self,
        session: &ChainSession,
    ) -> Result<Address, DeployError> {
        let mut mocks = self.mocks.lock().await;

        if let Some(mock) = mocks.get(session) {
            tracing::debug!(
                network = %session.network_name,
                address = %mock.address,
                "Reusing mock price feed"
            );
            return Ok(mock.address);
        }

        tracing::info!(
            network = %session.network_name,
            "Local network detected! Deploying mocks..."
        );

        let deployed = self
            .deployer
            .deploy(
                MOCK_PRICE_FEED_CONTRACT,
                DeployOptions {
                    from: self.identity.clone(),
                    args: self.constructor_args(),
                    wait_confirmations: DEFAULT_CONFIRMATIONS,
                },
            )
            .await
            .map_err(|source| DeployError::ProvisioningFailed {
                network: session.network_name.clone(),
                source,
            })?;

        tracing::info!(
            network = %session.network_name,
            address = %deployed.address,
            "Mocks deployed!"
        );

        mocks.insert(
            session.clone(),
            MockDependency {
                address: deployed.address,
                deployed_on_network: session.chain_id,
            },
        );

        Ok(deployed.address)
    }

    /// The stand-in already provisioned for `session`, if any.
    pub async fn get(&self, session: &ChainSession) -> Option<MockDependency> {
        self.mocks.lock().await.get(session).copied()
    }
}
