//! Constructor argument resolution for the target contract.

use std::sync::Arc;

use alloy_core::dyn_abi::DynSolValue;

use crate::{ChainSession, ConstructorArgs, DeployError, MockProvisioner, NetworkRegistry};

/// Decides which price feed the target contract is constructed with.
pub struct DeploymentResolver {
    registry: Arc<NetworkRegistry>,
    provisioner: Arc<MockProvisioner>,
}

impl DeploymentResolver {
    pub fn new(registry: Arc<NetworkRegistry>, provisioner: Arc<MockProvisioner>) -> Self {
        Self {
            registry,
            provisioner,
        }
    }

    /// Constructor arguments for the session's network: always `[priceFeedAddress]`.
    ///
    /// Development networks get the session's mock, whatever the registry holds. Any other
    /// network must be registered with a price feed.
    pub async fn resolve(&self, session: &ChainSession) -> Result<ConstructorArgs, DeployError> {
        let price_feed = if self.registry.is_development(&session.network_name) {
            self.provisioner
                .get_or_create_mock_dependency_address(session)
                .await?
        } else {
            self.registry
                .lookup(session.chain_id)
                .ok()
                .and_then(|profile| profile.external_dependency_address)
                .ok_or_else(|| DeployError::UnresolvedDependency {
                    network: session.network_name.clone(),
                    chain_id: session.chain_id,
                })?
        };

        tracing::debug!(
            network = %session.network_name,
            chain_id = session.chain_id,
            price_feed = %price_feed,
            "Resolved price feed"
        );

        Ok(ConstructorArgs::new(vec![DynSolValue::Address(price_feed)]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        DeployedContract, DeployerIdentity, MockContractDeployer, NetworkProfile,
        config::MockConfig,
    };
    use alloy_core::primitives::{Address, B256, address};

    const MOCK_ADDRESS: Address = address!("0x5FbDB2315678afecb367f032d93F642f64180aa3");
    const FEED: Address = address!("0x000000000000000000000000000000000000FEED");

    fn registry() -> Arc<NetworkRegistry> {
        let registry = NetworkRegistry::new(["hardhat", "localhost"])
            .with_profile(NetworkProfile {
                id: 11155111,
                name: "sepolia".to_string(),
                is_development: false,
                required_confirmations: 6,
                external_dependency_address: Some(FEED),
            })
            .unwrap()
            .with_profile(NetworkProfile {
                id: 31337,
                name: "localhost".to_string(),
                is_development: true,
                required_confirmations: 1,
                external_dependency_address: None,
            })
            .unwrap();
        Arc::new(registry)
    }

    fn resolver(deployer: MockContractDeployer) -> DeploymentResolver {
        let provisioner = MockProvisioner::new(
            Arc::new(deployer),
            DeployerIdentity::from_dev_mnemonic(0).unwrap(),
            MockConfig::default(),
        );
        DeploymentResolver::new(registry(), Arc::new(provisioner))
    }

    fn mock_deployer(times: usize) -> MockContractDeployer {
        let mut deployer = MockContractDeployer::new();
        deployer.expect_deploy().times(times).returning(|_, _| {
            Ok(DeployedContract {
                address: MOCK_ADDRESS,
                transaction_hash: B256::ZERO,
                gas_used: 0,
                effective_gas_price: 0,
                newly_deployed: true,
            })
        });
        deployer
    }

    #[tokio::test]
    async fn test_development_networks_use_the_mock() {
        for name in ["hardhat", "localhost"] {
            // One session per chain id. Even a chain id that the registry maps to a real feed
            // resolves to the mock.
            let resolver = resolver(mock_deployer(2));
            for chain_id in [31337, 11155111] {
                let session = ChainSession::new(name, chain_id, B256::ZERO);
                let args = resolver.resolve(&session).await.unwrap();
                assert_eq!(args.as_slice(), &[DynSolValue::Address(MOCK_ADDRESS)]);
            }
        }
    }

    #[tokio::test]
    async fn test_registered_network_uses_registry_address() {
        let resolver = resolver(mock_deployer(0));
        let session = ChainSession::new("sepolia", 11155111, B256::ZERO);

        let args = resolver.resolve(&session).await.unwrap();
        assert_eq!(args.as_slice(), &[DynSolValue::Address(FEED)]);
    }

    #[tokio::test]
    async fn test_unregistered_network_is_unresolved() {
        let resolver = resolver(mock_deployer(0));

        for (name, chain_id) in [("mystery", 999999), ("not-localhost", 31337)] {
            let session = ChainSession::new(name, chain_id, B256::ZERO);
            let result = resolver.resolve(&session).await;
            assert!(
                matches!(result, Err(DeployError::UnresolvedDependency { chain_id: id, .. }) if id == chain_id)
            );
        }
    }

    #[tokio::test]
    async fn test_mock_failure_propagates() {
        let mut deployer = MockContractDeployer::new();
        deployer
            .expect_deploy()
            .returning(|_, _| Err(anyhow::anyhow!("local chain unavailable")));
        let resolver = resolver(deployer);

        let session = ChainSession::new("hardhat", 31337, B256::ZERO);
        assert!(matches!(
            resolver.resolve(&session).await,
            Err(DeployError::ProvisioningFailed { .. })
        ));
    }
}
