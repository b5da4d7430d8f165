//! Error taxonomy for a deployment invocation.

use alloy_core::primitives::Address;
use thiserror::Error;

/// Errors surfaced by the deployment pipeline.
///
/// Every variant except [`DeployError::VerificationFailed`] is fatal to the invocation: no
/// deployment result is returned and the binary exits with a non-zero status.
#[derive(Debug, Error)]
pub enum DeployError {
    #[error("no network profile registered for chain id {chain_id}")]
    UnknownNetwork { chain_id: u64 },

    #[error("could not resolve the price feed address for network {network} (chain id {chain_id})")]
    UnresolvedDependency { network: String, chain_id: u64 },

    #[error("failed to provision mock dependency on {network}")]
    ProvisioningFailed {
        network: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("failed to deploy {contract} on {network}")]
    DeploymentFailed {
        contract: String,
        network: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("verification of {address} failed")]
    VerificationFailed {
        address: Address,
        #[source]
        source: anyhow::Error,
    },

    #[error("invalid profile for network {name} (chain id {chain_id}): {reason}")]
    InvalidNetworkProfile {
        name: String,
        chain_id: u64,
        reason: String,
    },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("cannot talk to the node of network {network}")]
    Chain {
        network: String,
        #[source]
        source: anyhow::Error,
    },
}

impl DeployError {
    /// Whether the error must abort the invocation.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::VerificationFailed { .. })
    }
}
