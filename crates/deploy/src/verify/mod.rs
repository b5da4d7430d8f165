//! Post-deploy source verification.

mod etherscan;

pub use etherscan::EtherscanVerifier;

use std::sync::Arc;

use alloy_core::primitives::Address;

use crate::{ConstructorArgs, ContractVerifier, DeployError, DeploymentResult, NetworkRegistry};

/// What happened to a deployment's verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "kebab-case")]
pub enum VerificationOutcome {
    /// Development network or no credential: nothing was attempted.
    Skipped,
    Verified,
    /// The explorer rejected or never confirmed the submission. The deployment stands.
    VerificationFailed,
}

/// A single verification submission.
#[derive(Debug, Clone, PartialEq)]
pub struct VerificationRequest {
    pub contract_address: Address,
    pub constructor_args: ConstructorArgs,
}

impl From<&DeploymentResult> for VerificationRequest {
    fn from(result: &DeploymentResult) -> Self {
        Self {
            contract_address: result.contract_address,
            constructor_args: result.constructor_args.clone(),
        }
    }
}

/// Decides whether a deployment gets verified, and never lets verification fail it.
pub struct VerificationGate {
    registry: Arc<NetworkRegistry>,
    verifier: Arc<dyn ContractVerifier>,
}

impl VerificationGate {
    pub fn new(registry: Arc<NetworkRegistry>, verifier: Arc<dyn ContractVerifier>) -> Self {
        Self { registry, verifier }
    }

    /// Whether a deployment on `network_name` should be verified.
    pub fn should_verify(&self, network_name: &str, credential_present: bool) -> bool {
        credential_present && !self.registry.is_development(network_name)
    }

    /// Verify `result` when [`VerificationGate::should_verify`] allows it.
    pub async fn maybe_verify(
        &self,
        result: &DeploymentResult,
        network_name: &str,
        credential_present: bool,
    ) -> VerificationOutcome {
        if !self.should_verify(network_name, credential_present) {
            tracing::debug!(
                network = %network_name,
                credential_present,
                "Skipping verification"
            );
            return VerificationOutcome::Skipped;
        }

        match self.submit(VerificationRequest::from(result)).await {
            Ok(()) => VerificationOutcome::Verified,
            Err(e) => {
                let error = anyhow::Error::from(e);
                tracing::warn!(
                    error = %format!("{error:#}"),
                    "Verification failed, deployment kept"
                );
                VerificationOutcome::VerificationFailed
            }
        }
    }

    async fn submit(&self, request: VerificationRequest) -> Result<(), DeployError> {
        tracing::info!(address = %request.contract_address, "Verifying contract...");

        self.verifier
            .verify(request.contract_address, &request.constructor_args)
            .await
            .map_err(|source| DeployError::VerificationFailed {
                address: request.contract_address,
                source,
            })
    }
}
