//! Collaborator seams: deploying contracts and verifying their sources.
//!
//! Both traits are mockable so the deployment policy can be tested without a chain.

use alloy_core::{
    dyn_abi::DynSolValue,
    primitives::{Address, B256},
};
use derive_more::{Deref, From};

use crate::DeployerIdentity;

/// Ordered constructor arguments of a contract.
#[derive(Debug, Clone, Default, PartialEq, Deref, From)]
pub struct ConstructorArgs(Vec<DynSolValue>);

impl ConstructorArgs {
    pub fn new(values: Vec<DynSolValue>) -> Self {
        Self(values)
    }

    /// ABI-encode the arguments the way they follow the creation bytecode.
    pub fn abi_encode(&self) -> Vec<u8> {
        if self.0.is_empty() {
            return Vec::new();
        }
        DynSolValue::Tuple(self.0.clone()).abi_encode_params()
    }

    /// Hex encoding of [`ConstructorArgs::abi_encode`], without `0x`.
    pub fn to_hex(&self) -> String {
        hex::encode(self.abi_encode())
    }
}

/// Options of a single contract deployment.
#[derive(Debug, Clone)]
pub struct DeployOptions {
    pub from: DeployerIdentity,
    pub args: ConstructorArgs,
    /// Confirmations to collect before the deployment counts as done.
    pub wait_confirmations: u64,
}

/// A contract that is live on chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployedContract {
    pub address: Address,
    pub transaction_hash: B256,
    pub gas_used: u64,
    pub effective_gas_price: u128,
    /// `false` when an identical prior deployment was reused.
    pub newly_deployed: bool,
}

/// Deploys a named contract artifact.
#[mockall::automock]
#[async_trait::async_trait]
pub trait ContractDeployer: Send + Sync {
    /// Deploy `contract` and wait for `options.wait_confirmations` confirmations.
    ///
    /// An identical artifact already deployed under the same name on the same chain is
    /// returned instead of being deployed again.
    async fn deploy(
        &self,
        contract: &str,
        options: DeployOptions,
    ) -> anyhow::Result<DeployedContract>;
}

/// Publishes contract sources on a block explorer.
#[mockall::automock]
#[async_trait::async_trait]
pub trait ContractVerifier: Send + Sync {
    async fn verify(&self, address: Address, args: &ConstructorArgs) -> anyhow::Result<()>;
}
