//! fundme-deploy - Network-aware deployment of the FundMe contract.
//!
//! This crate decides which price feed a `FundMe` deployment is wired to, deploys a local
//! stand-in on development networks, waits for the network's confirmation policy and submits
//! the sources to Etherscan where that makes sense.

mod error;
pub use error::DeployError;

pub mod config;
pub use config::DeploymentConfig;

mod identity;
pub use identity::{DEV_MNEMONIC, DeployerIdentity};

pub mod network;
pub use network::{ChainSession, NetworkProfile, NetworkRegistry};

mod traits;
pub use traits::{
    ConstructorArgs, ContractDeployer, ContractVerifier, DeployOptions, DeployedContract,
    MockContractDeployer, MockContractVerifier,
};

pub mod mock;
pub use mock::{MockDependency, MockProvisioner};

mod resolver;
pub use resolver::DeploymentResolver;

pub mod verify;
pub use verify::{EtherscanVerifier, VerificationGate, VerificationOutcome, VerificationRequest};

pub mod orchestrator;
pub use orchestrator::{
    DeploymentOrchestrator, DeploymentReport, DeploymentResult, DeploymentStage,
};

pub mod artifacts;
pub mod chain_deployer;
pub mod gas_report;
pub mod interact;
pub mod records;
pub mod rpc;
pub mod runner;
pub mod scripts;
pub mod tx;

#[cfg(test)]
mod test_utils;

pub use chain_deployer::RpcContractDeployer;
pub use interact::FundMeClient;
pub use scripts::Tag;
