//! [`ContractDeployer`] backed by a JSON-RPC node.

use alloy::{network::TransactionBuilder, rpc::types::TransactionRequest};
use alloy_core::primitives::Bytes;
use anyhow::Context;
use tokio::sync::Mutex;

use crate::{
    ChainSession, ContractDeployer, DeployOptions, DeployedContract,
    artifacts::ArtifactStore,
    records::{DeploymentRecord, DeploymentRecords, artifact_hash},
    tx::TransactionSender,
};

/// A contract deployment made or reused during this run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentEntry {
    pub contract: String,
    pub deployment: DeployedContract,
}

/// Deploys compiled artifacts with locally signed transactions.
///
/// Each deployment is remembered in [`DeploymentRecords`]; an identical artifact already live on
/// the same chain is returned without sending a transaction.
pub struct RpcContractDeployer {
    sender: TransactionSender,
    artifacts: ArtifactStore,
    records: DeploymentRecords,
    session: ChainSession,
    history: Mutex<Vec<DeploymentEntry>>,
}

impl RpcContractDeployer {
    pub fn new(
        sender: TransactionSender,
        artifacts: ArtifactStore,
        records: DeploymentRecords,
        session: ChainSession,
    ) -> Self {
        Self {
            sender,
            artifacts,
            records,
            session,
            history: Mutex::new(Vec::new()),
        }
    }

    /// Every deployment handled so far, in order.
    pub async fn history(&self) -> Vec<DeploymentEntry> {
        self.history.lock().await.clone()
    }

    /// The recorded deployment of `contract`, if it can be reused.
    async fn reusable(
        &self,
        contract: &str,
        hash: &str,
    ) -> anyhow::Result<Option<DeploymentRecord>> {
        let Some(record) = self.records.load(contract) else {
            return Ok(None);
        };

        if !record.matches(&self.session, hash) {
            tracing::debug!(
                contract,
                recorded_chain_id = record.chain_id,
                "Recorded deployment does not match, redeploying"
            );
            return Ok(None);
        }

        let code = self
            .sender
            .client()
            .code(record.address)
            .await
            .context("Failed to fetch code of recorded deployment")?;
        if code.is_empty() {
            tracing::debug!(
                contract,
                address = %record.address,
                "No code at recorded address, redeploying"
            );
            return Ok(None);
        }

        Ok(Some(record))
    }
}

#[async_trait::async_trait]
impl ContractDeployer for RpcContractDeployer {
    async fn deploy(
        &self,
        contract: &str,
        options: DeployOptions,
    ) -> anyhow::Result<DeployedContract> {
        let artifact = self.artifacts.load(contract)?;
        let encoded_args = options.args.abi_encode();
        let hash = artifact_hash(&artifact.bytecode, &encoded_args);

        let _lock = self.records.lock().await?;

        let deployment = if let Some(record) = self.reusable(contract, &hash).await? {
            tracing::info!(
                contract,
                address = %record.address,
                "Reusing deployment of {}",
                contract
            );
            DeployedContract {
                address: record.address,
                transaction_hash: record.transaction_hash,
                gas_used: record.gas_used,
                effective_gas_price: record.effective_gas_price,
                newly_deployed: false,
            }
        } else {
            let mut data = artifact.bytecode.to_vec();
            data.extend_from_slice(&encoded_args);

            let tx_hash = self
                .sender
                .submit(
                    &options.from,
                    TransactionRequest::default().with_deploy_code(Bytes::from(data)),
                )
                .await
                .with_context(|| format!("Failed to deploy {contract}"))?;

            // Recorded once mined, before the remaining confirmations.
            let mined = self
                .sender
                .wait_for_confirmations(tx_hash, 1)
                .await
                .with_context(|| format!("Failed to deploy {contract}"))?;
            let address = mined
                .contract_address
                .context("Receipt of a contract creation has no contract address")?;

            let deployment = DeployedContract {
                address,
                transaction_hash: mined.transaction_hash,
                gas_used: mined.gas_used,
                effective_gas_price: mined.effective_gas_price,
                newly_deployed: true,
            };

            self.records.save(&DeploymentRecord {
                contract: contract.to_string(),
                address,
                transaction_hash: deployment.transaction_hash,
                chain_id: self.session.chain_id,
                genesis_hash: self.session.genesis_hash,
                artifact_hash: hash,
                constructor_args: hex::encode(&encoded_args),
                gas_used: deployment.gas_used,
                effective_gas_price: deployment.effective_gas_price,
                deployed_at: chrono::Utc::now().timestamp(),
                fundme_version: env!("CARGO_PKG_VERSION").to_string(),
            })?;

            if options.wait_confirmations > 1 {
                self.sender
                    .wait_for_confirmations(tx_hash, options.wait_confirmations)
                    .await
                    .with_context(|| {
                        format!("{contract} deployed at {address} but not confirmed")
                    })?;
            }

            tracing::info!(
                contract,
                address = %address,
                gas_used = deployment.gas_used,
                "deployed {} (tx: {})",
                contract,
                deployment.transaction_hash
            );
            deployment
        };

        self.history.lock().await.push(DeploymentEntry {
            contract: contract.to_string(),
            deployment: deployment.clone(),
        });

        Ok(deployment)
    }
}
