//! Signed transactions and confirmation tracking.

use std::time::Duration;

use alloy::{
    network::{EthereumWallet, TransactionBuilder},
    providers::{Provider, ProviderBuilder},
    rpc::types::{TransactionReceipt, TransactionRequest},
};
use alloy_core::primitives::{Address, B256};
use anyhow::Context;
use backon::{ConstantBuilder, Retryable};

use crate::{DeployerIdentity, rpc::ChainClient};

/// What a mined transaction left on chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MinedTransaction {
    pub transaction_hash: B256,
    pub block_number: u64,
    /// Set for contract creations.
    pub contract_address: Option<Address>,
    pub gas_used: u64,
    pub effective_gas_price: u128,
    pub succeeded: bool,
}

impl MinedTransaction {
    /// `None` while the receipt is not attached to a block yet.
    fn from_receipt(receipt: &TransactionReceipt) -> Option<Self> {
        Some(Self {
            transaction_hash: receipt.transaction_hash,
            block_number: receipt.block_number?,
            contract_address: receipt.contract_address,
            gas_used: receipt.gas_used,
            effective_gas_price: receipt.effective_gas_price,
            succeeded: receipt.status(),
        })
    }

    /// Confirmations at chain head `head`, counting the inclusion block.
    pub fn confirmations(&self, head: u64) -> u64 {
        head.checked_sub(self.block_number)
            .map_or(0, |depth| depth + 1)
    }
}

#[derive(Debug, thiserror::Error)]
enum WaitError {
    #[error("not mined yet")]
    NotMined,
    #[error("{seen} of {required} confirmations")]
    Shallow { seen: u64, required: u64 },
    #[error("transaction {0} reverted")]
    Reverted(B256),
    #[error(transparent)]
    Rpc(#[from] anyhow::Error),
}

/// Signs, submits and follows transactions from a [`DeployerIdentity`].
#[derive(Clone)]
pub struct TransactionSender {
    client: ChainClient,
    poll_interval: Duration,
    timeout: Duration,
}

impl TransactionSender {
    pub fn new(client: ChainClient, poll_interval: Duration, timeout: Duration) -> Self {
        Self {
            client,
            poll_interval,
            timeout,
        }
    }

    pub fn client(&self) -> &ChainClient {
        &self.client
    }

    /// Sign `request` as `from` and hand it to the node.
    ///
    /// Nonce, gas limit and EIP-1559 fees are filled from the node.
    pub async fn submit(
        &self,
        from: &DeployerIdentity,
        request: TransactionRequest,
    ) -> anyhow::Result<B256> {
        let provider = ProviderBuilder::new()
            .wallet(EthereumWallet::from(from.signer().clone()))
            .connect_http(self.client.endpoint().clone());

        let pending = provider
            .send_transaction(request.with_from(from.address()))
            .await
            .context("Failed to submit transaction")?;
        let hash = *pending.tx_hash();

        tracing::debug!(transaction_hash = %hash, from = %from.address(), "Transaction submitted");
        Ok(hash)
    }

    /// Submit `request` and wait until it has `confirmations` confirmations.
    pub async fn send(
        &self,
        from: &DeployerIdentity,
        request: TransactionRequest,
        confirmations: u64,
    ) -> anyhow::Result<MinedTransaction> {
        let hash = self.submit(from, request).await?;
        self.wait_for_confirmations(hash, confirmations).await
    }

    async fn check_confirmations(
        &self,
        hash: B256,
        required: u64,
    ) -> Result<MinedTransaction, WaitError> {
        let mined = self
            .client
            .transaction_receipt(hash)
            .await?
            .as_ref()
            .and_then(MinedTransaction::from_receipt)
            .ok_or(WaitError::NotMined)?;
        if !mined.succeeded {
            return Err(WaitError::Reverted(hash));
        }

        let seen = mined.confirmations(self.client.block_number().await?);
        if seen < required {
            return Err(WaitError::Shallow { seen, required });
        }
        Ok(mined)
    }

    /// Poll until `hash` is mined, succeeded, and `confirmations` blocks deep.
    ///
    /// RPC errors are retried. Fails on revert, or when the configured timeout elapses first.
    pub async fn wait_for_confirmations(
        &self,
        hash: B256,
        confirmations: u64,
    ) -> anyhow::Result<MinedTransaction> {
        let wait = (move || self.check_confirmations(hash, confirmations))
            .retry(
                ConstantBuilder::default()
                    .with_delay(self.poll_interval)
                    .with_max_times(usize::MAX),
            )
            .when(|e| !matches!(e, WaitError::Reverted(_)))
            .notify(|e, _| match e {
                WaitError::Rpc(e) => tracing::warn!(
                    transaction_hash = %hash,
                    error = %format!("{e:#}"),
                    "RPC error while waiting for confirmations, retrying"
                ),
                other => tracing::debug!(
                    transaction_hash = %hash,
                    status = %other,
                    "Waiting for confirmations..."
                ),
            });

        tokio::time::timeout(self.timeout, wait)
            .await
            .with_context(|| {
                format!(
                    "Timeout waiting for {} confirmations of transaction {}",
                    confirmations, hash
                )
            })?
            .map_err(anyhow::Error::from)
    }
}
