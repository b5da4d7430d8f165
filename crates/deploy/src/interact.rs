//! Calls into a deployed `FundMe` contract.

use alloy::{
    network::TransactionBuilder, rpc::types::TransactionRequest, sol, sol_types::SolCall,
};
use alloy_core::primitives::{Address, U256};
use anyhow::Context;

use crate::{
    DeployerIdentity,
    orchestrator::TARGET_CONTRACT,
    records::DeploymentRecords,
    tx::{MinedTransaction, TransactionSender},
};

sol! {
    interface IFundMe {
        function fund() external payable;
        function withdraw() external;
    }
}

/// Sends `fund` and `withdraw` transactions to a deployed contract.
pub struct FundMeClient {
    sender: TransactionSender,
    address: Address,
    confirmations: u64,
}

impl FundMeClient {
    pub fn new(sender: TransactionSender, address: Address, confirmations: u64) -> Self {
        Self {
            sender,
            address,
            confirmations,
        }
    }

    /// Client for the contract recorded in `records`.
    pub fn from_records(
        sender: TransactionSender,
        records: &DeploymentRecords,
        confirmations: u64,
    ) -> anyhow::Result<Self> {
        let record = records.load(TARGET_CONTRACT).with_context(|| {
            format!(
                "No {} deployment recorded under {}",
                TARGET_CONTRACT,
                records.dir().display()
            )
        })?;
        Ok(Self::new(sender, record.address, confirmations))
    }

    pub fn address(&self) -> Address {
        self.address
    }

    async fn transact<C: SolCall>(
        &self,
        from: &DeployerIdentity,
        call: C,
        value: U256,
    ) -> anyhow::Result<MinedTransaction> {
        tracing::info!(
            contract = %self.address,
            function = C::SIGNATURE,
            %value,
            "Sending transaction"
        );
        let request = TransactionRequest::default()
            .with_to(self.address)
            .with_value(value)
            .with_input(call.abi_encode());

        self.sender
            .send(from, request, self.confirmations)
            .await
            .with_context(|| format!("{} failed", C::SIGNATURE))
    }

    /// Send `value` wei to the contract.
    pub async fn fund(
        &self,
        from: &DeployerIdentity,
        value: U256,
    ) -> anyhow::Result<MinedTransaction> {
        self.transact(from, IFundMe::fundCall {}, value).await
    }

    /// Withdraw all funds. Only the owner may call this.
    pub async fn withdraw(&self, from: &DeployerIdentity) -> anyhow::Result<MinedTransaction> {
        self.transact(from, IFundMe::withdrawCall {}, U256::ZERO).await
    }

    /// Current ether balance of the contract.
    pub async fn balance(&self) -> anyhow::Result<U256> {
        self.sender.client().balance(self.address).await
    }
}
