//! Shared RPC utilities for interacting with Ethereum JSON-RPC endpoints.

use std::time::Duration;

use alloy::{
    eips::BlockNumberOrTag,
    providers::{DynProvider, Provider, ProviderBuilder},
    rpc::types::TransactionReceipt,
};
use alloy_core::primitives::{Address, B256, Bytes, U256};
use anyhow::Context;
use reqwest::Url;

use crate::ChainSession;

/// Default timeout for HTTP requests.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default interval between polling attempts when waiting for readiness.
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Create an HTTP client with the default request timeout.
pub fn create_client() -> Result<reqwest::Client, anyhow::Error> {
    reqwest::Client::builder()
        .timeout(DEFAULT_TIMEOUT)
        .build()
        .context("Failed to create HTTP client")
}

/// Wait for a service to be ready by repeatedly calling a check function.
///
/// # Arguments
/// * `name` - Name of the service (for error messages)
/// * `timeout_secs` - Maximum time to wait in seconds
/// * `check_fn` - Function that returns Ok(()) when the service is ready
///
/// # Returns
/// Ok(()) when the service is ready, or an error after timeout.
pub async fn wait_until_ready<F, Fut>(
    name: &str,
    timeout_secs: u64,
    check_fn: F,
) -> Result<(), anyhow::Error>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = Result<(), anyhow::Error>>,
{
    let start = std::time::Instant::now();
    let max_duration = Duration::from_secs(timeout_secs);

    loop {
        if start.elapsed() > max_duration {
            anyhow::bail!("Timeout waiting for {} to be ready", name);
        }

        match check_fn().await {
            Ok(()) => return Ok(()),
            Err(e) => {
                tracing::trace!(error = %e, service = %name, "Readiness check failed, retrying...");
            }
        }

        tokio::time::sleep(DEFAULT_POLL_INTERVAL).await;
    }
}

/// Read access to a node through an alloy provider.
#[derive(Clone)]
pub struct ChainClient {
    endpoint: Url,
    provider: DynProvider,
}

impl ChainClient {
    pub fn new(url: &str) -> Result<Self, anyhow::Error> {
        let endpoint: Url = url
            .parse()
            .with_context(|| format!("Invalid RPC URL {url}"))?;
        let provider = ProviderBuilder::new()
            .connect_http(endpoint.clone())
            .erased();
        Ok(Self { endpoint, provider })
    }

    /// Client reading through `provider` instead of a fresh HTTP connection.
    pub fn with_provider(endpoint: Url, provider: DynProvider) -> Self {
        Self { endpoint, provider }
    }

    pub fn url(&self) -> &str {
        self.endpoint.as_str()
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub fn provider(&self) -> &DynProvider {
        &self.provider
    }

    pub async fn chain_id(&self) -> Result<u64, anyhow::Error> {
        Ok(self.provider.get_chain_id().await?)
    }

    pub async fn block_number(&self) -> Result<u64, anyhow::Error> {
        Ok(self.provider.get_block_number().await?)
    }

    pub async fn genesis_hash(&self) -> Result<B256, anyhow::Error> {
        let block = self
            .provider
            .get_block_by_number(BlockNumberOrTag::Number(0))
            .await?;
        block
            .map(|block| block.header.hash)
            .context("Node returned no genesis block")
    }

    /// Identify the chain this client talks to.
    pub async fn session(&self, network_name: &str) -> Result<ChainSession, anyhow::Error> {
        let chain_id = self.chain_id().await?;
        let genesis_hash = self.genesis_hash().await?;
        Ok(ChainSession::new(network_name, chain_id, genesis_hash))
    }

    pub async fn transaction_receipt(
        &self,
        hash: B256,
    ) -> Result<Option<TransactionReceipt>, anyhow::Error> {
        Ok(self.provider.get_transaction_receipt(hash).await?)
    }

    pub async fn code(&self, address: Address) -> Result<Bytes, anyhow::Error> {
        Ok(self.provider.get_code_at(address).await?)
    }

    pub async fn balance(&self, address: Address) -> Result<U256, anyhow::Error> {
        Ok(self.provider.get_balance(address).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::providers::mock::Asserter;

    fn mocked() -> (ChainClient, Asserter) {
        let asserter = Asserter::new();
        let provider = ProviderBuilder::new()
            .connect_mocked_client(asserter.clone())
            .erased();
        let endpoint = Url::parse("http://127.0.0.1:8545").unwrap();
        (ChainClient::with_provider(endpoint, provider), asserter)
    }

    #[test]
    fn test_invalid_url_rejected() {
        assert!(ChainClient::new("not a url").is_err());
        assert_eq!(
            ChainClient::new("http://127.0.0.1:8545").unwrap().url(),
            "http://127.0.0.1:8545/"
        );
    }

    #[tokio::test]
    async fn test_chain_id_and_code() {
        let (client, asserter) = mocked();
        asserter.push_success(&"0x7a69");
        asserter.push_success(&"0x6080");

        assert_eq!(client.chain_id().await.unwrap(), 31337);
        let code = client.code(Address::ZERO).await.unwrap();
        assert_eq!(&code[..], &[0x60u8, 0x80]);
    }

    #[tokio::test]
    async fn test_rpc_error_is_returned() {
        let (client, asserter) = mocked();
        asserter.push_failure_msg("upstream timeout");

        let err = client.block_number().await.unwrap_err();
        assert!(format!("{err:#}").contains("upstream timeout"));
    }
}
