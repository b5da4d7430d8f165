//! Source verification through the Etherscan v2 API.

use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use alloy_core::primitives::Address;
use anyhow::{Context, Result};
use backon::{ConstantBuilder, Retryable};
use serde::Deserialize;
use serde_json::Value;

use crate::{ConstructorArgs, ContractVerifier, config::EtherscanConfig};

/// Delay between two verification status checks.
const STATUS_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Response envelope shared by every Etherscan endpoint.
#[derive(Debug, Deserialize)]
struct ApiResponse {
    status: String,
    #[serde(default)]
    message: String,
    result: String,
}

impl ApiResponse {
    fn is_ok(&self) -> bool {
        self.status == "1"
    }
}

/// Solidity compiler input and version, read from a Hardhat build-info file.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BuildInfo {
    solc_long_version: String,
    input: Value,
}

impl BuildInfo {
    fn compiles(&self, source: &str) -> bool {
        self.input
            .get("sources")
            .and_then(|sources| sources.get(source))
            .is_some()
    }
}

#[derive(Debug, thiserror::Error)]
enum CheckError {
    #[error("verification pending: {0}")]
    Pending(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Publishes the sources of the target contract on Etherscan.
pub struct EtherscanVerifier {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    chain_id: u64,
    /// Fully qualified contract name, `path/to/Source.sol:Name`.
    contract: String,
    build_info: Option<PathBuf>,
    build_info_dir: PathBuf,
    timeout: Duration,
}

impl EtherscanVerifier {
    pub fn new(
        config: &EtherscanConfig,
        api_key: impl Into<String>,
        chain_id: u64,
        artifacts_dir: &Path,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            api_url: config.api_url.clone(),
            api_key: api_key.into(),
            chain_id,
            contract: config.contract.clone(),
            build_info: config.build_info.clone(),
            build_info_dir: artifacts_dir.join("build-info"),
            timeout: Duration::from_secs(config.timeout_secs),
        })
    }

    fn source_path(&self) -> &str {
        self.contract
            .split_once(':')
            .map_or(self.contract.as_str(), |(source, _)| source)
    }

    fn contract_name(&self) -> &str {
        self.contract
            .rsplit_once(':')
            .map_or(self.contract.as_str(), |(_, name)| name)
    }

    /// The build-info file that compiled the contract's source.
    fn load_build_info(&self) -> Result<BuildInfo> {
        if let Some(path) = &self.build_info {
            return read_build_info(path);
        }

        let entries = std::fs::read_dir(&self.build_info_dir).context(format!(
            "Failed to read build-info directory {}",
            self.build_info_dir.display()
        ))?;

        for entry in entries {
            let path = entry?.path();
            if path.extension().is_none_or(|ext| ext != "json") {
                continue;
            }
            let build_info = read_build_info(&path)?;
            if build_info.compiles(self.source_path()) {
                tracing::debug!(path = %path.display(), "Using build info");
                return Ok(build_info);
            }
        }

        anyhow::bail!(
            "No build info under {} compiles {}",
            self.build_info_dir.display(),
            self.source_path()
        )
    }

    fn max_attempts(&self) -> usize {
        (self.timeout.as_secs() / STATUS_POLL_INTERVAL.as_secs()).max(1) as usize
    }

    async fn post(&self, form: &[(&str, &str)]) -> Result<ApiResponse> {
        let response = self
            .client
            .post(&self.api_url)
            .query(&[("chainid", self.chain_id.to_string())])
            .form(form)
            .send()
            .await
            .context("Failed to reach Etherscan")?;

        response
            .json()
            .await
            .context("Failed to parse Etherscan response")
    }

    /// Submit the sources. Returns the GUID to poll, or `None` when already verified.
    async fn submit(&self, address: Address, args: &ConstructorArgs) -> Result<Option<String>> {
        let build_info = self.load_build_info()?;
        let source = serde_json::to_string(&build_info.input)
            .context("Failed to serialize compiler input")?;
        let compiler_version = format!("v{}", build_info.solc_long_version);
        let address = address.to_string();
        let constructor_args = args.to_hex();

        let form = [
            ("apikey", self.api_key.as_str()),
            ("module", "contract"),
            ("action", "verifysourcecode"),
            ("contractaddress", address.as_str()),
            ("sourceCode", source.as_str()),
            ("codeformat", "solidity-standard-json-input"),
            ("contractname", self.contract.as_str()),
            ("compilerversion", compiler_version.as_str()),
            // Etherscan's spelling.
            ("constructorArguements", constructor_args.as_str()),
        ];

        // Freshly deployed bytecode may not be indexed yet.
        let form = &form;
        let response = (move || async move {
            let response = self.post(form).await?;
            if !response.is_ok() && response.result.contains("Unable to locate ContractCode") {
                return Err(CheckError::Pending(response.result));
            }
            Ok(response)
        })
        .retry(
            ConstantBuilder::default()
                .with_delay(STATUS_POLL_INTERVAL)
                .with_max_times(self.max_attempts()),
        )
        .when(|e| matches!(e, CheckError::Pending(_)))
        .await
        .map_err(anyhow::Error::from)?;

        if response.is_ok() {
            return Ok(Some(response.result));
        }
        if is_already_verified(&response.result) {
            return Ok(None);
        }

        anyhow::bail!(
            "Etherscan rejected the submission: {} ({})",
            response.result,
            response.message
        )
    }

    async fn check_status(&self, guid: &str) -> Result<(), CheckError> {
        let form = [
            ("apikey", self.api_key.as_str()),
            ("module", "contract"),
            ("action", "checkverifystatus"),
            ("guid", guid),
        ];

        let response = self.post(&form).await?;
        if response.is_ok() || is_already_verified(&response.result) {
            return Ok(());
        }
        if response.result.contains("Pending") {
            return Err(CheckError::Pending(response.result));
        }

        Err(anyhow::anyhow!("Verification failed: {}", response.result).into())
    }
}

fn read_build_info(path: &Path) -> Result<BuildInfo> {
    let content = std::fs::read_to_string(path)
        .context(format!("Failed to read build info {}", path.display()))?;
    serde_json::from_str(&content).context(format!("Failed to parse build info {}", path.display()))
}

fn is_already_verified(result: &str) -> bool {
    result.to_lowercase().contains("already verified")
}

#[async_trait::async_trait]
impl ContractVerifier for EtherscanVerifier {
    async fn verify(&self, address: Address, args: &ConstructorArgs) -> Result<()> {
        tracing::info!(
            address = %address,
            contract = %self.contract_name(),
            chain_id = self.chain_id,
            "Submitting sources to Etherscan..."
        );

        let Some(guid) = self.submit(address, args).await? else {
            tracing::info!(address = %address, "Already verified!");
            return Ok(());
        };

        let guid = guid.as_str();
        (move || self.check_status(guid))
            .retry(
                ConstantBuilder::default()
                    .with_delay(STATUS_POLL_INTERVAL)
                    .with_max_times(self.max_attempts()),
            )
            .when(|e| matches!(e, CheckError::Pending(_)))
            .notify(|e, delay| {
                tracing::debug!(error = %e, ?delay, "Verification not done yet");
            })
            .await
            .map_err(anyhow::Error::from)?;

        tracing::info!(address = %address, "Contract verified");
        Ok(())
    }
}
