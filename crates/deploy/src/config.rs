//! Deployment configuration.
//!
//! The whole process reads its settings from one [`DeploymentConfig`] built at start-up and
//! passed by reference to every component. Values are layered with figment:
//! built-in defaults, then `fundme.toml`, then a handful of well-known environment variables,
//! then `FUNDME_`-prefixed variables (`__` separates nested keys).

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
    time::Duration,
};

use alloy_core::primitives::{Address, address};
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

use crate::DeployError;

/// The default name of the configuration file.
pub const CONFIG_FILENAME: &str = "fundme.toml";

/// Fallback RPC URL used when `SEPOLIA_RPC_URL` is not set.
pub const PLACEHOLDER_RPC_URL: &str = "http://eth-sepolia";
/// Fallback private key used when `SEPOLIA_PRIVATE_KEY` is not set.
pub const PLACEHOLDER_PRIVATE_KEY: &str = "0x";
/// Fallback Etherscan key used when `ETHERSCAN_API_KEY` is not set.
pub const PLACEHOLDER_ETHERSCAN_API_KEY: &str = "etherscan api key";
/// Fallback CoinMarketCap key used when `COINMARKETCAP_API_KEY` is not set.
pub const PLACEHOLDER_COINMARKETCAP_API_KEY: &str = "coinmarketcap api key";

/// RPC URL of a local development node.
pub const LOCAL_RPC_URL: &str = "http://127.0.0.1:8545/";
/// Chain id used by local development nodes.
pub const LOCAL_CHAIN_ID: u64 = 31337;
/// Name of the default, in-process style development network.
pub const HARDHAT_NETWORK: &str = "hardhat";

/// Sepolia chain id.
pub const SEPOLIA_CHAIN_ID: u64 = 11155111;
/// Chainlink ETH/USD price feed on Sepolia.
pub const SEPOLIA_ETH_USD_PRICE_FEED: Address =
    address!("0x694AA1769357215DE4FAC081bf1f309aDC325306");

/// Environment variables that keep their historical names, and the key each one sets.
const WELL_KNOWN_ENV: [(&str, &str); 4] = [
    ("SEPOLIA_RPC_URL", "networks.sepolia.url"),
    ("SEPOLIA_PRIVATE_KEY", "networks.sepolia.private_key"),
    ("ETHERSCAN_API_KEY", "etherscan.api_key"),
    ("COINMARKETCAP_API_KEY", "gas_reporter.coinmarketcap_api_key"),
];

/// Connection and deployment parameters of one network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// JSON-RPC endpoint.
    pub url: String,
    /// Expected chain id. Checked against `eth_chainId` before deploying.
    pub chain_id: u64,
    /// Confirmations to wait for after each deployment. Defaults to 1.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_confirmations: Option<u64>,
    /// Hex-encoded signing key of the deployer account.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private_key: Option<String>,
    /// Address of the ETH/USD price feed on this network.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eth_usd_price_feed: Option<Address>,
}

impl NetworkConfig {
    /// A local development node.
    pub fn local() -> Self {
        Self {
            url: LOCAL_RPC_URL.to_string(),
            chain_id: LOCAL_CHAIN_ID,
            block_confirmations: None,
            private_key: None,
            eth_usd_price_feed: None,
        }
    }

    /// The configured private key, ignoring the placeholder.
    pub fn private_key(&self) -> Option<&str> {
        credential(self.private_key.as_deref(), PLACEHOLDER_PRIVATE_KEY)
    }
}

/// Account indexes of the local node's test mnemonic, by role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedAccounts {
    pub deployer: u32,
}

impl Default for NamedAccounts {
    fn default() -> Self {
        Self { deployer: 0 }
    }
}

/// Constructor parameters of the price feed stand-in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MockConfig {
    pub decimals: u8,
    pub initial_answer: i64,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            decimals: 8,
            initial_answer: 200_000_000_000,
        }
    }
}

/// Source verification settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EtherscanConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    pub api_url: String,
    /// Compiler build-info file holding the standard JSON input and compiler version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_info: Option<PathBuf>,
    /// Fully qualified contract name, `<source path>:<contract>`.
    pub contract: String,
    /// Maximum time to wait for the explorer to accept and check a submission.
    pub timeout_secs: u64,
}

impl Default for EtherscanConfig {
    fn default() -> Self {
        Self {
            api_key: Some(PLACEHOLDER_ETHERSCAN_API_KEY.to_string()),
            api_url: "https://api.etherscan.io/v2/api".to_string(),
            build_info: None,
            contract: "contracts/FundMe.sol:FundMe".to_string(),
            timeout_secs: 120,
        }
    }
}

/// Gas usage reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GasReporterConfig {
    pub enabled: bool,
    pub output_file: PathBuf,
    pub currency: String,
    pub token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coinmarketcap_api_key: Option<String>,
}

impl Default for GasReporterConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            output_file: PathBuf::from("gasreport.txt"),
            currency: "USD".to_string(),
            token: "MATIC".to_string(),
            coinmarketcap_api_key: Some(PLACEHOLDER_COINMARKETCAP_API_KEY.to_string()),
        }
    }
}

/// Everything a deployment needs to know about its environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentConfig {
    /// Network used when the CLI does not name one.
    pub default_network: String,
    /// Names of locally simulated networks. Mocks replace external dependencies there.
    pub development_chains: Vec<String>,
    /// Known networks by name.
    pub networks: BTreeMap<String, NetworkConfig>,
    pub named_accounts: NamedAccounts,
    /// Directory holding compiled contract artifacts.
    pub artifacts_dir: PathBuf,
    /// Directory holding prior-deployment records.
    pub deployments_dir: PathBuf,
    pub mock: MockConfig,
    pub etherscan: EtherscanConfig,
    pub gas_reporter: GasReporterConfig,
    /// Upper bound on waiting for a transaction to collect its confirmations.
    pub confirmation_timeout_secs: u64,
    /// Delay between chain polls while waiting for receipts and confirmations.
    pub poll_interval_millis: u64,
}

impl Default for DeploymentConfig {
    fn default() -> Self {
        let mut networks = BTreeMap::new();
        networks.insert(
            "sepolia".to_string(),
            NetworkConfig {
                url: PLACEHOLDER_RPC_URL.to_string(),
                chain_id: SEPOLIA_CHAIN_ID,
                block_confirmations: Some(6),
                private_key: Some(PLACEHOLDER_PRIVATE_KEY.to_string()),
                eth_usd_price_feed: Some(SEPOLIA_ETH_USD_PRICE_FEED),
            },
        );
        networks.insert("localhost".to_string(), NetworkConfig::local());

        Self {
            default_network: HARDHAT_NETWORK.to_string(),
            development_chains: vec![HARDHAT_NETWORK.to_string(), "localhost".to_string()],
            networks,
            named_accounts: NamedAccounts::default(),
            artifacts_dir: PathBuf::from("artifacts"),
            deployments_dir: PathBuf::from("deployments"),
            mock: MockConfig::default(),
            etherscan: EtherscanConfig::default(),
            gas_reporter: GasReporterConfig::default(),
            confirmation_timeout_secs: 300,
            poll_interval_millis: 1_000,
        }
    }
}

impl DeploymentConfig {
    /// The layered configuration sources.
    ///
    /// `path` defaults to [`CONFIG_FILENAME`] in the working directory. A missing file is not
    /// an error.
    pub fn figment(path: Option<&Path>) -> Figment {
        let path = path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(CONFIG_FILENAME));

        let well_known = Env::raw()
            .only(&WELL_KNOWN_ENV.map(|(var, _)| var))
            .map(|var| {
                WELL_KNOWN_ENV
                    .iter()
                    .find(|(name, _)| var.as_str().eq_ignore_ascii_case(name))
                    .map(|(_, key)| (*key).into())
                    .unwrap_or_else(|| var.as_str().to_string().into())
            });

        Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file(path))
            .merge(well_known)
            .merge(Env::prefixed("FUNDME_").split("__"))
    }

    /// Load the configuration from all sources.
    pub fn load(path: Option<&Path>) -> Result<Self, DeployError> {
        let config: Self = Self::figment(path)
            .extract()
            .map_err(|e| DeployError::Config(e.to_string()))?;

        tracing::debug!(
            default_network = %config.default_network,
            networks = config.networks.len(),
            "Configuration loaded"
        );

        Ok(config)
    }

    /// Connection parameters for `name`.
    ///
    /// The `hardhat` network points at the local node unless it is configured explicitly.
    pub fn network(&self, name: &str) -> Option<NetworkConfig> {
        match self.networks.get(name) {
            Some(network) => Some(network.clone()),
            None if name == HARDHAT_NETWORK => Some(NetworkConfig::local()),
            None => None,
        }
    }

    /// Whether `name` is a locally simulated network.
    pub fn is_development(&self, name: &str) -> bool {
        self.development_chains.iter().any(|chain| chain == name)
    }

    /// The Etherscan key, ignoring the placeholder.
    pub fn etherscan_api_key(&self) -> Option<&str> {
        credential(
            self.etherscan.api_key.as_deref(),
            PLACEHOLDER_ETHERSCAN_API_KEY,
        )
    }

    /// Whether post-deploy verification has a credential to work with.
    pub fn has_verification_credential(&self) -> bool {
        self.etherscan_api_key().is_some()
    }

    /// The CoinMarketCap key, ignoring the placeholder.
    pub fn coinmarketcap_api_key(&self) -> Option<&str> {
        credential(
            self.gas_reporter.coinmarketcap_api_key.as_deref(),
            PLACEHOLDER_COINMARKETCAP_API_KEY,
        )
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_millis)
    }

    pub fn confirmation_timeout(&self) -> Duration {
        Duration::from_secs(self.confirmation_timeout_secs)
    }
}

/// Treat placeholders and blank values as absent.
fn credential<'a>(value: Option<&'a str>, placeholder: &str) -> Option<&'a str> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty() && *value != placeholder)
}
