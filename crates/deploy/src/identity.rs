//! The account that deploys contracts.

use std::str::FromStr;

use alloy_core::primitives::Address;
use alloy_signer_local::{MnemonicBuilder, PrivateKeySigner, coins_bip39::English};
use anyhow::Context;

use crate::{DeployError, DeploymentConfig};

/// Mnemonic whose accounts local development nodes pre-fund.
pub const DEV_MNEMONIC: &str = "test test test test test test test test test test test junk";

/// The deployer account, passed explicitly to every component that sends transactions.
#[derive(Debug, Clone)]
pub struct DeployerIdentity {
    signer: PrivateKeySigner,
}

impl DeployerIdentity {
    /// Identity from a hex-encoded private key, with or without `0x`.
    pub fn from_private_key(key: &str) -> anyhow::Result<Self> {
        let signer = PrivateKeySigner::from_str(key.trim()).context("Invalid private key")?;
        Ok(Self { signer })
    }

    /// Identity of the `index`-th account of [`DEV_MNEMONIC`].
    pub fn from_dev_mnemonic(index: u32) -> anyhow::Result<Self> {
        let signer = MnemonicBuilder::<English>::default()
            .phrase(DEV_MNEMONIC)
            .index(index)
            .context("Invalid derivation index")?
            .build()
            .context("Failed to derive account from the development mnemonic")?;
        Ok(Self { signer })
    }

    /// The deployer for `network_name`.
    ///
    /// Development networks use the named deployer account of the test mnemonic. Other networks
    /// need a configured private key.
    pub fn for_network(config: &DeploymentConfig, network_name: &str) -> Result<Self, DeployError> {
        let identity = if config.is_development(network_name) {
            Self::from_dev_mnemonic(config.named_accounts.deployer)
        } else {
            let key = config
                .network(network_name)
                .and_then(|network| network.private_key().map(str::to_string))
                .ok_or_else(|| {
                    DeployError::Config(format!(
                        "no private key configured for network {network_name}"
                    ))
                })?;
            Self::from_private_key(&key)
        };

        identity.map_err(|e| DeployError::Config(format!("{e:#}")))
    }

    pub fn address(&self) -> Address {
        self.signer.address()
    }

    /// The local signer transactions are signed with.
    pub fn signer(&self) -> &PrivateKeySigner {
        &self.signer
    }
}
