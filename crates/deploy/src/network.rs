//! Network registry: which networks are local, and what each public network depends on.

use std::collections::{BTreeMap, BTreeSet};

use alloy_core::primitives::{Address, B256};
use serde::Serialize;

use crate::{DeployError, DeploymentConfig};

/// Confirmations waited for when a network does not configure its own count.
pub const DEFAULT_CONFIRMATIONS: u64 = 1;

/// Deployment parameters of one network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NetworkProfile {
    /// The chain id.
    pub id: u64,
    /// The network name, as used on the command line.
    pub name: String,
    /// Whether the network is a locally simulated chain.
    pub is_development: bool,
    /// Confirmations to wait for after deploying.
    pub required_confirmations: u64,
    /// The ETH/USD price feed. Present exactly for public networks.
    pub external_dependency_address: Option<Address>,
}

/// Read-only mapping from chain id to [`NetworkProfile`], plus the set of development network
/// names.
///
/// Development membership is decided by name alone; id lookups only matter for public networks
/// and for the confirmation policy.
#[derive(Debug, Clone, Default)]
pub struct NetworkRegistry {
    profiles: BTreeMap<u64, NetworkProfile>,
    development_chains: BTreeSet<String>,
}

impl NetworkRegistry {
    /// Create an empty registry with the given development network names.
    pub fn new<I, S>(development_chains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            profiles: BTreeMap::new(),
            development_chains: development_chains.into_iter().map(Into::into).collect(),
        }
    }

    /// Build the registry from the configured networks.
    ///
    /// Public networks without a price feed are left out, so deploying to them fails to
    /// resolve instead of deploying with a made-up address.
    pub fn from_config(config: &DeploymentConfig) -> Result<Self, DeployError> {
        let mut registry = Self::new(config.development_chains.iter().cloned());

        for (name, network) in &config.networks {
            let is_development = registry.is_development(name);

            if !is_development && network.eth_usd_price_feed.is_none() {
                tracing::debug!(
                    network = %name,
                    chain_id = network.chain_id,
                    "No price feed configured, network left out of the registry"
                );
                continue;
            }

            registry.register(NetworkProfile {
                id: network.chain_id,
                name: name.clone(),
                is_development,
                required_confirmations: network
                    .block_confirmations
                    .unwrap_or(DEFAULT_CONFIRMATIONS),
                external_dependency_address: network.eth_usd_price_feed,
            })?;
        }

        Ok(registry)
    }

    /// Add a profile, enforcing one profile per chain id and the address invariant.
    pub fn register(&mut self, profile: NetworkProfile) -> Result<(), DeployError> {
        let invalid = |reason: &str| DeployError::InvalidNetworkProfile {
            name: profile.name.clone(),
            chain_id: profile.id,
            reason: reason.to_string(),
        };

        if profile.is_development != self.is_development(&profile.name) {
            return Err(invalid(
                "development flag disagrees with the development network set",
            ));
        }
        if profile.is_development && profile.external_dependency_address.is_some() {
            return Err(invalid(
                "development networks use a mock price feed and cannot configure one",
            ));
        }
        if !profile.is_development && profile.external_dependency_address.is_none() {
            return Err(invalid("public networks need a price feed address"));
        }
        if profile.required_confirmations == 0 {
            return Err(invalid("at least one confirmation is required"));
        }
        if let Some(existing) = self.profiles.get(&profile.id) {
            return Err(invalid(&format!(
                "chain id already registered by {}",
                existing.name
            )));
        }

        self.profiles.insert(profile.id, profile);
        Ok(())
    }

    /// Builder-style [`NetworkRegistry::register`].
    pub fn with_profile(mut self, profile: NetworkProfile) -> Result<Self, DeployError> {
        self.register(profile)?;
        Ok(self)
    }

    /// Whether `name` is a development network.
    pub fn is_development(&self, name: &str) -> bool {
        self.development_chains.contains(name)
    }

    /// The profile registered for `chain_id`.
    pub fn lookup(&self, chain_id: u64) -> Result<&NetworkProfile, DeployError> {
        self.profiles
            .get(&chain_id)
            .ok_or(DeployError::UnknownNetwork { chain_id })
    }

    /// Confirmations to wait for on `chain_id`, [`DEFAULT_CONFIRMATIONS`] when unregistered.
    pub fn required_confirmations(&self, chain_id: u64) -> u64 {
        self.lookup(chain_id)
            .map(|profile| profile.required_confirmations)
            .unwrap_or(DEFAULT_CONFIRMATIONS)
    }

    /// All registered profiles, ordered by chain id.
    pub fn profiles(&self) -> impl Iterator<Item = &NetworkProfile> {
        self.profiles.values()
    }

    /// The development network names.
    pub fn development_chains(&self) -> impl Iterator<Item = &str> {
        self.development_chains.iter().map(String::as_str)
    }
}

/// One lifetime of the chain a deployment targets.
///
/// Restarting a local node produces a new genesis block and therefore a new session, which
/// is what scopes mock reuse.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ChainSession {
    pub network_name: String,
    pub chain_id: u64,
    pub genesis_hash: B256,
}

impl ChainSession {
    pub fn new(network_name: impl Into<String>, chain_id: u64, genesis_hash: B256) -> Self {
        Self {
            network_name: network_name.into(),
            chain_id,
            genesis_hash,
        }
    }
}
