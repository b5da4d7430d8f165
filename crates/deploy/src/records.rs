use std::{
    fs::{File, OpenOptions},
    path::{Path, PathBuf},
};

use alloy_core::primitives::{Address, B256};
use anyhow::{Context, Result};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::ChainSession;

/// Name of the per-network lock file.
const LOCK_FILENAME: &str = ".lock";

/// Compute the SHA-256 of the creation code a deployment would send.
///
/// The same bytecode with the same constructor arguments always produces the same hash, so an
/// unchanged contract is never deployed twice on one chain.
pub fn artifact_hash(bytecode: &[u8], encoded_args: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytecode);
    hasher.update(encoded_args);
    hex::encode(hasher.finalize())
}

/// A contract deployment, as remembered between runs.
///
/// Saved to `{deployments_dir}/{network}/{contract}.json` after the deployment collected its
/// confirmations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentRecord {
    pub contract: String,
    pub address: Address,
    pub transaction_hash: B256,
    pub chain_id: u64,
    /// Genesis hash of the chain the contract lives on.
    pub genesis_hash: B256,
    /// [`artifact_hash`] of the deployed creation code.
    pub artifact_hash: String,
    /// Hex-encoded ABI constructor arguments.
    pub constructor_args: String,
    pub gas_used: u64,
    pub effective_gas_price: u128,
    /// Unix timestamp of the deployment.
    pub deployed_at: i64,
    /// Version of this tool that made the deployment.
    pub fundme_version: String,
}

impl DeploymentRecord {
    /// Whether this record describes `artifact_hash` deployed in `session`.
    pub fn matches(&self, session: &ChainSession, artifact_hash: &str) -> bool {
        self.chain_id == session.chain_id
            && self.genesis_hash == session.genesis_hash
            && self.artifact_hash == artifact_hash
    }

    /// Save this record to a file.
    ///
    /// The file is written as formatted JSON for human readability.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let json =
            serde_json::to_string_pretty(self).context("Failed to serialize deployment record")?;

        std::fs::write(path, json).context(format!(
            "Failed to write deployment record to {}",
            path.display()
        ))?;

        Ok(())
    }

    /// Load a record from a file.
    ///
    /// Returns an error if the file doesn't exist, is malformed, or cannot be read.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            anyhow::bail!("Deployment record does not exist: {}", path.display());
        }

        let content = std::fs::read_to_string(path).context(format!(
            "Failed to read deployment record from {}",
            path.display()
        ))?;

        let record: Self =
            serde_json::from_str(&content).context("Failed to parse deployment record JSON")?;

        Ok(record)
    }
}

/// The records of one network.
#[derive(Debug, Clone)]
pub struct DeploymentRecords {
    dir: PathBuf,
}

/// Exclusive hold on a network's records, released on drop.
#[derive(Debug)]
pub struct RecordsLock {
    file: File,
}

impl Drop for RecordsLock {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            tracing::warn!(error = %e, "Failed to release deployment records lock");
        }
    }
}

impl DeploymentRecords {
    pub fn new(deployments_dir: &Path, network_name: &str) -> Self {
        Self {
            dir: deployments_dir.join(network_name),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self, contract: &str) -> PathBuf {
        self.dir.join(format!("{contract}.json"))
    }

    /// Wait for exclusive access to this network's records.
    pub async fn lock(&self) -> Result<RecordsLock> {
        std::fs::create_dir_all(&self.dir).context(format!(
            "Failed to create deployments directory {}",
            self.dir.display()
        ))?;

        let path = self.dir.join(LOCK_FILENAME);
        let file = tokio::task::spawn_blocking(move || -> Result<File> {
            let file = OpenOptions::new()
                .create(true)
                .truncate(false)
                .write(true)
                .open(&path)
                .context(format!("Failed to open lock file {}", path.display()))?;
            file.lock_exclusive()
                .context("Failed to lock deployment records")?;
            Ok(file)
        })
        .await
        .context("Lock task failed")??;

        Ok(RecordsLock { file })
    }

    /// The record of `contract`, if one was saved.
    ///
    /// An unreadable record is treated as missing, so the contract is deployed again.
    pub fn load(&self, contract: &str) -> Option<DeploymentRecord> {
        let path = self.path(contract);
        if !path.exists() {
            return None;
        }

        match DeploymentRecord::load_from_file(&path) {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %format!("{e:#}"),
                    "Ignoring unreadable deployment record"
                );
                None
            }
        }
    }

    pub fn save(&self, record: &DeploymentRecord) -> Result<()> {
        std::fs::create_dir_all(&self.dir).context(format!(
            "Failed to create deployments directory {}",
            self.dir.display()
        ))?;
        let path = self.path(&record.contract);
        record.save_to_file(&path)?;
        tracing::debug!(
            contract = %record.contract,
            path = %path.display(),
            "Deployment record saved"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_core::primitives::address;
    use tempdir::TempDir;

    fn record() -> DeploymentRecord {
        DeploymentRecord {
            contract: "FundMe".to_string(),
            address: address!("0x9fE46736679d2D9a65F0992F2272dE9f3c7fa6e0"),
            transaction_hash: B256::repeat_byte(0x11),
            chain_id: 31337,
            genesis_hash: B256::repeat_byte(0x22),
            artifact_hash: artifact_hash(&[0x60, 0x80], &[0x01]),
            constructor_args: "01".to_string(),
            gas_used: 800_000,
            effective_gas_price: 1_875_000_000,
            deployed_at: 1737316800,
            fundme_version: "0.1.0".to_string(),
        }
    }

    #[test]
    fn test_artifact_hash_determinism() {
        let hash1 = artifact_hash(&[0x60, 0x80], &[0x01]);
        let hash2 = artifact_hash(&[0x60, 0x80], &[0x01]);

        assert_eq!(hash1, hash2, "Hash should be deterministic");
        assert_eq!(hash1.len(), 64, "SHA-256 hash should be 64 hex characters");
    }

    #[test]
    fn test_artifact_hash_changes_with_args() {
        assert_ne!(
            artifact_hash(&[0x60, 0x80], &[0x01]),
            artifact_hash(&[0x60, 0x80], &[0x02]),
            "Hash should change when constructor arguments change"
        );
    }

    #[test]
    fn test_artifact_hash_changes_with_bytecode() {
        assert_ne!(
            artifact_hash(&[0x60, 0x80], &[]),
            artifact_hash(&[0x60, 0x81], &[]),
            "Hash should change when bytecode changes"
        );
    }

    #[test]
    fn test_matches_session_and_artifact() {
        let record = record();
        let session = ChainSession::new("localhost", 31337, B256::repeat_byte(0x22));
        let restarted = ChainSession::new("localhost", 31337, B256::repeat_byte(0x33));

        assert!(record.matches(&session, &record.artifact_hash));
        assert!(!record.matches(&restarted, &record.artifact_hash));
        assert!(!record.matches(&session, &artifact_hash(&[0x60, 0x80], &[0x02])));
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new("fundme-test").expect("Failed to create temp dir");
        let records = DeploymentRecords::new(temp_dir.path(), "localhost");

        assert!(records.load("FundMe").is_none());

        records.save(&record()).expect("Failed to save record");
        assert_eq!(records.load("FundMe"), Some(record()));
        assert!(temp_dir.path().join("localhost/FundMe.json").exists());
    }

    #[test]
    fn test_corrupted_record_is_ignored() {
        let temp_dir = TempDir::new("fundme-test").expect("Failed to create temp dir");
        let records = DeploymentRecords::new(temp_dir.path(), "localhost");
        std::fs::create_dir_all(records.dir()).unwrap();
        std::fs::write(records.path("FundMe"), "{ invalid json }").unwrap();

        assert!(records.load("FundMe").is_none());
        assert!(DeploymentRecord::load_from_file(&records.path("FundMe")).is_err());
    }

    #[tokio::test]
    async fn test_lock_is_reacquirable_after_drop() {
        let temp_dir = TempDir::new("fundme-test").expect("Failed to create temp dir");
        let records = DeploymentRecords::new(temp_dir.path(), "sepolia");

        let lock = records.lock().await.expect("Failed to lock");
        drop(lock);
        let _lock = records.lock().await.expect("Failed to lock again");
    }
}
