//! Compiled contract artifacts.

use std::path::{Path, PathBuf};

use alloy_core::primitives::Bytes;
use anyhow::Context;
use serde::Deserialize;

/// Bytecode field as written by Hardhat (`"0x…"`) or Foundry (`{ "object": "0x…" }`).
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum BytecodeField {
    Hex(Bytes),
    Object { object: Bytes },
}

#[derive(Debug, Deserialize)]
struct ArtifactFile {
    bytecode: BytecodeField,
}

/// A compiled contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub name: String,
    pub bytecode: Bytes,
    pub path: PathBuf,
}

/// Looks up artifacts under a build output directory.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Path of the artifact of `name`.
    ///
    /// `<root>/<name>.json` wins; otherwise `<name>.sol/<name>.json` is searched at any depth, as
    /// compilers mirror the source tree (`contracts/test/MockV3Aggregator.sol/...`).
    fn find(&self, name: &str) -> anyhow::Result<PathBuf> {
        let flat = self.root.join(format!("{name}.json"));
        if flat.is_file() {
            return Ok(flat);
        }

        let pattern = format!(
            "{}/**/{name}.sol/{name}.json",
            glob::Pattern::escape(&self.root.to_string_lossy())
        );
        let mut matches: Vec<PathBuf> = glob::glob(&pattern)
            .context("Invalid artifact search pattern")?
            .filter_map(Result::ok)
            .filter(|path| path.is_file())
            .collect();
        matches.sort();

        match matches.len() {
            0 => anyhow::bail!(
                "No artifact for {} under {}. Compile the contracts first.",
                name,
                self.root.display()
            ),
            1 => Ok(matches.remove(0)),
            _ => anyhow::bail!(
                "Ambiguous artifact name {}: {}",
                name,
                matches
                    .iter()
                    .map(|path| path.display().to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        }
    }

    /// Load the artifact of contract `name`.
    pub fn load(&self, name: &str) -> anyhow::Result<Artifact> {
        let path = self.find(name)?;

        let bytecode = read_bytecode(&path)?;
        if bytecode.is_empty() {
            anyhow::bail!(
                "Artifact {} has no creation bytecode (abstract contract or interface?)",
                path.display()
            );
        }

        tracing::trace!(contract = name, path = %path.display(), "Artifact loaded");

        Ok(Artifact {
            name: name.to_string(),
            bytecode,
            path,
        })
    }
}

fn read_bytecode(path: &Path) -> anyhow::Result<Bytes> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read artifact {}", path.display()))?;
    let artifact: ArtifactFile = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse artifact {}", path.display()))?;

    Ok(match artifact.bytecode {
        BytecodeField::Hex(bytes) | BytecodeField::Object { object: bytes } => bytes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempdir::TempDir;

    #[test]
    fn test_hardhat_layout() {
        let temp_dir = TempDir::new("fundme-test").expect("Failed to create temp dir");
        let dir = temp_dir.path().join("contracts/FundMe.sol");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join("FundMe.json"),
            r#"{ "contractName": "FundMe", "abi": [], "bytecode": "0x6080604052" }"#,
        )
        .unwrap();

        let artifact = ArtifactStore::new(temp_dir.path()).load("FundMe").unwrap();
        assert_eq!(&artifact.bytecode[..], &[0x60u8, 0x80, 0x60, 0x40, 0x52]);
        assert_eq!(artifact.path, dir.join("FundMe.json"));
    }

    #[test]
    fn test_foundry_layout() {
        let temp_dir = TempDir::new("fundme-test").expect("Failed to create temp dir");
        let dir = temp_dir.path().join("MockV3Aggregator.sol");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join("MockV3Aggregator.json"),
            r#"{ "abi": [], "bytecode": { "object": "0x6080", "linkReferences": {} } }"#,
        )
        .unwrap();

        let artifact = ArtifactStore::new(temp_dir.path())
            .load("MockV3Aggregator")
            .unwrap();
        assert_eq!(&artifact.bytecode[..], &[0x60u8, 0x80]);
    }

    #[test]
    fn test_nested_source_folder() {
        let temp_dir = TempDir::new("fundme-test").expect("Failed to create temp dir");
        let dir = temp_dir.path().join("contracts/test/MockV3Aggregator.sol");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join("MockV3Aggregator.json"),
            r#"{ "contractName": "MockV3Aggregator", "abi": [], "bytecode": "0x6080" }"#,
        )
        .unwrap();
        std::fs::write(dir.join("MockV3Aggregator.dbg.json"), r#"{ "buildInfo": "" }"#).unwrap();

        let artifact = ArtifactStore::new(temp_dir.path())
            .load("MockV3Aggregator")
            .unwrap();
        assert_eq!(artifact.path, dir.join("MockV3Aggregator.json"));
        assert_eq!(&artifact.bytecode[..], &[0x60u8, 0x80]);
    }

    #[test]
    fn test_same_name_in_two_sources_is_ambiguous() {
        let temp_dir = TempDir::new("fundme-test").expect("Failed to create temp dir");
        for source in ["contracts/FundMe.sol", "contracts/legacy/FundMe.sol"] {
            let dir = temp_dir.path().join(source);
            std::fs::create_dir_all(&dir).unwrap();
            std::fs::write(dir.join("FundMe.json"), r#"{ "bytecode": "0x6080" }"#).unwrap();
        }

        let err = ArtifactStore::new(temp_dir.path()).load("FundMe").unwrap_err();
        assert!(err.to_string().contains("Ambiguous"), "{err:#}");
    }

    #[test]
    fn test_missing_artifact() {
        let temp_dir = TempDir::new("fundme-test").expect("Failed to create temp dir");
        let result = ArtifactStore::new(temp_dir.path()).load("FundMe");
        assert!(result.is_err());
    }

    #[test]
    fn test_empty_bytecode_rejected() {
        let temp_dir = TempDir::new("fundme-test").expect("Failed to create temp dir");
        std::fs::write(
            temp_dir.path().join("AggregatorV3Interface.json"),
            r#"{ "abi": [], "bytecode": "0x" }"#,
        )
        .unwrap();

        let result = ArtifactStore::new(temp_dir.path()).load("AggregatorV3Interface");
        assert!(result.is_err());
    }
}
