// Copyright 2022-2024 Protocol Labs
// SPDX-License-Identifier: Apache-2.0, MIT
//! Utilities to deal with the combined solc build output.
//!
//! The compiler is expected to have produced a single JSON document mapping
//! `"src/File.sol:ContractName"` (or bare `"ContractName"`) keys to
//! `{abi, bin}` records. The store is loaded once at startup and is
//! immutable afterwards.

use ethers_core::abi::{Abi, Constructor, Event, Function};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Contract name as it appears in the combined output, e.g. `"DiamondCutFacet"`.
pub type ContractName = String;

/// Contract source as it appears in the combined output, e.g. `"src/facets/DiamondCutFacet.sol"`.
/// Empty when the key carried no source prefix.
pub type ContractSource = String;

#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    #[error("combined artifact file not found at {0:?}; run the contract compiler first")]
    MissingCombinedJson(PathBuf),

    #[error("failed to read combined artifact file at {0:?}")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("failed to parse combined artifact file")]
    Parse(#[source] serde_json::Error),

    #[error("artifact {0} not found in compilation result")]
    NotFound(String),

    #[error("artifact {0} does not have any bytecode")]
    MissingBytecode(String),

    #[error("artifact {0} has malformed bytecode")]
    InvalidBytecode(String, #[source] hex::FromHexError),
}

/// A single contract as it appears in the combined build output.
#[derive(Clone, Debug)]
pub struct ContractArtifact {
    pub file: ContractSource,
    pub name: ContractName,
    pub abi: Abi,
    /// Hexadecimal creation bytecode; libraries and interfaces have none.
    bytecode: Option<String>,
}

impl ContractArtifact {
    pub fn constructor(&self) -> Option<&Constructor> {
        self.abi.constructor.as_ref()
    }

    /// Externally callable functions, excluding internal initializers,
    /// which are named with an `_init` suffix by convention and must not
    /// be routed through the diamond.
    pub fn functions(&self) -> impl Iterator<Item = &Function> {
        self.abi.functions().filter(|f| !f.name.ends_with("_init"))
    }

    pub fn events(&self) -> impl Iterator<Item = &Event> {
        self.abi.events()
    }

    pub fn has_bytecode(&self) -> bool {
        self.bytecode.as_deref().is_some_and(|b| !b.is_empty())
    }

    /// Decode the creation bytecode of the contract.
    pub fn bytecode(&self) -> Result<Vec<u8>, ArtifactError> {
        let hex_str = self
            .bytecode
            .as_deref()
            .filter(|b| !b.is_empty())
            .ok_or_else(|| ArtifactError::MissingBytecode(self.name.clone()))?;

        hex::decode(hex_str.trim_start_matches("0x"))
            .map_err(|e| ArtifactError::InvalidBytecode(self.name.clone(), e))
    }
}

/// Match the combined output document, e.g. `solc --combined-json abi,bin`.
#[derive(Deserialize)]
struct CombinedJson {
    contracts: serde_json::Map<String, serde_json::Value>,
}

#[derive(Deserialize)]
struct CombinedEntry {
    abi: Abi,
    #[serde(default)]
    bin: Option<String>,
}

/// In-memory view of the combined build output, queried by contract name.
#[derive(Clone, Debug, Default)]
pub struct ArtifactStore {
    // Kept in file order so that duplicate names resolve to the first occurrence.
    artifacts: Vec<ContractArtifact>,
}

impl ArtifactStore {
    /// Load and parse the combined build output.
    ///
    /// A missing file means the compiler has not been run; this is raised
    /// before any deployment proceeds.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ArtifactError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ArtifactError::MissingCombinedJson(path.to_path_buf()));
        }
        let json = std::fs::read_to_string(path)
            .map_err(|e| ArtifactError::Io(path.to_path_buf(), e))?;
        Self::from_json(&json)
    }

    pub fn from_json(json: &str) -> Result<Self, ArtifactError> {
        let combined: CombinedJson = serde_json::from_str(json).map_err(ArtifactError::Parse)?;

        let mut artifacts = Vec::new();
        for (key, value) in combined.contracts {
            let entry: CombinedEntry =
                serde_json::from_value(value).map_err(ArtifactError::Parse)?;

            let (file, name) = match key.split_once(':') {
                Some((file, name)) => (file.to_string(), name.to_string()),
                None => (String::new(), key),
            };

            artifacts.push(ContractArtifact {
                file,
                name,
                abi: entry.abi,
                bytecode: entry.bin,
            });
        }

        Ok(Self { artifacts })
    }

    /// Look up an artifact by contract name; the first occurrence wins.
    pub fn get(&self, name: &str) -> Result<&ContractArtifact, ArtifactError> {
        self.artifacts
            .iter()
            .find(|a| a.name == name)
            .ok_or_else(|| ArtifactError::NotFound(name.to_string()))
    }

    pub fn abi(&self, name: &str) -> Result<&Abi, ArtifactError> {
        Ok(&self.get(name)?.abi)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.artifacts.iter().map(|a| a.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::{ArtifactError, ArtifactStore};

    const COMBINED: &str = r#"{
        "contracts": {
            "src/facets/DiamondCutFacet.sol:DiamondCutFacet": {
                "abi": [
                    {
                        "type": "function",
                        "name": "diamondCut",
                        "inputs": [
                            {
                                "name": "_diamondCut",
                                "type": "tuple[]",
                                "components": [
                                    {"name": "facetAddress", "type": "address"},
                                    {"name": "action", "type": "uint8"},
                                    {"name": "functionSelectors", "type": "bytes4[]"}
                                ]
                            },
                            {"name": "_init", "type": "address"},
                            {"name": "_calldata", "type": "bytes"}
                        ],
                        "outputs": [],
                        "stateMutability": "nonpayable"
                    }
                ],
                "bin": "0x608060405234"
            },
            "src/Diamond.sol:Diamond": {
                "abi": [
                    {
                        "type": "constructor",
                        "inputs": [
                            {"name": "_contractOwner", "type": "address"},
                            {"name": "_diamondCutFacet", "type": "address"},
                            {"name": "_diamondInit", "type": "address"},
                            {"name": "_erc3643Facet", "type": "address"}
                        ],
                        "stateMutability": "payable"
                    }
                ],
                "bin": "6080604052"
            },
            "TokenManagement": {
                "abi": [
                    {
                        "type": "function",
                        "name": "mintERC3643",
                        "inputs": [
                            {"name": "_to", "type": "address"},
                            {"name": "_amount", "type": "uint256"}
                        ],
                        "outputs": [],
                        "stateMutability": "nonpayable"
                    },
                    {
                        "type": "function",
                        "name": "tokenManagement_init",
                        "inputs": [],
                        "outputs": [],
                        "stateMutability": "nonpayable"
                    },
                    {
                        "type": "event",
                        "name": "Minted",
                        "inputs": [
                            {"name": "to", "type": "address", "indexed": true},
                            {"name": "amount", "type": "uint256", "indexed": false}
                        ],
                        "anonymous": false
                    }
                ]
            }
        }
    }"#;

    fn test_store() -> ArtifactStore {
        ArtifactStore::from_json(COMBINED).expect("combined JSON parses")
    }

    #[test]
    fn lookup_by_name() {
        let store = test_store();
        let artifact = store.get("DiamondCutFacet").expect("artifact is present");
        assert_eq!(artifact.file, "src/facets/DiamondCutFacet.sol");
        assert_eq!(artifact.name, "DiamondCutFacet");
        assert!(artifact.has_bytecode());
    }

    #[test]
    fn lookup_bare_key() {
        let store = test_store();
        let artifact = store.get("TokenManagement").expect("artifact is present");
        assert_eq!(artifact.file, "");
        assert!(!artifact.has_bytecode());
    }

    #[test]
    fn missing_artifact_is_not_found() {
        let store = test_store();
        let result = store.get("NoSuchContract");
        assert!(matches!(result, Err(ArtifactError::NotFound(n)) if n == "NoSuchContract"));
    }

    #[test]
    fn missing_combined_file() {
        let dir = tempfile::tempdir().expect("can create a temporary directory");
        let path = dir.path().join("combined.json");
        let result = ArtifactStore::load(&path);
        assert!(matches!(
            result,
            Err(ArtifactError::MissingCombinedJson(p)) if p == path
        ));
    }

    #[test]
    fn bytecode_decoding() {
        let store = test_store();

        // With and without the 0x prefix.
        let cut = store.get("DiamondCutFacet").unwrap();
        assert_eq!(cut.bytecode().unwrap(), vec![0x60, 0x80, 0x60, 0x40, 0x52, 0x34]);

        let diamond = store.get("Diamond").unwrap();
        assert_eq!(diamond.bytecode().unwrap(), vec![0x60, 0x80, 0x60, 0x40, 0x52]);

        let facet = store.get("TokenManagement").unwrap();
        assert!(matches!(
            facet.bytecode(),
            Err(ArtifactError::MissingBytecode(n)) if n == "TokenManagement"
        ));
    }

    #[test]
    fn invalid_bytecode() {
        let json = r#"{"contracts": {"Broken": {"abi": [], "bin": "0xzz"}}}"#;
        let store = ArtifactStore::from_json(json).unwrap();
        let result = store.get("Broken").unwrap().bytecode();
        assert!(matches!(result, Err(ArtifactError::InvalidBytecode(n, _)) if n == "Broken"));
    }

    #[test]
    fn duplicate_name_first_wins() {
        let json = r#"{
            "contracts": {
                "src/a.sol:Facet": {"abi": [], "bin": "01"},
                "src/b.sol:Facet": {"abi": [], "bin": "02"}
            }
        }"#;
        let store = ArtifactStore::from_json(json).unwrap();
        let artifact = store.get("Facet").unwrap();
        assert_eq!(artifact.file, "src/a.sol");
        assert_eq!(artifact.bytecode().unwrap(), vec![0x01]);
    }

    #[test]
    fn functions_exclude_initializers() {
        let store = test_store();
        let facet = store.get("TokenManagement").unwrap();

        let names: Vec<_> = facet.functions().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["mintERC3643"]);

        assert!(facet.constructor().is_none());
        assert_eq!(facet.events().count(), 1);
    }

    #[test]
    fn constructor_is_exposed() {
        let store = test_store();
        let diamond = store.get("Diamond").unwrap();
        let constructor = diamond.constructor().expect("Diamond has a constructor");
        assert_eq!(constructor.inputs.len(), 4);
    }
}
