//! Compiled contract artifacts
//!
//! An artifact is the bytecode and ABI of one contract, exactly as the
//! compiler produced them. It is immutable once created.

use alloy_json_abi::JsonAbi;
use thiserror::Error;

/// Errors decoding the contents of an artifact
#[derive(Error, Debug)]
pub enum ArtifactError {
    #[error("Bytecode for {contract} is not valid hex: {source}")]
    InvalidBytecode {
        contract: String,
        source: hex::FromHexError,
    },
    #[error("ABI for {contract} is not a valid JSON ABI: {source}")]
    InvalidAbi {
        contract: String,
        source: serde_json::Error,
    },
}

/// Bytecode plus interface description for a single contract
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledArtifact {
    /// Contract name, without the source path prefix
    pub name: String,
    /// Creation bytecode as hex text (no `0x` prefix from solc)
    pub bytecode: String,
    /// ABI as raw JSON bytes
    pub abi_json: Vec<u8>,
    /// Compiler metadata, when requested
    pub metadata: Option<String>,
}

impl CompiledArtifact {
    /// Create an artifact from its parts
    pub fn new(name: impl Into<String>, bytecode: impl Into<String>, abi_json: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytecode: bytecode.into(),
            abi_json,
            metadata: None,
        }
    }

    /// Decode the bytecode hex into raw bytes
    pub fn bytecode_bytes(&self) -> Result<Vec<u8>, ArtifactError> {
        let text = self.bytecode.trim();
        let text = text.strip_prefix("0x").unwrap_or(text);
        hex::decode(text).map_err(|source| ArtifactError::InvalidBytecode {
            contract: self.name.clone(),
            source,
        })
    }

    /// Parse the ABI JSON
    pub fn abi(&self) -> Result<JsonAbi, ArtifactError> {
        serde_json::from_slice(&self.abi_json).map_err(|source| ArtifactError::InvalidAbi {
            contract: self.name.clone(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::GREETER_ABI;

    #[test]
    fn test_bytecode_decoding_accepts_optional_prefix() {
        let plain = CompiledArtifact::new("Greeter", "6080", GREETER_ABI.as_bytes().to_vec());
        let prefixed = CompiledArtifact::new("Greeter", "0x6080", GREETER_ABI.as_bytes().to_vec());

        assert_eq!(plain.bytecode_bytes().unwrap(), vec![0x60, 0x80]);
        assert_eq!(prefixed.bytecode_bytes().unwrap(), vec![0x60, 0x80]);
    }

    #[test]
    fn test_invalid_bytecode_names_contract() {
        let artifact = CompiledArtifact::new("Greeter", "xyz", b"[]".to_vec());
        let err = artifact.bytecode_bytes().unwrap_err();
        assert!(err.to_string().contains("Greeter"));
    }

    #[test]
    fn test_abi_parsing() {
        let artifact = CompiledArtifact::new("Greeter", "6080", GREETER_ABI.as_bytes().to_vec());
        let abi = artifact.abi().unwrap();

        assert!(abi.constructor().is_some());
        assert!(abi.function("greet").is_some());
        assert!(abi.function("setGreeting").is_some());

        let broken = CompiledArtifact::new("Greeter", "6080", b"{not json".to_vec());
        assert!(matches!(
            broken.abi().unwrap_err(),
            ArtifactError::InvalidAbi { .. }
        ));
    }
}
