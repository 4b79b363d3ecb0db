//! Solidity compiler gateway
//!
//! Runs `solc --combined-json abi,bin <source>` and turns its stdout into a
//! [`CompiledArtifact`] for one named contract.

use crate::compiler::artifact::CompiledArtifact;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};
use thiserror::Error;

/// Default compiler binary, resolved through `PATH`
pub const DEFAULT_SOLC: &str = "solc";

/// Compiler errors
#[derive(Error, Debug)]
pub enum CompilerError {
    #[error("Failed to run compiler {binary:?}: {source}")]
    Spawn {
        binary: PathBuf,
        source: std::io::Error,
    },
    #[error("Compiler exited with {status}: {stderr}")]
    Failed { status: ExitStatus, stderr: String },
    #[error("Failed to parse compiler output: {0}")]
    InvalidOutput(#[from] serde_json::Error),
    #[error("No contract found in compiler output")]
    NoContracts,
    #[error("Contract {wanted} not found in compiler output (available: {})", .available.join(", "))]
    ContractNotFound {
        wanted: String,
        available: Vec<String>,
    },
    #[error("Compiler produced several contracts ({}); name the one to deploy", .0.join(", "))]
    AmbiguousContract(Vec<String>),
    #[error("Contract {0} has no creation bytecode (abstract contract or interface?)")]
    EmptyBytecode(String),
}

impl CompilerError {
    /// Whether the error comes from how the tool was asked to compile, as
    /// opposed to the compiler process itself
    pub fn is_selection_error(&self) -> bool {
        matches!(
            self,
            CompilerError::ContractNotFound { .. } | CompilerError::AmbiguousContract(_)
        )
    }
}

/// Top-level shape of `--combined-json` output
#[derive(Debug, Deserialize)]
struct CombinedJson {
    #[serde(default)]
    contracts: BTreeMap<String, CombinedContract>,
}

/// One entry of the `contracts` map. Field names vary in case between
/// compiler versions.
#[derive(Debug, Deserialize)]
struct CombinedContract {
    #[serde(alias = "ABI")]
    abi: Value,
    #[serde(alias = "Bin")]
    bin: String,
    #[serde(alias = "Metadata", default)]
    metadata: Option<String>,
}

/// Wrapper around an external `solc` binary
#[derive(Debug, Clone)]
pub struct Compiler {
    binary: PathBuf,
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new(DEFAULT_SOLC)
    }
}

impl Compiler {
    /// Create a compiler that runs the given binary
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// Path of the compiler binary
    pub fn binary(&self) -> &Path {
        &self.binary
    }

    /// Compile `source` and return the artifact for `contract`.
    ///
    /// Blocks until the compiler exits; there is no timeout.
    pub fn compile(
        &self,
        source: &Path,
        contract: Option<&str>,
    ) -> Result<CompiledArtifact, CompilerError> {
        log::debug!(
            "Running {:?} --combined-json abi,bin {:?}",
            self.binary,
            source
        );

        let output = Command::new(&self.binary)
            .arg("--combined-json")
            .arg("abi,bin")
            .arg(source)
            .output()
            .map_err(|source| CompilerError::Spawn {
                binary: self.binary.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(CompilerError::Failed {
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let artifact = parse_combined_json(&output.stdout, contract)?;
        log::info!(
            "Compiled {} ({} hex chars of bytecode)",
            artifact.name,
            artifact.bytecode.len()
        );
        Ok(artifact)
    }
}

/// Parse combined-JSON compiler output and select one contract.
///
/// Keys look like `path/to/File.sol:Name`. A requested name matches either
/// the part after the last `:` or the whole key. Without a name, the output
/// must hold exactly one contract.
pub fn parse_combined_json(
    output: &[u8],
    contract: Option<&str>,
) -> Result<CompiledArtifact, CompilerError> {
    let combined: CombinedJson = serde_json::from_slice(output)?;

    if combined.contracts.is_empty() {
        return Err(CompilerError::NoContracts);
    }

    let (key, entry) = match contract {
        Some(wanted) => select_named(&combined.contracts, wanted)?,
        None if combined.contracts.len() == 1 => combined
            .contracts
            .iter()
            .next()
            .ok_or(CompilerError::NoContracts)?,
        None => {
            return Err(CompilerError::AmbiguousContract(
                combined.contracts.keys().cloned().collect(),
            ))
        }
    };

    let name = contract_name(key).to_string();
    if entry.bin.trim().is_empty() {
        return Err(CompilerError::EmptyBytecode(name));
    }

    // Older compilers emit the ABI as a JSON-encoded string.
    let abi = match &entry.abi {
        Value::String(text) => serde_json::from_str(text)?,
        other => other.clone(),
    };

    Ok(CompiledArtifact {
        name,
        bytecode: entry.bin.clone(),
        abi_json: serde_json::to_vec(&abi)?,
        metadata: entry.metadata.clone(),
    })
}

/// Contract name part of a `path/to/File.sol:Name` key; a bare name is
/// returned unchanged
pub fn contract_name(key: &str) -> &str {
    key.rsplit(':').next().unwrap_or(key)
}

/// Find the contract `wanted`, by full key first and then by bare name.
///
/// A bare name defined in more than one source file is ambiguous.
fn select_named<'a>(
    contracts: &'a BTreeMap<String, CombinedContract>,
    wanted: &str,
) -> Result<(&'a String, &'a CombinedContract), CompilerError> {
    if let Some(exact) = contracts.get_key_value(wanted) {
        return Ok(exact);
    }

    let matches: Vec<_> = contracts
        .iter()
        .filter(|(key, _)| contract_name(key) == wanted)
        .collect();

    match matches.as_slice() {
        [only] => Ok(*only),
        [] => Err(CompilerError::ContractNotFound {
            wanted: wanted.to_string(),
            available: contracts.keys().cloned().collect(),
        }),
        _ => Err(CompilerError::AmbiguousContract(
            matches.iter().map(|(key, _)| (*key).clone()).collect(),
        )),
    }
}
