//! Crate-level error type
//!
//! Wraps every component error so the binary has one place to decide how a
//! failure is reported.

use crate::chain::ChainError;
use crate::compiler::{ArtifactError, CompilerError};
use crate::config::ConfigError;
use crate::deploy::DeployError;
use crate::invoke::{ArgError, InvokeError};
use crate::signer::KeyError;
use crate::storage::StorageError;
use std::fmt;
use thiserror::Error;

/// Broad class of a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing or malformed settings, including contract selection
    Configuration,
    /// The compiler could not be run or its output was unusable
    ExternalProcess,
    /// A node request failed or a transaction reverted
    Rpc,
    /// A check that guards a submission did not pass
    Precondition,
    /// Cache reads and writes
    Io,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Configuration => "configuration",
            ErrorKind::ExternalProcess => "compiler",
            ErrorKind::Rpc => "rpc",
            ErrorKind::Precondition => "precondition",
            ErrorKind::Io => "io",
        };
        f.write_str(name)
    }
}

/// Any failure of a deployer command
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Key(#[from] KeyError),
    #[error(transparent)]
    Compiler(#[from] CompilerError),
    #[error(transparent)]
    Artifact(#[from] ArtifactError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Chain(#[from] ChainError),
    #[error(transparent)]
    Deploy(#[from] DeployError),
    #[error(transparent)]
    Invoke(#[from] InvokeError),
    #[error(transparent)]
    Arguments(#[from] ArgError),
    #[error("No cached address for {0}; run `deploy` first")]
    NotDeployed(String),
    #[error("Failed to start async runtime: {0}")]
    Runtime(#[from] std::io::Error),
    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl Error {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Config(_) | Error::Key(_) | Error::Arguments(_) | Error::NotDeployed(_) => {
                ErrorKind::Configuration
            }
            Error::Compiler(e) if e.is_selection_error() => ErrorKind::Configuration,
            Error::Compiler(_) | Error::Artifact(_) => ErrorKind::ExternalProcess,
            Error::Storage(_) | Error::Runtime(_) | Error::Task(_) => ErrorKind::Io,
            Error::Chain(e) => chain_kind(e),
            Error::Deploy(e) => match e {
                DeployError::InsufficientFunds { .. } | DeployError::NoCodeAtCachedAddress(_) => {
                    ErrorKind::Precondition
                }
                DeployError::Chain(e) => chain_kind(e),
                DeployError::Storage(_) => ErrorKind::Io,
                DeployError::Artifact(_) => ErrorKind::ExternalProcess,
                DeployError::Arguments(_) => ErrorKind::Configuration,
            },
            Error::Invoke(e) => match e {
                InvokeError::Arguments(_) => ErrorKind::Configuration,
                InvokeError::Chain(e) => chain_kind(e),
            },
        }
    }

    /// Whether the underlying RPC failure looked temporary
    pub fn is_transient(&self) -> bool {
        match self {
            Error::Chain(e)
            | Error::Deploy(DeployError::Chain(e))
            | Error::Invoke(InvokeError::Chain(e)) => e.is_transient(),
            _ => false,
        }
    }
}

fn chain_kind(err: &ChainError) -> ErrorKind {
    match err {
        ChainError::MissingChainId | ChainError::InvalidUrl { .. } => ErrorKind::Configuration,
        ChainError::ChainIdMismatch { .. } => ErrorKind::Precondition,
        ChainError::Rpc { .. } | ChainError::Reverted(_) | ChainError::ReceiptNotFound(_) => {
            ErrorKind::Rpc
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::U256;
    use std::path::PathBuf;

    #[test]
    fn test_kinds() {
        let missing: Error = ConfigError::Invalid(vec![]).into();
        assert_eq!(missing.kind(), ErrorKind::Configuration);

        let spawn: Error = CompilerError::Spawn {
            binary: PathBuf::from("solc"),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        }
        .into();
        assert_eq!(spawn.kind(), ErrorKind::ExternalProcess);

        let ambiguous: Error = CompilerError::AmbiguousContract(vec!["A".into(), "B".into()]).into();
        assert_eq!(ambiguous.kind(), ErrorKind::Configuration);

        let funds: Error = DeployError::InsufficientFunds {
            balance: U256::ZERO,
            required: U256::from(1),
        }
        .into();
        assert_eq!(funds.kind(), ErrorKind::Precondition);

        let io: Error = StorageError::ArtifactsMissing("Greeter".into()).into();
        assert_eq!(io.kind(), ErrorKind::Io);

        let no_chain: Error = InvokeError::Chain(ChainError::MissingChainId).into();
        assert_eq!(no_chain.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn test_transient_rpc_errors() {
        let rpc = ChainError::Rpc {
            operation: "eth_gasPrice",
            message: "connection refused".into(),
            transient: true,
        };
        let err: Error = DeployError::Chain(rpc).into();
        assert_eq!(err.kind(), ErrorKind::Rpc);
        assert!(err.is_transient());

        let err: Error = ChainError::MissingChainId.into();
        assert!(!err.is_transient());
    }
}
