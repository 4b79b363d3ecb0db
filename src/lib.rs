//! Contract deployer: compile, deploy once, call
//!
//! This crate drives a small deployment workflow against an EVM chain:
//! - Compile a Solidity source with an external `solc`
//! - Cache bytecode, ABI and the deployed address on disk
//! - Deploy only when no address is cached, after checking the signer can pay
//! - Call a mutating method and read a view method through the ABI
//!
//! # Example
//!
//! ```no_run
//! use contract_deployer::compiler::Compiler;
//! use contract_deployer::storage::ArtifactStore;
//! use std::path::Path;
//!
//! let artifact = Compiler::default()
//!     .compile(Path::new("contracts/Greeter.sol"), Some("Greeter"))
//!     .unwrap();
//!
//! let store = ArtifactStore::new("cache", "Greeter");
//! store.save_artifact(&artifact).unwrap();
//! println!("Cached address: {:?}", store.cached_address().unwrap());
//! ```

pub mod chain;
pub mod cli;
pub mod compiler;
pub mod config;
pub mod deploy;
pub mod error;
pub mod invoke;
pub mod signer;
pub mod storage;

#[cfg(test)]
pub(crate) mod testing;

// Re-export commonly used types
pub use chain::{ChainClient, ChainError, RpcChainClient};
pub use compiler::{CompiledArtifact, Compiler};
pub use config::{ConfigError, DeployerConfig};
pub use deploy::{DeployOutcome, Deployer, DeploymentDecision};
pub use error::{Error, ErrorKind};
pub use invoke::{ContractInvoker, TransactionHandle};
pub use signer::SignerKey;
pub use storage::{ArtifactStore, CacheLock};
