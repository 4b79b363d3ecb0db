//! Contract compilation
//!
//! Wraps the external Solidity compiler and the artifacts it produces:
//! - Running `solc` with combined-JSON output
//! - Selecting one named contract from the output
//! - Decoding bytecode and ABI

pub mod artifact;
pub mod solc;

pub use artifact::{ArtifactError, CompiledArtifact};
pub use solc::{contract_name, parse_combined_json, Compiler, CompilerError, DEFAULT_SOLC};
