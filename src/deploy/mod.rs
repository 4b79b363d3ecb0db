//! Deployment orchestration
//!
//! # Overview
//!
//! Resolving a contract address is a two-state decision driven by the cache:
//!
//! - `cache/address` exists: the address is reused as-is. No chain call is
//!   made unless `verify_cached` is set.
//! - `cache/address` is absent: the signer's balance must cover
//!   `gas_limit * gas_price`, then a creation transaction is sent, its receipt
//!   awaited, and the new address written to the cache.
//!
//! A crash between submission and the address write leaves no cached
//! address, so the next run deploys again.
//!
//! # Example
//!
//! ```text
//! let lock = store.lock().await?;
//! let deployer = Deployer::new(client, store, policy);
//! let outcome = deployer.resolve(&lock, artifact, vec!["Hello, World!".into()]).await?;
//! println!("{}", outcome.address());
//! ```

pub mod orchestrator;

pub use orchestrator::{
    AccountSummary, DeployError, DeployOutcome, DeployPolicy, Deployer, DeploymentDecision,
};
