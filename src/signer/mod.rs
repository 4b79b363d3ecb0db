//! Transaction signer key handling
//!
//! Parses the hex-encoded private key that authorizes deployments and
//! method calls, and exposes it as an alloy local signer.

pub mod keys;

pub use keys::{KeyError, SignerKey};
