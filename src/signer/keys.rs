//! Private key parsing for the transaction signer
//!
//! Keys are 32-byte secp256k1 scalars written as 64 hex characters, with an
//! optional `0x` prefix that is stripped before decoding.

use alloy_primitives::{Address, B256};
use alloy_signer_local::PrivateKeySigner;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Length of a private key in hex characters (32 bytes)
const KEY_HEX_LEN: usize = 64;

/// Errors that can occur while parsing a private key
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KeyError {
    #[error("private key is empty")]
    Empty,
    #[error("private key must be 64 hex characters, got {0}")]
    InvalidLength(usize),
    #[error("private key is not valid hex: {0}")]
    InvalidHex(String),
    #[error("private key is not a valid secp256k1 scalar")]
    OutOfRange,
}

/// A validated signing key.
///
/// The secret never appears in `Debug` output; only the derived account
/// address is shown.
#[derive(Clone)]
pub struct SignerKey {
    signer: PrivateKeySigner,
}

impl SignerKey {
    /// Parse a hex-encoded private key, with or without a `0x` prefix
    pub fn from_hex(input: &str) -> Result<Self, KeyError> {
        let trimmed = input.trim();
        let hex_key = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);

        if hex_key.is_empty() {
            return Err(KeyError::Empty);
        }
        if hex_key.len() != KEY_HEX_LEN {
            return Err(KeyError::InvalidLength(hex_key.len()));
        }

        let bytes = hex::decode(hex_key).map_err(|e| KeyError::InvalidHex(e.to_string()))?;
        let secret = B256::from_slice(&bytes);
        let signer = PrivateKeySigner::from_bytes(&secret).map_err(|_| KeyError::OutOfRange)?;

        Ok(Self { signer })
    }

    /// The account address controlled by this key
    pub fn address(&self) -> Address {
        self.signer.address()
    }

    /// An alloy signer for this key
    pub fn signer(&self) -> PrivateKeySigner {
        self.signer.clone()
    }
}

impl FromStr for SignerKey {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl fmt::Debug for SignerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignerKey")
            .field("address", &self.address())
            .field("secret", &"<redacted>")
            .finish()
    }
}
