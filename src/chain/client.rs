//! Chain RPC collaborator interface
//!
//! Everything the deployer needs from a node, behind one trait so the
//! orchestration can run against a live endpoint or a test double.

use crate::chain::transact::MinedReceipt;
use alloy_primitives::{Address, Bytes, TxHash, U256};
use alloy_rpc_types_eth::TransactionRequest;
use async_trait::async_trait;
use thiserror::Error;

/// Errors from the chain collaborator
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChainError {
    #[error("Invalid RPC URL {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("{operation} failed: {message}")]
    Rpc {
        operation: &'static str,
        message: String,
        transient: bool,
    },
    #[error("Transaction {0} was mined but reverted")]
    Reverted(TxHash),
    #[error("Receipt for transaction {0} not found")]
    ReceiptNotFound(TxHash),
    #[error("No chain id configured; refusing to sign a transaction for an unknown network")]
    MissingChainId,
    #[error("Chain id mismatch: configured {configured}, endpoint reports {reported}")]
    ChainIdMismatch { configured: u64, reported: u64 },
}

impl ChainError {
    /// Whether retrying the same request could plausibly succeed
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ChainError::Rpc {
                transient: true,
                ..
            }
        )
    }
}

/// Operations the deployer performs against a node.
///
/// Implementations sign with a single account, returned by [`sender`].
///
/// [`sender`]: ChainClient::sender
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Account that signs submitted transactions
    fn sender(&self) -> Address;

    /// Chain id reported by the endpoint
    async fn chain_id(&self) -> Result<u64, ChainError>;

    /// Balance of `account` in wei
    async fn balance(&self, account: Address) -> Result<U256, ChainError>;

    /// Next nonce for `account`, counting pending transactions
    async fn pending_nonce(&self, account: Address) -> Result<u64, ChainError>;

    /// Suggested legacy gas price in wei
    async fn gas_price(&self) -> Result<u128, ChainError>;

    /// Gas estimate for `tx`
    async fn estimate_gas(&self, tx: TransactionRequest) -> Result<u64, ChainError>;

    /// Runtime code stored at `address`
    async fn code_at(&self, address: Address) -> Result<Bytes, ChainError>;

    /// Sign and submit `tx`, returning its hash without waiting for inclusion
    async fn send_transaction(&self, tx: TransactionRequest) -> Result<TxHash, ChainError>;

    /// Wait until `hash` is mined and return its receipt
    async fn wait_for_receipt(&self, hash: TxHash) -> Result<MinedReceipt, ChainError>;

    /// Execute `tx` as a read-only call against the latest block
    async fn call(&self, tx: TransactionRequest) -> Result<Bytes, ChainError>;
}
