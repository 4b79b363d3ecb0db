//! Per-transaction options and receipts

use crate::chain::client::{ChainClient, ChainError};
use alloy_primitives::{Address, Bytes, TxHash, TxKind, U256};
use alloy_rpc_types_eth::{TransactionInput, TransactionRequest};

/// Gas limit used when none is configured
pub const DEFAULT_GAS_LIMIT: u64 = 3_000_000;

/// Require an explicitly configured chain id.
///
/// Signing with a defaulted chain id produces a valid transaction for the
/// wrong network, so an absent id is an error rather than a fallback.
pub fn require_chain_id(chain_id: Option<u64>) -> Result<u64, ChainError> {
    chain_id.ok_or(ChainError::MissingChainId)
}

/// Require a configured chain id and confirm the endpoint serves that chain
pub async fn check_chain_id(
    client: &dyn ChainClient,
    chain_id: Option<u64>,
) -> Result<u64, ChainError> {
    let configured = require_chain_id(chain_id)?;
    let reported = client.chain_id().await?;
    if reported != configured {
        return Err(ChainError::ChainIdMismatch {
            configured,
            reported,
        });
    }
    Ok(configured)
}

/// Options for one signed transaction.
///
/// Built fresh for every submission; the nonce must advance, so options are
/// never reused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactOptions {
    pub from: Address,
    pub chain_id: u64,
    pub nonce: u64,
    pub value: U256,
    pub gas_limit: u64,
    pub gas_price: u128,
}

impl TransactOptions {
    /// Options with zero value
    pub fn new(from: Address, chain_id: u64, nonce: u64, gas_limit: u64, gas_price: u128) -> Self {
        Self {
            from,
            chain_id,
            nonce,
            value: U256::ZERO,
            gas_limit,
            gas_price,
        }
    }

    /// Upper bound on the fee this transaction can cost: `gas_limit * gas_price`
    pub fn max_cost(&self) -> U256 {
        max_cost(self.gas_limit, self.gas_price)
    }

    /// Build a legacy-priced request to `to` carrying `input`
    pub fn request(&self, to: TxKind, input: Bytes) -> TransactionRequest {
        TransactionRequest {
            from: Some(self.from),
            to: Some(to),
            nonce: Some(self.nonce),
            value: Some(self.value),
            gas: Some(self.gas_limit),
            gas_price: Some(self.gas_price),
            chain_id: Some(self.chain_id),
            input: TransactionInput::new(input),
            ..Default::default()
        }
    }
}

/// `gas_limit * gas_price`, saturating
pub fn max_cost(gas_limit: u64, gas_price: u128) -> U256 {
    U256::from(gas_limit).saturating_mul(U256::from(gas_price))
}

/// The parts of a mined receipt the deployer acts on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MinedReceipt {
    pub tx_hash: TxHash,
    pub success: bool,
    pub contract_address: Option<Address>,
    pub gas_used: u64,
    pub block_number: Option<u64>,
}
