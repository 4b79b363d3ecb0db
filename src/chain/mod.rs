//! Chain access
//!
//! The RPC collaborator the deployer talks to: balance, nonce and gas price
//! queries, transaction submission, receipts and read-only calls.

pub mod client;
pub mod rpc;
pub mod transact;

pub use client::{ChainClient, ChainError};
pub use rpc::RpcChainClient;
pub use transact::{
    check_chain_id, max_cost, require_chain_id, MinedReceipt, TransactOptions, DEFAULT_GAS_LIMIT,
};

#[cfg(test)]
pub use client::MockChainClient;
