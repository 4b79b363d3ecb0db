//! Method calls against a deployed contract

use crate::chain::{check_chain_id, ChainClient, ChainError, MinedReceipt, TransactOptions};
use crate::invoke::args::{decode_output, encode_call, resolve_function, ArgError};
use alloy_dyn_abi::DynSolValue;
use alloy_json_abi::JsonAbi;
use alloy_primitives::{Address, Bytes, TxHash, TxKind};
use alloy_rpc_types_eth::{TransactionInput, TransactionRequest};
use std::sync::Arc;
use thiserror::Error;

/// Invocation errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvokeError {
    #[error(transparent)]
    Arguments(#[from] ArgError),
    #[error(transparent)]
    Chain(#[from] ChainError),
}

/// A submitted state-changing call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionHandle {
    pub hash: TxHash,
    pub method: String,
}

/// Calls methods of one contract through its ABI
pub struct ContractInvoker {
    client: Arc<dyn ChainClient>,
    address: Address,
    abi: JsonAbi,
    chain_id: Option<u64>,
    gas_limit: u64,
}

impl ContractInvoker {
    /// Create an invoker for the contract at `address`.
    ///
    /// `chain_id` is checked on every mutating call, not here, so read-only
    /// use works without one.
    pub fn new(
        client: Arc<dyn ChainClient>,
        address: Address,
        abi: JsonAbi,
        chain_id: Option<u64>,
        gas_limit: u64,
    ) -> Self {
        Self {
            client,
            address,
            abi,
            chain_id,
            gas_limit,
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// Sign and submit a call to `method` with fresh transaction options.
    ///
    /// Returns once the transaction is accepted by the node; use [`wait`] to
    /// wait for it to be mined.
    ///
    /// [`wait`]: ContractInvoker::wait
    pub async fn invoke_mutating(
        &self,
        method: &str,
        args: &[String],
    ) -> Result<TransactionHandle, InvokeError> {
        let function = resolve_function(&self.abi, method, args.len())?;
        let data = encode_call(function, args)?;

        let chain_id = check_chain_id(self.client.as_ref(), self.chain_id).await?;
        let from = self.client.sender();
        let nonce = self.client.pending_nonce(from).await?;
        let gas_price = self.client.gas_price().await?;

        let opts = TransactOptions::new(from, chain_id, nonce, self.gas_limit, gas_price);
        let hash = self
            .client
            .send_transaction(opts.request(TxKind::Call(self.address), Bytes::from(data)))
            .await?;
        log::info!("Sent {} transaction: {}", function.signature(), hash);

        Ok(TransactionHandle {
            hash,
            method: method.to_string(),
        })
    }

    /// Wait for a submitted call to be mined. A reverted call is an error.
    pub async fn wait(&self, handle: &TransactionHandle) -> Result<MinedReceipt, InvokeError> {
        let receipt = self.client.wait_for_receipt(handle.hash).await?;
        if !receipt.success {
            return Err(ChainError::Reverted(handle.hash).into());
        }
        log::info!(
            "{} mined in block {:?} using {} gas",
            handle.method,
            receipt.block_number,
            receipt.gas_used
        );
        Ok(receipt)
    }

    /// Call `method` read-only and decode its return values
    pub async fn invoke_view(
        &self,
        method: &str,
        args: &[String],
    ) -> Result<Vec<DynSolValue>, InvokeError> {
        let function = resolve_function(&self.abi, method, args.len())?;
        let data = encode_call(function, args)?;

        let tx = TransactionRequest {
            from: Some(self.client.sender()),
            to: Some(TxKind::Call(self.address)),
            input: TransactionInput::new(Bytes::from(data)),
            ..Default::default()
        };
        let output = self.client.call(tx).await?;
        log::debug!("{} returned {} bytes", method, output.len());

        Ok(decode_output(function, &output)?)
    }
}
