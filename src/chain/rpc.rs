//! JSON-RPC chain client backed by an alloy provider
//!
//! The provider carries a local wallet, so `send_transaction` signs with the
//! configured key. Requests arrive fully populated (nonce, gas, price, chain
//! id), which leaves the provider's fillers nothing to guess.

use crate::chain::client::{ChainClient, ChainError};
use crate::chain::transact::MinedReceipt;
use crate::signer::SignerKey;
use alloy_network::{EthereumWallet, ReceiptResponse};
use alloy_primitives::{Address, Bytes, TxHash, U256};
use alloy_provider::{DynProvider, PendingTransactionConfig, Provider, ProviderBuilder};
use alloy_rpc_types_eth::TransactionRequest;
use alloy_transport::{RpcError, TransportError};
use async_trait::async_trait;

/// JSON-RPC error codes that signal rate limiting or overload
const TRANSIENT_RPC_CODES: &[i64] = &[-32005, 429];

/// Chain client for an HTTP JSON-RPC endpoint
pub struct RpcChainClient {
    provider: DynProvider,
    sender: Address,
}

impl std::fmt::Debug for RpcChainClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcChainClient")
            .field("sender", &self.sender)
            .field("provider", &"<dyn Provider>")
            .finish()
    }
}

impl RpcChainClient {
    /// Connect to `rpc_url`, signing with `key`.
    ///
    /// No request is made here; the first RPC call surfaces connectivity
    /// problems.
    pub fn connect(rpc_url: &str, key: &SignerKey) -> Result<Self, ChainError> {
        let url = rpc_url.parse().map_err(|e| ChainError::InvalidUrl {
            url: rpc_url.to_string(),
            reason: format!("{}", e),
        })?;

        let wallet = EthereumWallet::from(key.signer());
        let provider = ProviderBuilder::new()
            .wallet(wallet)
            .connect_http(url)
            .erased();

        log::debug!("Connected provider for {} as {}", rpc_url, key.address());

        Ok(Self {
            provider,
            sender: key.address(),
        })
    }
}

#[async_trait]
impl ChainClient for RpcChainClient {
    fn sender(&self) -> Address {
        self.sender
    }

    async fn chain_id(&self) -> Result<u64, ChainError> {
        self.provider
            .get_chain_id()
            .await
            .map_err(|e| rpc_error("eth_chainId", e))
    }

    async fn balance(&self, account: Address) -> Result<U256, ChainError> {
        let balance = self
            .provider
            .get_balance(account)
            .await
            .map_err(|e| rpc_error("eth_getBalance", e))?;
        log::debug!("Balance of {}: {} wei", account, balance);
        Ok(balance)
    }

    async fn pending_nonce(&self, account: Address) -> Result<u64, ChainError> {
        let nonce = self
            .provider
            .get_transaction_count(account)
            .pending()
            .await
            .map_err(|e| rpc_error("eth_getTransactionCount", e))?;
        log::debug!("Pending nonce of {}: {}", account, nonce);
        Ok(nonce)
    }

    async fn gas_price(&self) -> Result<u128, ChainError> {
        let price = self
            .provider
            .get_gas_price()
            .await
            .map_err(|e| rpc_error("eth_gasPrice", e))?;
        log::debug!("Suggested gas price: {} wei", price);
        Ok(price)
    }

    async fn estimate_gas(&self, tx: TransactionRequest) -> Result<u64, ChainError> {
        self.provider
            .estimate_gas(tx)
            .await
            .map_err(|e| rpc_error("eth_estimateGas", e))
    }

    async fn code_at(&self, address: Address) -> Result<Bytes, ChainError> {
        self.provider
            .get_code_at(address)
            .await
            .map_err(|e| rpc_error("eth_getCode", e))
    }

    async fn send_transaction(&self, tx: TransactionRequest) -> Result<TxHash, ChainError> {
        log::debug!(
            "Sending transaction: to={:?}, nonce={:?}, gas={:?}, gas_price={:?}, chain_id={:?}",
            tx.to,
            tx.nonce,
            tx.gas,
            tx.gas_price,
            tx.chain_id
        );

        let pending = self
            .provider
            .send_transaction(tx)
            .await
            .map_err(|e| rpc_error("eth_sendRawTransaction", e))?;

        Ok(*pending.tx_hash())
    }

    async fn wait_for_receipt(&self, hash: TxHash) -> Result<MinedReceipt, ChainError> {
        log::info!("Waiting for transaction {} to be mined", hash);

        let watcher = self
            .provider
            .watch_pending_transaction(PendingTransactionConfig::new(hash))
            .await
            .map_err(|e| ChainError::Rpc {
                operation: "watch transaction",
                message: e.to_string(),
                transient: true,
            })?;
        let confirmed = watcher.await.map_err(|e| ChainError::Rpc {
            operation: "confirm transaction",
            message: e.to_string(),
            transient: true,
        })?;

        let receipt = self
            .provider
            .get_transaction_receipt(confirmed)
            .await
            .map_err(|e| rpc_error("eth_getTransactionReceipt", e))?
            .ok_or(ChainError::ReceiptNotFound(confirmed))?;

        Ok(MinedReceipt {
            tx_hash: receipt.transaction_hash,
            success: ReceiptResponse::status(&receipt),
            contract_address: receipt.contract_address,
            gas_used: receipt.gas_used,
            block_number: receipt.block_number,
        })
    }

    async fn call(&self, tx: TransactionRequest) -> Result<Bytes, ChainError> {
        self.provider
            .call(tx)
            .await
            .map_err(|e| rpc_error("eth_call", e))
    }
}

/// Convert a transport error, classifying network-level failures and
/// rate limits as transient
fn rpc_error(operation: &'static str, err: TransportError) -> ChainError {
    let transient = match &err {
        RpcError::Transport(_) | RpcError::NullResp => true,
        RpcError::ErrorResp(payload) => TRANSIENT_RPC_CODES.contains(&payload.code),
        _ => false,
    };

    ChainError::Rpc {
        operation,
        message: err.to_string(),
        transient,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::dev_key;
    use alloy_transport::TransportErrorKind;

    #[test]
    fn test_connect_rejects_malformed_url() {
        let err = RpcChainClient::connect("not a url", &dev_key()).unwrap_err();
        assert!(matches!(err, ChainError::InvalidUrl { .. }));
    }

    #[test]
    fn test_connect_uses_key_address_as_sender() {
        let key = dev_key();
        let client = RpcChainClient::connect("http://127.0.0.1:8545", &key).unwrap();
        assert_eq!(client.sender(), key.address());
    }

    #[test]
    fn test_transport_failures_are_transient() {
        let err = rpc_error(
            "eth_chainId",
            RpcError::Transport(TransportErrorKind::BackendGone),
        );
        assert!(matches!(err, ChainError::Rpc { operation: "eth_chainId", .. }));
        assert!(err.is_transient());

        assert!(rpc_error("eth_call", RpcError::NullResp).is_transient());
        assert!(!rpc_error("eth_call", RpcError::UnsupportedFeature("eth_call")).is_transient());
    }
}
