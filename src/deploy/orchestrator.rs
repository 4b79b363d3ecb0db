//! Deploy-or-reuse orchestration
//!
//! The cached address file is the only deployment state. If it exists the
//! contract is taken as deployed; otherwise a creation transaction is sent
//! and the mined address is recorded.

use crate::chain::{
    check_chain_id, ChainClient, ChainError, TransactOptions, DEFAULT_GAS_LIMIT,
};
use crate::compiler::{ArtifactError, CompiledArtifact};
use crate::invoke::args::{encode_constructor, ArgError};
use crate::storage::{ArtifactStore, CacheLock, StorageError};
use alloy_primitives::{Address, Bytes, TxHash, TxKind, U256};
use std::sync::Arc;
use thiserror::Error;

/// Deployment errors
#[derive(Error, Debug)]
pub enum DeployError {
    #[error("Insufficient funds: balance {balance} wei, deployment may cost up to {required} wei")]
    InsufficientFunds { balance: U256, required: U256 },
    #[error("No contract code at cached address {0}; run `forget` to redeploy")]
    NoCodeAtCachedAddress(Address),
    #[error(transparent)]
    Chain(#[from] ChainError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Artifact(#[from] ArtifactError),
    #[error(transparent)]
    Arguments(#[from] ArgError),
}

/// Knobs for the deploy path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployPolicy {
    /// Gas limit for the creation transaction
    pub gas_limit: u64,
    /// Replace `gas_limit` with `eth_estimateGas`
    pub estimate_gas: bool,
    /// Check that a cached address has code before reusing it
    pub verify_cached: bool,
    /// Chain id to sign for; required to deploy
    pub chain_id: Option<u64>,
}

impl Default for DeployPolicy {
    fn default() -> Self {
        Self {
            gas_limit: DEFAULT_GAS_LIMIT,
            estimate_gas: false,
            verify_cached: false,
            chain_id: None,
        }
    }
}

/// What to do about the contract this run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeploymentDecision {
    Reuse(Address),
    Deploy {
        artifact: CompiledArtifact,
        constructor_args: Vec<String>,
    },
}

/// Result of resolving the contract address
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeployOutcome {
    Reused(Address),
    Deployed {
        address: Address,
        tx_hash: TxHash,
        gas_used: u64,
        block_number: Option<u64>,
    },
}

impl DeployOutcome {
    /// The resolved contract address
    pub fn address(&self) -> Address {
        match self {
            DeployOutcome::Reused(address) => *address,
            DeployOutcome::Deployed { address, .. } => *address,
        }
    }

    pub fn is_reused(&self) -> bool {
        matches!(self, DeployOutcome::Reused(_))
    }
}

/// Signer account state relevant to deploying
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountSummary {
    pub address: Address,
    pub balance: U256,
    pub nonce: u64,
    pub gas_price: u128,
    pub gas_limit: u64,
}

impl AccountSummary {
    /// `gas_limit * gas_price`
    pub fn max_cost(&self) -> U256 {
        crate::chain::max_cost(self.gas_limit, self.gas_price)
    }

    pub fn can_afford(&self) -> bool {
        self.balance >= self.max_cost()
    }
}

/// Decides between reusing and deploying, and performs the deployment
pub struct Deployer {
    client: Arc<dyn ChainClient>,
    store: ArtifactStore,
    policy: DeployPolicy,
}

impl Deployer {
    pub fn new(client: Arc<dyn ChainClient>, store: ArtifactStore, policy: DeployPolicy) -> Self {
        Self {
            client,
            store,
            policy,
        }
    }

    /// Decide from the cache alone. Makes no chain calls.
    pub fn decide(
        &self,
        _lock: &CacheLock,
        artifact: CompiledArtifact,
        constructor_args: Vec<String>,
    ) -> Result<DeploymentDecision, DeployError> {
        match self.store.cached_address()? {
            Some(address) => Ok(DeploymentDecision::Reuse(address)),
            None => Ok(DeploymentDecision::Deploy {
                artifact,
                constructor_args,
            }),
        }
    }

    /// Return the cached address, or deploy `artifact` and cache the new one.
    ///
    /// The caller holds `lock` across the whole call so concurrent runs
    /// cannot both find the cache empty.
    pub async fn resolve(
        &self,
        lock: &CacheLock,
        artifact: CompiledArtifact,
        constructor_args: Vec<String>,
    ) -> Result<DeployOutcome, DeployError> {
        match self.decide(lock, artifact, constructor_args)? {
            DeploymentDecision::Reuse(address) => {
                if self.policy.verify_cached {
                    self.verify_code(address).await?;
                }
                log::info!("Reusing deployed contract at {}", address);
                Ok(DeployOutcome::Reused(address))
            }
            DeploymentDecision::Deploy {
                artifact,
                constructor_args,
            } => self.deploy(lock, &artifact, &constructor_args).await,
        }
    }

    /// Query balance, pending nonce and gas price for the signer
    pub async fn account_summary(&self) -> Result<AccountSummary, ChainError> {
        let address = self.client.sender();
        let balance = self.client.balance(address).await?;
        let nonce = self.client.pending_nonce(address).await?;
        let gas_price = self.client.gas_price().await?;

        Ok(AccountSummary {
            address,
            balance,
            nonce,
            gas_price,
            gas_limit: self.policy.gas_limit,
        })
    }

    async fn verify_code(&self, address: Address) -> Result<(), DeployError> {
        let code = self.client.code_at(address).await?;
        if code.is_empty() {
            return Err(DeployError::NoCodeAtCachedAddress(address));
        }
        log::debug!("Cached address {} holds {} bytes of code", address, code.len());
        Ok(())
    }

    async fn deploy(
        &self,
        lock: &CacheLock,
        artifact: &CompiledArtifact,
        constructor_args: &[String],
    ) -> Result<DeployOutcome, DeployError> {
        log::info!("No cached address, deploying {}", artifact.name);

        // Local failures first, before any RPC
        let mut input = artifact.bytecode_bytes()?;
        input.extend(encode_constructor(&artifact.abi()?, constructor_args)?);
        let input = Bytes::from(input);

        let chain_id = check_chain_id(self.client.as_ref(), self.policy.chain_id).await?;
        let account = self.account_summary().await?;

        let mut opts = TransactOptions::new(
            account.address,
            chain_id,
            account.nonce,
            self.policy.gas_limit,
            account.gas_price,
        );
        if self.policy.estimate_gas {
            let estimate = self
                .client
                .estimate_gas(opts.request(TxKind::Create, input.clone()))
                .await?;
            log::info!("Estimated deployment gas: {}", estimate);
            opts.gas_limit = estimate;
        }

        let required = opts.max_cost();
        if account.balance < required {
            return Err(DeployError::InsufficientFunds {
                balance: account.balance,
                required,
            });
        }

        let expected = account.address.create(account.nonce);
        let tx_hash = self
            .client
            .send_transaction(opts.request(TxKind::Create, input))
            .await?;
        log::info!("Deployment transaction sent: {}", tx_hash);

        let receipt = self.client.wait_for_receipt(tx_hash).await?;
        if !receipt.success {
            return Err(ChainError::Reverted(tx_hash).into());
        }

        let address = receipt.contract_address.unwrap_or(expected);
        if address != expected {
            log::warn!(
                "Receipt reports contract at {}, expected {} from sender nonce",
                address,
                expected
            );
        }

        self.store.save_address(lock, &address)?;
        log::info!("Contract deployed at {}", address);

        Ok(DeployOutcome::Deployed {
            address,
            tx_hash,
            gas_used: receipt.gas_used,
            block_number: receipt.block_number,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::{MinedReceipt, MockChainClient};
    use crate::testing::{dev_key, greeter_artifact, GREETER_ABI, GREETER_BIN};
    use std::fs;
    use std::path::Path;

    const FIRST_CREATE_ADDRESS: &str = "0x5FbDB2315678afecb367f032d93F642f64180aa3";
    const CHAIN_ID: u64 = 31337;

    fn store_in(dir: &Path) -> ArtifactStore {
        ArtifactStore::new(dir.join("cache"), "Greeter")
    }

    fn policy() -> DeployPolicy {
        DeployPolicy {
            chain_id: Some(CHAIN_ID),
            ..DeployPolicy::default()
        }
    }

    fn greeting_args() -> Vec<String> {
        vec!["Hello, World!".to_string()]
    }

    /// A client for an account with `balance` wei at nonce 0 and 1 gwei gas
    fn funded_client(balance: U256) -> MockChainClient {
        let sender = dev_key().address();
        let mut client = MockChainClient::new();
        client.expect_sender().returning(move || sender);
        client.expect_chain_id().returning(|| Ok(CHAIN_ID));
        client.expect_balance().returning(move |_| Ok(balance));
        client.expect_pending_nonce().returning(|_| Ok(0));
        client.expect_gas_price().returning(|| Ok(1_000_000_000));
        client
    }

    fn mined(contract_address: Option<Address>) -> MinedReceipt {
        MinedReceipt {
            tx_hash: TxHash::repeat_byte(0x01),
            success: true,
            contract_address,
            gas_used: 250_000,
            block_number: Some(1),
        }
    }

    #[tokio::test]
    async fn test_reuse_is_idempotent() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = store_in(temp_dir.path());
        let lock = store.try_lock().unwrap();
        let cached: Address = FIRST_CREATE_ADDRESS.parse().unwrap();
        store.save_address(&lock, &cached).unwrap();

        let mut client = MockChainClient::new();
        client.expect_send_transaction().never();

        let deployer = Deployer::new(Arc::new(client), store, policy());
        let first = deployer
            .resolve(&lock, greeter_artifact(), greeting_args())
            .await
            .unwrap();
        let second = deployer
            .resolve(&lock, greeter_artifact(), greeting_args())
            .await
            .unwrap();

        assert_eq!(first, DeployOutcome::Reused(cached));
        assert_eq!(second, first);
    }

    #[tokio::test]
    async fn test_cached_address_trusted_without_chain_calls() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = store_in(temp_dir.path());
        let lock = store.try_lock().unwrap();
        let never_deployed: Address = "0xABCDEF0000000000000000000000000000000000".parse().unwrap();
        store.save_address(&lock, &never_deployed).unwrap();

        // No expectations: any call on the mock panics
        let client = MockChainClient::new();
        let deployer = Deployer::new(Arc::new(client), store, policy());

        let outcome = deployer
            .resolve(&lock, greeter_artifact(), greeting_args())
            .await
            .unwrap();
        assert_eq!(outcome.address(), never_deployed);
        assert!(outcome.is_reused());
    }

    #[tokio::test]
    async fn test_cold_start_writes_exactly_three_files() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = store_in(temp_dir.path());
        assert!(!store.cache_dir().exists());

        let deployed: Address = FIRST_CREATE_ADDRESS.parse().unwrap();
        let mut client = funded_client(U256::from(10u64).pow(U256::from(18)));
        client
            .expect_send_transaction()
            .times(1)
            .withf(|tx| {
                tx.to == Some(TxKind::Create)
                    && tx.nonce == Some(0)
                    && tx.chain_id == Some(CHAIN_ID)
                    && tx.gas == Some(DEFAULT_GAS_LIMIT)
            })
            .returning(|_| Ok(TxHash::repeat_byte(0x01)));
        client
            .expect_wait_for_receipt()
            .times(1)
            .returning(move |_| Ok(mined(Some(deployed))));

        store
            .save_artifacts(GREETER_BIN, GREETER_ABI.as_bytes())
            .unwrap();
        let lock = store.lock().await.unwrap();
        let deployer = Deployer::new(Arc::new(client), store.clone(), policy());
        let outcome = deployer
            .resolve(&lock, greeter_artifact(), greeting_args())
            .await
            .unwrap();

        assert_eq!(outcome.address(), deployed);
        assert!(matches!(outcome, DeployOutcome::Deployed { gas_used: 250_000, .. }));

        let mut names: Vec<String> = fs::read_dir(store.cache_dir())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        assert_eq!(names, vec!["Greeter.abi", "Greeter.bin", "address"]);

        let raw = fs::read_to_string(store.address_path()).unwrap();
        assert_eq!(raw.parse::<Address>().unwrap(), deployed);
    }

    #[tokio::test]
    async fn test_deploy_input_is_bytecode_then_constructor_args() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = store_in(temp_dir.path());
        let lock = store.try_lock().unwrap();

        let mut client = funded_client(U256::MAX);
        client
            .expect_send_transaction()
            .times(1)
            .withf(|tx| {
                let input = tx.input.input().unwrap();
                let bytecode = hex::decode(GREETER_BIN).unwrap();
                input.len() == bytecode.len() + 96 && input.starts_with(&bytecode)
            })
            .returning(|_| Ok(TxHash::repeat_byte(0x01)));
        // No contractAddress in the receipt: fall back to the CREATE address
        client
            .expect_wait_for_receipt()
            .returning(|_| Ok(mined(None)));

        let deployer = Deployer::new(Arc::new(client), store, policy());
        let outcome = deployer
            .resolve(&lock, greeter_artifact(), greeting_args())
            .await
            .unwrap();
        assert_eq!(outcome.address(), FIRST_CREATE_ADDRESS.parse::<Address>().unwrap());
    }

    #[tokio::test]
    async fn test_insufficient_funds_refuses_to_submit() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = store_in(temp_dir.path());
        let lock = store.try_lock().unwrap();

        // One wei short of 3_000_000 gas at 1 gwei
        let required = U256::from(3_000_000_000_000_000u64);
        let mut client = funded_client(required - U256::from(1));
        client.expect_send_transaction().never();
        client.expect_wait_for_receipt().never();

        let deployer = Deployer::new(Arc::new(client), store.clone(), policy());
        let err = deployer
            .resolve(&lock, greeter_artifact(), greeting_args())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            DeployError::InsufficientFunds { required: r, .. } if r == required
        ));
        assert!(!store.address_path().exists());
    }

    #[tokio::test]
    async fn test_estimated_gas_drives_precondition() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = store_in(temp_dir.path());
        let lock = store.try_lock().unwrap();

        // Enough for 200k gas but not for the 3M default
        let mut client = funded_client(U256::from(200_000_000_000_000u64));
        client
            .expect_estimate_gas()
            .times(1)
            .withf(|tx| tx.to == Some(TxKind::Create))
            .returning(|_| Ok(200_000));
        client
            .expect_send_transaction()
            .times(1)
            .withf(|tx| tx.gas == Some(200_000))
            .returning(|_| Ok(TxHash::repeat_byte(0x01)));
        client
            .expect_wait_for_receipt()
            .returning(|_| Ok(mined(None)));

        let policy = DeployPolicy {
            estimate_gas: true,
            ..policy()
        };
        let deployer = Deployer::new(Arc::new(client), store, policy);
        deployer
            .resolve(&lock, greeter_artifact(), greeting_args())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_reverted_deployment_caches_nothing() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = store_in(temp_dir.path());
        let lock = store.try_lock().unwrap();

        let mut client = funded_client(U256::MAX);
        client
            .expect_send_transaction()
            .returning(|_| Ok(TxHash::repeat_byte(0x02)));
        client.expect_wait_for_receipt().returning(|_| {
            Ok(MinedReceipt {
                success: false,
                ..mined(None)
            })
        });

        let deployer = Deployer::new(Arc::new(client), store.clone(), policy());
        let err = deployer
            .resolve(&lock, greeter_artifact(), greeting_args())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            DeployError::Chain(ChainError::Reverted(hash)) if hash == TxHash::repeat_byte(0x02)
        ));
        assert!(!store.address_path().exists());
    }

    #[tokio::test]
    async fn test_deploy_requires_chain_id() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = store_in(temp_dir.path());
        let lock = store.try_lock().unwrap();

        let mut client = MockChainClient::new();
        client.expect_chain_id().never();
        client.expect_send_transaction().never();

        let deployer = Deployer::new(Arc::new(client), store, DeployPolicy::default());
        let err = deployer
            .resolve(&lock, greeter_artifact(), greeting_args())
            .await
            .unwrap_err();
        assert!(matches!(err, DeployError::Chain(ChainError::MissingChainId)));
    }

    #[tokio::test]
    async fn test_bad_constructor_args_fail_before_rpc() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = store_in(temp_dir.path());
        let lock = store.try_lock().unwrap();

        let client = MockChainClient::new();
        let deployer = Deployer::new(Arc::new(client), store, policy());
        let err = deployer
            .resolve(&lock, greeter_artifact(), vec![])
            .await
            .unwrap_err();
        assert!(matches!(err, DeployError::Arguments(ArgError::ArityMismatch { .. })));
    }

    #[tokio::test]
    async fn test_verify_cached_rejects_empty_code() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = store_in(temp_dir.path());
        let lock = store.try_lock().unwrap();
        let cached = Address::repeat_byte(0xab);
        store.save_address(&lock, &cached).unwrap();

        let mut client = MockChainClient::new();
        client
            .expect_code_at()
            .times(1)
            .returning(|_| Ok(Bytes::new()));
        client.expect_send_transaction().never();

        let policy = DeployPolicy {
            verify_cached: true,
            ..policy()
        };
        let deployer = Deployer::new(Arc::new(client), store, policy);
        let err = deployer
            .resolve(&lock, greeter_artifact(), greeting_args())
            .await
            .unwrap_err();
        assert!(matches!(err, DeployError::NoCodeAtCachedAddress(a) if a == cached));
    }

    #[test]
    fn test_decide_reads_cache_only() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = store_in(temp_dir.path());
        let lock = store.try_lock().unwrap();
        let deployer = Deployer::new(Arc::new(MockChainClient::new()), store.clone(), policy());

        let decision = deployer
            .decide(&lock, greeter_artifact(), greeting_args())
            .unwrap();
        assert!(matches!(decision, DeploymentDecision::Deploy { .. }));

        store.save_address(&lock, &Address::repeat_byte(0x33)).unwrap();
        let decision = deployer
            .decide(&lock, greeter_artifact(), greeting_args())
            .unwrap();
        assert_eq!(decision, DeploymentDecision::Reuse(Address::repeat_byte(0x33)));
    }

    #[tokio::test]
    async fn test_account_summary() {
        let client = funded_client(U256::from(5u64));
        let deployer = Deployer::new(
            Arc::new(client),
            ArtifactStore::new("unused", "Greeter"),
            policy(),
        );

        let summary = deployer.account_summary().await.unwrap();
        assert_eq!(summary.address, dev_key().address());
        assert_eq!(summary.nonce, 0);
        assert_eq!(summary.max_cost(), U256::from(3_000_000_000_000_000u64));
        assert!(!summary.can_afford());
    }
}
