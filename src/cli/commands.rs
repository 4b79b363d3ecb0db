//! CLI commands for the deployer
//!
//! Implements all command handlers for the CLI interface. Handlers print
//! progress for the user; failures are returned to `main`.

use crate::chain::{ChainClient, RpcChainClient};
use crate::compiler::{CompiledArtifact, Compiler};
use crate::config::{DeployerConfig, NetworkConfig, ProjectConfig};
use crate::deploy::{AccountSummary, DeployOutcome, DeployPolicy, Deployer};
use crate::error::Error;
use crate::invoke::{format_value, ContractInvoker};
use crate::storage::{ArtifactStore, CacheLock};
use alloy_dyn_abi::DynSolValue;
use alloy_primitives::utils::format_ether;
use std::sync::Arc;

/// Result type for CLI operations
pub type CliResult<T> = Result<T, Error>;

/// Options for the deploy step
#[derive(Debug, Clone, Default)]
pub struct DeployOptions {
    pub estimate_gas: bool,
    pub verify_cached: bool,
    pub constructor_args: Vec<String>,
}

/// Options for the full compile, deploy, write, read workflow
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub deploy: DeployOptions,
    pub setter: String,
    pub setter_args: Vec<String>,
    pub getter: String,
    pub no_wait: bool,
}

/// Compile, persist artifacts, resolve the deployment, then write and read
/// the contract
pub async fn cmd_run(config: &DeployerConfig, options: &RunOptions) -> CliResult<()> {
    let store = config.project.store();
    let client = connect(&config.network)?;

    let lock = store.lock().await?;
    let artifact = compile_and_save_async(&config.project, &store).await?;
    let outcome =
        deploy_with(config, client.clone(), &store, &lock, &artifact, &options.deploy).await?;
    drop(lock);

    let invoker = ContractInvoker::new(
        client,
        outcome.address(),
        artifact.abi()?,
        config.network.chain_id,
        config.network.gas_limit,
    );

    send_and_report(&invoker, &options.setter, &options.setter_args, options.no_wait).await?;
    let values = invoker.invoke_view(&options.getter, &[]).await?;
    print_values(&options.getter, &values);

    println!("\n✅ Done");
    Ok(())
}

/// Compile the contract and persist its artifacts
pub fn cmd_compile(project: &ProjectConfig) -> CliResult<()> {
    let store = project.store();
    let _lock = store.lock_blocking()?;
    let artifact = compile_and_save(project, &store)?;

    let abi = artifact.abi()?;
    println!("   📦 Bytecode: {} bytes", artifact.bytecode_bytes()?.len());
    if abi.constructor().is_some() {
        println!("   🏗️  constructor");
    }
    for function in abi.functions() {
        let mutability = format!("{:?}", function.state_mutability).to_lowercase();
        println!("   ├─ {} [{}]", function.signature(), mutability);
    }

    Ok(())
}

/// Compile, persist, and deploy or reuse, without invoking any method
pub async fn cmd_deploy(config: &DeployerConfig, options: &DeployOptions) -> CliResult<()> {
    let store = config.project.store();
    let client = connect(&config.network)?;

    let lock = store.lock().await?;
    let artifact = compile_and_save_async(&config.project, &store).await?;
    deploy_with(config, client, &store, &lock, &artifact, options).await?;

    Ok(())
}

/// Submit a state-changing call to the deployed contract
pub async fn cmd_send(
    config: &DeployerConfig,
    method: &str,
    args: &[String],
    no_wait: bool,
) -> CliResult<()> {
    let invoker = cached_invoker(config)?;
    send_and_report(&invoker, method, args, no_wait).await
}

/// Call a view method of the deployed contract
pub async fn cmd_call(config: &DeployerConfig, method: &str, args: &[String]) -> CliResult<()> {
    let invoker = cached_invoker(config)?;
    let values = invoker.invoke_view(method, args).await?;
    print_values(method, &values);
    Ok(())
}

/// Show what is in the cache
pub fn cmd_status(project: &ProjectConfig) -> CliResult<()> {
    let store = project.store();
    let status = store.status()?;

    println!("📁 Cache: {:?}", status.cache_dir);
    println!("   ├─ {}.bin: {}", store.contract(), present(status.bytecode));
    println!("   ├─ {}.abi: {}", store.contract(), present(status.abi));
    match status.address {
        Some(address) => println!("   └─ Address: {}", address),
        None => println!("   └─ Address: not deployed"),
    }

    Ok(())
}

/// Remove the cached address so the next run deploys again
pub fn cmd_forget(project: &ProjectConfig) -> CliResult<()> {
    let store = project.store();
    let lock = store.lock_blocking()?;

    let previous = store.cached_address()?;
    if store.clear_address(&lock)? {
        let previous = previous.map(|a| a.to_string()).unwrap_or_default();
        println!("🗑️  Forgot cached address {}", previous);
    } else {
        println!("ℹ️  No cached address in {:?}", store.cache_dir());
    }

    Ok(())
}

/// Show the signer's balance, nonce and deployment cost
pub async fn cmd_account(config: &DeployerConfig) -> CliResult<()> {
    let client = connect(&config.network)?;
    let deployer = Deployer::new(
        client,
        config.project.store(),
        policy_for(config, &DeployOptions::default()),
    );

    let summary = deployer.account_summary().await?;
    print_account(&summary);
    if !summary.can_afford() {
        println!("   ⚠️  Balance does not cover a deployment at this gas limit");
    }

    Ok(())
}

fn connect(network: &NetworkConfig) -> CliResult<Arc<dyn ChainClient>> {
    let client = RpcChainClient::connect(&network.rpc_url, &network.key)?;
    Ok(Arc::new(client))
}

fn policy_for(config: &DeployerConfig, options: &DeployOptions) -> DeployPolicy {
    DeployPolicy {
        gas_limit: config.network.gas_limit,
        estimate_gas: options.estimate_gas,
        verify_cached: options.verify_cached,
        chain_id: config.network.chain_id,
    }
}

fn compile_and_save(project: &ProjectConfig, store: &ArtifactStore) -> CliResult<CompiledArtifact> {
    println!("🔨 Compiling {:?}...", project.source);
    let artifact = Compiler::new(&project.solc)
        .compile(&project.source, Some(project.contract.as_str()))?;

    store.save_artifact(&artifact)?;
    println!("💾 Saved {} artifacts to {:?}", artifact.name, store.cache_dir());

    Ok(artifact)
}

/// [`compile_and_save`] on the blocking thread pool
async fn compile_and_save_async(
    project: &ProjectConfig,
    store: &ArtifactStore,
) -> CliResult<CompiledArtifact> {
    let project = project.clone();
    let store = store.clone();
    tokio::task::spawn_blocking(move || compile_and_save(&project, &store)).await?
}

async fn deploy_with(
    config: &DeployerConfig,
    client: Arc<dyn ChainClient>,
    store: &ArtifactStore,
    lock: &CacheLock,
    artifact: &CompiledArtifact,
    options: &DeployOptions,
) -> CliResult<DeployOutcome> {
    let deployer = Deployer::new(client, store.clone(), policy_for(config, options));

    let summary = deployer.account_summary().await?;
    print_account(&summary);

    let outcome = deployer
        .resolve(lock, artifact.clone(), options.constructor_args.clone())
        .await?;

    match &outcome {
        DeployOutcome::Reused(address) => {
            println!("\n♻️  Contract already deployed at {}", address);
        }
        DeployOutcome::Deployed {
            address,
            tx_hash,
            gas_used,
            block_number,
        } => {
            println!("\n🚀 Contract deployed!");
            println!("   ├─ Address: {}", address);
            println!("   ├─ Transaction: {}", tx_hash);
            if let Some(block) = block_number {
                println!("   ├─ Block: {}", block);
            }
            println!("   └─ Gas used: {}", gas_used);
        }
    }

    Ok(outcome)
}

fn cached_invoker(config: &DeployerConfig) -> CliResult<ContractInvoker> {
    let store = config.project.store();
    let artifact = store.load_artifact()?;
    let address = store
        .cached_address()?
        .ok_or_else(|| Error::NotDeployed(config.project.contract.clone()))?;

    Ok(ContractInvoker::new(
        connect(&config.network)?,
        address,
        artifact.abi()?,
        config.network.chain_id,
        config.network.gas_limit,
    ))
}

async fn send_and_report(
    invoker: &ContractInvoker,
    method: &str,
    args: &[String],
    no_wait: bool,
) -> CliResult<()> {
    println!("\n📝 Calling {}({}) on {}", method, args.join(", "), invoker.address());
    let handle = invoker.invoke_mutating(method, args).await?;
    println!("   ├─ Transaction: {}", handle.hash);

    if no_wait {
        println!("   └─ Not waiting for confirmation");
        return Ok(());
    }

    let receipt = invoker.wait(&handle).await?;
    match receipt.block_number {
        Some(block) => println!("   └─ ⛏️  Mined in block {} ({} gas)", block, receipt.gas_used),
        None => println!("   └─ ⛏️  Mined ({} gas)", receipt.gas_used),
    }

    Ok(())
}

fn print_account(summary: &AccountSummary) {
    println!("\n👤 Account: {}", summary.address);
    println!("   ├─ Balance: {} ETH", format_ether(summary.balance));
    println!("   ├─ Nonce: {}", summary.nonce);
    println!("   ├─ Gas price: {} wei", summary.gas_price);
    println!("   ├─ Gas limit: {}", summary.gas_limit);
    println!("   └─ Max cost: {} ETH", format_ether(summary.max_cost()));
}

fn print_values(method: &str, values: &[DynSolValue]) {
    println!("\n📖 {}() returned:", method);
    for (i, value) in values.iter().enumerate() {
        let branch = if i + 1 == values.len() { "└─" } else { "├─" };
        println!("   {} {}", branch, format_value(value));
    }
    if values.is_empty() {
        println!("   └─ (nothing)");
    }
}

fn present(exists: bool) -> &'static str {
    if exists {
        "present"
    } else {
        "missing"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::path::PathBuf;

    #[tokio::test]
    async fn test_compile_failure_off_runtime_leaves_cache_untouched() {
        let temp_dir = tempfile::tempdir().unwrap();
        let project = ProjectConfig {
            source: PathBuf::from("contracts/Greeter.sol"),
            contract: "Greeter".into(),
            cache_dir: temp_dir.path().join("cache"),
            solc: PathBuf::from("/nonexistent/solc-binary"),
        };
        let store = project.store();

        let err = compile_and_save_async(&project, &store).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ExternalProcess);
        assert!(!store.cache_dir().exists());
    }
}
