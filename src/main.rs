//! Contract deployer CLI
//!
//! Compiles a Solidity contract, deploys it or reuses the cached deployment,
//! then calls it.

use clap::{Args, Parser, Subcommand};
use contract_deployer::cli::{self, DeployOptions, RunOptions};
use contract_deployer::config::{
    load_env_file, ConfigOverrides, DeployerConfig, ProjectConfig, DEFAULT_CONSTRUCTOR_ARG,
    DEFAULT_GETTER, DEFAULT_SETTER, DEFAULT_SETTER_ARG,
};
use contract_deployer::Error;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "deployer")]
#[command(author = "Darshan")]
#[command(version = "0.1.0")]
#[command(about = "Compile, deploy and call a Solidity contract", long_about = None)]
struct Cli {
    /// JSON-RPC endpoint (overrides RPC_URL)
    #[arg(long, global = true)]
    rpc_url: Option<String>,

    /// Chain id to sign transactions for (overrides CHAIN_ID)
    #[arg(long, global = true)]
    chain_id: Option<u64>,

    /// Directory holding compiled artifacts and the deployed address
    #[arg(long, global = true)]
    cache_dir: Option<PathBuf>,

    /// Solidity source file
    #[arg(long, global = true)]
    source: Option<PathBuf>,

    /// Contract to deploy when the source defines several
    #[arg(long, global = true)]
    contract: Option<String>,

    /// Path to the solc binary
    #[arg(long, global = true)]
    solc: Option<PathBuf>,

    /// Load environment variables from this file instead of ./.env
    #[arg(long, global = true)]
    env_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile, deploy if needed, call the setter and read back the getter (default)
    Run(RunArgs),

    /// Compile the contract and save its artifacts
    Compile,

    /// Compile and deploy, or reuse the cached deployment
    Deploy(DeployArgs),

    /// Send a state-changing call to the deployed contract
    Send {
        /// Method name
        method: String,

        /// Method arguments
        args: Vec<String>,

        /// Gas limit for the transaction
        #[arg(long)]
        gas_limit: Option<u64>,

        /// Return once the transaction is submitted
        #[arg(long)]
        no_wait: bool,
    },

    /// Call a view method of the deployed contract
    Call {
        /// Method name
        method: String,

        /// Method arguments
        args: Vec<String>,
    },

    /// Show cached artifacts and address
    Status,

    /// Delete the cached address so the next run redeploys
    Forget,

    /// Show signer balance, nonce and deployment cost
    Account {
        /// Gas limit to price a deployment at
        #[arg(long)]
        gas_limit: Option<u64>,
    },
}

#[derive(Args)]
struct DeployArgs {
    /// Gas limit for the deployment transaction
    #[arg(long)]
    gas_limit: Option<u64>,

    /// Estimate deployment gas instead of using the fixed limit
    #[arg(long)]
    estimate_gas: bool,

    /// Check that the cached address holds code before reusing it
    #[arg(long)]
    verify_cached: bool,

    /// Constructor argument (repeatable)
    #[arg(long = "arg", default_value = DEFAULT_CONSTRUCTOR_ARG)]
    args: Vec<String>,

    /// Deploy with no constructor arguments
    #[arg(long, conflicts_with = "args")]
    no_args: bool,
}

#[derive(Args)]
struct RunArgs {
    #[command(flatten)]
    deploy: DeployArgs,

    /// Mutating method to call after deployment
    #[arg(long, default_value = DEFAULT_SETTER)]
    setter: String,

    /// Argument for the setter (repeatable)
    #[arg(long = "setter-arg", default_value = DEFAULT_SETTER_ARG)]
    setter_args: Vec<String>,

    /// View method to read afterwards
    #[arg(long, default_value = DEFAULT_GETTER)]
    getter: String,

    /// Do not wait for the setter transaction to be mined
    #[arg(long)]
    no_wait: bool,
}

impl Default for RunArgs {
    fn default() -> Self {
        Self {
            deploy: DeployArgs {
                gas_limit: None,
                estimate_gas: false,
                verify_cached: false,
                args: vec![DEFAULT_CONSTRUCTOR_ARG.to_string()],
                no_args: false,
            },
            setter: DEFAULT_SETTER.to_string(),
            setter_args: vec![DEFAULT_SETTER_ARG.to_string()],
            getter: DEFAULT_GETTER.to_string(),
            no_wait: false,
        }
    }
}

impl DeployArgs {
    fn options(&self) -> DeployOptions {
        DeployOptions {
            estimate_gas: self.estimate_gas,
            verify_cached: self.verify_cached,
            constructor_args: if self.no_args {
                Vec::new()
            } else {
                self.args.clone()
            },
        }
    }
}

impl Commands {
    fn gas_limit(&self) -> Option<u64> {
        match self {
            Commands::Run(run) => run.deploy.gas_limit,
            Commands::Deploy(deploy) => deploy.gas_limit,
            Commands::Send { gas_limit, .. } | Commands::Account { gas_limit } => *gas_limit,
            _ => None,
        }
    }
}

fn main() {
    let cli = Cli::parse();

    // Load .env before the logger so RUST_LOG can come from it
    let env_file = load_env_file(cli.env_file.as_deref());

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    if let Ok(Some(path)) = &env_file {
        log::debug!("Loaded environment from {:?}", path);
    }

    let result = env_file.map_err(Error::from).and_then(|_| run(cli));
    if let Err(e) = result {
        log::error!("{} error: {}", e.kind(), e);
        eprintln!("❌ {}", e);
        if e.is_transient() {
            eprintln!("   The RPC failure looks temporary; running again may succeed");
        }
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Error> {
    let command = cli.command.unwrap_or_else(|| Commands::Run(RunArgs::default()));

    let overrides = ConfigOverrides {
        rpc_url: cli.rpc_url,
        chain_id: cli.chain_id,
        cache_dir: cli.cache_dir,
        source: cli.source,
        contract: cli.contract,
        solc: cli.solc,
        gas_limit: command.gas_limit(),
    };

    // Commands that only touch the local cache need no network settings
    match command {
        Commands::Compile => return cli::cmd_compile(&ProjectConfig::load(&overrides)?),
        Commands::Status => return cli::cmd_status(&ProjectConfig::load(&overrides)?),
        Commands::Forget => return cli::cmd_forget(&ProjectConfig::load(&overrides)?),
        _ => {}
    }

    let config = DeployerConfig::load(&overrides)?;
    let rt = tokio::runtime::Runtime::new()?;

    rt.block_on(async {
        match command {
            Commands::Run(args) => {
                let options = RunOptions {
                    deploy: args.deploy.options(),
                    setter: args.setter,
                    setter_args: args.setter_args,
                    getter: args.getter,
                    no_wait: args.no_wait,
                };
                cli::cmd_run(&config, &options).await
            }
            Commands::Deploy(args) => cli::cmd_deploy(&config, &args.options()).await,
            Commands::Send {
                method,
                args,
                no_wait,
                ..
            } => cli::cmd_send(&config, &method, &args, no_wait).await,
            Commands::Call { method, args } => cli::cmd_call(&config, &method, &args).await,
            Commands::Account { .. } => cli::cmd_account(&config).await,
            Commands::Compile | Commands::Status | Commands::Forget => Ok(()),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_run_defaults_match_workflow() {
        let cli = Cli::parse_from(["deployer", "run"]);
        let Some(Commands::Run(args)) = cli.command else {
            panic!("expected run");
        };
        let defaults = RunArgs::default();
        assert_eq!(args.deploy.args, defaults.deploy.args);
        assert_eq!(args.setter, defaults.setter);
        assert_eq!(args.setter_args, defaults.setter_args);
        assert_eq!(args.getter, defaults.getter);
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::parse_from([
            "deployer",
            "send",
            "setGreeting",
            "hi",
            "--chain-id",
            "296",
            "--gas-limit",
            "50000",
        ]);
        assert_eq!(cli.chain_id, Some(296));
        let command = cli.command.unwrap();
        assert_eq!(command.gas_limit(), Some(50_000));
        assert!(matches!(command, Commands::Send { ref args, .. } if args == &["hi"]));
    }

    #[test]
    fn test_repeated_constructor_args() {
        let cli = Cli::parse_from(["deployer", "deploy", "--arg", "a", "--arg", "b"]);
        let Some(Commands::Deploy(args)) = cli.command else {
            panic!("expected deploy");
        };
        assert_eq!(args.options().constructor_args, vec!["a", "b"]);

        let cli = Cli::parse_from(["deployer", "deploy", "--no-args"]);
        let Some(Commands::Deploy(args)) = cli.command else {
            panic!("expected deploy");
        };
        assert!(args.options().constructor_args.is_empty());
    }
}
