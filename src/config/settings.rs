//! Deployer configuration
//!
//! Settings come from three layers, highest priority first: command-line
//! flags, environment variables (optionally loaded from a `.env` file), and
//! built-in defaults. Everything is validated once, up front, and every
//! problem found is reported together.

use crate::chain::DEFAULT_GAS_LIMIT;
use crate::compiler::{contract_name, DEFAULT_SOLC};
use crate::signer::{KeyError, SignerKey};
use crate::storage::{ArtifactStore, DEFAULT_CACHE_DIR};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default contract source file
pub const DEFAULT_SOURCE: &str = "contracts/Greeter.sol";

/// Constructor argument used by the default workflow
pub const DEFAULT_CONSTRUCTOR_ARG: &str = "Hello, World!";

/// Method the default workflow writes through
pub const DEFAULT_SETTER: &str = "setGreeting";

/// Value the default workflow writes
pub const DEFAULT_SETTER_ARG: &str = "Hello, Ethereum!";

/// Method the default workflow reads back
pub const DEFAULT_GETTER: &str = "greet";

/// Environment variable names
pub mod env_vars {
    pub const RPC_URL: &str = "RPC_URL";
    /// Older name for `RPC_URL`
    pub const INFURA_URL: &str = "INFURA_URL";
    pub const PRIVATE_KEY: &str = "PRIVATE_KEY";
    pub const CHAIN_ID: &str = "CHAIN_ID";
    pub const CONTRACT_SOURCE: &str = "CONTRACT_SOURCE";
    pub const CONTRACT_NAME: &str = "CONTRACT_NAME";
    pub const CACHE_DIR: &str = "CACHE_DIR";
    pub const SOLC: &str = "SOLC";
}

/// A single configuration problem
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigIssue {
    /// A required value is absent
    Missing(&'static str),
    InvalidKey(KeyError),
    InvalidUrl { url: String, reason: &'static str },
    InvalidChainId(String),
    ZeroGasLimit,
    /// The contract name cannot be derived from the source path
    NoContractName(PathBuf),
}

impl fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigIssue::Missing(name) => write!(f, "{} is not set", name),
            ConfigIssue::InvalidKey(e) => write!(f, "{}: {}", env_vars::PRIVATE_KEY, e),
            ConfigIssue::InvalidUrl { url, reason } => {
                write!(f, "RPC URL {:?} {}", url, reason)
            }
            ConfigIssue::InvalidChainId(value) => {
                write!(f, "chain id {:?} is not a positive integer", value)
            }
            ConfigIssue::ZeroGasLimit => write!(f, "gas limit must be greater than zero"),
            ConfigIssue::NoContractName(path) => write!(
                f,
                "cannot derive a contract name from {:?}; set {}",
                path,
                env_vars::CONTRACT_NAME
            ),
        }
    }
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid configuration:{}", format_issues(.0))]
    Invalid(Vec<ConfigIssue>),
    #[error("Failed to load environment file {path:?}: {message}")]
    EnvFile { path: PathBuf, message: String },
}

fn format_issues(issues: &[ConfigIssue]) -> String {
    issues.iter().map(|issue| format!("\n  - {}", issue)).collect()
}

/// Values given on the command line, overriding the environment
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub rpc_url: Option<String>,
    pub chain_id: Option<u64>,
    pub cache_dir: Option<PathBuf>,
    pub source: Option<PathBuf>,
    pub contract: Option<String>,
    pub solc: Option<PathBuf>,
    pub gas_limit: Option<u64>,
}

/// Where the contract and its cache live. Needs no network access.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectConfig {
    pub source: PathBuf,
    /// Contract selector: a bare name or a full `path:Name` key
    pub contract: String,
    pub cache_dir: PathBuf,
    pub solc: PathBuf,
}

/// Endpoint and signing account
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    pub rpc_url: String,
    pub key: SignerKey,
    /// Absent unless configured; mutating commands refuse to sign without it
    pub chain_id: Option<u64>,
    pub gas_limit: u64,
}

/// Complete configuration for commands that talk to a chain
#[derive(Debug, Clone)]
pub struct DeployerConfig {
    pub project: ProjectConfig,
    pub network: NetworkConfig,
}

impl ProjectConfig {
    /// Bare contract name the cache files are named after
    pub fn artifact_name(&self) -> &str {
        contract_name(&self.contract)
    }

    /// Artifact store for this contract
    pub fn store(&self) -> ArtifactStore {
        ArtifactStore::new(&self.cache_dir, self.artifact_name())
    }

    /// Read project settings from the process environment
    pub fn load(overrides: &ConfigOverrides) -> Result<Self, ConfigError> {
        Self::load_from(process_env, overrides)
    }

    /// Read project settings through `env`
    pub fn load_from<F>(env: F, overrides: &ConfigOverrides) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut issues = Vec::new();
        let project = project_from(&env, overrides, &mut issues);
        finish(project, issues)
    }
}

impl DeployerConfig {
    /// Read all settings from the process environment
    pub fn load(overrides: &ConfigOverrides) -> Result<Self, ConfigError> {
        Self::load_from(process_env, overrides)
    }

    /// Read all settings through `env`, collecting every problem found
    pub fn load_from<F>(env: F, overrides: &ConfigOverrides) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut issues = Vec::new();
        let project = project_from(&env, overrides, &mut issues);
        let network = network_from(&env, overrides, &mut issues);

        match (project, network) {
            (Some(project), Some(network)) if issues.is_empty() => {
                log::debug!(
                    "Configuration: rpc={}, chain_id={:?}, source={:?}, cache={:?}",
                    network.rpc_url,
                    network.chain_id,
                    project.source,
                    project.cache_dir
                );
                Ok(Self { project, network })
            }
            _ => Err(ConfigError::Invalid(issues)),
        }
    }
}

/// Load a `.env` file into the process environment.
///
/// Without an explicit path, a missing `.env` in the working directory is
/// not an error. Variables already set in the environment win. Returns the
/// path of the file loaded, if any.
pub fn load_env_file(path: Option<&Path>) -> Result<Option<PathBuf>, ConfigError> {
    let result = match path {
        Some(path) => dotenvy::from_path(path).map(|()| path.to_path_buf()),
        None => dotenvy::dotenv(),
    };

    match result {
        Ok(loaded) => Ok(Some(loaded)),
        Err(e) if e.not_found() && path.is_none() => Ok(None),
        Err(e) => Err(ConfigError::EnvFile {
            path: path.map(Path::to_path_buf).unwrap_or_else(|| PathBuf::from(".env")),
            message: e.to_string(),
        }),
    }
}

fn process_env(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

fn finish<T>(value: Option<T>, issues: Vec<ConfigIssue>) -> Result<T, ConfigError> {
    match value {
        Some(value) if issues.is_empty() => Ok(value),
        _ => Err(ConfigError::Invalid(issues)),
    }
}

/// Look up `name`, treating blank values as unset
fn lookup<F>(env: &F, name: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    env(name)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn project_from<F>(
    env: &F,
    overrides: &ConfigOverrides,
    issues: &mut Vec<ConfigIssue>,
) -> Option<ProjectConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let source = overrides
        .source
        .clone()
        .or_else(|| lookup(env, env_vars::CONTRACT_SOURCE).map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_SOURCE));

    let contract = overrides
        .contract
        .clone()
        .or_else(|| lookup(env, env_vars::CONTRACT_NAME))
        .or_else(|| {
            source
                .file_stem()
                .and_then(|stem| stem.to_str())
                .filter(|stem| !stem.is_empty())
                .map(str::to_string)
        });

    let cache_dir = overrides
        .cache_dir
        .clone()
        .or_else(|| lookup(env, env_vars::CACHE_DIR).map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CACHE_DIR));

    let solc = overrides
        .solc
        .clone()
        .or_else(|| lookup(env, env_vars::SOLC).map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_SOLC));

    match contract {
        Some(contract) => Some(ProjectConfig {
            source,
            contract,
            cache_dir,
            solc,
        }),
        None => {
            issues.push(ConfigIssue::NoContractName(source));
            None
        }
    }
}

fn network_from<F>(
    env: &F,
    overrides: &ConfigOverrides,
    issues: &mut Vec<ConfigIssue>,
) -> Option<NetworkConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let rpc_url = overrides
        .rpc_url
        .clone()
        .or_else(|| lookup(env, env_vars::RPC_URL))
        .or_else(|| lookup(env, env_vars::INFURA_URL));
    let rpc_url = match rpc_url {
        Some(url) => match check_rpc_url(&url) {
            Ok(()) => Some(url),
            Err(reason) => {
                issues.push(ConfigIssue::InvalidUrl { url, reason });
                None
            }
        },
        None => {
            issues.push(ConfigIssue::Missing(env_vars::RPC_URL));
            None
        }
    };

    let key = match lookup(env, env_vars::PRIVATE_KEY) {
        Some(raw) => match SignerKey::from_hex(&raw) {
            Ok(key) => Some(key),
            Err(e) => {
                issues.push(ConfigIssue::InvalidKey(e));
                None
            }
        },
        None => {
            issues.push(ConfigIssue::Missing(env_vars::PRIVATE_KEY));
            None
        }
    };

    let chain_id = match overrides.chain_id {
        Some(0) => {
            issues.push(ConfigIssue::InvalidChainId("0".into()));
            None
        }
        Some(id) => Some(id),
        None => match lookup(env, env_vars::CHAIN_ID) {
            Some(raw) => match raw.parse::<u64>() {
                Ok(id) if id > 0 => Some(id),
                _ => {
                    issues.push(ConfigIssue::InvalidChainId(raw));
                    None
                }
            },
            None => None,
        },
    };

    let gas_limit = overrides.gas_limit.unwrap_or(DEFAULT_GAS_LIMIT);
    if gas_limit == 0 {
        issues.push(ConfigIssue::ZeroGasLimit);
    }

    Some(NetworkConfig {
        rpc_url: rpc_url?,
        key: key?,
        chain_id,
        gas_limit,
    })
}

fn check_rpc_url(url: &str) -> Result<(), &'static str> {
    let lower = url.to_ascii_lowercase();
    let rest = lower
        .strip_prefix("http://")
        .or_else(|| lower.strip_prefix("https://"))
        .ok_or("must start with http:// or https://")?;
    if rest.is_empty() {
        return Err("has no host");
    }
    Ok(())
}
