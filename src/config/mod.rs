//! Configuration loading and validation

pub mod settings;

pub use settings::{
    env_vars, load_env_file, ConfigError, ConfigIssue, ConfigOverrides, DeployerConfig,
    NetworkConfig, ProjectConfig, DEFAULT_CONSTRUCTOR_ARG, DEFAULT_GETTER, DEFAULT_SETTER,
    DEFAULT_SETTER_ARG, DEFAULT_SOURCE,
};
