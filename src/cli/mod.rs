//! Command-line interface handlers

pub mod commands;

pub use commands::{
    cmd_account, cmd_call, cmd_compile, cmd_deploy, cmd_forget, cmd_run, cmd_send, cmd_status,
    CliResult, DeployOptions, RunOptions,
};
