//! CLI definitions for the remote runner.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Remote runner CLI.
#[derive(Parser)]
#[command(name = "remote-runner")]
#[command(about = "Polls a driver for automation commands and reports their outcomes")]
#[command(version)]
pub(crate) struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config/default.toml", global = true)]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Poll the driver and execute commands until aborted or interrupted (default)
    Run(RunArgs),

    /// Validate the configuration file and print any warnings
    CheckConfig,
}

/// Overrides applied on top of the configuration file.
#[derive(clap::Args, Default)]
pub(crate) struct RunArgs {
    /// Driver endpoint URL
    #[arg(long, env = "REMOTE_RUNNER_DRIVER_URL")]
    pub driver_url: Option<String>,

    /// Session identifier assigned by the controller
    #[arg(long, env = "REMOTE_RUNNER_SESSION_ID")]
    pub session_id: Option<String>,

    /// Resume a previously failed run; any further failure aborts
    #[arg(long = "continue")]
    pub continue_run: bool,

    /// Verbose logging
    #[arg(long)]
    pub debug: bool,
}
