use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub mod commands;

#[derive(Parser)]
#[command(name = "autopilot")]
#[command(about = "Drive a remote infrastructure workspace end to end")]
#[command(long_about = "Autopilot keeps a remote workspace's variables in sync with a desired set, \
                       publishes configuration archives and drives runs from plan to apply. \
                       Start with 'autopilot init-config' to write a configuration file.")]
pub struct Cli {
    /// Configuration file layered over autopilot.toml and under AUTOPILOT_* env vars
    #[arg(long, global = true, help = "Path to a configuration file")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Reconcile the workspace's variables with the configured [[variables]]
    SyncVars,
    /// Upload a configuration archive as a new configuration version
    Publish {
        /// Archive to upload (typically a .tar.gz of the configuration directory)
        file: PathBuf,
    },
    /// Queue a run and follow it until it settles
    Run {
        /// Run against this configuration version instead of the workspace's latest
        #[arg(long, help = "Configuration version id to run against")]
        configuration_version: Option<String>,
        /// Let the service apply on its own instead of issuing the apply action
        #[arg(long, help = "Ask the service to apply automatically after planning")]
        auto_apply: bool,
        /// Give up waiting after this many seconds
        #[arg(long, help = "Seconds to wait for the run before giving up")]
        timeout: Option<u64>,
    },
    /// Synchronize variables, publish the archive and run against it
    Deploy {
        /// Archive to upload
        file: PathBuf,
        #[arg(long, help = "Ask the service to apply automatically after planning")]
        auto_apply: bool,
    },
    /// Print the id of a workspace looked up by name
    WorkspaceId {
        #[arg(long, help = "Workspace name within the configured organization")]
        name: String,
    },
    /// Write a configuration file with default settings
    InitConfig {
        /// Where to write the file
        #[arg(default_value = "autopilot.toml")]
        path: PathBuf,
        #[arg(long, help = "Overwrite an existing file")]
        force: bool,
    },
}
