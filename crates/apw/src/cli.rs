//! Command-line arguments
//!
//! Every flag has an `APW_*` environment fallback so a systemd unit can run
//! `apw update` without repeating paths.

use anyhow::{Context, Result};
use apw_core::{ApwConfig, RetentionConfig, SourceConfig, StateStoreConfig};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

const STATE_FILE_NAME: &str = "apw.json";
const RESULT_FILE_NAME: &str = "apw-result.json";

/// apw - Track what packages recently entered or left your repositories.
#[derive(Debug, Parser)]
#[command(name = "apw")]
#[command(author, version, about, long_about = None)]
#[command(after_help = "Note: apw is not retroactive. Changes are tracked from 'apw init' on.")]
pub struct Cli {
    /// Alternative pacman.conf handed to expac.
    #[arg(long, short = 'c', env = "APW_PACMAN_CONF", default_value = "/etc/pacman.conf")]
    pub config: PathBuf,

    /// Path to the expac binary.
    #[arg(long, env = "APW_EXPAC", default_value = "/usr/bin/expac")]
    pub expac: PathBuf,

    /// State file (default: ~/.cache/apw.json).
    #[arg(long, env = "APW_STATE")]
    pub state: Option<PathBuf>,

    /// Result file (default: ~/.cache/apw-result.json).
    #[arg(long, env = "APW_RESULT")]
    pub result: Option<PathBuf>,

    /// How many days a change stays listed.
    #[arg(long, env = "APW_RETENTION_DAYS")]
    pub retention_days: Option<u64>,

    /// Seconds before a hanging expac is killed.
    #[arg(long, env = "APW_TIMEOUT", default_value = "60")]
    pub timeout: u64,

    /// Output format.
    #[arg(long, value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, env = "APW_LOG_LEVEL", default_value = "warn")]
    pub log_level: String,

    /// Subcommand to execute (default: show).
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// CLI subcommands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Take a baseline snapshot so the next update only reports real changes.
    Init,
    /// Check the repositories for new and removed packages.
    Update,
    /// Dismiss current changes.
    Dismiss,
    /// Show the changes found by the last update.
    Show,
    /// Remove the state and result files.
    Clean,
}

/// Output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Colored, human-readable text.
    #[default]
    Text,
    /// The result document as JSON.
    Json,
}

impl Cli {
    /// The command to run; `show` when none was given.
    pub fn command(&self) -> Command {
        self.command.unwrap_or(Command::Show)
    }

    /// Resolve flags and defaults into the core configuration.
    ///
    /// # Errors
    ///
    /// Fails when a default path is needed but the home directory is unknown,
    /// or when the retention window does not fit in seconds.
    pub fn apw_config(&self) -> Result<ApwConfig> {
        let state = match &self.state {
            Some(path) => path.clone(),
            None => default_cache_path(STATE_FILE_NAME)?,
        };
        let result = match &self.result {
            Some(path) => path.clone(),
            None => default_cache_path(RESULT_FILE_NAME)?,
        };
        let retention = match self.retention_days {
            Some(days) => RetentionConfig::from_days(days)?,
            None => RetentionConfig::default(),
        };

        Ok(ApwConfig {
            source: SourceConfig::Expac {
                expac_path: self.expac.clone(),
                pacman_conf: self.config.clone(),
                timeout_secs: self.timeout,
            },
            state_store: StateStoreConfig::File { path: state },
            result_path: Some(result),
            retention,
        })
    }
}

fn default_cache_path(file_name: &str) -> Result<PathBuf> {
    let home = dirs::home_dir()
        .context("Cannot determine the home directory. Pass --state and --result explicitly")?;
    Ok(home.join(".cache").join(file_name))
}
