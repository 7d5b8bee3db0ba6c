//! Configuration types for apw
//!
//! This module defines all configuration structures used throughout the crate.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default retention window: 30 days
pub const DEFAULT_RETENTION_SECS: u64 = 30 * SECS_PER_DAY;

const SECS_PER_DAY: u64 = 24 * 3600;

/// Main apw configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApwConfig {
    /// Snapshot source configuration
    pub source: SourceConfig,

    /// State store configuration
    pub state_store: StateStoreConfig,

    /// Where the exported result is written (not written when unset)
    #[serde(default)]
    pub result_path: Option<PathBuf>,

    /// Change retention settings
    #[serde(default)]
    pub retention: RetentionConfig,
}

impl ApwConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self {
            source: SourceConfig::default(),
            state_store: StateStoreConfig::default(),
            result_path: None,
            retention: RetentionConfig::default(),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        self.source.validate()?;
        self.state_store.validate()?;
        self.retention.validate()?;

        if let Some(path) = &self.result_path {
            if path.as_os_str().is_empty() {
                return Err(crate::Error::config("Result path cannot be empty"));
            }
        }

        Ok(())
    }
}

impl Default for ApwConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot source configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SourceConfig {
    /// Query pacman sync databases through `expac`
    Expac {
        /// Path to the expac binary
        #[serde(default = "default_expac_path")]
        expac_path: PathBuf,
        /// pacman.conf to pass to expac
        #[serde(default = "default_pacman_conf")]
        pacman_conf: PathBuf,
        /// Upper bound on how long the query may run
        #[serde(default = "default_source_timeout_secs")]
        timeout_secs: u64,
    },

    /// Custom snapshot source
    Custom {
        /// Factory name to use
        factory: String,
        /// Custom configuration data
        config: serde_json::Value,
    },
}

impl SourceConfig {
    /// Validate the source configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            SourceConfig::Expac {
                expac_path,
                pacman_conf,
                timeout_secs,
            } => {
                if expac_path.as_os_str().is_empty() {
                    return Err(crate::Error::config("expac path cannot be empty"));
                }
                if pacman_conf.as_os_str().is_empty() {
                    return Err(crate::Error::config("pacman.conf path cannot be empty"));
                }
                if *timeout_secs == 0 {
                    return Err(crate::Error::config("Source timeout must be > 0"));
                }
                Ok(())
            }
            SourceConfig::Custom { factory, config } => {
                if factory.is_empty() {
                    return Err(crate::Error::config("Custom source factory cannot be empty"));
                }
                if config.is_null() {
                    return Err(crate::Error::config("Custom source config cannot be null"));
                }
                Ok(())
            }
        }
    }

    /// Get the source type name
    pub fn type_name(&self) -> &str {
        match self {
            SourceConfig::Expac { .. } => "expac",
            SourceConfig::Custom { factory, .. } => factory,
        }
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        SourceConfig::Expac {
            expac_path: default_expac_path(),
            pacman_conf: default_pacman_conf(),
            timeout_secs: default_source_timeout_secs(),
        }
    }
}

fn default_expac_path() -> PathBuf {
    PathBuf::from("/usr/bin/expac")
}

fn default_pacman_conf() -> PathBuf {
    PathBuf::from("/etc/pacman.conf")
}

fn default_source_timeout_secs() -> u64 {
    60
}

/// State store configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StateStoreConfig {
    /// File-based state store
    File {
        /// Path to the state file
        path: PathBuf,
    },

    /// In-memory state store (not persistent)
    #[default]
    Memory,
}

impl StateStoreConfig {
    /// Validate the state store configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            StateStoreConfig::File { path } if path.as_os_str().is_empty() => {
                Err(crate::Error::config("State file path cannot be empty"))
            }
            _ => Ok(()),
        }
    }

    /// Get the state store type name
    pub fn type_name(&self) -> &str {
        match self {
            StateStoreConfig::File { .. } => "file",
            StateStoreConfig::Memory => "memory",
        }
    }
}

/// Retention policy for tracked changes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetentionConfig {
    /// How long an added or removed package stays listed (in seconds)
    #[serde(default = "default_retention_secs")]
    pub window_secs: u64,
}

impl RetentionConfig {
    /// Build a window of whole days
    ///
    /// Fails when the window does not fit in seconds.
    pub fn from_days(days: u64) -> Result<Self, crate::Error> {
        let window_secs = days
            .checked_mul(SECS_PER_DAY)
            .filter(|secs| i64::try_from(*secs).is_ok())
            .ok_or_else(|| crate::Error::config("Retention window is too large"))?;
        Ok(Self { window_secs })
    }

    /// Validate the retention configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.window_secs == 0 {
            return Err(crate::Error::config("Retention window must be > 0"));
        }
        if i64::try_from(self.window_secs).is_err() {
            return Err(crate::Error::config("Retention window is too large"));
        }
        Ok(())
    }

    /// Window as a signed timestamp delta
    pub fn window_secs_i64(&self) -> i64 {
        i64::try_from(self.window_secs).unwrap_or(i64::MAX)
    }
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            window_secs: default_retention_secs(),
        }
    }
}

fn default_retention_secs() -> u64 {
    DEFAULT_RETENTION_SECS
}
