//! Plugin-based source registry
//!
//! The registry maps snapshot source type names to factories, so the binary
//! can build whatever source the configuration names without a hardcoded
//! if-else chain. It also builds the built-in state stores.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use apw_core::registry::SourceRegistry;
//! use apw_core::config::SourceConfig;
//!
//! let registry = SourceRegistry::new();
//! apw_source_expac::register(&registry);
//!
//! let source = registry.create_source(&SourceConfig::default())?;
//! ```
//!
//! ## Registration
//!
//! Source crates expose a `register()` function:
//!
//! ```rust,ignore
//! pub fn register(registry: &SourceRegistry) {
//!     registry.register_source("expac", Box::new(ExpacSourceFactory));
//! }
//! ```

use crate::config::{SourceConfig, StateStoreConfig};
use crate::error::{Error, Result};
use crate::state::{FileStateStore, MemoryStateStore};
use crate::traits::{SnapshotSource, SnapshotSourceFactory, StateStore};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

/// Registry of snapshot source factories
///
/// ## Thread Safety
///
/// The registry uses interior mutability with RwLock, allowing concurrent
/// reads and exclusive writes.
#[derive(Default)]
pub struct SourceRegistry {
    sources: RwLock<HashMap<String, Box<dyn SnapshotSourceFactory>>>,
}

impl SourceRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a snapshot source factory
    ///
    /// # Parameters
    ///
    /// - `name`: Source type name (e.g., "expac")
    /// - `factory`: Factory object for creating source instances
    ///
    /// Registering a name twice replaces the earlier factory.
    pub fn register_source(&self, name: impl Into<String>, factory: Box<dyn SnapshotSourceFactory>) {
        let name = name.into();
        tracing::debug!("Registering snapshot source: {}", name);
        let mut sources = self.sources.write().unwrap_or_else(PoisonError::into_inner);
        sources.insert(name, factory);
    }

    /// Create a snapshot source from configuration
    ///
    /// # Returns
    ///
    /// - `Ok(Box<dyn SnapshotSource>)`: Created source instance
    /// - `Err(Error)`: If the source type is not registered or creation fails
    pub fn create_source(&self, config: &SourceConfig) -> Result<Box<dyn SnapshotSource>> {
        let source_type = config.type_name();
        let sources = self.sources.read().unwrap_or_else(PoisonError::into_inner);

        let factory = sources.get(source_type).ok_or_else(|| {
            Error::config(format!(
                "Unknown snapshot source type: {} (registered: {})",
                source_type,
                Self::join_names(&sources)
            ))
        })?;

        factory.create(config)
    }

    /// Create one of the built-in state stores from configuration
    pub async fn create_state_store(&self, config: &StateStoreConfig) -> Result<Box<dyn StateStore>> {
        match config {
            StateStoreConfig::File { path } => Ok(Box::new(FileStateStore::new(path).await?)),
            StateStoreConfig::Memory => Ok(Box::new(MemoryStateStore::new())),
        }
    }

    /// List all registered source types, sorted
    pub fn list_sources(&self) -> Vec<String> {
        let sources = self.sources.read().unwrap_or_else(PoisonError::into_inner);
        let mut names: Vec<String> = sources.keys().cloned().collect();
        names.sort();
        names
    }

    /// Check if a source type is registered
    pub fn has_source(&self, name: &str) -> bool {
        let sources = self.sources.read().unwrap_or_else(PoisonError::into_inner);
        sources.contains_key(name)
    }

    fn join_names(sources: &HashMap<String, Box<dyn SnapshotSourceFactory>>) -> String {
        let mut names: Vec<&str> = sources.keys().map(String::as_str).collect();
        names.sort_unstable();
        if names.is_empty() {
            "none".to_string()
        } else {
            names.join(", ")
        }
    }
}
