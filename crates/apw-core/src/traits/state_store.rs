// # State Store Trait
//
// Defines the interface for persisting the change-tracking database.
//
// ## Purpose
//
// The whole `DatabaseState` is loaded once per invocation and written back
// after every mutation. Stores never see partial updates.
//
// ## Implementations
//
// - File-based: JSON file with atomic replace
// - In-memory: tests and dry runs

use async_trait::async_trait;

use crate::database::DatabaseState;

/// Trait for state store implementations
///
/// # Durability
///
/// `save()` must be atomic: after a crash, `load()` returns either the
/// previous state or the new one, never a mix or a truncated file.
///
/// # Concurrency
///
/// A store is used by one invocation at a time. Implementations are not
/// required to lock against other processes; callers serialize runs.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Load the saved state
    ///
    /// # Returns
    ///
    /// - `Ok(Some(DatabaseState))`: Previously saved state
    /// - `Ok(None)`: Nothing saved yet (first run)
    /// - `Err(Error::StateCorrupt)`: Saved state exists but is unreadable
    /// - `Err(Error)`: Storage error
    async fn load(&self) -> Result<Option<DatabaseState>, crate::Error>;

    /// Replace the saved state
    ///
    /// # Returns
    ///
    /// - `Ok(())`: The new state is durable
    /// - `Err(Error)`: Storage error; the previous state is still in place
    async fn save(&self, state: &DatabaseState) -> Result<(), crate::Error>;

    /// Delete the saved state (and anything derived from it)
    ///
    /// Deleting state that does not exist is not an error.
    async fn clear(&self) -> Result<(), crate::Error>;

    /// Human-readable location, for logs
    fn location(&self) -> String;
}
