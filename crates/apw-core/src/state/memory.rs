// # Memory State Store
//
// In-memory implementation of StateStore.
//
// ## Purpose
//
// Holds the database for the lifetime of the process only. Useful for
// tests and for dry runs that should not touch the real state file.
//
// ## Crash Behavior
//
// - All state is lost when the process exits
// - The next run starts from an empty baseline and reports every package
//   as newly added

use std::sync::Arc;
use tokio::sync::RwLock;
use async_trait::async_trait;

use crate::database::DatabaseState;
use crate::traits::state_store::StateStore;
use crate::Error;

/// In-memory state store implementation
///
/// Clones share the same underlying state, so a test can keep a handle and
/// inspect what the database saved.
///
/// # Example
///
/// ```rust,no_run
/// use apw_core::state::MemoryStateStore;
/// use apw_core::traits::StateStore;
/// use apw_core::DatabaseState;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = MemoryStateStore::new();
///
///     store.save(&DatabaseState::empty()).await?;
///     assert!(store.load().await?.is_some());
///
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryStateStore {
    inner: Arc<RwLock<Option<DatabaseState>>>,
}

impl MemoryStateStore {
    /// Create a new empty memory state store
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the last saved state
    pub async fn snapshot(&self) -> Option<DatabaseState> {
        self.inner.read().await.clone()
    }

    /// Check if nothing has been saved
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_none()
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn load(&self) -> Result<Option<DatabaseState>, Error> {
        Ok(self.inner.read().await.clone())
    }

    async fn save(&self, state: &DatabaseState) -> Result<(), Error> {
        *self.inner.write().await = Some(state.clone());
        Ok(())
    }

    async fn clear(&self) -> Result<(), Error> {
        *self.inner.write().await = None;
        Ok(())
    }

    fn location(&self) -> String {
        "memory".to_string()
    }
}
