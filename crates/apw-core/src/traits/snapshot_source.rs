// # Snapshot Source Trait
//
// Defines the interface for querying the catalog.
//
// ## Implementations
//
// - expac-based (Arch Linux): `apw-source-expac` crate
// - Test doubles in `tests/common`
//
// ## Usage
//
// ```rust,ignore
// use apw_core::{Snapshot, SnapshotSource};
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let source = /* SnapshotSource implementation */;
//
//     let records = source.fetch().await?;
//     let snapshot = Snapshot::from_records(records)?;
//     println!("{} packages", snapshot.len());
//
//     Ok(())
// }
// ```

use async_trait::async_trait;

use crate::catalog::CatalogRecord;

/// Trait for snapshot source implementations
///
/// A source reports everything currently in the catalog. It is an observer
/// only: deciding what changed belongs to the database.
///
/// ## Contract
///
/// - Return every record, or fail. A partial listing must be an error, since
///   the database would read the missing entries as removals.
/// - Records must be well-formed. Duplicate ids are rejected downstream by
///   [`Snapshot::from_records`](crate::catalog::Snapshot::from_records).
/// - Bound the query. Sources that run subprocesses or touch the network
///   must apply their own timeout and report it as an error.
/// - No retries. A failed invocation is simply rerun by the scheduler.
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    /// Fetch the current catalog
    ///
    /// # Returns
    ///
    /// - `Ok(Vec<CatalogRecord>)`: Every record currently in the catalog
    /// - `Err(Error)`: The catalog could not be queried or parsed
    async fn fetch(&self) -> Result<Vec<CatalogRecord>, crate::Error>;

    /// Short name used in logs and errors (e.g. "expac")
    fn source_name(&self) -> &'static str;
}

/// Helper trait for constructing snapshot sources from configuration
pub trait SnapshotSourceFactory: Send + Sync {
    /// Create a SnapshotSource instance from configuration
    ///
    /// # Parameters
    ///
    /// - `config`: Configuration for this source type
    ///
    /// # Returns
    ///
    /// A boxed SnapshotSource trait object
    fn create(
        &self,
        config: &crate::config::SourceConfig,
    ) -> Result<Box<dyn SnapshotSource>, crate::Error>;
}
