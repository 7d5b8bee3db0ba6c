//! Core apw engine
//!
//! The ApwEngine is responsible for:
//! - Fetching the current catalog from a SnapshotSource
//! - Guarding the database against bad snapshots
//! - Running the change-tracking update or dismiss
//! - Publishing the exported result after every mutation
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────┐
//! │ SnapshotSource │─── Vec<CatalogRecord> ───┐
//! └────────────────┘                          │
//!                                             ▼
//!                                    ┌──────────────┐
//!                                    │  ApwEngine   │
//!                                    └──────────────┘
//!                                             │
//!                   ┌─────────────────────────┴─────────────┐
//!                   ▼                                       ▼
//!          ┌────────────────┐                      ┌──────────────┐
//!          │ ChangeDatabase │── StateStore         │  ResultFile  │
//!          │ (update/save)  │                      │  (export)    │
//!          └────────────────┘                      └──────────────┘
//! ```
//!
//! ## Update Flow
//!
//! 1. Fetch records from the source
//! 2. Reject empty, malformed or duplicate-keyed output (nothing is touched)
//! 3. Diff against the known snapshot and persist atomically
//! 4. Export the sorted view and write the result file

use crate::catalog::Snapshot;
use crate::config::ApwConfig;
use crate::database::{ChangeDatabase, ExportedResult, UpdateSummary};
use crate::error::{Error, Result};
use crate::state::ResultFile;
use crate::traits::{SnapshotSource, StateStore};
use tracing::{debug, info, warn};

/// Core apw engine
///
/// One engine serves one invocation: it is opened, runs a single command and
/// is dropped. The result file is written after the state is saved, so if
/// that write fails the result lags behind the state until the next update
/// or dismiss republishes it.
pub struct ApwEngine {
    /// Change-tracking database bound to its store
    database: ChangeDatabase,

    /// Where the exported view is published
    result_file: Option<ResultFile>,
}

impl ApwEngine {
    /// Open the engine on the saved state
    ///
    /// # Parameters
    ///
    /// - `state_store`: State store implementation
    /// - `config`: apw configuration
    ///
    /// # Errors
    ///
    /// Fails on invalid configuration or unreadable state.
    pub async fn open(state_store: Box<dyn StateStore>, config: &ApwConfig) -> Result<Self> {
        config.validate()?;
        debug!("Opening state from {}", state_store.location());

        let database = ChangeDatabase::open(state_store, &config.retention).await?;
        Ok(Self::with_database(database, config))
    }

    /// Open the engine for re-initialization
    ///
    /// Unreadable state is discarded and replaced by an empty baseline.
    pub async fn open_for_init(state_store: Box<dyn StateStore>, config: &ApwConfig) -> Result<Self> {
        config.validate()?;
        let database = ChangeDatabase::open_or_reset(state_store, &config.retention).await?;
        Ok(Self::with_database(database, config))
    }

    fn with_database(database: ChangeDatabase, config: &ApwConfig) -> Self {
        Self {
            database,
            result_file: config.result_path.as_ref().map(ResultFile::new),
        }
    }

    /// The underlying database
    pub fn database(&self) -> &ChangeDatabase {
        &self.database
    }

    /// Fetch a snapshot now and record what changed
    pub async fn update(&mut self, source: &dyn SnapshotSource) -> Result<ExportedResult> {
        self.update_at(source, chrono::Utc::now().timestamp()).await
    }

    /// Fetch a snapshot and record what changed as of `now`
    pub async fn update_at(&mut self, source: &dyn SnapshotSource, now: i64) -> Result<ExportedResult> {
        let snapshot = Self::fetch_snapshot(source).await?;
        let summary = self.database.update(snapshot, now).await?;
        Self::log_summary(&summary);
        self.publish().await
    }

    /// Clear the recent changes and publish the (now empty) view
    pub async fn dismiss(&mut self) -> Result<ExportedResult> {
        self.database.dismiss().await?;
        self.publish().await
    }

    /// First run: take a baseline snapshot and dismiss it
    ///
    /// Without this, the first regular update would list the whole catalog as
    /// newly added.
    pub async fn init(&mut self, source: &dyn SnapshotSource) -> Result<ExportedResult> {
        self.init_at(source, chrono::Utc::now().timestamp()).await
    }

    /// [`init`](Self::init) as of `now`
    pub async fn init_at(&mut self, source: &dyn SnapshotSource, now: i64) -> Result<ExportedResult> {
        info!("Taking baseline snapshot");
        self.update_at(source, now).await?;
        info!("Dismissing baseline changes");
        self.dismiss().await
    }

    /// Query the source and validate its output into a snapshot
    async fn fetch_snapshot(source: &dyn SnapshotSource) -> Result<Snapshot> {
        let name = source.source_name();
        debug!("Fetching snapshot from {}", name);

        let records = source.fetch().await.map_err(|e| {
            if e.is_provider_failure() {
                e
            } else {
                Error::source(format!("{}: {}", name, e))
            }
        })?;

        // An empty catalog is far more likely a broken query than a real state.
        if records.is_empty() {
            warn!("Source {} returned no packages, leaving state untouched", name);
            return Err(Error::EmptySnapshot);
        }

        let snapshot = Snapshot::from_records(records)?;
        debug!("Snapshot from {}: {} packages", name, snapshot.len());
        Ok(snapshot)
    }

    fn log_summary(summary: &UpdateSummary) {
        if summary.has_changes() {
            info!(
                "Detected {} added and {} removed package(s)",
                summary.added, summary.removed
            );
        } else {
            debug!("No repository changes");
        }
        if summary.expired_added > 0 || summary.expired_removed > 0 {
            debug!(
                "Expired {} added and {} removed entries",
                summary.expired_added, summary.expired_removed
            );
        }
    }

    /// Export and write the result file
    async fn publish(&self) -> Result<ExportedResult> {
        let result = self.database.export()?;
        if let Some(file) = &self.result_file {
            file.write(&result).await?;
        }
        Ok(result)
    }
}

/// Delete the saved state and the result file
///
/// Missing files are not an error.
pub async fn clean(state_store: &dyn StateStore, result_file: Option<&ResultFile>) -> Result<()> {
    info!("Removing state at {}", state_store.location());
    state_store.clear().await?;

    if let Some(file) = result_file {
        info!("Removing result at {}", file.path().display());
        file.remove().await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CatalogRecord;
    use crate::catalog::tests::record;
    use crate::state::MemoryStateStore;

    struct FixedSource(Vec<CatalogRecord>);

    #[async_trait::async_trait]
    impl SnapshotSource for FixedSource {
        async fn fetch(&self) -> Result<Vec<CatalogRecord>> {
            Ok(self.0.clone())
        }

        fn source_name(&self) -> &'static str {
            "fixed"
        }
    }

    #[tokio::test]
    async fn test_init_leaves_baseline_without_changes() {
        let store = MemoryStateStore::new();
        let mut engine = ApwEngine::open(Box::new(store.clone()), &ApwConfig::default())
            .await
            .unwrap();

        let source = FixedSource(vec![record("core", "a"), record("core", "b")]);
        let result = engine.init_at(&source, 100).await.unwrap();

        assert!(result.is_empty());
        assert_eq!(result.timestamp, 100);
        let saved = store.snapshot().await.unwrap();
        assert_eq!(saved.known_packages.len(), 2);
    }

    #[tokio::test]
    async fn test_non_provider_errors_are_wrapped() {
        struct BrokenSource;

        #[async_trait::async_trait]
        impl SnapshotSource for BrokenSource {
            async fn fetch(&self) -> Result<Vec<CatalogRecord>> {
                Err(Error::Other("pipe closed".to_string()))
            }

            fn source_name(&self) -> &'static str {
                "broken"
            }
        }

        let mut engine = ApwEngine::open(Box::new(MemoryStateStore::new()), &ApwConfig::default())
            .await
            .unwrap();
        let err = engine.update_at(&BrokenSource, 1).await.unwrap_err();
        assert!(err.is_provider_failure());
        assert!(err.to_string().contains("broken: pipe closed"));
    }
}
