//! Change-tracking database
//!
//! The database remembers the last snapshot it saw (`known_packages`) and two
//! time-windowed indexes of what changed relative to it:
//!
//! - `recent_added`: ids that appeared, with the instant they were first seen
//! - `recent_removed`: records that disappeared, with the instant they vanished
//!
//! ## Update algorithm
//!
//! ```text
//!   old known ─┬─ minus new ──► recent_removed (removeTime = now) ──► drop expired
//!              │
//!   new snap ──┴─ minus old ──► recent_added (createTime = now, sticky)
//!                                   └─► drop expired OR no longer present
//!   known = new snap; timestamp = now
//! ```
//!
//! Removed entries age out by time only. Added entries age out by time or by
//! disappearing from the catalog, at which point the same call records them as
//! removed.
//!
//! [`DatabaseState`] is the pure value the algorithm runs on. [`ChangeDatabase`]
//! pairs it with a [`StateStore`] so every mutation is persisted before it
//! becomes visible.

mod export;

pub use export::{AddedPackage, ExportedResult, RemovedPackage};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

use crate::catalog::{CatalogRecord, PackageId, Snapshot};
use crate::config::RetentionConfig;
use crate::error::{Error, Result};
use crate::traits::StateStore;

/// An id that recently appeared in the catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddedEntry {
    /// First instant the id was observed absent-then-present
    pub create_time: i64,
}

/// A record that recently disappeared from the catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemovedEntry {
    /// The record as it was last seen
    #[serde(flatten)]
    pub record: CatalogRecord,
    /// Instant the id was observed present-then-absent
    pub remove_time: i64,
}

/// What a single update changed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateSummary {
    /// Ids that entered `recent_added` in this update
    pub added: usize,
    /// Ids that entered `recent_removed` in this update
    pub removed: usize,
    /// Added entries dropped because they aged out or vanished
    pub expired_added: usize,
    /// Removed entries dropped because they aged out
    pub expired_removed: usize,
    /// Size of the new snapshot
    pub known: usize,
}

impl UpdateSummary {
    pub fn has_changes(&self) -> bool {
        self.added > 0 || self.removed > 0
    }
}

/// Persisted state of the change-tracking database
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseState {
    /// The last snapshot seen
    pub known_packages: Snapshot,
    pub recent_added: BTreeMap<PackageId, AddedEntry>,
    pub recent_removed: BTreeMap<PackageId, RemovedEntry>,
    /// Instant of the last successful update (0 before the first one)
    pub timestamp: i64,
}

impl DatabaseState {
    /// Empty baseline used on first run
    pub fn empty() -> Self {
        Self::default()
    }

    /// Diff `snapshot` against the known one and roll the change windows forward
    ///
    /// `retention_secs` is the width of the trailing window; entries stamped
    /// strictly before `now - retention_secs` are dropped.
    pub fn apply_snapshot(&mut self, snapshot: Snapshot, now: i64, retention_secs: i64) -> UpdateSummary {
        let cutoff = now.saturating_sub(retention_secs);
        let mut summary = UpdateSummary {
            known: snapshot.len(),
            ..UpdateSummary::default()
        };

        // Both diffs run against the old snapshot, before it is replaced below.
        for id in self.known_packages.ids_missing_from(&snapshot) {
            if let Some(record) = self.known_packages.get(id) {
                debug!("{} left the catalog", id);
                self.recent_removed.insert(
                    id.clone(),
                    RemovedEntry {
                        record: record.clone(),
                        remove_time: now,
                    },
                );
                summary.removed += 1;
            }
        }

        let before = self.recent_removed.len();
        self.recent_removed.retain(|_, entry| entry.remove_time >= cutoff);
        summary.expired_removed = before - self.recent_removed.len();

        for id in snapshot.ids_missing_from(&self.known_packages) {
            if !self.recent_added.contains_key(id) {
                debug!("{} entered the catalog", id);
                self.recent_added
                    .insert(id.clone(), AddedEntry { create_time: now });
                summary.added += 1;
            }
        }

        let before = self.recent_added.len();
        self.recent_added
            .retain(|id, entry| entry.create_time >= cutoff && snapshot.contains(id));
        summary.expired_added = before - self.recent_added.len();

        self.known_packages = snapshot;
        self.timestamp = now;

        summary
    }

    /// Forget the change windows, keeping the baseline
    pub fn clear_changes(&mut self) {
        self.recent_added.clear();
        self.recent_removed.clear();
    }

    /// Build the sorted, denormalized read view
    pub fn export(&self) -> Result<ExportedResult> {
        ExportedResult::from_state(self)
    }

    /// Check that loaded state is keyed consistently
    ///
    /// Returns a description of the first problem found.
    pub fn check_consistency(&self) -> std::result::Result<(), String> {
        if let Some(id) = self.known_packages.find_misfiled() {
            return Err(format!("knownPackages entry {id} does not match its record"));
        }
        if let Some(id) = self
            .recent_removed
            .iter()
            .find(|(id, entry)| **id != entry.record.id())
            .map(|(id, _)| id)
        {
            return Err(format!("recentRemoved entry {id} does not match its record"));
        }
        Ok(())
    }
}

/// The database bound to durable storage
///
/// Mutations are computed on a copy, written through the store, and only then
/// become the in-memory state. A failed write leaves both disk and memory on
/// the previous state.
pub struct ChangeDatabase {
    store: Box<dyn StateStore>,
    state: DatabaseState,
    retention_secs: i64,
}

impl ChangeDatabase {
    /// Load the database from `store`, starting empty if nothing was saved yet
    ///
    /// A corrupt state file is an error.
    pub async fn open(store: Box<dyn StateStore>, retention: &RetentionConfig) -> Result<Self> {
        let state = match store.load().await? {
            Some(state) => {
                debug!(
                    "Loaded state: {} known, {} added, {} removed",
                    state.known_packages.len(),
                    state.recent_added.len(),
                    state.recent_removed.len()
                );
                state
            }
            None => {
                info!("No saved state found, starting from an empty baseline");
                DatabaseState::empty()
            }
        };

        Ok(Self::with_state(store, state, retention))
    }

    /// Like [`open`](Self::open), but a corrupt state file becomes an empty baseline
    ///
    /// Only meant for explicit re-initialization.
    pub async fn open_or_reset(store: Box<dyn StateStore>, retention: &RetentionConfig) -> Result<Self> {
        match store.load().await {
            Ok(state) => Ok(Self::with_state(
                store,
                state.unwrap_or_default(),
                retention,
            )),
            Err(e @ Error::StateCorrupt { .. }) => {
                warn!("Discarding unreadable state: {}", e);
                Ok(Self::with_state(store, DatabaseState::empty(), retention))
            }
            Err(e) => Err(e),
        }
    }

    fn with_state(store: Box<dyn StateStore>, state: DatabaseState, retention: &RetentionConfig) -> Self {
        Self {
            store,
            state,
            retention_secs: retention.window_secs_i64(),
        }
    }

    /// Current in-memory state
    pub fn state(&self) -> &DatabaseState {
        &self.state
    }

    /// Retention window in seconds
    pub fn retention_secs(&self) -> i64 {
        self.retention_secs
    }

    /// Apply a fresh snapshot observed at `now` and persist the result
    pub async fn update(&mut self, snapshot: Snapshot, now: i64) -> Result<UpdateSummary> {
        if now < self.state.timestamp {
            warn!(
                "Update time {} is earlier than the last update {}; clock went backwards?",
                now, self.state.timestamp
            );
        }

        let mut next = self.state.clone();
        let summary = next.apply_snapshot(snapshot, now, self.retention_secs);

        self.store.save(&next).await?;
        self.state = next;

        info!(
            "Update at {}: {} added, {} removed, {} known",
            now, summary.added, summary.removed, summary.known
        );
        Ok(summary)
    }

    /// Clear the change windows and persist; the baseline is kept
    pub async fn dismiss(&mut self) -> Result<()> {
        let mut next = self.state.clone();
        next.clear_changes();

        self.store.save(&next).await?;
        self.state = next;

        info!("Dismissed recent changes");
        Ok(())
    }

    /// Sorted read view of the current state
    pub fn export(&self) -> Result<ExportedResult> {
        self.state.export()
    }
}
