// # apw-core
//
// Core library for apw, a tracker of what recently entered or left a
// package repository.
//
// ## Architecture Overview
//
// - **SnapshotSource**: Trait for querying the current catalog
// - **StateStore**: Trait for durable storage of the database
// - **ChangeDatabase**: Diffs snapshots and keeps time-windowed change sets
// - **ApwEngine**: Orchestrates fetch → update → persist → export
// - **SourceRegistry**: Plugin-based registry for snapshot sources
//
// ## Design Principles
//
// 1. **Separation of Concerns**: The diff algorithm is a pure function of
//    the old state, the new snapshot and the clock
// 2. **Fail Closed**: Bad snapshots and unreadable state abort the run
//    without touching anything on disk
// 3. **Atomic Persistence**: State and result files are replaced, never
//    rewritten in place
// 4. **Library-First**: The CLI is a thin layer over this crate

pub mod catalog;
pub mod config;
pub mod database;
pub mod engine;
pub mod error;
pub mod registry;
pub mod state;
pub mod traits;

// Re-export core types for convenience
pub use catalog::{CatalogRecord, PackageId, Snapshot};
pub use config::{ApwConfig, RetentionConfig, SourceConfig, StateStoreConfig};
pub use database::{
    AddedEntry, AddedPackage, ChangeDatabase, DatabaseState, ExportedResult, RemovedEntry,
    RemovedPackage, UpdateSummary,
};
pub use engine::ApwEngine;
pub use error::{Error, Result};
pub use registry::SourceRegistry;
pub use state::{FileStateStore, MemoryStateStore, ResultFile};
pub use traits::{SnapshotSource, SnapshotSourceFactory, StateStore};
