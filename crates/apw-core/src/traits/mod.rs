//! Core traits for apw
//!
//! This module defines the abstract interfaces that all implementations must follow.
//!
//! - [`SnapshotSource`]: Produce the current catalog snapshot
//! - [`StateStore`]: Durable storage for the change-tracking database

pub mod snapshot_source;
pub mod state_store;

pub use snapshot_source::{SnapshotSource, SnapshotSourceFactory};
pub use state_store::StateStore;
