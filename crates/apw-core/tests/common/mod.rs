//! Test doubles and common utilities for contract tests
//!
//! This module provides minimal snapshot sources and state stores that let
//! tests control exactly what the engine sees and count what it does.

#![allow(dead_code)]

use apw_core::error::{Error, Result};
use apw_core::traits::{SnapshotSource, StateStore};
use apw_core::{CatalogRecord, DatabaseState, Snapshot};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

pub const DAY: i64 = 24 * 3600;
pub const RETENTION: i64 = 30 * DAY;

/// Build a record with predictable fields
pub fn pkg(repo: &str, name: &str) -> CatalogRecord {
    CatalogRecord {
        repo: repo.to_string(),
        base: Some(name.to_string()),
        name: name.to_string(),
        arch: "x86_64".to_string(),
        build_time: 1_700_000_000,
        url: format!("https://archlinux.org/packages/{repo}/x86_64/{name}/"),
        desc: format!("The {name} package"),
        version: "1.0-1".to_string(),
    }
}

/// Build a snapshot of `core/<name>` packages
pub fn core_snapshot(names: &[&str]) -> Snapshot {
    Snapshot::from_records(names.iter().map(|n| pkg("core", n))).expect("valid snapshot")
}

/// A source whose output the test can replace between runs
#[derive(Clone, Default)]
pub struct ScriptedSource {
    records: Arc<std::sync::Mutex<Vec<CatalogRecord>>>,
    fetch_count: Arc<AtomicUsize>,
}

impl ScriptedSource {
    pub fn new(records: Vec<CatalogRecord>) -> Self {
        let source = Self::default();
        source.set(records);
        source
    }

    /// Replace what the next fetch returns
    pub fn set(&self, records: Vec<CatalogRecord>) {
        *self.records.lock().unwrap() = records;
    }

    /// Get the number of times fetch() was called
    pub fn fetch_count(&self) -> usize {
        self.fetch_count.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl SnapshotSource for ScriptedSource {
    async fn fetch(&self) -> Result<Vec<CatalogRecord>> {
        self.fetch_count.fetch_add(1, Ordering::SeqCst);
        Ok(self.records.lock().unwrap().clone())
    }

    fn source_name(&self) -> &'static str {
        "scripted"
    }
}

/// A source that always fails
pub struct FailingSource;

#[async_trait::async_trait]
impl SnapshotSource for FailingSource {
    async fn fetch(&self) -> Result<Vec<CatalogRecord>> {
        Err(Error::source("expac exited with status 1"))
    }

    fn source_name(&self) -> &'static str {
        "failing"
    }
}

/// A state store that counts saves and can be told to fail them
#[derive(Clone, Default)]
pub struct CountingStateStore {
    state: Arc<std::sync::Mutex<Option<DatabaseState>>>,
    save_count: Arc<AtomicUsize>,
    fail_saves: Arc<AtomicBool>,
}

impl CountingStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the number of successful save() calls
    pub fn save_count(&self) -> usize {
        self.save_count.load(Ordering::SeqCst)
    }

    /// Make every following save() fail
    pub fn fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    /// Copy of the saved state
    pub fn saved(&self) -> Option<DatabaseState> {
        self.state.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl StateStore for CountingStateStore {
    async fn load(&self) -> Result<Option<DatabaseState>> {
        Ok(self.saved())
    }

    async fn save(&self, state: &DatabaseState) -> Result<()> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(Error::state_store("disk full"));
        }
        self.save_count.fetch_add(1, Ordering::SeqCst);
        *self.state.lock().unwrap() = Some(state.clone());
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        *self.state.lock().unwrap() = None;
        Ok(())
    }

    fn location(&self) -> String {
        "counting".to_string()
    }
}

/// Helper to create a config that writes the result file into `dir`
pub fn config_in(dir: &std::path::Path) -> apw_core::ApwConfig {
    apw_core::ApwConfig {
        state_store: apw_core::StateStoreConfig::File {
            path: dir.join("apw.json"),
        },
        result_path: Some(dir.join("apw-result.json")),
        ..apw_core::ApwConfig::default()
    }
}
