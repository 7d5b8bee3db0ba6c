// # File State Store
//
// File-based implementation of StateStore.
//
// ## Purpose
//
// Keeps the change-tracking database between invocations. Each run loads
// the whole file, and each mutation rewrites it.
//
// ## Crash Safety
//
// - Atomic writes: new content goes to a `.tmp` sibling, is flushed and
//   synced, then renamed over the real file
// - Backup: the previous file is copied to `.backup` before each rename
// - Corruption detection: unparsable or inconsistent files are reported as
//   `StateCorrupt`, never silently replaced
//
// ## File Format
//
// ```json
// {
//   "version": "1.0",
//   "knownPackages": { "core/foo": { "repo": "core", "name": "foo", ... } },
//   "recentAdded": { "core/foo": { "createTime": 1700000000 } },
//   "recentRemoved": { "extra/bar": { "repo": "extra", ..., "removeTime": 1700000000 } },
//   "timestamp": 1700000000
// }
// ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::Error;
use crate::database::DatabaseState;
use crate::traits::state_store::StateStore;

/// State file format version
/// Used for future migration if format changes
const STATE_FILE_VERSION: &str = "1.0";

/// File-based state store
///
/// # Example
///
/// ```rust,no_run
/// use apw_core::state::FileStateStore;
/// use apw_core::traits::StateStore;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = FileStateStore::new("/home/me/.cache/apw.json").await?;
///
///     if let Some(state) = store.load().await? {
///         println!("{} known packages", state.known_packages.len());
///     }
///
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct FileStateStore {
    path: PathBuf,
}

/// On-disk layout, as read
#[derive(Debug, Deserialize)]
struct StateFileFormat {
    #[serde(default)]
    version: Option<String>,
    #[serde(flatten)]
    state: DatabaseState,
}

/// On-disk layout, as written
#[derive(Debug, Serialize)]
struct StateFileRef<'a> {
    version: &'a str,
    #[serde(flatten)]
    state: &'a DatabaseState,
}

impl FileStateStore {
    /// Create a file state store, creating parent directories if needed
    pub async fn new<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref().to_path_buf();
        ensure_parent_dir(&path).await?;
        Ok(Self { path })
    }

    /// Path of the state file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get path to backup file
    pub fn backup_path(path: &Path) -> PathBuf {
        sibling_path(path, "backup")
    }

    fn corrupt(&self, message: String) -> Error {
        let backup = Self::backup_path(&self.path);
        let message = if backup.exists() {
            format!(
                "{}. The previous state is kept in {}",
                message,
                backup.display()
            )
        } else {
            message
        };
        Error::state_corrupt(&self.path, message)
    }
}

#[async_trait]
impl StateStore for FileStateStore {
    async fn load(&self) -> Result<Option<DatabaseState>, Error> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!("State file does not exist: {}", self.path.display());
                return Ok(None);
            }
            Err(e) if e.kind() == ErrorKind::InvalidData => {
                return Err(self.corrupt(format!("not valid UTF-8: {}", e)));
            }
            Err(e) => {
                return Err(Error::state_store(format!(
                    "Failed to read state file {}: {}",
                    self.path.display(),
                    e
                )));
            }
        };

        let file: StateFileFormat = serde_json::from_str(&content)
            .map_err(|e| self.corrupt(format!("failed to parse: {}", e)))?;

        match file.version.as_deref() {
            Some(STATE_FILE_VERSION) => {}
            other => {
                tracing::warn!(
                    "State file version mismatch: expected {}, got {:?}. \
                    Attempting to load anyway.",
                    STATE_FILE_VERSION,
                    other
                );
            }
        }

        file.state
            .check_consistency()
            .map_err(|message| self.corrupt(message))?;

        tracing::debug!(
            "Loaded state from {}: {} known packages",
            self.path.display(),
            file.state.known_packages.len()
        );
        Ok(Some(file.state))
    }

    async fn save(&self, state: &DatabaseState) -> Result<(), Error> {
        let json = serde_json::to_vec_pretty(&StateFileRef {
            version: STATE_FILE_VERSION,
            state,
        })
        .map_err(|e| Error::state_store(format!("Failed to serialize state: {}", e)))?;

        // Keep the last good state around for manual recovery
        if self.path.exists() {
            let backup_path = Self::backup_path(&self.path);
            if let Err(e) = fs::copy(&self.path, &backup_path).await {
                tracing::warn!("Failed to create backup: {}", e);
            }
        }

        write_atomic(&self.path, &json).await?;
        tracing::trace!("State written to file: {}", self.path.display());
        Ok(())
    }

    async fn clear(&self) -> Result<(), Error> {
        remove_if_exists(&self.path).await?;
        remove_if_exists(&Self::backup_path(&self.path)).await?;
        remove_if_exists(&temp_path(&self.path)).await?;
        Ok(())
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}

/// Get path to temporary file for atomic writes
pub(crate) fn temp_path(path: &Path) -> PathBuf {
    sibling_path(path, "tmp")
}

/// `path` with `.{suffix}` appended to the full file name
///
/// `apw.json` becomes `apw.json.tmp`, so the sibling never collides with
/// the file itself, whatever its extension.
fn sibling_path(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.file_name().map(OsString::from).unwrap_or_default();
    name.push(".");
    name.push(suffix);
    path.with_file_name(name)
}

/// Create the parent directory of `path` if it is missing
pub(crate) async fn ensure_parent_dir(path: &Path) -> Result<(), Error> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).await.map_err(|e| {
                Error::config(format!(
                    "Failed to create directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }
    }
    Ok(())
}

/// Replace `path` with `contents` so readers see either the old or the new file
pub(crate) async fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), Error> {
    let temp_path = temp_path(path);
    {
        let mut file = fs::File::create(&temp_path).await.map_err(|e| {
            Error::state_store(format!(
                "Failed to create temp file {}: {}",
                temp_path.display(),
                e
            ))
        })?;

        file.write_all(contents).await.map_err(|e| {
            Error::state_store(format!(
                "Failed to write to temp file {}: {}",
                temp_path.display(),
                e
            ))
        })?;

        file.flush().await.map_err(|e| {
            Error::state_store(format!(
                "Failed to flush temp file {}: {}",
                temp_path.display(),
                e
            ))
        })?;

        file.sync_all().await.map_err(|e| {
            Error::state_store(format!(
                "Failed to sync temp file {}: {}",
                temp_path.display(),
                e
            ))
        })?;
    }

    fs::rename(&temp_path, path).await.map_err(|e| {
        Error::state_store(format!(
            "Failed to rename {} to {}: {}",
            temp_path.display(),
            path.display(),
            e
        ))
    })
}

/// Remove a file, treating "already gone" as success
pub(crate) async fn remove_if_exists(path: &Path) -> Result<(), Error> {
    match fs::remove_file(path).await {
        Ok(()) => {
            tracing::debug!("Removed {}", path.display());
            Ok(())
        }
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(Error::state_store(format!(
            "Failed to remove {}: {}",
            path.display(),
            e
        ))),
    }
}
