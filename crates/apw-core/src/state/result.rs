// # Result File
//
// The exported view of the database, written next to the state file after
// every update or dismiss. `apw show` only reads this file, so showing
// changes never needs the (much larger) state file or the package manager.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;

use super::file::{ensure_parent_dir, remove_if_exists, temp_path, write_atomic};
use crate::database::ExportedResult;
use crate::Error;

/// Location of the exported result
#[derive(Debug, Clone)]
pub struct ResultFile {
    path: PathBuf,
}

impl ResultFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Atomically replace the result file
    pub async fn write(&self, result: &ExportedResult) -> Result<(), Error> {
        ensure_parent_dir(&self.path).await?;
        let json = serde_json::to_vec_pretty(result)?;
        write_atomic(&self.path, &json).await?;
        tracing::debug!("Result written to {}", self.path.display());
        Ok(())
    }

    /// Read the last exported result
    ///
    /// Returns `Ok(None)` if no result has been written yet.
    pub async fn read(&self) -> Result<Option<ExportedResult>, Error> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        serde_json::from_str(&content).map(Some).map_err(|e| {
            Error::state_corrupt(&self.path, format!("failed to parse result: {}", e))
        })
    }

    /// Delete the result file if present
    pub async fn remove(&self) -> Result<(), Error> {
        remove_if_exists(&self.path).await?;
        remove_if_exists(&temp_path(&self.path)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::tests::record;
    use crate::database::AddedPackage;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_result_file_roundtrip() {
        let dir = tempdir().unwrap();
        let file = ResultFile::new(dir.path().join("apw-result.json"));

        assert!(file.read().await.unwrap().is_none());

        let result = ExportedResult {
            timestamp: 10,
            recent_added_packages: vec![AddedPackage {
                record: record("core", "foo"),
                create_time: 10,
            }],
            recent_removed_packages: vec![],
        };
        file.write(&result).await.unwrap();
        assert_eq!(file.read().await.unwrap(), Some(result));

        file.remove().await.unwrap();
        assert!(!file.path().exists());
        file.remove().await.unwrap();
    }

    #[tokio::test]
    async fn test_result_file_garbage_is_corrupt() {
        let dir = tempdir().unwrap();
        let file = ResultFile::new(dir.path().join("apw-result.json"));
        fs::write(file.path(), b"not json").await.unwrap();

        assert!(matches!(
            file.read().await.unwrap_err(),
            Error::StateCorrupt { .. }
        ));
    }
}
