//! Read view of the database, as written to the result file

use serde::{Deserialize, Serialize};
use std::cmp::Reverse;

use super::DatabaseState;
use crate::catalog::CatalogRecord;
use crate::error::{Error, Result};

/// A recently added package, denormalized for display
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddedPackage {
    #[serde(flatten)]
    pub record: CatalogRecord,
    pub create_time: i64,
}

/// A recently removed package, as it was last seen
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemovedPackage {
    #[serde(flatten)]
    pub record: CatalogRecord,
    pub remove_time: i64,
}

/// Exported result: what changed, newest first
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportedResult {
    /// Instant of the last update
    pub timestamp: i64,
    pub recent_added_packages: Vec<AddedPackage>,
    pub recent_removed_packages: Vec<RemovedPackage>,
}

impl ExportedResult {
    pub(super) fn from_state(state: &DatabaseState) -> Result<Self> {
        let mut added = state
            .recent_added
            .iter()
            .map(|(id, entry)| {
                let record = state.known_packages.get(id).ok_or_else(|| {
                    Error::invariant(format!(
                        "recently added package {id} is missing from the known packages"
                    ))
                })?;
                Ok(AddedPackage {
                    record: record.clone(),
                    create_time: entry.create_time,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let mut removed: Vec<RemovedPackage> = state
            .recent_removed
            .values()
            .map(|entry| RemovedPackage {
                record: entry.record.clone(),
                remove_time: entry.remove_time,
            })
            .collect();

        // Maps iterate in id order and the sorts are stable, so ties stay ordered by id.
        added.sort_by_key(|pkg| Reverse(pkg.create_time));
        removed.sort_by_key(|pkg| Reverse(pkg.remove_time));

        Ok(Self {
            timestamp: state.timestamp,
            recent_added_packages: added,
            recent_removed_packages: removed,
        })
    }

    /// Whether there is anything to show
    pub fn is_empty(&self) -> bool {
        self.recent_added_packages.is_empty() && self.recent_removed_packages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::tests::record;
    use crate::catalog::{PackageId, Snapshot};
    use crate::database::AddedEntry;

    const WINDOW: i64 = 30 * 24 * 3600;

    #[test]
    fn test_export_sorted_newest_first() {
        let mut state = DatabaseState::empty();
        state.apply_snapshot(
            Snapshot::from_records(vec![record("core", "x"), record("core", "y")]).unwrap(),
            100,
            WINDOW,
        );
        state.apply_snapshot(
            Snapshot::from_records(vec![
                record("core", "x"),
                record("core", "y"),
                record("extra", "b"),
                record("extra", "a"),
            ])
            .unwrap(),
            200,
            WINDOW,
        );
        state.apply_snapshot(
            Snapshot::from_records(vec![record("extra", "a"), record("extra", "b")]).unwrap(),
            300,
            WINDOW,
        );

        let result = state.export().unwrap();
        let added: Vec<_> = result
            .recent_added_packages
            .iter()
            .map(|p| (p.record.id().to_string(), p.create_time))
            .collect();
        assert_eq!(
            added,
            vec![("extra/a".to_string(), 200), ("extra/b".to_string(), 200)]
        );

        let removed: Vec<_> = result
            .recent_removed_packages
            .iter()
            .map(|p| p.record.id().to_string())
            .collect();
        assert_eq!(removed, vec!["core/x", "core/y"]);
        assert_eq!(result.timestamp, 300);
    }

    #[test]
    fn test_export_fails_on_dangling_added_id() {
        let mut state = DatabaseState::empty();
        state
            .recent_added
            .insert(PackageId::new("core", "ghost"), AddedEntry { create_time: 1 });

        let err = state.export().unwrap_err();
        assert!(matches!(err, Error::InvariantViolation(ref msg) if msg.contains("core/ghost")));
    }

    #[test]
    fn test_export_json_shape() {
        let mut state = DatabaseState::empty();
        state.apply_snapshot(
            Snapshot::from_records(vec![record("core", "foo")]).unwrap(),
            1000,
            WINDOW,
        );

        let json = serde_json::to_value(state.export().unwrap()).unwrap();
        assert_eq!(json["timestamp"], 1000);
        assert_eq!(json["recentAddedPackages"][0]["name"], "foo");
        assert_eq!(json["recentAddedPackages"][0]["createTime"], 1000);
        assert_eq!(json["recentRemovedPackages"], serde_json::json!([]));
    }
}
