// # Catalog Model
//
// Typed records for what a snapshot source reports about a repository.
//
// A package is identified by `repo/name`. The same name may legitimately
// exist in two repositories (e.g. `core/foo` and `testing/foo`), so the
// repository is part of the identity.
//
// Records are validated once, when a `Snapshot` is built from a source's
// output. Everything past that boundary can rely on keys being unique and
// matching the record they point at.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::fmt;

use crate::error::{Error, Result};

/// Separator between repository and package name in an identity key
pub const ID_SEPARATOR: char = '/';

/// Stable identity key of a catalog entry (`repo/name`)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PackageId(String);

impl PackageId {
    /// Build an id from its parts
    pub fn new(repo: &str, name: &str) -> Self {
        Self(format!("{repo}{ID_SEPARATOR}{name}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PackageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One entry of the tracked catalog at a point in time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogRecord {
    /// Repository (partition) the package lives in
    pub repo: String,
    /// Package base, if the source reports one
    pub base: Option<String>,
    pub name: String,
    pub arch: String,
    /// Build date reported by the source, seconds since the epoch
    pub build_time: i64,
    pub url: String,
    pub desc: String,
    pub version: String,
}

impl CatalogRecord {
    /// Identity key of this record
    pub fn id(&self) -> PackageId {
        PackageId::new(&self.repo, &self.name)
    }

    /// Check that the record can be keyed unambiguously
    pub fn validate(&self) -> Result<()> {
        if self.repo.is_empty() || self.name.is_empty() {
            return Err(Error::invalid_record(format!(
                "repo and name must be non-empty (repo: {:?}, name: {:?})",
                self.repo, self.name
            )));
        }
        if self.repo.contains(ID_SEPARATOR) || self.name.contains(ID_SEPARATOR) {
            return Err(Error::invalid_record(format!(
                "repo and name must not contain '{ID_SEPARATOR}' (repo: {:?}, name: {:?})",
                self.repo, self.name
            )));
        }
        Ok(())
    }
}

/// Everything in the catalog at one observation instant
///
/// Keys are unique and always equal to `record.id()`. Snapshots coming from
/// a source are built with [`Snapshot::from_records`], which enforces both.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot {
    packages: BTreeMap<PackageId, CatalogRecord>,
}

impl Snapshot {
    /// Create an empty snapshot
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a snapshot from a source's output
    ///
    /// Fails on the first invalid record or duplicate key. Nothing is dropped
    /// or overwritten silently.
    pub fn from_records(records: impl IntoIterator<Item = CatalogRecord>) -> Result<Self> {
        let mut packages = BTreeMap::new();
        for record in records {
            record.validate()?;
            match packages.entry(record.id()) {
                Entry::Occupied(entry) => {
                    return Err(Error::DuplicateKey(entry.key().to_string()));
                }
                Entry::Vacant(entry) => {
                    entry.insert(record);
                }
            }
        }
        Ok(Self { packages })
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    pub fn get(&self, id: &PackageId) -> Option<&CatalogRecord> {
        self.packages.get(id)
    }

    pub fn contains(&self, id: &PackageId) -> bool {
        self.packages.contains_key(id)
    }

    /// Iterate over ids in ascending order
    pub fn ids(&self) -> impl Iterator<Item = &PackageId> {
        self.packages.keys()
    }

    /// Ids present here but not in `other`
    pub fn ids_missing_from<'a>(&'a self, other: &'a Snapshot) -> impl Iterator<Item = &'a PackageId> {
        self.ids().filter(move |id| !other.contains(id))
    }

    /// Find the first entry stored under a key other than its own id
    pub(crate) fn find_misfiled(&self) -> Option<&PackageId> {
        self.packages
            .iter()
            .find(|(id, record)| **id != record.id())
            .map(|(id, _)| id)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn record(repo: &str, name: &str) -> CatalogRecord {
        CatalogRecord {
            repo: repo.to_string(),
            base: None,
            name: name.to_string(),
            arch: "x86_64".to_string(),
            build_time: 1_700_000_000,
            url: format!("https://example.org/{name}"),
            desc: format!("{name} package"),
            version: "1.0-1".to_string(),
        }
    }

    #[test]
    fn test_id_includes_repo() {
        assert_eq!(record("core", "foo").id().as_str(), "core/foo");
        assert_ne!(record("core", "foo").id(), record("extra", "foo").id());
    }

    #[test]
    fn test_from_records_rejects_duplicates() {
        let err = Snapshot::from_records(vec![record("core", "foo"), record("core", "foo")])
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateKey(ref id) if id == "core/foo"));
    }

    #[test]
    fn test_from_records_allows_same_name_in_other_repo() {
        let snapshot =
            Snapshot::from_records(vec![record("core", "foo"), record("testing", "foo")]).unwrap();
        assert_eq!(snapshot.len(), 2);
    }

    #[test]
    fn test_from_records_rejects_invalid() {
        let err = Snapshot::from_records(vec![record("", "foo")]).unwrap_err();
        assert!(matches!(err, Error::InvalidRecord(_)));

        let err = Snapshot::from_records(vec![record("core", "a/b")]).unwrap_err();
        assert!(matches!(err, Error::InvalidRecord(_)));
    }

    #[test]
    fn test_ids_missing_from() {
        let old = Snapshot::from_records(vec![record("core", "a"), record("core", "b")]).unwrap();
        let new = Snapshot::from_records(vec![record("core", "b"), record("core", "c")]).unwrap();

        let gone: Vec<_> = old.ids_missing_from(&new).map(|id| id.to_string()).collect();
        assert_eq!(gone, vec!["core/a"]);

        let fresh: Vec<_> = new.ids_missing_from(&old).map(|id| id.to_string()).collect();
        assert_eq!(fresh, vec!["core/c"]);
    }

    #[test]
    fn test_record_serializes_camel_case() {
        let json = serde_json::to_value(record("core", "foo")).unwrap();
        assert_eq!(json["buildTime"], 1_700_000_000);
        assert_eq!(json["base"], serde_json::Value::Null);
        assert_eq!(json["version"], "1.0-1");
    }
}
