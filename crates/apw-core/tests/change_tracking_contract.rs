//! Contract Test: Change Tracking Semantics
//!
//! This test verifies how the database classifies snapshot deltas.
//!
//! Constraints verified:
//! - Re-running an update with the same snapshot changes nothing
//! - Every id of the latest snapshot is known, and none of them is freshly removed
//! - Changes are forgotten once they leave the retention window
//! - A package added then removed moves from the added lane to the removed lane
//! - Dismissing clears the change lanes but keeps the baseline
//!
//! If this test fails, users will see wrong or duplicated repo changes.

mod common;

use apw_core::{ChangeDatabase, MemoryStateStore, PackageId, RetentionConfig, Snapshot};
use common::*;

async fn empty_db() -> ChangeDatabase {
    ChangeDatabase::open(Box::new(MemoryStateStore::new()), &RetentionConfig::default())
        .await
        .expect("open succeeds")
}

fn id(name: &str) -> PackageId {
    PackageId::new("core", name)
}

#[tokio::test]
async fn repeated_update_is_a_no_op() {
    let mut db = empty_db().await;

    db.update(core_snapshot(&["a"]), 1000).await.unwrap();
    db.update(core_snapshot(&["a", "b"]), 2000).await.unwrap();
    let added = db.state().recent_added.clone();
    let removed = db.state().recent_removed.clone();

    let summary = db.update(core_snapshot(&["a", "b"]), 3000).await.unwrap();

    assert!(!summary.has_changes());
    assert_eq!(db.state().recent_added, added);
    assert_eq!(db.state().recent_removed, removed);
    assert_eq!(db.state().recent_added[&id("a")].create_time, 1000);
    assert_eq!(db.state().recent_added[&id("b")].create_time, 2000);
}

#[tokio::test]
async fn snapshot_ids_are_known_and_not_freshly_removed() {
    let mut db = empty_db().await;
    db.update(core_snapshot(&["a", "b", "c"]), 100).await.unwrap();

    let snapshot = core_snapshot(&["b", "c", "d"]);
    db.update(snapshot.clone(), 200).await.unwrap();

    for id in snapshot.ids() {
        assert!(db.state().known_packages.contains(id), "{} should be known", id);
        let freshly_removed = db
            .state()
            .recent_removed
            .get(id)
            .is_some_and(|entry| entry.remove_time == 200);
        assert!(!freshly_removed, "{} is both known and freshly removed", id);
    }
    assert_eq!(db.state().recent_removed[&id("a")].remove_time, 200);
}

#[tokio::test]
async fn added_entries_expire_after_retention() {
    let mut db = empty_db().await;
    let t0 = 10_000;

    db.update(core_snapshot(&["a"]), t0).await.unwrap();
    assert!(db.state().recent_added.contains_key(&id("a")));

    // Still present in the catalog, but too old to be "recent".
    db.update(core_snapshot(&["a"]), t0 + RETENTION + 1)
        .await
        .unwrap();
    assert!(db.state().recent_added.is_empty());
    assert!(db.state().known_packages.contains(&id("a")));
}

#[tokio::test]
async fn add_then_remove_moves_between_lanes() {
    let mut db = empty_db().await;

    db.update(core_snapshot(&["k"]), 100).await.unwrap();
    assert_eq!(db.state().recent_added[&id("k")].create_time, 100);

    db.update(Snapshot::new(), 150).await.unwrap();
    assert!(!db.state().recent_added.contains_key(&id("k")));
    let removed = &db.state().recent_removed[&id("k")];
    assert_eq!(removed.remove_time, 150);
    assert_eq!(removed.record, pkg("core", "k"));
}

#[tokio::test]
async fn dismiss_only_clears_change_lanes() {
    let mut db = empty_db().await;
    db.update(core_snapshot(&["a", "b"]), 100).await.unwrap();
    db.update(core_snapshot(&["b", "c"]), 200).await.unwrap();
    let known = db.state().known_packages.clone();

    db.dismiss().await.unwrap();

    assert!(db.state().recent_added.is_empty());
    assert!(db.state().recent_removed.is_empty());
    assert_eq!(db.state().known_packages, known);
    assert_eq!(db.state().timestamp, 200);

    // A dismissed package does not come back on the next update.
    db.update(core_snapshot(&["b", "c"]), 300).await.unwrap();
    assert!(db.export().unwrap().is_empty());
}

#[tokio::test]
async fn end_to_end_add_then_remove_export() {
    let mut db = empty_db().await;

    db.update(
        Snapshot::from_records(vec![pkg("core", "foo")]).unwrap(),
        1000,
    )
    .await
    .unwrap();
    let result = db.export().unwrap();
    assert_eq!(result.recent_added_packages.len(), 1);
    assert_eq!(result.recent_added_packages[0].record.name, "foo");
    assert_eq!(result.recent_added_packages[0].create_time, 1000);
    assert!(result.recent_removed_packages.is_empty());

    db.update(Snapshot::new(), 1001).await.unwrap();
    let result = db.export().unwrap();
    assert!(result.recent_added_packages.is_empty());
    assert_eq!(result.recent_removed_packages.len(), 1);
    assert_eq!(result.recent_removed_packages[0].record.name, "foo");
    assert_eq!(result.recent_removed_packages[0].remove_time, 1001);
    assert_eq!(result.timestamp, 1001);
}

#[tokio::test]
async fn custom_retention_window_is_honored() {
    let mut db = ChangeDatabase::open(
        Box::new(MemoryStateStore::new()),
        &RetentionConfig::from_days(1).unwrap(),
    )
    .await
    .unwrap();
    assert_eq!(db.retention_secs(), DAY);

    db.update(core_snapshot(&["a", "b"]), 0).await.unwrap();
    db.update(core_snapshot(&["b"]), 10).await.unwrap();
    db.update(core_snapshot(&["b"]), 11 + DAY).await.unwrap();

    assert!(db.state().recent_added.is_empty());
    assert!(db.state().recent_removed.is_empty());
}
