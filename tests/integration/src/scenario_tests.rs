//! Scenario tests for whole synchronization runs
//!
//! Each test walks through one situation an operator runs into: a first
//! export, a concurrent edit, a reorganised tree, parallel runs.

use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use tagsync_codec::ExportModeRegistry;
use tagsync_core::{
    ConflictKind, DiffOptions, DiffOutcome, Direction, MergePlanner, Operation, SelectionPolicy,
    SyncOptions, SyncOrchestrator, diff,
};
use tagsync_fs::FileTree;
use tagsync_meta::Schema;
use tagsync_test_utils::fixtures::{self, path};
use tagsync_test_utils::{MemoryFileStore, MemoryLiveTree};
use tagsync_tree::{ConfigNode, OrderPolicy, tree_eq};

fn decode(files: &FileTree) -> ConfigNode {
    ExportModeRegistry::with_builtins()
        .get("singleFile")
        .unwrap()
        .decode(files, &Schema::permissive())
        .unwrap()
}

fn summary(records: &[tagsync_core::ChangeRecord]) -> Vec<String> {
    records.iter().map(ToString::to_string).collect()
}

fn line1_with_speed() -> ConfigNode {
    ConfigNode::root()
        .with_child(
            ConfigNode::folder("Line1")
                .with_child(ConfigNode::leaf("Speed").with_property("unit", "rpm"))
                .unwrap(),
        )
        .unwrap()
}

#[tokio::test]
async fn first_export_then_a_deleted_tag() {
    let live = MemoryLiveTree::new("default", line1_with_speed());
    let sync = SyncOrchestrator::builder()
        .live(live.clone())
        .files(MemoryFileStore::new())
        .source_root("exports")
        .build()
        .unwrap();
    let options = DiffOptions::new(OrderPolicy::Ignored);

    let first = diff(&live.snapshot(), &decode(&FileTree::new()), &options);
    assert_eq!(summary(&first), vec!["Add Line1", "Add Line1/Speed"]);
    assert_eq!(first[0].after.as_ref().unwrap().kind(), tagsync_tree::NodeKind::Folder);

    let exported = sync.export("singleFile", &SelectionPolicy::all()).await.unwrap();
    assert!(tree_eq(&decode(&exported), &live.snapshot(), OrderPolicy::Ignored));

    live.edit(|root| {
        root.get_mut(&path("Line1")).unwrap().remove_child("Speed");
    });
    let after_delete = diff(&live.snapshot(), &decode(&exported), &options);
    assert_eq!(summary(&after_delete), vec!["Remove Line1/Speed"]);
}

#[test]
fn a_destination_edited_after_the_diff_is_not_touched() {
    let source = fixtures::line1();
    let mut destination = fixtures::line1();
    destination
        .get_mut(&path("Line1/Temp"))
        .unwrap()
        .set_property("unit", "K");
    let records = diff(&source, &destination, &DiffOptions::new(OrderPolicy::Ignored));
    assert_eq!(summary(&records), vec!["Modify Line1/Temp"]);

    // Someone edits the tag before the plan is validated.
    destination
        .get_mut(&path("Line1/Temp"))
        .unwrap()
        .set_property("unit", "F");
    let result = MergePlanner::new(OrderPolicy::Ignored).plan(records, &SelectionPolicy::all(), &destination);

    assert!(result.steps().is_empty());
    let conflict = result.conflicts().iter().next().unwrap();
    assert_eq!(conflict.kind, ConflictKind::StaleBase);
    assert_eq!(conflict.path, path("Line1/Temp"));
}

#[test]
fn a_relocated_subtree_is_a_single_move() {
    let before = fixtures::plant();
    let mut after = fixtures::plant();
    let spare = after
        .get_mut(&path("Line2"))
        .unwrap()
        .remove_child("Spare")
        .unwrap();
    after
        .get_mut(&path("Line1"))
        .unwrap()
        .add_child(spare)
        .unwrap();

    let records = diff(&after, &before, &DiffOptions::new(OrderPolicy::Ignored));

    assert_eq!(summary(&records), vec!["Move Line2/Spare -> Line1/Spare"]);
    assert_eq!(records[0].operation, Operation::Move);
}

#[tokio::test]
async fn applied_selection_has_nothing_left_to_do() {
    let live = MemoryLiveTree::empty();
    let store = MemoryFileStore::new().with_tree(
        "exports",
        ExportModeRegistry::with_builtins()
            .get("singleFile")
            .unwrap()
            .encode(&fixtures::plant())
            .unwrap(),
    );
    let sync = SyncOrchestrator::builder()
        .live(live.clone())
        .files(store)
        .source_root("exports")
        .build()
        .unwrap();
    let selection = SelectionPolicy::parse(["Line1"]).unwrap();

    let result = sync.import(&selection).await;
    assert!(result.is_success());

    let again = sync.diff_only(Direction::Import, &selection).await.unwrap();
    assert_eq!(again, DiffOutcome::Changes(Vec::new()));
    let rest = sync
        .diff_only(Direction::Import, &SelectionPolicy::all())
        .await
        .unwrap();
    assert!(matches!(rest, DiffOutcome::Changes(records) if !records.is_empty()));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn disjoint_runs_proceed_concurrently() {
    let live = MemoryLiveTree::empty().with_write_delay(Duration::from_millis(5));
    let store = MemoryFileStore::new().with_tree(
        "exports",
        ExportModeRegistry::with_builtins()
            .get("singleFile")
            .unwrap()
            .encode(&fixtures::plant())
            .unwrap(),
    );
    let sync = Arc::new(
        SyncOrchestrator::builder()
            .live(live.clone())
            .files(store)
            .source_root("exports")
            .options(SyncOptions::default())
            .build()
            .unwrap(),
    );

    let line1 = SelectionPolicy::parse(["Line1"]).unwrap();
    let line2 = SelectionPolicy::parse(["Line2"]).unwrap();
    let (first, second) = tokio::join!(sync.import(&line1), sync.import(&line2));

    assert!(first.is_success(), "{first:?}");
    assert!(second.is_success(), "{second:?}");
    let tree = live.snapshot();
    assert!(tree.contains(&path("Line1/Temp")));
    assert!(tree.contains(&path("Line2/M1")));
    assert!(!tree.contains(&path("_types_")));
}
