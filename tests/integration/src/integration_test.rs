//! End-to-end tests against the local disk
//!
//! These exercise the complete flow: live tree -> diff -> plan -> encode ->
//! `DiskStore`, and back again.

use assert_fs::prelude::*;
use predicates::prelude::*;
use pretty_assertions::assert_eq;
use tagsync_core::{Direction, SelectionPolicy, SyncOptions, SyncOrchestrator};
use tagsync_fs::NormalizedPath;
use tagsync_meta::SyncSettings;
use tagsync_test_utils::fixtures::{self, path};
use tagsync_test_utils::{MemoryLiveTree, TestWorkspace};
use tagsync_tree::{OrderPolicy, tree_eq};

fn on_disk(live: &MemoryLiveTree, root: &assert_fs::TempDir, mode: &str) -> SyncOrchestrator {
    SyncOrchestrator::builder()
        .live(live.clone())
        .source_root(root.path())
        .export_mode(mode)
        .build()
        .unwrap()
}

#[tokio::test(flavor = "multi_thread")]
async fn structured_export_lays_out_one_directory_per_folder() {
    let temp = assert_fs::TempDir::new().unwrap();
    let live = MemoryLiveTree::new("default", fixtures::plant());

    let result = on_disk(&live, &temp, "structuredByType")
        .sync(Direction::Export, &SelectionPolicy::all())
        .await;

    assert!(result.is_success(), "{result:?}");
    temp.child("folder.json").assert(predicate::path::is_file());
    temp.child("Line1/tags.json")
        .assert(predicate::str::contains("\"rpm\""));
    temp.child("Line2/udts.json")
        .assert(predicate::str::contains("\"M1\""));
    temp.child("Line2/Spare/folder.json").assert(predicate::path::is_file());
    temp.child("_types_/Motor/tags.json")
        .assert(predicate::str::contains("\"Amps\""));
}

#[tokio::test(flavor = "multi_thread")]
async fn export_then_import_round_trips_through_disk() {
    let temp = assert_fs::TempDir::new().unwrap();
    let source = MemoryLiveTree::new("default", fixtures::plant());
    on_disk(&source, &temp, "individualFiles")
        .sync(Direction::Export, &SelectionPolicy::all())
        .await;

    let target = MemoryLiveTree::empty();
    let result = on_disk(&target, &temp, "individualFiles")
        .import(&SelectionPolicy::all())
        .await;

    assert!(result.is_success(), "{result:?}");
    assert!(tree_eq(&target.snapshot(), &fixtures::plant(), OrderPolicy::Ignored));
}

#[tokio::test(flavor = "multi_thread")]
async fn removed_tags_are_pruned_but_foreign_files_survive() {
    let temp = assert_fs::TempDir::new().unwrap();
    temp.child("README.md").write_str("# Exported tags\n").unwrap();
    let live = MemoryLiveTree::new("default", fixtures::plant());
    let sync = on_disk(&live, &temp, "structuredByType");
    sync.sync(Direction::Export, &SelectionPolicy::all()).await;
    temp.child("Line2/udts.json").assert(predicate::path::exists());

    live.edit(|root| {
        root.remove_child("Line2");
    });
    let result = sync.sync(Direction::Export, &SelectionPolicy::all()).await;

    assert!(result.is_success(), "{result:?}");
    temp.child("Line2").assert(predicate::path::missing());
    temp.child("README.md").assert("# Exported tags\n");
}

#[tokio::test(flavor = "multi_thread")]
async fn keeping_existing_files_leaves_stale_documents() {
    let temp = assert_fs::TempDir::new().unwrap();
    let live = MemoryLiveTree::new("default", fixtures::plant());
    let options = SyncOptions::default().keeping_existing_files();
    let sync = SyncOrchestrator::builder()
        .live(live.clone())
        .source_root(temp.path())
        .export_mode("structuredByType")
        .options(options)
        .build()
        .unwrap();
    sync.sync(Direction::Export, &SelectionPolicy::all()).await;

    live.edit(|root| {
        root.remove_child("Line2");
    });
    sync.sync(Direction::Export, &SelectionPolicy::all()).await;

    temp.child("Line2/udts.json").assert(predicate::path::exists());
}

#[tokio::test(flavor = "multi_thread")]
async fn settings_entries_drive_runs_relative_to_the_workspace() {
    let workspace = TestWorkspace::new();
    workspace.write_settings(
        "tagsync.toml",
        &[
            ("default", "Line1", "exports/line1", "singleFile"),
            ("default", "Line2", "exports/line2", "structuredByType"),
        ],
    );
    let settings = SyncSettings::load(&workspace.path("tagsync.toml")).unwrap();
    let live = MemoryLiveTree::new("default", fixtures::plant());
    let sync = SyncOrchestrator::builder()
        .live(live.clone())
        .source_root(workspace.path("unused"))
        .workspace_root(NormalizedPath::new(workspace.root()))
        .build()
        .unwrap();

    for entry in settings.for_provider("default") {
        let result = sync.run_entry(entry, Direction::Export).await.unwrap();
        assert!(result.is_success(), "{}: {result:?}", entry.base_tag_path);
    }

    workspace.assert_file_contains("exports/line1/tags.json", "\"Speed\"");
    workspace.assert_file_exists("exports/line2/udts.json");
    workspace.assert_file_not_exists("exports/line1/Line2");

    live.edit(|root| {
        root.get_mut(&path("Line1/Speed"))
            .unwrap()
            .set_property("unit", "m/s");
    });
    let entry = &settings.entries[0];
    let result = sync.run_entry(entry, Direction::Export).await.unwrap();
    assert_eq!(result.applied().len(), 1);
    workspace.assert_file_contains("exports/line1/tags.json", "m/s");
}

#[tokio::test(flavor = "multi_thread")]
async fn a_blocked_file_keeps_the_whole_export_off_disk() {
    let temp = assert_fs::TempDir::new().unwrap();
    let live = MemoryLiveTree::new("default", fixtures::line1());
    let sync = on_disk(&live, &temp, "structuredByType");
    assert!(sync.sync(Direction::Export, &SelectionPolicy::all()).await.is_success());
    temp.child("Line1/folder.json")
        .assert(predicate::str::contains("north"));

    std::fs::remove_file(temp.child("Line1/tags.json").path()).unwrap();
    temp.child("Line1/tags.json/notes.txt").write_str("in the way").unwrap();
    live.edit(|root| {
        root.get_mut(&path("Line1"))
            .unwrap()
            .set_property("area", "south");
    });

    let result = sync.sync(Direction::Export, &SelectionPolicy::all()).await;

    assert!(!result.is_success());
    assert!(result.applied().is_empty(), "{result:?}");
    assert!(!result.failed().is_empty());
    assert!(!result.errors.is_empty());
    temp.child("Line1/folder.json")
        .assert(predicate::str::contains("north"));
    temp.child("Line1/tags.json/notes.txt").assert("in the way");
}
