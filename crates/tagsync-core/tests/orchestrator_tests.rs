use std::time::Duration;

use pretty_assertions::assert_eq;
use rstest::rstest;
use tagsync_codec::ExportModeRegistry;
use tagsync_core::{
    ApplyFailure, ConflictKind, ConflictPolicy, DiffOutcome, Direction, Error, LiveError,
    Operation, SelectionPolicy, SyncOptions, SyncOrchestrator, SyncOutcome,
};
use tagsync_fs::FileTree;
use tagsync_meta::{CollisionPolicy, Schema, SyncEntry};
use tagsync_test_utils::fixtures::{self, path};
use tagsync_test_utils::{LiveCall, MemoryFileStore, MemoryLiveTree};
use tagsync_tree::{ConfigNode, OrderPolicy, PropertyValue, tree_eq};

const ROOT: &str = "exports";

fn orchestrator(live: &MemoryLiveTree, store: &MemoryFileStore, options: SyncOptions) -> SyncOrchestrator {
    SyncOrchestrator::builder()
        .live(live.clone())
        .files(store.clone())
        .source_root(ROOT)
        .options(options)
        .build()
        .unwrap()
}

fn encoded(tree: &ConfigNode, mode: &str) -> FileTree {
    ExportModeRegistry::with_builtins()
        .get(mode)
        .unwrap()
        .encode(tree)
        .unwrap()
}

fn decoded(store: &MemoryFileStore, mode: &str) -> ConfigNode {
    ExportModeRegistry::with_builtins()
        .get(mode)
        .unwrap()
        .decode(&store.tree(ROOT), &Schema::permissive())
        .unwrap()
}

fn store_with(tree: &ConfigNode) -> MemoryFileStore {
    MemoryFileStore::new().with_tree(ROOT, encoded(tree, "singleFile"))
}

fn set(tree: &mut ConfigNode, at: &str, property: &str, value: &str) {
    tree.get_mut(&path(at)).unwrap().set_property(property, value);
}

fn summary(records: impl IntoIterator<Item = impl ToString>) -> Vec<String> {
    records.into_iter().map(|r| r.to_string()).collect()
}

#[tokio::test]
async fn export_writes_a_faithful_file_tree() {
    let live = MemoryLiveTree::new("default", fixtures::plant());
    let store = MemoryFileStore::new();

    let result = orchestrator(&live, &store, SyncOptions::default())
        .sync(Direction::Export, &SelectionPolicy::all())
        .await;

    assert!(result.is_success(), "{result:?}");
    assert_eq!(result.applied().len(), fixtures::plant().node_count() - 1);
    assert!(tree_eq(&decoded(&store, "singleFile"), &fixtures::plant(), OrderPolicy::Ignored));
    assert_eq!(live.mutation_count(), 0);
}

#[tokio::test]
async fn second_export_changes_nothing() {
    let live = MemoryLiveTree::new("default", fixtures::plant());
    let store = MemoryFileStore::new();
    let sync = orchestrator(&live, &store, SyncOptions::default());

    sync.sync(Direction::Export, &SelectionPolicy::all()).await;
    let again = sync.sync(Direction::Export, &SelectionPolicy::all()).await;

    assert!(again.is_success());
    assert!(again.outcomes.is_empty());
    assert_eq!(store.write_count(), 1);
}

#[rstest]
#[case("singleFile")]
#[case("individualFiles")]
#[case("structuredByType")]
#[tokio::test]
async fn import_reproduces_the_file_tree_in_every_mode(#[case] mode: &str) {
    let live = MemoryLiveTree::empty();
    let store = MemoryFileStore::new().with_tree(ROOT, encoded(&fixtures::plant(), mode));
    let sync = SyncOrchestrator::builder()
        .live(live.clone())
        .files(store.clone())
        .source_root(ROOT)
        .export_mode(mode)
        .build()
        .unwrap();

    let result = sync.import(&SelectionPolicy::all()).await;

    assert!(result.is_success(), "{result:?}");
    assert!(tree_eq(&live.snapshot(), &fixtures::plant(), OrderPolicy::Ignored));
    // Type definitions are set up before anything that could use them.
    assert!(result.outcomes[0].record.is_type_definition());

    let again = sync.import(&SelectionPolicy::all()).await;
    assert!(again.outcomes.is_empty());
}

#[tokio::test]
async fn import_moves_relocated_subtrees() {
    let live = MemoryLiveTree::new("default", fixtures::line1());
    let files = ConfigNode::root()
        .with_child(ConfigNode::folder("Area").with_child(fixtures::line1_folder()).unwrap())
        .unwrap();
    let store = store_with(&files);

    let result = orchestrator(&live, &store, SyncOptions::default())
        .import(&SelectionPolicy::all())
        .await;

    assert_eq!(summary(result.applied()), vec!["Add Area", "Move Line1 -> Area/Line1"]);
    assert_eq!(
        live.calls(),
        vec![
            LiveCall::Write(path("Area")),
            LiveCall::Write(path("Area/Line1")),
            LiveCall::Remove(path("Line1")),
        ]
    );
    assert!(tree_eq(&live.snapshot(), &files, OrderPolicy::Ignored));
}

#[tokio::test]
async fn refused_origin_removal_takes_the_move_target_back_out() {
    let live = MemoryLiveTree::new("default", fixtures::line1());
    live.fail_at("Line1", LiveError::permission_denied("Line1"));
    let files = ConfigNode::root()
        .with_child(ConfigNode::folder("Area").with_child(fixtures::line1_folder()).unwrap())
        .unwrap();
    let store = store_with(&files);

    let result = orchestrator(&live, &store, SyncOptions::default())
        .import(&SelectionPolicy::all())
        .await;

    assert_eq!(summary(result.applied()), vec!["Add Area"]);
    let failed = result.failed();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].0.operation, Operation::Move);
    assert_eq!(
        *failed[0].1,
        ApplyFailure::Live(LiveError::permission_denied("Line1"))
    );
    assert_eq!(
        live.calls(),
        vec![
            LiveCall::Write(path("Area")),
            LiveCall::Write(path("Area/Line1")),
            LiveCall::Remove(path("Line1")),
            LiveCall::Remove(path("Area/Line1")),
        ]
    );
    let after = live.snapshot();
    assert!(after.contains(&path("Line1/Speed")));
    assert!(!after.contains(&path("Area/Line1")));
}

#[tokio::test]
async fn a_move_that_cannot_be_undone_names_the_leftover() {
    let live = MemoryLiveTree::new("default", fixtures::line1());
    live.unavailable_after(2);
    let files = ConfigNode::root()
        .with_child(ConfigNode::folder("Area").with_child(fixtures::line1_folder()).unwrap())
        .unwrap();
    let store = store_with(&files);

    let result = orchestrator(&live, &store, SyncOptions::default())
        .import(&SelectionPolicy::all())
        .await;

    assert_eq!(result.outcome, SyncOutcome::Halted);
    let failed = result.failed();
    assert_eq!(failed.len(), 1);
    match failed[0].1 {
        ApplyFailure::Live(LiveError::Incomplete { leftover, source }) => {
            assert_eq!(leftover, "Area/Line1");
            assert!(source.is_fatal());
        }
        other => panic!("expected an incomplete move, got {other}"),
    }
    let after = live.snapshot();
    assert!(after.contains(&path("Line1")));
    assert!(after.contains(&path("Area/Line1")));
}

#[tokio::test]
async fn selection_limits_what_is_applied() {
    let live = MemoryLiveTree::empty();
    let store = store_with(&fixtures::plant());

    let result = orchestrator(&live, &store, SyncOptions::default())
        .import(&SelectionPolicy::parse(["Line1"]).unwrap())
        .await;

    assert_eq!(
        summary(result.applied()),
        vec!["Add Line1", "Add Line1/Speed", "Add Line1/Temp"]
    );
    assert!(!live.snapshot().contains(&path("Line2")));
}

#[tokio::test]
async fn dry_run_reports_without_mutating() {
    let live = MemoryLiveTree::empty();
    let store = store_with(&fixtures::line1());

    let result = orchestrator(&live, &store, SyncOptions::default().dry_run())
        .import(&SelectionPolicy::all())
        .await;

    assert!(result.dry_run);
    assert_eq!(result.skipped().len(), 3);
    assert!(result.applied().is_empty());
    assert_eq!(live.mutation_count(), 0);

    let export = orchestrator(&MemoryLiveTree::new("default", fixtures::line1()), &store, SyncOptions::default().dry_run())
        .sync(Direction::Export, &SelectionPolicy::all())
        .await;
    assert!(export.outcomes.is_empty());
    assert_eq!(store.write_count(), 0);
}

#[tokio::test]
async fn permission_failure_is_recorded_and_the_run_continues() {
    let live = MemoryLiveTree::new("default", fixtures::line1());
    live.fail_at("Line1/Speed", LiveError::permission_denied("Line1/Speed"));
    let mut files = fixtures::line1();
    set(&mut files, "Line1/Speed", "unit", "m/s");
    set(&mut files, "Line1/Temp", "unit", "F");
    let store = store_with(&files);

    let result = orchestrator(&live, &store, SyncOptions::default())
        .import(&SelectionPolicy::all())
        .await;

    assert_eq!(result.outcome, SyncOutcome::Completed);
    assert_eq!(summary(result.applied()), vec!["Modify Line1/Temp"]);
    let failed = result.failed();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].0.path, path("Line1/Speed"));
    assert!(!result.is_success());
}

#[tokio::test]
async fn unavailable_provider_halts_and_leaves_the_rest_selectable() {
    let live = MemoryLiveTree::empty();
    live.unavailable_after(2);
    let store = store_with(&fixtures::plant());

    let result = orchestrator(&live, &store, SyncOptions::default())
        .import(&SelectionPolicy::all())
        .await;

    assert_eq!(result.outcome, SyncOutcome::Halted);
    assert_eq!(result.applied().len(), 2);
    assert_eq!(result.failed().len(), 1);
    assert_eq!(
        result.skipped().len(),
        fixtures::plant().node_count() - 1 - 3
    );

    let retry = result.unapplied_selection();
    assert!(retry.covers(&path("_types_/Motor/Amps")));
    assert!(retry.covers(&path("Line2/M1")));
    assert!(!retry.covers(&path("_types_/Motor")));
}

#[tokio::test]
async fn failed_read_aborts_before_any_change() {
    let live = MemoryLiveTree::new("default", fixtures::line1());
    live.fail_reads(LiveError::unavailable("gateway restarting"));
    let store = MemoryFileStore::new();

    let result = orchestrator(&live, &store, SyncOptions::default())
        .sync(Direction::Export, &SelectionPolicy::all())
        .await;

    assert_eq!(result.outcome, SyncOutcome::Aborted);
    assert!(result.errors[0].is_read_failure());
    assert_eq!(store.write_count(), 0);
}

#[tokio::test]
async fn slow_read_times_out() {
    let live = MemoryLiveTree::new("default", fixtures::line1()).with_read_delay(Duration::from_millis(500));
    let store = MemoryFileStore::new();
    let options = SyncOptions::default().with_read_timeout(Duration::from_millis(20));

    let result = orchestrator(&live, &store, options)
        .import(&SelectionPolicy::all())
        .await;

    assert_eq!(result.outcome, SyncOutcome::Aborted);
    match &result.errors[0] {
        Error::ReadFailure { source, .. } => {
            assert!(matches!(**source, Error::Timeout { .. }), "got: {source}")
        }
        other => panic!("expected a read failure, got {other}"),
    }
}

#[tokio::test]
async fn corrupt_files_abort_with_a_parse_failure() {
    let live = MemoryLiveTree::new("default", fixtures::line1());
    let mut corrupt = FileTree::new();
    corrupt.insert_file("tags.json", "{ not json").unwrap();
    let store = MemoryFileStore::new().with_tree(ROOT, corrupt);

    let result = orchestrator(&live, &store, SyncOptions::default())
        .import(&SelectionPolicy::all())
        .await;

    assert_eq!(result.outcome, SyncOutcome::Aborted);
    let failure = result.errors[0].parse_failure().expect("parse failure");
    assert!(failure.to_string().contains("tags.json"), "got: {failure}");
    assert_eq!(live.mutation_count(), 0);
}

#[tokio::test]
async fn collision_policy_conflicts_block_the_run() {
    let live = MemoryLiveTree::new("default", fixtures::line1());
    let mut files = fixtures::line1();
    set(&mut files, "Line1/Speed", "unit", "m/s");
    files
        .get_mut(&path("Line1"))
        .unwrap()
        .add_child(ConfigNode::leaf("Flow"))
        .unwrap();
    let store = store_with(&files);
    let options = SyncOptions::default().with_collision_policy(CollisionPolicy::Abort);

    let blocked = orchestrator(&live, &store, options.clone())
        .import(&SelectionPolicy::all())
        .await;

    assert_eq!(blocked.outcome, SyncOutcome::Aborted);
    assert_eq!(blocked.conflicts.len(), 1);
    let conflict = blocked.conflicts.iter().next().unwrap();
    assert_eq!(conflict.kind, ConflictKind::Structural);
    assert_eq!(conflict.operation, Operation::Modify);
    assert_eq!(live.mutation_count(), 0);

    let partial = orchestrator(
        &live,
        &store,
        options.with_conflict_policy(ConflictPolicy::ApplyNonConflicting),
    )
    .import(&SelectionPolicy::all())
    .await;

    assert_eq!(summary(partial.applied()), vec!["Add Line1/Flow"]);
    assert_eq!(partial.conflicts.len(), 1);
    assert!(!partial.is_success());
    assert_eq!(
        live.snapshot().get(&path("Line1/Speed")).unwrap().property("unit"),
        Some(&PropertyValue::from("rpm"))
    );
}

#[tokio::test]
async fn export_write_failure_halts_with_nothing_applied() {
    let live = MemoryLiveTree::new("default", fixtures::line1());
    let store = MemoryFileStore::new();
    store.fail_writes("disk full");

    let result = orchestrator(&live, &store, SyncOptions::default())
        .sync(Direction::Export, &SelectionPolicy::all())
        .await;

    assert_eq!(result.outcome, SyncOutcome::Halted);
    assert!(result.applied().is_empty());
    assert_eq!(result.failed().len(), 3);
    assert!(result.errors[0].to_string().contains("disk full"));
}

#[tokio::test]
async fn excluded_type_definitions_survive_export_untouched() {
    let mut live_tree = fixtures::plant();
    set(&mut live_tree, "_types_/Motor/Amps", "unit", "mA");
    set(&mut live_tree, "Line1/Speed", "unit", "m/s");
    let live = MemoryLiveTree::new("default", live_tree);
    let store = store_with(&fixtures::plant());

    let result = orchestrator(&live, &store, SyncOptions::default().excluding_type_definitions())
        .sync(Direction::Export, &SelectionPolicy::all())
        .await;

    assert_eq!(summary(result.applied()), vec!["Modify Line1/Speed"]);
    let files = decoded(&store, "singleFile");
    assert_eq!(
        files.get(&path("_types_/Motor/Amps")).unwrap().property("unit"),
        Some(&PropertyValue::from("A"))
    );
    assert_eq!(
        files.get(&path("Line1/Speed")).unwrap().property("unit"),
        Some(&PropertyValue::from("m/s"))
    );
}

#[tokio::test]
async fn base_path_scopes_both_sides() {
    let live = MemoryLiveTree::new("default", fixtures::plant());
    let store = MemoryFileStore::new();
    let sync = SyncOrchestrator::builder()
        .live(live.clone())
        .files(store.clone())
        .source_root(ROOT)
        .base_path(path("Line1"))
        .build()
        .unwrap();

    let exported = sync.sync(Direction::Export, &SelectionPolicy::all()).await;
    assert!(exported.is_success());
    assert_eq!(
        summary(exported.applied()),
        vec!["Modify ", "Add Speed", "Add Temp"]
    );

    let mut files = decoded(&store, "singleFile");
    files.set_property("area", "south");
    store.clone().with_tree(ROOT, encoded(&files, "singleFile"));

    let imported = sync.import(&SelectionPolicy::all()).await;
    assert_eq!(summary(imported.applied()), vec!["Modify "]);
    assert_eq!(live.calls(), vec![LiveCall::Write(path("Line1"))]);
    assert_eq!(
        live.snapshot().get(&path("Line1")).unwrap().property("area"),
        Some(&PropertyValue::from("south"))
    );
    assert!(live.snapshot().contains(&path("Line1/Speed")));
}

#[tokio::test]
async fn diff_only_previews_without_mutating() {
    let live = MemoryLiveTree::new("default", fixtures::line1());
    let store = MemoryFileStore::new();
    let sync = orchestrator(&live, &store, SyncOptions::default());

    let outcome = sync
        .diff_only(Direction::Export, &SelectionPolicy::all())
        .await
        .unwrap();

    match outcome {
        DiffOutcome::Changes(records) => {
            assert_eq!(
                summary(&records),
                vec!["Add Line1", "Add Line1/Speed", "Add Line1/Temp"]
            );
        }
        other => panic!("expected changes, got {other:?}"),
    }
    assert_eq!(store.write_count(), 0);
}

#[rstest]
#[case("singleFile")]
#[case("individualFiles")]
#[case("structuredByType")]
#[tokio::test]
async fn builtin_modes_verify_faithfully(#[case] mode: &str) {
    let live = MemoryLiveTree::new("default", fixtures::plant());
    let sync = orchestrator(&live, &MemoryFileStore::new(), SyncOptions::default());

    let report = sync.verify(mode).await.unwrap();

    assert!(report.is_faithful(), "{:?}", report.differences);
    assert_eq!(report.nodes, fixtures::plant().node_count());
    assert!(report.files > 0);
}

#[tokio::test]
async fn import_tree_plans_without_applying() {
    let live = MemoryLiveTree::new("default", fixtures::line1());
    let sync = orchestrator(&live, &MemoryFileStore::new(), SyncOptions::default());
    let mut files = fixtures::line1();
    set(&mut files, "Line1/Temp", "unit", "F");

    let plan = sync.import_tree(&files).await.unwrap();

    assert_eq!(summary(plan.records()), vec!["Modify Line1/Temp"]);
    assert!(tree_eq(plan.projected(), &files, OrderPolicy::Ignored));
    assert_eq!(live.mutation_count(), 0);
}

#[tokio::test]
async fn planned_import_applies_through_the_orchestrator() {
    let live = MemoryLiveTree::new("default", fixtures::line1());
    let sync = orchestrator(&live, &MemoryFileStore::new(), SyncOptions::default());
    let mut files = fixtures::line1();
    set(&mut files, "Line1/Temp", "unit", "F");

    let plan = sync.import_tree(&files).await.unwrap();
    let result = sync.apply(plan).await;

    assert!(result.is_success(), "{result:?}");
    assert_eq!(summary(result.applied()), vec!["Modify Line1/Temp"]);
    assert!(tree_eq(&live.snapshot(), &files, OrderPolicy::Ignored));
}

#[tokio::test]
async fn previewed_records_are_checked_against_the_live_tree_again() {
    let live = MemoryLiveTree::new("default", fixtures::line1());
    let mut files = fixtures::line1();
    set(&mut files, "Line1/Temp", "unit", "F");
    let sync = orchestrator(&live, &store_with(&files), SyncOptions::default());

    let records = match sync
        .diff_only(Direction::Import, &SelectionPolicy::all())
        .await
        .unwrap()
    {
        DiffOutcome::Changes(records) => records,
        other => panic!("expected changes, got {other:?}"),
    };
    assert_eq!(summary(&records), vec!["Modify Line1/Temp"]);

    live.edit(|root| {
        set(root, "Line1/Temp", "unit", "K");
    });
    let result = sync.apply_changes(records).await;

    assert_eq!(result.outcome, SyncOutcome::Aborted);
    let conflict = result.conflicts.iter().next().unwrap();
    assert_eq!(conflict.kind, ConflictKind::StaleBase);
    assert_eq!(conflict.path, path("Line1/Temp"));
    assert_eq!(live.mutation_count(), 0);
    assert_eq!(
        live.snapshot().get(&path("Line1/Temp")).unwrap().property("unit"),
        Some(&PropertyValue::from("K"))
    );
    assert!(result.unapplied_selection().covers(&path("Line1/Temp")));
}

#[tokio::test]
async fn export_preview_shows_file_diffs_without_writing() {
    let mut live_tree = fixtures::line1();
    set(&mut live_tree, "Line1/Speed", "unit", "m/s");
    let live = MemoryLiveTree::new("default", live_tree);
    let store = store_with(&fixtures::line1());
    let sync = orchestrator(&live, &store, SyncOptions::default());

    let preview = sync.preview_export(&SelectionPolicy::all()).await.unwrap();

    assert_eq!(preview.changes.changed, vec!["tags.json".to_string()]);
    assert!(preview.changes.added.is_empty());
    assert_eq!(preview.patches.len(), 1);
    assert!(preview.patches[0].contains("rpm"), "{}", preview.patches[0]);
    assert!(preview.patches[0].contains("m/s"), "{}", preview.patches[0]);
    assert_eq!(store.write_count(), 0);

    let exported = sync.export("singleFile", &SelectionPolicy::all()).await.unwrap();
    assert_eq!(preview.checksum, exported.checksum());
    assert!(sync.preview_export(&SelectionPolicy::all()).await.unwrap().is_empty());
}

#[tokio::test]
async fn verify_checksum_follows_the_live_tree() {
    let live = MemoryLiveTree::new("default", fixtures::plant());
    let sync = orchestrator(&live, &MemoryFileStore::new(), SyncOptions::default());

    let first = sync.verify("structuredByType").await.unwrap();
    let second = sync.verify("structuredByType").await.unwrap();
    assert_eq!(first.checksum, second.checksum);
    assert_eq!(
        first.checksum,
        sync.export_tree(&fixtures::plant(), "structuredByType")
            .unwrap()
            .checksum()
    );

    live.edit(|root| {
        set(root, "Line1/Speed", "unit", "m/s");
    });
    assert_ne!(sync.verify("structuredByType").await.unwrap().checksum, first.checksum);
}

#[tokio::test]
async fn export_tree_rejects_unknown_modes() {
    let sync = orchestrator(&MemoryLiveTree::empty(), &MemoryFileStore::new(), SyncOptions::default());

    assert!(sync.export_tree(&fixtures::plant(), "individualFiles").is_ok());
    let err = sync.export_tree(&fixtures::plant(), "xml").unwrap_err();
    assert!(matches!(err, Error::Codec(tagsync_codec::Error::UnknownMode { .. })));
}

#[tokio::test]
async fn run_entry_checks_the_provider() {
    let live = MemoryLiveTree::new("default", fixtures::line1());
    let store = MemoryFileStore::new();
    let sync = orchestrator(&live, &store, SyncOptions::default());

    let wrong = SyncEntry::new("edge", "line1", "structuredByType");
    assert!(matches!(
        sync.run_entry(&wrong, Direction::Export).await,
        Err(Error::ProviderMismatch { .. })
    ));

    let entry = SyncEntry::new("default", "line1", "structuredByType").with_base_tag_path("Line1");
    let result = sync.run_entry(&entry, Direction::Export).await.unwrap();

    assert!(result.is_success(), "{result:?}");
    assert!(store.tree("line1").contains_file("folder.json"));
    assert!(store.tree("line1").contains_file("tags.json"));
}

#[test]
fn building_requires_a_live_adapter_and_a_source_root() {
    let missing_live = SyncOrchestrator::builder().source_root(ROOT).build();
    assert!(matches!(missing_live, Err(Error::MissingComponent { .. })));

    let missing_root = SyncOrchestrator::builder().live(MemoryLiveTree::empty()).build();
    assert!(matches!(missing_root, Err(Error::MissingComponent { .. })));

    let unknown_mode = SyncOrchestrator::builder()
        .live(MemoryLiveTree::empty())
        .source_root(ROOT)
        .export_mode("xml")
        .build();
    assert!(matches!(unknown_mode, Err(Error::Codec(_))));
}
