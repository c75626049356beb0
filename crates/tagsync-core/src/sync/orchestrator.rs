//! Sync orchestrator
//!
//! Drives one run end to end: both sides are read in parallel, compared,
//! planned and then applied record by record to the live tree (import) or
//! to the decoded file tree, which is re-encoded and written (export).

use std::sync::Arc;

use tagsync_codec::{Codec, ExportModeRegistry};
use tagsync_fs::{DiskStore, FileTree, FileTreeAdapter, NormalizedPath, WriteOptions};
use tagsync_meta::{CollisionPolicy, Schema, SyncEntry};
use tagsync_tree::{ConfigNode, TYPES_FOLDER, TagPath, TreeEditor};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::{
    ApplyFailure, DiffOutcome, Direction, ExportPreview, RecordOutcome, RecordResult, SyncOptions,
    SyncOutcome, SyncResult, SyncTarget, VerifyReport,
};
use crate::adapter::{LiveError, LiveTreeAdapter};
use crate::diff::{ChangeRecord, DiffOptions, Operation, diff};
use crate::error::TreeSide;
use crate::plan::{ApplyPlan, ConflictPolicy, MergePlanner, PlanResult, SelectionPolicy};
use crate::{Error, Result};

/// Both sides of a run, decoded and ready to compare.
struct Snapshot {
    live: ConfigNode,
    files: ConfigNode,
    /// File tree as listed, before decoding
    stored: FileTree,
    codec: Arc<dyn Codec>,
    /// File-side type definitions held out of an excluding run
    stashed_types: Option<ConfigNode>,
}

impl Snapshot {
    fn sides(&self, direction: Direction) -> (&ConfigNode, &ConfigNode) {
        match direction {
            Direction::Export => (&self.live, &self.files),
            Direction::Import => (&self.files, &self.live),
        }
    }
}

/// Synchronizes one live provider subtree with its file representation.
///
/// Built with [`SyncOrchestrator::builder`]. All methods take `&self`, so
/// independent runs with disjoint selections can proceed concurrently on
/// one orchestrator; no run locks out another.
pub struct SyncOrchestrator {
    live: Arc<dyn LiveTreeAdapter>,
    files: Arc<dyn FileTreeAdapter>,
    registry: ExportModeRegistry,
    schema: Arc<Schema>,
    options: SyncOptions,
    target: SyncTarget,
    workspace_root: Option<NormalizedPath>,
}

impl SyncOrchestrator {
    pub fn builder() -> SyncOrchestratorBuilder {
        SyncOrchestratorBuilder::default()
    }

    pub fn options(&self) -> &SyncOptions {
        &self.options
    }

    pub fn target(&self) -> &SyncTarget {
        &self.target
    }

    pub fn registry(&self) -> &ExportModeRegistry {
        &self.registry
    }

    /// Encode `live_root` in `mode`, without touching any adapter.
    pub fn export_tree(&self, live_root: &ConfigNode, mode: &str) -> Result<FileTree> {
        let codec = self.registry.get(mode)?;
        let mut root = live_root.clone();
        if self.options.exclude_type_definitions {
            root.remove_child(TYPES_FOLDER);
        }
        Ok(codec.encode(&root)?)
    }

    /// Plan bringing the live tree in line with `file_root`.
    ///
    /// Conflicts are returned as [`Error::Conflicts`] unless the options
    /// allow applying the non-conflicting rest.
    pub async fn import_tree(&self, file_root: &ConfigNode) -> Result<ApplyPlan> {
        let codec = self.registry.get(&self.target.mode)?;
        let mut live = self.read_live(&self.target.base_path, &self.options).await?;
        let mut source = file_root.clone();
        if self.options.exclude_type_definitions && self.target.base_path.is_root() {
            live.remove_child(TYPES_FOLDER);
            source.remove_child(TYPES_FOLDER);
        }

        let changes = diff(&source, &live, &self.diff_options(codec.as_ref(), &self.options));
        self.planner(codec.as_ref(), Direction::Import, &self.options)
            .plan(changes, &SelectionPolicy::all(), &live)
            .into_executable(self.options.conflict_policy)
            .map_err(Error::Conflicts)
    }

    /// Apply a plan from [`import_tree`](Self::import_tree).
    ///
    /// See [`apply_changes`](Self::apply_changes).
    pub async fn apply(&self, plan: ApplyPlan) -> SyncResult {
        self.apply_changes(plan.into_records()).await
    }

    /// Apply previously computed import records to the live tree.
    ///
    /// The live tree is read again and every record is validated against
    /// it first, so a destination that changed since the records were
    /// computed turns into conflicts instead of being overwritten.
    #[instrument(skip(self, records), fields(run = %Uuid::new_v4(), records = records.len()))]
    pub async fn apply_changes(&self, records: Vec<ChangeRecord>) -> SyncResult {
        let direction = Direction::Import;
        let selection =
            SelectionPolicy::prefixes(records.iter().flat_map(|r| r.touched_paths().cloned()));

        let codec = match self.registry.get(&self.target.mode) {
            Ok(codec) => codec,
            Err(err) => return SyncResult::aborted(direction, &selection, err.into()),
        };
        let mut live = match self.read_live(&self.target.base_path, &self.options).await {
            Ok(live) => live,
            Err(err) => {
                warn!(error = %err, "Apply aborted before any change");
                return SyncResult::aborted(direction, &selection, err);
            }
        };
        if self.options.exclude_type_definitions && self.target.base_path.is_root() {
            live.remove_child(TYPES_FOLDER);
        }

        let result = self
            .planner(codec.as_ref(), direction, &self.options)
            .plan(records, &SelectionPolicy::all(), &live);
        let conflicts = result.conflicts().clone();
        let plan = match result.into_executable(self.options.conflict_policy) {
            Ok(plan) => plan,
            Err(report) => {
                warn!(conflicts = report.len(), "Live tree changed since the records were planned");
                return SyncResult::blocked(direction, &selection, report);
            }
        };

        let outcomes = self
            .apply_live(&self.target.base_path, plan, &self.options)
            .await;
        let result = SyncResult::finished(
            direction,
            &selection,
            outcomes,
            conflicts,
            Vec::new(),
            self.options.dry_run,
        );
        info!(
            outcome = ?result.outcome,
            applied = result.applied().len(),
            failed = result.failed().len(),
            conflicts = result.conflicts.len(),
            "Applied planned records"
        );
        result
    }

    /// Run in `direction` for the configured target.
    pub async fn sync(&self, direction: Direction, selection: &SelectionPolicy) -> SyncResult {
        self.execute(&self.target, &self.options, direction, selection)
            .await
            .0
    }

    /// Export the selected changes in `mode` and return the file tree that
    /// now represents the live subtree.
    pub async fn export(&self, mode: &str, selection: &SelectionPolicy) -> Result<FileTree> {
        let target = self.target.with_mode(mode);
        let (result, files) = self
            .execute(&target, &self.options, Direction::Export, selection)
            .await;
        match (result.outcome, files) {
            (SyncOutcome::Completed, Some(files)) => Ok(files),
            _ => Err(result
                .into_error()
                .unwrap_or_else(|| Error::missing("encoded file tree"))),
        }
    }

    /// Import the selected changes into the live tree.
    pub async fn import(&self, selection: &SelectionPolicy) -> SyncResult {
        self.sync(Direction::Import, selection).await
    }

    /// The records a run in `direction` would apply, or the conflicts that
    /// would block it. Nothing is mutated.
    pub async fn diff_only(
        &self,
        direction: Direction,
        selection: &SelectionPolicy,
    ) -> Result<DiffOutcome> {
        let snapshot = self.read_both(&self.target, &self.options).await?;
        let result = self.plan(&snapshot, &self.options, direction, selection);
        match self.options.conflict_policy {
            ConflictPolicy::Abort if result.has_conflicts() => {
                Ok(DiffOutcome::Conflicts(result.conflicts().clone()))
            }
            _ => Ok(DiffOutcome::Changes(result.steps().to_vec())),
        }
    }

    /// Files an export of the selection would add, change or remove under
    /// the source root, each with a unified diff. Nothing is written.
    pub async fn preview_export(&self, selection: &SelectionPolicy) -> Result<ExportPreview> {
        let snapshot = self.read_both(&self.target, &self.options).await?;
        let plan = self
            .plan(&snapshot, &self.options, Direction::Export, selection)
            .into_executable(self.options.conflict_policy)
            .map_err(Error::Conflicts)?;
        if plan.is_empty() {
            return Ok(ExportPreview::unchanged(&snapshot.stored));
        }

        let options = self.options.clone().dry_run();
        let (_, errors, encoded) = self
            .apply_files(&self.target, &snapshot, plan, &options)
            .await;
        let Some(encoded) = encoded else {
            return Err(errors
                .into_iter()
                .next()
                .unwrap_or_else(|| Error::missing("encoded file tree")));
        };

        let mut changes = snapshot.stored.diff(&encoded);
        if !self.options.delete_existing {
            changes.removed.clear();
        }
        let patches = changes
            .added
            .iter()
            .chain(&changes.changed)
            .chain(&changes.removed)
            .filter_map(|path| snapshot.stored.unified_diff(&encoded, path))
            .collect();
        debug!(
            added = changes.added.len(),
            changed = changes.changed.len(),
            removed = changes.removed.len(),
            "Previewed export"
        );
        Ok(ExportPreview {
            changes,
            patches,
            checksum: encoded.checksum(),
        })
    }

    /// Round-trip the live subtree through `mode` and report what does not
    /// survive.
    #[instrument(skip(self))]
    pub async fn verify(&self, mode: &str) -> Result<VerifyReport> {
        let codec = self.registry.get(mode)?;
        let mut live = self.read_live(&self.target.base_path, &self.options).await?;
        if self.options.exclude_type_definitions && self.target.base_path.is_root() {
            live.remove_child(TYPES_FOLDER);
        }

        let files = codec.encode(&live)?;
        let decoded = codec.decode(&files, &self.schema)?;
        let differences = diff(
            &live,
            &decoded,
            &DiffOptions::new(codec.order_policy()).without_moves(),
        );

        let report = VerifyReport {
            mode: mode.to_string(),
            nodes: live.node_count(),
            files: files.len(),
            checksum: files.checksum(),
            differences,
        };
        info!(
            mode,
            nodes = report.nodes,
            files = report.files,
            faithful = report.is_faithful(),
            "Verified export mode"
        );
        Ok(report)
    }

    /// Run one settings-document entry in `direction`.
    ///
    /// The entry supplies the target and overrides the collision policy,
    /// type-definition exclusion and pruning for this run.
    pub async fn run_entry(&self, entry: &SyncEntry, direction: Direction) -> Result<SyncResult> {
        if entry.provider != self.live.provider() {
            return Err(Error::ProviderMismatch {
                requested: entry.provider.clone(),
                served: self.live.provider().to_string(),
            });
        }
        let target = SyncTarget::from_entry(entry, self.workspace_root.as_ref())?;
        self.registry.get(&target.mode)?;
        let options = self.options.for_entry(entry);

        let selection = SelectionPolicy::all();
        Ok(self.execute(&target, &options, direction, &selection).await.0)
    }

    #[instrument(
        skip(self, options, selection),
        fields(run = %Uuid::new_v4(), mode = %target.mode, base = %target.base_path)
    )]
    async fn execute(
        &self,
        target: &SyncTarget,
        options: &SyncOptions,
        direction: Direction,
        selection: &SelectionPolicy,
    ) -> (SyncResult, Option<FileTree>) {
        info!(%direction, dry_run = options.dry_run, "Sync run started");

        let snapshot = match self.read_both(target, options).await {
            Ok(snapshot) => snapshot,
            Err(err) => {
                warn!(error = %err, "Sync run aborted before any change");
                return (SyncResult::aborted(direction, selection, err), None);
            }
        };

        let result = self.plan(&snapshot, options, direction, selection);
        let conflicts = result.conflicts().clone();
        let plan = match result.into_executable(options.conflict_policy) {
            Ok(plan) => plan,
            Err(report) => {
                warn!(conflicts = report.len(), "Sync run blocked by conflicts");
                return (SyncResult::blocked(direction, selection, report), None);
            }
        };

        let (outcomes, errors, files) = match direction {
            Direction::Import => {
                let outcomes = self.apply_live(&target.base_path, plan, options).await;
                (outcomes, Vec::new(), None)
            }
            Direction::Export => self.apply_files(target, &snapshot, plan, options).await,
        };

        let result = SyncResult::finished(
            direction,
            selection,
            outcomes,
            conflicts,
            errors,
            options.dry_run,
        );
        info!(
            %direction,
            outcome = ?result.outcome,
            applied = result.applied().len(),
            failed = result.failed().len(),
            skipped = result.skipped().len(),
            conflicts = result.conflicts.len(),
            "Sync run finished"
        );
        (result, files)
    }

    async fn read_live(&self, base_path: &TagPath, options: &SyncOptions) -> Result<ConfigNode> {
        joined(spawn_live_read(
            Arc::clone(&self.live),
            base_path.clone(),
            options,
        ))
        .await
    }

    /// Read the live subtree and the file tree concurrently.
    async fn read_both(&self, target: &SyncTarget, options: &SyncOptions) -> Result<Snapshot> {
        let codec = self.registry.get(&target.mode)?;

        let live_task = spawn_live_read(Arc::clone(&self.live), target.base_path.clone(), options);
        let file_task = {
            let adapter = Arc::clone(&self.files);
            let codec = Arc::clone(&codec);
            let schema = Arc::clone(&self.schema);
            let root = target.source_root.clone();
            let limit = options.read_timeout;
            tokio::spawn(async move {
                let tree = match timeout(limit, adapter.list_files(&root)).await {
                    Ok(Ok(tree)) => tree,
                    Ok(Err(err)) => return Err(Error::read(TreeSide::Files, err)),
                    Err(_) => {
                        return Err(Error::read(
                            TreeSide::Files,
                            Error::timeout(format!("listing files under '{root}'"), limit),
                        ));
                    }
                };
                debug!(files = tree.len(), root = %root, "Read file tree");
                let decoded = codec
                    .decode(&tree, &schema)
                    .map_err(|err| Error::read(TreeSide::Files, err))?;
                Ok((tree, decoded))
            })
        };

        let (mut live, (stored, mut files)) =
            tokio::try_join!(joined(live_task), joined(file_task))?;

        let mut stashed_types = None;
        if options.exclude_type_definitions && target.base_path.is_root() {
            live.remove_child(TYPES_FOLDER);
            stashed_types = files.remove_child(TYPES_FOLDER);
        }
        debug!(
            live_nodes = live.node_count(),
            file_nodes = files.node_count(),
            "Read both sides"
        );

        Ok(Snapshot {
            live,
            files,
            stored,
            codec,
            stashed_types,
        })
    }

    fn diff_options(&self, codec: &dyn Codec, options: &SyncOptions) -> DiffOptions {
        let diff_options = DiffOptions::new(codec.order_policy());
        if options.detect_moves {
            diff_options
        } else {
            diff_options.without_moves()
        }
    }

    fn planner(&self, codec: &dyn Codec, direction: Direction, options: &SyncOptions) -> MergePlanner {
        let collision = match direction {
            Direction::Import => options.collision_policy,
            Direction::Export => CollisionPolicy::DeleteAndReplace,
        };
        MergePlanner::new(codec.order_policy()).with_collision_policy(collision)
    }

    fn plan(
        &self,
        snapshot: &Snapshot,
        options: &SyncOptions,
        direction: Direction,
        selection: &SelectionPolicy,
    ) -> PlanResult {
        let codec = snapshot.codec.as_ref();
        let (source, destination) = snapshot.sides(direction);
        let changes = diff(source, destination, &self.diff_options(codec, options));
        self.planner(codec, direction, options)
            .plan(changes, selection, destination)
    }

    /// Apply `plan` to the live tree, one record at a time.
    async fn apply_live(
        &self,
        base_path: &TagPath,
        plan: ApplyPlan,
        options: &SyncOptions,
    ) -> Vec<RecordResult> {
        let mut outcomes = Vec::with_capacity(plan.len());
        let mut halted = false;

        for record in plan.into_records() {
            let outcome = if halted || options.dry_run {
                RecordOutcome::Skipped
            } else {
                let absolute = record.rebased(base_path);
                match timeout(options.apply_timeout, apply_to_live(self.live.as_ref(), &absolute)).await {
                    Ok(Ok(())) => RecordOutcome::Applied,
                    Ok(Err(err)) => {
                        let failure = ApplyFailure::from(err);
                        halted = failure.is_destination_fatal();
                        warn!(record = %record, error = %failure, halted, "Record failed");
                        RecordOutcome::Failed(failure)
                    }
                    Err(_) => {
                        warn!(record = %record, "Record timed out");
                        RecordOutcome::Failed(ApplyFailure::Timeout(options.apply_timeout))
                    }
                }
            };
            outcomes.push(RecordResult { record, outcome });
        }
        outcomes
    }

    /// Apply `plan` to the decoded file tree, re-encode and write it.
    ///
    /// Returns the encoded tree even when nothing needed writing.
    async fn apply_files(
        &self,
        target: &SyncTarget,
        snapshot: &Snapshot,
        plan: ApplyPlan,
        options: &SyncOptions,
    ) -> (Vec<RecordResult>, Vec<Error>, Option<FileTree>) {
        let mut editor = TreeEditor::new(&snapshot.files);
        let mut outcomes: Vec<RecordResult> = plan
            .into_records()
            .into_iter()
            .map(|record| {
                let outcome = match record.to_edit() {
                    Some(edit) => match editor.apply(&edit) {
                        Ok(()) => RecordOutcome::Applied,
                        Err(err) => RecordOutcome::Failed(ApplyFailure::Rejected(err.to_string())),
                    },
                    None => RecordOutcome::Failed(ApplyFailure::Rejected(
                        "record lacks the snapshot its operation needs".into(),
                    )),
                };
                RecordResult { record, outcome }
            })
            .collect();
        let changed = outcomes.iter().any(|r| r.outcome == RecordOutcome::Applied);

        let mut tree = editor.finish().renamed(snapshot.live.name());
        if let Some(types) = &snapshot.stashed_types {
            // Existing type-definition files stay as they are.
            if let Err(err) = tree.add_child(types.clone()) {
                warn!(error = %err, "Could not restore excluded type definitions");
            }
        }

        let encoded = match snapshot.codec.encode(&tree) {
            Ok(encoded) => encoded,
            Err(err) => {
                let err = Error::from(err);
                fail_all(&mut outcomes, &err);
                return (outcomes, vec![err], None);
            }
        };

        if options.dry_run {
            for result in &mut outcomes {
                result.outcome = RecordOutcome::Skipped;
            }
            return (outcomes, Vec::new(), Some(encoded));
        }
        if !changed {
            debug!("No file changes to write");
            return (outcomes, Vec::new(), Some(encoded));
        }

        let write_options = WriteOptions {
            delete_existing: options.delete_existing,
        };
        let written = timeout(
            options.apply_timeout,
            self.files
                .write_files(&target.source_root, &encoded, write_options),
        )
        .await;
        let failure = match written {
            Ok(Ok(summary)) => {
                info!(
                    written = summary.written.len(),
                    unchanged = summary.unchanged,
                    removed = summary.removed.len(),
                    root = %target.source_root,
                    "Wrote file tree"
                );
                return (outcomes, Vec::new(), Some(encoded));
            }
            Ok(Err(err)) => Error::from(err),
            Err(_) => Error::timeout(
                format!("writing files under '{}'", target.source_root),
                options.apply_timeout,
            ),
        };
        warn!(error = %failure, "File write failed, no record took effect");
        fail_all(&mut outcomes, &failure);
        (outcomes, vec![failure], None)
    }
}

/// Mark every applied record of an export as failed by `err`.
fn fail_all(outcomes: &mut [RecordResult], err: &Error) {
    for result in outcomes {
        if result.outcome == RecordOutcome::Applied {
            result.outcome = RecordOutcome::Failed(ApplyFailure::Write(err.to_string()));
        }
    }
}

fn spawn_live_read(
    live: Arc<dyn LiveTreeAdapter>,
    path: TagPath,
    options: &SyncOptions,
) -> JoinHandle<Result<ConfigNode>> {
    let limit = options.read_timeout;
    tokio::spawn(async move {
        match timeout(limit, live.read_subtree(&path)).await {
            Ok(Ok(node)) => {
                debug!(nodes = node.node_count(), path = %path, "Read live subtree");
                Ok(node)
            }
            Ok(Err(err)) => Err(Error::read(TreeSide::Live, err)),
            Err(_) => Err(Error::read(
                TreeSide::Live,
                Error::timeout(format!("reading live subtree '{path}'"), limit),
            )),
        }
    })
}

async fn joined<T>(handle: JoinHandle<Result<T>>) -> Result<T> {
    handle.await.map_err(|err| Error::TaskFailed {
        message: err.to_string(),
    })?
}

/// Carry out one record on the live tree. Paths are absolute.
async fn apply_to_live(
    live: &dyn LiveTreeAdapter,
    record: &ChangeRecord,
) -> std::result::Result<(), LiveError> {
    let missing = || LiveError::type_conflict(&record.path, "record lacks the snapshot it needs");
    match record.operation {
        Operation::Add | Operation::Modify => {
            let node = record.after.as_ref().ok_or_else(missing)?.detached();
            live.write_node(&record.path, &node).await
        }
        Operation::Remove => live.remove_node(&record.path).await,
        Operation::Move => {
            let origin = record.origin.as_ref().ok_or_else(missing)?;
            let subtree = record.after.as_ref().ok_or_else(missing)?;
            live.write_node(&record.path, subtree).await?;
            if let Err(err) = live.remove_node(origin).await {
                // Take the copy back out so the subtree is not duplicated.
                return match live.remove_node(&record.path).await {
                    Ok(()) => Err(err),
                    Err(undo) => {
                        warn!(leftover = %record.path, error = %undo, "Could not undo move target");
                        Err(LiveError::incomplete(&record.path, err))
                    }
                };
            }
            Ok(())
        }
    }
}

/// Builder for [`SyncOrchestrator`]
pub struct SyncOrchestratorBuilder {
    live: Option<Arc<dyn LiveTreeAdapter>>,
    files: Option<Arc<dyn FileTreeAdapter>>,
    registry: Option<ExportModeRegistry>,
    schema: Option<Schema>,
    options: SyncOptions,
    base_path: TagPath,
    source_root: Option<NormalizedPath>,
    mode: String,
    workspace_root: Option<NormalizedPath>,
}

impl Default for SyncOrchestratorBuilder {
    fn default() -> Self {
        Self {
            live: None,
            files: None,
            registry: None,
            schema: None,
            options: SyncOptions::default(),
            base_path: TagPath::root(),
            source_root: None,
            mode: "singleFile".to_string(),
            workspace_root: None,
        }
    }
}

impl SyncOrchestratorBuilder {
    pub fn live(self, adapter: impl LiveTreeAdapter + 'static) -> Self {
        self.live_adapter(Arc::new(adapter))
    }

    pub fn live_adapter(mut self, adapter: Arc<dyn LiveTreeAdapter>) -> Self {
        self.live = Some(adapter);
        self
    }

    /// File adapter; defaults to a [`DiskStore`].
    pub fn files(self, adapter: impl FileTreeAdapter + 'static) -> Self {
        self.file_adapter(Arc::new(adapter))
    }

    pub fn file_adapter(mut self, adapter: Arc<dyn FileTreeAdapter>) -> Self {
        self.files = Some(adapter);
        self
    }

    /// Codec registry; defaults to the built-in modes.
    pub fn registry(mut self, registry: ExportModeRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Property schema used when decoding files; defaults to permissive.
    pub fn schema(mut self, schema: Schema) -> Self {
        self.schema = Some(schema);
        self
    }

    pub fn options(mut self, options: SyncOptions) -> Self {
        self.options = options;
        self
    }

    pub fn base_path(mut self, base_path: TagPath) -> Self {
        self.base_path = base_path;
        self
    }

    pub fn source_root(mut self, root: impl Into<NormalizedPath>) -> Self {
        self.source_root = Some(root.into());
        self
    }

    pub fn export_mode(mut self, mode: impl Into<String>) -> Self {
        self.mode = mode.into();
        self
    }

    /// Directory that relative settings-entry source paths resolve against.
    pub fn workspace_root(mut self, root: impl Into<NormalizedPath>) -> Self {
        self.workspace_root = Some(root.into());
        self
    }

    pub fn build(self) -> Result<SyncOrchestrator> {
        let live = self.live.ok_or_else(|| Error::missing("live tree adapter"))?;
        let source_root = self.source_root.ok_or_else(|| Error::missing("source root"))?;
        let registry = self.registry.unwrap_or_else(ExportModeRegistry::with_builtins);
        registry.get(&self.mode)?;

        debug!(provider = live.provider(), mode = %self.mode, root = %source_root, "Built sync orchestrator");
        Ok(SyncOrchestrator {
            live,
            files: self
                .files
                .unwrap_or_else(|| Arc::new(DiskStore::new()) as Arc<dyn FileTreeAdapter>),
            registry,
            schema: Arc::new(self.schema.unwrap_or_else(Schema::permissive)),
            options: self.options,
            target: SyncTarget {
                base_path: self.base_path,
                source_root,
                mode: self.mode,
            },
            workspace_root: self.workspace_root,
        })
    }
}
