//! Reports produced by orchestrator runs

use std::time::Duration;

use tagsync_fs::{FileTree, FileTreeDiff};
use tagsync_tree::TagPath;

use super::Direction;
use crate::adapter::LiveError;
use crate::diff::ChangeRecord;
use crate::plan::{ConflictReport, SelectionPolicy};
use crate::Error;

/// Why one record could not be applied.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ApplyFailure {
    #[error(transparent)]
    Live(#[from] LiveError),

    #[error("Apply timed out after {0:?}")]
    Timeout(Duration),

    /// The in-memory file tree refused the edit.
    #[error("Edit rejected: {0}")]
    Rejected(String),

    /// Encoding or writing the file tree failed; applies to the whole run.
    #[error("Writing files failed: {0}")]
    Write(String),
}

impl ApplyFailure {
    /// Whether the destination as a whole is out of reach, so nothing
    /// after this record can succeed either.
    pub fn is_destination_fatal(&self) -> bool {
        match self {
            ApplyFailure::Live(err) => err.is_fatal(),
            ApplyFailure::Write(_) => true,
            ApplyFailure::Timeout(_) | ApplyFailure::Rejected(_) => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RecordOutcome {
    Applied,
    Failed(ApplyFailure),
    /// Not attempted: dry run, or an earlier destination-fatal failure.
    Skipped,
}

/// A planned record and what became of it.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordResult {
    pub record: ChangeRecord,
    pub outcome: RecordOutcome,
}

/// How far a run got.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyncOutcome {
    /// Nothing was applied: a read failed or conflicts blocked the plan.
    Aborted,
    /// Every record was attempted.
    Completed,
    /// A destination-fatal failure stopped the run; later records were
    /// skipped.
    Halted,
}

/// Report from a sync run
///
/// Record paths are relative to the run's base path.
#[derive(Debug)]
pub struct SyncResult {
    pub direction: Direction,
    pub outcome: SyncOutcome,
    /// Every planned record in apply order, with its outcome
    pub outcomes: Vec<RecordResult>,
    pub conflicts: ConflictReport,
    /// Run-level errors: the read failure behind an abort, or the write
    /// failure behind a halted export
    pub errors: Vec<Error>,
    pub dry_run: bool,
    selection: SelectionPolicy,
}

impl SyncResult {
    pub(crate) fn aborted(direction: Direction, selection: &SelectionPolicy, error: Error) -> Self {
        Self {
            direction,
            outcome: SyncOutcome::Aborted,
            outcomes: Vec::new(),
            conflicts: ConflictReport::new(),
            errors: vec![error],
            dry_run: false,
            selection: selection.clone(),
        }
    }

    pub(crate) fn blocked(
        direction: Direction,
        selection: &SelectionPolicy,
        conflicts: ConflictReport,
    ) -> Self {
        Self {
            direction,
            outcome: SyncOutcome::Aborted,
            outcomes: Vec::new(),
            conflicts,
            errors: Vec::new(),
            dry_run: false,
            selection: selection.clone(),
        }
    }

    pub(crate) fn finished(
        direction: Direction,
        selection: &SelectionPolicy,
        outcomes: Vec<RecordResult>,
        conflicts: ConflictReport,
        errors: Vec<Error>,
        dry_run: bool,
    ) -> Self {
        let halted = outcomes.iter().any(|r| {
            matches!(&r.outcome, RecordOutcome::Failed(failure) if failure.is_destination_fatal())
        });
        Self {
            direction,
            outcome: if halted {
                SyncOutcome::Halted
            } else {
                SyncOutcome::Completed
            },
            outcomes,
            conflicts,
            errors,
            dry_run,
            selection: selection.clone(),
        }
    }

    pub fn applied(&self) -> Vec<&ChangeRecord> {
        self.outcomes
            .iter()
            .filter(|r| r.outcome == RecordOutcome::Applied)
            .map(|r| &r.record)
            .collect()
    }

    pub fn failed(&self) -> Vec<(&ChangeRecord, &ApplyFailure)> {
        self.outcomes
            .iter()
            .filter_map(|r| match &r.outcome {
                RecordOutcome::Failed(failure) => Some((&r.record, failure)),
                _ => None,
            })
            .collect()
    }

    pub fn skipped(&self) -> Vec<&ChangeRecord> {
        self.outcomes
            .iter()
            .filter(|r| r.outcome == RecordOutcome::Skipped)
            .map(|r| &r.record)
            .collect()
    }

    /// Ran to completion with nothing failed, conflicting or erroring.
    pub fn is_success(&self) -> bool {
        self.outcome == SyncOutcome::Completed
            && self.conflicts.is_empty()
            && self.errors.is_empty()
            && self.failed().is_empty()
    }

    /// Selection that re-runs whatever this run did not apply.
    ///
    /// An aborted run returns its original selection; otherwise the result
    /// covers failed, skipped and conflicting paths (both ends of a Move).
    pub fn unapplied_selection(&self) -> SelectionPolicy {
        if self.outcome == SyncOutcome::Aborted && self.conflicts.is_empty() {
            return self.selection.clone();
        }
        let pending = self
            .outcomes
            .iter()
            .filter(|r| r.outcome != RecordOutcome::Applied)
            .flat_map(|r| r.record.touched_paths().cloned())
            .chain(self.conflicts.paths().cloned());
        SelectionPolicy::prefixes(pending)
    }

    /// The error that best explains a run that did not complete.
    pub fn into_error(self) -> Option<Error> {
        if !self.conflicts.is_empty() && self.outcome == SyncOutcome::Aborted {
            return Some(Error::Conflicts(self.conflicts));
        }
        self.errors.into_iter().next()
    }
}

/// Result of [`diff_only`](super::SyncOrchestrator::diff_only).
#[derive(Debug, Clone, PartialEq)]
pub enum DiffOutcome {
    /// The validated records a run would apply
    Changes(Vec<ChangeRecord>),
    /// What would block the run
    Conflicts(ConflictReport),
}

/// What an export would do to the stored files, from
/// [`preview_export`](super::SyncOrchestrator::preview_export).
#[derive(Debug, Clone, PartialEq)]
pub struct ExportPreview {
    /// Paths the export would add, change or remove
    pub changes: FileTreeDiff,
    /// One unified diff per affected file: added, then changed, then removed
    pub patches: Vec<String>,
    /// Fingerprint of the encoded tree the export would write
    pub checksum: String,
}

impl ExportPreview {
    pub(crate) fn unchanged(stored: &FileTree) -> Self {
        Self {
            changes: FileTreeDiff::default(),
            patches: Vec::new(),
            checksum: stored.checksum(),
        }
    }

    /// Whether the export would leave every file as it is.
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }
}

/// Outcome of a round-trip check of the live tree through one export mode.
#[derive(Debug, Clone, PartialEq)]
pub struct VerifyReport {
    pub mode: String,
    pub nodes: usize,
    pub files: usize,
    /// Fingerprint of the encoded files; stable while the live tree is
    pub checksum: String,
    /// Changes that would turn the decoded tree back into the live one
    pub differences: Vec<ChangeRecord>,
}

impl VerifyReport {
    /// Whether the mode reproduces the live tree exactly.
    pub fn is_faithful(&self) -> bool {
        self.differences.is_empty()
    }

    pub fn differing_paths(&self) -> impl Iterator<Item = &TagPath> {
        self.differences.iter().map(|r| &r.path)
    }
}
