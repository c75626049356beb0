//! Run options and targets

use std::fmt;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tagsync_fs::NormalizedPath;
use tagsync_meta::{CollisionPolicy, SyncEntry};
use tagsync_tree::TagPath;

use crate::error::TreeSide;
use crate::plan::ConflictPolicy;
use crate::Result;

/// Which way a run copies changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Live tree to files.
    Export,
    /// Files to live tree.
    Import,
}

impl Direction {
    pub fn source(&self) -> TreeSide {
        match self {
            Direction::Export => TreeSide::Live,
            Direction::Import => TreeSide::Files,
        }
    }

    pub fn destination(&self) -> TreeSide {
        match self {
            Direction::Export => TreeSide::Files,
            Direction::Import => TreeSide::Live,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Export => write!(f, "export"),
            Direction::Import => write!(f, "import"),
        }
    }
}

/// Options for sync runs
#[derive(Debug, Clone, PartialEq)]
pub struct SyncOptions {
    /// Limit for reading either side
    pub read_timeout: Duration,
    /// Limit for applying a single record (or writing the file tree)
    pub apply_timeout: Duration,
    /// Plan and report without mutating anything; every record ends up
    /// `Skipped`.
    pub dry_run: bool,
    /// Prune managed files the exported tree no longer contains.
    pub delete_existing: bool,
    /// Leave the `_types_` folder at the root out of the run.
    pub exclude_type_definitions: bool,
    pub detect_moves: bool,
    /// Applied to imports; exports always mirror.
    pub collision_policy: CollisionPolicy,
    pub conflict_policy: ConflictPolicy,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            read_timeout: Duration::from_secs(30),
            apply_timeout: Duration::from_secs(10),
            dry_run: false,
            delete_existing: true,
            exclude_type_definitions: false,
            detect_moves: true,
            collision_policy: CollisionPolicy::DeleteAndReplace,
            conflict_policy: ConflictPolicy::Abort,
        }
    }
}

impl SyncOptions {
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    pub fn with_apply_timeout(mut self, timeout: Duration) -> Self {
        self.apply_timeout = timeout;
        self
    }

    pub fn dry_run(mut self) -> Self {
        self.dry_run = true;
        self
    }

    pub fn with_collision_policy(mut self, policy: CollisionPolicy) -> Self {
        self.collision_policy = policy;
        self
    }

    pub fn with_conflict_policy(mut self, policy: ConflictPolicy) -> Self {
        self.conflict_policy = policy;
        self
    }

    pub fn excluding_type_definitions(mut self) -> Self {
        self.exclude_type_definitions = true;
        self
    }

    pub fn keeping_existing_files(mut self) -> Self {
        self.delete_existing = false;
        self
    }

    pub fn without_moves(mut self) -> Self {
        self.detect_moves = false;
        self
    }

    /// These options with the per-entry settings of `entry` applied.
    pub fn for_entry(&self, entry: &SyncEntry) -> Self {
        Self {
            collision_policy: entry.collision_policy,
            exclude_type_definitions: entry.exclude_udt_definitions,
            delete_existing: entry.delete_existing,
            ..self.clone()
        }
    }
}

/// Where a run reads and writes: a subtree of the live provider and the
/// directory holding its file representation.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncTarget {
    pub base_path: TagPath,
    pub source_root: NormalizedPath,
    pub mode: String,
}

impl SyncTarget {
    pub fn new(source_root: impl Into<NormalizedPath>, mode: impl Into<String>) -> Self {
        Self {
            base_path: TagPath::root(),
            source_root: source_root.into(),
            mode: mode.into(),
        }
    }

    pub fn with_base_path(mut self, base_path: TagPath) -> Self {
        self.base_path = base_path;
        self
    }

    pub fn with_mode(&self, mode: impl Into<String>) -> Self {
        Self {
            mode: mode.into(),
            ..self.clone()
        }
    }

    /// Target described by a settings entry. Relative source paths are
    /// resolved against `workspace_root` when one is given.
    pub fn from_entry(entry: &SyncEntry, workspace_root: Option<&NormalizedPath>) -> Result<Self> {
        let base_path = TagPath::parse(&entry.base_tag_path)?;
        let source_root = match workspace_root {
            Some(root) if Path::new(&entry.source_path).is_relative() => {
                root.join(&entry.source_path)
            }
            _ => NormalizedPath::new(&entry.source_path),
        };
        Ok(Self {
            base_path,
            source_root,
            mode: entry.export_mode.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn entry_overrides_per_run_settings() {
        let entry = SyncEntry::new("default", "exports/default", "structuredByType")
            .with_collision_policy(CollisionPolicy::Merge)
            .excluding_udt_definitions();

        let options = SyncOptions::default().dry_run().for_entry(&entry);

        assert_eq!(options.collision_policy, CollisionPolicy::Merge);
        assert!(options.exclude_type_definitions);
        assert!(options.delete_existing);
        assert!(options.dry_run);
    }

    #[test]
    fn relative_source_paths_resolve_against_workspace() {
        let entry = SyncEntry::new("default", "exports/default", "singleFile")
            .with_base_tag_path("Plant/Area1");
        let workspace = NormalizedPath::new("/srv/project");

        let target = SyncTarget::from_entry(&entry, Some(&workspace)).unwrap();

        assert_eq!(target.source_root.as_str(), "/srv/project/exports/default");
        assert_eq!(target.base_path, TagPath::parse("Plant/Area1").unwrap());
        assert_eq!(target.mode, "singleFile");
    }
}
