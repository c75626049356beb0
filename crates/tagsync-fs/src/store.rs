//! File-tree adapter capability and its local-disk implementation

use std::collections::{BTreeSet, VecDeque};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, info, instrument, trace, warn};
use walkdir::{DirEntry, WalkDir};

use crate::io::{self, RobustnessConfig, StagedFile};
use crate::{Error, FileTree, NormalizedPath, Result};

/// Options for writing a file tree to its destination.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteOptions {
    /// Remove managed files and empty directories under the root that the
    /// new tree no longer contains.
    pub delete_existing: bool,
}

/// What a write actually touched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteSummary {
    /// Files created or rewritten
    pub written: Vec<String>,
    /// Files whose bytes already matched
    pub unchanged: usize,
    /// Stale files removed under `delete_existing`
    pub removed: Vec<String>,
}

/// Capability for reading and writing a file tree rooted somewhere.
///
/// The synchronization core only talks to files through this trait;
/// transports other than the local disk implement it outside the core.
#[async_trait]
pub trait FileTreeAdapter: Send + Sync {
    /// Read every managed file under `root`.
    ///
    /// A missing root reads as an empty tree.
    async fn list_files(&self, root: &NormalizedPath) -> Result<FileTree>;

    /// Write `tree` under `root`.
    async fn write_files(
        &self,
        root: &NormalizedPath,
        tree: &FileTree,
        options: WriteOptions,
    ) -> Result<WriteSummary>;
}

/// [`FileTreeAdapter`] backed by the local filesystem.
///
/// Only files with the managed extension are read or pruned; anything
/// else under the root (READMEs, CI files) is invisible to the core.
/// Version-control metadata directories are skipped entirely.
#[derive(Debug, Clone)]
pub struct DiskStore {
    robustness: RobustnessConfig,
    managed_extension: String,
    ignored_dirs: Vec<String>,
}

impl Default for DiskStore {
    fn default() -> Self {
        Self {
            robustness: RobustnessConfig::default(),
            managed_extension: "json".to_string(),
            ignored_dirs: vec![".git".to_string(), ".svn".to_string(), ".hg".to_string()],
        }
    }
}

impl DiskStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_robustness(mut self, robustness: RobustnessConfig) -> Self {
        self.robustness = robustness;
        self
    }

    pub fn with_managed_extension(mut self, extension: impl Into<String>) -> Self {
        self.managed_extension = extension.into();
        self
    }

    fn is_ignored(&self, entry: &DirEntry) -> bool {
        entry.depth() > 0
            && entry.file_type().is_dir()
            && self
                .ignored_dirs
                .iter()
                .any(|d| entry.file_name().to_string_lossy() == d.as_str())
    }

    fn is_managed(&self, path: &Path) -> bool {
        path.extension()
            .is_some_and(|ext| ext.to_string_lossy() == self.managed_extension.as_str())
    }

    fn relative(root: &Path, path: &Path) -> Option<String> {
        let rel = path.strip_prefix(root).ok()?;
        let rel = NormalizedPath::new(rel);
        let rel = rel.as_str();
        (!rel.is_empty()).then(|| rel.to_string())
    }

    fn walk_error(root: &Path, err: walkdir::Error) -> Error {
        let path = err.path().unwrap_or(root).to_path_buf();
        let source = err
            .into_io_error()
            .unwrap_or_else(|| std::io::Error::other("directory walk failed"));
        Error::io(path, source)
    }

    /// Blocking implementation of [`FileTreeAdapter::list_files`].
    pub fn list_blocking(&self, root: &NormalizedPath) -> Result<FileTree> {
        let native_root = root.to_native();
        let mut tree = FileTree::new();

        if !native_root.exists() {
            debug!(root = %root, "File tree root does not exist, reading as empty");
            return Ok(tree);
        }
        if !native_root.is_dir() {
            return Err(Error::RootNotDirectory { path: native_root });
        }

        let walker = WalkDir::new(&native_root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| !self.is_ignored(e));

        for entry in walker {
            let entry = entry.map_err(|e| Self::walk_error(&native_root, e))?;
            if !entry.file_type().is_file() || !self.is_managed(entry.path()) {
                continue;
            }
            let Some(rel) = Self::relative(&native_root, entry.path()) else {
                continue;
            };
            let content = io::read_bytes(&NormalizedPath::new(entry.path()), self.robustness)?;
            trace!(path = %rel, bytes = content.len(), "Read managed file");
            tree.insert_file(rel, content)?;
        }

        debug!(root = %root, files = tree.len(), "Listed file tree");
        Ok(tree)
    }

    /// Blocking implementation of [`FileTreeAdapter::write_files`].
    ///
    /// All or nothing: every changed file is staged before any is renamed
    /// into place, and a failure at any step restores the files and
    /// directories as they were before the call.
    pub fn write_blocking(
        &self,
        root: &NormalizedPath,
        tree: &FileTree,
        options: WriteOptions,
    ) -> Result<WriteSummary> {
        let native_root = root.to_native();
        if native_root.exists() && !native_root.is_dir() {
            return Err(Error::RootNotDirectory { path: native_root });
        }
        Self::check_obstructions(root, tree)?;

        let mut journal = WriteJournal::default();
        match self.write_journaled(root, tree, options, &mut journal) {
            Ok(summary) => {
                info!(
                    root = %root,
                    written = summary.written.len(),
                    unchanged = summary.unchanged,
                    removed = summary.removed.len(),
                    "Wrote file tree"
                );
                Ok(summary)
            }
            Err(err) => {
                warn!(root = %root, error = %err, "File tree write failed, restoring previous files");
                journal.roll_back(self.robustness);
                Err(err)
            }
        }
    }

    /// Fail before touching anything if a file would land on a directory
    /// or a directory on a file.
    fn check_obstructions(root: &NormalizedPath, tree: &FileTree) -> Result<()> {
        for (rel, _) in tree.files() {
            if root.join(rel).to_native().is_dir() {
                return Err(Error::collision(rel, "a directory is in the way of this file"));
            }
        }
        for dir in tree.directories() {
            let native = root.join(dir).to_native();
            if native.exists() && !native.is_dir() {
                return Err(Error::collision(dir, "a file is in the way of this directory"));
            }
        }
        Ok(())
    }

    fn write_journaled(
        &self,
        root: &NormalizedPath,
        tree: &FileTree,
        options: WriteOptions,
        journal: &mut WriteJournal,
    ) -> Result<WriteSummary> {
        let mut summary = WriteSummary::default();

        journal.create_dir_all(&root.to_native())?;
        // Sorted paths put every parent before its children
        for dir in tree.directories() {
            journal.create_dir_all(&root.join(dir).to_native())?;
        }

        for (rel, content) in tree.files() {
            let target = root.join(rel);
            let previous = if target.to_native().is_file() {
                let existing = io::read_bytes(&target, self.robustness)?;
                if existing == content {
                    summary.unchanged += 1;
                    continue;
                }
                Some(existing)
            } else {
                None
            };
            let staged = StagedFile::stage(&target, content, self.robustness)?;
            journal.staged.push_back(Pending {
                rel: rel.to_string(),
                target,
                staged,
                previous,
            });
        }

        let stale = if options.delete_existing {
            self.stale_files(root, tree)?
        } else {
            Vec::new()
        };

        while let Some(pending) = journal.staged.pop_front() {
            pending.staged.commit(self.robustness)?;
            trace!(path = %pending.rel, "Committed file");
            summary.written.push(pending.rel);
            journal.committed.push((pending.target, pending.previous));
        }

        for (rel, content) in stale {
            let target = root.join(&rel);
            io::remove_file(&target, self.robustness)?;
            debug!(path = %rel, "Removed stale file");
            journal.removed.push((target, content));
            summary.removed.push(rel);
        }

        if options.delete_existing {
            self.prune_empty_dirs(root, tree);
        }
        Ok(summary)
    }

    /// Managed files under `root` that `tree` does not contain, with their
    /// current bytes.
    fn stale_files(&self, root: &NormalizedPath, tree: &FileTree) -> Result<Vec<(String, Vec<u8>)>> {
        let native_root = root.to_native();
        let mut stale = Vec::new();

        let walker = WalkDir::new(&native_root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| !self.is_ignored(e));

        for entry in walker {
            let entry = entry.map_err(|e| Self::walk_error(&native_root, e))?;
            if !entry.file_type().is_file() || !self.is_managed(entry.path()) {
                continue;
            }
            let Some(rel) = Self::relative(&native_root, entry.path()) else {
                continue;
            };
            if !tree.contains_file(&rel) {
                let content = io::read_bytes(&NormalizedPath::new(entry.path()), self.robustness)?;
                stale.push((rel, content));
            }
        }
        Ok(stale)
    }

    /// Remove empty directories the tree does not contain.
    ///
    /// Runs after every file change has landed, so a failure here is
    /// logged and leaves the written tree in place.
    fn prune_empty_dirs(&self, root: &NormalizedPath, tree: &FileTree) {
        let native_root = root.to_native();
        let keep_dirs: BTreeSet<&str> = tree.directories().collect();

        let walker = WalkDir::new(&native_root)
            .follow_links(false)
            .contents_first(true)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| !self.is_ignored(e));

        // contents_first yields children before parents, so nested empties go first
        for entry in walker.filter_map(std::result::Result::ok) {
            if !entry.file_type().is_dir() {
                continue;
            }
            let Some(rel) = Self::relative(&native_root, entry.path()) else {
                continue;
            };
            if keep_dirs.contains(rel.as_str()) {
                continue;
            }
            let is_empty = std::fs::read_dir(entry.path())
                .map(|mut entries| entries.next().is_none())
                .unwrap_or(false);
            if is_empty {
                match std::fs::remove_dir(entry.path()) {
                    Ok(()) => debug!(path = %rel, "Removed empty directory"),
                    Err(e) => warn!(path = %rel, error = %e, "Could not remove empty directory"),
                }
            }
        }
    }
}

/// A staged file waiting for its rename.
struct Pending {
    rel: String,
    target: NormalizedPath,
    staged: StagedFile,
    /// Bytes the target held before, `None` if it did not exist
    previous: Option<Vec<u8>>,
}

/// What one tree write has done so far, for undoing it.
#[derive(Default)]
struct WriteJournal {
    /// Directories this write created, parents first
    created_dirs: Vec<PathBuf>,
    staged: VecDeque<Pending>,
    /// Renamed targets with the bytes they replaced
    committed: Vec<(NormalizedPath, Option<Vec<u8>>)>,
    /// Stale files removed, with their bytes
    removed: Vec<(NormalizedPath, Vec<u8>)>,
}

impl WriteJournal {
    fn create_dir_all(&mut self, dir: &Path) -> Result<()> {
        let missing: Vec<&Path> = dir
            .ancestors()
            .take_while(|d| !d.as_os_str().is_empty() && !d.is_dir())
            .collect();
        for dir in missing.into_iter().rev() {
            std::fs::create_dir(dir).map_err(|e| Error::io(dir, e))?;
            self.created_dirs.push(dir.to_path_buf());
        }
        Ok(())
    }

    /// Put every file and directory back the way it was.
    ///
    /// Undo steps that fail are logged; the remaining steps still run.
    fn roll_back(mut self, robustness: RobustnessConfig) {
        for pending in self.staged.drain(..) {
            pending.staged.discard();
        }

        for (target, previous) in self.committed.into_iter().rev() {
            let restored = match previous {
                Some(content) => io::write_atomic(&target, &content, robustness),
                None => io::remove_file(&target, robustness),
            };
            if let Err(err) = restored {
                warn!(path = %target, error = %err, "Could not restore file");
            }
        }

        for (target, content) in self.removed {
            if let Err(err) = io::write_atomic(&target, &content, robustness) {
                warn!(path = %target, error = %err, "Could not restore removed file");
            }
        }

        for dir in self.created_dirs.into_iter().rev() {
            let _ = std::fs::remove_dir(&dir);
        }
        debug!("Rolled back file tree write");
    }
}

#[async_trait]
impl FileTreeAdapter for DiskStore {
    #[instrument(skip(self), fields(root = %root))]
    async fn list_files(&self, root: &NormalizedPath) -> Result<FileTree> {
        let store = self.clone();
        let root = root.clone();
        tokio::task::spawn_blocking(move || store.list_blocking(&root))
            .await
            .map_err(|e| Error::TaskFailed {
                message: e.to_string(),
            })?
    }

    #[instrument(skip(self, tree), fields(root = %root, files = tree.len()))]
    async fn write_files(
        &self,
        root: &NormalizedPath,
        tree: &FileTree,
        options: WriteOptions,
    ) -> Result<WriteSummary> {
        let store = self.clone();
        let root = root.clone();
        let tree = tree.clone();
        tokio::task::spawn_blocking(move || store.write_blocking(&root, &tree, options))
            .await
            .map_err(|e| Error::TaskFailed {
                message: e.to_string(),
            })?
    }
}
