//! [`MemoryFileStore`]: file trees held in memory.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use tagsync_fs::{Error, FileTree, FileTreeAdapter, NormalizedPath, Result, WriteOptions, WriteSummary};

#[derive(Debug, Default)]
struct State {
    roots: HashMap<NormalizedPath, FileTree>,
    fail_writes: Option<String>,
    fail_reads: Option<String>,
    writes: usize,
}

/// [`FileTreeAdapter`] over a map from root to file tree.
///
/// Clones share the same map. Writes replace the stored tree when
/// `delete_existing` is set and merge into it otherwise.
#[derive(Debug, Clone, Default)]
pub struct MemoryFileStore {
    state: Arc<Mutex<State>>,
}

impl MemoryFileStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    /// Seed `root` with `tree`.
    pub fn with_tree(self, root: impl Into<NormalizedPath>, tree: FileTree) -> Self {
        self.lock().roots.insert(root.into(), tree);
        self
    }

    /// Tree stored under `root`; empty if nothing was ever written there.
    pub fn tree(&self, root: impl Into<NormalizedPath>) -> FileTree {
        self.lock()
            .roots
            .get(&root.into())
            .cloned()
            .unwrap_or_default()
    }

    /// Fail every write with a storage error mentioning `reason`.
    pub fn fail_writes(&self, reason: impl Into<String>) {
        self.lock().fail_writes = Some(reason.into());
    }

    /// Fail every listing with a storage error mentioning `reason`.
    pub fn fail_reads(&self, reason: impl Into<String>) {
        self.lock().fail_reads = Some(reason.into());
    }

    /// Number of successful writes.
    pub fn write_count(&self) -> usize {
        self.lock().writes
    }
}

fn storage_error(root: &NormalizedPath, reason: &str) -> Error {
    Error::io(
        root.to_native(),
        std::io::Error::other(reason.to_string()),
    )
}

#[async_trait]
impl FileTreeAdapter for MemoryFileStore {
    async fn list_files(&self, root: &NormalizedPath) -> Result<FileTree> {
        let state = self.lock();
        if let Some(reason) = &state.fail_reads {
            return Err(storage_error(root, reason));
        }
        Ok(state.roots.get(root).cloned().unwrap_or_default())
    }

    async fn write_files(
        &self,
        root: &NormalizedPath,
        tree: &FileTree,
        options: WriteOptions,
    ) -> Result<WriteSummary> {
        let mut state = self.lock();
        if let Some(reason) = &state.fail_writes {
            return Err(storage_error(root, reason));
        }

        let previous = state.roots.get(root).cloned().unwrap_or_default();
        let mut summary = WriteSummary::default();
        for (path, content) in tree.files() {
            if previous.get(path) == Some(content) {
                summary.unchanged += 1;
            } else {
                summary.written.push(path.to_string());
            }
        }

        let mut stored = tree.clone();
        for (path, content) in previous.files() {
            if tree.contains_file(path) {
                continue;
            }
            if options.delete_existing {
                summary.removed.push(path.to_string());
            } else {
                // Kept files that clash with the new layout are dropped.
                stored.insert_file(path, content).ok();
            }
        }

        state.roots.insert(root.clone(), stored);
        state.writes += 1;
        Ok(summary)
    }
}
