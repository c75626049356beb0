//! In-memory file tree exchanged between the codec layer and file adapters

use std::collections::{BTreeMap, BTreeSet};

use similar::TextDiff;

use crate::checksum::compute_tree_checksum;
use crate::path::validate_relative_path;
use crate::{Error, Result};

/// An ordered mapping from relative file path to byte content, plus the
/// directory structure implied by (or explicitly added to) it.
///
/// Paths are `/`-separated and relative to the tree root. Every ancestor
/// of a file is recorded as a directory, and a path can never be both a
/// file and a directory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileTree {
    files: BTreeMap<String, Vec<u8>>,
    directories: BTreeSet<String>,
}

/// Immediate entries of one directory in a [`FileTree`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirListing<'a> {
    /// Names of immediate subdirectories, sorted
    pub directories: Vec<&'a str>,
    /// Names of immediate files, sorted
    pub files: Vec<&'a str>,
}

/// File-level difference between two trees.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileTreeDiff {
    pub added: Vec<String>,
    pub removed: Vec<String>,
    pub changed: Vec<String>,
}

impl FileTreeDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.changed.is_empty()
    }
}

fn ancestors(path: &str) -> impl Iterator<Item = &str> {
    path.match_indices('/').map(move |(idx, _)| &path[..idx])
}

fn dir_prefix(dir: &str) -> String {
    if dir.is_empty() {
        String::new()
    } else {
        format!("{dir}/")
    }
}

impl FileTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a file.
    ///
    /// # Errors
    ///
    /// Fails if the path is invalid, already holds a file or directory, or
    /// if one of its ancestors is a file.
    pub fn insert_file(&mut self, path: impl Into<String>, content: impl Into<Vec<u8>>) -> Result<()> {
        let path = path.into();
        validate_relative_path(&path)?;

        if self.files.contains_key(&path) {
            return Err(Error::collision(path, "a file already exists at this path"));
        }
        if self.directories.contains(&path) {
            return Err(Error::collision(path, "a directory already exists at this path"));
        }
        self.check_ancestors(&path)?;

        let dirs: Vec<String> = ancestors(&path).map(str::to_string).collect();
        self.directories.extend(dirs);
        self.files.insert(path, content.into());
        Ok(())
    }

    /// Record a directory (and its ancestors), even if it holds no files.
    pub fn insert_dir(&mut self, path: impl Into<String>) -> Result<()> {
        let path = path.into();
        validate_relative_path(&path)?;

        if self.files.contains_key(&path) {
            return Err(Error::collision(path, "a file already exists at this path"));
        }
        self.check_ancestors(&path)?;

        let dirs: Vec<String> = ancestors(&path).map(str::to_string).collect();
        self.directories.extend(dirs);
        self.directories.insert(path);
        Ok(())
    }

    fn check_ancestors(&self, path: &str) -> Result<()> {
        for ancestor in ancestors(path) {
            if self.files.contains_key(ancestor) {
                return Err(Error::collision(
                    path,
                    format!("ancestor '{ancestor}' is a file"),
                ));
            }
        }
        Ok(())
    }

    /// Content of the file at `path`, if any.
    pub fn get(&self, path: &str) -> Option<&[u8]> {
        self.files.get(path).map(Vec::as_slice)
    }

    pub fn contains_file(&self, path: &str) -> bool {
        self.files.contains_key(path)
    }

    pub fn is_dir(&self, path: &str) -> bool {
        path.is_empty() || self.directories.contains(path)
    }

    /// All files in path order.
    pub fn files(&self) -> impl Iterator<Item = (&str, &[u8])> {
        self.files.iter().map(|(p, c)| (p.as_str(), c.as_slice()))
    }

    /// All directories in path order.
    pub fn directories(&self) -> impl Iterator<Item = &str> {
        self.directories.iter().map(String::as_str)
    }

    /// Number of files.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty() && self.directories.is_empty()
    }

    /// Immediate children of `dir` (`""` is the root).
    pub fn list_dir(&self, dir: &str) -> DirListing<'_> {
        let prefix = dir_prefix(dir);
        let mut listing = DirListing::default();

        for path in self.files.range(prefix.clone()..).map(|(p, _)| p) {
            if !path.starts_with(&prefix) {
                break;
            }
            let rest = &path[prefix.len()..];
            if !rest.contains('/') {
                listing.files.push(rest);
            }
        }

        for path in self.directories.range(prefix.clone()..) {
            if !path.starts_with(&prefix) {
                break;
            }
            let rest = &path[prefix.len()..];
            if !rest.is_empty() && !rest.contains('/') {
                listing.directories.push(rest);
            }
        }

        listing
    }

    /// Fingerprint of every file path and byte in the tree.
    pub fn checksum(&self) -> String {
        compute_tree_checksum(self.files())
    }

    /// Compare this tree (old) against `other` (new) file by file.
    pub fn diff(&self, other: &FileTree) -> FileTreeDiff {
        let mut diff = FileTreeDiff::default();
        for (path, content) in &self.files {
            match other.files.get(path) {
                None => diff.removed.push(path.clone()),
                Some(new_content) if new_content != content => diff.changed.push(path.clone()),
                Some(_) => {}
            }
        }
        for path in other.files.keys() {
            if !self.files.contains_key(path) {
                diff.added.push(path.clone());
            }
        }
        diff
    }

    /// Render a unified text diff for one file, or `None` when unchanged.
    pub fn unified_diff(&self, other: &FileTree, path: &str) -> Option<String> {
        let old = self
            .get(path)
            .map(|b| String::from_utf8_lossy(b).into_owned())
            .unwrap_or_default();
        let new = other
            .get(path)
            .map(|b| String::from_utf8_lossy(b).into_owned())
            .unwrap_or_default();
        if old == new {
            return None;
        }

        let text_diff = TextDiff::from_lines(&old, &new);
        let rendered = text_diff
            .unified_diff()
            .context_radius(3)
            .header(&format!("a/{path}"), &format!("b/{path}"))
            .to_string();
        Some(rendered)
    }
}
