//! Built-in export modes

mod individual;
mod single_file;
mod structured;

pub use individual::IndividualFilesCodec;
pub use single_file::SingleFileCodec;
pub use structured::StructuredByTypeCodec;

use serde_json::Value;
use tagsync_fs::{FileTree, validate_relative_path};
use tagsync_tree::{ConfigNode, TagPath};

use crate::json::to_canonical_bytes;
use crate::{Error, Result};

/// Relative path of `name` inside directory `dir` (`""` is the root).
pub(crate) fn join(dir: &str, name: &str) -> String {
    if dir.is_empty() {
        name.to_string()
    } else {
        format!("{dir}/{name}")
    }
}

/// Write `value` canonically at `file`, turning path clashes into
/// unrepresentable-tree errors for `tag_path`.
pub(crate) fn put(
    files: &mut FileTree,
    mode: &str,
    tag_path: &TagPath,
    file: String,
    value: &Value,
) -> Result<()> {
    let bytes = to_canonical_bytes(value)?;
    files
        .insert_file(file, bytes)
        .map_err(|e| Error::unrepresentable(mode, tag_path, e.to_string()))
}

/// Directory names file stores skip when listing.
const VCS_DIRS: [&str; 3] = [".git", ".svn", ".hg"];

/// Check that a node or property name can be used as one path segment.
pub(crate) fn check_segment(mode: &str, tag_path: &TagPath, name: &str) -> Result<()> {
    if name.contains('/') {
        return Err(Error::unrepresentable(mode, tag_path, format!("'{name}' contains '/'")));
    }
    if VCS_DIRS.contains(&name) {
        return Err(Error::unrepresentable(
            mode,
            tag_path,
            format!("'{name}' is a version-control directory name"),
        ));
    }
    validate_relative_path(name).map_err(|e| Error::unrepresentable(mode, tag_path, e.to_string()))
}

/// Only folders can be laid out as a root.
pub(crate) fn check_root(mode: &str, root: &ConfigNode) -> Result<()> {
    if root.is_folder() {
        Ok(())
    } else {
        Err(Error::unrepresentable(
            mode,
            TagPath::root(),
            format!("root must be a Folder, found {}", root.kind()),
        ))
    }
}
