//! Live tag provider capability

use async_trait::async_trait;
use tagsync_tree::{ConfigNode, TagPath};

/// Classified failure of a live-tree adapter call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LiveError {
    #[error("Tag not found: {path}")]
    NotFound { path: String },

    #[error("Permission denied at {path}")]
    PermissionDenied { path: String },

    #[error("Type conflict at {path}: {reason}")]
    TypeConflict { path: String, reason: String },

    /// The provider as a whole cannot be reached.
    #[error("Tag provider unavailable: {reason}")]
    Unavailable { reason: String },

    /// A multi-step change failed partway and could not be undone.
    #[error("Change left incomplete, '{leftover}' remains: {source}")]
    Incomplete {
        leftover: String,
        #[source]
        source: Box<LiveError>,
    },
}

impl LiveError {
    pub fn not_found(path: impl std::fmt::Display) -> Self {
        Self::NotFound {
            path: path.to_string(),
        }
    }

    pub fn permission_denied(path: impl std::fmt::Display) -> Self {
        Self::PermissionDenied {
            path: path.to_string(),
        }
    }

    pub fn type_conflict(path: impl std::fmt::Display, reason: impl Into<String>) -> Self {
        Self::TypeConflict {
            path: path.to_string(),
            reason: reason.into(),
        }
    }

    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable {
            reason: reason.into(),
        }
    }

    pub fn incomplete(leftover: impl std::fmt::Display, source: LiveError) -> Self {
        Self::Incomplete {
            leftover: leftover.to_string(),
            source: Box::new(source),
        }
    }

    /// Whether no further call to the same provider can succeed.
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::Unavailable { .. } => true,
            Self::Incomplete { source, .. } => source.is_fatal(),
            _ => false,
        }
    }
}

/// Access to the host platform's live configuration tree.
///
/// Paths are absolute within the provider. Reads return fresh snapshots
/// that the caller owns; nothing the adapter hands out is shared with the
/// host's own storage.
#[async_trait]
pub trait LiveTreeAdapter: Send + Sync {
    /// Name of the tag provider this adapter is connected to.
    fn provider(&self) -> &str;

    /// Snapshot of the subtree rooted at `path`.
    async fn read_subtree(&self, path: &TagPath) -> Result<ConfigNode, LiveError>;

    /// Create or update the node at `path`.
    ///
    /// Kind and properties are replaced; existing children are kept.
    /// Children carried by `node` that do not exist yet are created with
    /// their whole subtree.
    async fn write_node(&self, path: &TagPath, node: &ConfigNode) -> Result<(), LiveError>;

    /// Delete the node at `path` with its subtree.
    async fn remove_node(&self, path: &TagPath) -> Result<(), LiveError>;
}
