//! Error types for tagsync-core

use std::fmt;
use std::time::Duration;

use crate::adapter::LiveError;
use crate::plan::ConflictReport;

/// Result type for tagsync-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Which side of a synchronization run an error concerns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TreeSide {
    /// The live tag provider tree
    Live,
    /// The file-system representation
    Files,
}

impl fmt::Display for TreeSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TreeSide::Live => write!(f, "live"),
            TreeSide::Files => write!(f, "file"),
        }
    }
}

/// Errors that can occur in tagsync-core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// One side could not be read; nothing was mutated.
    #[error("Failed to read the {side} tree: {source}")]
    ReadFailure {
        side: TreeSide,
        #[source]
        source: Box<Error>,
    },

    /// An adapter call did not finish in time
    #[error("Timed out after {after:?} while {operation}")]
    Timeout { operation: String, after: Duration },

    /// The planner found conflicts and the run was configured to abort
    #[error("{} conflict(s) block the plan", .0.len())]
    Conflicts(ConflictReport),

    /// The orchestrator was built without a required component
    #[error("Missing orchestrator component: {name}")]
    MissingComponent { name: String },

    /// A settings entry names a provider other than the connected one
    #[error("Settings entry targets provider '{requested}' but the adapter serves '{served}'")]
    ProviderMismatch { requested: String, served: String },

    /// A spawned read task panicked or was cancelled
    #[error("Background task failed: {message}")]
    TaskFailed { message: String },

    /// Live tree adapter error
    #[error(transparent)]
    Live(#[from] LiveError),

    // Transparent wrappers for underlying crate errors
    /// Filesystem error from tagsync-fs
    #[error(transparent)]
    Fs(#[from] tagsync_fs::Error),

    /// Settings or schema error from tagsync-meta
    #[error(transparent)]
    Meta(#[from] tagsync_meta::Error),

    /// Tree model error from tagsync-tree
    #[error(transparent)]
    Tree(#[from] tagsync_tree::Error),

    /// Codec error from tagsync-codec
    #[error(transparent)]
    Codec(#[from] tagsync_codec::Error),
}

impl Error {
    /// Classify `source` as a failure to read `side`.
    pub fn read(side: TreeSide, source: impl Into<Error>) -> Self {
        Self::ReadFailure {
            side,
            source: Box::new(source.into()),
        }
    }

    pub fn timeout(operation: impl Into<String>, after: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            after,
        }
    }

    pub fn missing(name: impl Into<String>) -> Self {
        Self::MissingComponent { name: name.into() }
    }

    pub fn is_read_failure(&self) -> bool {
        matches!(self, Self::ReadFailure { .. })
    }

    /// The codec parse failure behind this error, if there is one.
    pub fn parse_failure(&self) -> Option<&tagsync_codec::Error> {
        match self {
            Self::ReadFailure { source, .. } => source.parse_failure(),
            Self::Codec(err) if err.is_parse_failure() => Some(err),
            _ => None,
        }
    }
}
