//! Error types for tagsync-tree

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("Invalid node name '{name}': {reason}")]
    InvalidName { name: String, reason: String },

    #[error("Invalid tag path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    #[error("Unknown node kind: {kind}")]
    UnknownKind { kind: String },

    #[error("Invalid property value: {reason}")]
    InvalidValue { reason: String },

    #[error("Duplicate node at '{path}'")]
    DuplicatePath { path: String },

    #[error("Parent of '{path}' does not exist")]
    MissingParent { path: String },

    #[error("Node at '{path}' is not a folder and cannot hold children")]
    NotAContainer { path: String },

    #[error("No node at '{path}'")]
    NotFound { path: String },

    #[error("Schema violation at '{path}', property '{property}': {reason}")]
    SchemaViolation {
        path: String,
        property: String,
        reason: String,
    },

    #[error("Cannot {operation} the root node")]
    RootOperation { operation: String },
}

impl Error {
    pub fn invalid_path(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPath {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn not_found(path: impl std::fmt::Display) -> Self {
        Self::NotFound {
            path: path.to_string(),
        }
    }
}
