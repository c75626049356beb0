//! Error types for tagsync-fs

use std::path::PathBuf;

/// Result type for tagsync-fs operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in tagsync-fs operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {format} config at {path}: {message}")]
    ConfigParse {
        path: PathBuf,
        format: String,
        message: String,
    },

    #[error("Failed to serialize {format} config at {path}: {message}")]
    ConfigSerialize {
        path: PathBuf,
        format: String,
        message: String,
    },

    #[error("Unsupported config format: {extension}")]
    UnsupportedFormat { extension: String },

    #[error("Config file too large: {path} is {size} bytes (max {max})")]
    ConfigTooLarge { path: PathBuf, size: u64, max: u64 },

    #[error("Lock acquisition failed for {path}")]
    LockFailed { path: PathBuf },

    #[error("Invalid relative path '{path}': {reason}")]
    InvalidRelativePath { path: String, reason: String },

    #[error("Path collision at '{path}': {reason}")]
    PathCollision { path: String, reason: String },

    #[error("File tree root is not a directory: {path}")]
    RootNotDirectory { path: PathBuf },

    #[error("Background I/O task failed: {message}")]
    TaskFailed { message: String },
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn invalid_path(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidRelativePath {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn collision(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::PathCollision {
            path: path.into(),
            reason: reason.into(),
        }
    }
}
