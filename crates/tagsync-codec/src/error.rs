//! Error types for tagsync-codec

/// Result type for tagsync-codec operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while encoding or decoding file trees
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Malformed input; `file` is the offending path relative to the root.
    #[error("Parse failure in '{file}': {reason}")]
    Parse { file: String, reason: String },

    /// The tree cannot be laid out in this export mode.
    #[error("Cannot represent '{path}' in {mode} mode: {reason}")]
    Unrepresentable {
        mode: String,
        path: String,
        reason: String,
    },

    #[error("Unknown export mode '{mode}' (available: {})", available.join(", "))]
    UnknownMode {
        mode: String,
        available: Vec<String>,
    },

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub fn parse(file: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Parse {
            file: file.into(),
            reason: reason.into(),
        }
    }

    pub fn unrepresentable(
        mode: impl Into<String>,
        path: impl std::fmt::Display,
        reason: impl Into<String>,
    ) -> Self {
        Self::Unrepresentable {
            mode: mode.into(),
            path: path.to_string(),
            reason: reason.into(),
        }
    }

    /// Whether this error classifies malformed input.
    pub fn is_parse_failure(&self) -> bool {
        matches!(self, Self::Parse { .. })
    }
}
