//! Error types for tagsync-meta

use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Fs(#[from] tagsync_fs::Error),

    #[error("Settings document not found at {path}")]
    SettingsNotFound { path: PathBuf },

    #[error("Invalid settings at {path}: {message}")]
    InvalidSettings { path: PathBuf, message: String },

    #[error("Unknown collision policy: {code}")]
    InvalidCollisionPolicy { code: String },

    #[error("Invalid schema: {message}")]
    InvalidSchema { message: String },
}
