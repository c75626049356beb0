//! Atomic I/O operations with file locking

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use backoff::ExponentialBackoffBuilder;
use fs2::FileExt;
use tracing::{trace, warn};

use crate::{Error, NormalizedPath, Result};

/// Retry and durability settings for disk writes.
///
/// Transient failures (interrupted calls, lock contention, sharing
/// violations on Windows) are retried with exponential backoff until
/// `max_elapsed` has passed. Other failures are permanent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RobustnessConfig {
    /// First retry delay
    pub initial_interval: Duration,
    /// Give up once this much time has been spent retrying
    pub max_elapsed: Duration,
    /// Call `sync_all` before the rename
    pub fsync: bool,
}

impl Default for RobustnessConfig {
    fn default() -> Self {
        Self {
            initial_interval: Duration::from_millis(10),
            max_elapsed: Duration::from_secs(1),
            fsync: true,
        }
    }
}

impl RobustnessConfig {
    /// No retries; fail on the first error.
    pub fn no_retry() -> Self {
        Self {
            max_elapsed: Duration::ZERO,
            ..Self::default()
        }
    }
}

fn is_transient(error: &std::io::Error) -> bool {
    matches!(
        error.kind(),
        std::io::ErrorKind::Interrupted
            | std::io::ErrorKind::WouldBlock
            | std::io::ErrorKind::TimedOut
            | std::io::ErrorKind::ResourceBusy
    )
}

/// Run an I/O operation, retrying transient failures per `robustness`.
fn with_retry<T>(
    path: &Path,
    robustness: RobustnessConfig,
    mut op: impl FnMut() -> std::io::Result<T>,
) -> Result<T> {
    let policy = ExponentialBackoffBuilder::new()
        .with_initial_interval(robustness.initial_interval)
        .with_max_elapsed_time(Some(robustness.max_elapsed))
        .build();

    backoff::retry(policy, || {
        op().map_err(|e| {
            if is_transient(&e) {
                trace!(path = %path.display(), error = %e, "Transient I/O failure, retrying");
                backoff::Error::transient(e)
            } else {
                backoff::Error::permanent(e)
            }
        })
    })
    .map_err(|e| match e {
        backoff::Error::Permanent(source) | backoff::Error::Transient { err: source, .. } => {
            Error::io(path, source)
        }
    })
}

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Content written to a locked temp file beside its target, not yet
/// renamed into place.
///
/// The temp file lives in the target's directory so the rename stays on
/// one filesystem. Dropping a staged file without [`commit`](Self::commit)
/// or [`discard`](Self::discard) leaves the temp file behind.
#[derive(Debug)]
pub struct StagedFile {
    temp_path: PathBuf,
    target: PathBuf,
}

impl StagedFile {
    /// Write `content` next to `path`. The parent directory must exist.
    pub fn stage(path: &NormalizedPath, content: &[u8], robustness: RobustnessConfig) -> Result<Self> {
        let target = path.to_native();
        let temp_name = format!(
            ".{}.{}.{}.tmp",
            target
                .file_name()
                .map(|n| n.to_string_lossy())
                .unwrap_or_default(),
            std::process::id(),
            TEMP_COUNTER.fetch_add(1, Ordering::Relaxed)
        );
        let temp_path = target.with_file_name(&temp_name);

        let staged = Self { temp_path, target };
        if let Err(e) = staged.fill(content, robustness) {
            staged.discard();
            return Err(e);
        }
        trace!(path = %staged.target.display(), "Staged file");
        Ok(staged)
    }

    fn fill(&self, content: &[u8], robustness: RobustnessConfig) -> Result<()> {
        let mut temp_file = with_retry(&self.temp_path, robustness, || {
            OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(&self.temp_path)
        })?;

        temp_file.lock_exclusive().map_err(|_| Error::LockFailed {
            path: self.target.clone(),
        })?;

        temp_file
            .write_all(content)
            .map_err(|e| Error::io(&self.temp_path, e))?;

        if robustness.fsync {
            temp_file
                .sync_all()
                .map_err(|e| Error::io(&self.temp_path, e))?;
        }

        temp_file.unlock().map_err(|_| Error::LockFailed {
            path: self.target.clone(),
        })
    }

    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Rename the temp file over the target. The temp file is removed if
    /// the rename fails.
    pub fn commit(self, robustness: RobustnessConfig) -> Result<()> {
        if let Err(e) = with_retry(&self.target, robustness, || {
            fs::rename(&self.temp_path, &self.target)
        }) {
            warn!(path = %self.target.display(), "Atomic rename failed, removing temp file");
            self.discard();
            return Err(e);
        }
        Ok(())
    }

    /// Remove the temp file, leaving the target untouched.
    pub fn discard(self) {
        let _ = fs::remove_file(&self.temp_path);
    }
}

/// Write content atomically to a file with locking.
///
/// Uses write-to-temp-then-rename strategy to prevent partial writes.
/// Acquires an advisory lock to prevent concurrent access.
pub fn write_atomic(path: &NormalizedPath, content: &[u8], robustness: RobustnessConfig) -> Result<()> {
    let native_path = path.to_native();

    if let Some(parent) = native_path.parent() {
        fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
    }

    StagedFile::stage(path, content, robustness)?.commit(robustness)
}

/// Read raw bytes from a file.
pub fn read_bytes(path: &NormalizedPath, robustness: RobustnessConfig) -> Result<Vec<u8>> {
    let native_path = path.to_native();
    with_retry(&native_path, robustness, || fs::read(&native_path))
}

/// Read text content from a file.
pub fn read_text(path: &NormalizedPath) -> Result<String> {
    let native_path = path.to_native();
    fs::read_to_string(&native_path).map_err(|e| Error::io(&native_path, e))
}

/// Write text content to a file atomically.
pub fn write_text(path: &NormalizedPath, content: &str) -> Result<()> {
    write_atomic(path, content.as_bytes(), RobustnessConfig::default())
}

/// Remove a file, treating an already-missing file as success.
pub fn remove_file(path: &NormalizedPath, robustness: RobustnessConfig) -> Result<()> {
    let native_path = path.to_native();
    match with_retry(&native_path, robustness, || fs::remove_file(&native_path)) {
        Ok(()) => Ok(()),
        Err(Error::Io { source, .. }) if source.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}
