//! Filesystem plumbing for tagsync
//!
//! Provides the in-memory [`FileTree`] exchanged with the codec layer,
//! the [`FileTreeAdapter`] capability the synchronization core reads and
//! writes through, and a local-disk implementation ([`DiskStore`]) with
//! atomic writes.

pub mod checksum;
pub mod config;
pub mod error;
pub mod io;
pub mod path;
pub mod store;
pub mod tree;

pub use config::ConfigStore;
pub use error::{Error, Result};
pub use io::RobustnessConfig;
pub use path::{NormalizedPath, validate_relative_path};
pub use store::{DiskStore, FileTreeAdapter, WriteOptions, WriteSummary};
pub use tree::{DirListing, FileTree, FileTreeDiff};
