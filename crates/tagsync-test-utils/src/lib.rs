//! Shared test utilities for the tagsync workspace.
//!
//! In-memory adapters stand in for a tag provider and for the file side,
//! with hooks to inject the failures a run has to survive. They are
//! dev-dependencies only and never published.
//!
//! # Modules
//!
//! - [`live`]: [`MemoryLiveTree`], a live tree held in memory
//! - [`files`]: [`MemoryFileStore`], a file-tree adapter held in memory
//! - [`fixtures`]: small plant trees used across the suites
//! - [`workspace`]: [`TestWorkspace`], a temporary export directory

pub mod files;
pub mod fixtures;
pub mod live;
pub mod workspace;

pub use files::MemoryFileStore;
pub use live::{LiveCall, MemoryLiveTree};
pub use workspace::TestWorkspace;
