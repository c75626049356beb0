//! Synchronization core for tag trees
//!
//! This crate sits on top of the tree model and the codec layer and
//! implements the three stages of a synchronization run:
//!
//! - **Differ** ([`diff`]): structural change set between two trees, with
//!   move detection
//! - **Merge Planner** ([`plan`]): selection, collision policy and
//!   validation of a change set against the destination's current state
//! - **Sync Orchestrator** ([`sync`]): reads both sides, plans, and applies
//!   the plan to the live tree or to the file tree
//!
//! # Architecture
//!
//! ```text
//!              SyncOrchestrator
//!             /        |        \
//!   LiveTreeAdapter  Differ   FileTreeAdapter
//!                      |             |
//!                 MergePlanner   tagsync-codec
//!                      |             |
//!                 tagsync-tree   tagsync-fs
//! ```
//!
//! # Example
//!
//! ```ignore
//! use tagsync_core::{Direction, SelectionPolicy, SyncOrchestrator};
//!
//! async fn example(live: impl tagsync_core::LiveTreeAdapter + 'static) -> tagsync_core::Result<()> {
//!     let orchestrator = SyncOrchestrator::builder()
//!         .live(live)
//!         .source_root("exports/default")
//!         .export_mode("structuredByType")
//!         .build()?;
//!     let result = orchestrator.sync(Direction::Export, &SelectionPolicy::all()).await;
//!     assert!(result.is_success());
//!     Ok(())
//! }
//! ```

pub mod adapter;
pub mod diff;
pub mod error;
pub mod logging;
pub mod plan;
pub mod sync;

pub use adapter::{LiveError, LiveTreeAdapter};
pub use diff::{ChangeRecord, DiffOptions, Operation, diff};
pub use error::{Error, Result, TreeSide};
pub use plan::{
    ApplyPlan, Conflict, ConflictKind, ConflictPolicy, ConflictReport, MergePlanner, PlanResult,
    SelectionPolicy,
};
pub use sync::{
    ApplyFailure, DiffOutcome, Direction, ExportPreview, RecordOutcome, RecordResult, SyncOptions,
    SyncOrchestrator, SyncOrchestratorBuilder, SyncOutcome, SyncResult, SyncTarget, VerifyReport,
};
pub use tagsync_meta::CollisionPolicy;
