//! Sync orchestration: targets, options, runs and their reports

mod options;
mod orchestrator;
mod result;

pub use options::{Direction, SyncOptions, SyncTarget};
pub use orchestrator::{SyncOrchestrator, SyncOrchestratorBuilder};
pub use result::{
    ApplyFailure, DiffOutcome, ExportPreview, RecordOutcome, RecordResult, SyncOutcome, SyncResult, VerifyReport,
};
