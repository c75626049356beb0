//! Merge planner: selection, collision policy and validation

mod conflict;
mod planner;
mod policy;
mod selection;

pub use conflict::{Conflict, ConflictKind, ConflictReport};
pub use planner::{ApplyPlan, MergePlanner, PlanResult};
pub use policy::{ConflictPolicy, permits};
pub use selection::SelectionPolicy;
