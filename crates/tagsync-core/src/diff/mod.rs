//! Differ: change sets between two trees

mod differ;
mod record;

pub use differ::diff;
pub use record::{ChangeRecord, DiffOptions, Operation};
