//! Conflict and collision policies

use serde::{Deserialize, Serialize};
use tagsync_meta::CollisionPolicy;
use tagsync_tree::{OrderPolicy, content_eq};
use tracing::trace;

use super::{Conflict, ConflictKind, ConflictReport};
use crate::diff::{ChangeRecord, Operation};

/// What to do with a plan that has conflicts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ConflictPolicy {
    /// Refuse the whole plan.
    #[default]
    Abort,
    /// Apply everything that does not conflict.
    ApplyNonConflicting,
}

/// Whether `policy` lets `operation` touch existing destination content.
pub fn permits(policy: CollisionPolicy, operation: Operation) -> bool {
    match policy {
        CollisionPolicy::Abort | CollisionPolicy::Ignore => operation == Operation::Add,
        CollisionPolicy::Merge | CollisionPolicy::Overwrite => {
            matches!(operation, Operation::Add | Operation::Modify)
        }
        CollisionPolicy::DeleteAndReplace => true,
    }
}

/// Drop or reject the records `policy` does not allow.
///
/// `Merge`, `Overwrite` and `Ignore` drop what they do not permit; `Abort`
/// turns it into a structural conflict. Under `Merge` a Modify keeps the
/// destination's properties the source does not set, and is dropped when
/// that leaves nothing to change.
pub(crate) fn apply_collision_policy(
    records: Vec<ChangeRecord>,
    policy: CollisionPolicy,
    order: OrderPolicy,
    report: &mut ConflictReport,
) -> Vec<ChangeRecord> {
    records
        .into_iter()
        .filter_map(|record| {
            if permits(policy, record.operation) {
                return match (policy, record.operation) {
                    (CollisionPolicy::Merge, Operation::Modify) => merge_properties(record, order),
                    _ => Some(record),
                };
            }
            if policy == CollisionPolicy::Abort {
                report.push(Conflict {
                    path: record.path.clone(),
                    kind: ConflictKind::Structural,
                    operation: record.operation,
                    reason: format!(
                        "collision policy '{}' forbids changing existing content",
                        policy.code()
                    ),
                    expected: record.after.clone(),
                    actual: record.before.clone(),
                });
            } else {
                trace!(record = %record, policy = policy.code(), "Dropped by collision policy");
            }
            None
        })
        .collect()
}

fn merge_properties(mut record: ChangeRecord, order: OrderPolicy) -> Option<ChangeRecord> {
    let (Some(before), Some(after)) = (&record.before, &mut record.after) else {
        return Some(record);
    };
    let mut properties = before.properties().clone();
    properties.extend(after.properties().clone());
    after.set_properties(properties);

    if content_eq(before, after, order) {
        trace!(record = %record, "Merged modification leaves the node unchanged");
        return None;
    }
    Some(record)
}
