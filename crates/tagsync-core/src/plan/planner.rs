//! Merge planner

use tagsync_meta::CollisionPolicy;
use tagsync_tree::{ConfigNode, OrderPolicy, TagPath, TreeEditor, content_eq, tree_eq};
use tracing::{debug, warn};

use super::policy::apply_collision_policy;
use super::{Conflict, ConflictKind, ConflictPolicy, ConflictReport, SelectionPolicy};
use crate::diff::{ChangeRecord, Operation};

/// Validates change sets against the destination they will be applied to.
///
/// The planner never resolves a conflict; it reports it and leaves the
/// decision to the [`ConflictPolicy`] given to
/// [`PlanResult::into_executable`].
#[derive(Debug, Clone, Copy)]
pub struct MergePlanner {
    order: OrderPolicy,
    collision: CollisionPolicy,
}

enum Verdict {
    Apply,
    AlreadyPresent,
    Reject {
        kind: ConflictKind,
        reason: String,
        actual: Option<ConfigNode>,
    },
}

fn reject(kind: ConflictKind, reason: impl Into<String>, actual: Option<&ConfigNode>) -> Verdict {
    Verdict::Reject {
        kind,
        reason: reason.into(),
        actual: actual.map(ConfigNode::shallow),
    }
}

impl MergePlanner {
    /// Planner that mirrors every selected change.
    pub fn new(order: OrderPolicy) -> Self {
        Self {
            order,
            collision: CollisionPolicy::DeleteAndReplace,
        }
    }

    pub fn with_collision_policy(mut self, collision: CollisionPolicy) -> Self {
        self.collision = collision;
        self
    }

    /// Filter `changes` by `selection` and the collision policy, put type
    /// definitions in dependency order, and validate every record against
    /// `destination` as it would look after the records before it.
    pub fn plan(
        &self,
        changes: Vec<ChangeRecord>,
        selection: &SelectionPolicy,
        destination: &ConfigNode,
    ) -> PlanResult {
        let total = changes.len();
        let mut conflicts = ConflictReport::new();

        let selected: Vec<ChangeRecord> = changes
            .into_iter()
            .filter(|record| selection.selects(record))
            .collect();
        let permitted = apply_collision_policy(selected, self.collision, self.order, &mut conflicts);
        let ordered = order_type_definitions(permitted);

        let mut projected = TreeEditor::new(destination);
        let mut steps = Vec::with_capacity(ordered.len());
        let mut already_present = Vec::new();

        for record in ordered {
            match self.check(projected.tree(), &record) {
                Verdict::Apply => {
                    let applied = record
                        .to_edit()
                        .ok_or_else(|| "record lacks the snapshot its operation needs".to_string())
                        .and_then(|edit| projected.apply(&edit).map_err(|e| e.to_string()));
                    match applied {
                        Ok(()) => steps.push(record),
                        Err(reason) => conflicts.push(Conflict {
                            path: record.path.clone(),
                            kind: ConflictKind::Structural,
                            operation: record.operation,
                            reason,
                            expected: record.after.clone(),
                            actual: None,
                        }),
                    }
                }
                Verdict::AlreadyPresent => already_present.push(record.path),
                Verdict::Reject {
                    kind,
                    reason,
                    actual,
                } => {
                    warn!(
                        path = %record.path,
                        operation = %record.operation,
                        %kind,
                        %reason,
                        "Change conflicts with destination"
                    );
                    let expected = match record.operation {
                        Operation::Add => record.after,
                        _ => record.before,
                    };
                    conflicts.push(Conflict {
                        path: record.path,
                        kind,
                        operation: record.operation,
                        reason,
                        expected,
                        actual,
                    });
                }
            }
        }

        debug!(
            changes = total,
            steps = steps.len(),
            conflicts = conflicts.len(),
            already_present = already_present.len(),
            "Planned change set"
        );
        PlanResult {
            steps,
            conflicts,
            already_present,
            projected: projected.finish(),
        }
    }

    fn check(&self, current: &ConfigNode, record: &ChangeRecord) -> Verdict {
        let path = &record.path;
        let existing = current.get(path);
        match record.operation {
            Operation::Add => {
                let Some(after) = &record.after else {
                    return reject(ConflictKind::Structural, "Add without a snapshot", existing);
                };
                match existing {
                    Some(node) if node.kind() != after.kind() => reject(
                        ConflictKind::Structural,
                        format!("a {} already exists at this path", node.kind()),
                        existing,
                    ),
                    Some(node) if content_eq(&node.detached(), &after.detached(), self.order) => {
                        Verdict::AlreadyPresent
                    }
                    Some(_) => reject(
                        ConflictKind::StaleBase,
                        "node already exists with different content",
                        existing,
                    ),
                    None => self.check_parent(current, path),
                }
            }
            Operation::Modify => {
                let (Some(before), Some(after)) = (&record.before, &record.after) else {
                    return reject(ConflictKind::Structural, "Modify without snapshots", existing);
                };
                match existing {
                    None => reject(ConflictKind::StaleBase, "node no longer exists", None),
                    Some(node) if !content_eq(node, before, self.order) => reject(
                        ConflictKind::StaleBase,
                        "node changed since the diff was computed",
                        existing,
                    ),
                    Some(node) if !after.kind().can_hold_children() && node.has_children() => {
                        reject(
                            ConflictKind::Structural,
                            format!("a {} cannot keep the children still present", after.kind()),
                            existing,
                        )
                    }
                    Some(_) => Verdict::Apply,
                }
            }
            Operation::Remove => {
                let Some(before) = &record.before else {
                    return reject(ConflictKind::Structural, "Remove without a snapshot", existing);
                };
                match existing {
                    None => reject(ConflictKind::StaleBase, "node no longer exists", None),
                    Some(node) if !content_eq(node, before, self.order) => reject(
                        ConflictKind::StaleBase,
                        "node changed since the diff was computed",
                        existing,
                    ),
                    Some(node) if node.has_children() => {
                        let names: Vec<&str> = node.child_names().collect();
                        if let Some(new) = names.iter().find(|n| before.child(n).is_none()) {
                            reject(
                                ConflictKind::StaleBase,
                                format!("child '{new}' appeared since the diff was computed"),
                                existing,
                            )
                        } else {
                            reject(
                                ConflictKind::Structural,
                                format!("children not removed by this plan: {}", names.join(", ")),
                                existing,
                            )
                        }
                    }
                    Some(_) => Verdict::Apply,
                }
            }
            Operation::Move => {
                let (Some(origin), Some(before)) = (&record.origin, &record.before) else {
                    return reject(ConflictKind::Structural, "Move without origin", existing);
                };
                match current.get(origin) {
                    None => {
                        return reject(
                            ConflictKind::StaleBase,
                            format!("origin '{origin}' no longer exists"),
                            None,
                        );
                    }
                    Some(node) if !tree_eq(node, before, self.order) => {
                        return reject(
                            ConflictKind::StaleBase,
                            format!("subtree at '{origin}' changed since the diff was computed"),
                            Some(node),
                        );
                    }
                    Some(_) => {}
                }
                if existing.is_some() {
                    return reject(ConflictKind::Structural, "move target is occupied", existing);
                }
                self.check_parent(current, path)
            }
        }
    }

    fn check_parent(&self, current: &ConfigNode, path: &TagPath) -> Verdict {
        let Some(parent_path) = path.parent() else {
            return reject(ConflictKind::Structural, "the root cannot be added", None);
        };
        match current.get(&parent_path) {
            None => reject(
                ConflictKind::Structural,
                format!("parent '{parent_path}' does not exist"),
                None,
            ),
            Some(parent) if !parent.is_folder() => reject(
                ConflictKind::Structural,
                format!("parent '{parent_path}' is a {}", parent.kind()),
                Some(parent),
            ),
            Some(_) => Verdict::Apply,
        }
    }
}

/// Type definitions are set up before everything else and torn down after
/// everything else; all other records keep their relative order.
fn order_type_definitions(records: Vec<ChangeRecord>) -> Vec<ChangeRecord> {
    let (types, rest): (Vec<_>, Vec<_>) = records
        .into_iter()
        .partition(ChangeRecord::is_type_definition);
    let (teardown, setup): (Vec<_>, Vec<_>) = types.into_iter().partition(ChangeRecord::is_teardown);
    setup.into_iter().chain(rest).chain(teardown).collect()
}

/// Outcome of planning: the validated steps and everything rejected.
#[derive(Debug, Clone)]
pub struct PlanResult {
    steps: Vec<ChangeRecord>,
    conflicts: ConflictReport,
    already_present: Vec<TagPath>,
    projected: ConfigNode,
}

impl PlanResult {
    /// Records that passed validation, in apply order.
    pub fn steps(&self) -> &[ChangeRecord] {
        &self.steps
    }

    pub fn conflicts(&self) -> &ConflictReport {
        &self.conflicts
    }

    /// Adds dropped because the destination already holds equal nodes.
    pub fn already_present(&self) -> &[TagPath] {
        &self.already_present
    }

    pub fn has_conflicts(&self) -> bool {
        !self.conflicts.is_empty()
    }

    /// The plan to execute under `policy`, or the conflicts that stop it.
    pub fn into_executable(self, policy: ConflictPolicy) -> Result<ApplyPlan, ConflictReport> {
        match policy {
            ConflictPolicy::Abort if !self.conflicts.is_empty() => Err(self.conflicts),
            _ => Ok(ApplyPlan {
                steps: self.steps,
                projected: self.projected,
            }),
        }
    }
}

/// Validated, ordered records ready to apply.
#[derive(Debug, Clone)]
pub struct ApplyPlan {
    steps: Vec<ChangeRecord>,
    projected: ConfigNode,
}

impl ApplyPlan {
    pub fn records(&self) -> &[ChangeRecord] {
        &self.steps
    }

    pub fn into_records(self) -> Vec<ChangeRecord> {
        self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// The destination as it will look once every step has been applied.
    pub fn projected(&self) -> &ConfigNode {
        &self.projected
    }
}
