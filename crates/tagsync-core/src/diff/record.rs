//! Change records and differ options

use std::fmt;

use serde::{Deserialize, Serialize};
use tagsync_tree::{ConfigNode, Edit, OrderPolicy, Placement, TYPES_FOLDER, TagPath};

/// What a [`ChangeRecord`] does to the destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Operation {
    Add,
    Remove,
    Modify,
    Move,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::Add => "Add",
            Operation::Remove => "Remove",
            Operation::Modify => "Modify",
            Operation::Move => "Move",
        };
        write!(f, "{name}")
    }
}

/// One step of a structural delta.
///
/// Add, Remove and Modify concern a single node and carry shallow
/// snapshots (kind, properties and child stubs). A Move concerns a whole
/// subtree: `origin` is where it sits in the destination, `path` where it
/// should end up, and both snapshots hold the full subtree.
///
/// Adds and Moves also say where the node goes among its new siblings,
/// so sources with significant child order come out in that order.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeRecord {
    pub path: TagPath,
    pub operation: Operation,
    pub before: Option<ConfigNode>,
    pub after: Option<ConfigNode>,
    pub origin: Option<TagPath>,
    pub placement: Placement,
}

impl ChangeRecord {
    pub fn add(path: TagPath, after: ConfigNode) -> Self {
        Self {
            path,
            operation: Operation::Add,
            before: None,
            after: Some(after),
            origin: None,
            placement: Placement::Last,
        }
    }

    pub fn remove(path: TagPath, before: ConfigNode) -> Self {
        Self {
            path,
            operation: Operation::Remove,
            before: Some(before),
            after: None,
            origin: None,
            placement: Placement::Last,
        }
    }

    pub fn modify(path: TagPath, before: ConfigNode, after: ConfigNode) -> Self {
        Self {
            path,
            operation: Operation::Modify,
            before: Some(before),
            after: Some(after),
            origin: None,
            placement: Placement::Last,
        }
    }

    pub fn relocate(origin: TagPath, path: TagPath, before: ConfigNode, after: ConfigNode) -> Self {
        Self {
            path,
            operation: Operation::Move,
            before: Some(before),
            after: Some(after),
            origin: Some(origin),
            placement: Placement::Last,
        }
    }

    pub fn with_placement(mut self, placement: Placement) -> Self {
        self.placement = placement;
        self
    }

    /// Every destination path this record touches: `path`, plus `origin`
    /// for a Move.
    pub fn touched_paths(&self) -> impl Iterator<Item = &TagPath> {
        std::iter::once(&self.path).chain(self.origin.as_ref())
    }

    /// Whether the record lands inside the `_types_` folder at the root.
    pub fn is_type_definition(&self) -> bool {
        self.path
            .segments()
            .first()
            .is_some_and(|s| s == TYPES_FOLDER)
    }

    /// Whether the record tears content down: a Remove, or a Modify to a
    /// kind that cannot hold the children the node had.
    pub fn is_teardown(&self) -> bool {
        match self.operation {
            Operation::Remove => true,
            Operation::Modify => match (&self.before, &self.after) {
                (Some(before), Some(after)) => {
                    before.has_children() && !after.kind().can_hold_children()
                }
                _ => false,
            },
            Operation::Add | Operation::Move => false,
        }
    }

    /// The same record with every path placed under `base`.
    pub fn rebased(&self, base: &TagPath) -> Self {
        Self {
            path: base.concat(&self.path),
            origin: self.origin.as_ref().map(|o| base.concat(o)),
            ..self.clone()
        }
    }

    /// The tree edit that carries this record out on an in-memory tree.
    ///
    /// Returns `None` for a record missing the snapshot its operation
    /// needs.
    pub fn to_edit(&self) -> Option<Edit> {
        let edit = match self.operation {
            Operation::Add => Edit::Insert {
                path: self.path.clone(),
                node: self.after.as_ref()?.detached(),
                placement: self.placement.clone(),
            },
            Operation::Modify => Edit::Update {
                path: self.path.clone(),
                node: self.after.clone()?,
            },
            Operation::Remove => Edit::Remove {
                path: self.path.clone(),
            },
            Operation::Move => Edit::Move {
                from: self.origin.clone()?,
                to: self.path.clone(),
                placement: self.placement.clone(),
            },
        };
        Some(edit)
    }
}

impl fmt::Display for ChangeRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.origin {
            Some(origin) => write!(f, "{} {} -> {}", self.operation, origin, self.path),
            None => write!(f, "{} {}", self.operation, self.path),
        }
    }
}

/// Knobs for [`diff`](crate::diff::diff).
///
/// There is no default order policy; callers state which one applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiffOptions {
    pub order: OrderPolicy,
    /// Collapse matching Add/Remove subtrees into Moves.
    pub detect_moves: bool,
}

impl DiffOptions {
    pub fn new(order: OrderPolicy) -> Self {
        Self {
            order,
            detect_moves: true,
        }
    }

    pub fn without_moves(mut self) -> Self {
        self.detect_moves = false;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(text: &str) -> TagPath {
        TagPath::parse(text).unwrap()
    }

    #[test]
    fn display_names_operation_and_paths() {
        let add = ChangeRecord::add(p("Line1/Speed"), ConfigNode::leaf("Speed"));
        let moved = ChangeRecord::relocate(
            p("Old/M1"),
            p("New/M1"),
            ConfigNode::leaf("M1"),
            ConfigNode::leaf("M1"),
        );
        assert_eq!(add.to_string(), "Add Line1/Speed");
        assert_eq!(moved.to_string(), "Move Old/M1 -> New/M1");
    }

    #[test]
    fn type_definitions_are_recognised_by_target_path() {
        let moved = ChangeRecord::relocate(
            p("Motor"),
            p("_types_/Motor"),
            ConfigNode::folder("Motor"),
            ConfigNode::folder("Motor"),
        );
        assert!(moved.is_type_definition());
        assert!(ChangeRecord::remove(p("_types_"), ConfigNode::folder("_types_")).is_type_definition());
        assert!(!ChangeRecord::add(p("types/Motor"), ConfigNode::folder("Motor")).is_type_definition());
    }

    #[test]
    fn kind_change_to_leaf_with_children_is_teardown() {
        let before = ConfigNode::folder("Line1")
            .with_child(ConfigNode::leaf("Speed"))
            .unwrap();
        let record = ChangeRecord::modify(p("Line1"), before.shallow(), ConfigNode::leaf("Line1"));
        assert!(record.is_teardown());
    }

    #[test]
    fn rebased_moves_both_paths() {
        let moved = ChangeRecord::relocate(
            p("A"),
            p("B"),
            ConfigNode::leaf("A"),
            ConfigNode::leaf("B"),
        );
        let rebased = moved.rebased(&p("Plant/Area"));
        assert_eq!(rebased.path, p("Plant/Area/B"));
        assert_eq!(rebased.origin, Some(p("Plant/Area/A")));
    }
}
