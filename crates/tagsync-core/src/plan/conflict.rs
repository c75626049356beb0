//! Conflicts found while validating a change set

use std::fmt;

use serde::{Deserialize, Serialize};
use tagsync_tree::{ConfigNode, TagPath};

use crate::diff::Operation;

/// Why a change cannot be applied as planned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConflictKind {
    /// The destination's shape rules the change out: wrong kind at the
    /// path, missing or non-folder parent, occupied target, leftover
    /// children, or a collision policy forbidding it.
    Structural,
    /// The destination no longer matches what the change was computed
    /// against.
    StaleBase,
}

impl fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConflictKind::Structural => write!(f, "structural conflict"),
            ConflictKind::StaleBase => write!(f, "stale base"),
        }
    }
}

/// One rejected change, with what was expected and what was found.
#[derive(Debug, Clone, PartialEq)]
pub struct Conflict {
    pub path: TagPath,
    pub kind: ConflictKind,
    pub operation: Operation,
    pub reason: String,
    pub expected: Option<ConfigNode>,
    pub actual: Option<ConfigNode>,
}

impl fmt::Display for Conflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} on {} '{}': {}",
            self.kind, self.operation, self.path, self.reason
        )
    }
}

/// Every conflict found for one plan, in plan order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConflictReport {
    conflicts: Vec<Conflict>,
}

impl ConflictReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, conflict: Conflict) {
        self.conflicts.push(conflict);
    }

    pub fn is_empty(&self) -> bool {
        self.conflicts.is_empty()
    }

    pub fn len(&self) -> usize {
        self.conflicts.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Conflict> {
        self.conflicts.iter()
    }

    pub fn paths(&self) -> impl Iterator<Item = &TagPath> {
        self.conflicts.iter().map(|c| &c.path)
    }

    pub fn of_kind(&self, kind: ConflictKind) -> impl Iterator<Item = &Conflict> {
        self.conflicts.iter().filter(move |c| c.kind == kind)
    }
}

impl IntoIterator for ConflictReport {
    type Item = Conflict;
    type IntoIter = std::vec::IntoIter<Conflict>;

    fn into_iter(self) -> Self::IntoIter {
        self.conflicts.into_iter()
    }
}

impl fmt::Display for ConflictReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for conflict in &self.conflicts {
            writeln!(f, "{conflict}")?;
        }
        Ok(())
    }
}
