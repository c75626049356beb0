//! Tree and node equality

use serde::{Deserialize, Serialize};

use crate::ConfigNode;

/// Whether sibling order takes part in equality.
///
/// Passed explicitly wherever nodes are compared; no comparison in this
/// workspace picks one silently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderPolicy {
    /// Sibling order is part of the tree's content.
    Significant,
    /// Siblings are compared as a set keyed by name.
    Ignored,
}

/// Full subtree equality.
///
/// Same kind, same properties (deep, property order irrelevant), same
/// child names, each child recursively equal. The names of `a` and `b`
/// themselves are not compared, so a renamed subtree is still equal.
pub fn tree_eq(a: &ConfigNode, b: &ConfigNode, order: OrderPolicy) -> bool {
    if a.kind() != b.kind() || a.properties() != b.properties() {
        return false;
    }
    if a.children().len() != b.children().len() {
        return false;
    }
    if order == OrderPolicy::Significant && !a.child_names().eq(b.child_names()) {
        return false;
    }
    a.children().all(|child| {
        b.child(child.name())
            .is_some_and(|other| tree_eq(child, other, order))
    })
}

/// Equality of a single node's own content.
///
/// Compares kind and properties. Under [`OrderPolicy::Significant`] the
/// relative order of children present in both nodes must also match;
/// children present on one side only are not part of node content.
pub fn content_eq(a: &ConfigNode, b: &ConfigNode, order: OrderPolicy) -> bool {
    if a.kind() != b.kind() || a.properties() != b.properties() {
        return false;
    }
    match order {
        OrderPolicy::Ignored => true,
        OrderPolicy::Significant => {
            let common_a = a.child_names().filter(|name| b.child(name).is_some());
            let common_b = b.child_names().filter(|name| a.child(name).is_some());
            common_a.eq(common_b)
        }
    }
}
