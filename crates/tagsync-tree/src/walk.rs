//! Pre-order traversal

use crate::{ConfigNode, TagPath};

/// Lazy pre-order iterator over `(path, node)` pairs.
///
/// Children are visited in stored order. Paths are relative to the node
/// the walk started from, which is yielded first with the root path.
pub struct Walk<'a> {
    stack: Vec<(TagPath, &'a ConfigNode)>,
}

impl<'a> Walk<'a> {
    pub(crate) fn new(start: &'a ConfigNode) -> Self {
        Self {
            stack: vec![(TagPath::root(), start)],
        }
    }
}

impl<'a> Iterator for Walk<'a> {
    type Item = (TagPath, &'a ConfigNode);

    fn next(&mut self) -> Option<Self::Item> {
        let (path, node) = self.stack.pop()?;
        // Reverse push so the first child is popped first
        for child in node.children().rev() {
            self.stack.push((path.child(child.name()), child));
        }
        Some((path, node))
    }
}
