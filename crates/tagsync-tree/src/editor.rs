//! Pure tree editing
//!
//! [`TreeEditor`] owns a private copy of a tree and applies node-level
//! edits to it; the tree it was created from is never touched. Used to
//! apply plans to the decoded file side and by in-memory live trees.

use tracing::trace;

use crate::{ConfigNode, Error, Result, TagPath};

/// Where an attached node goes among its siblings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum Placement {
    /// After every existing sibling
    #[default]
    Last,
    /// Before every existing sibling
    First,
    /// Right after the named sibling, or last if there is no such sibling
    After(String),
}

impl Placement {
    /// The placement that puts a node right after `previous`, or first
    /// when it has no previous sibling.
    pub fn following(previous: Option<&str>) -> Self {
        match previous {
            Some(name) => Placement::After(name.to_string()),
            None => Placement::First,
        }
    }
}

/// One node-level edit.
#[derive(Debug, Clone, PartialEq)]
pub enum Edit {
    /// Attach `node` (with any children it carries) at `path`.
    Insert {
        path: TagPath,
        node: ConfigNode,
        placement: Placement,
    },
    /// Replace kind and properties at `path`, keeping existing children.
    Update { path: TagPath, node: ConfigNode },
    /// Detach the subtree at `path`.
    Remove { path: TagPath },
    /// Relocate the subtree at `from` to `to`, renaming it to `to`'s name.
    Move {
        from: TagPath,
        to: TagPath,
        placement: Placement,
    },
}

impl Edit {
    /// The path the edit lands on.
    pub fn path(&self) -> &TagPath {
        match self {
            Edit::Insert { path, .. } | Edit::Update { path, .. } | Edit::Remove { path } => path,
            Edit::Move { to, .. } => to,
        }
    }
}

/// Applies [`Edit`]s to an owned copy of a tree.
#[derive(Debug, Clone)]
pub struct TreeEditor {
    root: ConfigNode,
}

impl TreeEditor {
    pub fn new(root: &ConfigNode) -> Self {
        Self { root: root.clone() }
    }

    pub fn from_owned(root: ConfigNode) -> Self {
        Self { root }
    }

    /// Current state of the edited tree.
    pub fn tree(&self) -> &ConfigNode {
        &self.root
    }

    pub fn finish(self) -> ConfigNode {
        self.root
    }

    pub fn apply(&mut self, edit: &Edit) -> Result<()> {
        trace!(?edit, "Applying tree edit");
        match edit {
            Edit::Insert {
                path,
                node,
                placement,
            } => self.insert_placed(path, node.clone(), placement),
            Edit::Update { path, node } => self.update(path, node),
            Edit::Remove { path } => self.remove(path).map(drop),
            Edit::Move {
                from,
                to,
                placement,
            } => self.relocate_placed(from, to, placement),
        }
    }

    pub fn apply_all<'a>(&mut self, edits: impl IntoIterator<Item = &'a Edit>) -> Result<()> {
        edits.into_iter().try_for_each(|edit| self.apply(edit))
    }

    fn parent_of(&mut self, path: &TagPath) -> Result<(&mut ConfigNode, TagPath)> {
        let parent_path = path.parent().ok_or_else(|| Error::RootOperation {
            operation: "attach or detach".into(),
        })?;
        let parent = self
            .root
            .get_mut(&parent_path)
            .ok_or_else(|| Error::MissingParent {
                path: path.to_string(),
            })?;
        Ok((parent, parent_path))
    }

    /// Attach `node` at `path` after its existing siblings; the node is
    /// renamed to the path's last segment.
    pub fn insert(&mut self, path: &TagPath, node: ConfigNode) -> Result<()> {
        self.insert_placed(path, node, &Placement::Last)
    }

    /// Attach `node` at `path`, positioned among its siblings by
    /// `placement`.
    pub fn insert_placed(
        &mut self,
        path: &TagPath,
        mut node: ConfigNode,
        placement: &Placement,
    ) -> Result<()> {
        let name = path.name().ok_or_else(|| Error::RootOperation {
            operation: "insert".into(),
        })?;
        node.set_name(name);
        let (parent, parent_path) = self.parent_of(path)?;
        parent.add_child_at(&parent_path, node)?;
        parent.place_child(name, placement);
        Ok(())
    }

    /// Replace kind and properties at `path`.
    ///
    /// Existing children are kept. Children that `node` lists (as stubs or
    /// full nodes) determine the order of the matching existing children.
    /// Changing to a kind that cannot hold children requires the node to
    /// have none left.
    pub fn update(&mut self, path: &TagPath, node: &ConfigNode) -> Result<()> {
        let target = self
            .root
            .get_mut(path)
            .ok_or_else(|| Error::not_found(path))?;
        if !node.kind().can_hold_children() && target.has_children() {
            return Err(Error::NotAContainer {
                path: path.to_string(),
            });
        }
        target.set_kind(node.kind())?;
        target.set_properties(node.properties().clone());
        target.reorder_children(node.child_names());
        Ok(())
    }

    /// Detach and return the subtree at `path`.
    pub fn remove(&mut self, path: &TagPath) -> Result<ConfigNode> {
        let name = path.name().ok_or_else(|| Error::RootOperation {
            operation: "remove".into(),
        })?;
        let (parent, _) = self.parent_of(path)?;
        parent
            .remove_child(name)
            .ok_or_else(|| Error::not_found(path))
    }

    /// Move the subtree at `from` to `to`, after the target's siblings.
    pub fn relocate(&mut self, from: &TagPath, to: &TagPath) -> Result<()> {
        self.relocate_placed(from, to, &Placement::Last)
    }

    /// Move the subtree at `from` to `to`, positioned by `placement`.
    ///
    /// Nothing changes if the target cannot take it.
    pub fn relocate_placed(&mut self, from: &TagPath, to: &TagPath, placement: &Placement) -> Result<()> {
        if from.is_ancestor_of(to) {
            return Err(Error::invalid_path(
                to.to_string(),
                format!("cannot move '{from}' into its own subtree"),
            ));
        }
        if self.root.contains(to) {
            return Err(Error::DuplicatePath {
                path: to.to_string(),
            });
        }
        let target_parent = to.parent().unwrap_or_default();
        match self.root.get(&target_parent) {
            Some(parent) if parent.is_folder() => {}
            Some(_) => {
                return Err(Error::NotAContainer {
                    path: target_parent.to_string(),
                });
            }
            None => {
                return Err(Error::MissingParent {
                    path: to.to_string(),
                });
            }
        }

        let subtree = self.remove(from)?;
        self.insert_placed(to, subtree, placement)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{NodeKind, OrderPolicy, PropertyValue, tree_eq};
    use pretty_assertions::assert_eq;

    fn p(text: &str) -> TagPath {
        TagPath::parse(text).unwrap()
    }

    fn sample() -> ConfigNode {
        ConfigNode::root()
            .with_child(
                ConfigNode::folder("Line1")
                    .with_child(ConfigNode::leaf("Speed").with_property("unit", "rpm"))
                    .unwrap(),
            )
            .unwrap()
    }

    #[test]
    fn edits_leave_the_source_tree_untouched() {
        let original = sample();
        let mut editor = TreeEditor::new(&original);

        editor.remove(&p("Line1/Speed")).unwrap();

        assert!(original.contains(&p("Line1/Speed")));
        assert!(!editor.tree().contains(&p("Line1/Speed")));
    }

    #[test]
    fn insert_requires_folder_parent() {
        let mut editor = TreeEditor::new(&sample());
        let err = editor
            .insert(&p("Line1/Speed/Inner"), ConfigNode::leaf("Inner"))
            .unwrap_err();
        assert!(matches!(err, Error::NotAContainer { .. }));

        let err = editor
            .insert(&p("Nope/Inner"), ConfigNode::leaf("Inner"))
            .unwrap_err();
        assert!(matches!(err, Error::MissingParent { .. }));
    }

    #[test]
    fn update_keeps_children() {
        let mut editor = TreeEditor::new(&sample());
        let replacement = ConfigNode::folder("Line1").with_property("area", "north");

        editor.update(&p("Line1"), &replacement).unwrap();

        let line1 = editor.tree().get(&p("Line1")).unwrap();
        assert_eq!(line1.property("area"), Some(&PropertyValue::from("north")));
        assert!(line1.child("Speed").is_some());
    }

    #[test]
    fn update_to_leaf_requires_no_children() {
        let mut editor = TreeEditor::new(&sample());
        let err = editor
            .update(&p("Line1"), &ConfigNode::leaf("Line1"))
            .unwrap_err();
        assert!(matches!(err, Error::NotAContainer { .. }));

        editor.remove(&p("Line1/Speed")).unwrap();
        editor.update(&p("Line1"), &ConfigNode::leaf("Line1")).unwrap();
        assert_eq!(
            editor.tree().get(&p("Line1")).unwrap().kind(),
            NodeKind::Leaf
        );
    }

    #[test]
    fn relocate_renames_and_keeps_content() {
        let original = sample();
        let mut editor = TreeEditor::new(&original);
        editor
            .insert(&p("Line2"), ConfigNode::folder("Line2"))
            .unwrap();

        editor.relocate(&p("Line1/Speed"), &p("Line2/Rate")).unwrap();

        let moved = editor.tree().get(&p("Line2/Rate")).unwrap();
        assert_eq!(moved.name(), "Rate");
        assert!(tree_eq(
            moved,
            original.get(&p("Line1/Speed")).unwrap(),
            OrderPolicy::Significant
        ));
    }

    #[test]
    fn placed_insert_lands_next_to_its_anchor() {
        let tree = ConfigNode::root()
            .with_children(["A", "C"].map(ConfigNode::leaf))
            .unwrap();
        let mut editor = TreeEditor::new(&tree);

        editor
            .apply(&Edit::Insert {
                path: p("B"),
                node: ConfigNode::leaf("B"),
                placement: Placement::following(Some("A")),
            })
            .unwrap();
        editor
            .apply(&Edit::Insert {
                path: p("Z"),
                node: ConfigNode::leaf("Z"),
                placement: Placement::following(None),
            })
            .unwrap();

        let names: Vec<_> = editor.tree().child_names().collect();
        assert_eq!(names, vec!["Z", "A", "B", "C"]);
    }

    #[test]
    fn placed_relocate_reorders_within_the_parent() {
        let tree = ConfigNode::root()
            .with_children(["A", "B", "C"].map(ConfigNode::leaf))
            .unwrap();
        let mut editor = TreeEditor::new(&tree);

        editor
            .relocate_placed(&p("C"), &p("D"), &Placement::First)
            .unwrap();

        let names: Vec<_> = editor.tree().child_names().collect();
        assert_eq!(names, vec!["D", "A", "B"]);
    }

    #[test]
    fn relocate_into_own_subtree_fails() {
        let mut editor = TreeEditor::new(&sample());
        assert!(editor.relocate(&p("Line1"), &p("Line1/Sub")).is_err());
        assert!(editor.tree().contains(&p("Line1")));
    }

    #[test]
    fn root_cannot_be_removed() {
        let mut editor = TreeEditor::new(&sample());
        assert!(matches!(
            editor.remove(&TagPath::root()),
            Err(Error::RootOperation { .. })
        ));
    }
}
