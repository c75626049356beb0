//! Configuration nodes

use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tagsync_meta::Schema;

use crate::editor::Placement;
use crate::path::validate_name;
use crate::walk::Walk;
use crate::{Error, Properties, PropertyValue, Result, TagPath};

/// Name of the root folder holding type definitions.
pub const TYPES_FOLDER: &str = "_types_";

/// Node kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum NodeKind {
    Folder,
    Leaf,
    /// Reference to a type definition; never holds children
    ReferenceLink,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Folder => "Folder",
            NodeKind::Leaf => "Leaf",
            NodeKind::ReferenceLink => "ReferenceLink",
        }
    }

    pub fn can_hold_children(&self) -> bool {
        matches!(self, NodeKind::Folder)
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for NodeKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "Folder" => Ok(NodeKind::Folder),
            "Leaf" => Ok(NodeKind::Leaf),
            "ReferenceLink" => Ok(NodeKind::ReferenceLink),
            _ => Err(Error::UnknownKind {
                kind: s.to_string(),
            }),
        }
    }
}

/// A node in a configuration tree.
///
/// Children are keyed by name, so siblings are unique by construction.
/// Only folders hold children. The root's own name is not part of any
/// [`TagPath`] and is ignored by tree equality.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigNode {
    name: String,
    kind: NodeKind,
    properties: Properties,
    children: IndexMap<String, ConfigNode>,
}

impl ConfigNode {
    /// Node without properties or children.
    ///
    /// The name is not validated here; it is checked when the node is
    /// attached under a parent.
    pub fn new(name: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            name: name.into(),
            kind,
            properties: Properties::new(),
            children: IndexMap::new(),
        }
    }

    /// Empty root folder.
    pub fn root() -> Self {
        Self::new("", NodeKind::Folder)
    }

    pub fn folder(name: impl Into<String>) -> Self {
        Self::new(name, NodeKind::Folder)
    }

    pub fn leaf(name: impl Into<String>) -> Self {
        Self::new(name, NodeKind::Leaf)
    }

    pub fn reference(name: impl Into<String>) -> Self {
        Self::new(name, NodeKind::ReferenceLink)
    }

    /// Build a tree from `(path, kind, properties)` entries.
    ///
    /// Parents come before their children. An entry for the root path
    /// sets the root's properties and must be a folder.
    pub fn from_entries<I>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (TagPath, NodeKind, Properties)>,
    {
        let mut root = Self::root();
        let mut root_seen = false;

        for (path, kind, properties) in entries {
            let Some(name) = path.name() else {
                if root_seen {
                    return Err(Error::DuplicatePath {
                        path: String::new(),
                    });
                }
                if kind != NodeKind::Folder {
                    return Err(Error::NotAContainer {
                        path: String::new(),
                    });
                }
                root_seen = true;
                root.properties = properties;
                continue;
            };

            let parent_path = path.parent().unwrap_or_default();
            let parent = root.get_mut(&parent_path).ok_or_else(|| Error::MissingParent {
                path: path.to_string(),
            })?;
            if parent.children.contains_key(name) {
                return Err(Error::DuplicatePath {
                    path: path.to_string(),
                });
            }
            let mut node = Self::new(name, kind);
            node.properties = properties;
            parent.add_child_at(&parent_path, node)?;
        }
        Ok(root)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn properties(&self) -> &Properties {
        &self.properties
    }

    pub fn property(&self, name: &str) -> Option<&PropertyValue> {
        self.properties.get(name)
    }

    pub fn is_folder(&self) -> bool {
        self.kind == NodeKind::Folder
    }

    /// Children in stored order.
    pub fn children(&self) -> impl DoubleEndedIterator<Item = &ConfigNode> + ExactSizeIterator {
        self.children.values()
    }

    pub fn child(&self, name: &str) -> Option<&ConfigNode> {
        self.children.get(name)
    }

    /// Child names in stored order.
    pub fn child_names(&self) -> impl Iterator<Item = &str> {
        self.children.keys().map(String::as_str)
    }

    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    /// Rename a node that is not attached anywhere.
    ///
    /// Nodes below a parent are renamed through
    /// [`rename_child`](Self::rename_child), which keeps siblings unique.
    pub fn renamed(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub(crate) fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Change the node's kind.
    ///
    /// Fails if the new kind cannot hold the children this node has.
    pub fn set_kind(&mut self, kind: NodeKind) -> Result<()> {
        if !kind.can_hold_children() && self.has_children() {
            return Err(Error::NotAContainer {
                path: self.name.clone(),
            });
        }
        self.kind = kind;
        Ok(())
    }

    pub fn set_property(&mut self, name: impl Into<String>, value: impl Into<PropertyValue>) {
        self.properties.insert(name.into(), value.into());
    }

    pub fn set_properties(&mut self, properties: Properties) {
        self.properties = properties;
    }

    pub fn remove_property(&mut self, name: &str) -> Option<PropertyValue> {
        self.properties.remove(name)
    }

    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.set_property(name, value);
        self
    }

    /// Attach `child` after the existing children.
    ///
    /// Fails if this node cannot hold children, the child's name is
    /// invalid, or a sibling already has that name.
    pub fn add_child(&mut self, child: ConfigNode) -> Result<()> {
        self.add_child_at(&TagPath::root(), child)
    }

    pub(crate) fn add_child_at(&mut self, own_path: &TagPath, child: ConfigNode) -> Result<()> {
        validate_name(&child.name)?;
        if !self.kind.can_hold_children() {
            return Err(Error::NotAContainer {
                path: own_path.to_string(),
            });
        }
        if self.children.contains_key(&child.name) {
            return Err(Error::DuplicatePath {
                path: own_path.child(&child.name).to_string(),
            });
        }
        self.children.insert(child.name.clone(), child);
        Ok(())
    }

    /// Builder form of [`add_child`](Self::add_child).
    pub fn with_child(mut self, child: ConfigNode) -> Result<Self> {
        self.add_child(child)?;
        Ok(self)
    }

    /// Builder form attaching several children in order.
    pub fn with_children<I>(mut self, children: I) -> Result<Self>
    where
        I: IntoIterator<Item = ConfigNode>,
    {
        for child in children {
            self.add_child(child)?;
        }
        Ok(self)
    }

    /// Rename the child `from` to `to` in place, keeping its position.
    pub fn rename_child(&mut self, from: &str, to: &str) -> Result<()> {
        validate_name(to)?;
        let index = self
            .children
            .get_index_of(from)
            .ok_or_else(|| Error::not_found(from))?;
        if from == to {
            return Ok(());
        }
        if self.children.contains_key(to) {
            return Err(Error::DuplicatePath {
                path: to.to_string(),
            });
        }
        let Some((_, mut child)) = self.children.shift_remove_index(index) else {
            return Err(Error::not_found(from));
        };
        child.name = to.to_string();
        self.children.shift_insert(index, to.to_string(), child);
        Ok(())
    }

    /// Move the existing child `name` to the position `placement` asks for.
    /// An anchor that is not a child leaves the order alone.
    pub(crate) fn place_child(&mut self, name: &str, placement: &Placement) {
        let Some(from) = self.children.get_index_of(name) else {
            return;
        };
        let to = match placement {
            Placement::Last => return,
            Placement::First => 0,
            Placement::After(anchor) => match self.children.get_index_of(anchor.as_str()) {
                Some(index) if index < from => index + 1,
                Some(index) => index,
                None => return,
            },
        };
        self.children.move_index(from, to);
    }

    /// Detach and return the child `name`, keeping sibling order.
    pub fn remove_child(&mut self, name: &str) -> Option<ConfigNode> {
        self.children.shift_remove(name)
    }

    /// Drop every child.
    pub fn clear_children(&mut self) {
        self.children.clear();
    }

    /// Reorder children so that names listed in `order` come first, in that
    /// order. Unlisted children keep their relative order after them.
    pub fn reorder_children<'a>(&mut self, order: impl IntoIterator<Item = &'a str>) {
        let mut reordered = IndexMap::with_capacity(self.children.len());
        for name in order {
            if let Some(child) = self.children.shift_remove(name) {
                reordered.insert(name.to_string(), child);
            }
        }
        reordered.extend(self.children.drain(..));
        self.children = reordered;
    }

    /// Sort children by name, recursively.
    pub fn sort_children(&mut self) {
        self.children.sort_keys();
        for child in self.children.values_mut() {
            child.sort_children();
        }
    }

    /// Node at `path` below this node, found in O(depth).
    pub fn get(&self, path: &TagPath) -> Option<&ConfigNode> {
        path.segments()
            .iter()
            .try_fold(self, |node, name| node.children.get(name))
    }

    pub fn get_mut(&mut self, path: &TagPath) -> Option<&mut ConfigNode> {
        path.segments()
            .iter()
            .try_fold(self, |node, name| node.children.get_mut(name))
    }

    pub fn contains(&self, path: &TagPath) -> bool {
        self.get(path).is_some()
    }

    /// Deterministic pre-order traversal starting at this node (at the root
    /// path). Each call starts a fresh walk.
    pub fn walk(&self) -> Walk<'_> {
        Walk::new(self)
    }

    /// Number of nodes in this subtree, this node included.
    pub fn node_count(&self) -> usize {
        1 + self.children.values().map(ConfigNode::node_count).sum::<usize>()
    }

    /// This node without its children.
    pub fn detached(&self) -> Self {
        Self {
            name: self.name.clone(),
            kind: self.kind,
            properties: self.properties.clone(),
            children: IndexMap::new(),
        }
    }

    /// This node with each child reduced to a stub carrying only its name
    /// and kind, so child order is still visible.
    pub fn shallow(&self) -> Self {
        let children = self
            .children
            .iter()
            .map(|(name, child)| (name.clone(), Self::new(name.clone(), child.kind)))
            .collect();
        Self {
            name: self.name.clone(),
            kind: self.kind,
            properties: self.properties.clone(),
            children,
        }
    }

    /// Check every property in this subtree against `schema`.
    ///
    /// Paths in errors are relative to this node.
    pub fn validate(&self, schema: &Schema) -> Result<()> {
        for (path, node) in self.walk() {
            node.validate_properties(&path, schema)?;
        }
        Ok(())
    }

    /// Check this node's own properties against `schema`.
    pub fn validate_properties(&self, path: &TagPath, schema: &Schema) -> Result<()> {
        for (name, value) in &self.properties {
            let violation = |reason: String| Error::SchemaViolation {
                path: path.to_string(),
                property: name.clone(),
                reason,
            };
            match schema.expected(self.kind.as_str(), name) {
                None => {
                    return Err(violation(format!(
                        "property is not declared for {}",
                        self.kind
                    )));
                }
                Some(expected) if !expected.accepts(value.value_type()) => {
                    return Err(violation(format!(
                        "expected {expected}, found {}",
                        value.value_type()
                    )));
                }
                Some(_) => {}
            }
        }
        Ok(())
    }
}
