//! Node documents shared by the built-in codecs
//!
//! Every built-in layout stores nodes as JSON objects of the shape
//! `{"name", "kind", "properties", "children"}`, with kinds spelled
//! `Folder`, `Leaf` and `ReferenceLink`. Which of those keys appear in a
//! given file depends on the layout.

use serde_json::{Map, Value};
use tagsync_meta::Schema;
use tagsync_tree::{ConfigNode, NodeKind, Properties, PropertyValue, TagPath, validate_name};

use crate::{Error, Result};

pub const NAME: &str = "name";
pub const KIND: &str = "kind";
pub const PROPERTIES: &str = "properties";
pub const CHILDREN: &str = "children";
pub const REFERENCES: &str = "references";

/// `name`, `kind` and the given properties of `node` as a JSON object.
pub fn header<'a>(
    node: &ConfigNode,
    properties: impl IntoIterator<Item = (&'a String, &'a PropertyValue)>,
) -> Map<String, Value> {
    let properties: Map<String, Value> = properties
        .into_iter()
        .map(|(name, value)| (name.clone(), value.to_json()))
        .collect();

    let mut doc = Map::new();
    doc.insert(NAME.into(), Value::String(node.name().to_string()));
    doc.insert(KIND.into(), Value::String(node.kind().as_str().to_string()));
    doc.insert(PROPERTIES.into(), Value::Object(properties));
    doc
}

/// Children of `node` sorted by name, the order every built-in writes.
pub fn sorted_children(node: &ConfigNode) -> Vec<&ConfigNode> {
    let mut children: Vec<_> = node.children().collect();
    children.sort_by(|a, b| a.name().cmp(b.name()));
    children
}

/// Elements of a JSON array that must be present in `file`.
pub fn array_items<'a>(file: &str, value: &'a Value, what: &str) -> Result<&'a [Value]> {
    value
        .as_array()
        .map(Vec::as_slice)
        .ok_or_else(|| Error::parse(file, format!("{what} must be a JSON array")))
}

/// Attach a decoded child, reporting sibling clashes against `file`.
pub fn attach(file: &str, parent: &mut ConfigNode, child: ConfigNode) -> Result<()> {
    let name = child.name().to_string();
    parent.add_child(child).map_err(|e| match e {
        tagsync_tree::Error::DuplicatePath { .. } => {
            Error::parse(file, format!("duplicate sibling name '{name}'"))
        }
        other => Error::parse(file, other.to_string()),
    })
}

/// Check a decoded node's properties against the schema.
pub fn check_schema(file: &str, path: &TagPath, node: &ConfigNode, schema: &Schema) -> Result<()> {
    node.validate_properties(path, schema)
        .map_err(|e| Error::parse(file, e.to_string()))
}

/// Typed access to one node document inside `file`.
pub struct DocReader<'a> {
    file: &'a str,
    object: &'a Map<String, Value>,
}

impl<'a> DocReader<'a> {
    pub fn new(file: &'a str, value: &'a Value) -> Result<Self> {
        let object = value
            .as_object()
            .ok_or_else(|| Error::parse(file, "node document must be a JSON object"))?;
        Ok(Self { file, object })
    }

    pub fn file(&self) -> &'a str {
        self.file
    }

    /// Reject keys outside `allowed`.
    pub fn allow_only(&self, allowed: &[&str]) -> Result<()> {
        match self.object.keys().find(|k| !allowed.contains(&k.as_str())) {
            Some(key) => Err(Error::parse(self.file, format!("unexpected field '{key}'"))),
            None => Ok(()),
        }
    }

    pub fn get(&self, key: &str) -> Option<&'a Value> {
        self.object.get(key)
    }

    fn require(&self, key: &str) -> Result<&'a Value> {
        self.object
            .get(key)
            .ok_or_else(|| Error::parse(self.file, format!("missing field '{key}'")))
    }

    fn require_str(&self, key: &str) -> Result<&'a str> {
        self.require(key)?
            .as_str()
            .ok_or_else(|| Error::parse(self.file, format!("field '{key}' must be a string")))
    }

    pub fn name(&self) -> Result<String> {
        let name = self.require_str(NAME)?;
        validate_name(name).map_err(|e| Error::parse(self.file, e.to_string()))?;
        Ok(name.to_string())
    }

    /// Name of a root document, which may be empty.
    pub fn root_name(&self) -> Result<String> {
        self.require_str(NAME).map(str::to_string)
    }

    pub fn kind(&self) -> Result<NodeKind> {
        self.require_str(KIND)?
            .parse()
            .map_err(|e: tagsync_tree::Error| Error::parse(self.file, e.to_string()))
    }

    pub fn properties(&self) -> Result<Properties> {
        let object = self.require(PROPERTIES)?.as_object().ok_or_else(|| {
            Error::parse(self.file, format!("field '{PROPERTIES}' must be a JSON object"))
        })?;

        object
            .iter()
            .map(|(name, value)| {
                PropertyValue::try_from(value.clone())
                    .map(|v| (name.clone(), v))
                    .map_err(|e| Error::parse(self.file, format!("property '{name}': {e}")))
            })
            .collect()
    }

    /// Node with this document's name, kind and properties and no children.
    pub fn node(&self) -> Result<ConfigNode> {
        let mut node = ConfigNode::new(self.name()?, self.kind()?);
        node.set_properties(self.properties()?);
        Ok(node)
    }

    /// Require the document's kind to be `expected`.
    pub fn expect_kind(&self, node: &ConfigNode, expected: &[NodeKind]) -> Result<()> {
        if expected.contains(&node.kind()) {
            Ok(())
        } else {
            Err(Error::parse(
                self.file,
                format!("'{}' has kind {} which does not belong here", node.name(), node.kind()),
            ))
        }
    }
}
