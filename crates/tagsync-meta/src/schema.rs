//! Per-kind property schema

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tagsync_fs::{ConfigStore, NormalizedPath};

use crate::{Error, Result};

/// Value type a schema expects for a property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    String,
    Number,
    Boolean,
    /// JSON object or array
    Structured,
    /// Any legal property value
    Any,
}

impl ValueType {
    /// Whether a value of type `actual` satisfies this expectation.
    pub fn accepts(&self, actual: ValueType) -> bool {
        *self == ValueType::Any || *self == actual
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueType::String => "string",
            ValueType::Number => "number",
            ValueType::Boolean => "boolean",
            ValueType::Structured => "structured",
            ValueType::Any => "any",
        };
        write!(f, "{name}")
    }
}

/// Property types per node kind.
///
/// Kinds are keyed by their document spelling (`Folder`, `Leaf`,
/// `ReferenceLink`). A strict schema rejects properties it does not
/// declare; a permissive one accepts them with any type.
///
/// ```toml
/// strict = true
///
/// [kinds.Leaf]
/// unit = "string"
/// value = "any"
/// alarms = "structured"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Schema {
    #[serde(default)]
    pub strict: bool,
    #[serde(default)]
    pub kinds: BTreeMap<String, BTreeMap<String, ValueType>>,
}

impl Schema {
    /// Schema accepting every property of every kind.
    pub fn permissive() -> Self {
        Self::default()
    }

    /// Schema accepting only declared properties.
    pub fn strict() -> Self {
        Self {
            strict: true,
            kinds: BTreeMap::new(),
        }
    }

    /// Declare a property type for a kind.
    pub fn with_property(
        mut self,
        kind: impl Into<String>,
        property: impl Into<String>,
        value_type: ValueType,
    ) -> Self {
        self.kinds
            .entry(kind.into())
            .or_default()
            .insert(property.into(), value_type);
        self
    }

    /// Expected type of `property` on `kind`.
    ///
    /// Returns `None` when the property is not allowed at all, which only
    /// happens under a strict schema.
    pub fn expected(&self, kind: &str, property: &str) -> Option<ValueType> {
        match self.kinds.get(kind).and_then(|props| props.get(property)) {
            Some(value_type) => Some(*value_type),
            None if self.strict => None,
            None => Some(ValueType::Any),
        }
    }

    /// Load a schema document (TOML, JSON or YAML by extension).
    pub fn load(path: &NormalizedPath) -> Result<Self> {
        let schema: Schema = ConfigStore::new().load(path)?;
        schema.check_kinds()?;
        Ok(schema)
    }

    fn check_kinds(&self) -> Result<()> {
        const KNOWN: [&str; 3] = ["Folder", "Leaf", "ReferenceLink"];
        match self.kinds.keys().find(|k| !KNOWN.contains(&k.as_str())) {
            Some(kind) => Err(Error::InvalidSchema {
                message: format!("unknown node kind '{kind}'"),
            }),
            None => Ok(()),
        }
    }
}
