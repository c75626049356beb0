//! Typed property values

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use tagsync_meta::ValueType;

use crate::Error;

/// Property name to value. Ordered by name, so comparison ignores the order
/// properties were set in.
pub type Properties = BTreeMap<String, PropertyValue>;

/// A property value.
///
/// Numbers keep their JSON representation, so `1` and `1.0` are different
/// values. `null` has no representation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Value", into = "Value")]
pub enum PropertyValue {
    String(String),
    Number(Number),
    Boolean(bool),
    /// A JSON object or array, such as an alarm list or expression binding
    Structured(Value),
}

impl PropertyValue {
    pub fn value_type(&self) -> ValueType {
        match self {
            PropertyValue::String(_) => ValueType::String,
            PropertyValue::Number(_) => ValueType::Number,
            PropertyValue::Boolean(_) => ValueType::Boolean,
            PropertyValue::Structured(_) => ValueType::Structured,
        }
    }

    pub fn is_structured(&self) -> bool {
        matches!(self, PropertyValue::Structured(_))
    }

    pub fn to_json(&self) -> Value {
        match self {
            PropertyValue::String(s) => Value::String(s.clone()),
            PropertyValue::Number(n) => Value::Number(n.clone()),
            PropertyValue::Boolean(b) => Value::Bool(*b),
            PropertyValue::Structured(v) => v.clone(),
        }
    }

    /// Structured value from JSON; only objects and arrays qualify.
    pub fn structured(value: Value) -> Result<Self, Error> {
        match value {
            Value::Object(_) | Value::Array(_) => Ok(PropertyValue::Structured(value)),
            other => Err(Error::InvalidValue {
                reason: format!("structured values must be objects or arrays, got {other}"),
            }),
        }
    }
}

impl TryFrom<Value> for PropertyValue {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Null => Err(Error::InvalidValue {
                reason: "null is not a property value".into(),
            }),
            Value::String(s) => Ok(PropertyValue::String(s)),
            Value::Number(n) => Ok(PropertyValue::Number(n)),
            Value::Bool(b) => Ok(PropertyValue::Boolean(b)),
            structured @ (Value::Object(_) | Value::Array(_)) => {
                Ok(PropertyValue::Structured(structured))
            }
        }
    }
}

impl From<PropertyValue> for Value {
    fn from(value: PropertyValue) -> Self {
        match value {
            PropertyValue::String(s) => Value::String(s),
            PropertyValue::Number(n) => Value::Number(n),
            PropertyValue::Boolean(b) => Value::Bool(b),
            PropertyValue::Structured(v) => v,
        }
    }
}

impl From<&str> for PropertyValue {
    fn from(s: &str) -> Self {
        PropertyValue::String(s.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(s: String) -> Self {
        PropertyValue::String(s)
    }
}

impl From<bool> for PropertyValue {
    fn from(b: bool) -> Self {
        PropertyValue::Boolean(b)
    }
}

impl From<i64> for PropertyValue {
    fn from(n: i64) -> Self {
        PropertyValue::Number(n.into())
    }
}

impl From<u64> for PropertyValue {
    fn from(n: u64) -> Self {
        PropertyValue::Number(n.into())
    }
}
