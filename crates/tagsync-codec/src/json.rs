//! Canonical JSON rendering and parsing

use serde_json::{Map, Value};

use crate::{Error, Result};

/// Copy of `value` with object keys sorted at every level.
pub fn sort_value(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut sorted = Map::new();
            let mut keys: Vec<_> = map.keys().collect();
            keys.sort();
            for key in keys {
                if let Some(v) = map.get(key) {
                    sorted.insert(key.clone(), sort_value(v));
                }
            }
            Value::Object(sorted)
        }
        Value::Array(arr) => Value::Array(arr.iter().map(sort_value).collect()),
        other => other.clone(),
    }
}

/// Render `value` byte-stably: sorted keys, two-space indentation and a
/// trailing newline.
pub fn to_canonical_bytes(value: &Value) -> Result<Vec<u8>> {
    let mut rendered = serde_json::to_string_pretty(&sort_value(value))?;
    rendered.push('\n');
    Ok(rendered.into_bytes())
}

/// Parse one file's bytes, classifying failures against `file`.
pub fn parse_bytes(file: &str, bytes: &[u8]) -> Result<Value> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| Error::parse(file, format!("invalid UTF-8: {e}")))?;
    serde_json::from_str(text).map_err(|e| Error::parse(file, format!("invalid JSON: {e}")))
}
