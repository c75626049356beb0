//! Tag paths

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::{Error, Result};

/// Check that `name` can be used as a node name.
///
/// Names are non-empty and never contain `/`.
pub fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::InvalidName {
            name: name.to_string(),
            reason: "name is empty".into(),
        });
    }
    if name.contains('/') {
        return Err(Error::InvalidName {
            name: name.to_string(),
            reason: "name contains '/'".into(),
        });
    }
    Ok(())
}

/// Location of a node: the names leading to it from the tree root.
///
/// Case-sensitive and `/`-delimited in text form. The empty path is the
/// root. Ordering is segment-wise lexicographic, so a parent always sorts
/// before its descendants.
#[derive(Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TagPath {
    segments: Vec<String>,
}

impl TagPath {
    pub fn root() -> Self {
        Self::default()
    }

    /// Parse a `/`-delimited path; `""` is the root.
    pub fn parse(text: &str) -> Result<Self> {
        if text.is_empty() {
            return Ok(Self::root());
        }
        let mut segments = Vec::new();
        for segment in text.split('/') {
            if segment.is_empty() {
                return Err(Error::invalid_path(text, "empty path segment"));
            }
            segments.push(segment.to_string());
        }
        Ok(Self { segments })
    }

    /// Build a path from already separated names.
    pub fn from_segments<I, S>(segments: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let segments: Vec<String> = segments.into_iter().map(Into::into).collect();
        for segment in &segments {
            validate_name(segment)?;
        }
        Ok(Self { segments })
    }

    /// Path of the child `name` under this path.
    ///
    /// `name` is expected to be a valid node name, which every name taken
    /// from a [`ConfigNode`](crate::ConfigNode) is.
    pub fn child(&self, name: &str) -> Self {
        debug_assert!(validate_name(name).is_ok(), "invalid node name {name:?}");
        let mut segments = self.segments.clone();
        segments.push(name.to_string());
        Self { segments }
    }

    /// Path of the child `name`, validating the name first.
    pub fn join(&self, name: &str) -> Result<Self> {
        validate_name(name)?;
        Ok(self.child(name))
    }

    /// `rel` appended to this path.
    pub fn concat(&self, rel: &TagPath) -> Self {
        let mut segments = self.segments.clone();
        segments.extend(rel.segments.iter().cloned());
        Self { segments }
    }

    pub fn parent(&self) -> Option<Self> {
        let (_, init) = self.segments.split_last()?;
        Some(Self {
            segments: init.to_vec(),
        })
    }

    /// Last segment; `None` for the root.
    pub fn name(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Whether `prefix` is this path or one of its ancestors.
    pub fn starts_with(&self, prefix: &TagPath) -> bool {
        self.segments.starts_with(&prefix.segments)
    }

    /// Whether this path is a strict ancestor of `other`.
    pub fn is_ancestor_of(&self, other: &TagPath) -> bool {
        other.depth() > self.depth() && other.starts_with(self)
    }

    /// Remainder of this path below `prefix`.
    pub fn strip_prefix(&self, prefix: &TagPath) -> Option<Self> {
        self.segments
            .strip_prefix(prefix.segments.as_slice())
            .map(|rest| Self {
                segments: rest.to_vec(),
            })
    }

    /// Number of trailing segments the two paths share.
    pub fn common_suffix_len(&self, other: &TagPath) -> usize {
        self.segments
            .iter()
            .rev()
            .zip(other.segments.iter().rev())
            .take_while(|(a, b)| a == b)
            .count()
    }
}

impl fmt::Display for TagPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("/"))
    }
}

impl fmt::Debug for TagPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TagPath({:?})", self.segments.join("/"))
    }
}

impl FromStr for TagPath {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Serialize for TagPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TagPath {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Self::parse(&text).map_err(serde::de::Error::custom)
    }
}
