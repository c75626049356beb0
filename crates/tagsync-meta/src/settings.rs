//! The synchronization settings document
//!
//! A settings document is a list of entries, each pairing one subtree of a
//! live tag provider with one directory of exported files:
//!
//! ```json
//! [
//!   {
//!     "provider": "default",
//!     "baseTagPath": "Line1",
//!     "sourcePath": "tags/line1",
//!     "exportMode": "structuredByType",
//!     "collisionPolicy": "o",
//!     "excludeUdtDefinitions": false
//!   }
//! ]
//! ```
//!
//! TOML has no top-level arrays, so TOML documents use `[[entries]]`
//! tables instead. Both shapes load into [`SyncSettings`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tagsync_fs::{ConfigStore, NormalizedPath};
use tracing::debug;

use crate::{Error, Result};

/// How an import treats content that already exists at the destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CollisionPolicy {
    /// Any change touching existing content is a conflict.
    #[default]
    #[serde(rename = "a", alias = "abort")]
    Abort,
    /// Additions are applied and existing nodes take the incoming
    /// properties on top of their own; nothing is removed.
    #[serde(rename = "m", alias = "merge")]
    Merge,
    /// Additions and modifications are applied, nothing is removed.
    #[serde(rename = "o", alias = "overwrite")]
    Overwrite,
    /// Only additions are applied; existing content is left alone.
    #[serde(rename = "i", alias = "ignore")]
    Ignore,
    /// The destination becomes a mirror of the source.
    #[serde(rename = "d", alias = "deleteAndReplace")]
    DeleteAndReplace,
}

impl CollisionPolicy {
    /// Single-letter code used in settings documents.
    pub fn code(&self) -> &'static str {
        match self {
            CollisionPolicy::Abort => "a",
            CollisionPolicy::Merge => "m",
            CollisionPolicy::Overwrite => "o",
            CollisionPolicy::Ignore => "i",
            CollisionPolicy::DeleteAndReplace => "d",
        }
    }
}

impl FromStr for CollisionPolicy {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "a" | "abort" => Ok(CollisionPolicy::Abort),
            "m" | "merge" => Ok(CollisionPolicy::Merge),
            "o" | "overwrite" => Ok(CollisionPolicy::Overwrite),
            "i" | "ignore" => Ok(CollisionPolicy::Ignore),
            "d" | "deleteAndReplace" => Ok(CollisionPolicy::DeleteAndReplace),
            _ => Err(Error::InvalidCollisionPolicy { code: s.to_string() }),
        }
    }
}

impl fmt::Display for CollisionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CollisionPolicy::Abort => "abort",
            CollisionPolicy::Merge => "merge",
            CollisionPolicy::Overwrite => "overwrite",
            CollisionPolicy::Ignore => "ignore",
            CollisionPolicy::DeleteAndReplace => "deleteAndReplace",
        };
        write!(f, "{name}")
    }
}

/// One provider subtree and the file tree it is synchronized with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncEntry {
    /// Tag provider name on the host
    pub provider: String,
    /// Subtree within the provider; empty for the provider root
    #[serde(default)]
    pub base_tag_path: String,
    /// Directory holding the exported files
    pub source_path: String,
    /// Export-mode identifier, resolved against the codec registry
    pub export_mode: String,
    #[serde(default)]
    pub collision_policy: CollisionPolicy,
    /// Leave the `_types_` subtree out of exports
    #[serde(default)]
    pub exclude_udt_definitions: bool,
    /// Prune stale managed files when writing exports
    #[serde(default = "default_delete_existing")]
    pub delete_existing: bool,
}

fn default_delete_existing() -> bool {
    true
}

impl SyncEntry {
    pub fn new(
        provider: impl Into<String>,
        source_path: impl Into<String>,
        export_mode: impl Into<String>,
    ) -> Self {
        Self {
            provider: provider.into(),
            base_tag_path: String::new(),
            source_path: source_path.into(),
            export_mode: export_mode.into(),
            collision_policy: CollisionPolicy::default(),
            exclude_udt_definitions: false,
            delete_existing: default_delete_existing(),
        }
    }

    pub fn with_base_tag_path(mut self, path: impl Into<String>) -> Self {
        self.base_tag_path = path.into();
        self
    }

    pub fn with_collision_policy(mut self, policy: CollisionPolicy) -> Self {
        self.collision_policy = policy;
        self
    }

    pub fn excluding_udt_definitions(mut self) -> Self {
        self.exclude_udt_definitions = true;
        self
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SettingsRepr {
    List(Vec<SyncEntry>),
    Table {
        #[serde(default)]
        entries: Vec<SyncEntry>,
    },
}

impl From<SettingsRepr> for SyncSettings {
    fn from(repr: SettingsRepr) -> Self {
        match repr {
            SettingsRepr::List(entries) | SettingsRepr::Table { entries } => Self { entries },
        }
    }
}

/// The full settings document.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "SettingsRepr")]
pub struct SyncSettings {
    pub entries: Vec<SyncEntry>,
}

impl SyncSettings {
    /// Load and validate a settings document.
    ///
    /// The format follows the file extension (`.json`, `.toml`, `.yaml`).
    pub fn load(path: &NormalizedPath) -> Result<Self> {
        if !path.exists() {
            return Err(Error::SettingsNotFound {
                path: path.to_native(),
            });
        }
        let settings: SyncSettings = ConfigStore::new().load(path)?;
        settings.validate(path)?;
        debug!(path = %path, entries = settings.entries.len(), "Loaded sync settings");
        Ok(settings)
    }

    /// Write the document; always in the `entries` table shape.
    pub fn save(&self, path: &NormalizedPath) -> Result<()> {
        ConfigStore::new().save(path, self)?;
        Ok(())
    }

    /// Reject entries missing the fields every run needs.
    pub fn validate(&self, path: &NormalizedPath) -> Result<()> {
        for (index, entry) in self.entries.iter().enumerate() {
            let missing = [
                ("provider", entry.provider.is_empty()),
                ("sourcePath", entry.source_path.is_empty()),
                ("exportMode", entry.export_mode.is_empty()),
            ]
            .into_iter()
            .find_map(|(field, empty)| empty.then_some(field));

            if let Some(field) = missing {
                return Err(Error::InvalidSettings {
                    path: path.to_native(),
                    message: format!("entry {index}: '{field}' must not be empty"),
                });
            }
            if entry.base_tag_path.starts_with('/') || entry.base_tag_path.ends_with('/') {
                return Err(Error::InvalidSettings {
                    path: path.to_native(),
                    message: format!(
                        "entry {index}: baseTagPath '{}' must not start or end with '/'",
                        entry.base_tag_path
                    ),
                });
            }
        }
        Ok(())
    }

    /// Entries for one provider, in document order.
    pub fn for_provider<'a>(&'a self, provider: &'a str) -> impl Iterator<Item = &'a SyncEntry> {
        self.entries.iter().filter(move |e| e.provider == provider)
    }
}
