//! Export-mode registry

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::debug;

use crate::codecs::{IndividualFilesCodec, SingleFileCodec, StructuredByTypeCodec};
use crate::{Codec, Error, Result};

/// Maps export-mode identifiers to codecs.
///
/// Starts with the three built-ins via [`with_builtins`](Self::with_builtins);
/// further layouts are added with [`register`](Self::register) and become
/// usable everywhere a mode identifier is accepted.
#[derive(Clone, Default)]
pub struct ExportModeRegistry {
    codecs: BTreeMap<String, Arc<dyn Codec>>,
}

impl ExportModeRegistry {
    /// Registry with no codecs.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with `singleFile`, `structuredByType` and `individualFiles`.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(SingleFileCodec::new()));
        registry.register(Arc::new(StructuredByTypeCodec::new()));
        registry.register(Arc::new(IndividualFilesCodec::new()));
        registry
    }

    /// Register a codec under its mode identifier, returning any codec it
    /// replaces.
    pub fn register(&mut self, codec: Arc<dyn Codec>) -> Option<Arc<dyn Codec>> {
        let mode = codec.mode().to_string();
        debug!(mode = %mode, "Registering export mode");
        self.codecs.insert(mode, codec)
    }

    /// Codec for `mode`; unknown identifiers are an error.
    pub fn get(&self, mode: &str) -> Result<Arc<dyn Codec>> {
        self.codecs
            .get(mode)
            .cloned()
            .ok_or_else(|| Error::UnknownMode {
                mode: mode.to_string(),
                available: self.modes().map(str::to_string).collect(),
            })
    }

    pub fn contains(&self, mode: &str) -> bool {
        self.codecs.contains_key(mode)
    }

    /// Registered mode identifiers, sorted.
    pub fn modes(&self) -> impl Iterator<Item = &str> {
        self.codecs.keys().map(String::as_str)
    }

    /// `(identifier, display name)` pairs, sorted by identifier.
    pub fn describe(&self) -> Vec<(String, String)> {
        self.codecs
            .iter()
            .map(|(mode, codec)| (mode.clone(), codec.display_name().to_string()))
            .collect()
    }
}

impl std::fmt::Debug for ExportModeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExportModeRegistry")
            .field("modes", &self.codecs.keys().collect::<Vec<_>>())
            .finish()
    }
}
