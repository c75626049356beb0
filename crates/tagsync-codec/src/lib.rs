//! Export-mode codecs.
//!
//! A [`Codec`] lays a configuration tree out as a [`FileTree`] and reads
//! it back. Every codec obeys the round-trip law: decoding what it encoded
//! yields a tree equal to the input under the codec's [`OrderPolicy`].
//!
//! Codecs are registered by mode identifier in an [`ExportModeRegistry`];
//! the built-ins are `singleFile`, `structuredByType` and
//! `individualFiles`.
//!
//! [`FileTree`]: tagsync_fs::FileTree
//! [`OrderPolicy`]: tagsync_tree::OrderPolicy

pub mod codec;
pub mod codecs;
pub mod document;
pub mod error;
pub mod json;
pub mod registry;

pub use codec::Codec;
pub use codecs::{IndividualFilesCodec, SingleFileCodec, StructuredByTypeCodec};
pub use error::{Error, Result};
pub use registry::ExportModeRegistry;
