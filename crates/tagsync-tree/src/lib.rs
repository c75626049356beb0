//! Configuration tree model.
//!
//! A [`ConfigNode`] tree is an immutable snapshot of one side of a
//! synchronization: the live tag provider or the decoded file tree. Nodes
//! are addressed by [`TagPath`]. Siblings are unique by name because
//! children live in an insertion-ordered map keyed by name.
//!
//! Equality is always explicit about child order; see [`OrderPolicy`].

pub mod editor;
pub mod equality;
pub mod error;
pub mod node;
pub mod path;
pub mod value;
pub mod walk;

pub use editor::{Edit, Placement, TreeEditor};
pub use equality::{OrderPolicy, content_eq, tree_eq};
pub use error::{Error, Result};
pub use node::{ConfigNode, NodeKind, TYPES_FOLDER};
pub use path::{TagPath, validate_name};
pub use value::{Properties, PropertyValue};
pub use walk::Walk;
