//! The codec trait

use tagsync_fs::FileTree;
use tagsync_meta::Schema;
use tagsync_tree::{ConfigNode, OrderPolicy};

use crate::Result;

/// A file-layout policy for serializing configuration trees.
///
/// Implementations must satisfy `decode(encode(t)) == t` under
/// [`order_policy`](Codec::order_policy) for every tree they can encode,
/// and must produce identical bytes for equal trees.
pub trait Codec: Send + Sync {
    /// Mode identifier used in settings documents (e.g. `singleFile`)
    fn mode(&self) -> &str;

    /// Human-readable name
    fn display_name(&self) -> &str;

    /// Whether sibling order survives a round trip.
    fn order_policy(&self) -> OrderPolicy {
        OrderPolicy::Ignored
    }

    /// Lay `root` out as files.
    ///
    /// Fails with [`Error::Unrepresentable`](crate::Error::Unrepresentable)
    /// when a name cannot be expressed in this layout.
    fn encode(&self, root: &ConfigNode) -> Result<FileTree>;

    /// Rebuild a tree from files.
    ///
    /// An empty file tree decodes to an empty root. Malformed input fails
    /// with [`Error::Parse`](crate::Error::Parse); nothing is dropped or
    /// coerced.
    fn decode(&self, files: &FileTree, schema: &Schema) -> Result<ConfigNode>;
}
