//! `singleFile`: the whole tree nested in one document

use serde_json::Value;
use tagsync_fs::FileTree;
use tagsync_meta::Schema;
use tagsync_tree::{ConfigNode, NodeKind, TagPath};
use tracing::debug;

use super::{check_root, put};
use crate::document::{
    CHILDREN, DocReader, KIND, NAME, PROPERTIES, array_items, attach, check_schema, header,
    sorted_children,
};
use crate::{Codec, Error, Result};

const MODE: &str = "singleFile";
const FILE: &str = "tags.json";

/// Writes the whole tree to `tags.json`.
///
/// Folders carry a `children` array; structured values stay inline.
#[derive(Debug, Default, Clone, Copy)]
pub struct SingleFileCodec;

impl SingleFileCodec {
    pub fn new() -> Self {
        Self
    }

    fn node_document(node: &ConfigNode) -> Value {
        let mut doc = header(node, node.properties());
        if node.is_folder() {
            let children = sorted_children(node)
                .into_iter()
                .map(Self::node_document)
                .collect();
            doc.insert(CHILDREN.into(), Value::Array(children));
        }
        Value::Object(doc)
    }

    fn decode_node(
        value: &Value,
        path: &TagPath,
        is_root: bool,
        schema: &Schema,
    ) -> Result<ConfigNode> {
        let reader = DocReader::new(FILE, value)?;
        reader.allow_only(&[NAME, KIND, PROPERTIES, CHILDREN])?;

        let mut node = if is_root {
            let mut root = ConfigNode::new(reader.root_name()?, reader.kind()?);
            root.set_properties(reader.properties()?);
            reader.expect_kind(&root, &[NodeKind::Folder])?;
            root
        } else {
            reader.node()?
        };
        check_schema(FILE, path, &node, schema)?;

        let Some(children) = reader.get(CHILDREN) else {
            return Ok(node);
        };
        let children = array_items(FILE, children, CHILDREN)?;
        if !node.is_folder() && !children.is_empty() {
            return Err(Error::parse(
                FILE,
                format!("'{path}' is a {} and cannot hold children", node.kind()),
            ));
        }
        for child in children {
            let child_name = DocReader::new(FILE, child)?.name()?;
            let child = Self::decode_node(child, &path.child(&child_name), false, schema)?;
            attach(FILE, &mut node, child)?;
        }
        Ok(node)
    }
}

impl Codec for SingleFileCodec {
    fn mode(&self) -> &str {
        MODE
    }

    fn display_name(&self) -> &str {
        "Single File"
    }

    fn encode(&self, root: &ConfigNode) -> Result<FileTree> {
        check_root(MODE, root)?;
        let mut files = FileTree::new();
        put(
            &mut files,
            MODE,
            &TagPath::root(),
            FILE.to_string(),
            &Self::node_document(root),
        )?;
        Ok(files)
    }

    fn decode(&self, files: &FileTree, schema: &Schema) -> Result<ConfigNode> {
        if let Some((unexpected, _)) = files.files().find(|(path, _)| *path != FILE) {
            return Err(Error::parse(unexpected, "unexpected file in singleFile layout"));
        }
        let Some(bytes) = files.get(FILE) else {
            return Ok(ConfigNode::root());
        };

        let value = crate::json::parse_bytes(FILE, bytes)?;
        let mut root = Self::decode_node(&value, &TagPath::root(), true, schema)?;
        root.sort_children();
        debug!(nodes = root.node_count(), "Decoded single-file tree");
        Ok(root)
    }
}
