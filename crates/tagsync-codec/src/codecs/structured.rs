//! `structuredByType`: one directory per folder, files grouped by kind

use serde_json::Value;
use tagsync_fs::FileTree;
use tagsync_meta::Schema;
use tagsync_tree::{ConfigNode, NodeKind, TagPath};
use tracing::debug;

use super::{check_root, check_segment, join, put};
use crate::document::{
    DocReader, KIND, NAME, PROPERTIES, array_items, attach, check_schema, header, sorted_children,
};
use crate::json::parse_bytes;
use crate::{Codec, Error, Result};

const MODE: &str = "structuredByType";
const FOLDER_FILE: &str = "folder.json";
const TAGS_FILE: &str = "tags.json";
const UDTS_FILE: &str = "udts.json";
const RESERVED: [&str; 3] = [FOLDER_FILE, TAGS_FILE, UDTS_FILE];

/// Lays each folder out as a directory.
///
/// A folder directory holds `folder.json` with the folder's own
/// properties (always written, so empty folders survive version control),
/// `tags.json` with its Leaf children and `udts.json` with its
/// ReferenceLink children. Sub-folders are sub-directories.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredByTypeCodec;

impl StructuredByTypeCodec {
    pub fn new() -> Self {
        Self
    }

    fn encode_folder(
        files: &mut FileTree,
        dir: &str,
        path: &TagPath,
        folder: &ConfigNode,
    ) -> Result<()> {
        let own = Value::Object(header(folder, folder.properties()));
        put(files, MODE, path, join(dir, FOLDER_FILE), &own)?;

        let children = sorted_children(folder);
        for (file, kind) in [(TAGS_FILE, NodeKind::Leaf), (UDTS_FILE, NodeKind::ReferenceLink)] {
            let docs: Vec<Value> = children
                .iter()
                .filter(|c| c.kind() == kind)
                .map(|c| Value::Object(header(c, c.properties())))
                .collect();
            if !docs.is_empty() {
                put(files, MODE, path, join(dir, file), &Value::Array(docs))?;
            }
        }

        for sub in children.into_iter().filter(|c| c.is_folder()) {
            let sub_path = path.child(sub.name());
            check_segment(MODE, &sub_path, sub.name())?;
            if RESERVED.contains(&sub.name()) {
                return Err(Error::unrepresentable(
                    MODE,
                    &sub_path,
                    format!("folder name '{}' is reserved", sub.name()),
                ));
            }
            Self::encode_folder(files, &join(dir, sub.name()), &sub_path, sub)?;
        }
        Ok(())
    }

    fn decode_items(
        files: &FileTree,
        file: &str,
        kind: NodeKind,
        parent: &mut ConfigNode,
        path: &TagPath,
        schema: &Schema,
    ) -> Result<()> {
        let Some(bytes) = files.get(file) else {
            return Ok(());
        };
        let value = parse_bytes(file, bytes)?;
        for item in array_items(file, &value, "document")? {
            let reader = DocReader::new(file, item)?;
            reader.allow_only(&[NAME, KIND, PROPERTIES])?;
            let node = reader.node()?;
            reader.expect_kind(&node, &[kind])?;
            check_schema(file, &path.child(node.name()), &node, schema)?;
            attach(file, parent, node)?;
        }
        Ok(())
    }

    fn read_folder_doc(files: &FileTree, dir: &str) -> Result<Option<ConfigNode>> {
        let file = join(dir, FOLDER_FILE);
        let Some(bytes) = files.get(&file) else {
            return Ok(None);
        };
        let value = parse_bytes(&file, bytes)?;
        let reader = DocReader::new(&file, &value)?;
        reader.allow_only(&[NAME, KIND, PROPERTIES])?;

        let mut node = if dir.is_empty() {
            ConfigNode::new(reader.root_name()?, reader.kind()?)
        } else {
            ConfigNode::new(reader.name()?, reader.kind()?)
        };
        node.set_properties(reader.properties()?);
        reader.expect_kind(&node, &[NodeKind::Folder])?;
        Ok(Some(node))
    }

    fn decode_dir(
        files: &FileTree,
        dir: &str,
        folder: &mut ConfigNode,
        path: &TagPath,
        schema: &Schema,
    ) -> Result<()> {
        let listing = files.list_dir(dir);

        if let Some(unexpected) = listing.files.iter().find(|f| !RESERVED.contains(*f)) {
            return Err(Error::parse(
                join(dir, unexpected),
                "unexpected file in structuredByType layout",
            ));
        }

        Self::decode_items(files, &join(dir, TAGS_FILE), NodeKind::Leaf, folder, path, schema)?;
        Self::decode_items(
            files,
            &join(dir, UDTS_FILE),
            NodeKind::ReferenceLink,
            folder,
            path,
            schema,
        )?;

        for name in listing.directories {
            let sub_dir = join(dir, name);
            let sub_path = path.child(name);
            let folder_file = join(&sub_dir, FOLDER_FILE);
            let mut sub = Self::read_folder_doc(files, &sub_dir)?
                .ok_or_else(|| Error::parse(&folder_file, "missing folder document"))?;
            if sub.name() != name {
                return Err(Error::parse(
                    &folder_file,
                    format!("folder name '{}' does not match directory '{name}'", sub.name()),
                ));
            }
            check_schema(&folder_file, &sub_path, &sub, schema)?;
            Self::decode_dir(files, &sub_dir, &mut sub, &sub_path, schema)?;
            attach(&folder_file, folder, sub)?;
        }
        Ok(())
    }
}

impl Codec for StructuredByTypeCodec {
    fn mode(&self) -> &str {
        MODE
    }

    fn display_name(&self) -> &str {
        "Structured By Type"
    }

    fn encode(&self, root: &ConfigNode) -> Result<FileTree> {
        check_root(MODE, root)?;
        let mut files = FileTree::new();
        Self::encode_folder(&mut files, "", &TagPath::root(), root)?;
        Ok(files)
    }

    fn decode(&self, files: &FileTree, schema: &Schema) -> Result<ConfigNode> {
        let mut root = match Self::read_folder_doc(files, "")? {
            Some(root) => root,
            None if files.is_empty() => ConfigNode::root(),
            None => return Err(Error::parse(FOLDER_FILE, "missing root folder document")),
        };
        check_schema(FOLDER_FILE, &TagPath::root(), &root, schema)?;
        Self::decode_dir(files, "", &mut root, &TagPath::root(), schema)?;
        root.sort_children();
        debug!(nodes = root.node_count(), "Decoded structured tree");
        Ok(root)
    }
}
