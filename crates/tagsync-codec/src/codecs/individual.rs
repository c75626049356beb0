//! `individualFiles`: one file per leaf, shared folder metadata

use std::collections::BTreeSet;

use serde_json::{Map, Value};
use tagsync_fs::FileTree;
use tagsync_meta::Schema;
use tagsync_tree::{ConfigNode, NodeKind, PropertyValue, TagPath};
use tracing::debug;

use super::{check_root, check_segment, join, put};
use crate::document::{
    DocReader, KIND, NAME, PROPERTIES, REFERENCES, attach, check_schema, header, sorted_children,
};
use crate::json::parse_bytes;
use crate::{Codec, Error, Result};

const MODE: &str = "individualFiles";
const FOLDER_FILE: &str = ".folder.json";
const REFS_DIR: &str = ".refs";
const EXTENSION: &str = ".json";

/// Writes every Leaf and ReferenceLink to its own `<name>.json`.
///
/// Folders are directories with a `.folder.json` holding their own
/// properties. Structured property values of a leaf are moved out to
/// `.refs/<leaf>/<property>.json` and listed in the leaf document under
/// `references`, which keeps leaf files small and reviewable.
#[derive(Debug, Default, Clone, Copy)]
pub struct IndividualFilesCodec;

fn reference_file(leaf: &str, property: &str) -> String {
    format!("{REFS_DIR}/{leaf}/{property}{EXTENSION}")
}

impl IndividualFilesCodec {
    pub fn new() -> Self {
        Self
    }

    fn encode_leaf(files: &mut FileTree, dir: &str, path: &TagPath, leaf: &ConfigNode) -> Result<()> {
        let (structured, scalar): (Vec<_>, Vec<_>) =
            leaf.properties().iter().partition(|(_, v)| v.is_structured());

        let mut doc = header(leaf, scalar);
        if !structured.is_empty() {
            let mut references = Map::new();
            for (property, value) in structured {
                check_segment(MODE, path, property)?;
                let rel = reference_file(leaf.name(), property);
                put(files, MODE, path, join(dir, &rel), &value.to_json())?;
                references.insert(property.clone(), Value::String(rel));
            }
            doc.insert(REFERENCES.into(), Value::Object(references));
        }

        let file = join(dir, &format!("{}{EXTENSION}", leaf.name()));
        put(files, MODE, path, file, &Value::Object(doc))
    }

    fn encode_folder(files: &mut FileTree, dir: &str, path: &TagPath, folder: &ConfigNode) -> Result<()> {
        let own = Value::Object(header(folder, folder.properties()));
        put(files, MODE, path, join(dir, FOLDER_FILE), &own)?;

        for child in sorted_children(folder) {
            let child_path = path.child(child.name());
            check_segment(MODE, &child_path, child.name())?;
            if child.name().starts_with('.') {
                return Err(Error::unrepresentable(
                    MODE,
                    &child_path,
                    "names starting with '.' are reserved",
                ));
            }
            match child.kind() {
                NodeKind::Folder => {
                    Self::encode_folder(files, &join(dir, child.name()), &child_path, child)?;
                }
                NodeKind::Leaf | NodeKind::ReferenceLink => {
                    Self::encode_leaf(files, dir, &child_path, child)?;
                }
            }
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

    /// Decode one leaf file, resolving its references.
    ///
    /// Returns the node and the reference files it consumed.
    fn decode_leaf(
        files: &FileTree,
        dir: &str,
        file_name: &str,
        path: &TagPath,
        schema: &Schema,
    ) -> Result<(ConfigNode, Vec<String>)> {
        let file = join(dir, file_name);
        let bytes = files
            .get(&file)
            .ok_or_else(|| Error::parse(&file, "file disappeared while decoding"))?;
        let value = parse_bytes(&file, bytes)?;
        let reader = DocReader::new(&file, &value)?;
        reader.allow_only(&[NAME, KIND, PROPERTIES, REFERENCES])?;

        let mut node = reader.node()?;
        reader.expect_kind(&node, &[NodeKind::Leaf, NodeKind::ReferenceLink])?;
        let expected_name = file_name.strip_suffix(EXTENSION).unwrap_or(file_name);
        if node.name() != expected_name {
            return Err(Error::parse(
                &file,
                format!("node name '{}' does not match file name", node.name()),
            ));
        }

        let mut consumed = Vec::new();
        if let Some(references) = reader.get(REFERENCES) {
            let references = references
                .as_object()
                .ok_or_else(|| Error::parse(&file, "field 'references' must be a JSON object"))?;
            for (property, target) in references {
                let expected = reference_file(node.name(), property);
                if target.as_str() != Some(expected.as_str()) {
                    return Err(Error::parse(
                        &file,
                        format!("reference for '{property}' must point to '{expected}'"),
                    ));
                }
                if node.property(property).is_some() {
                    return Err(Error::parse(
                        &file,
                        format!("property '{property}' is both inline and referenced"),
                    ));
                }
                let ref_file = join(dir, &expected);
                let ref_bytes = files.get(&ref_file).ok_or_else(|| {
                    Error::parse(&file, format!("dangling reference '{expected}'"))
                })?;
                let ref_value = parse_bytes(&ref_file, ref_bytes)?;
                let value = PropertyValue::structured(ref_value)
                    .map_err(|e| Error::parse(&ref_file, e.to_string()))?;
                node.set_property(property.clone(), value);
                consumed.push(ref_file);
            }
        }

        check_schema(&file, path, &node, schema)?;
        Ok((node, consumed))
    }

    /// Every file under `dir/.refs` must have been consumed by a leaf.
    fn check_refs(files: &FileTree, dir: &str, consumed: &BTreeSet<String>) -> Result<()> {
        let refs_dir = join(dir, REFS_DIR);
        let listing = files.list_dir(&refs_dir);
        if let Some(file) = listing.files.first() {
            return Err(Error::parse(join(&refs_dir, file), "unreferenced file"));
        }
        for leaf in listing.directories {
            let leaf_dir = join(&refs_dir, leaf);
            let inner = files.list_dir(&leaf_dir);
            if let Some(sub) = inner.directories.first() {
                return Err(Error::parse(join(&leaf_dir, sub), "unexpected directory"));
            }
            for file in inner.files {
                let path = join(&leaf_dir, file);
                if !consumed.contains(&path) {
                    return Err(Error::parse(path, "unreferenced file"));
                }
            }
        }
        Ok(())
    }

    fn decode_dir(
        files: &FileTree,
        dir: &str,
        folder: &mut ConfigNode,
        path: &TagPath,
        schema: &Schema,
    ) -> Result<()> {
        let listing = files.list_dir(dir);
        let mut consumed = BTreeSet::new();

        for file_name in listing.files {
            if file_name == FOLDER_FILE {
                continue;
            }
            if file_name.starts_with('.') || !file_name.ends_with(EXTENSION) {
                return Err(Error::parse(
                    join(dir, file_name),
                    "unexpected file in individualFiles layout",
                ));
            }
            let name = file_name.strip_suffix(EXTENSION).unwrap_or(file_name);
            let (leaf, refs) =
                Self::decode_leaf(files, dir, file_name, &path.child(name), schema)?;
            consumed.extend(refs);
            attach(&join(dir, file_name), folder, leaf)?;
        }
        Self::check_refs(files, dir, &consumed)?;

        for name in listing.directories {
            if name == REFS_DIR {
                continue;
            }
            let sub_dir = join(dir, name);
            if name.starts_with('.') {
                return Err(Error::parse(sub_dir, "unexpected directory"));
            }
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

impl Codec for IndividualFilesCodec {
    fn mode(&self) -> &str {
        MODE
    }

    fn display_name(&self) -> &str {
        "Individual Files"
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
        debug!(nodes = root.node_count(), "Decoded individual-files tree");
        Ok(root)
    }
}
