//! Small plant trees shared by the test suites.
//!
//! Every builder returns a fresh root, so tests can mutate what they get.

use tagsync_tree::{ConfigNode, TYPES_FOLDER, TagPath};

/// Parse `text` as a tag path.
///
/// # Panics
/// Panics if `text` is not a valid path.
pub fn path(text: &str) -> TagPath {
    TagPath::parse(text).unwrap_or_else(|err| panic!("invalid fixture path {text:?}: {err}"))
}

/// `Line1` with a `Speed` and a `Temp` leaf.
pub fn line1_folder() -> ConfigNode {
    ConfigNode::folder("Line1")
        .with_property("area", "north")
        .with_children([
            ConfigNode::leaf("Speed")
                .with_property("unit", "rpm")
                .with_property("scale", 1i64),
            ConfigNode::leaf("Temp").with_property("unit", "C"),
        ])
        .unwrap()
}

/// Root holding only [`line1_folder`].
pub fn line1() -> ConfigNode {
    ConfigNode::root().with_child(line1_folder()).unwrap()
}

/// Type-definition folder with a `Motor` type.
pub fn types() -> ConfigNode {
    let motor = ConfigNode::folder("Motor")
        .with_child(ConfigNode::leaf("Amps").with_property("unit", "A"))
        .unwrap();
    ConfigNode::folder(TYPES_FOLDER).with_child(motor).unwrap()
}

/// Root with type definitions, `Line1`, and a `Line2` holding a motor
/// instance and an empty folder.
pub fn plant() -> ConfigNode {
    let line2 = ConfigNode::folder("Line2")
        .with_children([
            ConfigNode::reference("M1").with_property("typeId", "Motor"),
            ConfigNode::folder("Spare"),
        ])
        .unwrap();
    ConfigNode::root()
        .with_children([types(), line1_folder(), line2])
        .unwrap()
}
