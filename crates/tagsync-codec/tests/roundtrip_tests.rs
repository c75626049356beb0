use pretty_assertions::assert_eq;
use proptest::prelude::*;
use rstest::rstest;
use serde_json::json;
use tagsync_codec::{Codec, Error, ExportModeRegistry};
use tagsync_fs::FileTree;
use tagsync_meta::{Schema, ValueType};
use tagsync_tree::{ConfigNode, NodeKind, OrderPolicy, PropertyValue, tree_eq};

fn plant() -> ConfigNode {
    let alarms = PropertyValue::structured(json!([{"name": "High", "setpoint": 90.5}])).unwrap();
    ConfigNode::root()
        .with_children([
            ConfigNode::folder("_types_")
                .with_child(
                    ConfigNode::folder("Motor")
                        .with_child(ConfigNode::leaf("Amps").with_property("unit", "A"))
                        .unwrap(),
                )
                .unwrap(),
            ConfigNode::folder("Line1")
                .with_property("area", "north")
                .with_children([
                    ConfigNode::leaf("Speed")
                        .with_property("unit", "rpm")
                        .with_property("scale", 1i64)
                        .with_property("enabled", true)
                        .with_property("alarms", alarms),
                    ConfigNode::reference("M1").with_property("typeId", "Motor"),
                    ConfigNode::folder("Empty"),
                ])
                .unwrap(),
        ])
        .unwrap()
}

fn registry() -> ExportModeRegistry {
    ExportModeRegistry::with_builtins()
}

#[rstest]
#[case("singleFile")]
#[case("structuredByType")]
#[case("individualFiles")]
fn round_trip_reconstructs_the_tree(#[case] mode: &str) {
    let codec = registry().get(mode).unwrap();
    let tree = plant();

    let files = codec.encode(&tree).unwrap();
    let decoded = codec.decode(&files, &Schema::permissive()).unwrap();

    assert!(tree_eq(&tree, &decoded, codec.order_policy()));
}

#[rstest]
#[case("singleFile")]
#[case("structuredByType")]
#[case("individualFiles")]
fn encoding_is_byte_stable(#[case] mode: &str) {
    let codec = registry().get(mode).unwrap();
    let tree = plant();

    let first = codec.encode(&tree).unwrap();
    let decoded = codec.decode(&first, &Schema::permissive()).unwrap();
    let second = codec.encode(&decoded).unwrap();

    assert_eq!(first, second);
    for (_, bytes) in first.files() {
        assert!(bytes.ends_with(b"\n"));
    }
}

#[rstest]
#[case("singleFile")]
#[case("structuredByType")]
#[case("individualFiles")]
fn sibling_insertion_order_does_not_change_bytes(#[case] mode: &str) {
    let codec = registry().get(mode).unwrap();
    let forward = ConfigNode::root()
        .with_children([ConfigNode::leaf("A"), ConfigNode::leaf("B")])
        .unwrap();
    let backward = ConfigNode::root()
        .with_children([ConfigNode::leaf("B"), ConfigNode::leaf("A")])
        .unwrap();

    assert_eq!(codec.encode(&forward).unwrap(), codec.encode(&backward).unwrap());
    assert_eq!(codec.order_policy(), OrderPolicy::Ignored);
}

#[rstest]
#[case("singleFile")]
#[case("structuredByType")]
#[case("individualFiles")]
fn empty_file_tree_decodes_to_empty_root(#[case] mode: &str) {
    let codec = registry().get(mode).unwrap();
    let root = codec.decode(&FileTree::new(), &Schema::permissive()).unwrap();
    assert_eq!(root.node_count(), 1);
    assert_eq!(root.kind(), NodeKind::Folder);
}

#[rstest]
#[case("singleFile")]
#[case("structuredByType")]
#[case("individualFiles")]
fn schema_type_mismatch_is_a_parse_failure(#[case] mode: &str) {
    let codec = registry().get(mode).unwrap();
    let files = codec.encode(&plant()).unwrap();
    let schema = Schema::permissive().with_property("Leaf", "unit", ValueType::Number);

    let err = codec.decode(&files, &schema).unwrap_err();

    assert!(err.is_parse_failure(), "unexpected error: {err}");
    assert!(err.to_string().contains("expected number"));
}

#[rstest]
#[case("singleFile")]
#[case("structuredByType")]
#[case("individualFiles")]
fn strict_schema_rejects_undeclared_properties(#[case] mode: &str) {
    let codec = registry().get(mode).unwrap();
    let files = codec.encode(&plant()).unwrap();

    let err = codec.decode(&files, &Schema::strict()).unwrap_err();

    assert!(matches!(err, Error::Parse { .. }));
}

#[test]
fn single_file_layout_snapshot() {
    let tree = ConfigNode::root()
        .with_child(
            ConfigNode::folder("Line1")
                .with_child(ConfigNode::leaf("Speed").with_property("unit", "rpm"))
                .unwrap(),
        )
        .unwrap();

    let files = registry().get("singleFile").unwrap().encode(&tree).unwrap();
    let text = String::from_utf8(files.get("tags.json").unwrap().to_vec()).unwrap();

    assert!(text.ends_with('\n'));
    insta::assert_snapshot!(text.trim_end(), @r###"
    {
      "children": [
        {
          "children": [
            {
              "kind": "Leaf",
              "name": "Speed",
              "properties": {
                "unit": "rpm"
              }
            }
          ],
          "kind": "Folder",
          "name": "Line1",
          "properties": {}
        }
      ],
      "kind": "Folder",
      "name": "",
      "properties": {}
    }
    "###);
}

#[test]
fn corrupt_file_names_its_path() {
    let codec = registry().get("structuredByType").unwrap();
    let mut files = codec.encode(&plant()).unwrap();
    let mut corrupted = FileTree::new();
    for (path, bytes) in files.files() {
        let bytes = if path == "Line1/tags.json" {
            b"[{".to_vec()
        } else {
            bytes.to_vec()
        };
        corrupted.insert_file(path, bytes).unwrap();
    }
    files = corrupted;

    match codec.decode(&files, &Schema::permissive()).unwrap_err() {
        Error::Parse { file, .. } => assert_eq!(file, "Line1/tags.json"),
        other => panic!("unexpected error: {other}"),
    }
}

fn arb_value() -> impl Strategy<Value = PropertyValue> {
    prop_oneof![
        "[a-z ]{0,6}".prop_map(PropertyValue::from),
        any::<i64>().prop_map(PropertyValue::from),
        any::<bool>().prop_map(PropertyValue::from),
        prop::collection::vec(any::<u16>(), 0..3)
            .prop_map(|v| PropertyValue::Structured(json!(v))),
        ("[a-z]{1,3}", any::<bool>())
            .prop_map(|(k, b)| PropertyValue::Structured(json!({ k: b }))),
    ]
}

fn arb_properties() -> impl Strategy<Value = tagsync_tree::Properties> {
    prop::collection::btree_map("[a-z]{1,5}", arb_value(), 0..3)
}

fn with_props(mut node: ConfigNode, props: tagsync_tree::Properties) -> ConfigNode {
    node.set_properties(props);
    node
}

fn arb_node() -> impl Strategy<Value = ConfigNode> {
    let leaf = (
        prop_oneof![Just(NodeKind::Leaf), Just(NodeKind::ReferenceLink)],
        arb_properties(),
    )
        .prop_map(|(kind, props)| with_props(ConfigNode::new("n", kind), props));

    leaf.prop_recursive(3, 20, 4, |inner| {
        (
            arb_properties(),
            prop::collection::btree_map("[A-Z][a-z0-9]{0,4}", inner, 0..4),
        )
            .prop_map(|(props, children)| {
                let mut folder = with_props(ConfigNode::folder("n"), props);
                for (name, child) in children {
                    folder.add_child(child.renamed(name)).unwrap();
                }
                folder
            })
    })
}

fn arb_root() -> impl Strategy<Value = ConfigNode> {
    prop::collection::btree_map("[A-Z][a-z0-9]{0,4}", arb_node(), 0..4).prop_map(|children| {
        let mut root = ConfigNode::root();
        for (name, child) in children {
            root.add_child(child.renamed(name)).unwrap();
        }
        root
    })
}

proptest! {
    #[test]
    fn every_builtin_obeys_the_round_trip_law(tree in arb_root()) {
        let registry = registry();
        for mode in ["singleFile", "structuredByType", "individualFiles"] {
            let codec = registry.get(mode).unwrap();
            let files = codec.encode(&tree).unwrap();
            let decoded = codec.decode(&files, &Schema::permissive()).unwrap();
            prop_assert!(tree_eq(&tree, &decoded, codec.order_policy()), "mode {}", mode);
        }
    }
}
