use proptest::prelude::*;
use tagsync_fs::{FileTree, NormalizedPath, validate_relative_path};

proptest! {
    #[test]
    fn normalized_paths_have_no_doubled_or_back_slashes(s in "\\PC*") {
        let path = NormalizedPath::new(&s);
        let as_str = path.as_str();

        prop_assert!(!as_str.contains('\\'));
        prop_assert!(!as_str.contains("//"));

        let roundtripped = NormalizedPath::new(path.to_native());
        prop_assert_eq!(path, roundtripped);
    }

    #[test]
    fn valid_relative_paths_stay_under_the_root(segments in prop::collection::vec("[A-Za-z0-9_ ]{1,8}", 1..5)) {
        let rel = segments.join("/");
        prop_assert!(validate_relative_path(&rel).is_ok());

        let joined = NormalizedPath::new("/srv/tags").join(&rel);
        prop_assert!(joined.as_str().starts_with("/srv/tags/"));
    }

    #[test]
    fn list_dir_partitions_every_file(names in prop::collection::btree_set("[a-c]{1,2}(/[a-c]{1,2}){0,2}\\.json", 1..12)) {
        let mut tree = FileTree::new();
        let mut inserted = Vec::new();
        for name in names {
            // Some generated paths shadow each other as file vs directory
            if tree.insert_file(name.clone(), name.as_bytes().to_vec()).is_ok() {
                inserted.push(name);
            }
        }

        // Walk the tree through list_dir and make sure every file is found once
        let mut found = Vec::new();
        let mut pending = vec![String::new()];
        while let Some(dir) = pending.pop() {
            let listing = tree.list_dir(&dir);
            let prefix = if dir.is_empty() { String::new() } else { format!("{dir}/") };
            for file in listing.files {
                found.push(format!("{prefix}{file}"));
            }
            for sub in listing.directories {
                pending.push(format!("{prefix}{sub}"));
            }
        }
        found.sort();
        inserted.sort();
        prop_assert_eq!(found, inserted);
    }
}
