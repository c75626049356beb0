//! [`TestWorkspace`]: a temporary directory holding export roots and
//! settings documents.

use std::fs;
use std::path::Path;

use tagsync_fs::NormalizedPath;
use tempfile::TempDir;

/// A temporary project directory with helpers for setup and assertions.
///
/// # Example
///
/// ```rust,no_run
/// use tagsync_test_utils::TestWorkspace;
///
/// let workspace = TestWorkspace::new();
/// workspace.write_file("exports/default/tags.json", "{}");
/// workspace.assert_file_exists("exports/default/tags.json");
/// ```
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl Default for TestWorkspace {
    fn default() -> Self {
        Self::new()
    }
}

impl TestWorkspace {
    /// Create an empty temporary directory.
    pub fn new() -> Self {
        Self {
            temp_dir: TempDir::new().unwrap(),
        }
    }

    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Absolute normalized path of `relative` inside the workspace.
    pub fn path(&self, relative: &str) -> NormalizedPath {
        NormalizedPath::new(self.root().join(relative))
    }

    /// Write `content` to `relative`, creating parent directories.
    pub fn write_file(&self, relative: &str, content: &str) {
        let full_path = self.root().join(relative);
        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&full_path, content).unwrap();
    }

    /// Write a TOML settings document with one entry per
    /// `(provider, base_tag_path, source_path, export_mode)`.
    pub fn write_settings(&self, relative: &str, entries: &[(&str, &str, &str, &str)]) {
        let mut document = String::new();
        for (provider, base, source, mode) in entries {
            document.push_str(&format!(
                "[[entries]]\nprovider = \"{provider}\"\nbaseTagPath = \"{base}\"\nsourcePath = \"{source}\"\nexportMode = \"{mode}\"\n\n"
            ));
        }
        self.write_file(relative, &document);
    }

    pub fn read_file(&self, relative: &str) -> String {
        let full_path = self.root().join(relative);
        fs::read_to_string(&full_path)
            .unwrap_or_else(|_| panic!("Could not read file: {}", full_path.display()))
    }

    /// # Panics
    /// Panics with a descriptive message if the path does not exist.
    pub fn assert_file_exists(&self, relative: &str) {
        let full_path = self.root().join(relative);
        assert!(
            full_path.exists(),
            "Expected file to exist: {}",
            full_path.display()
        );
    }

    /// # Panics
    /// Panics with a descriptive message if the path exists.
    pub fn assert_file_not_exists(&self, relative: &str) {
        let full_path = self.root().join(relative);
        assert!(
            !full_path.exists(),
            "Expected file NOT to exist: {}",
            full_path.display()
        );
    }

    /// # Panics
    /// Panics if the file cannot be read or does not contain `content`.
    pub fn assert_file_contains(&self, relative: &str, content: &str) {
        let file_content = self.read_file(relative);
        assert!(
            file_content.contains(content),
            "File {relative} does not contain expected content.\nExpected: {content}\nActual: {file_content}"
        );
    }
}
