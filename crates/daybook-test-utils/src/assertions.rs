//! Assertions for journal files.

use daybook_revision::CACHE_SUFFIX;
use std::path::Path;
use walkdir::WalkDir;

/// Assert that a file exists and contains the expected content.
pub fn assert_file_contains(path: &Path, expected: &str) {
    assert!(path.exists(), "File does not exist: {}", path.display());
    let content = std::fs::read_to_string(path)
        .unwrap_or_else(|e| panic!("Failed to read file {}: {}", path.display(), e));
    assert!(
        content.contains(expected),
        "File {} does not contain expected content.\nExpected to find: {}\nActual content:\n{}",
        path.display(),
        expected,
        content
    );
}

/// Assert that a file exists and equals the expected content.
pub fn assert_file_equals(path: &Path, expected: &str) {
    assert!(path.exists(), "File does not exist: {}", path.display());
    let content = std::fs::read_to_string(path)
        .unwrap_or_else(|e| panic!("Failed to read file {}: {}", path.display(), e));
    assert_strings_equal(&content, expected);
}

/// Assert two strings are equal, showing a line diff if not.
pub fn assert_strings_equal(actual: &str, expected: &str) {
    if actual != expected {
        let diff = similar::TextDiff::from_lines(expected, actual);
        let mut diff_output = String::new();
        for change in diff.iter_all_changes() {
            let sign = match change.tag() {
                similar::ChangeTag::Delete => "-",
                similar::ChangeTag::Insert => "+",
                similar::ChangeTag::Equal => " ",
            };
            diff_output.push_str(&format!("{}{}", sign, change));
        }
        panic!("Strings are not equal.\nDiff (- expected, + actual):\n{}", diff_output);
    }
}

/// Assert that no reconstruction cache is left under `root`.
pub fn assert_no_cache_files(root: &Path) {
    let leftovers: Vec<_> = WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().ends_with(CACHE_SUFFIX))
        .map(|e| e.into_path())
        .collect();
    assert!(
        leftovers.is_empty(),
        "Expected no cache files under {}, found: {:?}",
        root.display(),
        leftovers
    );
}

/// Assert that a result is an error whose message contains a pattern.
#[macro_export]
macro_rules! assert_err_contains {
    ($result:expr, $pattern:expr) => {
        match &$result {
            Ok(v) => panic!("Expected Err, got Ok({:?})", v),
            Err(e) => {
                let message = e.to_string();
                assert!(
                    message.contains($pattern),
                    "Error '{}' does not contain '{}'",
                    message,
                    $pattern
                );
            }
        }
    };
}
