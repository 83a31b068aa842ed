//! Assertions over the mirrored directory tree

use std::path::Path;

use walkdir::WalkDir;

/// Every file under `root`, as sorted `/`-separated paths relative to it
pub fn mirrored_files(root: &Path) -> Vec<String> {
    if !root.exists() {
        return Vec::new();
    }
    let mut files: Vec<String> = WalkDir::new(root)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| {
            entry
                .path()
                .strip_prefix(root)
                .ok()
                .map(|relative| relative.to_string_lossy().replace('\\', "/"))
        })
        .collect();
    files.sort();
    files
}

/// Fail if any temporary download file was left behind
pub fn assert_no_partial_files(root: &Path) {
    let partials: Vec<String> = mirrored_files(root)
        .into_iter()
        .filter(|file| file.ends_with(".part"))
        .collect();
    assert!(partials.is_empty(), "leftover partial files: {partials:?}");
}
