//! Node identifiers: normalized, root-relative, `/`-separated file paths.

use path_clean::clean;
use std::path::{Path, PathBuf};

/// Normalize `path` and make it relative to `root` when it lives below it.
///
/// Paths outside of `root` keep their normalized absolute form so they stay
/// unique.
pub fn node_id(root: &Path, path: &Path) -> String {
    let cleaned = clean(path);
    let relative = cleaned.strip_prefix(root).unwrap_or(&cleaned);
    let id = relative.to_string_lossy().replace('\\', "/");
    if id.is_empty() { ".".to_string() } else { id }
}

/// Inverse of [`node_id`].
pub fn node_path(root: &Path, id: &str) -> PathBuf {
    clean(root.join(id))
}

/// The extension of `path` with its leading dot, e.g. `.ts`.
pub fn dotted_extension(path: &Path) -> Option<String> {
    path.extension().and_then(|e| e.to_str()).map(|e| format!(".{}", e))
}

/// Whether `path` ends with one of `extensions` (dot-prefixed).
pub fn has_extension(path: &Path, extensions: &[String]) -> bool {
    match dotted_extension(path) {
        Some(ext) => extensions.iter().any(|e| *e == ext),
        None => false,
    }
}

/// Whether any directory component of `path` below `root` is in `ignore_dirs`.
pub fn is_in_ignored_dir(root: &Path, path: &Path, ignore_dirs: &[String]) -> bool {
    let relative = path.strip_prefix(root).unwrap_or(path);
    let mut components: Vec<_> = relative.components().collect();
    // The last component is the file itself.
    components.pop();
    components
        .iter()
        .filter_map(|c| c.as_os_str().to_str())
        .any(|name| ignore_dirs.iter().any(|d| d == name))
}
