//! Entry-file lookup for packages installed in `node_modules`.

use log::trace;
use path_clean::clean;
use std::path::{Path, PathBuf};

use crate::{
    classifier::package_name,
    constants::{INDEX_FILES, MANIFEST_FILE_NAME, RESOLVE_EXTENSIONS},
    fs::FileReader,
};

/// Find the file a bare `specifier` imported from `start_dir` loads, walking
/// up through `node_modules` directories until `root`.
pub fn resolve_package_entry(
    reader: &dyn FileReader,
    start_dir: &Path,
    specifier: &str,
    root: &Path,
) -> Option<PathBuf> {
    trace!("Walking up from {:?} to find node_modules for '{}'", start_dir, specifier);
    let package = package_name(specifier);
    let subpath = specifier[package.len()..].trim_start_matches('/');
    let mut current_dir = start_dir;

    loop {
        let package_dir = current_dir.join("node_modules").join(package);
        let result = if subpath.is_empty() {
            resolve_package_dir(reader, &package_dir)
        } else {
            resolve_file(reader, &package_dir.join(subpath))
        };
        if result.is_some() {
            trace!("Resolved node_modules package '{}' to {:?}", specifier, result);
            return result;
        }

        if current_dir == root {
            break;
        }
        current_dir = current_dir.parent()?;
    }

    trace!("Failed to resolve node_modules package '{}'", specifier);
    None
}

fn resolve_file(reader: &dyn FileReader, p: &Path) -> Option<PathBuf> {
    let p = clean(p);
    if reader.exists(&p) {
        return Some(p);
    }

    for ext in RESOLVE_EXTENSIONS {
        let candidate = PathBuf::from(format!("{}.{}", p.display(), ext));
        if reader.exists(&candidate) {
            return Some(candidate);
        }
    }

    INDEX_FILES
        .iter()
        .map(|index_file| p.join(index_file))
        .find(|candidate| reader.exists(candidate))
}

fn resolve_package_dir(reader: &dyn FileReader, package_dir: &Path) -> Option<PathBuf> {
    let manifest = package_dir.join(MANIFEST_FILE_NAME);
    if let Ok(txt) = reader.read(&manifest)
        && let Ok(v) = serde_json::from_str::<serde_json::Value>(&txt)
    {
        trace!("Checking package manifest at: {:?}", manifest);
        let entry_of =
            |s: &str| resolve_file(reader, &package_dir.join(s.trim_start_matches("./")));

        if let Some(exports) = v.get("exports") {
            if let Some(s) = exports.as_str()
                && let Some(resolved) = entry_of(s)
            {
                return Some(resolved);
            }
            // { ".": "./index.js" } or { ".": { "import": "./dist/index.mjs" } }
            if let Some(dot_export) = exports.get(".") {
                if let Some(s) = dot_export.as_str()
                    && let Some(resolved) = entry_of(s)
                {
                    return Some(resolved);
                }
                if let Some(conditions) = dot_export.as_object() {
                    for key in ["import", "require", "default"] {
                        if let Some(s) = conditions.get(key).and_then(|x| x.as_str())
                            && let Some(resolved) = entry_of(s)
                        {
                            return Some(resolved);
                        }
                    }
                }
            }
        }

        for field in ["module", "main"] {
            if let Some(s) = v.get(field).and_then(|x| x.as_str())
                && let Some(resolved) = entry_of(s)
            {
                return Some(resolved);
            }
        }
    }

    INDEX_FILES
        .iter()
        .map(|index_file| package_dir.join(index_file))
        .find(|candidate| reader.exists(candidate))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::InMemoryFileReader;

    fn resolve(reader: &InMemoryFileReader, from: &str, specifier: &str) -> Option<PathBuf> {
        resolve_package_entry(reader, Path::new(from), specifier, Path::new("/repo"))
    }

    #[test]
    fn test_main_field() {
        let reader = InMemoryFileReader::new()
            .with_file("/repo/node_modules/lib/package.json", r#"{ "main": "lib/entry" }"#)
            .with_file("/repo/node_modules/lib/lib/entry.js", "");
        assert_eq!(
            resolve(&reader, "/repo/src", "lib"),
            Some(PathBuf::from("/repo/node_modules/lib/lib/entry.js"))
        );
    }

    #[test]
    fn test_exports_preferred_over_main() {
        let reader = InMemoryFileReader::new()
            .with_file(
                "/repo/node_modules/lib/package.json",
                r#"{ "main": "./cjs.js", "exports": { ".": { "import": "./esm.mjs" } } }"#,
            )
            .with_file("/repo/node_modules/lib/cjs.js", "")
            .with_file("/repo/node_modules/lib/esm.mjs", "");
        assert_eq!(
            resolve(&reader, "/repo", "lib"),
            Some(PathBuf::from("/repo/node_modules/lib/esm.mjs"))
        );
    }

    #[test]
    fn test_module_field_and_scoped_package() {
        let reader = InMemoryFileReader::new()
            .with_file(
                "/repo/node_modules/@scope/ui/package.json",
                r#"{ "module": "./dist/index.mjs" }"#,
            )
            .with_file("/repo/node_modules/@scope/ui/dist/index.mjs", "");
        assert_eq!(
            resolve(&reader, "/repo/src/components", "@scope/ui"),
            Some(PathBuf::from("/repo/node_modules/@scope/ui/dist/index.mjs"))
        );
    }

    #[test]
    fn test_index_fallback_and_subpath() {
        let reader = InMemoryFileReader::new()
            .with_file("/repo/node_modules/lodash/index.js", "")
            .with_file("/repo/node_modules/lodash/fp.js", "");
        assert_eq!(
            resolve(&reader, "/repo", "lodash"),
            Some(PathBuf::from("/repo/node_modules/lodash/index.js"))
        );
        assert_eq!(
            resolve(&reader, "/repo", "lodash/fp"),
            Some(PathBuf::from("/repo/node_modules/lodash/fp.js"))
        );
    }

    #[test]
    fn test_nested_node_modules_win() {
        let reader = InMemoryFileReader::new()
            .with_file("/repo/node_modules/dep/index.js", "")
            .with_file("/repo/packages/a/node_modules/dep/index.js", "");
        assert_eq!(
            resolve(&reader, "/repo/packages/a/src", "dep"),
            Some(PathBuf::from("/repo/packages/a/node_modules/dep/index.js"))
        );
    }

    #[test]
    fn test_stops_at_root() {
        let reader = InMemoryFileReader::new().with_file("/node_modules/dep/index.js", "");
        assert_eq!(resolve(&reader, "/repo/src", "dep"), None);
    }
}
