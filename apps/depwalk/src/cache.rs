use depwalk_analyzer::{Analyzer, PersistedCache};
use log::{debug, info, warn};
use std::{fs, path::Path};

/// Load a cache written by an earlier run. Missing or unreadable caches are
/// ignored, the analysis then starts from scratch.
pub fn load_cache(path: &Path) -> Option<PersistedCache> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            debug!("No cache loaded from {}: {}", path.display(), e);
            return None;
        }
    };
    match PersistedCache::from_json(&content) {
        Ok(cache) => {
            info!("Loaded cache for {} files from {}", cache.files.len(), path.display());
            Some(cache)
        }
        Err(e) => {
            warn!("Discarding unreadable cache {}: {}", path.display(), e);
            None
        }
    }
}

pub fn save_cache(analyzer: &Analyzer, path: &Path) {
    let result = analyzer.export_cache().to_json().map_err(|e| e.to_string()).and_then(|json| {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| e.to_string())?;
        }
        fs::write(path, json).map_err(|e| e.to_string())
    });
    match result {
        Ok(()) => debug!("Saved cache to {}", path.display()),
        Err(e) => warn!("Failed to save cache to {}: {}", path.display(), e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use depwalk_core::AnalysisConfig;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn create_test_file(dir: &Path, path: &str, content: &str) -> PathBuf {
        let file_path = dir.join(path);
        if let Some(parent) = file_path.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent directory");
        }
        fs::write(&file_path, content).expect("Failed to write test file");
        file_path
    }

    #[test]
    fn test_save_then_load() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        create_test_file(root, "index.js", "import './a.js';\n");
        create_test_file(root, "a.js", "");
        let analyzer = Analyzer::builder(AnalysisConfig::new(root).with_entrypoint("index.js"))
            .build()
            .unwrap();

        let cache_file = root.join(".cache/depwalk.json");
        save_cache(&analyzer, &cache_file);
        let loaded = load_cache(&cache_file).unwrap();
        assert_eq!(loaded, analyzer.export_cache());
    }

    #[test]
    fn test_unreadable_cache_is_discarded() {
        let temp_dir = TempDir::new().unwrap();
        let path = create_test_file(temp_dir.path(), "cache.json", "{ not json");
        assert!(load_cache(&path).is_none());
        assert!(load_cache(&temp_dir.path().join("missing.json")).is_none());
    }
}
