use ignore::overrides::OverrideBuilder;
use log::debug;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::{
    constants::{
        CIRCULAR_DEPTH_WARNING_THRESHOLD, DEFAULT_FILE_EXTENSIONS, DEFAULT_IGNORE_DIRS,
        DEFAULT_TSCONFIG_FILE, SUPPORTED_FILE_EXTENSIONS,
    },
    error::{Error, Result},
    paths::has_extension,
};

/// Which non-file dependencies get recorded on vertex bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyTracking {
    pub third_party: bool,
    pub builtin: bool,
    /// Follow `import type` declarations like runtime imports.
    pub type_only: bool,
}

impl Default for DependencyTracking {
    fn default() -> Self {
        Self { third_party: false, builtin: false, type_only: true }
    }
}

/// Configuration of one analysis, built once and passed by reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisConfig {
    /// Project root; node identifiers are relative to it.
    pub cwd: PathBuf,
    /// Start of the walk. `None` walks every matching file under `cwd`.
    pub entrypoint: Option<PathBuf>,
    pub file_extensions: Vec<String>,
    pub ignore_dirs: Vec<String>,
    /// Glob (relative to `cwd`) of files excluded from bulk scans.
    pub ignore_pattern: Option<String>,
    pub tsconfig: PathBuf,
    pub tracking: DependencyTracking,
    /// Resolve bare specifiers into `node_modules` and walk the entry files.
    pub follow_third_party: bool,
    /// Longest cycle (in files) the cycle search looks for; `None` is unbounded.
    pub circular_max_depth: Option<usize>,
}

impl AnalysisConfig {
    pub fn new(cwd: impl Into<PathBuf>) -> Self {
        Self {
            cwd: cwd.into(),
            entrypoint: None,
            file_extensions: DEFAULT_FILE_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            ignore_dirs: DEFAULT_IGNORE_DIRS.iter().map(|d| d.to_string()).collect(),
            ignore_pattern: None,
            tsconfig: PathBuf::from(DEFAULT_TSCONFIG_FILE),
            tracking: DependencyTracking::default(),
            follow_third_party: false,
            circular_max_depth: None,
        }
    }

    pub fn with_entrypoint(mut self, entrypoint: impl Into<PathBuf>) -> Self {
        self.entrypoint = Some(entrypoint.into());
        self
    }

    pub fn with_tracking(mut self, tracking: DependencyTracking) -> Self {
        self.tracking = tracking;
        self
    }

    pub fn with_file_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.file_extensions = extensions.into_iter().map(Into::into).collect();
        self
    }

    /// Check everything that can be checked without touching the file system.
    pub fn validate(&self) -> Result<()> {
        debug!("Validating analysis configuration");
        if self.file_extensions.is_empty() {
            return Err(Error::InvalidConfiguration(
                "at least one file extension is required".to_string(),
            ));
        }
        for ext in &self.file_extensions {
            if !ext.starts_with('.') {
                return Err(Error::InvalidConfiguration(format!(
                    "file extension '{}' must start with a dot",
                    ext
                )));
            }
            if !SUPPORTED_FILE_EXTENSIONS.contains(&ext.as_str()) {
                return Err(Error::InvalidConfiguration(format!(
                    "file extension '{}' is not supported (expected one of {})",
                    ext,
                    SUPPORTED_FILE_EXTENSIONS.join(", ")
                )));
            }
        }
        if self.circular_max_depth == Some(0) {
            return Err(Error::InvalidConfiguration(
                "circular max depth must be greater than zero".to_string(),
            ));
        }
        if let Some(pattern) = &self.ignore_pattern {
            let mut builder = OverrideBuilder::new(&self.cwd);
            builder
                .add(&format!("!{}", pattern))
                .map_err(|e| Error::InvalidConfiguration(format!("invalid ignore pattern: {e}")))?;
        }
        Ok(())
    }

    /// Whether the cycle search depth is large enough to be slow on dense graphs.
    pub fn is_circular_depth_expensive(&self) -> bool {
        self.circular_max_depth.is_some_and(|d| d > CIRCULAR_DEPTH_WARNING_THRESHOLD)
    }

    pub fn supports_file(&self, path: &Path) -> bool {
        has_extension(path, &self.file_extensions)
    }

    pub fn entrypoint_path(&self) -> Option<PathBuf> {
        self.entrypoint.as_ref().map(|e| path_clean::clean(self.cwd.join(e)))
    }

    pub fn tsconfig_path(&self) -> PathBuf {
        path_clean::clean(self.cwd.join(&self.tsconfig))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = AnalysisConfig::new("/repo");
        assert_eq!(cfg.file_extensions.len(), 6);
        assert!(cfg.ignore_dirs.contains(&"node_modules".to_string()));
        assert!(!cfg.tracking.third_party);
        assert!(cfg.tracking.type_only);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_rejects_extension_without_dot() {
        let cfg = AnalysisConfig::new("/repo").with_file_extensions(["ts"]);
        assert!(matches!(cfg.validate(), Err(Error::InvalidConfiguration(_))));
    }

    #[test]
    fn test_rejects_unknown_extension() {
        let cfg = AnalysisConfig::new("/repo").with_file_extensions([".py"]);
        assert!(matches!(cfg.validate(), Err(Error::InvalidConfiguration(_))));
    }

    #[test]
    fn test_rejects_empty_extensions() {
        let cfg = AnalysisConfig::new("/repo").with_file_extensions(Vec::<String>::new());
        assert!(matches!(cfg.validate(), Err(Error::InvalidConfiguration(_))));
    }

    #[test]
    fn test_rejects_zero_depth() {
        let mut cfg = AnalysisConfig::new("/repo");
        cfg.circular_max_depth = Some(0);
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_rejects_invalid_glob() {
        let mut cfg = AnalysisConfig::new("/repo");
        cfg.ignore_pattern = Some("src/{a,b".to_string());
        assert!(matches!(cfg.validate(), Err(Error::InvalidConfiguration(_))));
    }

    #[test]
    fn test_expensive_depth() {
        let mut cfg = AnalysisConfig::new("/repo");
        assert!(!cfg.is_circular_depth_expensive());
        cfg.circular_max_depth = Some(51);
        assert!(cfg.is_circular_depth_expensive());
    }

    #[test]
    fn test_entrypoint_path_is_normalized() {
        let cfg = AnalysisConfig::new("/repo").with_entrypoint("./src/../index.ts");
        assert_eq!(cfg.entrypoint_path(), Some(PathBuf::from("/repo/index.ts")));
    }
}
