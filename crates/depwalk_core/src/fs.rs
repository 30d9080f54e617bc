//! File access used by the analysis. Nothing else in the workspace touches
//! storage directly.

use ignore::{WalkBuilder, overrides::OverrideBuilder};
use log::{debug, trace, warn};
use std::{
    collections::BTreeMap,
    fs, io,
    path::{Path, PathBuf},
};

use crate::{
    config::AnalysisConfig,
    error::{Error, Result},
    paths::{has_extension, is_in_ignored_dir},
};

pub trait FileReader: Send + Sync {
    fn read(&self, path: &Path) -> Result<String>;

    /// Whether `path` is an existing regular file.
    fn exists(&self, path: &Path) -> bool;

    /// Lazily list files below `dir` whose extension is in `extensions`.
    fn list<'a>(
        &'a self,
        dir: &Path,
        extensions: &'a [String],
    ) -> Box<dyn Iterator<Item = PathBuf> + 'a>;

    /// Like [`FileReader::list`] but only for files directly inside `dir`.
    fn list_shallow<'a>(
        &'a self,
        dir: &Path,
        extensions: &'a [String],
    ) -> Box<dyn Iterator<Item = PathBuf> + 'a> {
        let dir = dir.to_path_buf();
        let parent = dir.clone();
        Box::new(self.list(&dir, extensions).filter(move |p| p.parent() == Some(parent.as_path())))
    }

    /// Every file named `file_name` below `dir`, outside of ignored directories.
    fn find_named(&self, dir: &Path, file_name: &str) -> Vec<PathBuf>;
}

/// [`FileReader`] backed by the local file system.
#[derive(Debug, Clone)]
pub struct OsFileReader {
    ignore_dirs: Vec<String>,
    ignore_pattern: Option<String>,
}

impl OsFileReader {
    pub fn new(ignore_dirs: Vec<String>, ignore_pattern: Option<String>) -> Self {
        Self { ignore_dirs, ignore_pattern }
    }

    pub fn from_config(cfg: &AnalysisConfig) -> Self {
        Self::new(cfg.ignore_dirs.clone(), cfg.ignore_pattern.clone())
    }

    fn walker(&self, dir: &Path, max_depth: Option<usize>) -> WalkBuilder {
        let mut builder = WalkBuilder::new(dir);
        builder.hidden(false).ignore(true).git_ignore(true).max_depth(max_depth);

        let ignore_dirs = self.ignore_dirs.clone();
        builder.filter_entry(move |entry| {
            let is_dir = entry.file_type().is_some_and(|t| t.is_dir());
            if !is_dir || entry.depth() == 0 {
                return true;
            }
            let name = entry.file_name().to_string_lossy();
            !ignore_dirs.iter().any(|d| *d == name)
        });

        if let Some(pattern) = &self.ignore_pattern {
            let mut overrides = OverrideBuilder::new(dir);
            match overrides.add(&format!("!{}", pattern)).and_then(|b| b.build()) {
                Ok(ov) => {
                    builder.overrides(ov);
                }
                Err(e) => warn!("Ignoring invalid ignore pattern '{}': {}", pattern, e),
            }
        }
        builder
    }

    fn walk<'a>(
        &'a self,
        dir: &Path,
        extensions: &'a [String],
        max_depth: Option<usize>,
    ) -> Box<dyn Iterator<Item = PathBuf> + 'a> {
        debug!("Walking directory tree from root: {}", dir.display());
        let walker = self.walker(dir, max_depth).build();
        Box::new(walker.filter_map(|res| res.ok()).filter_map(move |dent| {
            let is_file = dent.file_type().is_some_and(|t| t.is_file());
            if is_file && has_extension(dent.path(), extensions) {
                trace!("Listed file: {}", dent.path().display());
                Some(dent.into_path())
            } else {
                None
            }
        }))
    }
}

impl Default for OsFileReader {
    fn default() -> Self {
        Self::from_config(&AnalysisConfig::new("."))
    }
}

impl FileReader for OsFileReader {
    fn read(&self, path: &Path) -> Result<String> {
        fs::read_to_string(path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => Error::FileNotFound(path.to_path_buf()),
            _ => Error::Io(e),
        })
    }

    fn exists(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn list<'a>(
        &'a self,
        dir: &Path,
        extensions: &'a [String],
    ) -> Box<dyn Iterator<Item = PathBuf> + 'a> {
        self.walk(dir, extensions, None)
    }

    fn list_shallow<'a>(
        &'a self,
        dir: &Path,
        extensions: &'a [String],
    ) -> Box<dyn Iterator<Item = PathBuf> + 'a> {
        self.walk(dir, extensions, Some(1))
    }

    fn find_named(&self, dir: &Path, file_name: &str) -> Vec<PathBuf> {
        let found: Vec<PathBuf> = self
            .walker(dir, None)
            .build()
            .filter_map(|res| res.ok())
            .filter(|dent| dent.file_name().to_str() == Some(file_name))
            .filter(|dent| dent.file_type().is_some_and(|t| t.is_file()))
            .map(|dent| dent.into_path())
            .collect();
        debug!("Found {} '{}' files under {}", found.len(), file_name, dir.display());
        found
    }
}

/// [`FileReader`] over a fixed set of files, for tests and embedding.
#[derive(Debug, Clone, Default)]
pub struct InMemoryFileReader {
    files: BTreeMap<PathBuf, String>,
    ignore_dirs: Vec<String>,
}

impl InMemoryFileReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        self.insert(path, content);
        self
    }

    pub fn with_ignore_dirs(mut self, dirs: &[&str]) -> Self {
        self.ignore_dirs = dirs.iter().map(|d| d.to_string()).collect();
        self
    }

    pub fn insert(&mut self, path: impl Into<PathBuf>, content: impl Into<String>) {
        self.files.insert(path_clean::clean(path.into()), content.into());
    }

    pub fn remove(&mut self, path: &Path) -> Option<String> {
        self.files.remove(&path_clean::clean(path))
    }

    fn below(&self, dir: &Path) -> Vec<&PathBuf> {
        let dir = path_clean::clean(dir);
        self.files
            .keys()
            .filter(|p| p.starts_with(&dir) && !is_in_ignored_dir(&dir, p, &self.ignore_dirs))
            .collect()
    }
}

impl FileReader for InMemoryFileReader {
    fn read(&self, path: &Path) -> Result<String> {
        self.files
            .get(&path_clean::clean(path))
            .cloned()
            .ok_or_else(|| Error::FileNotFound(path.to_path_buf()))
    }

    fn exists(&self, path: &Path) -> bool {
        self.files.contains_key(&path_clean::clean(path))
    }

    fn list<'a>(
        &'a self,
        dir: &Path,
        extensions: &'a [String],
    ) -> Box<dyn Iterator<Item = PathBuf> + 'a> {
        let listed: Vec<PathBuf> =
            self.below(dir).into_iter().filter(|p| has_extension(p, extensions)).cloned().collect();
        Box::new(listed.into_iter())
    }

    fn find_named(&self, dir: &Path, file_name: &str) -> Vec<PathBuf> {
        self.below(dir)
            .into_iter()
            .filter(|p| p.file_name().and_then(|n| n.to_str()) == Some(file_name))
            .cloned()
            .collect()
    }
}
