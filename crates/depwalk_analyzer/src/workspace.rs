//! Project manifests (`package.json`) and the workspace registry built from them.

use depwalk_core::{AnalysisConfig, Error, FileReader, MANIFEST_FILE_NAME, Result};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

/// Dependency declarations of one manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestEntry {
    pub dependencies: BTreeMap<String, String>,
    pub dev_dependencies: BTreeMap<String, String>,
    pub peer_dependencies: BTreeMap<String, String>,
}

impl ManifestEntry {
    /// Whether `package` is declared in any of the three dependency maps.
    pub fn declares(&self, package: &str) -> bool {
        self.dependencies.contains_key(package)
            || self.dev_dependencies.contains_key(package)
            || self.peer_dependencies.contains_key(package)
    }
}

#[derive(Debug, Deserialize)]
struct RawManifest {
    name: Option<String>,
    #[serde(default)]
    dependencies: BTreeMap<String, String>,
    #[serde(default, rename = "devDependencies")]
    dev_dependencies: BTreeMap<String, String>,
    #[serde(default, rename = "peerDependencies")]
    peer_dependencies: BTreeMap<String, String>,
}

/// Parse manifest `content`, returning the package name and its declarations.
pub fn parse_manifest(path: &Path, content: &str) -> Result<(Option<String>, ManifestEntry)> {
    let raw: RawManifest = serde_json::from_str(content)
        .map_err(|e| Error::ManifestParse { path: path.to_path_buf(), reason: e.to_string() })?;
    let entry = ManifestEntry {
        dependencies: raw.dependencies,
        dev_dependencies: raw.dev_dependencies,
        peer_dependencies: raw.peer_dependencies,
    };
    Ok((raw.name, entry))
}

/// Name-keyed registry of every manifest found under the project root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Workspace {
    manifests: BTreeMap<String, ManifestEntry>,
}

impl Workspace {
    pub fn len(&self) -> usize {
        self.manifests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.manifests.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&ManifestEntry> {
        self.manifests.get(name)
    }

    pub fn iter(&self) -> std::collections::btree_map::Iter<'_, String, ManifestEntry> {
        self.manifests.iter()
    }

    pub fn insert(&mut self, name: impl Into<String>, entry: ManifestEntry) {
        self.manifests.insert(name.into(), entry);
    }

    /// The only manifest, when there is exactly one.
    pub fn single(&self) -> Option<&ManifestEntry> {
        if self.manifests.len() == 1 { self.manifests.values().next() } else { None }
    }
}

/// Read every manifest below `cwd` into a [`Workspace`].
///
/// Unreadable manifests, malformed ones and ones without a `name` are
/// skipped with a warning.
pub fn collect_workspace(reader: &dyn FileReader, cwd: &Path) -> Workspace {
    let mut workspace = Workspace::default();
    let mut paths = reader.find_named(cwd, MANIFEST_FILE_NAME);
    paths.sort();

    for path in paths {
        let content = match reader.read(&path) {
            Ok(content) => content,
            Err(e) => {
                let err = Error::ManifestRead { path: path.clone(), reason: e.to_string() };
                warn!("{}", err);
                continue;
            }
        };
        match parse_manifest(&path, &content) {
            Ok((Some(name), entry)) => {
                debug!("Registered manifest '{}' from {}", name, path.display());
                if workspace.manifests.insert(name.clone(), entry).is_some() {
                    warn!(
                        "Manifest name '{}' is declared more than once, keeping {}",
                        name,
                        path.display()
                    );
                }
            }
            Ok((None, _)) => {
                let reason = "missing \"name\" field".to_string();
                let err = Error::ManifestParse { path, reason };
                warn!("{}", err);
            }
            Err(e) => warn!("{}", e),
        }
    }

    info!("Collected {} workspace manifests", workspace.len());
    workspace
}

/// Load the project manifest from `cwd`, or else from the entrypoint's directory.
///
/// Unlike [`collect_workspace`] a missing manifest is an error here. A
/// malformed one is logged and the next location is tried.
pub fn find_single_manifest(
    reader: &dyn FileReader,
    config: &AnalysisConfig,
) -> Result<ManifestEntry> {
    let mut searched: Vec<PathBuf> = vec![config.cwd.join(MANIFEST_FILE_NAME)];
    if let Some(dir) = config.entrypoint_path().as_deref().and_then(Path::parent) {
        let candidate = dir.join(MANIFEST_FILE_NAME);
        if !searched.contains(&candidate) {
            searched.push(candidate);
        }
    }

    let mut parse_error = None;
    for path in &searched {
        let Ok(content) = reader.read(path) else {
            continue;
        };
        match parse_manifest(path, &content) {
            Ok((_, entry)) => {
                debug!("Using manifest {}", path.display());
                return Ok(entry);
            }
            Err(e) => {
                warn!("{}", e);
                parse_error = Some(e);
            }
        }
    }
    Err(parse_error.unwrap_or(Error::ManifestNotFound { searched }))
}
