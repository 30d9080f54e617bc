//! Unused third-party dependency analysis.

use depwalk_core::{
    AnalysisConfig, ExtractorRegistry, FileReader, ModuleKind, PathAliases, Result,
    SUPPORTED_FILE_EXTENSIONS, classify, node_id,
};
use depwalk_graph::DependencyGraph;
use log::{debug, info, trace, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::workspace::{ManifestEntry, Workspace};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UnusedDependencyOptions {
    /// Report unused `devDependencies` too.
    pub include_dev_dependencies: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnusedDependencies {
    pub third_party: Vec<String>,
}

/// Finds packages a project uses outside of the walked graph, e.g. in tool
/// configuration files.
pub trait ImplicitDependencyFinder: Send + Sync {
    fn name(&self) -> &str;

    fn find(
        &self,
        config: &AnalysisConfig,
        reader: &dyn FileReader,
        graph: &DependencyGraph,
    ) -> Result<BTreeSet<String>>;
}

/// Reads root-level tool configuration files (`vite.config.ts`,
/// `.eslintrc.js`, ...) that are not part of the graph.
#[derive(Debug, Clone)]
pub struct ConfigFileDependencyFinder {
    extractors: ExtractorRegistry,
}

impl Default for ConfigFileDependencyFinder {
    fn default() -> Self {
        Self { extractors: ExtractorRegistry::with_defaults(false) }
    }
}

fn is_config_file_name(name: &str) -> bool {
    name.contains(".config.") || (name.starts_with('.') && name.contains("rc."))
}

impl ImplicitDependencyFinder for ConfigFileDependencyFinder {
    fn name(&self) -> &str {
        "config-files"
    }

    fn find(
        &self,
        config: &AnalysisConfig,
        reader: &dyn FileReader,
        graph: &DependencyGraph,
    ) -> Result<BTreeSet<String>> {
        let extensions: Vec<String> =
            SUPPORTED_FILE_EXTENSIONS.iter().map(|e| e.to_string()).collect();
        let aliases = PathAliases::default();
        let mut packages = BTreeSet::new();

        for path in reader.list_shallow(&config.cwd, &extensions) {
            let is_config =
                path.file_name().and_then(|n| n.to_str()).is_some_and(is_config_file_name);
            if !is_config || graph.contains(&node_id(&config.cwd, &path)) {
                continue;
            }
            let content = match reader.read(&path) {
                Ok(content) => content,
                Err(e) => {
                    warn!("Could not read {}: {}", path.display(), e);
                    continue;
                }
            };
            trace!("Scanning configuration file {}", path.display());
            for declaration in self.extractors.extract(&path, &content) {
                if let ModuleKind::ThirdParty { package } =
                    classify(&declaration.specifier, &aliases)
                {
                    packages.insert(package);
                }
            }
        }
        Ok(packages)
    }
}

/// Declared packages that no vertex uses and no implicit finder reports.
pub fn find_unused_dependencies(
    manifest: &ManifestEntry,
    workspace: &Workspace,
    graph: &DependencyGraph,
    implicit: &BTreeSet<String>,
    options: UnusedDependencyOptions,
) -> UnusedDependencies {
    let mut declared: BTreeSet<&str> = BTreeSet::new();
    for entry in std::iter::once(manifest).chain(workspace.iter().map(|(_, entry)| entry)) {
        declared.extend(entry.dependencies.keys().map(String::as_str));
        if options.include_dev_dependencies {
            declared.extend(entry.dev_dependencies.keys().map(String::as_str));
        }
    }

    let used: BTreeSet<&str> = graph
        .vertices()
        .flat_map(|v| v.body.third_party_dependencies.iter().map(String::as_str))
        .collect();

    let third_party: Vec<String> = declared
        .into_iter()
        .filter(|package| !used.contains(package) && !implicit.contains(*package))
        .map(str::to_string)
        .collect();

    if third_party.is_empty() {
        info!("No unused third-party dependencies");
    } else {
        debug!("Unused third-party dependencies: {:?}", third_party);
    }
    UnusedDependencies { third_party }
}

#[cfg(test)]
mod tests {
    use super::*;
    use depwalk_core::InMemoryFileReader;
    use depwalk_graph::{GraphStore, VertexBody};

    fn manifest(deps: &[&str], dev: &[&str]) -> ManifestEntry {
        let mut entry = ManifestEntry::default();
        for d in deps {
            entry.dependencies.insert(d.to_string(), "1.0.0".into());
        }
        for d in dev {
            entry.dev_dependencies.insert(d.to_string(), "1.0.0".into());
        }
        entry
    }

    fn graph_using(packages: &[&str]) -> DependencyGraph {
        let store = GraphStore::new();
        let body = packages.iter().fold(VertexBody::default(), |body, p| body.with_third_party(*p));
        store.add_vertex("index.js", body);
        store.freeze()
    }

    #[test]
    fn test_declared_minus_used() {
        let unused = find_unused_dependencies(
            &manifest(&["react", "lodash", "rxjs"], &["vitest"]),
            &Workspace::default(),
            &graph_using(&["react"]),
            &BTreeSet::new(),
            UnusedDependencyOptions::default(),
        );
        assert_eq!(unused.third_party, vec!["lodash", "rxjs"]);
    }

    #[test]
    fn test_dev_dependencies_on_request() {
        let unused = find_unused_dependencies(
            &manifest(&["react"], &["vitest", "typescript"]),
            &Workspace::default(),
            &graph_using(&["react"]),
            &BTreeSet::from(["typescript".to_string()]),
            UnusedDependencyOptions { include_dev_dependencies: true },
        );
        assert_eq!(unused.third_party, vec!["vitest"]);
    }

    #[test]
    fn test_workspace_manifests_are_included() {
        let mut workspace = Workspace::default();
        workspace.insert("app1", manifest(&["rxjs"], &[]));
        let unused = find_unused_dependencies(
            &manifest(&[], &[]),
            &workspace,
            &graph_using(&[]),
            &BTreeSet::new(),
            UnusedDependencyOptions::default(),
        );
        assert_eq!(unused.third_party, vec!["rxjs"]);
    }

    #[test]
    fn test_config_file_finder() {
        let reader = InMemoryFileReader::new()
            .with_file(
                "/repo/vite.config.ts",
                "import vue from '@vitejs/plugin-vue';\nimport { defineConfig } from 'vite';",
            )
            .with_file(
                "/repo/.eslintrc.cjs",
                "module.exports = { plugins: [require('eslint-plugin-vue')] };",
            )
            .with_file("/repo/index.ts", "import 'react';")
            .with_file("/repo/src/tool.config.ts", "import 'nested';");
        let config = AnalysisConfig::new("/repo");
        let found = ConfigFileDependencyFinder::default()
            .find(&config, &reader, &DependencyGraph::default())
            .unwrap();
        let found: Vec<&str> = found.iter().map(String::as_str).collect();
        assert_eq!(found, vec!["@vitejs/plugin-vue", "eslint-plugin-vue", "vite"]);
    }

    #[test]
    fn test_config_file_in_graph_is_skipped() {
        let reader = InMemoryFileReader::new().with_file("/repo/app.config.js", "import 'dep';");
        let store = GraphStore::new();
        store.add_vertex("app.config.js", VertexBody::default());
        let found = ConfigFileDependencyFinder::default()
            .find(&AnalysisConfig::new("/repo"), &reader, &store.freeze())
            .unwrap();
        assert!(found.is_empty());
    }

    #[test]
    fn test_config_file_names() {
        assert!(is_config_file_name("vite.config.ts"));
        assert!(is_config_file_name(".eslintrc.js"));
        assert!(is_config_file_name(".prettierrc.cjs"));
        assert!(!is_config_file_name("index.ts"));
        assert!(!is_config_file_name("config.ts"));
    }
}
