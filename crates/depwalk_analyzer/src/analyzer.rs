use depwalk_core::{
    AnalysisConfig, CancellationToken, ExtractorRegistry, FileReader, OsFileReader, PathAliases,
    Result, node_id, read_path_aliases,
};
use depwalk_graph::{CollectDepth, DependencyGraph, GraphStructure, Traversal, TraversalOrder};
use indexmap::IndexSet;
use log::{debug, info, warn};
use std::{
    collections::{BTreeMap, BTreeSet},
    path::{Path, PathBuf},
    sync::{Arc, mpsc::Receiver},
};

use crate::{
    cache::{CacheEntry, PersistedCache, configuration_hash, is_configuration_affected},
    resolver::{Resolver, ResolverPipeline},
    unused::{
        ConfigFileDependencyFinder, ImplicitDependencyFinder, UnusedDependencies,
        UnusedDependencyOptions, find_unused_dependencies,
    },
    walker::{PreviousRun, Walker},
    watch::{ChangesDetected, WatchEmitter, is_relevant_change},
    workspace::{Workspace, collect_workspace, find_single_manifest},
};

/// Configures and runs the initial analysis.
pub struct AnalyzerBuilder {
    config: AnalysisConfig,
    reader: Option<Arc<dyn FileReader>>,
    extractors: Option<ExtractorRegistry>,
    resolvers: Vec<Arc<dyn Resolver>>,
    finders: Option<Vec<Arc<dyn ImplicitDependencyFinder>>>,
    cache: Option<PersistedCache>,
}

impl AnalyzerBuilder {
    pub fn new(config: AnalysisConfig) -> Self {
        Self {
            config,
            reader: None,
            extractors: None,
            resolvers: Vec::new(),
            finders: None,
            cache: None,
        }
    }

    pub fn file_reader(mut self, reader: Arc<dyn FileReader>) -> Self {
        self.reader = Some(reader);
        self
    }

    pub fn extractors(mut self, extractors: ExtractorRegistry) -> Self {
        self.extractors = Some(extractors);
        self
    }

    /// Register a resolver that runs before the default one.
    pub fn resolver(mut self, resolver: Arc<dyn Resolver>) -> Self {
        self.resolvers.push(resolver);
        self
    }

    /// Replace the default implicit dependency finders.
    pub fn implicit_dependency_finder(mut self, finder: Arc<dyn ImplicitDependencyFinder>) -> Self {
        self.finders.get_or_insert_with(Vec::new).push(finder);
        self
    }

    /// Start from a cache saved by a previous run.
    pub fn cache(mut self, cache: PersistedCache) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn build(self) -> Result<Analyzer> {
        self.config.validate()?;
        if self.config.is_circular_depth_expensive() {
            warn!("Circular max depth is high, cycle queries may be slow");
        }

        let reader: Arc<dyn FileReader> = match self.reader {
            Some(reader) => reader,
            None => Arc::new(OsFileReader::from_config(&self.config)),
        };
        let type_only = self.config.tracking.type_only;
        let extractors =
            self.extractors.unwrap_or_else(|| ExtractorRegistry::with_defaults(type_only));
        let finders: Vec<Arc<dyn ImplicitDependencyFinder>> = match self.finders {
            Some(finders) => finders,
            None => vec![Arc::new(ConfigFileDependencyFinder::default())],
        };

        let (graph, cache) = match self.cache {
            Some(persisted) => {
                debug!("Loaded cache with {} files", persisted.files.len());
                let graph = DependencyGraph::from_vertices(persisted.fragments.into_values());
                (graph, Some((persisted.configuration_hash, persisted.files)))
            }
            None => (DependencyGraph::default(), None),
        };

        let mut analyzer = Analyzer {
            config: self.config,
            reader,
            extractors,
            pipeline: ResolverPipeline::new(self.resolvers),
            finders,
            aliases: PathAliases::default(),
            workspace: Workspace::default(),
            configuration_hash: String::new(),
            graph,
            cache: BTreeMap::new(),
            emitter: WatchEmitter::default(),
        };
        let (previous_hash, previous_cache) = cache.unwrap_or_default();
        analyzer.cache = previous_cache;
        analyzer.configuration_hash = previous_hash;
        analyzer.analyze(&[], &CancellationToken::new())?;
        Ok(analyzer)
    }
}

/// A project's dependency graph plus everything needed to keep it current.
pub struct Analyzer {
    config: AnalysisConfig,
    reader: Arc<dyn FileReader>,
    extractors: ExtractorRegistry,
    pipeline: ResolverPipeline,
    finders: Vec<Arc<dyn ImplicitDependencyFinder>>,
    aliases: PathAliases,
    workspace: Workspace,
    configuration_hash: String,
    graph: DependencyGraph,
    cache: BTreeMap<String, CacheEntry>,
    emitter: WatchEmitter,
}

impl Analyzer {
    pub fn builder(config: AnalysisConfig) -> AnalyzerBuilder {
        AnalyzerBuilder::new(config)
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    pub fn get_structure(&self) -> GraphStructure {
        self.graph.structure()
    }

    pub fn use_graph(&self) -> GraphApi<'_> {
        GraphApi { graph: &self.graph, max_depth: self.config.circular_max_depth }
    }

    pub fn get_workspace(&self) -> &Workspace {
        &self.workspace
    }

    pub fn path_aliases(&self) -> &PathAliases {
        &self.aliases
    }

    /// Declared third-party packages nothing in the project uses.
    ///
    /// Fails when no manifest is found at the project root or next to the
    /// entrypoint.
    pub fn find_unused_dependencies(
        &self,
        options: UnusedDependencyOptions,
    ) -> Result<UnusedDependencies> {
        let manifest = find_single_manifest(self.reader.as_ref(), &self.config)?;
        let mut implicit: BTreeSet<String> = BTreeSet::new();
        for finder in &self.finders {
            match finder.find(&self.config, self.reader.as_ref(), &self.graph) {
                Ok(found) => {
                    debug!(
                        "Implicit dependency finder '{}' found {} packages",
                        finder.name(),
                        found.len()
                    );
                    implicit.extend(found);
                }
                Err(e) => warn!("Implicit dependency finder '{}' failed: {}", finder.name(), e),
            }
        }
        Ok(find_unused_dependencies(&manifest, &self.workspace, &self.graph, &implicit, options))
    }

    pub fn subscribe(&self) -> Receiver<ChangesDetected> {
        self.emitter.subscribe()
    }

    /// Whether a change to `path` can alter the graph.
    pub fn is_relevant_change(&self, path: &Path) -> bool {
        is_relevant_change(&self.config, path)
    }

    /// Re-analyze after `changed` files were modified, reusing every vertex
    /// whose file is unaffected. Subscribers are notified once the new graph
    /// is committed; a cancelled run leaves the current graph untouched.
    pub fn rerun(
        &mut self,
        changed: &[PathBuf],
        cancel: &CancellationToken,
    ) -> Result<ChangesDetected> {
        let event = self.analyze(changed, cancel)?;
        info!(
            "Re-analyzed {} files, reused {} of {}",
            event.files_reanalyzed, event.files_reused, event.total_files
        );
        self.emitter.emit(&event);
        Ok(event)
    }

    fn analyze(
        &mut self,
        changed: &[PathBuf],
        cancel: &CancellationToken,
    ) -> Result<ChangesDetected> {
        let reader = self.reader.as_ref();
        let aliases = read_path_aliases(reader, &self.config.tsconfig_path());
        let workspace = collect_workspace(reader, &self.config.cwd);
        let current_hash = configuration_hash(&self.config, &aliases, &workspace)?;

        let configuration_changed = !self.cache.is_empty()
            && is_configuration_affected(&current_hash, &self.configuration_hash);
        let previous = (!self.cache.is_empty() && !configuration_changed)
            .then(|| PreviousRun::new(&self.graph, &self.cache, reader, &self.config.cwd));
        match &previous {
            Some(previous) => debug!("{} files need to be walked again", previous.affected_count()),
            None if configuration_changed => info!("Configuration changed, analyzing everything"),
            None => {}
        }

        let outcome = Walker {
            config: &self.config,
            reader,
            extractors: &self.extractors,
            pipeline: &self.pipeline,
            aliases: &aliases,
            manifest: workspace.single(),
            configuration_hash: &current_hash,
            previous: previous.as_ref(),
            cancel,
        }
        .run()?;
        drop(previous);

        let event = ChangesDetected {
            changed_files: changed.iter().map(|p| node_id(&self.config.cwd, p)).collect(),
            configuration_changed,
            files_reanalyzed: outcome.files_reanalyzed,
            files_reused: outcome.files_reused,
            total_files: outcome.graph.len(),
        };

        self.graph = outcome.graph;
        self.cache = outcome.cache;
        self.aliases = aliases;
        self.workspace = workspace;
        self.configuration_hash = current_hash;
        Ok(event)
    }

    pub fn export_cache(&self) -> PersistedCache {
        PersistedCache {
            configuration_hash: self.configuration_hash.clone(),
            files: self.cache.clone(),
            fragments: self.graph.vertices().map(|v| (v.id.clone(), v.clone())).collect(),
        }
    }
}

/// Read-only queries over the current graph, bounded by the configured
/// circular search depth.
#[derive(Debug, Clone, Copy)]
pub struct GraphApi<'g> {
    graph: &'g DependencyGraph,
    max_depth: Option<usize>,
}

impl<'g> GraphApi<'g> {
    pub fn traverse_files(&self, order: TraversalOrder, root: Option<&str>) -> Traversal<'g> {
        self.graph.traverse(order, root)
    }

    pub fn collect_files_dependencies(&self, id: &str, depth: CollectDepth) -> IndexSet<String> {
        self.graph.collect_dependencies(id, depth)
    }

    pub fn collect_files_depending_on(&self, id: &str, depth: CollectDepth) -> IndexSet<String> {
        self.graph.collect_dependents(id, depth)
    }

    pub fn has_circular_dependencies(&self) -> bool {
        self.graph.has_circular_dependencies(self.max_depth)
    }

    pub fn find_circular_dependencies(&self) -> Vec<Vec<String>> {
        self.graph.find_circular_dependencies(self.max_depth)
    }

    pub fn find_leaves(&self) -> Vec<String> {
        self.graph.find_leaves()
    }

    pub fn collect_unused_files(&self) -> Vec<String> {
        self.graph.collect_unused_files()
    }
}
