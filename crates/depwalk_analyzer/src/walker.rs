//! Parallel walk over the project: read a file, extract its declarations,
//! run the resolver pipeline and schedule every followed file.

use dashmap::DashSet;
use depwalk_core::{
    AnalysisConfig, CancellationToken, Error, ExtractorRegistry, FileReader, PathAliases, Result,
    node_id, node_path,
};
use depwalk_graph::{CollectDepth, DependencyGraph, GraphStore, VertexBody};
use log::{debug, info, trace, warn};
use path_clean::clean;
use rayon::prelude::*;
use std::{
    collections::{BTreeMap, HashSet},
    path::{Path, PathBuf},
    sync::atomic::{AtomicBool, AtomicUsize, Ordering},
};

use crate::{
    cache::{CacheEntry, CacheStore, content_hash, is_configuration_affected, is_file_affected},
    resolver::{ResolverPipeline, ResolverScope},
    workspace::ManifestEntry,
};

/// The last committed run, consulted to carry unaffected vertices over.
pub(crate) struct PreviousRun<'a> {
    graph: &'a DependencyGraph,
    cache: &'a BTreeMap<String, CacheEntry>,
    /// Affected files and everything they depend on.
    dirty: HashSet<String>,
}

impl<'a> PreviousRun<'a> {
    /// Hash every cached file again and mark what has to be walked anew.
    pub(crate) fn new(
        graph: &'a DependencyGraph,
        cache: &'a BTreeMap<String, CacheEntry>,
        reader: &dyn FileReader,
        cwd: &Path,
    ) -> Self {
        let affected: Vec<&String> = cache
            .par_iter()
            .filter(|(id, entry)| match reader.read(&node_path(cwd, id)) {
                Ok(content) => is_file_affected(&content, &entry.content_hash),
                Err(_) => true,
            })
            .map(|(id, _)| id)
            .collect();

        let mut dirty: HashSet<String> = HashSet::new();
        for id in affected {
            debug!("Affected file: {}", id);
            dirty.extend(graph.collect_dependencies(id, CollectDepth::Deep));
            dirty.insert(id.clone());
        }
        Self { graph, cache, dirty }
    }

    pub(crate) fn affected_count(&self) -> usize {
        self.dirty.len()
    }
}

pub(crate) struct WalkOutcome {
    pub graph: DependencyGraph,
    pub cache: BTreeMap<String, CacheEntry>,
    pub files_reanalyzed: usize,
    pub files_reused: usize,
}

#[derive(Default)]
struct WalkState {
    graph: GraphStore,
    cache: CacheStore,
    visited: DashSet<PathBuf>,
    reanalyzed: AtomicUsize,
    reused: AtomicUsize,
    cancelled: AtomicBool,
}

pub(crate) struct Walker<'a> {
    pub config: &'a AnalysisConfig,
    pub reader: &'a dyn FileReader,
    pub extractors: &'a ExtractorRegistry,
    pub pipeline: &'a ResolverPipeline,
    pub aliases: &'a PathAliases,
    pub manifest: Option<&'a ManifestEntry>,
    pub configuration_hash: &'a str,
    pub previous: Option<&'a PreviousRun<'a>>,
    pub cancel: &'a CancellationToken,
}

impl Walker<'_> {
    fn roots(&self) -> Result<Vec<PathBuf>> {
        match self.config.entrypoint_path() {
            Some(entry) if self.reader.exists(&entry) => Ok(vec![entry]),
            Some(entry) => Err(Error::EntrypointNotFound(entry)),
            None => {
                let roots: Vec<PathBuf> =
                    self.reader.list(&self.config.cwd, &self.config.file_extensions).collect();
                info!("Bulk scan found {} files under {}", roots.len(), self.config.cwd.display());
                Ok(roots)
            }
        }
    }

    /// Walk from the entrypoint, or from every file when there is none.
    ///
    /// Nothing is returned for a cancelled walk, the partial graph is dropped.
    pub(crate) fn run(&self) -> Result<WalkOutcome> {
        if self.cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        let roots = self.roots()?;
        let state = WalkState::default();

        rayon::scope(|s| {
            for root in roots {
                self.schedule(s, &state, root);
            }
        });

        let WalkState { graph, cache, reanalyzed, reused, cancelled, .. } = state;
        if cancelled.into_inner() || self.cancel.is_cancelled() {
            info!("Analysis cancelled, discarding partial graph");
            return Err(Error::Cancelled);
        }

        let outcome = WalkOutcome {
            graph: graph.freeze(),
            cache: cache.into_map(),
            files_reanalyzed: reanalyzed.into_inner(),
            files_reused: reused.into_inner(),
        };
        info!(
            "Analyzed {} files ({} re-analyzed, {} reused)",
            outcome.graph.len(),
            outcome.files_reanalyzed,
            outcome.files_reused
        );
        Ok(outcome)
    }

    fn schedule<'s>(&'s self, scope: &rayon::Scope<'s>, state: &'s WalkState, path: PathBuf) {
        let path = clean(path);
        // insert is the atomic check: only one task ever walks a file.
        if !state.visited.insert(path.clone()) {
            trace!("Already scheduled: {}", path.display());
            return;
        }
        scope.spawn(move |s| self.visit(s, state, path));
    }

    fn visit<'s>(&'s self, scope: &rayon::Scope<'s>, state: &'s WalkState, path: PathBuf) {
        if self.cancel.is_cancelled() {
            state.cancelled.store(true, Ordering::SeqCst);
            return;
        }
        let id = node_id(&self.config.cwd, &path);
        if self.try_reuse(scope, state, &id) {
            return;
        }

        let content = match self.reader.read(&path) {
            Ok(content) => content,
            Err(e) => {
                warn!("Failed to read {}: {}", path.display(), e);
                return;
            }
        };
        trace!("Visiting file: {}", path.display());
        state.graph.add_vertex(&id, VertexBody::default().with_size(content.len() as u64));
        state.cache.insert(
            id.clone(),
            CacheEntry {
                content_hash: content_hash(&content),
                configuration_hash: self.configuration_hash.to_string(),
            },
        );

        let follow = |next: &Path| self.schedule(scope, state, next.to_path_buf());
        let resolver_scope = ResolverScope::new(
            &state.graph,
            self.config,
            self.reader,
            self.aliases,
            self.manifest,
            &id,
            &path,
            &follow,
        );
        for declaration in self.extractors.extract(&path, &content) {
            self.pipeline.resolve_declaration(&declaration, &resolver_scope);
        }
        state.reanalyzed.fetch_add(1, Ordering::Relaxed);
    }

    /// Copy an unaffected vertex from the previous run and keep walking
    /// through its dependencies.
    fn try_reuse<'s>(&'s self, scope: &rayon::Scope<'s>, state: &'s WalkState, id: &str) -> bool {
        let Some(previous) = self.previous else {
            return false;
        };
        if previous.dirty.contains(id) {
            return false;
        }
        let (Some(vertex), Some(entry)) = (previous.graph.vertex(id), previous.cache.get(id)) else {
            return false;
        };
        if is_configuration_affected(self.configuration_hash, &entry.configuration_hash) {
            return false;
        }
        let cwd = &self.config.cwd;
        if !vertex.adjacent_to.iter().all(|adj| self.reader.exists(&node_path(cwd, adj))) {
            debug!("A dependency of {} disappeared, re-analyzing it", id);
            return false;
        }

        trace!("Reusing unchanged file: {}", id);
        state.graph.add_vertex(id, vertex.body.clone());
        state.cache.insert(id, entry.clone());
        for adj in &vertex.adjacent_to {
            state.graph.add_edge(id, adj);
            self.schedule(scope, state, node_path(cwd, adj));
        }
        state.reused.fetch_add(1, Ordering::Relaxed);
        true
    }
}
