//! Resolver pipeline: turns one module declaration into graph edges and body
//! updates.
//!
//! Custom resolvers run first, in registration order, then the default
//! [`EcmaScriptResolver`]. Any resolver can end the chain for a declaration
//! by returning [`ResolverOutcome::StopChain`].

mod ecmascript;

pub use ecmascript::EcmaScriptResolver;

use depwalk_core::{
    AnalysisConfig, Declaration, Error, FileReader, ModuleKind, PathAliases, Result, classify,
    resolve_with_ladder,
};
use depwalk_graph::GraphStore;
use log::{trace, warn};
use path_clean::clean;
use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use crate::workspace::ManifestEntry;

/// Per-declaration input of the resolvers. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionContext {
    pub module_declaration: Declaration,
    pub kind: ModuleKind,
    /// Where the specifier points before the ladder runs.
    pub raw_node_path: PathBuf,
    /// First existing file for relative and alias specifiers.
    pub resolved_node_path: Option<PathBuf>,
    pub is_path_alias_declaration: bool,
    pub path_alias_base_url: Option<PathBuf>,
}

impl ResolutionContext {
    /// Classify `declaration` made in `importer` and check the file system
    /// for the file it points to.
    pub fn build(
        declaration: &Declaration,
        importer: &Path,
        config: &AnalysisConfig,
        aliases: &PathAliases,
        reader: &dyn FileReader,
    ) -> Self {
        let specifier = declaration.specifier.as_str();
        let kind = classify(specifier, aliases);
        let base_dir = importer.parent().unwrap_or(&config.cwd);
        let exists = |p: &Path| reader.exists(p);

        let (raw_node_path, resolved_node_path) = match &kind {
            ModuleKind::Alias(matched) => {
                let candidates: Vec<PathBuf> =
                    matched.targets.iter().map(|t| clean(aliases.base_url().join(t))).collect();
                let resolved = candidates
                    .iter()
                    .find_map(|c| resolve_with_ladder(c, &config.file_extensions, exists));
                let raw = candidates
                    .into_iter()
                    .next()
                    .unwrap_or_else(|| aliases.base_url().to_path_buf());
                (raw, resolved)
            }
            ModuleKind::RelativeFile => {
                let raw = clean(base_dir.join(specifier));
                let resolved = resolve_with_ladder(&raw, &config.file_extensions, exists);
                (raw, resolved)
            }
            _ => (base_dir.join(specifier), None),
        };

        let is_alias = matches!(kind, ModuleKind::Alias(_));
        Self {
            module_declaration: declaration.clone(),
            raw_node_path,
            resolved_node_path,
            is_path_alias_declaration: is_alias,
            path_alias_base_url: is_alias.then(|| aliases.base_url().to_path_buf()),
            kind,
        }
    }

    pub fn specifier(&self) -> &str {
        &self.module_declaration.specifier
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolverOutcome {
    /// Let the next resolver see the declaration too.
    Continue,
    /// Skip the remaining resolvers for this declaration.
    StopChain,
}

/// What a resolver may read and write while handling one declaration.
pub struct ResolverScope<'a> {
    pub graph: &'a GraphStore,
    pub config: &'a AnalysisConfig,
    pub reader: &'a dyn FileReader,
    pub aliases: &'a PathAliases,
    /// The project manifest when exactly one is in scope.
    pub manifest: Option<&'a ManifestEntry>,
    /// Node id of the file holding the declaration.
    pub importer: &'a str,
    pub importer_path: &'a Path,
    follow: &'a (dyn Fn(&Path) + Sync),
}

impl<'a> ResolverScope<'a> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        graph: &'a GraphStore,
        config: &'a AnalysisConfig,
        reader: &'a dyn FileReader,
        aliases: &'a PathAliases,
        manifest: Option<&'a ManifestEntry>,
        importer: &'a str,
        importer_path: &'a Path,
        follow: &'a (dyn Fn(&Path) + Sync),
    ) -> Self {
        Self { graph, config, reader, aliases, manifest, importer, importer_path, follow }
    }

    /// Schedule `path` to be read, extracted and resolved. Files already
    /// scheduled during this run are ignored.
    pub fn follow_module_declaration(&self, path: &Path) {
        (self.follow)(path)
    }
}

pub trait Resolver: Send + Sync {
    fn name(&self) -> &str;

    fn resolve(
        &self,
        ctx: &ResolutionContext,
        scope: &ResolverScope<'_>,
    ) -> Result<ResolverOutcome>;
}

/// Fixed-order chain of resolvers ending with the default one.
#[derive(Clone)]
pub struct ResolverPipeline {
    resolvers: Vec<Arc<dyn Resolver>>,
}

impl ResolverPipeline {
    pub fn new(custom: Vec<Arc<dyn Resolver>>) -> Self {
        let mut resolvers = custom;
        resolvers.push(Arc::new(EcmaScriptResolver));
        Self { resolvers }
    }

    pub fn names(&self) -> Vec<&str> {
        self.resolvers.iter().map(|r| r.name()).collect()
    }

    /// Run the chain for one declaration. Failures are logged, never returned.
    pub fn resolve_declaration(&self, declaration: &Declaration, scope: &ResolverScope<'_>) {
        let ctx = ResolutionContext::build(
            declaration,
            scope.importer_path,
            scope.config,
            scope.aliases,
            scope.reader,
        );

        for resolver in &self.resolvers {
            match resolver.resolve(&ctx, scope) {
                Ok(ResolverOutcome::Continue) => {}
                Ok(ResolverOutcome::StopChain) => {
                    trace!(
                        "Resolver '{}' stopped the chain for '{}'",
                        resolver.name(),
                        ctx.specifier()
                    );
                    break;
                }
                Err(e @ Error::ModuleNotFound { .. }) => warn!("{}", e),
                Err(e) => {
                    warn!("Resolver '{}' failed on '{}': {}", resolver.name(), ctx.specifier(), e)
                }
            }
        }
    }
}

impl Default for ResolverPipeline {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl std::fmt::Debug for ResolverPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolverPipeline").field("resolvers", &self.names()).finish()
    }
}
