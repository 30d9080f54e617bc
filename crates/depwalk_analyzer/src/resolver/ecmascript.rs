use depwalk_core::{Error, ModuleKind, Result, node_id, resolve_package_entry};
use log::{debug, trace};
use std::path::Path;

use super::{ResolutionContext, Resolver, ResolverOutcome, ResolverScope};

/// Default resolver for JavaScript and TypeScript module declarations.
///
/// Skips binary and JSON modules, records builtins and third-party packages
/// on the importer's body when tracking is on, and follows relative and
/// alias specifiers through the resolution ladder.
#[derive(Debug, Clone, Copy, Default)]
pub struct EcmaScriptResolver;

impl EcmaScriptResolver {
    fn link(&self, resolved: &Path, scope: &ResolverScope<'_>) {
        if !scope.config.supports_file(resolved) {
            trace!("Not following {}, extension is not analyzed", resolved.display());
            return;
        }
        let target = node_id(&scope.config.cwd, resolved);
        scope.graph.add_edge(scope.importer, &target);
        scope.follow_module_declaration(resolved);
    }

    fn third_party(&self, ctx: &ResolutionContext, package: &str, scope: &ResolverScope<'_>) {
        if let Some(manifest) = scope.manifest
            && !manifest.declares(package)
        {
            debug!(
                "'{}' imported from {} is not declared in package.json",
                package, scope.importer
            );
        }

        if scope.config.tracking.third_party {
            scope.graph.merge_body(scope.importer, |body| body.with_third_party(package));
        }

        if scope.config.follow_third_party {
            let start_dir = scope.importer_path.parent().unwrap_or(&scope.config.cwd);
            let entry =
                resolve_package_entry(scope.reader, start_dir, ctx.specifier(), &scope.config.cwd);
            match entry {
                Some(entry) => self.link(&entry, scope),
                None => debug!("No installed entry file for '{}'", ctx.specifier()),
            }
        }
    }
}

impl Resolver for EcmaScriptResolver {
    fn name(&self) -> &str {
        "ecmascript"
    }

    fn resolve(
        &self,
        ctx: &ResolutionContext,
        scope: &ResolverScope<'_>,
    ) -> Result<ResolverOutcome> {
        match &ctx.kind {
            ModuleKind::Skip => trace!("Skipping '{}'", ctx.specifier()),
            ModuleKind::Builtin { name } => {
                if scope.config.tracking.builtin {
                    scope.graph.merge_body(scope.importer, |body| body.with_builtin(name.as_str()));
                }
            }
            ModuleKind::ThirdParty { package } => self.third_party(ctx, package, scope),
            ModuleKind::Alias(_) | ModuleKind::RelativeFile => {
                let Some(resolved) = &ctx.resolved_node_path else {
                    return Err(Error::ModuleNotFound {
                        specifier: ctx.specifier().to_string(),
                        from: scope.importer.to_string(),
                    });
                };
                self.link(resolved, scope);
            }
        }
        Ok(ResolverOutcome::Continue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{resolver::ResolverPipeline, workspace::ManifestEntry};
    use depwalk_core::{
        AnalysisConfig, Declaration, DeclarationKind, DependencyTracking, InMemoryFileReader,
        PathAliases,
    };
    use depwalk_graph::GraphStore;
    use std::{path::PathBuf, sync::Mutex};

    struct Harness {
        config: AnalysisConfig,
        reader: InMemoryFileReader,
        graph: GraphStore,
        followed: Mutex<Vec<PathBuf>>,
    }

    impl Harness {
        fn new(config: AnalysisConfig, reader: InMemoryFileReader) -> Self {
            Self { config, reader, graph: GraphStore::new(), followed: Mutex::new(Vec::new()) }
        }

        fn resolve(&self, specifier: &str, manifest: Option<&ManifestEntry>) {
            let aliases = PathAliases::default();
            let follow = |p: &Path| self.followed.lock().unwrap().push(p.to_path_buf());
            let scope = ResolverScope::new(
                &self.graph,
                &self.config,
                &self.reader,
                &aliases,
                manifest,
                "index.js",
                Path::new("/repo/index.js"),
                &follow,
            );
            ResolverPipeline::default()
                .resolve_declaration(&Declaration::new(specifier, DeclarationKind::Static), &scope);
        }
    }

    fn tracking_all() -> DependencyTracking {
        DependencyTracking { third_party: true, builtin: true, type_only: true }
    }

    fn tracked_config() -> AnalysisConfig {
        AnalysisConfig::new("/repo").with_tracking(tracking_all())
    }

    #[test]
    fn test_third_party_recorded_when_tracked() {
        let h = Harness::new(tracked_config(), InMemoryFileReader::new());
        h.resolve("meriyah", None);
        h.resolve("@scope/pkg/sub", None);
        h.resolve("meriyah", None);
        let body = h.graph.vertex("index.js").unwrap().body;
        assert_eq!(
            body.third_party_dependencies.iter().collect::<Vec<_>>(),
            vec!["meriyah", "@scope/pkg"]
        );
        assert!(h.followed.lock().unwrap().is_empty());
    }

    #[test]
    fn test_third_party_ignored_when_untracked() {
        let h = Harness::new(AnalysisConfig::new("/repo"), InMemoryFileReader::new());
        h.resolve("meriyah", None);
        assert!(h.graph.is_empty());
    }

    #[test]
    fn test_builtins_recorded_without_protocol() {
        let h = Harness::new(tracked_config(), InMemoryFileReader::new());
        h.resolve("node:fs", None);
        h.resolve("fs", None);
        h.resolve("node:path/posix", None);
        let body = h.graph.vertex("index.js").unwrap().body;
        assert_eq!(body.builtin_dependencies.iter().collect::<Vec<_>>(), vec!["fs", "path/posix"]);
        assert!(body.third_party_dependencies.is_empty());
    }

    #[test]
    fn test_json_and_binary_are_skipped() {
        let reader = InMemoryFileReader::new()
            .with_file("/repo/data.json", "{}")
            .with_file("/repo/addon.node", "");
        let h = Harness::new(tracked_config(), reader);
        h.resolve("./data.json", None);
        h.resolve("./addon.node", None);
        assert!(h.graph.is_empty());
        assert!(h.followed.lock().unwrap().is_empty());
    }

    #[test]
    fn test_relative_file_is_linked_and_followed() {
        let reader =
            InMemoryFileReader::new().with_file("/repo/lib.js", "").with_file("/repo/lib.ts", "");
        let h = Harness::new(AnalysisConfig::new("/repo"), reader);
        h.resolve("./lib", None);
        assert!(h.graph.vertex("index.js").unwrap().adjacent_to.contains("lib.ts"));
        assert_eq!(*h.followed.lock().unwrap(), vec![PathBuf::from("/repo/lib.ts")]);
    }

    #[test]
    fn test_unresolvable_relative_file_adds_nothing() {
        let h = Harness::new(AnalysisConfig::new("/repo"), InMemoryFileReader::new());
        h.resolve("./missing", None);
        assert!(h.graph.is_empty());
    }

    #[test]
    fn test_unsupported_extension_is_not_followed() {
        let reader = InMemoryFileReader::new().with_file("/repo/App.vue", "");
        let h = Harness::new(AnalysisConfig::new("/repo"), reader);
        h.resolve("./App.vue", None);
        assert!(h.graph.is_empty());
    }

    #[test]
    fn test_follow_third_party_into_node_modules() {
        let reader = InMemoryFileReader::new()
            .with_file("/repo/node_modules/dep/package.json", r#"{ "main": "main.js" }"#)
            .with_file("/repo/node_modules/dep/main.js", "");
        let mut config = tracked_config();
        config.follow_third_party = true;
        let h = Harness::new(config, reader);
        let manifest = ManifestEntry::default();
        h.resolve("dep", Some(&manifest));

        let vertex = h.graph.vertex("index.js").unwrap();
        assert!(vertex.adjacent_to.contains("node_modules/dep/main.js"));
        assert!(vertex.body.third_party_dependencies.contains("dep"));
        assert_eq!(
            *h.followed.lock().unwrap(),
            vec![PathBuf::from("/repo/node_modules/dep/main.js")]
        );
    }
}
