//! Project-level dependency analysis for JavaScript/TypeScript codebases.
//!
//! The [`Analyzer`] walks a project from its entrypoint (or from every
//! matching file), resolves each module declaration through a chain of
//! [`Resolver`]s and keeps the resulting [`depwalk_graph::DependencyGraph`]
//! current across file changes.
//!
//! # Examples
//!
//! ```no_run
//! use depwalk_analyzer::Analyzer;
//! use depwalk_core::AnalysisConfig;
//!
//! # fn main() -> depwalk_core::Result<()> {
//! let config = AnalysisConfig::new("/path/to/project").with_entrypoint("src/index.ts");
//! let analyzer = Analyzer::builder(config).build()?;
//!
//! for cycle in analyzer.use_graph().find_circular_dependencies() {
//!     println!("{}", cycle.join(" -> "));
//! }
//! # Ok(())
//! # }
//! ```

mod analyzer;
mod cache;
mod resolver;
mod unused;
mod walker;
mod watch;
mod workspace;

pub use analyzer::{Analyzer, AnalyzerBuilder, GraphApi};
pub use cache::{
    CacheEntry, CacheStore, PersistedCache, configuration_hash, content_hash,
    is_configuration_affected, is_file_affected,
};
pub use resolver::{
    EcmaScriptResolver, ResolutionContext, Resolver, ResolverOutcome, ResolverPipeline,
    ResolverScope,
};
pub use unused::{
    ConfigFileDependencyFinder, ImplicitDependencyFinder, UnusedDependencies,
    UnusedDependencyOptions, find_unused_dependencies,
};
pub use watch::{ChangesDetected, WatchEmitter, is_relevant_change};
pub use workspace::{
    ManifestEntry, Workspace, collect_workspace, find_single_manifest, parse_manifest,
};
