//! Building blocks for depwalk.
//!
//! This crate holds everything that does not need the graph itself:
//! - the analysis configuration and error taxonomy
//! - file access behind the [`FileReader`] trait
//! - declaration extraction from JS/TS and component files
//! - specifier classification, the resolution ladder and `node_modules` lookup
//! - tsconfig path aliases

mod cancel;
mod classifier;
mod config;
mod constants;
mod error;
mod fs;
mod ladder;
mod node_modules;
mod parser;
mod paths;
mod tsconfig;
mod types;

pub use cancel::CancellationToken;
pub use classifier::{
    ModuleKind, builtin_module_name, classify, is_relative_specifier, is_skipped_module,
    is_third_party_specifier, package_name,
};
pub use config::{AnalysisConfig, DependencyTracking};
pub use constants::{
    CIRCULAR_DEPTH_WARNING_THRESHOLD, DEFAULT_FILE_EXTENSIONS, DEFAULT_IGNORE_DIRS,
    DEFAULT_TSCONFIG_FILE, MANIFEST_FILE_NAME, SUPPORTED_FILE_EXTENSIONS,
};
pub use error::{Error, Result};
pub use fs::{FileReader, InMemoryFileReader, OsFileReader};
pub use ladder::{ladder_candidates, resolve_with_ladder};
pub use node_modules::resolve_package_entry;
pub use parser::{ComponentExtractor, DeclarationExtractor, EcmaScriptExtractor, ExtractorRegistry};
pub use paths::{dotted_extension, has_extension, is_in_ignored_dir, node_id, node_path};
pub use tsconfig::{AliasEntry, AliasMatch, PathAliases, read_path_aliases};
pub use types::{Declaration, DeclarationKind};
