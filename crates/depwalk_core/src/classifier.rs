//! Pure classification of module specifiers.

use log::trace;

use crate::{
    constants::{
        BINARY_MODULE_EXTENSION, BUILTIN_MODULE_PROTOCOL, BUILTIN_MODULES, JSON_MODULE_EXTENSION,
        PROTOCOL_ONLY_BUILTIN_MODULES, SUPPORTED_FILE_EXTENSIONS,
    },
    tsconfig::{AliasMatch, PathAliases},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleKind {
    /// Binary addons and JSON documents, never an edge.
    Skip,
    /// Platform module; `name` drops the protocol but keeps any sub-path.
    Builtin { name: String },
    /// tsconfig path alias with its rewritten targets.
    Alias(AliasMatch),
    /// Registry package; `package` is the reduced package name.
    ThirdParty { package: String },
    /// Anything else, resolved through the ladder.
    RelativeFile,
}

/// Classify `specifier`, first matching rule wins: skip, builtin, alias,
/// third-party, relative file.
pub fn classify(specifier: &str, aliases: &PathAliases) -> ModuleKind {
    let kind = if is_skipped_module(specifier) {
        ModuleKind::Skip
    } else if let Some(name) = builtin_module_name(specifier) {
        ModuleKind::Builtin { name }
    } else if let Some(matched) = aliases.match_specifier(specifier) {
        ModuleKind::Alias(matched)
    } else if is_third_party_specifier(specifier) {
        ModuleKind::ThirdParty { package: package_name(specifier).to_string() }
    } else {
        ModuleKind::RelativeFile
    };
    trace!("Classified '{}' as {:?}", specifier, kind);
    kind
}

pub fn is_skipped_module(specifier: &str) -> bool {
    specifier.ends_with(BINARY_MODULE_EXTENSION) || specifier.ends_with(JSON_MODULE_EXTENSION)
}

/// The platform module name of `specifier`, if it is one.
///
/// `node:fs/promises` and `fs/promises` both yield `fs/promises`; the
/// sub-path is ignored for the lookup itself.
pub fn builtin_module_name(specifier: &str) -> Option<String> {
    let (has_protocol, name) = match specifier.strip_prefix(BUILTIN_MODULE_PROTOCOL) {
        Some(rest) => (true, rest),
        None => (false, specifier),
    };
    let base = name.split('/').next().unwrap_or(name);

    let known = BUILTIN_MODULES.contains(&base)
        || (has_protocol
            && (PROTOCOL_ONLY_BUILTIN_MODULES.contains(&name)
                || PROTOCOL_ONLY_BUILTIN_MODULES.contains(&base)));
    known.then(|| name.to_string())
}

pub fn is_relative_specifier(specifier: &str) -> bool {
    specifier.starts_with('.') || specifier.starts_with('/')
}

/// Bare specifier that does not look like a file name.
pub fn is_third_party_specifier(specifier: &str) -> bool {
    !specifier.is_empty()
        && !is_relative_specifier(specifier)
        && !SUPPORTED_FILE_EXTENSIONS.iter().any(|ext| specifier.ends_with(ext))
}

/// Reduce a bare specifier to its package: `@scope/name/sub` -> `@scope/name`,
/// `lodash/fp` -> `lodash`.
pub fn package_name(specifier: &str) -> &str {
    let mut segments = specifier.match_indices('/').map(|(i, _)| i);
    let end = if specifier.starts_with('@') {
        segments.nth(1)
    } else {
        segments.next()
    };
    &specifier[..end.unwrap_or(specifier.len())]
}
