//! Constants for file extensions, platform modules and project files.
//!
//! Extensions are spelled with their leading dot (`.ts`), which is also the
//! form accepted in [`AnalysisConfig::file_extensions`](crate::AnalysisConfig).

/// Extensions walked when the configuration does not say otherwise.
pub const DEFAULT_FILE_EXTENSIONS: &[&str] = &[".js", ".ts", ".jsx", ".tsx", ".mjs", ".cjs"];

/// Every extension a declaration extractor exists for.
pub const SUPPORTED_FILE_EXTENSIONS: &[&str] = &[
    ".js",     // JavaScript
    ".ts",     // TypeScript
    ".jsx",    // JavaScript with JSX
    ".tsx",    // TypeScript with JSX
    ".mjs",    // JavaScript module
    ".cjs",    // JavaScript CommonJS
    ".mts",    // TypeScript module
    ".cts",    // TypeScript CommonJS
    ".vue",    // Vue single-file component
    ".svelte", // Svelte component
];

/// Directory names skipped by bulk scans and manifest discovery.
pub const DEFAULT_IGNORE_DIRS: &[&str] = &["node_modules", "dist", "build", "coverage", ".git"];

pub const MANIFEST_FILE_NAME: &str = "package.json";

pub const DEFAULT_TSCONFIG_FILE: &str = "tsconfig.json";

/// Specifiers with this suffix are native addons and never produce an edge.
pub const BINARY_MODULE_EXTENSION: &str = ".node";

pub const JSON_MODULE_EXTENSION: &str = ".json";

pub const BUILTIN_MODULE_PROTOCOL: &str = "node:";

/// Platform modules importable with or without the `node:` protocol.
pub const BUILTIN_MODULES: &[&str] = &[
    "_http_agent",
    "_http_client",
    "_http_common",
    "_http_incoming",
    "_http_outgoing",
    "_http_server",
    "_stream_duplex",
    "_stream_passthrough",
    "_stream_readable",
    "_stream_transform",
    "_stream_wrap",
    "_stream_writable",
    "_tls_common",
    "_tls_wrap",
    "assert",
    "async_hooks",
    "buffer",
    "child_process",
    "cluster",
    "console",
    "constants",
    "crypto",
    "dgram",
    "diagnostics_channel",
    "dns",
    "domain",
    "events",
    "fs",
    "http",
    "http2",
    "https",
    "inspector",
    "module",
    "net",
    "os",
    "path",
    "perf_hooks",
    "process",
    "punycode",
    "querystring",
    "readline",
    "repl",
    "stream",
    "string_decoder",
    "sys",
    "timers",
    "tls",
    "trace_events",
    "tty",
    "url",
    "util",
    "v8",
    "vm",
    "wasi",
    "worker_threads",
    "zlib",
];

/// Platform modules that only exist behind the `node:` protocol.
pub const PROTOCOL_ONLY_BUILTIN_MODULES: &[&str] = &["sea", "sqlite", "test", "test/reporters"];

/// Cycle searches deeper than this get a warning, enumeration cost explodes past it.
pub const CIRCULAR_DEPTH_WARNING_THRESHOLD: usize = 50;

/// Extensions to try when resolving files inside `node_modules` (in priority order)
pub const RESOLVE_EXTENSIONS: &[&str] = &["js", "mjs", "cjs", "ts", "tsx", "mts", "cts", "jsx"];

/// Index file names to try when resolving package directories
pub const INDEX_FILES: &[&str] = &[
    "index.js",
    "index.mjs",
    "index.cjs",
    "index.ts",
    "index.tsx",
    "index.mts",
    "index.cts",
    "index.jsx",
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_extensions_are_supported() {
        for ext in DEFAULT_FILE_EXTENSIONS {
            assert!(SUPPORTED_FILE_EXTENSIONS.contains(ext), "'{}' is not supported", ext);
        }
    }

    #[test]
    fn test_extensions_are_dot_prefixed() {
        for ext in SUPPORTED_FILE_EXTENSIONS {
            assert!(ext.starts_with('.'), "'{}' must start with a dot", ext);
        }
    }

    #[test]
    fn test_index_files_cover_resolve_extensions() {
        assert_eq!(INDEX_FILES.len(), RESOLVE_EXTENSIONS.len());
        for ext in RESOLVE_EXTENSIONS {
            let expected = format!("index.{}", ext);
            assert!(INDEX_FILES.contains(&expected.as_str()), "INDEX_FILES missing '{}'", expected);
        }
    }

    #[test]
    fn test_builtin_lists_are_disjoint() {
        for name in PROTOCOL_ONLY_BUILTIN_MODULES {
            assert!(!BUILTIN_MODULES.contains(name));
        }
    }
}
