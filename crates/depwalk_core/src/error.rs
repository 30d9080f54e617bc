use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while building or querying a dependency graph.
///
/// Per-declaration and per-manifest failures (`ModuleNotFound`,
/// `ManifestParse`, most `ManifestRead`) are recovered where they happen and
/// only logged. Run-level failures abort the analysis.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Module '{specifier}' imported from {from} could not be resolved")]
    ModuleNotFound { specifier: String, from: String },

    #[error("Entrypoint {0} not found")]
    EntrypointNotFound(PathBuf),

    #[error("Failed to read manifest {path}: {reason}")]
    ManifestRead { path: PathBuf, reason: String },

    #[error("Failed to parse manifest {path}: {reason}")]
    ManifestParse { path: PathBuf, reason: String },

    #[error("No package.json found, searched {searched:?}")]
    ManifestNotFound { searched: Vec<PathBuf> },

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Analysis was cancelled before completion")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Whether the error must abort an analysis run instead of being logged.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::EntrypointNotFound(_)
                | Error::InvalidConfiguration(_)
                | Error::ManifestNotFound { .. }
                | Error::Cancelled
        )
    }
}
