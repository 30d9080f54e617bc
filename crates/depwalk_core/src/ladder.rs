//! The module resolution ladder for relative specifiers.
//!
//! Candidates are tried in a fixed order and the first existing file wins.
//! TypeScript sources come before JavaScript so that a `lib.ts` next to its
//! compiled `lib.js` is always the one picked.

use log::trace;
use std::{
    ffi::OsString,
    path::{Path, PathBuf},
};

use crate::paths::has_extension;

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut raw: OsString = path.as_os_str().to_owned();
    raw.push(suffix);
    PathBuf::from(raw)
}

/// Every candidate for `raw`, in the order they are tried.
pub fn ladder_candidates(raw: &Path) -> Vec<PathBuf> {
    let mut candidates = vec![
        raw.join("index.js"),
        with_suffix(raw, ".ts"),
        raw.join("index.ts"),
    ];
    // import "./lib.js" written against a lib.ts on disk
    if raw.extension().is_some() {
        candidates.push(raw.with_extension("ts"));
    }
    candidates.extend([
        with_suffix(raw, ".js"),
        with_suffix(raw, ".tsx"),
        with_suffix(raw, ".jsx"),
        raw.join("index.js"),
    ]);
    candidates
}

/// Resolve the absolute, not yet checked path `raw` to an existing file.
///
/// A path that already carries one of `extensions` and exists is returned
/// as is, without walking the ladder.
pub fn resolve_with_ladder(
    raw: &Path,
    extensions: &[String],
    exists: impl Fn(&Path) -> bool,
) -> Option<PathBuf> {
    if has_extension(raw, extensions) && exists(raw) {
        trace!("Resolved {} directly", raw.display());
        return Some(raw.to_path_buf());
    }
    let resolved = ladder_candidates(raw).into_iter().find(|candidate| {
        let hit = exists(candidate);
        trace!("Trying {} -> {}", candidate.display(), hit);
        hit
    });
    if resolved.is_none() {
        trace!("Resolution ladder exhausted for {}", raw.display());
    }
    resolved
}
