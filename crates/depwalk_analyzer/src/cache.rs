//! Content and configuration digests used to reuse work across runs.

use dashmap::DashMap;
use depwalk_core::{AnalysisConfig, PathAliases, Result};
use depwalk_graph::Vertex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

use crate::workspace::Workspace;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    pub content_hash: String,
    pub configuration_hash: String,
}

pub fn content_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Digest of everything besides file contents that shapes the graph.
pub fn configuration_hash(
    config: &AnalysisConfig,
    aliases: &PathAliases,
    workspace: &Workspace,
) -> Result<String> {
    let mut hasher = Sha256::new();
    hasher.update(serde_json::to_vec(config)?);
    hasher.update(serde_json::to_vec(aliases)?);
    hasher.update(serde_json::to_vec(workspace)?);
    Ok(format!("{:x}", hasher.finalize()))
}

pub fn is_file_affected(content: &str, previous_hash: &str) -> bool {
    content_hash(content) != previous_hash
}

pub fn is_configuration_affected(current_hash: &str, cached_hash: &str) -> bool {
    current_hash != cached_hash
}

/// Cache entries written by concurrent resolution tasks.
#[derive(Debug, Default)]
pub struct CacheStore {
    entries: DashMap<String, CacheEntry>,
}

impl CacheStore {
    pub fn insert(&self, id: impl Into<String>, entry: CacheEntry) {
        self.entries.insert(id.into(), entry);
    }

    pub fn get(&self, id: &str) -> Option<CacheEntry> {
        self.entries.get(id).map(|e| e.value().clone())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn into_map(self) -> BTreeMap<String, CacheEntry> {
        self.entries.into_iter().collect()
    }
}

/// On-disk form of a finished analysis, loaded back to skip unchanged files.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedCache {
    pub configuration_hash: String,
    pub files: BTreeMap<String, CacheEntry>,
    pub fragments: BTreeMap<String, Vertex>,
}

impl PersistedCache {
    pub fn from_json(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
