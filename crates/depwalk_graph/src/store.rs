//! Concurrent graph store written to while resolution tasks are in flight.

use dashmap::DashMap;
use indexmap::IndexSet;
use log::trace;
use serde::{Deserialize, Serialize};
use std::mem;

use crate::graph::DependencyGraph;

/// Metadata attached to a file vertex.
///
/// Every field merges as a union, so merging the same body twice is the same
/// as merging it once and concurrent merges converge in any order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VertexBody {
    pub size: u64,
    pub third_party_dependencies: IndexSet<String>,
    pub builtin_dependencies: IndexSet<String>,
    /// Fields contributed by custom resolvers.
    #[serde(flatten)]
    pub custom: serde_json::Map<String, serde_json::Value>,
}

impl VertexBody {
    pub fn with_size(mut self, size: u64) -> Self {
        self.size = size;
        self
    }

    pub fn with_third_party(mut self, package: impl Into<String>) -> Self {
        self.third_party_dependencies.insert(package.into());
        self
    }

    pub fn with_builtin(mut self, module: impl Into<String>) -> Self {
        self.builtin_dependencies.insert(module.into());
        self
    }

    pub fn with_custom(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.custom.insert(key.into(), value);
        self
    }

    /// Union of both bodies. A non-zero `size` in `other` wins.
    pub fn merge(mut self, other: VertexBody) -> Self {
        if other.size != 0 {
            self.size = other.size;
        }
        self.third_party_dependencies.extend(other.third_party_dependencies);
        self.builtin_dependencies.extend(other.builtin_dependencies);
        self.custom.extend(other.custom);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vertex {
    pub id: String,
    pub adjacent_to: IndexSet<String>,
    pub body: VertexBody,
}

impl Vertex {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into(), adjacent_to: IndexSet::new(), body: VertexBody::default() }
    }

    pub fn with_body(mut self, body: VertexBody) -> Self {
        self.body = body;
        self
    }

    pub fn with_edge(mut self, to: impl Into<String>) -> Self {
        self.adjacent_to.insert(to.into());
        self
    }
}

/// Graph under construction, keyed by node id.
///
/// Callers only ever hold ids; no reference into the map escapes a method.
#[derive(Debug, Default)]
pub struct GraphStore {
    vertices: DashMap<String, Vertex>,
}

impl GraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a vertex, merging `body` into it when it already exists.
    pub fn add_vertex(&self, id: &str, body: VertexBody) {
        let mut entry = self.vertices.entry(id.to_string()).or_insert_with(|| Vertex::new(id));
        let current = mem::take(&mut entry.body);
        entry.body = current.merge(body);
    }

    /// Put `vertex` in place of any existing vertex with the same id.
    pub fn insert_vertex(&self, vertex: Vertex) {
        self.vertices.insert(vertex.id.clone(), vertex);
    }

    /// Add the edge `from -> to`, creating missing endpoints. Self-edges are kept.
    pub fn add_edge(&self, from: &str, to: &str) {
        // Separate statements: no shard lock is held across the two lookups.
        self.vertices.entry(to.to_string()).or_insert_with(|| Vertex::new(to));
        let inserted = self
            .vertices
            .entry(from.to_string())
            .or_insert_with(|| Vertex::new(from))
            .adjacent_to
            .insert(to.to_string());
        if inserted {
            trace!("Added edge {} -> {}", from, to);
        }
    }

    /// Replace the body of `id` with `transform(body)`, creating the vertex first if needed.
    pub fn merge_body(&self, id: &str, transform: impl FnOnce(VertexBody) -> VertexBody) {
        let mut entry = self.vertices.entry(id.to_string()).or_insert_with(|| Vertex::new(id));
        let current = mem::take(&mut entry.body);
        entry.body = transform(current);
    }

    pub fn contains(&self, id: &str) -> bool {
        self.vertices.contains_key(id)
    }

    pub fn vertex(&self, id: &str) -> Option<Vertex> {
        self.vertices.get(id).map(|v| v.value().clone())
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Copy the current contents into an immutable snapshot.
    pub fn snapshot(&self) -> DependencyGraph {
        DependencyGraph::from_vertices(self.vertices.iter().map(|v| v.value().clone()))
    }

    pub fn freeze(self) -> DependencyGraph {
        DependencyGraph::from_vertices(self.vertices.into_iter().map(|(_, v)| v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rayon::prelude::*;

    #[test]
    fn test_merge_is_idempotent() {
        let store = GraphStore::new();
        store.add_vertex("index.js", VertexBody::default().with_size(10));
        for _ in 0..2 {
            store.merge_body("index.js", |body| {
                body.with_third_party("meriyah").with_builtin("fs")
            });
        }
        let body = store.vertex("index.js").unwrap().body;
        assert_eq!(body.size, 10);
        assert_eq!(body.third_party_dependencies.iter().collect::<Vec<_>>(), vec!["meriyah"]);
        assert_eq!(body.builtin_dependencies.iter().collect::<Vec<_>>(), vec!["fs"]);
    }

    #[test]
    fn test_add_vertex_merges() {
        let store = GraphStore::new();
        store.add_vertex("a.js", VertexBody::default().with_third_party("react"));
        store.add_vertex("a.js", VertexBody::default().with_size(3).with_third_party("vue"));
        let body = store.vertex("a.js").unwrap().body;
        assert_eq!(body.size, 3);
        assert_eq!(body.third_party_dependencies.len(), 2);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_add_edge_creates_endpoints_and_dedups() {
        let store = GraphStore::new();
        store.add_edge("a.js", "b.js");
        store.add_edge("a.js", "b.js");
        assert!(store.contains("a.js"));
        assert!(store.contains("b.js"));
        assert_eq!(store.vertex("a.js").unwrap().adjacent_to.len(), 1);
        assert!(store.vertex("b.js").unwrap().adjacent_to.is_empty());
    }

    #[test]
    fn test_self_edge_is_kept() {
        let store = GraphStore::new();
        store.add_edge("a.js", "a.js");
        let vertex = store.vertex("a.js").unwrap();
        assert!(vertex.adjacent_to.contains("a.js"));
    }

    #[test]
    fn test_custom_fields_flatten() {
        let body =
            VertexBody::default().with_size(1).with_custom("framework", serde_json::json!("vue"));
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["framework"], "vue");
        assert_eq!(json["thirdPartyDependencies"], serde_json::json!([]));
        let back: VertexBody = serde_json::from_value(json).unwrap();
        assert_eq!(back, body);
    }

    #[test]
    fn test_concurrent_merges_converge() {
        let store = GraphStore::new();
        let packages: Vec<String> = (0..64).map(|i| format!("pkg-{}", i % 8)).collect();
        packages.par_iter().enumerate().for_each(|(i, pkg)| {
            store.merge_body("index.js", |body| body.with_third_party(pkg.clone()));
            store.add_edge("index.js", &format!("file-{}.js", i % 4));
        });
        let vertex = store.vertex("index.js").unwrap();
        assert_eq!(vertex.body.third_party_dependencies.len(), 8);
        assert_eq!(vertex.adjacent_to.len(), 4);
        assert_eq!(store.len(), 5);
    }
}
