use indexmap::{IndexMap, IndexSet};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::store::{Vertex, VertexBody};

/// Immutable snapshot of a dependency graph, ordered by node id.
///
/// All queries run against a snapshot, never against the store that is
/// still being written to.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DependencyGraph {
    vertices: IndexMap<String, Vertex>,
    dependents: HashMap<String, IndexSet<String>>,
}

/// Serializable view of the graph: vertex bodies and adjacency lists.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphStructure {
    pub files: IndexMap<String, VertexBody>,
    pub graph: IndexMap<String, Vec<String>>,
}

impl DependencyGraph {
    pub fn from_vertices(vertices: impl IntoIterator<Item = Vertex>) -> Self {
        let mut vertices: IndexMap<String, Vertex> =
            vertices.into_iter().map(|v| (v.id.clone(), v)).collect();
        vertices.sort_keys();

        let mut dependents: HashMap<String, IndexSet<String>> = HashMap::new();
        for vertex in vertices.values() {
            for target in &vertex.adjacent_to {
                dependents.entry(target.clone()).or_default().insert(vertex.id.clone());
            }
        }

        debug!("Built dependency graph snapshot with {} files", vertices.len());
        Self { vertices, dependents }
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.vertices.contains_key(id)
    }

    pub fn vertex(&self, id: &str) -> Option<&Vertex> {
        self.vertices.get(id)
    }

    pub fn vertices(&self) -> indexmap::map::Values<'_, String, Vertex> {
        self.vertices.values()
    }

    pub fn ids(&self) -> indexmap::map::Keys<'_, String, Vertex> {
        self.vertices.keys()
    }

    pub(crate) fn index_of(&self, id: &str) -> Option<usize> {
        self.vertices.get_index_of(id)
    }

    pub(crate) fn vertex_at(&self, index: usize) -> Option<&Vertex> {
        self.vertices.get_index(index).map(|(_, v)| v)
    }

    /// Direct dependencies of `id`, in declaration order.
    pub fn adjacent(&self, id: &str) -> Option<&IndexSet<String>> {
        self.vertices.get(id).map(|v| &v.adjacent_to)
    }

    /// Files importing `id` directly, in node id order.
    pub fn dependents_of(&self, id: &str) -> Option<&IndexSet<String>> {
        self.dependents.get(id)
    }

    pub fn structure(&self) -> GraphStructure {
        GraphStructure {
            files: self.vertices.iter().map(|(id, v)| (id.clone(), v.body.clone())).collect(),
            graph: self
                .vertices
                .iter()
                .map(|(id, v)| (id.clone(), v.adjacent_to.iter().cloned().collect()))
                .collect(),
        }
    }

    pub fn into_vertices(self) -> impl Iterator<Item = Vertex> {
        self.vertices.into_values()
    }
}
