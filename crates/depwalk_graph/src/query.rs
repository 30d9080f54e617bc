use indexmap::IndexSet;
use log::debug;

use crate::graph::DependencyGraph;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CollectDepth {
    /// Immediate neighbours only.
    #[default]
    Shallow,
    /// Everything reachable. The file itself is only part of the result when
    /// it reaches itself through a cycle.
    Deep,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Dependencies,
    Dependents,
}

impl DependencyGraph {
    /// Files `id` imports.
    pub fn collect_dependencies(&self, id: &str, depth: CollectDepth) -> IndexSet<String> {
        self.collect(id, depth, Direction::Dependencies)
    }

    /// Files importing `id`.
    pub fn collect_dependents(&self, id: &str, depth: CollectDepth) -> IndexSet<String> {
        self.collect(id, depth, Direction::Dependents)
    }

    fn neighbours(&self, id: &str, direction: Direction) -> Option<&IndexSet<String>> {
        match direction {
            Direction::Dependencies => self.adjacent(id),
            Direction::Dependents => self.dependents_of(id),
        }
    }

    fn collect(&self, id: &str, depth: CollectDepth, direction: Direction) -> IndexSet<String> {
        let Some(direct) = self.neighbours(id, direction) else {
            return IndexSet::new();
        };
        if depth == CollectDepth::Shallow {
            return direct.clone();
        }

        let mut collected: IndexSet<String> = IndexSet::new();
        let mut stack: Vec<&str> = direct.iter().rev().map(String::as_str).collect();
        while let Some(current) = stack.pop() {
            if !collected.insert(current.to_string()) {
                continue;
            }
            if let Some(next) = self.neighbours(current, direction) {
                let unvisited = next.iter().rev().map(String::as_str);
                stack.extend(unvisited.filter(|n| !collected.contains(*n)));
            }
        }
        collected
    }

    /// Files without outgoing edges.
    pub fn find_leaves(&self) -> Vec<String> {
        self.vertices().filter(|v| v.adjacent_to.is_empty()).map(|v| v.id.clone()).collect()
    }

    /// Leaves that no file depends on, directly or transitively.
    pub fn collect_unused_files(&self) -> Vec<String> {
        let unused: Vec<String> = self
            .find_leaves()
            .into_iter()
            .filter(|id| self.collect_dependents(id, CollectDepth::Deep).is_empty())
            .collect();
        debug!("Found {} unused files", unused.len());
        unused
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::GraphStore;

    fn graph(edges: &[(&str, &str)], isolated: &[&str]) -> DependencyGraph {
        let store = GraphStore::new();
        for (from, to) in edges {
            store.add_edge(from, to);
        }
        for id in isolated {
            store.add_vertex(id, Default::default());
        }
        store.freeze()
    }

    fn sorted(set: IndexSet<String>) -> Vec<String> {
        let mut v: Vec<String> = set.into_iter().collect();
        v.sort();
        v
    }

    #[test]
    fn test_shallow_and_deep_dependencies() {
        let g = graph(&[("index", "a"), ("a", "b"), ("b", "c")], &[]);
        assert_eq!(sorted(g.collect_dependencies("index", CollectDepth::Shallow)), vec!["a"]);
        let deep = sorted(g.collect_dependencies("index", CollectDepth::Deep));
        assert_eq!(deep, vec!["a", "b", "c"]);
        assert!(g.collect_dependencies("c", CollectDepth::Deep).is_empty());
        assert!(g.collect_dependencies("missing", CollectDepth::Deep).is_empty());
    }

    #[test]
    fn test_shallow_and_deep_dependents() {
        let g = graph(&[("index", "a"), ("a", "b"), ("other", "b")], &[]);
        assert_eq!(sorted(g.collect_dependents("b", CollectDepth::Shallow)), vec!["a", "other"]);
        let deep = sorted(g.collect_dependents("b", CollectDepth::Deep));
        assert_eq!(deep, vec!["a", "index", "other"]);
        assert!(g.collect_dependents("index", CollectDepth::Deep).is_empty());
    }

    #[test]
    fn test_deep_collection_in_cycle_includes_self() {
        let g = graph(&[("a", "b"), ("b", "a")], &[]);
        assert_eq!(sorted(g.collect_dependencies("a", CollectDepth::Deep)), vec!["a", "b"]);
    }

    #[test]
    fn test_deep_collection_has_no_duplicates() {
        let g = graph(&[("a", "b"), ("a", "c"), ("b", "d"), ("c", "d")], &[]);
        let deep = g.collect_dependencies("a", CollectDepth::Deep);
        assert_eq!(deep.len(), 3);
    }

    #[test]
    fn test_find_leaves() {
        let g = graph(&[("index", "a"), ("index", "b"), ("a", "a")], &["lonely"]);
        assert_eq!(g.find_leaves(), vec!["b", "lonely"]);
    }

    #[test]
    fn test_unused_files() {
        let g = graph(&[("index", "used")], &["orphan"]);
        let unused = g.collect_unused_files();
        assert!(unused.contains(&"orphan".to_string()));
        assert!(!unused.contains(&"used".to_string()));
        // index has an outgoing edge, so it is not a leaf
        assert!(!unused.contains(&"index".to_string()));
    }
}
