use log::trace;
use std::collections::{HashSet, VecDeque};

use crate::{graph::DependencyGraph, store::Vertex};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TraversalOrder {
    /// Shallow-first: every dependency of a file before their own dependencies.
    #[default]
    BreadthFirst,
    /// Deep-first: one import chain to its end before the next.
    DepthFirst,
}

/// Lazy walk over a graph snapshot that yields each vertex at most once.
///
/// Without a root every vertex is eventually visited, components are
/// started in node id order.
#[derive(Debug, Clone)]
pub struct Traversal<'g> {
    graph: &'g DependencyGraph,
    order: TraversalOrder,
    root: Option<&'g str>,
    pending: VecDeque<&'g str>,
    visited: HashSet<&'g str>,
    next_seed: usize,
}

impl<'g> Traversal<'g> {
    pub fn new(graph: &'g DependencyGraph, order: TraversalOrder, root: Option<&str>) -> Self {
        // Borrow the root id from the graph so the iterator only depends on 'g.
        let root = root.map(|r| graph.vertex(r).map(|v| v.id.as_str()).unwrap_or(""));
        let mut traversal = Self {
            graph,
            order,
            root,
            pending: VecDeque::new(),
            visited: HashSet::new(),
            next_seed: 0,
        };
        traversal.restart();
        traversal
    }

    /// Start over from the beginning, forgetting every visited vertex.
    pub fn restart(&mut self) {
        self.pending.clear();
        self.visited.clear();
        self.next_seed = 0;
        if let Some(root) = self.root
            && self.graph.contains(root)
        {
            self.pending.push_back(root);
        }
    }

    fn pop(&mut self) -> Option<&'g str> {
        match self.order {
            TraversalOrder::BreadthFirst => self.pending.pop_front(),
            TraversalOrder::DepthFirst => self.pending.pop_back(),
        }
    }

    fn next_unvisited_seed(&mut self) -> Option<&'g str> {
        if self.root.is_some() {
            return None;
        }
        while let Some(vertex) = self.graph.vertex_at(self.next_seed) {
            self.next_seed += 1;
            if !self.visited.contains(vertex.id.as_str()) {
                return Some(vertex.id.as_str());
            }
        }
        None
    }
}

impl<'g> Iterator for Traversal<'g> {
    type Item = &'g Vertex;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let id = match self.pop() {
                Some(id) => id,
                None => self.next_unvisited_seed()?,
            };
            if !self.visited.insert(id) {
                continue;
            }
            let graph = self.graph;
            let Some(vertex) = graph.vertex(id) else {
                continue;
            };
            trace!("Traversal visiting {}", id);

            let unvisited = vertex
                .adjacent_to
                .iter()
                .map(String::as_str)
                .filter(|n| !self.visited.contains(n));
            match self.order {
                TraversalOrder::BreadthFirst => self.pending.extend(unvisited),
                // Reversed so the first declared dependency is popped first.
                TraversalOrder::DepthFirst => {
                    let mut neighbours: Vec<&'g str> = unvisited.collect();
                    neighbours.reverse();
                    self.pending.extend(neighbours);
                }
            }
            return Some(vertex);
        }
    }
}

impl DependencyGraph {
    /// Traverse the whole graph, or only what `root` reaches.
    pub fn traverse<'g>(&'g self, order: TraversalOrder, root: Option<&str>) -> Traversal<'g> {
        Traversal::new(self, order, root)
    }
}
