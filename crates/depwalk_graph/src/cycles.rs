//! Circular dependency detection.
//!
//! Cycles are elementary: no file appears twice in one cycle. Each cycle is
//! reported once, rotated so that it starts at its smallest node id.

use depwalk_core::CIRCULAR_DEPTH_WARNING_THRESHOLD;
use log::{debug, trace, warn};

use crate::graph::DependencyGraph;

/// Logs a warning for depths above the threshold. Returns whether it did.
fn warn_if_expensive(max_depth: Option<usize>) -> bool {
    let Some(depth) = max_depth.filter(|d| *d > CIRCULAR_DEPTH_WARNING_THRESHOLD) else {
        return false;
    };
    warn!(
        "Circular dependency search depth {} is above {}, \
         this can take very long on large graphs",
        depth, CIRCULAR_DEPTH_WARNING_THRESHOLD
    );
    true
}

impl DependencyGraph {
    /// Whether the graph has at least one cycle of at most `max_depth` files.
    pub fn has_circular_dependencies(&self, max_depth: Option<usize>) -> bool {
        match max_depth {
            None => self.has_any_cycle(),
            Some(_) => !self.find_cycles(max_depth, Some(1)).is_empty(),
        }
    }

    /// Every elementary cycle of at most `max_depth` files.
    pub fn find_circular_dependencies(&self, max_depth: Option<usize>) -> Vec<Vec<String>> {
        let cycles = self.find_cycles(max_depth, None);
        debug!("Found {} circular dependencies", cycles.len());
        cycles
    }

    /// Three-colour depth-first search, linear in the graph size.
    fn has_any_cycle(&self) -> bool {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            New,
            Active,
            Done,
        }

        let mut marks = vec![Mark::New; self.len()];
        for start in 0..self.len() {
            if marks[start] != Mark::New {
                continue;
            }
            // (vertex index, next neighbour position)
            let mut stack: Vec<(usize, usize)> = vec![(start, 0)];
            marks[start] = Mark::Active;

            while let Some(frame) = stack.last_mut() {
                let (index, position) = *frame;
                frame.1 += 1;
                let next = self
                    .vertex_at(index)
                    .and_then(|v| v.adjacent_to.get_index(position))
                    .and_then(|id| self.index_of(id));
                match next {
                    Some(n) if marks[n] == Mark::Active => {
                        trace!("Back edge found while checking for cycles");
                        return true;
                    }
                    Some(n) if marks[n] == Mark::New => {
                        marks[n] = Mark::Active;
                        stack.push((n, 0));
                    }
                    Some(_) => {}
                    None => {
                        let exhausted = self
                            .vertex_at(index)
                            .is_none_or(|v| position >= v.adjacent_to.len());
                        if exhausted {
                            marks[index] = Mark::Done;
                            stack.pop();
                        }
                    }
                }
            }
        }
        false
    }

    /// Enumerate elementary cycles, each one rooted at its smallest vertex
    /// and extended only through larger ones.
    fn find_cycles(&self, max_depth: Option<usize>, limit: Option<usize>) -> Vec<Vec<String>> {
        warn_if_expensive(max_depth);
        let max_len = max_depth.unwrap_or(usize::MAX);
        let mut cycles: Vec<Vec<String>> = Vec::new();

        for start in 0..self.len() {
            let mut path: Vec<usize> = vec![start];
            let mut on_path = vec![false; self.len()];
            on_path[start] = true;
            let mut positions: Vec<usize> = vec![0];

            while let Some(&index) = path.last() {
                let depth = path.len() - 1;
                let position = positions[depth];
                positions[depth] += 1;

                let Some(vertex) = self.vertex_at(index) else {
                    break;
                };
                let Some(next_id) = vertex.adjacent_to.get_index(position) else {
                    on_path[index] = false;
                    path.pop();
                    positions.pop();
                    continue;
                };
                let Some(next) = self.index_of(next_id) else {
                    continue;
                };

                if next == start {
                    let cycle: Vec<String> = path
                        .iter()
                        .filter_map(|&i| self.vertex_at(i).map(|v| v.id.clone()))
                        .collect();
                    trace!("Found cycle: {}", cycle.join(" -> "));
                    cycles.push(cycle);
                    if limit.is_some_and(|l| cycles.len() >= l) {
                        return cycles;
                    }
                } else if next > start && !on_path[next] && path.len() < max_len {
                    on_path[next] = true;
                    path.push(next);
                    positions.push(0);
                }
            }
        }
        cycles
    }
}
