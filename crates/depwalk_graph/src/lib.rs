//! Dependency graph storage and queries.
//!
//! [`GraphStore`] is written to concurrently while files are resolved.
//! Once resolution has finished it is turned into a [`DependencyGraph`]
//! snapshot that answers traversal, cycle and leaf queries.

mod cycles;
mod graph;
mod query;
mod store;
mod traversal;

pub use graph::{DependencyGraph, GraphStructure};
pub use query::CollectDepth;
pub use store::{GraphStore, Vertex, VertexBody};
pub use traversal::{Traversal, TraversalOrder};
