mod error;
mod graph;
mod levels;

pub use error::GraphError;
pub use graph::{DependencyGraph, build_graph, topo_sort};
pub use levels::Levels;
