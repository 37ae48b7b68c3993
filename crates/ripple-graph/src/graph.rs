//! Dependency graph construction and topological leveling
//!
//! Builds a directed graph of internal workspace dependencies. Edges point
//! from a package to each dependency it declares, so a package becomes ready
//! once every outgoing edge leads to something already placed.

use std::collections::{HashMap, HashSet};

use petgraph::Direction;
use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use ripple_core::Package;
use tracing::debug;

use crate::error::GraphError;
use crate::levels::Levels;

/// Dependency graph for workspace packages
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    graph: DiGraph<String, ()>,
    node_map: HashMap<String, NodeIndex>,
}

impl DependencyGraph {
    /// Build the graph from each package's declared internal dependencies.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::DuplicatePackage`] if two packages share a name and
    /// [`GraphError::UnknownDependency`] if a package lists an internal
    /// dependency that is not part of the package set.
    pub fn build(packages: &[Package]) -> Result<Self, GraphError> {
        let mut graph = DiGraph::with_capacity(packages.len(), packages.len());
        let mut node_map = HashMap::with_capacity(packages.len());

        for package in packages {
            if node_map.contains_key(&package.name) {
                return Err(GraphError::DuplicatePackage(package.name.clone()));
            }
            let idx = graph.add_node(package.name.clone());
            node_map.insert(package.name.clone(), idx);
        }

        for package in packages {
            let from = node_map[&package.name];
            for dep in &package.internal_dependencies {
                let to = node_map
                    .get(dep)
                    .copied()
                    .ok_or_else(|| GraphError::UnknownDependency {
                        package: package.name.clone(),
                        dependency: dep.clone(),
                    })?;
                graph.update_edge(from, to, ());
            }
        }

        Ok(Self { graph, node_map })
    }

    /// Partition the packages into levels.
    ///
    /// Each round takes every package whose dependencies have all been placed
    /// in earlier rounds. Packages inside a level are sorted by name.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::Cycle`] naming the packages of a dependency cycle.
    /// No partial leveling is returned in that case.
    pub fn levels(&self) -> Result<Levels, GraphError> {
        let mut remaining: HashMap<NodeIndex, usize> = self
            .graph
            .node_indices()
            .map(|idx| {
                let pending = self
                    .graph
                    .neighbors_directed(idx, Direction::Outgoing)
                    .count();
                (idx, pending)
            })
            .collect();

        let mut levels = Vec::new();

        while !remaining.is_empty() {
            let mut ready: Vec<NodeIndex> = remaining
                .iter()
                .filter(|&(_, &count)| count == 0)
                .map(|(&idx, _)| idx)
                .collect();

            if ready.is_empty() {
                let stuck: HashSet<NodeIndex> = remaining.keys().copied().collect();
                return Err(GraphError::Cycle {
                    participants: self.cycle_participants(&stuck),
                });
            }

            ready.sort_by(|a, b| self.graph[*a].cmp(&self.graph[*b]));

            for idx in &ready {
                remaining.remove(idx);
                for dependent in self.graph.neighbors_directed(*idx, Direction::Incoming) {
                    if let Some(count) = remaining.get_mut(&dependent) {
                        *count -= 1;
                    }
                }
            }

            let level: Vec<String> = ready.iter().map(|idx| self.graph[*idx].clone()).collect();
            debug!(level = levels.len(), packages = ?level, "resolved dependency level");
            levels.push(level);
        }

        Ok(Levels::new(levels))
    }

    /// Check if graph has cycles (circular dependencies)
    #[must_use]
    pub fn has_cycles(&self) -> bool {
        self.levels().is_err()
    }

    /// Internal dependencies declared by `name`, sorted.
    #[must_use]
    pub fn dependencies_of(&self, name: &str) -> Option<Vec<String>> {
        self.neighbors(name, Direction::Outgoing)
    }

    /// Packages that declare `name` as an internal dependency, sorted.
    #[must_use]
    pub fn dependents_of(&self, name: &str) -> Option<Vec<String>> {
        self.neighbors(name, Direction::Incoming)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.node_map.contains_key(name)
    }

    /// Get number of packages in graph
    #[must_use]
    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    /// Check if graph is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    fn neighbors(&self, name: &str, direction: Direction) -> Option<Vec<String>> {
        let idx = self.node_map.get(name)?;
        let mut names: Vec<String> = self
            .graph
            .neighbors_directed(*idx, direction)
            .map(|n| self.graph[n].clone())
            .collect();
        names.sort();
        Some(names)
    }

    /// Names of the packages on the first cycle (by name order) among `stuck`.
    fn cycle_participants(&self, stuck: &HashSet<NodeIndex>) -> Vec<String> {
        let mut cycles: Vec<Vec<String>> = tarjan_scc(&self.graph)
            .into_iter()
            .filter(|scc| scc.iter().all(|idx| stuck.contains(idx)))
            .filter(|scc| scc.len() > 1 || self.graph.contains_edge(scc[0], scc[0]))
            .map(|scc| {
                let mut names: Vec<String> =
                    scc.into_iter().map(|idx| self.graph[idx].clone()).collect();
                names.sort();
                names
            })
            .collect();
        cycles.sort();

        cycles.into_iter().next().unwrap_or_else(|| {
            let mut names: Vec<String> = stuck.iter().map(|idx| self.graph[*idx].clone()).collect();
            names.sort();
            names
        })
    }
}

/// Builds a [`DependencyGraph`] from the package set.
///
/// # Errors
///
/// See [`DependencyGraph::build`].
pub fn build_graph(packages: &[Package]) -> Result<DependencyGraph, GraphError> {
    DependencyGraph::build(packages)
}

/// Computes the minimal topological levels of `graph`.
///
/// # Errors
///
/// See [`DependencyGraph::levels`].
pub fn topo_sort(graph: &DependencyGraph) -> Result<Levels, GraphError> {
    graph.levels()
}
