use crate::LayoutError;
use petgraph::graphmap::DiGraphMap;
use petgraph::visit::{IntoNeighborsDirected, IntoNodeIdentifiers};
use petgraph::Direction;
use std::collections::HashSet;
use std::fmt::Debug;
use std::hash::Hash;

/// Identity of a node owned by the caller
///
/// The engines never own node lifetimes, they only use handles as keys.
/// `Ord` is only used to break ties deterministically.
pub trait NodeHandle: Copy + Ord + Hash + Debug {}

impl<T> NodeHandle for T where T: Copy + Ord + Hash + Debug {}

/// A directed edge, `source` is drawn above or before `target`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Edge<N> {
    pub source: N,
    pub target: N,
    /// Spring weight in the force layout, ignored by the other engines
    pub weight: f32,
}

impl<N> Edge<N> {
    pub fn new(source: N, target: N) -> Self {
        Self {
            source,
            target,
            weight: 1.0,
        }
    }

    pub fn weighted(source: N, target: N, weight: f32) -> Self {
        Self {
            source,
            target,
            weight,
        }
    }
}

impl<N> From<(N, N)> for Edge<N> {
    fn from((source, target): (N, N)) -> Self {
        Self::new(source, target)
    }
}

/// In-memory adjacency structure over caller-supplied node handles
///
/// Parallel edges collapse into one edge carrying the summed weight. Node
/// iteration follows insertion order, which keeps every engine deterministic.
#[derive(Debug, Clone)]
pub struct GraphModel<N: NodeHandle> {
    graph: DiGraphMap<N, f32>,
}

impl<N: NodeHandle> Default for GraphModel<N> {
    fn default() -> Self {
        Self {
            graph: DiGraphMap::new(),
        }
    }
}

impl<N: NodeHandle> GraphModel<N> {
    /// Build a model from a declared node set and edges between those nodes
    ///
    /// # Errors
    /// Returns [`LayoutError::UnknownNode`] if an edge references a node that
    /// is not part of `nodes`
    pub fn build<I, E>(nodes: I, edges: E) -> Result<Self, LayoutError<N>>
    where
        I: IntoIterator<Item = N>,
        E: IntoIterator,
        E::Item: Into<Edge<N>>,
    {
        let mut model = Self::default();
        for node in nodes {
            model.graph.add_node(node);
        }

        for edge in edges {
            let edge = edge.into();
            for node in [edge.source, edge.target] {
                if !model.graph.contains_node(node) {
                    return Err(LayoutError::UnknownNode { node });
                }
            }
            model.insert_edge(edge);
        }

        Ok(model)
    }

    /// Build a model containing exactly the nodes referenced by `edges`
    pub fn from_edges<E>(edges: E) -> Self
    where
        E: IntoIterator,
        E::Item: Into<Edge<N>>,
    {
        let mut model = Self::default();
        for edge in edges {
            model.insert_edge(edge.into());
        }
        model
    }

    /// Build a model from any graph implementing petgraph's visitor traits
    pub fn from_graph<G>(graph: G) -> Self
    where
        G: IntoNodeIdentifiers<NodeId = N> + IntoNeighborsDirected,
    {
        let mut model = Self::default();
        for node in graph.node_identifiers() {
            model.graph.add_node(node);
        }
        for node in graph.node_identifiers() {
            for succ in graph.neighbors_directed(node, Direction::Outgoing) {
                model.insert_edge(Edge::new(node, succ));
            }
        }
        model
    }

    /// Add a node without edges
    pub fn add_node(&mut self, node: N) {
        self.graph.add_node(node);
    }

    fn insert_edge(&mut self, edge: Edge<N>) {
        if let Some(weight) = self.graph.edge_weight_mut(edge.source, edge.target) {
            *weight += edge.weight;
        } else {
            self.graph.add_edge(edge.source, edge.target, edge.weight);
        }
    }

    /// Successors of `node`
    pub fn neighbors_out(&self, node: N) -> impl Iterator<Item = N> + '_ {
        self.graph.neighbors_directed(node, Direction::Outgoing)
    }

    /// Predecessors of `node`
    pub fn neighbors_in(&self, node: N) -> impl Iterator<Item = N> + '_ {
        self.graph.neighbors_directed(node, Direction::Incoming)
    }

    /// Successors and predecessors without duplicates, self excluded
    pub fn neighbors_undirected(&self, node: N) -> Vec<N> {
        let mut seen = HashSet::new();
        self.neighbors_out(node)
            .chain(self.neighbors_in(node))
            .filter(|&other| other != node && seen.insert(other))
            .collect()
    }

    /// All nodes in insertion order
    pub fn all_nodes(&self) -> impl Iterator<Item = N> + '_ {
        self.graph.nodes()
    }

    /// All edges, self-loops included
    pub fn edges(&self) -> impl Iterator<Item = Edge<N>> + '_ {
        self.graph
            .all_edges()
            .map(|(source, target, &weight)| Edge::weighted(source, target, weight))
    }

    pub fn contains_node(&self, node: N) -> bool {
        self.graph.contains_node(node)
    }

    pub fn contains_edge(&self, source: N, target: N) -> bool {
        self.graph.contains_edge(source, target)
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }
}
