mod crossings;
mod cycles;
mod dummies;
mod layers;
mod positions;

use crate::{
    Forest, GraphModel, LayoutEngine, LayoutError, LayoutParameters, NodeHandle, NodeSizes, Point,
    PositionMap,
};
use std::collections::HashMap;
use tracing::debug;

use crossings::minimize_crossings;
use cycles::remove_cycles;
use dummies::insert_dummies;
use layers::assign_layers;
use positions::assign_coordinates;

/// Sugiyama-style layered layout for directed graphs, cycles allowed
///
/// Runs five phases in order: cycle removal, layer assignment, dummy node
/// insertion, crossing minimization and coordinate assignment. Layer `0` is
/// at the top; edges point downward once back edges have been reversed.
#[derive(Debug, Clone, Default)]
pub struct LayeredLayout {
    pub params: LayoutParameters,
}

impl LayeredLayout {
    /// Create a new layered layout with the given parameters
    pub fn new(params: LayoutParameters) -> Self {
        Self { params }
    }
}

/// Node of the layered working graph
///
/// Either wraps an original node or is a dummy standing for one hop of an
/// edge spanning several layers.
#[derive(Debug, Clone)]
pub struct LayeredNode<N> {
    handle: Option<N>,
    pub(crate) layer: usize,
    pub(crate) order: usize,
    pub(crate) incoming: Vec<usize>,
    pub(crate) outgoing: Vec<usize>,
}

impl<N: Copy> LayeredNode<N> {
    pub(crate) fn original(handle: N) -> Self {
        Self {
            handle: Some(handle),
            layer: 0,
            order: 0,
            incoming: Vec::new(),
            outgoing: Vec::new(),
        }
    }

    pub(crate) fn dummy(layer: usize) -> Self {
        Self {
            handle: None,
            layer,
            order: 0,
            incoming: Vec::new(),
            outgoing: Vec::new(),
        }
    }

    /// The original node, `None` for dummies
    pub fn handle(&self) -> Option<N> {
        self.handle
    }

    pub fn is_dummy(&self) -> bool {
        self.handle.is_none()
    }

    pub fn layer(&self) -> usize {
        self.layer
    }

    /// Position within the layer
    pub fn order(&self) -> usize {
        self.order
    }

    /// Arena indices of the neighbours on the layer above
    pub fn incoming(&self) -> &[usize] {
        &self.incoming
    }

    /// Arena indices of the neighbours on the layer below
    pub fn outgoing(&self) -> &[usize] {
        &self.outgoing
    }
}

/// Path of one original edge through the working graph
#[derive(Debug, Clone)]
pub(crate) struct EdgeChain<N> {
    pub source: N,
    pub target: N,
    pub reversed: bool,
    /// Arena indices from the upper endpoint to the lower one
    pub path: Vec<usize>,
}

/// Polyline of an original edge, from its source to its target
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeRoute<N> {
    pub source: N,
    pub target: N,
    /// The edge was reversed to break a cycle and points upward
    pub reversed: bool,
    /// Node centers and dummy positions along the edge, endpoints included
    pub points: Vec<Point>,
}

/// Layer structure that can be cached and reused
#[derive(Debug, Clone)]
pub struct Layers<N: NodeHandle> {
    /// Arena of original and dummy nodes
    pub(crate) nodes: Vec<LayeredNode<N>>,

    pub(crate) index: HashMap<N, usize>,

    pub(crate) chains: Vec<EdgeChain<N>>,

    /// Arena indices organized into layers, in final order
    pub layers: Vec<Vec<usize>>,

    /// Number of edge crossings (quality metric)
    pub crossings: usize,
}

impl<N: NodeHandle> Layers<N> {
    pub fn node(&self, index: usize) -> &LayeredNode<N> {
        &self.nodes[index]
    }

    pub fn nodes(&self) -> &[LayeredNode<N>] {
        &self.nodes
    }

    /// Layer of an original node
    pub fn layer_of(&self, handle: N) -> Option<usize> {
        self.index.get(&handle).map(|&i| self.nodes[i].layer)
    }

    /// Position of an original node within its layer
    pub fn order_of(&self, handle: N) -> Option<usize> {
        self.index.get(&handle).map(|&i| self.nodes[i].order)
    }

    pub fn dummy_count(&self) -> usize {
        self.nodes.iter().filter(|node| node.is_dummy()).count()
    }

    /// Original edges that were reversed to break cycles, in their original
    /// direction
    pub fn reversed_edges(&self) -> Vec<(N, N)> {
        self.chains
            .iter()
            .filter(|chain| chain.reversed)
            .map(|chain| (chain.source, chain.target))
            .collect()
    }

    /// Original edges after cycle removal, each as (upper, lower) handles
    pub fn acyclic_edges(&self) -> impl Iterator<Item = (N, N)> + '_ {
        self.chains.iter().map(|chain| {
            if chain.reversed {
                (chain.target, chain.source)
            } else {
                (chain.source, chain.target)
            }
        })
    }

    /// Arena indices of the dummy nodes an original edge passes through
    pub fn dummies_of(&self, source: N, target: N) -> Option<Vec<usize>> {
        self.chains
            .iter()
            .find(|chain| chain.source == source && chain.target == target)
            .map(|chain| chain.path[1..chain.path.len() - 1].to_vec())
    }

    /// Working graph edges as arena index pairs; each spans one layer
    pub fn edges(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .flat_map(|(i, node)| node.outgoing.iter().map(move |&next| (i, next)))
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl LayeredLayout {
    /// Compute layer structure (expensive, cache this)
    ///
    /// This phase removes cycles, assigns layers, inserts dummy nodes and
    /// minimizes edge crossings. It only depends on the graph structure, not
    /// on node sizes.
    ///
    /// # Errors
    /// Returns an error if the parameters are invalid
    pub fn compute_layers<N>(&self, graph: &GraphModel<N>) -> Result<Layers<N>, LayoutError<N>>
    where
        N: NodeHandle,
    {
        self.params.validate()?;

        // DFS from the forest roots, so edges pointing back toward a root are
        // the ones reversed
        let forest = Forest::from_model(graph);
        let working = remove_cycles(graph, &forest.root_handles());

        let mut nodes: Vec<LayeredNode<N>> = graph.all_nodes().map(LayeredNode::original).collect();
        let index: HashMap<N, usize> = graph.all_nodes().enumerate().map(|(i, n)| (n, i)).collect();

        let edges: Vec<(usize, usize)> = working
            .iter()
            .filter_map(|edge| Some((*index.get(&edge.source)?, *index.get(&edge.target)?)))
            .collect();
        let layer_of = assign_layers(nodes.len(), &edges);
        for (node, layer) in nodes.iter_mut().zip(layer_of) {
            node.layer = layer;
        }

        let original_count = nodes.len();
        let chains = insert_dummies(&mut nodes, &working, &index);

        // Start from the forest's pre-order; a dummy inherits the rank of the
        // node above it
        let mut rank = vec![usize::MAX; nodes.len()];
        for (position, id) in forest.preorder().into_iter().enumerate() {
            rank[id.index()] = position;
        }
        for i in original_count..nodes.len() {
            if let Some(&above) = nodes[i].incoming.first() {
                rank[i] = rank[above];
            }
        }

        let layer_count = nodes.iter().map(|node| node.layer + 1).max().unwrap_or(0);
        let mut layers = vec![Vec::new(); layer_count];
        for (i, node) in nodes.iter().enumerate() {
            layers[node.layer].push(i);
        }
        for layer in &mut layers {
            layer.sort_by_key(|&i| (rank[i], i));
        }

        let (layers, crossings) =
            minimize_crossings(&nodes, layers, self.params.max_crossing_iterations);
        for layer in &layers {
            for (order, &i) in layer.iter().enumerate() {
                nodes[i].order = order;
            }
        }

        debug!(
            "Layered {} nodes into {} layers with {} dummies, {} reversed edges, {} crossings",
            original_count,
            layers.len(),
            nodes.len() - original_count,
            working.iter().filter(|edge| edge.reversed).count(),
            crossings
        );

        Ok(Layers {
            nodes,
            index,
            chains,
            layers,
            crossings,
        })
    }

    /// Compute positions from cached layers (cheap, rerun when sizes change)
    ///
    /// Only original nodes are returned, dummy positions are available
    /// through [`LayeredLayout::compute_edge_routes`].
    pub fn compute_positions<N, S>(&self, layers: &Layers<N>, sizes: &S) -> PositionMap<N>
    where
        N: NodeHandle,
        S: NodeSizes<N>,
    {
        let points = assign_coordinates(layers, sizes, &self.params);
        layers
            .nodes
            .iter()
            .zip(points)
            .filter_map(|(node, point)| node.handle().map(|handle| (handle, point)))
            .collect()
    }

    /// Polylines of every original edge through its dummy nodes
    pub fn compute_edge_routes<N, S>(&self, layers: &Layers<N>, sizes: &S) -> Vec<EdgeRoute<N>>
    where
        N: NodeHandle,
        S: NodeSizes<N>,
    {
        let points = assign_coordinates(layers, sizes, &self.params);
        layers
            .chains
            .iter()
            .map(|chain| {
                let mut route: Vec<Point> = chain.path.iter().map(|&i| points[i]).collect();
                if chain.reversed {
                    route.reverse();
                }
                EdgeRoute {
                    source: chain.source,
                    target: chain.target,
                    reversed: chain.reversed,
                    points: route,
                }
            })
            .collect()
    }
}

impl<N: NodeHandle> LayoutEngine<N> for LayeredLayout {
    fn layout<S>(&self, graph: &GraphModel<N>, sizes: &S) -> Result<PositionMap<N>, LayoutError<N>>
    where
        S: NodeSizes<N>,
    {
        if graph.node_count() < 2 {
            self.params.validate()?;
            debug!("Nothing to lay out for {} nodes", graph.node_count());
            return Ok(PositionMap::new());
        }

        let layers = self.compute_layers(graph)?;
        Ok(self.compute_positions(&layers, sizes))
    }
}

/// Run the layered layout with the given parameters
///
/// # Errors
/// Returns an error if the parameters are invalid
pub fn layered_layout<N, S>(
    graph: &GraphModel<N>,
    sizes: &S,
    params: &LayoutParameters,
) -> Result<PositionMap<N>, LayoutError<N>>
where
    N: NodeHandle,
    S: NodeSizes<N>,
{
    LayeredLayout::new(params.clone()).layout(graph, sizes)
}
