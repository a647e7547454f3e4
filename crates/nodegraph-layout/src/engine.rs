use crate::{GraphModel, LayoutError, NodeHandle, NodeSizes, PositionMap};

/// A layout engine that can compute positions for graph nodes
///
/// Engines are pure: they read the graph and the node sizes and return a
/// position for every node they placed. Writing the positions back onto the
/// caller's nodes is a separate step, see [`apply_positions`](crate::apply_positions).
///
/// - Layered and tree layouts use the edge direction
/// - Force-directed and grid layouts treat the graph as undirected
pub trait LayoutEngine<N: NodeHandle> {
    /// Compute node positions for the given graph
    ///
    /// An empty graph yields an empty map.
    ///
    /// # Errors
    /// Returns an error if the engine's parameters are invalid
    fn layout<S>(&self, graph: &GraphModel<N>, sizes: &S) -> Result<PositionMap<N>, LayoutError<N>>
    where
        S: NodeSizes<N>;
}
