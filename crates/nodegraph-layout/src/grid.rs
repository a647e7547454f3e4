//! Grid and radial placements
//!
//! Both layouts walk the forest in pre-order so nodes of the same tree end
//! up next to each other, then place them without any optimization.

use crate::sizes::sanitized_size;
use crate::{
    Forest, GraphModel, LayoutEngine, LayoutError, LayoutParameters, NodeHandle, NodeSizes,
    ParameterError, Point, PositionMap, Vec2,
};
use std::collections::VecDeque;
use std::f32::consts::TAU;
use tracing::debug;

/// Row-major placement on cells sized after the largest node
#[derive(Debug, Clone, Default)]
pub struct GridLayout {
    pub params: LayoutParameters,
    /// Cells per row, `None` for a square-ish grid
    pub columns: Option<usize>,
}

impl GridLayout {
    pub fn new(params: LayoutParameters) -> Self {
        Self {
            params,
            columns: None,
        }
    }

    pub fn with_columns(mut self, columns: usize) -> Self {
        self.columns = Some(columns);
        self
    }

    fn column_count(&self, node_count: usize) -> usize {
        self.columns
            .unwrap_or_else(|| (node_count as f32).sqrt().ceil() as usize)
            .max(1)
    }
}

impl<N: NodeHandle> LayoutEngine<N> for GridLayout {
    fn layout<S>(&self, graph: &GraphModel<N>, sizes: &S) -> Result<PositionMap<N>, LayoutError<N>>
    where
        S: NodeSizes<N>,
    {
        self.params.validate()?;
        if self.columns == Some(0) {
            return Err(ParameterError {
                name: "columns",
                reason: "expected at least one column".to_string(),
            }
            .into());
        }
        if graph.node_count() < 2 {
            return Ok(PositionMap::new());
        }

        let forest = Forest::from_model(graph);
        let order: Vec<N> = forest
            .preorder()
            .into_iter()
            .map(|id| forest.get(id).handle())
            .collect();

        let largest = order
            .iter()
            .fold(Vec2::zero(), |largest, &node| largest.max(sanitized_size(sizes, node)));
        let cell = largest + Vec2::new(self.params.node_spacing, self.params.layer_spacing);
        let columns = self.column_count(order.len());

        debug!(
            "Grid of {} nodes in {columns} columns, cell {:?}",
            order.len(),
            cell
        );

        Ok(order
            .into_iter()
            .enumerate()
            .map(|(i, node)| {
                let (row, column) = (i / columns, i % columns);
                (node, Point::new(column as f32 * cell.x, row as f32 * cell.y))
            })
            .collect())
    }
}

/// Concentric rings around the roots, one ring per tree depth
///
/// A single root sits at the origin. With several roots they share the first
/// ring and their descendants move one ring outward.
#[derive(Debug, Clone)]
pub struct RadialLayout {
    pub params: LayoutParameters,
    /// Distance between consecutive rings
    pub ring_spacing: f32,
}

impl Default for RadialLayout {
    fn default() -> Self {
        Self::new(LayoutParameters::default())
    }
}

impl RadialLayout {
    /// Rings are `layer_spacing` apart by default
    pub fn new(params: LayoutParameters) -> Self {
        let ring_spacing = params.layer_spacing;
        Self {
            params,
            ring_spacing,
        }
    }

    pub fn with_ring_spacing(mut self, ring_spacing: f32) -> Self {
        self.ring_spacing = ring_spacing;
        self
    }
}

impl<N: NodeHandle> LayoutEngine<N> for RadialLayout {
    fn layout<S>(&self, graph: &GraphModel<N>, _sizes: &S) -> Result<PositionMap<N>, LayoutError<N>>
    where
        S: NodeSizes<N>,
    {
        self.params.validate()?;
        if !(self.ring_spacing.is_finite() && self.ring_spacing > 0.0) {
            return Err(ParameterError {
                name: "ring_spacing",
                reason: format!("expected a finite, positive value, got {}", self.ring_spacing),
            }
            .into());
        }
        if graph.node_count() < 2 {
            return Ok(PositionMap::new());
        }

        let forest = Forest::from_model(graph);
        let depth = tree_depths(&forest);
        let offset = usize::from(forest.roots().len() > 1);

        // Nodes per ring, in pre-order
        let mut rings: Vec<Vec<N>> = Vec::new();
        for id in forest.preorder() {
            let ring = depth[id.index()] + offset;
            if rings.len() <= ring {
                rings.resize_with(ring + 1, Vec::new);
            }
            rings[ring].push(forest.get(id).handle());
        }

        debug!("Radial layout of {} nodes on {} rings", forest.len(), rings.len());

        let mut positions = PositionMap::new();
        for (ring, nodes) in rings.iter().enumerate() {
            let radius = ring as f32 * self.ring_spacing;
            for (k, &node) in nodes.iter().enumerate() {
                let angle = TAU * k as f32 / nodes.len() as f32;
                positions.insert(node, Point::new(radius * angle.cos(), radius * angle.sin()));
            }
        }

        Ok(positions)
    }
}

/// Breadth-first depth of every forest node from its closest root
fn tree_depths<N: NodeHandle>(forest: &Forest<N>) -> Vec<usize> {
    let mut depth = vec![usize::MAX; forest.len()];
    let mut queue = VecDeque::new();
    for &root in forest.roots() {
        depth[root.index()] = 0;
        queue.push_back(root);
    }

    while let Some(id) = queue.pop_front() {
        for &child in forest.get(id).children() {
            if depth[child.index()] == usize::MAX {
                depth[child.index()] = depth[id.index()] + 1;
                queue.push_back(child);
            }
        }
    }

    depth
}
