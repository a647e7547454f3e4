//! Multiscale force-directed layout
//!
//! The graph is coarsened into a hierarchy of progressively smaller graphs by
//! merging matched node pairs. The coarsest graph is placed on a circle and
//! simulated; each finer level then starts from its coarse representatives'
//! positions and is simulated in turn, down to the original graph.

mod coarsen;
mod simulate;

pub use coarsen::{CoarseNode, Hierarchy, Level};

use crate::{
    GraphModel, LayoutEngine, LayoutError, LayoutParameters, NodeHandle, NodeSizes, Point,
    PositionMap, Vec2,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::debug;

use coarsen::{interpolate, place_on_circle, place_on_grid};
use simulate::{simulate, Repulsion};

/// Iterations of the single-level variant used for large graphs
const LARGE_GRAPH_ITERATIONS: usize = 50;

/// Force-directed layout refined over a coarsening hierarchy
///
/// Edge direction is ignored. Node sizes are not used: nodes are simulated
/// as points. Graphs above [`LayoutParameters::large_graph_threshold`]
/// nodes skip the hierarchy and all-pairs repulsion to bound the cost.
#[derive(Debug, Clone, Default)]
pub struct MultiscaleLayout {
    pub params: LayoutParameters,
}

impl MultiscaleLayout {
    pub fn new(params: LayoutParameters) -> Self {
        Self { params }
    }

    /// Coarsening hierarchy the layout would refine, finest level first
    ///
    /// # Errors
    /// Returns an error if the parameters are invalid
    pub fn build_hierarchy<N>(&self, graph: &GraphModel<N>) -> Result<Hierarchy<N>, LayoutError<N>>
    where
        N: NodeHandle,
    {
        self.params.validate()?;
        let mut rng = StdRng::seed_from_u64(self.params.seed);
        Ok(Hierarchy::build(graph, &self.params, &mut rng))
    }

    fn multilevel<N>(&self, graph: &GraphModel<N>, rng: &mut StdRng) -> Vec<CoarseNode<N>>
    where
        N: NodeHandle + Send + Sync,
    {
        let params = &self.params;
        let mut hierarchy = Hierarchy::build(graph, params, rng);
        let levels = &mut hierarchy.levels;
        debug!("Coarsening hierarchy: {:?}", levels.iter().map(Level::len).collect::<Vec<_>>());

        if let Some(coarsest) = levels.last_mut() {
            place_on_circle(coarsest, params.ideal_edge_length);
        }

        for level_index in (0..levels.len()).rev() {
            let outcome = simulate(
                &mut levels[level_index].nodes,
                params,
                Repulsion::AllPairs,
                params.max_iterations_per_level,
            );
            debug!(
                "Level {level_index} ({} nodes) settled after {} iterations, energy {:.5}",
                levels[level_index].len(),
                outcome.iterations,
                outcome.energy
            );

            if level_index > 0 {
                let (finer, coarser) = levels.split_at_mut(level_index);
                interpolate(
                    &coarser[0],
                    &mut finer[level_index - 1],
                    params.ideal_edge_length,
                    rng,
                );
            }
        }

        levels.swap_remove(0).nodes
    }

    /// Grid start and edge-local forces only
    fn single_level<N>(&self, graph: &GraphModel<N>, rng: &mut StdRng) -> Vec<CoarseNode<N>>
    where
        N: NodeHandle + Send + Sync,
    {
        let params = LayoutParameters {
            coarsening_threshold: usize::MAX,
            ..self.params.clone()
        };
        let mut hierarchy = Hierarchy::build(graph, &params, rng);
        let mut finest = hierarchy.levels.swap_remove(0);

        place_on_grid(&mut finest, params.ideal_edge_length);
        let iterations = params.max_iterations_per_level.min(LARGE_GRAPH_ITERATIONS);
        let outcome = simulate(&mut finest.nodes, &params, Repulsion::EdgesOnly, iterations);
        debug!(
            "Large graph of {} nodes settled after {} iterations",
            finest.len(),
            outcome.iterations
        );

        finest.nodes
    }
}

impl<N> LayoutEngine<N> for MultiscaleLayout
where
    N: NodeHandle + Send + Sync,
{
    fn layout<S>(&self, graph: &GraphModel<N>, _sizes: &S) -> Result<PositionMap<N>, LayoutError<N>>
    where
        S: NodeSizes<N>,
    {
        self.params.validate()?;
        if graph.node_count() < 2 {
            debug!("Nothing to lay out for {} nodes", graph.node_count());
            return Ok(PositionMap::new());
        }

        let mut rng = StdRng::seed_from_u64(self.params.seed);
        let nodes = if graph.node_count() > self.params.large_graph_threshold {
            self.single_level(graph, &mut rng)
        } else {
            self.multilevel(graph, &mut rng)
        };

        Ok(centered_positions(&nodes))
    }
}

/// Translate the finest level so its centroid is the origin
fn centered_positions<N: NodeHandle>(nodes: &[CoarseNode<N>]) -> PositionMap<N> {
    let sum = nodes
        .iter()
        .fold(Vec2::zero(), |sum, node| sum + node.position.to_vec2());
    let centroid = sum / nodes.len().max(1) as f32;

    nodes
        .iter()
        .flat_map(|node| {
            let position: Point = node.position - centroid;
            node.represented.iter().map(move |&handle| (handle, position))
        })
        .collect()
}

/// Run the multiscale force layout with the given parameters
///
/// # Errors
/// Returns an error if the parameters are invalid
pub fn multiscale_layout<N, S>(
    graph: &GraphModel<N>,
    sizes: &S,
    params: &LayoutParameters,
) -> Result<PositionMap<N>, LayoutError<N>>
where
    N: NodeHandle + Send + Sync,
    S: NodeSizes<N>,
{
    MultiscaleLayout::new(params.clone()).layout(graph, sizes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::UniformSize;
    use test_log::test;

    fn sizes() -> UniformSize {
        UniformSize(Vec2::new(10.0, 10.0))
    }

    fn grid_graph(side: u32) -> GraphModel<u32> {
        let mut edges = Vec::new();
        for row in 0..side {
            for column in 0..side {
                let id = row * side + column;
                if column + 1 < side {
                    edges.push((id, id + 1));
                }
                if row + 1 < side {
                    edges.push((id, id + side));
                }
            }
        }
        GraphModel::from_edges(edges)
    }

    #[test]
    fn edge_settles_at_ideal_length() {
        let graph = GraphModel::from_edges([("a", "b")]);
        for seed in 0..4 {
            let params = LayoutParameters::default().with_seed(seed);
            let positions = multiscale_layout(&graph, &sizes(), &params).unwrap();

            let distance = positions["a"].distance(positions["b"]);
            assert!(
                (distance - params.ideal_edge_length).abs() < 0.15 * params.ideal_edge_length,
                "seed {seed}: distance {distance}"
            );
        }
    }

    #[test]
    fn same_seed_same_layout() {
        let graph = grid_graph(6);
        let params = LayoutParameters::default()
            .with_coarsening(4, 0.9)
            .with_max_iterations_per_level(60)
            .with_seed(42);

        let first = multiscale_layout(&graph, &sizes(), &params).unwrap();
        let second = multiscale_layout(&graph, &sizes(), &params).unwrap();

        assert_eq!(first.len(), 36);
        for (node, position) in &first {
            assert_eq!(second[node], *position);
        }
    }

    #[test]
    fn positions_are_centered_and_finite() {
        let graph = GraphModel::from_edges([(0, 1), (1, 2), (2, 0), (2, 3), (3, 4)]);
        let positions = multiscale_layout(&graph, &sizes(), &LayoutParameters::default()).unwrap();

        assert_eq!(positions.len(), 5);
        let sum = positions
            .values()
            .fold(Vec2::zero(), |sum, p| sum + p.to_vec2());
        assert!(sum.length() / 5.0 < 1e-2);
        assert!(positions.values().all(|p| p.x.is_finite() && p.y.is_finite()));
    }

    #[test]
    fn neighbours_end_closer_than_strangers() {
        let graph = grid_graph(5);
        let params = LayoutParameters::default().with_coarsening(4, 0.9);
        let positions = multiscale_layout(&graph, &sizes(), &params).unwrap();

        let mean = |pairs: &[(u32, u32)]| {
            pairs
                .iter()
                .map(|(a, b)| positions[a].distance(positions[b]))
                .sum::<f32>()
                / pairs.len() as f32
        };
        let adjacent: Vec<(u32, u32)> = graph.edges().map(|e| (e.source, e.target)).collect();
        let corners = [(0, 24), (4, 20)];
        assert!(mean(&adjacent) < mean(&corners));
    }

    #[test]
    fn large_graphs_use_single_level() {
        let graph = grid_graph(8);
        let params = LayoutParameters::default().with_large_graph_threshold(10);
        let positions = multiscale_layout(&graph, &sizes(), &params).unwrap();

        assert_eq!(positions.len(), 64);
        assert!(positions.values().all(|p| p.x.is_finite() && p.y.is_finite()));
    }

    #[test]
    fn hierarchy_shrinks_toward_threshold() {
        let engine = MultiscaleLayout::new(LayoutParameters::default().with_coarsening(8, 0.9));
        let hierarchy = engine.build_hierarchy(&grid_graph(10)).unwrap();
        let sizes = hierarchy.level_sizes();

        assert_eq!(sizes[0], 100);
        assert!(sizes.windows(2).all(|pair| pair[1] < pair[0]));
        assert!(sizes.len() <= 8, "{sizes:?}");
    }

    #[test]
    fn disconnected_nodes_are_placed() {
        let graph = GraphModel::build([1, 2, 3], [(1, 2)]).unwrap();
        let positions = multiscale_layout(&graph, &sizes(), &LayoutParameters::default()).unwrap();
        assert_eq!(positions.len(), 3);
    }
}
