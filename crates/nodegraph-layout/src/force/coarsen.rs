use crate::{GraphModel, LayoutParameters, NodeHandle, Point, Vec2};
use rand::rngs::StdRng;
use rand::Rng;
use std::collections::{BTreeMap, HashMap};
use std::f32::consts::TAU;
use tracing::{debug, trace};

/// Hard cap on hierarchy depth, reached only with extreme ratios
const MAX_LEVELS: usize = 32;

/// Share of the coarse velocity a fine node keeps after interpolation
const VELOCITY_RETENTION: f32 = 0.5;

/// Jitter added on interpolation, relative to the ideal edge length
const JITTER: f32 = 0.1;

/// One or more original nodes merged during coarsening
#[derive(Debug, Clone)]
pub struct CoarseNode<N> {
    pub(crate) represented: Vec<N>,
    pub(crate) position: Point,
    pub(crate) velocity: Vec2,
    pub(crate) force: Vec2,
    pub(crate) mass: f32,
    /// Neighbour index and summed edge weight, sorted by index
    pub(crate) neighbors: Vec<(usize, f32)>,
}

impl<N> CoarseNode<N> {
    pub fn represented(&self) -> &[N] {
        &self.represented
    }

    pub fn position(&self) -> Point {
        self.position
    }

    pub fn velocity(&self) -> Vec2 {
        self.velocity
    }

    /// Force applied during the last simulation step, after clamping
    pub fn force(&self) -> Vec2 {
        self.force
    }

    pub fn mass(&self) -> f32 {
        self.mass
    }

    pub fn neighbors(&self) -> impl Iterator<Item = usize> + '_ {
        self.neighbors.iter().map(|&(n, _)| n)
    }

    pub fn degree(&self) -> usize {
        self.neighbors.len()
    }
}

/// One graph of the coarsening hierarchy
#[derive(Debug, Clone)]
pub struct Level<N> {
    pub(crate) nodes: Vec<CoarseNode<N>>,
    /// Index of the node representing each node on the next coarser level,
    /// empty on the coarsest level
    pub(crate) parent: Vec<usize>,
}

impl<N> Level<N> {
    pub fn nodes(&self) -> &[CoarseNode<N>] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Coarser node standing for `index`, if there is a coarser level
    pub fn parent_of(&self, index: usize) -> Option<usize> {
        self.parent.get(index).copied()
    }
}

/// Progressively smaller graphs, finest first
#[derive(Debug, Clone)]
pub struct Hierarchy<N> {
    pub(crate) levels: Vec<Level<N>>,
}

impl<N: NodeHandle> Hierarchy<N> {
    /// Wrap every node into a unit mass coarse node and coarsen until the
    /// threshold or ratio condition stops it
    pub(crate) fn build(graph: &GraphModel<N>, params: &LayoutParameters, rng: &mut StdRng) -> Self {
        let finest = finest_level(graph, params, rng);
        let mut levels = vec![finest];

        while let Some(current) = levels.last() {
            if current.len() <= params.coarsening_threshold || levels.len() >= MAX_LEVELS {
                break;
            }

            let (coarser, parent) = coarsen(current);
            if coarser.len() >= current.len() {
                debug!("Coarsening stalled at {} nodes", current.len());
                break;
            }

            let ratio = coarser.len() as f32 / current.len() as f32;
            trace!("Coarsened {} -> {} nodes", current.len(), coarser.len());
            if let Some(current) = levels.last_mut() {
                current.parent = parent;
            }
            levels.push(coarser);

            if ratio > params.coarsening_ratio {
                debug!("Coarsening ratio {ratio:.2} above limit, stopping");
                break;
            }
        }

        Self { levels }
    }

    pub fn levels(&self) -> &[Level<N>] {
        &self.levels
    }

    /// Node count per level, finest first
    pub fn level_sizes(&self) -> Vec<usize> {
        self.levels.iter().map(Level::len).collect()
    }
}

fn finest_level<N: NodeHandle>(
    graph: &GraphModel<N>,
    params: &LayoutParameters,
    rng: &mut StdRng,
) -> Level<N> {
    let handles: Vec<N> = graph.all_nodes().collect();
    let index: HashMap<N, usize> = handles.iter().enumerate().map(|(i, &n)| (n, i)).collect();

    let mut adjacency: Vec<BTreeMap<usize, f32>> = vec![BTreeMap::new(); handles.len()];
    for edge in graph.edges() {
        let (Some(&a), Some(&b)) = (index.get(&edge.source), index.get(&edge.target)) else {
            continue;
        };
        if a == b {
            continue;
        }
        let weight = if edge.weight.is_finite() && edge.weight > 0.0 {
            edge.weight
        } else {
            1.0
        };
        *adjacency[a].entry(b).or_insert(0.0) += weight;
        *adjacency[b].entry(a).or_insert(0.0) += weight;
    }

    let extent = params.ideal_edge_length * (handles.len() as f32).sqrt();
    let nodes = handles
        .into_iter()
        .zip(adjacency)
        .map(|(handle, neighbors)| CoarseNode {
            represented: vec![handle],
            position: Point::new(
                rng.gen_range(-0.5..=0.5) * extent,
                rng.gen_range(-0.5..=0.5) * extent,
            ),
            velocity: Vec2::zero(),
            force: Vec2::zero(),
            mass: 1.0,
            neighbors: neighbors.into_iter().collect(),
        })
        .collect();

    Level {
        nodes,
        parent: Vec::new(),
    }
}

/// Greedy matching of each unprocessed node with its best unprocessed
/// neighbour
///
/// The best neighbour has the lowest degree; among equals the closest one,
/// then the lowest index. Unmatched nodes carry over alone. Returns the
/// coarser level and, for each node of `level`, its coarse representative.
fn coarsen<N: Copy>(level: &Level<N>) -> (Level<N>, Vec<usize>) {
    let nodes = &level.nodes;
    let mut matched = vec![false; nodes.len()];
    let mut parent = vec![0usize; nodes.len()];
    let mut coarse: Vec<CoarseNode<N>> = Vec::new();

    for i in 0..nodes.len() {
        if matched[i] {
            continue;
        }
        matched[i] = true;

        let partner = nodes[i]
            .neighbors()
            .filter(|&j| !matched[j])
            .map(|j| {
                let inverse_degree = 1.0 / nodes[j].degree().max(1) as f32;
                let distance = nodes[i].position.distance(nodes[j].position);
                (j, inverse_degree, 1.0 / distance.max(f32::EPSILON))
            })
            .max_by(|a, b| {
                a.1.total_cmp(&b.1)
                    .then(a.2.total_cmp(&b.2))
                    .then(b.0.cmp(&a.0))
            })
            .map(|(j, _, _)| j);

        let id = coarse.len();
        parent[i] = id;
        let mut members = vec![i];
        if let Some(j) = partner {
            matched[j] = true;
            parent[j] = id;
            members.push(j);
        }
        coarse.push(merge(nodes, &members));
    }

    // Re-derive edges between the coarse groups, dropping self-edges
    let mut adjacency: Vec<BTreeMap<usize, f32>> = vec![BTreeMap::new(); coarse.len()];
    for (i, node) in nodes.iter().enumerate() {
        for &(j, weight) in &node.neighbors {
            let (a, b) = (parent[i], parent[j]);
            if a != b {
                *adjacency[a].entry(b).or_insert(0.0) += weight;
            }
        }
    }
    for (node, neighbors) in coarse.iter_mut().zip(adjacency) {
        node.neighbors = neighbors.into_iter().collect();
    }

    (
        Level {
            nodes: coarse,
            parent: Vec::new(),
        },
        parent,
    )
}

fn merge<N: Copy>(nodes: &[CoarseNode<N>], members: &[usize]) -> CoarseNode<N> {
    let mut represented = Vec::new();
    let mut mass = 0.0;
    let mut sum = Vec2::zero();
    for &m in members {
        represented.extend_from_slice(&nodes[m].represented);
        mass += nodes[m].mass;
        sum += nodes[m].position.to_vec2();
    }
    let center = sum / members.len() as f32;

    CoarseNode {
        represented,
        position: Point::new(center.x, center.y),
        velocity: Vec2::zero(),
        force: Vec2::zero(),
        mass,
        neighbors: Vec::new(),
    }
}

/// Place the nodes evenly on a circle of radius `sqrt(count) * ideal_edge_length`
pub(crate) fn place_on_circle<N>(level: &mut Level<N>, ideal_edge_length: f32) {
    let count = level.nodes.len();
    if count == 1 {
        level.nodes[0].position = Point::origin();
        return;
    }

    let radius = (count as f32).sqrt() * ideal_edge_length;
    for (i, node) in level.nodes.iter_mut().enumerate() {
        let angle = TAU * i as f32 / count as f32;
        node.position = Point::new(radius * angle.cos(), radius * angle.sin());
        node.velocity = Vec2::zero();
    }
}

/// Place the nodes row by row on a square-ish grid with `spacing` cells
pub(crate) fn place_on_grid<N>(level: &mut Level<N>, spacing: f32) {
    let columns = (level.nodes.len() as f32).sqrt().ceil().max(1.0) as usize;
    for (i, node) in level.nodes.iter_mut().enumerate() {
        let (row, column) = (i / columns, i % columns);
        node.position = Point::new(column as f32 * spacing, row as f32 * spacing);
        node.velocity = Vec2::zero();
    }
}

/// Seed a finer level from its coarse representatives
///
/// Each fine node starts at its representative's position plus a small
/// random jitter and keeps part of its velocity.
pub(crate) fn interpolate<N>(
    coarse: &Level<N>,
    fine: &mut Level<N>,
    ideal_edge_length: f32,
    rng: &mut StdRng,
) {
    let jitter = ideal_edge_length * JITTER;
    for (i, node) in fine.nodes.iter_mut().enumerate() {
        let Some(representative) = fine.parent.get(i).and_then(|&p| coarse.nodes.get(p)) else {
            continue;
        };
        let offset = Vec2::new(
            rng.gen_range(-jitter..=jitter),
            rng.gen_range(-jitter..=jitter),
        );
        node.position = representative.position + offset;
        node.velocity = representative.velocity * VELOCITY_RETENTION;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use test_log::test;

    fn path(len: u32) -> GraphModel<u32> {
        GraphModel::from_edges((0..len - 1).map(|i| (i, i + 1)))
    }

    fn hierarchy(graph: &GraphModel<u32>, params: &LayoutParameters) -> Hierarchy<u32> {
        Hierarchy::build(graph, params, &mut StdRng::seed_from_u64(params.seed))
    }

    #[test]
    fn every_pass_strictly_shrinks() {
        let params = LayoutParameters::default().with_coarsening(10, 0.9);
        let hierarchy = hierarchy(&path(200), &params);
        let sizes = hierarchy.level_sizes();

        assert!(sizes.len() > 1);
        assert_eq!(sizes[0], 200);
        for pair in sizes.windows(2) {
            assert!(pair[1] < pair[0], "{sizes:?}");
        }
        // Only the last level may be at or below the threshold
        for &size in &sizes[..sizes.len() - 1] {
            assert!(size > 10);
        }
        // A path halves at every pass
        assert!(sizes.len() <= 6, "{sizes:?}");
    }

    #[test]
    fn coarse_nodes_conserve_mass_and_membership() {
        let params = LayoutParameters::default().with_coarsening(4, 0.9);
        let hierarchy = hierarchy(&path(40), &params);

        for level in hierarchy.levels() {
            let mass: f32 = level.nodes().iter().map(CoarseNode::mass).sum();
            assert_eq!(mass, 40.0);
            let mut members: Vec<u32> = level
                .nodes()
                .iter()
                .flat_map(|n| n.represented().iter().copied())
                .collect();
            members.sort();
            assert_eq!(members, (0..40).collect::<Vec<_>>());
        }
    }

    #[test]
    fn coarse_edges_have_no_self_loops() {
        let params = LayoutParameters::default().with_coarsening(2, 0.95);
        let graph = GraphModel::from_edges([(0, 1), (1, 2), (2, 0), (2, 3), (3, 4), (4, 5), (5, 3)]);
        let hierarchy = hierarchy(&graph, &params);

        for level in hierarchy.levels() {
            for (i, node) in level.nodes().iter().enumerate() {
                assert!(node.neighbors().all(|j| j != i));
            }
        }
    }

    #[test]
    fn star_stops_when_ratio_is_poor() {
        // A star only ever matches its center once
        let graph = GraphModel::from_edges((1..50u32).map(|leaf| (0, leaf)));
        let params = LayoutParameters::default().with_coarsening(4, 0.9);
        let hierarchy = hierarchy(&graph, &params);
        assert_eq!(hierarchy.level_sizes(), vec![50, 49]);
    }

    #[test]
    fn edgeless_graph_does_not_coarsen() {
        let graph = GraphModel::build(0..30u32, Vec::<(u32, u32)>::new()).unwrap();
        let params = LayoutParameters::default().with_coarsening(4, 0.9);
        assert_eq!(hierarchy(&graph, &params).level_sizes(), vec![30]);
    }

    #[test]
    fn interpolation_starts_near_representative() {
        let params = LayoutParameters::default().with_coarsening(2, 0.9);
        let mut rng = StdRng::seed_from_u64(1);
        let mut hierarchy = Hierarchy::build(&path(8), &params, &mut rng);
        let (fine, coarse) = hierarchy.levels.split_at_mut(1);
        place_on_circle(&mut coarse[0], 100.0);
        interpolate(&coarse[0], &mut fine[0], 100.0, &mut rng);

        for (i, node) in fine[0].nodes().iter().enumerate() {
            let parent = fine[0].parent_of(i).unwrap();
            let distance = node.position().distance(coarse[0].nodes()[parent].position());
            assert!(distance <= 100.0 * JITTER * 2f32.sqrt() + 1e-3);
        }
    }
}
