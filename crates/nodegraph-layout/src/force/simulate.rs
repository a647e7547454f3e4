use super::coarsen::CoarseNode;
use crate::{LayoutParameters, Point, Vec2};
use rayon::prelude::*;
use tracing::trace;

/// Closest distance used in force formulas, avoids infinite forces
const MIN_DISTANCE: f32 = 0.01;

/// Repulsion is ignored beyond this many ideal edge lengths
const REPULSION_CUTOFF: f32 = 10.0;

/// Mean kinetic energy per node under which the simulation may stop early
const ENERGY_EPSILON: f32 = 1e-4;

/// Largest net force under which the simulation may stop early
const FORCE_EPSILON: f32 = 0.01;

/// Golden angle, spreads directions of coincident node pairs
const GOLDEN_ANGLE: f32 = 2.399_963;

/// Which node pairs repel each other
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Repulsion {
    /// Every pair closer than the cutoff distance
    AllPairs,
    /// Only pairs joined by an edge
    EdgesOnly,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct SimulationOutcome {
    pub iterations: usize,
    pub energy: f32,
}

/// Run the force simulation on one level
///
/// Every iteration first computes the force on every node from a read-only
/// view of all positions, then integrates velocities and positions. Both
/// phases run in parallel; per-node sums always follow neighbour order, so
/// the outcome does not depend on the number of threads.
///
/// The run ends early only once the system is both slow and balanced: low
/// kinetic energy and no large net force on any node.
pub(crate) fn simulate<N>(
    nodes: &mut [CoarseNode<N>],
    params: &LayoutParameters,
    repulsion: Repulsion,
    iterations: usize,
) -> SimulationOutcome
where
    N: Send + Sync,
{
    let mut temperature = params.ideal_edge_length / 10.0;
    let mut outcome = SimulationOutcome {
        iterations: 0,
        energy: 0.0,
    };
    if nodes.len() < 2 {
        return outcome;
    }

    let dt = params.time_step;
    let damping = params.damping;

    for iteration in 0..iterations {
        // Read phase: no position changes until every force is known
        let forces: Vec<Vec2> = {
            let view: &[CoarseNode<N>] = nodes;
            (0..view.len())
                .into_par_iter()
                .map(|i| force_on(view, i, params, repulsion))
                .collect()
        };

        // Write phase: each node only touches its own state
        nodes
            .par_iter_mut()
            .zip(forces.par_iter())
            .for_each(|(node, &force)| {
                node.force = force.clamp_length(temperature);
                node.velocity = (node.velocity + node.force * (dt / node.mass)) * damping;
                node.position += node.velocity * dt;
            });

        let energy: f32 = nodes
            .iter()
            .map(|node| 0.5 * node.mass * node.velocity.length_squared())
            .sum();
        // Unclamped: a slow node at a turning point may still be far from rest
        let largest_force = forces.iter().map(|f| f.length()).fold(0.0, f32::max);

        outcome = SimulationOutcome {
            iterations: iteration + 1,
            energy,
        };
        trace!(
            "Iteration {iteration}: temperature {temperature:.3}, energy {energy:.5}, force {largest_force:.5}"
        );

        if energy < ENERGY_EPSILON * nodes.len() as f32 && largest_force < FORCE_EPSILON {
            break;
        }
        temperature = (temperature * params.cooling_rate).max(params.min_temperature);
    }

    outcome
}

/// Total force on node `i`
fn force_on<N>(nodes: &[CoarseNode<N>], i: usize, params: &LayoutParameters, repulsion: Repulsion) -> Vec2 {
    let node = &nodes[i];
    let mut force = Vec2::zero();

    let cutoff = params.ideal_edge_length * REPULSION_CUTOFF;
    let repel = |j: usize, other: &CoarseNode<N>| {
        let (direction, distance) = separation(node.position, other.position, i, j);
        if distance > cutoff {
            return Vec2::zero();
        }
        direction * (params.repulsion_strength * node.mass * other.mass / (distance * distance))
    };

    match repulsion {
        Repulsion::AllPairs => {
            for (j, other) in nodes.iter().enumerate() {
                if j != i {
                    force += repel(j, other);
                }
            }
        }
        Repulsion::EdgesOnly => {
            for &(j, _) in &node.neighbors {
                force += repel(j, &nodes[j]);
            }
        }
    }

    // Logarithmic spring: pulls beyond the ideal length, pushes below it
    for &(j, weight) in &node.neighbors {
        let (direction, distance) = separation(node.position, nodes[j].position, i, j);
        let stretch = (distance / params.ideal_edge_length).ln();
        force -= direction * (params.attraction_strength * weight * stretch);
    }

    force
}

/// Unit vector pointing from `other` to `point`, and their distance
///
/// Coincident pairs get a direction derived from their indices, opposite
/// for the two members of the pair.
fn separation(point: Point, other: Point, i: usize, j: usize) -> (Vec2, f32) {
    let delta = point - other;
    let distance = delta.length();
    if distance >= MIN_DISTANCE {
        return (delta / distance, distance);
    }

    let (low, high) = (i.min(j), i.max(j));
    let angle = GOLDEN_ANGLE * (low * 31 + high) as f32;
    let direction = Vec2::new(angle.cos(), angle.sin());
    if i < j {
        (direction, MIN_DISTANCE)
    } else {
        (-direction, MIN_DISTANCE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::force::coarsen::{place_on_circle, Level};
    use test_log::test;

    fn node(x: f32, y: f32, neighbors: Vec<(usize, f32)>) -> CoarseNode<u32> {
        CoarseNode {
            represented: vec![0],
            position: Point::new(x, y),
            velocity: Vec2::zero(),
            force: Vec2::zero(),
            mass: 1.0,
            neighbors,
        }
    }

    #[test]
    fn connected_pair_settles_near_ideal_length() {
        let params = LayoutParameters::default();
        let mut nodes = vec![
            node(-300.0, 0.0, vec![(1, 1.0)]),
            node(300.0, 0.0, vec![(0, 1.0)]),
        ];

        simulate(&mut nodes, &params, Repulsion::AllPairs, 500);

        let distance = nodes[0].position.distance(nodes[1].position);
        assert!(
            (distance - params.ideal_edge_length).abs() < 0.15 * params.ideal_edge_length,
            "distance {distance}"
        );
    }

    #[test]
    fn does_not_stop_at_a_turning_point() {
        let params = LayoutParameters::default();
        let mut level = Level {
            nodes: vec![node(0.0, 0.0, vec![(1, 1.0)]), node(0.0, 0.0, vec![(0, 1.0)])],
            parent: Vec::new(),
        };
        place_on_circle(&mut level, params.ideal_edge_length);
        level.nodes[1].position += Vec2::new(-40.0, 25.0);

        let outcome = simulate(&mut level.nodes, &params, Repulsion::AllPairs, 300);

        assert!(outcome.iterations < 300, "{outcome:?}");
        for i in 0..level.nodes.len() {
            let force = force_on(&level.nodes, i, &params, Repulsion::AllPairs);
            assert!(force.length() < 5.0 * FORCE_EPSILON, "node {i}: {force:?}");
        }
        let distance = level.nodes[0].position.distance(level.nodes[1].position);
        assert!(
            (distance - params.ideal_edge_length).abs() < 0.15 * params.ideal_edge_length,
            "distance {distance}"
        );
    }

    #[test]
    fn unconnected_nodes_push_apart() {
        let params = LayoutParameters::default();
        let mut nodes = vec![node(0.0, 0.0, vec![]), node(5.0, 0.0, vec![])];

        simulate(&mut nodes, &params, Repulsion::AllPairs, 20);

        assert!(nodes[0].position.x < 0.0);
        assert!(nodes[1].position.x > 5.0);
    }

    #[test]
    fn edges_only_mode_ignores_strangers() {
        let params = LayoutParameters::default();
        let mut nodes = vec![node(0.0, 0.0, vec![]), node(5.0, 0.0, vec![])];

        let outcome = simulate(&mut nodes, &params, Repulsion::EdgesOnly, 20);

        assert_eq!(nodes[0].position, Point::new(0.0, 0.0));
        assert_eq!(outcome.iterations, 1);
    }

    #[test]
    fn coincident_nodes_separate_symmetrically() {
        let (a, da) = separation(Point::origin(), Point::origin(), 0, 1);
        let (b, db) = separation(Point::origin(), Point::origin(), 1, 0);
        assert_eq!(da, db);
        assert_eq!(a, -b);
    }

    #[test]
    fn forces_are_clamped_to_temperature() {
        let params = LayoutParameters::default();
        let mut nodes = vec![node(0.0, 0.0, vec![]), node(0.5, 0.0, vec![])];
        simulate(&mut nodes, &params, Repulsion::AllPairs, 1);
        assert!(nodes[0].force.length() <= params.ideal_edge_length / 10.0 + 1e-4);
    }
}
