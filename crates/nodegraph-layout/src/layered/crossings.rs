use super::LayeredNode;
use petgraph::Direction;
use tracing::trace;

/// Minimize edge crossings with the barycenter heuristic
///
/// Each iteration runs a forward sweep, ordering every layer by the mean
/// position of its neighbours in the previous layer, then a backward sweep
/// using the next layer. Sweeping stops early once a full iteration leaves
/// every layer unchanged. The best ordering seen is kept and refined by a
/// greedy swap of adjacent nodes.
///
/// Every edge must span exactly one layer.
pub(crate) fn minimize_crossings<N>(
    nodes: &[LayeredNode<N>],
    mut layers: Vec<Vec<usize>>,
    max_iterations: usize,
) -> (Vec<Vec<usize>>, usize) {
    let mut position = vec![0usize; nodes.len()];
    for layer in &layers {
        update_positions(layer, &mut position);
    }

    let mut best = layers.clone();
    let mut best_crossings = count_crossings(nodes, &layers, &position);

    for iteration in 0..max_iterations {
        if best_crossings == 0 {
            break;
        }

        let mut reordered = false;
        for layer_index in 1..layers.len() {
            reordered |= reorder_layer(
                nodes,
                &mut layers[layer_index],
                &mut position,
                Direction::Incoming,
            );
        }
        for layer_index in (0..layers.len().saturating_sub(1)).rev() {
            reordered |= reorder_layer(
                nodes,
                &mut layers[layer_index],
                &mut position,
                Direction::Outgoing,
            );
        }

        let crossings = count_crossings(nodes, &layers, &position);
        trace!("Barycenter iteration {iteration}: {crossings} crossings");
        if crossings < best_crossings {
            best = layers.clone();
            best_crossings = crossings;
        }

        if !reordered {
            break;
        }
    }

    let mut layers = best;
    for layer in &layers {
        update_positions(layer, &mut position);
    }
    let crossings = transpose(nodes, &mut layers, &mut position, max_iterations, best_crossings);

    (layers, crossings)
}

fn update_positions(layer: &[usize], position: &mut [usize]) {
    for (order, &node) in layer.iter().enumerate() {
        position[node] = order;
    }
}

/// Mean position of the neighbours of `node` in the given direction
fn barycenter<N>(
    node: &LayeredNode<N>,
    position: &[usize],
    direction: Direction,
) -> Option<f32> {
    let neighbors = match direction {
        Direction::Incoming => &node.incoming,
        Direction::Outgoing => &node.outgoing,
    };
    if neighbors.is_empty() {
        return None;
    }
    let sum: usize = neighbors.iter().map(|&n| position[n]).sum();
    Some(sum as f32 / neighbors.len() as f32)
}

/// Stable sort of one layer by barycenter; nodes without neighbours in the
/// swept direction keep their current position as key
fn reorder_layer<N>(
    nodes: &[LayeredNode<N>],
    layer: &mut Vec<usize>,
    position: &mut [usize],
    direction: Direction,
) -> bool {
    let mut keyed: Vec<(f32, usize)> = layer
        .iter()
        .map(|&node| {
            let key = barycenter(&nodes[node], position, direction)
                .unwrap_or(position[node] as f32);
            (key, node)
        })
        .collect();
    keyed.sort_by(|a, b| a.0.total_cmp(&b.0));

    let reordered = keyed.iter().zip(layer.iter()).any(|(&(_, a), &b)| a != b);
    if reordered {
        *layer = keyed.into_iter().map(|(_, node)| node).collect();
        update_positions(layer, position);
    }
    reordered
}

/// Swap adjacent nodes while doing so strictly reduces crossings
fn transpose<N>(
    nodes: &[LayeredNode<N>],
    layers: &mut [Vec<usize>],
    position: &mut [usize],
    max_iterations: usize,
    mut crossings: usize,
) -> usize {
    for _ in 0..max_iterations {
        if crossings == 0 {
            break;
        }

        let mut improved = false;
        for layer_index in 0..layers.len() {
            for i in 0..layers[layer_index].len().saturating_sub(1) {
                let before = local_crossings(nodes, layers, position, layer_index);
                swap(layers, position, layer_index, i);
                let after = local_crossings(nodes, layers, position, layer_index);

                if after < before {
                    crossings -= before - after;
                    improved = true;
                } else {
                    // Swap back if no improvement
                    swap(layers, position, layer_index, i);
                }
            }
        }

        if !improved {
            break;
        }
    }

    crossings
}

fn swap(layers: &mut [Vec<usize>], position: &mut [usize], layer_index: usize, i: usize) {
    let layer = &mut layers[layer_index];
    layer.swap(i, i + 1);
    position[layer[i]] = i;
    position[layer[i + 1]] = i + 1;
}

/// Crossings on the edges entering and leaving one layer
fn local_crossings<N>(
    nodes: &[LayeredNode<N>],
    layers: &[Vec<usize>],
    position: &[usize],
    layer_index: usize,
) -> usize {
    let above = match layer_index.checked_sub(1) {
        Some(upper) => count_between(nodes, &layers[upper], position),
        None => 0,
    };
    above + count_between(nodes, &layers[layer_index], position)
}

/// Count the number of edge crossings in the current ordering
pub(crate) fn count_crossings<N>(
    nodes: &[LayeredNode<N>],
    layers: &[Vec<usize>],
    position: &[usize],
) -> usize {
    layers
        .iter()
        .map(|layer| count_between(nodes, layer, position))
        .sum()
}

/// Crossings among the edges leaving `upper_layer`
///
/// Edges are sorted by their upper endpoint, then lower endpoint; two edges
/// cross exactly when their lower endpoints appear inverted in that order.
fn count_between<N>(nodes: &[LayeredNode<N>], upper_layer: &[usize], position: &[usize]) -> usize {
    let mut edges: Vec<(usize, usize)> = upper_layer
        .iter()
        .flat_map(|&upper| {
            nodes[upper]
                .outgoing
                .iter()
                .map(move |&lower| (position[upper], position[lower]))
        })
        .collect();
    edges.sort_unstable();

    let mut targets: Vec<usize> = edges.into_iter().map(|(_, lower)| lower).collect();
    count_inversions(&mut targets)
}

/// Number of pairs `i < j` with `values[i] > values[j]`, sorts `values`
fn count_inversions(values: &mut [usize]) -> usize {
    if values.len() < 2 {
        return 0;
    }

    let mid = values.len() / 2;
    let mut inversions = {
        let (left, right) = values.split_at_mut(mid);
        count_inversions(left) + count_inversions(right)
    };

    let mut merged = Vec::with_capacity(values.len());
    let (mut i, mut j) = (0, mid);
    while i < mid && j < values.len() {
        if values[i] <= values[j] {
            merged.push(values[i]);
            i += 1;
        } else {
            merged.push(values[j]);
            inversions += mid - i;
            j += 1;
        }
    }
    merged.extend_from_slice(&values[i..mid]);
    merged.extend_from_slice(&values[j..]);
    values.copy_from_slice(&merged);

    inversions
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    /// Two layers with `links` going from the upper index to the lower index
    fn two_layers(upper: usize, lower: usize, links: &[(usize, usize)]) -> Vec<LayeredNode<u32>> {
        let mut nodes: Vec<_> = (0..upper + lower)
            .map(|i| {
                let mut node = LayeredNode::original(i as u32);
                node.layer = usize::from(i >= upper);
                node
            })
            .collect();
        for &(a, b) in links {
            nodes[a].outgoing.push(upper + b);
            nodes[upper + b].incoming.push(a);
        }
        nodes
    }

    #[test]
    fn counts_inversions() {
        assert_eq!(count_inversions(&mut [0, 1, 2]), 0);
        assert_eq!(count_inversions(&mut [2, 1, 0]), 3);
        assert_eq!(count_inversions(&mut [1, 1, 0]), 2);
    }

    #[test]
    fn counts_a_single_crossing() {
        // upper a b, lower x y with a-y and b-x
        let nodes = two_layers(2, 2, &[(0, 1), (1, 0)]);
        let layers = vec![vec![0, 1], vec![2, 3]];
        let position = vec![0, 1, 0, 1];
        assert_eq!(count_crossings(&nodes, &layers, &position), 1);
    }

    #[test]
    fn shared_endpoints_do_not_cross() {
        let nodes = two_layers(2, 1, &[(0, 0), (1, 0)]);
        let layers = vec![vec![0, 1], vec![2]];
        let position = vec![0, 1, 0];
        assert_eq!(count_crossings(&nodes, &layers, &position), 0);
    }

    #[test]
    fn untangles_a_twisted_bipartite_graph() {
        // a-z, b-y, c-x fully reversed: 3 crossings in the initial order
        let nodes = two_layers(3, 3, &[(0, 2), (1, 1), (2, 0)]);
        let layers = vec![vec![0, 1, 2], vec![3, 4, 5]];

        let (layers, crossings) = minimize_crossings(&nodes, layers, 10);

        assert_eq!(crossings, 0);
        let mut position = vec![0; nodes.len()];
        for layer in &layers {
            update_positions(layer, &mut position);
        }
        assert_eq!(count_crossings(&nodes, &layers, &position), 0);
    }

    #[test]
    fn layers_remain_permutations() {
        let nodes = two_layers(4, 4, &[(0, 3), (1, 0), (1, 2), (2, 1), (3, 0), (3, 3)]);
        let layers = vec![vec![0, 1, 2, 3], vec![4, 5, 6, 7]];

        let (layers, _) = minimize_crossings(&nodes, layers, 10);

        let mut upper = layers[0].clone();
        upper.sort();
        assert_eq!(upper, vec![0, 1, 2, 3]);
        let mut lower = layers[1].clone();
        lower.sort();
        assert_eq!(lower, vec![4, 5, 6, 7]);
    }
}
