use std::collections::VecDeque;
use tracing::warn;

/// Assign layers with a topological sweep (Kahn's algorithm)
///
/// Nodes without incoming edges start on layer 0 and every edge relaxes
/// `layer(target) = max(layer(target), layer(source) + 1)` when its source is
/// dequeued. This is longest-path layering: each node lands on the smallest
/// layer compatible with its predecessors.
///
/// `edges` must be acyclic. Should a cycle slip through, its nodes keep the
/// layer reached so far instead of blocking the sweep.
pub(crate) fn assign_layers(node_count: usize, edges: &[(usize, usize)]) -> Vec<usize> {
    let mut successors = vec![Vec::new(); node_count];
    let mut in_degree = vec![0usize; node_count];
    for &(source, target) in edges {
        successors[source].push(target);
        in_degree[target] += 1;
    }

    let mut layer = vec![0usize; node_count];
    let mut queue: VecDeque<usize> = (0..node_count).filter(|&n| in_degree[n] == 0).collect();
    let mut processed = 0;

    while let Some(node) = queue.pop_front() {
        processed += 1;
        for &succ in &successors[node] {
            layer[succ] = layer[succ].max(layer[node] + 1);
            in_degree[succ] -= 1;
            if in_degree[succ] == 0 {
                queue.push_back(succ);
            }
        }
    }

    if processed < node_count {
        warn!(
            "{} nodes left unlayered, the working graph still has a cycle",
            node_count - processed
        );
    }

    layer
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[test]
    fn chain_gets_consecutive_layers() {
        assert_eq!(assign_layers(3, &[(0, 1), (1, 2)]), vec![0, 1, 2]);
    }

    #[test]
    fn longest_path_wins() {
        // 0 -> 3 directly and through 1 -> 2
        let layers = assign_layers(4, &[(0, 3), (0, 1), (1, 2), (2, 3)]);
        assert_eq!(layers, vec![0, 1, 2, 3]);
    }

    #[test]
    fn sources_stay_on_top() {
        let layers = assign_layers(4, &[(0, 2), (1, 2), (2, 3)]);
        assert_eq!(layers, vec![0, 0, 1, 2]);
    }

    #[test]
    fn isolated_nodes_are_on_layer_zero() {
        assert_eq!(assign_layers(2, &[]), vec![0, 0]);
    }
}
