use crate::{GraphModel, NodeHandle};
use std::collections::HashSet;

/// Edge of the acyclic working graph
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct WorkingEdge<N> {
    pub source: N,
    pub target: N,
    /// The original edge pointed from `target` to `source`
    pub reversed: bool,
}

/// Make the graph acyclic by logically reversing every DFS back edge
///
/// The DFS starts from `start_order` first, then from any node it has not
/// reached yet. Self-loops are dropped. The model itself is left untouched.
pub(crate) fn remove_cycles<N: NodeHandle>(
    graph: &GraphModel<N>,
    start_order: &[N],
) -> Vec<WorkingEdge<N>> {
    let back_edges = find_back_edges(graph, start_order);

    graph
        .edges()
        .filter(|edge| edge.source != edge.target)
        .map(|edge| {
            if back_edges.contains(&(edge.source, edge.target)) {
                WorkingEdge {
                    source: edge.target,
                    target: edge.source,
                    reversed: true,
                }
            } else {
                WorkingEdge {
                    source: edge.source,
                    target: edge.target,
                    reversed: false,
                }
            }
        })
        .collect()
}

fn find_back_edges<N: NodeHandle>(graph: &GraphModel<N>, start_order: &[N]) -> HashSet<(N, N)> {
    let mut visited = HashSet::new();
    let mut in_stack = HashSet::new();
    let mut back_edges = HashSet::new();

    let all_nodes: Vec<N> = graph.all_nodes().collect();
    for start in start_order.iter().chain(all_nodes.iter()).copied() {
        if !graph.contains_node(start) || !visited.insert(start) {
            continue;
        }

        in_stack.insert(start);
        let mut stack = vec![(start, graph.neighbors_out(start).collect::<Vec<_>>(), 0usize)];

        while let Some((node, successors, next)) = stack.last_mut() {
            let node = *node;
            if *next < successors.len() {
                let succ = successors[*next];
                *next += 1;

                if succ == node {
                    continue;
                }
                if in_stack.contains(&succ) {
                    back_edges.insert((node, succ));
                } else if visited.insert(succ) {
                    in_stack.insert(succ);
                    stack.push((succ, graph.neighbors_out(succ).collect(), 0));
                }
            } else {
                stack.pop();
                in_stack.remove(&node);
            }
        }
    }

    back_edges
}

#[cfg(test)]
mod tests {
    use super::*;
    use petgraph::algo::toposort;
    use petgraph::graphmap::DiGraphMap;
    use test_log::test;

    fn is_acyclic(edges: &[WorkingEdge<u32>]) -> bool {
        let graph = DiGraphMap::<u32, ()>::from_edges(edges.iter().map(|e| (e.source, e.target)));
        toposort(&graph, None).is_ok()
    }

    #[test]
    fn reverses_back_edge_of_a_triangle() {
        let model = GraphModel::from_edges([(0, 1), (1, 2), (2, 0)]);
        let edges = remove_cycles(&model, &[0]);

        assert_eq!(edges.len(), 3);
        let reversed: Vec<_> = edges.iter().filter(|e| e.reversed).collect();
        assert_eq!(reversed.len(), 1);
        assert_eq!((reversed[0].source, reversed[0].target), (0, 2));
        assert!(is_acyclic(&edges));
    }

    #[test]
    fn keeps_dag_untouched() {
        let model = GraphModel::from_edges([(0, 1), (0, 2), (1, 3), (2, 3)]);
        let edges = remove_cycles(&model, &[0]);
        assert!(edges.iter().all(|e| !e.reversed));
    }

    #[test]
    fn drops_self_loops() {
        let model = GraphModel::from_edges([(0, 0), (0, 1)]);
        let edges = remove_cycles(&model, &[0]);
        assert_eq!(edges.len(), 1);
        assert_eq!((edges[0].source, edges[0].target), (0, 1));
    }

    #[test]
    fn dense_cyclic_graph_becomes_acyclic() {
        let mut raw = Vec::new();
        for a in 0..8u32 {
            for b in 0..8u32 {
                if (a * 3 + b * 5) % 4 == 0 && a != b {
                    raw.push((a, b));
                }
            }
        }
        let model = GraphModel::from_edges(raw);
        let edges = remove_cycles(&model, &[]);
        assert!(is_acyclic(&edges));
    }
}
