use super::cycles::WorkingEdge;
use super::{EdgeChain, LayeredNode};
use crate::NodeHandle;
use std::collections::HashMap;

/// Split every edge spanning more than one layer into single-layer hops
///
/// One dummy node is created per intermediate layer. The returned chains
/// list, for each working edge, the arena indices it passes through from the
/// upper endpoint to the lower one. Afterwards every `outgoing` link in
/// `nodes` spans exactly one layer.
pub(crate) fn insert_dummies<N: NodeHandle>(
    nodes: &mut Vec<LayeredNode<N>>,
    edges: &[WorkingEdge<N>],
    index: &HashMap<N, usize>,
) -> Vec<EdgeChain<N>> {
    let mut chains = Vec::with_capacity(edges.len());

    for edge in edges {
        let (Some(&upper), Some(&lower)) = (index.get(&edge.source), index.get(&edge.target)) else {
            continue;
        };

        let mut path = vec![upper];
        let mut previous = upper;
        for layer in nodes[upper].layer + 1..nodes[lower].layer {
            let dummy = nodes.len();
            nodes.push(LayeredNode::dummy(layer));
            link(nodes, previous, dummy);
            path.push(dummy);
            previous = dummy;
        }
        link(nodes, previous, lower);
        path.push(lower);

        let (source, target) = if edge.reversed {
            (edge.target, edge.source)
        } else {
            (edge.source, edge.target)
        };
        chains.push(EdgeChain {
            source,
            target,
            reversed: edge.reversed,
            path,
        });
    }

    chains
}

fn link<N>(nodes: &mut [LayeredNode<N>], from: usize, to: usize) {
    nodes[from].outgoing.push(to);
    nodes[to].incoming.push(from);
}
