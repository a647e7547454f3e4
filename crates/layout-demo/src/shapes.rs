use clap::ValueEnum;
use nodegraph_layout::{Edge, GraphModel};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Synthetic graph families
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Shape {
    /// 0 -> 1 -> ... -> n-1
    Chain,
    /// A chain closed back onto its first node
    Cycle,
    /// Binary tree in heap order
    Tree,
    /// Square lattice with right and down edges
    Grid,
    /// Random edges, about two per node
    Random,
}

impl Shape {
    /// Build a graph of `nodes` nodes, labelled `0..nodes`
    pub fn build(self, nodes: u32, seed: u64) -> GraphModel<u32> {
        let edges: Vec<Edge<u32>> = match self {
            Shape::Chain => (1..nodes).map(|i| Edge::new(i - 1, i)).collect(),
            Shape::Cycle => (0..nodes).map(|i| Edge::new(i, (i + 1) % nodes)).collect(),
            Shape::Tree => (1..nodes).map(|i| Edge::new((i - 1) / 2, i)).collect(),
            Shape::Grid => {
                let side = (nodes as f32).sqrt().ceil().max(1.0) as u32;
                let mut edges = Vec::new();
                for i in 0..nodes {
                    if (i + 1) % side != 0 && i + 1 < nodes {
                        edges.push(Edge::new(i, i + 1));
                    }
                    if i + side < nodes {
                        edges.push(Edge::new(i, i + side));
                    }
                }
                edges
            }
            Shape::Random => {
                let mut rng = StdRng::seed_from_u64(seed);
                (0..nodes * 2)
                    .map(|_| Edge::new(rng.gen_range(0..nodes), rng.gen_range(0..nodes)))
                    .collect()
            }
        };

        let mut graph = GraphModel::from_edges(edges);
        for node in 0..nodes {
            graph.add_node(node);
        }
        graph
    }
}
