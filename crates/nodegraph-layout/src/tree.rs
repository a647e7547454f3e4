use crate::sizes::sanitized_size;
use crate::{
    Forest, GraphModel, LayoutEngine, LayoutError, LayoutParameters, NodeHandle, NodeSizes, Point,
    PositionMap,
};
use tracing::{debug, trace};

/// Hierarchical placement by subtree width
///
/// A spanning tree is taken from the forest: every node hangs below the
/// first node that reaches it in pre-order. Each subtree gets a horizontal
/// span as wide as its children's spans (or the node itself, if wider), and
/// every parent is centered above its children.
///
/// Edges outside the spanning tree may point to a node at or above the
/// layer of their source. Such a node is moved down, with its subtree, below
/// the source, unless it is an ancestor of the source (a back edge).
#[derive(Debug, Clone, Default)]
pub struct SimpleTreeLayout {
    pub params: LayoutParameters,
}

impl SimpleTreeLayout {
    pub fn new(params: LayoutParameters) -> Self {
        Self { params }
    }
}

/// Spanning tree over forest indices
struct SpanningTree {
    parent: Vec<Option<usize>>,
    children: Vec<Vec<usize>>,
    roots: Vec<usize>,
    /// Parents before children
    preorder: Vec<usize>,
}

impl SpanningTree {
    fn new<N: NodeHandle>(forest: &Forest<N>) -> Self {
        let count = forest.len();
        let mut tree = Self {
            parent: vec![None; count],
            children: vec![Vec::new(); count],
            roots: Vec::new(),
            preorder: Vec::with_capacity(count),
        };
        let mut visited = vec![false; count];

        for root in forest.roots().iter().map(|id| id.index()) {
            if visited[root] {
                continue;
            }
            visited[root] = true;
            tree.roots.push(root);

            let mut stack = vec![root];
            while let Some(node) = stack.pop() {
                tree.preorder.push(node);
                for child in forest.nodes()[node].children() {
                    let child = child.index();
                    if !visited[child] {
                        visited[child] = true;
                        tree.parent[child] = Some(node);
                        tree.children[node].push(child);
                    }
                }
                stack.extend(tree.children[node].iter().rev());
            }
        }

        tree
    }

    fn is_ancestor(&self, ancestor: usize, mut node: usize) -> bool {
        while let Some(parent) = self.parent[node] {
            if parent == ancestor {
                return true;
            }
            node = parent;
        }
        false
    }

    fn descendants(&self, node: usize) -> Vec<usize> {
        let mut found = Vec::new();
        let mut stack = vec![node];
        while let Some(next) = stack.pop() {
            found.push(next);
            stack.extend(&self.children[next]);
        }
        found
    }
}

impl<N: NodeHandle> LayoutEngine<N> for SimpleTreeLayout {
    fn layout<S>(&self, graph: &GraphModel<N>, sizes: &S) -> Result<PositionMap<N>, LayoutError<N>>
    where
        S: NodeSizes<N>,
    {
        self.params.validate()?;
        if graph.node_count() < 2 {
            return Ok(PositionMap::new());
        }

        let forest = Forest::from_model(graph);
        let tree = SpanningTree::new(&forest);
        let spacing = self.params.node_spacing;

        let own_width: Vec<f32> = forest
            .nodes()
            .iter()
            .map(|node| sanitized_size(sizes, node.handle()).x)
            .collect();

        // Bottom-up: subtree widths
        let mut width = own_width.clone();
        for &node in tree.preorder.iter().rev() {
            let children = &tree.children[node];
            if children.is_empty() {
                continue;
            }
            let gaps = (children.len() - 1) as f32 * spacing;
            let span = children.iter().map(|&c| width[c]).sum::<f32>() + gaps;
            width[node] = own_width[node].max(span);
        }

        // Top-down: each node gets the span [left, left + width]
        let mut left = vec![0.0f32; forest.len()];
        let mut cursor = 0.0;
        for &root in &tree.roots {
            left[root] = cursor;
            cursor += width[root] + spacing;
        }
        let mut depth = vec![0usize; forest.len()];
        for &node in &tree.preorder {
            let children = &tree.children[node];
            let gaps = children.len().saturating_sub(1) as f32 * spacing;
            let span = children.iter().map(|&c| width[c]).sum::<f32>() + gaps;
            let mut child_left = left[node] + (width[node] - span) / 2.0;
            for &child in children {
                left[child] = child_left;
                depth[child] = depth[node] + 1;
                child_left += width[child] + spacing;
            }
        }

        push_below_sources(graph, &forest, &tree, &mut depth);

        debug!(
            "Tree layout of {} nodes, {} roots, {} layers",
            forest.len(),
            tree.roots.len(),
            depth.iter().max().map_or(0, |d| d + 1)
        );

        Ok(forest
            .nodes()
            .iter()
            .enumerate()
            .map(|(i, node)| {
                let x = left[i] + width[i] / 2.0;
                let y = depth[i] as f32 * self.params.layer_spacing;
                (node.handle(), Point::new(x, y))
            })
            .collect())
    }
}

/// Move subtrees down until no forward edge points at or above its source
///
/// Cycles made only of forward edges can keep pushing each other, so the
/// number of passes is bounded by the node count.
fn push_below_sources<N: NodeHandle>(
    graph: &GraphModel<N>,
    forest: &Forest<N>,
    tree: &SpanningTree,
    depth: &mut [usize],
) {
    let edges: Vec<(usize, usize)> = graph
        .edges()
        .filter_map(|edge| {
            let source = forest.id_of(edge.source)?.index();
            let target = forest.id_of(edge.target)?.index();
            let forward = source != target && !tree.is_ancestor(target, source);
            forward.then_some((source, target))
        })
        .collect();

    for pass in 0..forest.len() {
        let mut moved = false;
        for &(source, target) in &edges {
            if depth[target] > depth[source] {
                continue;
            }
            let shift = depth[source] + 1 - depth[target];
            for node in tree.descendants(target) {
                depth[node] += shift;
            }
            moved = true;
        }
        if !moved {
            trace!("Tree depths settled after {pass} passes");
            return;
        }
    }
    debug!("Tree depth adjustment stopped after {} passes", forest.len());
}
