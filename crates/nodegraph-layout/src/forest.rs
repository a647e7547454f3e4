//! Rooted, multi-parent trees extracted from an arbitrary edge list
//!
//! Cycles are not removed from the data. Instead one node per otherwise
//! unreachable cycle is declared a *cycle root*, so every node is reachable
//! from the root set by following `children`.

use crate::{Edge, GraphModel, NodeHandle};
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

/// Index of a [`TreeNode`] inside its [`Forest`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TreeId(usize);

impl TreeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// A node of the forest, possibly with several parents
#[derive(Debug, Clone)]
pub struct TreeNode<N> {
    handle: N,
    children: Vec<TreeId>,
    parents: Vec<TreeId>,
}

impl<N: Copy> TreeNode<N> {
    fn new(handle: N) -> Self {
        Self {
            handle,
            children: Vec::new(),
            parents: Vec::new(),
        }
    }

    pub fn handle(&self) -> N {
        self.handle
    }

    pub fn children(&self) -> &[TreeId] {
        &self.children
    }

    pub fn parents(&self) -> &[TreeId] {
        &self.parents
    }
}

/// Arena of tree nodes plus the selected roots
#[derive(Debug, Clone)]
pub struct Forest<N: NodeHandle> {
    nodes: Vec<TreeNode<N>>,
    index: HashMap<N, TreeId>,
    roots: Vec<TreeId>,
    cycle_roots: Vec<TreeId>,
    degenerate: bool,
}

/// Build a forest over the nodes referenced by `edges`
///
/// Always terminates and returns at least one root for a non-empty edge list.
pub fn build_forest<N, E>(edges: E) -> Forest<N>
where
    N: NodeHandle,
    E: IntoIterator,
    E::Item: Into<Edge<N>>,
{
    let mut forest = Forest::empty();
    for edge in edges {
        let edge = edge.into();
        forest.link(edge.source, edge.target);
    }
    forest.select_roots();
    forest
}

impl<N: NodeHandle> Forest<N> {
    fn empty() -> Self {
        Self {
            nodes: Vec::new(),
            index: HashMap::new(),
            roots: Vec::new(),
            cycle_roots: Vec::new(),
            degenerate: false,
        }
    }

    /// Build a forest over every node of the model, isolated nodes included
    pub fn from_model(model: &GraphModel<N>) -> Self {
        let mut forest = Self::empty();
        for node in model.all_nodes() {
            forest.intern(node);
        }
        for edge in model.edges() {
            forest.link(edge.source, edge.target);
        }
        forest.select_roots();
        forest
    }

    fn intern(&mut self, handle: N) -> TreeId {
        if let Some(&id) = self.index.get(&handle) {
            return id;
        }
        let id = TreeId(self.nodes.len());
        self.nodes.push(TreeNode::new(handle));
        self.index.insert(handle, id);
        id
    }

    fn link(&mut self, source: N, target: N) {
        let s = self.intern(source);
        let t = self.intern(target);
        if !self.nodes[s.0].children.contains(&t) {
            self.nodes[s.0].children.push(t);
        }
        if !self.nodes[t.0].parents.contains(&s) {
            self.nodes[t.0].parents.push(s);
        }
    }

    fn select_roots(&mut self) {
        self.roots = (0..self.nodes.len())
            .map(TreeId)
            .filter(|&id| self.nodes[id.0].parents.is_empty())
            .collect();

        let mut reached = vec![false; self.nodes.len()];
        for &root in &self.roots {
            self.mark_descendants(root, &mut reached);
        }

        // Every node still unreached sits below a cycle with no parent-less
        // ancestor. Walking up its parents must close a loop, and the node
        // closing it is an ancestor of the start node.
        for start in 0..self.nodes.len() {
            if reached[start] {
                continue;
            }
            let entry = self.find_cycle_entry(TreeId(start)).unwrap_or(TreeId(start));
            debug!(
                "Cycle root {:?} covers {:?}",
                self.nodes[entry.0].handle, self.nodes[start].handle
            );
            self.cycle_roots.push(entry);
            self.roots.push(entry);
            self.mark_descendants(entry, &mut reached);
        }

        if self.roots.is_empty() && !self.nodes.is_empty() {
            let max_degree = self
                .nodes
                .iter()
                .map(|node| node.children.len())
                .max()
                .unwrap_or(0);
            self.roots = (0..self.nodes.len())
                .map(TreeId)
                .filter(|&id| self.nodes[id.0].children.len() == max_degree)
                .collect();
            self.degenerate = true;
            warn!(
                "No root found among {} nodes, falling back to {} max out-degree nodes",
                self.nodes.len(),
                self.roots.len()
            );
        }
    }

    /// Depth-first walk over `parents` with an explicit stack, returning the
    /// first node met that is already on the stack
    fn find_cycle_entry(&self, start: TreeId) -> Option<TreeId> {
        let mut stack = vec![(start, 0usize)];
        let mut in_stack = HashSet::from([start]);
        let mut visited = HashSet::from([start]);

        while let Some((id, next)) = stack.last_mut() {
            let parents = &self.nodes[id.0].parents;
            if *next < parents.len() {
                let parent = parents[*next];
                *next += 1;
                if in_stack.contains(&parent) {
                    return Some(parent);
                }
                if visited.insert(parent) {
                    in_stack.insert(parent);
                    stack.push((parent, 0));
                }
            } else {
                let id = *id;
                stack.pop();
                in_stack.remove(&id);
            }
        }

        None
    }

    fn mark_descendants(&self, from: TreeId, reached: &mut [bool]) {
        if reached[from.0] {
            return;
        }
        reached[from.0] = true;
        let mut stack = vec![from];
        while let Some(id) = stack.pop() {
            for &child in &self.nodes[id.0].children {
                if !reached[child.0] {
                    reached[child.0] = true;
                    stack.push(child);
                }
            }
        }
    }

    /// Roots in selection order: parent-less nodes first, then cycle roots
    pub fn roots(&self) -> &[TreeId] {
        &self.roots
    }

    /// Handles of the roots, in the same order as [`Forest::roots`]
    pub fn root_handles(&self) -> Vec<N> {
        self.roots.iter().map(|&id| self.nodes[id.0].handle).collect()
    }

    /// Roots that were declared to break a cycle
    pub fn cycle_roots(&self) -> &[TreeId] {
        &self.cycle_roots
    }

    /// True if roots came from the max out-degree fallback
    pub fn is_degenerate(&self) -> bool {
        self.degenerate
    }

    pub fn get(&self, id: TreeId) -> &TreeNode<N> {
        &self.nodes[id.0]
    }

    pub fn id_of(&self, handle: N) -> Option<TreeId> {
        self.index.get(&handle).copied()
    }

    pub fn nodes(&self) -> &[TreeNode<N>] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Pre-order walk from the roots, visiting every reachable node once
    pub fn preorder(&self) -> Vec<TreeId> {
        let mut visited = vec![false; self.nodes.len()];
        let mut order = Vec::with_capacity(self.nodes.len());

        for &root in &self.roots {
            if visited[root.0] {
                continue;
            }
            visited[root.0] = true;
            let mut stack = vec![root];
            while let Some(id) = stack.pop() {
                order.push(id);
                // Reverse so that the first child is visited first
                for &child in self.nodes[id.0].children.iter().rev() {
                    if !visited[child.0] {
                        visited[child.0] = true;
                        stack.push(child);
                    }
                }
            }
        }

        order
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    fn assert_total<N: NodeHandle>(forest: &Forest<N>) {
        let visited = forest.preorder();
        assert_eq!(visited.len(), forest.len(), "orphan outside the forest");
        let unique: HashSet<_> = visited.iter().collect();
        assert_eq!(unique.len(), visited.len());
    }

    #[test]
    fn chain_has_single_root() {
        let forest = build_forest([('A', 'B'), ('B', 'C')]);
        assert_eq!(forest.root_handles(), vec!['A']);
        assert!(forest.cycle_roots().is_empty());
        assert!(!forest.is_degenerate());
    }

    #[test]
    fn two_cycle_has_exactly_one_root() {
        let forest = build_forest([('A', 'B'), ('B', 'A')]);
        let roots = forest.root_handles();
        assert_eq!(roots.len(), 1);
        assert!(roots[0] == 'A' || roots[0] == 'B');
        assert_eq!(forest.cycle_roots().len(), 1);
        assert_total(&forest);
    }

    #[test]
    fn self_loop_becomes_cycle_root() {
        let forest = build_forest([(1, 1)]);
        assert_eq!(forest.root_handles(), vec![1]);
        assert_total(&forest);
    }

    #[test]
    fn parallel_edges_collapse_to_one_tree_edge() {
        let forest = build_forest([(1, 2), (1, 2), (1, 2)]);
        let one = forest.get(forest.id_of(1).unwrap());
        let two = forest.get(forest.id_of(2).unwrap());
        assert_eq!(one.children().len(), 1);
        assert_eq!(two.parents().len(), 1);
    }

    #[test]
    fn multiple_parents_are_kept() {
        let forest = build_forest([('a', 'c'), ('b', 'c')]);
        let c = forest.get(forest.id_of('c').unwrap());
        assert_eq!(c.parents().len(), 2);
        assert_eq!(forest.root_handles(), vec!['a', 'b']);
    }

    #[test]
    fn cycle_below_a_root_needs_no_cycle_root() {
        let forest = build_forest([(0, 1), (1, 2), (2, 3), (3, 1)]);
        assert_eq!(forest.root_handles(), vec![0]);
        assert!(forest.cycle_roots().is_empty());
        assert_total(&forest);
    }

    #[test]
    fn cycle_feeding_a_tail_is_covered() {
        // 1 <-> 2 is a closed source cycle, 3 and 4 hang below it, and a
        // separate root 0 points into the tail only
        let forest = build_forest([(1, 2), (2, 1), (2, 3), (3, 4), (0, 4)]);
        assert_total(&forest);
        assert_eq!(forest.cycle_roots().len(), 1);
        let cycle_root = forest.get(forest.cycle_roots()[0]).handle();
        assert!(cycle_root == 1 || cycle_root == 2);
    }

    #[test]
    fn every_node_reachable_from_roots() {
        // A ring of rings with cross links, no parent-less node anywhere
        let mut edges = Vec::new();
        for ring in 0..5u32 {
            for i in 0..4u32 {
                edges.push((ring * 10 + i, ring * 10 + (i + 1) % 4));
            }
            edges.push((ring * 10, ((ring + 1) % 5) * 10 + 2));
        }
        let forest = build_forest(edges);
        assert!(!forest.roots().is_empty());
        assert_total(&forest);
    }

    #[test]
    fn isolated_nodes_from_model_are_roots() {
        let model = GraphModel::build([1, 2, 3], [(1, 2)]).unwrap();
        let forest = Forest::from_model(&model);
        assert_eq!(forest.root_handles(), vec![1, 3]);
        assert_total(&forest);
    }

    #[test]
    fn empty_input_has_no_roots() {
        let forest = build_forest(Vec::<(u8, u8)>::new());
        assert!(forest.is_empty());
        assert!(forest.roots().is_empty());
    }
}
