use crate::{NodeHandle, Point};
use std::collections::HashMap;
use std::hash::Hash;
use tracing::debug;

/// Computed node centers, keyed by node handle
pub type PositionMap<N> = HashMap<N, Point>;

/// Destination of computed positions
///
/// Handles may become invalid between layout computation and write-back,
/// e.g. when the caller destroyed the underlying node. Such nodes are skipped.
pub trait LayoutTarget<N> {
    /// Whether `node` can still receive a position
    fn is_valid(&self, _node: N) -> bool {
        true
    }

    fn set_position(&mut self, node: N, position: Point);
}

// Blanket implementation for closures
impl<N, F> LayoutTarget<N> for F
where
    F: FnMut(N, Point),
{
    fn set_position(&mut self, node: N, position: Point) {
        self(node, position)
    }
}

impl<N: Eq + Hash> LayoutTarget<N> for HashMap<N, Point> {
    fn set_position(&mut self, node: N, position: Point) {
        self.insert(node, position);
    }
}

/// Outcome of [`apply_positions`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplyReport {
    /// Positions written
    pub written: usize,
    /// Nodes skipped because their handle was no longer valid
    pub skipped: usize,
}

/// Write computed positions onto the caller's nodes
///
/// Invalid handles never abort the write-back of the remaining nodes.
/// Applying the same map twice yields the same node state.
pub fn apply_positions<N, T>(positions: &PositionMap<N>, target: &mut T) -> ApplyReport
where
    N: NodeHandle,
    T: LayoutTarget<N> + ?Sized,
{
    // Sorted so that targets observe a stable write order
    let mut entries: Vec<_> = positions.iter().map(|(&node, &pos)| (node, pos)).collect();
    entries.sort_by_key(|&(node, _)| node);

    let mut report = ApplyReport::default();
    for (node, position) in entries {
        if target.is_valid(node) {
            target.set_position(node, position);
            report.written += 1;
        } else {
            debug!("Skipping invalid node {node:?}");
            report.skipped += 1;
        }
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use test_log::test;

    struct Scene {
        alive: HashSet<u32>,
        positions: HashMap<u32, Point>,
    }

    impl LayoutTarget<u32> for Scene {
        fn is_valid(&self, node: u32) -> bool {
            self.alive.contains(&node)
        }

        fn set_position(&mut self, node: u32, position: Point) {
            self.positions.insert(node, position);
        }
    }

    #[test]
    fn invalid_handles_are_skipped() {
        let positions: PositionMap<u32> = (0..4)
            .map(|n| (n, Point::new(n as f32, 0.0)))
            .collect();
        let mut scene = Scene {
            alive: HashSet::from([0, 1, 3]),
            positions: HashMap::new(),
        };

        let report = apply_positions(&positions, &mut scene);

        assert_eq!(report, ApplyReport { written: 3, skipped: 1 });
        assert_eq!(scene.positions.len(), 3);
        assert!(!scene.positions.contains_key(&2));
        assert_eq!(scene.positions[&3], Point::new(3.0, 0.0));
    }

    #[test]
    fn closures_receive_positions_in_handle_order() {
        let positions: PositionMap<char> = [('b', Point::origin()), ('a', Point::origin())]
            .into_iter()
            .collect();
        let mut seen = Vec::new();
        apply_positions(&positions, &mut |node: char, _: Point| seen.push(node));
        assert_eq!(seen, vec!['a', 'b']);
    }
}
