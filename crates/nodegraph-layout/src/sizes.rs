use crate::Vec2;
use std::collections::HashMap;
use std::hash::Hash;

/// Trait for providing node sizes during layout computation
///
/// Sizes are read-only from the engines' point of view. Implementations
/// should return non-negative, finite dimensions; anything else is treated
/// as zero.
pub trait NodeSizes<N> {
    /// Get the size of a node
    fn size(&self, node: N) -> Vec2;
}

// Blanket implementation for closures
impl<N, F> NodeSizes<N> for F
where
    F: Fn(N) -> Vec2,
{
    fn size(&self, node: N) -> Vec2 {
        self(node)
    }
}

// Implementation for HashMap
impl<N: Eq + Hash + Copy> NodeSizes<N> for HashMap<N, Vec2> {
    fn size(&self, node: N) -> Vec2 {
        self.get(&node).copied().unwrap_or(Vec2::zero())
    }
}

/// Every node has the same size
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UniformSize(pub Vec2);

impl<N> NodeSizes<N> for UniformSize {
    fn size(&self, _node: N) -> Vec2 {
        self.0
    }
}

/// Read a size and replace negative or non-finite components by zero
pub(crate) fn sanitized_size<N, S>(sizes: &S, node: N) -> Vec2
where
    S: NodeSizes<N> + ?Sized,
{
    let size = sizes.size(node);
    let clean = |v: f32| if v.is_finite() && v > 0.0 { v } else { 0.0 };
    Vec2::new(clean(size.x), clean(size.y))
}
