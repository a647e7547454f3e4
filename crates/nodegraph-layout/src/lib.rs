//! Automatic layout of node graphs
//!
//! This crate computes 2D positions for the nodes of a directed graph with
//! arbitrary node handles. Nodes are described by a [`GraphModel`], sizes are
//! provided through [`NodeSizes`], and engines return a [`PositionMap`] of
//! node centers. Writing positions back onto the caller's nodes is a
//! separate step through [`apply_positions`].
//!
//! # Layout Engines
//!
//! - [`LayeredLayout`]: Sugiyama-style layered layout, cycles allowed
//! - [`MultiscaleLayout`]: force-directed layout over a coarsening hierarchy
//! - [`SimpleTreeLayout`]: subtree-width tree placement
//! - [`GridLayout`], [`RadialLayout`]: simple deterministic placements
//!
//! # Example
//!
//! ```
//! use nodegraph_layout::{
//!     apply_positions, GraphModel, LayeredLayout, LayoutEngine, LayoutParameters, Point, Vec2,
//! };
//! use std::collections::HashMap;
//!
//! // Describe the graph
//! let graph = GraphModel::from_edges([(1, 2), (2, 3), (3, 1)]);
//!
//! // Create a layout engine
//! let engine = LayeredLayout::new(LayoutParameters::default().with_layer_spacing(100.0));
//!
//! // Provide node sizes
//! let sizes = |_node: i32| Vec2::new(100.0, 50.0);
//!
//! // Use the LayoutEngine trait (simple, single-phase):
//! let positions = engine.layout(&graph, &sizes).unwrap();
//!
//! // Or directly by calling each step for better control
//! let layers = engine.compute_layers(&graph).unwrap();
//! let positions = engine.compute_positions(&layers, &sizes);
//!
//! // Write the positions back
//! let mut placed: HashMap<i32, Point> = HashMap::new();
//! let report = apply_positions(&positions, &mut placed);
//! assert_eq!(report.written, 3);
//! ```

mod apply;
mod engine;
mod error;
mod forest;
mod geometry;
mod graph;
mod params;
mod sizes;

pub mod force;
pub mod grid;
pub mod layered;
pub mod tree;

// Re-export core types and traits
pub use apply::{apply_positions, ApplyReport, LayoutTarget, PositionMap};
pub use engine::LayoutEngine;
pub use error::{LayoutError, ParameterError};
pub use forest::{build_forest, Forest, TreeId, TreeNode};
pub use geometry::{Point, Vec2};
pub use graph::{Edge, GraphModel, NodeHandle};
pub use params::LayoutParameters;
pub use sizes::{NodeSizes, UniformSize};

// Re-export petgraph visitor traits for graph abstraction
pub use petgraph::visit::{GraphBase, IntoNeighborsDirected, IntoNodeIdentifiers};
pub use petgraph::Direction;

// Re-export layout engines
pub use force::{multiscale_layout, MultiscaleLayout};
pub use grid::{GridLayout, RadialLayout};
pub use layered::{layered_layout, EdgeRoute, LayeredLayout, LayeredNode, Layers};
pub use tree::SimpleTreeLayout;
