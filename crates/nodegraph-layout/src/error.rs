use std::fmt;
use thiserror::Error;

/// Errors that can occur while building a graph model or computing a layout
///
/// An empty graph is not an error: every engine returns an empty position
/// map for it. Nodes that disappear before write-back are counted by
/// [`ApplyReport`](crate::ApplyReport), not reported here.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LayoutError<N>
where
    N: fmt::Debug,
{
    /// An edge references a node missing from the declared node set
    #[error("edge references unknown node {node:?}")]
    UnknownNode { node: N },

    /// A layout parameter is out of its accepted range
    #[error(transparent)]
    InvalidParameter(#[from] ParameterError),
}

/// A [`LayoutParameters`](crate::LayoutParameters) field failed validation
#[derive(Debug, Clone, PartialEq, Error)]
#[error("invalid layout parameter `{name}`: {reason}")]
pub struct ParameterError {
    pub name: &'static str,
    pub reason: String,
}
