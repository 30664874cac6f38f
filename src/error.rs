//! Error type shared across the crate.

use crate::context::{NodeId, ParamSlot};
use thiserror::Error;

/// Everything that can go wrong when driving sounds or the audio graph.
///
/// Most scheduling mistakes are absorbed silently (missing ramp times default
/// to zero, stopping a stopped sound does nothing), so this enum only covers
/// the cases where carrying on would be meaningless.
#[derive(Debug, Clone, PartialEq, Error)]
#[non_exhaustive]
pub enum Error {
    /// An exponential ramp was asked to reach zero or a negative value.
    #[error("exponential ramps need a positive target, got {0}")]
    NonPositiveTarget(f64),

    /// The sound was disposed, either directly or through the context registry.
    #[error("sound has already been disposed")]
    Disposed,

    /// A handle points at a node that has been removed from the graph.
    #[error("audio node {0} no longer exists")]
    NodeNotFound(NodeId),

    /// A parameter handle names a parameter the node does not have.
    #[error("audio node {node} has no {slot:?} parameter")]
    NoSuchParam { node: NodeId, slot: ParamSlot },
}

/// Result alias used by every fallible operation in the crate.
pub type Result<T> = std::result::Result<T, Error>;
