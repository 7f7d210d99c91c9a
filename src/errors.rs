//! Error types

use crate::float_types::Real;
use crate::node::{NodeIndex, PointIndex};
use crate::scene::FormationId;

/// Invariant violations reported by [`NodeBuffer::verify`](crate::node::NodeBuffer::verify).
///
/// None of these can happen under correct bookkeeping; they exist so tests and debug
/// builds can pinpoint which part of the node graph went wrong.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum VerifyError {
    /// (Partition) The quaterna boundaries are out of order
    #[error(
        "(Partition) quaterna boundaries out of order: sorted_end={sorted_end}, used_end={used_end}, target={target}, len={len}"
    )]
    Partition {
        sorted_end: usize,
        used_end: usize,
        target: usize,
        len: usize,
    },
    /// (NodeCount) The number of nodes in use is not four per used quaterna
    #[error("(NodeCount) {nodes} nodes in use but {quaterna} quaterna in use")]
    NodeCount { nodes: usize, quaterna: usize },
    /// (Unsorted) The sorted prefix of quaterna is not in descending score order
    #[error("(Unsorted) quaterna {index} scores {score} after {previous}")]
    Unsorted {
        index: usize,
        previous: Real,
        score: Real,
    },
    /// (QuaternaState) A quaterna's nodes disagree with its position in the array
    #[error("(QuaternaState) quaterna {index} disagrees with its nodes (expected in_use={in_use})")]
    QuaternaState { index: usize, in_use: bool },
    /// (Parentage) Parent and child pointers disagree
    #[error("(Parentage) node {0:?} and its parent disagree")]
    Parentage(NodeIndex),
    /// (AsymmetricCousin) A cousin link is not mutual
    #[error("(AsymmetricCousin) node {node:?} edge {edge} has a one-way cousin link")]
    AsymmetricCousin { node: NodeIndex, edge: usize },
    /// (MidPointMismatch) Two cousins disagree about the point on their shared edge
    #[error("(MidPointMismatch) node {node:?} edge {edge} disagrees with its cousin's mid-point")]
    MidPointMismatch { node: NodeIndex, edge: usize },
    /// (MissingCorner) A node in use lacks a corner
    #[error("(MissingCorner) node {node:?} has no corner {edge}")]
    MissingCorner { node: NodeIndex, edge: usize },
    /// (DeadPoint) A node references a point that has been returned to the pool
    #[error("(DeadPoint) node {node:?} references freed point {point:?}")]
    DeadPoint { node: NodeIndex, point: PointIndex },
    /// (PointLeak) Live points that no node references
    #[error("(PointLeak) {live} points live but only {referenced} referenced")]
    PointLeak { live: usize, referenced: usize },
    /// (Geometry) A node in use has a non-unit normal or no area
    #[error("(Geometry) node {0:?} has degenerate geometry")]
    Geometry(NodeIndex),
}

/// Recoverable errors outside the node graph itself.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FormationError {
    /// A formation with this id is already registered
    #[error("formation {0:?} is already present")]
    Duplicate(FormationId),
    /// Every root slot of the node buffer is taken
    #[error("no room for formation {id:?}: all {capacity} formation slots are in use")]
    Capacity { id: FormationId, capacity: usize },
    /// The formation worker's command queue is gone
    #[error("formation worker has disconnected")]
    Disconnected,
    /// The formation worker thread panicked
    #[error("formation worker panicked")]
    Panicked,
    /// The formation worker thread could not be started
    #[error("could not spawn formation worker: {0}")]
    Spawn(String),
}
