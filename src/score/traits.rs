//! Traits defining the rescoring pass for dependency inversion

use crate::float_types::Real;
use crate::node::Node;
use crate::score::NodeScorer;

/// Rescores nodes in bulk.
pub trait ScoreOps {
    /// Writes the score of every node in `nodes` to the matching slot of `scores`.
    ///
    /// `nodes` is a whole number of quaterna blocks and `scores` is as long as `nodes`.
    /// A block whose first node is not in use keeps its current scores; scores of separate
    /// nodes are independent so any order is valid. `nodes` is only read, so the pass can
    /// run while others read the same buffer.
    fn score_nodes(&self, scorer: &NodeScorer, nodes: &[Node], scores: &mut [Real]);
}
