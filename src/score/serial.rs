//! Serial implementation of the rescoring pass

use crate::float_types::Real;
use crate::node::Node;
use crate::score::{NodeScorer, ScoreOps};

/// Serial implementation of the rescoring pass
#[derive(Debug, Clone, Copy, Default)]
pub struct SerialScoreOps;

impl SerialScoreOps {
    pub const fn new() -> Self {
        Self
    }
}

impl ScoreOps for SerialScoreOps {
    fn score_nodes(&self, scorer: &NodeScorer, nodes: &[Node], scores: &mut [Real]) {
        for (block, block_scores) in nodes.chunks(4).zip(scores.chunks_mut(4)) {
            let in_use = block[0].is_in_use();
            for (node, score) in block.iter().zip(block_scores) {
                *score = if in_use { scorer.score(node) } else { node.score };
            }
        }
    }
}
