//! Parallel implementation of the rescoring pass

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::float_types::Real;
use crate::node::Node;
use crate::score::{NodeScorer, ScoreOps};

/// Parallel implementation of the rescoring pass
#[cfg(feature = "parallel")]
#[derive(Debug, Clone, Copy)]
pub struct ParallelScoreOps {
    min_blocks_per_task: usize,
}

#[cfg(feature = "parallel")]
impl ParallelScoreOps {
    pub const fn new() -> Self {
        Self::with_min_blocks_per_task(256)
    }

    /// Fewer blocks than this are never split off into their own task.
    pub const fn with_min_blocks_per_task(min_blocks_per_task: usize) -> Self {
        Self {
            min_blocks_per_task,
        }
    }
}

#[cfg(feature = "parallel")]
impl Default for ParallelScoreOps {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "parallel")]
impl ScoreOps for ParallelScoreOps {
    fn score_nodes(&self, scorer: &NodeScorer, nodes: &[Node], scores: &mut [Real]) {
        nodes
            .par_chunks(4)
            .zip(scores.par_chunks_mut(4))
            .with_min_len(self.min_blocks_per_task)
            .for_each(|(block, block_scores)| {
                let in_use = block[0].is_in_use();
                for (node, score) in block.iter().zip(block_scores) {
                    *score = if in_use { scorer.score(node) } else { node.score };
                }
            });
    }
}
