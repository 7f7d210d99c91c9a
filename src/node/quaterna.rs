use crate::float_types::Real;
use crate::node::node::NodeIndex;

/// A block of four sibling nodes, the unit of allocation and recycling.
///
/// Every quaterna owns the same block of the node arena for the buffer's whole lifetime;
/// only its position in the quaterna array moves. A quaterna is in use iff its nodes have
/// a parent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quaterna {
    /// First of the four nodes.
    pub nodes: NodeIndex,
    /// Cached score of the parent, used as the sort key.
    pub parent_score: Real,
}

impl Quaterna {
    /// `parent_score` of a quaterna that is not in use.
    pub const UNUSED_SCORE: Real = -1.0;

    pub const fn new(nodes: NodeIndex) -> Self {
        Self {
            nodes,
            parent_score: Self::UNUSED_SCORE,
        }
    }

    #[inline]
    pub const fn node_indices(&self) -> [NodeIndex; 4] {
        let first = self.nodes;
        [first, first.offset(1), first.offset(2), first.offset(3)]
    }

    #[inline]
    pub fn contains(&self, node: NodeIndex) -> bool {
        (self.nodes.index()..self.nodes.index() + 4).contains(&node.index())
    }
}
