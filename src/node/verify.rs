//! Full consistency check of a [`NodeBuffer`].

use crate::errors::VerifyError;
use crate::node::buffer::NodeBuffer;
use crate::node::node::{Node, NodeIndex};
use crate::node::point::PointIndex;
use hashbrown::HashSet;

impl NodeBuffer {
    /// Walks the whole buffer and reports the first broken invariant.
    ///
    /// This is O(nodes) and allocates; it is meant for tests and debugging, not for
    /// every tick.
    pub fn verify(&self) -> Result<(), VerifyError> {
        self.verify_quaterna()?;
        let referenced = self.verify_nodes()?;

        let live = self.points.len();
        if live != referenced.len() {
            return Err(VerifyError::PointLeak {
                live,
                referenced: referenced.len(),
            });
        }
        Ok(())
    }

    fn verify_quaterna(&self) -> Result<(), VerifyError> {
        let (sorted_end, used_end, target, len) =
            (self.sorted_end, self.used_end, self.used_end_target, self.quaterna.len());
        if !(sorted_end <= used_end && used_end <= target && target <= len) {
            return Err(VerifyError::Partition {
                sorted_end,
                used_end,
                target,
                len,
            });
        }

        for (index, pair) in self.quaterna[..sorted_end].windows(2).enumerate() {
            if pair[1].parent_score > pair[0].parent_score {
                return Err(VerifyError::Unsorted {
                    index: index + 1,
                    previous: pair[0].parent_score,
                    score: pair[1].parent_score,
                });
            }
        }

        for index in 0..len {
            let in_use = index < used_end;
            if self.is_quaterna_in_use(index) != in_use {
                return Err(VerifyError::QuaternaState { index, in_use });
            }

            let nodes = self.quaterna[index].node_indices();
            if nodes.iter().any(|&n| self.node(n).is_in_use() != in_use) {
                return Err(VerifyError::QuaternaState { index, in_use });
            }
        }

        let nodes = self.nodes[self.max_roots..].iter().filter(|n| n.is_in_use()).count();
        if nodes != used_end * 4 {
            return Err(VerifyError::NodeCount {
                nodes,
                quaterna: used_end,
            });
        }
        Ok(())
    }

    /// Checks every live node and returns the set of points they reference.
    fn verify_nodes(&self) -> Result<HashSet<PointIndex>, VerifyError> {
        let mut referenced = HashSet::new();

        let roots = (0..self.max_roots)
            .map(NodeIndex::from_usize)
            .filter(|&r| self.node(r).has_all_cousins());
        let children = self.used_quaterna().iter().flat_map(|q| q.node_indices());

        for index in roots.chain(children) {
            let node = self.node(index);
            self.verify_links(index, node)?;

            for (edge, t) in node.triple.iter().enumerate() {
                let corner = t.corner.ok_or(VerifyError::MissingCorner { node: index, edge })?;
                for point in std::iter::once(corner).chain(t.mid_point) {
                    if !self.points.is_live(point) {
                        return Err(VerifyError::DeadPoint { node: index, point });
                    }
                    referenced.insert(point);
                }
            }

            if !self.is_root(index) && !Self::has_sound_geometry(node) {
                return Err(VerifyError::Geometry(index));
            }
        }

        Ok(referenced)
    }

    fn verify_links(&self, index: NodeIndex, node: &Node) -> Result<(), VerifyError> {
        if let Some(parent) = node.parent {
            let Some(siblings) = self.node(parent).children else {
                return Err(VerifyError::Parentage(index));
            };
            if index.index() < siblings.index() || index.index() >= siblings.index() + 4 {
                return Err(VerifyError::Parentage(index));
            }
        } else if !self.is_root(index) {
            return Err(VerifyError::Parentage(index));
        }

        if let Some(children) = node.children {
            if (0..4).any(|n| self.node(children.offset(n)).parent != Some(index)) {
                return Err(VerifyError::Parentage(index));
            }
        }

        for (edge, t) in node.triple.iter().enumerate() {
            let Some(cousin) = t.cousin else {
                continue;
            };
            let mirror = &self.node(cousin).triple[edge];
            if mirror.cousin != Some(index) {
                return Err(VerifyError::AsymmetricCousin { node: index, edge });
            }
            if mirror.mid_point != t.mid_point {
                return Err(VerifyError::MidPointMismatch { node: index, edge });
            }
        }
        Ok(())
    }

    fn has_sound_geometry(node: &Node) -> bool {
        node.area > 0.0 && (node.normal.norm_squared() - 1.0).abs() < 1e-3
    }
}
