//! Expansion and collapse of nodes.

use crate::float_types::Real;
use crate::geometry::tri_mod;
use crate::node::buffer::NodeBuffer;
use crate::node::node::{Node, NodeIndex};
use crate::shader::{Shader, ShaderSource};
use log::{trace, warn};
use nalgebra::Point3;

/// An expansion worked out against the buffer as it is, ready to commit.
///
/// Preparing only reads the buffer and runs the shader; committing does the writes. The
/// plan is only valid until the buffer next changes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Expansion {
    node: NodeIndex,
    quaterna: usize,
    mid_points: [Option<Point3<Real>>; 3],
}

impl Expansion {
    pub const fn node(&self) -> NodeIndex {
        self.node
    }
}

impl NodeBuffer {
    /// Gives `node` four children.
    ///
    /// While the buffer is below its target the next unused quaterna is taken. Otherwise
    /// the lowest-scoring recyclable quaterna is taken, provided its parent scores strictly
    /// worse than `node` and it holds neither `node` nor any of its cousins. Returns false,
    /// changing nothing but possibly sharing new mid-points, when no quaterna qualifies or
    /// the children would be degenerate.
    pub fn expand_node(&mut self, node: NodeIndex, shaders: &dyn ShaderSource) -> bool {
        match self.prepare_expansion(node, shaders) {
            Some(expansion) => self.commit_expansion(&expansion),
            None => false,
        }
    }

    /// Picks the quaterna `node` would expand into and places its missing mid-points.
    pub fn prepare_expansion(&self, node: NodeIndex, shaders: &dyn ShaderSource) -> Option<Expansion> {
        debug_assert!(self.node(node).is_expandable());

        let quaterna = if self.is_growing() {
            self.used_end
        } else {
            self.find_replaceable_quaterna(node)?
        };

        let root = self.root_of(node);
        let Some(shader) = shaders.shader(root) else {
            warn!("no shader for root {root:?}");
            return None;
        };

        Some(Expansion {
            node,
            quaterna,
            mid_points: self.place_mid_points(node, shader)?,
        })
    }

    /// Carries out a prepared expansion. Nothing may have changed the buffer since
    /// [`prepare_expansion`](Self::prepare_expansion).
    pub fn commit_expansion(&mut self, expansion: &Expansion) -> bool {
        let Expansion { node, quaterna: q, .. } = *expansion;
        debug_assert!(self.node(node).is_expandable());
        debug_assert!(q == self.used_end || q < self.sorted_end);

        if !self.create_mid_points(node, &expansion.mid_points) {
            return false;
        }
        if !self.expand_into(node, q) {
            return false;
        }

        if q == self.used_end {
            self.used_end += 1;
        } else {
            // The new occupant no longer belongs in the sorted range.
            self.quaterna[q..self.sorted_end].rotate_left(1);
            self.sorted_end -= 1;
        }

        trace!("expanded {node:?}");
        true
    }

    /// Walks up from the worst sorted quaterna to the first one `node` may take over.
    fn find_replaceable_quaterna(&self, node: NodeIndex) -> Option<usize> {
        let expanding = self.node(node);
        for q in (0..self.sorted_end).rev() {
            if !self.is_quaterna_recyclable(q) {
                continue;
            }

            let quaterna = &self.quaterna[q];
            if quaterna.parent_score >= expanding.score {
                return None;
            }

            // A recyclable quaterna only holds leaves, so none of node's ancestors can be
            // in it; node itself and its cousins can.
            let excluded = quaterna.contains(node)
                || expanding
                    .triple
                    .iter()
                    .filter_map(|t| t.cousin)
                    .any(|cousin| quaterna.contains(cousin));
            if !excluded {
                return Some(q);
            }
        }
        None
    }

    /// Fills quaterna `q` with the children of `node`, evicting its current occupants.
    fn expand_into(&mut self, node: NodeIndex, q: usize) -> bool {
        // Work on copies until it is certain the expansion will succeed.
        let mut children = [Node::default(); 4];
        if !self.init_child_geometry(node, &mut children) {
            // Probably too small to represent at this precision.
            return false;
        }

        let block = self.quaterna[q].nodes;
        if self.node(block).is_in_use() {
            self.deinit_children(block);
        }

        let scorer = self.scorer;
        for (n, mut child) in children.into_iter().enumerate() {
            child.score = scorer.score(&child);
            *self.node_mut(block.offset(n)) = child;
        }
        self.node_mut(node).children = Some(block);
        self.init_child_pointers(node);

        self.quaterna[q].parent_score = self.node(node).score;
        true
    }

    /// Positions of the mid-points `node` still lacks, asking the shader for each.
    fn place_mid_points(&self, node: NodeIndex, shader: &dyn Shader) -> Option<[Option<Point3<Real>>; 3]> {
        let expanding = self.node(node);
        let mut mid_points = [None; 3];
        for (index, (t, mid_point)) in expanding.triple.iter().zip(&mut mid_points).enumerate() {
            if t.mid_point.is_some() {
                continue;
            }
            let cousin = self.node(t.cousin?);
            *mid_point = Some(shader.init_mid_point(&self.points, expanding, cousin, index)?);
        }
        Some(mid_points)
    }

    /// Creates the placed mid-points, sharing each with the cousin across its edge.
    fn create_mid_points(&mut self, node: NodeIndex, mid_points: &[Option<Point3<Real>>; 3]) -> bool {
        for (index, pos) in mid_points.iter().enumerate() {
            let Some(pos) = *pos else {
                continue;
            };
            let Some(cousin) = self.node(node).triple[index].cousin else {
                return false;
            };
            let Some(mid_point) = self.points.create(pos) else {
                return false;
            };

            self.node_mut(node).triple[index].mid_point = Some(mid_point);
            self.node_mut(cousin).triple[index].mid_point = Some(mid_point);
        }
        true
    }

    fn init_child_geometry(&self, parent: NodeIndex, children: &mut [Node; 4]) -> bool {
        let parent = self.node(parent);
        children.iter_mut().enumerate().all(|(n, child)| {
            let Some(corners) = parent.child_corners(n) else {
                return false;
            };
            for (t, corner) in child.triple.iter_mut().zip(corners) {
                t.corner = Some(corner);
            }
            child.init_geometry(&self.points)
        })
    }

    /// Links the new children to their parent, to each other and to the children of the
    /// parent's cousins, so that shared edges share mid-points.
    fn init_child_pointers(&mut self, parent: NodeIndex) {
        let parent_node = *self.node(parent);
        let Some(block) = parent_node.children else {
            return;
        };
        let center = block.offset(3);

        for i in 0..3 {
            let child = block.offset(i);
            self.set_cousin(child, i, center);

            let j = tri_mod(i + 1);
            let k = tri_mod(i + 2);

            if let Some(cousin_children) = parent_node.cousin(j).and_then(|c| self.node(c).children) {
                self.set_cousin(child, j, cousin_children.offset(k));
            }
            if let Some(cousin_children) = parent_node.cousin(k).and_then(|c| self.node(c).children) {
                self.set_cousin(child, k, cousin_children.offset(j));
            }

            let node = self.node_mut(child);
            node.seed = parent_node.child_seed(i);
            node.parent = Some(parent);
        }

        let node = self.node_mut(center);
        node.seed = parent_node.child_seed(3);
        node.parent = Some(parent);
    }

    /// Mutually links `a` and `b` across edge `index`; `a` adopts `b`'s mid-point.
    fn set_cousin(&mut self, a: NodeIndex, index: usize, b: NodeIndex) {
        debug_assert!({
            let (ta, tb) = (self.node(a).triple[index], self.node(b).triple[index]);
            (ta.cousin.is_none() && tb.cousin.is_none()) || (ta.cousin == Some(b) && tb.cousin == Some(a))
        });

        let mid_point = self.node(b).triple[index].mid_point;
        let ta = &mut self.node_mut(a).triple[index];
        ta.cousin = Some(b);
        ta.mid_point = mid_point;
        self.node_mut(b).triple[index].cousin = Some(a);
    }

    /// Frees `root`'s whole subtree and compacts the used quaterna.
    pub fn collapse_nodes(&mut self, root: NodeIndex) {
        self.collapse_node(root);
        self.compact();
    }

    /// Recursively deinitialises `node`'s descendants. Their quaterna stay inside the used
    /// range, out of use, until the next [`compact`](Self::compact).
    pub(super) fn collapse_node(&mut self, node: NodeIndex) {
        if let Some(children) = self.node(node).children {
            self.deinit_children(children);
        }
    }

    pub(super) fn deinit_children(&mut self, children: NodeIndex) {
        if let Some(parent) = self.node(children).parent {
            debug_assert_eq!(self.node(parent).children, Some(children));
            self.node_mut(parent).children = None;
        }

        for n in 0..4 {
            self.deinit_node(children.offset(n));
        }
    }

    /// Nulls every link of `node`, unlinking its cousins and freeing the mid-points
    /// that no cousin shares.
    fn deinit_node(&mut self, node: NodeIndex) {
        self.collapse_node(node);

        for index in 0..3 {
            let t = self.node(node).triple[index];
            match t.cousin {
                Some(cousin) => {
                    debug_assert_eq!(self.node(cousin).triple[index].cousin, Some(node));
                    debug_assert_eq!(self.node(cousin).triple[index].mid_point, t.mid_point);
                    // The mirror keeps the mid-point and with it, ownership.
                    self.node_mut(cousin).triple[index].cousin = None;
                }
                None => {
                    if let Some(mid_point) = t.mid_point {
                        self.points.destroy(mid_point);
                    }
                }
            }
            self.node_mut(node).triple[index] = Default::default();
        }

        let n = self.node_mut(node);
        n.parent = None;
        n.score = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FormationConfig;
    use crate::float_types::Real;
    use crate::shader::SphereShader;
    use nalgebra::Point3;

    struct Sphere(SphereShader);

    impl ShaderSource for Sphere {
        fn shader(&self, _root: NodeIndex) -> Option<&dyn Shader> {
            Some(&self.0)
        }
    }

    fn buffer_with_root(max_quaterna: usize) -> (NodeBuffer, NodeIndex, Sphere) {
        let config = FormationConfig::default()
            .with_max_formations(1)
            .with_max_quaterna(max_quaterna)
            .with_initial_quaterna(max_quaterna);
        let sphere = Sphere(SphereShader::new(Point3::origin(), 1.0));
        let mut buffer = NodeBuffer::new(&config);
        let root = buffer.create_root(7, sphere.0.init_root_points(7)).unwrap();
        (buffer, root, sphere)
    }

    #[test]
    fn expanding_the_root_builds_a_closed_tetrahedron() {
        let (mut buffer, root, sphere) = buffer_with_root(4);
        assert!(buffer.expand_node(root, &sphere));
        assert_eq!(buffer.num_quaterna_used(), 1);
        assert_eq!(buffer.points().len(), 4);
        buffer.verify().unwrap();

        let children = buffer.node(root).children.unwrap();
        for n in 0..4 {
            let child = buffer.node(children.offset(n));
            assert!(child.is_expandable());
            assert!(child.score > 0.0);
            // Outward facing.
            assert!(child.normal.dot(&child.center.coords) > 0.0);
        }
    }

    #[test]
    fn cousins_share_new_mid_points() {
        let (mut buffer, root, sphere) = buffer_with_root(4);
        assert!(buffer.expand_node(root, &sphere));
        let first = buffer.node(root).children.unwrap();

        assert!(buffer.expand_node(first, &sphere));
        assert_eq!(buffer.points().len(), 7);
        buffer.verify().unwrap();

        // The neighbour across each edge already holds the point it will split with.
        let node = *buffer.node(first);
        for edge in 0..3 {
            let cousin = buffer.node(node.cousin(edge).unwrap());
            assert_eq!(cousin.mid_point(edge), node.mid_point(edge));
            assert!(cousin.mid_point(edge).is_some());
        }
    }

    #[test]
    fn preparing_an_expansion_changes_nothing() {
        let (mut buffer, root, sphere) = buffer_with_root(4);
        assert!(buffer.expand_node(root, &sphere));
        let first = buffer.node(root).children.unwrap();

        let expansion = buffer.prepare_expansion(first, &sphere).unwrap();
        assert_eq!(expansion.node(), first);
        assert_eq!(buffer.points().len(), 4);
        assert!(buffer.node(first).is_leaf());
        assert!(buffer.node(first).mid_point(0).is_none());

        assert!(buffer.commit_expansion(&expansion));
        assert_eq!(buffer.points().len(), 7);
        assert_eq!(buffer.num_quaterna_used(), 2);
        buffer.verify().unwrap();
    }

    #[test]
    fn expansion_fails_without_room() {
        let (mut buffer, root, sphere) = buffer_with_root(1);
        assert!(buffer.expand_node(root, &sphere));
        let first = buffer.node(root).children.unwrap();

        // The only quaterna belongs to the root, which outscores everything.
        buffer.update_quaterna();
        assert_eq!(buffer.worse_replaceable_quaterna_score(), Real::MAX);
        assert!(!buffer.expand_node(first, &sphere));
        assert_eq!(buffer.num_quaterna_used(), 1);
        buffer.verify().unwrap();
    }

    #[test]
    fn collapse_returns_everything_but_the_root() {
        let (mut buffer, root, sphere) = buffer_with_root(8);
        assert!(buffer.expand_node(root, &sphere));
        let first = buffer.node(root).children.unwrap();
        assert!(buffer.expand_node(first, &sphere));
        assert!(buffer.expand_node(first.offset(3), &sphere));
        buffer.verify().unwrap();

        buffer.collapse_nodes(root);
        assert_eq!(buffer.num_quaterna_used(), 0);
        assert_eq!(buffer.points().len(), 4);
        assert!(buffer.node(root).is_expandable());
        buffer.verify().unwrap();
    }
}
