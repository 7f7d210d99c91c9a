//! A single triangular cell of the quad-tree.

use crate::float_types::{Real, tolerance};
use crate::geometry::{tri_mod, triangle_center, triangle_normal};
use crate::node::point::{PointBuffer, PointIndex};
use nalgebra::{Point3, Vector3};
use rand::rngs::SmallRng;
use rand::{RngCore, SeedableRng};

/// Handle to a [`Node`] inside a [`NodeBuffer`](crate::node::NodeBuffer).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeIndex(u32);

impl NodeIndex {
    #[inline]
    pub(crate) const fn from_usize(index: usize) -> Self {
        Self(index as u32)
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// The `n`th node of the block of four starting here.
    #[inline]
    pub const fn offset(self, n: usize) -> Self {
        Self(self.0 + n as u32)
    }
}

/// One edge's worth of links.
///
/// Edge `i` is the edge opposite `corner` `i`. `mid_point` sits on that edge and
/// `cousin` is the same-level node on the far side of it, which shares `mid_point`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Triplet {
    pub corner: Option<PointIndex>,
    pub mid_point: Option<PointIndex>,
    pub cousin: Option<NodeIndex>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Node {
    /// First of the four children, all in one quaterna.
    pub children: Option<NodeIndex>,
    pub parent: Option<NodeIndex>,
    pub seed: u32,
    pub triple: [Triplet; 3],
    pub center: Point3<Real>,
    pub area: Real,
    pub normal: Vector3<Real>,
    pub score: Real,
}

impl Default for Node {
    fn default() -> Self {
        Self {
            children: None,
            parent: None,
            seed: 0,
            triple: [Triplet::default(); 3],
            center: Point3::origin(),
            area: 0.0,
            normal: Vector3::zeros(),
            score: 0.0,
        }
    }
}

impl Node {
    #[inline]
    pub const fn is_leaf(&self) -> bool {
        self.children.is_none()
    }

    #[inline]
    pub const fn is_expanded(&self) -> bool {
        self.children.is_some()
    }

    /// True for every node with a parent. Root nodes are tracked by the buffer instead.
    #[inline]
    pub const fn is_in_use(&self) -> bool {
        self.parent.is_some()
    }

    #[inline]
    pub fn has_all_cousins(&self) -> bool {
        self.triple.iter().all(|t| t.cousin.is_some())
    }

    /// Only a leaf with all three neighbours at its own level may be split.
    #[inline]
    pub fn is_expandable(&self) -> bool {
        self.is_leaf() && self.has_all_cousins()
    }

    #[inline]
    pub const fn corner(&self, index: usize) -> Option<PointIndex> {
        self.triple[index].corner
    }

    #[inline]
    pub const fn mid_point(&self, index: usize) -> Option<PointIndex> {
        self.triple[index].mid_point
    }

    #[inline]
    pub const fn cousin(&self, index: usize) -> Option<NodeIndex> {
        self.triple[index].cousin
    }

    pub fn corners(&self) -> Option<[PointIndex; 3]> {
        Some([self.corner(0)?, self.corner(1)?, self.corner(2)?])
    }

    /// Caches normal, area and center. Fails for triangles too small to represent.
    pub fn init_geometry(&mut self, points: &PointBuffer) -> bool {
        let Some([a, b, c]) = self.corners() else {
            return false;
        };
        let (a, b, c) = (&points[a].pos, &points[b].pos, &points[c].pos);

        let normal = triangle_normal(a, b, c);
        let length = normal.norm();
        let tolerance = tolerance();
        // Also rejects NaN.
        if !(length > tolerance * tolerance) {
            return false;
        }

        self.normal = normal / length;
        self.area = length * 0.5;
        self.center = triangle_center(a, b, c);
        true
    }

    /// Deterministic seed of child `child_index`.
    pub fn child_seed(&self, child_index: usize) -> u32 {
        let base = SmallRng::seed_from_u64(u64::from(self.seed)).next_u32();
        SmallRng::seed_from_u64(u64::from(base.wrapping_add(child_index as u32))).next_u32()
    }

    /// Corners of child `child_index`: three corner children, then the center one.
    pub fn child_corners(&self, child_index: usize) -> Option<[PointIndex; 3]> {
        if child_index < 3 {
            let mut corners = [self.corner(child_index)?; 3];
            corners[tri_mod(child_index + 1)] = self.mid_point(tri_mod(child_index + 2))?;
            corners[tri_mod(child_index + 2)] = self.mid_point(tri_mod(child_index + 1))?;
            Some(corners)
        } else {
            Some([self.mid_point(0)?, self.mid_point(1)?, self.mid_point(2)?])
        }
    }
}
