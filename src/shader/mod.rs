//! The subdivision policy: where the root points and every new mid-point of a formation go.
//!
//! The node buffer only knows how to split triangles; a [`Shader`] decides the shape.
//! Shaders must be deterministic given node seeds, so that re-expanding a region after
//! a collapse reproduces the same surface.

pub mod sphere;

pub use sphere::{SphereShader, SphereShaderFactory};

use crate::float_types::Real;
use crate::node::{Node, NodeIndex, PointBuffer};
use crate::scene::Formation;
use nalgebra::{Point3, Vector3};

/// Per-formation subdivision policy.
pub trait Shader: Send + Sync {
    /// Re-expresses the shader's state relative to a new scene origin.
    fn set_origin(&mut self, origin: &Vector3<f64>);

    /// Positions of the four points of the initial tetrahedron, scene-relative.
    /// The tetrahedron must be wound so that `(p1, p2, p3)` faces away from `p0`.
    fn init_root_points(&self, seed: u32) -> [Point3<Real>; 4];

    /// Position of the new point on edge `index` shared by cousins `a` and `b`,
    /// or `None` if the point cannot be placed.
    fn init_mid_point(
        &self,
        points: &PointBuffer,
        a: &Node,
        b: &Node,
        index: usize,
    ) -> Option<Point3<Real>>;
}

/// Creates the shader of each formation, once per scene the formation appears in.
pub trait ShaderFactory: Send + Sync {
    fn create(&self, formation: &Formation) -> Box<dyn Shader>;
}

/// Finds the shader responsible for the tree under a root node.
pub trait ShaderSource {
    fn shader(&self, root: NodeIndex) -> Option<&dyn Shader>;
}
