use crate::float_types::{Real, to_real, tolerance};
use crate::geometry::tri_mod;
use crate::node::{Node, PointBuffer};
use crate::scene::Formation;
use crate::shader::{Shader, ShaderFactory};
use nalgebra::{Point3, Vector3};
use rand::rngs::SmallRng;
use rand::{RngCore, SeedableRng};

/// Corners of the root tetrahedron, wound so each face points outward.
const TETRAHEDRON: [[Real; 3]; 4] = [
    [1.0, 1.0, 1.0],
    [1.0, -1.0, -1.0],
    [-1.0, -1.0, 1.0],
    [-1.0, 1.0, -1.0],
];

/// Projects every mid-point onto a sphere, optionally displaced by seeded noise
/// proportional to the edge length.
#[derive(Debug, Clone, PartialEq)]
pub struct SphereShader {
    center: Point3<f64>,
    radius: f64,
    roughness: Real,
    relative_center: Point3<Real>,
}

impl SphereShader {
    pub fn new(center: Point3<f64>, radius: f64) -> Self {
        Self {
            center,
            radius,
            roughness: 0.0,
            relative_center: Point3::from(to_real(&center.coords)),
        }
    }

    pub const fn with_roughness(mut self, roughness: Real) -> Self {
        self.roughness = roughness;
        self
    }

    pub const fn radius(&self) -> f64 {
        self.radius
    }

    /// Center of the sphere relative to the current origin.
    pub const fn relative_center(&self) -> &Point3<Real> {
        &self.relative_center
    }

    // Symmetric in the two cousins so either side produces the same point.
    fn noise(a: &Node, b: &Node, index: usize) -> Real {
        let edge_seed = |seed: u32| SmallRng::seed_from_u64(u64::from(seed) + index as u64).next_u32();
        let combined = edge_seed(a.seed).wrapping_add(edge_seed(b.seed));
        let unit = SmallRng::seed_from_u64(u64::from(combined)).next_u32() as Real / u32::MAX as Real;
        unit * 2.0 - 1.0
    }
}

impl Shader for SphereShader {
    fn set_origin(&mut self, origin: &Vector3<f64>) {
        self.relative_center = Point3::from(to_real(&(self.center.coords - origin)));
    }

    fn init_root_points(&self, _seed: u32) -> [Point3<Real>; 4] {
        // Tetrahedron corners lie sqrt(3) from the center.
        let scale = (self.radius / 3.0_f64.sqrt()) as Real;
        TETRAHEDRON.map(|[x, y, z]| self.relative_center + Vector3::new(x, y, z) * scale)
    }

    fn init_mid_point(
        &self,
        points: &PointBuffer,
        a: &Node,
        b: &Node,
        index: usize,
    ) -> Option<Point3<Real>> {
        let p = points[a.corner(tri_mod(index + 1))?].pos;
        let q = points[a.corner(tri_mod(index + 2))?].pos;

        let offset = Point3::from((p.coords + q.coords) * 0.5) - self.relative_center;
        let distance = offset.norm();
        if !(distance > tolerance()) {
            return None;
        }

        let mut altitude = self.radius as Real;
        if self.roughness > 0.0 {
            altitude += self.roughness * (p - q).norm() * Self::noise(a, b, index);
        }

        Some(self.relative_center + offset * (altitude / distance))
    }
}

/// Builds a [`SphereShader`] centered on each formation's position.
#[derive(Debug, Clone, PartialEq)]
pub struct SphereShaderFactory {
    pub radius: f64,
    pub roughness: Real,
}

impl SphereShaderFactory {
    pub const fn new(radius: f64) -> Self {
        Self {
            radius,
            roughness: 0.0,
        }
    }

    pub const fn with_roughness(mut self, roughness: Real) -> Self {
        self.roughness = roughness;
        self
    }
}

impl ShaderFactory for SphereShaderFactory {
    fn create(&self, formation: &Formation) -> Box<dyn Shader> {
        Box::new(SphereShader::new(formation.position, self.radius).with_roughness(self.roughness))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_points_lie_on_the_sphere() {
        let shader = SphereShader::new(Point3::new(10.0, 0.0, 0.0), 2.0);
        for p in shader.init_root_points(0) {
            let distance = (p - Point3::new(10.0, 0.0, 0.0)).norm();
            assert!((distance - 2.0).abs() < 1e-4);
        }
    }

    #[test]
    fn origin_moves_the_relative_center() {
        let mut shader = SphereShader::new(Point3::new(10.0, 0.0, 0.0), 1.0);
        shader.set_origin(&Vector3::new(4.0, 0.0, 0.0));
        assert_eq!(*shader.relative_center(), Point3::new(6.0, 0.0, 0.0));
    }

    #[test]
    fn noise_is_symmetric_between_cousins() {
        let a = Node {
            seed: 3,
            ..Node::default()
        };
        let b = Node {
            seed: 99,
            ..Node::default()
        };
        let n = SphereShader::noise(&a, &b, 1);
        assert_eq!(n, SphereShader::noise(&b, &a, 1));
        assert!((-1.0..=1.0).contains(&n));
    }
}
