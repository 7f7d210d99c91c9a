//! Small geometric helpers shared by nodes, scoring and meshing.

use crate::float_types::{Real, to_real};
use nalgebra::{Point3, Scalar, Vector3};

/// A position and a direction, used for the camera.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray3<S: Scalar> {
    pub position: Point3<S>,
    pub direction: Vector3<S>,
}

impl<S: Scalar> Ray3<S> {
    pub const fn new(position: Point3<S>, direction: Vector3<S>) -> Self {
        Self { position, direction }
    }
}

impl Ray3<f64> {
    /// Expresses a universal ray relative to `origin` in scene precision.
    pub fn relative_to(&self, origin: &Vector3<f64>) -> Ray3<Real> {
        Ray3 {
            position: Point3::from(to_real(&(self.position.coords - origin))),
            direction: to_real(&self.direction),
        }
    }
}

impl Default for Ray3<f64> {
    fn default() -> Self {
        Self::new(Point3::origin(), Vector3::z())
    }
}

impl Default for Ray3<f32> {
    fn default() -> Self {
        Self::new(Point3::origin(), Vector3::z())
    }
}

/// Wraps a triplet index into `0..3`.
#[inline]
pub const fn tri_mod(index: usize) -> usize {
    index % 3
}

/// Unnormalized normal of the counter-clockwise triangle `a, b, c`; its length is twice the area.
#[inline]
pub fn triangle_normal(a: &Point3<Real>, b: &Point3<Real>, c: &Point3<Real>) -> Vector3<Real> {
    (b - a).cross(&(c - a))
}

#[inline]
pub fn triangle_area(a: &Point3<Real>, b: &Point3<Real>, c: &Point3<Real>) -> Real {
    triangle_normal(a, b, c).norm() * 0.5
}

#[inline]
pub fn triangle_center(a: &Point3<Real>, b: &Point3<Real>, c: &Point3<Real>) -> Point3<Real> {
    Point3::from((a.coords + b.coords + c.coords) / 3.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn triangle_helpers() {
        let a = Point3::new(0.0, 0.0, 0.0);
        let b = Point3::new(2.0, 0.0, 0.0);
        let c = Point3::new(0.0, 2.0, 0.0);

        assert_eq!(triangle_normal(&a, &b, &c), Vector3::new(0.0, 0.0, 4.0));
        assert_eq!(triangle_area(&a, &b, &c), 2.0);
        assert_eq!(tri_mod(4), 1);
    }

    #[test]
    fn relative_ray_subtracts_origin() {
        let ray = Ray3::new(Point3::new(1000.5, 0.0, -2.0), Vector3::x());
        let relative = ray.relative_to(&Vector3::new(1000.0, 0.0, 0.0));
        assert_eq!(relative.position, Point3::new(0.5, 0.0, -2.0));
        assert_eq!(relative.direction, Vector3::new(1.0, 0.0, 0.0));
    }
}
