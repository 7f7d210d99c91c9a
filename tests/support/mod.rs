//! Test support library
//! Provides builders for buffers, scenes and formations shared by the integration tests.
#![allow(dead_code)]

use formation::{
    FormationConfig, NodeBuffer, NodeIndex, Shader, ShaderSource, SphereShader, SphereShaderFactory,
    float_types::Real,
    geometry::Ray3,
    scene::{Formation, FormationId},
};
use nalgebra::Point3;
use std::sync::Arc;

/// Routes every lookup to one sphere, for buffers driven without a scene.
pub struct OneShader(pub SphereShader);

impl ShaderSource for OneShader {
    fn shader(&self, _root: NodeIndex) -> Option<&dyn Shader> {
        Some(&self.0)
    }
}

/// Installs the test logger once. `RUST_LOG=debug` shows per-tick summaries.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Quick helper to compare floating-point results with an acceptable tolerance.
pub fn approx_eq(a: Real, b: Real, eps: Real) -> bool {
    (a - b).abs() < eps
}

/// A config sized for tests: one formation slot, `max_quaterna` quaterna, all of them
/// targeted from the start, and churn allowed to run to a fixed point.
pub fn small_config(max_quaterna: usize) -> FormationConfig {
    FormationConfig::default()
        .with_max_formations(1)
        .with_max_quaterna(max_quaterna)
        .with_min_quaterna(0)
        .with_initial_quaterna(max_quaterna)
        .with_max_churn_passes(100_000)
}

/// A buffer holding one unit sphere around the origin.
pub fn sphere_buffer(config: &FormationConfig) -> (NodeBuffer, NodeIndex, OneShader) {
    let shader = OneShader(SphereShader::new(Point3::origin(), 1.0));
    let mut buffer = NodeBuffer::new(config);
    let root = buffer
        .create_root(1, shader.0.init_root_points(1))
        .expect("a fresh buffer has a root slot");
    (buffer, root, shader)
}

/// A scene-relative camera looking at the origin.
pub fn camera_at(x: Real, y: Real, z: Real) -> Ray3<Real> {
    let position = Point3::new(x, y, z);
    Ray3::new(position, -position.coords.normalize())
}

/// A universal camera looking at the origin.
pub fn universal_camera_at(x: f64, y: f64, z: f64) -> Ray3<f64> {
    let position = Point3::new(x, y, z);
    Ray3::new(position, -position.coords.normalize())
}

pub fn sphere_formation(id: u32, position: Point3<f64>, radius: f64) -> Formation {
    Formation::new(FormationId(id), id, position, Arc::new(SphereShaderFactory::new(radius)))
}

