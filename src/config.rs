//! Tunables for node buffers, scenes and the scene thread.

use crate::float_types::Real;
use std::time::Duration;

/// Sizing and behaviour of a formation scene.
///
/// Everything here is fixed when a [`NodeBuffer`](crate::node::NodeBuffer) is created;
/// only the quaterna target moves at run time.
#[derive(Debug, Clone, PartialEq)]
pub struct FormationConfig {
    /// Hard ceiling on quaterna (and so on nodes, points and mesh size).
    pub max_quaterna: usize,
    /// Number of root slots, i.e. formations that can share one node buffer.
    pub max_formations: usize,
    /// Floor applied to the regulator's target.
    pub min_quaterna: usize,
    /// Quaterna target of a freshly created node buffer.
    pub initial_quaterna: usize,
    /// Pins the quaterna target, ignoring every later request to change it.
    pub fixed_quaterna: Option<usize>,
    /// Distances closer than this are clamped when scoring.
    pub camera_near: Real,
    /// Camera movement (scene-relative) that triggers a full rescore.
    pub rescore_distance: Real,
    /// Upper bound on score/sort/churn passes within one tick.
    pub max_churn_passes: usize,
    /// Observer distance from the visible origin beyond which the origin is reset.
    pub max_observer_distance: f64,
    /// Initial shading mode of generated meshes.
    pub flat_shaded: bool,
    /// How long an idle worker waits for a command before ticking again.
    pub idle_wait: Duration,
    pub regulator: RegulatorConfig,
}

impl Default for FormationConfig {
    fn default() -> Self {
        Self {
            max_quaterna: 16384,
            max_formations: 16,
            min_quaterna: 64,
            initial_quaterna: 64,
            fixed_quaterna: None,
            camera_near: 0.1,
            rescore_distance: 0.0,
            max_churn_passes: 32,
            max_observer_distance: 2500.0,
            flat_shaded: false,
            idle_wait: Duration::from_millis(10),
            regulator: RegulatorConfig::default(),
        }
    }
}

impl FormationConfig {
    pub const fn with_max_quaterna(mut self, max_quaterna: usize) -> Self {
        self.max_quaterna = max_quaterna;
        self
    }

    pub const fn with_max_formations(mut self, max_formations: usize) -> Self {
        self.max_formations = max_formations;
        self
    }

    pub const fn with_min_quaterna(mut self, min_quaterna: usize) -> Self {
        self.min_quaterna = min_quaterna;
        self
    }

    pub const fn with_initial_quaterna(mut self, initial_quaterna: usize) -> Self {
        self.initial_quaterna = initial_quaterna;
        self
    }

    pub const fn with_fixed_quaterna(mut self, fixed_quaterna: usize) -> Self {
        self.fixed_quaterna = Some(fixed_quaterna);
        self
    }

    pub const fn with_camera_near(mut self, camera_near: Real) -> Self {
        self.camera_near = camera_near;
        self
    }

    pub const fn with_rescore_distance(mut self, rescore_distance: Real) -> Self {
        self.rescore_distance = rescore_distance;
        self
    }

    pub const fn with_max_churn_passes(mut self, max_churn_passes: usize) -> Self {
        self.max_churn_passes = max_churn_passes;
        self
    }

    pub const fn with_max_observer_distance(mut self, max_observer_distance: f64) -> Self {
        self.max_observer_distance = max_observer_distance;
        self
    }

    pub const fn with_flat_shaded(mut self, flat_shaded: bool) -> Self {
        self.flat_shaded = flat_shaded;
        self
    }

    pub const fn with_idle_wait(mut self, idle_wait: Duration) -> Self {
        self.idle_wait = idle_wait;
        self
    }

    pub const fn with_regulator(mut self, regulator: RegulatorConfig) -> Self {
        self.regulator = regulator;
        self
    }

    /// Upper bound on live points: three mid-points per node plus four root points per formation.
    pub const fn max_points(&self) -> usize {
        self.max_quaterna * 12 + self.max_formations * 4
    }

    /// Upper bound on faces: every leaf emits at most four.
    pub const fn max_faces(&self) -> usize {
        (self.max_quaterna * 3 + self.max_formations) * 4
    }

    /// Vertex capacity of a mesh which never overflows, flat-shaded or not.
    pub const fn mesh_vertex_capacity(&self) -> usize {
        self.max_points() + self.max_faces()
    }

    pub const fn mesh_index_capacity(&self) -> usize {
        self.max_faces() * 3
    }
}

/// Coefficients of the feedback loop that turns frame timings into a quaterna target.
#[derive(Debug, Clone, PartialEq)]
pub struct RegulatorConfig {
    /// Steady-state reaction to the frame ratio.
    pub frame_rate_reaction_coefficient_base: f64,
    /// Extra reaction applied just after a reset, decaying over time.
    pub frame_rate_reaction_coefficient_boost: f64,
    /// Seconds for the boost to halve.
    pub frame_rate_reaction_coefficient_boost_half_life: f64,
    /// Mesh generation slower than this pushes the target down.
    pub max_mesh_generation_period: Duration,
    /// Factor applied to the load when mesh generation is too slow.
    pub max_mesh_generation_reaction_coefficient: f64,
}

impl Default for RegulatorConfig {
    fn default() -> Self {
        Self {
            frame_rate_reaction_coefficient_base: 0.015,
            frame_rate_reaction_coefficient_boost: 0.05,
            frame_rate_reaction_coefficient_boost_half_life: 3.0,
            max_mesh_generation_period: Duration::from_millis(1350),
            max_mesh_generation_reaction_coefficient: 0.9975,
        }
    }
}
