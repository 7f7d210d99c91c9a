//! All formations that share one node buffer and one coordinate origin.

use crate::config::FormationConfig;
use crate::errors::{FormationError, VerifyError};
use crate::float_types::Real;
use crate::geometry::Ray3;
use crate::mesh::{Mesh, generate_mesh};
use crate::node::{NodeBuffer, TickStats};
use crate::scene::formation::{FormationId, FormationSet};
use crate::scene::polyhedron::{Polyhedra, Polyhedron};
use log::{info, warn};
use nalgebra::Vector3;

/// A node buffer plus the polyhedra living in it, all relative to one origin.
///
/// Universal positions (formations, the camera, the origin itself) are `f64`; everything
/// in the node buffer is relative to `origin` in [`Real`].
#[derive(Debug)]
pub struct Scene {
    nodes: NodeBuffer,
    polyhedra: Polyhedra,
    origin: Vector3<f64>,
    camera_ray: Ray3<f64>,
    camera_ray_relative: Ray3<Real>,
    removed: Vec<FormationId>,
}

impl Scene {
    pub fn new(config: &FormationConfig) -> Self {
        let camera_ray = Ray3::default();
        Self {
            nodes: NodeBuffer::new(config),
            polyhedra: Polyhedra::with_capacity(config.max_formations),
            origin: Vector3::zeros(),
            camera_ray,
            camera_ray_relative: camera_ray.relative_to(&Vector3::zeros()),
            removed: Vec::with_capacity(config.max_formations),
        }
    }

    pub const fn nodes(&self) -> &NodeBuffer {
        &self.nodes
    }

    pub(crate) const fn nodes_mut(&mut self) -> &mut NodeBuffer {
        &mut self.nodes
    }

    pub const fn origin(&self) -> &Vector3<f64> {
        &self.origin
    }

    pub const fn camera_ray(&self) -> &Ray3<f64> {
        &self.camera_ray
    }

    /// The camera ray relative to [`origin`](Self::origin).
    pub const fn camera_ray_relative(&self) -> &Ray3<Real> {
        &self.camera_ray_relative
    }

    pub fn set_camera_ray(&mut self, camera_ray: Ray3<f64>) {
        if camera_ray == self.camera_ray {
            return;
        }
        self.camera_ray = camera_ray;
        self.camera_ray_relative = camera_ray.relative_to(&self.origin);
    }

    /// Moves the origin, throwing away all detail and re-seeding every polyhedron
    /// relative to it. The scene then regrows over the following ticks.
    pub fn set_origin(&mut self, origin: Vector3<f64>) {
        if origin == self.origin {
            return;
        }

        self.origin = origin;
        self.camera_ray_relative = self.camera_ray.relative_to(&origin);
        for polyhedron in self.polyhedra.iter_mut() {
            polyhedron.reset_origin(&origin, &mut self.nodes);
        }
        self.nodes.invalidate_scores();
        info!("scene origin set to ({}, {}, {})", origin.x, origin.y, origin.z);
    }

    /// Brings the polyhedra in line with `formations`, then ticks the node buffer.
    pub fn tick(&mut self, formations: &FormationSet) -> TickStats {
        self.sync_formations(formations);
        self.nodes.tick(&self.camera_ray_relative, &self.polyhedra)
    }

    /// Initialises polyhedra for new formations and collapses those of removed ones.
    pub fn sync_formations(&mut self, formations: &FormationSet) {
        let mut removed = std::mem::take(&mut self.removed);
        removed.clear();
        removed.extend(
            self.polyhedra
                .iter()
                .map(|p| p.formation().id)
                .filter(|&id| !formations.contains(id)),
        );
        for &id in &removed {
            if let Some(polyhedron) = self.polyhedra.remove(id) {
                polyhedron.deinit(&mut self.nodes);
            }
        }
        self.removed = removed;

        for formation in formations.iter() {
            if self.polyhedra.contains(formation.id) {
                continue;
            }
            match Polyhedron::init(formation, &self.origin, &mut self.nodes) {
                Some(polyhedron) => self.polyhedra.insert(polyhedron),
                None => {
                    let err = FormationError::Capacity {
                        id: formation.id,
                        capacity: self.nodes.num_roots(),
                    };
                    warn!("{err}");
                }
            }
        }
    }

    /// Refills `mesh` from the current leaves, relative to this scene's origin.
    pub fn generate_mesh(&self, mesh: &mut Mesh, flat_shaded: bool) {
        let properties = mesh.properties_mut();
        properties.origin = self.origin;
        properties.flat_shaded = flat_shaded;
        generate_mesh(&self.nodes, mesh);
    }

    pub fn polyhedron(&self, id: FormationId) -> Option<&Polyhedron> {
        self.polyhedra.get(id)
    }

    pub const fn polyhedra(&self) -> &Polyhedra {
        &self.polyhedra
    }

    pub const fn num_quaterna_used(&self) -> usize {
        self.nodes.num_quaterna_used()
    }

    pub const fn num_quaterna_used_target(&self) -> usize {
        self.nodes.num_quaterna_used_target()
    }

    pub fn set_num_quaterna_used_target(&mut self, target: usize) {
        self.nodes.set_num_quaterna_used_target(target);
    }

    pub const fn is_growing(&self) -> bool {
        self.nodes.is_growing()
    }

    pub fn verify(&self) -> Result<(), VerifyError> {
        self.nodes.verify()
    }
}
