//! One formation's presence in a scene: its root node and its shader.

use crate::node::{NodeBuffer, NodeIndex};
use crate::scene::formation::{Formation, FormationId};
use crate::shader::{Shader, ShaderSource};
use hashbrown::HashMap;
use log::info;
use nalgebra::Vector3;

pub struct Polyhedron {
    formation: Formation,
    root: NodeIndex,
    shader: Box<dyn Shader>,
}

impl Polyhedron {
    /// Creates the shader and seeds the root tetrahedron, or returns `None` if the
    /// buffer has no root slot left.
    pub fn init(formation: &Formation, origin: &Vector3<f64>, nodes: &mut NodeBuffer) -> Option<Self> {
        let mut shader = formation.shader_factory.create(formation);
        shader.set_origin(origin);

        let root = nodes.create_root(formation.seed, shader.init_root_points(formation.seed))?;
        info!("added formation {:?} as root {root:?}", formation.id);
        Some(Self {
            formation: formation.clone(),
            root,
            shader,
        })
    }

    /// Collapses the whole tree and frees the root.
    pub fn deinit(self, nodes: &mut NodeBuffer) {
        nodes.destroy_root(self.root);
        info!("removed formation {:?}", self.formation.id);
    }

    /// Discards all detail and re-seeds the root relative to a new origin.
    pub fn reset_origin(&mut self, origin: &Vector3<f64>, nodes: &mut NodeBuffer) {
        self.shader.set_origin(origin);
        nodes.collapse_nodes(self.root);
        nodes.set_root_positions(self.root, self.shader.init_root_points(self.formation.seed));
    }

    pub const fn formation(&self) -> &Formation {
        &self.formation
    }

    pub const fn root(&self) -> NodeIndex {
        self.root
    }

    pub fn shader(&self) -> &dyn Shader {
        self.shader.as_ref()
    }
}

impl std::fmt::Debug for Polyhedron {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Polyhedron")
            .field("formation", &self.formation)
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}

/// Every polyhedron of a scene, looked up by root slot or by formation.
#[derive(Debug, Default)]
pub struct Polyhedra {
    slots: Vec<Option<Polyhedron>>,
    by_formation: HashMap<FormationId, NodeIndex>,
}

impl Polyhedra {
    pub fn with_capacity(max_roots: usize) -> Self {
        Self {
            slots: (0..max_roots).map(|_| None).collect(),
            by_formation: HashMap::with_capacity(max_roots),
        }
    }

    pub fn insert(&mut self, polyhedron: Polyhedron) {
        let root = polyhedron.root();
        self.by_formation.insert(polyhedron.formation().id, root);
        self.slots[root.index()] = Some(polyhedron);
    }

    pub fn remove(&mut self, id: FormationId) -> Option<Polyhedron> {
        let root = self.by_formation.remove(&id)?;
        self.slots[root.index()].take()
    }

    pub fn get(&self, id: FormationId) -> Option<&Polyhedron> {
        let root = self.by_formation.get(&id)?;
        self.slots[root.index()].as_ref()
    }

    pub fn contains(&self, id: FormationId) -> bool {
        self.by_formation.contains_key(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Polyhedron> + '_ {
        self.slots.iter().flatten()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Polyhedron> + '_ {
        self.slots.iter_mut().flatten()
    }

    pub fn len(&self) -> usize {
        self.by_formation.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_formation.is_empty()
    }
}

impl ShaderSource for Polyhedra {
    fn shader(&self, root: NodeIndex) -> Option<&dyn Shader> {
        self.slots.get(root.index())?.as_ref().map(Polyhedron::shader)
    }
}
