//! Formations: the bodies (planets, moons) a scene tessellates.

use crate::errors::FormationError;
use crate::shader::ShaderFactory;
use hashbrown::HashMap;
use nalgebra::Point3;
use std::fmt;
use std::sync::Arc;

/// Caller-chosen identity of a formation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FormationId(pub u32);

/// A body to tessellate: where it is, how it is seeded, and how its surface is shaped.
#[derive(Clone)]
pub struct Formation {
    pub id: FormationId,
    pub seed: u32,
    /// Universal position.
    pub position: Point3<f64>,
    pub shader_factory: Arc<dyn ShaderFactory>,
}

impl Formation {
    pub fn new(id: FormationId, seed: u32, position: Point3<f64>, shader_factory: Arc<dyn ShaderFactory>) -> Self {
        Self {
            id,
            seed,
            position,
            shader_factory,
        }
    }
}

impl fmt::Debug for Formation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Formation")
            .field("id", &self.id)
            .field("seed", &self.seed)
            .field("position", &self.position)
            .finish_non_exhaustive()
    }
}

/// The formations currently requested, keyed by id.
#[derive(Debug, Clone)]
pub struct FormationSet {
    formations: HashMap<FormationId, Formation>,
    capacity: usize,
}

impl FormationSet {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            formations: HashMap::with_capacity(capacity),
            capacity,
        }
    }

    pub fn insert(&mut self, formation: Formation) -> Result<(), FormationError> {
        let id = formation.id;
        if self.formations.contains_key(&id) {
            return Err(FormationError::Duplicate(id));
        }
        if self.formations.len() >= self.capacity {
            return Err(FormationError::Capacity {
                id,
                capacity: self.capacity,
            });
        }
        self.formations.insert(id, formation);
        Ok(())
    }

    pub fn remove(&mut self, id: FormationId) -> Option<Formation> {
        self.formations.remove(&id)
    }

    pub fn get(&self, id: FormationId) -> Option<&Formation> {
        self.formations.get(&id)
    }

    pub fn contains(&self, id: FormationId) -> bool {
        self.formations.contains_key(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Formation> + '_ {
        self.formations.values()
    }

    pub fn len(&self) -> usize {
        self.formations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.formations.is_empty()
    }

    pub const fn capacity(&self) -> usize {
        self.capacity
    }
}
