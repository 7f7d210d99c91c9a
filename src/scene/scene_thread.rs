//! The per-tick state machine behind the formation worker: double-buffered scenes,
//! origin resets, load regulation and mesh handoff.

use crate::config::FormationConfig;
use crate::errors::{FormationError, VerifyError};
use crate::float_types::Real;
use crate::geometry::Ray3;
use crate::mesh::Mesh;
use crate::node::{ChurnStep, NodeIndex, TickStats};
use crate::scene::formation::{Formation, FormationId, FormationSet};
use crate::scene::regulator::Regulator;
use crate::scene::scene::Scene;
use crossbeam_channel::{Receiver, Sender, TryRecvError};
use log::{debug, info};
use std::ops::Deref;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard, TryLockError, TryLockResult};
use std::time::Instant;

/// Two scenes and which of them is visible.
///
/// Readers lock `front` then the visible scene. The owning [`SceneThread`] caches the
/// front index and takes `front` exclusively only for the flip, while holding no scene
/// lock. It ticks a scene under shared locks, writing only in short windows around each
/// commit, so readers of the visible scene are never held off for a whole tick.
#[derive(Debug)]
pub struct SceneBuffers {
    front: RwLock<usize>,
    scenes: [RwLock<Scene>; 2],
}

impl SceneBuffers {
    fn new(config: &FormationConfig) -> Self {
        Self {
            front: RwLock::new(0),
            scenes: [RwLock::new(Scene::new(config)), RwLock::new(Scene::new(config))],
        }
    }

    /// Read access to the visible scene. The visible scene cannot flip while the guard
    /// is held.
    pub fn read_lock_tree(&self) -> SceneReadGuard<'_> {
        let front = self.front.read().unwrap_or_else(PoisonError::into_inner);
        let scene = self.scenes[*front].read().unwrap_or_else(PoisonError::into_inner);
        SceneReadGuard { _front: front, scene }
    }

    /// Like [`read_lock_tree`](Self::read_lock_tree), but gives up instead of waiting.
    pub fn try_read_lock_tree(&self) -> Option<SceneReadGuard<'_>> {
        let front = try_guard(self.front.try_read())?;
        let scene = try_guard(self.scenes[*front].try_read())?;
        Some(SceneReadGuard { _front: front, scene })
    }

    fn read(&self, index: usize) -> RwLockReadGuard<'_, Scene> {
        self.scenes[index].read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self, index: usize) -> RwLockWriteGuard<'_, Scene> {
        self.scenes[index].write().unwrap_or_else(PoisonError::into_inner)
    }

    fn flip(&self, front: usize) {
        *self.front.write().unwrap_or_else(PoisonError::into_inner) = front;
    }
}

fn try_guard<G>(result: TryLockResult<G>) -> Option<G> {
    match result {
        Ok(guard) => Some(guard),
        Err(TryLockError::Poisoned(e)) => Some(e.into_inner()),
        Err(TryLockError::WouldBlock) => None,
    }
}

/// The visible scene, locked for reading.
pub struct SceneReadGuard<'a> {
    scene: RwLockReadGuard<'a, Scene>,
    _front: RwLockReadGuard<'a, usize>,
}

impl Deref for SceneReadGuard<'_> {
    type Target = Scene;

    fn deref(&self) -> &Scene {
        &self.scene
    }
}

/// The renderer's ends of the mesh handoff: finished meshes arrive on `ready`, and go
/// back through `free` once uploaded.
#[derive(Debug, Clone)]
pub struct MeshExchange {
    pub ready: Receiver<Mesh>,
    pub free: Sender<Mesh>,
}

/// What one [`SceneThread::tick`] did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SceneTick {
    pub stats: TickStats,
    /// An origin reset finished and the scenes were swapped.
    pub flipped: bool,
    /// A mesh was generated and handed to the renderer.
    pub mesh_generated: bool,
    /// An origin reset is in progress.
    pub resetting: bool,
}

impl SceneTick {
    /// Nothing happened and nothing will until a command arrives or a mesh comes back.
    pub const fn is_idle(&self) -> bool {
        self.stats.expansions == 0 && !self.flipped && !self.mesh_generated && !self.resetting
    }
}

pub struct SceneThread {
    config: FormationConfig,
    formations: FormationSet,
    buffers: Arc<SceneBuffers>,
    front: usize,
    regulator: Regulator,
    camera_ray: Ray3<f64>,
    flat_shaded: bool,
    resetting: bool,
    reset_requested: bool,
    mesh_dirty: bool,
    free_meshes: Receiver<Mesh>,
    ready_meshes: Sender<Mesh>,
    scores: Vec<Real>,
    candidates: Vec<NodeIndex>,
}

impl SceneThread {
    /// Builds both scenes and two meshes at full capacity.
    pub fn new(config: FormationConfig) -> (Self, MeshExchange) {
        let (ready_tx, ready_rx) = crossbeam_channel::unbounded();
        let (free_tx, free_rx) = crossbeam_channel::unbounded();
        for _ in 0..2 {
            let mesh = Mesh::with_capacity(config.mesh_vertex_capacity(), config.mesh_index_capacity());
            // Both ends are alive here.
            let _ = free_tx.send(mesh);
        }

        let thread = Self {
            formations: FormationSet::with_capacity(config.max_formations),
            buffers: Arc::new(SceneBuffers::new(&config)),
            front: 0,
            regulator: Regulator::new(config.regulator.clone()),
            camera_ray: Ray3::default(),
            flat_shaded: config.flat_shaded,
            resetting: false,
            reset_requested: false,
            mesh_dirty: true,
            free_meshes: free_rx,
            ready_meshes: ready_tx,
            scores: Vec::with_capacity(config.max_quaterna * 4),
            candidates: Vec::with_capacity(config.max_formations + config.max_quaterna * 4),
            config,
        };
        let exchange = MeshExchange {
            ready: ready_rx,
            free: free_tx,
        };
        (thread, exchange)
    }

    pub const fn buffers(&self) -> &Arc<SceneBuffers> {
        &self.buffers
    }

    pub fn read_lock_tree(&self) -> SceneReadGuard<'_> {
        self.buffers.read_lock_tree()
    }

    pub fn try_read_lock_tree(&self) -> Option<SceneReadGuard<'_>> {
        self.buffers.try_read_lock_tree()
    }

    pub const fn formations(&self) -> &FormationSet {
        &self.formations
    }

    /// The formation appears in the scenes on the next tick.
    pub fn add_formation(&mut self, formation: Formation) -> Result<(), FormationError> {
        self.formations.insert(formation)?;
        self.mesh_dirty = true;
        Ok(())
    }

    /// The formation's tree is collapsed on the next tick.
    pub fn remove_formation(&mut self, id: FormationId) -> Option<Formation> {
        let removed = self.formations.remove(id);
        self.mesh_dirty |= removed.is_some();
        removed
    }

    pub fn set_camera_ray(&mut self, camera_ray: Ray3<f64>) {
        self.camera_ray = camera_ray;
    }

    pub fn sample_frame_ratio(&mut self, ratio: f64) {
        self.regulator.sample_frame_ratio(ratio);
    }

    /// Starts an origin reset on the next tick, even if the observer is close enough.
    pub fn request_origin_reset(&mut self) {
        self.reset_requested = true;
    }

    pub fn toggle_flat_shaded(&mut self) {
        self.flat_shaded = !self.flat_shaded;
        self.mesh_dirty = true;
    }

    pub const fn is_flat_shaded(&self) -> bool {
        self.flat_shaded
    }

    pub const fn is_resetting(&self) -> bool {
        self.resetting
    }

    const fn back(&self) -> usize {
        1 - self.front
    }

    const fn active(&self) -> usize {
        if self.resetting { self.back() } else { self.front }
    }

    /// False once the observer has strayed too far from the visible origin for
    /// scene-relative precision. Always true while a reset is pending or underway, or
    /// while the visible scene is still growing.
    pub fn is_origin_ok(&self) -> bool {
        if self.reset_requested || self.resetting {
            return true;
        }

        let visible = self.buffers.read(self.front);
        if visible.is_growing() {
            return true;
        }
        (self.camera_ray.position.coords - visible.origin()).norm() < self.config.max_observer_distance
    }

    pub fn tick(&mut self) -> SceneTick {
        if !self.is_origin_ok() {
            self.reset_requested = true;
        }

        if self.reset_requested {
            self.begin_reset();
        } else if !self.resetting {
            self.adjust_num_quaterna();
        }

        let stats = self.tick_active_scene();
        if stats.expansions > 0 {
            self.mesh_dirty = true;
        }

        let mut flipped = false;
        if self.resetting {
            let growing = self.buffers.read(self.active()).is_growing();
            // Growth also stops when nothing is left to expand, e.g. with no formations.
            if !growing || stats.expansions == 0 {
                self.end_reset();
                flipped = true;
            }
        }

        let mesh_generated = self.generate_mesh();
        SceneTick {
            stats,
            flipped,
            mesh_generated,
            resetting: self.resetting,
        }
    }

    fn begin_reset(&mut self) {
        self.reset_requested = false;
        self.resetting = true;

        let target = self.buffers.read(self.front).num_quaterna_used();
        let origin = self.camera_ray.position.coords;
        let mut back = self.buffers.write(self.back());
        back.set_origin(origin);
        back.set_num_quaterna_used_target(target);
        info!(
            "origin reset started at ({}, {}, {}), regrowing {target} quaterna",
            origin.x, origin.y, origin.z
        );
    }

    fn end_reset(&mut self) {
        let front = self.back();
        self.buffers.flip(front);
        self.front = front;
        self.resetting = false;
        self.mesh_dirty = true;
        self.regulator.reset();
        info!("origin reset finished, scene {front} is visible");
    }

    fn adjust_num_quaterna(&mut self) {
        let current = self.buffers.read(self.front).num_quaterna_used_target();
        let target = self
            .regulator
            .adjusted_load(current)
            .clamp(self.config.min_quaterna.min(self.config.max_quaterna), self.config.max_quaterna);
        if target != current {
            debug!("quaterna target {current} -> {target}");
            self.buffers.write(self.front).set_num_quaterna_used_target(target);
        }
    }

    /// Ticks the active scene the way [`Scene::tick`] does, but plans every step under a
    /// shared lock and takes the write lock only to commit it.
    fn tick_active_scene(&mut self) -> TickStats {
        let active = self.active();
        let buffers = &self.buffers;
        {
            let mut scene = buffers.write(active);
            scene.set_camera_ray(self.camera_ray);
            scene.sync_formations(&self.formations);
        }

        let mut stats = TickStats::default();
        let rescorer = {
            let scene = buffers.read(active);
            let rescorer = scene.nodes().rescorer(scene.camera_ray_relative());
            if let Some(scorer) = &rescorer {
                scene.nodes().compute_scores(scorer, &mut self.scores);
            }
            rescorer
        };
        if let Some(scorer) = rescorer {
            buffers.write(active).nodes_mut().apply_scores(scorer, &self.scores);
            stats.rescored = true;
        }

        let max_passes = buffers.read(active).nodes().max_churn_passes();
        while stats.passes < max_passes {
            buffers.write(active).nodes_mut().update_quaterna();
            let mut threshold = buffers.read(active).nodes().gather_candidates(&mut self.candidates);

            let mut expansions = 0;
            for &candidate in &self.candidates {
                let step = {
                    let scene = buffers.read(active);
                    scene.nodes().plan_churn(candidate, threshold, scene.polyhedra())
                };
                match step {
                    ChurnStep::Stop => break,
                    ChurnStep::Skip => {}
                    ChurnStep::Expand(expansion) => {
                        let mut scene = buffers.write(active);
                        let nodes = scene.nodes_mut();
                        if nodes.commit_expansion(&expansion) {
                            expansions += 1;
                            threshold = nodes.worse_replaceable_quaterna_score();
                        }
                    }
                }
            }

            stats.passes += 1;
            stats.expansions += expansions;
            if expansions == 0 {
                break;
            }
        }

        debug!(
            "scene {active}: {} expansions in {} passes",
            stats.expansions, stats.passes
        );
        stats
    }

    /// Fills a returned mesh from the visible scene and hands it over.
    fn generate_mesh(&mut self) -> bool {
        if self.resetting || !self.mesh_dirty {
            return false;
        }
        let mut mesh = match self.free_meshes.try_recv() {
            Ok(mesh) => mesh,
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => return false,
        };

        let start = Instant::now();
        self.buffers.read(self.front).generate_mesh(&mut mesh, self.flat_shaded);
        self.regulator.sample_mesh_generation_period(start.elapsed());

        self.mesh_dirty = false;
        if self.ready_meshes.send(mesh).is_err() {
            debug!("mesh consumer is gone");
            return false;
        }
        true
    }

    /// Verifies both scenes.
    pub fn verify(&self) -> Result<(), VerifyError> {
        self.buffers.read(0).verify()?;
        self.buffers.read(1).verify()
    }
}
