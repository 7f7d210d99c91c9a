//! The formation actor: one thread that owns a [`SceneThread`] and is driven by commands.

use crate::config::FormationConfig;
use crate::errors::FormationError;
use crate::geometry::Ray3;
use crate::mesh::Mesh;
use crate::scene::formation::{Formation, FormationId};
use crate::scene::scene_thread::{MeshExchange, SceneBuffers, SceneReadGuard, SceneThread};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError};
use log::{debug, warn};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

#[derive(Debug)]
pub enum Command {
    AddFormation(Formation),
    RemoveFormation(FormationId),
    SetCameraRay(Ray3<f64>),
    SampleFrameRatio(f64),
    ResetOrigin,
    ToggleFlatShaded,
    Quit,
}

/// Handle to the formation thread.
///
/// Every mutation goes through the command queue and is applied between ticks.
/// Readers share the visible scene through [`read_lock_tree`](Self::read_lock_tree).
/// Dropping the handle stops and joins the thread.
pub struct FormationWorker {
    commands: Sender<Command>,
    buffers: Arc<SceneBuffers>,
    meshes: MeshExchange,
    handle: Option<JoinHandle<()>>,
}

impl FormationWorker {
    pub fn spawn(config: FormationConfig) -> Result<Self, FormationError> {
        let idle_wait = config.idle_wait;
        let (scene_thread, meshes) = SceneThread::new(config);
        let buffers = Arc::clone(scene_thread.buffers());
        let (commands, queue) = crossbeam_channel::unbounded();

        let handle = thread::Builder::new()
            .name("formation".into())
            .spawn(move || run(scene_thread, &queue, idle_wait))
            .map_err(|e| FormationError::Spawn(e.to_string()))?;

        Ok(Self {
            commands,
            buffers,
            meshes,
            handle: Some(handle),
        })
    }

    fn send(&self, command: Command) -> Result<(), FormationError> {
        self.commands.send(command).map_err(|_| FormationError::Disconnected)
    }

    /// Duplicate or excess formations are rejected on the worker thread with a warning.
    pub fn add_formation(&self, formation: Formation) -> Result<(), FormationError> {
        self.send(Command::AddFormation(formation))
    }

    pub fn remove_formation(&self, id: FormationId) -> Result<(), FormationError> {
        self.send(Command::RemoveFormation(id))
    }

    pub fn set_camera_ray(&self, camera_ray: Ray3<f64>) -> Result<(), FormationError> {
        self.send(Command::SetCameraRay(camera_ray))
    }

    /// Actual over desired frame time of a rendered frame.
    pub fn sample_frame_ratio(&self, ratio: f64) -> Result<(), FormationError> {
        self.send(Command::SampleFrameRatio(ratio))
    }

    pub fn reset_origin(&self) -> Result<(), FormationError> {
        self.send(Command::ResetOrigin)
    }

    pub fn toggle_flat_shaded(&self) -> Result<(), FormationError> {
        self.send(Command::ToggleFlatShaded)
    }

    pub fn read_lock_tree(&self) -> SceneReadGuard<'_> {
        self.buffers.read_lock_tree()
    }

    /// The latest finished mesh, if one is waiting.
    pub fn poll_mesh(&self) -> Option<Mesh> {
        self.meshes.ready.try_recv().ok()
    }

    /// Blocks up to `timeout` for a finished mesh.
    pub fn wait_mesh(&self, timeout: Duration) -> Option<Mesh> {
        self.meshes.ready.recv_timeout(timeout).ok()
    }

    /// Hands a mesh back for reuse. The worker only builds meshes it has been given.
    pub fn return_mesh(&self, mesh: Mesh) -> Result<(), FormationError> {
        self.meshes.free.send(mesh).map_err(|_| FormationError::Disconnected)
    }

    /// Stops the thread and waits for it, reporting whether it panicked.
    pub fn quit(mut self) -> Result<(), FormationError> {
        self.shutdown()
    }

    fn shutdown(&mut self) -> Result<(), FormationError> {
        let Some(handle) = self.handle.take() else {
            return Ok(());
        };
        // A send error just means the thread has already exited.
        let _ = self.commands.send(Command::Quit);
        handle.join().map_err(|_| FormationError::Panicked)
    }
}

impl Drop for FormationWorker {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            warn!("{e}");
        }
    }
}

fn run(mut scene_thread: SceneThread, queue: &Receiver<Command>, idle_wait: Duration) {
    debug!("formation worker started");
    loop {
        loop {
            match queue.try_recv() {
                Ok(Command::Quit) | Err(TryRecvError::Disconnected) => return,
                Ok(command) => apply(&mut scene_thread, command),
                Err(TryRecvError::Empty) => break,
            }
        }

        if scene_thread.tick().is_idle() {
            match queue.recv_timeout(idle_wait) {
                Ok(Command::Quit) | Err(RecvTimeoutError::Disconnected) => return,
                Ok(command) => apply(&mut scene_thread, command),
                Err(RecvTimeoutError::Timeout) => {}
            }
        }
    }
}

fn apply(scene_thread: &mut SceneThread, command: Command) {
    match command {
        Command::AddFormation(formation) => {
            if let Err(e) = scene_thread.add_formation(formation) {
                warn!("{e}");
            }
        }
        Command::RemoveFormation(id) => {
            if scene_thread.remove_formation(id).is_none() {
                warn!("no formation {id:?} to remove");
            }
        }
        Command::SetCameraRay(camera_ray) => scene_thread.set_camera_ray(camera_ray),
        Command::SampleFrameRatio(ratio) => scene_thread.sample_frame_ratio(ratio),
        Command::ResetOrigin => scene_thread.request_origin_reset(),
        Command::ToggleFlatShaded => scene_thread.toggle_flat_shaded(),
        Command::Quit => {}
    }
}
