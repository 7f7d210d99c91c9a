//! Formations, the scenes that tessellate them, and the worker that keeps the visible
//! scene refined around a moving observer.
//!
//! A [`Scene`] turns a [`FormationSet`] into polyhedra inside one node buffer, relative to
//! one origin. The [`SceneThread`] keeps two scenes so that moving the origin can happen
//! in the background: the hidden scene regrows around the new origin while the visible
//! one keeps being read, then the two swap. The [`FormationWorker`] runs a scene thread
//! on its own OS thread.

pub mod formation;
pub mod polyhedron;
pub mod regulator;
#[allow(clippy::module_inception)]
pub mod scene;
pub mod scene_thread;
pub mod worker;

pub use formation::{Formation, FormationId, FormationSet};
pub use polyhedron::{Polyhedra, Polyhedron};
pub use regulator::Regulator;
pub use scene::Scene;
pub use scene_thread::{MeshExchange, SceneBuffers, SceneReadGuard, SceneThread, SceneTick};
pub use worker::{Command, FormationWorker};
