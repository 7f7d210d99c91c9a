//! A fixed-budget, view-dependent **tessellator** for planet-scale formations.
//!
//! Each formation (a planet, a moon) starts life as a tetrahedron and is refined as a
//! restricted quad-tree of triangles. Refinement is driven by a per-node priority score
//! (camera distance, facing and area) and bounded by a fixed pool of [quaterna](node::Quaterna),
//! groups of four sibling nodes that are allocated and recycled as one unit. Once a
//! [`NodeBuffer`](node::NodeBuffer) is created, ticking it never allocates.
//!
//! Geometry is stored relative to a floating origin which is periodically relocated to the
//! observer by a double-buffered [`SceneThread`](scene::SceneThread), so that `f32` precision
//! stays bounded on bodies thousands of kilometres across.
//!
//! # Features
//! #### Default
//! - **f32**: use f32 as Real
//!
//! #### Optional
//! - **f64**: use f64 as Real, this conflicts with f32
//! - **parallel**: use rayon to rescore nodes on a thread pool

#![forbid(unsafe_code)]
#![warn(unused)]
#![warn(clippy::missing_const_for_fn, clippy::approx_constant, clippy::all)]

pub mod config;
pub mod errors;
pub mod float_types;
pub mod geometry;
pub mod mesh;
pub mod node;
pub mod scene;
pub mod score;
pub mod shader;

#[cfg(any(all(feature = "f64", feature = "f32"), not(any(feature = "f64", feature = "f32"))))]
compile_error!("Either 'f64' or 'f32' feature must be specified, but not both");

pub use config::{FormationConfig, RegulatorConfig};
pub use errors::{FormationError, VerifyError};
pub use mesh::{Mesh, MeshProperties, Vertex};
pub use node::{NodeBuffer, NodeIndex, PointBuffer, PointIndex};
pub use scene::{Formation, FormationId, FormationSet, FormationWorker, Scene, SceneThread};
pub use shader::{Shader, ShaderFactory, ShaderSource, SphereShader, SphereShaderFactory};
