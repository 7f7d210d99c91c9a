//! Node priority scoring.
//!
//! This module provides the score functor and a rescoring pass with dependency inversion,
//! allowing for different implementations (serial/parallel).

pub mod node_score;
pub mod traits;

#[cfg(not(feature = "parallel"))]
pub mod serial;

#[cfg(feature = "parallel")]
pub mod parallel;

pub use node_score::NodeScorer;
pub use traits::ScoreOps;

#[cfg(not(feature = "parallel"))]
pub use serial::SerialScoreOps;

#[cfg(feature = "parallel")]
pub use parallel::ParallelScoreOps;

/// The rescoring pass selected by the `parallel` feature.
#[cfg(not(feature = "parallel"))]
pub type DefaultScoreOps = SerialScoreOps;

/// The rescoring pass selected by the `parallel` feature.
#[cfg(feature = "parallel")]
pub type DefaultScoreOps = ParallelScoreOps;
