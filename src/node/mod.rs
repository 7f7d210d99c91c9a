//! The node graph: pooled points, quad-tree nodes grouped into quaterna, and the
//! [`NodeBuffer`] that scores, expands, collapses and recycles them.
//!
//! All links between nodes are [`NodeIndex`] handles into one fixed arena, and all links
//! to points are [`PointIndex`] handles into one fixed [`PointBuffer`]. Nothing is allocated
//! after [`NodeBuffer::new`].

pub mod buffer;
pub mod expand;
#[allow(clippy::module_inception)]
pub mod node;
pub mod point;
pub mod quaterna;
pub mod verify;

pub use buffer::{ChurnStep, NodeBuffer, TickStats};
pub use expand::Expansion;
pub use node::{Node, NodeIndex, Triplet};
pub use point::{Point, PointBuffer, PointIndex};
pub use quaterna::Quaterna;
