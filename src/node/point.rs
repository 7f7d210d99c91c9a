//! Fixed-capacity pool of shared corner positions.

use crate::float_types::Real;
use log::error;
use nalgebra::Point3;
use std::ops::{Index, IndexMut};
use std::sync::atomic::{AtomicU32, Ordering};

/// Handle to a [`Point`] inside a [`PointBuffer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PointIndex(u32);

impl PointIndex {
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

const NO_VERTEX: u32 = u32::MAX;

/// A position shared by every node that has it as a corner or mid-point.
///
/// `vertex` is a transient back-pointer into the mesh currently being generated. It is
/// atomic so that mesh generation only needs shared access to the node tree.
#[derive(Debug)]
pub struct Point {
    pub pos: Point3<Real>,
    vertex: AtomicU32,
}

impl Point {
    fn new() -> Self {
        Self {
            pos: Point3::origin(),
            vertex: AtomicU32::new(NO_VERTEX),
        }
    }

    /// Index of the mesh vertex generated from this point, if any.
    #[inline]
    pub fn vertex(&self) -> Option<u32> {
        match self.vertex.load(Ordering::Relaxed) {
            NO_VERTEX => None,
            index => Some(index),
        }
    }

    #[inline]
    pub fn set_vertex(&self, index: u32) {
        self.vertex.store(index, Ordering::Relaxed);
    }

    #[inline]
    fn clear_vertex(&self) {
        self.vertex.store(NO_VERTEX, Ordering::Relaxed);
    }
}

/// Pool of [`Point`]s. Created once at full capacity, never resized.
#[derive(Debug)]
pub struct PointBuffer {
    points: Box<[Point]>,
    live: Box<[bool]>,
    free: Vec<PointIndex>,
    high_water: usize,
}

impl PointBuffer {
    pub fn with_capacity(capacity: usize) -> Self {
        assert!(capacity < NO_VERTEX as usize, "point capacity {capacity} is too large");
        Self {
            points: (0..capacity).map(|_| Point::new()).collect(),
            live: vec![false; capacity].into_boxed_slice(),
            // Popped from the back, so the lowest indices go out first.
            free: (0..capacity as u32).rev().map(PointIndex).collect(),
            high_water: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.points.len()
    }

    /// Number of live points.
    pub fn len(&self) -> usize {
        self.points.len() - self.free.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The largest number of points that have ever been live at once.
    pub const fn high_water_mark(&self) -> usize {
        self.high_water
    }

    pub fn is_live(&self, point: PointIndex) -> bool {
        self.live.get(point.index()).copied().unwrap_or(false)
    }

    /// Takes a point from the pool. Running out means the bookkeeping is broken.
    pub fn create(&mut self, pos: Point3<Real>) -> Option<PointIndex> {
        debug_assert!(!self.free.is_empty(), "point buffer exhausted ({} points)", self.points.len());
        let Some(point) = self.free.pop() else {
            error!("point buffer exhausted ({} points)", self.points.len());
            return None;
        };

        let slot = &mut self.points[point.index()];
        slot.pos = pos;
        slot.clear_vertex();
        self.live[point.index()] = true;
        self.high_water = self.high_water.max(self.len());
        Some(point)
    }

    /// Returns a point to the pool.
    pub fn destroy(&mut self, point: PointIndex) {
        debug_assert!(self.live[point.index()], "double free of {point:?}");
        self.live[point.index()] = false;
        self.free.push(point);
    }

    /// Forgets every vertex back-pointer ahead of a new mesh.
    pub fn clear_pointers(&self) {
        self.points.iter().for_each(Point::clear_vertex);
    }
}

impl Index<PointIndex> for PointBuffer {
    type Output = Point;

    #[inline]
    fn index(&self, point: PointIndex) -> &Point {
        &self.points[point.index()]
    }
}

impl IndexMut<PointIndex> for PointBuffer {
    #[inline]
    fn index_mut(&mut self, point: PointIndex) -> &mut Point {
        &mut self.points[point.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_and_destroy_recycle_slots() {
        let mut points = PointBuffer::with_capacity(3);
        assert!(points.is_empty());

        let a = points.create(Point3::new(1.0, 0.0, 0.0)).unwrap();
        let b = points.create(Point3::new(0.0, 1.0, 0.0)).unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(points[b].pos, Point3::new(0.0, 1.0, 0.0));

        points.destroy(a);
        assert!(!points.is_live(a));
        assert_eq!(points.len(), 1);

        // The freed slot is handed out again.
        let c = points.create(Point3::new(0.0, 0.0, 1.0)).unwrap();
        assert_eq!(c, a);
        assert_eq!(points.high_water_mark(), 2);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "point buffer exhausted")]
    fn exhausting_the_pool_is_a_bug() {
        let mut points = PointBuffer::with_capacity(1);
        points.create(Point3::origin()).unwrap();
        let _ = points.create(Point3::origin());
    }

    #[test]
    fn vertex_back_pointers_clear() {
        let mut points = PointBuffer::with_capacity(1);
        let a = points.create(Point3::origin()).unwrap();
        assert_eq!(points[a].vertex(), None);

        points[a].set_vertex(7);
        assert_eq!(points[a].vertex(), Some(7));

        points.clear_pointers();
        assert_eq!(points[a].vertex(), None);
    }
}
