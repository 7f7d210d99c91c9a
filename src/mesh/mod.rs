//! Indexed triangle meshes extracted from the leaves of a node buffer.
//!
//! A [`Mesh`] is allocated once at full capacity and then refilled in place, so the
//! formation worker and the renderer can pass the same two meshes back and forth forever.

pub mod generate;

pub use generate::generate_mesh;

use crate::float_types::Real;
use nalgebra::{Point3, Vector3};

/// A mesh vertex, holding position and normal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    pub pos: Point3<Real>,
    pub normal: Vector3<Real>,
}

impl Vertex {
    pub const fn new(pos: Point3<Real>, normal: Vector3<Real>) -> Self {
        Vertex { pos, normal }
    }
}

/// How a mesh was built.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeshProperties {
    /// Universal position the vertex positions are relative to.
    pub origin: Vector3<f64>,
    /// Each face has its own normal on its third vertex instead of smooth vertex normals.
    pub flat_shaded: bool,
}

impl Default for MeshProperties {
    fn default() -> Self {
        Self {
            origin: Vector3::zeros(),
            flat_shaded: false,
        }
    }
}

/// Vertex and index buffers of fixed capacity.
#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    vertices: Vec<Vertex>,
    indices: Vec<u32>,
    properties: MeshProperties,
    vertex_capacity: usize,
    index_capacity: usize,
}

impl Mesh {
    pub fn with_capacity(vertex_capacity: usize, index_capacity: usize) -> Self {
        Self {
            vertices: Vec::with_capacity(vertex_capacity),
            indices: Vec::with_capacity(index_capacity),
            properties: MeshProperties::default(),
            vertex_capacity,
            index_capacity,
        }
    }

    /// Empties the buffers, keeping their allocations.
    pub fn clear(&mut self) {
        self.vertices.clear();
        self.indices.clear();
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    /// Three per triangle, counter-clockwise seen from outside.
    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    pub const fn properties(&self) -> &MeshProperties {
        &self.properties
    }

    pub const fn properties_mut(&mut self) -> &mut MeshProperties {
        &mut self.properties
    }

    pub fn num_faces(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub const fn vertex_capacity(&self) -> usize {
        self.vertex_capacity
    }

    pub const fn index_capacity(&self) -> usize {
        self.index_capacity
    }

    /// Whether `vertices` more vertices and one more triangle still fit.
    fn has_room_for(&self, vertices: usize) -> bool {
        self.vertices.len() + vertices <= self.vertex_capacity && self.indices.len() + 3 <= self.index_capacity
    }

    fn push_vertex(&mut self, vertex: Vertex) -> u32 {
        let index = self.vertices.len() as u32;
        self.vertices.push(vertex);
        index
    }

    fn push_face(&mut self, face: [u32; 3]) {
        self.indices.extend_from_slice(&face);
    }

    /// Turns the accumulated face normals of every vertex into unit normals.
    fn normalize_normals(&mut self) {
        for vertex in &mut self.vertices {
            if let Some(normal) = vertex.normal.try_normalize(0.0) {
                vertex.normal = normal;
            }
        }
    }

    /// Surface area of all triangles.
    pub fn area(&self) -> Real {
        self.indices
            .chunks_exact(3)
            .map(|face| {
                let [a, b, c] = [face[0], face[1], face[2]].map(|i| self.vertices[i as usize].pos);
                crate::geometry::triangle_area(&a, &b, &c)
            })
            .sum()
    }
}
