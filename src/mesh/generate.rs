//! Leaf walk that turns a node buffer into triangles.

use crate::float_types::Real;
use crate::geometry::{tri_mod, triangle_normal};
use crate::mesh::{Mesh, Vertex};
use crate::node::{Node, NodeBuffer, PointIndex};
use log::{debug, warn};
use nalgebra::Vector3;

/// Refills `mesh` with every leaf of `buffer`.
///
/// Leaves whose neighbours are one level finer get extra triangles fanned from the shared
/// mid-points, so the mesh has no T-junctions. Vertices are shared through the points'
/// back-pointers, except that flat shading gives each face its own third vertex. Faces
/// that would overflow the mesh are dropped.
///
/// Takes `buffer` by shared reference: it must not be mutated during the walk.
pub fn generate_mesh(buffer: &NodeBuffer, mesh: &mut Mesh) {
    mesh.clear();
    buffer.points().clear_pointers();

    let mut builder = Builder {
        buffer,
        mesh: &mut *mesh,
        dropped: 0,
    };
    for leaf in buffer.leaves() {
        for_each_face(leaf, |face| builder.add_face(leaf, face));
    }

    let dropped = builder.dropped;
    if dropped > 0 {
        warn!("mesh is full, dropped {dropped} faces");
    }
    mesh.normalize_normals();
    debug!("generated mesh: {} vertices, {} faces", mesh.vertices().len(), mesh.num_faces());
}

/// Calls `f` with each triangle `node` is drawn as.
fn for_each_face(node: &Node, mut f: impl FnMut([PointIndex; 3])) {
    let Some(c) = node.corners() else {
        return;
    };
    let mid = |i: usize| node.cousin(i).and(node.mid_point(i));
    let m = [mid(0), mid(1), mid(2)];

    match m {
        [None, None, None] => f(c),
        [Some(m0), Some(m1), Some(m2)] => {
            f([c[0], m2, m1]);
            f([m2, c[1], m0]);
            f([m1, m0, c[2]]);
            f([m0, m1, m2]);
        }
        // Exactly one rotation matches a partially split leaf.
        _ => {
            for i in 0..3 {
                let (j, k) = (tri_mod(i + 1), tri_mod(i + 2));
                match (m[i], m[j], m[k]) {
                    (Some(mi), None, None) => {
                        f([mi, c[i], c[j]]);
                        f([mi, c[k], c[i]]);
                    }
                    (None, Some(mj), Some(mk)) => {
                        f([mk, mj, c[i]]);
                        f([c[j], c[k], mk]);
                        f([mj, mk, c[k]]);
                    }
                    _ => {}
                }
            }
        }
    }
}

struct Builder<'a> {
    buffer: &'a NodeBuffer,
    mesh: &'a mut Mesh,
    dropped: usize,
}

impl Builder<'_> {
    fn add_face(&mut self, leaf: &Node, face: [PointIndex; 3]) {
        let buffer = self.buffer;
        let points = buffer.points();
        let flat_shaded = self.mesh.properties().flat_shaded;

        let shared_points = if flat_shaded { &face[..2] } else { &face[..] };
        let mut needed = shared_points.iter().filter(|&&p| points[p].vertex().is_none()).count();
        if flat_shaded {
            needed += 1;
        }
        if !self.mesh.has_room_for(needed) {
            self.dropped += 1;
            return;
        }

        let [a, b, c] = face.map(|p| points[p].pos);
        let normal = triangle_normal(&a, &b, &c)
            .try_normalize(Real::EPSILON)
            .unwrap_or(leaf.normal);

        let shared = |builder: &mut Self, p: PointIndex| -> u32 {
            let index = match points[p].vertex() {
                Some(index) => index,
                None => {
                    let index = builder.mesh.push_vertex(Vertex::new(points[p].pos, Vector3::zeros()));
                    points[p].set_vertex(index);
                    index
                }
            };
            builder.mesh.vertices[index as usize].normal += normal;
            index
        };

        let ia = shared(self, face[0]);
        let ib = shared(self, face[1]);
        let ic = if flat_shaded {
            self.mesh.push_vertex(Vertex::new(c, normal))
        } else {
            shared(self, face[2])
        };
        self.mesh.push_face([ia, ib, ic]);
    }
}
