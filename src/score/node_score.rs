use crate::float_types::Real;
use crate::node::Node;
use nalgebra::Point3;

/// Scores nodes against one camera position.
///
/// `score = area * exp(facing) / max(distance², near²)` where `facing` is the cosine between
/// the node's normal and the direction from the node to the camera. The exponential keeps
/// every score positive, so back-facing nodes still order by size and distance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeScorer {
    camera_position: Point3<Real>,
    min_distance_squared: Real,
}

impl NodeScorer {
    pub fn new(camera_position: Point3<Real>, camera_near: Real) -> Self {
        let near = camera_near.max(Real::EPSILON);
        Self {
            camera_position,
            min_distance_squared: near * near,
        }
    }

    pub const fn camera_position(&self) -> &Point3<Real> {
        &self.camera_position
    }

    pub fn score(&self, node: &Node) -> Real {
        let to_camera = self.camera_position - node.center;
        let distance_squared = to_camera.norm_squared();

        let facing = if distance_squared > 0.0 {
            to_camera.dot(&node.normal) / distance_squared.sqrt()
        } else {
            0.0
        };

        node.area * facing.exp() / distance_squared.max(self.min_distance_squared)
    }
}

impl Default for NodeScorer {
    fn default() -> Self {
        Self::new(Point3::origin(), 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Vector3;

    fn facing_up(area: Real) -> Node {
        Node {
            area,
            normal: Vector3::z(),
            ..Node::default()
        }
    }

    #[test]
    fn nearer_larger_and_facing_nodes_score_higher() {
        let node = facing_up(1.0);

        let above = NodeScorer::new(Point3::new(0.0, 0.0, 2.0), 0.1);
        let far_above = NodeScorer::new(Point3::new(0.0, 0.0, 4.0), 0.1);
        let below = NodeScorer::new(Point3::new(0.0, 0.0, -2.0), 0.1);

        assert!(above.score(&node) > far_above.score(&node));
        assert!(above.score(&node) > below.score(&node));
        assert!(above.score(&facing_up(2.0)) > above.score(&node));

        // Back-facing still scores above zero.
        assert!(below.score(&node) > 0.0);
    }

    #[test]
    fn score_formula() {
        let scorer = NodeScorer::new(Point3::new(0.0, 0.0, 2.0), 0.1);
        let expected = 3.0 * (1.0 as Real).exp() / 4.0;
        assert!((scorer.score(&facing_up(3.0)) - expected).abs() < 1e-5);
    }

    #[test]
    fn near_plane_clamps_distance() {
        let scorer = NodeScorer::new(Point3::origin(), 0.5);
        // Camera sitting on the node: facing is neutral, distance clamps to the near plane.
        assert!((scorer.score(&facing_up(1.0)) - 4.0).abs() < 1e-5);
    }
}
