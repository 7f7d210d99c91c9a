//! The fixed node arena and the per-tick scoring and churn state machine.

use crate::config::FormationConfig;
use crate::float_types::Real;
use crate::geometry::Ray3;
use crate::node::expand::Expansion;
use crate::node::node::{Node, NodeIndex};
use crate::node::point::{PointBuffer, PointIndex};
use crate::node::quaterna::Quaterna;
use crate::score::{DefaultScoreOps, NodeScorer, ScoreOps};
use crate::shader::ShaderSource;
use log::{debug, trace, warn};
use nalgebra::Point3;

/// What one [`NodeBuffer::tick`] did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickStats {
    /// Whether the camera moved enough to rescore every node.
    pub rescored: bool,
    /// Score, sort and churn passes run.
    pub passes: usize,
    /// Successful expansions over all passes.
    pub expansions: usize,
}

/// What churn should do with one candidate, decided without changing the buffer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ChurnStep {
    /// Commit this expansion with [`NodeBuffer::commit_expansion`].
    Expand(Expansion),
    /// Leave the candidate alone and offer the next one.
    Skip,
    /// The candidate no longer beats the threshold; neither will any after it.
    Stop,
}

/// Owns every node, quaterna and point of one scene.
///
/// The node arena is laid out as `[roots][quaterna blocks]`: the first `max_roots` nodes
/// are root slots handed out to formations, the rest come in blocks of four, one per
/// quaterna. The quaterna array is kept partitioned as
/// `[sorted used][unsorted used][unused]`, with
/// `sorted_end <= used_end <= used_end_target <= quaterna.len()`.
pub struct NodeBuffer {
    pub(super) nodes: Box<[Node]>,
    pub(super) max_roots: usize,
    pub(super) free_roots: Vec<NodeIndex>,
    pub(super) quaterna: Box<[Quaterna]>,
    pub(super) sorted_end: usize,
    pub(super) used_end: usize,
    pub(super) used_end_target: usize,
    pub(super) points: PointBuffer,
    pub(super) scorer: NodeScorer,
    score_ops: DefaultScoreOps,
    scored_camera: Option<Point3<Real>>,
    scores: Vec<Real>,
    candidates: Vec<NodeIndex>,
    fixed_target: Option<usize>,
    camera_near: Real,
    rescore_distance: Real,
    max_churn_passes: usize,
}

impl std::fmt::Debug for NodeBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeBuffer")
            .field("roots", &self.num_roots())
            .field("sorted_end", &self.sorted_end)
            .field("used_end", &self.used_end)
            .field("used_end_target", &self.used_end_target)
            .field("max_quaterna", &self.quaterna.len())
            .field("points", &self.points.len())
            .finish_non_exhaustive()
    }
}

impl NodeBuffer {
    /// Allocates everything the buffer will ever use.
    pub fn new(config: &FormationConfig) -> Self {
        let max_roots = config.max_formations;
        let max_quaterna = config.max_quaterna;
        let num_nodes = max_roots + max_quaterna * 4;
        assert!(num_nodes <= u32::MAX as usize, "too many nodes: {num_nodes}");

        let quaterna = (0..max_quaterna)
            .map(|q| Quaterna::new(NodeIndex::from_usize(max_roots + q * 4)))
            .collect();
        let target = config
            .fixed_quaterna
            .unwrap_or(config.initial_quaterna)
            .min(max_quaterna);

        Self {
            nodes: vec![Node::default(); num_nodes].into_boxed_slice(),
            max_roots,
            free_roots: (0..max_roots).rev().map(NodeIndex::from_usize).collect(),
            quaterna,
            sorted_end: 0,
            used_end: 0,
            used_end_target: target,
            points: PointBuffer::with_capacity(config.max_points()),
            scorer: NodeScorer::new(Point3::origin(), config.camera_near),
            score_ops: DefaultScoreOps::new(),
            scored_camera: None,
            scores: Vec::with_capacity(max_quaterna * 4),
            candidates: Vec::with_capacity(num_nodes),
            fixed_target: config.fixed_quaterna,
            camera_near: config.camera_near,
            rescore_distance: config.rescore_distance,
            max_churn_passes: config.max_churn_passes.max(1),
        }
    }

    #[inline]
    pub fn node(&self, index: NodeIndex) -> &Node {
        &self.nodes[index.index()]
    }

    #[inline]
    pub(super) fn node_mut(&mut self, index: NodeIndex) -> &mut Node {
        &mut self.nodes[index.index()]
    }

    pub const fn points(&self) -> &PointBuffer {
        &self.points
    }

    pub fn max_quaterna(&self) -> usize {
        self.quaterna.len()
    }

    pub const fn num_quaterna_used(&self) -> usize {
        self.used_end
    }

    pub const fn num_quaterna_used_target(&self) -> usize {
        self.used_end_target
    }

    pub const fn max_churn_passes(&self) -> usize {
        self.max_churn_passes
    }

    pub const fn num_quaterna_sorted(&self) -> usize {
        self.sorted_end
    }

    /// The used quaterna, sorted prefix first.
    pub fn used_quaterna(&self) -> &[Quaterna] {
        &self.quaterna[..self.used_end]
    }

    /// Nodes in use, counting live roots.
    pub fn num_nodes_used(&self) -> usize {
        self.used_end * 4 + self.num_roots()
    }

    pub fn num_roots(&self) -> usize {
        self.max_roots - self.free_roots.len()
    }

    /// True while there is unused capacity below the target.
    pub const fn is_growing(&self) -> bool {
        self.used_end < self.used_end_target
    }

    #[inline]
    pub const fn is_root(&self, index: NodeIndex) -> bool {
        index.index() < self.max_roots
    }

    /// The root at the top of `index`'s tree.
    pub fn root_of(&self, mut index: NodeIndex) -> NodeIndex {
        while let Some(parent) = self.node(index).parent {
            index = parent;
        }
        index
    }

    /// Every leaf of every live tree: unexpanded roots, then leaves of used quaterna.
    pub fn leaves(&self) -> impl Iterator<Item = &Node> + '_ {
        let roots = self.nodes[..self.max_roots]
            .iter()
            .filter(|root| root.has_all_cousins());
        let children = self.used_quaterna().iter().flat_map(move |q| {
            let first = q.nodes.index();
            self.nodes[first..first + 4].iter()
        });
        roots.chain(children).filter(|node| node.is_leaf())
    }

    ////////////////////////////////////////////////////////////////////////////////
    // Roots

    /// Claims a root slot and its four points, seeding the degenerate root triangle
    /// whose four children form the initial tetrahedron.
    pub fn create_root(&mut self, seed: u32, positions: [Point3<Real>; 4]) -> Option<NodeIndex> {
        let root = self.free_roots.pop()?;

        let mut points = [None; 4];
        for (point, pos) in points.iter_mut().zip(positions) {
            *point = self.points.create(pos);
        }
        let [Some(p0), Some(p1), Some(p2), Some(p3)] = points else {
            points.into_iter().flatten().for_each(|p| self.points.destroy(p));
            self.free_roots.push(root);
            return None;
        };

        let node = self.node_mut(root);
        *node = Node {
            seed,
            score: Real::MAX,
            ..Node::default()
        };
        for (t, mid_point) in node.triple.iter_mut().zip([p1, p2, p3]) {
            t.corner = Some(p0);
            t.mid_point = Some(mid_point);
            t.cousin = Some(root);
        }

        trace!("created root {root:?}");
        Some(root)
    }

    /// Collapses a root's whole tree and returns the root and its points to their pools.
    pub fn destroy_root(&mut self, root: NodeIndex) {
        debug_assert!(self.is_root(root));
        self.collapse_nodes(root);

        if let Some(points) = self.root_points(root) {
            points.into_iter().for_each(|p| self.points.destroy(p));
        }
        *self.node_mut(root) = Node::default();
        self.free_roots.push(root);
        trace!("destroyed root {root:?}");
    }

    /// The tetrahedron points owned by a root.
    pub fn root_points(&self, root: NodeIndex) -> Option<[PointIndex; 4]> {
        let node = self.node(root);
        Some([node.corner(0)?, node.mid_point(0)?, node.mid_point(1)?, node.mid_point(2)?])
    }

    /// Moves a collapsed root's points, e.g. after an origin change.
    pub fn set_root_positions(&mut self, root: NodeIndex, positions: [Point3<Real>; 4]) {
        debug_assert!(self.node(root).is_leaf());
        if let Some(points) = self.root_points(root) {
            for (point, pos) in points.into_iter().zip(positions) {
                self.points[point].pos = pos;
            }
        }
    }

    ////////////////////////////////////////////////////////////////////////////////
    // Targets

    /// Increasing only moves the target; growth happens during churn. Decreasing
    /// releases the lowest-scoring recyclable quaterna until the target is met or
    /// nothing more can be released without orphaning expanded descendants.
    pub fn set_num_quaterna_used_target(&mut self, target: usize) {
        if self.fixed_target.is_some() {
            return;
        }

        let target = target.min(self.quaterna.len());
        if target >= self.used_end {
            self.used_end_target = target;
            return;
        }

        self.update_quaterna();
        let mut excess = self.used_end - target;
        while excess > 0 {
            let before = excess;
            for q in (0..self.used_end).rev() {
                if excess == 0 {
                    break;
                }
                if self.is_quaterna_recyclable(q) {
                    self.release_quaterna(q);
                    excess -= 1;
                }
            }
            if excess == before {
                warn!("could only release {} of {} quaterna", self.used_end - target - excess, self.used_end - target);
                break;
            }
        }

        self.compact();
        self.used_end_target = self.used_end;
        debug!("quaterna target decreased to {}", self.used_end_target);
    }

    pub(super) fn release_quaterna(&mut self, q: usize) {
        let block = self.quaterna[q].nodes;
        self.deinit_children(block);
        self.quaterna[q].parent_score = Quaterna::UNUSED_SCORE;
    }

    ////////////////////////////////////////////////////////////////////////////////
    // Tick

    /// Rescores, re-sorts and churns until a pass makes no expansion.
    pub fn tick(&mut self, camera: &Ray3<Real>, shaders: &dyn ShaderSource) -> TickStats {
        let mut stats = TickStats {
            rescored: self.update_node_scores(camera),
            ..TickStats::default()
        };

        while stats.passes < self.max_churn_passes {
            self.update_quaterna();
            let expansions = self.churn_nodes(shaders);
            stats.passes += 1;
            stats.expansions += expansions;
            if expansions == 0 {
                break;
            }
        }

        debug!(
            "tick: {} expansions in {} passes, {}/{} quaterna used",
            stats.expansions, stats.passes, self.used_end, self.used_end_target
        );
        stats
    }

    /// Rescores every node in use if the camera has moved more than the rescore
    /// distance since the last rescore.
    pub fn update_node_scores(&mut self, camera: &Ray3<Real>) -> bool {
        let Some(scorer) = self.rescorer(camera) else {
            return false;
        };

        let mut scores = std::mem::take(&mut self.scores);
        self.compute_scores(&scorer, &mut scores);
        self.apply_scores(scorer, &scores);
        self.scores = scores;
        true
    }

    /// The scorer for a full rescore, or `None` while the camera is within the rescore
    /// distance of the last one.
    pub fn rescorer(&self, camera: &Ray3<Real>) -> Option<NodeScorer> {
        if let Some(scored) = self.scored_camera {
            if (camera.position - scored).norm() <= self.rescore_distance {
                return None;
            }
        }
        Some(NodeScorer::new(camera.position, self.camera_near))
    }

    /// Scores every quaterna node into `scores` without touching the buffer.
    pub fn compute_scores(&self, scorer: &NodeScorer, scores: &mut Vec<Real>) {
        let nodes = &self.nodes[self.max_roots..];
        scores.clear();
        scores.resize(nodes.len(), 0.0);
        self.score_ops.score_nodes(scorer, nodes, scores);
    }

    /// Installs scores from [`compute_scores`](Self::compute_scores) and the scorer used
    /// for new children from now on.
    pub fn apply_scores(&mut self, scorer: NodeScorer, scores: &[Real]) {
        debug_assert_eq!(scores.len(), self.nodes.len() - self.max_roots);
        for (node, &score) in self.nodes[self.max_roots..].iter_mut().zip(scores) {
            node.score = score;
        }
        self.scored_camera = Some(*scorer.camera_position());
        self.scorer = scorer;
    }

    /// Forces a full rescore on the next tick.
    pub fn invalidate_scores(&mut self) {
        self.scored_camera = None;
    }

    /// Copies each parent's score into its quaterna, then sorts the used range by it, best first.
    pub fn update_quaterna(&mut self) {
        for q in self.quaterna[..self.used_end].iter_mut() {
            if let Some(parent) = self.nodes[q.nodes.index()].parent {
                q.parent_score = self.nodes[parent.index()].score;
            }
        }

        self.quaterna[..self.used_end].sort_unstable_by(|a, b| b.parent_score.total_cmp(&a.parent_score));
        self.sorted_end = self.used_end;
    }

    /// Score a node must beat to be worth expanding right now.
    pub fn worse_replaceable_quaterna_score(&self) -> Real {
        if self.is_growing() {
            return Real::NEG_INFINITY;
        }

        (0..self.sorted_end)
            .rev()
            .find(|&q| self.is_quaterna_recyclable(q))
            .map_or(Real::INFINITY, |q| self.quaterna[q].parent_score)
    }

    /// Expands the best expandable nodes in score order while they beat the worst
    /// replaceable quaterna. Returns the number of expansions.
    pub fn churn_nodes(&mut self, shaders: &dyn ShaderSource) -> usize {
        let mut candidates = std::mem::take(&mut self.candidates);
        let mut threshold = self.gather_candidates(&mut candidates);

        let mut expansions = 0;
        for &candidate in &candidates {
            match self.plan_churn(candidate, threshold, shaders) {
                ChurnStep::Stop => break,
                ChurnStep::Skip => {}
                ChurnStep::Expand(expansion) => {
                    if self.commit_expansion(&expansion) {
                        expansions += 1;
                        threshold = self.worse_replaceable_quaterna_score();
                    }
                }
            }
        }

        self.candidates = candidates;
        expansions
    }

    /// Fills `candidates` with the expandable nodes that beat the worst replaceable
    /// quaterna, best first, and returns that quaterna's score.
    pub fn gather_candidates(&self, candidates: &mut Vec<NodeIndex>) -> Real {
        let threshold = self.worse_replaceable_quaterna_score();

        candidates.clear();
        candidates.extend(
            (0..self.max_roots)
                .map(NodeIndex::from_usize)
                .chain(self.used_quaterna().iter().flat_map(|q| q.node_indices()))
                .filter(|&n| {
                    let node = self.node(n);
                    node.is_expandable() && node.score > threshold
                }),
        );
        candidates.sort_unstable_by(|&a, &b| self.node(b).score.total_cmp(&self.node(a).score));
        threshold
    }

    /// Decides what churn does with `candidate` given the current `threshold`.
    pub fn plan_churn(&self, candidate: NodeIndex, threshold: Real, shaders: &dyn ShaderSource) -> ChurnStep {
        let node = self.node(candidate);
        if node.score <= threshold {
            return ChurnStep::Stop;
        }
        // An earlier expansion may have recycled this node or one of its cousins.
        if !node.is_expandable() {
            return ChurnStep::Skip;
        }

        self.prepare_expansion(candidate, shaders)
            .map_or(ChurnStep::Skip, ChurnStep::Expand)
    }

    ////////////////////////////////////////////////////////////////////////////////
    // Quaterna state

    #[inline]
    pub(super) fn is_quaterna_in_use(&self, q: usize) -> bool {
        self.node(self.quaterna[q].nodes).is_in_use()
    }

    /// In use, all four nodes are leaves and so are all their cousins. Releasing such a
    /// quaterna never leaves neighbours more than one level apart.
    pub(super) fn is_quaterna_recyclable(&self, q: usize) -> bool {
        self.quaterna[q].node_indices().into_iter().all(|n| {
            let node = self.node(n);
            node.is_in_use()
                && node.is_leaf()
                && node
                    .triple
                    .iter()
                    .all(|t| t.cousin.is_none_or(|cousin| self.node(cousin).is_leaf()))
        })
    }

    /// Moves quaterna that are no longer in use out of the used range, keeping the
    /// survivors in their relative order.
    pub(super) fn compact(&mut self) {
        let mut write = 0;
        let mut sorted_survivors = 0;
        for read in 0..self.used_end {
            if self.is_quaterna_in_use(read) {
                self.quaterna.swap(write, read);
                if read < self.sorted_end {
                    sorted_survivors += 1;
                }
                write += 1;
            }
        }

        for q in &mut self.quaterna[write..self.used_end] {
            q.parent_score = Quaterna::UNUSED_SCORE;
        }

        if write != self.used_end {
            trace!("compacted used quaterna from {} to {}", self.used_end, write);
        }
        self.used_end = write;
        self.sorted_end = sorted_survivors;
    }
}
