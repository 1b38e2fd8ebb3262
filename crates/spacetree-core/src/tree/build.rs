//! Recursive construction of the partition.
//!
//! Splitting never touches point data: it permutes the slice of the shared
//! index array owned by the node being split, then allocates children over
//! the two halves. The same [`Builder::split_node`] drives both the
//! initial build and in-place re-splits of leaves that outgrow their
//! capacity after insertion.

use crate::config::TreeConfig;
use crate::dataset::PointId;
use crate::diagnostics::{DiagnosticsSink, LeafReason};
use crate::error::TreeResult;
use crate::metric::DimRange;

use super::node::{NodeId, SpaceNode, Split};
use super::BuiltState;

/// Width relative to the universe. A dimension the universe never spread
/// in reports zero, so the tree refuses to split along it even when later
/// insertions gave it raw width.
fn relative_width(node_width: f64, universe_width: f64) -> f64 {
    if universe_width > 0.0 {
        node_width / universe_width
    } else {
        0.0
    }
}

/// Borrow bundle for construction: the mutable built state plus the
/// read-only knobs that live on the tree.
pub(crate) struct Builder<'a> {
    pub(crate) state: &'a mut BuiltState,
    pub(crate) config: &'a TreeConfig,
    pub(crate) diag: &'a dyn DiagnosticsSink,
}

impl Builder<'_> {
    /// Allocates a node over `idx[start..=end]` and recursively splits it.
    /// `ranges` saves a scan when the caller already knows the bounding
    /// box, as the root does with the freshly computed universe.
    pub(crate) fn build_node(
        &mut self,
        start: usize,
        end: usize,
        ranges: Option<Vec<DimRange>>,
        depth: usize,
    ) -> TreeResult<NodeId> {
        let ranges = match ranges {
            Some(ranges) => ranges,
            None => {
                let ids: Vec<PointId> = self.state.idx[start..=end].to_vec();
                self.state.metric.initialize_ranges(&self.state.data, ids)?
            }
        };
        let id = NodeId::new(self.state.arena.len());
        self.state.arena.push(SpaceNode::leaf(start, end, ranges));
        self.split_node(id, depth)?;
        Ok(id)
    }

    /// Splits the given leaf if it is over capacity and wide enough,
    /// recursing into the children. Leaves the node alone otherwise.
    ///
    /// Also the re-split entry point after insertion: the node keeps its
    /// arena slot and only gains a split record and children.
    pub(crate) fn split_node(&mut self, node_id: NodeId, depth: usize) -> TreeResult<()> {
        let (start, end) = {
            let node = &self.state.arena[node_id.index()];
            (node.start, node.end)
        };
        let count = end - start + 1;
        if count <= self.config.max_leaf_size {
            self.diag.leaf_settled(depth, count, LeafReason::SmallCount);
            return Ok(());
        }
        let Some((dim, value)) = self.choose_split(node_id) else {
            self.diag.leaf_settled(depth, count, LeafReason::ThinBox);
            return Ok(());
        };

        // Stable partition of the node's index slice around the midpoint.
        let mut left_ids = Vec::new();
        let mut right_ids = Vec::new();
        for pos in start..=end {
            let pid = self.state.idx[pos];
            if self
                .state
                .metric
                .value_is_smaller_equal(self.state.data.point(pid), dim, value)
            {
                left_ids.push(pid);
            } else {
                right_ids.push(pid);
            }
        }
        // A midpoint can collapse onto the extremes when the box width
        // underflows; one empty side means the split buys nothing.
        if left_ids.is_empty() || right_ids.is_empty() {
            self.diag.leaf_settled(depth, count, LeafReason::DegenerateSplit);
            return Ok(());
        }

        let num_left = left_ids.len();
        for (offset, pid) in left_ids.into_iter().chain(right_ids).enumerate() {
            self.state.idx[start + offset] = pid;
        }
        self.diag.node_split(depth, dim, value, num_left, count - num_left);

        let left = self.build_node(start, start + num_left - 1, None, depth + 1)?;
        let right = self.build_node(start + num_left, end, None, depth + 1)?;
        self.state.arena[node_id.index()].split = Some(Split {
            dim,
            value,
            left,
            right,
        });
        Ok(())
    }

    /// Picks the widest feature dimension and its midpoint, or `None`
    /// when every dimension is too thin for a split to be worthwhile.
    fn choose_split(&self, node_id: NodeId) -> Option<(usize, f64)> {
        let node = &self.state.arena[node_id.index()];
        let mut best_dim = None;
        let mut best_width = 0.0;
        for dim in 0..self.state.metric.num_attributes() {
            if self.state.metric.is_class_dimension(dim) {
                continue;
            }
            let width = if self.config.normalize_box_width {
                relative_width(node.ranges[dim].width, self.state.universe[dim].width)
            } else {
                node.ranges[dim].width
            };
            if width > best_width {
                best_width = width;
                best_dim = Some(dim);
            }
        }
        let dim = best_dim?;
        let rel = relative_width(node.ranges[dim].width, self.state.universe[dim].width);
        if rel < self.config.min_box_rel_width {
            return None;
        }
        let range = &node.ranges[dim];
        Some((dim, range.min + range.width * 0.5))
    }
}
