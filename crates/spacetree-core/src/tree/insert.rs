//! Online insertion.
//!
//! An insert descends from the root to exactly one leaf. Every node on the
//! path absorbs the point: its `end` grows by one and its box widens to
//! cover the new values. Whenever the descent takes a left child, the
//! entire right sibling subtree shifts one slot to the right, because the
//! new point will occupy an index position before all of its points. The
//! point id itself is spliced into the shared index array at the target
//! leaf's last position, and a leaf pushed over capacity re-splits in
//! place.
//!
//! A structural error from any step means the splice left bookkeeping
//! half-applied; per the error contract the caller discards the tree and
//! rebuilds it from the dataset.

use tracing::debug;

use crate::config::TreeConfig;
use crate::dataset::{Point, PointId};
use crate::diagnostics::DiagnosticsSink;
use crate::error::{TreeError, TreeResult};

use super::build::Builder;
use super::node::NodeId;
use super::{BuiltState, KdTree};

impl KdTree {
    /// Adds one point to the dataset and the partition.
    ///
    /// # Errors
    /// - [`TreeError::NotBuilt`] before the first `build`.
    /// - [`TreeError::InvalidInput`] on a dimension-count mismatch.
    /// - [`TreeError::MissingValue`] when a feature value is missing.
    /// - [`TreeError::StructuralInconsistency`] when bookkeeping is found
    ///   (or left) damaged; rebuild from the dataset to recover.
    pub fn insert(&mut self, point: Point) -> TreeResult<PointId> {
        let Self {
            config,
            diag,
            built,
            ..
        } = self;
        let state = built.as_mut().ok_or(TreeError::NotBuilt)?;

        if point.num_values() != state.data.num_attributes() {
            return Err(TreeError::invalid(format!(
                "point has {} values, tree indexes {} attributes",
                point.num_values(),
                state.data.num_attributes()
            )));
        }
        for dim in 0..state.data.num_attributes() {
            if !state.metric.is_class_dimension(dim) && point.is_missing(dim) {
                return Err(TreeError::MissingValue { dimension: dim });
            }
        }
        if state.idx.len() != state.data.len() {
            return Err(TreeError::structural(format!(
                "index array holds {} entries for {} points",
                state.idx.len(),
                state.data.len()
            )));
        }

        let id = state.data.push(point.clone())?;
        state.insert_descend(NodeId::ROOT, id, &point, 0, config, diag.as_ref())?;
        debug!(point = %id, total = state.data.len(), "point inserted");
        Ok(id)
    }
}

impl BuiltState {
    fn insert_descend(
        &mut self,
        node_id: NodeId,
        id: PointId,
        point: &Point,
        depth: usize,
        config: &TreeConfig,
        diag: &dyn DiagnosticsSink,
    ) -> TreeResult<()> {
        let node = self.arena.get_mut(node_id.index()).ok_or_else(|| {
            TreeError::structural(format!(
                "descent reached node {} outside the arena",
                node_id.index()
            ))
        })?;
        node.end += 1;
        self.metric.update_ranges(point, &mut node.ranges)?;
        let split = node.split;
        let (start, end) = (node.start, node.end);

        match split {
            Some(split) => {
                if self.metric.value_is_smaller_equal(point, split.dim, split.value) {
                    // The point lands left of the hyperplane, so every
                    // index position under the right subtree moves up one.
                    self.shift_right(split.right)?;
                    self.insert_descend(split.left, id, point, depth + 1, config, diag)
                } else {
                    self.insert_descend(split.right, id, point, depth + 1, config, diag)
                }
            }
            None => {
                if end > self.idx.len() {
                    return Err(TreeError::structural(format!(
                        "leaf range ends at {end} past the index array"
                    )));
                }
                self.idx.insert(end, id);
                let count = end - start + 1;
                if count > config.max_leaf_size {
                    Builder {
                        state: self,
                        config,
                        diag,
                    }
                    .split_node(node_id, depth)?;
                }
                Ok(())
            }
        }
    }

    fn shift_right(&mut self, node_id: NodeId) -> TreeResult<()> {
        let node = self.arena.get_mut(node_id.index()).ok_or_else(|| {
            TreeError::structural(format!(
                "shift reached node {} outside the arena",
                node_id.index()
            ))
        })?;
        node.start += 1;
        node.end += 1;
        let split = node.split;
        if let Some(split) = split {
            self.shift_right(split.left)?;
            self.shift_right(split.right)?;
        }
        Ok(())
    }
}
