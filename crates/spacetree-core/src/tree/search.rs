//! Branch-and-bound nearest-neighbour search.
//!
//! The traversal descends to the child on the target's side of each
//! hyperplane first, so the collector fills with nearby candidates early
//! and the pruning bound tightens fast. The far child is visited only when
//! the hyperplane itself is at most as far as the current k-th best
//! candidate; with equality included, a tied neighbour on the far side can
//! never be pruned away. Leaf scans use the collector's bound as a
//! distance cutoff so hopeless candidates abandon mid-accumulation.

use tracing::trace;

use crate::collector::NeighborCollector;
use crate::dataset::{Point, PointId};
use crate::error::{TreeError, TreeResult};

use super::node::NodeId;
use super::{BuiltState, KdTree};

/// Target of a nearest-neighbour query.
#[derive(Clone, Copy, Debug)]
pub enum Query<'a> {
    /// An arbitrary location in the attribute space. The slice must match
    /// the tree's dimension count; feature values must not be missing,
    /// the label slot may be.
    Values(&'a [f64]),
    /// An indexed point, excluded from its own result. This is the
    /// hold-one-out form classifiers use during cross-validation.
    Member(PointId),
}

impl<'a> From<&'a [f64]> for Query<'a> {
    fn from(values: &'a [f64]) -> Self {
        Self::Values(values)
    }
}

impl From<PointId> for Query<'static> {
    fn from(id: PointId) -> Self {
        Self::Member(id)
    }
}

impl KdTree {
    /// Finds the `k` nearest neighbours of `query`, plus any points tied
    /// with the k-th, ascending by distance. Asking for more neighbours
    /// than the tree holds returns everything eligible.
    ///
    /// Metric distances for the returned ids are available from
    /// [`KdTree::distances`] until the next query overwrites them.
    ///
    /// # Errors
    /// - [`TreeError::NotBuilt`] before the first `build`.
    /// - [`TreeError::InvalidInput`] for `k == 0`, a dimension mismatch,
    ///   or an unknown member id.
    /// - [`TreeError::MissingValue`] for a missing feature value in the
    ///   query.
    pub fn k_nearest(&mut self, query: Query<'_>, k: usize) -> TreeResult<Vec<PointId>> {
        let (ids, distances, counters) = {
            let state = self.state()?;
            let (target, exclude) = resolve_query(state, query)?;
            let mut search = SearchState {
                state,
                exclude,
                collector: NeighborCollector::new(k)?,
                leaves_visited: 0,
                points_scanned: 0,
                pruned: 0,
            };
            search.descend(NodeId::ROOT, &target)?;
            let ids = search.collector.ids();
            let mut distances = search.collector.distances();
            state.metric.post_process_distances(&mut distances);
            (
                ids,
                distances,
                (search.leaves_visited, search.points_scanned, search.pruned),
            )
        };
        self.diag
            .search_finished(counters.0, counters.1, counters.2);
        trace!(
            k,
            returned = ids.len(),
            scanned = counters.1,
            pruned = counters.2,
            "k-nearest query answered"
        );
        self.record_results(ids.clone(), distances);
        Ok(ids)
    }

    /// Single nearest neighbour of `query`.
    ///
    /// # Errors
    /// As [`KdTree::k_nearest`], plus [`TreeError::InvalidInput`] when
    /// nothing is eligible, which happens only for a member query on a
    /// single-point tree.
    pub fn nearest(&mut self, query: Query<'_>) -> TreeResult<PointId> {
        let ids = self.k_nearest(query, 1)?;
        ids.first().copied().ok_or_else(|| {
            TreeError::invalid("query matched no points: the tree holds no other point")
        })
    }
}

/// Turns a query into a concrete target point and optional exclusion.
fn resolve_query(state: &BuiltState, query: Query<'_>) -> TreeResult<(Point, Option<PointId>)> {
    match query {
        Query::Values(values) => {
            if values.len() != state.data.num_attributes() {
                return Err(TreeError::invalid(format!(
                    "query has {} values, tree indexes {} attributes",
                    values.len(),
                    state.data.num_attributes()
                )));
            }
            for (dim, value) in values.iter().enumerate() {
                if value.is_nan() && !state.metric.is_class_dimension(dim) {
                    return Err(TreeError::MissingValue { dimension: dim });
                }
            }
            Ok((Point::new(values.to_vec()), None))
        }
        Query::Member(id) => {
            let point = state
                .data
                .get(id)
                .ok_or_else(|| TreeError::invalid(format!("unknown point {id}")))?;
            Ok((point.clone(), Some(id)))
        }
    }
}

struct SearchState<'a> {
    state: &'a BuiltState,
    exclude: Option<PointId>,
    collector: NeighborCollector,
    leaves_visited: usize,
    points_scanned: usize,
    pruned: usize,
}

impl SearchState<'_> {
    fn descend(&mut self, node_id: NodeId, target: &Point) -> TreeResult<()> {
        let node = self.state.arena.get(node_id.index()).ok_or_else(|| {
            TreeError::structural(format!(
                "search reached node {} outside the arena",
                node_id.index()
            ))
        })?;
        let split = node.split;
        let (start, end) = (node.start, node.end);

        match split {
            None => self.scan_leaf(start, end, target),
            Some(split) => {
                let near_first = self
                    .state
                    .metric
                    .value_is_smaller_equal(target, split.dim, split.value);
                let (near, far) = if near_first {
                    (split.left, split.right)
                } else {
                    (split.right, split.left)
                };
                self.descend(near, target)?;

                // The far child can only contribute when the hyperplane is
                // no further than the current k-th best; `<=` keeps ties.
                let plane = target.value(split.dim) - split.value;
                if plane * plane <= self.collector.current_worst() {
                    self.descend(far, target)?;
                } else {
                    self.pruned += 1;
                }
                Ok(())
            }
        }
    }

    fn scan_leaf(&mut self, start: usize, end: usize, target: &Point) -> TreeResult<()> {
        self.leaves_visited += 1;
        for pos in start..=end {
            let pid = *self.state.idx.get(pos).ok_or_else(|| {
                TreeError::structural(format!("leaf position {pos} outside the index array"))
            })?;
            if self.exclude == Some(pid) {
                continue;
            }
            self.points_scanned += 1;
            let cutoff = self.collector.current_worst();
            let distance =
                self.state
                    .metric
                    .distance_sq_within(target, self.state.data.point(pid), cutoff)?;
            if self.collector.would_accept(distance) {
                self.collector.insert_sorted(distance, pid);
            }
        }
        Ok(())
    }
}
