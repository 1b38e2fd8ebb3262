//! Pruned assignment of points to cluster centres.
//!
//! Instead of measuring every point against every centre, the pass walks
//! the partition top-down carrying a shrinking candidate set. At each node
//! a centre survives only if it could still own some corner of the node's
//! box; when one centre remains, the node's whole range is assigned in one
//! sweep without any per-point distances. Exact per-point work happens
//! only in leaves that still see several candidates.

use tracing::debug;

use crate::dataset::{Dataset, Point, PointId};
use crate::diagnostics::DiagnosticsSink;
use crate::error::{TreeError, TreeResult};
use crate::metric::DimRange;

use super::node::{NodeId, SpaceNode};
use super::{BuiltState, KdTree};

impl KdTree {
    /// Assigns every indexed point to its nearest centre.
    ///
    /// `centers` must use the tree's attribute layout. `assignments` must
    /// hold one slot per indexed point; slot `i` receives the position of
    /// the winning centre for the point with id `i`. Distance ties go to
    /// the centre with the lowest position, matching what a brute-force
    /// scan in centre order would pick.
    ///
    /// # Errors
    /// - [`TreeError::NotBuilt`] before the first `build`.
    /// - [`TreeError::InvalidInput`] for no centres, a dimension mismatch,
    ///   or an `assignments` slice of the wrong length.
    /// - [`TreeError::MissingValue`] when a centre misses a feature value.
    pub fn assign_to_centers(
        &self,
        centers: &Dataset,
        assignments: &mut [Option<usize>],
    ) -> TreeResult<()> {
        let state = self.state()?;
        if centers.is_empty() {
            return Err(TreeError::invalid("at least one centre is required"));
        }
        if centers.num_attributes() != state.data.num_attributes() {
            return Err(TreeError::invalid(format!(
                "centres have {} attributes, tree indexes {}",
                centers.num_attributes(),
                state.data.num_attributes()
            )));
        }
        if assignments.len() != state.data.len() {
            return Err(TreeError::invalid(format!(
                "assignments slice holds {} slots for {} points",
                assignments.len(),
                state.data.len()
            )));
        }
        for (_, center) in centers.iter() {
            for dim in 0..centers.num_attributes() {
                if !state.metric.is_class_dimension(dim) && center.is_missing(dim) {
                    return Err(TreeError::MissingValue { dimension: dim });
                }
            }
        }

        let candidates: Vec<usize> = (0..centers.len()).collect();
        state.assign_node(
            NodeId::ROOT,
            centers,
            &candidates,
            assignments,
            self.diag.as_ref(),
        )?;
        debug!(
            centers = centers.len(),
            points = state.data.len(),
            "centre assignment completed"
        );
        Ok(())
    }
}

impl BuiltState {
    fn assign_node(
        &self,
        node_id: NodeId,
        centers: &Dataset,
        candidates: &[usize],
        assignments: &mut [Option<usize>],
        diag: &dyn DiagnosticsSink,
    ) -> TreeResult<()> {
        let node = self.arena.get(node_id.index()).ok_or_else(|| {
            TreeError::structural(format!(
                "assignment reached node {} outside the arena",
                node_id.index()
            ))
        })?;
        let survivors = self.refine_candidates(node, centers, candidates)?;
        if survivors.is_empty() {
            return Err(TreeError::structural(
                "candidate refinement eliminated every centre",
            ));
        }

        if survivors.len() == 1 {
            let center = survivors[0];
            for pos in node.start..=node.end {
                let pid = self.index_entry(pos)?;
                self.record_assignment(assignments, pid, center)?;
            }
            diag.assignment_shortcut(node.count(), center);
            return Ok(());
        }

        match node.split {
            Some(split) => {
                self.assign_node(split.left, centers, &survivors, assignments, diag)?;
                self.assign_node(split.right, centers, &survivors, assignments, diag)
            }
            None => {
                for pos in node.start..=node.end {
                    let pid = self.index_entry(pos)?;
                    let point = self.data.point(pid);
                    let mut best = survivors[0];
                    let mut best_distance = f64::INFINITY;
                    for &center in &survivors {
                        let distance = self
                            .metric
                            .distance_sq(point, centers.point(PointId::new(center)))?;
                        // Strict comparison in ascending centre order makes
                        // the lowest position win ties.
                        if distance < best_distance {
                            best_distance = distance;
                            best = center;
                        }
                    }
                    self.record_assignment(assignments, pid, best)?;
                }
                Ok(())
            }
        }
    }

    /// Keeps the centres that could still own part of the node's box: the
    /// centre nearest to the box, anything tied with it or touching the
    /// box, and every centre the nearest one fails to beat at its own
    /// extreme corner.
    fn refine_candidates(
        &self,
        node: &SpaceNode,
        centers: &Dataset,
        candidates: &[usize],
    ) -> TreeResult<Vec<usize>> {
        let mut box_distances = Vec::with_capacity(candidates.len());
        let mut min_distance = f64::INFINITY;
        let mut closest = candidates[0];
        for &center in candidates {
            let distance = self
                .metric
                .distance_sq_to_box(centers.point(PointId::new(center)), &node.ranges)?;
            if distance < min_distance {
                min_distance = distance;
                closest = center;
            }
            box_distances.push(distance);
        }

        let closest_point = centers.point(PointId::new(closest));
        let mut survivors = Vec::with_capacity(candidates.len());
        for (i, &center) in candidates.iter().enumerate() {
            if center == closest || box_distances[i] == 0.0 || box_distances[i] == min_distance {
                survivors.push(center);
                continue;
            }
            let challenger = centers.point(PointId::new(center));
            if !self.fully_owns(closest_point, challenger, &node.ranges) {
                survivors.push(center);
            }
        }
        Ok(survivors)
    }

    /// Extreme-corner test: the owner rules out the challenger only by
    /// being strictly closer to the box corner most favourable to the
    /// challenger.
    fn fully_owns(&self, owner: &Point, challenger: &Point, ranges: &[DimRange]) -> bool {
        let mut owner_acc = 0.0;
        let mut challenger_acc = 0.0;
        for dim in 0..self.metric.num_attributes() {
            if self.metric.is_class_dimension(dim) {
                continue;
            }
            let o = owner.value(dim);
            let c = challenger.value(dim);
            let corner = if c > o { ranges[dim].max } else { ranges[dim].min };
            let owner_diff = o - corner;
            let challenger_diff = c - corner;
            owner_acc += owner_diff * owner_diff;
            challenger_acc += challenger_diff * challenger_diff;
        }
        owner_acc < challenger_acc
    }

    fn index_entry(&self, pos: usize) -> TreeResult<PointId> {
        self.idx.get(pos).copied().ok_or_else(|| {
            TreeError::structural(format!("node position {pos} outside the index array"))
        })
    }

    fn record_assignment(
        &self,
        assignments: &mut [Option<usize>],
        pid: PointId,
        center: usize,
    ) -> TreeResult<()> {
        let slot = assignments.get_mut(pid.index()).ok_or_else(|| {
            TreeError::structural(format!("no assignment slot for point {pid}"))
        })?;
        *slot = Some(center);
        Ok(())
    }
}
