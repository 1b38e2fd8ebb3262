//! The KD-partition tree.
//!
//! A [`KdTree`] recursively partitions a fixed attribute space into
//! axis-aligned boxes and uses that partition to answer exact
//! nearest-neighbour queries and centre assignments while scanning only a
//! fraction of the points. The layout follows three structural decisions:
//!
//! - Points are referenced through one shared index array; each node owns
//!   a contiguous `start..=end` slice of it and splitting is a permutation
//!   of that slice, never a copy of point data.
//! - Nodes live in an arena ([`node::SpaceNode`]) and address each other
//!   by index, so leaf re-splits after insertion never move a node.
//! - The attribute universe (per-dimension value ranges) is frozen when
//!   `build` runs. Inserted points widen node boxes but not the universe,
//!   which keeps relative-width decisions stable at the cost of
//!   undercounting widths in long-lived, heavily grown trees.
//!
//! Mutation is single-writer: `&mut self` for `build` and `insert`, plain
//! `&self` reads otherwise, and the borrow checker enforces the rest.

mod build;
mod centers;
mod insert;
mod node;
mod search;

#[cfg(test)]
mod tests;

pub use search::Query;

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::TreeConfig;
use crate::dataset::{Dataset, PointId};
use crate::diagnostics::{DiagnosticsSink, NullSink};
use crate::error::{TreeError, TreeResult};
use crate::metric::{DimRange, EuclideanDistance};

use build::Builder;
use node::{NodeId, SpaceNode};

/// Everything that exists only once the tree has been built.
pub(crate) struct BuiltState {
    /// Distance over the dataset's attribute universe.
    pub(crate) metric: EuclideanDistance,
    /// Snapshot of the indexed points. Append-only.
    pub(crate) data: Dataset,
    /// Per-dimension ranges of the build-time dataset. Never refreshed.
    pub(crate) universe: Vec<DimRange>,
    /// Node arena; index 0 is the root.
    pub(crate) arena: Vec<SpaceNode>,
    /// Shared index array the nodes slice into.
    pub(crate) idx: Vec<PointId>,
}

impl BuiltState {
    fn verify_node(&self, node_id: NodeId, expected_start: &mut usize) -> TreeResult<()> {
        let node = self.arena.get(node_id.index()).ok_or_else(|| {
            TreeError::structural(format!("node {} missing from the arena", node_id.index()))
        })?;
        if node.start > node.end {
            return Err(TreeError::structural(format!(
                "node {} has inverted range [{}, {}]",
                node_id.index(),
                node.start,
                node.end
            )));
        }
        match node.split {
            None => {
                if node.start != *expected_start {
                    return Err(TreeError::structural(format!(
                        "leaf starts at {} where {} was expected",
                        node.start, expected_start
                    )));
                }
                *expected_start = node.end + 1;
                Ok(())
            }
            Some(split) => {
                let left = self.arena.get(split.left.index()).ok_or_else(|| {
                    TreeError::structural(format!(
                        "left child {} missing from the arena",
                        split.left.index()
                    ))
                })?;
                let right = self.arena.get(split.right.index()).ok_or_else(|| {
                    TreeError::structural(format!(
                        "right child {} missing from the arena",
                        split.right.index()
                    ))
                })?;
                if left.start != node.start
                    || right.end != node.end
                    || left.end + 1 != right.start
                {
                    return Err(TreeError::structural(format!(
                        "children [{}, {}] and [{}, {}] do not partition node {} [{}, {}]",
                        left.start,
                        left.end,
                        right.start,
                        right.end,
                        node_id.index(),
                        node.start,
                        node.end
                    )));
                }
                self.verify_node(split.left, expected_start)?;
                self.verify_node(split.right, expected_start)
            }
        }
    }
}

/// Structure counters reported by [`KdTree::stats`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeStats {
    pub nodes: usize,
    pub leaves: usize,
    pub max_depth: usize,
    pub points: usize,
}

/// KD-partition tree over a fixed attribute space.
///
/// Build once with [`KdTree::build`], then query with [`KdTree::k_nearest`]
/// or [`KdTree::nearest`], grow online with [`KdTree::insert`], and assign
/// whole regions to cluster centres with [`KdTree::assign_to_centers`].
pub struct KdTree {
    config: TreeConfig,
    diag: Box<dyn DiagnosticsSink>,
    built: Option<BuiltState>,
    last_neighbors: Option<Vec<PointId>>,
    last_distances: Option<Vec<f64>>,
}

impl KdTree {
    /// Creates an unbuilt tree with silent diagnostics.
    pub fn new(config: TreeConfig) -> Self {
        Self::with_diagnostics(config, Box::new(NullSink))
    }

    /// Creates an unbuilt tree that reports structural events to `diag`.
    pub fn with_diagnostics(config: TreeConfig, diag: Box<dyn DiagnosticsSink>) -> Self {
        Self {
            config,
            diag,
            built: None,
            last_neighbors: None,
            last_distances: None,
        }
    }

    /// Builds the tree over a snapshot of `data`, replacing any previous
    /// contents. The dataset's ranges at this moment become the frozen
    /// universe for all later width decisions.
    ///
    /// # Errors
    /// [`TreeError::InvalidInput`] for an empty dataset and
    /// [`TreeError::MissingValue`] when any point misses a feature value.
    pub fn build(&mut self, data: Dataset) -> TreeResult<()> {
        if data.is_empty() {
            return Err(TreeError::invalid(
                "cannot build a tree over an empty dataset",
            ));
        }
        if let Some((id, dim)) = data.first_missing() {
            warn!(point = %id, dimension = dim, "dataset rejected: missing feature value");
            return Err(TreeError::MissingValue { dimension: dim });
        }

        let metric = EuclideanDistance::for_dataset(&data);
        let idx: Vec<PointId> = (0..data.len()).map(PointId::new).collect();
        let universe = metric.initialize_ranges(&data, idx.iter().copied())?;
        let n = idx.len();

        let mut state = BuiltState {
            metric,
            data,
            universe: universe.clone(),
            arena: Vec::new(),
            idx,
        };
        Builder {
            state: &mut state,
            config: &self.config,
            diag: self.diag.as_ref(),
        }
        .build_node(0, n - 1, Some(universe), 0)?;

        self.built = Some(state);
        self.last_neighbors = None;
        self.last_distances = None;

        let stats = self.stats();
        info!(
            points = stats.points,
            nodes = stats.nodes,
            leaves = stats.leaves,
            max_depth = stats.max_depth,
            "kd-tree built"
        );
        Ok(())
    }

    /// Checks the partition invariants: every point indexed exactly once,
    /// children slices tiling their parent, leaves covering the index
    /// array in order.
    ///
    /// # Errors
    /// [`TreeError::StructuralInconsistency`] naming the first violation,
    /// or [`TreeError::NotBuilt`].
    pub fn verify(&self) -> TreeResult<()> {
        let state = self.state()?;
        if state.idx.len() != state.data.len() {
            return Err(TreeError::structural(format!(
                "index array holds {} entries for {} points",
                state.idx.len(),
                state.data.len()
            )));
        }
        let mut seen = vec![false; state.data.len()];
        for &pid in &state.idx {
            let slot = seen.get_mut(pid.index()).ok_or_else(|| {
                TreeError::structural(format!("index array references unknown point {pid}"))
            })?;
            if *slot {
                return Err(TreeError::structural(format!(
                    "point {pid} appears twice in the index array"
                )));
            }
            *slot = true;
        }
        let mut expected_start = 0;
        state.verify_node(NodeId::ROOT, &mut expected_start)?;
        if expected_start != state.idx.len() {
            return Err(TreeError::structural(format!(
                "leaves cover {} of {} index entries",
                expected_start,
                state.idx.len()
            )));
        }
        Ok(())
    }

    /// Walks the arena and reports structure counters. All zeros before
    /// the first build.
    pub fn stats(&self) -> TreeStats {
        let Some(state) = self.built.as_ref() else {
            return TreeStats::default();
        };
        let mut stats = TreeStats {
            points: state.data.len(),
            ..TreeStats::default()
        };
        let mut stack = vec![(NodeId::ROOT, 0usize)];
        while let Some((id, depth)) = stack.pop() {
            stats.nodes += 1;
            stats.max_depth = stats.max_depth.max(depth);
            match state.arena[id.index()].split {
                None => stats.leaves += 1,
                Some(split) => {
                    stack.push((split.left, depth + 1));
                    stack.push((split.right, depth + 1));
                }
            }
        }
        stats
    }

    /// Number of indexed points, zero before the first build.
    pub fn len(&self) -> usize {
        self.built.as_ref().map_or(0, |s| s.data.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn config(&self) -> &TreeConfig {
        &self.config
    }

    /// The indexed point snapshot, if built.
    pub fn dataset(&self) -> Option<&Dataset> {
        self.built.as_ref().map(|s| &s.data)
    }

    /// Neighbour ids from the most recent query, ascending by distance.
    ///
    /// # Errors
    /// [`TreeError::InvalidInput`] when no query has run since the last
    /// build.
    pub fn neighbors(&self) -> TreeResult<&[PointId]> {
        self.last_neighbors
            .as_deref()
            .ok_or_else(|| TreeError::invalid("no neighbours recorded: run a query first"))
    }

    /// Metric distances parallel to [`KdTree::neighbors`].
    ///
    /// # Errors
    /// [`TreeError::InvalidInput`] when no query has run since the last
    /// build.
    pub fn distances(&self) -> TreeResult<&[f64]> {
        self.last_distances
            .as_deref()
            .ok_or_else(|| TreeError::invalid("no distances recorded: run a query first"))
    }

    pub(crate) fn state(&self) -> TreeResult<&BuiltState> {
        self.built.as_ref().ok_or(TreeError::NotBuilt)
    }

    pub(crate) fn record_results(&mut self, neighbors: Vec<PointId>, distances: Vec<f64>) {
        self.last_neighbors = Some(neighbors);
        self.last_distances = Some(distances);
    }
}

impl Default for KdTree {
    fn default() -> Self {
        Self::new(TreeConfig::default())
    }
}

// Manual impl because the diagnostics sink is a trait object.
impl fmt::Debug for KdTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KdTree")
            .field("config", &self.config)
            .field("built", &self.built.is_some())
            .field("points", &self.len())
            .finish()
    }
}
