//! Construction and search diagnostics.
//!
//! The tree never prints; callers that want visibility hand it a
//! [`DiagnosticsSink`] at construction time. [`NullSink`] (the default)
//! discards everything, [`TraceSink`] forwards to `tracing` at debug
//! level, and tests plug in recording sinks to assert on tree behaviour.

use tracing::debug;

/// Why a node settled as a leaf during construction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LeafReason {
    /// Point count at or below the configured leaf capacity.
    SmallCount,
    /// A split would have left one side empty.
    DegenerateSplit,
    /// Widest relative box width below the configured minimum.
    ThinBox,
}

/// Receiver for structural events. All methods default to no-ops so sinks
/// implement only what they care about.
pub trait DiagnosticsSink {
    /// An internal node was created, partitioning `left` + `right` points
    /// at `dim = value`.
    fn node_split(&self, _depth: usize, _dim: usize, _value: f64, _left: usize, _right: usize) {}

    /// A node stayed (or became) a leaf holding `count` points.
    fn leaf_settled(&self, _depth: usize, _count: usize, _reason: LeafReason) {}

    /// A nearest-neighbour search finished with the given traversal counts.
    fn search_finished(&self, _leaves_visited: usize, _points_scanned: usize, _pruned: usize) {}

    /// A whole node range was assigned to one centre without per-point
    /// distance work.
    fn assignment_shortcut(&self, _points: usize, _center: usize) {}
}

/// Discards every event.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullSink;

impl DiagnosticsSink for NullSink {}

/// Forwards events to `tracing` at debug level.
#[derive(Clone, Copy, Debug, Default)]
pub struct TraceSink;

impl DiagnosticsSink for TraceSink {
    fn node_split(&self, depth: usize, dim: usize, value: f64, left: usize, right: usize) {
        debug!(depth, dim, value, left, right, "node split");
    }

    fn leaf_settled(&self, depth: usize, count: usize, reason: LeafReason) {
        debug!(depth, count, ?reason, "leaf settled");
    }

    fn search_finished(&self, leaves_visited: usize, points_scanned: usize, pruned: usize) {
        debug!(leaves_visited, points_scanned, pruned, "search finished");
    }

    fn assignment_shortcut(&self, points: usize, center: usize) {
        debug!(points, center, "range assigned to single centre");
    }
}
