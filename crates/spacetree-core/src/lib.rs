//! # spacetree-core
//!
//! An exact nearest-neighbour index over a fixed attribute space, built
//! for instance-based learning: k-nearest-neighbour classification with
//! hold-one-out queries, and accelerated point-to-centre assignment for
//! centroid clustering.
//!
//! The index is a KD-partition tree. It stores points once in an
//! append-only [`Dataset`] snapshot and partitions them through a shared
//! index array that tree nodes slice into, so building and splitting move
//! ids, never values. Search is branch-and-bound with exact pruning:
//! results are bitwise identical to a brute-force scan, including
//! duplicate-distance ties, just cheaper to compute.
//!
//! ## Capabilities
//!
//! - [`KdTree::build`]: batch construction, widest-dimension midpoint
//!   splits, configurable leaf capacity.
//! - [`KdTree::insert`]: online growth without rebuilding; leaves re-split
//!   in place when they outgrow their capacity.
//! - [`KdTree::k_nearest`] / [`KdTree::nearest`]: exact queries for
//!   arbitrary targets ([`Query::Values`]) or indexed points excluded from
//!   their own result ([`Query::Member`]).
//! - [`KdTree::assign_to_centers`]: assigns all points to their nearest
//!   centre, pruning whole regions that one centre dominates.
//! - [`KdTree::verify`] / [`KdTree::stats`]: structural audit and shape
//!   counters.
//!
//! ## Example
//!
//! ```
//! use spacetree_core::{Dataset, KdTree, Point, Query, TreeConfig};
//!
//! # fn main() -> Result<(), spacetree_core::TreeError> {
//! let mut data = Dataset::new(2)?;
//! for values in [[0.0, 0.0], [1.0, 0.5], [4.0, 4.0], [4.5, 3.5]] {
//!     data.push(Point::new(values.to_vec()))?;
//! }
//!
//! let mut tree = KdTree::new(TreeConfig::default());
//! tree.build(data)?;
//!
//! let neighbors = tree.k_nearest(Query::Values(&[4.2, 3.8]), 2)?;
//! assert_eq!(neighbors.len(), 2);
//! let distances = tree.distances()?;
//! assert!(distances[0] <= distances[1]);
//! # Ok(())
//! # }
//! ```
//!
//! ## Concurrency
//!
//! The tree is single-writer by construction: mutation takes `&mut self`,
//! reads take `&self`, and no interior mutability or locking is involved.
//! Wrap the tree in a lock if concurrent mutation is ever needed.

pub mod collector;
pub mod config;
pub mod dataset;
pub mod diagnostics;
pub mod error;
pub mod metric;
pub mod tree;

pub use collector::{Neighbor, NeighborCollector};
pub use config::{TreeConfig, DEFAULT_MAX_LEAF_SIZE, DEFAULT_MIN_BOX_REL_WIDTH};
pub use dataset::{Dataset, Point, PointId};
pub use diagnostics::{DiagnosticsSink, LeafReason, NullSink, TraceSink};
pub use error::{TreeError, TreeResult};
pub use metric::{DimRange, EuclideanDistance};
pub use tree::{KdTree, Query, TreeStats};
