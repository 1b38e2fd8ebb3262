//! Arena storage for tree nodes.
//!
//! Nodes live in a flat `Vec` owned by the tree and refer to each other by
//! [`NodeId`]. A node never moves once allocated: re-splitting a leaf after
//! insertion mutates the node in place and appends children, so node ids
//! held anywhere in a traversal stay valid across mutations.

use crate::metric::DimRange;

/// Index of a node in the tree's arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) struct NodeId(usize);

impl NodeId {
    /// The root is always the first node allocated.
    pub(crate) const ROOT: NodeId = NodeId(0);

    pub(crate) fn new(index: usize) -> Self {
        Self(index)
    }

    pub(crate) fn index(self) -> usize {
        self.0
    }
}

/// Split record of an internal node: points with `value(dim) <= value`
/// belong to `left`, the rest to `right`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct Split {
    pub dim: usize,
    pub value: f64,
    pub left: NodeId,
    pub right: NodeId,
}

/// One region of the partition.
///
/// `start..=end` is the node's slice of the tree's shared index array;
/// sibling slices are disjoint and a parent's slice is exactly the union
/// of its children's. `ranges` is the tight bounding box of the points in
/// the slice, maintained on insertion.
#[derive(Clone, Debug)]
pub(crate) struct SpaceNode {
    pub start: usize,
    pub end: usize,
    pub ranges: Vec<DimRange>,
    pub split: Option<Split>,
}

impl SpaceNode {
    pub(crate) fn leaf(start: usize, end: usize, ranges: Vec<DimRange>) -> Self {
        Self {
            start,
            end,
            ranges,
            split: None,
        }
    }

    /// Number of points in the node's range.
    pub(crate) fn count(&self) -> usize {
        self.end - self.start + 1
    }

    pub(crate) fn is_leaf(&self) -> bool {
        self.split.is_none()
    }
}
