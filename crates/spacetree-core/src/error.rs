//! Error types for the KD-partition tree.
//!
//! Every fallible operation in this crate returns [`TreeResult`]. The
//! variants separate caller mistakes ([`TreeError::InvalidInput`],
//! [`TreeError::MissingValue`], [`TreeError::NotBuilt`]) from damage to the
//! tree's own bookkeeping ([`TreeError::StructuralInconsistency`]), because
//! the recovery paths differ: the former are fixed by correcting the call,
//! the latter by rebuilding the index from the live point set.

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type TreeResult<T> = Result<T, TreeError>;

/// Errors raised by tree construction, mutation, and queries.
#[derive(Debug, Error)]
pub enum TreeError {
    /// A point offered for indexing or querying carries the missing-value
    /// sentinel (NaN) in a feature dimension.
    ///
    /// # Recovery
    /// Impute or drop the offending value before handing the point to the
    /// index. The label dimension is exempt; only feature dimensions are
    /// checked.
    #[error("missing value in dimension {dimension}: impute or remove it before indexing")]
    MissingValue {
        /// Zero-based dimension holding the sentinel.
        dimension: usize,
    },

    /// A parameter violates this crate's documented preconditions, for
    /// example `k == 0`, a dimension mismatch, or reading query results
    /// before any query ran.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The tree's internal bookkeeping no longer satisfies its invariants.
    ///
    /// # Recovery
    /// The index must be treated as unusable. Discard it and rebuild from
    /// the live point set; the point data itself is not affected.
    #[error("structural inconsistency: {0}; discard the index and rebuild it")]
    StructuralInconsistency(String),

    /// An operation that requires a populated tree ran before `build`.
    #[error("tree has not been built yet: call build() with a dataset first")]
    NotBuilt,
}

impl TreeError {
    /// Shorthand for [`TreeError::InvalidInput`].
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Shorthand for [`TreeError::StructuralInconsistency`].
    pub fn structural(msg: impl Into<String>) -> Self {
        Self::StructuralInconsistency(msg.into())
    }

    /// True for errors that leave the tree unusable rather than merely
    /// rejecting one call.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::StructuralInconsistency(_))
    }
}
