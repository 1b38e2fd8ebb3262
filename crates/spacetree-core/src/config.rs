//! Construction parameters for the KD-partition tree.

use serde::{Deserialize, Serialize};

use crate::error::{TreeError, TreeResult};

/// Default maximum number of points a leaf may hold before it splits.
pub const DEFAULT_MAX_LEAF_SIZE: usize = 40;

/// Default minimum box width relative to the universe below which a node
/// stays a leaf.
pub const DEFAULT_MIN_BOX_REL_WIDTH: f64 = 0.01;

/// Tuning knobs for tree construction.
///
/// All parameters are validated at construction time so a `TreeConfig` in
/// hand is always usable. The defaults match the values the index was tuned
/// with and are a sensible starting point for most datasets.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TreeConfig {
    /// Leaf capacity. Nodes holding at most this many points are not split.
    pub max_leaf_size: usize,

    /// A node whose widest feature dimension, measured relative to the
    /// universe width in that dimension, falls below this threshold stays a
    /// leaf even when over capacity. Guards against splitting boxes that
    /// have collapsed to near-points.
    pub min_box_rel_width: f64,

    /// When true, the split dimension is chosen by width relative to the
    /// universe instead of raw width. Useful when feature scales differ by
    /// orders of magnitude. Note that the universe is frozen at build time,
    /// so trees that grow far past their build-time bounds may want a
    /// periodic rebuild for this flag to stay meaningful.
    pub normalize_box_width: bool,
}

impl TreeConfig {
    /// Creates a validated configuration.
    ///
    /// # Errors
    /// Returns [`TreeError::InvalidInput`] when `max_leaf_size` is zero or
    /// `min_box_rel_width` is not a finite positive number.
    pub fn new(
        max_leaf_size: usize,
        min_box_rel_width: f64,
        normalize_box_width: bool,
    ) -> TreeResult<Self> {
        if max_leaf_size == 0 {
            return Err(TreeError::invalid("max_leaf_size must be at least 1"));
        }
        if !min_box_rel_width.is_finite() || min_box_rel_width <= 0.0 {
            return Err(TreeError::invalid(format!(
                "min_box_rel_width must be a finite positive number, got {min_box_rel_width}"
            )));
        }
        Ok(Self {
            max_leaf_size,
            min_box_rel_width,
            normalize_box_width,
        })
    }

    /// Creates a configuration with the given leaf capacity and defaults
    /// for everything else.
    pub fn with_max_leaf_size(max_leaf_size: usize) -> TreeResult<Self> {
        Self::new(max_leaf_size, DEFAULT_MIN_BOX_REL_WIDTH, false)
    }
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            max_leaf_size: DEFAULT_MAX_LEAF_SIZE,
            min_box_rel_width: DEFAULT_MIN_BOX_REL_WIDTH,
            normalize_box_width: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_matches_tuned_values() {
        let config = TreeConfig::default();
        assert_eq!(config.max_leaf_size, 40);
        assert_eq!(config.min_box_rel_width, 0.01);
        assert!(!config.normalize_box_width);
    }

    #[test]
    fn test_new_rejects_zero_leaf_size() {
        let err = TreeConfig::new(0, 0.01, false).unwrap_err();
        assert!(matches!(err, TreeError::InvalidInput(_)));
    }

    #[test]
    fn test_new_rejects_bad_widths() {
        assert!(TreeConfig::new(40, 0.0, false).is_err());
        assert!(TreeConfig::new(40, -0.5, false).is_err());
        assert!(TreeConfig::new(40, f64::NAN, false).is_err());
        assert!(TreeConfig::new(40, f64::INFINITY, false).is_err());
    }

    #[test]
    fn test_with_max_leaf_size_keeps_other_defaults() {
        let config = TreeConfig::with_max_leaf_size(5).unwrap();
        assert_eq!(config.max_leaf_size, 5);
        assert_eq!(config.min_box_rel_width, DEFAULT_MIN_BOX_REL_WIDTH);
    }

    #[test]
    fn test_config_round_trips_through_serde() {
        let config = TreeConfig::new(12, 0.05, true).unwrap();
        let json = serde_json::to_string(&config).unwrap();
        let back: TreeConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, back);
    }
}
