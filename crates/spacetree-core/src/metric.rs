//! Euclidean distance with the range bookkeeping the tree depends on.
//!
//! The metric is more than a distance function here: it owns the notion of
//! which dimensions participate (the label dimension never does), tracks
//! per-dimension min/max ranges for hyper-rectangles, and implements the
//! cutoff contract that lets leaf scans abandon hopeless candidates early.
//!
//! All internal comparisons run on squared distances; callers that want
//! metric distances apply [`EuclideanDistance::post_process_distances`] to
//! a finished batch, which keeps the square root off the hot path.

use crate::dataset::{Dataset, Point, PointId};
use crate::error::{TreeError, TreeResult};

/// Closed interval covered by a set of points in one dimension.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DimRange {
    pub min: f64,
    pub max: f64,
    /// Cached `max - min`.
    pub width: f64,
}

impl DimRange {
    /// Range that no value has touched yet. Extending it with any value
    /// collapses it to that value.
    pub(crate) fn untouched() -> Self {
        Self {
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
            width: 0.0,
        }
    }

    /// Widens the interval to include `value`.
    pub(crate) fn extend(&mut self, value: f64) {
        if value < self.min {
            self.min = value;
        }
        if value > self.max {
            self.max = value;
        }
        self.width = self.max - self.min;
    }
}

/// Squared Euclidean distance over the feature dimensions of a fixed
/// attribute universe.
#[derive(Clone, Debug)]
pub struct EuclideanDistance {
    num_attributes: usize,
    class_index: Option<usize>,
}

impl EuclideanDistance {
    pub fn new(num_attributes: usize, class_index: Option<usize>) -> Self {
        Self {
            num_attributes,
            class_index,
        }
    }

    /// Metric matching a dataset's attribute universe.
    pub fn for_dataset(data: &Dataset) -> Self {
        Self::new(data.num_attributes(), data.class_index())
    }

    pub fn num_attributes(&self) -> usize {
        self.num_attributes
    }

    /// True when `dim` holds the class label and is excluded from distances
    /// and splits.
    pub fn is_class_dimension(&self, dim: usize) -> bool {
        self.class_index == Some(dim)
    }

    /// Computes fresh ranges covering the given points.
    ///
    /// # Errors
    /// Returns [`TreeError::MissingValue`] when a feature value of any of
    /// the points is missing.
    pub fn initialize_ranges<I>(&self, data: &Dataset, ids: I) -> TreeResult<Vec<DimRange>>
    where
        I: IntoIterator<Item = PointId>,
    {
        let mut ranges = vec![DimRange::untouched(); self.num_attributes];
        for id in ids {
            self.update_ranges(data.point(id), &mut ranges)?;
        }
        Ok(ranges)
    }

    /// Widens `ranges` to cover `point`.
    ///
    /// A missing label value is skipped silently; a missing feature value
    /// is an error because the ranges would be poisoned by NaN.
    pub fn update_ranges(&self, point: &Point, ranges: &mut [DimRange]) -> TreeResult<()> {
        for dim in 0..self.num_attributes {
            let value = point.value(dim);
            if value.is_nan() {
                if self.is_class_dimension(dim) {
                    continue;
                }
                return Err(TreeError::MissingValue { dimension: dim });
            }
            ranges[dim].extend(value);
        }
        Ok(())
    }

    /// Metric (rooted) distance between two points.
    pub fn distance(&self, a: &Point, b: &Point) -> TreeResult<f64> {
        Ok(self.distance_sq(a, b)?.sqrt())
    }

    /// Squared distance between two points.
    pub fn distance_sq(&self, a: &Point, b: &Point) -> TreeResult<f64> {
        self.distance_sq_within(a, b, f64::INFINITY)
    }

    /// Squared distance with early abandonment.
    ///
    /// Accumulates squared per-dimension differences and, as soon as the
    /// partial sum exceeds `cutoff`, returns `f64::INFINITY` as a
    /// "too far" marker without touching the remaining dimensions. A
    /// result of exactly `cutoff` is still computed in full and returned,
    /// so ties at the cutoff survive.
    ///
    /// # Errors
    /// Returns [`TreeError::MissingValue`] when either point is missing a
    /// feature value.
    pub fn distance_sq_within(&self, a: &Point, b: &Point, cutoff: f64) -> TreeResult<f64> {
        let mut acc = 0.0;
        for dim in 0..self.num_attributes {
            if self.is_class_dimension(dim) {
                continue;
            }
            let x = a.value(dim);
            let y = b.value(dim);
            if x.is_nan() || y.is_nan() {
                return Err(TreeError::MissingValue { dimension: dim });
            }
            let diff = x - y;
            acc += diff * diff;
            if acc > cutoff {
                return Ok(f64::INFINITY);
            }
        }
        Ok(acc)
    }

    /// Squared distance from a point to the closest face of a box, zero
    /// when the point lies inside.
    pub fn distance_sq_to_box(&self, point: &Point, ranges: &[DimRange]) -> TreeResult<f64> {
        let mut acc = 0.0;
        for dim in 0..self.num_attributes {
            if self.is_class_dimension(dim) {
                continue;
            }
            let value = point.value(dim);
            if value.is_nan() {
                return Err(TreeError::MissingValue { dimension: dim });
            }
            let range = &ranges[dim];
            if value < range.min {
                let diff = range.min - value;
                acc += diff * diff;
            } else if value > range.max {
                let diff = value - range.max;
                acc += diff * diff;
            }
        }
        Ok(acc)
    }

    /// Converts a batch of squared distances into metric distances.
    pub fn post_process_distances(&self, distances: &mut [f64]) {
        for d in distances.iter_mut() {
            *d = d.sqrt();
        }
    }

    /// Split routing predicate: does `point` belong on the `<=` side of the
    /// hyperplane `dim = value`?
    pub fn value_is_smaller_equal(&self, point: &Point, dim: usize, value: f64) -> bool {
        point.value(dim) <= value
    }
}
