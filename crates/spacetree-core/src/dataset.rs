//! Points and the dataset snapshot the tree indexes.
//!
//! A [`Dataset`] fixes the attribute universe up front: every point carries
//! the same number of values, and at most one dimension may be designated
//! as the class label. The label dimension is carried along for callers
//! (classifiers want it back) but is invisible to distance computations and
//! split selection.
//!
//! Missing values are represented by NaN. Feature dimensions must never be
//! missing for indexed points; the label dimension may be.

use std::fmt;

use crate::error::{TreeError, TreeResult};

/// Stable identifier of a point inside a [`Dataset`].
///
/// Identifiers are dense positions: the first point pushed gets `0`, the
/// next `1`, and so on. Points are never removed, so an id stays valid for
/// the lifetime of the dataset.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PointId(usize);

impl PointId {
    pub(crate) fn new(index: usize) -> Self {
        Self(index)
    }

    /// Position of the point in its dataset.
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for PointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A single observation: one `f64` per attribute dimension.
#[derive(Clone, Debug, PartialEq)]
pub struct Point {
    values: Vec<f64>,
}

impl Point {
    pub fn new(values: Vec<f64>) -> Self {
        Self { values }
    }

    /// Value in the given dimension. Panics when out of bounds, like slice
    /// indexing; dimension counts are validated at the dataset boundary.
    pub fn value(&self, dim: usize) -> f64 {
        self.values[dim]
    }

    /// Number of attribute values, including the label slot if any.
    pub fn num_values(&self) -> usize {
        self.values.len()
    }

    /// True when the value in `dim` is the missing-value sentinel.
    pub fn is_missing(&self, dim: usize) -> bool {
        self.values[dim].is_nan()
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }
}

impl From<Vec<f64>> for Point {
    fn from(values: Vec<f64>) -> Self {
        Self::new(values)
    }
}

impl From<&[f64]> for Point {
    fn from(values: &[f64]) -> Self {
        Self::new(values.to_vec())
    }
}

/// An append-only collection of points over a fixed attribute universe.
#[derive(Clone, Debug)]
pub struct Dataset {
    points: Vec<Point>,
    num_attributes: usize,
    class_index: Option<usize>,
}

impl Dataset {
    /// Creates an empty dataset with `num_attributes` dimensions and no
    /// class label.
    pub fn new(num_attributes: usize) -> TreeResult<Self> {
        if num_attributes == 0 {
            return Err(TreeError::invalid("datasets need at least one attribute"));
        }
        Ok(Self {
            points: Vec::new(),
            num_attributes,
            class_index: None,
        })
    }

    /// Creates an empty dataset where dimension `class_index` holds the
    /// class label. That dimension is excluded from distances and splits.
    pub fn with_class_index(num_attributes: usize, class_index: usize) -> TreeResult<Self> {
        if class_index >= num_attributes {
            return Err(TreeError::invalid(format!(
                "class index {class_index} out of range for {num_attributes} attributes"
            )));
        }
        let mut data = Self::new(num_attributes)?;
        data.class_index = Some(class_index);
        Ok(data)
    }

    /// Appends a point and returns its identifier.
    ///
    /// # Errors
    /// Returns [`TreeError::InvalidInput`] when the point's dimension count
    /// does not match the dataset's.
    pub fn push(&mut self, point: Point) -> TreeResult<PointId> {
        if point.num_values() != self.num_attributes {
            return Err(TreeError::invalid(format!(
                "point has {} values, dataset expects {}",
                point.num_values(),
                self.num_attributes
            )));
        }
        let id = PointId(self.points.len());
        self.points.push(point);
        Ok(id)
    }

    /// Looks a point up by id.
    pub fn get(&self, id: PointId) -> Option<&Point> {
        self.points.get(id.0)
    }

    /// Infallible access for internal callers that already validated `id`.
    pub(crate) fn point(&self, id: PointId) -> &Point {
        &self.points[id.0]
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn num_attributes(&self) -> usize {
        self.num_attributes
    }

    pub fn class_index(&self) -> Option<usize> {
        self.class_index
    }

    /// Iterates points in id order.
    pub fn iter(&self) -> impl Iterator<Item = (PointId, &Point)> {
        self.points
            .iter()
            .enumerate()
            .map(|(i, p)| (PointId(i), p))
    }

    /// First feature dimension holding a missing value, if any. The label
    /// dimension is not checked.
    pub fn first_missing(&self) -> Option<(PointId, usize)> {
        for (id, point) in self.iter() {
            for dim in 0..self.num_attributes {
                if Some(dim) == self.class_index {
                    continue;
                }
                if point.is_missing(dim) {
                    return Some((id, dim));
                }
            }
        }
        None
    }
}
