//! Static k-d tree over 2D points, stored as flat arrays.
//!
//! The tree is implicit: node boundaries are recomputed from `[lo, hi)` index
//! ranges during traversal, exactly as they were produced during the build.
//! A range is a leaf when it holds at most `leaf_size` points; otherwise its
//! median position `lo + (hi - lo) / 2` is the splitting point, with the
//! split axis alternating between x and y by depth.
//!
//! ```rust
//! use pointserver::{Point, PointIndex};
//!
//! let points = vec![
//!     Point::new(0.0, 0.0),
//!     Point::new(1.0, 1.0),
//!     Point::new(2.0, 2.0),
//!     Point::new(10.0, 10.0),
//!     Point::new(-5.0, -5.0),
//! ];
//! let index = PointIndex::build(&points, 10)?;
//!
//! let mut hits = index.range(0.0, 0.0, 2.0, 2.0);
//! hits.sort_unstable();
//! assert_eq!(hits, vec![0, 1, 2]);
//! # Ok::<(), pointserver::PointServerError>(())
//! ```

mod select;


use crate::error::{PointServerError, Result};
use crate::types::{Point, is_finite_point};

/// Leaf size used when none is configured.
pub const DEFAULT_LEAF_SIZE: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Axis {
    X,
    Y,
}

impl Axis {
    #[inline]
    fn next(self) -> Self {
        match self {
            Axis::X => Axis::Y,
            Axis::Y => Axis::X,
        }
    }
}

/// Immutable point index answering bounding-box and radius queries.
///
/// `ids[i]` is the position of the i-th stored point in the original input;
/// `xs[i]` and `ys[i]` are its coordinates.
#[derive(Debug, Clone)]
pub struct PointIndex {
    ids: Vec<usize>,
    xs: Vec<f64>,
    ys: Vec<f64>,
    leaf_size: usize,
}

impl PointIndex {
    /// Build an index over `points`.
    ///
    /// Fails when `leaf_size` is zero or a point has a non-finite coordinate.
    pub fn build(points: &[Point], leaf_size: usize) -> Result<Self> {
        if leaf_size == 0 {
            return Err(PointServerError::InvalidInput(
                "leaf size must be greater than zero".to_string(),
            ));
        }

        if let Some(pos) = points.iter().position(|p| !is_finite_point(p)) {
            return Err(PointServerError::InvalidInput(format!(
                "point at index {} has non-finite coordinates ({}, {})",
                pos,
                points[pos].x(),
                points[pos].y()
            )));
        }

        let mut index = Self {
            ids: (0..points.len()).collect(),
            xs: points.iter().map(|p| p.x()).collect(),
            ys: points.iter().map(|p| p.y()).collect(),
            leaf_size,
        };

        let len = index.ids.len();
        index.partition(0, len, Axis::X);
        Ok(index)
    }

    fn partition(&mut self, lo: usize, hi: usize, axis: Axis) {
        if hi - lo <= self.leaf_size {
            return;
        }

        let m = lo + (hi - lo) / 2;
        self.select(m, lo, hi - 1, axis);

        self.partition(lo, m, axis.next());
        self.partition(m + 1, hi, axis.next());
    }

    /// Original indices of every point inside the box, edges included.
    ///
    /// An inverted box (`min > max` on either axis) matches nothing.
    pub fn range(&self, min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Vec<usize> {
        let mut result = Vec::new();
        if self.ids.is_empty() || min_x > max_x || min_y > max_y {
            return result;
        }

        let inside = |x: f64, y: f64| x >= min_x && x <= max_x && y >= min_y && y <= max_y;

        let mut stack = vec![(0, self.ids.len(), Axis::X)];
        while let Some((lo, hi, axis)) = stack.pop() {
            if hi - lo <= self.leaf_size {
                for i in lo..hi {
                    if inside(self.xs[i], self.ys[i]) {
                        result.push(self.ids[i]);
                    }
                }
                continue;
            }

            let m = lo + (hi - lo) / 2;
            let (x, y) = (self.xs[m], self.ys[m]);
            if inside(x, y) {
                result.push(self.ids[m]);
            }

            let (split, lower, upper) = match axis {
                Axis::X => (x, min_x, max_x),
                Axis::Y => (y, min_y, max_y),
            };
            if lower <= split {
                stack.push((lo, m, axis.next()));
            }
            if upper >= split {
                stack.push((m + 1, hi, axis.next()));
            }
        }

        result
    }

    /// Original indices of every point within `radius` of `center`.
    ///
    /// Distances are compared squared. A zero radius matches only points
    /// equal to `center`; a negative or NaN radius matches nothing.
    pub fn within(&self, center: &Point, radius: f64) -> Vec<usize> {
        let mut result = Vec::new();
        if self.ids.is_empty() || radius.is_nan() || radius < 0.0 {
            return result;
        }

        let (qx, qy) = (center.x(), center.y());
        let r2 = radius * radius;
        let near = |x: f64, y: f64| {
            let dx = x - qx;
            let dy = y - qy;
            dx * dx + dy * dy <= r2
        };

        let mut stack = vec![(0, self.ids.len(), Axis::X)];
        while let Some((lo, hi, axis)) = stack.pop() {
            if hi - lo <= self.leaf_size {
                for i in lo..hi {
                    if near(self.xs[i], self.ys[i]) {
                        result.push(self.ids[i]);
                    }
                }
                continue;
            }

            let m = lo + (hi - lo) / 2;
            let (x, y) = (self.xs[m], self.ys[m]);
            if near(x, y) {
                result.push(self.ids[m]);
            }

            let (split, q) = match axis {
                Axis::X => (x, qx),
                Axis::Y => (y, qy),
            };
            if q - radius <= split {
                stack.push((lo, m, axis.next()));
            }
            if q + radius >= split {
                stack.push((m + 1, hi, axis.next()));
            }
        }

        result
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn leaf_size(&self) -> usize {
        self.leaf_size
    }

    /// Tree position to original index mapping.
    pub fn ids(&self) -> &[usize] {
        &self.ids
    }

    /// Coordinates stored at tree position `i`.
    pub fn coords(&self, i: usize) -> (f64, f64) {
        (self.xs[i], self.ys[i])
    }
}

impl Default for PointIndex {
    /// An empty index with the default leaf size.
    fn default() -> Self {
        Self {
            ids: Vec::new(),
            xs: Vec::new(),
            ys: Vec::new(),
            leaf_size: DEFAULT_LEAF_SIZE,
        }
    }
}
