//! Geometric primitives shared by the index, the store and the query layer.

use serde::{Deserialize, Serialize};

pub use geo::Point;

/// A 2D axis-aligned bounding box.
///
/// Unlike `geo::Rect`, the corners are kept exactly as given: a box whose
/// minimum exceeds its maximum is allowed and simply contains nothing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox2D {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BoundingBox2D {
    /// Create a new bounding box from minimum and maximum coordinates.
    ///
    /// # Examples
    ///
    /// ```
    /// use pointserver::BoundingBox2D;
    ///
    /// let bbox = BoundingBox2D::new(-74.0, 40.7, -73.9, 40.8);
    /// assert!(bbox.is_valid());
    /// ```
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// A box covering the whole plane.
    pub fn everything() -> Self {
        Self::new(
            f64::NEG_INFINITY,
            f64::NEG_INFINITY,
            f64::INFINITY,
            f64::INFINITY,
        )
    }

    /// Smallest box containing every point, or `None` for an empty slice.
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Point>) -> Option<Self> {
        let mut points = points.into_iter();
        let first = points.next()?;
        let mut bbox = Self::new(first.x(), first.y(), first.x(), first.y());
        for p in points {
            bbox.min_x = bbox.min_x.min(p.x());
            bbox.min_y = bbox.min_y.min(p.y());
            bbox.max_x = bbox.max_x.max(p.x());
            bbox.max_y = bbox.max_y.max(p.y());
        }
        Some(bbox)
    }

    /// `false` when a minimum exceeds its maximum.
    pub fn is_valid(&self) -> bool {
        self.min_x <= self.max_x && self.min_y <= self.max_y
    }

    pub fn is_finite(&self) -> bool {
        self.min_x.is_finite()
            && self.min_y.is_finite()
            && self.max_x.is_finite()
            && self.max_y.is_finite()
    }

    /// Check if a point is contained within this bounding box (edges included).
    pub fn contains_point(&self, point: &Point) -> bool {
        point.x() >= self.min_x
            && point.x() <= self.max_x
            && point.y() >= self.min_y
            && point.y() <= self.max_y
    }
}

/// `true` when both coordinates are finite.
pub fn is_finite_point(point: &Point) -> bool {
    point.x().is_finite() && point.y().is_finite()
}
