//! Turning request parameters into index queries and results into GeoJSON.
//!
//! Parsing is strict: a box is exactly four comma-separated finite numbers,
//! a point exactly two, and a radius one finite non-negative number.
//! Anything else is a [`PointServerError::Parse`] and never reaches the
//! index.

use crate::dataset::Dataset;
use crate::error::{PointServerError, Result};
use crate::types::{BoundingBox2D, Point};
use geojson::FeatureCollection;
use std::str::FromStr;
use std::sync::Arc;

/// A bounding-box query, `minX,minY,maxX,maxY`.
///
/// An inverted box parses fine and matches nothing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoxQuery {
    pub bbox: BoundingBox2D,
}

impl FromStr for BoxQuery {
    type Err = PointServerError;

    fn from_str(s: &str) -> Result<Self> {
        let [min_x, min_y, max_x, max_y] = parse_components::<4>(s, "bbox")?;
        Ok(Self {
            bbox: BoundingBox2D::new(min_x, min_y, max_x, max_y),
        })
    }
}

/// All features within `radius` of `center`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RadiusQuery {
    pub center: Point,
    pub radius: f64,
}

impl RadiusQuery {
    /// Parse a `x,y` point and a separate radius.
    pub fn parse(point: &str, radius: &str) -> Result<Self> {
        let center = parse_point(point)?;
        let radius = parse_number(radius, "radius")?;
        if radius < 0.0 {
            return Err(PointServerError::Parse(format!(
                "radius must not be negative, got {}",
                radius
            )));
        }
        Ok(Self { center, radius })
    }
}

/// Parse an `x,y` point.
pub fn parse_point(s: &str) -> Result<Point> {
    let [x, y] = parse_components::<2>(s, "point")?;
    Ok(Point::new(x, y))
}

fn parse_components<const N: usize>(s: &str, what: &str) -> Result<[f64; N]> {
    let parts: Vec<&str> = s.split(',').collect();
    if parts.len() != N {
        return Err(PointServerError::Parse(format!(
            "{} must have {} comma-separated components, got {}",
            what,
            N,
            parts.len()
        )));
    }

    let mut values = [0.0; N];
    for (i, part) in parts.iter().enumerate() {
        values[i] = parse_number(part, &format!("{} component {}", what, i + 1))?;
    }
    Ok(values)
}

fn parse_number(s: &str, what: &str) -> Result<f64> {
    let value: f64 = s
        .trim()
        .parse()
        .map_err(|_| PointServerError::Parse(format!("{} is not a number: {:?}", what, s)))?;

    if !value.is_finite() {
        return Err(PointServerError::Parse(format!(
            "{} must be finite, got {}",
            what, value
        )));
    }
    Ok(value)
}

/// Runs queries against whatever dataset is published at call time.
///
/// Each call takes one snapshot and uses it for both the index query and the
/// feature lookup, so a concurrent reload can never mix two datasets in one
/// response.
#[derive(Clone)]
pub struct QueryService {
    dataset: Arc<Dataset>,
}

impl QueryService {
    pub fn new(dataset: Arc<Dataset>) -> Self {
        Self { dataset }
    }

    pub fn dataset(&self) -> &Arc<Dataset> {
        &self.dataset
    }

    pub fn features_in_box(&self, query: &BoxQuery) -> FeatureCollection {
        let store = self.dataset.snapshot();
        let hits = store.query_bbox(&query.bbox);
        store.to_feature_collection(&hits)
    }

    pub fn features_within(&self, query: &RadiusQuery) -> FeatureCollection {
        let store = self.dataset.snapshot();
        let hits = store.query_radius(&query.center, query.radius);
        store.to_feature_collection(&hits)
    }

    /// Parse `bbox` and return the matching features as GeoJSON text.
    pub fn box_geojson(&self, bbox: &str) -> Result<String> {
        let query: BoxQuery = bbox.parse()?;
        to_json(&self.features_in_box(&query))
    }

    /// Parse `point` and `radius` and return the matching features as GeoJSON text.
    pub fn nearest_geojson(&self, point: &str, radius: &str) -> Result<String> {
        let query = RadiusQuery::parse(point, radius)?;
        to_json(&self.features_within(&query))
    }
}

fn to_json(collection: &FeatureCollection) -> Result<String> {
    serde_json::to_string(collection).map_err(|e| {
        PointServerError::Serialization(format!("failed to serialize features: {}", e))
    })
}
