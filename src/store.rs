//! Immutable feature list paired with a point index over its coordinates.

use crate::error::{PointServerError, Result};
use crate::index::PointIndex;
use crate::types::{BoundingBox2D, Point, is_finite_point};
use geojson::{FeatureCollection, Value};
use std::time::Instant;

/// A GeoJSON feature with its representative point extracted.
///
/// Everything apart from the point (id, properties, foreign members) is
/// carried along untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    point: Point,
    inner: geojson::Feature,
}

impl Feature {
    /// Wrap a GeoJSON feature, which must have a finite `Point` geometry.
    ///
    /// Errors are [`PointServerError::Geometry`] reporting position 0; use
    /// [`FeatureStore::build`] to get positions within a list.
    pub fn new(feature: geojson::Feature) -> Result<Self> {
        Self::at(feature, 0)
    }

    fn at(feature: geojson::Feature, index: usize) -> Result<Self> {
        match extract_point(&feature) {
            Ok(point) => Ok(Self {
                point,
                inner: feature,
            }),
            Err(reason) => Err(PointServerError::Geometry { index, reason }),
        }
    }

    pub fn point(&self) -> &Point {
        &self.point
    }

    pub fn geojson(&self) -> &geojson::Feature {
        &self.inner
    }

    pub fn into_geojson(self) -> geojson::Feature {
        self.inner
    }
}

fn extract_point(feature: &geojson::Feature) -> std::result::Result<Point, String> {
    let geometry = feature
        .geometry
        .as_ref()
        .ok_or_else(|| "feature has no geometry".to_string())?;

    let point = match &geometry.value {
        Value::Point(coords) => {
            if coords.len() < 2 {
                return Err(format!(
                    "point must have at least 2 coordinates, got {}",
                    coords.len()
                ));
            }
            Point::new(coords[0], coords[1])
        }
        other => {
            return Err(format!(
                "only Point geometries can be indexed, got {}",
                geometry_name(other)
            ));
        }
    };

    if !is_finite_point(&point) {
        return Err(format!(
            "point coordinates must be finite, got ({}, {})",
            point.x(),
            point.y()
        ));
    }

    Ok(point)
}

fn geometry_name(value: &Value) -> &'static str {
    match value {
        Value::Point(_) => "Point",
        Value::MultiPoint(_) => "MultiPoint",
        Value::LineString(_) => "LineString",
        Value::MultiLineString(_) => "MultiLineString",
        Value::Polygon(_) => "Polygon",
        Value::MultiPolygon(_) => "MultiPolygon",
        Value::GeometryCollection(_) => "GeometryCollection",
    }
}

/// Standalone conversion; the error reports position 0.
impl TryFrom<geojson::Feature> for Feature {
    type Error = PointServerError;

    fn try_from(feature: geojson::Feature) -> Result<Self> {
        Feature::new(feature)
    }
}

/// Features plus the index built over their points.
///
/// Index result `i` refers to `features[i]`; the list is never reordered.
#[derive(Debug, Clone)]
pub struct FeatureStore {
    features: Vec<Feature>,
    index: PointIndex,
    bounds: Option<BoundingBox2D>,
}

impl FeatureStore {
    /// Validate every feature and build the index.
    ///
    /// The first feature without a usable point fails the whole build with
    /// a [`PointServerError::Geometry`] naming its position.
    pub fn build(features: Vec<geojson::Feature>, leaf_size: usize) -> Result<Self> {
        let features = features
            .into_iter()
            .enumerate()
            .map(|(index, feature)| Feature::at(feature, index))
            .collect::<Result<Vec<_>>>()?;

        Self::from_features(features, leaf_size)
    }

    pub fn from_features(features: Vec<Feature>, leaf_size: usize) -> Result<Self> {
        let started = Instant::now();
        let points: Vec<Point> = features.iter().map(|f| f.point).collect();
        let index = PointIndex::build(&points, leaf_size)?;
        let bounds = BoundingBox2D::from_points(&points);

        log::debug!(
            "Indexed {} features (leaf size {}) in {:?}",
            features.len(),
            leaf_size,
            started.elapsed()
        );

        Ok(Self {
            features,
            index,
            bounds,
        })
    }

    pub fn empty() -> Self {
        Self {
            features: Vec::new(),
            index: PointIndex::default(),
            bounds: None,
        }
    }

    /// Look up the features for index results, in the order given.
    pub fn features_for(&self, indices: &[usize]) -> Vec<&Feature> {
        indices
            .iter()
            .map(|&i| {
                debug_assert!(i < self.features.len(), "index result {} out of range", i);
                &self.features[i]
            })
            .collect()
    }

    /// Positions of features inside `bbox`, ascending.
    pub fn query_bbox(&self, bbox: &BoundingBox2D) -> Vec<usize> {
        let mut hits = self
            .index
            .range(bbox.min_x, bbox.min_y, bbox.max_x, bbox.max_y);
        hits.sort_unstable();
        hits
    }

    /// Positions of features within `radius` of `center`, ascending.
    pub fn query_radius(&self, center: &Point, radius: f64) -> Vec<usize> {
        let mut hits = self.index.within(center, radius);
        hits.sort_unstable();
        hits
    }

    /// Collect the features at `indices` into a GeoJSON collection.
    pub fn to_feature_collection(&self, indices: &[usize]) -> FeatureCollection {
        FeatureCollection {
            bbox: None,
            features: self
                .features_for(indices)
                .into_iter()
                .map(|f| f.inner.clone())
                .collect(),
            foreign_members: None,
        }
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    pub fn index(&self) -> &PointIndex {
        &self.index
    }

    /// Extent of all feature points, `None` when the store is empty.
    pub fn bounds(&self) -> Option<BoundingBox2D> {
        self.bounds
    }
}

impl Default for FeatureStore {
    fn default() -> Self {
        Self::empty()
    }
}
