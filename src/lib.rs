//! Spatial queries over GeoJSON point features, with hot reload.
//!
//! ## Features
//! - **Static k-d index**: flat-array k-d tree with bounding-box and radius queries
//! - **Immutable stores**: features and their index are built once and never mutated
//! - **Atomic reload**: new data is built off to the side and published in one swap
//! - **File watching**: sources are reloaded when they change (`watch` feature)
//! - **HTTP transport**: `/features`, `/nearest`, `/stats` and `/admin/reload`
//!
//! ```rust
//! use pointserver::{BoundingBox2D, FeatureStore, Point};
//! use geojson::{Feature, Geometry, Value};
//!
//! let features: Vec<Feature> = [[0.0, 0.0], [1.0, 1.0], [2.0, 2.0], [10.0, 10.0], [-5.0, -5.0]]
//!     .into_iter()
//!     .map(|c| Feature::from(Geometry::new(Value::Point(c.to_vec()))))
//!     .collect();
//!
//! let store = FeatureStore::build(features, 10)?;
//! assert_eq!(store.query_bbox(&BoundingBox2D::new(0.0, 0.0, 2.0, 2.0)), vec![0, 1, 2]);
//! assert_eq!(store.query_radius(&Point::new(1.0, 1.0), 1.5), vec![0, 1, 2]);
//! # Ok::<(), pointserver::PointServerError>(())
//! ```

pub mod config;
pub mod dataset;
pub mod error;
pub mod index;
pub mod loader;
pub mod query;
pub mod server;
pub mod store;
pub mod types;

#[cfg(feature = "watch")]
pub mod watch;

pub use config::{Config, LoadPolicy, ServerConfig};
pub use dataset::{Dataset, DatasetStats, ReloadReport};
pub use error::{PointServerError, Result};
pub use index::{DEFAULT_LEAF_SIZE, PointIndex};
pub use loader::{FeatureSource, GeoJsonFiles};
pub use query::{BoxQuery, QueryService, RadiusQuery};
pub use store::{Feature, FeatureStore};
pub use types::{BoundingBox2D, Point};

#[cfg(feature = "watch")]
pub use watch::DatasetWatcher;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Common imports
pub mod prelude {
    pub use crate::{BoundingBox2D, Config, Dataset, FeatureStore, Point, PointIndex};

    pub use crate::{FeatureSource, GeoJsonFiles, LoadPolicy};

    pub use crate::{BoxQuery, QueryService, RadiusQuery};

    pub use crate::{PointServerError, Result};
}
