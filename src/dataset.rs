//! The published dataset and its reload lifecycle.
//!
//! A [`Dataset`] owns the active [`FeatureStore`] behind a
//! `parking_lot::RwLock` holding an `Arc` to it and its generation number.
//! The lock guards only that pair: readers take it long enough to clone the
//! `Arc`, and a reload takes it long enough
//! to swap in a store that is already fully built. Queries then run against
//! their own snapshot without any locking, so a reload never blocks or
//! changes an in-flight query.
//!
//! ```rust
//! use geojson::{Feature, Geometry, Value};
//! use pointserver::{Config, Dataset, FeatureSource, Result};
//!
//! struct TwoPoints;
//!
//! impl FeatureSource for TwoPoints {
//!     fn load(&self) -> Result<Vec<Feature>> {
//!         Ok([[0.0, 0.0], [5.0, 5.0]]
//!             .into_iter()
//!             .map(|c| Feature::from(Geometry::new(Value::Point(c.to_vec()))))
//!             .collect())
//!     }
//! }
//!
//! let dataset = Dataset::open(TwoPoints, &Config::default())?;
//! let store = dataset.snapshot();
//! assert_eq!(store.len(), 2);
//!
//! let report = dataset.reload()?;
//! assert_eq!(report.generation, 2);
//! # Ok::<(), pointserver::PointServerError>(())
//! ```

use crate::config::Config;
use crate::error::Result;
use crate::loader::FeatureSource;
use crate::store::FeatureStore;
use crate::types::BoundingBox2D;
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Outcome of a successful reload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReloadReport {
    pub features: usize,
    pub generation: u64,
    pub elapsed: Duration,
}

/// Point-in-time counters for the dataset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetStats {
    pub features: usize,
    pub generation: u64,
    pub reloads: u64,
    pub failed_reloads: u64,
    pub leaf_size: usize,
    pub bounds: Option<BoundingBox2D>,
}

/// The active store and the generation it was published as. Both change
/// together under one write lock.
#[derive(Clone)]
struct Published {
    generation: u64,
    store: Arc<FeatureStore>,
}

pub struct Dataset {
    source: Box<dyn FeatureSource>,
    leaf_size: usize,
    current: RwLock<Published>,
    reloads: AtomicU64,
    failed_reloads: AtomicU64,
    /// Serializes reloads so publishes happen in build order.
    reload_lock: Mutex<()>,
}

impl Dataset {
    /// Load the initial store from `source`.
    ///
    /// Startup fails if this first load fails; there is nothing to fall back on.
    pub fn open(source: impl FeatureSource + 'static, config: &Config) -> Result<Self> {
        config.validate()?;

        let dataset = Self {
            source: Box::new(source),
            leaf_size: config.leaf_size,
            current: RwLock::new(Published {
                generation: 0,
                store: Arc::new(FeatureStore::empty()),
            }),
            reloads: AtomicU64::new(0),
            failed_reloads: AtomicU64::new(0),
            reload_lock: Mutex::new(()),
        };

        let store = dataset.load()?;
        dataset.publish(store);
        Ok(dataset)
    }

    /// Read every source and build a new store without publishing it.
    pub fn load(&self) -> Result<FeatureStore> {
        let features = self.source.load()?;
        FeatureStore::build(features, self.leaf_size)
    }

    /// Make `store` the active store. Returns the new generation.
    ///
    /// Readers that already hold the previous store keep using it; it is
    /// dropped once the last of them finishes.
    pub fn publish(&self, store: FeatureStore) -> u64 {
        let features = store.len();
        let store = Arc::new(store);

        let generation = {
            let mut current = self.current.write();
            let generation = current.generation + 1;
            *current = Published { generation, store };
            generation
        };

        log::info!(
            "Published dataset generation {} with {} features",
            generation,
            features
        );
        generation
    }

    /// Rebuild from the sources and publish on success.
    ///
    /// On failure the active store is left untouched and the error returned.
    pub fn reload(&self) -> Result<ReloadReport> {
        let _guard = self.reload_lock.lock();
        let started = Instant::now();

        match self.load() {
            Ok(store) => {
                let features = store.len();
                let generation = self.publish(store);
                self.reloads.fetch_add(1, Ordering::Relaxed);
                Ok(ReloadReport {
                    features,
                    generation,
                    elapsed: started.elapsed(),
                })
            }
            Err(e) => {
                self.failed_reloads.fetch_add(1, Ordering::Relaxed);
                log::error!(
                    "Reload of {} failed, keeping generation {}: {}",
                    self.source.describe(),
                    self.generation(),
                    e
                );
                Err(e)
            }
        }
    }

    /// The active store. Hold on to the returned `Arc` for the whole query.
    pub fn snapshot(&self) -> Arc<FeatureStore> {
        Arc::clone(&self.current.read().store)
    }

    pub fn generation(&self) -> u64 {
        self.current.read().generation
    }

    /// Counters for the active store. Feature count, bounds and generation
    /// always describe the same published store.
    pub fn stats(&self) -> DatasetStats {
        let Published { generation, store } = self.current.read().clone();
        DatasetStats {
            features: store.len(),
            generation,
            reloads: self.reloads.load(Ordering::Relaxed),
            failed_reloads: self.failed_reloads.load(Ordering::Relaxed),
            leaf_size: self.leaf_size,
            bounds: store.bounds(),
        }
    }

    pub fn watch_paths(&self) -> Vec<PathBuf> {
        self.source.watch_paths()
    }
}
