//! Reload the dataset when its source files change.
//!
//! A notify watcher forwards filesystem events over a channel to a dedicated
//! thread. The thread waits for a quiet period after the last relevant event
//! and then calls [`Dataset::reload`]; it touches nothing else.

use crate::dataset::Dataset;
use crate::error::{PointServerError, Result};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Running file watcher. Stops when [`DatasetWatcher::stop`] is called or
/// the value is dropped.
pub struct DatasetWatcher {
    watcher: RecommendedWatcher,
    handle: JoinHandle<()>,
}

impl DatasetWatcher {
    /// Watch every path reported by `dataset.watch_paths()`.
    ///
    /// Paths that cannot be watched are logged and skipped; an error is
    /// returned only if none of them could be watched.
    pub fn spawn(dataset: Arc<Dataset>, debounce: Duration) -> Result<Self> {
        let (tx, rx) = mpsc::channel();
        let mut watcher = notify::recommended_watcher(move |event: notify::Result<Event>| {
            // The receiver is gone only while shutting down.
            let _ = tx.send(event);
        })
        .map_err(|e| PointServerError::Watch(e.to_string()))?;

        let paths = dataset.watch_paths();
        let mut watched = 0;
        for path in &paths {
            match watcher.watch(path, RecursiveMode::Recursive) {
                Ok(()) => {
                    log::info!("Watching {} for changes", path.display());
                    watched += 1;
                }
                Err(e) => log::warn!("Cannot watch {}: {}", path.display(), e),
            }
        }

        if watched == 0 && !paths.is_empty() {
            return Err(PointServerError::Watch(format!(
                "none of the {} source paths could be watched",
                paths.len()
            )));
        }

        let handle = thread::Builder::new()
            .name("dataset-watcher".to_string())
            .spawn(move || watch_loop(&dataset, &rx, debounce))?;

        Ok(Self { watcher, handle })
    }

    /// Stop watching and wait for a reload in progress to finish.
    pub fn stop(self) {
        let Self { watcher, handle } = self;
        // Dropping the watcher closes the channel, which ends the loop.
        drop(watcher);
        if handle.join().is_err() {
            log::error!("Dataset watcher thread panicked");
        }
    }
}

fn is_relevant(event: &Event) -> bool {
    matches!(
        event.kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    )
}

fn watch_loop(dataset: &Dataset, rx: &Receiver<notify::Result<Event>>, debounce: Duration) {
    loop {
        match rx.recv() {
            Ok(Ok(event)) if is_relevant(&event) => {
                log::debug!("Change detected: {:?} {:?}", event.kind, event.paths);
            }
            Ok(Ok(_)) => continue,
            Ok(Err(e)) => {
                log::warn!("File watcher error: {}", e);
                continue;
            }
            Err(_) => return,
        }

        // Coalesce bursts of events into one reload.
        loop {
            match rx.recv_timeout(debounce) {
                Ok(_) => continue,
                Err(RecvTimeoutError::Timeout) => break,
                Err(RecvTimeoutError::Disconnected) => return,
            }
        }

        // Failures are logged by the dataset; the previous store stays active.
        if let Ok(report) = dataset.reload() {
            log::info!(
                "Reloaded {} features (generation {}) in {:?}",
                report.features,
                report.generation,
                report.elapsed
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::loader::GeoJsonFiles;
    use std::time::Instant;

    fn collection(points: &[(f64, f64)]) -> String {
        let features: Vec<String> = points
            .iter()
            .map(|(x, y)| {
                format!(
                    r#"{{"type": "Feature", "geometry": {{"type": "Point", "coordinates": [{}, {}]}}, "properties": {{}}}}"#,
                    x, y
                )
            })
            .collect();
        format!(
            r#"{{"type": "FeatureCollection", "features": [{}]}}"#,
            features.join(",")
        )
    }

    fn wait_for(mut condition: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(10);
        while Instant::now() < deadline {
            if condition() {
                return true;
            }
            thread::sleep(Duration::from_millis(20));
        }
        false
    }

    #[test]
    fn test_file_change_triggers_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("points.geojson");
        std::fs::write(&path, collection(&[(0.0, 0.0)])).unwrap();

        let dataset = Arc::new(
            Dataset::open(GeoJsonFiles::new([dir.path()]), &Config::default()).unwrap(),
        );
        let watcher = DatasetWatcher::spawn(Arc::clone(&dataset), Duration::from_millis(50))
            .unwrap();

        std::fs::write(&path, collection(&[(0.0, 0.0), (1.0, 1.0), (2.0, 2.0)])).unwrap();
        assert!(wait_for(|| dataset.snapshot().len() == 3));
        assert!(dataset.generation() >= 2);

        watcher.stop();
    }

    #[test]
    fn test_broken_file_keeps_previous_dataset() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("points.geojson");
        std::fs::write(&path, collection(&[(0.0, 0.0), (1.0, 1.0)])).unwrap();

        let dataset = Arc::new(
            Dataset::open(GeoJsonFiles::new([dir.path()]), &Config::default()).unwrap(),
        );
        let watcher = DatasetWatcher::spawn(Arc::clone(&dataset), Duration::from_millis(50))
            .unwrap();

        std::fs::write(&path, "{ truncated").unwrap();
        assert!(wait_for(|| dataset.stats().failed_reloads >= 1));
        assert_eq!(dataset.snapshot().len(), 2);
        assert_eq!(dataset.generation(), 1);

        watcher.stop();
    }
}
