//! Reading GeoJSON features from files and directory trees.

use crate::config::{Config, LoadPolicy};
use crate::error::{PointServerError, Result};
use geojson::GeoJson;
use std::fs;
use std::path::{Path, PathBuf};

/// Anything that can produce the full, ordered feature list for a dataset.
pub trait FeatureSource: Send + Sync {
    /// Read every feature. Called once per (re)load.
    fn load(&self) -> Result<Vec<geojson::Feature>>;

    /// Filesystem locations whose changes should trigger a reload.
    fn watch_paths(&self) -> Vec<PathBuf> {
        Vec::new()
    }

    /// Short human-readable description for logs.
    fn describe(&self) -> String {
        "feature source".to_string()
    }
}

/// GeoJSON files, or directories walked recursively for GeoJSON files.
///
/// Explicit file paths are always parsed. Inside directories only files with
/// one of the configured extensions are read; other files are skipped with a
/// warning. Directory entries are visited in sorted order so that repeated
/// loads produce the same feature order.
#[derive(Debug, Clone)]
pub struct GeoJsonFiles {
    paths: Vec<PathBuf>,
    policy: LoadPolicy,
    extensions: Vec<String>,
}

impl GeoJsonFiles {
    pub fn new<I, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let defaults = Config::default();
        Self {
            paths: paths.into_iter().map(Into::into).collect(),
            policy: defaults.load_policy,
            extensions: defaults.extensions,
        }
    }

    /// Apply the loader settings from `config`.
    pub fn with_config(self, config: &Config) -> Self {
        self.with_policy(config.load_policy)
            .with_extensions(config.extensions.iter().cloned())
    }

    pub fn with_policy(mut self, policy: LoadPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extensions = extensions
            .into_iter()
            .map(|e| {
                let e: String = e.into();
                e.trim_start_matches('.').to_ascii_lowercase()
            })
            .collect();
        self
    }

    fn has_feature_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| {
                let e = e.to_ascii_lowercase();
                self.extensions.iter().any(|allowed| *allowed == e)
            })
            .unwrap_or(false)
    }

    /// Expand sources into the ordered list of files to parse.
    fn collect_files(&self) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for path in &self.paths {
            if path.is_dir() {
                self.walk_dir(path, &mut files)?;
            } else if path.exists() {
                files.push(path.clone());
            } else {
                self.handle_failure(PointServerError::ingestion(path, "source does not exist"))?;
            }
        }
        Ok(files)
    }

    fn walk_dir(&self, dir: &Path, files: &mut Vec<PathBuf>) -> Result<()> {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => return self.handle_failure(PointServerError::ingestion(dir, e)),
        };

        let mut children = Vec::new();
        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    self.handle_failure(PointServerError::ingestion(dir, e))?;
                    continue;
                }
            };
            // `DirEntry::file_type` does not follow symlinks.
            match entry.file_type() {
                Ok(file_type) => children.push((entry.path(), file_type)),
                Err(e) => self.handle_failure(PointServerError::ingestion(entry.path(), e))?,
            }
        }
        children.sort_by(|a, b| a.0.cmp(&b.0));

        for (child, file_type) in children {
            if file_type.is_dir() {
                self.walk_dir(&child, files)?;
            } else if file_type.is_symlink() && child.is_dir() {
                log::warn!(
                    "Skipping {}: symlinked directories are not followed",
                    child.display()
                );
            } else if self.has_feature_extension(&child) {
                files.push(child);
            } else {
                log::warn!("Skipping {}: not a feature file", child.display());
            }
        }
        Ok(())
    }

    /// Fail-fast propagates; skip-invalid logs and swallows.
    fn handle_failure(&self, err: PointServerError) -> Result<()> {
        match self.policy {
            LoadPolicy::FailFast => Err(err),
            LoadPolicy::SkipInvalid => {
                log::warn!("Skipping source: {}", err);
                Ok(())
            }
        }
    }
}

impl FeatureSource for GeoJsonFiles {
    fn load(&self) -> Result<Vec<geojson::Feature>> {
        let files = self.collect_files()?;
        let mut features = Vec::new();

        for file in &files {
            match read_features(file) {
                Ok(mut parsed) => {
                    log::debug!("Read {} features from {}", parsed.len(), file.display());
                    features.append(&mut parsed);
                }
                Err(e) => self.handle_failure(e)?,
            }
        }

        log::info!(
            "Loaded {} features from {} files",
            features.len(),
            files.len()
        );
        Ok(features)
    }

    fn watch_paths(&self) -> Vec<PathBuf> {
        self.paths.clone()
    }

    fn describe(&self) -> String {
        let paths: Vec<String> = self.paths.iter().map(|p| p.display().to_string()).collect();
        paths.join(", ")
    }
}

/// Parse one GeoJSON document into its features.
///
/// A `FeatureCollection` yields all its features and a single `Feature`
/// yields itself. A bare geometry is rejected.
pub fn read_features(path: &Path) -> Result<Vec<geojson::Feature>> {
    let text = fs::read_to_string(path).map_err(|e| PointServerError::ingestion(path, e))?;
    parse_features(&text).map_err(|message| PointServerError::ingestion(path, message))
}

fn parse_features(text: &str) -> std::result::Result<Vec<geojson::Feature>, String> {
    let geojson: GeoJson = text.parse().map_err(|e| format!("invalid GeoJSON: {}", e))?;

    match geojson {
        GeoJson::FeatureCollection(collection) => Ok(collection.features),
        GeoJson::Feature(feature) => Ok(vec![feature]),
        GeoJson::Geometry(_) => {
            Err("expected a Feature or FeatureCollection, found a bare geometry".to_string())
        }
    }
}
