//! Error types for pointserver.

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, PointServerError>;

#[derive(Debug, Error)]
pub enum PointServerError {
    /// Malformed bounding box, point or radius text supplied by a client.
    #[error("{0}")]
    Parse(String),

    /// A source could not be read or decoded into features.
    #[error("failed to ingest {}: {message}", display_path(.path))]
    Ingestion {
        path: Option<PathBuf>,
        message: String,
    },

    /// A feature has no usable point geometry.
    #[error("feature {index}: {reason}")]
    Geometry { index: usize, reason: String },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("file watcher error: {0}")]
    Watch(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PointServerError {
    pub(crate) fn ingestion(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        Self::Ingestion {
            path: Some(path.into()),
            message: message.to_string(),
        }
    }

    /// Errors caused by the request itself rather than the server.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Parse(_))
    }

    /// Errors that mean a dataset could not be built. Geometry errors are
    /// a kind of ingestion failure.
    pub fn is_ingestion(&self) -> bool {
        matches!(self, Self::Ingestion { .. } | Self::Geometry { .. })
    }
}

fn display_path(path: &Option<PathBuf>) -> String {
    match path {
        Some(path) => path.display().to_string(),
        None => "<source>".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        assert!(PointServerError::Parse("bad".into()).is_client_error());
        assert!(!PointServerError::Parse("bad".into()).is_ingestion());

        let geometry = PointServerError::Geometry {
            index: 3,
            reason: "missing geometry".into(),
        };
        assert!(geometry.is_ingestion());
        assert!(!geometry.is_client_error());
        assert_eq!(geometry.to_string(), "feature 3: missing geometry");

        let ingestion = PointServerError::ingestion("/data/a.geojson", "bad json");
        assert!(ingestion.is_ingestion());
        assert_eq!(
            ingestion.to_string(),
            "failed to ingest /data/a.geojson: bad json"
        );
    }
}
