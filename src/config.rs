//! Configuration for loading, indexing, watching and serving a dataset.
//!
//! Every field has a default, so an empty TOML document is a valid config.
//!
//! ```rust
//! use pointserver::{Config, LoadPolicy};
//!
//! let config = Config::from_toml_str(
//!     r#"
//!     leaf_size = 16
//!     load_policy = "skip_invalid"
//!
//!     [server]
//!     port = 9000
//!     "#,
//! )?;
//! assert_eq!(config.leaf_size, 16);
//! assert_eq!(config.load_policy, LoadPolicy::SkipInvalid);
//! assert_eq!(config.server.host, "127.0.0.1");
//! # Ok::<(), pointserver::PointServerError>(())
//! ```

use crate::error::{PointServerError, Result};
use crate::index::DEFAULT_LEAF_SIZE;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// What to do when one source among many cannot be loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LoadPolicy {
    /// Abort the whole load on the first bad source.
    #[default]
    FailFast,
    /// Log the bad source and keep going with the rest.
    SkipInvalid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Maximum number of points in an index leaf.
    #[serde(default = "Config::default_leaf_size")]
    pub leaf_size: usize,

    #[serde(default)]
    pub load_policy: LoadPolicy,

    /// File extensions picked up when walking source directories.
    #[serde(default = "Config::default_extensions")]
    pub extensions: Vec<String>,

    /// Reload automatically when a source changes.
    #[serde(default = "Config::default_watch")]
    pub watch: bool,

    /// Quiet period after a change event before reloading.
    #[serde(default = "Config::default_debounce_ms")]
    pub debounce_ms: u64,

    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    #[serde(default = "ServerConfig::default_host")]
    pub host: String,

    #[serde(default = "ServerConfig::default_port")]
    pub port: u16,
}

impl ServerConfig {
    fn default_host() -> String {
        "127.0.0.1".to_string()
    }

    const fn default_port() -> u16 {
        8000
    }

    /// `host:port`, ready to be parsed as a socket address.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: Self::default_host(),
            port: Self::default_port(),
        }
    }
}

impl Config {
    const fn default_leaf_size() -> usize {
        DEFAULT_LEAF_SIZE
    }

    fn default_extensions() -> Vec<String> {
        vec!["geojson".to_string(), "json".to_string()]
    }

    const fn default_watch() -> bool {
        true
    }

    const fn default_debounce_ms() -> u64 {
        250
    }

    pub fn with_leaf_size(mut self, leaf_size: usize) -> Self {
        self.leaf_size = leaf_size;
        self
    }

    pub fn with_load_policy(mut self, policy: LoadPolicy) -> Self {
        self.load_policy = policy;
        self
    }

    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extensions = extensions.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_watch(mut self, watch: bool) -> Self {
        self.watch = watch;
        self
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce_ms = debounce.as_millis() as u64;
        self
    }

    pub fn with_server(mut self, server: ServerConfig) -> Self {
        self.server = server;
        self
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if self.leaf_size == 0 {
            return Err(PointServerError::Config(
                "leaf_size must be greater than zero".to_string(),
            ));
        }

        if self.extensions.is_empty() {
            return Err(PointServerError::Config(
                "at least one source file extension is required".to_string(),
            ));
        }

        if self.leaf_size > 4096 {
            log::warn!(
                "leaf_size of {} is very large; queries will scan long leaves",
                self.leaf_size
            );
        }

        Ok(())
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(toml: &str) -> Result<Self> {
        let config: Self = toml::from_str(toml)
            .map_err(|e| PointServerError::Config(format!("failed to parse TOML: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            PointServerError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&text)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| {
            PointServerError::Serialization(format!("failed to serialize config: {}", e))
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            leaf_size: Self::default_leaf_size(),
            load_policy: LoadPolicy::default(),
            extensions: Self::default_extensions(),
            watch: Self::default_watch(),
            debounce_ms: Self::default_debounce_ms(),
            server: ServerConfig::default(),
        }
    }
}
