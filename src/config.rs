//! Opening settings, loadable from TOML.

use std::fs;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::{GraphError, Result};

/// Settings supplied when opening a [`GraphView`](crate::GraphView).
///
/// There are no implicit defaults: both cache capacities are chosen by the
/// caller. They only affect allocation behaviour, never results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphConfig {
    /// Base path of the compressed graph; companion files are derived from it.
    pub base_path: PathBuf,
    /// Maximum number of vertex handles kept by the identity cache.
    pub vertex_cache_capacity: NonZeroUsize,
    /// Maximum number of edge handles kept by the identity cache.
    pub edge_cache_capacity: NonZeroUsize,
}

impl GraphConfig {
    /// Validates both capacities; zero is rejected.
    pub fn new(
        base_path: impl Into<PathBuf>,
        vertex_cache_capacity: usize,
        edge_cache_capacity: usize,
    ) -> Result<Self> {
        Ok(Self {
            base_path: base_path.into(),
            vertex_cache_capacity: capacity("vertex_cache", vertex_cache_capacity)?,
            edge_cache_capacity: capacity("edge_cache", edge_cache_capacity)?,
        })
    }

    /// Parses settings from TOML text.
    pub fn from_toml_str(contents: &str) -> std::result::Result<Self, ConfigError> {
        let raw: RawConfig =
            toml::from_str(contents).map_err(|source| ConfigError::Parse { path: None, source })?;
        raw.into_config()
    }

    /// Reads and parses a TOML settings file.
    pub fn load(path: impl AsRef<Path>) -> std::result::Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let raw: RawConfig = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: Some(path.to_path_buf()),
            source,
        })?;
        raw.into_config()
    }

    /// Serialises back to TOML accepted by [`from_toml_str`](Self::from_toml_str).
    pub fn to_toml_string(&self) -> std::result::Result<String, ConfigError> {
        let raw = RawConfig {
            base_path: self.base_path.clone(),
            vertex_cache: self.vertex_cache_capacity.get(),
            edge_cache: self.edge_cache_capacity.get(),
        };
        toml::to_string_pretty(&raw).map_err(|source| ConfigError::Serialize { source })
    }

    /// Path of the transposed graph (`<base>-transposed`).
    pub fn transposed_path(&self) -> PathBuf {
        with_suffix(&self.base_path, "-transposed")
    }

    /// Path of a per-node property file (`<base>.property.<key>.bin`).
    pub fn property_path(&self, key: &str) -> PathBuf {
        with_suffix(&self.base_path, &format!(".property.{key}.bin"))
    }
}

fn with_suffix(base: &Path, suffix: &str) -> PathBuf {
    let mut raw = base.as_os_str().to_owned();
    raw.push(suffix);
    PathBuf::from(raw)
}

fn capacity(name: &str, value: usize) -> Result<NonZeroUsize> {
    NonZeroUsize::new(value)
        .ok_or_else(|| GraphError::InvalidConfig(format!("{name} capacity must be positive")))
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    base_path: PathBuf,
    vertex_cache: usize,
    edge_cache: usize,
}

impl RawConfig {
    fn into_config(self) -> std::result::Result<GraphConfig, ConfigError> {
        GraphConfig::new(self.base_path, self.vertex_cache, self.edge_cache)
            .map_err(|err| ConfigError::Invalid(err.to_string()))
    }
}

/// Failure to load or store a [`GraphConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The settings file could not be read.
    #[error("failed to read graph config {path}: {source}")]
    Read {
        /// File that failed.
        path: PathBuf,
        /// Cause reported by the OS.
        source: std::io::Error,
    },
    /// The TOML is malformed or has unknown keys.
    #[error("failed to parse graph config{}: {source}", display_path(.path))]
    Parse {
        /// Source file, `None` for in-memory text.
        path: Option<PathBuf>,
        /// Parser diagnostic.
        source: toml::de::Error,
    },
    /// Serialisation failed.
    #[error("failed to serialize graph config: {source}")]
    Serialize {
        /// Serialiser diagnostic.
        source: toml::ser::Error,
    },
    /// Parsed values that fail validation.
    #[error("{0}")]
    Invalid(String),
}

fn display_path(path: &Option<PathBuf>) -> String {
    match path {
        Some(path) => format!(" {}", path.display()),
        None => String::new(),
    }
}

impl From<ConfigError> for GraphError {
    fn from(err: ConfigError) -> Self {
        GraphError::InvalidConfig(err.to_string())
    }
}
