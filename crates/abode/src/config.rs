//! Service configuration.
//!
//! Every field has a default, so a config file only needs the keys it
//! changes. The binary layers command-line flags and `ABODE_*` environment
//! variables over whatever the file provides.

use abode_model::{InvalidBuckets, LoadOptions, ModelPaths, PriceBuckets};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur while reading or applying configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// IO error
    #[error("Failed to read config {path}: {source}")]
    Io {
        /// File that could not be read
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// Malformed JSON or an unknown key
    #[error("Invalid config: {0}")]
    Parse(#[from] serde_json::Error),

    /// Thresholds out of order
    #[error(transparent)]
    Buckets(#[from] InvalidBuckets),

    /// A setting that cannot be used
    #[error("Invalid setting {key}: {reason}")]
    Invalid {
        /// Setting name
        key: &'static str,
        /// Why it was rejected
        reason: String,
    },
}

/// Default models directory: `<data dir>/abode/models`, or `./models` when
/// the platform has no data directory.
pub fn default_models_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|dir| dir.join("abode").join("models"))
        .unwrap_or_else(|| PathBuf::from("models"))
}

const fn default_port() -> u16 {
    9696
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

const fn default_true() -> bool {
    true
}

const fn default_cache_capacity() -> usize {
    abode_model::DEFAULT_CACHE_CAPACITY
}

const fn default_budget_ceiling() -> f64 {
    400_000.0
}

const fn default_luxury_floor() -> f64 {
    2_000_000.0
}

/// Settings for the REST server and the prediction commands
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    /// Bind address (default: 0.0.0.0)
    #[serde(default = "default_host")]
    pub host: String,
    /// Bind port (default: 9696)
    #[serde(default = "default_port")]
    pub port: u16,
    /// Directory searched for the newest dated model pair
    #[serde(default = "default_models_dir")]
    pub models_dir: PathBuf,
    /// Explicit model artifact, overriding the directory search
    #[serde(default)]
    pub model_path: Option<PathBuf>,
    /// Explicit metadata file, overriding the directory search
    #[serde(default)]
    pub metadata_path: Option<PathBuf>,
    /// Cache repeated predictions (default: true)
    #[serde(default = "default_true")]
    pub enable_caching: bool,
    /// Cached results kept per loaded model (default: 1000)
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,
    /// Upper bound of the budget tier (default: 400 000)
    #[serde(default = "default_budget_ceiling")]
    pub budget_ceiling: f64,
    /// Lower bound of the luxury tier (default: 2 000 000)
    #[serde(default = "default_luxury_floor")]
    pub luxury_floor: f64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            models_dir: default_models_dir(),
            model_path: None,
            metadata_path: None,
            enable_caching: true,
            cache_capacity: default_cache_capacity(),
            budget_ceiling: default_budget_ceiling(),
            luxury_floor: default_luxury_floor(),
        }
    }
}

impl ServiceConfig {
    /// Parse from JSON; missing keys take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_json_str(&json)?;
        tracing::debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    /// Check settings that serde cannot.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.buckets()?;
        if self.enable_caching && self.cache_capacity == 0 {
            return Err(ConfigError::Invalid {
                key: "cache_capacity",
                reason: "must be positive when caching is enabled".to_string(),
            });
        }
        if self.model_path.is_some() != self.metadata_path.is_some() {
            return Err(ConfigError::Invalid {
                key: "model_path",
                reason: "model_path and metadata_path must be given together".to_string(),
            });
        }
        Ok(())
    }

    /// `host:port` for binding.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Category thresholds.
    pub fn buckets(&self) -> Result<PriceBuckets, InvalidBuckets> {
        PriceBuckets::new(self.budget_ceiling, self.luxury_floor)
    }

    /// Options passed to every model load.
    pub fn load_options(&self) -> Result<LoadOptions, ConfigError> {
        Ok(LoadOptions {
            buckets: self.buckets()?,
            cache_capacity: self.enable_caching.then_some(self.cache_capacity),
        })
    }

    /// Artifacts to serve.
    ///
    /// Explicit paths win. Otherwise the newest dated pair in `models_dir`;
    /// when there is none, today's names are returned so the load fails
    /// with a path the operator can act on.
    pub fn model_paths(&self) -> ModelPaths {
        if let (Some(model), Some(metadata)) = (&self.model_path, &self.metadata_path) {
            return ModelPaths {
                model: model.clone(),
                metadata: metadata.clone(),
            };
        }
        match ModelPaths::latest(&self.models_dir) {
            Ok(Some(paths)) => paths,
            Ok(None) => {
                tracing::warn!(dir = %self.models_dir.display(), "no trained model found");
                self.todays_paths()
            }
            Err(e) => {
                tracing::warn!(dir = %self.models_dir.display(), error = %e, "cannot read models directory");
                self.todays_paths()
            }
        }
    }

    fn todays_paths(&self) -> ModelPaths {
        let today = Utc::now().format("%Y%m%d").to_string();
        ModelPaths::dated(&self.models_dir, &today)
    }
}
