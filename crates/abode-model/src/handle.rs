//! Shared model handle.
//!
//! The model and its metadata are loaded together into a [`LoadedModel`].
//! [`ModelHandle`] holds the current one behind a lock that is only taken
//! long enough to clone or replace an `Arc`, so a reload never blocks
//! in-flight predictions: they finish against the model they started with.

use crate::artifact::ModelArtifact;
use crate::buckets::PriceBuckets;
use crate::cache::{CacheKey, CacheStats, DEFAULT_CACHE_CAPACITY, PredictionCache};
use crate::error::{ModelLoadError, PredictionError};
use crate::inference::InferencePipeline;
use crate::metadata::ModelMetadata;
use crate::pipeline::PriceModel;
use crate::record::FeatureRecord;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Where the artifacts live
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelPaths {
    /// Model artifact JSON
    pub model: PathBuf,
    /// Metadata JSON
    pub metadata: PathBuf,
}

impl ModelPaths {
    /// Artifact names written by training for `date` (`YYYYMMDD`).
    pub fn dated(dir: impl AsRef<Path>, date: &str) -> Self {
        let dir = dir.as_ref();
        Self {
            model: dir.join(format!("best_model_gbdt_freq_{date}.json")),
            metadata: dir.join(format!("model_metadata_gbdt_freq_{date}.json")),
        }
    }

    /// Most recent dated pair in `dir`, if any.
    ///
    /// Dates sort lexically, so the greatest file name is the newest.
    pub fn latest(dir: impl AsRef<Path>) -> std::io::Result<Option<Self>> {
        let dir = dir.as_ref();
        let mut dates: Vec<String> = std::fs::read_dir(dir)?
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| {
                let name = entry.file_name().into_string().ok()?;
                let date = name
                    .strip_prefix("best_model_gbdt_freq_")?
                    .strip_suffix(".json")?;
                Some(date.to_string())
            })
            .collect();
        dates.sort();

        Ok(dates
            .into_iter()
            .rev()
            .map(|date| Self::dated(dir, &date))
            .find(|paths| paths.metadata.exists()))
    }
}

/// Options applied to every load
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoadOptions {
    /// Category thresholds
    pub buckets: PriceBuckets,
    /// Prediction cache size; `None` disables caching
    pub cache_capacity: Option<usize>,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            buckets: PriceBuckets::default(),
            cache_capacity: Some(DEFAULT_CACHE_CAPACITY),
        }
    }
}

/// A model, its metadata and its private cache
#[derive(Debug)]
pub struct LoadedModel {
    pipeline: InferencePipeline,
    metadata: ModelMetadata,
    cache: Option<PredictionCache>,
    loaded_at: DateTime<Utc>,
    generation: u64,
}

impl LoadedModel {
    /// Read and cross-check both artifacts.
    pub fn load(paths: &ModelPaths, options: LoadOptions) -> Result<Self, ModelLoadError> {
        let metadata = ModelMetadata::load(&paths.metadata)?;
        let artifact = ModelArtifact::load(&paths.model)?;
        Self::from_parts(Arc::new(artifact.into_pipeline()), metadata, options)
    }

    /// Assemble from an in-memory model.
    pub fn from_parts(
        model: Arc<dyn PriceModel>,
        metadata: ModelMetadata,
        options: LoadOptions,
    ) -> Result<Self, ModelLoadError> {
        let pipeline = InferencePipeline::new(model, &metadata, options.buckets)?;
        Ok(Self {
            pipeline,
            metadata,
            cache: options.cache_capacity.map(PredictionCache::new),
            loaded_at: Utc::now(),
            generation: 0,
        })
    }

    /// The inference pipeline.
    pub const fn pipeline(&self) -> &InferencePipeline {
        &self.pipeline
    }

    /// The metadata record.
    pub const fn metadata(&self) -> &ModelMetadata {
        &self.metadata
    }

    /// When this model was loaded.
    pub const fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }

    /// Reload counter at the time this model was installed.
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// Cache counters, if caching is on.
    pub fn cache_stats(&self) -> Option<CacheStats> {
        self.cache.as_ref().map(PredictionCache::stats)
    }

    /// Predict one record, consulting the cache first.
    pub fn predict(&self, record: &FeatureRecord) -> Result<f64, PredictionError> {
        let Some(cache) = &self.cache else {
            return self.pipeline.predict(record);
        };
        self.pipeline.validate(record)?;
        let key = CacheKey::new(record, self.pipeline.expected_features());
        if let Some(price) = cache.get(&key) {
            return Ok(price);
        }
        let price = self.pipeline.predict(record)?;
        cache.insert(key, price);
        Ok(price)
    }
}

/// Current model plus the outcome of the last load attempt
#[derive(Debug)]
pub struct ModelHandle {
    paths: ModelPaths,
    options: LoadOptions,
    current: RwLock<Option<Arc<LoadedModel>>>,
    last_error: RwLock<Option<String>>,
    generation: AtomicU64,
}

impl ModelHandle {
    /// Try to load; a failure is recorded rather than returned so a server
    /// can start and report itself unhealthy.
    pub fn open(paths: ModelPaths, options: LoadOptions) -> Self {
        let handle = Self {
            paths,
            options,
            current: RwLock::new(None),
            last_error: RwLock::new(None),
            generation: AtomicU64::new(0),
        };
        if let Err(e) = handle.reload() {
            tracing::error!(error = %e, "model failed to load");
        }
        handle
    }

    /// Handle around an already-loaded model.
    pub fn from_loaded(paths: ModelPaths, options: LoadOptions, model: LoadedModel) -> Self {
        Self {
            paths,
            options,
            current: RwLock::new(Some(Arc::new(model))),
            last_error: RwLock::new(None),
            generation: AtomicU64::new(0),
        }
    }

    /// Artifact locations.
    pub const fn paths(&self) -> &ModelPaths {
        &self.paths
    }

    /// The model in service, if any.
    pub fn current(&self) -> Option<Arc<LoadedModel>> {
        self.current.read().clone()
    }

    /// Error from the most recent failed load.
    pub fn last_error(&self) -> Option<String> {
        self.last_error.read().clone()
    }

    /// Load from disk and swap in. On failure the previous model stays.
    pub fn reload(&self) -> Result<Arc<LoadedModel>, ModelLoadError> {
        match LoadedModel::load(&self.paths, self.options) {
            Ok(model) => Ok(self.install(model)),
            Err(e) => {
                *self.last_error.write() = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Number and swap in a model. The generation is taken under the write
    /// lock so the installed model always carries the highest number.
    fn install(&self, mut model: LoadedModel) -> Arc<LoadedModel> {
        let mut current = self.current.write();
        model.generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let model = Arc::new(model);
        *current = Some(Arc::clone(&model));
        drop(current);

        *self.last_error.write() = None;
        tracing::info!(
            name = %model.metadata().model_info.name,
            generation = model.generation(),
            "model installed"
        );
        model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::tests::{FormulaModel, scenario};
    use crate::metadata::tests::sample_metadata;

    fn loaded(cache_capacity: Option<usize>) -> LoadedModel {
        let options = LoadOptions {
            cache_capacity,
            ..LoadOptions::default()
        };
        LoadedModel::from_parts(Arc::new(FormulaModel), sample_metadata(), options).unwrap()
    }

    #[test]
    fn test_cached_prediction_matches_uncached() {
        let cached = loaded(Some(10));
        let plain = loaded(None);

        let first = cached.predict(&scenario()).unwrap();
        let second = cached.predict(&scenario()).unwrap();
        assert_eq!(first, second);
        assert_eq!(first, plain.predict(&scenario()).unwrap());

        let stats = cached.cache_stats().unwrap();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert!(plain.cache_stats().is_none());
    }

    #[test]
    fn test_cache_does_not_hide_missing_features() {
        let model = loaded(Some(10));
        let incomplete = FeatureRecord::new().with("beds", 2);
        assert!(matches!(
            model.predict(&incomplete),
            Err(PredictionError::MissingFeatures(_))
        ));
    }

    #[test]
    fn test_open_missing_artifacts_is_unhealthy_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let handle = ModelHandle::open(ModelPaths::dated(dir.path(), "20250101"), LoadOptions::default());
        assert!(handle.current().is_none());
        assert!(handle.last_error().is_some());
    }

    #[test]
    fn test_failed_reload_keeps_current_model() {
        let dir = tempfile::tempdir().unwrap();
        let handle = ModelHandle::from_loaded(
            ModelPaths::dated(dir.path(), "20250101"),
            LoadOptions::default(),
            loaded(None),
        );
        assert!(handle.reload().is_err());
        assert!(handle.current().is_some());
        assert!(handle.last_error().is_some());
    }

    #[test]
    fn test_concurrent_installs_leave_newest_generation() {
        let dir = tempfile::tempdir().unwrap();
        let handle = Arc::new(ModelHandle::from_loaded(
            ModelPaths::dated(dir.path(), "20250101"),
            LoadOptions::default(),
            loaded(None),
        ));

        let workers: Vec<_> = (0..8)
            .map(|_| {
                let handle = Arc::clone(&handle);
                std::thread::spawn(move || handle.install(loaded(None)).generation())
            })
            .collect();
        let mut generations: Vec<u64> = workers.into_iter().map(|w| w.join().unwrap()).collect();
        generations.sort_unstable();

        assert_eq!(generations, (1..=8).collect::<Vec<u64>>());
        assert_eq!(handle.current().unwrap().generation(), 8);
    }

    #[test]
    fn test_latest_picks_newest_complete_pair() {
        let dir = tempfile::tempdir().unwrap();
        for date in ["20240101", "20250101", "20260101"] {
            let paths = ModelPaths::dated(dir.path(), date);
            std::fs::write(&paths.model, "{}").unwrap();
            // The newest model has no metadata and must be skipped
            if date != "20260101" {
                std::fs::write(&paths.metadata, "{}").unwrap();
            }
        }
        let latest = ModelPaths::latest(dir.path()).unwrap().unwrap();
        assert_eq!(latest, ModelPaths::dated(dir.path(), "20250101"));
    }
}
