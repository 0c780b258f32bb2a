#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/abode/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod artifact;
pub mod buckets;
pub mod cache;
pub mod error;
pub mod handle;
pub mod inference;
pub mod metadata;
pub mod metrics;
pub mod pipeline;
pub mod record;
pub mod regressor;
pub mod training;

// Re-export main types
pub use artifact::{ARTIFACT_FORMAT_VERSION, ModelArtifact};
pub use buckets::{InvalidBuckets, PriceBuckets, PriceCategory};
pub use cache::{CacheKey, CacheStats, DEFAULT_CACHE_CAPACITY, PredictionCache};
pub use error::{
    InferenceError, MissingFeatureError, ModelLoadError, PredictionError, TrainingError,
};
pub use handle::{LoadOptions, LoadedModel, ModelHandle, ModelPaths};
pub use inference::{InferencePipeline, prepare, prepare_batch, validate};
pub use metadata::{
    FeatureSchema, METADATA_SCHEMA_VERSION, ModelInfo, ModelMetadata, Performance,
    PreprocessingInfo, migrate_legacy,
};
pub use metrics::RegressionMetrics;
pub use pipeline::{PriceModel, PricePipeline};
pub use record::{FeatureRecord, FeatureValue};
pub use regressor::{BoostedTrees, BoostingConfig};
pub use training::{TrainingConfig, TrainingOutcome, save_outcome, train};

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
