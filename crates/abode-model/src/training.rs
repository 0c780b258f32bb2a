//! Model training.
//!
//! Fits the preprocessor and boosted trees on `ln(1 + price)`, scores the
//! fit with k-fold cross-validation on the log scale, then evaluates on the
//! held-out sets in dollars.

use crate::artifact::ModelArtifact;
use crate::error::TrainingError;
use crate::handle::ModelPaths;
use crate::metadata::{
    FeatureSchema, METADATA_SCHEMA_VERSION, ModelInfo, ModelMetadata, Performance,
    PreprocessingInfo,
};
use crate::metrics::{RegressionMetrics, mean_std, r2_score};
use crate::pipeline::{PriceModel, PricePipeline};
use crate::regressor::BoostingConfig;
use abode_data::{CATEGORICAL_FEATURES, DatasetSplit, Listing, NUMERICAL_FEATURES, TARGET_COLUMN};
use abode_encoding::PreprocessorConfig;
use chrono::{DateTime, Utc};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Training configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingConfig {
    /// Column routing and unknown-category policy
    pub preprocessing: PreprocessorConfig,
    /// Tree hyperparameters
    pub boosting: BoostingConfig,
    /// Cross-validation folds (default: 5)
    pub cv_folds: usize,
    /// Fold shuffling seed (default: 42)
    pub seed: u64,
    /// Fit on `ln(1 + price)` (default: true)
    pub use_log_target: bool,
    /// Name recorded in metadata
    pub model_name: String,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            preprocessing: PreprocessorConfig::default(),
            boosting: BoostingConfig::default(),
            cv_folds: 5,
            seed: 42,
            use_log_target: true,
            model_name: "Gradient Boosted Trees with Frequency Encoding".to_string(),
        }
    }
}

impl TrainingConfig {
    fn target(&self, listings: &[Listing]) -> Vec<f64> {
        let prices = Listing::prices(listings);
        if self.use_log_target {
            prices.into_iter().map(f64::ln_1p).collect()
        } else {
            prices
        }
    }
}

/// Fitted pipeline with its metadata and fold scores
#[derive(Debug)]
pub struct TrainingOutcome {
    /// The fitted pipeline
    pub pipeline: PricePipeline,
    /// Metadata describing it
    pub metadata: ModelMetadata,
    /// R² per cross-validation fold
    pub cv_scores: Vec<f64>,
    /// Held-out validation scores
    pub validation: RegressionMetrics,
    /// Held-out test scores
    pub test: RegressionMetrics,
}

/// Shuffle `0..n` and deal it into `k` folds whose sizes differ by at most one.
pub fn kfold_indices(n: usize, k: usize, seed: u64) -> Vec<Vec<usize>> {
    let mut indices: Vec<usize> = (0..n).collect();
    indices.shuffle(&mut StdRng::seed_from_u64(seed));

    let k = k.max(1);
    let base = n / k;
    let extra = n % k;
    let mut folds = Vec::with_capacity(k);
    let mut start = 0;
    for fold in 0..k {
        let len = base + usize::from(fold < extra);
        folds.push(indices[start..start + len].to_vec());
        start += len;
    }
    folds
}

/// Fit a pipeline on `listings`.
pub fn fit_pipeline(
    listings: &[Listing],
    config: &TrainingConfig,
) -> Result<PricePipeline, TrainingError> {
    let features = Listing::features_frame(listings)?;
    PricePipeline::fit(
        &features,
        &config.target(listings),
        &CATEGORICAL_FEATURES,
        &NUMERICAL_FEATURES,
        config.preprocessing,
        config.boosting,
    )
}

/// Score a pipeline on listings, in dollars.
pub fn evaluate(
    pipeline: &PricePipeline,
    listings: &[Listing],
    use_log_target: bool,
) -> Result<RegressionMetrics, TrainingError> {
    let features = Listing::features_frame(listings)?;
    let raw = pipeline.predict(&features)?;
    let predicted: Vec<f64> = if use_log_target {
        raw.into_iter().map(f64::exp_m1).collect()
    } else {
        raw
    };
    RegressionMetrics::compute(&Listing::prices(listings), &predicted)
}

/// K-fold R² on the training target scale.
///
/// `on_fold` is called after each fold with `(completed, total)`.
pub fn cross_validate<F>(
    listings: &[Listing],
    config: &TrainingConfig,
    mut on_fold: F,
) -> Result<Vec<f64>, TrainingError>
where
    F: FnMut(usize, usize),
{
    let k = config.cv_folds;
    if k < 2 {
        return Err(TrainingError::InvalidConfig(format!(
            "cv_folds must be at least 2, got {k}"
        )));
    }
    if listings.len() < 2 * k {
        return Err(TrainingError::InsufficientData {
            required: 2 * k,
            actual: listings.len(),
        });
    }

    let folds = kfold_indices(listings.len(), k, config.seed);
    let mut scores = Vec::with_capacity(k);
    for (i, held) in folds.iter().enumerate() {
        let mut in_fold = vec![false; listings.len()];
        for &idx in held {
            in_fold[idx] = true;
        }
        let mut train = Vec::with_capacity(listings.len() - held.len());
        let mut test = Vec::with_capacity(held.len());
        for (listing, &flag) in listings.iter().zip(&in_fold) {
            if flag {
                test.push(listing.clone());
            } else {
                train.push(listing.clone());
            }
        }

        let pipeline = fit_pipeline(&train, config)?;
        let predicted = pipeline.predict(&Listing::features_frame(&test)?)?;
        let score = r2_score(&config.target(&test), &predicted);
        tracing::debug!(fold = i + 1, r2 = score, "cross-validation fold");
        scores.push(score);
        on_fold(i + 1, k);
    }
    Ok(scores)
}

/// Cross-validate, fit on the training split and evaluate on the holdouts.
pub fn train<F>(
    split: &DatasetSplit,
    config: &TrainingConfig,
    on_fold: F,
) -> Result<TrainingOutcome, TrainingError>
where
    F: FnMut(usize, usize),
{
    if split.validation.is_empty() || split.test.is_empty() {
        return Err(TrainingError::InsufficientData {
            required: 1,
            actual: 0,
        });
    }

    let cv_scores = cross_validate(&split.train, config, on_fold)?;
    let (cv_mean, cv_std) = mean_std(&cv_scores);
    tracing::info!(cv_mean, cv_std, "cross-validation complete");

    let pipeline = fit_pipeline(&split.train, config)?;
    let validation = evaluate(&pipeline, &split.validation, config.use_log_target)?;
    let test = evaluate(&pipeline, &split.test, config.use_log_target)?;
    tracing::info!(
        val_r2 = validation.r2,
        val_rmse = validation.rmse,
        test_r2 = test.r2,
        "evaluation complete"
    );

    let metadata = build_metadata(&pipeline, config, cv_mean, cv_std, validation, test, Utc::now());
    Ok(TrainingOutcome {
        pipeline,
        metadata,
        cv_scores,
        validation,
        test,
    })
}

fn build_metadata(
    pipeline: &PricePipeline,
    config: &TrainingConfig,
    cv_mean: f64,
    cv_std: f64,
    validation: RegressionMetrics,
    test: RegressionMetrics,
    created: DateTime<Utc>,
) -> ModelMetadata {
    let feature_list = pipeline.feature_order().to_vec();
    let typed = |names: &[&str]| -> Vec<String> {
        feature_list
            .iter()
            .filter(|f| names.contains(&f.as_str()))
            .cloned()
            .collect()
    };

    ModelMetadata {
        schema_version: METADATA_SCHEMA_VERSION,
        model_info: ModelInfo {
            name: config.model_name.clone(),
            model_type: "BoostedTrees".to_string(),
            target: TARGET_COLUMN.to_string(),
            created_timestamp: created,
            framework: "gbdt".to_string(),
        },
        features: FeatureSchema {
            categorical: typed(&CATEGORICAL_FEATURES),
            numerical: typed(&NUMERICAL_FEATURES),
            feature_list,
        },
        preprocessing: PreprocessingInfo {
            use_log_target: config.use_log_target,
            high_cardinality_threshold: config.preprocessing.high_cardinality_threshold,
            unknown_policy: config.preprocessing.unknown_policy,
            ..PreprocessingInfo::default()
        },
        performance: Performance {
            cv_r2_mean: Some(cv_mean),
            cv_r2_std: Some(cv_std),
            val_r2: validation.r2,
            val_rmse: validation.rmse,
            val_mae: validation.mae,
            test_r2: Some(test.r2),
            test_rmse: Some(test.rmse),
            test_mae: Some(test.mae),
        },
    }
}

/// Write the model and metadata into `dir`, named by creation date.
pub fn save_outcome(
    outcome: &TrainingOutcome,
    dir: impl AsRef<Path>,
) -> Result<ModelPaths, TrainingError> {
    let dir = dir.as_ref();
    std::fs::create_dir_all(dir)?;
    let date = outcome
        .metadata
        .model_info
        .created_timestamp
        .format("%Y%m%d")
        .to_string();
    let paths = ModelPaths::dated(dir, &date);

    ModelArtifact::write(&outcome.pipeline, &paths.model)?;
    outcome.metadata.save(&paths.metadata)?;

    tracing::info!(
        model = %paths.model.display(),
        metadata = %paths.metadata.display(),
        "saved model"
    );
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(10, 5)]
    #[case(12, 5)]
    #[case(3, 5)]
    fn test_kfold_covers_every_index_once(#[case] n: usize, #[case] k: usize) {
        let folds = kfold_indices(n, k, 42);
        assert_eq!(folds.len(), k);

        let mut all: Vec<usize> = folds.iter().flatten().copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..n).collect::<Vec<_>>());

        let sizes: Vec<usize> = folds.iter().map(Vec::len).collect();
        let spread = sizes.iter().max().unwrap() - sizes.iter().min().unwrap();
        assert!(spread <= 1);
    }

    #[test]
    fn test_kfold_is_seeded() {
        assert_eq!(kfold_indices(50, 5, 42), kfold_indices(50, 5, 42));
        assert_ne!(kfold_indices(50, 5, 42), kfold_indices(50, 5, 43));
    }

    #[test]
    fn test_cross_validate_rejects_tiny_inputs() {
        let config = TrainingConfig::default();
        assert!(matches!(
            cross_validate(&[], &config, |_, _| {}),
            Err(TrainingError::InsufficientData { .. })
        ));
        let one_fold = TrainingConfig {
            cv_folds: 1,
            ..TrainingConfig::default()
        };
        assert!(matches!(
            cross_validate(&[], &one_fold, |_, _| {}),
            Err(TrainingError::InvalidConfig(_))
        ));
    }
}
