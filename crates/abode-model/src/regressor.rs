//! Gradient-boosted regression trees.
//!
//! Thin wrapper over the `gbdt` crate that speaks `ndarray` matrices and
//! `f64`, and refuses inputs whose width differs from the training matrix
//! instead of letting the tree walk index out of bounds.
//!
//! Trees are fitted to the target minus its mean; the mean is stored and
//! added back at prediction time.

use crate::error::{InferenceError, TrainingError};
use gbdt::config::Config;
use gbdt::decision_tree::{Data, DataVec};
use gbdt::gradient_boost::GBDT;
use ndarray::{Array2, ArrayView1};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Boosting hyperparameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoostingConfig {
    /// Number of trees (default: 50)
    pub n_estimators: usize,
    /// Maximum tree depth (default: 6)
    pub max_depth: u32,
    /// Shrinkage applied to each tree (default: 0.1)
    pub learning_rate: f64,
    /// Minimum rows per leaf (default: 1)
    pub min_leaf_size: usize,
    /// Row subsampling ratio per tree (default: 1.0)
    pub subsample: f64,
}

impl Default for BoostingConfig {
    fn default() -> Self {
        Self {
            n_estimators: 50,
            max_depth: 6,
            learning_rate: 0.1,
            min_leaf_size: 1,
            subsample: 1.0,
        }
    }
}

impl BoostingConfig {
    /// Reject values the booster cannot train with.
    pub fn validate(&self) -> Result<(), TrainingError> {
        if self.n_estimators == 0 {
            return Err(TrainingError::InvalidConfig(
                "n_estimators must be positive".to_string(),
            ));
        }
        if self.max_depth == 0 {
            return Err(TrainingError::InvalidConfig(
                "max_depth must be positive".to_string(),
            ));
        }
        if !(self.learning_rate > 0.0 && self.learning_rate <= 1.0) {
            return Err(TrainingError::InvalidConfig(format!(
                "learning_rate must be in (0, 1], got {}",
                self.learning_rate
            )));
        }
        if !(self.subsample > 0.0 && self.subsample <= 1.0) {
            return Err(TrainingError::InvalidConfig(format!(
                "subsample must be in (0, 1], got {}",
                self.subsample
            )));
        }
        Ok(())
    }

    fn to_gbdt(self, n_features: usize) -> Config {
        let mut cfg = Config::new();
        cfg.set_feature_size(n_features);
        cfg.set_max_depth(self.max_depth as _);
        cfg.set_iterations(self.n_estimators);
        cfg.set_shrinkage(self.learning_rate as _);
        cfg.set_min_leaf_size(self.min_leaf_size);
        cfg.set_data_sample_ratio(self.subsample);
        cfg.set_feature_sample_ratio(1.0);
        cfg.set_loss("SquaredError");
        cfg.set_debug(false);
        cfg
    }
}

/// A fitted boosted-tree regressor
#[derive(Serialize, Deserialize)]
pub struct BoostedTrees {
    config: BoostingConfig,
    n_features: usize,
    base_score: f64,
    model: GBDT,
}

impl fmt::Debug for BoostedTrees {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoostedTrees")
            .field("config", &self.config)
            .field("n_features", &self.n_features)
            .field("base_score", &self.base_score)
            .finish_non_exhaustive()
    }
}

impl BoostedTrees {
    /// Fit trees to `x` (one row per sample) against `y`.
    pub fn fit(x: &Array2<f64>, y: &[f64], config: BoostingConfig) -> Result<Self, TrainingError> {
        config.validate()?;
        if x.nrows() != y.len() {
            return Err(TrainingError::InvalidConfig(format!(
                "feature matrix has {} rows but target has {}",
                x.nrows(),
                y.len()
            )));
        }
        if x.nrows() < 2 {
            return Err(TrainingError::InsufficientData {
                required: 2,
                actual: x.nrows(),
            });
        }

        let n_features = x.ncols();
        let base_score = y.iter().sum::<f64>() / y.len() as f64;
        let mut data: DataVec = x
            .rows()
            .into_iter()
            .zip(y)
            .map(|(row, &label)| {
                Data::new_training_data(to_f32(row), 1.0, (label - base_score) as f32, None)
            })
            .collect();

        let mut model = GBDT::new(&config.to_gbdt(n_features));
        model.fit(&mut data);
        tracing::debug!(
            rows = x.nrows(),
            n_features,
            trees = config.n_estimators,
            "fitted boosted trees"
        );

        Ok(Self {
            config,
            n_features,
            base_score,
            model,
        })
    }

    /// Hyperparameters used for fitting.
    pub const fn config(&self) -> &BoostingConfig {
        &self.config
    }

    /// Width of the training matrix.
    pub const fn n_features(&self) -> usize {
        self.n_features
    }

    /// Predict one value per row of `x`.
    pub fn predict(&self, x: &Array2<f64>) -> Result<Vec<f64>, InferenceError> {
        if x.ncols() != self.n_features {
            return Err(InferenceError::ShapeMismatch {
                expected: self.n_features,
                actual: x.ncols(),
            });
        }
        if x.nrows() == 0 {
            return Ok(Vec::new());
        }

        let data: DataVec = x
            .rows()
            .into_iter()
            .map(|row| Data::new_test_data(to_f32(row), None))
            .collect();
        let raw = self.model.predict(&data);
        if raw.len() != x.nrows() {
            return Err(InferenceError::RowCountMismatch {
                expected: x.nrows(),
                actual: raw.len(),
            });
        }
        Ok(raw
            .into_iter()
            .map(|v| self.base_score + f64::from(v))
            .collect())
    }
}

fn to_f32(row: ArrayView1<'_, f64>) -> Vec<f32> {
    row.iter().map(|&v| v as f32).collect()
}
