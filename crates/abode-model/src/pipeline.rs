//! The fitted model boundary.
//!
//! Inference only needs "table in, one log-scale value per row out", so the
//! artifact sits behind [`PriceModel`]. [`PricePipeline`] is the persisted
//! implementation: column preprocessing followed by boosted trees.

use crate::error::{InferenceError, TrainingError};
use crate::regressor::{BoostedTrees, BoostingConfig};
use abode_encoding::{FeaturePreprocessor, PreprocessorConfig};
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// A fitted model that maps feature rows to raw (transformed-scale) outputs
pub trait PriceModel: Debug + Send + Sync {
    /// Predict one raw value per row of `rows`.
    ///
    /// `rows` carries the expected feature columns; extra columns are ignored.
    fn predict(&self, rows: &DataFrame) -> Result<Vec<f64>, InferenceError>;

    /// Columns the model reads, if it can report them.
    fn input_columns(&self) -> Option<Vec<String>> {
        None
    }
}

/// Preprocessor and regressor fitted together
#[derive(Debug, Serialize, Deserialize)]
pub struct PricePipeline {
    feature_order: Vec<String>,
    preprocessor: FeaturePreprocessor,
    regressor: BoostedTrees,
}

impl PricePipeline {
    /// Fit the preprocessor on `features`, then the trees on its output.
    pub fn fit(
        features: &DataFrame,
        target: &[f64],
        categorical: &[&str],
        numerical: &[&str],
        preprocessing: PreprocessorConfig,
        boosting: BoostingConfig,
    ) -> Result<Self, TrainingError> {
        if features.height() != target.len() {
            return Err(TrainingError::InvalidConfig(format!(
                "{} feature rows but {} targets",
                features.height(),
                target.len()
            )));
        }

        let mut preprocessor = FeaturePreprocessor::new(preprocessing);
        preprocessor.fit(features, categorical, numerical)?;
        let x = preprocessor.transform(features)?;
        let regressor = BoostedTrees::fit(&x, target, boosting)?;

        let feature_order = features
            .get_column_names()
            .into_iter()
            .map(|name| name.to_string())
            .filter(|name| categorical.contains(&name.as_str()) || numerical.contains(&name.as_str()))
            .collect();

        Ok(Self {
            feature_order,
            preprocessor,
            regressor,
        })
    }

    /// Input columns in training order.
    pub fn feature_order(&self) -> &[String] {
        &self.feature_order
    }

    /// The fitted preprocessor.
    pub const fn preprocessor(&self) -> &FeaturePreprocessor {
        &self.preprocessor
    }

    /// The fitted trees.
    pub const fn regressor(&self) -> &BoostedTrees {
        &self.regressor
    }
}

impl PriceModel for PricePipeline {
    fn predict(&self, rows: &DataFrame) -> Result<Vec<f64>, InferenceError> {
        let x = self.preprocessor.transform(rows)?;
        self.regressor.predict(&x)
    }

    fn input_columns(&self) -> Option<Vec<String>> {
        Some(self.feature_order.clone())
    }
}
