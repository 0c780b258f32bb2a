//! Column preprocessor
//!
//! Routes each input column to an encoder and concatenates the results into
//! one dense feature matrix:
//!
//! | block | columns | encoder |
//! |-------|---------|---------|
//! | 1 | categoricals with more than `high_cardinality_threshold` distinct values | [`FrequencyEncoder`] |
//! | 2 | remaining categoricals | [`OneHotEncoder`] |
//! | 3 | numeric columns | [`StandardScaler`] |
//!
//! Columns not named at fit time are dropped.

use crate::column::string_values;
use crate::error::{EncodingError, Result};
use crate::frequency::{FrequencyEncoder, UnknownPolicy};
use crate::onehot::OneHotEncoder;
use crate::scaler::StandardScaler;
use ndarray::{Array2, Axis, concatenate};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Configuration for the column preprocessor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreprocessorConfig {
    /// Categoricals with more distinct values than this are frequency encoded
    pub high_cardinality_threshold: usize,
    /// Policy for categories unseen by the frequency encoder
    pub unknown_policy: UnknownPolicy,
}

impl Default for PreprocessorConfig {
    fn default() -> Self {
        Self {
            high_cardinality_threshold: 50,
            unknown_policy: UnknownPolicy::Zero,
        }
    }
}

/// Which encoder each column was routed to
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnPlan {
    /// Frequency-encoded categoricals
    pub high_cardinality: Vec<String>,
    /// One-hot encoded categoricals
    pub low_cardinality: Vec<String>,
    /// Scaled numeric columns
    pub numerical: Vec<String>,
}

/// Fitted combination of frequency, one-hot and scaling transforms
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeaturePreprocessor {
    config: PreprocessorConfig,
    plan: Option<ColumnPlan>,
    frequency: FrequencyEncoder,
    one_hot: OneHotEncoder,
    scaler: StandardScaler,
}

impl FeaturePreprocessor {
    /// Create an unfitted preprocessor.
    pub const fn new(config: PreprocessorConfig) -> Self {
        Self {
            config,
            plan: None,
            frequency: FrequencyEncoder::new(config.unknown_policy),
            one_hot: OneHotEncoder::new(),
            scaler: StandardScaler::new(),
        }
    }

    /// Preprocessor configuration.
    pub const fn config(&self) -> &PreprocessorConfig {
        &self.config
    }

    /// Column routing, available once fitted.
    pub const fn plan(&self) -> Option<&ColumnPlan> {
        self.plan.as_ref()
    }

    /// The fitted frequency encoder.
    pub const fn frequency_encoder(&self) -> &FrequencyEncoder {
        &self.frequency
    }

    /// Split categoricals by cardinality and fit every encoder.
    pub fn fit(
        &mut self,
        data: &DataFrame,
        categorical: &[&str],
        numerical: &[&str],
    ) -> Result<&mut Self> {
        let mut plan = ColumnPlan {
            numerical: numerical.iter().map(|c| c.to_string()).collect(),
            ..ColumnPlan::default()
        };

        for &column in categorical {
            let distinct: HashSet<String> =
                string_values(data, column)?.into_iter().flatten().collect();
            if distinct.len() > self.config.high_cardinality_threshold {
                plan.high_cardinality.push(column.to_string());
            } else {
                plan.low_cardinality.push(column.to_string());
            }
        }

        tracing::info!(
            high = ?plan.high_cardinality,
            low = ?plan.low_cardinality,
            numerical = ?plan.numerical,
            "column routing"
        );

        let high: Vec<&str> = plan.high_cardinality.iter().map(String::as_str).collect();
        let low: Vec<&str> = plan.low_cardinality.iter().map(String::as_str).collect();

        self.frequency = FrequencyEncoder::new(self.config.unknown_policy);
        self.frequency.fit(data, &high)?;
        self.one_hot.fit(data, &low)?;
        self.scaler.fit(data, numerical)?;
        self.plan = Some(plan);
        Ok(self)
    }

    /// Number of columns in the transformed matrix.
    pub fn output_width(&self) -> usize {
        self.frequency.tables().len() + self.one_hot.output_width() + self.scaler.output_width()
    }

    /// Names of the transformed columns.
    pub fn output_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .frequency
            .tables()
            .iter()
            .map(|t| format!("{}_frequency", t.column()))
            .collect();
        names.extend(self.one_hot.feature_names());
        if let Some(plan) = &self.plan {
            names.extend(plan.numerical.iter().map(|c| format!("{c}_scaled")));
        }
        names
    }

    /// Encode a frame into the model's dense input matrix.
    pub fn transform(&self, data: &DataFrame) -> Result<Array2<f64>> {
        let plan = self.plan.as_ref().ok_or(EncodingError::NotFitted {
            encoder: "FeaturePreprocessor",
        })?;

        // Frequency block follows the plan order, not the input order
        let frequency = if plan.high_cardinality.is_empty() {
            Array2::<f64>::zeros((data.height(), 0))
        } else {
            let high: Vec<&str> = plan.high_cardinality.iter().map(String::as_str).collect();
            self.frequency.transform(&data.select(high)?)?
        };
        let one_hot = self.one_hot.transform(data)?;
        let scaled = self.scaler.transform(data)?;

        Ok(concatenate(
            Axis(1),
            &[frequency.view(), one_hot.view(), scaled.view()],
        )?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listings(brokers: usize) -> DataFrame {
        let n = 12;
        let broker: Vec<String> = (0..n).map(|i| format!("Broker {}", i % brokers)).collect();
        let kind: Vec<&str> = (0..n)
            .map(|i| if i % 2 == 0 { "Condo for sale" } else { "House for sale" })
            .collect();
        let beds: Vec<i64> = (0..n as i64).map(|i| 1 + i % 4).collect();
        let sqft: Vec<f64> = (0..n).map(|i| 600.0 + 100.0 * i as f64).collect();
        DataFrame::new(vec![
            Series::new("brokertitle".into(), broker).into(),
            Series::new("type".into(), kind).into(),
            Series::new("beds".into(), beds).into(),
            Series::new("propertysqft".into(), sqft).into(),
        ])
        .unwrap()
    }

    fn config(threshold: usize) -> PreprocessorConfig {
        PreprocessorConfig {
            high_cardinality_threshold: threshold,
            unknown_policy: UnknownPolicy::Zero,
        }
    }

    #[test]
    fn test_routes_by_cardinality() {
        let df = listings(6);
        let mut pre = FeaturePreprocessor::new(config(3));
        pre.fit(&df, &["brokertitle", "type"], &["beds", "propertysqft"])
            .unwrap();

        let plan = pre.plan().unwrap();
        assert_eq!(plan.high_cardinality, vec!["brokertitle"]);
        assert_eq!(plan.low_cardinality, vec!["type"]);
        assert_eq!(plan.numerical, vec!["beds", "propertysqft"]);

        // 1 frequency + 1 one-hot (2 types, first dropped) + 2 scaled
        assert_eq!(pre.output_width(), 4);
        assert_eq!(
            pre.output_names(),
            vec![
                "brokertitle_frequency",
                "type_House for sale",
                "beds_scaled",
                "propertysqft_scaled"
            ]
        );
    }

    #[test]
    fn test_transform_shape_and_frequency_block() {
        let df = listings(6);
        let mut pre = FeaturePreprocessor::new(config(3));
        pre.fit(&df, &["brokertitle", "type"], &["beds", "propertysqft"])
            .unwrap();

        let x = pre.transform(&df).unwrap();
        assert_eq!(x.dim(), (12, 4));
        // Each of 6 brokers appears twice
        assert!(x.column(0).iter().all(|&v| v == 2.0));
    }

    #[test]
    fn test_default_threshold_keeps_low_cardinality() {
        let df = listings(6);
        let mut pre = FeaturePreprocessor::default();
        pre.fit(&df, &["brokertitle", "type"], &["beds"]).unwrap();

        assert!(pre.plan().unwrap().high_cardinality.is_empty());
        assert_eq!(pre.frequency_encoder().tables().len(), 0);
        assert_eq!(pre.transform(&df).unwrap().ncols(), 5 + 1 + 1);
    }

    #[test]
    fn test_unfitted_transform_fails() {
        let pre = FeaturePreprocessor::new(PreprocessorConfig::default());
        assert!(pre.transform(&listings(2)).is_err());
    }
}
