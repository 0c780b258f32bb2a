//! Prediction response shapes.

use crate::format::{format_currency, round_to};
use abode_model::{ModelMetadata, PriceCategory};
use serde::{Deserialize, Serialize};

/// Headline scores echoed with every prediction
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSummary {
    /// Validation R², 4 decimal places
    pub validation_r2: f64,
    /// Validation RMSE in whole dollars
    pub validation_rmse: f64,
}

impl PerformanceSummary {
    /// Summarize the metadata's validation scores.
    pub fn from_metadata(metadata: &ModelMetadata) -> Self {
        Self {
            validation_r2: round_to(metadata.performance.val_r2, 4),
            validation_rmse: round_to(metadata.performance.val_rmse, 0),
        }
    }
}

/// Response for a single prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResponse {
    /// Price in dollars, 2 decimal places
    pub predicted_price: f64,
    /// Price as a whole-dollar string
    pub price_formatted: String,
    /// Price tier
    pub price_category: PriceCategory,
    /// Model name
    pub model_info: String,
    /// Features the model read, in order
    pub features_used: Vec<String>,
    /// Validation scores
    pub model_performance: PerformanceSummary,
}

impl PredictionResponse {
    /// Build a response for `price`.
    pub fn new(price: f64, category: PriceCategory, metadata: &ModelMetadata) -> Self {
        Self {
            predicted_price: round_to(price, 2),
            price_formatted: format_currency(price),
            price_category: category,
            model_info: metadata.model_info.name.clone(),
            features_used: metadata.expected_features().to_vec(),
            model_performance: PerformanceSummary::from_metadata(metadata),
        }
    }
}

/// One row of a batch result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchPredictionRow {
    /// Zero-based input row
    pub row: usize,
    /// Price in dollars, 2 decimal places
    pub predicted_price: f64,
    /// Price as a whole-dollar string
    pub price_formatted: String,
    /// Price tier
    pub price_category: PriceCategory,
}

impl BatchPredictionRow {
    /// Build a row for `price`.
    pub fn new(row: usize, price: f64, category: PriceCategory) -> Self {
        Self {
            row,
            predicted_price: round_to(price, 2),
            price_formatted: format_currency(price),
            price_category: category,
        }
    }

    /// Rows for a batch of prices, categorized with `categorize`.
    pub fn from_prices<F>(prices: &[f64], categorize: F) -> Vec<Self>
    where
        F: Fn(f64) -> PriceCategory,
    {
        prices
            .iter()
            .enumerate()
            .map(|(row, &price)| Self::new(row, price, categorize(price)))
            .collect()
    }
}
