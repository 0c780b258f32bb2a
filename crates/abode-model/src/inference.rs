//! Record validation, preparation and prediction.

use crate::buckets::{PriceBuckets, PriceCategory};
use crate::error::{InferenceError, MissingFeatureError, ModelLoadError, PredictionError};
use crate::metadata::ModelMetadata;
use crate::pipeline::PriceModel;
use crate::record::{FeatureRecord, FeatureValue};
use polars::prelude::*;
use std::sync::Arc;

/// Check that every expected feature is present.
///
/// Values are not type checked here; a bad value surfaces as an
/// [`InferenceError`] when the model reads it.
pub fn validate(record: &FeatureRecord, expected: &[String]) -> Result<(), MissingFeatureError> {
    let missing: Vec<String> = expected
        .iter()
        .filter(|name| !record.contains(name))
        .cloned()
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(MissingFeatureError { missing, row: None })
    }
}

/// Validate and reorder one record into a single-row frame.
pub fn prepare(record: &FeatureRecord, expected: &[String]) -> Result<DataFrame, PredictionError> {
    validate(record, expected)?;
    Ok(build_frame(std::slice::from_ref(record), expected)?)
}

/// Validate and reorder records into one frame, row order preserved.
pub fn prepare_batch(
    records: &[FeatureRecord],
    expected: &[String],
) -> Result<DataFrame, PredictionError> {
    for (row, record) in records.iter().enumerate() {
        validate(record, expected).map_err(|e| MissingFeatureError {
            row: Some(row),
            ..e
        })?;
    }
    Ok(build_frame(records, expected)?)
}

/// One column per expected feature. A column holding any text becomes a
/// string column; otherwise it is Float64. Numbers in a string column are
/// rendered the same way `string_values` renders a Float64 column, so the
/// encoders see one spelling either way.
fn build_frame(records: &[FeatureRecord], expected: &[String]) -> Result<DataFrame, InferenceError> {
    let columns: Vec<Column> = expected
        .iter()
        .map(|name| {
            let values: Vec<Option<&FeatureValue>> =
                records.iter().map(|r| r.get(name)).collect();
            let textual = values
                .iter()
                .any(|v| matches!(v, Some(FeatureValue::Text(_))));
            let series = if textual {
                let text: Vec<Option<String>> = values
                    .iter()
                    .map(|v| v.and_then(FeatureValue::as_text))
                    .collect();
                Series::new(name.as_str().into(), text)
            } else {
                let numbers: Vec<Option<f64>> = values
                    .iter()
                    .map(|v| v.and_then(FeatureValue::as_f64))
                    .collect();
                Series::new(name.as_str().into(), numbers)
            };
            series.into()
        })
        .collect();
    Ok(DataFrame::new(columns)?)
}

/// A loaded model plus everything needed to turn its output into a price
#[derive(Debug, Clone)]
pub struct InferencePipeline {
    model: Arc<dyn PriceModel>,
    expected: Vec<String>,
    use_log_target: bool,
    buckets: PriceBuckets,
}

impl InferencePipeline {
    /// Pair a model with its metadata.
    ///
    /// Fails if the model reads a column the metadata does not list.
    pub fn new(
        model: Arc<dyn PriceModel>,
        metadata: &ModelMetadata,
        buckets: PriceBuckets,
    ) -> Result<Self, ModelLoadError> {
        let expected = metadata.expected_features().to_vec();
        if let Some(columns) = model.input_columns() {
            let unlisted: Vec<&String> = columns.iter().filter(|c| !expected.contains(c)).collect();
            if !unlisted.is_empty() {
                return Err(ModelLoadError::FeatureMismatch(format!(
                    "model reads {unlisted:?} which metadata does not list"
                )));
            }
        }
        Ok(Self {
            model,
            expected,
            use_log_target: metadata.preprocessing.use_log_target,
            buckets,
        })
    }

    /// Ordered feature names.
    pub fn expected_features(&self) -> &[String] {
        &self.expected
    }

    /// Category thresholds.
    pub const fn buckets(&self) -> &PriceBuckets {
        &self.buckets
    }

    /// Check a record against the expected features.
    pub fn validate(&self, record: &FeatureRecord) -> Result<(), MissingFeatureError> {
        validate(record, &self.expected)
    }

    /// Predict the price of one property.
    pub fn predict(&self, record: &FeatureRecord) -> Result<f64, PredictionError> {
        let frame = prepare(record, &self.expected)?;
        let raw = self.model.predict(&frame)?;
        let mut prices = self.to_prices(raw, 1)?;
        prices.pop().ok_or_else(|| {
            InferenceError::RowCountMismatch {
                expected: 1,
                actual: 0,
            }
            .into()
        })
    }

    /// Predict many records with a single model call.
    pub fn batch_predict(&self, records: &[FeatureRecord]) -> Result<Vec<f64>, PredictionError> {
        if records.is_empty() {
            return Ok(Vec::new());
        }
        let frame = prepare_batch(records, &self.expected)?;
        let raw = self.model.predict(&frame)?;
        Ok(self.to_prices(raw, records.len())?)
    }

    /// Predict every row of a table holding the expected columns.
    pub fn batch_predict_frame(&self, frame: &DataFrame) -> Result<Vec<f64>, PredictionError> {
        let present: Vec<String> = frame
            .get_column_names()
            .into_iter()
            .map(|c| c.to_string())
            .collect();
        let missing: Vec<String> = self
            .expected
            .iter()
            .filter(|name| !present.contains(name))
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(MissingFeatureError { missing, row: None }.into());
        }
        if frame.height() == 0 {
            return Ok(Vec::new());
        }

        let ordered = frame
            .select(self.expected.iter().map(String::as_str))
            .map_err(InferenceError::from)?;
        let raw = self.model.predict(&ordered)?;
        Ok(self.to_prices(raw, frame.height())?)
    }

    /// Tier for a price.
    pub fn categorize(&self, price: f64) -> PriceCategory {
        self.buckets.categorize(price)
    }

    fn to_prices(&self, raw: Vec<f64>, rows: usize) -> Result<Vec<f64>, InferenceError> {
        if raw.len() != rows {
            return Err(InferenceError::RowCountMismatch {
                expected: rows,
                actual: raw.len(),
            });
        }
        raw.into_iter()
            .enumerate()
            .map(|(row, value)| {
                let price = if self.use_log_target {
                    value.exp_m1()
                } else {
                    value
                };
                if price.is_finite() {
                    Ok(price)
                } else {
                    Err(InferenceError::NonFinite { row })
                }
            })
            .collect()
    }
}
