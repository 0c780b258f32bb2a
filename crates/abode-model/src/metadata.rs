//! Model metadata.
//!
//! The sidecar JSON written next to each model records what the model
//! expects and how well it scored. The layout is versioned by
//! `schema_version` and checked exactly once, when the file is read; the
//! rest of the crate only ever sees the canonical [`ModelMetadata`].
//!
//! Files written before versioning (`data_info.selected_features`,
//! `performance.validation_*`) are rejected at load and converted by
//! [`migrate_legacy`].

use crate::error::ModelLoadError;
use abode_encoding::UnknownPolicy;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;

/// Metadata layout version this build reads and writes.
pub const METADATA_SCHEMA_VERSION: u32 = 2;

/// Complete metadata record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetadata {
    /// Layout version
    pub schema_version: u32,
    /// Identity of the model
    pub model_info: ModelInfo,
    /// Expected inputs
    pub features: FeatureSchema,
    /// How inputs and target were transformed
    pub preprocessing: PreprocessingInfo,
    /// Evaluation results
    pub performance: Performance,
}

/// Model identity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    /// Display name
    pub name: String,
    /// Estimator family
    pub model_type: String,
    /// Target column
    pub target: String,
    /// When training finished
    pub created_timestamp: DateTime<Utc>,
    /// Library that produced the artifact
    pub framework: String,
}

/// Expected inputs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSchema {
    /// All input columns in the order the model was trained on
    pub feature_list: Vec<String>,
    /// Categorical subset
    pub categorical: Vec<String>,
    /// Numeric subset
    pub numerical: Vec<String>,
}

/// Preprocessing summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreprocessingInfo {
    /// Whether the model predicts `ln(1 + price)`
    pub use_log_target: bool,
    /// Categorical encoding description
    pub categorical_encoding: String,
    /// Numeric scaling description
    pub numerical_scaling: String,
    /// Distinct-value count above which a column is frequency encoded
    pub high_cardinality_threshold: usize,
    /// Fill for unseen categories
    pub unknown_policy: UnknownPolicy,
}

impl Default for PreprocessingInfo {
    fn default() -> Self {
        Self {
            use_log_target: true,
            categorical_encoding: "frequency (high cardinality) + one-hot (low cardinality)"
                .to_string(),
            numerical_scaling: "standard".to_string(),
            high_cardinality_threshold: 50,
            unknown_policy: UnknownPolicy::Zero,
        }
    }
}

/// Evaluation results
///
/// Validation figures are always present. Cross-validation and test
/// figures are absent in metadata migrated from the legacy layout.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Performance {
    /// Mean cross-validated R² (log scale)
    #[serde(default)]
    pub cv_r2_mean: Option<f64>,
    /// Standard deviation of cross-validated R²
    #[serde(default)]
    pub cv_r2_std: Option<f64>,
    /// Validation R² (price scale)
    pub val_r2: f64,
    /// Validation RMSE in dollars
    pub val_rmse: f64,
    /// Validation MAE in dollars
    pub val_mae: f64,
    /// Test R²
    #[serde(default)]
    pub test_r2: Option<f64>,
    /// Test RMSE in dollars
    #[serde(default)]
    pub test_rmse: Option<f64>,
    /// Test MAE in dollars
    #[serde(default)]
    pub test_mae: Option<f64>,
}

impl ModelMetadata {
    /// Parse and validate metadata from JSON text.
    pub fn from_json_str(json: &str) -> Result<Self, ModelLoadError> {
        let value: Value = serde_json::from_str(json).map_err(|source| ModelLoadError::Parse {
            what: "metadata",
            source,
        })?;
        Self::from_value(value)
    }

    /// Validate a parsed JSON document.
    pub fn from_value(value: Value) -> Result<Self, ModelLoadError> {
        match value.get("schema_version").map(Value::as_u64) {
            Some(Some(v)) if v == u64::from(METADATA_SCHEMA_VERSION) => {}
            Some(Some(found)) => {
                return Err(ModelLoadError::UnsupportedSchema {
                    found,
                    expected: METADATA_SCHEMA_VERSION,
                });
            }
            Some(None) => {
                return Err(ModelLoadError::UnrecognizedLayout(
                    "schema_version is not an integer".to_string(),
                ));
            }
            None if is_legacy(&value) => return Err(ModelLoadError::LegacySchema),
            None => {
                return Err(ModelLoadError::UnrecognizedLayout(
                    "no schema_version field".to_string(),
                ));
            }
        }

        let metadata: Self = serde_json::from_value(value).map_err(|source| ModelLoadError::Parse {
            what: "metadata",
            source,
        })?;
        metadata.validate()?;
        Ok(metadata)
    }

    /// Read metadata from a file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ModelLoadError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ModelLoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    /// Write metadata as pretty JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
    }

    /// Ordered feature names the model expects.
    pub fn expected_features(&self) -> &[String] {
        &self.features.feature_list
    }

    fn validate(&self) -> Result<(), ModelLoadError> {
        let features = &self.features;
        if features.feature_list.is_empty() {
            return Err(ModelLoadError::UnrecognizedLayout(
                "feature_list is empty".to_string(),
            ));
        }
        if let Some(stray) = features
            .categorical
            .iter()
            .chain(&features.numerical)
            .find(|name| !features.feature_list.contains(*name))
        {
            return Err(ModelLoadError::UnrecognizedLayout(format!(
                "{stray} is typed but absent from feature_list"
            )));
        }
        Ok(())
    }
}

fn is_legacy(value: &Value) -> bool {
    value
        .pointer("/data_info/selected_features")
        .is_some_and(Value::is_array)
}

/// Convert a legacy metadata document to the canonical layout.
///
/// `categorical` names the columns to type as categorical; every other
/// selected feature is typed numerical.
pub fn migrate_legacy(value: &Value, categorical: &[&str]) -> Result<ModelMetadata, ModelLoadError> {
    if value.get("schema_version").is_some() {
        return Err(ModelLoadError::UnrecognizedLayout(
            "document is already versioned".to_string(),
        ));
    }
    let feature_list: Vec<String> = value
        .pointer("/data_info/selected_features")
        .and_then(Value::as_array)
        .ok_or_else(|| legacy_field("data_info.selected_features"))?
        .iter()
        .map(|v| {
            v.as_str()
                .map(str::to_owned)
                .ok_or_else(|| legacy_field("data_info.selected_features[]"))
        })
        .collect::<Result<_, _>>()?;

    let (cat, num): (Vec<String>, Vec<String>) = feature_list
        .iter()
        .cloned()
        .partition(|f| categorical.contains(&f.as_str()));

    let text = |ptr: &str, default: &str| {
        value
            .pointer(ptr)
            .and_then(Value::as_str)
            .unwrap_or(default)
            .to_string()
    };
    let number = |ptr: &str| value.pointer(ptr).and_then(Value::as_f64);
    let required = |ptr: &'static str| number(ptr).ok_or_else(|| legacy_field(ptr));

    let created = value
        .pointer("/model_info/created_timestamp")
        .and_then(Value::as_str)
        .ok_or_else(|| legacy_field("model_info.created_timestamp"))?;

    let defaults = PreprocessingInfo::default();
    let metadata = ModelMetadata {
        schema_version: METADATA_SCHEMA_VERSION,
        model_info: ModelInfo {
            name: text("/model_info/name", "Unnamed model"),
            model_type: text("/model_info/model_type", "unknown"),
            target: text("/model_info/target", "price"),
            created_timestamp: parse_legacy_timestamp(created)?,
            framework: text("/model_info/framework", "unknown"),
        },
        features: FeatureSchema {
            feature_list,
            categorical: cat,
            numerical: num,
        },
        preprocessing: PreprocessingInfo {
            use_log_target: value
                .pointer("/preprocessing/use_log_target")
                .and_then(Value::as_bool)
                .unwrap_or(defaults.use_log_target),
            ..defaults
        },
        performance: Performance {
            cv_r2_mean: number("/performance/cv_r2_mean"),
            cv_r2_std: number("/performance/cv_r2_std"),
            val_r2: required("/performance/validation_r2")?,
            val_rmse: required("/performance/validation_rmse")?,
            val_mae: required("/performance/validation_mae")?,
            test_r2: number("/performance/test_r2"),
            test_rmse: number("/performance/test_rmse"),
            test_mae: number("/performance/test_mae"),
        },
    };
    metadata.validate()?;
    Ok(metadata)
}

fn legacy_field(name: &str) -> ModelLoadError {
    ModelLoadError::UnrecognizedLayout(format!("legacy metadata lacks {name}"))
}

/// Accepts `YYYYMMDD` (midnight UTC) or RFC 3339.
fn parse_legacy_timestamp(raw: &str) -> Result<DateTime<Utc>, ModelLoadError> {
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y%m%d") {
        return Ok(date.and_time(chrono::NaiveTime::MIN).and_utc());
    }
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| {
            ModelLoadError::UnrecognizedLayout(format!("unparseable created_timestamp {raw:?}"))
        })
}
