//! Training reports.

use abode_model::RegressionMetrics;
use abode_model::metrics::mean_std;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors that can occur during report generation.
#[derive(Debug, Error)]
pub enum ReportError {
    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A required section was never set.
    #[error("Report is missing {0}")]
    Incomplete(&'static str),
}

/// Row counts through the data pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RowCounts {
    /// Rows read from the CSV
    pub loaded: usize,
    /// Rows dropped for missing or malformed fields
    pub incomplete: usize,
    /// Rows left after outlier removal
    pub after_outliers: usize,
    /// Training rows
    pub train: usize,
    /// Validation rows
    pub validation: usize,
    /// Test rows
    pub test: usize,
}

/// Summary of one training run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingReport {
    /// Model name
    pub model_name: String,
    /// When training finished
    pub timestamp: DateTime<Utc>,
    /// Row counts
    pub rows: RowCounts,
    /// Columns routed to the frequency encoder
    pub frequency_encoded: Vec<String>,
    /// R² per cross-validation fold (log scale)
    pub cv_scores: Vec<f64>,
    /// Validation scores in dollars
    pub validation: RegressionMetrics,
    /// Test scores in dollars
    pub test: RegressionMetrics,
    /// Where the artifacts were written
    pub artifacts: Vec<String>,
}

/// One fold score, for CSV export
#[derive(Debug, Serialize)]
pub(crate) struct FoldRow {
    fold: usize,
    r2: f64,
}

impl TrainingReport {
    /// Mean and standard deviation of the fold scores.
    pub fn cv_summary(&self) -> (f64, f64) {
        mean_std(&self.cv_scores)
    }

    pub(crate) fn fold_rows(&self) -> Vec<FoldRow> {
        self.cv_scores
            .iter()
            .enumerate()
            .map(|(i, &r2)| FoldRow { fold: i + 1, r2 })
            .collect()
    }

    /// Convert report to JSON string.
    pub fn to_json(&self) -> Result<String, ReportError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Render as a fixed-width text table.
    pub fn to_ascii_table(&self) -> String {
        let mut output = String::new();
        let (cv_mean, cv_std) = self.cv_summary();

        output.push_str(&format!("\nTraining Report: {}\n", self.model_name));
        output.push_str(&format!("Completed: {}\n", self.timestamp.format("%Y-%m-%d %H:%M:%S UTC")));
        output.push_str(&"=".repeat(64));
        output.push('\n');

        output.push_str(&format!("{:<28} {:>12}\n", "Rows loaded", self.rows.loaded));
        output.push_str(&format!("{:<28} {:>12}\n", "Incomplete rows dropped", self.rows.incomplete));
        output.push_str(&format!("{:<28} {:>12}\n", "After outlier removal", self.rows.after_outliers));
        let split = format!(
            "{}/{}/{}",
            self.rows.train, self.rows.validation, self.rows.test
        );
        output.push_str(&format!("{:<28} {:>12}\n", "Train / validation / test", split));
        if !self.frequency_encoded.is_empty() {
            output.push_str(&format!(
                "{:<28} {:>12}\n",
                "Frequency encoded",
                self.frequency_encoded.join(", ")
            ));
        }
        output.push_str(&"-".repeat(64));
        output.push('\n');

        output.push_str(&format!(
            "{:<28} {:>12.4} (+/- {:.4})\n",
            "CV R² (log scale)", cv_mean, cv_std
        ));
        output.push_str(&format!("{:<16} {:>12} {:>16} {:>16}\n", "Set", "R²", "RMSE", "MAE"));
        for (name, m) in [("Validation", &self.validation), ("Test", &self.test)] {
            output.push_str(&format!(
                "{:<16} {:>12.4} {:>16.0} {:>16.0}\n",
                name, m.r2, m.rmse, m.mae
            ));
        }

        if !self.artifacts.is_empty() {
            output.push_str(&"-".repeat(64));
            output.push('\n');
            for path in &self.artifacts {
                output.push_str(&format!("Saved: {path}\n"));
            }
        }
        output
    }
}

impl fmt::Display for TrainingReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_ascii_table())
    }
}

/// Builder for creating training reports.
#[derive(Debug, Default)]
pub struct ReportBuilder {
    model_name: Option<String>,
    rows: RowCounts,
    frequency_encoded: Vec<String>,
    cv_scores: Vec<f64>,
    validation: Option<RegressionMetrics>,
    test: Option<RegressionMetrics>,
    artifacts: Vec<String>,
}

impl ReportBuilder {
    /// Create a new report builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the model name.
    pub fn model_name(mut self, name: impl Into<String>) -> Self {
        self.model_name = Some(name.into());
        self
    }

    /// Set the row counts.
    pub const fn rows(mut self, rows: RowCounts) -> Self {
        self.rows = rows;
        self
    }

    /// Set the frequency-encoded columns.
    pub fn frequency_encoded(mut self, columns: Vec<String>) -> Self {
        self.frequency_encoded = columns;
        self
    }

    /// Set the fold scores.
    pub fn cv_scores(mut self, scores: Vec<f64>) -> Self {
        self.cv_scores = scores;
        self
    }

    /// Set the validation and test scores.
    pub const fn evaluation(mut self, validation: RegressionMetrics, test: RegressionMetrics) -> Self {
        self.validation = Some(validation);
        self.test = Some(test);
        self
    }

    /// Add a saved artifact path.
    pub fn artifact(mut self, path: impl Into<String>) -> Self {
        self.artifacts.push(path.into());
        self
    }

    /// Build the report.
    pub fn build(self) -> Result<TrainingReport, ReportError> {
        Ok(TrainingReport {
            model_name: self.model_name.unwrap_or_default(),
            timestamp: Utc::now(),
            rows: self.rows,
            frequency_encoded: self.frequency_encoded,
            cv_scores: self.cv_scores,
            validation: self.validation.ok_or(ReportError::Incomplete("validation scores"))?,
            test: self.test.ok_or(ReportError::Incomplete("test scores"))?,
            artifacts: self.artifacts,
        })
    }
}
