//! Standard scaling for numeric columns.

use crate::column::float_values;
use crate::error::{EncodingError, Result};
use ndarray::Array2;
use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// Fitted statistics for one column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct ColumnStats {
    column: String,
    mean: f64,
    std: f64,
}

/// Centers each column on its mean and divides by its population standard
/// deviation. Constant columns keep a divisor of 1.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StandardScaler {
    stats: Option<Vec<ColumnStats>>,
}

impl StandardScaler {
    /// Create an unfitted scaler.
    pub const fn new() -> Self {
        Self { stats: None }
    }

    /// Compute mean and standard deviation per column.
    pub fn fit(&mut self, data: &DataFrame, columns: &[&str]) -> Result<&mut Self> {
        let mut stats = Vec::with_capacity(columns.len());
        for &column in columns {
            let values = float_values(data, column)?;
            let n = values.len().max(1) as f64;
            let mean = values.iter().sum::<f64>() / n;
            let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
            let std = var.sqrt();
            stats.push(ColumnStats {
                column: column.to_string(),
                mean,
                std: if std > 0.0 { std } else { 1.0 },
            });
        }
        self.stats = Some(stats);
        Ok(self)
    }

    /// Mean and standard deviation for a fitted column.
    pub fn stats(&self, column: &str) -> Option<(f64, f64)> {
        self.stats
            .iter()
            .flatten()
            .find(|s| s.column == column)
            .map(|s| (s.mean, s.std))
    }

    /// Number of output columns.
    pub fn output_width(&self) -> usize {
        self.stats.as_ref().map_or(0, Vec::len)
    }

    /// Scale the fitted columns, in fit order.
    pub fn transform(&self, data: &DataFrame) -> Result<Array2<f64>> {
        let stats = self.stats.as_ref().ok_or(EncodingError::NotFitted {
            encoder: "StandardScaler",
        })?;

        let mut out = Array2::<f64>::zeros((data.height(), stats.len()));
        for (j, s) in stats.iter().enumerate() {
            for (i, value) in float_values(data, &s.column)?.into_iter().enumerate() {
                out[[i, j]] = (value - s.mean) / s.std;
            }
        }
        Ok(out)
    }
}
