//! One-hot encoding for low-cardinality categoricals.
//!
//! The first category of each column (in sorted order) is dropped to avoid a
//! perfectly collinear block. Unknown values encode as all zeros.

use crate::column::string_values;
use crate::error::{EncodingError, Result};
use ndarray::Array2;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Sorted categories observed for one column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct ColumnCategories {
    column: String,
    categories: Vec<String>,
}

impl ColumnCategories {
    /// Output slots: every category but the first.
    fn width(&self) -> usize {
        self.categories.len().saturating_sub(1)
    }

    fn slot(&self, value: Option<&str>) -> Option<usize> {
        let value = value?;
        match self.categories.binary_search_by(|c| c.as_str().cmp(value)) {
            Ok(0) | Err(_) => None,
            Ok(idx) => Some(idx - 1),
        }
    }
}

/// Drop-first one-hot encoder
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OneHotEncoder {
    columns: Option<Vec<ColumnCategories>>,
}

impl OneHotEncoder {
    /// Create an unfitted encoder.
    pub const fn new() -> Self {
        Self { columns: None }
    }

    /// Record the distinct values of each column.
    pub fn fit(&mut self, data: &DataFrame, columns: &[&str]) -> Result<&mut Self> {
        let mut fitted = Vec::with_capacity(columns.len());
        for &column in columns {
            let categories: BTreeSet<String> =
                string_values(data, column)?.into_iter().flatten().collect();
            fitted.push(ColumnCategories {
                column: column.to_string(),
                categories: categories.into_iter().collect(),
            });
        }
        self.columns = Some(fitted);
        Ok(self)
    }

    /// Number of output columns.
    pub fn output_width(&self) -> usize {
        self.columns
            .as_ref()
            .map_or(0, |cols| cols.iter().map(ColumnCategories::width).sum())
    }

    /// Output column names, `<column>_<category>`.
    pub fn feature_names(&self) -> Vec<String> {
        self.columns
            .iter()
            .flatten()
            .flat_map(|c| {
                c.categories
                    .iter()
                    .skip(1)
                    .map(move |cat| format!("{}_{}", c.column, cat))
            })
            .collect()
    }

    /// Expand the fitted columns into indicator columns, in fit order.
    pub fn transform(&self, data: &DataFrame) -> Result<Array2<f64>> {
        let columns = self.columns.as_ref().ok_or(EncodingError::NotFitted {
            encoder: "OneHotEncoder",
        })?;

        let mut out = Array2::<f64>::zeros((data.height(), self.output_width()));
        let mut offset = 0;
        for column in columns {
            let values = string_values(data, &column.column)?;
            for (i, value) in values.iter().enumerate() {
                if let Some(slot) = column.slot(value.as_deref()) {
                    out[[i, offset + slot]] = 1.0;
                }
            }
            offset += column.width();
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn types() -> DataFrame {
        DataFrame::new(vec![
            Series::new(
                "type".into(),
                &["House for sale", "Condo for sale", "Co-op for sale", "Condo for sale"],
            )
            .into(),
        ])
        .unwrap()
    }

    #[test]
    fn test_drop_first_category() {
        let mut encoder = OneHotEncoder::new();
        encoder.fit(&types(), &["type"]).unwrap();

        // Sorted: Co-op, Condo, House; Co-op is dropped
        assert_eq!(encoder.output_width(), 2);
        assert_eq!(
            encoder.feature_names(),
            vec!["type_Condo for sale", "type_House for sale"]
        );

        let encoded = encoder.transform(&types()).unwrap();
        assert_eq!(encoded.row(0).to_vec(), vec![0.0, 1.0]);
        assert_eq!(encoded.row(1).to_vec(), vec![1.0, 0.0]);
        assert_eq!(encoded.row(2).to_vec(), vec![0.0, 0.0]);
    }

    #[test]
    fn test_unknown_category_is_all_zero() {
        let mut encoder = OneHotEncoder::new();
        encoder.fit(&types(), &["type"]).unwrap();

        let df = DataFrame::new(vec![Series::new("type".into(), &["Land for sale"]).into()])
            .unwrap();
        let encoded = encoder.transform(&df).unwrap();
        assert!(encoded.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_unfitted() {
        assert!(OneHotEncoder::new().transform(&types()).is_err());
        assert_eq!(OneHotEncoder::new().output_width(), 0);
    }
}
