//! Frequency Encoder
//!
//! Replaces each category value with the number of times it occurred in the
//! data the encoder was fitted on. Used for high-cardinality columns (broker
//! names) where one-hot encoding would produce an impractically wide matrix.
//!
//! Tables are frozen once fitted. Values never seen while fitting map to a
//! fixed count chosen by the [`UnknownPolicy`].

use crate::column::{column_names, string_values};
use crate::error::{EncodingError, Result};
use ndarray::Array2;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// How to encode a category that was not seen at fit time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnknownPolicy {
    /// Unseen values encode as 0
    #[default]
    Zero,
    /// Unseen values encode as 1 (treated as a rare category)
    Rare,
}

impl UnknownPolicy {
    /// Count assigned to an unseen value.
    pub const fn fill_count(self) -> u64 {
        match self {
            Self::Zero => 0,
            Self::Rare => 1,
        }
    }
}

impl fmt::Display for UnknownPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Zero => write!(f, "zero"),
            Self::Rare => write!(f, "rare"),
        }
    }
}

impl FromStr for UnknownPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "zero" => Ok(Self::Zero),
            "rare" => Ok(Self::Rare),
            other => Err(format!("unknown category policy '{other}' (expected zero or rare)")),
        }
    }
}

/// Occurrence counts for one categorical column
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FrequencyTable {
    column: String,
    counts: HashMap<String, u64>,
}

impl FrequencyTable {
    /// Create an empty table for a column.
    pub fn new(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            counts: HashMap::new(),
        }
    }

    /// Build a table by counting the non-null values of a column.
    pub fn from_values<'a, I>(column: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = Option<&'a str>>,
    {
        let mut table = Self::new(column);
        for value in values.into_iter().flatten() {
            *table.counts.entry(value.to_string()).or_insert(0) += 1;
        }
        table
    }

    /// Column this table was fitted on.
    pub fn column(&self) -> &str {
        &self.column
    }

    /// Count for a value, `None` if it was never seen.
    pub fn get(&self, value: &str) -> Option<u64> {
        self.counts.get(value).copied()
    }

    /// Number of distinct values.
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    /// Whether the table holds no values.
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Total number of counted rows.
    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    /// Iterate over `(value, count)` pairs in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.counts.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Encode a single value under the given policy.
    pub fn encode(&self, value: Option<&str>, policy: UnknownPolicy) -> u64 {
        value
            .and_then(|v| self.get(v))
            .unwrap_or_else(|| policy.fill_count())
    }
}

/// Frequency encoder over one or more categorical columns
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FrequencyEncoder {
    policy: UnknownPolicy,
    tables: Option<Vec<FrequencyTable>>,
}

impl FrequencyEncoder {
    /// Create an unfitted encoder with the given unknown-category policy.
    pub const fn new(policy: UnknownPolicy) -> Self {
        Self {
            policy,
            tables: None,
        }
    }

    /// Unknown-category policy.
    pub const fn policy(&self) -> UnknownPolicy {
        self.policy
    }

    /// Whether `fit` has been called.
    pub const fn is_fitted(&self) -> bool {
        self.tables.is_some()
    }

    /// Fitted tables in fit order (empty when unfitted).
    pub fn tables(&self) -> &[FrequencyTable] {
        self.tables.as_deref().unwrap_or(&[])
    }

    /// Fitted table for a column.
    pub fn table(&self, column: &str) -> Option<&FrequencyTable> {
        self.tables().iter().find(|t| t.column == column)
    }

    /// Count every distinct value of each column.
    ///
    /// Re-fitting replaces all previous tables. An empty frame yields empty
    /// tables rather than an error.
    pub fn fit(&mut self, data: &DataFrame, columns: &[&str]) -> Result<&mut Self> {
        let mut tables = Vec::with_capacity(columns.len());
        for &column in columns {
            let values = string_values(data, column)?;
            let table = FrequencyTable::from_values(column, values.iter().map(Option::as_deref));
            tracing::debug!(
                column,
                distinct = table.len(),
                rows = data.height(),
                "fitted frequency table"
            );
            tables.push(table);
        }
        self.tables = Some(tables);
        Ok(self)
    }

    /// Replace each fitted column's values with their counts.
    ///
    /// Output has one row per input row and one column per fitted column,
    /// ordered as the columns appear in `data`. Columns the encoder was not
    /// fitted on are ignored.
    pub fn transform(&self, data: &DataFrame) -> Result<Array2<f64>> {
        let tables = self.tables.as_ref().ok_or(EncodingError::NotFitted {
            encoder: "FrequencyEncoder",
        })?;

        let names = column_names(data);
        if let Some(missing) = tables.iter().find(|t| !names.contains(&t.column)) {
            return Err(EncodingError::MissingColumn(missing.column.clone()));
        }

        let ordered: Vec<&FrequencyTable> = names
            .iter()
            .filter_map(|name| tables.iter().find(|t| &t.column == name))
            .collect();

        let mut out = Array2::<f64>::zeros((data.height(), ordered.len()));
        for (j, table) in ordered.iter().enumerate() {
            let values = string_values(data, &table.column)?;
            for (i, value) in values.iter().enumerate() {
                out[[i, j]] = table.encode(value.as_deref(), self.policy) as f64;
            }
        }
        Ok(out)
    }

    /// Fit on `columns` and transform the same frame.
    pub fn fit_transform(&mut self, data: &DataFrame, columns: &[&str]) -> Result<Array2<f64>> {
        self.fit(data, columns)?;
        self.transform(data)
    }

    /// Encode a single value of a fitted column.
    pub fn encode(&self, column: &str, value: Option<&str>) -> Result<u64> {
        if !self.is_fitted() {
            return Err(EncodingError::NotFitted {
                encoder: "FrequencyEncoder",
            });
        }
        let table = self
            .table(column)
            .ok_or_else(|| EncodingError::MissingColumn(column.to_string()))?;
        Ok(table.encode(value, self.policy))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn brokers() -> DataFrame {
        DataFrame::new(vec![
            Series::new(
                "brokertitle".into(),
                &[
                    "Brokered by COMPASS",
                    "Brokered by Serhant",
                    "Brokered by COMPASS",
                    "Brokered by RE MAX Edge",
                    "Brokered by Serhant",
                    "Brokered by COMPASS",
                ],
            )
            .into(),
            Series::new("beds".into(), &[2i64, 3, 1, 4, 2, 2]).into(),
        ])
        .unwrap()
    }

    #[test]
    fn test_fit_counts_values() {
        let mut encoder = FrequencyEncoder::new(UnknownPolicy::Zero);
        encoder.fit(&brokers(), &["brokertitle"]).unwrap();

        let table = encoder.table("brokertitle").unwrap();
        assert_eq!(table.get("Brokered by COMPASS"), Some(3));
        assert_eq!(table.get("Brokered by Serhant"), Some(2));
        assert_eq!(table.get("Brokered by RE MAX Edge"), Some(1));
        assert_eq!(table.len(), 3);
        assert_eq!(table.total(), 6);
    }

    #[test]
    fn test_fit_transform_reproduces_counts() {
        let df = brokers();
        let mut encoder = FrequencyEncoder::default();
        let encoded = encoder.fit_transform(&df, &["brokertitle"]).unwrap();

        assert_eq!(encoded.dim(), (6, 1));
        let counts: Vec<f64> = encoded.column(0).to_vec();
        assert_eq!(counts, vec![3.0, 2.0, 3.0, 1.0, 2.0, 3.0]);
    }

    #[rstest]
    #[case(UnknownPolicy::Zero, 0.0)]
    #[case(UnknownPolicy::Rare, 1.0)]
    fn test_unseen_value_policy(#[case] policy: UnknownPolicy, #[case] expected: f64) {
        let mut encoder = FrequencyEncoder::new(policy);
        encoder.fit(&brokers(), &["brokertitle"]).unwrap();

        let unseen = DataFrame::new(vec![
            Series::new("brokertitle".into(), &["Brokered by Nobody", "Brokered by Serhant"])
                .into(),
        ])
        .unwrap();
        let encoded = encoder.transform(&unseen).unwrap();
        assert_eq!(encoded[[0, 0]], expected);
        assert_eq!(encoded[[1, 0]], 2.0);
    }

    #[test]
    fn test_transform_before_fit_fails() {
        let encoder = FrequencyEncoder::default();
        assert!(matches!(
            encoder.transform(&brokers()),
            Err(EncodingError::NotFitted { .. })
        ));
    }

    #[test]
    fn test_transform_ignores_extra_columns_and_follows_input_order() {
        let df = DataFrame::new(vec![
            Series::new("sublocality".into(), &["Manhattan", "Brooklyn", "Manhattan"]).into(),
            Series::new("brokertitle".into(), &["A", "A", "B"]).into(),
        ])
        .unwrap();
        let mut encoder = FrequencyEncoder::default();
        encoder.fit(&df, &["brokertitle", "sublocality"]).unwrap();

        let reordered = DataFrame::new(vec![
            Series::new("price".into(), &[1.0, 2.0]).into(),
            Series::new("sublocality".into(), &["Brooklyn", "Queens"]).into(),
            Series::new("brokertitle".into(), &["A", "B"]).into(),
        ])
        .unwrap();
        let encoded = encoder.transform(&reordered).unwrap();

        assert_eq!(encoded.dim(), (2, 2));
        assert_eq!(encoded.row(0).to_vec(), vec![1.0, 2.0]);
        assert_eq!(encoded.row(1).to_vec(), vec![0.0, 1.0]);
    }

    #[test]
    fn test_transform_missing_fitted_column() {
        let mut encoder = FrequencyEncoder::default();
        encoder.fit(&brokers(), &["brokertitle"]).unwrap();

        let df = DataFrame::new(vec![Series::new("beds".into(), &[1i64]).into()]).unwrap();
        assert!(matches!(
            encoder.transform(&df),
            Err(EncodingError::MissingColumn(name)) if name == "brokertitle"
        ));
    }

    #[test]
    fn test_empty_input_yields_empty_tables() {
        let empty = DataFrame::new(vec![
            Series::new("brokertitle".into(), Vec::<String>::new()).into(),
        ])
        .unwrap();
        let mut encoder = FrequencyEncoder::default();
        encoder.fit(&empty, &["brokertitle"]).unwrap();

        assert!(encoder.is_fitted());
        assert!(encoder.table("brokertitle").unwrap().is_empty());
        assert_eq!(encoder.encode("brokertitle", Some("anything")).unwrap(), 0);
    }

    #[test]
    fn test_refit_overwrites_tables() {
        let mut encoder = FrequencyEncoder::default();
        encoder.fit(&brokers(), &["brokertitle"]).unwrap();

        let other = DataFrame::new(vec![Series::new("brokertitle".into(), &["X"]).into()]).unwrap();
        encoder.fit(&other, &["brokertitle"]).unwrap();

        assert_eq!(encoder.encode("brokertitle", Some("X")).unwrap(), 1);
        assert_eq!(encoder.encode("brokertitle", Some("Brokered by COMPASS")).unwrap(), 0);
    }

    #[test]
    fn test_null_is_treated_as_unseen() {
        let df = DataFrame::new(vec![
            Series::new("brokertitle".into(), &[Some("A"), None, Some("A")]).into(),
        ])
        .unwrap();
        let mut encoder = FrequencyEncoder::new(UnknownPolicy::Rare);
        let encoded = encoder.fit_transform(&df, &["brokertitle"]).unwrap();

        assert_eq!(encoded.column(0).to_vec(), vec![2.0, 1.0, 2.0]);
        assert_eq!(encoder.table("brokertitle").unwrap().total(), 2);
    }

    #[test]
    fn test_policy_parse_and_serde() {
        assert_eq!("rare".parse::<UnknownPolicy>().unwrap(), UnknownPolicy::Rare);
        assert_eq!("ZERO".parse::<UnknownPolicy>().unwrap(), UnknownPolicy::Zero);
        assert!("median".parse::<UnknownPolicy>().is_err());

        let mut encoder = FrequencyEncoder::new(UnknownPolicy::Rare);
        encoder.fit(&brokers(), &["brokertitle"]).unwrap();
        let json = serde_json::to_string(&encoder).unwrap();
        assert!(json.contains("\"rare\""));

        let restored: FrequencyEncoder = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.policy(), UnknownPolicy::Rare);
        assert_eq!(restored.tables(), encoder.tables());
    }
}
