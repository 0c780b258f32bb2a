//! Feature records.
//!
//! A record is a loose name → value map so that an incomplete request can be
//! reported field by field instead of failing deserialization.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// One input value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FeatureValue {
    /// Numeric value
    Number(f64),
    /// Text value
    Text(String),
    /// Explicit null
    Null,
}

impl FeatureValue {
    /// Numeric view; text is parsed.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(s) => s.trim().parse().ok(),
            Self::Null => None,
        }
    }

    /// Text view; numbers are formatted.
    pub fn as_text(&self) -> Option<String> {
        match self {
            Self::Number(n) => Some(n.to_string()),
            Self::Text(s) => Some(s.clone()),
            Self::Null => None,
        }
    }
}

impl fmt::Display for FeatureValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
            Self::Null => f.write_str("null"),
        }
    }
}

impl From<f64> for FeatureValue {
    fn from(v: f64) -> Self {
        Self::Number(v)
    }
}

impl From<i64> for FeatureValue {
    fn from(v: i64) -> Self {
        Self::Number(v as f64)
    }
}

impl From<i32> for FeatureValue {
    fn from(v: i32) -> Self {
        Self::Number(f64::from(v))
    }
}

impl From<&str> for FeatureValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for FeatureValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

/// Named feature values for one property
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureRecord(BTreeMap<String, FeatureValue>);

impl FeatureRecord {
    /// Empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<FeatureValue>) -> Self {
        self.insert(name, value);
        self
    }

    /// Set a value, replacing any previous one.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<FeatureValue>) {
        self.0.insert(name.into(), value.into());
    }

    /// Value for `name`.
    pub fn get(&self, name: &str) -> Option<&FeatureValue> {
        self.0.get(name)
    }

    /// Whether `name` is present (null values count as present).
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// Field names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the record has no fields.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for FeatureRecord
where
    K: Into<String>,
    V: Into<FeatureValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_mixed_values() {
        let record: FeatureRecord = serde_json::from_str(
            r#"{"brokertitle": "Brokered by COMPASS", "beds": 2, "bath": 1.5, "note": null}"#,
        )
        .unwrap();

        assert_eq!(record.len(), 4);
        assert_eq!(record.get("beds"), Some(&FeatureValue::Number(2.0)));
        assert_eq!(record.get("bath").and_then(FeatureValue::as_f64), Some(1.5));
        assert_eq!(record.get("note"), Some(&FeatureValue::Null));
        assert!(record.contains("note"));
        assert!(!record.contains("type"));
    }

    #[test]
    fn test_builder_and_views() {
        let record = FeatureRecord::new()
            .with("type", "Condo for sale")
            .with("beds", 3)
            .with("propertysqft", "800");

        assert_eq!(record.get("propertysqft").and_then(FeatureValue::as_f64), Some(800.0));
        assert_eq!(record.get("beds").and_then(FeatureValue::as_text).as_deref(), Some("3"));
        assert_eq!(record.names().collect::<Vec<_>>(), vec!["beds", "propertysqft", "type"]);
    }
}
