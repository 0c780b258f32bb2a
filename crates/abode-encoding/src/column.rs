//! Column extraction helpers shared by the encoders.

use crate::error::{EncodingError, Result};
use polars::prelude::*;

/// Read a column as optional strings, casting non-string dtypes.
///
/// Floats are rendered with Rust's shortest round-trip formatting, so
/// `2.0` reads as `"2"` whether it arrived as a number or as text. Integers
/// and other dtypes go through the polars string cast.
pub fn string_values(data: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
    let column = data
        .column(name)
        .map_err(|_| EncodingError::MissingColumn(name.to_string()))?;
    let series = column.as_materialized_series();
    if series.dtype().is_float() {
        let floats = series.cast(&DataType::Float64)?;
        let values = floats
            .f64()?
            .into_iter()
            .map(|v| v.map(|v| v.to_string()))
            .collect();
        return Ok(values);
    }
    let series = series.cast(&DataType::String)?;
    let values = series
        .str()?
        .into_iter()
        .map(|v| v.map(str::to_owned))
        .collect();
    Ok(values)
}

/// Read a column as `f64`, failing on any value that cannot be cast.
///
/// Uses a strict cast: a string such as `"two"` is an error rather than a
/// silent null.
pub fn float_values(data: &DataFrame, name: &str) -> Result<Vec<f64>> {
    let column = data
        .column(name)
        .map_err(|_| EncodingError::MissingColumn(name.to_string()))?;
    let series = column
        .as_materialized_series()
        .strict_cast(&DataType::Float64)?;

    series
        .f64()?
        .into_iter()
        .enumerate()
        .map(|(row, v)| {
            v.ok_or_else(|| EncodingError::NullValue {
                column: name.to_string(),
                row,
            })
        })
        .collect()
}

/// Names of the input columns, in frame order.
pub fn column_names(data: &DataFrame) -> Vec<String> {
    data.get_column_names()
        .into_iter()
        .map(|name| name.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame() -> DataFrame {
        DataFrame::new(vec![
            Series::new("type".into(), &["Condo for sale", "House for sale"]).into(),
            Series::new("beds".into(), &[2i64, 3]).into(),
            Series::new("note".into(), &["1.5", "two"]).into(),
        ])
        .unwrap()
    }

    #[test]
    fn test_string_values_casts_numbers() {
        let df = frame();
        let beds = string_values(&df, "beds").unwrap();
        assert_eq!(beds, vec![Some("2".to_string()), Some("3".to_string())]);
    }

    #[test]
    fn test_string_values_renders_floats_like_text() {
        let df = df!("type" => [Some(2.0), Some(1.5), None]).unwrap();
        let values = string_values(&df, "type").unwrap();
        assert_eq!(values, vec![Some("2".to_string()), Some("1.5".to_string()), None]);
    }

    #[test]
    fn test_float_values_strict_cast_fails() {
        let df = frame();
        assert!(float_values(&df, "note").is_err());
        assert_eq!(float_values(&df, "beds").unwrap(), vec![2.0, 3.0]);
    }

    #[test]
    fn test_missing_column() {
        let df = frame();
        match string_values(&df, "sublocality") {
            Err(EncodingError::MissingColumn(name)) => assert_eq!(name, "sublocality"),
            other => panic!("expected MissingColumn, got {other:?}"),
        }
    }
}
