//! Integration tests for batch export and sample round trips.

use abode_data::read_feature_frame;
use abode_model::{PriceBuckets, PriceCategory};
use abode_output::{BatchPredictionRow, ExportFormat, Exporter, sample_csv};

#[test]
fn test_sample_csv_is_valid_batch_input() {
    let csv = sample_csv().unwrap();
    let frame = read_feature_frame(csv.as_bytes()).unwrap();

    assert_eq!(frame.height(), 2);
    for column in ["brokertitle", "type", "beds", "bath", "propertysqft", "sublocality"] {
        assert!(frame.column(column).is_ok(), "missing {column}");
    }
}

#[test]
fn test_full_batch_export_workflow() {
    let buckets = PriceBuckets::default();
    let prices = [399_999.99, 400_000.0, 2_000_000.0];
    let rows = BatchPredictionRow::from_prices(&prices, |p| buckets.categorize(p));

    let categories: Vec<PriceCategory> = rows.iter().map(|r| r.price_category).collect();
    assert_eq!(
        categories,
        vec![
            PriceCategory::BudgetFriendly,
            PriceCategory::MidRange,
            PriceCategory::Luxury
        ]
    );

    let csv = rows.export_to_string(ExportFormat::Csv).unwrap();
    assert_eq!(csv.lines().count(), 4);
    assert!(csv.contains("\"$2,000,000\",Luxury"));

    let json = rows.export_to_string(ExportFormat::PrettyJson).unwrap();
    let parsed: Vec<BatchPredictionRow> = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, rows);
}
