//! End-to-end tests: train on synthetic listings, persist, reload, predict.

use abode_data::{Listing, SplitConfig, stratified_split};
use abode_model::training::{TrainingConfig, save_outcome, train};
use abode_model::{
    BoostingConfig, FeatureRecord, LoadOptions, ModelHandle, ModelPaths, PredictionError,
    PriceCategory,
};

const BOROUGHS: [(&str, f64); 5] = [
    ("Manhattan", 2.5),
    ("Brooklyn", 1.6),
    ("Queens", 1.1),
    ("Bronx", 0.8),
    ("Staten Island", 0.9),
];

const TYPES: [&str; 4] = [
    "Condo for sale",
    "House for sale",
    "Co-op for sale",
    "Townhouse for sale",
];

/// Prices driven by floor area and borough, with deterministic jitter.
fn synthetic_listings(n: usize) -> Vec<Listing> {
    (0..n)
        .map(|i| {
            let (borough, factor) = BOROUGHS[i % BOROUGHS.len()];
            let beds = 1 + (i % 5) as i64;
            let sqft = 450.0 + 35.0 * ((i * 7) % 60) as f64 + 120.0 * beds as f64;
            let jitter = 1.0 + 0.04 * (((i * 13) % 11) as f64 - 5.0) / 5.0;
            let broker = if i % 9 == 0 {
                "Brokered by COMPASS".to_string()
            } else {
                format!("Brokered by Agency {}", i % 64)
            };
            Listing {
                brokertitle: broker,
                property_type: TYPES[(i / 3) % TYPES.len()].to_string(),
                beds,
                bath: 1.0 + (beds / 2) as f64,
                propertysqft: sqft,
                sublocality: borough.to_string(),
                price: 450.0 * sqft * factor * jitter,
            }
        })
        .collect()
}

fn scenario() -> FeatureRecord {
    FeatureRecord::new()
        .with("brokertitle", "Brokered by COMPASS")
        .with("type", "Condo for sale")
        .with("beds", 2)
        .with("bath", 1.0)
        .with("propertysqft", 800.0)
        .with("sublocality", "Manhattan")
}

fn quick_config() -> TrainingConfig {
    TrainingConfig {
        boosting: BoostingConfig {
            n_estimators: 30,
            max_depth: 4,
            ..BoostingConfig::default()
        },
        ..TrainingConfig::default()
    }
}

#[test]
fn test_train_save_load_predict() {
    let listings = synthetic_listings(400);
    let split = stratified_split(&listings, SplitConfig::default()).unwrap();

    let mut folds_seen = 0;
    let outcome = train(&split, &quick_config(), |done, total| {
        folds_seen = done;
        assert_eq!(total, 5);
    })
    .unwrap();
    assert_eq!(folds_seen, 5);
    assert_eq!(outcome.cv_scores.len(), 5);
    assert!(outcome.validation.r2.is_finite());
    assert!(outcome.validation.r2 > 0.5, "validation r2 {}", outcome.validation.r2);

    // More than 50 distinct brokers, so the broker column is frequency encoded
    let plan = outcome.pipeline.preprocessor().plan().unwrap();
    assert_eq!(plan.high_cardinality, vec!["brokertitle"]);

    let dir = tempfile::tempdir().unwrap();
    let paths = save_outcome(&outcome, dir.path()).unwrap();
    assert!(paths.model.exists());
    assert!(paths.metadata.exists());
    assert_eq!(ModelPaths::latest(dir.path()).unwrap(), Some(paths.clone()));

    let handle = ModelHandle::open(paths, LoadOptions::default());
    let model = handle.current().expect("model should load");
    assert_eq!(model.metadata(), &outcome.metadata);

    let price = model.predict(&scenario()).unwrap();
    assert!(price.is_finite() && price > 0.0, "price {price}");
    assert!(matches!(
        model.pipeline().categorize(price),
        PriceCategory::BudgetFriendly | PriceCategory::MidRange | PriceCategory::Luxury
    ));

    // Deterministic, and the cached path agrees with the uncached one
    assert_eq!(model.predict(&scenario()).unwrap(), price);
    assert_eq!(model.pipeline().predict(&scenario()).unwrap(), price);
}

#[test]
fn test_batch_equals_single_after_reload() {
    let listings = synthetic_listings(300);
    let split = stratified_split(&listings, SplitConfig::default()).unwrap();
    let outcome = train(&split, &quick_config(), |_, _| {}).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let paths = save_outcome(&outcome, dir.path()).unwrap();
    let handle = ModelHandle::open(paths, LoadOptions::default());
    let before = handle.current().unwrap();
    let reloaded = handle.reload().unwrap();
    assert!(reloaded.generation() > before.generation());

    let records: Vec<FeatureRecord> = ["Manhattan", "Queens", "Bronx", "Unknown Borough"]
        .into_iter()
        .enumerate()
        .map(|(i, borough)| {
            scenario()
                .with("sublocality", borough)
                .with("propertysqft", 600.0 + 250.0 * i as f64)
                .with("brokertitle", format!("Never Seen Broker {i}"))
        })
        .collect();

    let batch = reloaded.pipeline().batch_predict(&records).unwrap();
    assert_eq!(batch.len(), records.len());
    for (record, price) in records.iter().zip(&batch) {
        let single = before.pipeline().predict(record).unwrap();
        assert!((single - price).abs() <= 1e-6 * price.abs().max(1.0));
    }
}

#[test]
fn test_missing_features_rejected_before_inference() {
    let listings = synthetic_listings(200);
    let split = stratified_split(&listings, SplitConfig::default()).unwrap();
    let outcome = train(&split, &quick_config(), |_, _| {}).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let handle = ModelHandle::open(save_outcome(&outcome, dir.path()).unwrap(), LoadOptions::default());
    let model = handle.current().unwrap();

    let mut partial = FeatureRecord::new();
    for name in ["brokertitle", "type", "propertysqft", "sublocality"] {
        partial.insert(name, "x");
    }
    match model.predict(&partial) {
        Err(PredictionError::MissingFeatures(err)) => {
            assert_eq!(err.missing, vec!["beds", "bath"]);
        }
        other => panic!("expected MissingFeatures, got {other:?}"),
    }
}
