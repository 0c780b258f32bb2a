//! Property listings.
//!
//! Reads the raw listings CSV, keeping only the six model features and the
//! price. Header names are matched case-insensitively. Rows with an empty or
//! unparseable field are dropped, which is the whole of the missing-value
//! handling.

use crate::error::{DataError, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::path::Path;

/// Model input columns, in training order.
pub const FEATURE_COLUMNS: [&str; 6] = [
    "brokertitle",
    "type",
    "beds",
    "bath",
    "propertysqft",
    "sublocality",
];

/// Categorical feature columns.
pub const CATEGORICAL_FEATURES: [&str; 3] = ["brokertitle", "type", "sublocality"];

/// Numeric feature columns.
pub const NUMERICAL_FEATURES: [&str; 3] = ["beds", "bath", "propertysqft"];

/// Target column.
pub const TARGET_COLUMN: &str = "price";

/// A single property listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    /// Listing broker, e.g. "Brokered by COMPASS"
    pub brokertitle: String,
    /// Property type, e.g. "Condo for sale"
    #[serde(rename = "type")]
    pub property_type: String,
    /// Bedroom count
    pub beds: i64,
    /// Bathroom count
    pub bath: f64,
    /// Floor area in square feet
    pub propertysqft: f64,
    /// Borough or sublocality
    pub sublocality: String,
    /// Asking price in dollars
    pub price: f64,
}

/// Listings read from a file along with how many rows were discarded
#[derive(Debug, Clone, Default)]
pub struct ListingSet {
    /// Complete rows
    pub listings: Vec<Listing>,
    /// Rows read from the source
    pub rows_read: usize,
    /// Rows dropped for missing or malformed fields
    pub rows_dropped: usize,
}

/// Load listings from a CSV file.
pub fn load_listings(path: impl AsRef<Path>) -> Result<ListingSet> {
    let path = path.as_ref();
    tracing::info!(path = %path.display(), "loading listings");
    let file = std::fs::File::open(path)?;
    read_listings(file)
}

/// Read listings from any CSV source.
pub fn read_listings<R: Read>(reader: R) -> Result<ListingSet> {
    let mut rdr = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
    let headers: Vec<String> = rdr
        .headers()?
        .iter()
        .map(|h| h.trim().to_lowercase())
        .collect();

    let index_of = |name: &str| {
        headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| DataError::MissingColumn(name.to_uppercase()))
    };
    let columns = ColumnIndex {
        brokertitle: index_of("brokertitle")?,
        property_type: index_of("type")?,
        beds: index_of("beds")?,
        bath: index_of("bath")?,
        propertysqft: index_of("propertysqft")?,
        sublocality: index_of("sublocality")?,
        price: index_of(TARGET_COLUMN)?,
    };

    let mut set = ListingSet::default();
    for record in rdr.records() {
        let record = record?;
        set.rows_read += 1;
        match columns.parse(&record) {
            Some(listing) => set.listings.push(listing),
            None => set.rows_dropped += 1,
        }
    }

    tracing::info!(
        rows = set.rows_read,
        dropped = set.rows_dropped,
        "read listings"
    );
    Ok(set)
}

/// Read any CSV into a frame of string columns.
///
/// Headers are trimmed and lowercased; empty cells and short rows become
/// nulls. Used for batch prediction input, where the encoders cast each
/// column to the type they need.
pub fn read_feature_frame<R: Read>(reader: R) -> Result<DataFrame> {
    let mut rdr = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
    let headers: Vec<String> = rdr
        .headers()?
        .iter()
        .map(|h| h.trim().to_lowercase())
        .collect();

    let mut columns: Vec<Vec<Option<String>>> = vec![Vec::new(); headers.len()];
    for record in rdr.records() {
        let record = record?;
        for (idx, values) in columns.iter_mut().enumerate() {
            let cell = record
                .get(idx)
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_owned);
            values.push(cell);
        }
    }

    let df = DataFrame::new(
        headers
            .iter()
            .zip(columns)
            .map(|(name, values)| Series::new(name.as_str().into(), values).into())
            .collect(),
    )?;
    Ok(df)
}

/// Header positions of the columns we keep
struct ColumnIndex {
    brokertitle: usize,
    property_type: usize,
    beds: usize,
    bath: usize,
    propertysqft: usize,
    sublocality: usize,
    price: usize,
}

impl ColumnIndex {
    fn parse(&self, record: &csv::StringRecord) -> Option<Listing> {
        let text = |idx: usize| {
            record
                .get(idx)
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_owned)
        };
        let number = |idx: usize| {
            record
                .get(idx)
                .and_then(|v| v.trim().parse::<f64>().ok())
                .filter(|v| v.is_finite())
        };

        let beds = number(self.beds)?;
        if beds.fract() != 0.0 {
            return None;
        }

        Some(Listing {
            brokertitle: text(self.brokertitle)?,
            property_type: text(self.property_type)?,
            beds: beds as i64,
            bath: number(self.bath)?,
            propertysqft: number(self.propertysqft)?,
            sublocality: text(self.sublocality)?,
            price: number(self.price)?,
        })
    }
}

impl Listing {
    /// Build a frame of the six feature columns, in training order.
    pub fn features_frame(listings: &[Self]) -> Result<DataFrame> {
        let df = DataFrame::new(vec![
            Series::new(
                "brokertitle".into(),
                listings.iter().map(|l| l.brokertitle.as_str()).collect::<Vec<_>>(),
            )
            .into(),
            Series::new(
                "type".into(),
                listings.iter().map(|l| l.property_type.as_str()).collect::<Vec<_>>(),
            )
            .into(),
            Series::new("beds".into(), listings.iter().map(|l| l.beds).collect::<Vec<_>>()).into(),
            Series::new("bath".into(), listings.iter().map(|l| l.bath).collect::<Vec<_>>()).into(),
            Series::new(
                "propertysqft".into(),
                listings.iter().map(|l| l.propertysqft).collect::<Vec<_>>(),
            )
            .into(),
            Series::new(
                "sublocality".into(),
                listings.iter().map(|l| l.sublocality.as_str()).collect::<Vec<_>>(),
            )
            .into(),
        ])?;
        Ok(df)
    }

    /// Prices, in listing order.
    pub fn prices(listings: &[Self]) -> Vec<f64> {
        listings.iter().map(|l| l.price).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RAW: &str = "\
BROKERTITLE,TYPE,PRICE,BEDS,BATH,PROPERTYSQFT,ADDRESS,SUBLOCALITY
Brokered by COMPASS,Condo for sale,995000,2,1,800,1 Main St,Manhattan
Brokered by Serhant,House for sale,1250000,4,2.373,2184.2,2 Oak Ave,Brooklyn
Brokered by Serhant,House for sale,,3,2,1400,3 Elm St,Queens
Brokered by RE MAX Edge,Co-op for sale,315000,1,1,abc,4 Pine Rd,Bronx County
";

    #[test]
    fn test_read_listings_drops_incomplete_rows() {
        let set = read_listings(RAW.as_bytes()).unwrap();
        assert_eq!(set.rows_read, 4);
        assert_eq!(set.rows_dropped, 2);
        assert_eq!(set.listings.len(), 2);

        let first = &set.listings[0];
        assert_eq!(first.brokertitle, "Brokered by COMPASS");
        assert_eq!(first.property_type, "Condo for sale");
        assert_eq!(first.beds, 2);
        assert_eq!(first.price, 995_000.0);
        assert_eq!(first.sublocality, "Manhattan");
    }

    #[test]
    fn test_missing_column() {
        let raw = "BROKERTITLE,TYPE,BEDS\nA,B,1\n";
        match read_listings(raw.as_bytes()) {
            Err(DataError::MissingColumn(name)) => assert_eq!(name, "BATH"),
            other => panic!("expected MissingColumn, got {other:?}"),
        }
    }

    #[test]
    fn test_features_frame_column_order() {
        let set = read_listings(RAW.as_bytes()).unwrap();
        let df = Listing::features_frame(&set.listings).unwrap();

        assert_eq!(df.height(), 2);
        let names: Vec<String> = df
            .get_column_names()
            .into_iter()
            .map(|n| n.to_string())
            .collect();
        assert_eq!(names, FEATURE_COLUMNS);
        assert_eq!(Listing::prices(&set.listings), vec![995_000.0, 1_250_000.0]);
    }

    #[test]
    fn test_read_feature_frame_keeps_every_column_as_text() {
        let df = read_feature_frame(RAW.as_bytes()).unwrap();
        assert_eq!(df.height(), 4);
        assert_eq!(df.width(), 8);
        assert_eq!(df.column("beds").unwrap().dtype(), &DataType::String);

        let price = df.column("price").unwrap();
        assert_eq!(price.null_count(), 1);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("listings.csv");
        std::fs::write(&path, RAW).unwrap();

        let set = load_listings(&path).unwrap();
        assert_eq!(set.listings.len(), 2);
    }
}
