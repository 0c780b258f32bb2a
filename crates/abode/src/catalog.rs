//! Feature choices offered to clients.
//!
//! These lists seed dropdowns and CLI help. They are suggestions only: the
//! model accepts any text for the categorical fields and frequency encodes
//! or one-hot encodes what it has seen.

use serde::{Deserialize, Serialize};

/// Feature names a request must carry, in training order.
pub const EXPECTED_FEATURES: [&str; 6] = abode_data::FEATURE_COLUMNS;

/// Listing types seen in the training data.
pub const PROPERTY_TYPES: [&str; 10] = [
    "Condo for sale",
    "House for sale",
    "Co-op for sale",
    "Multi-family home for sale",
    "Townhouse for sale",
    "Pending",
    "Contingent",
    "Land for sale",
    "For sale",
    "Foreclosure",
];

/// Boroughs and county names used as sublocality.
pub const SUBLOCALITIES: [&str; 11] = [
    "Manhattan",
    "Brooklyn",
    "Queens",
    "Bronx County",
    "Staten Island",
    "New York",
    "Kings County",
    "Queens County",
    "Richmond County",
    "New York County",
    "The Bronx",
];

/// Frequent brokers.
pub const BROKER_OPTIONS: [&str; 10] = [
    "Brokered by COMPASS",
    "Brokered by Douglas Elliman - 575 Madison Ave",
    "Brokered by Brown Harris Stevens",
    "Brokered by Corcoran East Side",
    "Brokered by RE MAX Edge",
    "Brokered by Winzone Realty Inc",
    "Brokered by E Realty International Corp",
    "Brokered by Sotheby's International Realty - East Side Manhattan Brokerage",
    "Brokered by RE MAX Real Estate Professionals",
    "Brokered by Serhant",
];

/// Choice lists for the categorical features
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureOptions {
    /// Values for `type`
    pub property_types: Vec<String>,
    /// Values for `sublocality`
    pub sublocalities: Vec<String>,
    /// Values for `brokertitle`
    pub brokers: Vec<String>,
}

impl FeatureOptions {
    /// The built-in lists.
    pub fn standard() -> Self {
        let owned = |values: &[&str]| values.iter().map(|v| (*v).to_string()).collect();
        Self {
            property_types: owned(&PROPERTY_TYPES),
            sublocalities: owned(&SUBLOCALITIES),
            brokers: owned(&BROKER_OPTIONS),
        }
    }
}

impl Default for FeatureOptions {
    fn default() -> Self {
        Self::standard()
    }
}
