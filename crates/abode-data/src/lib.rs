#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/abode/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod clean;
pub mod error;
pub mod listing;
pub mod split;

pub use clean::{CleaningConfig, CleaningReport, quantile, remove_outliers};
pub use error::{DataError, Result};
pub use listing::{
    CATEGORICAL_FEATURES, FEATURE_COLUMNS, Listing, ListingSet, NUMERICAL_FEATURES, TARGET_COLUMN,
    load_listings, read_feature_frame, read_listings,
};
pub use split::{DatasetSplit, SplitConfig, Strata, price_strata, stratified_split, type_strata};

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
