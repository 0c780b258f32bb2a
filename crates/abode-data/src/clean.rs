//! Outlier removal.
//!
//! Prices and floor areas are long-tailed. Listings outside the configured
//! percentile band are dropped, price first, then square footage on what
//! remains.

use crate::error::{DataError, Result};
use crate::listing::Listing;
use serde::{Deserialize, Serialize};

/// Percentile band used when trimming outliers
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CleaningConfig {
    /// Lower quantile, inclusive (default: 0.01)
    pub lower_quantile: f64,
    /// Upper quantile, inclusive (default: 0.99)
    pub upper_quantile: f64,
}

impl Default for CleaningConfig {
    fn default() -> Self {
        Self {
            lower_quantile: 0.01,
            upper_quantile: 0.99,
        }
    }
}

/// Result of outlier removal
#[derive(Debug, Clone)]
pub struct CleaningReport {
    /// Listings that survived both filters
    pub listings: Vec<Listing>,
    /// Row count before filtering
    pub initial_rows: usize,
    /// Row count after the price filter
    pub after_price: usize,
    /// Row count after the square-footage filter
    pub after_sqft: usize,
}

/// Quantile with linear interpolation between closest ranks.
///
/// Returns `None` for an empty slice. `q` is clamped to `[0, 1]`.
pub fn quantile(values: &[f64], q: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let weight = pos - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * weight)
}

/// Drop price and square-footage outliers.
pub fn remove_outliers(listings: Vec<Listing>, config: CleaningConfig) -> Result<CleaningReport> {
    if !(0.0..=1.0).contains(&config.lower_quantile)
        || !(0.0..=1.0).contains(&config.upper_quantile)
        || config.lower_quantile >= config.upper_quantile
    {
        return Err(DataError::InvalidParameter(format!(
            "quantile band [{}, {}] must satisfy 0 <= lower < upper <= 1",
            config.lower_quantile, config.upper_quantile
        )));
    }

    let initial_rows = listings.len();
    let by_price = filter_band(listings, config, |l| l.price);
    let after_price = by_price.len();
    let by_sqft = filter_band(by_price, config, |l| l.propertysqft);
    let after_sqft = by_sqft.len();

    if by_sqft.is_empty() {
        return Err(DataError::Empty {
            stage: "outlier removal",
        });
    }

    tracing::info!(initial_rows, after_price, after_sqft, "removed outliers");
    Ok(CleaningReport {
        listings: by_sqft,
        initial_rows,
        after_price,
        after_sqft,
    })
}

fn filter_band<F>(listings: Vec<Listing>, config: CleaningConfig, value: F) -> Vec<Listing>
where
    F: Fn(&Listing) -> f64,
{
    let values: Vec<f64> = listings.iter().map(&value).collect();
    let (Some(lo), Some(hi)) = (
        quantile(&values, config.lower_quantile),
        quantile(&values, config.upper_quantile),
    ) else {
        return listings;
    };
    listings
        .into_iter()
        .filter(|l| (lo..=hi).contains(&value(l)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn listing(price: f64, sqft: f64) -> Listing {
        Listing {
            brokertitle: "Brokered by COMPASS".to_string(),
            property_type: "Condo for sale".to_string(),
            beds: 2,
            bath: 1.0,
            propertysqft: sqft,
            sublocality: "Manhattan".to_string(),
            price,
        }
    }

    #[test]
    fn test_quantile_interpolates() {
        let values = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_relative_eq!(quantile(&values, 0.0).unwrap(), 1.0);
        assert_relative_eq!(quantile(&values, 0.5).unwrap(), 3.0);
        assert_relative_eq!(quantile(&values, 0.1).unwrap(), 1.4, epsilon = 1e-12);
        assert_relative_eq!(quantile(&[5.0, 1.0], 0.25).unwrap(), 2.0);
        assert!(quantile(&[], 0.5).is_none());
    }

    #[test]
    fn test_remove_outliers_trims_both_tails() {
        let mut listings: Vec<Listing> = (1..=98)
            .map(|i| listing(100_000.0 * i as f64, 500.0 + i as f64))
            .collect();
        listings.push(listing(1.0, 700.0));
        listings.push(listing(1e10, 700.0));

        let report = remove_outliers(listings, CleaningConfig::default()).unwrap();
        assert_eq!(report.initial_rows, 100);
        assert_eq!(report.after_price, 98);
        assert!(report.listings.iter().all(|l| l.price > 1.0 && l.price < 1e10));
        assert!(report.after_sqft <= report.after_price);
    }

    #[test]
    fn test_invalid_band() {
        let config = CleaningConfig {
            lower_quantile: 0.9,
            upper_quantile: 0.1,
        };
        assert!(remove_outliers(vec![listing(1.0, 1.0)], config).is_err());
    }
}
