//! Train / validation / test splitting.
//!
//! The holdout is carved off first (`test_fraction` of all rows) and then
//! divided between validation and test. Each cut is stratified by price
//! decile so every partition sees the full price range. When some decile is
//! too small to divide, the cut is stratified by property type instead, and
//! failing that it is a plain shuffled split.

use crate::clean::quantile;
use crate::error::{DataError, Result};
use crate::listing::Listing;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Split configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SplitConfig {
    /// Share of rows held out from training (default: 0.2)
    pub test_fraction: f64,
    /// Share of the holdout assigned to the test set (default: 0.5)
    pub test_share_of_holdout: f64,
    /// Number of price quantile bins used as strata (default: 10)
    pub strata: usize,
    /// RNG seed (default: 42)
    pub seed: u64,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            test_fraction: 0.2,
            test_share_of_holdout: 0.5,
            strata: 10,
            seed: 42,
        }
    }
}

/// Row grouping used to stratify a cut
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Strata {
    /// Price quantile bins
    PriceDecile,
    /// Distinct property types
    PropertyType,
}

impl std::fmt::Display for Strata {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PriceDecile => f.write_str("price decile"),
            Self::PropertyType => f.write_str("property type"),
        }
    }
}

/// Partitioned listings
#[derive(Debug, Clone, Default)]
pub struct DatasetSplit {
    /// Training rows
    pub train: Vec<Listing>,
    /// Validation rows
    pub validation: Vec<Listing>,
    /// Test rows
    pub test: Vec<Listing>,
    /// Strata of the first cut, set only when both cuts were stratified
    pub stratified_by: Option<Strata>,
}

impl DatasetSplit {
    /// Whether both cuts were stratified.
    pub const fn is_stratified(&self) -> bool {
        self.stratified_by.is_some()
    }
}

/// Assign each price to a quantile bin.
///
/// Duplicate bin edges are merged. Returns `None` when fewer than two bins
/// remain, in which case stratifying is meaningless.
pub fn price_strata(prices: &[f64], bins: usize) -> Option<Vec<usize>> {
    if bins < 2 {
        return None;
    }
    let mut edges: Vec<f64> = (0..=bins)
        .filter_map(|i| quantile(prices, i as f64 / bins as f64))
        .collect();
    edges.dedup();
    if edges.len() < 3 {
        return None;
    }

    let inner = &edges[1..edges.len() - 1];
    Some(
        prices
            .iter()
            .map(|&p| inner.iter().filter(|&&edge| p > edge).count())
            .collect(),
    )
}

/// Assign each listing to its property type. Returns `None` for fewer than
/// two distinct types.
pub fn type_strata(listings: &[Listing]) -> Option<Vec<usize>> {
    let mut ids: BTreeMap<&str, usize> = BTreeMap::new();
    let strata: Vec<usize> = listings
        .iter()
        .map(|l| {
            let next = ids.len();
            *ids.entry(l.property_type.as_str()).or_insert(next)
        })
        .collect();
    (ids.len() >= 2).then_some(strata)
}

/// Split listings into train, validation and test sets.
pub fn stratified_split(listings: &[Listing], config: SplitConfig) -> Result<DatasetSplit> {
    for (name, value) in [
        ("test_fraction", config.test_fraction),
        ("test_share_of_holdout", config.test_share_of_holdout),
    ] {
        if !(value > 0.0 && value < 1.0) {
            return Err(DataError::InvalidParameter(format!(
                "{name} must be in (0, 1), got {value}"
            )));
        }
    }
    if listings.is_empty() {
        return Err(DataError::Empty { stage: "splitting" });
    }

    let mut rng = StdRng::seed_from_u64(config.seed);
    let candidates: Vec<(Strata, Vec<usize>)> = [
        price_strata(&Listing::prices(listings), config.strata).map(|s| (Strata::PriceDecile, s)),
        type_strata(listings).map(|s| (Strata::PropertyType, s)),
    ]
    .into_iter()
    .flatten()
    .collect();
    let all: Vec<usize> = (0..listings.len()).collect();

    let (train, holdout, first) = split_indices(all, &candidates, config.test_fraction, &mut rng);
    let (validation, test, second) = split_indices(
        holdout,
        &candidates,
        config.test_share_of_holdout,
        &mut rng,
    );

    let pick = |idx: &[usize]| idx.iter().map(|&i| listings[i].clone()).collect::<Vec<_>>();
    let split = DatasetSplit {
        train: pick(&train),
        validation: pick(&validation),
        test: pick(&test),
        stratified_by: second.and(first),
    };

    tracing::info!(
        train = split.train.len(),
        validation = split.validation.len(),
        test = split.test.len(),
        stratified_by = ?split.stratified_by,
        "split dataset"
    );
    Ok(split)
}

/// Returns `(kept, held_out, strata used)`. Candidates are tried in order;
/// the first whose every group holds two or more rows wins.
fn split_indices(
    mut indices: Vec<usize>,
    candidates: &[(Strata, Vec<usize>)],
    fraction: f64,
    rng: &mut StdRng,
) -> (Vec<usize>, Vec<usize>, Option<Strata>) {
    for (kind, strata) in candidates {
        let mut groups: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
        for &i in &indices {
            groups.entry(strata[i]).or_default().push(i);
        }
        if groups.values().all(|g| g.len() >= 2) {
            let mut kept = Vec::with_capacity(indices.len());
            let mut held = Vec::new();
            for mut group in groups.into_values() {
                group.shuffle(rng);
                let n_held = held_count(group.len(), fraction);
                held.extend_from_slice(&group[..n_held]);
                kept.extend_from_slice(&group[n_held..]);
            }
            kept.shuffle(rng);
            held.shuffle(rng);
            return (kept, held, Some(*kind));
        }
    }

    indices.shuffle(rng);
    let n_held = held_count(indices.len(), fraction);
    let kept = indices.split_off(n_held);
    (kept, indices, None)
}

/// At least one row on each side when there are two or more rows.
fn held_count(len: usize, fraction: f64) -> usize {
    let n = (len as f64 * fraction).round() as usize;
    if len >= 2 { n.clamp(1, len - 1) } else { n.min(len) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn listings(n: usize) -> Vec<Listing> {
        (0..n)
            .map(|i| Listing {
                brokertitle: format!("Broker {}", i % 7),
                property_type: "Condo for sale".to_string(),
                beds: 1 + (i % 4) as i64,
                bath: 1.0,
                propertysqft: 500.0 + i as f64,
                sublocality: "Manhattan".to_string(),
                price: 200_000.0 + 10_000.0 * i as f64,
            })
            .collect()
    }

    #[test]
    fn test_price_strata_deciles() {
        let prices: Vec<f64> = (1..=100).map(f64::from).collect();
        let strata = price_strata(&prices, 10).unwrap();
        assert_eq!(strata[0], 0);
        assert_eq!(strata[99], 9);
        assert_eq!(*strata.iter().max().unwrap(), 9);
    }

    #[test]
    fn test_price_strata_constant_prices() {
        assert!(price_strata(&[5.0; 20], 10).is_none());
    }

    #[rstest]
    #[case(200)]
    #[case(1000)]
    fn test_split_proportions(#[case] n: usize) {
        let split = stratified_split(&listings(n), SplitConfig::default()).unwrap();
        assert_eq!(split.stratified_by, Some(Strata::PriceDecile));
        assert_eq!(split.train.len() + split.validation.len() + split.test.len(), n);

        let train_share = split.train.len() as f64 / n as f64;
        assert!((train_share - 0.8).abs() < 0.02, "train share {train_share}");
        let diff = split.validation.len() as i64 - split.test.len() as i64;
        assert!(diff.abs() <= 10);
    }

    #[test]
    fn test_split_is_seeded() {
        let data = listings(300);
        let a = stratified_split(&data, SplitConfig::default()).unwrap();
        let b = stratified_split(&data, SplitConfig::default()).unwrap();
        assert_eq!(a.train, b.train);
        assert_eq!(a.test, b.test);

        let other = SplitConfig {
            seed: 7,
            ..SplitConfig::default()
        };
        let c = stratified_split(&data, other).unwrap();
        assert_ne!(a.train, c.train);
    }

    #[test]
    fn test_small_dataset_falls_back_to_plain_split() {
        let split = stratified_split(&listings(12), SplitConfig::default()).unwrap();
        assert!(!split.is_stratified());
        assert_eq!(split.train.len() + split.validation.len() + split.test.len(), 12);
        assert!(!split.validation.is_empty());
        assert!(!split.test.is_empty());
    }

    #[test]
    fn test_constant_prices_stratify_by_type() {
        let data: Vec<Listing> = listings(40)
            .into_iter()
            .enumerate()
            .map(|(i, l)| Listing {
                property_type: if i % 2 == 0 { "Condo for sale" } else { "House for sale" }
                    .to_string(),
                price: 750_000.0,
                ..l
            })
            .collect();
        let split = stratified_split(&data, SplitConfig::default()).unwrap();
        assert_eq!(split.stratified_by, Some(Strata::PropertyType));
        assert_eq!(split.train.len(), 32);

        let houses = split
            .test
            .iter()
            .filter(|l| l.property_type == "House for sale")
            .count();
        assert_eq!(houses * 2, split.test.len());
    }

    #[test]
    fn test_type_strata_needs_two_types() {
        assert!(type_strata(&listings(5)).is_none());
    }

    #[test]
    fn test_invalid_fraction() {
        let config = SplitConfig {
            test_fraction: 1.5,
            ..SplitConfig::default()
        };
        assert!(stratified_split(&listings(10), config).is_err());
        assert!(stratified_split(&[], SplitConfig::default()).is_err());
    }
}
