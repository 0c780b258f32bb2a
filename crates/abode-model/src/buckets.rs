//! Price categories.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Coarse price tier shown next to a prediction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PriceCategory {
    /// Below the budget ceiling
    #[serde(rename = "Budget-Friendly")]
    BudgetFriendly,
    /// Between the two thresholds
    #[serde(rename = "Mid-Range")]
    MidRange,
    /// At or above the luxury floor
    #[serde(rename = "Luxury")]
    Luxury,
}

impl PriceCategory {
    /// Human-readable label.
    pub const fn label(self) -> &'static str {
        match self {
            Self::BudgetFriendly => "Budget-Friendly",
            Self::MidRange => "Mid-Range",
            Self::Luxury => "Luxury",
        }
    }
}

impl fmt::Display for PriceCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Thresholds were not strictly increasing or not finite
#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
#[error("Invalid price buckets: budget ceiling {budget} must be below luxury floor {luxury}")]
pub struct InvalidBuckets {
    /// Budget ceiling supplied
    pub budget: f64,
    /// Luxury floor supplied
    pub luxury: f64,
}

/// Category thresholds in dollars
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawBuckets", into = "RawBuckets")]
pub struct PriceBuckets {
    budget_ceiling: f64,
    luxury_floor: f64,
}

#[derive(Serialize, Deserialize)]
struct RawBuckets {
    budget_ceiling: f64,
    luxury_floor: f64,
}

impl TryFrom<RawBuckets> for PriceBuckets {
    type Error = InvalidBuckets;

    fn try_from(raw: RawBuckets) -> Result<Self, Self::Error> {
        Self::new(raw.budget_ceiling, raw.luxury_floor)
    }
}

impl From<PriceBuckets> for RawBuckets {
    fn from(b: PriceBuckets) -> Self {
        Self {
            budget_ceiling: b.budget_ceiling,
            luxury_floor: b.luxury_floor,
        }
    }
}

impl Default for PriceBuckets {
    fn default() -> Self {
        Self {
            budget_ceiling: 400_000.0,
            luxury_floor: 2_000_000.0,
        }
    }
}

impl PriceBuckets {
    /// Build buckets; `budget_ceiling` must be strictly below `luxury_floor`.
    pub fn new(budget_ceiling: f64, luxury_floor: f64) -> Result<Self, InvalidBuckets> {
        if budget_ceiling.is_finite() && luxury_floor.is_finite() && budget_ceiling < luxury_floor {
            Ok(Self {
                budget_ceiling,
                luxury_floor,
            })
        } else {
            Err(InvalidBuckets {
                budget: budget_ceiling,
                luxury: luxury_floor,
            })
        }
    }

    /// Upper bound (exclusive) of the budget tier.
    pub const fn budget_ceiling(&self) -> f64 {
        self.budget_ceiling
    }

    /// Lower bound (inclusive) of the luxury tier.
    pub const fn luxury_floor(&self) -> f64 {
        self.luxury_floor
    }

    /// Tier for `price`.
    pub fn categorize(&self, price: f64) -> PriceCategory {
        if price < self.budget_ceiling {
            PriceCategory::BudgetFriendly
        } else if price >= self.luxury_floor {
            PriceCategory::Luxury
        } else {
            PriceCategory::MidRange
        }
    }
}
