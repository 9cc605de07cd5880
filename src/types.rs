//! Common Types and Constants
//!
//! Shared data structures used across the aggregation and scoring modules.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::sanitize::validate_distribution;

// ==================== Constants ====================

/// Default smoothing parameter alpha for the divergence scorer
pub const DEFAULT_SMOOTHING: f64 = 0.01;

/// Tolerance on `|sum - 1|` accepted for scorer inputs
pub const DISTRIBUTION_TOLERANCE: f64 = 1e-6;

/// Tolerance on `|sum - 1|` guaranteed for aggregator outputs
pub const AGGREGATE_TOLERANCE: f64 = 1e-9;

// ==================== Items ====================

/// External item identifier.
pub type ItemId = u32;

/// How external item identifiers map onto matrix rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexBase {
    /// Identifier `k` addresses row `k`
    #[default]
    Zero,
    /// Identifier `k` addresses row `k - 1`; identifier 0 is invalid
    One,
}

impl IndexBase {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "0" | "zero" => Some(IndexBase::Zero),
            "1" | "one" => Some(IndexBase::One),
            _ => None,
        }
    }

    /// Row index for `item` in a matrix with `item_count` rows.
    pub fn row_of(&self, item: ItemId, item_count: usize) -> Option<usize> {
        let row = match self {
            IndexBase::Zero => item as usize,
            IndexBase::One => (item as usize).checked_sub(1)?,
        };
        (row < item_count).then_some(row)
    }
}

/// One entry of an item set: an item and its aggregation weight.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightedItem {
    pub item: ItemId,
    pub weight: f64,
}

impl WeightedItem {
    pub fn new(item: ItemId, weight: f64) -> Self {
        Self { item, weight }
    }

    /// Item with the baseline weight of 1.
    pub fn uniform(item: ItemId) -> Self {
        Self { item, weight: 1.0 }
    }
}

// ==================== Distributions ====================

/// Dense probability vector over the ordered category set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryDistribution {
    values: Vec<f64>,
}

impl CategoryDistribution {
    /// Validates that `values` is non-negative, finite and sums to 1.
    pub fn new(values: Vec<f64>) -> Result<Self> {
        validate_distribution(&values, "input", DISTRIBUTION_TOLERANCE)?;
        Ok(Self { values })
    }

    pub(crate) fn from_normalized(values: Vec<f64>) -> Self {
        Self { values }
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    pub fn into_vec(self) -> Vec<f64> {
        self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, category: usize) -> Option<f64> {
        self.values.get(category).copied()
    }

    pub fn total(&self) -> f64 {
        self.values.iter().sum()
    }

    /// Category indices carrying non-zero mass.
    pub fn support(&self) -> impl Iterator<Item = usize> + '_ {
        self.values
            .iter()
            .enumerate()
            .filter(|(_, &v)| v > 0.0)
            .map(|(c, _)| c)
    }

    /// The `k` heaviest categories, heaviest first; ties keep category order.
    pub fn top_categories(&self, k: usize) -> Vec<(usize, f64)> {
        let mut ranked: Vec<(usize, f64)> = self.values.iter().copied().enumerate().collect();
        ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        ranked.truncate(k);
        ranked
    }
}

impl AsRef<[f64]> for CategoryDistribution {
    fn as_ref(&self) -> &[f64] {
        &self.values
    }
}
