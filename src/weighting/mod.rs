//! Item Weighting Strategies
//!
//! The aggregator weights every item of a set before averaging category
//! rows. The weight comes from an injected strategy so callers can express
//! recency, popularity or list-rank preferences without touching the
//! aggregation arithmetic.
//!
//! Built-in strategies:
//! - `Uniform` - every item weighs 1 (baseline)
//! - `ReciprocalRank` - `1 / (rank + 1)` for ranked recommendation lists
//! - `LogDiscount` - DCG-style `1 / log2(rank + 2)`
//! - `RecencyDecay` - exponential half-life over a history ordered oldest to newest
//! - `Popularity` - per-item score raised to an exponent
//!
//! Any `Fn(usize, usize, ItemId) -> f64 + Send + Sync` closure is a strategy too.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{CalibrationError, Result};
use crate::types::{ItemId, WeightedItem};

/// Assigns an aggregation weight to an item from its position in the list.
pub trait WeightingStrategy: Send + Sync {
    /// Weight of `item` found at `position` (0-based) in a list of `len` items.
    fn weight(&self, position: usize, len: usize, item: ItemId) -> f64;

    fn name(&self) -> &str {
        "custom"
    }
}

impl<F> WeightingStrategy for F
where
    F: Fn(usize, usize, ItemId) -> f64 + Send + Sync,
{
    fn weight(&self, position: usize, len: usize, item: ItemId) -> f64 {
        self(position, len, item)
    }
}

/// Pairs every item with the weight `strategy` assigns it.
pub fn apply_weights(items: &[ItemId], strategy: &dyn WeightingStrategy) -> Vec<WeightedItem> {
    let len = items.len();
    items
        .iter()
        .enumerate()
        .map(|(position, &item)| WeightedItem::new(item, strategy.weight(position, len, item)))
        .collect()
}

// ==================== Built-in Strategies ====================

#[derive(Debug, Clone, Copy, Default)]
pub struct Uniform;

impl WeightingStrategy for Uniform {
    fn weight(&self, _position: usize, _len: usize, _item: ItemId) -> f64 {
        1.0
    }

    fn name(&self) -> &str {
        "uniform"
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ReciprocalRank;

impl WeightingStrategy for ReciprocalRank {
    fn weight(&self, position: usize, _len: usize, _item: ItemId) -> f64 {
        1.0 / (position as f64 + 1.0)
    }

    fn name(&self) -> &str {
        "reciprocal_rank"
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LogDiscount;

impl WeightingStrategy for LogDiscount {
    fn weight(&self, position: usize, _len: usize, _item: ItemId) -> f64 {
        1.0 / (position as f64 + 2.0).log2()
    }

    fn name(&self) -> &str {
        "log_discount"
    }
}

/// Exponential recency decay for a history ordered oldest to newest.
///
/// The newest item weighs 1; an item `half_life` positions older weighs 0.5.
#[derive(Debug, Clone, Copy)]
pub struct RecencyDecay {
    half_life: f64,
}

impl RecencyDecay {
    pub fn new(half_life: f64) -> Result<Self> {
        if !(half_life.is_finite() && half_life > 0.0) {
            return Err(CalibrationError::InvalidConfig(format!(
                "recency half-life must be positive and finite, got {half_life}"
            )));
        }
        Ok(Self { half_life })
    }

    pub fn half_life(&self) -> f64 {
        self.half_life
    }
}

impl WeightingStrategy for RecencyDecay {
    fn weight(&self, position: usize, len: usize, _item: ItemId) -> f64 {
        let age = len.saturating_sub(position + 1) as f64;
        0.5_f64.powf(age / self.half_life)
    }

    fn name(&self) -> &str {
        "recency_decay"
    }
}

/// Weight keyed by an externally supplied per-item popularity score.
///
/// A negative exponent down-weights popular items.
#[derive(Debug, Clone)]
pub struct Popularity {
    scores: HashMap<ItemId, f64>,
    exponent: f64,
    default_score: f64,
}

impl Popularity {
    pub fn new(scores: HashMap<ItemId, f64>, exponent: f64, default_score: f64) -> Self {
        Self {
            scores,
            exponent,
            default_score,
        }
    }
}

impl WeightingStrategy for Popularity {
    fn weight(&self, _position: usize, _len: usize, item: ItemId) -> f64 {
        let score = self.scores.get(&item).copied().unwrap_or(self.default_score);
        if score <= 0.0 {
            return 0.0;
        }
        score.powf(self.exponent)
    }

    fn name(&self) -> &str {
        "popularity"
    }
}

// ==================== Configurable Schemes ====================

/// Serializable selection of a built-in strategy.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WeightingScheme {
    #[default]
    Uniform,
    ReciprocalRank,
    LogDiscount,
    RecencyDecay { half_life: f64 },
}

impl WeightingScheme {
    pub fn validate(&self) -> Result<()> {
        if let WeightingScheme::RecencyDecay { half_life } = self {
            RecencyDecay::new(*half_life)?;
        }
        Ok(())
    }

    pub fn build(&self) -> Result<Box<dyn WeightingStrategy>> {
        Ok(match self {
            WeightingScheme::Uniform => Box::new(Uniform),
            WeightingScheme::ReciprocalRank => Box::new(ReciprocalRank),
            WeightingScheme::LogDiscount => Box::new(LogDiscount),
            WeightingScheme::RecencyDecay { half_life } => Box::new(RecencyDecay::new(*half_life)?),
        })
    }
}
