//! Category-Distribution Aggregator
//!
//! Turns a weighted item set into the set's category distribution:
//!
//! `dist[c] = sum(w * P[i][c]) / sum(w)`
//!
//! Per-category sums are accumulated with Neumaier compensation, so long
//! histories do not drift away from a unit total.

use crate::error::{CalibrationError, Result};
use crate::matrix::CategoryMatrix;
use crate::sanitize::CompensatedSum;
use crate::types::{CategoryDistribution, ItemId, WeightedItem};
use crate::weighting::{apply_weights, Uniform, WeightingStrategy};

/// Aggregates a weighted item set against `matrix`.
///
/// Fails with `EmptyItemSet`, `InvalidItemReference` or `DegenerateWeights`
/// before any arithmetic is done.
pub fn aggregate(items: &[WeightedItem], matrix: &CategoryMatrix) -> Result<CategoryDistribution> {
    if items.is_empty() {
        return Err(CalibrationError::EmptyItemSet);
    }

    let rows = items
        .iter()
        .map(|wi| matrix.item_row(wi.item))
        .collect::<Result<Vec<&[f64]>>>()?;

    let mut max_weight = 0.0f64;
    for (position, wi) in items.iter().enumerate() {
        if wi.weight.is_nan() || wi.weight.is_infinite() || wi.weight < 0.0 {
            return Err(CalibrationError::DegenerateWeights(format!(
                "weight {} at position {position} (item {})",
                wi.weight, wi.item
            )));
        }
        max_weight = max_weight.max(wi.weight);
    }
    if max_weight <= 0.0 {
        return Err(CalibrationError::DegenerateWeights(
            "weights sum to 0".to_string(),
        ));
    }

    // weights are rescaled into [0, 1] so the total cannot overflow
    let mut total_weight = CompensatedSum::new();
    let mut acc = vec![CompensatedSum::new(); matrix.category_count()];
    for (row, wi) in rows.iter().zip(items) {
        if wi.weight == 0.0 {
            continue;
        }
        let w = wi.weight / max_weight;
        total_weight.add(w);
        for (slot, &p) in acc.iter_mut().zip(row.iter()) {
            slot.add(w * p);
        }
    }
    let total_weight = total_weight.value();

    let values = acc.iter().map(|s| s.value() / total_weight).collect();
    Ok(CategoryDistribution::from_normalized(values))
}

/// Weights `items` with `strategy`, then aggregates.
pub fn aggregate_with(
    items: &[ItemId],
    strategy: &dyn WeightingStrategy,
    matrix: &CategoryMatrix,
) -> Result<CategoryDistribution> {
    aggregate(&apply_weights(items, strategy), matrix)
}

/// Uniform-weight baseline.
pub fn aggregate_uniform(items: &[ItemId], matrix: &CategoryMatrix) -> Result<CategoryDistribution> {
    aggregate_with(items, &Uniform, matrix)
}
