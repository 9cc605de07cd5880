//! Item-category matrix
//!
//! Takes the raw membership table `M` (rows = items, columns = categories)
//! from an external loader and derives the row-normalized matrix `P` once.
//! Storage is a flat row-major `Vec<f64>`; `P` is never mutated after
//! construction and is shared by reference with every aggregation call.

use serde::Serialize;
use tracing::info;

use crate::error::{CalibrationError, Result};
use crate::sanitize::stable_sum;
use crate::types::{CategoryDistribution, IndexBase, ItemId};

/// Row-normalized item-category probability matrix `P`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryMatrix {
    data: Vec<f64>,
    item_count: usize,
    category_count: usize,
    index_base: IndexBase,
    labels: Option<Vec<String>>,
}

impl CategoryMatrix {
    /// Builds `P` from membership rows.
    ///
    /// Every row must have the same length, finite non-negative entries and a
    /// non-zero sum. Rows are divided by their sum so each becomes a
    /// distribution over categories.
    pub fn from_memberships<R: AsRef<[f64]>>(rows: &[R], index_base: IndexBase) -> Result<Self> {
        let category_count = rows.first().map(|r| r.as_ref().len()).unwrap_or(0);
        if rows.is_empty() || category_count == 0 {
            return Err(CalibrationError::EmptyMatrix);
        }

        let mut data = Vec::with_capacity(rows.len() * category_count);
        for (i, row) in rows.iter().enumerate() {
            let row = row.as_ref();
            if row.len() != category_count {
                return Err(CalibrationError::RaggedMatrix {
                    row: i,
                    expected: category_count,
                    actual: row.len(),
                });
            }
            data.extend_from_slice(row);
        }

        Self::from_flat(data, category_count, index_base)
    }

    /// Builds `P` from a flat row-major membership buffer.
    pub fn from_flat(mut data: Vec<f64>, category_count: usize, index_base: IndexBase) -> Result<Self> {
        if data.is_empty() || category_count == 0 {
            return Err(CalibrationError::EmptyMatrix);
        }
        if data.len() % category_count != 0 {
            return Err(CalibrationError::RaggedMatrix {
                row: data.len() / category_count,
                expected: category_count,
                actual: data.len() % category_count,
            });
        }

        let item_count = data.len() / category_count;
        for (i, row) in data.chunks_exact_mut(category_count).enumerate() {
            normalize_row(row, i)?;
        }

        info!(
            items = item_count,
            categories = category_count,
            index_base = ?index_base,
            "category matrix normalized"
        );

        Ok(Self {
            data,
            item_count,
            category_count,
            index_base,
            labels: None,
        })
    }

    /// Attaches ordered category labels.
    pub fn with_labels<S: Into<String>>(mut self, labels: impl IntoIterator<Item = S>) -> Result<Self> {
        let labels: Vec<String> = labels.into_iter().map(Into::into).collect();
        if labels.len() != self.category_count {
            return Err(CalibrationError::DimensionMismatch {
                expected: self.category_count,
                actual: labels.len(),
            });
        }
        self.labels = Some(labels);
        Ok(self)
    }

    pub fn item_count(&self) -> usize {
        self.item_count
    }

    pub fn category_count(&self) -> usize {
        self.category_count
    }

    pub fn index_base(&self) -> IndexBase {
        self.index_base
    }

    pub fn labels(&self) -> Option<&[String]> {
        self.labels.as_deref()
    }

    /// Position of a category label.
    pub fn category_index(&self, label: &str) -> Option<usize> {
        self.labels.as_ref()?.iter().position(|l| l == label)
    }

    /// Row `row` of `P`, by storage position.
    pub fn row(&self, row: usize) -> Option<&[f64]> {
        (row < self.item_count)
            .then(|| &self.data[row * self.category_count..(row + 1) * self.category_count])
    }

    /// Storage row addressed by an external item identifier.
    pub fn row_index(&self, item: ItemId) -> Result<usize> {
        self.index_base
            .row_of(item, self.item_count)
            .ok_or(CalibrationError::InvalidItemReference {
                item,
                item_count: self.item_count,
            })
    }

    /// Category distribution of a single item.
    pub fn item_row(&self, item: ItemId) -> Result<&[f64]> {
        let row = self.row_index(item)?;
        let start = row * self.category_count;
        Ok(&self.data[start..start + self.category_count])
    }

    /// Pairs each category label with its mass in `dist`.
    pub fn labeled<'a>(&'a self, dist: &CategoryDistribution) -> Option<Vec<(&'a str, f64)>> {
        let labels = self.labels.as_ref()?;
        Some(
            labels
                .iter()
                .map(String::as_str)
                .zip(dist.as_slice().iter().copied())
                .collect(),
        )
    }
}

/// 行归一化: 每行除以行和
fn normalize_row(row: &mut [f64], index: usize) -> Result<()> {
    for (c, &v) in row.iter().enumerate() {
        if v.is_nan() || v.is_infinite() || v < 0.0 {
            return Err(CalibrationError::InvalidMembership {
                row: index,
                column: c,
                value: v,
            });
        }
    }

    let max = row.iter().copied().fold(0.0f64, f64::max);
    if max <= 0.0 {
        return Err(CalibrationError::ZeroMembershipRow { row: index });
    }

    // rescale into [0, 1] first so the row sum cannot overflow
    for v in row.iter_mut() {
        *v /= max;
    }
    let total = stable_sum(row);
    for v in row.iter_mut() {
        *v /= total;
    }
    Ok(())
}
