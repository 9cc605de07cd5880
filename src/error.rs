use thiserror::Error;

use crate::types::ItemId;

/// Which side of a divergence call an invalid distribution came from.
pub type DistributionRole = &'static str;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CalibrationError {
    #[error("item set is empty")]
    EmptyItemSet,

    #[error("item {item} does not reference a matrix row (matrix has {item_count} items)")]
    InvalidItemReference { item: ItemId, item_count: usize },

    #[error("degenerate weights: {0}")]
    DegenerateWeights(String),

    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("invalid {which} distribution: {reason}")]
    InvalidDistribution {
        which: DistributionRole,
        reason: String,
    },

    #[error("smoothing parameter must lie strictly between 0 and 1, got {0}")]
    InvalidSmoothingParameter(f64),

    #[error("item-category matrix has no rows or no categories")]
    EmptyMatrix,

    #[error("matrix row {row} has {actual} columns, expected {expected}")]
    RaggedMatrix {
        row: usize,
        expected: usize,
        actual: usize,
    },

    #[error("invalid membership weight {value} at row {row}, column {column}")]
    InvalidMembership { row: usize, column: usize, value: f64 },

    #[error("matrix row {row} has no category membership")]
    ZeroMembershipRow { row: usize },

    #[error("invalid config: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, CalibrationError>;
