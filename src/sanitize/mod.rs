//! Data Sanitization
//!
//! Numerical validation utilities shared by the aggregator and the scorer.
//!
//! Functions:
//! - Distribution validation
//! - Compensated (Neumaier) summation

use crate::error::{CalibrationError, DistributionRole, Result};

/// Checks that `values` is a probability vector: non-empty, finite,
/// non-negative and summing to 1 within `tolerance`.
pub fn validate_distribution(
    values: &[f64],
    which: DistributionRole,
    tolerance: f64,
) -> Result<()> {
    let invalid = |reason: String| CalibrationError::InvalidDistribution { which, reason };

    if values.is_empty() {
        return Err(invalid("no categories".to_string()));
    }

    if let Some((c, v)) = values
        .iter()
        .enumerate()
        .find(|(_, v)| v.is_nan() || v.is_infinite() || **v < 0.0)
    {
        return Err(invalid(format!("entry {c} is {v}")));
    }

    let total = stable_sum(values);
    if !total.is_finite() || (total - 1.0).abs() > tolerance {
        return Err(invalid(format!("sums to {total}")));
    }

    Ok(())
}

/// Neumaier compensated accumulator.
#[derive(Debug, Clone, Copy, Default)]
pub struct CompensatedSum {
    sum: f64,
    compensation: f64,
}

impl CompensatedSum {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, value: f64) {
        let t = self.sum + value;
        if self.sum.abs() >= value.abs() {
            self.compensation += (self.sum - t) + value;
        } else {
            self.compensation += (value - t) + self.sum;
        }
        self.sum = t;
    }

    /// Compensated total. An overflowed sum is returned as is, since its
    /// compensation term is no longer meaningful.
    pub fn value(&self) -> f64 {
        if !self.sum.is_finite() {
            return self.sum;
        }
        self.sum + self.compensation
    }
}

/// Sum of `values` with Neumaier compensation.
pub fn stable_sum(values: &[f64]) -> f64 {
    let mut acc = CompensatedSum::new();
    for &v in values {
        acc.add(v);
    }
    acc.value()
}
