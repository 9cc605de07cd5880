//! Divergence Scorer
//!
//! Smoothed Kullback-Leibler divergence of a recommended-item category
//! distribution `q` from a historical-interaction distribution `p`, in bits.
//!
//! Plain KL is infinite wherever `q(c) = 0 < p(c)`. `q` is therefore blended
//! toward `p` before the ratio is taken:
//!
//! `q~(c) = (1 - alpha) * q(c) + alpha * p(c)`
//!
//! which is strictly positive on the support of `p` for any `alpha > 0`.
//! Since `q~(c) >= alpha * p(c)`, each log-ratio is at most `log2(1 / alpha)`;
//! that bound is applied explicitly so an underflowed `alpha * p(c)` on a
//! subnormal `p(c)` cannot produce an infinite term.
//! Categories outside the support of `p` contribute exactly zero
//! (`0 * log(0 / a) = 0`) and are skipped by an explicit branch.
//!
//! The score is deliberately asymmetric: `score(p, q) != score(q, p)` in general.

use serde::{Deserialize, Serialize};

use crate::error::{CalibrationError, Result};
use crate::sanitize::{validate_distribution, CompensatedSum};
use crate::types::{DEFAULT_SMOOTHING, DISTRIBUTION_TOLERANCE};

/// Validated smoothing parameter, strictly inside `(0, 1)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Smoothing(f64);

impl Smoothing {
    pub fn new(alpha: f64) -> Result<Self> {
        // NaN fails both comparisons
        if alpha > 0.0 && alpha < 1.0 {
            Ok(Self(alpha))
        } else {
            Err(CalibrationError::InvalidSmoothingParameter(alpha))
        }
    }

    pub fn value(&self) -> f64 {
        self.0
    }

    /// Upper bound of `log2(p_c / q~_c)`.
    #[inline]
    pub fn max_log_ratio(&self) -> f64 {
        -self.0.log2()
    }

    /// Blend of `q_c` toward `p_c`.
    #[inline]
    pub fn blend(&self, p_c: f64, q_c: f64) -> f64 {
        if q_c == p_c {
            return p_c;
        }
        (1.0 - self.0) * q_c + self.0 * p_c
    }
}

impl Default for Smoothing {
    fn default() -> Self {
        Self(DEFAULT_SMOOTHING)
    }
}

impl TryFrom<f64> for Smoothing {
    type Error = CalibrationError;

    fn try_from(alpha: f64) -> Result<Self> {
        Self::new(alpha)
    }
}

impl From<Smoothing> for f64 {
    fn from(s: Smoothing) -> f64 {
        s.0
    }
}

/// Miscalibration score of `q` against `p` with smoothing `alpha`.
///
/// ```
/// use miscalibration::miscalibration;
///
/// let score = miscalibration(&[1.0, 0.0, 0.0], &[0.0, 1.0, 0.0], 0.01).unwrap();
/// assert!((score - 100f64.log2()).abs() < 1e-9);
/// ```
pub fn miscalibration(p: &[f64], q: &[f64], alpha: f64) -> Result<f64> {
    check_dimensions(p, q)?;
    let smoothing = Smoothing::new(alpha)?;
    miscalibration_with(p, q, smoothing)
}

/// Same as [`miscalibration`] with an already validated smoothing parameter.
pub fn miscalibration_with(p: &[f64], q: &[f64], smoothing: Smoothing) -> Result<f64> {
    validate_pair(p, q)?;

    let bound = smoothing.max_log_ratio();
    let mut total = CompensatedSum::new();
    for (&p_c, &q_c) in p.iter().zip(q) {
        if p_c > 0.0 {
            let q_smoothed = smoothing.blend(p_c, q_c);
            // log2(0) = -inf when alpha * p_c underflows; min() caps it
            let log_ratio = (p_c.log2() - q_smoothed.log2()).min(bound);
            total.add(p_c * log_ratio);
        }
    }

    Ok(clamp_rounding(total.value()))
}

/// The smoothed candidate distribution `q~`.
pub fn smoothed(p: &[f64], q: &[f64], alpha: f64) -> Result<Vec<f64>> {
    check_dimensions(p, q)?;
    let smoothing = Smoothing::new(alpha)?;
    validate_pair(p, q)?;

    Ok(p.iter()
        .zip(q)
        .map(|(&p_c, &q_c)| smoothing.blend(p_c, q_c))
        .collect())
}

/// Unsmoothed KL divergence of `q` from `p` in bits.
///
/// Returns `f64::INFINITY` when `q(c) = 0` for some `c` with `p(c) > 0`.
pub fn kl_divergence(p: &[f64], q: &[f64]) -> Result<f64> {
    check_dimensions(p, q)?;
    validate_pair(p, q)?;

    let mut total = CompensatedSum::new();
    for (&p_c, &q_c) in p.iter().zip(q) {
        if p_c > 0.0 {
            if q_c == 0.0 {
                return Ok(f64::INFINITY);
            }
            total.add(p_c * (p_c.log2() - q_c.log2()));
        }
    }

    Ok(clamp_rounding(total.value()))
}

/// Lifts small negative rounding error to 0. Unlike `f64::max`, a NaN is
/// passed through rather than reported as a perfect score.
fn clamp_rounding(score: f64) -> f64 {
    if score < 0.0 {
        0.0
    } else {
        score
    }
}

fn check_dimensions(p: &[f64], q: &[f64]) -> Result<()> {
    if p.len() != q.len() {
        return Err(CalibrationError::DimensionMismatch {
            expected: p.len(),
            actual: q.len(),
        });
    }
    Ok(())
}

fn validate_pair(p: &[f64], q: &[f64]) -> Result<()> {
    check_dimensions(p, q)?;
    validate_distribution(p, "historical", DISTRIBUTION_TOLERANCE)?;
    validate_distribution(q, "recommended", DISTRIBUTION_TOLERANCE)
}
