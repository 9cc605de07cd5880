//! Evaluation Configuration
//!
//! Run settings for a calibration evaluation: smoothing, item id base and
//! the weighting scheme of each side. Loaded from defaults, JSON or the
//! `MISCAL_SMOOTHING` / `MISCAL_INDEX_BASE` environment variables.

use serde::{Deserialize, Serialize};

use crate::divergence::Smoothing;
use crate::error::{CalibrationError, Result};
use crate::types::{IndexBase, DEFAULT_SMOOTHING};
use crate::weighting::WeightingScheme;

/// Evaluation run settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    /// Smoothing alpha in (0, 1)
    pub smoothing: f64,
    /// Row convention of external item identifiers
    pub index_base: IndexBase,
    /// Weighting applied to a user's interaction history
    pub history_weighting: WeightingScheme,
    /// Weighting applied to a user's recommendation list
    pub recommendation_weighting: WeightingScheme,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            smoothing: DEFAULT_SMOOTHING,
            index_base: IndexBase::Zero,
            history_weighting: WeightingScheme::Uniform,
            recommendation_weighting: WeightingScheme::Uniform,
        }
    }
}

impl CalibrationConfig {
    /// Defaults overridden by `MISCAL_SMOOTHING` and `MISCAL_INDEX_BASE`.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let smoothing = std::env::var("MISCAL_SMOOTHING")
            .ok()
            .and_then(|value| value.trim().parse::<f64>().ok())
            .unwrap_or(defaults.smoothing);

        let index_base = std::env::var("MISCAL_INDEX_BASE")
            .ok()
            .and_then(|value| IndexBase::parse(&value))
            .unwrap_or(defaults.index_base);

        Self {
            smoothing,
            index_base,
            ..defaults
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| CalibrationError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        Smoothing::new(self.smoothing)?;
        self.history_weighting.validate()?;
        self.recommendation_weighting.validate()
    }

    pub fn smoothing(&self) -> Result<Smoothing> {
        Smoothing::new(self.smoothing)
    }
}
