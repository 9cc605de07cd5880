//! Per-user calibration evaluation
//!
//! For each user the evaluator aggregates the interaction history into `p`,
//! the recommendation list into `q`, and scores `q` against `p`. Users are
//! independent, so batches are scored in parallel with Rayon against the
//! shared read-only matrix.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::aggregate::{aggregate, aggregate_with};
use crate::config::CalibrationConfig;
use crate::divergence::{miscalibration_with, Smoothing};
use crate::error::{CalibrationError, Result};
use crate::matrix::CategoryMatrix;
use crate::types::{CategoryDistribution, ItemId, WeightedItem};
use crate::weighting::{Uniform, WeightingStrategy};

/// 用户的历史交互与推荐列表
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: u64,
    /// Interacted items, oldest first
    pub history: Vec<ItemId>,
    /// Recommended items, best rank first
    pub recommended: Vec<ItemId>,
}

/// Scoring result for one user
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UserCalibration {
    pub user_id: u64,
    /// Historical distribution `p`
    pub historical: CategoryDistribution,
    /// Recommended distribution `q`
    pub recommended: CategoryDistribution,
    /// Smoothed KL divergence of `q` from `p`, in bits
    pub miscalibration: f64,
}

/// Batch entry: a user and their own outcome.
#[derive(Clone, Debug, PartialEq)]
pub struct UserScore {
    pub user_id: u64,
    pub outcome: Result<UserCalibration>,
}

/// Statistics over the successfully scored users of a batch.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CalibrationSummary {
    pub users_scored: usize,
    pub users_failed: usize,
    pub mean: f64,
    pub median: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
}

/// Scores users against a shared, read-only category matrix.
///
/// Holds the smoothing parameter and one weighting strategy per side
/// (history and recommendations). The matrix is borrowed, so a single
/// evaluator can be shared across rayon workers by `score_users`.
///
/// ```
/// use miscalibration::{CalibrationEvaluator, CategoryMatrix, IndexBase, UserProfile};
///
/// let matrix = CategoryMatrix::from_memberships(
///     &[vec![1.0, 0.0], vec![0.0, 1.0]],
///     IndexBase::Zero,
/// )
/// .unwrap();
/// let evaluator = CalibrationEvaluator::new(&matrix);
/// let user = UserProfile { user_id: 1, history: vec![0, 1], recommended: vec![0] };
/// let result = evaluator.score_user(&user).unwrap();
/// assert!(result.miscalibration > 0.0);
/// ```
pub struct CalibrationEvaluator<'m> {
    matrix: &'m CategoryMatrix,
    smoothing: Smoothing,
    history_weighting: Box<dyn WeightingStrategy>,
    recommendation_weighting: Box<dyn WeightingStrategy>,
}

impl<'m> CalibrationEvaluator<'m> {
    /// Uniform weighting on both sides and the default smoothing.
    pub fn new(matrix: &'m CategoryMatrix) -> Self {
        Self {
            matrix,
            smoothing: Smoothing::default(),
            history_weighting: Box::new(Uniform),
            recommendation_weighting: Box::new(Uniform),
        }
    }

    pub fn from_config(matrix: &'m CategoryMatrix, config: &CalibrationConfig) -> Result<Self> {
        config.validate()?;
        if config.index_base != matrix.index_base() {
            return Err(CalibrationError::InvalidConfig(format!(
                "config expects {:?}-based item ids but the matrix was built {:?}-based",
                config.index_base,
                matrix.index_base()
            )));
        }

        Ok(Self {
            matrix,
            smoothing: config.smoothing()?,
            history_weighting: config.history_weighting.build()?,
            recommendation_weighting: config.recommendation_weighting.build()?,
        })
    }

    pub fn with_smoothing(mut self, smoothing: Smoothing) -> Self {
        self.smoothing = smoothing;
        self
    }

    pub fn with_history_weighting(mut self, strategy: impl WeightingStrategy + 'static) -> Self {
        self.history_weighting = Box::new(strategy);
        self
    }

    pub fn with_recommendation_weighting(
        mut self,
        strategy: impl WeightingStrategy + 'static,
    ) -> Self {
        self.recommendation_weighting = Box::new(strategy);
        self
    }

    pub fn smoothing(&self) -> Smoothing {
        self.smoothing
    }

    pub fn matrix(&self) -> &'m CategoryMatrix {
        self.matrix
    }

    /// Scores one user with the configured weighting strategies.
    pub fn score_user(&self, user: &UserProfile) -> Result<UserCalibration> {
        let historical = aggregate_with(&user.history, self.history_weighting.as_ref(), self.matrix)?;
        let recommended = aggregate_with(
            &user.recommended,
            self.recommendation_weighting.as_ref(),
            self.matrix,
        )?;
        self.finish(user.user_id, historical, recommended)
    }

    /// Scores one user from caller-weighted item sets.
    pub fn score_weighted(
        &self,
        user_id: u64,
        history: &[WeightedItem],
        recommended: &[WeightedItem],
    ) -> Result<UserCalibration> {
        let historical = aggregate(history, self.matrix)?;
        let recommended = aggregate(recommended, self.matrix)?;
        self.finish(user_id, historical, recommended)
    }

    fn finish(
        &self,
        user_id: u64,
        historical: CategoryDistribution,
        recommended: CategoryDistribution,
    ) -> Result<UserCalibration> {
        let miscalibration = miscalibration_with(
            historical.as_slice(),
            recommended.as_slice(),
            self.smoothing,
        )?;
        debug!(user_id, miscalibration, "user scored");

        Ok(UserCalibration {
            user_id,
            historical,
            recommended,
            miscalibration,
        })
    }

    /// Scores every user in parallel. Output order follows `users`.
    pub fn score_users(&self, users: &[UserProfile]) -> Vec<UserScore> {
        let scores: Vec<UserScore> = users
            .par_iter()
            .map(|user| {
                let outcome = self.score_user(user);
                if let Err(err) = &outcome {
                    warn!(user_id = user.user_id, error = %err, "user could not be scored");
                }
                UserScore {
                    user_id: user.user_id,
                    outcome,
                }
            })
            .collect();

        let summary = summarize(&scores);
        info!(
            scored = summary.users_scored,
            failed = summary.users_failed,
            mean = summary.mean,
            median = summary.median,
            "batch scored"
        );
        scores
    }

    /// Scores every user in parallel, failing with the first error in input order.
    pub fn try_score_users(&self, users: &[UserProfile]) -> Result<Vec<UserCalibration>> {
        let outcomes: Vec<Result<UserCalibration>> =
            users.par_iter().map(|user| self.score_user(user)).collect();
        outcomes.into_iter().collect()
    }
}

/// Summary statistics of a scored batch.
pub fn summarize(scores: &[UserScore]) -> CalibrationSummary {
    let values: Vec<f64> = scores
        .iter()
        .filter_map(|s| s.outcome.as_ref().ok().map(|c| c.miscalibration))
        .collect();
    let users_failed = scores.len() - values.len();

    if values.is_empty() {
        return CalibrationSummary {
            users_failed,
            ..CalibrationSummary::default()
        };
    }

    CalibrationSummary {
        users_scored: values.len(),
        users_failed,
        mean: mean(&values),
        median: median(&values),
        std_dev: variance(&values).sqrt(),
        min: values.iter().copied().fold(f64::INFINITY, f64::min),
        max: values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
    }
}

/// 均值
fn mean(arr: &[f64]) -> f64 {
    if arr.is_empty() {
        return 0.0;
    }
    arr.iter().sum::<f64>() / arr.len() as f64
}

/// 方差（样本方差，使用 n-1）
fn variance(arr: &[f64]) -> f64 {
    if arr.len() < 2 {
        return 0.0;
    }
    let m = mean(arr);
    let sum_sq: f64 = arr.iter().map(|x| (x - m).powi(2)).sum();
    sum_sq / (arr.len() - 1) as f64
}

/// 中位数
fn median(arr: &[f64]) -> f64 {
    if arr.is_empty() {
        return 0.0;
    }
    let mut sorted = arr.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 1 {
        sorted[mid]
    } else {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::IndexBase;
    use crate::weighting::{RecencyDecay, WeightingScheme};

    const EPS: f64 = 1e-12;

    fn matrix() -> CategoryMatrix {
        // categories: action, comedy, drama
        CategoryMatrix::from_memberships(
            &[
                vec![1.0, 0.0, 0.0],
                vec![0.0, 1.0, 0.0],
                vec![0.0, 0.0, 1.0],
                vec![1.0, 1.0, 0.0],
            ],
            IndexBase::Zero,
        )
        .unwrap()
    }

    fn user(user_id: u64, history: Vec<ItemId>, recommended: Vec<ItemId>) -> UserProfile {
        UserProfile {
            user_id,
            history,
            recommended,
        }
    }

    #[test]
    fn test_calibrated_user_scores_zero() {
        let m = matrix();
        let evaluator = CalibrationEvaluator::new(&m);
        let result = evaluator.score_user(&user(1, vec![0, 1], vec![3])).unwrap();
        assert_eq!(result.historical.as_slice(), &[0.5, 0.5, 0.0]);
        assert_eq!(result.recommended.as_slice(), &[0.5, 0.5, 0.0]);
        assert_eq!(result.miscalibration, 0.0);
    }

    #[test]
    fn test_miscalibrated_user() {
        let m = matrix();
        let evaluator = CalibrationEvaluator::new(&m);
        let result = evaluator.score_user(&user(2, vec![0], vec![1])).unwrap();
        assert!((result.miscalibration - 100f64.log2()).abs() < 1e-9);
    }

    #[test]
    fn test_custom_weighting() {
        let m = matrix();
        let evaluator = CalibrationEvaluator::new(&m)
            .with_history_weighting(RecencyDecay::new(1.0).unwrap())
            .with_recommendation_weighting(|position: usize, _: usize, _: ItemId| {
                if position == 0 {
                    1.0
                } else {
                    0.0
                }
            });

        // history [action, comedy]: weights 0.5, 1.0
        let result = evaluator.score_user(&user(3, vec![0, 1], vec![2, 0])).unwrap();
        assert!((result.historical.as_slice()[0] - 1.0 / 3.0).abs() < EPS);
        assert!((result.historical.as_slice()[1] - 2.0 / 3.0).abs() < EPS);
        assert_eq!(result.recommended.as_slice(), &[0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_score_weighted() {
        let m = matrix();
        let evaluator = CalibrationEvaluator::new(&m);
        let history = [WeightedItem::new(0, 3.0), WeightedItem::new(1, 1.0)];
        let recommended = [WeightedItem::new(0, 3.0), WeightedItem::new(1, 1.0)];
        let result = evaluator.score_weighted(9, &history, &recommended).unwrap();
        assert_eq!(result.user_id, 9);
        assert_eq!(result.miscalibration, 0.0);
    }

    #[test]
    fn test_errors_are_surfaced() {
        let m = matrix();
        let evaluator = CalibrationEvaluator::new(&m);
        assert_eq!(
            evaluator.score_user(&user(4, vec![], vec![0])),
            Err(CalibrationError::EmptyItemSet)
        );
        assert!(matches!(
            evaluator.score_user(&user(4, vec![0], vec![42])),
            Err(CalibrationError::InvalidItemReference { item: 42, .. })
        ));
    }

    #[test]
    fn test_from_config() {
        let m = matrix();
        let config = CalibrationConfig {
            smoothing: 0.1,
            recommendation_weighting: WeightingScheme::ReciprocalRank,
            ..CalibrationConfig::default()
        };
        let evaluator = CalibrationEvaluator::from_config(&m, &config).unwrap();
        assert_eq!(evaluator.smoothing().value(), 0.1);

        let result = evaluator.score_user(&user(5, vec![0], vec![1])).unwrap();
        assert!((result.miscalibration - 10f64.log2()).abs() < 1e-9);
    }

    #[test]
    fn test_from_config_rejects_index_base_mismatch() {
        let m = matrix();
        let config = CalibrationConfig {
            index_base: IndexBase::One,
            ..CalibrationConfig::default()
        };
        assert!(matches!(
            CalibrationEvaluator::from_config(&m, &config),
            Err(CalibrationError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_score_users_keeps_order_and_failures() {
        let m = matrix();
        let evaluator = CalibrationEvaluator::new(&m);
        let users: Vec<UserProfile> = (0..50)
            .map(|i| {
                if i % 10 == 7 {
                    user(i, vec![0], vec![])
                } else {
                    user(i, vec![(i % 4) as ItemId], vec![((i + 1) % 4) as ItemId])
                }
            })
            .collect();

        let scores = evaluator.score_users(&users);
        assert_eq!(scores.len(), 50);
        for (i, score) in scores.iter().enumerate() {
            assert_eq!(score.user_id, i as u64);
            assert_eq!(score.outcome.is_err(), i % 10 == 7);
        }

        let summary = summarize(&scores);
        assert_eq!(summary.users_scored, 45);
        assert_eq!(summary.users_failed, 5);
        assert!(summary.min >= 0.0);
        assert!(summary.min <= summary.median && summary.median <= summary.max);
    }

    #[test]
    fn test_try_score_users() {
        let m = matrix();
        let evaluator = CalibrationEvaluator::new(&m);
        let ok = evaluator
            .try_score_users(&[user(1, vec![0], vec![0]), user(2, vec![1], vec![3])])
            .unwrap();
        assert_eq!(ok.len(), 2);
        assert_eq!(ok[0].miscalibration, 0.0);

        let err = evaluator
            .try_score_users(&[user(1, vec![0], vec![9]), user(2, vec![], vec![0])])
            .unwrap_err();
        assert!(matches!(err, CalibrationError::InvalidItemReference { item: 9, .. }));
    }

    #[test]
    fn test_summarize_empty() {
        let summary = summarize(&[]);
        assert_eq!(summary, CalibrationSummary::default());
    }

    #[test]
    fn test_summary_statistics() {
        let arr = vec![2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert!((mean(&arr) - 5.0).abs() < EPS);
        assert!((variance(&arr) - 4.571428571428571).abs() < 0.001);
        assert!((median(&arr) - 4.5).abs() < EPS);
        assert!((median(&[9.0, 1.0, 5.0]) - 5.0).abs() < EPS);
        assert_eq!(variance(&[5.0]), 0.0);
    }
}
