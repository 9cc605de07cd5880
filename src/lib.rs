//! # miscalibration - 推荐系统校准度评估
//!
//! Measures how far the category mix of a user's recommendations drifts from
//! the category mix of what the user actually interacted with:
//!
//! - **Category-Distribution Aggregator** - weighted average of item rows of
//!   the row-normalized item-category matrix
//! - **Divergence Scorer** - smoothed, base-2 KL divergence of the
//!   recommended distribution from the historical one
//!
//! ## 模块结构
//!
//! - [`matrix`] - 物品-类别矩阵 (行归一化、物品 ID 约定)
//! - [`weighting`] - 可插拔的加权策略 (均匀、排名、时效、流行度)
//! - [`aggregate`] - 类别分布聚合
//! - [`divergence`] - 平滑 KL 散度
//! - [`calibration`] - 用户级评估与并行批处理
//! - [`config`] - 评估配置
//! - [`sanitize`] - 数值校验与补偿求和
//! - [`types`] - 公共类型和常量
//!
//! ## 使用示例
//!
//! ```rust
//! use miscalibration::{CalibrationEvaluator, CategoryMatrix, IndexBase, UserProfile};
//!
//! // 3 items over (action, comedy, drama)
//! let matrix = CategoryMatrix::from_memberships(
//!     &[vec![1.0, 0.0, 0.0], vec![0.0, 1.0, 0.0], vec![1.0, 0.0, 1.0]],
//!     IndexBase::Zero,
//! )
//! .unwrap();
//!
//! let evaluator = CalibrationEvaluator::new(&matrix);
//! let user = UserProfile { user_id: 1, history: vec![0, 1], recommended: vec![0, 2] };
//! let result = evaluator.score_user(&user).unwrap();
//! assert!(result.miscalibration > 0.0);
//! ```

#![deny(clippy::all)]

// ============================================================================
// 模块声明
// ============================================================================

pub mod aggregate;
pub mod calibration;
pub mod config;
pub mod divergence;
pub mod error;
pub mod matrix;
pub mod sanitize;
pub mod types;
pub mod weighting;

// ============================================================================
// 重新导出
// ============================================================================

pub use types::*;

pub use aggregate::{aggregate, aggregate_uniform, aggregate_with};
pub use calibration::{
    summarize, CalibrationEvaluator, CalibrationSummary, UserCalibration, UserProfile, UserScore,
};
pub use config::CalibrationConfig;
pub use divergence::{kl_divergence, miscalibration, miscalibration_with, smoothed, Smoothing};
pub use error::{CalibrationError, Result};
pub use matrix::CategoryMatrix;
pub use weighting::{
    apply_weights, LogDiscount, Popularity, RecencyDecay, ReciprocalRank, Uniform,
    WeightingScheme, WeightingStrategy,
};
