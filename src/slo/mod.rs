//! SLO Module
//!
//! Provides Service Level Objective evaluation:
//! - Indicators and objectives
//! - Error budget, burn rate and status judgment
//! - Pluggable latency violation estimation

pub mod estimator;
pub mod evaluator;
pub mod indicator;
pub mod objective;

pub use estimator::{ExcessRatioEstimator, LatencyViolationEstimator};
pub use evaluator::{evaluate, Evaluation, Evaluator, Status};
pub use indicator::Indicator;
pub use objective::{BudgetPolicy, Direction, Objective};
