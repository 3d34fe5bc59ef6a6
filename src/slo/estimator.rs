//! Latency violation estimation.
//!
//! A single p95 scalar cannot tell how many requests exceeded the target, so
//! the fraction of violating requests is estimated. The estimator sits behind
//! a trait so an exact bucket-ratio computation can replace it without
//! touching budget or status logic.

use crate::slo::objective::Objective;

/// Estimates the violation fraction for a lower-is-better objective.
pub trait LatencyViolationEstimator: Send + Sync + std::fmt::Debug {
    /// Error rate implied by `current_value` for `objective`.
    fn estimate(&self, objective: &Objective, current_value: f64) -> f64;

    /// Estimator name, recorded in logs.
    fn name(&self) -> &'static str;
}

/// Conservative excess-ratio heuristic.
///
/// At or under target nothing is consumed. Above it the relative excess is
/// scaled by the objective's `scaling_factor` and capped at
/// `max_violation_cap`.
#[derive(Clone, Copy, Debug, Default)]
pub struct ExcessRatioEstimator;

impl LatencyViolationEstimator for ExcessRatioEstimator {
    fn estimate(&self, objective: &Objective, current_value: f64) -> f64 {
        let target = objective.target();
        if current_value <= target {
            return 0.0;
        }

        let policy = objective.policy();
        let excess_ratio = (current_value - target) / target;
        (excess_ratio * policy.scaling_factor).min(policy.max_violation_cap)
    }

    fn name(&self) -> &'static str {
        "excess_ratio"
    }
}
