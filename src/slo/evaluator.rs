//! SLO evaluation.
//!
//! Scores one objective against one measured value: error rate, budget
//! consumption, burn rate, status and projected budget exhaustion.

use crate::core::types::{duration_secs, option_duration_secs};
use crate::slo::estimator::{ExcessRatioEstimator, LatencyViolationEstimator};
use crate::slo::objective::{Direction, Objective};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Budget consumption above which an objective is at risk.
pub const WARNING_THRESHOLD: f64 = 0.8;

/// Budget consumption at which an objective is breached.
pub const BREACH_THRESHOLD: f64 = 1.0;

/// Health judgment of an objective.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Status {
    /// Budget consumption at or below the warning threshold
    Healthy,
    /// Budget consumption above the warning threshold
    Warning,
    /// Budget exhausted
    Breached,
}

impl Status {
    /// Derive status from budget consumption.
    ///
    /// Total over all inputs. `NaN` is never healthy: it maps to `Breached`.
    pub fn from_budget_spent(budget_spent_fraction: f64) -> Self {
        if budget_spent_fraction.is_nan() || budget_spent_fraction >= BREACH_THRESHOLD {
            Status::Breached
        } else if budget_spent_fraction > WARNING_THRESHOLD {
            Status::Warning
        } else {
            Status::Healthy
        }
    }

    /// Numeric code used for gauges (0 healthy, 1 warning, 2 breached).
    pub fn code(&self) -> u8 {
        match self {
            Status::Healthy => 0,
            Status::Warning => 1,
            Status::Breached => 2,
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Status::Healthy => write!(f, "Healthy"),
            Status::Warning => write!(f, "Warning"),
            Status::Breached => write!(f, "Breached"),
        }
    }
}

/// Result of scoring one objective against one measured value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    /// Objective name
    pub objective: String,
    /// Indicator name
    pub indicator: String,
    /// Comparison direction
    pub direction: Direction,
    /// Target value
    pub target: f64,
    /// Error budget
    pub error_budget: f64,
    /// Measured indicator value
    pub current_value: f64,
    /// Normalized deviation
    pub error_rate: f64,
    /// Fraction of budget consumed (signed, unclamped)
    pub budget_spent_fraction: f64,
    /// Fraction of budget left (`1 - budget_spent_fraction`)
    pub budget_left_fraction: f64,
    /// Budget consumption rate relative to one budget per window
    pub burn_rate: f64,
    /// Health judgment
    pub status: Status,
    /// Measurement window
    #[serde(with = "duration_secs")]
    pub window: Duration,
    /// Time until the budget is exhausted, present only when burning faster than 1x
    #[serde(with = "option_duration_secs")]
    pub projected_exhaustion: Option<Duration>,
}

impl Evaluation {
    /// Whether this evaluation blocks a gate.
    pub fn is_breached(&self) -> bool {
        self.status == Status::Breached
    }
}

/// Objective evaluator.
#[derive(Clone, Debug)]
pub struct Evaluator {
    /// Latency violation strategy
    estimator: Arc<dyn LatencyViolationEstimator>,
}

impl Evaluator {
    /// Create an evaluator with the default excess-ratio estimator.
    pub fn new() -> Self {
        Self::with_estimator(Arc::new(ExcessRatioEstimator))
    }

    /// Create an evaluator with a custom latency estimator.
    pub fn with_estimator(estimator: Arc<dyn LatencyViolationEstimator>) -> Self {
        Self { estimator }
    }

    /// Name of the latency estimator in use.
    pub fn estimator_name(&self) -> &'static str {
        self.estimator.name()
    }

    /// Error rate of `current_value` for `objective`.
    ///
    /// Ratio indicators deviate from perfect service (1.0), not from the
    /// target threshold.
    pub fn error_rate(&self, objective: &Objective, current_value: f64) -> f64 {
        match objective.direction() {
            Direction::HigherIsBetter => 1.0 - current_value,
            Direction::LowerIsBetter => self.estimator.estimate(objective, current_value),
        }
    }

    /// Score one objective against a measured value.
    ///
    /// Pure: identical inputs yield identical evaluations. Out-of-domain
    /// values are not clamped; a negative budget consumption means better
    /// than perfect.
    pub fn evaluate(&self, objective: &Objective, current_value: f64, window: Duration) -> Evaluation {
        let error_rate = self.error_rate(objective, current_value);
        let budget_spent_fraction = error_rate / objective.error_budget();
        let budget_left_fraction = 1.0 - budget_spent_fraction;
        let burn_rate = budget_spent_fraction;

        let projected_exhaustion = if burn_rate > 1.0 {
            Some(window.div_f64(burn_rate))
        } else {
            None
        };

        Evaluation {
            objective: objective.name().to_string(),
            indicator: objective.indicator().name().to_string(),
            direction: objective.direction(),
            target: objective.target(),
            error_budget: objective.error_budget(),
            current_value,
            error_rate,
            budget_spent_fraction,
            budget_left_fraction,
            burn_rate,
            status: Status::from_budget_spent(budget_spent_fraction),
            window,
            projected_exhaustion,
        }
    }
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::new()
    }
}

/// Score one objective with the default estimator.
pub fn evaluate(objective: &Objective, current_value: f64, window: Duration) -> Evaluation {
    Evaluator::new().evaluate(objective, current_value, window)
}
