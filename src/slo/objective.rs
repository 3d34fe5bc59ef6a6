//! Service level objectives.
//!
//! Binds an indicator to a target, a comparison direction and an error
//! budget policy.

use crate::core::error::ConfigError;
use crate::slo::indicator::Indicator;
use serde::{Deserialize, Serialize};

/// Default multiplier applied to the latency excess ratio.
pub const DEFAULT_SCALING_FACTOR: f64 = 0.1;

/// Comparison direction of an indicator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Success-ratio style indicators (availability)
    HigherIsBetter,
    /// Ceiling style indicators (latency)
    LowerIsBetter,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::HigherIsBetter => write!(f, "higher_is_better"),
            Direction::LowerIsBetter => write!(f, "lower_is_better"),
        }
    }
}

/// Error budget policy constants of an objective.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BudgetPolicy {
    /// Maximum allowed deviation from target
    pub error_budget: f64,
    /// Multiplier turning a latency excess ratio into an error rate
    pub scaling_factor: f64,
    /// Upper bound on a single latency error rate estimate
    pub max_violation_cap: f64,
}

impl BudgetPolicy {
    /// Policy with default constants for the given budget.
    ///
    /// The violation cap defaults to the budget itself, so a single estimate
    /// never exceeds full budget consumption.
    pub fn with_budget(error_budget: f64) -> Self {
        Self {
            error_budget,
            scaling_factor: DEFAULT_SCALING_FACTOR,
            max_violation_cap: error_budget,
        }
    }
}

/// A declared service level objective.
///
/// Deserialization goes through the same checks as the constructors.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ObjectiveFields")]
pub struct Objective {
    /// Objective name
    name: String,
    /// Indicator being judged
    indicator: Indicator,
    /// Target value (fraction or seconds)
    target: f64,
    /// Comparison direction
    direction: Direction,
    /// Budget policy
    policy: BudgetPolicy,
}

impl Objective {
    /// Declare a ratio objective (higher is better).
    ///
    /// The error budget is derived as `1 - target`.
    pub fn ratio(name: &str, indicator: Indicator, target: f64) -> Result<Self, ConfigError> {
        if !(target.is_finite() && target > 0.0 && target < 1.0) {
            return Err(ConfigError::invalid(
                format!("objective '{}'.target", name),
                format!("ratio target must be in (0, 1), got {}", target),
            ));
        }

        Self::build(
            name,
            indicator,
            target,
            Direction::HigherIsBetter,
            BudgetPolicy::with_budget(1.0 - target),
        )
    }

    /// Declare a latency objective (lower is better).
    ///
    /// `error_budget` is the allowed violation fraction.
    pub fn latency(
        name: &str,
        indicator: Indicator,
        target: f64,
        error_budget: f64,
    ) -> Result<Self, ConfigError> {
        if !(target.is_finite() && target > 0.0) {
            return Err(ConfigError::invalid(
                format!("objective '{}'.target", name),
                format!("latency target must be positive, got {}", target),
            ));
        }
        if !(error_budget.is_finite() && error_budget > 0.0 && error_budget <= 1.0) {
            return Err(ConfigError::invalid(
                format!("objective '{}'.error_budget", name),
                format!("must be in (0, 1], got {}", error_budget),
            ));
        }

        Self::build(
            name,
            indicator,
            target,
            Direction::LowerIsBetter,
            BudgetPolicy::with_budget(error_budget),
        )
    }

    fn build(
        name: &str,
        indicator: Indicator,
        target: f64,
        direction: Direction,
        policy: BudgetPolicy,
    ) -> Result<Self, ConfigError> {
        if name.trim().is_empty() {
            return Err(ConfigError::invalid("objective.name", "must not be empty"));
        }

        Ok(Self {
            name: name.to_string(),
            indicator,
            target,
            direction,
            policy,
        })
    }

    /// Override the latency scaling factor.
    pub fn with_scaling_factor(mut self, scaling_factor: f64) -> Result<Self, ConfigError> {
        if !(scaling_factor.is_finite() && scaling_factor > 0.0) {
            return Err(ConfigError::invalid(
                format!("objective '{}'.scaling_factor", self.name),
                format!("must be positive, got {}", scaling_factor),
            ));
        }
        self.policy.scaling_factor = scaling_factor;
        Ok(self)
    }

    /// Override the cap on a single latency error rate estimate.
    pub fn with_violation_cap(mut self, cap: f64) -> Result<Self, ConfigError> {
        if !(cap.is_finite() && cap > 0.0) {
            return Err(ConfigError::invalid(
                format!("objective '{}'.max_violation_cap", self.name),
                format!("must be positive, got {}", cap),
            ));
        }
        self.policy.max_violation_cap = cap;
        Ok(self)
    }

    /// Objective name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Indicator being judged.
    pub fn indicator(&self) -> &Indicator {
        &self.indicator
    }

    /// Target value.
    pub fn target(&self) -> f64 {
        self.target
    }

    /// Comparison direction.
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Budget policy constants.
    pub fn policy(&self) -> &BudgetPolicy {
        &self.policy
    }

    /// Error budget.
    pub fn error_budget(&self) -> f64 {
        self.policy.error_budget
    }
}

/// Unvalidated wire form of an [`Objective`].
#[derive(Deserialize)]
struct ObjectiveFields {
    name: String,
    indicator: Indicator,
    target: f64,
    direction: Direction,
    policy: BudgetPolicy,
}

impl TryFrom<ObjectiveFields> for Objective {
    type Error = ConfigError;

    fn try_from(fields: ObjectiveFields) -> Result<Self, Self::Error> {
        match fields.direction {
            Direction::HigherIsBetter => {
                let objective = Objective::ratio(&fields.name, fields.indicator, fields.target)?;
                if (objective.error_budget() - fields.policy.error_budget).abs() > 1e-9 {
                    return Err(ConfigError::invalid(
                        format!("objective '{}'.policy.error_budget", fields.name),
                        "must equal 1 - target for higher_is_better objectives",
                    ));
                }
                Ok(objective)
            }
            Direction::LowerIsBetter => Objective::latency(
                &fields.name,
                fields.indicator,
                fields.target,
                fields.policy.error_budget,
            )?
            .with_scaling_factor(fields.policy.scaling_factor)?
            .with_violation_cap(fields.policy.max_violation_cap),
        }
    }
}
