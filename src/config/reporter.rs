//! Reporter configuration.
//!
//! TOML-backed settings for one reporter run. Everything is validated before
//! any measurement is attempted.

use super::defaults::{default_objectives, DEFAULT_SERVICE, DEFAULT_WINDOW_DAYS};
use crate::core::error::ConfigError;
use crate::core::types::days;
use crate::slo::{Direction, Indicator, Objective};
use crate::source::SourceConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

/// Longest supported measurement window.
pub const MAX_WINDOW_DAYS: u64 = 3650;

/// Query placeholder replaced with the window as a PromQL range.
pub const WINDOW_PLACEHOLDER: &str = "{window}";

/// One declared objective.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ObjectiveConfig {
    /// Objective name (unique)
    pub name: String,
    /// Indicator name, defaults to the objective name
    #[serde(default)]
    pub indicator: Option<String>,
    /// Backend query expression
    pub query: String,
    /// Comparison direction
    pub direction: Direction,
    /// Target value
    pub target: f64,
    /// Error budget (lower-is-better only)
    #[serde(default)]
    pub error_budget: Option<f64>,
    /// Latency excess scaling factor
    #[serde(default)]
    pub scaling_factor: Option<f64>,
    /// Cap on a single latency error rate estimate
    #[serde(default)]
    pub max_violation_cap: Option<f64>,
}

impl ObjectiveConfig {
    /// Indicator name.
    pub fn indicator_name(&self) -> &str {
        self.indicator.as_deref().unwrap_or(&self.name)
    }

    /// Query with the window placeholder expanded.
    pub fn expanded_query(&self, window_days: u64) -> String {
        self.query
            .replace(WINDOW_PLACEHOLDER, &format!("{}d", window_days))
    }

    /// Build the objective measured over `window_days`.
    pub fn to_objective(&self, window_days: u64) -> Result<Objective, ConfigError> {
        let indicator = Indicator::new(
            self.indicator_name(),
            &self.expanded_query(window_days),
            days(window_days),
        )?;

        match self.direction {
            Direction::HigherIsBetter => {
                if self.error_budget.is_some() {
                    return Err(self.field_error(
                        "error_budget",
                        "derived as 1 - target for higher_is_better objectives",
                    ));
                }
                let latency_only = [
                    ("scaling_factor", self.scaling_factor),
                    ("max_violation_cap", self.max_violation_cap),
                ];
                if let Some((field, _)) = latency_only.iter().find(|(_, v)| v.is_some()) {
                    return Err(self.field_error(
                        field,
                        "applies to lower_is_better objectives only",
                    ));
                }
                Objective::ratio(&self.name, indicator, self.target)
            }
            Direction::LowerIsBetter => {
                let error_budget = self.error_budget.ok_or_else(|| {
                    self.field_error("error_budget", "required for lower_is_better objectives")
                })?;

                let mut objective =
                    Objective::latency(&self.name, indicator, self.target, error_budget)?;
                if let Some(factor) = self.scaling_factor {
                    objective = objective.with_scaling_factor(factor)?;
                }
                if let Some(cap) = self.max_violation_cap {
                    objective = objective.with_violation_cap(cap)?;
                }
                Ok(objective)
            }
        }
    }

    fn field_error(&self, field: &str, reason: &str) -> ConfigError {
        ConfigError::invalid(format!("objective '{}'.{}", self.name, field), reason)
    }
}

/// Reporter configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReporterConfig {
    /// Metric source settings
    #[serde(default)]
    pub source: SourceConfig,
    /// Measurement window shared by all indicators
    #[serde(default = "default_window_days")]
    pub window_days: u64,
    /// Upper bound on one report generation
    #[serde(default)]
    pub deadline_secs: Option<u64>,
    /// Measure objectives concurrently
    #[serde(default)]
    pub concurrent: bool,
    /// Objectives in report order
    #[serde(default)]
    pub objectives: Vec<ObjectiveConfig>,
}

fn default_window_days() -> u64 {
    DEFAULT_WINDOW_DAYS
}

impl Default for ReporterConfig {
    fn default() -> Self {
        Self::for_service(DEFAULT_SERVICE)
    }
}

impl ReporterConfig {
    /// Built-in objectives for `service` against the default source.
    pub fn for_service(service: &str) -> Self {
        Self {
            source: SourceConfig::default(),
            window_days: DEFAULT_WINDOW_DAYS,
            deadline_secs: None,
            concurrent: false,
            objectives: default_objectives(service),
        }
    }

    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(format!("{}: {}", path.display(), e)))?;
        let config = Self::from_toml_str(&content)?;
        tracing::debug!(path = %path.display(), objectives = config.objectives.len(), "Configuration loaded");
        Ok(config)
    }

    /// Parse configuration from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Measurement window.
    pub fn window(&self) -> Duration {
        days(self.window_days)
    }

    /// Overall report deadline, if any.
    pub fn deadline(&self) -> Option<Duration> {
        self.deadline_secs.map(Duration::from_secs)
    }

    /// Validate every setting.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.to_objectives().map(|_| ())
    }

    /// Validate and build the declared objectives in order.
    pub fn to_objectives(&self) -> Result<Vec<Objective>, ConfigError> {
        self.source.validate()?;

        if self.window_days == 0 || self.window_days > MAX_WINDOW_DAYS {
            return Err(ConfigError::invalid(
                "window_days",
                format!("must be between 1 and {}, got {}", MAX_WINDOW_DAYS, self.window_days),
            ));
        }
        if self.deadline_secs == Some(0) {
            return Err(ConfigError::invalid("deadline_secs", "must be positive"));
        }
        if self.objectives.is_empty() {
            return Err(ConfigError::NoObjectives);
        }

        let mut seen = HashSet::new();
        for objective in &self.objectives {
            if !seen.insert(objective.name.as_str()) {
                return Err(ConfigError::DuplicateObjective(objective.name.clone()));
            }
        }

        self.objectives
            .iter()
            .map(|objective| objective.to_objective(self.window_days))
            .collect()
    }
}
