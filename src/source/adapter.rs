//! MetricSource trait definition.
//!
//! The query/response boundary to an external time-series system.

use crate::core::error::MeasurementError;
use crate::slo::Indicator;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Source type identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Prometheus-compatible HTTP query API
    Prometheus,
    /// Fixed in-memory readings
    Static,
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceKind::Prometheus => write!(f, "prometheus"),
            SourceKind::Static => write!(f, "static"),
        }
    }
}

/// Core trait for metric sources.
///
/// One call issues one query; implementations do not retry and do not cache.
/// Callers that want caching wrap a source rather than modify it.
#[async_trait]
pub trait MetricSource: Send + Sync {
    /// Current value of `indicator` over its window.
    ///
    /// Only finite values are returned. Every failure is reported, never
    /// replaced by a default value.
    async fn measure(&self, indicator: &Indicator) -> Result<f64, MeasurementError>;

    /// Get the source type.
    fn kind(&self) -> SourceKind;
}

/// Admit a sample only if it is finite.
///
/// `NaN` (0/0 over a window without traffic) means no data; infinities are
/// malformed.
pub fn finite_sample(value: f64) -> Result<f64, MeasurementError> {
    if value.is_nan() {
        Err(MeasurementError::NoData)
    } else if value.is_infinite() {
        Err(MeasurementError::MalformedResponse(format!(
            "non-finite sample value '{}'",
            value
        )))
    } else {
        Ok(value)
    }
}
