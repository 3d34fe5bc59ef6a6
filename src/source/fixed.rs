//! Static source implementation.
//!
//! Serves fixed readings from memory: offline dry runs and fixtures.

use crate::core::error::MeasurementError;
use crate::slo::Indicator;
use crate::source::adapter::{finite_sample, MetricSource, SourceKind};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// In-memory metric source keyed by indicator name.
///
/// Indicators without a reading report [`MeasurementError::NoData`].
#[derive(Debug, Default)]
pub struct StaticSource {
    /// Reading or failure per indicator
    readings: HashMap<String, Result<f64, MeasurementError>>,
    /// Artificial latency per indicator
    delays: HashMap<String, Duration>,
    /// Number of measure calls served
    calls: AtomicUsize,
}

impl StaticSource {
    /// Create an empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create from a name → value map.
    pub fn from_values(values: &BTreeMap<String, f64>) -> Self {
        values
            .iter()
            .fold(Self::new(), |source, (name, value)| source.with_value(name, *value))
    }

    /// Serve a fixed value for an indicator.
    ///
    /// Non-finite values are served as the matching failure.
    pub fn with_value(mut self, indicator: &str, value: f64) -> Self {
        self.readings
            .insert(indicator.to_string(), finite_sample(value));
        self
    }

    /// Fail every measurement of an indicator.
    pub fn with_error(mut self, indicator: &str, error: MeasurementError) -> Self {
        self.readings.insert(indicator.to_string(), Err(error));
        self
    }

    /// Delay every measurement of an indicator.
    pub fn with_delay(mut self, indicator: &str, delay: Duration) -> Self {
        self.delays.insert(indicator.to_string(), delay);
        self
    }

    /// Number of measurements served so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl MetricSource for StaticSource {
    async fn measure(&self, indicator: &Indicator) -> Result<f64, MeasurementError> {
        self.calls.fetch_add(1, Ordering::Relaxed);

        if let Some(delay) = self.delays.get(indicator.name()) {
            tokio::time::sleep(*delay).await;
        }

        self.readings
            .get(indicator.name())
            .cloned()
            .unwrap_or(Err(MeasurementError::NoData))
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Static
    }
}
