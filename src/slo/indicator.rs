//! Service level indicators.
//!
//! An indicator names a measurable signal and the query that produces it.

use crate::core::error::ConfigError;
use crate::core::types::duration_secs;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A measurable signal over a fixed window.
///
/// Deserialization goes through [`Indicator::new`] validation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "IndicatorFields")]
pub struct Indicator {
    /// Indicator name (e.g. "availability", "latency_p95")
    name: String,
    /// Query expression understood by the metric source
    query: String,
    /// Measurement window
    #[serde(with = "duration_secs")]
    window: Duration,
}

impl Indicator {
    /// Declare a new indicator.
    ///
    /// The query must be non-empty and the window positive.
    pub fn new(name: &str, query: &str, window: Duration) -> Result<Self, ConfigError> {
        if name.trim().is_empty() {
            return Err(ConfigError::invalid("indicator.name", "must not be empty"));
        }
        if query.trim().is_empty() {
            return Err(ConfigError::invalid(
                format!("indicator '{}'.query", name),
                "must not be empty",
            ));
        }
        if window.is_zero() {
            return Err(ConfigError::invalid(
                format!("indicator '{}'.window", name),
                "must be positive",
            ));
        }

        Ok(Self {
            name: name.to_string(),
            query: query.trim().to_string(),
            window,
        })
    }

    /// Indicator name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Query expression.
    pub fn query(&self) -> &str {
        &self.query
    }

    /// Measurement window.
    pub fn window(&self) -> Duration {
        self.window
    }
}

/// Unvalidated wire form of an [`Indicator`].
#[derive(Deserialize)]
struct IndicatorFields {
    name: String,
    query: String,
    #[serde(with = "duration_secs")]
    window: Duration,
}

impl TryFrom<IndicatorFields> for Indicator {
    type Error = ConfigError;

    fn try_from(fields: IndicatorFields) -> Result<Self, Self::Error> {
        Indicator::new(&fields.name, &fields.query, fields.window)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::days;

    #[test]
    fn test_indicator_creation() {
        let indicator = Indicator::new("availability", "  up == 1 ", days(30)).unwrap();
        assert_eq!(indicator.name(), "availability");
        assert_eq!(indicator.query(), "up == 1");
        assert_eq!(indicator.window(), days(30));
    }

    #[test]
    fn test_deserialize_validates() {
        let indicator: Indicator = serde_json::from_str(
            r#"{"name":"availability","query":" up ","window":86400.0}"#,
        )
        .unwrap();
        assert_eq!(indicator.query(), "up");
        assert_eq!(indicator.window(), days(1));

        assert!(serde_json::from_str::<Indicator>(
            r#"{"name":"availability","query":"","window":86400.0}"#
        )
        .is_err());
        assert!(serde_json::from_str::<Indicator>(
            r#"{"name":"availability","query":"up","window":0.0}"#
        )
        .is_err());
    }

    #[test]
    fn test_empty_query_rejected() {
        let err = Indicator::new("availability", "   ", days(30)).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn test_zero_window_rejected() {
        assert!(Indicator::new("availability", "up", Duration::ZERO).is_err());
    }

    #[test]
    fn test_empty_name_rejected() {
        assert!(Indicator::new("", "up", days(1)).is_err());
    }
}
