//! Metric source configuration.
//!
//! Configuration-driven source selection.

use crate::core::error::ConfigError;
use crate::source::adapter::SourceKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Default Prometheus base URL.
pub const DEFAULT_PROMETHEUS_URL: &str = "http://localhost:9090";

/// Default per-request timeout.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Metric source configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Source type to use
    #[serde(default = "default_kind")]
    pub kind: SourceKind,
    /// Backend base URL (prometheus)
    #[serde(default = "default_url")]
    pub url: String,
    /// Upper bound on a single query
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Indicator readings (static)
    #[serde(default)]
    pub values: BTreeMap<String, f64>,
}

fn default_kind() -> SourceKind {
    SourceKind::Prometheus
}

fn default_url() -> String {
    DEFAULT_PROMETHEUS_URL.to_string()
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

impl SourceConfig {
    /// Create Prometheus config.
    pub fn prometheus(url: &str) -> Self {
        Self {
            kind: SourceKind::Prometheus,
            url: url.to_string(),
            ..Default::default()
        }
    }

    /// Create static config from fixed readings.
    pub fn fixed(values: BTreeMap<String, f64>) -> Self {
        Self {
            kind: SourceKind::Static,
            values,
            ..Default::default()
        }
    }

    /// Per-request timeout.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Validate the settings relevant to the selected kind.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::invalid(
                "source.request_timeout_secs",
                "must be positive",
            ));
        }

        match self.kind {
            SourceKind::Prometheus => {
                parse_base_url(&self.url)?;
            }
            SourceKind::Static => {
                if let Some((name, value)) = self.values.iter().find(|(_, v)| !v.is_finite()) {
                    return Err(ConfigError::invalid(
                        format!("source.values.{}", name),
                        format!("must be finite, got {}", value),
                    ));
                }
            }
        }

        Ok(())
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            kind: default_kind(),
            url: default_url(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            values: BTreeMap::new(),
        }
    }
}

/// Parse and check a backend base URL.
pub fn parse_base_url(url: &str) -> Result<reqwest::Url, ConfigError> {
    let parsed = reqwest::Url::parse(url.trim())
        .map_err(|e| ConfigError::invalid("source.url", format!("'{}': {}", url, e)))?;

    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => Err(ConfigError::invalid(
            "source.url",
            format!("unsupported scheme '{}'", other),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SourceConfig::default();
        assert_eq!(config.kind, SourceKind::Prometheus);
        assert_eq!(config.url, DEFAULT_PROMETHEUS_URL);
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_url() {
        let config = SourceConfig::prometheus("not a url");
        assert!(matches!(config.validate(), Err(ConfigError::Invalid { .. })));

        let config = SourceConfig::prometheus("ftp://metrics.internal");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let mut config = SourceConfig::prometheus("http://prometheus:9090");
        config.request_timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_static_values_must_be_finite() {
        let mut values = BTreeMap::new();
        values.insert("availability".to_string(), f64::NAN);
        assert!(SourceConfig::fixed(values).validate().is_err());

        let mut values = BTreeMap::new();
        values.insert("availability".to_string(), 0.9995);
        assert!(SourceConfig::fixed(values).validate().is_ok());
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let config: SourceConfig = toml::from_str(r#"url = "http://prom:9090""#).unwrap();
        assert_eq!(config.kind, SourceKind::Prometheus);
        assert_eq!(config.request_timeout_secs, DEFAULT_REQUEST_TIMEOUT_SECS);
    }
}
