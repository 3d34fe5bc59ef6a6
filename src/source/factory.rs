//! Source factory.
//!
//! Creates metric sources based on configuration.

use crate::core::error::ConfigError;
use crate::source::adapter::{MetricSource, SourceKind};
use crate::source::config::SourceConfig;
use crate::source::fixed::StaticSource;
use crate::source::prometheus::PrometheusSource;
use std::sync::Arc;

/// Create a metric source from configuration.
///
/// Returns an Arc-wrapped source for shared ownership.
pub fn create_metric_source(config: &SourceConfig) -> Result<Arc<dyn MetricSource>, ConfigError> {
    config.validate()?;

    match config.kind {
        SourceKind::Prometheus => {
            let source = PrometheusSource::new(&config.url, config.request_timeout())?;
            tracing::debug!(url = %source.query_url(), timeout = ?source.timeout(), "Using Prometheus source");
            Ok(Arc::new(source) as Arc<dyn MetricSource>)
        }
        SourceKind::Static => {
            tracing::debug!(readings = config.values.len(), "Using static source");
            Ok(Arc::new(StaticSource::from_values(&config.values)) as Arc<dyn MetricSource>)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_factory_prometheus() {
        let source = create_metric_source(&SourceConfig::prometheus("http://prom:9090")).unwrap();
        assert_eq!(source.kind(), SourceKind::Prometheus);
    }

    #[test]
    fn test_factory_static() {
        let source = create_metric_source(&SourceConfig::fixed(BTreeMap::new())).unwrap();
        assert_eq!(source.kind(), SourceKind::Static);
    }

    #[test]
    fn test_factory_rejects_invalid_config() {
        let result = create_metric_source(&SourceConfig::prometheus("prom:9090/api"));
        assert!(result.is_err());
    }
}
