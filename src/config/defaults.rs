//! Built-in objectives.
//!
//! Availability and p95 latency of a single HTTP service, measured from the
//! standard `http_requests_total` and `http_request_duration_seconds`
//! series.

use super::reporter::ObjectiveConfig;
use crate::slo::Direction;

/// Service measured when none is configured.
pub const DEFAULT_SERVICE: &str = "codigo-api";

/// Default measurement window.
pub const DEFAULT_WINDOW_DAYS: u64 = 30;

/// Availability target (99.9% non-5xx).
pub const AVAILABILITY_TARGET: f64 = 0.999;

/// p95 latency ceiling in seconds.
pub const LATENCY_P95_TARGET_SECS: f64 = 0.5;

/// Allowed fraction of slow requests.
pub const LATENCY_ERROR_BUDGET: f64 = 0.05;

const AVAILABILITY_QUERY: &str = concat!(
    r#"sum(rate(http_requests_total{service=~"$service", code!~"5.."}[{window}]))"#,
    " / ",
    r#"sum(rate(http_requests_total{service=~"$service"}[{window}]))"#,
);

const LATENCY_P95_QUERY: &str = concat!(
    "histogram_quantile(0.95, ",
    r#"sum(rate(http_request_duration_seconds_bucket{service=~"$service"}[{window}]))"#,
    " by (le, service))",
);

/// Default objectives for `service`.
///
/// Queries keep the `{window}` placeholder; it is expanded when the
/// configuration is turned into objectives.
pub fn default_objectives(service: &str) -> Vec<ObjectiveConfig> {
    vec![
        ObjectiveConfig {
            name: "Availability".to_string(),
            indicator: Some("availability".to_string()),
            query: AVAILABILITY_QUERY.replace("$service", service),
            direction: Direction::HigherIsBetter,
            target: AVAILABILITY_TARGET,
            error_budget: None,
            scaling_factor: None,
            max_violation_cap: None,
        },
        ObjectiveConfig {
            name: "Latency (p95)".to_string(),
            indicator: Some("latency_p95".to_string()),
            query: LATENCY_P95_QUERY.replace("$service", service),
            direction: Direction::LowerIsBetter,
            target: LATENCY_P95_TARGET_SECS,
            error_budget: Some(LATENCY_ERROR_BUDGET),
            scaling_factor: None,
            max_violation_cap: None,
        },
    ]
}
