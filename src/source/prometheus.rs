//! Prometheus source implementation.
//!
//! Instant queries against the `/api/v1/query` HTTP endpoint.

use crate::core::error::{ConfigError, MeasurementError};
use crate::slo::Indicator;
use crate::source::adapter::{finite_sample, MetricSource, SourceKind};
use crate::source::config::parse_base_url;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::{Duration, Instant};

/// Instant query path relative to the base URL.
const QUERY_PATH: &str = "/api/v1/query";

/// Maximum characters of a rejected response body kept in errors.
const MAX_ERROR_BODY: usize = 512;

/// Query API envelope.
#[derive(Debug, Deserialize)]
struct QueryResponse {
    status: String,
    #[serde(default)]
    data: Option<QueryData>,
    #[serde(rename = "errorType", default)]
    error_type: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct QueryData {
    #[serde(rename = "resultType")]
    result_type: String,
    result: serde_json::Value,
}

/// One series of an instant vector.
#[derive(Debug, Deserialize)]
struct VectorSample {
    /// `[timestamp, "value"]`
    value: (f64, String),
}

/// Prometheus-compatible metric source.
///
/// Each request is bounded by the client timeout; a timeout surfaces as
/// [`MeasurementError::Unreachable`].
pub struct PrometheusSource {
    /// Full query endpoint
    query_url: String,
    /// HTTP client with timeout
    client: reqwest::Client,
    /// Request timeout
    timeout: Duration,
}

impl PrometheusSource {
    /// Create a new Prometheus source.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ConfigError> {
        let base = parse_base_url(base_url)?;
        if timeout.is_zero() {
            return Err(ConfigError::invalid(
                "source.request_timeout_secs",
                "must be positive",
            ));
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ConfigError::invalid("source", format!("http client: {}", e)))?;

        Ok(Self {
            query_url: format!("{}{}", base.as_str().trim_end_matches('/'), QUERY_PATH),
            client,
            timeout,
        })
    }

    /// Get the query endpoint.
    pub fn query_url(&self) -> &str {
        &self.query_url
    }

    /// Get the request timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn transport_error(&self, err: reqwest::Error) -> MeasurementError {
        if err.is_timeout() {
            MeasurementError::Unreachable(format!("request timed out after {:?}", self.timeout))
        } else {
            MeasurementError::Unreachable(err.to_string())
        }
    }
}

#[async_trait]
impl MetricSource for PrometheusSource {
    async fn measure(&self, indicator: &Indicator) -> Result<f64, MeasurementError> {
        let started = Instant::now();
        tracing::debug!(
            indicator = %indicator.name(),
            url = %self.query_url,
            "Querying metric backend"
        );

        let response = self
            .client
            .get(&self.query_url)
            .query(&[("query", indicator.query())])
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| self.transport_error(e))?;

        let result = parse_query_response(status, &body);
        tracing::debug!(
            indicator = %indicator.name(),
            status,
            elapsed_ms = started.elapsed().as_millis() as u64,
            ok = result.is_ok(),
            "Metric backend responded"
        );
        result
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Prometheus
    }
}

/// Interpret a query API response.
///
/// Empty vectors and `NaN` samples (0/0 over a window without traffic) mean
/// no data; infinities and unparsable samples are malformed.
pub fn parse_query_response(status: u16, body: &str) -> Result<f64, MeasurementError> {
    if !(200..300).contains(&status) {
        return Err(MeasurementError::BackendRejected {
            status,
            message: rejection_message(body),
        });
    }

    let response: QueryResponse = serde_json::from_str(body)
        .map_err(|e| MeasurementError::MalformedResponse(format!("invalid JSON: {}", e)))?;

    if response.status != "success" {
        return Err(MeasurementError::BackendRejected {
            status,
            message: format!(
                "{}: {}",
                response.error_type.as_deref().unwrap_or(&response.status),
                response.error.as_deref().unwrap_or("query failed")
            ),
        });
    }

    let data = response
        .data
        .ok_or_else(|| MeasurementError::MalformedResponse("missing data field".to_string()))?;

    match data.result_type.as_str() {
        "vector" => {
            let samples: Vec<VectorSample> = serde_json::from_value(data.result).map_err(|e| {
                MeasurementError::MalformedResponse(format!("invalid vector result: {}", e))
            })?;
            let first = samples.first().ok_or(MeasurementError::NoData)?;
            parse_sample_value(&first.value.1)
        }
        "scalar" => {
            let (_, value): (f64, String) = serde_json::from_value(data.result).map_err(|e| {
                MeasurementError::MalformedResponse(format!("invalid scalar result: {}", e))
            })?;
            parse_sample_value(&value)
        }
        other => Err(MeasurementError::MalformedResponse(format!(
            "unsupported result type '{}'",
            other
        ))),
    }
}

fn parse_sample_value(raw: &str) -> Result<f64, MeasurementError> {
    let value: f64 = raw
        .trim()
        .parse()
        .map_err(|_| MeasurementError::MalformedResponse(format!("invalid sample value '{}'", raw)))?;

    finite_sample(value)
}

fn rejection_message(body: &str) -> String {
    if let Ok(response) = serde_json::from_str::<QueryResponse>(body) {
        if let Some(error) = response.error {
            return match response.error_type {
                Some(kind) => format!("{}: {}", kind, error),
                None => error,
            };
        }
    }
    body.trim().chars().take(MAX_ERROR_BODY).collect()
}
