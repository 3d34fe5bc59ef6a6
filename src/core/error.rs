//! Error types for the SLO reporter.

use std::time::Duration;
use thiserror::Error;

/// Result type alias for reporter operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Failure to obtain a scalar for one indicator.
///
/// None of these are ever coerced into a value: an indicator that cannot be
/// measured must not read as healthy.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MeasurementError {
    /// Transport failure or request timeout.
    #[error("metric backend unreachable: {0}")]
    Unreachable(String),

    /// The backend answered but refused the query.
    #[error("metric backend rejected query (status {status}): {message}")]
    BackendRejected { status: u16, message: String },

    /// The response body could not be interpreted.
    #[error("malformed backend response: {0}")]
    MalformedResponse(String),

    /// The query matched zero series over the window.
    #[error("no data returned for the measurement window")]
    NoData,
}

impl MeasurementError {
    /// Short label used for metrics and structured logs.
    pub fn reason(&self) -> &'static str {
        match self {
            MeasurementError::Unreachable(_) => "unreachable",
            MeasurementError::BackendRejected { .. } => "backend_rejected",
            MeasurementError::MalformedResponse(_) => "malformed_response",
            MeasurementError::NoData => "no_data",
        }
    }
}

/// Failure to assemble a complete report.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ReportError {
    /// A declared objective's indicator could not be measured.
    #[error("failed to measure indicator '{indicator}' for SLO '{objective}': {source}")]
    Measurement {
        objective: String,
        indicator: String,
        #[source]
        source: MeasurementError,
    },

    /// The overall report deadline elapsed before every objective was measured.
    #[error("report generation exceeded its deadline of {0:?}")]
    DeadlineExceeded(Duration),

    /// Report generation was cancelled by the caller.
    #[error("report generation cancelled")]
    Cancelled,
}

impl ReportError {
    /// The underlying measurement failure, if any.
    pub fn measurement(&self) -> Option<&MeasurementError> {
        match self {
            ReportError::Measurement { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Invalid or unreadable configuration, detected at startup.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("invalid configuration for '{field}': {reason}")]
    Invalid { field: String, reason: String },

    #[error("duplicate objective name: {0}")]
    DuplicateObjective(String),

    #[error("no objectives declared")]
    NoObjectives,

    #[error("failed to parse configuration: {0}")]
    Parse(String),

    #[error("failed to read configuration: {0}")]
    Io(String),
}

impl ConfigError {
    /// Shorthand for [`ConfigError::Invalid`].
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Errors that can occur in reporter operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Report(#[from] ReportError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    // Serialization errors
    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::SerializationError(err.to_string())
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::Parse(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_measurement_reason_labels() {
        assert_eq!(MeasurementError::NoData.reason(), "no_data");
        assert_eq!(
            MeasurementError::Unreachable("refused".into()).reason(),
            "unreachable"
        );
        assert_eq!(
            MeasurementError::BackendRejected {
                status: 503,
                message: String::new()
            }
            .reason(),
            "backend_rejected"
        );
    }

    #[test]
    fn test_report_error_names_objective() {
        let err = ReportError::Measurement {
            objective: "availability".into(),
            indicator: "success_ratio".into(),
            source: MeasurementError::NoData,
        };
        let msg = err.to_string();
        assert!(msg.contains("availability"));
        assert!(msg.contains("success_ratio"));
        assert_eq!(err.measurement(), Some(&MeasurementError::NoData));
        assert_eq!(ReportError::Cancelled.measurement(), None);
    }

    #[test]
    fn test_error_conversions() {
        let err: Error = ConfigError::NoObjectives.into();
        assert!(matches!(err, Error::Config(ConfigError::NoObjectives)));

        let err: Error = ReportError::Measurement {
            objective: "availability".into(),
            indicator: "availability".into(),
            source: MeasurementError::NoData,
        }
        .into();
        assert!(matches!(err, Error::Report(ReportError::Measurement { .. })));

        let json_err = serde_json::from_str::<u32>("nope").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::SerializationError(_)));
    }
}
