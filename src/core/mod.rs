//! Core utilities and common types for the reporter.

pub mod error;
pub mod types;

pub use error::{ConfigError, Error, MeasurementError, ReportError, Result};
pub use types::*;
