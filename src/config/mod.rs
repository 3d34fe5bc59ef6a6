//! Configuration Module
//!
//! Provides reporter configuration:
//! - TOML loading with serde defaults
//! - Validation of source, window and objectives
//! - Built-in availability and latency objectives

pub mod defaults;
pub mod reporter;

pub use defaults::{default_objectives, DEFAULT_SERVICE, DEFAULT_WINDOW_DAYS};
pub use reporter::{ObjectiveConfig, ReporterConfig};
