//! Metric Source Layer
//!
//! Trait-based metric sources supporting:
//! - Prometheus HTTP query API
//! - Static in-memory readings

pub mod adapter;
pub mod config;
pub mod factory;
pub mod fixed;
pub mod prometheus;

pub use adapter::{finite_sample, MetricSource, SourceKind};
pub use config::SourceConfig;
pub use factory::create_metric_source;
pub use fixed::StaticSource;
pub use prometheus::PrometheusSource;
