//! Monitoring Module
//!
//! Provides observability for the reporter itself:
//! - Prometheus-format self-instrumentation behind a sink trait
//! - Structured logging setup

pub mod logging;
pub mod metrics;

pub use logging::{init_tracing, LogConfig, LogFormat};
pub use metrics::{Counter, Gauge, Histogram, MetricsCollector, MetricsSink, NoopSink};
