//! Prometheus-style self-instrumentation.
//!
//! Provides the [`MetricsSink`] seam plus an in-memory collector with
//! counters, gauges and histograms exported in text exposition format.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};

/// Measurements issued, by indicator.
pub const MEASUREMENTS_TOTAL: &str = "slo_measurements_total";
/// Failed measurements, by indicator and reason.
pub const MEASUREMENT_FAILURES_TOTAL: &str = "slo_measurement_failures_total";
/// Measurement latency in seconds.
pub const MEASUREMENT_DURATION_SECONDS: &str = "slo_measurement_duration_seconds";
/// Fraction of error budget consumed, by objective.
pub const BUDGET_SPENT_RATIO: &str = "slo_error_budget_spent_ratio";
/// Fraction of error budget left, by objective.
pub const BUDGET_REMAINING_RATIO: &str = "slo_error_budget_remaining_ratio";
/// Burn rate, by objective.
pub const BURN_RATE: &str = "slo_burn_rate";
/// Status code (0 healthy, 1 warning, 2 breached), by objective.
pub const STATUS: &str = "slo_status";

/// Destination for self-instrumentation.
///
/// Passed explicitly to the components that record into it; there is no
/// process-wide registry.
pub trait MetricsSink: Send + Sync {
    /// Increment a counter series by one.
    fn inc_counter(&self, name: &str, labels: &[(&str, &str)]);

    /// Set a gauge series.
    fn set_gauge(&self, name: &str, labels: &[(&str, &str)], value: f64);

    /// Observe a value into a histogram series.
    fn observe(&self, name: &str, labels: &[(&str, &str)], value: f64);
}

/// Sink that drops everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl MetricsSink for NoopSink {
    fn inc_counter(&self, _name: &str, _labels: &[(&str, &str)]) {}

    fn set_gauge(&self, _name: &str, _labels: &[(&str, &str)], _value: f64) {}

    fn observe(&self, _name: &str, _labels: &[(&str, &str)], _value: f64) {}
}

/// A counter metric (monotonically increasing).
#[derive(Debug, Default)]
pub struct Counter {
    value: AtomicU64,
}

impl Counter {
    /// Create a new counter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Increment by 1.
    pub fn inc(&self) {
        self.value.fetch_add(1, Ordering::Relaxed);
    }

    /// Get current value.
    pub fn get(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }
}

/// A gauge metric (can go up or down).
#[derive(Debug, Default)]
pub struct Gauge {
    value: AtomicU64, // f64 bits
}

impl Gauge {
    /// Create a new gauge.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the gauge value.
    pub fn set(&self, value: f64) {
        self.value.store(value.to_bits(), Ordering::Relaxed);
    }

    /// Get current value.
    pub fn get(&self) -> f64 {
        f64::from_bits(self.value.load(Ordering::Relaxed))
    }
}

/// A histogram metric for measuring distributions.
#[derive(Debug)]
pub struct Histogram {
    buckets: Vec<f64>,
    bucket_counts: Vec<AtomicU64>,
    sum: AtomicU64, // f64 bits
    count: AtomicU64,
}

impl Histogram {
    /// Create a new histogram with default buckets.
    pub fn new() -> Self {
        Self::with_buckets(DEFAULT_BUCKETS.to_vec())
    }

    /// Create with custom buckets.
    pub fn with_buckets(mut buckets: Vec<f64>) -> Self {
        buckets.retain(|b| b.is_finite());
        buckets.sort_by(f64::total_cmp);
        buckets.dedup();

        let bucket_counts = buckets.iter().map(|_| AtomicU64::new(0)).collect();
        Self {
            buckets,
            bucket_counts,
            sum: AtomicU64::new(0f64.to_bits()),
            count: AtomicU64::new(0),
        }
    }

    /// Observe a value.
    pub fn observe(&self, value: f64) {
        // Cumulative buckets
        for (i, bucket) in self.buckets.iter().enumerate() {
            if value <= *bucket {
                self.bucket_counts[i].fetch_add(1, Ordering::Relaxed);
            }
        }

        let _ = self
            .sum
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |bits| {
                Some((f64::from_bits(bits) + value).to_bits())
            });
        self.count.fetch_add(1, Ordering::Relaxed);
    }

    /// Get observation count.
    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    /// Get sum of observations.
    pub fn sum(&self) -> f64 {
        f64::from_bits(self.sum.load(Ordering::Relaxed))
    }

    /// Cumulative `(upper_bound, count)` pairs, excluding `+Inf`.
    pub fn buckets(&self) -> Vec<(f64, u64)> {
        self.buckets
            .iter()
            .zip(&self.bucket_counts)
            .map(|(bound, count)| (*bound, count.load(Ordering::Relaxed)))
            .collect()
    }
}

impl Default for Histogram {
    fn default() -> Self {
        Self::new()
    }
}

/// Default histogram buckets (seconds).
pub const DEFAULT_BUCKETS: [f64; 11] = [0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0];

/// Metric metadata.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MetricInfo {
    /// Metric name
    pub name: String,
    /// Help text
    pub help: String,
    /// Metric type
    pub metric_type: MetricType,
    /// Histogram bucket bounds
    #[serde(default)]
    pub buckets: Vec<f64>,
}

/// Metric type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MetricType {
    Counter,
    Gauge,
    Histogram,
}

impl MetricType {
    fn as_str(&self) -> &'static str {
        match self {
            MetricType::Counter => "counter",
            MetricType::Gauge => "gauge",
            MetricType::Histogram => "histogram",
        }
    }
}

/// Series of one family, keyed by rendered label set.
type Series<T> = RwLock<BTreeMap<String, BTreeMap<String, T>>>;

/// In-memory metrics collector.
///
/// Families must be registered before use; updates to unregistered names
/// are ignored.
#[derive(Debug, Default)]
pub struct MetricsCollector {
    /// Counters
    counters: Series<Counter>,
    /// Gauges
    gauges: Series<Gauge>,
    /// Histograms
    histograms: Series<Histogram>,
    /// Metric info
    info: RwLock<BTreeMap<String, MetricInfo>>,
}

impl MetricsCollector {
    /// Create a new metrics collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a collector with every family the report assembler emits.
    pub fn with_reporter_metrics() -> Self {
        let collector = Self::new();
        collector.register_counter(MEASUREMENTS_TOTAL, "Indicator measurements issued.");
        collector.register_counter(
            MEASUREMENT_FAILURES_TOTAL,
            "Indicator measurements that failed, by reason.",
        );
        collector.register_histogram(
            MEASUREMENT_DURATION_SECONDS,
            "Latency of indicator measurements in seconds.",
            DEFAULT_BUCKETS.to_vec(),
        );
        collector.register_gauge(BUDGET_SPENT_RATIO, "Fraction of the error budget consumed.");
        collector.register_gauge(BUDGET_REMAINING_RATIO, "Fraction of the error budget left.");
        collector.register_gauge(BURN_RATE, "Error budget burn rate relative to one budget per window.");
        collector.register_gauge(STATUS, "SLO status: 0 healthy, 1 warning, 2 breached.");
        collector
    }

    /// Register a counter.
    pub fn register_counter(&self, name: &str, help: &str) {
        self.register(name, help, MetricType::Counter, Vec::new());
    }

    /// Register a gauge.
    pub fn register_gauge(&self, name: &str, help: &str) {
        self.register(name, help, MetricType::Gauge, Vec::new());
    }

    /// Register a histogram.
    pub fn register_histogram(&self, name: &str, help: &str, buckets: Vec<f64>) {
        self.register(name, help, MetricType::Histogram, buckets);
    }

    fn register(&self, name: &str, help: &str, metric_type: MetricType, buckets: Vec<f64>) {
        let mut info = self.info.write().unwrap_or_else(PoisonError::into_inner);
        info.insert(
            name.to_string(),
            MetricInfo {
                name: name.to_string(),
                help: help.to_string(),
                metric_type,
                buckets,
            },
        );
    }

    fn registered(&self, name: &str, metric_type: MetricType) -> Option<MetricInfo> {
        self.info
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .filter(|info| info.metric_type == metric_type)
            .cloned()
    }

    /// Get counter value.
    pub fn get_counter(&self, name: &str, labels: &[(&str, &str)]) -> Option<u64> {
        self.counters
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)?
            .get(&render_labels(labels))
            .map(Counter::get)
    }

    /// Get gauge value.
    pub fn get_gauge(&self, name: &str, labels: &[(&str, &str)]) -> Option<f64> {
        self.gauges
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)?
            .get(&render_labels(labels))
            .map(Gauge::get)
    }

    /// Get histogram observation count.
    pub fn get_histogram_count(&self, name: &str, labels: &[(&str, &str)]) -> Option<u64> {
        self.histograms
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)?
            .get(&render_labels(labels))
            .map(Histogram::count)
    }

    /// Export metrics in Prometheus format.
    pub fn export_prometheus(&self) -> String {
        let mut output = String::new();
        let info = self.info.read().unwrap_or_else(PoisonError::into_inner);
        let counters = self.counters.read().unwrap_or_else(PoisonError::into_inner);
        let gauges = self.gauges.read().unwrap_or_else(PoisonError::into_inner);
        let histograms = self.histograms.read().unwrap_or_else(PoisonError::into_inner);

        for (name, meta) in info.iter() {
            let _ = writeln!(output, "# HELP {} {}", name, meta.help);
            let _ = writeln!(output, "# TYPE {} {}", name, meta.metric_type.as_str());

            match meta.metric_type {
                MetricType::Counter => {
                    for (labels, counter) in counters.get(name).into_iter().flatten() {
                        let _ = writeln!(output, "{}{} {}", name, labels, counter.get());
                    }
                }
                MetricType::Gauge => {
                    for (labels, gauge) in gauges.get(name).into_iter().flatten() {
                        let _ = writeln!(output, "{}{} {}", name, labels, gauge.get());
                    }
                }
                MetricType::Histogram => {
                    for (labels, histogram) in histograms.get(name).into_iter().flatten() {
                        for (bound, count) in histogram.buckets() {
                            let _ = writeln!(
                                output,
                                "{}_bucket{} {}",
                                name,
                                with_label(labels, "le", &bound.to_string()),
                                count
                            );
                        }
                        let _ = writeln!(
                            output,
                            "{}_bucket{} {}",
                            name,
                            with_label(labels, "le", "+Inf"),
                            histogram.count()
                        );
                        let _ = writeln!(output, "{}_sum{} {}", name, labels, histogram.sum());
                        let _ = writeln!(output, "{}_count{} {}", name, labels, histogram.count());
                    }
                }
            }
        }

        output
    }
}

impl MetricsSink for MetricsCollector {
    fn inc_counter(&self, name: &str, labels: &[(&str, &str)]) {
        if self.registered(name, MetricType::Counter).is_none() {
            return;
        }
        let mut counters = self.counters.write().unwrap_or_else(PoisonError::into_inner);
        counters
            .entry(name.to_string())
            .or_default()
            .entry(render_labels(labels))
            .or_default()
            .inc();
    }

    fn set_gauge(&self, name: &str, labels: &[(&str, &str)], value: f64) {
        if self.registered(name, MetricType::Gauge).is_none() {
            return;
        }
        let mut gauges = self.gauges.write().unwrap_or_else(PoisonError::into_inner);
        gauges
            .entry(name.to_string())
            .or_default()
            .entry(render_labels(labels))
            .or_default()
            .set(value);
    }

    fn observe(&self, name: &str, labels: &[(&str, &str)], value: f64) {
        let Some(meta) = self.registered(name, MetricType::Histogram) else {
            return;
        };
        let mut histograms = self.histograms.write().unwrap_or_else(PoisonError::into_inner);
        histograms
            .entry(name.to_string())
            .or_default()
            .entry(render_labels(labels))
            .or_insert_with(|| Histogram::with_buckets(meta.buckets.clone()))
            .observe(value);
    }
}

/// Render a label set as `{k="v",...}`, or nothing when empty.
fn render_labels(labels: &[(&str, &str)]) -> String {
    if labels.is_empty() {
        return String::new();
    }
    let pairs: Vec<String> = labels
        .iter()
        .map(|(k, v)| format!("{}=\"{}\"", k, escape_label_value(v)))
        .collect();
    format!("{{{}}}", pairs.join(","))
}

/// Append one label to an already rendered label set.
fn with_label(rendered: &str, key: &str, value: &str) -> String {
    let pair = format!("{}=\"{}\"", key, escape_label_value(value));
    match rendered.strip_suffix('}') {
        Some(open) => format!("{},{}}}", open, pair),
        None => format!("{{{}}}", pair),
    }
}

fn escape_label_value(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counter() {
        let counter = Counter::new();
        assert_eq!(counter.get(), 0);

        counter.inc();
        counter.inc();
        assert_eq!(counter.get(), 2);
    }

    #[test]
    fn test_gauge() {
        let gauge = Gauge::new();
        assert_eq!(gauge.get(), 0.0);

        gauge.set(-0.25);
        assert_eq!(gauge.get(), -0.25);
    }

    #[test]
    fn test_histogram() {
        let histogram = Histogram::with_buckets(vec![1.0, 0.1, 0.5]);
        histogram.observe(0.1);
        histogram.observe(0.5);
        histogram.observe(2.0);

        assert_eq!(histogram.count(), 3);
        assert!((histogram.sum() - 2.6).abs() < 1e-10);
        assert_eq!(histogram.buckets(), vec![(0.1, 1), (0.5, 2), (1.0, 2)]);
    }

    #[test]
    fn test_collector_ignores_unregistered() {
        let collector = MetricsCollector::new();
        collector.inc_counter("unknown_total", &[]);
        collector.set_gauge("unknown", &[], 1.0);
        assert_eq!(collector.get_counter("unknown_total", &[]), None);
        assert_eq!(collector.get_gauge("unknown", &[]), None);
        assert!(collector.export_prometheus().is_empty());
    }

    #[test]
    fn test_collector_labelled_series() {
        let collector = MetricsCollector::with_reporter_metrics();
        collector.inc_counter(MEASUREMENTS_TOTAL, &[("indicator", "availability")]);
        collector.inc_counter(MEASUREMENTS_TOTAL, &[("indicator", "availability")]);
        collector.inc_counter(MEASUREMENTS_TOTAL, &[("indicator", "latency_p95")]);
        collector.set_gauge(BURN_RATE, &[("slo", "availability")], 20.0);

        assert_eq!(
            collector.get_counter(MEASUREMENTS_TOTAL, &[("indicator", "availability")]),
            Some(2)
        );
        assert_eq!(
            collector.get_counter(MEASUREMENTS_TOTAL, &[("indicator", "latency_p95")]),
            Some(1)
        );
        assert_eq!(collector.get_gauge(BURN_RATE, &[("slo", "availability")]), Some(20.0));
    }

    #[test]
    fn test_type_mismatch_ignored() {
        let collector = MetricsCollector::with_reporter_metrics();
        collector.set_gauge(MEASUREMENTS_TOTAL, &[], 4.0);
        assert_eq!(collector.get_gauge(MEASUREMENTS_TOTAL, &[]), None);
    }

    #[test]
    fn test_prometheus_export() {
        let collector = MetricsCollector::with_reporter_metrics();
        collector.set_gauge(STATUS, &[("slo", "availability")], 2.0);
        collector.observe(MEASUREMENT_DURATION_SECONDS, &[("indicator", "availability")], 0.2);

        let output = collector.export_prometheus();
        assert!(output.contains("# HELP slo_status SLO status"));
        assert!(output.contains("# TYPE slo_status gauge"));
        assert!(output.contains("slo_status{slo=\"availability\"} 2"));
        assert!(output.contains(
            "slo_measurement_duration_seconds_bucket{indicator=\"availability\",le=\"0.25\"} 1"
        ));
        assert!(output.contains(
            "slo_measurement_duration_seconds_bucket{indicator=\"availability\",le=\"+Inf\"} 1"
        ));
        assert!(output.contains("slo_measurement_duration_seconds_count{indicator=\"availability\"} 1"));
    }

    #[test]
    fn test_label_escaping() {
        assert_eq!(render_labels(&[]), "");
        assert_eq!(render_labels(&[("slo", "a\"b")]), "{slo=\"a\\\"b\"}");
        assert_eq!(with_label("", "le", "1"), "{le=\"1\"}");
        assert_eq!(with_label("{a=\"x\"}", "le", "1"), "{a=\"x\",le=\"1\"}");
    }

    #[test]
    fn test_noop_sink() {
        let sink: &dyn MetricsSink = &NoopSink;
        sink.inc_counter(MEASUREMENTS_TOTAL, &[]);
        sink.set_gauge(STATUS, &[], 1.0);
        sink.observe(MEASUREMENT_DURATION_SECONDS, &[], 0.1);
    }
}
