//! Report assembly.
//!
//! Measures every declared objective, evaluates it and packages the results
//! in declaration order. A single failed measurement fails the whole report.

use crate::core::error::ReportError;
use crate::core::types::{duration_secs, Clock, Timestamp};
use crate::monitoring::metrics::{
    MetricsSink, NoopSink, BUDGET_REMAINING_RATIO, BUDGET_SPENT_RATIO, BURN_RATE,
    MEASUREMENTS_TOTAL, MEASUREMENT_DURATION_SECONDS, MEASUREMENT_FAILURES_TOTAL, STATUS,
};
use crate::slo::{Evaluation, Evaluator, Objective, Status};
use crate::source::MetricSource;
use futures::future::{AbortRegistration, Abortable};
use futures::stream::{FuturesUnordered, TryStreamExt};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// An assembled SLO report.
///
/// Immutable once built; `passes` is derived from the evaluations.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Report {
    /// Generation timestamp
    generated_at: Timestamp,
    /// Measurement window
    #[serde(with = "duration_secs")]
    window: Duration,
    /// Evaluations in declaration order
    evaluations: Vec<Evaluation>,
    /// No evaluation is breached
    passes: bool,
}

impl Report {
    /// Package evaluations into a report.
    pub fn new(generated_at: Timestamp, window: Duration, evaluations: Vec<Evaluation>) -> Self {
        let passes = evaluations.iter().all(|e| e.status != Status::Breached);
        Self {
            generated_at,
            window,
            evaluations,
            passes,
        }
    }

    /// Generation timestamp.
    pub fn generated_at(&self) -> Timestamp {
        self.generated_at
    }

    /// Measurement window.
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Evaluations in declaration order.
    pub fn evaluations(&self) -> &[Evaluation] {
        &self.evaluations
    }

    /// Whether every objective is un-breached. Used for gating.
    pub fn passes(&self) -> bool {
        self.passes
    }

    /// Evaluations with `Breached` status.
    pub fn breached(&self) -> impl Iterator<Item = &Evaluation> {
        self.evaluations.iter().filter(|e| e.is_breached())
    }

    /// Worst status across all evaluations.
    pub fn worst_status(&self) -> Status {
        self.evaluations
            .iter()
            .map(|e| e.status)
            .max()
            .unwrap_or(Status::Healthy)
    }
}

/// Report assembler.
pub struct ReportAssembler {
    /// Metric source
    source: Arc<dyn MetricSource>,
    /// Current-time provider
    clock: Arc<dyn Clock>,
    /// Objective evaluator
    evaluator: Evaluator,
    /// Self-instrumentation sink
    sink: Arc<dyn MetricsSink>,
    /// Window stated on the report
    window: Duration,
    /// Measure objectives concurrently
    concurrent: bool,
    /// Upper bound on one report generation
    deadline: Option<Duration>,
}

impl ReportAssembler {
    /// Create a new assembler.
    pub fn new(source: Arc<dyn MetricSource>, clock: Arc<dyn Clock>, window: Duration) -> Self {
        Self {
            source,
            clock,
            evaluator: Evaluator::new(),
            sink: Arc::new(NoopSink),
            window,
            concurrent: false,
            deadline: None,
        }
    }

    /// Use a custom evaluator.
    pub fn with_evaluator(mut self, evaluator: Evaluator) -> Self {
        self.evaluator = evaluator;
        self
    }

    /// Record self-instrumentation into `sink`.
    pub fn with_metrics_sink(mut self, sink: Arc<dyn MetricsSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Measure objectives concurrently.
    pub fn concurrent(mut self, concurrent: bool) -> Self {
        self.concurrent = concurrent;
        self
    }

    /// Bound the whole generation by `deadline`.
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Build a report for `objectives`.
    ///
    /// Every objective is re-measured. The first failed measurement aborts
    /// the run and any measurements still in flight are dropped.
    pub async fn build(&self, objectives: &[Objective]) -> Result<Report, ReportError> {
        match self.deadline {
            Some(deadline) => tokio::time::timeout(deadline, self.assemble(objectives))
                .await
                .map_err(|_| {
                    tracing::error!(deadline = ?deadline, "Report deadline exceeded");
                    ReportError::DeadlineExceeded(deadline)
                })?,
            None => self.assemble(objectives).await,
        }
    }

    /// Build a report that can be cancelled as a unit through the matching
    /// `AbortHandle`. Partial results are discarded on cancellation.
    pub async fn build_abortable(
        &self,
        objectives: &[Objective],
        registration: AbortRegistration,
    ) -> Result<Report, ReportError> {
        Abortable::new(self.build(objectives), registration)
            .await
            .map_err(|_| {
                tracing::warn!("Report generation cancelled");
                ReportError::Cancelled
            })?
    }

    async fn assemble(&self, objectives: &[Objective]) -> Result<Report, ReportError> {
        tracing::info!(
            objectives = objectives.len(),
            source = %self.source.kind(),
            concurrent = self.concurrent,
            "Assembling SLO report"
        );

        let readings = if self.concurrent {
            self.measure_concurrent(objectives).await?
        } else {
            self.measure_sequential(objectives).await?
        };

        let evaluations: Vec<Evaluation> = objectives
            .iter()
            .zip(readings)
            .map(|(objective, value)| {
                let evaluation =
                    self.evaluator
                        .evaluate(objective, value, objective.indicator().window());
                self.record_evaluation(&evaluation);
                evaluation
            })
            .collect();

        let report = Report::new(self.clock.now(), self.window, evaluations);
        tracing::info!(
            passes = report.passes(),
            worst = %report.worst_status(),
            "SLO report assembled"
        );
        Ok(report)
    }

    async fn measure_sequential(&self, objectives: &[Objective]) -> Result<Vec<f64>, ReportError> {
        let mut readings = Vec::with_capacity(objectives.len());
        for objective in objectives {
            readings.push(self.measure(objective).await?);
        }
        Ok(readings)
    }

    /// Fan out all measurements, then restore declaration order by index.
    async fn measure_concurrent(&self, objectives: &[Objective]) -> Result<Vec<f64>, ReportError> {
        let mut pending: FuturesUnordered<_> = objectives
            .iter()
            .enumerate()
            .map(|(index, objective)| async move {
                self.measure(objective).await.map(|value| (index, value))
            })
            .collect();

        let mut by_index = BTreeMap::new();
        while let Some((index, value)) = pending.try_next().await? {
            by_index.insert(index, value);
        }

        Ok(by_index.into_values().collect())
    }

    async fn measure(&self, objective: &Objective) -> Result<f64, ReportError> {
        let indicator = objective.indicator();
        let labels = [("indicator", indicator.name())];

        self.sink.inc_counter(MEASUREMENTS_TOTAL, &labels);
        let started = Instant::now();
        let result = self.source.measure(indicator).await;
        self.sink
            .observe(MEASUREMENT_DURATION_SECONDS, &labels, started.elapsed().as_secs_f64());

        match result {
            Ok(value) => {
                tracing::debug!(
                    objective = %objective.name(),
                    indicator = %indicator.name(),
                    value,
                    "Indicator measured"
                );
                Ok(value)
            }
            Err(source) => {
                self.sink.inc_counter(
                    MEASUREMENT_FAILURES_TOTAL,
                    &[("indicator", indicator.name()), ("reason", source.reason())],
                );
                tracing::error!(
                    objective = %objective.name(),
                    indicator = %indicator.name(),
                    error = %source,
                    "Indicator measurement failed"
                );
                Err(ReportError::Measurement {
                    objective: objective.name().to_string(),
                    indicator: indicator.name().to_string(),
                    source,
                })
            }
        }
    }

    fn record_evaluation(&self, evaluation: &Evaluation) {
        let labels = [("slo", evaluation.objective.as_str())];
        self.sink
            .set_gauge(BUDGET_SPENT_RATIO, &labels, evaluation.budget_spent_fraction);
        self.sink
            .set_gauge(BUDGET_REMAINING_RATIO, &labels, evaluation.budget_left_fraction);
        self.sink.set_gauge(BURN_RATE, &labels, evaluation.burn_rate);
        self.sink
            .set_gauge(STATUS, &labels, f64::from(evaluation.status.code()));

        match evaluation.status {
            Status::Breached => tracing::warn!(
                slo = %evaluation.objective,
                budget_spent = evaluation.budget_spent_fraction,
                burn_rate = evaluation.burn_rate,
                "SLO breached"
            ),
            Status::Warning => tracing::warn!(
                slo = %evaluation.objective,
                budget_spent = evaluation.budget_spent_fraction,
                "SLO error budget running low"
            ),
            Status::Healthy => tracing::debug!(
                slo = %evaluation.objective,
                budget_spent = evaluation.budget_spent_fraction,
                "SLO healthy"
            ),
        }
    }
}

/// Build a report sequentially with default settings.
///
/// The report window is that of the first objective.
pub async fn build_report(
    objectives: &[Objective],
    source: Arc<dyn MetricSource>,
    clock: Arc<dyn Clock>,
) -> Result<Report, ReportError> {
    let window = objectives
        .first()
        .map(|o| o.indicator().window())
        .unwrap_or_default();
    ReportAssembler::new(source, clock, window).build(objectives).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::MeasurementError;
    use crate::core::types::{days, FixedClock};
    use crate::monitoring::metrics::MetricsCollector;
    use crate::slo::Indicator;
    use crate::source::StaticSource;
    use chrono::TimeZone;
    use futures::future::AbortHandle;
    use tokio_test::assert_err;

    fn clock() -> Arc<dyn Clock> {
        Arc::new(FixedClock(
            chrono::Utc.with_ymd_and_hms(2024, 6, 1, 8, 30, 0).unwrap(),
        ))
    }

    fn availability() -> Objective {
        let indicator = Indicator::new("availability", "sum(rate(ok[30d]))", days(30)).unwrap();
        Objective::ratio("availability", indicator, 0.999).unwrap()
    }

    fn latency() -> Objective {
        let indicator =
            Indicator::new("latency_p95", "histogram_quantile(0.95, x)", days(30)).unwrap();
        Objective::latency("latency", indicator, 0.5, 0.05).unwrap()
    }

    fn objectives() -> Vec<Objective> {
        vec![availability(), latency()]
    }

    #[tokio::test]
    async fn test_report_in_declaration_order() {
        let source = Arc::new(
            StaticSource::new()
                .with_value("availability", 0.9995)
                .with_value("latency_p95", 0.6),
        );

        let report = build_report(&objectives(), source, clock()).await.unwrap();
        let names: Vec<&str> = report.evaluations().iter().map(|e| e.objective.as_str()).collect();
        assert_eq!(names, vec!["availability", "latency"]);
        assert_eq!(report.window(), days(30));
        assert_eq!(report.generated_at(), clock().now());
        assert!(report.passes());
        assert_eq!(report.worst_status(), Status::Healthy);
    }

    #[tokio::test]
    async fn test_breach_fails_gate() {
        let source = Arc::new(
            StaticSource::new()
                .with_value("availability", 0.98)
                .with_value("latency_p95", 0.45),
        );

        let report = build_report(&objectives(), source, clock()).await.unwrap();
        assert!(!report.passes());
        assert_eq!(report.breached().count(), 1);
        assert_eq!(report.worst_status(), Status::Breached);
    }

    #[tokio::test]
    async fn test_warning_still_passes() {
        // 0.99911 -> ~89% of budget spent
        let source = Arc::new(
            StaticSource::new()
                .with_value("availability", 0.99911)
                .with_value("latency_p95", 0.45),
        );

        let report = build_report(&objectives(), source, clock()).await.unwrap();
        assert_eq!(report.evaluations()[0].status, Status::Warning);
        assert!(report.passes());
    }

    #[tokio::test]
    async fn test_no_data_fails_whole_report() {
        let source = Arc::new(StaticSource::new().with_value("availability", 0.9995));

        let err = assert_err!(build_report(&objectives(), source, clock()).await);
        match err {
            ReportError::Measurement {
                objective,
                indicator,
                source,
            } => {
                assert_eq!(objective, "latency");
                assert_eq!(indicator, "latency_p95");
                assert_eq!(source, MeasurementError::NoData);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_nan_reading_fails_report() {
        let source = Arc::new(
            StaticSource::new()
                .with_value("availability", f64::NAN)
                .with_value("latency_p95", 0.45),
        );

        let err = assert_err!(build_report(&objectives(), source, clock()).await);
        assert_eq!(err.measurement(), Some(&MeasurementError::NoData));
        assert!(matches!(
            err,
            ReportError::Measurement { ref objective, .. } if objective == "availability"
        ));
    }

    #[tokio::test]
    async fn test_sequential_stops_at_first_failure() {
        let source = Arc::new(
            StaticSource::new()
                .with_error("availability", MeasurementError::Unreachable("refused".into()))
                .with_value("latency_p95", 0.45),
        );

        let assembler = ReportAssembler::new(source.clone(), clock(), days(30));
        let err = assert_err!(assembler.build(&objectives()).await);
        assert_eq!(
            err.measurement(),
            Some(&MeasurementError::Unreachable("refused".into()))
        );
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_preserves_declaration_order() {
        let source = Arc::new(
            StaticSource::new()
                .with_value("availability", 0.9995)
                .with_delay("availability", Duration::from_millis(100))
                .with_value("latency_p95", 0.6),
        );

        let assembler = ReportAssembler::new(source, clock(), days(30)).concurrent(true);
        let report = assembler.build(&objectives()).await.unwrap();

        let names: Vec<&str> = report.evaluations().iter().map(|e| e.objective.as_str()).collect();
        assert_eq!(names, vec!["availability", "latency"]);
        assert_eq!(report.evaluations()[0].current_value, 0.9995);
        assert_eq!(report.evaluations()[1].current_value, 0.6);
    }

    #[tokio::test]
    async fn test_concurrent_matches_sequential() {
        let source = Arc::new(
            StaticSource::new()
                .with_value("availability", 0.9981)
                .with_value("latency_p95", 0.72),
        );

        let sequential = ReportAssembler::new(source.clone(), clock(), days(30))
            .build(&objectives())
            .await
            .unwrap();
        let concurrent = ReportAssembler::new(source, clock(), days(30))
            .concurrent(true)
            .build(&objectives())
            .await
            .unwrap();
        assert_eq!(sequential, concurrent);
    }

    #[tokio::test]
    async fn test_concurrent_failure_fails_report() {
        let source = Arc::new(
            StaticSource::new()
                .with_value("availability", 0.9995)
                .with_delay("availability", Duration::from_secs(10))
                .with_error(
                    "latency_p95",
                    MeasurementError::BackendRejected {
                        status: 503,
                        message: "unavailable".into(),
                    },
                ),
        );

        let started = Instant::now();
        let assembler = ReportAssembler::new(source, clock(), days(30)).concurrent(true);
        let err = assert_err!(assembler.build(&objectives()).await);

        assert!(started.elapsed() < Duration::from_secs(5));
        assert!(matches!(
            err,
            ReportError::Measurement { ref objective, .. } if objective == "latency"
        ));
    }

    #[tokio::test]
    async fn test_deadline_exceeded() {
        let source = Arc::new(
            StaticSource::new()
                .with_value("availability", 0.9995)
                .with_delay("availability", Duration::from_secs(10))
                .with_value("latency_p95", 0.45),
        );

        let assembler = ReportAssembler::new(source, clock(), days(30))
            .with_deadline(Duration::from_millis(50));
        let err = assert_err!(assembler.build(&objectives()).await);
        assert_eq!(err, ReportError::DeadlineExceeded(Duration::from_millis(50)));
    }

    #[tokio::test]
    async fn test_cancelled_as_unit() {
        let source = Arc::new(
            StaticSource::new()
                .with_value("availability", 0.9995)
                .with_value("latency_p95", 0.45),
        );

        let (handle, registration) = AbortHandle::new_pair();
        handle.abort();

        let assembler = ReportAssembler::new(source, clock(), days(30));
        let err = assert_err!(assembler.build_abortable(&objectives(), registration).await);
        assert_eq!(err, ReportError::Cancelled);
    }

    #[tokio::test]
    async fn test_every_run_measures_from_scratch() {
        let source = Arc::new(
            StaticSource::new()
                .with_value("availability", 0.9995)
                .with_value("latency_p95", 0.45),
        );

        let assembler = ReportAssembler::new(source.clone(), clock(), days(30));
        let first = assembler.build(&objectives()).await.unwrap();
        let second = assembler.build(&objectives()).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(source.calls(), 4);
    }

    #[tokio::test]
    async fn test_metrics_recorded() {
        let source = Arc::new(
            StaticSource::new()
                .with_value("availability", 0.98)
                .with_value("latency_p95", 0.45),
        );
        let collector = Arc::new(MetricsCollector::with_reporter_metrics());

        let assembler = ReportAssembler::new(source, clock(), days(30))
            .with_metrics_sink(collector.clone());
        assembler.build(&objectives()).await.unwrap();

        assert_eq!(
            collector.get_counter(MEASUREMENTS_TOTAL, &[("indicator", "availability")]),
            Some(1)
        );
        assert_eq!(
            collector.get_histogram_count(MEASUREMENT_DURATION_SECONDS, &[("indicator", "latency_p95")]),
            Some(1)
        );
        assert_eq!(collector.get_gauge(STATUS, &[("slo", "availability")]), Some(2.0));
        assert_eq!(collector.get_gauge(STATUS, &[("slo", "latency")]), Some(0.0));
        assert_eq!(collector.get_gauge(BURN_RATE, &[("slo", "latency")]), Some(0.0));
    }

    #[tokio::test]
    async fn test_failure_metrics_recorded() {
        let source = Arc::new(StaticSource::new());
        let collector = Arc::new(MetricsCollector::with_reporter_metrics());

        let assembler = ReportAssembler::new(source, clock(), days(30))
            .with_metrics_sink(collector.clone());
        assert!(assembler.build(&objectives()).await.is_err());

        assert_eq!(
            collector.get_counter(
                MEASUREMENT_FAILURES_TOTAL,
                &[("indicator", "availability"), ("reason", "no_data")]
            ),
            Some(1)
        );
        assert_eq!(collector.get_gauge(STATUS, &[("slo", "availability")]), None);
    }

    #[tokio::test]
    async fn test_empty_objectives() {
        let report = build_report(&[], Arc::new(StaticSource::new()), clock())
            .await
            .unwrap();
        assert!(report.evaluations().is_empty());
        assert!(report.passes());
        assert_eq!(report.window(), Duration::ZERO);
    }

    #[test]
    fn test_report_json() {
        let evaluation = crate::slo::evaluate(&availability(), 0.98, days(30));
        let report = Report::new(clock().now(), days(30), vec![evaluation]);
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["passes"], false);
        assert_eq!(json["evaluations"][0]["status"], "Breached");
        assert_eq!(json["window"].as_f64().unwrap(), days(30).as_secs_f64());
    }
}
