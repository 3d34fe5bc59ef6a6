//! slo-reporter: evaluate service level objectives against Prometheus and
//! print a report.

use clap::{Parser, ValueEnum};
use futures::future::AbortHandle;
use slo_reporter::config::{ReporterConfig, DEFAULT_SERVICE};
use slo_reporter::core::{ConfigError, SystemClock};
use slo_reporter::monitoring::{init_tracing, LogConfig, LogFormat, MetricsCollector};
use slo_reporter::report::{render_json, render_text, ReportAssembler};
use slo_reporter::source::create_metric_source;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

const EXIT_FAILURE: u8 = 1;
const EXIT_BREACHED: u8 = 2;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "slo-reporter", version, about = "Evaluate SLOs and error budgets from Prometheus")]
struct Cli {
    /// Prometheus base URL
    #[arg(long, env = "SLO_PROMETHEUS_URL")]
    prometheus_url: Option<String>,

    /// Report output format
    #[arg(long, value_enum, default_value = "text")]
    output: OutputFormat,

    /// TOML configuration file (built-in objectives when absent)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Service for the built-in objectives
    #[arg(long, default_value = DEFAULT_SERVICE)]
    service: String,

    /// Measurement window in days
    #[arg(long)]
    window_days: Option<u64>,

    /// Per-query timeout in seconds
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Overall deadline for the report in seconds
    #[arg(long)]
    deadline_secs: Option<u64>,

    /// Measure objectives concurrently
    #[arg(long)]
    concurrent: bool,

    /// Exit with status 2 when any SLO is breached
    #[arg(long)]
    fail_on_breach: bool,

    /// Write self-instrumentation metrics (Prometheus text format) to this file
    #[arg(long)]
    metrics_file: Option<PathBuf>,

    /// Log filter directive (RUST_LOG takes precedence)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Log output format
    #[arg(long, default_value = "text")]
    log_format: LogFormat,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let log_config = LogConfig {
        level: cli.log_level.clone(),
        format: cli.log_format,
    };
    if let Err(e) = init_tracing(&log_config) {
        eprintln!("error: {}", e);
        return ExitCode::from(EXIT_FAILURE);
    }

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %e, "SLO report failed");
            eprintln!("error: {}", e);
            ExitCode::from(EXIT_FAILURE)
        }
    }
}

async fn run(cli: Cli) -> slo_reporter::Result<ExitCode> {
    let config = load_config(&cli)?;
    let objectives = config.to_objectives()?;
    let source = create_metric_source(&config.source)?;
    let collector = Arc::new(MetricsCollector::with_reporter_metrics());

    let mut assembler = ReportAssembler::new(source, Arc::new(SystemClock), config.window())
        .with_metrics_sink(collector.clone())
        .concurrent(config.concurrent);
    if let Some(deadline) = config.deadline() {
        assembler = assembler.with_deadline(deadline);
    }

    let (abort_handle, registration) = AbortHandle::new_pair();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, cancelling report");
            abort_handle.abort();
        }
    });

    let result = assembler.build_abortable(&objectives, registration).await;
    interrupt.abort();

    if let Some(path) = &cli.metrics_file {
        write_metrics(path, &collector)?;
    }

    let report = result?;
    let rendered = match cli.output {
        OutputFormat::Text => render_text(&report),
        OutputFormat::Json => render_json(&report)?,
    };
    println!("{}", rendered.trim_end());

    if cli.fail_on_breach && !report.passes() {
        tracing::warn!(
            breached = report.breached().count(),
            "Failing run on breached SLOs"
        );
        return Ok(ExitCode::from(EXIT_BREACHED));
    }

    Ok(ExitCode::SUCCESS)
}

/// Configuration file or built-in objectives, with command line overrides applied.
fn load_config(cli: &Cli) -> Result<ReporterConfig, ConfigError> {
    let mut config = match &cli.config {
        Some(path) => ReporterConfig::load(path)?,
        None => ReporterConfig::for_service(&cli.service),
    };

    if let Some(url) = &cli.prometheus_url {
        config.source.url = url.clone();
    }
    if let Some(window_days) = cli.window_days {
        config.window_days = window_days;
    }
    if let Some(timeout_secs) = cli.timeout_secs {
        config.source.request_timeout_secs = timeout_secs;
    }
    if let Some(deadline_secs) = cli.deadline_secs {
        config.deadline_secs = Some(deadline_secs);
    }
    if cli.concurrent {
        config.concurrent = true;
    }

    Ok(config)
}

fn write_metrics(path: &Path, collector: &MetricsCollector) -> std::io::Result<()> {
    std::fs::write(path, collector.export_prometheus())?;
    tracing::debug!(path = %path.display(), "Metrics written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use slo_reporter::core::days;

    fn parse(args: &[&str]) -> Cli {
        let mut argv = vec!["slo-reporter"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_cli_defaults() {
        let cli = parse(&[]);
        assert_eq!(cli.output, OutputFormat::Text);
        assert_eq!(cli.service, DEFAULT_SERVICE);
        assert_eq!(cli.log_format, LogFormat::Text);
        assert!(!cli.fail_on_breach);
    }

    #[test]
    fn test_cli_rejects_unknown_output() {
        let result = Cli::try_parse_from(["slo-reporter", "--output", "yaml"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_overrides_applied() {
        let cli = parse(&[
            "--prometheus-url",
            "http://prom:9090",
            "--window-days",
            "7",
            "--timeout-secs",
            "5",
            "--deadline-secs",
            "20",
            "--concurrent",
            "--output",
            "json",
            "--log-format",
            "json",
        ]);
        assert_eq!(cli.output, OutputFormat::Json);
        assert_eq!(cli.log_format, LogFormat::Json);

        let config = load_config(&cli).unwrap();
        assert_eq!(config.source.url, "http://prom:9090");
        assert_eq!(config.window(), days(7));
        assert_eq!(config.source.request_timeout_secs, 5);
        assert_eq!(config.deadline_secs, Some(20));
        assert!(config.concurrent);
    }

    #[test]
    fn test_service_selects_builtin_objectives() {
        let cli = parse(&["--service", "checkout"]);
        let config = load_config(&cli).unwrap();
        let objectives = config.to_objectives().unwrap();
        assert!(objectives[0].indicator().query().contains(r#"service=~"checkout""#));
    }

    #[test]
    fn test_missing_config_file() {
        let cli = parse(&["--config", "/nonexistent/slo.toml"]);
        assert!(matches!(load_config(&cli), Err(ConfigError::Io(_))));
    }
}
