//! Report rendering.
//!
//! Text output for humans and a JSON array of evaluations for machines.
//! Rendering never changes stored values; the text form clamps budget
//! figures for display only.

use super::assembler::Report;
use crate::core::error::Result;
use crate::core::types::as_days;
use crate::slo::{Direction, Evaluation, Status};
use std::fmt::Write;
use std::time::Duration;

const BANNER_WIDTH: usize = 80;

/// Render a report as human-readable text.
pub fn render_text(report: &Report) -> String {
    let heavy = "=".repeat(BANNER_WIDTH);
    let light = "-".repeat(BANNER_WIDTH);
    let mut out = String::new();

    let _ = writeln!(out, "{}", heavy);
    let _ = writeln!(out, "SLO REPORT");
    let _ = writeln!(out, "{}", heavy);
    let _ = writeln!(out, "Window: {} days", format_days(report.window()));
    let _ = writeln!(out, "Generated: {}", report.generated_at().to_rfc3339());

    for evaluation in report.evaluations() {
        let _ = writeln!(out);
        let _ = writeln!(out, "{}", light);
        write_evaluation(&mut out, evaluation);
    }

    let breached = report.breached().count();
    let _ = writeln!(out);
    let _ = writeln!(out, "{}", heavy);
    let _ = writeln!(
        out,
        "Result: {} ({} SLOs, {} breached)",
        if report.passes() { "PASS" } else { "FAIL" },
        report.evaluations().len(),
        breached
    );
    let _ = writeln!(out, "{}", heavy);

    out
}

/// Render the evaluations as a pretty-printed JSON array.
pub fn render_json(report: &Report) -> Result<String> {
    Ok(serde_json::to_string_pretty(report.evaluations())?)
}

fn write_evaluation(out: &mut String, evaluation: &Evaluation) {
    let _ = writeln!(out, "SLO: {}", evaluation.objective);
    let _ = writeln!(out, "Status: {}", status_marker(evaluation.status));
    let _ = writeln!(out, "Current Value: {:.4}", evaluation.current_value);
    let _ = writeln!(out, "Target: {:.4}", evaluation.target);

    // Unit lines are labelled with the objective name
    let label = &evaluation.objective;
    match evaluation.direction {
        Direction::HigherIsBetter => {
            let _ = writeln!(
                out,
                "Current {}: {}",
                label,
                percent(evaluation.current_value)
            );
            let _ = writeln!(out, "Target {}: {}", label, percent(evaluation.target));
        }
        Direction::LowerIsBetter => {
            let _ = writeln!(
                out,
                "Current {}: {}",
                label,
                millis(evaluation.current_value)
            );
            let _ = writeln!(out, "Target {}: {}", label, millis(evaluation.target));
        }
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "Error Budget:");
    let _ = writeln!(out, "  Total Budget: {}", percent(evaluation.error_budget));
    let _ = writeln!(
        out,
        "  Budget Spent: {}",
        percent(evaluation.budget_spent_fraction.max(0.0))
    );
    let _ = writeln!(
        out,
        "  Budget Left: {}",
        percent(evaluation.budget_left_fraction.min(1.0))
    );
    let _ = writeln!(out, "  Burn Rate: {:.2}x", evaluation.burn_rate);

    if let Some(eta) = evaluation.projected_exhaustion {
        let _ = writeln!(
            out,
            "  ⚠️  At current burn rate, error budget will be exhausted in {}",
            format_eta(eta)
        );
    }
}

fn status_marker(status: Status) -> &'static str {
    match status {
        Status::Healthy => "✅ Healthy",
        Status::Warning => "⚠️  Warning",
        Status::Breached => "❌ Breached",
    }
}

fn percent(fraction: f64) -> String {
    format!("{:.2}%", fraction * 100.0)
}

fn millis(seconds: f64) -> String {
    format!("{:.0}ms", seconds * 1000.0)
}

fn format_days(window: Duration) -> String {
    let days = as_days(window);
    if days.fract() == 0.0 {
        format!("{:.0}", days)
    } else {
        format!("{:.2}", days)
    }
}

fn format_eta(eta: Duration) -> String {
    let days = as_days(eta);
    if days >= 1.0 {
        format!("~{:.0} days", days)
    } else {
        format!("~{:.1} hours", eta.as_secs_f64() / 3600.0)
    }
}
