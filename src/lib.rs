//! # SLO Reporter - Service Level Objective Evaluation
//!
//! Turns raw service telemetry into SLO health judgments:
//! - **Source**: metric source adapter (Prometheus query API, static readings)
//! - **SLO**: objectives, error budgets, burn rate and status
//! - **Report**: ordered, all-or-nothing report assembly and rendering
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use slo_reporter::config::ReporterConfig;
//! use slo_reporter::core::SystemClock;
//! use slo_reporter::report::{render_text, ReportAssembler};
//! use slo_reporter::source::create_metric_source;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> slo_reporter::Result<()> {
//!     let config = ReporterConfig::for_service("checkout");
//!     let objectives = config.to_objectives()?;
//!     let source = create_metric_source(&config.source)?;
//!
//!     let report = ReportAssembler::new(source, Arc::new(SystemClock), config.window())
//!         .build(&objectives)
//!         .await?;
//!     println!("{}", render_text(&report));
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod core;
pub mod monitoring;
pub mod report;
pub mod slo;
pub mod source;

pub use core::error::{Error, Result};
