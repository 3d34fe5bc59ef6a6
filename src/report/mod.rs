//! Report Module
//!
//! Provides report generation:
//! - Assembly of evaluations in declaration order
//! - Sequential or concurrent measurement with deadline and cancellation
//! - Text and JSON rendering

pub mod assembler;
pub mod render;

pub use assembler::{build_report, Report, ReportAssembler};
pub use render::{render_json, render_text};
