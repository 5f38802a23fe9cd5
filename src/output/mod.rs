//! Output writers for traces and benchmark reports.
//!
//! This module handles writing data to disk:
//! - OTLP JSON trace documents
//! - One file per slowest trace
//! - The plain-text benchmark report

pub mod export;
pub mod otlp;
pub mod report;
pub mod trace_json;

// Re-export main functions
pub use export::{export_slowest_traces, slowest_trace_filename, ExportedTrace};
pub use otlp::OtlpTrace;
pub use report::{format_comparison, format_idle_result, format_result, render_report, write_report};
pub use trace_json::{read_trace, read_trace_spans, trace_to_string, write_trace};
