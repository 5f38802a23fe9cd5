//! Analysis of benchmark samples and collected traces.
//!
//! This module turns raw run output into:
//! - Summary timing statistics (average, min, max, throughput)
//! - Warmup vs. measured comparisons
//! - The slowest traces, ranked by root-span duration

pub mod comparison;
pub mod metrics;
pub mod slowest;

// Re-export main types and functions
pub use comparison::{improvement, RunComparison};
pub use metrics::{aggregate_samples, success_percentile, TimingSummary};
pub use slowest::{RankedTrace, SlowestTraceAnalyzer};
