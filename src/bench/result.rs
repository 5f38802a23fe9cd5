//! Per-client samples and per-run results

use super::config::ConnectionMode;
use crate::analysis::metrics::TimingSummary;
use std::fmt;
use std::time::Duration;

/// Outcome of one client's acquire-query-release sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Sample {
    Success(Duration),
    /// Also the state of a slot whose task never reported
    #[default]
    Failed,
}

impl Sample {
    pub fn duration(&self) -> Option<Duration> {
        match self {
            Sample::Success(duration) => Some(*duration),
            Sample::Failed => None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Sample::Success(_))
    }
}

/// Whether a run only warms the pools or is the one being measured
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Warmup,
    Measured,
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunPhase::Warmup => f.write_str("Warmup"),
            RunPhase::Measured => f.write_str("Actual"),
        }
    }
}

/// Metrics for a single benchmark run
#[derive(Debug, Clone, PartialEq)]
pub struct BenchmarkResult {
    pub mode: ConnectionMode,
    pub concurrency: usize,
    pub phase: RunPhase,
    /// Wall-clock time from first spawn to last join
    pub total_duration: Duration,
    pub avg_duration: Duration,
    pub min_duration: Duration,
    pub max_duration: Duration,
    pub queries_per_second: f64,
    pub total_queries: usize,
    pub failed_queries: usize,
    pub samples: Vec<Sample>,
}

impl BenchmarkResult {
    pub fn from_summary(
        mode: ConnectionMode,
        phase: RunPhase,
        total_duration: Duration,
        summary: TimingSummary,
        samples: Vec<Sample>,
    ) -> Self {
        Self {
            mode,
            concurrency: samples.len(),
            phase,
            total_duration,
            avg_duration: summary.avg,
            min_duration: summary.min,
            max_duration: summary.max,
            queries_per_second: summary.throughput,
            total_queries: summary.total,
            failed_queries: summary.failures,
            samples,
        }
    }

    pub fn is_warmup(&self) -> bool {
        self.phase == RunPhase::Warmup
    }

    pub fn successful_queries(&self) -> usize {
        self.total_queries - self.failed_queries
    }
}
