//! Warmup vs. measured run comparison

use crate::bench::result::BenchmarkResult;
use std::time::Duration;

/// Relative change between the warmup and measured runs of one configuration
#[derive(Debug, Clone, PartialEq)]
pub struct RunComparison {
    pub warmup_total: Duration,
    pub measured_total: Duration,
    /// Positive when the measured run finished faster
    pub duration_improvement_pct: f64,
    pub warmup_avg: Duration,
    pub measured_avg: Duration,
    pub avg_improvement_pct: f64,
    pub warmup_qps: f64,
    pub measured_qps: f64,
}

impl RunComparison {
    pub fn between(warmup: &BenchmarkResult, measured: &BenchmarkResult) -> Self {
        Self {
            warmup_total: warmup.total_duration,
            measured_total: measured.total_duration,
            duration_improvement_pct: improvement(warmup.total_duration, measured.total_duration),
            warmup_avg: warmup.avg_duration,
            measured_avg: measured.avg_duration,
            avg_improvement_pct: improvement(warmup.avg_duration, measured.avg_duration),
            warmup_qps: warmup.queries_per_second,
            measured_qps: measured.queries_per_second,
        }
    }
}

/// Percentage reduction from `before` to `after`; zero when `before` is zero
pub fn improvement(before: Duration, after: Duration) -> f64 {
    let before = before.as_secs_f64();
    if before == 0.0 {
        return 0.0;
    }
    (before - after.as_secs_f64()) / before * 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_improvement() {
        assert_eq!(improvement(Duration::from_secs(4), Duration::from_secs(3)), 25.0);
        assert_eq!(improvement(Duration::from_secs(2), Duration::from_secs(3)), -50.0);
        assert_eq!(improvement(Duration::ZERO, Duration::from_secs(3)), 0.0);
    }
}
