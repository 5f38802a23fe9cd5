//! Plain-text benchmark report.
//!
//! Console blocks for a single run and a warmup/measured comparison, and the
//! report file that groups every run by connection mode.

use crate::analysis::comparison::RunComparison;
use crate::analysis::metrics::success_percentile;
use crate::bench::config::ConnectionMode;
use crate::bench::idle::IdleTestResult;
use crate::bench::result::BenchmarkResult;
use crate::utils::error::ExportError;
use chrono::{DateTime, Local, SecondsFormat};
use log::info;
use std::path::Path;

const RULE_WIDTH: usize = 80;

/// Console block for one run
pub fn format_result(result: &BenchmarkResult) -> String {
    let mut out = String::new();
    out.push_str(&format!("{} Results:\n", result.phase));
    out.push_str(&format!("   Total Duration:        {:?}\n", result.total_duration));
    out.push_str(&format!("   Avg Acquisition Time:  {:?}\n", result.avg_duration));
    out.push_str(&format!("   Min Acquisition Time:  {:?}\n", result.min_duration));
    out.push_str(&format!("   Max Acquisition Time:  {:?}\n", result.max_duration));

    if let (Some(p50), Some(p99)) = (
        success_percentile(&result.samples, 0.50),
        success_percentile(&result.samples, 0.99),
    ) {
        out.push_str(&format!("   p50 / p99:             {:?} / {:?}\n", p50, p99));
    }

    out.push_str(&format!("   Queries Per Second:    {:.2}\n", result.queries_per_second));
    out.push_str(&format!("   Total Queries:         {}\n", result.total_queries));
    if result.failed_queries > 0 {
        out.push_str(&format!("   Failed Queries:        {}\n", result.failed_queries));
    }
    out
}

/// Console block comparing the warmup run with the measured run
pub fn format_comparison(comparison: &RunComparison) -> String {
    let mut out = String::new();
    out.push_str("Warmup vs Actual Comparison:\n");
    out.push_str(&format!(
        "   Total Duration:       {:?} → {:?} ({:.2}% improvement)\n",
        comparison.warmup_total, comparison.measured_total, comparison.duration_improvement_pct
    ));
    out.push_str(&format!(
        "   Avg Acquisition Time: {:?} → {:?} ({:.2}% improvement)\n",
        comparison.warmup_avg, comparison.measured_avg, comparison.avg_improvement_pct
    ));
    out.push_str(&format!(
        "   QPS:                  {:.2} → {:.2}\n",
        comparison.warmup_qps, comparison.measured_qps
    ));
    out
}

pub fn format_idle_result(result: &IdleTestResult) -> String {
    format!(
        "Idle Test Result ({}): reacquisition after {:?} idle took {:?} (first acquisition {:?})\n",
        result.mode, result.idle_interval, result.reacquire, result.first_acquire
    )
}

/// Full report text, one section per mode in first-seen order
pub fn render_report(results: &[BenchmarkResult], generated_at: &DateTime<Local>) -> String {
    let mut modes: Vec<ConnectionMode> = Vec::new();
    for result in results {
        if !modes.contains(&result.mode) {
            modes.push(result.mode);
        }
    }

    let rule = "-".repeat(RULE_WIDTH);
    let mut out = String::new();
    out.push_str("Connection Pool Benchmark Results\n");
    out.push_str(&format!(
        "Generated: {}\n\n",
        generated_at.to_rfc3339_opts(SecondsFormat::Secs, false)
    ));

    for mode in modes {
        out.push_str(&format!("\n{}\n", rule));
        out.push_str(&format!("Connection Type: {}\n", mode));
        out.push_str(&format!("{}\n\n", rule));

        for r in results.iter().filter(|r| r.mode == mode) {
            out.push_str(&format!("Concurrency: {} ({})\n", r.concurrency, r.phase));
            out.push_str(&format!("  Total Duration:       {:?}\n", r.total_duration));
            out.push_str(&format!("  Avg Acquisition:      {:?}\n", r.avg_duration));
            out.push_str(&format!("  Min Acquisition:      {:?}\n", r.min_duration));
            out.push_str(&format!("  Max Acquisition:      {:?}\n", r.max_duration));
            out.push_str(&format!("  QPS:                  {:.2}\n\n", r.queries_per_second));
        }
    }

    out
}

/// Render the report and overwrite `output_path` with it
///
/// Returns the rendered text so the caller can echo it.
pub fn write_report(
    results: &[BenchmarkResult],
    output_path: impl AsRef<Path>,
) -> Result<String, ExportError> {
    let output_path = output_path.as_ref();
    super::trace_json::validate_path(output_path)?;

    let content = render_report(results, &Local::now());
    std::fs::write(output_path, &content)?;

    info!("Report written to {}", output_path.display());
    Ok(content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::metrics::TimingSummary;
    use crate::bench::result::{RunPhase, Sample};
    use chrono::TimeZone;
    use std::time::Duration;

    fn result(mode: ConnectionMode, phase: RunPhase, concurrency: usize) -> BenchmarkResult {
        let samples = vec![Sample::Success(Duration::from_millis(3)); concurrency];
        let summary = TimingSummary {
            total: concurrency,
            successes: concurrency,
            failures: 0,
            avg: Duration::from_millis(3),
            min: Duration::from_millis(3),
            max: Duration::from_millis(3),
            throughput: 250.0,
        };
        BenchmarkResult::from_summary(mode, phase, Duration::from_millis(40), summary, samples)
    }

    #[test]
    fn test_report_groups_by_first_seen_mode() {
        let results = vec![
            result(ConnectionMode::PgbouncerTransaction, RunPhase::Warmup, 10),
            result(ConnectionMode::DirectPostgres, RunPhase::Warmup, 10),
            result(ConnectionMode::PgbouncerTransaction, RunPhase::Measured, 10),
        ];
        let stamp = Local.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        let report = render_report(&results, &stamp);

        let txn = report.find("Connection Type: pgbouncer-transaction").unwrap();
        let direct = report.find("Connection Type: direct-postgres").unwrap();
        assert!(txn < direct);
        assert_eq!(report.matches("Connection Type:").count(), 2);

        let actual = report.find("Concurrency: 10 (Actual)").unwrap();
        assert!(actual < direct);
        assert!(report.contains("QPS:                  250.00"));
    }

    #[test]
    fn test_result_block_hides_failures_when_none() {
        let block = format_result(&result(ConnectionMode::DirectPostgres, RunPhase::Measured, 4));
        assert!(block.starts_with("Actual Results:"));
        assert!(block.contains("Total Queries:         4"));
        assert!(!block.contains("Failed Queries"));
    }

    #[test]
    fn test_comparison_block_layout() {
        let comparison = RunComparison {
            warmup_total: Duration::from_millis(80),
            measured_total: Duration::from_millis(60),
            duration_improvement_pct: 25.0,
            warmup_avg: Duration::from_millis(4),
            measured_avg: Duration::from_millis(2),
            avg_improvement_pct: 50.0,
            warmup_qps: 125.0,
            measured_qps: 166.666,
        };

        assert_eq!(
            format_comparison(&comparison),
            "Warmup vs Actual Comparison:\n\
             \x20  Total Duration:       80ms → 60ms (25.00% improvement)\n\
             \x20  Avg Acquisition Time: 4ms → 2ms (50.00% improvement)\n\
             \x20  QPS:                  125.00 → 166.67\n"
        );
    }

    #[test]
    fn test_report_header_and_sections_end_with_newlines() {
        let stamp = Local.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        let report = render_report(
            &[result(ConnectionMode::DirectPostgres, RunPhase::Measured, 1)],
            &stamp,
        );
        let rule = "-".repeat(RULE_WIDTH);

        assert!(report
            .starts_with("Connection Pool Benchmark Results\nGenerated: 2024-01-02T03:04:05"));
        assert!(report.contains(&format!(
            "\n\n\n{}\nConnection Type: direct-postgres\n{}\n\nConcurrency: 1 (Actual)\n",
            rule, rule
        )));
        assert!(report.ends_with("  QPS:                  250.00\n\n"));
    }

    #[test]
    fn test_write_report_overwrites() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("benchmark_results.txt");
        std::fs::write(&path, "stale").unwrap();

        let results = vec![result(ConnectionMode::DirectPostgres, RunPhase::Warmup, 2)];
        let content = write_report(&results, &path).unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), content);
        assert!(!content.contains("stale"));
    }
}
