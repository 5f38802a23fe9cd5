//! Reduce raw per-client samples into summary statistics.

use crate::bench::config::AveragePolicy;
use crate::bench::result::Sample;
use log::debug;
use std::time::Duration;

/// Summary statistics over one run's samples
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TimingSummary {
    /// Number of samples, successes and failures alike
    pub total: usize,
    pub successes: usize,
    pub failures: usize,
    pub avg: Duration,
    /// Fastest success; zero when nothing succeeded
    pub min: Duration,
    /// Slowest success; zero when nothing succeeded
    pub max: Duration,
    /// Attempts per second of wall-clock time
    pub throughput: f64,
}

/// Aggregate samples from one run
///
/// **Public** - main entry point for metrics calculation
///
/// # Arguments
/// * `samples` - One sample per client, indexed by client ordinal
/// * `wall_clock` - Duration of the whole run
/// * `policy` - Divisor for the average
///
/// # Returns
/// Summary whose average, under `AveragePolicy::AllAttempts`, is the sum of
/// successful durations divided by the number of samples. Throughput counts
/// every attempt regardless of outcome.
pub fn aggregate_samples(
    samples: &[Sample],
    wall_clock: Duration,
    policy: AveragePolicy,
) -> TimingSummary {
    let successes: Vec<Duration> = samples.iter().filter_map(Sample::duration).collect();
    let total = samples.len();
    let failures = total - successes.len();

    let sum: u128 = successes.iter().map(Duration::as_nanos).sum();
    let divisor = match policy {
        AveragePolicy::AllAttempts => total,
        AveragePolicy::SuccessfulOnly => successes.len(),
    };
    let avg = if divisor == 0 {
        Duration::ZERO
    } else {
        nanos_to_duration(sum / divisor as u128)
    };

    let min = successes.iter().min().copied().unwrap_or(Duration::ZERO);
    let max = successes.iter().max().copied().unwrap_or(Duration::ZERO);

    let wall_secs = wall_clock.as_secs_f64();
    let throughput = if wall_secs > 0.0 {
        total as f64 / wall_secs
    } else {
        0.0
    };

    debug!(
        "Aggregated {} samples ({} failed): avg {:?}, min {:?}, max {:?}",
        total, failures, avg, min, max
    );

    TimingSummary {
        total,
        successes: successes.len(),
        failures,
        avg,
        min,
        max,
        throughput,
    }
}

/// Nearest-rank percentile over successful samples
///
/// **Public** - used for console summaries
///
/// Returns `None` when no sample succeeded. `quantile` is clamped to [0, 1].
pub fn success_percentile(samples: &[Sample], quantile: f64) -> Option<Duration> {
    let mut successes: Vec<Duration> = samples.iter().filter_map(Sample::duration).collect();
    if successes.is_empty() {
        return None;
    }
    successes.sort_unstable();

    let quantile = quantile.clamp(0.0, 1.0);
    let rank = (quantile * successes.len() as f64).ceil() as usize;
    Some(successes[rank.saturating_sub(1).min(successes.len() - 1)])
}

fn nanos_to_duration(nanos: u128) -> Duration {
    Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
}
