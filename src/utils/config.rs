//! Configuration and constants for the harness.

use std::time::Duration;

// Pool sizing defaults, applied to every pool instance
pub const DEFAULT_MAX_CONNECTIONS: usize = 10; // thousands of clients competing for 10 slots
pub const DEFAULT_MIN_CONNECTIONS: usize = 2;
pub const DEFAULT_MAX_CONN_LIFETIME: Duration = Duration::from_secs(30 * 60);
pub const DEFAULT_MAX_CONN_IDLE_TIME: Duration = Duration::from_secs(30);
pub const DEFAULT_HEALTH_CHECK_PERIOD: Duration = Duration::from_secs(30);
pub const DEFAULT_MAX_CONN_LIFETIME_JITTER: Duration = Duration::from_secs(3 * 60);

/// Independent pool instances, one per simulated server process
pub const DEFAULT_POOL_INSTANCES: usize = 6;

pub const DEFAULT_CONCURRENCY: usize = 5000;

// Phase delays
pub const POOL_STABILIZE_DELAY: Duration = Duration::from_millis(500);
pub const WARMUP_QUIESCE_DELAY: Duration = Duration::from_secs(2);
pub const LEVEL_QUIESCE_DELAY: Duration = Duration::from_secs(1);
pub const DEFAULT_IDLE_INTERVAL: Duration = Duration::from_secs(10);

// Client threads do little more than wait on a condvar
pub const CLIENT_STACK_SIZE: usize = 128 * 1024;

/// Span that wraps one full client request
pub const DEFAULT_ROOT_SPAN_NAME: &str = "worker.request";
pub const QUERY_SPAN_NAME: &str = "pool.query";

pub const SERVICE_NAME: &str = "pool-trace-bench";
pub const SERVICE_VERSION: &str = "1.0.0";
pub const SERVICE_ENVIRONMENT: &str = "benchmark";

/// Bound on how long tracer shutdown waits for in-flight spans
pub const TRACER_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

pub const REPORT_FILE_NAME: &str = "benchmark_results.txt";
pub const DEFAULT_SLOWEST_TRACES: usize = 10;
pub const MAX_SLOWEST_TRACES: usize = 1000;

/// Query issued by every client; the parameter cycles over this many keys
pub const BENCH_QUERY: &str = "SELECT id, name FROM benchmark_data WHERE id = $1";
pub const BENCH_QUERY_KEYSPACE: i64 = 100;
pub const IDLE_TEST_QUERY: &str = "SELECT COUNT(*) FROM benchmark_data";
