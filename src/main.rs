//! Pool Trace Bench CLI
//!
//! Drives thousands of concurrent clients against pooled connections,
//! reports latency and throughput, and exports the slowest request traces.

use anyhow::Result;
use clap::{Parser, Subcommand};
use env_logger::Env;
use std::path::PathBuf;
use std::time::Duration;

use pool_trace_bench::bench::{AveragePolicy, ConnectionMode, PoolSettings, SimulatedBackend};
use pool_trace_bench::commands::{
    display_schema, display_version, execute_idle, execute_run, validate_args,
    validate_trace_file, IdleArgs, RunArgs,
};
use pool_trace_bench::utils::config::{
    DEFAULT_CONCURRENCY, DEFAULT_MAX_CONNECTIONS, DEFAULT_MIN_CONNECTIONS,
    DEFAULT_POOL_INSTANCES, DEFAULT_ROOT_SPAN_NAME, DEFAULT_SLOWEST_TRACES, REPORT_FILE_NAME,
};

/// Pool Trace Bench - connection pool concurrency benchmark
#[derive(Parser, Debug)]
#[command(name = "pool-bench")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

/// Pool sizing and simulated backend flags shared by `run` and `idle`
#[derive(clap::Args, Debug)]
struct PoolFlags {
    /// Maximum connections per pool instance
    #[arg(long, default_value_t = DEFAULT_MAX_CONNECTIONS)]
    max_conns: usize,

    /// Connections kept open per pool instance
    #[arg(long, default_value_t = DEFAULT_MIN_CONNECTIONS)]
    min_conns: usize,

    /// Idle time (ms) after which a connection above the minimum is closed
    #[arg(long, default_value = "30000")]
    max_idle_ms: u64,

    /// Simulated connect latency (ms)
    #[arg(long, default_value = "5")]
    connect_latency_ms: u64,

    /// Simulated query latency (ms)
    #[arg(long, default_value = "2")]
    query_latency_ms: u64,

    /// Probability in [0, 1] that a simulated query fails
    #[arg(long, default_value = "0.0")]
    failure_rate: f64,
}

impl PoolFlags {
    fn settings(&self) -> PoolSettings {
        PoolSettings {
            max_connections: self.max_conns,
            min_connections: self.min_conns,
            max_idle_time: Duration::from_millis(self.max_idle_ms),
            ..Default::default()
        }
    }

    fn backend(&self) -> SimulatedBackend {
        SimulatedBackend {
            connect_latency: Duration::from_millis(self.connect_latency_ms),
            query_latency: Duration::from_millis(self.query_latency_ms),
            failure_rate: self.failure_rate,
        }
    }
}

/// Available commands
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run warmup + measured benchmarks, the idle test, and trace export
    Run {
        /// Connection modes to benchmark
        #[arg(short, long, value_enum, value_delimiter = ',',
              default_values_t = [ConnectionMode::PgbouncerSession, ConnectionMode::PgbouncerTransaction])]
        modes: Vec<ConnectionMode>,

        /// Concurrency levels (comma separated)
        #[arg(short, long, value_delimiter = ',', default_values_t = [DEFAULT_CONCURRENCY])]
        concurrency: Vec<usize>,

        /// Pool instances per run
        #[arg(short, long, default_value_t = DEFAULT_POOL_INSTANCES)]
        instances: usize,

        #[command(flatten)]
        pool: PoolFlags,

        /// Deadline (ms) for each client's acquire + query
        #[arg(long)]
        timeout_ms: Option<u64>,

        /// Divisor used for the average
        #[arg(long, value_enum, default_value_t = AveragePolicy::AllAttempts)]
        average: AveragePolicy,

        /// Number of slowest traces to export per mode (0 disables export)
        #[arg(long, default_value_t = DEFAULT_SLOWEST_TRACES)]
        slowest: usize,

        /// Name of the span that bounds one client request
        #[arg(long, default_value = DEFAULT_ROOT_SPAN_NAME)]
        root_span: String,

        /// Directory for exported trace files
        #[arg(short, long, default_value = ".")]
        output_dir: PathBuf,

        /// Path of the text report
        #[arg(long, default_value = REPORT_FILE_NAME)]
        report: PathBuf,

        /// Skip the idle reacquisition test
        #[arg(long)]
        skip_idle: bool,

        /// Idle period (ms) for the idle test
        #[arg(long, default_value = "10000")]
        idle_ms: u64,
    },

    /// Run only the idle reacquisition test
    Idle {
        /// Connection modes to test
        #[arg(short, long, value_enum, value_delimiter = ',',
              default_values_t = [ConnectionMode::PgbouncerSession, ConnectionMode::PgbouncerTransaction])]
        modes: Vec<ConnectionMode>,

        #[command(flatten)]
        pool: PoolFlags,

        /// Idle period (ms)
        #[arg(long, default_value = "10000")]
        idle_ms: u64,
    },

    /// Validate an exported trace JSON file
    Validate {
        /// Path to trace JSON file
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Display export schema information
    Schema {
        /// Show full schema details
        #[arg(long)]
        show: bool,
    },

    /// Display version information
    Version,
}

fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Setup logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(log_level)).init();

    // Execute command
    match cli.command {
        Commands::Run {
            modes,
            concurrency,
            instances,
            pool,
            timeout_ms,
            average,
            slowest,
            root_span,
            output_dir,
            report,
            skip_idle,
            idle_ms,
        } => {
            let args = RunArgs {
                modes,
                concurrency_levels: concurrency,
                pool_instances: instances,
                pool: pool.settings(),
                backend: pool.backend(),
                operation_timeout: timeout_ms.map(Duration::from_millis),
                average_policy: average,
                slowest_traces: slowest,
                root_span_name: root_span,
                output_dir,
                report_path: report,
                skip_idle,
                idle_interval: Duration::from_millis(idle_ms),
                ..Default::default()
            };

            // Validate args first
            validate_args(&args)?;

            execute_run(args)?;
        }

        Commands::Idle {
            modes,
            pool,
            idle_ms,
        } => {
            execute_idle(IdleArgs {
                modes,
                idle_interval: Duration::from_millis(idle_ms),
                pool: pool.settings(),
                backend: pool.backend(),
            })?;
        }

        Commands::Validate { file } => {
            validate_trace_file(file)?;
        }

        Commands::Schema { show } => {
            display_schema(show);
        }

        Commands::Version => {
            display_version();
        }
    }

    Ok(())
}
