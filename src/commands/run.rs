//! Run command implementation.
//!
//! For every connection mode the run command:
//! 1. Creates a trace collector and tracer
//! 2. Runs warmup + measured runs at each concurrency level
//! 3. Runs the idle reacquisition test
//! 4. Shuts the tracer down and exports the slowest traces
//!
//! and finally writes the grouped text report.

use crate::analysis::slowest::SlowestTraceAnalyzer;
use crate::bench::config::{AveragePolicy, BenchmarkConfiguration, ConnectionMode, PoolSettings};
use crate::bench::idle::{IdleReacquisitionTest, IdleTestResult};
use crate::bench::result::BenchmarkResult;
use crate::bench::runner::{BenchmarkRunner, PhaseDelays};
use crate::bench::simulated::{SimulatedBackend, SimulatedPoolFactory};
use crate::output::{
    export_slowest_traces, format_comparison, format_idle_result, format_result, write_report,
    ExportedTrace,
};
use crate::trace::{TraceCollector, Tracer};
use crate::utils::config::{
    DEFAULT_CONCURRENCY, DEFAULT_IDLE_INTERVAL, DEFAULT_POOL_INSTANCES, DEFAULT_ROOT_SPAN_NAME,
    DEFAULT_SLOWEST_TRACES, LEVEL_QUIESCE_DELAY, MAX_SLOWEST_TRACES, REPORT_FILE_NAME,
    TRACER_SHUTDOWN_TIMEOUT,
};
use anyhow::{bail, Context, Result};
use log::{info, warn};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Arguments for the run command
///
/// **Public** - used by main.rs to construct from CLI args
#[derive(Debug, Clone)]
pub struct RunArgs {
    /// Modes to benchmark, in order
    pub modes: Vec<ConnectionMode>,

    /// Concurrency levels tested for each mode
    pub concurrency_levels: Vec<usize>,

    /// Pool instances per run
    pub pool_instances: usize,

    /// Sizing applied to every pool instance
    pub pool: PoolSettings,

    /// Simulated backend latencies and failure rate
    pub backend: SimulatedBackend,

    /// Per-client deadline for acquire + query
    pub operation_timeout: Option<Duration>,

    pub average_policy: AveragePolicy,

    /// Number of slowest traces exported per mode
    pub slowest_traces: usize,

    /// Name of the span that bounds one client request
    pub root_span_name: String,

    /// Directory receiving the exported trace files
    pub output_dir: PathBuf,

    /// Path of the text report
    pub report_path: PathBuf,

    pub skip_idle: bool,
    pub idle_interval: Duration,

    pub delays: PhaseDelays,

    /// Pause between concurrency levels
    pub level_quiesce: Duration,
}

impl Default for RunArgs {
    fn default() -> Self {
        Self {
            modes: vec![
                ConnectionMode::PgbouncerSession,
                ConnectionMode::PgbouncerTransaction,
            ],
            concurrency_levels: vec![DEFAULT_CONCURRENCY],
            pool_instances: DEFAULT_POOL_INSTANCES,
            pool: PoolSettings::default(),
            backend: SimulatedBackend::default(),
            operation_timeout: None,
            average_policy: AveragePolicy::default(),
            slowest_traces: DEFAULT_SLOWEST_TRACES,
            root_span_name: DEFAULT_ROOT_SPAN_NAME.to_string(),
            output_dir: PathBuf::from("."),
            report_path: PathBuf::from(REPORT_FILE_NAME),
            skip_idle: false,
            idle_interval: DEFAULT_IDLE_INTERVAL,
            delays: PhaseDelays::default(),
            level_quiesce: LEVEL_QUIESCE_DELAY,
        }
    }
}

/// Everything a run produced
#[derive(Debug, Clone, Default)]
pub struct RunOutcome {
    /// Warmup and measured results in execution order
    pub results: Vec<BenchmarkResult>,
    pub idle_results: Vec<IdleTestResult>,
    pub exported: Vec<ExportedTrace>,
    pub report: String,
}

/// Validate run arguments before any work starts
///
/// **Public** - called from main.rs
pub fn validate_args(args: &RunArgs) -> Result<()> {
    if args.modes.is_empty() {
        bail!("At least one connection mode is required");
    }

    for (i, mode) in args.modes.iter().enumerate() {
        if args.modes[..i].contains(mode) {
            bail!("Connection mode {} is listed more than once", mode);
        }
    }

    if args.concurrency_levels.is_empty() {
        bail!("At least one concurrency level is required");
    }

    if args.concurrency_levels.contains(&0) {
        bail!("Concurrency levels must be greater than 0");
    }

    if args.pool_instances == 0 {
        bail!("pool_instances must be greater than 0");
    }

    args.pool.validate().context("Invalid pool settings")?;

    if !(0.0..=1.0).contains(&args.backend.failure_rate) {
        bail!(
            "failure_rate must be between 0 and 1 (got {})",
            args.backend.failure_rate
        );
    }

    if args.slowest_traces > MAX_SLOWEST_TRACES {
        bail!(
            "slowest_traces must be at most {} (got {})",
            MAX_SLOWEST_TRACES,
            args.slowest_traces
        );
    }

    if args.root_span_name.trim().is_empty() {
        bail!("root_span_name cannot be empty");
    }

    if args.output_dir.is_file() {
        bail!("Output directory is a file: {}", args.output_dir.display());
    }

    Ok(())
}

/// Execute the run command
///
/// **Public** - main entry point called from main.rs
///
/// # Errors
/// * Invalid configuration or pool setup failure (aborts the run)
/// * Idle test failure
/// * Report write failure
///
/// Trace export failures are logged and do not fail the run.
pub fn execute_run(args: RunArgs) -> Result<RunOutcome> {
    let start_time = Instant::now();
    let mut outcome = RunOutcome::default();

    info!(
        "Pool Config: MaxConns={}, MinConns={}, MaxIdleTime={:?}, Instances={}",
        args.pool.max_connections,
        args.pool.min_connections,
        args.pool.max_idle_time,
        args.pool_instances
    );

    let analyzer = SlowestTraceAnalyzer::new(args.root_span_name.clone());
    let factory = SimulatedPoolFactory::new(args.backend.clone());

    for &mode in &args.modes {
        println!("\n{}", "━".repeat(54));
        println!("Testing: {}", mode);
        println!("{}\n", "━".repeat(54));

        let collector = Arc::new(TraceCollector::new());
        let tracer = Tracer::new(Arc::clone(&collector));
        let runner = BenchmarkRunner::new(factory.clone(), tracer.clone())
            .with_delays(args.delays.clone())
            .with_root_span_name(args.root_span_name.clone());

        for (i, &concurrency) in args.concurrency_levels.iter().enumerate() {
            let config = configuration(&args, mode, concurrency);

            let pair = runner
                .run_pair(&config)
                .with_context(|| format!("Benchmark failed for {} at {}", mode, concurrency))?;

            println!("{}", format_result(&pair.warmup));
            println!("{}", format_result(&pair.measured));
            println!("{}", format_comparison(&pair.comparison()));

            outcome.results.push(pair.warmup);
            outcome.results.push(pair.measured);

            if i + 1 < args.concurrency_levels.len() {
                thread::sleep(args.level_quiesce);
            }
        }

        if !args.skip_idle {
            println!("Testing Idle Connection Release ({:?} idle period)", args.idle_interval);
            let idle = IdleReacquisitionTest::new(args.idle_interval)
                .run(&factory, &configuration(&args, mode, 1))
                .with_context(|| format!("Idle test failed for {}", mode))?;
            println!("{}", format_idle_result(&idle));
            outcome.idle_results.push(idle);
        }

        if !tracer.shutdown(TRACER_SHUTDOWN_TIMEOUT) {
            warn!(
                "Tracer shutdown timed out after {:?}; partial traces were flushed",
                TRACER_SHUTDOWN_TIMEOUT
            );
        }

        if args.slowest_traces > 0 {
            let ranked = analyzer.select_from(&collector, args.slowest_traces);
            match export_slowest_traces(&ranked, mode.as_str(), &args.output_dir) {
                Ok(exported) => {
                    info!("✓ Exported {} traces for {}", exported.len(), mode);
                    outcome.exported.extend(exported);
                }
                Err(e) => warn!("Failed to export traces for {}: {}", mode, e),
            }
        }
    }

    println!("\n{}", "=".repeat(80));
    println!("FINAL BENCHMARK REPORT");
    println!("{}", "=".repeat(80));

    outcome.report = write_report(&outcome.results, &args.report_path)
        .context("Failed to write benchmark report")?;
    println!("{}", outcome.report);
    println!("Full report saved to: {}", args.report_path.display());

    info!(
        "Benchmark completed in {:.2}s",
        start_time.elapsed().as_secs_f64()
    );

    Ok(outcome)
}

/// Build the configuration for one mode and concurrency level
///
/// **Private** - internal helper for execute_run
fn configuration(args: &RunArgs, mode: ConnectionMode, concurrency: usize) -> BenchmarkConfiguration {
    let mut config = BenchmarkConfiguration::new(mode).with_concurrency(concurrency);
    config.pool_instances = args.pool_instances;
    config.pool = args.pool.clone();
    config.operation_timeout = args.operation_timeout;
    config.average_policy = args.average_policy;
    config
}
