//! Benchmark runner - orchestrates the benchmark execution

use std::thread;
use std::time::{Duration, Instant};

use log::{debug, info, warn};

use super::config::BenchmarkConfiguration;
use super::pool::{PoolFactory, Query, ResourcePool};
use super::result::{BenchmarkResult, RunPhase, Sample};
use crate::analysis::comparison::RunComparison;
use crate::analysis::metrics::aggregate_samples;
use crate::trace::{SpanKind, SpanStatus, Tracer};
use crate::utils::config::{
    CLIENT_STACK_SIZE, DEFAULT_ROOT_SPAN_NAME, POOL_STABILIZE_DELAY, QUERY_SPAN_NAME,
    WARMUP_QUIESCE_DELAY,
};
use crate::utils::error::BenchError;

/// Pauses between the steps of a run
#[derive(Debug, Clone, PartialEq)]
pub struct PhaseDelays {
    /// After pool creation, before the first client starts
    pub stabilize: Duration,
    /// Between the warmup and the measured run
    pub warmup_quiesce: Duration,
}

impl Default for PhaseDelays {
    fn default() -> Self {
        Self {
            stabilize: POOL_STABILIZE_DELAY,
            warmup_quiesce: WARMUP_QUIESCE_DELAY,
        }
    }
}

/// Warmup and measured results for one configuration
#[derive(Debug, Clone)]
pub struct RunPair {
    pub warmup: BenchmarkResult,
    pub measured: BenchmarkResult,
}

impl RunPair {
    pub fn comparison(&self) -> RunComparison {
        RunComparison::between(&self.warmup, &self.measured)
    }
}

/// Fans client tasks out over a set of freshly created pool instances
pub struct BenchmarkRunner<F: PoolFactory> {
    factory: F,
    tracer: Tracer,
    delays: PhaseDelays,
    root_span_name: String,
}

impl<F: PoolFactory> BenchmarkRunner<F> {
    pub fn new(factory: F, tracer: Tracer) -> Self {
        Self {
            factory,
            tracer,
            delays: PhaseDelays::default(),
            root_span_name: DEFAULT_ROOT_SPAN_NAME.to_string(),
        }
    }

    pub fn with_delays(mut self, delays: PhaseDelays) -> Self {
        self.delays = delays;
        self
    }

    /// Name given to each client's root span
    pub fn with_root_span_name(mut self, name: impl Into<String>) -> Self {
        self.root_span_name = name.into();
        self
    }

    pub fn factory(&self) -> &F {
        &self.factory
    }

    pub fn tracer(&self) -> &Tracer {
        &self.tracer
    }

    /// Warmup run, quiescent pause, then the measured run
    pub fn run_pair(&self, config: &BenchmarkConfiguration) -> Result<RunPair, BenchError> {
        info!("Warmup Run - Concurrency: {}", config.concurrency);
        let warmup = self.run(config, RunPhase::Warmup)?;

        thread::sleep(self.delays.warmup_quiesce);

        info!("Actual Run - Concurrency: {}", config.concurrency);
        let measured = self.run(config, RunPhase::Measured)?;

        Ok(RunPair { warmup, measured })
    }

    /// Execute one run: exactly `config.concurrency` clients, one query each
    pub fn run(
        &self,
        config: &BenchmarkConfiguration,
        phase: RunPhase,
    ) -> Result<BenchmarkResult, BenchError> {
        config.validate()?;

        let pools = self.create_pools(config)?;
        thread::sleep(self.delays.stabilize);

        let mut samples = vec![Sample::Failed; config.concurrency];
        let start = Instant::now();

        let spawned = thread::scope(|scope| -> Result<(), BenchError> {
            for (worker_id, slot) in samples.iter_mut().enumerate() {
                let pool_index = worker_id % pools.len();
                let client = Client {
                    worker_id,
                    pool_index,
                    pool: &pools[pool_index],
                    config,
                    tracer: &self.tracer,
                    root_span_name: &self.root_span_name,
                };

                thread::Builder::new()
                    .name(format!("client-{}", worker_id))
                    .stack_size(CLIENT_STACK_SIZE)
                    .spawn_scoped(scope, move || *slot = client.run())
                    .map_err(|source| BenchError::Spawn {
                        worker: worker_id,
                        source,
                    })?;
            }
            Ok(())
        });

        let total_duration = start.elapsed();
        for pool in &pools {
            pool.close();
        }
        spawned?;

        let summary = aggregate_samples(&samples, total_duration, config.average_policy);
        if summary.failures > 0 {
            warn!(
                "{} of {} queries failed ({} {})",
                summary.failures, summary.total, config.label(), phase
            );
        }
        info!(
            "{} run for {} finished in {:?} ({:.2} queries/s)",
            phase,
            config.label(),
            total_duration,
            summary.throughput
        );

        Ok(BenchmarkResult::from_summary(
            config.mode,
            phase,
            total_duration,
            summary,
            samples,
        ))
    }

    fn create_pools(&self, config: &BenchmarkConfiguration) -> Result<Vec<F::Pool>, BenchError> {
        debug!(
            "Creating {} pool instances for {} (max {}, min {})",
            config.pool_instances,
            config.label(),
            config.pool.max_connections,
            config.pool.min_connections
        );

        let mut pools = Vec::with_capacity(config.pool_instances);
        for index in 0..config.pool_instances {
            match self.factory.create(&config.dsn, &config.pool) {
                Ok(pool) => pools.push(pool),
                Err(source) => {
                    for pool in &pools {
                        pool.close();
                    }
                    return Err(BenchError::PoolSetup { index, source });
                }
            }
        }
        Ok(pools)
    }
}

/// One simulated client: a single traced acquire-query-release
struct Client<'a, P> {
    worker_id: usize,
    pool_index: usize,
    pool: &'a P,
    config: &'a BenchmarkConfiguration,
    tracer: &'a Tracer,
    root_span_name: &'a str,
}

impl<P: ResourcePool> Client<'_, P> {
    fn run(self) -> Sample {
        let mut root = self.tracer.start_root(self.root_span_name, SpanKind::Internal);
        root.set_attribute("worker.id", self.worker_id);
        root.set_attribute("pool.instance", self.pool_index);
        root.set_attribute("connection.type", self.config.label());

        let query = Query::lookup_for_worker(self.worker_id);
        let mut query_span =
            self.tracer
                .start_child(&root.context(), QUERY_SPAN_NAME, SpanKind::Client);
        query_span.set_attribute("db.statement", query.statement.as_str());
        if let Some(param) = query.param {
            query_span.set_attribute("db.param", param);
        }

        let deadline = self.config.operation_timeout.map(|timeout| Instant::now() + timeout);
        let query_start = Instant::now();
        debug!(
            "[QUERY START] Worker {} | Pool Instance {} | Type: {}",
            self.worker_id,
            self.pool_index,
            self.config.label()
        );

        let outcome = self.pool.acquire_and_run(&query, deadline);
        let elapsed = query_start.elapsed();

        let sample = match outcome {
            Ok(output) => {
                debug!(
                    "[QUERY END] Worker {} | Pool Instance {} | Type: {} | Duration: {:?} | Rows: {}",
                    self.worker_id,
                    self.pool_index,
                    self.config.label(),
                    elapsed,
                    output.rows
                );
                query_span.set_attribute("db.rows", output.rows as i64);
                query_span.set_status(SpanStatus::Ok);
                root.set_status(SpanStatus::Ok);
                Sample::Success(elapsed)
            }
            Err(e) => {
                warn!(
                    "[ERROR] Worker {} (Pool {}) query failed: {}",
                    self.worker_id, self.pool_index, e
                );
                query_span.set_status(SpanStatus::Error(e.to_string()));
                root.set_status(SpanStatus::Error("query failed".to_string()));
                Sample::Failed
            }
        };

        query_span.set_attribute("duration.seconds", elapsed.as_secs_f64());
        query_span.end();
        root.end();
        sample
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bench::config::{ConnectionMode, PoolSettings};
    use crate::bench::simulated::{SimulatedBackend, SimulatedPoolFactory};
    use crate::trace::TraceCollector;
    use std::sync::Arc;

    fn quick_delays() -> PhaseDelays {
        PhaseDelays {
            stabilize: Duration::ZERO,
            warmup_quiesce: Duration::ZERO,
        }
    }

    fn runner(backend: SimulatedBackend) -> (BenchmarkRunner<SimulatedPoolFactory>, Arc<TraceCollector>) {
        let collector = Arc::new(TraceCollector::new());
        let runner = BenchmarkRunner::new(
            SimulatedPoolFactory::new(backend),
            Tracer::new(Arc::clone(&collector)),
        )
        .with_delays(quick_delays());
        (runner, collector)
    }

    fn small_config(concurrency: usize) -> BenchmarkConfiguration {
        let mut config =
            BenchmarkConfiguration::new(ConnectionMode::PgbouncerTransaction).with_concurrency(concurrency);
        config.pool_instances = 3;
        config.pool = PoolSettings {
            max_connections: 2,
            min_connections: 1,
            ..Default::default()
        };
        config
    }

    fn fast_backend() -> SimulatedBackend {
        SimulatedBackend {
            connect_latency: Duration::from_micros(200),
            query_latency: Duration::from_micros(200),
            failure_rate: 0.0,
        }
    }

    #[test]
    fn test_run_records_every_client() {
        let (runner, collector) = runner(fast_backend());
        let result = runner.run(&small_config(30), RunPhase::Measured).unwrap();

        assert_eq!(result.total_queries, 30);
        assert_eq!(result.samples.len(), 30);
        assert_eq!(result.failed_queries, 0);
        assert!(result.samples.iter().all(Sample::is_success));
        assert!(result.min_duration <= result.max_duration);

        // Root plus query span per client
        assert_eq!(collector.len(), 60);
    }

    #[test]
    fn test_round_robin_assignment() {
        let (runner, collector) = runner(fast_backend());
        runner.run(&small_config(9), RunPhase::Measured).unwrap();

        let mut per_pool = [0; 3];
        for span in collector.snapshot() {
            if span.name == DEFAULT_ROOT_SPAN_NAME {
                if let Some(crate::trace::AttributeValue::Int(index)) = span.attribute("pool.instance") {
                    per_pool[*index as usize] += 1;
                }
            }
        }
        assert_eq!(per_pool, [3, 3, 3]);
    }

    #[test]
    fn test_failures_are_recorded_not_fatal() {
        let (runner, collector) = runner(SimulatedBackend {
            failure_rate: 1.0,
            ..fast_backend()
        });
        let result = runner.run(&small_config(12), RunPhase::Warmup).unwrap();

        assert!(result.is_warmup());
        assert_eq!(result.total_queries, 12);
        assert_eq!(result.failed_queries, 12);
        assert_eq!(result.avg_duration, Duration::ZERO);
        assert_eq!(result.min_duration, Duration::ZERO);
        assert!(collector
            .snapshot()
            .iter()
            .all(|span| span.status.code() == 2));
    }

    #[test]
    fn test_pool_setup_failure_is_fatal() {
        let (runner, _) = runner(fast_backend());
        let mut config = small_config(4);
        config.pool.min_connections = 10;

        let err = runner.run(&config, RunPhase::Measured).unwrap_err();
        assert!(matches!(err, BenchError::PoolSetup { index: 0, .. }));
    }

    #[test]
    fn test_operation_timeout_fails_slow_clients() {
        let (runner, _) = runner(SimulatedBackend {
            query_latency: Duration::from_millis(40),
            ..fast_backend()
        });
        let mut config = small_config(12);
        config.pool_instances = 1;
        config.pool.max_connections = 1;
        config.pool.min_connections = 0;
        config.operation_timeout = Some(Duration::from_millis(5));

        let result = runner.run(&config, RunPhase::Measured).unwrap();
        assert_eq!(result.total_queries, 12);
        assert_eq!(result.failed_queries, 12);
    }

    #[test]
    fn test_run_pair() {
        let (runner, _) = runner(fast_backend());
        let pair = runner.run_pair(&small_config(6)).unwrap();

        assert_eq!(pair.warmup.phase, RunPhase::Warmup);
        assert_eq!(pair.measured.phase, RunPhase::Measured);
        assert_eq!(pair.comparison().measured_qps, pair.measured.queries_per_second);
    }

    #[test]
    fn test_custom_root_span_name() {
        let (runner, collector) = runner(fast_backend());
        let runner = runner.with_root_span_name("client.request");
        runner.run(&small_config(3), RunPhase::Measured).unwrap();

        let roots: Vec<_> = collector.snapshot().into_iter().filter(|s| s.is_root()).collect();
        assert_eq!(roots.len(), 3);
        assert!(roots.iter().all(|s| s.name == "client.request"));
    }
}
