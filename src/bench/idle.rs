//! Idle reacquisition test.
//!
//! Measures what it costs to get a connection back after the pool has sat
//! idle long enough to recycle it. Only the second acquisition is timed.

use std::fmt;
use std::thread;
use std::time::{Duration, Instant};

use log::info;

use super::config::{BenchmarkConfiguration, ConnectionMode};
use super::pool::{PoolFactory, Query, ResourcePool};
use crate::utils::config::{DEFAULT_IDLE_INTERVAL, IDLE_TEST_QUERY};
use crate::utils::error::{BenchError, PoolError};

/// States of the idle test, in the order they are entered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdlePhase {
    Idle,
    Acquired,
    Released,
    Idling,
    Reacquiring,
}

impl fmt::Display for IdlePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            IdlePhase::Idle => "idle",
            IdlePhase::Acquired => "acquired",
            IdlePhase::Released => "released",
            IdlePhase::Idling => "idling",
            IdlePhase::Reacquiring => "reacquiring",
        };
        f.write_str(name)
    }
}

/// Outcome of one idle test
#[derive(Debug, Clone, PartialEq)]
pub struct IdleTestResult {
    pub mode: ConnectionMode,
    pub idle_interval: Duration,
    /// Latency of the first acquisition, kept for reference
    pub first_acquire: Duration,
    /// Latency of the acquisition after the idle interval
    pub reacquire: Duration,
    /// Every state entered, ending in `Released`
    pub transitions: Vec<IdlePhase>,
}

/// Acquire, release, sleep, reacquire on one dedicated pool
#[derive(Debug, Clone)]
pub struct IdleReacquisitionTest {
    idle_interval: Duration,
}

impl Default for IdleReacquisitionTest {
    fn default() -> Self {
        Self::new(DEFAULT_IDLE_INTERVAL)
    }
}

impl IdleReacquisitionTest {
    pub fn new(idle_interval: Duration) -> Self {
        Self { idle_interval }
    }

    pub fn idle_interval(&self) -> Duration {
        self.idle_interval
    }

    pub fn run<F: PoolFactory>(
        &self,
        factory: &F,
        config: &BenchmarkConfiguration,
    ) -> Result<IdleTestResult, BenchError> {
        config.validate()?;
        let pool = factory
            .create(&config.dsn, &config.pool)
            .map_err(|source| BenchError::PoolSetup { index: 0, source })?;

        let outcome = self.drive(&pool, config.mode);
        pool.close();
        outcome
    }

    fn drive<P: ResourcePool>(
        &self,
        pool: &P,
        mode: ConnectionMode,
    ) -> Result<IdleTestResult, BenchError> {
        let query = Query::new(IDLE_TEST_QUERY);
        let mut machine = Transitions::new();

        info!("[IDLE TEST] First acquisition - Type: {}", mode);
        let first_start = Instant::now();
        let mut conn = pool.acquire(None).map_err(|e| machine.fail(e))?;
        let first_acquire = first_start.elapsed();
        machine.enter(IdlePhase::Acquired);

        let output = match pool.execute(&mut conn, &query, None) {
            Ok(output) => output,
            Err(e) => {
                pool.release(conn);
                return Err(machine.fail(e));
            }
        };
        info!("[IDLE TEST] First query executed, rows: {}", output.rows);

        pool.release(conn);
        machine.enter(IdlePhase::Released);
        info!(
            "[IDLE TEST] Connection released, waiting {:?}...",
            self.idle_interval
        );

        machine.enter(IdlePhase::Idling);
        thread::sleep(self.idle_interval);

        machine.enter(IdlePhase::Reacquiring);
        info!("[IDLE TEST] Reacquiring connection after {:?} idle", self.idle_interval);
        let reacquire_start = Instant::now();
        let mut conn = pool.acquire(None).map_err(|e| machine.fail(e))?;
        let reacquire = reacquire_start.elapsed();
        machine.enter(IdlePhase::Acquired);
        info!("[IDLE TEST] Reacquisition completed in {:?}", reacquire);

        let result = pool.execute(&mut conn, &query, None);
        pool.release(conn);
        let output = result.map_err(|e| machine.fail(e))?;
        machine.enter(IdlePhase::Released);
        info!("[IDLE TEST] Second query executed, rows: {}", output.rows);

        Ok(IdleTestResult {
            mode,
            idle_interval: self.idle_interval,
            first_acquire,
            reacquire,
            transitions: machine.history,
        })
    }
}

struct Transitions {
    history: Vec<IdlePhase>,
}

impl Transitions {
    fn new() -> Self {
        Self {
            history: vec![IdlePhase::Idle],
        }
    }

    fn enter(&mut self, phase: IdlePhase) {
        self.history.push(phase);
    }

    fn current(&self) -> IdlePhase {
        self.history.last().copied().unwrap_or(IdlePhase::Idle)
    }

    fn fail(&self, source: PoolError) -> BenchError {
        BenchError::IdleTest {
            phase: self.current(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bench::config::PoolSettings;
    use crate::bench::simulated::{SimulatedBackend, SimulatedPoolFactory};

    fn config() -> BenchmarkConfiguration {
        let mut config = BenchmarkConfiguration::new(ConnectionMode::PgbouncerSession);
        config.pool = PoolSettings {
            max_connections: 2,
            min_connections: 0,
            max_idle_time: Duration::from_millis(5),
            ..Default::default()
        };
        config
    }

    #[test]
    fn test_idle_test_walks_every_state() {
        let factory = SimulatedPoolFactory::new(SimulatedBackend {
            connect_latency: Duration::from_millis(2),
            query_latency: Duration::from_millis(1),
            failure_rate: 0.0,
        });
        let result = IdleReacquisitionTest::new(Duration::from_millis(10))
            .run(&factory, &config())
            .unwrap();

        assert_eq!(
            result.transitions,
            vec![
                IdlePhase::Idle,
                IdlePhase::Acquired,
                IdlePhase::Released,
                IdlePhase::Idling,
                IdlePhase::Reacquiring,
                IdlePhase::Acquired,
                IdlePhase::Released,
            ]
        );
        // The idle connection expired, so reacquiring paid the connect cost again
        assert!(result.reacquire >= Duration::from_millis(2));
    }

    #[test]
    fn test_query_failure_reports_phase() {
        let factory = SimulatedPoolFactory::new(SimulatedBackend {
            failure_rate: 1.0,
            ..Default::default()
        });
        let err = IdleReacquisitionTest::new(Duration::ZERO)
            .run(&factory, &config())
            .unwrap_err();

        assert!(matches!(
            err,
            BenchError::IdleTest {
                phase: IdlePhase::Acquired,
                source: PoolError::Operation(_)
            }
        ));
    }
}
