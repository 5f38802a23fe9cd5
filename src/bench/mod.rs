//! Concurrency harness: configuration, pool contract, runner, idle test.

pub mod config;
pub mod idle;
pub mod pool;
pub mod result;
pub mod runner;
pub mod simulated;

pub use config::{AveragePolicy, BenchmarkConfiguration, ConnectionMode, PoolSettings};
pub use idle::{IdlePhase, IdleReacquisitionTest, IdleTestResult};
pub use pool::{PoolFactory, Query, QueryOutput, ResourcePool};
pub use result::{BenchmarkResult, RunPhase, Sample};
pub use runner::{BenchmarkRunner, PhaseDelays, RunPair};
pub use simulated::{PoolStats, SimulatedBackend, SimulatedPool, SimulatedPoolFactory};
