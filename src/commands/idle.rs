//! Idle command implementation: the idle reacquisition test on its own.

use crate::bench::config::{BenchmarkConfiguration, ConnectionMode, PoolSettings};
use crate::bench::idle::{IdleReacquisitionTest, IdleTestResult};
use crate::bench::simulated::{SimulatedBackend, SimulatedPoolFactory};
use crate::output::format_idle_result;
use crate::utils::config::DEFAULT_IDLE_INTERVAL;
use anyhow::{Context, Result};
use log::info;
use std::time::Duration;

/// Arguments for the idle command
#[derive(Debug, Clone)]
pub struct IdleArgs {
    pub modes: Vec<ConnectionMode>,
    pub idle_interval: Duration,
    pub pool: PoolSettings,
    pub backend: SimulatedBackend,
}

impl Default for IdleArgs {
    fn default() -> Self {
        Self {
            modes: vec![
                ConnectionMode::PgbouncerSession,
                ConnectionMode::PgbouncerTransaction,
            ],
            idle_interval: DEFAULT_IDLE_INTERVAL,
            pool: PoolSettings::default(),
            backend: SimulatedBackend::default(),
        }
    }
}

/// Execute the idle test once per mode
///
/// **Public** - main entry point called from main.rs
pub fn execute_idle(args: IdleArgs) -> Result<Vec<IdleTestResult>> {
    let factory = SimulatedPoolFactory::new(args.backend.clone());
    let test = IdleReacquisitionTest::new(args.idle_interval);

    let mut results = Vec::with_capacity(args.modes.len());
    for &mode in &args.modes {
        info!("Idle test for {} ({:?} idle period)", mode, args.idle_interval);

        let mut config = BenchmarkConfiguration::new(mode).with_concurrency(1);
        config.pool = args.pool.clone();

        let result = test
            .run(&factory, &config)
            .with_context(|| format!("Idle test failed for {}", mode))?;
        print!("{}", format_idle_result(&result));
        results.push(result);
    }

    Ok(results)
}
