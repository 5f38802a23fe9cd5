use std::time::Duration;

use pool_trace_bench::bench::{ConnectionMode, PhaseDelays, PoolSettings, SimulatedBackend};
use pool_trace_bench::commands::{
    execute_idle, execute_run, validate_args, validate_trace_file, IdleArgs, RunArgs,
};

fn quick_args(dir: &std::path::Path) -> RunArgs {
    RunArgs {
        modes: vec![ConnectionMode::PgbouncerSession, ConnectionMode::DirectPostgres],
        concurrency_levels: vec![8, 16],
        pool_instances: 2,
        pool: PoolSettings {
            max_connections: 2,
            min_connections: 1,
            ..Default::default()
        },
        backend: SimulatedBackend {
            connect_latency: Duration::from_micros(200),
            query_latency: Duration::from_micros(200),
            failure_rate: 0.0,
        },
        slowest_traces: 3,
        output_dir: dir.join("traces"),
        report_path: dir.join("benchmark_results.txt"),
        skip_idle: false,
        idle_interval: Duration::from_millis(5),
        delays: PhaseDelays {
            stabilize: Duration::ZERO,
            warmup_quiesce: Duration::ZERO,
        },
        level_quiesce: Duration::ZERO,
        ..Default::default()
    }
}

#[test]
fn test_run_produces_results_report_and_traces() {
    let temp_dir = tempfile::tempdir().unwrap();
    let args = quick_args(temp_dir.path());
    validate_args(&args).unwrap();

    let outcome = execute_run(args).unwrap();

    // 2 modes x 2 levels x (warmup + measured)
    assert_eq!(outcome.results.len(), 8);
    assert_eq!(outcome.idle_results.len(), 2);
    assert_eq!(outcome.exported.len(), 6);
    assert!(outcome.results[0].is_warmup());
    assert!(!outcome.results[1].is_warmup());

    let report = std::fs::read_to_string(temp_dir.path().join("benchmark_results.txt")).unwrap();
    assert_eq!(report, outcome.report);
    let session = report.find("Connection Type: pgbouncer-session").unwrap();
    let direct = report.find("Connection Type: direct-postgres").unwrap();
    assert!(session < direct);
    assert_eq!(report.matches("Concurrency: 16 (Actual)").count(), 2);

    for exported in &outcome.exported {
        assert!(exported.path.exists());
        validate_trace_file(exported.path.clone()).unwrap();
    }
}

#[test]
fn test_run_without_export_or_idle() {
    let temp_dir = tempfile::tempdir().unwrap();
    let args = RunArgs {
        modes: vec![ConnectionMode::PgbouncerTransaction],
        concurrency_levels: vec![4],
        slowest_traces: 0,
        skip_idle: true,
        ..quick_args(temp_dir.path())
    };

    let outcome = execute_run(args).unwrap();

    assert_eq!(outcome.results.len(), 2);
    assert!(outcome.idle_results.is_empty());
    assert!(outcome.exported.is_empty());
    assert!(!temp_dir.path().join("traces").exists());
}

#[test]
fn test_idle_command_runs_each_mode() {
    let results = execute_idle(IdleArgs {
        modes: vec![ConnectionMode::DirectPostgres],
        idle_interval: Duration::from_millis(5),
        pool: PoolSettings {
            max_connections: 1,
            min_connections: 0,
            ..Default::default()
        },
        backend: SimulatedBackend {
            connect_latency: Duration::from_micros(100),
            query_latency: Duration::from_micros(100),
            failure_rate: 0.0,
        },
    })
    .unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].mode, ConnectionMode::DirectPostgres);
}

#[test]
fn test_validate_rejects_garbage() {
    let temp_dir = tempfile::tempdir().unwrap();
    let path = temp_dir.path().join("bad.json");
    std::fs::write(&path, "{\"batches\": 3}").unwrap();

    assert!(validate_trace_file(path).is_err());
}
