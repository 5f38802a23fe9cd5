//! Pool Trace Bench
//!
//! Concurrency benchmarking for pooled database connections, with
//! per-request tracing and export of the slowest traces.
//!
//! This crate provides the core implementation for the
//! `pool-bench` CLI tool.
//!
//! ## Getting Started
//!
//! ```bash
//! pool-bench run --concurrency 5000 --instances 6
//! pool-bench validate --file trace_slowest_pgbouncer-session_1_20240101120000.json
//! ```

pub mod analysis;
pub mod bench;
pub mod commands;
pub mod output;
pub mod trace;
pub mod utils;
