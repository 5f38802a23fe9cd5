//! Error types for the entire application.
//!
//! We use `thiserror` for library-style errors with custom types,
//! and `anyhow` for application-level error propagation in main.rs and commands.

use crate::bench::idle::IdlePhase;
use thiserror::Error;

/// Errors raised by a pool implementation
#[derive(Error, Debug)]
pub enum PoolError {
    #[error("Invalid pool configuration: {0}")]
    InvalidConfig(String),

    #[error("Pool is closed")]
    Closed,

    #[error("Deadline exceeded while {0}")]
    Timeout(&'static str),

    #[error("Operation failed: {0}")]
    Operation(String),
}

/// Errors that abort a benchmark run
#[derive(Error, Debug)]
pub enum BenchError {
    #[error("Invalid benchmark configuration: {0}")]
    Config(String),

    #[error("Unable to create pool instance {index}: {source}")]
    PoolSetup {
        index: usize,
        #[source]
        source: PoolError,
    },

    #[error("Failed to spawn client task {worker}: {source}")]
    Spawn {
        worker: usize,
        #[source]
        source: std::io::Error,
    },

    #[error("Idle test failed during {phase}: {source}")]
    IdleTest {
        phase: IdlePhase,
        #[source]
        source: PoolError,
    },
}

/// Errors from the trace collection pipeline
#[derive(Error, Debug)]
pub enum TraceError {
    #[error("Trace collector is shut down")]
    CollectorClosed,

    #[error("Invalid {kind} id: {value}")]
    InvalidId { kind: &'static str, value: String },

    #[error("Unknown span kind: {0}")]
    UnknownKind(String),

    #[error("Attribute {0} has no value")]
    EmptyAttribute(String),
}

/// Errors that can occur during trace export
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("No spans to export")]
    NoSpans,

    #[error("No traces found to export")]
    NoTraces,

    #[error("Failed to write file: {0}")]
    WriteFailed(#[from] std::io::Error),

    #[error("Failed to serialize JSON: {0}")]
    SerializationFailed(#[from] serde_json::Error),

    #[error("Invalid output path: {0}")]
    InvalidPath(String),

    #[error("Malformed trace document: {0}")]
    Malformed(#[from] TraceError),

    #[error("Failed to export trace {rank}: {source}")]
    Rank {
        rank: usize,
        #[source]
        source: Box<ExportError>,
    },
}
