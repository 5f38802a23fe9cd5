//! CLI command implementations.
//!
//! Each command is implemented in its own module.
//! Commands orchestrate the various library components to perform user tasks.

pub mod idle;
pub mod run;
pub mod utils;

// Re-export main command functions
pub use idle::{execute_idle, IdleArgs};
pub use run::{execute_run, validate_args, RunArgs, RunOutcome};
pub use utils::{display_schema, display_version, validate_trace_file};
