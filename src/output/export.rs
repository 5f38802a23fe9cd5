//! Export the slowest traces, one file per trace.

use super::trace_json::write_trace;
use crate::analysis::slowest::RankedTrace;
use crate::trace::TraceId;
use crate::utils::error::ExportError;
use chrono::{DateTime, Local};
use log::info;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// A trace written to disk
#[derive(Debug, Clone, PartialEq)]
pub struct ExportedTrace {
    /// 1-based position in the ranking
    pub rank: usize,
    pub trace_id: TraceId,
    pub duration: Duration,
    pub path: PathBuf,
}

/// `trace_slowest_{label}_{rank}_{YYYYMMDDHHMMSS}.json`
pub fn slowest_trace_filename(label: &str, rank: usize, stamp: &DateTime<Local>) -> String {
    format!(
        "trace_slowest_{}_{}_{}.json",
        label,
        rank,
        stamp.format("%Y%m%d%H%M%S")
    )
}

/// Write each ranked trace to its own file under `output_dir`
///
/// # Errors
/// * `ExportError::NoTraces` - `ranked` is empty
/// * `ExportError::Rank` - a single trace failed to export; earlier files stay on disk
pub fn export_slowest_traces(
    ranked: &[RankedTrace],
    label: &str,
    output_dir: &Path,
) -> Result<Vec<ExportedTrace>, ExportError> {
    if ranked.is_empty() {
        return Err(ExportError::NoTraces);
    }

    info!("Exporting {} slowest traces for {}...", ranked.len(), label);
    let stamp = Local::now();

    let mut exported = Vec::with_capacity(ranked.len());
    for (i, trace) in ranked.iter().enumerate() {
        let rank = i + 1;
        let path = output_dir.join(slowest_trace_filename(label, rank, &stamp));

        write_trace(&trace.spans, &path).map_err(|source| ExportError::Rank {
            rank,
            source: Box::new(source),
        })?;

        info!("  ✓ Exported trace {}: {:?} ({})", rank, trace.duration, path.display());
        exported.push(ExportedTrace {
            rank,
            trace_id: trace.trace_id,
            duration: trace.duration,
            path,
        });
    }

    Ok(exported)
}
