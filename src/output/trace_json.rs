//! JSON trace writer.
//!
//! Writes a set of spans as one OTLP JSON document and reads it back.

use super::otlp::OtlpTrace;
use crate::trace::Span;
use crate::utils::error::ExportError;
use log::{debug, info};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Write spans to a JSON trace file
///
/// **Public** - main entry point for trace export
///
/// # Arguments
/// * `spans` - Spans to export, usually every span of one trace
/// * `output_path` - Path to output JSON file
///
/// # Errors
/// * `ExportError::NoSpans` - `spans` is empty; nothing is written
/// * `ExportError::WriteFailed` - I/O error during write
/// * `ExportError::SerializationFailed` - JSON serialization error
/// * `ExportError::InvalidPath` - Path cannot be created or is invalid
pub fn write_trace(spans: &[Span], output_path: impl AsRef<Path>) -> Result<(), ExportError> {
    let output_path = output_path.as_ref();

    if spans.is_empty() {
        return Err(ExportError::NoSpans);
    }

    debug!("Writing {} spans to: {}", spans.len(), output_path.display());

    validate_path(output_path)?;

    if let Some(parent) = output_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            debug!("Creating parent directories: {}", parent.display());
            std::fs::create_dir_all(parent).map_err(|e| {
                ExportError::InvalidPath(format!(
                    "Cannot create directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }
    }

    let document = OtlpTrace::from_spans(spans);

    let file = File::create(output_path)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, &document)?;
    writer.flush()?;

    info!(
        "Trace written to {} ({} bytes)",
        output_path.display(),
        calculate_file_size(output_path)
    );

    Ok(())
}

/// Serialize spans to a pretty JSON string (for tests or in-memory use)
pub fn trace_to_string(spans: &[Span]) -> Result<String, ExportError> {
    if spans.is_empty() {
        return Err(ExportError::NoSpans);
    }
    Ok(serde_json::to_string_pretty(&OtlpTrace::from_spans(spans))?)
}

/// Read a JSON trace document
///
/// **Public** - useful for validation and testing
pub fn read_trace(input_path: impl AsRef<Path>) -> Result<OtlpTrace, ExportError> {
    let input_path = input_path.as_ref();

    debug!("Reading trace from: {}", input_path.display());

    let file = File::open(input_path)?;
    let document: OtlpTrace = serde_json::from_reader(file)?;

    debug!("Trace loaded: {} spans", document.spans().count());

    Ok(document)
}

/// Read a JSON trace document and rebuild its spans
pub fn read_trace_spans(input_path: impl AsRef<Path>) -> Result<Vec<Span>, ExportError> {
    Ok(read_trace(input_path)?.to_spans()?)
}

/// Validate that an output path is writable
pub fn validate_path(path: &Path) -> Result<(), ExportError> {
    if path.as_os_str().is_empty() {
        return Err(ExportError::InvalidPath("Path is empty".to_string()));
    }

    if path.is_dir() {
        return Err(ExportError::InvalidPath(format!(
            "Path is a directory: {}",
            path.display()
        )));
    }

    Ok(())
}

fn calculate_file_size(path: &Path) -> u64 {
    std::fs::metadata(path).map(|m| m.len()).unwrap_or(0)
}
