use crate::output::read_trace;
use crate::utils::config::{SERVICE_NAME, SERVICE_VERSION};
use anyhow::{Context, Result};
use std::collections::HashSet;
use std::path::PathBuf;

/// Validate an exported trace JSON file
pub fn validate_trace_file(file_path: PathBuf) -> Result<()> {
    println!("Validating trace: {}", file_path.display());

    let document = read_trace(&file_path)?;
    let spans = document
        .to_spans()
        .context("Trace document has malformed spans")?;

    let traces: HashSet<_> = spans.iter().map(|s| s.trace_id).collect();
    let roots = spans.iter().filter(|s| s.is_root()).count();

    println!("✓ Valid trace JSON");
    println!("  Batches: {}", document.batches.len());
    println!("  Spans: {}", spans.len());
    println!("  Traces: {}", traces.len());
    println!("  Root Spans: {}", roots);

    if let Some(longest) = spans.iter().map(|s| s.duration()).max() {
        println!("  Longest Span: {:?}", longest);
    }

    Ok(())
}

/// Display schema information
pub fn display_schema(show_details: bool) {
    println!("Pool Trace Bench Export Schema");
    println!("Format: OTLP JSON (resource / instrumentation library / spans)");
    println!();

    if show_details {
        println!("Schema Structure:");
        println!("  batches: array                       - One entry per resource");
        println!("    resource.attributes: array         - service.name, service.version, environment");
        println!("    instrumentationLibrarySpans: array");
        println!("      instrumentationLibrary: object   - name, version");
        println!("      spans: array");
        println!("        traceId: string                - 32 hex chars");
        println!("        spanId: string                 - 16 hex chars");
        println!("        parentSpanId: string?          - Omitted on root spans");
        println!("        name: string                   - Operation name");
        println!("        kind: string                   - SPAN_KIND_*");
        println!("        startTimeUnixNano: number      - Nanoseconds since epoch");
        println!("        endTimeUnixNano: number        - Nanoseconds since epoch");
        println!("        attributes: array?             - key + stringValue/intValue/doubleValue/boolValue");
        println!("        status: object                 - code 0/1/2, message?");
    } else {
        println!("Use --show for detailed schema information");
    }
}

/// Display version information
pub fn display_version() {
    println!("Pool Trace Bench v{}", env!("CARGO_PKG_VERSION"));
    println!("Service: {} v{}", SERVICE_NAME, SERVICE_VERSION);
    println!();
    println!("A connection pool concurrency benchmark with per-request tracing.");
}
