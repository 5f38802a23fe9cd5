use std::sync::Arc;
use std::time::Duration;

use pool_trace_bench::analysis::SlowestTraceAnalyzer;
use pool_trace_bench::output::{export_slowest_traces, read_trace, read_trace_spans, write_trace};
use pool_trace_bench::trace::{AttributeValue, SpanKind, SpanStatus, TraceCollector, Tracer};
use pool_trace_bench::utils::ExportError;
use pretty_assertions::assert_eq;

fn traced_requests(tracer: &Tracer, count: usize) {
    for i in 0..count {
        let mut root = tracer.start_root("worker.request", SpanKind::Internal);
        root.set_attribute("worker.id", i);
        let mut child = tracer.start_child(&root.context(), "pool.query", SpanKind::Client);
        child.set_attribute("db.statement", "SELECT 1");
        std::thread::sleep(Duration::from_millis(i as u64));
        child.set_status(SpanStatus::Ok);
        child.end();
        root.end();
    }
}

#[test]
fn test_collect_rank_export_read_back() {
    let collector = Arc::new(TraceCollector::new());
    let tracer = Tracer::new(Arc::clone(&collector));
    traced_requests(&tracer, 4);
    assert!(tracer.shutdown(Duration::from_secs(1)));

    let ranked = SlowestTraceAnalyzer::default().select_from(&collector, 2);
    assert_eq!(ranked.len(), 2);
    assert!(ranked[0].duration >= ranked[1].duration);

    let temp_dir = tempfile::tempdir().unwrap();
    let exported = export_slowest_traces(&ranked, "pgbouncer-session", temp_dir.path()).unwrap();

    assert_eq!(exported.len(), 2);
    for (file, trace) in exported.iter().zip(&ranked) {
        let name = file.path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with(&format!("trace_slowest_pgbouncer-session_{}_", file.rank)));
        assert!(name.ends_with(".json"));

        let spans = read_trace_spans(&file.path).unwrap();
        assert_eq!(spans, trace.spans);
    }
}

#[test]
fn test_export_round_trip_is_lossless() {
    let collector = Arc::new(TraceCollector::new());
    let tracer = Tracer::new(Arc::clone(&collector));
    traced_requests(&tracer, 1);

    let spans = collector.snapshot();
    let temp_dir = tempfile::tempdir().unwrap();
    let path = temp_dir.path().join("nested").join("trace.json");

    write_trace(&spans, &path).unwrap();

    let document = read_trace(&path).unwrap();
    assert_eq!(document.spans().count(), 2);
    assert_eq!(document.to_spans().unwrap(), spans);

    let root = document.spans().find(|s| s.name == "worker.request").unwrap();
    assert!(root.parent_span_id.is_none());
    let child = document.spans().find(|s| s.name == "pool.query").unwrap();
    assert_eq!(child.parent_span_id.as_deref(), Some(root.span_id.as_str()));
    assert_eq!(child.trace_id, root.trace_id);
    assert_eq!(child.kind, "SPAN_KIND_CLIENT");
}

#[test]
fn test_exporting_nothing_writes_nothing() {
    let temp_dir = tempfile::tempdir().unwrap();
    let path = temp_dir.path().join("trace.json");

    assert!(matches!(write_trace(&[], &path), Err(ExportError::NoSpans)));
    assert!(!path.exists());

    let collector = TraceCollector::new();
    let ranked = SlowestTraceAnalyzer::default().select_from(&collector, 10);
    assert!(ranked.is_empty());
    assert!(matches!(
        export_slowest_traces(&ranked, "direct-postgres", temp_dir.path()),
        Err(ExportError::NoTraces)
    ));
    assert_eq!(std::fs::read_dir(temp_dir.path()).unwrap().count(), 0);
}

#[test]
fn test_select_is_idempotent() {
    let collector = Arc::new(TraceCollector::new());
    let tracer = Tracer::new(Arc::clone(&collector));
    traced_requests(&tracer, 3);

    let analyzer = SlowestTraceAnalyzer::default();
    let first = analyzer.select_from(&collector, 5);
    let second = analyzer.select_from(&collector, 5);

    assert_eq!(first.len(), 3);
    assert_eq!(first, second);
}

#[test]
fn test_spans_after_shutdown_are_dropped() {
    let collector = Arc::new(TraceCollector::new());
    let tracer = Tracer::new(Arc::clone(&collector));
    traced_requests(&tracer, 1);
    assert!(tracer.shutdown(Duration::from_millis(100)));

    traced_requests(&tracer, 1);
    assert_eq!(collector.len(), 2);
    assert!(collector.is_shut_down());
}

#[test]
fn test_non_finite_attributes_round_trip_through_file() {
    let collector = Arc::new(TraceCollector::new());
    let tracer = Tracer::new(Arc::clone(&collector));
    let mut root = tracer.start_root("worker.request", SpanKind::Internal);
    root.set_attribute("ratio", f64::INFINITY);
    root.set_attribute("spread", f64::NAN);
    root.end();

    let temp_dir = tempfile::tempdir().unwrap();
    let path = temp_dir.path().join("trace.json");
    write_trace(&collector.snapshot(), &path).unwrap();

    let content = std::fs::read_to_string(&path).unwrap();
    assert!(!content.contains("null"));

    let spans = read_trace_spans(&path).unwrap();
    assert_eq!(
        spans[0].attribute("ratio"),
        Some(&AttributeValue::Float(f64::INFINITY))
    );
    assert!(matches!(
        spans[0].attribute("spread"),
        Some(AttributeValue::Float(v)) if v.is_nan()
    ));
}
