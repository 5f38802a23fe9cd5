//! Instrumentation API.
//!
//! A `Tracer` is an explicitly owned handle on a `TraceCollector`. Spans are
//! started as `ActiveSpan`s, decorated with attributes and a status, and
//! turned into immutable `Span` records when they end.
//!
//! Lifecycle: create the collector, build a tracer on it, run the workload,
//! then call `Tracer::shutdown` to flush and stop the collector.

use super::collector::TraceCollector;
use super::processor::SpanProcessor;
use super::span::{AttributeValue, KeyValue, Span, SpanContext, SpanId, SpanKind, SpanStatus, TraceId};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;

/// Cheap, cloneable span factory
#[derive(Debug, Clone)]
pub struct Tracer {
    processor: Arc<SpanProcessor>,
}

impl Tracer {
    pub fn new(collector: Arc<TraceCollector>) -> Self {
        Self {
            processor: Arc::new(SpanProcessor::new(collector)),
        }
    }

    pub fn collector(&self) -> &Arc<TraceCollector> {
        self.processor.collector()
    }

    /// Start the first span of a new trace
    pub fn start_root(&self, name: impl Into<String>, kind: SpanKind) -> ActiveSpan {
        self.start(TraceId::random(), None, name.into(), kind)
    }

    /// Start a span beneath `parent`, in the same trace
    pub fn start_child(
        &self,
        parent: &SpanContext,
        name: impl Into<String>,
        kind: SpanKind,
    ) -> ActiveSpan {
        self.start(parent.trace_id, Some(parent.span_id), name.into(), kind)
    }

    pub fn force_flush(&self) {
        self.processor.force_flush();
    }

    /// Flush and close the collector, waiting at most `timeout` for open spans
    pub fn shutdown(&self, timeout: Duration) -> bool {
        self.processor.shutdown(timeout)
    }

    fn start(
        &self,
        trace_id: TraceId,
        parent_span_id: Option<SpanId>,
        name: String,
        kind: SpanKind,
    ) -> ActiveSpan {
        self.processor.on_start();
        ActiveSpan {
            processor: Arc::clone(&self.processor),
            context: SpanContext {
                trace_id,
                span_id: SpanId::random(),
            },
            parent_span_id,
            name,
            kind,
            start_time: Utc::now(),
            attributes: Vec::new(),
            status: SpanStatus::Unset,
            ended: false,
        }
    }
}

/// A span in progress. Ends on `end()` or, failing that, on drop.
#[derive(Debug)]
pub struct ActiveSpan {
    processor: Arc<SpanProcessor>,
    context: SpanContext,
    parent_span_id: Option<SpanId>,
    name: String,
    kind: SpanKind,
    start_time: DateTime<Utc>,
    attributes: Vec<KeyValue>,
    status: SpanStatus,
    ended: bool,
}

impl ActiveSpan {
    pub fn context(&self) -> SpanContext {
        self.context
    }

    pub fn set_attribute(&mut self, key: impl Into<String>, value: impl Into<AttributeValue>) {
        self.attributes.push(KeyValue::new(key, value));
    }

    pub fn set_status(&mut self, status: SpanStatus) {
        self.status = status;
    }

    pub fn end(mut self) {
        self.finish();
    }

    fn finish(&mut self) {
        if self.ended {
            return;
        }
        self.ended = true;

        let span = Span {
            trace_id: self.context.trace_id,
            span_id: self.context.span_id,
            parent_span_id: self.parent_span_id,
            name: std::mem::take(&mut self.name),
            kind: self.kind,
            start_time: self.start_time,
            end_time: Utc::now(),
            attributes: std::mem::take(&mut self.attributes),
            status: std::mem::take(&mut self.status),
        };
        self.processor.on_end(span);
    }
}

impl Drop for ActiveSpan {
    fn drop(&mut self) {
        self.finish();
    }
}
