//! Buffers finished spans per trace and hands each trace to the collector
//! as one batch once its root span ends.

use super::collector::TraceCollector;
use super::span::{Span, TraceId};
use log::{debug, warn};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::{Duration, Instant};

const SHUTDOWN_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Per-trace span buffer in front of a `TraceCollector`
#[derive(Debug)]
pub struct SpanProcessor {
    collector: Arc<TraceCollector>,
    pending: Mutex<HashMap<TraceId, Vec<Span>>>,
    open_spans: AtomicUsize,
}

impl SpanProcessor {
    pub fn new(collector: Arc<TraceCollector>) -> Self {
        Self {
            collector,
            pending: Mutex::new(HashMap::new()),
            open_spans: AtomicUsize::new(0),
        }
    }

    pub fn collector(&self) -> &Arc<TraceCollector> {
        &self.collector
    }

    pub fn on_start(&self) {
        self.open_spans.fetch_add(1, Ordering::AcqRel);
    }

    /// Buffer a finished span; a root span flushes its whole trace
    pub fn on_end(&self, span: Span) {
        let is_root = span.is_root();
        let trace_id = span.trace_id;

        let ready = {
            let mut pending = self.lock_pending();
            pending.entry(trace_id).or_default().push(span);
            if is_root {
                pending.remove(&trace_id)
            } else {
                None
            }
        };
        self.open_spans.fetch_sub(1, Ordering::AcqRel);

        if let Some(batch) = ready {
            self.record(trace_id, batch);
        }
    }

    pub fn open_spans(&self) -> usize {
        self.open_spans.load(Ordering::Acquire)
    }

    /// Push every buffered partial trace to the collector
    pub fn force_flush(&self) {
        let drained: Vec<(TraceId, Vec<Span>)> = self.lock_pending().drain().collect();
        if !drained.is_empty() {
            debug!("Flushing {} partial traces", drained.len());
        }
        for (trace_id, batch) in drained {
            self.record(trace_id, batch);
        }
    }

    /// Wait up to `timeout` for open spans to end, flush, then close the collector.
    ///
    /// Returns false if spans were still open when the timeout expired.
    pub fn shutdown(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut open = self.open_spans();
        while open > 0 && Instant::now() < deadline {
            thread::sleep(SHUTDOWN_POLL_INTERVAL);
            open = self.open_spans();
        }
        if open > 0 {
            warn!(
                "Tracer shutdown timed out after {:?} with {} spans still open",
                timeout, open
            );
        }

        self.force_flush();
        self.collector.shutdown();
        open == 0
    }

    fn record(&self, trace_id: TraceId, batch: Vec<Span>) {
        let count = batch.len();
        if let Err(e) = self.collector.record(batch) {
            warn!("Dropped {} spans of trace {}: {}", count, trace_id, e);
        }
    }

    fn lock_pending(&self) -> MutexGuard<'_, HashMap<TraceId, Vec<Span>>> {
        self.pending.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
