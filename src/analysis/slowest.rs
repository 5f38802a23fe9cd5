//! Rank collected traces by duration and pick the slowest.
//!
//! A trace's duration is taken from its root-operation spans, identified by
//! name, not from the span tree. Traces without such a span rank last with
//! a duration of zero.

use crate::trace::{Span, TraceCollector, TraceId};
use crate::utils::config::DEFAULT_ROOT_SPAN_NAME;
use log::debug;
use std::collections::HashMap;
use std::time::Duration;

/// One trace with its computed duration
#[derive(Debug, Clone, PartialEq)]
pub struct RankedTrace {
    pub trace_id: TraceId,
    pub duration: Duration,
    /// Member spans in collection order
    pub spans: Vec<Span>,
}

/// Groups spans into traces and selects the top K by duration
#[derive(Debug, Clone)]
pub struct SlowestTraceAnalyzer {
    root_span_name: String,
}

impl Default for SlowestTraceAnalyzer {
    fn default() -> Self {
        Self::new(DEFAULT_ROOT_SPAN_NAME)
    }
}

impl SlowestTraceAnalyzer {
    pub fn new(root_span_name: impl Into<String>) -> Self {
        Self {
            root_span_name: root_span_name.into(),
        }
    }

    pub fn root_span_name(&self) -> &str {
        &self.root_span_name
    }

    /// Group spans by trace id, in order of each trace's first span
    pub fn group(&self, spans: &[Span]) -> Vec<RankedTrace> {
        let mut index: HashMap<TraceId, usize> = HashMap::new();
        let mut traces: Vec<RankedTrace> = Vec::new();

        for span in spans {
            let slot = *index.entry(span.trace_id).or_insert_with(|| {
                traces.push(RankedTrace {
                    trace_id: span.trace_id,
                    duration: Duration::ZERO,
                    spans: Vec::new(),
                });
                traces.len() - 1
            });
            traces[slot].spans.push(span.clone());
        }

        for trace in &mut traces {
            trace.duration = self.trace_duration(&trace.spans);
        }
        traces
    }

    /// Longest root-operation span among `spans`, or zero if there is none
    pub fn trace_duration(&self, spans: &[Span]) -> Duration {
        spans
            .iter()
            .filter(|span| span.name == self.root_span_name)
            .map(Span::duration)
            .max()
            .unwrap_or(Duration::ZERO)
    }

    /// Top `k` traces, slowest first. Ties keep first-seen order.
    pub fn select(&self, spans: &[Span], k: usize) -> Vec<RankedTrace> {
        if k == 0 || spans.is_empty() {
            return Vec::new();
        }

        let mut traces = self.group(spans);
        let available = traces.len();
        // sort_by is stable, so equal durations stay in first-seen order
        traces.sort_by(|a, b| b.duration.cmp(&a.duration));
        traces.truncate(k);

        debug!(
            "Selected {} of {} traces by {:?} duration",
            traces.len(),
            available,
            self.root_span_name
        );
        traces
    }

    /// `select` over the collector's current snapshot
    pub fn select_from(&self, collector: &TraceCollector, k: usize) -> Vec<RankedTrace> {
        self.select(&collector.snapshot(), k)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace::{SpanId, SpanKind, SpanStatus};
    use chrono::{TimeZone, Utc};

    fn span(trace_id: TraceId, name: &str, millis: i64) -> Span {
        let start = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        Span {
            trace_id,
            span_id: SpanId::random(),
            parent_span_id: None,
            name: name.to_string(),
            kind: SpanKind::Internal,
            start_time: start,
            end_time: start + chrono::Duration::milliseconds(millis),
            attributes: Vec::new(),
            status: SpanStatus::Ok,
        }
    }

    fn tid(n: u8) -> TraceId {
        TraceId::from_bytes([n; 16])
    }

    #[test]
    fn test_group_preserves_first_seen_order() {
        let spans = vec![
            span(tid(2), "worker.request", 5),
            span(tid(1), "worker.request", 9),
            span(tid(2), "pool.query", 4),
        ];

        let groups = SlowestTraceAnalyzer::default().group(&spans);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].trace_id, tid(2));
        assert_eq!(groups[0].spans.len(), 2);
        assert_eq!(groups[1].trace_id, tid(1));
    }

    #[test]
    fn test_duration_uses_longest_root_span() {
        let analyzer = SlowestTraceAnalyzer::default();
        let spans = vec![
            span(tid(1), "worker.request", 30),
            span(tid(1), "worker.request", 45),
            span(tid(1), "pool.query", 90),
        ];
        assert_eq!(analyzer.trace_duration(&spans), Duration::from_millis(45));
    }

    #[test]
    fn test_select_zero_and_empty() {
        let analyzer = SlowestTraceAnalyzer::default();
        assert!(analyzer.select(&[], 5).is_empty());
        assert!(analyzer
            .select(&[span(tid(1), "worker.request", 1)], 0)
            .is_empty());
    }

    #[test]
    fn test_ties_keep_first_seen_order() {
        let analyzer = SlowestTraceAnalyzer::default();
        let spans = vec![
            span(tid(3), "worker.request", 10),
            span(tid(1), "worker.request", 10),
            span(tid(2), "worker.request", 20),
        ];

        let ids: Vec<TraceId> = analyzer.select(&spans, 3).iter().map(|t| t.trace_id).collect();
        assert_eq!(ids, vec![tid(2), tid(3), tid(1)]);
    }

    #[test]
    fn test_custom_root_span_name() {
        let analyzer = SlowestTraceAnalyzer::new("http.request");
        let spans = vec![
            span(tid(1), "worker.request", 50),
            span(tid(2), "http.request", 5),
        ];

        let ranked = analyzer.select(&spans, 2);
        assert_eq!(ranked[0].trace_id, tid(2));
        assert_eq!(ranked[1].duration, Duration::ZERO);
    }
}
