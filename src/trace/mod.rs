//! Span data model, in-memory collection, and instrumentation.
//!
//! This module handles:
//! - The immutable `Span` record and its identifiers
//! - Collecting finished spans in memory (`TraceCollector`)
//! - Producing spans from instrumented code (`Tracer`)

pub mod collector;
pub mod processor;
pub mod span;
pub mod tracer;

// Re-export main types
pub use collector::TraceCollector;
pub use span::{AttributeValue, KeyValue, Span, SpanContext, SpanId, SpanKind, SpanStatus, TraceId};
pub use tracer::{ActiveSpan, Tracer};
