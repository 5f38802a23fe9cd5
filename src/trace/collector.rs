//! In-memory sink for completed spans.
//!
//! Writers append whole batches under the lock, so a reader taking a
//! snapshot sees either all of a batch or none of it. The buffer has no
//! size cap and grows for as long as the collector accepts writes.

use super::span::Span;
use crate::utils::error::TraceError;
use log::debug;
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Default)]
struct CollectorState {
    spans: Vec<Span>,
    closed: bool,
}

/// Thread-safe append-only span buffer
#[derive(Debug, Default)]
pub struct TraceCollector {
    state: Mutex<CollectorState>,
}

impl TraceCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a batch of completed spans
    pub fn record(&self, batch: Vec<Span>) -> Result<(), TraceError> {
        let mut state = self.lock();
        if state.closed {
            return Err(TraceError::CollectorClosed);
        }
        state.spans.extend(batch);
        Ok(())
    }

    /// Copy of every span collected so far
    pub fn snapshot(&self) -> Vec<Span> {
        self.lock().spans.clone()
    }

    pub fn len(&self) -> usize {
        self.lock().spans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stop accepting writes. Collected spans stay readable.
    pub fn shutdown(&self) {
        let mut state = self.lock();
        if !state.closed {
            debug!("Trace collector shut down with {} spans", state.spans.len());
            state.closed = true;
        }
    }

    pub fn is_shut_down(&self) -> bool {
        self.lock().closed
    }

    // Batches land with a single `extend`, so a poisoned lock never guards a torn batch
    fn lock(&self) -> MutexGuard<'_, CollectorState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
