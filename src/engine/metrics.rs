//! Search run metrics.
//!
//! The plain occurrence methods only return instants. `trace_next_occurrence`
//! returns a [`SearchTrace`] instead, for profiling and for inspecting why a
//! search landed where it did.
//!
//! ## Design notes
//!
//! - `SearchMetrics::candidates` is for debugging and may allocate; it is
//!   capped at [`TRACE_LIMIT`] entries.
//! - A search can run more than one pass when a zone fold maps the first
//!   local hit to an instant at or before the base.

use std::time::Duration;

use chrono::{DateTime, NaiveDateTime, Utc};

/// Most local candidates kept per trace.
pub const TRACE_LIMIT: usize = 256;

#[derive(Debug, Default, Clone)]
pub struct SearchMetrics {
    /// Total elapsed time for the search.
    pub total: Duration,
    /// Candidates examined across all passes.
    pub iterations: usize,
    /// Local-time search passes.
    pub passes: usize,
    /// Local candidates visited, in order.
    pub candidates: Vec<NaiveDateTime>,
}

impl SearchMetrics {
    pub(crate) fn visit(&mut self, candidate: NaiveDateTime) {
        self.iterations += 1;
        if self.candidates.len() < TRACE_LIMIT {
            self.candidates.push(candidate);
        }
    }
}

/// Result of a traced occurrence search.
#[derive(Debug, Clone)]
pub struct SearchTrace {
    pub base: DateTime<Utc>,
    pub result: Option<DateTime<Utc>>,
    pub metrics: SearchMetrics,
}
