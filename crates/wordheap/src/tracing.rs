//! Heap tracing support.
//!
//! When the `tracing` feature is enabled, this module provides structured
//! spans and events for collections and allocation failures. Without it,
//! every hook is an empty stub the optimizer removes.

#[cfg(feature = "tracing")]
pub mod internal {
    use std::sync::atomic::{AtomicU64, Ordering};
    use tracing::{span, Level};

    /// Collector phases.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum Phase {
        /// Compute the reachable set.
        Mark,
        /// Release everything unmarked.
        Sweep,
    }

    /// Identifier correlating every event of one collection.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct CollectId(pub u64);

    static NEXT_COLLECT_ID: AtomicU64 = AtomicU64::new(1);

    /// Generate the next collection id.
    pub fn next_collect_id() -> CollectId {
        CollectId(NEXT_COLLECT_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Span covering one whole collection.
    pub fn trace_collection(root_source: &str, id: CollectId) -> span::EnteredSpan {
        span!(
            Level::DEBUG,
            "heap_collect",
            root_source = root_source,
            collect_id = id.0
        )
        .entered()
    }

    /// Span for a single phase.
    pub fn trace_phase(phase: Phase) -> span::EnteredSpan {
        span!(Level::DEBUG, "heap_phase", phase = ?phase).entered()
    }

    pub fn log_phase_start(phase: Phase, allocated_chunks: usize) {
        tracing::debug!(phase = ?phase, allocated_chunks, "phase_start");
    }

    pub fn log_phase_end(phase: Phase, chunks: usize, words: usize) {
        tracing::debug!(phase = ?phase, chunks, words, "phase_end");
    }

    pub fn log_alloc_failure(requested_words: usize, free_words: usize) {
        tracing::debug!(requested_words, free_words, "alloc_failed");
    }
}

#[cfg(not(feature = "tracing"))]
#[allow(clippy::missing_const_for_fn)]
pub mod internal {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum Phase {
        Mark,
        Sweep,
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct CollectId(pub u64);

    pub struct NoSpan;

    pub fn next_collect_id() -> CollectId {
        CollectId(0)
    }

    pub fn trace_collection(_root_source: &str, _id: CollectId) -> NoSpan {
        NoSpan
    }

    pub fn trace_phase(_phase: Phase) -> NoSpan {
        NoSpan
    }

    pub fn log_phase_start(_phase: Phase, _allocated_chunks: usize) {}

    pub fn log_phase_end(_phase: Phase, _chunks: usize, _words: usize) {}

    pub fn log_alloc_failure(_requested_words: usize, _free_words: usize) {}
}

pub use internal::*;
