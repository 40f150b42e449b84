//! Per-object completion accounting.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Counters for one source object.
///
/// `total_lines` is advanced by the transformer, `completed` by the sink
/// as submissions resolve. The object is drained only once the line
/// source is exhausted and every counted line has resolved; equal
/// counters before exhaustion mean nothing.
#[derive(Debug, Default)]
pub struct PipelineTally {
    total_lines: AtomicU64,
    completed: AtomicU64,
    failed: AtomicU64,
    parse_failures: AtomicU64,
    exhausted: AtomicBool,
}

/// Point-in-time copy of a tally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PipelineSummary {
    pub total_lines: u64,
    pub completed: u64,
    pub failed: u64,
    pub parse_failures: u64,
}

impl PipelineTally {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one more line, returning its 1-based number.
    pub fn record_line(&self) -> u64 {
        self.total_lines.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn record_parse_failure(&self) {
        self.parse_failures.fetch_add(1, Ordering::SeqCst);
    }

    /// Count one resolved submission, returning the new completed count.
    pub fn record_resolution(&self, success: bool) -> u64 {
        if !success {
            self.failed.fetch_add(1, Ordering::SeqCst);
        }
        self.completed.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// No more lines will be counted.
    pub fn mark_exhausted(&self) {
        self.exhausted.store(true, Ordering::SeqCst);
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted.load(Ordering::SeqCst)
    }

    /// Exhausted and every counted line resolved.
    pub fn is_drained(&self) -> bool {
        if !self.is_exhausted() {
            return false;
        }
        let total = self.total_lines.load(Ordering::SeqCst);
        self.completed.load(Ordering::SeqCst) == total
    }

    pub fn snapshot(&self) -> PipelineSummary {
        PipelineSummary {
            total_lines: self.total_lines.load(Ordering::SeqCst),
            completed: self.completed.load(Ordering::SeqCst),
            failed: self.failed.load(Ordering::SeqCst),
            parse_failures: self.parse_failures.load(Ordering::SeqCst),
        }
    }
}
