//! Progress reporting seams.
//!
//! Executors talk to a [`ProgressObserver`] per move; the scheduler's coordinator
//! talks to a [`CompletionSink`] for the batch. Both are plain callback traits so
//! any front end (terminal, GUI, channel) can sit behind them.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// Per-move progress callbacks. Called from worker threads.
pub trait ProgressObserver: Send + Sync {
    fn initialize(&self, _total_bytes: u64) {}
    fn progress(&self, _bytes_so_far: u64) {}
    fn status(&self, _text: &str) {}
    /// Called exactly once per move with the final outcome.
    fn finish(&self, _success: bool) {}
}

/// Batch-level callbacks. Called from the coordinator thread.
pub trait CompletionSink: Send + Sync {
    /// Emitted after each result is dequeued.
    fn progress(&self, _total: usize, _remaining: usize) {}
    /// Emitted once, after the queue drains.
    fn finished(&self) {}
}

/// Observer/sink that ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct Silent;

impl ProgressObserver for Silent {}
impl CompletionSink for Silent {}

/// Observer that forwards per-move updates to `tracing`.
#[derive(Debug, Clone)]
pub struct LogObserver {
    label: String,
}

impl LogObserver {
    pub fn new(label: impl Into<String>) -> Self {
        Self { label: label.into() }
    }
}

impl ProgressObserver for LogObserver {
    fn initialize(&self, total_bytes: u64) {
        debug!(file = %self.label, total_bytes, "move started");
    }

    fn progress(&self, bytes_so_far: u64) {
        debug!(file = %self.label, bytes_so_far, "copy progress");
    }

    fn status(&self, text: &str) {
        debug!(file = %self.label, status = text);
    }

    fn finish(&self, success: bool) {
        debug!(file = %self.label, success, "move finished");
    }
}

/// Sink that logs batch progress; only completion is logged at info level.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogCompletion;

impl CompletionSink for LogCompletion {
    fn progress(&self, total: usize, remaining: usize) {
        debug!(total, remaining, "batch progress");
    }

    fn finished(&self) {
        info!("All moves finished");
    }
}

/// Cooperative cancellation flag shared between the coordinator and one executor.
///
/// Checked before a queued move starts and between copy chunks; a rename in
/// progress cannot be interrupted.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancel_is_visible_through_clones() {
        let t = CancelToken::new();
        let c = t.clone();
        assert!(!c.is_cancelled());
        t.cancel();
        assert!(c.is_cancelled());
    }
}
