//! Progress reporting.
//!
//! The engine reports fractional progress in `[0.0, 1.0]` to a
//! [`ProgressSink`] supplied by the caller. Where the updates end up (a
//! terminal, a channel, a test vector) is up to the sink; the engine only
//! promises that within one session the values never decrease and that the
//! last value is exactly one `1.0`, whether the transfer succeeded or not.
//!
//! Sinks must return quickly. The engine calls them inline between chunks
//! and never waits on them, so a sink that needs to do real work should
//! hand the value off, e.g. through a `watch` channel.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};

/// Observer of transfer progress.
pub trait ProgressSink: Send + Sync {
    /// Receive a progress fraction in `[0.0, 1.0]`.
    fn report(&self, fraction: f64);
}

impl<F> ProgressSink for F
where
    F: Fn(f64) + Send + Sync,
{
    fn report(&self, fraction: f64) {
        self(fraction);
    }
}

/// Only the latest value is kept; never blocks.
impl ProgressSink for watch::Sender<f64> {
    fn report(&self, fraction: f64) {
        self.send_replace(fraction);
    }
}

/// Updates are queued without bound; never blocks.
impl ProgressSink for mpsc::UnboundedSender<f64> {
    fn report(&self, fraction: f64) {
        let _ = self.send(fraction);
    }
}

/// A sink that discards every update.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl ProgressSink for NoopSink {
    fn report(&self, _fraction: f64) {}
}

/// Compute `done / total`, treating an empty transfer as complete.
#[must_use]
pub fn fraction(done: u64, total: u64) -> f64 {
    if total == 0 {
        1.0
    } else {
        (done as f64 / total as f64).clamp(0.0, 1.0)
    }
}

/// Per-session wrapper that enforces the progress contract over a sink.
///
/// Intermediate values are clamped and only forwarded when they increase.
/// `1.0` is held back until [`finish`](Self::finish), which is also called
/// on drop so a cancelled or dropped session still signals its end.
pub(crate) struct ProgressReporter {
    sink: Arc<dyn ProgressSink>,
    total: u64,
    done: u64,
    last: f64,
    finished: bool,
}

impl ProgressReporter {
    pub(crate) fn new(sink: Arc<dyn ProgressSink>) -> Self {
        Self {
            sink,
            total: 0,
            done: 0,
            last: 0.0,
            finished: false,
        }
    }

    /// Set the number of bytes the session will move.
    pub(crate) fn set_total(&mut self, total: u64) {
        self.total = total;
    }

    /// Record `bytes` more bytes moved and report the new fraction.
    pub(crate) fn advance(&mut self, bytes: u64) {
        self.done = self.done.saturating_add(bytes);
        if self.total == 0 {
            return;
        }
        let value = fraction(self.done, self.total);
        if value >= 1.0 || value <= self.last || self.finished {
            return;
        }
        self.last = value;
        self.sink.report(value);
    }

    /// Emit the terminal `1.0`. Later calls are no-ops.
    pub(crate) fn finish(&mut self) {
        if self.finished {
            return;
        }
        self.finished = true;
        self.last = 1.0;
        self.sink.report(1.0);
    }
}

impl Drop for ProgressReporter {
    fn drop(&mut self) {
        self.finish();
    }
}
