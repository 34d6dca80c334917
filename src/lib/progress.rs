//! Progress tracking utilities.
//!
//! A small tracker that logs a progress line each time its count crosses an
//! interval boundary, so long-running passes over large inputs show signs of
//! life without flooding the log.

use log::info;
use std::sync::atomic::{AtomicU64, Ordering};

/// Progress tracker for logging at regular count intervals.
///
/// # Example
/// ```
/// use bridgebuilder_lib::progress::ProgressTracker;
///
/// let tracker = ProgressTracker::new("processed records").with_interval(100);
/// for _ in 0..250 {
///     tracker.log_if_needed(1); // logs at 100 and 200
/// }
/// tracker.log_final(); // logs "processed records 250 (complete)"
/// ```
pub struct ProgressTracker {
    /// Progress is logged when the count crosses multiples of this
    interval: u64,
    /// Message prefix for log output
    message: String,
    /// Items processed so far
    count: AtomicU64,
}

impl ProgressTracker {
    /// Creates a tracker with the given message prefix and a default
    /// interval of 10,000.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self { interval: 10_000, message: message.into(), count: AtomicU64::new(0) }
    }

    /// Sets the logging interval.
    #[must_use]
    pub fn with_interval(mut self, interval: u64) -> Self {
        self.interval = interval;
        self
    }

    /// Items counted so far.
    #[must_use]
    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    /// Adds to the count, logging once per interval boundary crossed.
    ///
    /// Returns `true` when the new count lands exactly on a boundary, which
    /// lets [`log_final`](Self::log_final) avoid a duplicate line.
    pub fn log_if_needed(&self, additional: u64) -> bool {
        if additional == 0 {
            let count = self.count.load(Ordering::Relaxed);
            return count > 0 && count % self.interval == 0;
        }

        let previous = self.count.fetch_add(additional, Ordering::Relaxed);
        let count = previous + additional;

        for crossed in (previous / self.interval + 1)..=(count / self.interval) {
            info!("{} {}", self.message, crossed * self.interval);
        }

        count % self.interval == 0
    }

    /// Logs the final count unless the last interval line already covered it.
    pub fn log_final(&self) {
        if !self.log_if_needed(0) {
            info!("{} {} (complete)", self.message, self.count());
        }
    }
}
