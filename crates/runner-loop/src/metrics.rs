//! Runner metrics collection.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Runner metrics.
#[derive(Debug, Default)]
pub struct RunnerMetrics {
    /// Requests sent to the driver.
    pub polls: AtomicU64,

    /// Polls that ended in a transport failure.
    pub transport_failures: AtomicU64,

    /// Responses that could not be decoded.
    pub protocol_errors: AtomicU64,

    /// `retryLast` replays.
    pub retry_last_replays: AtomicU64,

    /// Commands handed to the dispatcher.
    pub commands_dispatched: AtomicU64,

    /// Commands that ended `Failed`.
    pub failures: AtomicU64,

    /// Commands that ended `Errored`.
    pub errors: AtomicU64,

    /// Condition waits that timed out.
    pub condition_timeouts: AtomicU64,

    /// Runs the driver marked complete.
    pub runs_completed: AtomicU64,

    start_time: parking_lot::RwLock<Option<Instant>>,
}

impl RunnerMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the start of the loop.
    pub fn mark_start(&self) {
        *self.start_time.write() = Some(Instant::now());
    }

    pub fn uptime_secs(&self) -> u64 {
        self.start_time
            .read()
            .map(|t| t.elapsed().as_secs())
            .unwrap_or(0)
    }

    pub fn record_poll(&self) {
        self.polls.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_transport_failure(&self) {
        self.transport_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_protocol_error(&self) {
        self.protocol_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_retry_last(&self) {
        self.retry_last_replays.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dispatch(&self) {
        self.commands_dispatched.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_condition_timeout(&self) {
        self.condition_timeouts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_run_complete(&self) {
        self.runs_completed.fetch_add(1, Ordering::Relaxed);
    }

    /// Get a snapshot of the metrics.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            timestamp: Utc::now(),
            uptime_secs: self.uptime_secs(),
            polls: self.polls.load(Ordering::Relaxed),
            transport_failures: self.transport_failures.load(Ordering::Relaxed),
            protocol_errors: self.protocol_errors.load(Ordering::Relaxed),
            retry_last_replays: self.retry_last_replays.load(Ordering::Relaxed),
            commands_dispatched: self.commands_dispatched.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            condition_timeouts: self.condition_timeouts.load(Ordering::Relaxed),
            runs_completed: self.runs_completed.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of metrics at a point in time.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub timestamp: DateTime<Utc>,
    pub uptime_secs: u64,
    pub polls: u64,
    pub transport_failures: u64,
    pub protocol_errors: u64,
    pub retry_last_replays: u64,
    pub commands_dispatched: u64,
    pub failures: u64,
    pub errors: u64,
    pub condition_timeouts: u64,
    pub runs_completed: u64,
}

impl MetricsSnapshot {
    /// Share of dispatched commands that failed or errored.
    pub fn failure_rate(&self) -> f64 {
        if self.commands_dispatched == 0 {
            return 0.0;
        }
        (self.failures + self.errors) as f64 / self.commands_dispatched as f64
    }

    /// Share of polls that hit a transport failure.
    pub fn transport_failure_rate(&self) -> f64 {
        if self.polls == 0 {
            return 0.0;
        }
        self.transport_failures as f64 / self.polls as f64
    }
}

#[cfg(test)]
#[path = "metrics_tests.rs"]
mod tests;
