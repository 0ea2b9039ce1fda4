//! Heartbeat scheduling and reconnect backoff.
//!
//! Both use `tokio::time::Instant`, so tests can drive them with a paused
//! clock.

use std::time::Duration;

use tokio::time::Instant;

use crate::core::{BACKOFF_MAX, BACKOFF_MIN, HEARTBEAT_INTERVAL};

/// Exponential backoff between failed reconnection cycles.
///
/// Each failed cycle waits for the current delay, then the delay doubles
/// up to the ceiling. Any success resets it to the floor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Backoff {
    current: Duration,
    min: Duration,
    max: Duration,
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(BACKOFF_MIN, BACKOFF_MAX)
    }
}

impl Backoff {
    /// Create a backoff starting at `min` and capped at `max`.
    pub fn new(min: Duration, max: Duration) -> Self {
        let max = max.max(min);
        Self {
            current: min,
            min,
            max,
        }
    }

    /// Delay the next failure will wait.
    pub fn current(&self) -> Duration {
        self.current
    }

    /// Floor.
    pub fn min(&self) -> Duration {
        self.min
    }

    /// Ceiling.
    pub fn max(&self) -> Duration {
        self.max
    }

    /// Take the delay for this failure and double the next one (capped).
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = self.current.saturating_mul(2).min(self.max);
        delay
    }

    /// Return to the floor after a success.
    pub fn reset(&mut self) {
        self.current = self.min;
    }
}

/// Tracks when the last heartbeat was attempted.
#[derive(Debug, Clone)]
pub struct HeartbeatScheduler {
    interval: Duration,
    last: Instant,
}

impl Default for HeartbeatScheduler {
    fn default() -> Self {
        Self::new(HEARTBEAT_INTERVAL)
    }
}

impl HeartbeatScheduler {
    /// Create a scheduler; the clock starts now.
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: Instant::now(),
        }
    }

    /// Heartbeat interval.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Time since the last heartbeat attempt.
    pub fn elapsed(&self) -> Duration {
        self.last.elapsed()
    }

    /// Check if more than one interval has passed since the last attempt.
    pub fn is_due(&self) -> bool {
        self.elapsed() > self.interval
    }

    /// Restart the clock (after a heartbeat attempt or a recovery attempt).
    pub fn mark(&mut self) {
        self.last = Instant::now();
    }
}
