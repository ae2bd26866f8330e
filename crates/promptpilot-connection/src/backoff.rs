//! Exponential reconnect backoff.

use std::time::Duration;

/// Exponential backoff schedule: `min(base * 2^k, max)` for attempt `k`,
/// reset to `base` after a successful connection.
///
/// Pure bookkeeping; the caller sleeps.
#[derive(Debug, Clone)]
pub struct Backoff {
    base: Duration,
    max: Duration,
    attempt: u32,
}

impl Backoff {
    pub fn new(base: Duration, max: Duration) -> Self {
        Self {
            base,
            max,
            attempt: 0,
        }
    }

    /// Delay to wait before the next attempt. Advances the attempt counter.
    pub fn next_delay(&mut self) -> Duration {
        // Saturate the shift so huge attempt counts cannot overflow.
        let factor = 1u64 << self.attempt.min(31);
        let delay = self
            .base
            .checked_mul(factor as u32)
            .map_or(self.max, |d| d.min(self.max));
        self.attempt = self.attempt.saturating_add(1);
        delay
    }

    /// Number of attempts made since the last reset.
    pub fn attempts(&self) -> u32 {
        self.attempt
    }

    /// Reset to the base delay after a successful connection.
    pub fn reset(&mut self) {
        self.attempt = 0;
    }
}

#[cfg(test)]
#[path = "backoff_tests.rs"]
mod tests;
