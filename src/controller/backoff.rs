//! # Backoff
//!
//! Fibonacci retry intervals for failing reconciliations, tracked per resource key.
//!
//! With `min = 5s` and `max = 300s` the sequence is 5, 5, 10, 15, 25, 40, 65, 105,
//! 170, 275, 300, 300, ...

use std::time::Duration;

/// Fibonacci backoff in seconds, scaled by `min` and capped at `max`
#[derive(Debug, Clone)]
pub struct FibonacciBackoff {
    min_secs: u64,
    max_secs: u64,
    previous: u64,
    current: u64,
}

impl FibonacciBackoff {
    #[must_use]
    pub fn new(min_secs: u64, max_secs: u64) -> Self {
        let min_secs = min_secs.max(1);
        Self {
            min_secs,
            max_secs: max_secs.max(min_secs),
            previous: 0,
            current: 1,
        }
    }

    /// Next interval of the sequence, advancing it
    pub fn next_backoff_seconds(&mut self) -> u64 {
        let value = self.current.saturating_mul(self.min_secs).min(self.max_secs);
        if value < self.max_secs {
            let next = self.previous.saturating_add(self.current);
            self.previous = self.current;
            self.current = next;
        }
        value
    }

    /// Start over from `min`
    pub fn reset(&mut self) {
        self.previous = 0;
        self.current = 1;
    }

    /// Interval for the `error_count`-th consecutive error (0-indexed)
    #[must_use]
    pub fn calculate_for_error_count(error_count: u32, min_secs: u64, max_secs: u64) -> Duration {
        let mut backoff = Self::new(min_secs, max_secs);
        let mut seconds = backoff.next_backoff_seconds();
        for _ in 0..error_count {
            seconds = backoff.next_backoff_seconds();
        }
        Duration::from_secs(seconds)
    }
}

/// Backoff progress of one resource key
#[derive(Debug, Clone)]
pub struct BackoffState {
    pub backoff: FibonacciBackoff,
    pub error_count: u32,
}

impl BackoffState {
    #[must_use]
    pub fn new(min_secs: u64, max_secs: u64) -> Self {
        Self {
            backoff: FibonacciBackoff::new(min_secs, max_secs),
            error_count: 0,
        }
    }

    pub fn increment_error(&mut self) {
        self.error_count = self.error_count.saturating_add(1);
    }

    pub fn reset(&mut self) {
        self.backoff.reset();
        self.error_count = 0;
    }
}
