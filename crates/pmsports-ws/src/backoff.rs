//! Reconnect backoff policy.
//!
//! delay(attempt) = min(base * 2^attempt, max). The attempt counter is
//! incremented before the delay is computed, so with base=1000ms and
//! max=30000ms the first five retries wait 2s, 4s, 8s, 16s, 30s.

use std::time::Duration;

/// Bounded exponential backoff.
#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    base_delay_ms: u64,
    max_delay_ms: u64,
    /// 0 = retry forever.
    max_attempts: u32,
    attempts: u32,
}

impl ReconnectPolicy {
    pub fn new(base_delay_ms: u64, max_delay_ms: u64, max_attempts: u32) -> Self {
        Self {
            base_delay_ms,
            max_delay_ms,
            max_attempts,
            attempts: 0,
        }
    }

    /// Attempts made since the last successful connect.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Called on successful connect.
    pub fn reset(&mut self) {
        self.attempts = 0;
    }

    pub fn is_exhausted(&self) -> bool {
        self.max_attempts > 0 && self.attempts >= self.max_attempts
    }

    /// Delay before the given (1-based) attempt.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.min(20);
        let delay = self.base_delay_ms.saturating_mul(1u64 << exponent);
        Duration::from_millis(delay.min(self.max_delay_ms))
    }

    /// Record a failure and return the delay before the next attempt,
    /// or `None` once the attempt budget is spent.
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.is_exhausted() {
            return None;
        }
        self.attempts += 1;
        Some(self.delay_for(self.attempts))
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::new(1000, 30_000, 5)
    }
}
