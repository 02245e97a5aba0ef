//! Retry/backoff helpers shared by the Gateway's producer and the
//! Enricher/Rules Engine's outbound RPC clients (spec §4.1, §4.3, §4.7).

use std::time::Duration;

/// Exponential backoff with a cap, used by the idempotent Kafka producer
/// (spec §4.1: initial 100ms, multiplier 2, cap 30s, up to 8 attempts).
#[derive(Debug, Clone, Copy)]
pub struct ExponentialBackoff {
    initial: Duration,
    multiplier: f64,
    cap: Duration,
    max_attempts: u32,
}

impl ExponentialBackoff {
    /// Construct a new exponential backoff policy.
    #[must_use]
    pub fn new(initial: Duration, multiplier: f64, cap: Duration, max_attempts: u32) -> Self {
        Self {
            initial,
            multiplier,
            cap,
            max_attempts,
        }
    }

    /// The producer retry policy mandated by spec §4.1.
    #[must_use]
    pub fn producer_default() -> Self {
        Self::new(Duration::from_millis(100), 2.0, Duration::from_secs(30), 8)
    }

    /// Maximum number of attempts (including the first try).
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay to wait before the given 1-indexed retry attempt.
    ///
    /// `attempt = 1` is the delay before the *first* retry (i.e. after the
    /// initial try has already failed once).
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let factor = self.multiplier.powi(attempt.saturating_sub(1) as i32);
        let scaled = self.initial.as_secs_f64() * factor;
        Duration::from_secs_f64(scaled.min(self.cap.as_secs_f64()))
    }
}

/// Linear backoff used by the Enricher's registry lookups (spec §4.3:
/// default 3 attempts, `1s * attempt`).
#[derive(Debug, Clone, Copy)]
pub struct LinearBackoff {
    unit: Duration,
    max_attempts: u32,
}

impl LinearBackoff {
    /// Construct a new linear backoff policy.
    #[must_use]
    pub fn new(unit: Duration, max_attempts: u32) -> Self {
        Self { unit, max_attempts }
    }

    /// The Enricher's registry-lookup retry policy mandated by spec §4.3.
    #[must_use]
    pub fn registry_lookup_default() -> Self {
        Self::new(Duration::from_secs(1), 3)
    }

    /// Maximum number of attempts (including the first try).
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay to wait before the given 1-indexed retry attempt.
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        self.unit * attempt
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn exponential_backoff_doubles_until_cap() {
        let backoff = ExponentialBackoff::producer_default();
        assert_eq!(backoff.delay_for_attempt(1), Duration::from_millis(100));
        assert_eq!(backoff.delay_for_attempt(2), Duration::from_millis(200));
        assert_eq!(backoff.delay_for_attempt(3), Duration::from_millis(400));
        assert_eq!(backoff.max_attempts(), 8);
    }

    #[test]
    fn exponential_backoff_respects_cap() {
        let backoff = ExponentialBackoff::producer_default();
        // After enough doublings the delay should be capped at 30s.
        assert_eq!(backoff.delay_for_attempt(20), Duration::from_secs(30));
    }

    #[test]
    fn linear_backoff_scales_by_attempt() {
        let backoff = LinearBackoff::registry_lookup_default();
        assert_eq!(backoff.delay_for_attempt(1), Duration::from_secs(1));
        assert_eq!(backoff.delay_for_attempt(2), Duration::from_secs(2));
        assert_eq!(backoff.delay_for_attempt(3), Duration::from_secs(3));
        assert_eq!(backoff.max_attempts(), 3);
    }
}
