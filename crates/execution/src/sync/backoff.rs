//! Exponential reconnect backoff.

use rand::Rng;
use std::time::Duration;

/// Backoff parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct BackoffConfig {
    /// Delay after the first failure.
    pub base_delay: Duration,
    /// Upper bound of the pre-jitter delay.
    pub max_delay: Duration,
    /// Extra random wait, as a fraction of the current delay.
    pub jitter_ratio: f64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_secs(5),
            max_delay: Duration::from_secs(300),
            jitter_ratio: 0.1,
        }
    }
}

/// Reconnect delay that doubles per consecutive failure up to a cap.
#[derive(Debug, Clone)]
pub struct ReconnectBackoff {
    config: BackoffConfig,
    current: Duration,
    failures: u32,
}

impl ReconnectBackoff {
    pub fn new(mut config: BackoffConfig) -> Self {
        config.jitter_ratio = if config.jitter_ratio.is_finite() {
            config.jitter_ratio.clamp(0.0, 1.0)
        } else {
            0.0
        };
        Self {
            current: config.base_delay,
            config,
            failures: 0,
        }
    }

    /// Pre-jitter delay that the next failure will wait.
    pub fn current_delay(&self) -> Duration {
        self.current.min(self.config.max_delay)
    }

    /// Consecutive failures since the last reset.
    pub fn failures(&self) -> u32 {
        self.failures
    }

    /// Called after a successful subscribe.
    pub fn reset(&mut self) {
        self.current = self.config.base_delay;
        self.failures = 0;
    }

    /// Records a failure and returns how long to wait before reconnecting.
    pub fn record_failure(&mut self) -> Duration {
        let unit: f64 = rand::rng().random();
        self.record_failure_with(unit)
    }

    /// Same as [`record_failure`](Self::record_failure) with the random draw
    /// supplied by the caller (`0.0..1.0`).
    pub fn record_failure_with(&mut self, unit: f64) -> Duration {
        self.failures = self.failures.saturating_add(1);
        let jitter = self
            .current
            .mul_f64(self.config.jitter_ratio * unit.clamp(0.0, 1.0));
        let wait = self.current_delay() + jitter;
        self.current = self.current.saturating_mul(2).min(self.config.max_delay);
        wait
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backoff(base: u64, max: u64) -> ReconnectBackoff {
        ReconnectBackoff::new(BackoffConfig {
            base_delay: Duration::from_secs(base),
            max_delay: Duration::from_secs(max),
            jitter_ratio: 0.1,
        })
    }

    #[test]
    fn test_delay_doubles_up_to_cap() {
        let mut b = backoff(5, 300);
        for n in 1..=10u32 {
            b.record_failure_with(0.0);
            let expected = Duration::from_secs((5u64 << n).min(300));
            assert_eq!(b.current_delay(), expected, "after {n} failures");
            assert_eq!(b.failures(), n);
        }
    }

    #[test]
    fn test_wait_sequence_without_jitter() {
        let mut b = backoff(5, 30);
        let waits: Vec<u64> = (0..5).map(|_| b.record_failure_with(0.0).as_secs()).collect();
        assert_eq!(waits, vec![5, 10, 20, 30, 30]);
    }

    #[test]
    fn test_jitter_is_bounded() {
        let mut b = backoff(10, 300);
        let wait = b.record_failure_with(0.999);
        assert!(wait >= Duration::from_secs(10));
        assert!(wait <= Duration::from_secs(11));

        for _ in 0..50 {
            let before = b.current_delay();
            let wait = b.record_failure();
            assert!(wait >= before);
            assert!(wait <= before + before.mul_f64(0.1));
        }
    }

    #[test]
    fn test_reset_restores_base() {
        let mut b = backoff(5, 300);
        for _ in 0..4 {
            b.record_failure_with(0.5);
        }
        b.reset();
        assert_eq!(b.failures(), 0);
        assert_eq!(b.current_delay(), Duration::from_secs(5));
    }

    #[test]
    fn test_invalid_jitter_ratio_is_neutralized() {
        let mut b = ReconnectBackoff::new(BackoffConfig {
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(2),
            jitter_ratio: f64::NAN,
        });
        assert_eq!(b.record_failure_with(0.9), Duration::from_secs(1));
    }
}
