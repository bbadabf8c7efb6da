//! RTT (Round-Trip Time) estimation
//!
//! Smooths round-trip samples with an exponentially weighted moving average
//! and derives the retransmission timeout from it:
//!
//! ```text
//! estimated = (1 - alpha) * estimated + alpha * sample
//! deviation = (1 - beta)  * deviation + beta  * |sample - estimated|
//! timeout   = clamp(estimated + 4 * deviation, timeout_min, timeout_max)
//! ```
//!
//! Samples taken from retransmitted frames are ambiguous (the ACK may answer
//! either copy); the sender never feeds them in.

use crate::config::RttConfig;
use std::time::Duration;

/// RTT estimator state
#[derive(Debug, Clone)]
pub struct RttEstimator {
    /// Smoothed RTT (nanoseconds)
    estimated: f64,
    /// RTT deviation (nanoseconds)
    deviation: f64,
    /// Current retransmission timeout (nanoseconds)
    timeout: f64,
    /// Number of samples
    sample_count: u32,
    alpha: f64,
    beta: f64,
    timeout_min: f64,
    timeout_max: f64,
}

impl RttEstimator {
    /// Create a new RTT estimator
    ///
    /// Until the first sample arrives the timeout is the configured initial
    /// timeout and the smoothed RTT is taken to be the same value.
    pub fn new(config: &RttConfig) -> Self {
        let initial = nanos(config.initial_timeout);
        RttEstimator {
            estimated: initial,
            deviation: 0.0,
            timeout: initial,
            sample_count: 0,
            alpha: config.alpha,
            beta: config.beta,
            timeout_min: nanos(config.timeout_min),
            timeout_max: nanos(config.timeout_max),
        }
    }

    /// Update with a new RTT sample
    pub fn update(&mut self, sample: Duration) {
        let sample = nanos(sample);

        self.estimated = (1.0 - self.alpha) * self.estimated + self.alpha * sample;
        self.deviation =
            (1.0 - self.beta) * self.deviation + self.beta * (sample - self.estimated).abs();
        self.timeout =
            (self.estimated + 4.0 * self.deviation).clamp(self.timeout_min, self.timeout_max);

        self.sample_count += 1;
    }

    /// Smoothed RTT
    pub fn estimated(&self) -> Duration {
        from_nanos(self.estimated)
    }

    /// RTT deviation
    pub fn deviation(&self) -> Duration {
        from_nanos(self.deviation)
    }

    /// Get retransmission timeout (RTO)
    pub fn timeout(&self) -> Duration {
        from_nanos(self.timeout)
    }

    /// Number of samples accepted so far
    pub fn sample_count(&self) -> u32 {
        self.sample_count
    }
}

#[inline]
fn nanos(duration: Duration) -> f64 {
    duration.as_nanos() as f64
}

#[inline]
fn from_nanos(value: f64) -> Duration {
    Duration::from_nanos(value.max(0.0).round() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn config() -> RttConfig {
        RttConfig {
            initial_timeout: Duration::from_millis(16),
            alpha: 0.125,
            beta: 0.25,
            timeout_min: Duration::from_millis(1),
            timeout_max: Duration::from_millis(1000),
        }
    }

    fn approx(a: Duration, b_us: f64) -> bool {
        (a.as_nanos() as f64 / 1_000.0 - b_us).abs() < 1e-3
    }

    #[test]
    fn test_initial_timeout() {
        let estimator = RttEstimator::new(&config());
        assert_eq!(estimator.timeout(), Duration::from_millis(16));
        assert_eq!(estimator.sample_count(), 0);
    }

    #[test]
    fn test_rtt_estimator() {
        let mut estimator = RttEstimator::new(&config());

        // estimated = 0.875 * 16000 + 0.125 * 8000 = 15000
        // deviation = 0.25 * |8000 - 15000| = 1750
        estimator.update(Duration::from_millis(8));

        assert!(approx(estimator.estimated(), 15_000.0));
        assert!(approx(estimator.deviation(), 1_750.0));
        assert!(approx(estimator.timeout(), 22_000.0));
        assert_eq!(estimator.sample_count(), 1);
    }

    #[test]
    fn test_timeout_clamped_low() {
        let mut estimator = RttEstimator::new(&RttConfig {
            timeout_min: Duration::from_millis(10),
            ..config()
        });

        for _ in 0..200 {
            estimator.update(Duration::from_nanos(100));
        }
        assert_eq!(estimator.timeout(), Duration::from_millis(10));
    }

    #[test]
    fn test_timeout_clamped_high() {
        let mut estimator = RttEstimator::new(&RttConfig {
            timeout_max: Duration::from_millis(50),
            ..config()
        });

        estimator.update(Duration::from_secs(5));
        assert_eq!(estimator.timeout(), Duration::from_millis(50));
    }

    proptest! {
        #[test]
        fn prop_timeout_within_bounds(samples in prop::collection::vec(0u64..5_000_000_000, 1..64)) {
            let config = config();
            let mut estimator = RttEstimator::new(&config);

            for sample in samples {
                estimator.update(Duration::from_nanos(sample));
                prop_assert!(estimator.timeout() >= config.timeout_min);
                prop_assert!(estimator.timeout() <= config.timeout_max);
            }
        }
    }
}
