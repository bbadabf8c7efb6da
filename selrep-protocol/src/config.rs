//! Protocol configuration and validation

use crate::ack::AckMode;
use crate::sequence::MIN_SEQ_SPACE;
use std::time::Duration;
use thiserror::Error;

/// Default maximum number of buffered, unacknowledged frames
pub const DEFAULT_WINDOW_SIZE: u32 = 6;

/// Default sequence space (must be at least `window_size + 1`)
pub const DEFAULT_SEQ_SPACE: u32 = 7;

/// Default retransmission timeout before any RTT sample exists
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(16);

/// Default number of retransmissions allowed per frame
pub const DEFAULT_MAX_RETRIES: u32 = 20;

/// Configuration errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Window size must be at least 1")]
    ZeroWindow,

    #[error("Sequence space {seq_space} too small for window size {window_size} (need at least window size + 1)")]
    SeqSpaceTooSmall { window_size: u32, seq_space: u32 },

    #[error("Smoothing gain {0} outside (0, 1]")]
    InvalidGain(f64),

    #[error("Timeout bounds invalid: min {min:?}, initial {initial:?}, max {max:?}")]
    InvalidTimeoutBounds {
        min: Duration,
        initial: Duration,
        max: Duration,
    },
}

/// Retransmission timer parameters
#[derive(Debug, Clone, PartialEq)]
pub struct RttConfig {
    /// Timeout used before the first RTT sample
    pub initial_timeout: Duration,
    /// EWMA gain for the smoothed RTT
    pub alpha: f64,
    /// EWMA gain for the RTT deviation
    pub beta: f64,
    /// Lower bound on the computed timeout
    pub timeout_min: Duration,
    /// Upper bound on the computed timeout
    pub timeout_max: Duration,
}

impl Default for RttConfig {
    fn default() -> Self {
        RttConfig {
            initial_timeout: DEFAULT_TIMEOUT,
            alpha: 0.125,
            beta: 0.25,
            timeout_min: Duration::from_millis(1),
            timeout_max: Duration::from_secs(1),
        }
    }
}

/// Selective repeat configuration shared by both entities
#[derive(Debug, Clone, PartialEq)]
pub struct ProtocolConfig {
    /// Maximum outstanding (sender) or buffered (receiver) frames
    pub window_size: u32,
    /// Number of distinct sequence numbers
    pub seq_space: u32,
    /// Retransmissions allowed per frame before it is abandoned
    pub max_retries: u32,
    /// Which sequence number the receiver acknowledges
    pub ack_mode: AckMode,
    /// Retransmission timer parameters
    pub rtt: RttConfig,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        ProtocolConfig {
            window_size: DEFAULT_WINDOW_SIZE,
            seq_space: DEFAULT_SEQ_SPACE,
            max_retries: DEFAULT_MAX_RETRIES,
            ack_mode: AckMode::default(),
            rtt: RttConfig::default(),
        }
    }
}

impl ProtocolConfig {
    /// Check the static protocol invariants
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window_size == 0 {
            return Err(ConfigError::ZeroWindow);
        }

        if self.seq_space < MIN_SEQ_SPACE || self.seq_space <= self.window_size {
            return Err(ConfigError::SeqSpaceTooSmall {
                window_size: self.window_size,
                seq_space: self.seq_space,
            });
        }

        for gain in [self.rtt.alpha, self.rtt.beta] {
            if !(gain > 0.0 && gain <= 1.0) {
                return Err(ConfigError::InvalidGain(gain));
            }
        }

        let rtt = &self.rtt;
        if rtt.timeout_min.is_zero()
            || rtt.timeout_min > rtt.timeout_max
            || rtt.initial_timeout < rtt.timeout_min
            || rtt.initial_timeout > rtt.timeout_max
        {
            return Err(ConfigError::InvalidTimeoutBounds {
                min: rtt.timeout_min,
                initial: rtt.initial_timeout,
                max: rtt.timeout_max,
            });
        }

        if self.seq_space < 2 * self.window_size {
            tracing::warn!(
                window_size = self.window_size,
                seq_space = self.seq_space,
                "sequence space below twice the window; a stale retransmission can be taken for new data"
            );
        }

        Ok(())
    }
}
