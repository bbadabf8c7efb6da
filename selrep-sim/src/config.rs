//! Emulation parameters

use selrep_protocol::ConfigError;
use std::time::Duration;
use thiserror::Error;

/// Emulator errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimError {
    #[error("Probability {name} = {value} outside [0, 1]")]
    InvalidProbability { name: &'static str, value: f64 },

    #[error("Invalid emulation setting: {0}")]
    InvalidConfig(String),

    #[error("Protocol configuration error: {0}")]
    Protocol(#[from] ConfigError),
}

/// Channel and traffic model
#[derive(Debug, Clone, PartialEq)]
pub struct SimConfig {
    /// Number of messages the application generates
    pub messages: u64,
    /// Mean time between application messages
    pub mean_interarrival: Duration,
    /// Probability that a frame is lost
    pub loss_prob: f64,
    /// Probability that a frame that is not lost is damaged
    pub corrupt_prob: f64,
    /// Fixed part of the one-way delay
    pub min_delay: Duration,
    /// Upper bound of the random part of the one-way delay
    pub max_jitter: Duration,
    /// Allow later frames to overtake earlier ones
    pub reorder: bool,
    /// Simulated time after which the run stops regardless
    pub max_time: Duration,
    /// Random seed
    pub seed: u64,
}

impl Default for SimConfig {
    fn default() -> Self {
        SimConfig {
            messages: 20,
            mean_interarrival: Duration::from_millis(10),
            loss_prob: 0.0,
            corrupt_prob: 0.0,
            min_delay: Duration::from_millis(1),
            max_jitter: Duration::from_millis(9),
            reorder: false,
            max_time: Duration::from_secs(3600),
            seed: 9999,
        }
    }
}

impl SimConfig {
    /// Check the settings
    pub fn validate(&self) -> Result<(), SimError> {
        for (name, value) in [("loss", self.loss_prob), ("corrupt", self.corrupt_prob)] {
            if !(0.0..=1.0).contains(&value) {
                return Err(SimError::InvalidProbability { name, value });
            }
        }

        if self.max_time.is_zero() {
            return Err(SimError::InvalidConfig("max_time must be positive".to_string()));
        }

        Ok(())
    }
}
