//! Configuration file support for the emulator CLI
//!
//! Durations are written in (fractional) milliseconds so a file reads the
//! same way the command-line flags do.

use selrep_protocol::config::{
    DEFAULT_MAX_RETRIES, DEFAULT_SEQ_SPACE, DEFAULT_TIMEOUT, DEFAULT_WINDOW_SIZE,
};
use selrep_protocol::{AckMode, ProtocolConfig, RttConfig};
use selrep_sim::SimConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// `[protocol]` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtocolSection {
    pub window_size: u32,
    pub seq_space: u32,
    pub max_retries: u32,
    /// `"selective"` or `"cumulative"`
    pub ack_policy: AckMode,
    /// Timeout before the first RTT sample
    pub timeout_ms: f64,
    pub timeout_min_ms: f64,
    pub timeout_max_ms: f64,
    /// Smoothed RTT gain
    pub alpha: f64,
    /// RTT deviation gain
    pub beta: f64,
}

impl Default for ProtocolSection {
    fn default() -> Self {
        let rtt = RttConfig::default();
        ProtocolSection {
            window_size: DEFAULT_WINDOW_SIZE,
            seq_space: DEFAULT_SEQ_SPACE,
            max_retries: DEFAULT_MAX_RETRIES,
            ack_policy: AckMode::default(),
            timeout_ms: millis(DEFAULT_TIMEOUT),
            timeout_min_ms: millis(rtt.timeout_min),
            timeout_max_ms: millis(rtt.timeout_max),
            alpha: rtt.alpha,
            beta: rtt.beta,
        }
    }
}

/// `[channel]` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelSection {
    /// Messages generated by the sending application
    pub messages: u64,
    /// Mean time between messages
    pub interval_ms: f64,
    /// Frame loss probability
    pub loss: f64,
    /// Frame corruption probability
    pub corrupt: f64,
    /// Fixed one-way delay
    pub delay_ms: f64,
    /// Maximum extra one-way delay
    pub jitter_ms: f64,
    pub reorder: bool,
    /// Simulated time limit
    pub max_time_secs: u64,
    pub seed: u64,
}

impl Default for ChannelSection {
    fn default() -> Self {
        let sim = SimConfig::default();
        ChannelSection {
            messages: sim.messages,
            interval_ms: millis(sim.mean_interarrival),
            loss: sim.loss_prob,
            corrupt: sim.corrupt_prob,
            delay_ms: millis(sim.min_delay),
            jitter_ms: millis(sim.max_jitter),
            reorder: sim.reorder,
            max_time_secs: sim.max_time.as_secs(),
            seed: sim.seed,
        }
    }
}

/// Combined configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub protocol: ProtocolSection,
    pub channel: ChannelSection,
}

impl Config {
    /// Load configuration from TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigFileError> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigFileError> {
        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }

    /// Example configuration: a lossy, corrupting channel
    pub fn example() -> Self {
        Config {
            protocol: ProtocolSection {
                seq_space: 2 * DEFAULT_WINDOW_SIZE,
                ..ProtocolSection::default()
            },
            channel: ChannelSection {
                messages: 1000,
                loss: 0.1,
                corrupt: 0.1,
                ..ChannelSection::default()
            },
        }
    }

    /// Engine configuration
    pub fn protocol_config(&self) -> Result<ProtocolConfig, ConfigFileError> {
        let p = &self.protocol;
        let config = ProtocolConfig {
            window_size: p.window_size,
            seq_space: p.seq_space,
            max_retries: p.max_retries,
            ack_mode: p.ack_policy,
            rtt: RttConfig {
                initial_timeout: duration("timeout_ms", p.timeout_ms)?,
                alpha: p.alpha,
                beta: p.beta,
                timeout_min: duration("timeout_min_ms", p.timeout_min_ms)?,
                timeout_max: duration("timeout_max_ms", p.timeout_max_ms)?,
            },
        };
        config
            .validate()
            .map_err(|e| ConfigFileError::Invalid(e.to_string()))?;
        Ok(config)
    }

    /// Emulator configuration
    pub fn sim_config(&self) -> Result<SimConfig, ConfigFileError> {
        let c = &self.channel;
        let config = SimConfig {
            messages: c.messages,
            mean_interarrival: duration("interval_ms", c.interval_ms)?,
            loss_prob: c.loss,
            corrupt_prob: c.corrupt,
            min_delay: duration("delay_ms", c.delay_ms)?,
            max_jitter: duration("jitter_ms", c.jitter_ms)?,
            reorder: c.reorder,
            max_time: Duration::from_secs(c.max_time_secs),
            seed: c.seed,
        };
        config
            .validate()
            .map_err(|e| ConfigFileError::Invalid(e.to_string()))?;
        Ok(config)
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigFileError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

fn millis(duration: Duration) -> f64 {
    duration.as_nanos() as f64 / 1_000_000.0
}

fn duration(name: &str, ms: f64) -> Result<Duration, ConfigFileError> {
    if ms.is_finite() && ms >= 0.0 {
        Ok(Duration::from_nanos((ms * 1_000_000.0).round() as u64))
    } else {
        Err(ConfigFileError::Invalid(format!("{} = {} is not a valid duration", name, ms)))
    }
}
