//! Selective repeat CLI library
//!
//! Shared functionality for the emulator command-line tool.

pub mod config;
pub mod stats;

pub use config::{ChannelSection, Config, ConfigFileError, ProtocolSection};
pub use stats::{display_compact_report, display_report, format_duration, format_rate};
