//! Network emulator for the selective repeat engine
//!
//! A single-threaded discrete-event simulation: one sending application, one
//! unreliable duplex link and one receiving application, all driven from a
//! seeded random generator so every run is reproducible.

pub mod config;
pub mod emulator;
pub mod link;
pub mod queue;
pub mod timer;

pub use config::{SimConfig, SimError};
pub use emulator::{Emulator, Report};
pub use link::{Link, LinkStats};
