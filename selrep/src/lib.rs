//! Selective Repeat ARQ
//!
//! Reliable, in-order delivery of fixed-size messages over a channel that
//! loses, damages, delays and reorders frames.

pub use selrep_protocol as protocol;
pub use selrep_sim as sim;

// Re-export commonly used types
pub use protocol::{Frame, Message, ProtocolConfig, SeqNumber, Session};
pub use sim::{Emulator, Report, SimConfig};
