//! Selective Repeat ARQ Core Implementation
//!
//! This crate implements the data-transfer engine of a selective repeat
//! automatic repeat request protocol: frame codec and checksum, modulo
//! sequence arithmetic, RTT-adaptive retransmission timeout, the sender's
//! window and the receiver's reordering buffer.
//!
//! The engine is event driven and never blocks. The channel, the timers and
//! the receiving application are collaborators reached through the traits in
//! [`io`].

pub mod ack;
pub mod config;
pub mod frame;
pub mod io;
pub mod receiver;
pub mod rtt;
pub mod sender;
pub mod sequence;
pub mod session;
pub mod time;

pub use ack::{AckGenerator, AckMode};
pub use config::{ConfigError, ProtocolConfig, RttConfig};
pub use frame::{Frame, FrameError, Message, Payload, FRAME_SIZE, NOT_IN_USE, PAYLOAD_SIZE};
pub use io::{Application, Channel, Entity, TimerService};
pub use receiver::{FrameOutcome, ReceiveBuffer, Receiver, ReceiverStats};
pub use rtt::RttEstimator;
pub use sender::{AckOutcome, SendError, SendWindow, Sender, SenderStats, SlotState, TimeoutOutcome};
pub use sequence::{SeqNumber, SeqSpace};
pub use session::{Event, Outcome, Session};
pub use time::Timestamp;
