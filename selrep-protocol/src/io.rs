//! Collaborator interfaces
//!
//! The engine does not own a network, a clock or an application. It talks to
//! them through these narrow traits, implemented by whoever drives it (the
//! emulator in `selrep-sim`, or a scripted harness in tests).

use crate::frame::{Frame, Message};
use std::fmt;
use std::time::Duration;

/// The two protocol entities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Entity {
    /// Originates application data (A)
    Sender,
    /// Delivers data to its application and only acknowledges (B)
    Receiver,
}

impl Entity {
    /// The entity on the other end of the channel
    pub fn peer(self) -> Entity {
        match self {
            Entity::Sender => Entity::Receiver,
            Entity::Receiver => Entity::Sender,
        }
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Entity::Sender => write!(f, "A"),
            Entity::Receiver => write!(f, "B"),
        }
    }
}

/// Unreliable frame transport towards the peer
pub trait Channel {
    /// Hand `frame` over for delivery to the peer of `from`
    ///
    /// Fire and forget: the frame may be lost, damaged or delayed.
    fn send(&mut self, from: Entity, frame: Frame);
}

/// Single-shot alarm per entity
pub trait TimerService {
    /// Schedule one timeout for `entity` after `after`
    fn arm(&mut self, entity: Entity, after: Duration);

    /// Cancel the pending timeout of `entity`, if any
    fn cancel(&mut self, entity: Entity);
}

/// Receiving application
pub trait Application {
    /// Called once per message, in submission order
    fn deliver(&mut self, message: Message);
}
