//! Event dispatch
//!
//! A [`Session`] pairs one sender with one receiver and feeds them events one
//! at a time. Each handler runs to completion before the next event is
//! looked at, so neither entity ever observes a half-applied update.

use crate::config::{ConfigError, ProtocolConfig};
use crate::frame::{Frame, Message};
use crate::io::{Application, Channel, Entity, TimerService};
use crate::receiver::{FrameOutcome, Receiver};
use crate::sender::{AckOutcome, SendError, Sender, TimeoutOutcome};
use crate::sequence::SeqNumber;
use crate::time::Timestamp;
use tracing::trace;

/// Something that happened outside the engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// The sending application has a message ready
    MessageReady(Message),
    /// A frame arrived at the given entity
    FrameArrived(Entity, Frame),
    /// The retransmission timer of the given entity expired
    TimerFired(Entity),
}

/// What the engine did with an event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Result of submitting an application message
    Submitted(Result<SeqNumber, SendError>),
    /// Sender handled an incoming frame
    Ack(AckOutcome),
    /// Receiver handled an incoming frame
    Frame(FrameOutcome),
    /// Sender handled a timeout
    Timeout(TimeoutOutcome),
    /// Event has no meaning for its target entity
    Ignored,
}

/// Sender and receiver of one unidirectional transfer
pub struct Session {
    sender: Sender,
    receiver: Receiver,
}

impl Session {
    /// Create both entities from one configuration
    pub fn new(config: &ProtocolConfig) -> Result<Self, ConfigError> {
        Ok(Session {
            sender: Sender::new(config)?,
            receiver: Receiver::new(config)?,
        })
    }

    /// Dispatch one event to completion
    pub fn handle<E>(&mut self, event: Event, now: Timestamp, env: &mut E) -> Outcome
    where
        E: Channel + TimerService + Application,
    {
        trace!(?event, %now, "dispatch");

        match event {
            Event::MessageReady(message) => {
                Outcome::Submitted(self.sender.submit(message, now, env))
            }
            Event::FrameArrived(Entity::Sender, frame) => {
                Outcome::Ack(self.sender.on_ack(&frame, now, env))
            }
            Event::FrameArrived(Entity::Receiver, frame) => {
                Outcome::Frame(self.receiver.on_frame(&frame, env))
            }
            Event::TimerFired(Entity::Sender) => {
                Outcome::Timeout(self.sender.on_timeout(now, env))
            }
            // The receiver never arms a timer
            Event::TimerFired(Entity::Receiver) => Outcome::Ignored,
        }
    }

    /// Sending entity
    pub fn sender(&self) -> &Sender {
        &self.sender
    }

    /// Receiving entity
    pub fn receiver(&self) -> &Receiver {
        &self.receiver
    }
}
