//! Receiver side: out-of-order buffering and in-order delivery
//!
//! The receive buffer is a ring of `window_size` slots addressed by offset
//! from the next expected sequence number. Frames anywhere in
//! `[expected, expected + window_size)` are buffered; delivery to the
//! application only ever happens from the front, in sequence order, and each
//! delivered slot is cleared for reuse after the sequence space wraps.

use crate::ack::AckGenerator;
use crate::config::{ConfigError, ProtocolConfig};
use crate::frame::{Frame, Message};
use crate::io::{Application, Channel, Entity};
use crate::sequence::{SeqNumber, SeqSpace};
use tracing::{debug, trace};

/// Result of offering a frame to the receive buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Insert {
    /// Stored in a previously empty slot
    Buffered,
    /// Slot already held this frame
    AlreadyBuffered,
    /// Sequence number outside the receive window
    OutsideWindow,
}

/// Ring buffer of frames awaiting in-order delivery
pub struct ReceiveBuffer {
    slots: Vec<Option<Frame>>,
    /// Ring index of the slot for `expected`
    head: usize,
    /// Next sequence number to deliver
    expected: SeqNumber,
    space: SeqSpace,
}

impl ReceiveBuffer {
    /// Create an empty buffer of `window_size` slots over `space`
    pub fn new(window_size: u32, space: SeqSpace) -> Self {
        ReceiveBuffer {
            slots: vec![None; window_size as usize],
            head: 0,
            expected: SeqNumber::new(0),
            space,
        }
    }

    #[inline]
    fn window_size(&self) -> u32 {
        self.slots.len() as u32
    }

    /// Whether `seq` lies in `[expected, expected + window_size)`
    pub fn in_window(&self, seq: SeqNumber) -> bool {
        self.space.in_window(seq, self.expected, self.window_size())
    }

    /// Store `frame` if its sequence number is inside the window
    pub fn insert(&mut self, frame: Frame) -> Insert {
        if !self.in_window(frame.seqnum) {
            return Insert::OutsideWindow;
        }

        let offset = self.space.distance(self.expected, frame.seqnum) as usize;
        let idx = (self.head + offset) % self.slots.len();

        match self.slots[idx] {
            Some(_) => Insert::AlreadyBuffered,
            None => {
                self.slots[idx] = Some(frame);
                Insert::Buffered
            }
        }
    }

    /// Take the message at `expected` if it has arrived, advancing the window
    pub fn pop_ready(&mut self) -> Option<Message> {
        let frame = self.slots[self.head].take()?;
        self.head = (self.head + 1) % self.slots.len();
        self.expected = self.space.next(self.expected);
        Some(frame.message())
    }

    /// Next sequence number to deliver
    pub fn expected(&self) -> SeqNumber {
        self.expected
    }

    /// Number of frames buffered out of order
    pub fn buffered(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }
}

/// Receiver statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReceiverStats {
    /// Uncorrupted data frames received
    pub frames_received: u64,
    /// Data frames discarded for checksum mismatch
    pub corrupted_frames: u64,
    /// In-window frames that were already buffered
    pub duplicate_frames: u64,
    /// Frames outside the receive window (already delivered)
    pub out_of_window: u64,
    /// ACK frames sent
    pub acks_sent: u64,
    /// Messages delivered to the application
    pub packets_delivered: u64,
}

/// Result of handling an incoming frame at the receiver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// Checksum mismatch; discarded without acknowledgment
    Corrupted,
    /// Frame carried an acknowledgment rather than data; ignored
    NotData,
    /// Frame accepted into the window
    Buffered {
        /// Messages delivered to the application as a result
        delivered: u32,
    },
    /// Frame was already buffered; acknowledged again
    Duplicate,
    /// Frame outside the window; acknowledged again, not delivered
    OutsideWindow,
}

/// Selective repeat receiver (entity B)
pub struct Receiver {
    buffer: ReceiveBuffer,
    space: SeqSpace,
    acks: AckGenerator,
    stats: ReceiverStats,
}

impl Receiver {
    /// Create a receiver from a validated configuration
    pub fn new(config: &ProtocolConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let space = SeqSpace::new(config.seq_space);

        Ok(Receiver {
            buffer: ReceiveBuffer::new(config.window_size, space),
            space,
            acks: AckGenerator::new(config.ack_mode),
            stats: ReceiverStats::default(),
        })
    }

    /// Handle a frame arriving from the sender
    pub fn on_frame<E>(&mut self, frame: &Frame, env: &mut E) -> FrameOutcome
    where
        E: Channel + Application,
    {
        if frame.is_corrupted() {
            debug!("B: packet corrupted, no ACK");
            self.stats.corrupted_frames += 1;
            return FrameOutcome::Corrupted;
        }

        if frame.acknum.is_some() {
            trace!(ack = ?frame.acknum, "B: acknowledgment frame ignored");
            return FrameOutcome::NotData;
        }

        let seq = frame.seqnum;
        self.stats.frames_received += 1;

        let outcome = match self.buffer.insert(*frame) {
            Insert::Buffered => {
                debug!(%seq, "B: packet is correctly received, send ACK");
                let mut delivered = 0;
                while let Some(message) = self.buffer.pop_ready() {
                    env.deliver(message);
                    delivered += 1;
                }
                self.stats.packets_delivered += delivered as u64;
                FrameOutcome::Buffered { delivered }
            }
            Insert::AlreadyBuffered => {
                debug!(%seq, "B: duplicate packet already buffered, resend ACK");
                self.stats.duplicate_frames += 1;
                FrameOutcome::Duplicate
            }
            Insert::OutsideWindow => {
                debug!(%seq, "B: packet outside receive window, resend ACK");
                self.stats.out_of_window += 1;
                FrameOutcome::OutsideWindow
            }
        };

        let acknum = self.acks.ack_value(seq, self.buffer.expected(), self.space);
        env.send(Entity::Receiver, self.acks.generate_ack(acknum));
        self.stats.acks_sent += 1;

        outcome
    }

    /// Receive buffer
    pub fn buffer(&self) -> &ReceiveBuffer {
        &self.buffer
    }

    /// Next sequence number the application is waiting for
    pub fn expected(&self) -> SeqNumber {
        self.buffer.expected()
    }

    /// Get receiver statistics
    pub fn stats(&self) -> &ReceiverStats {
        &self.stats
    }
}
